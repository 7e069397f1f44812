//! # rtm_checkpoint: Forward Wavefield Checkpointing (Layer 3)
//!
//! ## Layer 3 Role
//!
//! rtm_checkpoint keeps the pressure snapshots of a forward wave-propagation
//! pass and hands them back in exact reverse order to the backward/imaging
//! pass of reverse-time migration:
//! - Resident capacity planning with degradation under allocation pressure (`planner`, `budget`)
//! - Chunk spill and reload, raw or tolerance-bounded compressed (`store`, `codec`)
//! - The `reset_grid` / `save_forward` / `fetch_forward` / `forward_grid` contract (`collector`)
//!
//! ## Modes
//!
//! When `nt + 1` frames fit in memory the collector never touches the disk.
//! Otherwise the resident buffer becomes a ring of `max_nt` slots; every
//! `max_nt` frames are written as one chunk during the forward pass and read
//! back as the backward cursor enters them.
//!
//! ## Usage Example
//!
//! ```rust
//! use rtm_checkpoint::{CollectorConfig, ForwardCollector, ResidentMode};
//! use rtm_core::grid::GridBox;
//! use rtm_core::types::{CellDimensions, GridSize, WindowSize};
//!
//! let root = tempfile::tempdir().unwrap();
//! let config = CollectorConfig::builder()
//!     .workspace_root(root.path())
//!     .max_resident_frames(4)
//!     .build()
//!     .unwrap();
//! let mut collector = ForwardCollector::new(&config).unwrap();
//!
//! let window = WindowSize::new(8, 1, 8);
//! let mut grid = GridBox::new(GridSize::from(window), window, CellDimensions::uniform(10.0), 10, 1e-3)
//!     .unwrap();
//!
//! collector.reset_grid(&mut grid, true).unwrap();
//! for t in 0..=10 {
//!     collector.save_forward().unwrap();
//!     if t < 10 {
//!         let pair = collector.pressure_mut().unwrap();
//!         pair.next.fill(t as f32 + 1.0);
//!     }
//! }
//! assert_eq!(collector.mode(), Some(ResidentMode::Spill));
//! assert_eq!(collector.stats().store.chunks_written, 3);
//!
//! collector.reset_grid(&mut grid, false).unwrap();
//! for t in (0..=10).rev() {
//!     collector.fetch_forward().unwrap();
//!     assert_eq!(collector.forward_grid().unwrap().pressure()[0], t as f32);
//! }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod budget;
pub mod codec;
pub mod collector;
pub mod config;
pub mod error;
pub mod planner;
pub mod store;

pub use budget::MemoryBudget;
pub use codec::{CodecContext, CompressionParameters, FrameCodec, QuantizingCodec};
pub use collector::{
    CollectorState, CollectorStats, ForwardCollector, ForwardGrid, PressurePair, ResidentMode,
};
pub use config::{build_config, CollectorConfig, ConfigError, ConfigOverrides, LogLevel};
pub use error::{CollectorError, CollectorResult};
pub use planner::{FrameAllocator, HeapAllocator, MemoryBudgetPlanner, ResidentPlan};
pub use store::{BinaryStorage, CheckpointStore, FileStorage, RunWorkspace, StorageMode, StoreStats};
