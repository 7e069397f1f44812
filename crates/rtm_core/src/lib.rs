//! # rtm_core: Grid Foundation for Reverse-Time Migration
//!
//! ## Layer 1 (Foundation) Role
//!
//! rtm_core is the bottom layer of the workspace. It describes the pieces of
//! the simulation that the checkpoint engine consumes but does not own:
//! - Window, grid and cell dimensions (`types::dims`)
//! - The staggered-grid state box with pressure and particle-velocity arrays (`grid`)
//! - Error types: `GridError` (`types::error`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other rtm_* crates, with minimal external dependencies:
//! - thiserror: Structured error types
//! - serde: Serialisation support (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use rtm_core::grid::GridBox;
//! use rtm_core::types::{CellDimensions, GridSize, WindowSize};
//!
//! let window = WindowSize::new(64, 1, 48);
//! let grid = GridBox::new(GridSize::from(window), window, CellDimensions::uniform(10.0), 200, 1e-3)
//!     .unwrap();
//!
//! assert_eq!(grid.window_size().sample_count(), 64 * 48);
//! assert!(!grid.is_3d());
//! ```
//!
//! ## Feature Flags
//!
//! - `serde`: Enable serialisation for `WindowSize`, `GridSize`, `CellDimensions`

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod grid;
pub mod types;
