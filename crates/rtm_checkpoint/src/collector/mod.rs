//! Forward wavefield collector.
//!
//! # Architecture
//!
//! ```text
//! ForwardCollector
//!   ├── MemoryBudgetPlanner  (resident capacity, first forward reset)
//!   ├── ResidentBuffer       (ring of capacity slots, frame t in slot t % capacity)
//!   └── CheckpointStore      (chunk spill/reload in spill mode)
//! ```
//!
//! # Driving a shot
//!
//! ```text
//! reset_grid(grid, true)
//! for t in 0..=nt:
//!     save_forward()              // commits frame t
//!     if t < nt: step(pressure_mut())   // writes frame t + 1
//! reset_grid(grid, false)
//! for _ in 0..=nt:
//!     fetch_forward()             // frames nt, nt-1, ..., 0
//!     image(forward_grid())
//! ```
//!
//! In spill mode chunk `k` covers frames `k * capacity ..` up to the next
//! multiple of `capacity` (or `nt`). It is written when its last frame is
//! committed and reloaded when the backward cursor enters it from the top.

mod state;
mod view;

pub use state::{CollectorState, ResidentBuffer, ResidentMode};
pub use view::{ForwardGrid, PressurePair};

use std::path::Path;

use rtm_core::grid::GridBox;
use tracing::{debug, info};

use crate::config::CollectorConfig;
use crate::error::{CollectorError, CollectorResult};
use crate::planner::{FrameAllocator, MemoryBudgetPlanner, ResidentPlan};
use crate::store::{CheckpointStore, RunWorkspace, StorageMode, StoreStats};
use view::GridMeta;

/// Snapshot of collector counters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollectorStats {
    /// Lifecycle state
    pub state: CollectorState,
    /// Mode of the current shot, once reset
    pub mode: Option<ResidentMode>,
    /// Resident slots, once planned
    pub capacity: Option<usize>,
    /// Frames of the current shot (`nt + 1`)
    pub frames: usize,
    /// Frames committed in the current shot
    pub saved: usize,
    /// Frames fetched in the current backward pass
    pub fetched: usize,
    /// Chunk I/O of the current shot
    pub store: StoreStats,
}

/// The simulation's own pressure arrays, held while the resident buffer
/// stands in for them.
#[derive(Debug)]
struct ParkedPressure {
    current: Vec<f32>,
    next: Vec<f32>,
}

/// Saves forward pressure frames and replays them in reverse order.
///
/// # Example
///
/// ```rust
/// use rtm_checkpoint::{CollectorConfig, ForwardCollector};
/// use rtm_core::grid::GridBox;
/// use rtm_core::types::{CellDimensions, GridSize, WindowSize};
///
/// let root = tempfile::tempdir().unwrap();
/// let config = CollectorConfig::builder()
///     .workspace_root(root.path())
///     .build()
///     .unwrap();
/// let mut collector = ForwardCollector::new(&config).unwrap();
///
/// let window = WindowSize::new(4, 1, 4);
/// let mut grid = GridBox::new(GridSize::from(window), window, CellDimensions::uniform(10.0), 3, 1e-3)
///     .unwrap();
///
/// collector.reset_grid(&mut grid, true).unwrap();
/// for t in 0..=3 {
///     collector.save_forward().unwrap();
///     if t < 3 {
///         let pair = collector.pressure_mut().unwrap();
///         pair.next.fill(t as f32 + 1.0);
///     }
/// }
///
/// collector.reset_grid(&mut grid, false).unwrap();
/// for t in (0..=3).rev() {
///     collector.fetch_forward().unwrap();
///     assert_eq!(collector.forward_grid().unwrap().pressure()[0], t as f32);
/// }
/// ```
pub struct ForwardCollector {
    store: CheckpointStore,
    planner: MemoryBudgetPlanner,
    allocator: Box<dyn FrameAllocator>,
    buffer: Option<ResidentBuffer>,
    plan: Option<ResidentPlan>,
    mode: Option<ResidentMode>,
    state: CollectorState,
    meta: Option<GridMeta>,
    parked: Option<ParkedPressure>,
    /// Frames committed in the current shot
    saved: usize,
    /// Frames not yet fetched in the current backward pass
    cursor: usize,
    fetched: usize,
    /// Frame currently exposed by `forward_grid`
    current: Option<usize>,
}

impl ForwardCollector {
    /// Creates a collector from configuration.
    ///
    /// Creates the run workspace; the resident buffer is planned at the
    /// first forward reset.
    ///
    /// # Errors
    ///
    /// - `Config` if the configuration is invalid
    /// - `StorageIoFailure` if the workspace cannot be created
    pub fn new(config: &CollectorConfig) -> CollectorResult<Self> {
        config.validate()?;
        let workspace = RunWorkspace::create(&config.workspace_root, config.keep_workspace)?;
        let store = CheckpointStore::open(workspace, config.storage_mode()?)?;
        Ok(Self::with_parts(
            store,
            config.planner(),
            Box::new(config.allocator()),
        ))
    }

    /// Creates a collector over explicit parts.
    pub fn with_parts(
        store: CheckpointStore,
        planner: MemoryBudgetPlanner,
        allocator: Box<dyn FrameAllocator>,
    ) -> Self {
        Self {
            store,
            planner,
            allocator,
            buffer: None,
            plan: None,
            mode: None,
            state: CollectorState::Uninitialized,
            meta: None,
            parked: None,
            saved: 0,
            cursor: 0,
            fetched: 0,
            current: None,
        }
    }

    /// Starts the forward pass (`forward = true`) or the backward pass.
    ///
    /// A forward reset plans the resident buffer on first use, purges the
    /// previous shot's chunks, parks the grid's pressure arrays and routes
    /// the stencil's pressure to the first two resident slots.
    ///
    /// A backward reset restores the parked arrays zeroed, zeroes the
    /// particle velocities and positions the read cursor past frame `nt`.
    ///
    /// # Errors
    ///
    /// - `AllocationFailure` if the resident buffer cannot be planned
    /// - `ContractViolation` on an incompatible grid or, for a backward
    ///   reset, an incomplete forward pass
    pub fn reset_grid(&mut self, grid: &mut GridBox, forward: bool) -> CollectorResult<()> {
        if forward {
            self.reset_forward(grid)
        } else {
            self.reset_backward(grid)
        }
    }

    fn reset_forward(&mut self, grid: &mut GridBox) -> CollectorResult<()> {
        let window = grid.window_size();
        let frame_len = window
            .validate()
            .map_err(|e| CollectorError::contract(format!("incompatible grid: {}", e)))?;
        let frames = grid
            .nt()
            .checked_add(1)
            .ok_or_else(|| CollectorError::contract("step count overflows"))?;

        let buffer = match self.buffer.take() {
            Some(mut buffer) => {
                // Capacity is fixed after the first plan; only the frame size moves
                if !buffer.reshape(frame_len) {
                    let message = format!(
                        "{} slots of {} samples exceed the resident allocation of {} samples",
                        buffer.capacity(),
                        frame_len,
                        buffer.allocated()
                    );
                    self.buffer = Some(buffer);
                    return Err(CollectorError::contract(message));
                }
                buffer
            }
            None => {
                let (plan, data) = self.planner.plan(frames, frame_len, self.allocator.as_ref())?;
                self.plan = Some(plan);
                ResidentBuffer::new(data, frame_len)
            }
        };
        let buffer = self.buffer.insert(buffer);

        let mode = ResidentMode::select(buffer.capacity(), frames);
        self.store.begin_run(window)?;
        buffer.zero_leading(2);

        if self.parked.is_none() {
            self.parked = Some(ParkedPressure {
                current: std::mem::take(&mut grid.pressure_current),
                next: std::mem::take(&mut grid.pressure_next),
            });
        }

        self.meta = Some(GridMeta::from(&*grid));
        self.mode = Some(mode);
        self.saved = 0;
        self.cursor = 0;
        self.fetched = 0;
        self.current = None;
        self.state = CollectorState::ForwardActive;

        info!(
            nt = grid.nt(),
            frame_len,
            capacity = buffer.capacity(),
            mode = %mode,
            "forward pass started"
        );
        Ok(())
    }

    fn reset_backward(&mut self, grid: &mut GridBox) -> CollectorResult<()> {
        if !matches!(
            self.state,
            CollectorState::ForwardComplete | CollectorState::Done
        ) {
            return Err(CollectorError::contract(format!(
                "backward reset while {}; all {} forward frames must be saved first",
                self.state,
                self.frames()
            )));
        }
        let meta = self.meta()?;
        if grid.window_size() != meta.window_size {
            return Err(CollectorError::contract(format!(
                "backward grid window {:?} differs from forward window {:?}",
                grid.window_size(),
                meta.window_size
            )));
        }
        let frame_len = meta.window_size.sample_count();
        let nt = meta.nt;

        let (mut current, mut next) = match self.parked.take() {
            Some(parked) => (parked.current, parked.next),
            None => (
                std::mem::take(&mut grid.pressure_current),
                std::mem::take(&mut grid.pressure_next),
            ),
        };
        for array in [&mut current, &mut next] {
            array.clear();
            array.resize(frame_len, 0.0);
        }
        grid.pressure_current = current;
        grid.pressure_next = next;
        grid.zero_particle_velocities();

        self.cursor = nt + 1;
        self.fetched = 0;
        self.current = None;
        self.state = CollectorState::BackwardActive;

        info!(nt, "backward pass started");
        Ok(())
    }

    /// Commits the next forward frame.
    ///
    /// The `t`-th call (from 0) commits frame `t`. In spill mode, committing
    /// the last frame of a chunk writes the chunk before any of its slots
    /// can be reused.
    ///
    /// # Errors
    ///
    /// - `ContractViolation` outside the forward pass or after frame `nt`
    /// - `StorageIoFailure` / `CompressionFailure` when a flush fails
    pub fn save_forward(&mut self) -> CollectorResult<()> {
        if self.state != CollectorState::ForwardActive {
            return Err(CollectorError::contract(format!(
                "save_forward while {}",
                self.state
            )));
        }
        let nt = self.meta()?.nt;
        let t = self.saved;

        if self.mode == Some(ResidentMode::Spill) {
            let buffer = self
                .buffer
                .as_ref()
                .ok_or_else(|| CollectorError::contract("no resident buffer"))?;
            let capacity = buffer.capacity();
            if (t + 1) % capacity == 0 || t == nt {
                let chunk = t / capacity;
                let first = chunk * capacity;
                let count = t - first + 1;
                debug!(chunk, first, count, "flushing chunk");
                self.store.write_chunk(chunk, first, buffer.leading(count))?;
            }
        }

        self.saved += 1;
        if self.saved == nt + 1 {
            self.state = CollectorState::ForwardComplete;
            info!(
                frames = self.saved,
                chunks = self.store.chunk_count(),
                "forward pass complete"
            );
        }
        Ok(())
    }

    /// The stencil's current and next pressure for the coming step.
    ///
    /// Before the first save this is frames 0 and 1; after the save of frame
    /// `t` it is frames `t` and `t + 1`.
    ///
    /// # Errors
    ///
    /// Returns `ContractViolation` outside the forward pass or once frame
    /// `nt` is committed.
    pub fn pressure_mut(&mut self) -> CollectorResult<PressurePair<'_>> {
        if self.state != CollectorState::ForwardActive {
            return Err(CollectorError::contract(format!(
                "pressure_mut while {}",
                self.state
            )));
        }
        let nt = self.meta()?.nt;
        let current_frame = self.saved.saturating_sub(1);
        let next_frame = current_frame + 1;
        if next_frame > nt {
            return Err(CollectorError::contract(format!(
                "no frame after {} in a run of {} steps",
                current_frame, nt
            )));
        }

        let buffer = self
            .buffer
            .as_mut()
            .ok_or_else(|| CollectorError::contract("no resident buffer"))?;
        let (a, b) = (buffer.slot_of(current_frame), buffer.slot_of(next_frame));
        let (current, next) = buffer.slot_pair_mut(a, b);
        Ok(PressurePair {
            current_frame,
            current,
            next,
        })
    }

    /// Steps the backward cursor to the previous forward frame.
    ///
    /// Frames come back in order `nt, nt - 1, ..., 0`. In spill mode the
    /// chunk holding the frame is reloaded when the cursor enters it.
    ///
    /// # Errors
    ///
    /// - `ContractViolation` without a backward reset or after frame 0
    /// - `StorageIoFailure` / `CompressionFailure` when a reload fails
    pub fn fetch_forward(&mut self) -> CollectorResult<()> {
        if self.state != CollectorState::BackwardActive {
            return Err(CollectorError::contract(format!(
                "fetch_forward while {}",
                self.state
            )));
        }
        if self.cursor == 0 {
            return Err(CollectorError::contract("every forward frame already fetched"));
        }
        let nt = self.meta()?.nt;
        let t = self.cursor - 1;

        if self.mode == Some(ResidentMode::Spill) {
            let buffer = self
                .buffer
                .as_mut()
                .ok_or_else(|| CollectorError::contract("no resident buffer"))?;
            let capacity = buffer.capacity();
            if t == nt || (t + 1) % capacity == 0 {
                let chunk = t / capacity;
                let count = t - chunk * capacity + 1;
                debug!(chunk, count, "reloading chunk");
                self.store.read_chunk(chunk, buffer.leading_mut(count))?;
            }
        }

        self.cursor = t;
        self.fetched += 1;
        self.current = Some(t);
        if self.cursor == 0 {
            self.state = CollectorState::Done;
            info!(frames = self.fetched, "backward pass complete");
        }
        Ok(())
    }

    /// View of the most recently fetched frame.
    ///
    /// # Errors
    ///
    /// Returns `ContractViolation` before the first `fetch_forward` of a
    /// backward pass.
    pub fn forward_grid(&self) -> CollectorResult<ForwardGrid<'_>> {
        let frame = self
            .current
            .ok_or_else(|| CollectorError::contract("forward_grid before fetch_forward"))?;
        let meta = self.meta()?;
        let buffer = self
            .buffer
            .as_ref()
            .ok_or_else(|| CollectorError::contract("no resident buffer"))?;
        Ok(ForwardGrid::new(
            frame,
            buffer.slot(buffer.slot_of(frame)),
            meta,
        ))
    }

    fn meta(&self) -> CollectorResult<&GridMeta> {
        self.meta
            .as_ref()
            .ok_or_else(|| CollectorError::contract("collector used before reset_grid"))
    }

    fn frames(&self) -> usize {
        self.meta.as_ref().map_or(0, |m| m.nt + 1)
    }

    /// Lifecycle state.
    pub fn state(&self) -> CollectorState {
        self.state
    }

    /// Mode of the current shot.
    pub fn mode(&self) -> Option<ResidentMode> {
        self.mode
    }

    /// Resident slots (`max_nt`), once planned.
    pub fn capacity(&self) -> Option<usize> {
        self.buffer.as_ref().map(ResidentBuffer::capacity)
    }

    /// `true` when the current shot is fully resident.
    pub fn mem_fit(&self) -> Option<bool> {
        self.mode.map(|m| m == ResidentMode::FullFit)
    }

    /// Planner outcome of the first forward reset.
    ///
    /// The plan is made once per collector, so its `mem_fit` describes the
    /// first shot only; [`mem_fit`](Self::mem_fit) tracks the current shot.
    pub fn plan(&self) -> Option<ResidentPlan> {
        self.plan
    }

    /// Frames committed in the current shot.
    pub fn saved_frames(&self) -> usize {
        self.saved
    }

    /// Frames still to fetch in the current backward pass.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Chunk encoding.
    pub fn storage_mode(&self) -> StorageMode {
        self.store.mode()
    }

    /// Run workspace directory.
    pub fn workspace_path(&self) -> &Path {
        self.store.workspace_path()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> CollectorStats {
        CollectorStats {
            state: self.state,
            mode: self.mode,
            capacity: self.capacity(),
            frames: self.frames(),
            saved: self.saved,
            fetched: self.fetched,
            store: self.store.stats(),
        }
    }
}

impl std::fmt::Debug for ForwardCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardCollector")
            .field("state", &self.state)
            .field("mode", &self.mode)
            .field("capacity", &self.capacity())
            .field("saved", &self.saved)
            .field("cursor", &self.cursor)
            .field("store", &self.store)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::HeapAllocator;
    use rtm_core::types::{CellDimensions, GridSize, WindowSize};
    use tempfile::TempDir;

    fn window() -> WindowSize {
        WindowSize::new(3, 1, 2)
    }

    fn grid(nt: usize) -> GridBox {
        GridBox::new(
            GridSize::from(window()),
            window(),
            CellDimensions::uniform(10.0),
            nt,
            1e-3,
        )
        .unwrap()
    }

    fn collector(cap: Option<usize>) -> (TempDir, ForwardCollector) {
        let root = tempfile::tempdir().unwrap();
        let ws = RunWorkspace::create(root.path(), false).unwrap();
        let store = CheckpointStore::open(ws, StorageMode::Raw).unwrap();
        let planner = match cap {
            Some(frames) => MemoryBudgetPlanner::new().with_max_resident_frames(frames),
            None => MemoryBudgetPlanner::new(),
        };
        let collector = ForwardCollector::with_parts(store, planner, Box::new(HeapAllocator::new()));
        (root, collector)
    }

    /// Runs a forward pass writing `t` into every sample of frame `t`.
    fn forward(collector: &mut ForwardCollector, grid: &mut GridBox) {
        let nt = grid.nt();
        collector.reset_grid(grid, true).unwrap();
        for t in 0..=nt {
            collector.save_forward().unwrap();
            if t < nt {
                let pair = collector.pressure_mut().unwrap();
                assert_eq!(pair.current_frame, t);
                pair.next.fill((t + 1) as f32);
            }
        }
    }

    // ========================================================================
    // State Machine Tests
    // ========================================================================

    #[test]
    fn test_initial_state() {
        let (_root, collector) = collector(None);
        assert_eq!(collector.state(), CollectorState::Uninitialized);
        assert_eq!(collector.capacity(), None);
        assert_eq!(collector.mem_fit(), None);
    }

    #[test]
    fn test_calls_before_reset_are_violations() {
        let (_root, mut collector) = collector(None);
        assert!(matches!(
            collector.save_forward(),
            Err(CollectorError::ContractViolation { .. })
        ));
        assert!(collector.fetch_forward().is_err());
        assert!(collector.pressure_mut().is_err());
        assert!(collector.forward_grid().is_err());
    }

    #[test]
    fn test_forward_reset_parks_grid_pressure() {
        let (_root, mut collector) = collector(None);
        let mut grid = grid(4);
        collector.reset_grid(&mut grid, true).unwrap();

        assert!(grid.pressure_current.is_empty());
        assert!(grid.pressure_next.is_empty());
        assert_eq!(collector.state(), CollectorState::ForwardActive);
    }

    #[test]
    fn test_first_pressure_pair_is_frames_zero_and_one() {
        let (_root, mut collector) = collector(None);
        let mut grid = grid(4);
        collector.reset_grid(&mut grid, true).unwrap();

        let pair = collector.pressure_mut().unwrap();
        assert_eq!(pair.current_frame, 0);
        assert!(pair.current.iter().all(|&x| x == 0.0));
        assert!(pair.next.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_backward_reset_restores_zeroed_arrays() {
        let (_root, mut collector) = collector(None);
        let mut grid = grid(3);
        grid.particle_velocity_x.fill(2.0);
        forward(&mut collector, &mut grid);
        assert_eq!(collector.state(), CollectorState::ForwardComplete);

        collector.reset_grid(&mut grid, false).unwrap();
        assert_eq!(grid.pressure_current, vec![0.0; 6]);
        assert_eq!(grid.pressure_next, vec![0.0; 6]);
        assert!(grid.particle_velocity_x.iter().all(|&x| x == 0.0));
        assert!(grid.particle_velocity_y.is_empty());
        assert_eq!(collector.cursor(), 4);
    }

    #[test]
    fn test_backward_reset_before_forward_complete() {
        let (_root, mut collector) = collector(None);
        let mut grid = grid(3);
        collector.reset_grid(&mut grid, true).unwrap();
        collector.save_forward().unwrap();

        assert!(matches!(
            collector.reset_grid(&mut grid, false),
            Err(CollectorError::ContractViolation { .. })
        ));
    }

    #[test]
    fn test_pressure_pair_unavailable_after_last_frame() {
        let (_root, mut collector) = collector(None);
        let mut grid = grid(2);
        forward(&mut collector, &mut grid);
        assert!(collector.pressure_mut().is_err());
        assert!(collector.save_forward().is_err());
    }

    #[test]
    fn test_fetch_order_full_fit() {
        let (_root, mut collector) = collector(None);
        let mut grid = grid(5);
        forward(&mut collector, &mut grid);
        collector.reset_grid(&mut grid, false).unwrap();

        for t in (0..=5).rev() {
            collector.fetch_forward().unwrap();
            let view = collector.forward_grid().unwrap();
            assert_eq!(view.frame(), t);
            assert!(view.pressure().iter().all(|&x| x == t as f32));
        }
        assert_eq!(collector.state(), CollectorState::Done);
        assert_eq!(collector.cursor(), 0);
        assert!(collector.fetch_forward().is_err());
        assert!(collector.stats().store.is_idle());
    }

    #[test]
    fn test_forward_grid_before_fetch() {
        let (_root, mut collector) = collector(None);
        let mut grid = grid(2);
        forward(&mut collector, &mut grid);
        collector.reset_grid(&mut grid, false).unwrap();
        assert!(collector.forward_grid().is_err());
    }

    #[test]
    fn test_forward_grid_carries_metadata() {
        let (_root, mut collector) = collector(None);
        let mut grid = grid(2);
        forward(&mut collector, &mut grid);
        collector.reset_grid(&mut grid, false).unwrap();
        collector.fetch_forward().unwrap();

        let view = collector.forward_grid().unwrap();
        assert_eq!(view.nt(), 2);
        assert_eq!(view.dt(), 1e-3);
        assert_eq!(view.window_size(), window());
        assert_eq!(view.grid_size(), GridSize::from(window()));
        assert_eq!(view.cell_dimensions().dx, 10.0);
        assert!(std::sync::Arc::ptr_eq(view.velocity(), grid.velocity()));
    }

    // ========================================================================
    // Spill Mode Tests
    // ========================================================================

    #[test]
    fn test_spill_reverse_order_with_ring_reuse() {
        let (_root, mut collector) = collector(Some(3));
        let mut grid = grid(7);
        forward(&mut collector, &mut grid);
        assert_eq!(collector.mode(), Some(ResidentMode::Spill));
        assert_eq!(collector.stats().store.chunks_written, 3);

        collector.reset_grid(&mut grid, false).unwrap();
        for t in (0..=7).rev() {
            collector.fetch_forward().unwrap();
            let view = collector.forward_grid().unwrap();
            assert!(view.pressure().iter().all(|&x| x == t as f32), "frame {}", t);
        }
        assert_eq!(collector.stats().store.chunks_read, 3);
    }

    #[test]
    fn test_second_shot_reuses_capacity() {
        let (_root, mut collector) = collector(Some(4));
        let mut grid = grid(9);
        forward(&mut collector, &mut grid);
        assert_eq!(collector.capacity(), Some(4));

        // Shorter shot fits in the same buffer
        let mut short = self::grid(3);
        forward(&mut collector, &mut short);
        assert_eq!(collector.mode(), Some(ResidentMode::FullFit));
        assert_eq!(collector.mem_fit(), Some(true));
        assert_eq!(collector.stats().store.chunks_written, 0);
    }

    #[test]
    fn test_larger_frame_than_allocation_is_violation() {
        let (_root, mut collector) = collector(None);
        let mut grid = grid(3);
        forward(&mut collector, &mut grid);

        let wide = WindowSize::new(5, 1, 2);
        let mut other = GridBox::new(
            GridSize::from(wide),
            wide,
            CellDimensions::uniform(10.0),
            3,
            1e-3,
        )
        .unwrap();
        assert!(matches!(
            collector.reset_grid(&mut other, true),
            Err(CollectorError::ContractViolation { .. })
        ));
        // Buffer survives the rejected reset
        assert_eq!(collector.capacity(), Some(4));
    }

    #[test]
    fn test_smaller_window_reuses_allocation() {
        let (_root, mut collector) = collector(Some(3));
        let mut grid = grid(7);
        forward(&mut collector, &mut grid);
        collector.reset_grid(&mut grid, false).unwrap();
        for _ in 0..=7 {
            collector.fetch_forward().unwrap();
        }

        grid.resize_window(WindowSize::new(2, 1, 2)).unwrap();
        forward(&mut collector, &mut grid);
        assert_eq!(collector.capacity(), Some(3));
        assert_eq!(collector.mode(), Some(ResidentMode::Spill));

        collector.reset_grid(&mut grid, false).unwrap();
        assert_eq!(grid.pressure_current.len(), 4);
        for t in (0..=7).rev() {
            collector.fetch_forward().unwrap();
            let view = collector.forward_grid().unwrap();
            assert_eq!(view.pressure(), &[t as f32; 4][..]);
            assert_eq!(view.window_size(), WindowSize::new(2, 1, 2));
        }
    }

    #[test]
    fn test_plan_keeps_first_shot_outcome() {
        let (_root, mut collector) = collector(Some(4));
        let mut grid = grid(9);
        forward(&mut collector, &mut grid);
        let mut short = self::grid(2);
        forward(&mut collector, &mut short);

        let plan = collector.plan().unwrap();
        assert!(!plan.mem_fit);
        assert_eq!(plan.capacity, 4);
        assert_eq!(collector.mem_fit(), Some(true));
    }
}
