//! Borrowed views into the resident buffer.

use std::sync::Arc;

use rtm_core::grid::GridBox;
use rtm_core::types::{CellDimensions, GridSize, WindowSize};

/// Grid metadata copied at every forward reset.
#[derive(Clone, Debug)]
pub(crate) struct GridMeta {
    pub nt: usize,
    pub dt: f32,
    pub grid_size: GridSize,
    pub window_size: WindowSize,
    pub cell_dimensions: CellDimensions,
    pub velocity: Arc<[f32]>,
}

impl From<&GridBox> for GridMeta {
    fn from(grid: &GridBox) -> Self {
        Self {
            nt: grid.nt(),
            dt: grid.dt(),
            grid_size: grid.grid_size(),
            window_size: grid.window_size(),
            cell_dimensions: grid.cell_dimensions(),
            velocity: Arc::clone(grid.velocity()),
        }
    }
}

/// Read-only view of the most recently fetched forward frame.
///
/// Borrows the collector, so it cannot outlive the next `fetch_forward`.
#[derive(Clone, Copy, Debug)]
pub struct ForwardGrid<'a> {
    frame: usize,
    pressure: &'a [f32],
    meta: &'a GridMeta,
}

impl<'a> ForwardGrid<'a> {
    pub(crate) fn new(frame: usize, pressure: &'a [f32], meta: &'a GridMeta) -> Self {
        Self {
            frame,
            pressure,
            meta,
        }
    }

    /// Logical timestep of the frame.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// Pressure samples of the frame.
    pub fn pressure(&self) -> &'a [f32] {
        self.pressure
    }

    /// Steps of the forward pass.
    pub fn nt(&self) -> usize {
        self.meta.nt
    }

    /// Forward time step in seconds.
    pub fn dt(&self) -> f32 {
        self.meta.dt
    }

    /// Full grid dimensions.
    pub fn grid_size(&self) -> GridSize {
        self.meta.grid_size
    }

    /// Window dimensions the frame is sized by.
    pub fn window_size(&self) -> WindowSize {
        self.meta.window_size
    }

    /// Grid spacing.
    pub fn cell_dimensions(&self) -> CellDimensions {
        self.meta.cell_dimensions
    }

    /// Velocity model of the forward pass.
    pub fn velocity(&self) -> &'a Arc<[f32]> {
        &self.meta.velocity
    }
}

/// The stencil's current and next pressure during the forward pass.
///
/// Both slices live in the resident buffer; writing `next` produces the
/// frame that the following `save_forward` commits.
#[derive(Debug)]
pub struct PressurePair<'a> {
    /// Logical timestep of `current`.
    pub current_frame: usize,
    /// Pressure at `current_frame`.
    pub current: &'a mut [f32],
    /// Pressure at `current_frame + 1`.
    pub next: &'a mut [f32],
}
