//! Staggered-grid simulation state.
//!
//! [`GridBox`] is the collaborator the checkpoint engine reads geometry from
//! and whose pressure arrays it temporarily takes over during the forward
//! pass. The stencil, boundary handling and source injection that mutate it
//! live outside this workspace.

use std::sync::Arc;

use crate::types::{CellDimensions, GridError, GridSize, WindowSize};

/// Simulation state for a staggered pressure/particle-velocity scheme.
///
/// Every array holds one sample per window point. The y particle velocity
/// is empty for 2-D runs (`window.ny == 1`).
///
/// # Examples
///
/// ```
/// use rtm_core::grid::GridBox;
/// use rtm_core::types::{CellDimensions, GridSize, WindowSize};
///
/// let window = WindowSize::new(8, 2, 8);
/// let grid = GridBox::new(GridSize::new(10, 2, 10), window, CellDimensions::uniform(5.0), 50, 1e-3)
///     .unwrap();
///
/// assert_eq!(grid.pressure_current.len(), 128);
/// assert_eq!(grid.particle_velocity_y.len(), 128);
/// assert_eq!(grid.velocity().len(), 128);
/// ```
#[derive(Clone, Debug)]
pub struct GridBox {
    grid_size: GridSize,
    window_size: WindowSize,
    cell_dimensions: CellDimensions,
    nt: usize,
    dt: f32,
    velocity: Arc<[f32]>,

    /// Pressure at the current time level.
    pub pressure_current: Vec<f32>,
    /// Pressure at the next time level, written by the stencil.
    pub pressure_next: Vec<f32>,
    /// Particle velocity along x.
    pub particle_velocity_x: Vec<f32>,
    /// Particle velocity along y (empty for 2-D runs).
    pub particle_velocity_y: Vec<f32>,
    /// Particle velocity along z.
    pub particle_velocity_z: Vec<f32>,
}

impl GridBox {
    /// Creates a zeroed grid box with a constant unit velocity model.
    ///
    /// # Errors
    ///
    /// Returns `GridError` if the window is empty, overflows, does not fit in
    /// the grid, `nt` is zero or `dt` is not positive and finite.
    pub fn new(
        grid_size: GridSize,
        window_size: WindowSize,
        cell_dimensions: CellDimensions,
        nt: usize,
        dt: f32,
    ) -> Result<Self, GridError> {
        if nt == 0 {
            return Err(GridError::InvalidStepCount(nt));
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(GridError::InvalidTimeStep(dt));
        }
        grid_size.contains(&window_size)?;
        let len = window_size.validate()?;
        let y_len = if window_size.is_3d() { len } else { 0 };

        Ok(Self {
            grid_size,
            window_size,
            cell_dimensions,
            nt,
            dt,
            velocity: vec![1.0; len].into(),
            pressure_current: vec![0.0; len],
            pressure_next: vec![0.0; len],
            particle_velocity_x: vec![0.0; len],
            particle_velocity_y: vec![0.0; y_len],
            particle_velocity_z: vec![0.0; len],
        })
    }

    /// Replaces the velocity model.
    ///
    /// # Errors
    ///
    /// Returns `GridError::VelocityLength` if the model does not have one
    /// sample per window point.
    pub fn with_velocity(mut self, velocity: Arc<[f32]>) -> Result<Self, GridError> {
        self.set_velocity(velocity)?;
        Ok(self)
    }

    /// Replaces the velocity model in place.
    pub fn set_velocity(&mut self, velocity: Arc<[f32]>) -> Result<(), GridError> {
        let expected = self.window_size.sample_count();
        if velocity.len() != expected {
            return Err(GridError::VelocityLength {
                expected,
                actual: velocity.len(),
            });
        }
        self.velocity = velocity;
        Ok(())
    }

    /// Moves the computation window and reallocates every array, zeroed.
    ///
    /// The velocity model is reset to a constant unit model and must be set
    /// again by the caller.
    pub fn resize_window(&mut self, window_size: WindowSize) -> Result<(), GridError> {
        self.grid_size.contains(&window_size)?;
        let len = window_size.validate()?;
        let y_len = if window_size.is_3d() { len } else { 0 };

        self.window_size = window_size;
        self.velocity = vec![1.0; len].into();
        self.pressure_current = vec![0.0; len];
        self.pressure_next = vec![0.0; len];
        self.particle_velocity_x = vec![0.0; len];
        self.particle_velocity_y = vec![0.0; y_len];
        self.particle_velocity_z = vec![0.0; len];
        Ok(())
    }

    /// Full grid dimensions.
    #[inline]
    pub fn grid_size(&self) -> GridSize {
        self.grid_size
    }

    /// Computation window dimensions.
    #[inline]
    pub fn window_size(&self) -> WindowSize {
        self.window_size
    }

    /// Grid spacing.
    #[inline]
    pub fn cell_dimensions(&self) -> CellDimensions {
        self.cell_dimensions
    }

    /// Number of time steps of one pass.
    #[inline]
    pub fn nt(&self) -> usize {
        self.nt
    }

    /// Time step in seconds.
    #[inline]
    pub fn dt(&self) -> f32 {
        self.dt
    }

    /// Shared velocity model.
    #[inline]
    pub fn velocity(&self) -> &Arc<[f32]> {
        &self.velocity
    }

    /// Returns `true` for 3-D runs.
    #[inline]
    pub fn is_3d(&self) -> bool {
        self.window_size.is_3d()
    }

    /// Zeroes the particle-velocity arrays.
    ///
    /// The y component is only touched for 3-D runs.
    pub fn zero_particle_velocities(&mut self) {
        self.particle_velocity_x.fill(0.0);
        self.particle_velocity_z.fill(0.0);
        if self.is_3d() {
            self.particle_velocity_y.fill(0.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::error::Axis;

    fn window_2d() -> WindowSize {
        WindowSize::new(6, 1, 4)
    }

    fn grid_2d() -> GridBox {
        GridBox::new(
            GridSize::from(window_2d()),
            window_2d(),
            CellDimensions::uniform(10.0),
            20,
            1e-3,
        )
        .unwrap()
    }

    // ========================================================================
    // Construction Tests
    // ========================================================================

    #[test]
    fn test_new_allocates_window_arrays() {
        let grid = grid_2d();
        assert_eq!(grid.pressure_current.len(), 24);
        assert_eq!(grid.pressure_next.len(), 24);
        assert_eq!(grid.particle_velocity_x.len(), 24);
        assert_eq!(grid.particle_velocity_z.len(), 24);
        assert!(grid.particle_velocity_y.is_empty());
        assert_eq!(grid.nt(), 20);
        assert_eq!(grid.dt(), 1e-3);
    }

    #[test]
    fn test_new_rejects_zero_steps() {
        let result = GridBox::new(
            GridSize::from(window_2d()),
            window_2d(),
            CellDimensions::uniform(10.0),
            0,
            1e-3,
        );
        assert_eq!(result.unwrap_err(), GridError::InvalidStepCount(0));
    }

    #[test]
    fn test_new_rejects_bad_time_step() {
        for dt in [0.0, -1e-3, f32::NAN, f32::INFINITY] {
            let result = GridBox::new(
                GridSize::from(window_2d()),
                window_2d(),
                CellDimensions::uniform(10.0),
                10,
                dt,
            );
            assert!(matches!(result, Err(GridError::InvalidTimeStep(_))));
        }
    }

    #[test]
    fn test_new_rejects_window_outside_grid() {
        let result = GridBox::new(
            GridSize::new(6, 1, 3),
            window_2d(),
            CellDimensions::uniform(10.0),
            10,
            1e-3,
        );
        assert!(matches!(
            result,
            Err(GridError::WindowExceedsGrid { axis: Axis::Z, .. })
        ));
    }

    // ========================================================================
    // Velocity Model Tests
    // ========================================================================

    #[test]
    fn test_set_velocity_checks_length() {
        let grid = grid_2d();
        let err = grid.with_velocity(vec![1500.0; 5].into()).unwrap_err();
        assert_eq!(
            err,
            GridError::VelocityLength {
                expected: 24,
                actual: 5
            }
        );
    }

    #[test]
    fn test_set_velocity_shares_model() {
        let model: Arc<[f32]> = vec![2000.0; 24].into();
        let grid = grid_2d().with_velocity(Arc::clone(&model)).unwrap();
        assert!(Arc::ptr_eq(grid.velocity(), &model));
    }

    // ========================================================================
    // Mutation Tests
    // ========================================================================

    #[test]
    fn test_zero_particle_velocities_3d() {
        let window = WindowSize::new(3, 2, 3);
        let mut grid = GridBox::new(
            GridSize::from(window),
            window,
            CellDimensions::uniform(1.0),
            4,
            0.5,
        )
        .unwrap();
        grid.particle_velocity_x.fill(1.0);
        grid.particle_velocity_y.fill(2.0);
        grid.particle_velocity_z.fill(3.0);

        grid.zero_particle_velocities();

        assert!(grid.particle_velocity_x.iter().all(|&v| v == 0.0));
        assert!(grid.particle_velocity_y.iter().all(|&v| v == 0.0));
        assert!(grid.particle_velocity_z.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_resize_window_reallocates() {
        let mut grid = GridBox::new(
            GridSize::new(10, 1, 10),
            window_2d(),
            CellDimensions::uniform(10.0),
            20,
            1e-3,
        )
        .unwrap();
        grid.resize_window(WindowSize::new(8, 1, 8)).unwrap();

        assert_eq!(grid.window_size().sample_count(), 64);
        assert_eq!(grid.pressure_current.len(), 64);
        assert_eq!(grid.velocity().len(), 64);
    }
}
