//! Window, grid and cell dimensions.
//!
//! The simulation runs on a full grid but only updates a computation window
//! of it; every pressure snapshot the checkpoint engine handles is sized by
//! the window, never by the full grid.

use super::error::{Axis, GridError};

/// Dimensions of the computation window in grid points.
///
/// Samples are laid out x-fastest, then z, then y.
///
/// # Examples
///
/// ```
/// use rtm_core::types::WindowSize;
///
/// let window = WindowSize::new(100, 1, 80);
/// assert_eq!(window.sample_count(), 8000);
/// assert!(!window.is_3d());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WindowSize {
    /// Points along x.
    pub nx: usize,
    /// Points along y (1 for 2-D runs).
    pub ny: usize,
    /// Points along z.
    pub nz: usize,
}

impl WindowSize {
    /// Creates a window of `nx × ny × nz` points.
    #[inline]
    pub const fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    /// Number of samples in one frame of this window.
    ///
    /// Callers working with unvalidated dimensions should use
    /// [`checked_sample_count`](Self::checked_sample_count).
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Number of samples, or `None` on overflow.
    #[inline]
    pub fn checked_sample_count(&self) -> Option<usize> {
        self.nx.checked_mul(self.ny)?.checked_mul(self.nz)
    }

    /// Returns `true` when the window spans more than one y plane.
    #[inline]
    pub fn is_3d(&self) -> bool {
        self.ny > 1
    }

    /// Flat index of point `(ix, iy, iz)`.
    #[inline]
    pub fn index(&self, ix: usize, iy: usize, iz: usize) -> usize {
        (iy * self.nz + iz) * self.nx + ix
    }

    /// Validates that every axis is non-zero and the sample count fits.
    pub fn validate(&self) -> Result<usize, GridError> {
        for (axis, len) in [(Axis::X, self.nx), (Axis::Y, self.ny), (Axis::Z, self.nz)] {
            if len == 0 {
                return Err(GridError::ZeroDimension { axis });
            }
        }
        self.checked_sample_count().ok_or(GridError::SizeOverflow {
            nx: self.nx,
            ny: self.ny,
            nz: self.nz,
        })
    }
}

/// Dimensions of the full simulation grid in grid points.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridSize {
    /// Points along x.
    pub nx: usize,
    /// Points along y.
    pub ny: usize,
    /// Points along z.
    pub nz: usize,
}

impl GridSize {
    /// Creates a grid of `nx × ny × nz` points.
    #[inline]
    pub const fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    /// Checks that `window` fits inside this grid.
    pub fn contains(&self, window: &WindowSize) -> Result<(), GridError> {
        let axes = [
            (Axis::X, window.nx, self.nx),
            (Axis::Y, window.ny, self.ny),
            (Axis::Z, window.nz, self.nz),
        ];
        for (axis, window, grid) in axes {
            if window > grid {
                return Err(GridError::WindowExceedsGrid { axis, window, grid });
            }
        }
        Ok(())
    }
}

impl From<WindowSize> for GridSize {
    fn from(window: WindowSize) -> Self {
        Self::new(window.nx, window.ny, window.nz)
    }
}

/// Physical spacing between grid points in metres.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellDimensions {
    /// Spacing along x.
    pub dx: f32,
    /// Spacing along y.
    pub dy: f32,
    /// Spacing along z.
    pub dz: f32,
}

impl CellDimensions {
    /// Creates cell dimensions from per-axis spacing.
    #[inline]
    pub const fn new(dx: f32, dy: f32, dz: f32) -> Self {
        Self { dx, dy, dz }
    }

    /// Same spacing on every axis.
    #[inline]
    pub const fn uniform(d: f32) -> Self {
        Self::new(d, d, d)
    }
}
