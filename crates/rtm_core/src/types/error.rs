//! Error types for grid construction.
//!
//! This module provides:
//! - `GridError`: Errors from building or resizing a [`GridBox`](crate::grid::GridBox)

use thiserror::Error;

/// Spatial axis of a grid, used for error context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Axis {
    /// Fastest-varying horizontal axis.
    X,
    /// Cross-line axis (length 1 for 2-D runs).
    Y,
    /// Depth axis.
    Z,
}

impl std::fmt::Display for Axis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Axis::X => write!(f, "x"),
            Axis::Y => write!(f, "y"),
            Axis::Z => write!(f, "z"),
        }
    }
}

/// Grid construction errors.
///
/// # Variants
/// - `ZeroDimension`: A window or grid axis has length zero
/// - `WindowExceedsGrid`: The computation window is larger than the grid
/// - `InvalidTimeStep`: `dt` is not a positive finite number
/// - `InvalidStepCount`: `nt` is zero
/// - `VelocityLength`: Velocity model does not cover the window
/// - `SizeOverflow`: Sample count does not fit in `usize`
///
/// # Examples
/// ```
/// use rtm_core::types::error::{Axis, GridError};
///
/// let err = GridError::ZeroDimension { axis: Axis::Z };
/// assert_eq!(format!("{}", err), "Dimension z must be non-zero");
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GridError {
    /// A window or grid axis has length zero.
    #[error("Dimension {axis} must be non-zero")]
    ZeroDimension {
        /// Offending axis
        axis: Axis,
    },

    /// The computation window is larger than the full grid along an axis.
    #[error("Window length {window} exceeds grid length {grid} along {axis}")]
    WindowExceedsGrid {
        /// Offending axis
        axis: Axis,
        /// Window length along the axis
        window: usize,
        /// Grid length along the axis
        grid: usize,
    },

    /// Time step is not a positive finite number.
    #[error("Invalid time step: {0}")]
    InvalidTimeStep(f32),

    /// Number of time steps is zero.
    #[error("Invalid step count {0}: at least one step is required")]
    InvalidStepCount(usize),

    /// Velocity model does not have one sample per window point.
    #[error("Velocity model has {actual} samples, expected {expected}")]
    VelocityLength {
        /// Window sample count
        expected: usize,
        /// Provided sample count
        actual: usize,
    },

    /// Product of the dimensions overflows `usize`.
    #[error("Sample count overflows for dimensions {nx}x{ny}x{nz}")]
    SizeOverflow {
        /// Length along x
        nx: usize,
        /// Length along y
        ny: usize,
        /// Length along z
        nz: usize,
    },
}
