//! Geometry and error types shared by the simulation and the checkpoint engine.
//!
//! This module provides:
//! - `dims`: Window, grid and cell dimensions
//! - `error`: Structured error types for grid construction
//!
//! # Re-exports
//!
//! For convenience, commonly used types are re-exported at this module level:
//! - [`WindowSize`], [`GridSize`], [`CellDimensions`] from `dims`
//! - [`GridError`] from `error`

pub mod dims;
pub mod error;

pub use dims::{CellDimensions, GridSize, WindowSize};
pub use error::GridError;
