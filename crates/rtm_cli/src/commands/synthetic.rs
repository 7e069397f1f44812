//! Synthetic staggered-grid acoustic propagator used to drive replay runs.
//!
//! Constant density, second-order staggered differences, Ricker point
//! source. Good enough to produce realistic wavefield frames; not a
//! production stencil.

use std::f32::consts::PI;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rtm_core::types::{CellDimensions, WindowSize};

/// Ricker wavelet with peak frequency `freq` Hz, delayed by one period.
pub fn ricker(freq: f32, time: f32) -> f32 {
    let tau = time - 1.0 / freq;
    let arg = (PI * freq * tau).powi(2);
    (1.0 - 2.0 * arg) * (-arg).exp()
}

/// Velocity model of `base` m/s with uniform random perturbation of
/// `±perturbation` (fraction), reproducible from `seed`.
pub fn velocity_model(window: WindowSize, base: f32, perturbation: f32, seed: u64) -> Arc<[f32]> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..window.sample_count())
        .map(|_| {
            if perturbation > 0.0 {
                base * (1.0 + rng.gen_range(-perturbation..perturbation))
            } else {
                base
            }
        })
        .collect::<Vec<_>>()
        .into()
}

/// Largest Courant number of a model, `v_max * dt * sqrt(dims) / h_min`.
pub fn courant_number(velocity: &[f32], cells: CellDimensions, dt: f32, is_3d: bool) -> f32 {
    let v_max = velocity.iter().fold(0.0f32, |m, &v| m.max(v));
    let h_min = if is_3d {
        cells.dx.min(cells.dy).min(cells.dz)
    } else {
        cells.dx.min(cells.dz)
    };
    let dims: f32 = if is_3d { 3.0 } else { 2.0 };
    v_max * dt * dims.sqrt() / h_min
}

/// Particle-velocity arrays of the simulation.
pub struct ParticleVelocity<'a> {
    /// x component
    pub x: &'a mut [f32],
    /// y component (empty for 2-D)
    pub y: &'a mut [f32],
    /// z component
    pub z: &'a mut [f32],
}

/// Staggered pressure/particle-velocity propagator.
pub struct Propagator {
    window: WindowSize,
    cells: CellDimensions,
    dt: f32,
    velocity: Arc<[f32]>,
}

impl Propagator {
    /// Creates a propagator over `window` with the given model.
    pub fn new(window: WindowSize, cells: CellDimensions, dt: f32, velocity: Arc<[f32]>) -> Self {
        Self {
            window,
            cells,
            dt,
            velocity,
        }
    }

    /// Advances one step: updates particle velocities from `current`, then
    /// writes the pressure of the next time level into `next`.
    pub fn step(&self, current: &[f32], next: &mut [f32], v: ParticleVelocity<'_>) {
        let WindowSize { nx, ny, nz } = self.window;
        let dt = self.dt;
        let plane = nx * nz;

        for iy in 0..ny {
            for iz in 0..nz {
                for ix in 0..nx {
                    let i = self.window.index(ix, iy, iz);
                    if ix + 1 < nx {
                        v.x[i] -= dt / self.cells.dx * (current[i + 1] - current[i]);
                    }
                    if iz + 1 < nz {
                        v.z[i] -= dt / self.cells.dz * (current[i + nx] - current[i]);
                    }
                    if ny > 1 && iy + 1 < ny {
                        v.y[i] -= dt / self.cells.dy * (current[i + plane] - current[i]);
                    }
                }
            }
        }

        for iy in 0..ny {
            for iz in 0..nz {
                for ix in 0..nx {
                    let i = self.window.index(ix, iy, iz);
                    let back_x = if ix > 0 { v.x[i - 1] } else { 0.0 };
                    let back_z = if iz > 0 { v.z[i - nx] } else { 0.0 };
                    let mut div = (v.x[i] - back_x) / self.cells.dx + (v.z[i] - back_z) / self.cells.dz;
                    if ny > 1 {
                        let back_y = if iy > 0 { v.y[i - plane] } else { 0.0 };
                        div += (v.y[i] - back_y) / self.cells.dy;
                    }
                    let c = self.velocity[i];
                    next[i] = current[i] - dt * c * c * div;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ricker_peak_at_delay() {
        let freq = 20.0;
        approx::assert_relative_eq!(ricker(freq, 1.0 / freq), 1.0);
        assert!(ricker(freq, 0.0).abs() < 1e-3);
    }

    #[test]
    fn test_velocity_model_reproducible() {
        let window = WindowSize::new(4, 1, 4);
        let a = velocity_model(window, 2000.0, 0.1, 3);
        let b = velocity_model(window, 2000.0, 0.1, 3);
        assert_eq!(a, b);
        assert!(a.iter().all(|&v| (1800.0..=2200.0).contains(&v)));
        assert!(velocity_model(window, 1500.0, 0.0, 0).iter().all(|&v| v == 1500.0));
    }

    #[test]
    fn test_courant_number() {
        let cfl = courant_number(&[1000.0, 2000.0], CellDimensions::uniform(10.0), 1e-3, false);
        approx::assert_relative_eq!(cfl, 0.2 * 2f32.sqrt(), epsilon = 1e-6);
    }

    #[test]
    fn test_quiet_field_stays_quiet() {
        let window = WindowSize::new(5, 1, 5);
        let n = window.sample_count();
        let prop = Propagator::new(
            window,
            CellDimensions::uniform(10.0),
            1e-3,
            velocity_model(window, 1500.0, 0.0, 0),
        );
        let current = vec![0.0; n];
        let mut next = vec![1.0; n];
        let (mut vx, mut vz) = (vec![0.0; n], vec![0.0; n]);
        prop.step(
            &current,
            &mut next,
            ParticleVelocity {
                x: &mut vx,
                y: &mut [],
                z: &mut vz,
            },
        );
        assert!(next.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_impulse_spreads_to_neighbours() {
        let window = WindowSize::new(5, 1, 5);
        let n = window.sample_count();
        let prop = Propagator::new(
            window,
            CellDimensions::uniform(10.0),
            1e-3,
            velocity_model(window, 1500.0, 0.0, 0),
        );
        let mut current = vec![0.0; n];
        current[window.index(2, 0, 2)] = 1.0;
        let mut next = vec![0.0; n];
        let (mut vx, mut vz) = (vec![0.0; n], vec![0.0; n]);
        prop.step(
            &current,
            &mut next,
            ParticleVelocity {
                x: &mut vx,
                y: &mut [],
                z: &mut vz,
            },
        );

        assert!(next[window.index(2, 0, 2)] < 1.0);
        assert!(next[window.index(1, 0, 2)] > 0.0);
        assert!(next[window.index(2, 0, 3)] > 0.0);
        assert_eq!(next[window.index(0, 0, 0)], 0.0);
    }
}
