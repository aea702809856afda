//! Vector potentials and the Peierls phases they induce on lattice bonds.
//!
//! Magnetic fields are given in units of flux quanta per unit cell, so that a
//! uniform field `B` threads a phase `2πB` around every plaquette.

use std::f64::consts::TAU;
use crate::error::{ MarkerError, MarkerResult };

/// A vector potential `A(r)` over the lattice plane.
///
/// Potentials may be given with two or three components; a third component is
/// ignored since all bonds lie in the plane. Any closure taking a position
/// `[x, y]` and returning something convertible to a `Vec<f64>` (e.g.
/// `[f64; 2]` or `Vec<f64>`) is a `GaugeField`.
pub trait GaugeField {
    /// Evaluate the potential at a position.
    fn potential(&self, r: [f64; 2]) -> Vec<f64>;
}

impl<F, V> GaugeField for F
where
    F: Fn([f64; 2]) -> V,
    V: Into<Vec<f64>>,
{
    fn potential(&self, r: [f64; 2]) -> Vec<f64> { self(r).into() }
}

fn planar(a: Vec<f64>) -> MarkerResult<[f64; 2]> {
    match a.len() {
        2 | 3 => Ok([a[0], a[1]]),
        n => Err(MarkerError::TypeMismatch(format!(
            "gauge potential must have 2 or 3 components, got {}", n))),
    }
}

/// Compute the Peierls phase `φ = 2π ∫ A(r)·dr` along the straight segment
/// from `start` to `end`.
///
/// The line integral is evaluated by the composite midpoint rule over
/// `intervals` equal sub-segments, which is exact for potentials linear in
/// position. Fails if `intervals` is zero.
pub fn peierls_phase<G>(A: &G, start: [f64; 2], end: [f64; 2], intervals: usize)
    -> MarkerResult<f64>
where G: GaugeField + ?Sized
{
    if intervals == 0 {
        return Err(MarkerError::InvalidParameter(
            "peierls phase needs at least one integration interval".into()));
    }
    let n = intervals;
    let d: [f64; 2] = [end[0] - start[0], end[1] - start[1]];
    let mut acc: f64 = 0.0;
    let mut a: [f64; 2];
    let mut f: f64;
    for k in 0..n {
        f = (k as f64 + 0.5) / n as f64;
        a = planar(A.potential([start[0] + f * d[0], start[1] + f * d[1]]))?;
        acc += a[0] * d[0] + a[1] * d[1];
    }
    Ok(TAU * acc / n as f64)
}

/// Landau-gauge potential `A = (0, B x)` for a uniform field `B`.
pub fn landau(B: f64) -> impl Fn([f64; 2]) -> [f64; 2] + Clone {
    move |r: [f64; 2]| [0.0, B * r[0]]
}

/// Symmetric-gauge potential for a uniform field `B`, centered on the origin.
pub fn symmetric(B: f64) -> impl Fn([f64; 2]) -> [f64; 2] + Clone {
    symmetric_about(B, [0.0, 0.0])
}

/// Symmetric-gauge potential `A = (B/2) (-(y - y₀), x - x₀)` for a uniform
/// field `B`, centered on `center = [x₀, y₀]`.
pub fn symmetric_about(B: f64, center: [f64; 2])
    -> impl Fn([f64; 2]) -> [f64; 2] + Clone
{
    move |r: [f64; 2]| {
        [-0.5 * B * (r[1] - center[1]), 0.5 * B * (r[0] - center[0])]
    }
}

/// Potential of an infinitely thin solenoid carrying `phi` flux quanta through
/// `point`.
///
/// The potential is singular at `point` itself, so it should be placed away
/// from lattice sites and bonds (e.g. at the center of a plaquette).
pub fn flux(phi: f64, point: [f64; 2]) -> impl Fn([f64; 2]) -> [f64; 2] + Clone {
    move |r: [f64; 2]| {
        let dx = r[0] - point[0];
        let dy = r[1] - point[1];
        let r2 = dx * dx + dy * dy;
        if r2 == 0.0 {
            [0.0, 0.0]
        } else {
            let k = phi / (TAU * r2);
            [-k * dy, k * dx]
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn plaquette<G: GaugeField>(A: &G, corner: [f64; 2]) -> f64 {
        let [x, y] = corner;
        let corners = [[x, y], [x + 1.0, y], [x + 1.0, y + 1.0], [x, y + 1.0], [x, y]];
        corners.windows(2)
            .map(|w| peierls_phase(A, w[0], w[1], 10).unwrap())
            .sum()
    }

    #[test]
    fn constant_potential() {
        let A = |_: [f64; 2]| [0.25, -0.5];
        let phi = peierls_phase(&A, [1.0, 1.0], [2.0, 3.0], 10).unwrap();
        assert!((phi - TAU * (0.25 - 1.0)).abs() < 1e-12);
    }

    #[test]
    fn uniform_field_flux() {
        let B = 0.1;
        assert!((plaquette(&landau(B), [2.0, 3.0]) - TAU * B).abs() < 1e-10);
        assert!((plaquette(&symmetric(B), [-1.0, 4.0]) - TAU * B).abs() < 1e-10);
        assert!(
            (plaquette(&symmetric_about(B, [7.5, 7.5]), [0.0, 0.0]) - TAU * B)
            .abs() < 1e-10
        );
    }

    #[test]
    fn flux_tube_winding() {
        let A = flux(0.3, [0.5, 0.5]);
        // around the threaded plaquette the phase is 2πΦ; elsewhere it vanishes
        // only in the limit of fine integration, so keep the tolerance loose
        let inside = plaquette(&A, [0.0, 0.0]);
        assert!((inside - TAU * 0.3).abs() < 1e-2);
        let outside = plaquette(&A, [3.0, 3.0]);
        assert!(outside.abs() < 1e-2);
    }

    #[test]
    fn three_components_accepted() {
        let A = |r: [f64; 2]| vec![0.0, 0.1 * r[0], 5.0];
        let phi = peierls_phase(&A, [2.0, 0.0], [2.0, 1.0], 10).unwrap();
        assert!((phi - TAU * 0.2).abs() < 1e-12);
    }

    #[test]
    fn scalar_potential_rejected() {
        let A = |_: [f64; 2]| vec![1.0];
        assert!(matches!(
            peierls_phase(&A, [0.0, 0.0], [1.0, 0.0], 10),
            Err(MarkerError::TypeMismatch(_))
        ));
    }

    #[test]
    fn zero_intervals_rejected() {
        let A = landau(0.1);
        assert!(matches!(
            peierls_phase(&A, [0.0, 0.0], [0.0, 1.0], 0),
            Err(MarkerError::InvalidParameter(_))
        ));
    }
}
