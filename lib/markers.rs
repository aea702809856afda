//! Local topological markers and site-resolved observables.

use std::f64::consts::PI;
use ndarray::{ self as nd, s };
use num_complex::Complex64 as C64;
use crate::{
    c,
    error::{ MarkerError, MarkerResult },
    hamiltonian::resolve_size,
    lattice::{ CoordinateMap, LatticeSize },
};

fn check_same_dim(ops: &[&nd::Array2<C64>]) -> MarkerResult<()> {
    let Some(first) = ops.first() else { return Ok(()); };
    if !first.is_square() || ops.iter().any(|op| op.dim() != first.dim()) {
        return Err(MarkerError::ShapeMismatch(format!(
            "operators must be square and of equal size, got {:?}",
            ops.iter().map(|op| op.dim()).collect::<Vec<_>>(),
        )));
    }
    Ok(())
}

/// Local Chern marker operator `-4πi P X P Y P`.
///
/// Its site-resolved diagonal (see [`site_trace`]) approaches the Chern number
/// deep inside a gapped region.
pub fn local_chern_marker(
    P: &nd::Array2<C64>,
    X: &nd::Array2<C64>,
    Y: &nd::Array2<C64>,
) -> MarkerResult<nd::Array2<C64>>
{
    check_same_dim(&[P, X, Y])?;
    let PXP = P.dot(X).dot(P);
    let YP = Y.dot(P);
    Ok(PXP.dot(&YP).mapv(|a| c!(i -4.0 * PI) * a))
}

/// Streda response `(P_B - P_0) / B` of the density matrix to a weak uniform
/// field `B`.
pub fn streda_marker(P_B: &nd::Array2<C64>, P_0: &nd::Array2<C64>, B: f64)
    -> MarkerResult<nd::Array2<C64>>
{
    check_same_dim(&[P_B, P_0])?;
    Ok((P_B - P_0).mapv(|p| p / B))
}

/// Collect the site-resolved expectation values `Σ_σ Re⟨r σ|O|r σ⟩` of an
/// operator, traced over the internal degree of freedom.
///
/// If `size` is `None`, the size of the Hamiltonian most recently built on this
/// thread is used.
pub fn site_trace(O: &nd::Array2<C64>, size: Option<LatticeSize>)
    -> MarkerResult<CoordinateMap<f64>>
{
    let size = resolve_size(size)?;
    size.check_dim(O.nrows())?;
    size.check_dim(O.ncols())?;
    Ok(CoordinateMap::from_fn(size, |coord| {
        let k = size.to_linear(coord);
        O.slice(s![2 * k..2 * k + 2, 2 * k..2 * k + 2]).diag().sum().re
    }))
}

/// Build a skew-symmetric matrix of currents between sites from a function of
/// site index pairs.
///
/// `f(i, j)` is evaluated once for every pair `i > j` and should give the
/// current flowing from site `i` to site `j`. If `size` is `None`, the size of
/// the Hamiltonian most recently built on this thread is used.
pub fn currents_with<F>(size: Option<LatticeSize>, mut f: F)
    -> MarkerResult<nd::Array2<f64>>
where F: FnMut(usize, usize) -> f64
{
    let n = resolve_size(size)?.sites();
    let mut J: nd::Array2<f64> = nd::Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..i {
            J[[i, j]] = f(i, j);
            J[[j, i]] = -J[[i, j]];
        }
    }
    Ok(J)
}

/// Bond currents of a general site-resolved quantity `O` under `H`, as a
/// function of site index pairs for use with [`currents_with`].
///
/// The current from site `i` to site `j` is
/// ```text
/// J_ij = -Im[ tr(H_ij O_ji) - tr(O_ij H_ji) ]
/// ```
/// with traces over the internal degree of freedom. `J` is antisymmetric and
/// obeys the continuity equation
/// ```text
/// -Σ_j J_ij = Re tr_i( -i [H, O] )
/// ```
/// at every site `i`. For Hermitian `O` this is `-2 Im tr(H_ij O_ji)`, the
/// usual electric current when `O` is the density matrix.
pub fn operator_current<'a>(H: &'a nd::Array2<C64>, O: nd::Array2<C64>)
    -> MarkerResult<impl Fn(usize, usize) -> f64 + 'a>
{
    check_same_dim(&[H, &O])?;
    if H.nrows() % 2 != 0 {
        return Err(MarkerError::ShapeMismatch(format!(
            "operator dimension {} is not a multiple of 2", H.nrows())));
    }
    Ok(move |i: usize, j: usize| {
        let (ii, jj) = (2 * i..2 * i + 2, 2 * j..2 * j + 2);
        let fwd = H.slice(s![ii.clone(), jj.clone()])
            .dot(&O.slice(s![jj.clone(), ii.clone()])).diag().sum();
        let bwd = O.slice(s![ii.clone(), jj.clone()])
            .dot(&H.slice(s![jj, ii])).diag().sum();
        -(fwd - bwd).im
    })
}

/// Bond currents of the [local Chern marker][local_chern_marker] of `P`.
///
/// Unlike electric currents these are not restricted to the support of the
/// density matrix near a bond: every site pair connected by `H` can carry
/// marker current.
pub fn lcm_current<'a>(
    H: &'a nd::Array2<C64>,
    P: &nd::Array2<C64>,
    X: &nd::Array2<C64>,
    Y: &nd::Array2<C64>,
) -> MarkerResult<impl Fn(usize, usize) -> f64 + 'a>
{
    check_same_dim(&[H, P, X, Y])?;
    operator_current(H, local_chern_marker(P, X, Y)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        gauge::landau,
        hamiltonian::{ HParams, hamiltonian },
        lattice::Convention,
        evolution::evolution_operator,
        operators::{ coord_operators, currents, filled_projector, test::max_abs_diff },
    };

    fn marker_at_center(m: f64) -> (f64, f64) {
        let size = LatticeSize::new(12, 12).unwrap();
        let H = hamiltonian(&CoordinateMap::from_elem(size, m), &HParams::new())
            .unwrap();
        let P = filled_projector(&H, 0.0).unwrap();
        let (X, Y) = coord_operators(None, true).unwrap();
        let ch = site_trace(&local_chern_marker(&P, &X, &Y).unwrap(), None).unwrap();
        (ch[(6, 6)], ch.iter().sum())
    }

    #[test]
    fn chern_marker_bulk() {
        let (topo, total) = marker_at_center(1.0);
        assert!((topo.abs() - 1.0).abs() < 0.1);
        // edge contributions cancel the bulk on an open lattice
        assert!(total.abs() < 1e-8);
        let (trivial, _) = marker_at_center(3.0);
        assert!(trivial.abs() < 0.1);
    }

    #[test]
    fn site_trace_reads_density() {
        let size = LatticeSize::new(3, 4).unwrap();
        let mass = CoordinateMap::new(
            nd::Array2::from_shape_fn((3, 4), |(r, c)| (r + c) as f64 - 2.5),
            Convention::Coordinate,
        ).unwrap();
        let H = hamiltonian(&mass, &HParams::new()).unwrap();
        let P = filled_projector(&H, 0.0).unwrap();
        let rho = site_trace(&P, Some(size)).unwrap();
        let total: f64 = rho.iter().sum();
        assert!((total - P.diag().sum().re).abs() < 1e-10);
        assert!(rho.iter().all(|n| (-1e-10..=2.0 + 1e-10).contains(n)));
    }

    #[test]
    fn streda_of_zero_field_vanishes() {
        let size = LatticeSize::new(4, 4).unwrap();
        let mass = CoordinateMap::from_elem(size, 1.0);
        let P0 = filled_projector(&hamiltonian(&mass, &HParams::new()).unwrap(), 0.0)
            .unwrap();
        let A = landau(0.01);
        let HB = hamiltonian(&mass, &HParams::new().field(&A)).unwrap();
        let PB = filled_projector(&HB, 0.0).unwrap();
        let resp = streda_marker(&PB, &P0, 0.01).unwrap();
        assert_eq!(resp.dim(), (32, 32));
        let same = streda_marker(&P0, &P0, 0.01).unwrap();
        assert!(same.iter().all(|s| s.norm() == 0.0));
        assert!(matches!(
            streda_marker(&PB, &P0.slice(s![..30, ..30]).to_owned(), 0.01),
            Err(MarkerError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn custom_currents_match_electric() {
        let size = LatticeSize::new(4, 3).unwrap();
        let A = landau(0.1);
        let H = hamiltonian(&CoordinateMap::from_elem(size, -1.0), &HParams::new().field(&A))
            .unwrap();
        let P = filled_projector(&H, 0.0).unwrap();
        let J = currents(&H, &P, None).unwrap();
        let Jf = currents_with(None, |i, j| {
            let Hij = H.slice(s![2 * i..2 * i + 2, 2 * j..2 * j + 2]);
            let Pji = P.slice(s![2 * j..2 * j + 2, 2 * i..2 * i + 2]);
            -2.0 * Hij.dot(&Pji).diag().sum().im
        }).unwrap();
        assert_eq!(J, Jf);
    }

    #[test]
    fn lcm_current_continuity() {
        let size = LatticeSize::new(4, 4).unwrap();
        let mass = CoordinateMap::from_elem(size, 1.0);
        let H0 = hamiltonian(&mass, &HParams::new()).unwrap();
        let P0 = filled_projector(&H0, 0.0).unwrap();
        let A = landau(0.1);
        let H = hamiltonian(&mass, &HParams::new().field(&A)).unwrap();
        let U = evolution_operator(&H, 1.5).unwrap();
        let P = U.dot(&P0).dot(&U.t().mapv(|u| u.conj()));
        let (X, Y) = coord_operators(Some(size), true).unwrap();

        let C = local_chern_marker(&P, &X, &Y).unwrap();
        let J = currents_with(Some(size), lcm_current(&H, &P, &X, &Y).unwrap())
            .unwrap();
        let dC = (H.dot(&C) - C.dot(&*H)).mapv(|a| c!(i -1.0) * a);
        let rate = site_trace(&dC, Some(size)).unwrap();
        assert!(rate.iter().any(|r| r.abs() > 1e-6));
        for k in 0..size.sites() {
            let outflow: f64 = J.row(k).sum();
            assert!((-outflow - rate[size.to_coord(k)]).abs() < 1e-8);
        }
        let f = lcm_current(&H, &P, &X, &Y).unwrap();
        assert!((f(5, 6) + f(6, 5)).abs() < 1e-12);
        assert!((f(5, 9) + f(9, 5)).abs() < 1e-12);
        assert!(f(5, 5).abs() < 1e-12);

        // hermitian quantities reduce to the electric current
        let J_el = currents(&H, &P, Some(size)).unwrap();
        let J_op = currents_with(Some(size), operator_current(&H, P.clone()).unwrap())
            .unwrap();
        assert!(max_abs_diff(&J_el.mapv(C64::from), &J_op.mapv(C64::from)) < 1e-10);
        assert!(matches!(
            lcm_current(&H, &P0.slice(s![..30, ..30]).to_owned(), &X, &Y),
            Err(MarkerError::ShapeMismatch(_))
        ));
    }
}
