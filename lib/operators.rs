//! Ground-state projectors, position operators, and bond currents.

use ndarray::{ self as nd, s };
use ndarray_linalg::{ Eigh, UPLO, error::LinalgError };
use num_complex::Complex64 as C64;
use crate::{
    error::{ MarkerError, MarkerResult },
    hamiltonian::resolve_size,
    lattice::LatticeSize,
};

fn check_square(name: &str, A: &nd::Array2<C64>) -> MarkerResult<()> {
    if !A.is_square() {
        return Err(MarkerError::ShapeMismatch(format!(
            "{} must be square, got {:?}", name, A.dim())));
    }
    Ok(())
}

/// Diagonalize a Hermitian matrix, retrying once with its explicitly
/// symmetrized part `(H + H†) / 2` if the first attempt fails.
pub(crate) fn eigh_retry(H: &nd::Array2<C64>)
    -> MarkerResult<(nd::Array1<f64>, nd::Array2<C64>)>
{
    eigh_retry_with(H, |A| A.eigh(UPLO::Lower))
}

type EighResult = Result<(nd::Array1<f64>, nd::Array2<C64>), LinalgError>;

fn eigh_retry_with<F>(H: &nd::Array2<C64>, mut eigh: F)
    -> MarkerResult<(nd::Array1<f64>, nd::Array2<C64>)>
where F: FnMut(&nd::Array2<C64>) -> EighResult
{
    match eigh(H) {
        Ok(EV) => Ok(EV),
        Err(err) => {
            log::warn!("eigh failed ({}); retrying with symmetrized input", err);
            let Hs: nd::Array2<C64>
                = (H + &H.t().mapv(|h| h.conj())).mapv(|h| h / 2.0);
            eigh(&Hs)
                .map_err(|err| MarkerError::ConvergenceFailure(err.to_string()))
        },
    }
}

/// Compute the zero-temperature density matrix, projecting onto all
/// eigenstates of `H` with energy at or below `fermi_level`.
///
/// The projector is assembled exactly from a full eigendecomposition, so
/// `P² = P` holds to floating-point precision.
pub fn filled_projector(H: &nd::Array2<C64>, fermi_level: f64)
    -> MarkerResult<nd::Array2<C64>>
{
    check_square("hamiltonian", H)?;
    let (E, V) = eigh_retry(H)?;
    let filled: Vec<usize>
        = E.iter().enumerate()
        .filter_map(|(k, e)| (*e <= fermi_level).then_some(k))
        .collect();
    if filled.is_empty() { return Ok(nd::Array2::zeros(H.dim())); }
    let Vf: nd::Array2<C64> = V.select(nd::Axis(1), &filled);
    Ok(Vf.dot(&Vf.t().mapv(|v| v.conj())))
}

/// Generate the position operators `X` and `Y`.
///
/// Both are diagonal, with each site's coordinate repeated over its two
/// internal components. If `symmetric` is `true`, the origin is placed at the
/// center of the lattice instead of its bottom-left site. If `size` is `None`,
/// the size of the Hamiltonian most recently built on this thread is used.
pub fn coord_operators(size: Option<LatticeSize>, symmetric: bool)
    -> MarkerResult<(nd::Array2<C64>, nd::Array2<C64>)>
{
    let size = resolve_size(size)?;
    let (x0, y0)
        = if symmetric {
            ((size.cols() - 1) as f64 / 2.0, (size.rows() - 1) as f64 / 2.0)
        } else {
            (0.0, 0.0)
        };
    let mut x: nd::Array1<C64> = nd::Array1::zeros(size.dim());
    let mut y: nd::Array1<C64> = nd::Array1::zeros(size.dim());
    let mut r: [f64; 2];
    for (k, coord) in size.coords().enumerate() {
        r = size.position(coord);
        x.slice_mut(s![2 * k..2 * k + 2]).fill(C64::from(r[0] - x0));
        y.slice_mut(s![2 * k..2 * k + 2]).fill(C64::from(r[1] - y0));
    }
    Ok((nd::Array2::from_diag(&x), nd::Array2::from_diag(&y)))
}

/// Compute electric currents between sites.
///
/// The result is a real `N × N` matrix over sites (not internal components)
/// whose `(i, j)` entry is the net current flowing from site `i` to site `j`,
/// ```text
/// J_ij = -2 Im Tr[ H_ij P_ji ]
/// ```
/// with the trace taken over the internal degree of freedom. This is exactly
/// skew-symmetric, and non-zero only between sites directly coupled by `H`.
///
/// If `size` is given, the operators must match it; otherwise the number of
/// sites is read off their dimension.
pub fn currents(H: &nd::Array2<C64>, P: &nd::Array2<C64>, size: Option<LatticeSize>)
    -> MarkerResult<nd::Array2<f64>>
{
    check_square("hamiltonian", H)?;
    check_square("density matrix", P)?;
    if H.dim() != P.dim() {
        return Err(MarkerError::ShapeMismatch(format!(
            "hamiltonian is {:?} but density matrix is {:?}", H.dim(), P.dim())));
    }
    if let Some(size) = size { size.check_dim(H.nrows())?; }
    if H.nrows() % 2 != 0 {
        return Err(MarkerError::ShapeMismatch(format!(
            "operator dimension {} is not a multiple of 2", H.nrows())));
    }
    let n = H.nrows() / 2;
    let mut J: nd::Array2<f64> = nd::Array2::zeros((n, n));
    let mut Hij: nd::ArrayView2<C64>;
    let mut Pji: nd::ArrayView2<C64>;
    let mut tr: C64;
    for i in 0..n {
        for j in 0..i {
            Hij = H.slice(s![2 * i..2 * i + 2, 2 * j..2 * j + 2]);
            if Hij.iter().all(|h| *h == C64::from(0.0)) { continue; }
            Pji = P.slice(s![2 * j..2 * j + 2, 2 * i..2 * i + 2]);
            tr = Hij.dot(&Pji).diag().sum();
            J[[i, j]] = -2.0 * tr.im;
            J[[j, i]] = -J[[i, j]];
        }
    }
    Ok(J)
}
