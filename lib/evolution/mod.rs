//! Unitary time evolution of density matrices.
//!
//! Evolution operators `U(t) = exp(-i H t)` (with ħ = 1) are computed from the
//! eigendecomposition of `H` and memoized per Hamiltonian version and time, so
//! repeated queries against the same static Hamiltonian cost a single
//! diagonalization. See [`sequence`] for time-dependent Hamiltonians.

use std::{ cell::RefCell, rc::Rc };
use ndarray as nd;
use num_complex::Complex64 as C64;
use rustc_hash::FxHashMap as HashMap;
use crate::{
    error::MarkerResult,
    hamiltonian::Hamiltonian,
    operators::eigh_retry,
};

pub mod sequence;
pub use sequence::{ Binding, Evolution, EvolutionSpec, Frame, HamiltonianFn, hamiltonian_fn };

/// Computes the evolution operator of a Hermitian generator.
pub trait Exponentiate {
    /// Return `exp(-i H t)`.
    fn propagator(&self, H: &nd::Array2<C64>, t: f64) -> MarkerResult<nd::Array2<C64>>;
}

/// Exact exponentiation by diagonalization,
/// ```text
/// exp(-i H t) = V exp(-i E t) V†
/// ```
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct EighExp;

impl Exponentiate for EighExp {
    fn propagator(&self, H: &nd::Array2<C64>, t: f64) -> MarkerResult<nd::Array2<C64>> {
        let (E, V) = eigh_retry(H)?;
        let phases: nd::Array1<C64> = E.mapv(|e| C64::cis(-e * t));
        Ok((&V * &phases).dot(&V.t().mapv(|v| v.conj())))
    }
}

/// Memo of evolution operators keyed by Hamiltonian
/// [version][Hamiltonian::version] and time.
///
/// Entries are never evicted. Keys refer to the version rather than the
/// contents of a Hamiltonian: [`Hamiltonian::apply_gauge_field`] and
/// [`Hamiltonian::apply_zones`] assign new versions, but a matrix rebuilt with
/// identical contents is a new key all the same.
#[derive(Debug, Default)]
pub struct EvolutionCache<E = EighExp> {
    exp: E,
    memo: HashMap<(u64, u64), Rc<nd::Array2<C64>>>,
}

impl<E> EvolutionCache<E>
where E: Exponentiate
{
    /// Create a new, empty cache computing propagators with `exp`.
    pub fn new(exp: E) -> Self { Self { exp, memo: HashMap::default() } }

    /// Return `exp(-i H t)`, computing it only if it has not been requested
    /// before for the same version of `H` and the same `t`.
    pub fn get(&mut self, H: &Hamiltonian, t: f64) -> MarkerResult<Rc<nd::Array2<C64>>> {
        let key = (H.version(), t.to_bits());
        if let Some(U) = self.memo.get(&key) {
            log::trace!("evolution cache hit: version {}, t = {}", key.0, t);
            return Ok(Rc::clone(U));
        }
        log::debug!(
            "evolution cache miss: version {}, t = {}, dim = {}",
            key.0, t, H.nrows(),
        );
        let U = Rc::new(self.exp.propagator(H, t)?);
        self.memo.insert(key, Rc::clone(&U));
        Ok(U)
    }

    /// Number of stored propagators.
    pub fn len(&self) -> usize { self.memo.len() }

    /// Return `true` if no propagators are stored.
    pub fn is_empty(&self) -> bool { self.memo.is_empty() }

    /// Reference to the exponentiation routine.
    pub fn exponentiator(&self) -> &E { &self.exp }
}

thread_local! {
    static CACHE: RefCell<EvolutionCache> = RefCell::new(EvolutionCache::default());
}

/// Compute the evolution operator `U(t) = exp(-i H t)` for a time-independent
/// Hamiltonian.
///
/// Results are stored in a per-thread [`EvolutionCache`] for the lifetime of
/// the thread, so calling this again with the same `H` (same version) and `t`
/// returns the same matrix without recomputation.
pub fn evolution_operator(H: &Hamiltonian, t: f64) -> MarkerResult<Rc<nd::Array2<C64>>> {
    CACHE.with(|cache| cache.borrow_mut().get(H, t))
}
