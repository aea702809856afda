//! Time-stepped evolution under time-dependent Hamiltonians.
//!
//! An [`Evolution`] walks a caller-supplied sequence of time points and, at
//! each, binds a set of named quantities described by [`EvolutionSpec`]s:
//! either the instantaneous Hamiltonian `H(t)`, or a density matrix
//! propagated from its value `P₀` at `t = 0`.
//!
//! Density matrices are propagated with the single-step approximation
//! ```text
//! P(t) = U(t) P₀ U†(t),    U(t) = exp(-i H(t) t)
//! ```
//! i.e. each time point uses the Hamiltonian at that instant as though it had
//! been applied since `t = 0`, not a time-ordered product over the preceding
//! steps. No state is carried between time points.
//!
//! Every frame has its own Hamiltonians and its own time, so propagators are
//! shared only among the specifiers of a single frame and then dropped; they
//! do not go through the per-thread cache behind
//! [`evolution_operator`][crate::evolution::evolution_operator].

use std::rc::Rc;
use indexmap::IndexMap;
use ndarray as nd;
use num_complex::Complex64 as C64;
use crate::{
    error::{ MarkerError, MarkerResult },
    evolution::{ EighExp, Exponentiate },
    hamiltonian::Hamiltonian,
};

/// Heap-allocated [`Fn`] trait object giving the Hamiltonian at a given time.
pub type HamiltonianFn<'a> = Rc<dyn Fn(f64) -> MarkerResult<Hamiltonian> + 'a>;

/// Wrap a closure as a [`HamiltonianFn`].
///
/// Specifiers holding clones of the same `HamiltonianFn` share a single
/// evaluation per time point.
pub fn hamiltonian_fn<'a, F>(f: F) -> HamiltonianFn<'a>
where F: Fn(f64) -> MarkerResult<Hamiltonian> + 'a
{
    Rc::new(f)
}

/// Describes a quantity to be bound at each time point of an [`Evolution`].
#[derive(Clone)]
pub enum EvolutionSpec<'a> {
    /// Bind the instantaneous Hamiltonian `H(t)` to `name`.
    Hamiltonian {
        name: String,
        H: HamiltonianFn<'a>,
    },
    /// Bind the density matrix evolved from `P0` under `H` to `name`.
    Density {
        name: String,
        P0: nd::Array2<C64>,
        H: HamiltonianFn<'a>,
    },
}

impl<'a> std::fmt::Debug for EvolutionSpec<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hamiltonian { name, H: _ } => {
                write!(f, "Hamiltonian {{ name: {:?}, H: Rc<...> }}", name)
            },
            Self::Density { name, P0, H: _ } => {
                write!(f,
                    "Density {{ name: {:?}, P0: {:?}, H: Rc<...> }}",
                    name, P0.dim(),
                )
            },
        }
    }
}

impl<'a> EvolutionSpec<'a> {
    /// Create a new `EvolutionSpec::Hamiltonian`.
    pub fn hamiltonian<S>(name: S, H: &HamiltonianFn<'a>) -> Self
    where S: Into<String>
    {
        Self::Hamiltonian { name: name.into(), H: Rc::clone(H) }
    }

    /// Create a new `EvolutionSpec::Density`.
    pub fn density<S>(name: S, P0: nd::Array2<C64>, H: &HamiltonianFn<'a>) -> Self
    where S: Into<String>
    {
        Self::Density { name: name.into(), P0, H: Rc::clone(H) }
    }

    /// Name under which the quantity is bound.
    pub fn name(&self) -> &str {
        match self {
            Self::Hamiltonian { name, .. } => name,
            Self::Density { name, .. } => name,
        }
    }

    fn hamiltonian_fn(&self) -> &HamiltonianFn<'a> {
        match self {
            Self::Hamiltonian { H, .. } => H,
            Self::Density { H, .. } => H,
        }
    }
}

/// A quantity bound at a single time point.
#[derive(Clone, Debug)]
pub enum Binding {
    Hamiltonian(Rc<Hamiltonian>),
    Density(nd::Array2<C64>),
}

/// All quantities bound at a single time point, in specifier order.
#[derive(Clone, Debug)]
pub struct Frame {
    time: f64,
    bindings: IndexMap<String, Binding>,
}

impl Frame {
    /// Time of this frame.
    pub fn time(&self) -> f64 { self.time }

    /// Look up a binding by name.
    pub fn get(&self, name: &str) -> Option<&Binding> { self.bindings.get(name) }

    /// Look up a Hamiltonian binding by name.
    pub fn hamiltonian(&self, name: &str) -> Option<&Hamiltonian> {
        match self.bindings.get(name)? {
            Binding::Hamiltonian(H) => Some(H.as_ref()),
            Binding::Density(_) => None,
        }
    }

    /// Look up a density matrix binding by name.
    pub fn density(&self, name: &str) -> Option<&nd::Array2<C64>> {
        match self.bindings.get(name)? {
            Binding::Density(P) => Some(P),
            Binding::Hamiltonian(_) => None,
        }
    }

    /// Iterate over all bindings in specifier order.
    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Binding> {
        self.bindings.iter()
    }
}

/// A Hamiltonian evaluated for one frame, with its propagator once needed.
struct Evaluated {
    key: *const (),
    H: Rc<Hamiltonian>,
    U: Option<Rc<nd::Array2<C64>>>,
}

/// Lazy sequence of [`Frame`]s, one per requested time point.
///
/// Each frame is computed when requested by [`Iterator::next`], with
/// propagators computed by `E`.
pub struct Evolution<'a, I, E = EighExp> {
    specs: Vec<EvolutionSpec<'a>>,
    times: I,
    exp: E,
}

impl<'a, I> Evolution<'a, I>
where I: Iterator<Item = f64>
{
    /// Create a new `Evolution`.
    ///
    /// Fails if two specifiers share a name.
    pub fn new<T>(specs: Vec<EvolutionSpec<'a>>, times: T) -> MarkerResult<Self>
    where T: IntoIterator<IntoIter = I, Item = f64>
    {
        Self::with_exponentiator(specs, times, EighExp)
    }
}

impl<'a, I, E> Evolution<'a, I, E>
where
    I: Iterator<Item = f64>,
    E: Exponentiate,
{
    /// Like [`Evolution::new`], but computing propagators with `exp`.
    pub fn with_exponentiator<T>(specs: Vec<EvolutionSpec<'a>>, times: T, exp: E)
        -> MarkerResult<Self>
    where T: IntoIterator<IntoIter = I, Item = f64>
    {
        for (k, spec) in specs.iter().enumerate() {
            if specs[..k].iter().any(|prev| prev.name() == spec.name()) {
                return Err(MarkerError::DuplicateBinding(spec.name().to_string()));
            }
        }
        Ok(Self { specs, times: times.into_iter(), exp })
    }
}

impl<'a, I, E> Evolution<'a, I, E>
where E: Exponentiate
{
    /// Reference to the exponentiation routine.
    pub fn exponentiator(&self) -> &E { &self.exp }

    /// Compute all bindings at a single time.
    pub fn frame_at(&self, t: f64) -> MarkerResult<Frame> {
        // one evaluation and at most one propagator per distinct hamiltonian
        // function
        let mut evaluated: Vec<Evaluated> = Vec::new();
        let mut bindings: IndexMap<String, Binding>
            = IndexMap::with_capacity(self.specs.len());
        for spec in self.specs.iter() {
            let f = spec.hamiltonian_fn();
            let key = Rc::as_ptr(f) as *const ();
            let k = match evaluated.iter().position(|ev| ev.key == key) {
                Some(k) => k,
                None => {
                    evaluated.push(Evaluated { key, H: Rc::new(f(t)?), U: None });
                    evaluated.len() - 1
                },
            };
            let ev = &mut evaluated[k];
            let binding
                = match spec {
                    EvolutionSpec::Hamiltonian { .. } => {
                        Binding::Hamiltonian(Rc::clone(&ev.H))
                    },
                    EvolutionSpec::Density { P0, .. } => {
                        if P0.dim() != ev.H.dim() {
                            return Err(MarkerError::ShapeMismatch(format!(
                                "initial density matrix '{}' is {:?} but \
                                hamiltonian is {:?}",
                                spec.name(), P0.dim(), ev.H.dim(),
                            )));
                        }
                        let U = match ev.U.clone() {
                            Some(U) => U,
                            None => {
                                let U = Rc::new(self.exp.propagator(&ev.H, t)?);
                                ev.U = Some(Rc::clone(&U));
                                U
                            },
                        };
                        let Ud = U.t().mapv(|u| u.conj());
                        Binding::Density(U.dot(P0).dot(&Ud))
                    },
                };
            bindings.insert(spec.name().to_string(), binding);
        }
        Ok(Frame { time: t, bindings })
    }
}

impl<'a, I, E> Iterator for Evolution<'a, I, E>
where
    I: Iterator<Item = f64>,
    E: Exponentiate,
{
    type Item = MarkerResult<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        let t = self.times.next()?;
        Some(self.frame_at(t))
    }
}
