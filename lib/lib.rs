#![allow(non_snake_case)]

//! Dense lattice operators for studying topological markers in
//! two-dimensional Chern insulators.
//!
//! The central object is the spin-resolved tight-binding [`Hamiltonian`]
//! built from a mass field over the lattice, optionally with periodic
//! boundaries, isolated zones, and a magnetic field entering through Peierls
//! phases. From it one gets ground-state projectors, position operators,
//! bond currents, local markers, and unitary time evolution.
//!
//! Throughout, sites carry two internal (pseudo-spin) components, so an
//! operator on an `rows × cols` lattice is a `2·rows·cols` square matrix and
//! site `s` occupies rows/columns `2s` and `2s + 1`.

/// Shorthand for complex numbers.
///
/// `c!(re, im)` builds `re + i im`, `c!(i im)` a pure imaginary number, and
/// `c!(re)` a real one.
#[macro_export]
macro_rules! c {
    ( $re:expr, $im:expr ) => {
        num_complex::Complex64::new($re, $im)
    };
    ( i $im:expr ) => {
        num_complex::Complex64::new(0.0, $im)
    };
    ( $re:expr ) => {
        num_complex::Complex64::new($re, 0.0)
    };
}

pub mod error;
pub mod lattice;
pub mod gauge;
pub mod hamiltonian;
pub mod operators;
pub mod markers;
pub mod evolution;

pub use error::{ MarkerError, MarkerResult };
pub use lattice::{ Convention, CoordinateMap, LatticeSize, ZoneMap };
pub use gauge::{ GaugeField, flux, landau, peierls_phase, symmetric, symmetric_about };
pub use hamiltonian::{
    DEFAULT_INTERVALS,
    HParams,
    Hamiltonian,
    gauge_field,
    hamiltonian,
    hamiltonian_from,
    last_lattice_size,
    zones,
};
pub use operators::{ coord_operators, currents, filled_projector };
pub use markers::{
    currents_with,
    lcm_current,
    local_chern_marker,
    operator_current,
    site_trace,
    streda_marker,
};
pub use evolution::{
    Binding,
    EighExp,
    Evolution,
    EvolutionCache,
    EvolutionSpec,
    Exponentiate,
    Frame,
    HamiltonianFn,
    evolution_operator,
    hamiltonian_fn,
};
