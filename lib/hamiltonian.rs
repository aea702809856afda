//! Hamiltonian of a Chern insulator on a finite square lattice.
//!
//! ```text
//! H = Σ_i m_i c†_i σz c_i
//!   + Σ_{x-links} c†_i (σz - iσx)/2 c_j
//!   + Σ_{y-links} c†_i (σz - iσy)/2 c_j
//!   + h.c.
//! ```

use std::{
    cell::Cell,
    ops::Deref,
    sync::atomic::{ AtomicU64, Ordering },
};
use ndarray::{ self as nd, s };
use num_complex::Complex64 as C64;
use num_traits::Zero;
use crate::{
    c,
    error::{ MarkerError, MarkerResult },
    gauge::{ GaugeField, peierls_phase },
    lattice::{ Convention, CoordinateMap, LatticeSize, ZoneMap },
    operators::eigh_retry,
};

/// Default number of sub-intervals used to integrate Peierls phases.
pub const DEFAULT_INTERVALS: usize = 10;

thread_local! {
    static LAST_SIZE: Cell<Option<LatticeSize>> = const { Cell::new(None) };
}

static NEXT_VERSION: AtomicU64 = AtomicU64::new(0);

fn next_version() -> u64 { NEXT_VERSION.fetch_add(1, Ordering::Relaxed) }

/// Return the lattice size of the Hamiltonian most recently built on this
/// thread, if any.
pub fn last_lattice_size() -> Option<LatticeSize> { LAST_SIZE.with(|s| s.get()) }

fn remember_size(size: LatticeSize) { LAST_SIZE.with(|s| s.set(Some(size))); }

/// Fall back to the remembered lattice size if none is given.
pub(crate) fn resolve_size(size: Option<LatticeSize>) -> MarkerResult<LatticeSize> {
    size.or_else(last_lattice_size).ok_or(MarkerError::MissingLatticeSize)
}

/// Hopping direction of a bond.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Axis { X, Y }

impl Axis {
    /// Hopping block `c†_from T c_to`.
    fn hopping(&self) -> nd::Array2<C64> {
        match self {
            // (σz - iσx) / 2
            Self::X => nd::array![
                [c!(0.5), c!(i -0.5)],
                [c!(i -0.5), c!(-0.5)],
            ],
            // (σz - iσy) / 2
            Self::Y => nd::array![
                [c!(0.5), c!(-0.5)],
                [c!(0.5), c!(-0.5)],
            ],
        }
    }
}

/// A nearest-neighbor link from one site to its right or upper neighbor.
///
/// `start` and `end` are the spatial endpoints of the link; for links wrapping
/// around a periodic boundary, `end` is the image of the target site just past
/// the edge rather than its position inside the lattice.
#[derive(Copy, Clone, Debug, PartialEq)]
pub(crate) struct Bond {
    pub from: usize,
    pub to: usize,
    pub axis: Axis,
    pub start: [f64; 2],
    pub end: [f64; 2],
}

/// Enumerate all bonds of a lattice.
///
/// Along a periodic axis of two sites the wrap-around bond joins the same pair
/// of sites as the open one, but in the opposite direction; along an axis of
/// one site it is a loop from each site to itself.
pub(crate) fn bonds(size: LatticeSize, pbc: (bool, bool)) -> Vec<Bond> {
    let (rows, cols) = size.shape();
    let (wrap_x, wrap_y) = pbc;
    let mut acc: Vec<Bond> = Vec::with_capacity(2 * size.sites());
    let mut start: [f64; 2];
    for (r, c) in size.coords() {
        start = size.position((r, c));
        if c + 1 < cols || wrap_x {
            acc.push(Bond {
                from: size.to_linear((r, c)),
                to: size.to_linear((r, (c + 1) % cols)),
                axis: Axis::X,
                start,
                end: [start[0] + 1.0, start[1]],
            });
        }
        if r + 1 < rows || wrap_y {
            acc.push(Bond {
                from: size.to_linear((r, c)),
                to: size.to_linear(((r + 1) % rows, c)),
                axis: Axis::Y,
                start,
                end: [start[0], start[1] + 1.0],
            });
        }
    }
    acc
}

fn block(i: usize, j: usize) -> nd::SliceInfo<[nd::SliceInfoElem; 2], nd::Ix2, nd::Ix2> {
    s![2 * i..2 * i + 2, 2 * j..2 * j + 2]
}

/// Multiply hopping blocks by Peierls phase factors.
///
/// Each block is scaled as a whole, which is only possible while it holds a
/// single bond. Wrap-around links are visited along every axis of at least
/// three sites (where they never share a block); along shorter axes they are
/// visited only if `pbc` says they exist, in which case the phases cannot be
/// applied and an error is returned.
fn multiply_phases<G>(
    H: &mut nd::Array2<C64>,
    A: &G,
    size: LatticeSize,
    pbc: (bool, bool),
    intervals: usize,
) -> MarkerResult<()>
where G: GaugeField + ?Sized
{
    let (rows, cols) = size.shape();
    if (pbc.0 && cols < 3) || (pbc.1 && rows < 3) {
        return Err(MarkerError::UnsupportedGeometry(format!(
            "periodic links along an axis of fewer than 3 sites share blocks \
            with open links on a {}x{} lattice; apply the field when building \
            the hamiltonian instead",
            rows, cols,
        )));
    }
    let mut ph: C64;
    for bond in bonds(size, (cols >= 3, rows >= 3)) {
        ph = C64::cis(peierls_phase(A, bond.start, bond.end, intervals)?);
        H.slice_mut(block(bond.from, bond.to)).mapv_inplace(|h| h * ph);
        H.slice_mut(block(bond.to, bond.from)).mapv_inplace(|h| h * ph.conj());
    }
    Ok(())
}

fn erase_between_zones(H: &mut nd::Array2<C64>, zones: &CoordinateMap<usize>) {
    let labels: Vec<usize> = zones.iter().copied().collect();
    for (i, li) in labels.iter().enumerate() {
        for (j, lj) in labels.iter().enumerate() {
            if li != lj { H.slice_mut(block(i, j)).fill(C64::zero()); }
        }
    }
}

fn check_zones<L>(zones: &ZoneMap<L>, size: LatticeSize) -> MarkerResult<()> {
    if zones.size() != size {
        return Err(MarkerError::InvalidShape {
            expected: size.shape(),
            got: zones.size().shape(),
        });
    }
    Ok(())
}

/// Multiply every hopping of a raw Hamiltonian matrix by its Peierls phase
/// factor for vector potential `A`.
///
/// If `size` is `None`, the size of the Hamiltonian most recently built on this
/// thread is used. Both open and wrap-around links are visited; links absent
/// from `H` stay absent. Along axes shorter than three sites, `H` is taken to
/// have open boundaries, since wrap-around links there cannot be told apart
/// from open ones.
pub fn gauge_field<'h, G>(
    H: &'h mut nd::Array2<C64>,
    A: &G,
    size: Option<LatticeSize>,
    intervals: usize,
) -> MarkerResult<&'h mut nd::Array2<C64>>
where G: GaugeField + ?Sized
{
    let size = resolve_size(size)?;
    size.check_dim(H.nrows())?;
    size.check_dim(H.ncols())?;
    multiply_phases(H, A, size, (false, false), intervals)?;
    Ok(H)
}

/// Erase all hoppings of a raw Hamiltonian matrix between sites belonging to
/// different zones.
///
/// The lattice size is taken from `zones`; if `size` is also given, the two
/// must agree.
pub fn zones<'h, L>(
    H: &'h mut nd::Array2<C64>,
    zones: &ZoneMap<L>,
    size: Option<LatticeSize>,
) -> MarkerResult<&'h mut nd::Array2<C64>>
where L: PartialEq
{
    let size = size.unwrap_or_else(|| zones.size());
    check_zones(zones, size)?;
    size.check_dim(H.nrows())?;
    size.check_dim(H.ncols())?;
    erase_between_zones(H, &zones.partition());
    Ok(H)
}

/// Optional ingredients of a Chern insulator Hamiltonian.
#[derive(Clone)]
pub struct HParams<'a> {
    /// Periodic boundary conditions along `x` (horizontal) and `y`
    /// (vertical).
    pub pbc: (bool, bool),
    /// Zone partition; hoppings between zones are omitted.
    pub zones: Option<CoordinateMap<usize>>,
    /// Vector potential entering through Peierls phases.
    pub field: Option<&'a dyn GaugeField>,
    /// Number of sub-intervals for Peierls phase integration.
    pub intervals: usize,
}

impl<'a> std::fmt::Debug for HParams<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f,
            "HParams {{ \
            pbc: {:?}, \
            zones: {:?}, \
            field: {}, \
            intervals: {:?} \
            }}",
            self.pbc,
            self.zones,
            if self.field.is_some() { "Some(...)" } else { "None" },
            self.intervals,
        )
    }
}

impl<'a> Default for HParams<'a> {
    fn default() -> Self {
        Self {
            pbc: (false, false),
            zones: None,
            field: None,
            intervals: DEFAULT_INTERVALS,
        }
    }
}

impl<'a> HParams<'a> {
    /// Open boundaries, no zones, no field.
    pub fn new() -> Self { Self::default() }

    /// Set periodic boundary conditions.
    pub fn pbc(mut self, horizontal: bool, vertical: bool) -> Self {
        self.pbc = (horizontal, vertical);
        self
    }

    /// Isolate zones of equal label from each other.
    pub fn zones<L: PartialEq>(mut self, zones: &ZoneMap<L>) -> Self {
        self.zones = Some(zones.partition());
        self
    }

    /// Apply a magnetic field through its vector potential.
    pub fn field<G: GaugeField>(mut self, A: &'a G) -> Self {
        self.field = Some(A);
        self
    }

    /// Set the number of sub-intervals for Peierls phase integration.
    ///
    /// Must be positive; building with a field fails otherwise.
    pub fn intervals(mut self, intervals: usize) -> Self {
        self.intervals = intervals;
        self
    }
}

/// Build the Chern insulator Hamiltonian for a site-resolved mass field.
pub fn hamiltonian(mass: &CoordinateMap<f64>, params: &HParams)
    -> MarkerResult<Hamiltonian>
{
    let size = mass.size();
    if let Some(zones) = &params.zones { check_zones(zones, size)?; }
    let n = size.dim();
    let mut H: nd::Array2<C64> = nd::Array2::zeros((n, n));
    for (k, m) in mass.iter().enumerate() {
        H[[2 * k, 2 * k]] = C64::from(*m);
        H[[2 * k + 1, 2 * k + 1]] = C64::from(-*m);
    }
    let links = bonds(size, params.pbc);
    let mut nbonds: usize = 0;
    let mut hop: nd::Array2<C64>;
    for bond in links.iter() {
        if let Some(zones) = &params.zones {
            let same_zone
                = zones.get_linear(bond.from) == zones.get_linear(bond.to);
            if !same_zone { continue; }
        }
        hop = bond.axis.hopping();
        if let Some(A) = params.field {
            let ph = peierls_phase(A, bond.start, bond.end, params.intervals)?;
            hop.mapv_inplace(|h| h * C64::cis(ph));
        }
        let mut fwd = H.slice_mut(block(bond.from, bond.to));
        fwd += &hop;
        let mut bwd = H.slice_mut(block(bond.to, bond.from));
        bwd += &hop.t().mapv(|h| h.conj());
        nbonds += 1;
    }
    log::debug!(
        "hamiltonian: {}x{} lattice, {} bonds, pbc = {:?}, field = {}",
        size.rows(), size.cols(), nbonds, params.pbc, params.field.is_some(),
    );
    remember_size(size);
    Ok(Hamiltonian { H, size, pbc: params.pbc, version: next_version() })
}

/// Build the Chern insulator Hamiltonian for a raw mass matrix given in a
/// particular addressing convention.
pub fn hamiltonian_from(mass: nd::Array2<f64>, conv: Convention, params: &HParams)
    -> MarkerResult<Hamiltonian>
{
    hamiltonian(&CoordinateMap::new(mass, conv)?, params)
}

/// A single-particle lattice Hamiltonian together with the lattice it acts
/// on.
///
/// Every instance carries a version number, unique within the process, that
/// identifies its contents for caching purposes (see
/// [`EvolutionCache`][crate::evolution::EvolutionCache]). Clones share the
/// version of the original; every in-place modification assigns a new one.
/// The matrix is only reachable read-only, so contents cannot change without
/// the version changing with them.
#[derive(Clone, Debug)]
pub struct Hamiltonian {
    H: nd::Array2<C64>,
    size: LatticeSize,
    pbc: (bool, bool),
    version: u64,
}

impl PartialEq for Hamiltonian {
    fn eq(&self, other: &Self) -> bool {
        self.size == other.size && self.H == other.H
    }
}

impl Deref for Hamiltonian {
    type Target = nd::Array2<C64>;

    fn deref(&self) -> &Self::Target { &self.H }
}

impl AsRef<nd::Array2<C64>> for Hamiltonian {
    fn as_ref(&self) -> &nd::Array2<C64> { &self.H }
}

impl Hamiltonian {
    /// Wrap an arbitrary matrix.
    ///
    /// If `size` is `None`, the size of the Hamiltonian most recently built on
    /// this thread is used. Fails if the matrix is not square with dimension
    /// twice the number of sites. The matrix is taken to have open boundaries
    /// along axes shorter than three sites (see [`gauge_field`]).
    pub fn from_matrix(H: nd::Array2<C64>, size: Option<LatticeSize>)
        -> MarkerResult<Self>
    {
        let size = resolve_size(size)?;
        size.check_dim(H.nrows())?;
        size.check_dim(H.ncols())?;
        Ok(Self { H, size, pbc: (false, false), version: next_version() })
    }

    /// Lattice the Hamiltonian acts on.
    pub fn size(&self) -> LatticeSize { self.size }

    /// Periodic boundary conditions the Hamiltonian was built with.
    pub fn pbc(&self) -> (bool, bool) { self.pbc }

    /// Identity of the current contents.
    pub fn version(&self) -> u64 { self.version }

    /// Borrow the matrix.
    pub fn matrix(&self) -> &nd::Array2<C64> { &self.H }

    /// Unwrap the matrix.
    pub fn into_matrix(self) -> nd::Array2<C64> { self.H }

    /// Return a copy with every hopping multiplied by its Peierls phase
    /// factor for vector potential `A`.
    ///
    /// Fails with [`MarkerError::UnsupportedGeometry`] if the Hamiltonian is
    /// periodic along an axis shorter than three sites, where open and
    /// wrap-around links share matrix blocks; pass the field to
    /// [`HParams::field`] instead.
    pub fn with_gauge_field<G>(&self, A: &G, intervals: usize) -> MarkerResult<Self>
    where G: GaugeField + ?Sized
    {
        let mut new = self.clone();
        new.apply_gauge_field(A, intervals)?;
        Ok(new)
    }

    /// Return a copy with all hoppings between different zones erased.
    pub fn with_zones<L>(&self, zones: &ZoneMap<L>) -> MarkerResult<Self>
    where L: PartialEq
    {
        let mut new = self.clone();
        new.apply_zones(zones)?;
        Ok(new)
    }

    /// In-place counterpart to [`Self::with_gauge_field`].
    ///
    /// The Hamiltonian receives a new version, so evolution operators cached
    /// for its previous contents are not reused.
    pub fn apply_gauge_field<G>(&mut self, A: &G, intervals: usize)
        -> MarkerResult<&mut Self>
    where G: GaugeField + ?Sized
    {
        multiply_phases(&mut self.H, A, self.size, self.pbc, intervals)?;
        self.version = next_version();
        Ok(self)
    }

    /// In-place counterpart to [`Self::with_zones`].
    ///
    /// The Hamiltonian receives a new version, so evolution operators cached
    /// for its previous contents are not reused.
    pub fn apply_zones<L>(&mut self, zones: &ZoneMap<L>) -> MarkerResult<&mut Self>
    where L: PartialEq
    {
        check_zones(zones, self.size)?;
        erase_between_zones(&mut self.H, &zones.partition());
        self.version = next_version();
        Ok(self)
    }

    /// Diagonalize the Hamiltonian, returning energies in ascending order
    /// alongside eigenvectors as columns.
    pub fn diagonalize(&self) -> MarkerResult<(nd::Array1<f64>, nd::Array2<C64>)> {
        eigh_retry(&self.H)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ndarray::array;
    use crate::gauge::{ landau, symmetric };

    pub(crate) fn is_hermitian(H: &nd::Array2<C64>, tol: f64) -> bool {
        H.iter().zip(H.t().iter())
            .all(|(a, b)| (a - b.conj()).norm() < tol)
    }

    fn block_norm(H: &nd::Array2<C64>, i: usize, j: usize) -> f64 {
        H.slice(block(i, j)).iter().map(|h| h.norm_sqr()).sum::<f64>().sqrt()
    }

    fn uniform(rows: usize, cols: usize, m: f64) -> CoordinateMap<f64> {
        CoordinateMap::from_elem(LatticeSize::new(rows, cols).unwrap(), m)
    }

    #[test]
    fn uniform_4x4() {
        let H = hamiltonian(&uniform(4, 4, 1.0), &HParams::new()).unwrap();
        assert_eq!(H.dim(), (32, 32));
        assert!(is_hermitian(&H, 1e-12));
        assert_eq!(last_lattice_size(), Some(LatticeSize::new(4, 4).unwrap()));
        // mass enters through σz
        assert_eq!(H[[0, 0]], c!(1.0));
        assert_eq!(H[[1, 1]], c!(-1.0));
        // right neighbor of site 0 is site 1, upper neighbor is site 4
        assert_eq!(H.slice(block(0, 1)), Axis::X.hopping());
        assert_eq!(H.slice(block(0, 4)), Axis::Y.hopping());
        assert_eq!(block_norm(&H, 0, 5), 0.0);
        assert_eq!(block_norm(&H, 0, 3), 0.0);
    }

    #[test]
    fn natural_mass_matrix() {
        let nat = array![[1.0, 1.0, 1.0], [-1.0, 1.0, 1.0]];
        let H = hamiltonian_from(nat, Convention::Natural, &HParams::new()).unwrap();
        // bottom-left site carries the odd mass
        assert_eq!(H[[0, 0]], c!(-1.0));
        assert_eq!(H[[6, 6]], c!(1.0));
    }

    #[test]
    fn periodic_wraps() {
        let mass = uniform(3, 4, 1.0);
        let open = hamiltonian(&mass, &HParams::new()).unwrap();
        let px = hamiltonian(&mass, &HParams::new().pbc(true, false)).unwrap();
        let py = hamiltonian(&mass, &HParams::new().pbc(false, true)).unwrap();
        assert!(is_hermitian(&px, 1e-12) && is_hermitian(&py, 1e-12));
        // site (0, 3) wraps to (0, 0); site (2, 0) wraps to (0, 0)
        assert_eq!(block_norm(&open, 3, 0), 0.0);
        assert_eq!(px.slice(block(3, 0)), Axis::X.hopping());
        assert_eq!(block_norm(&px, 8, 0), 0.0);
        assert_eq!(py.slice(block(8, 0)), Axis::Y.hopping());
        assert_eq!(bonds(mass.size(), (true, true)).len(), 24);
        assert_eq!(bonds(LatticeSize::new(2, 2).unwrap(), (true, true)).len(), 8);
        assert_eq!(bonds(LatticeSize::new(1, 3).unwrap(), (false, true)).len(), 5);
    }

    #[test]
    fn periodic_short_axes() {
        let mass = uniform(2, 2, 1.0);
        let open = hamiltonian(&mass, &HParams::new()).unwrap();
        let pbc = hamiltonian(&mass, &HParams::new().pbc(true, false)).unwrap();
        assert!(is_hermitian(&pbc, 1e-12));
        assert_ne!(open, pbc);
        // open and wrap-around links run in opposite directions: T + T† = σz
        let sz: nd::Array2<C64> = array![[c!(1.0), c!(0.0)], [c!(0.0), c!(-1.0)]];
        assert_eq!(pbc.slice(block(0, 1)), sz);
        assert_eq!(pbc.slice(block(1, 0)), sz);
        assert_eq!(pbc.slice(block(0, 2)), open.slice(block(0, 2)));

        // a single row wraps onto itself
        let row = uniform(1, 3, 1.0);
        let H = hamiltonian(&row, &HParams::new().pbc(false, true)).unwrap();
        assert!(is_hermitian(&H, 1e-12));
        assert_eq!(H[[0, 0]], c!(2.0));
        assert_eq!(H[[1, 1]], c!(-2.0));
        assert_eq!(H.slice(block(0, 1)), Axis::X.hopping());
    }

    #[test]
    fn periodic_short_axes_field() {
        let mass = uniform(2, 4, -1.0);
        let A = landau(0.1);
        let params = HParams::new().pbc(true, true);
        let H = hamiltonian(&mass, &params.clone().field(&A)).unwrap();
        assert!(is_hermitian(&H, 1e-12));
        // vertical open and wrap-around links pick up opposite phases, so
        // the shared block is no longer σz
        let sz: nd::Array2<C64> = array![[c!(1.0), c!(0.0)], [c!(0.0), c!(-1.0)]];
        assert!(
            (&H.slice(block(1, 5)) - &sz).iter().any(|d| d.norm() > 1e-6)
        );
        let H0 = hamiltonian(&mass, &params).unwrap();
        assert!(matches!(
            H0.with_gauge_field(&A, DEFAULT_INTERVALS),
            Err(MarkerError::UnsupportedGeometry(_))
        ));
        // periodic only along the long axis is fine
        let Hx = hamiltonian(&mass, &HParams::new().pbc(true, false).field(&A))
            .unwrap();
        let Hx2 = hamiltonian(&mass, &HParams::new().pbc(true, false)).unwrap()
            .with_gauge_field(&A, DEFAULT_INTERVALS).unwrap();
        assert!((&*Hx - &*Hx2).iter().all(|d| d.norm() < 1e-12));
    }

    #[test]
    fn zero_intervals_rejected_with_field() {
        let mass = uniform(3, 3, 1.0);
        let A = landau(0.1);
        assert!(matches!(
            hamiltonian(&mass, &HParams::new().field(&A).intervals(0)),
            Err(MarkerError::InvalidParameter(_))
        ));
        let mut raw = hamiltonian(&mass, &HParams::new()).unwrap().into_matrix();
        assert!(matches!(
            gauge_field(&mut raw, &A, None, 0),
            Err(MarkerError::InvalidParameter(_))
        ));
    }

    #[test]
    fn zones_disconnect() {
        let mass = uniform(2, 2, 1.0);
        let zones = CoordinateMap::new(
            array![["left", "right"], ["left", "right"]],
            Convention::Coordinate,
        ).unwrap();
        let H0 = hamiltonian(&mass, &HParams::new()).unwrap();
        let H = hamiltonian(&mass, &HParams::new().zones(&zones)).unwrap();
        assert!(is_hermitian(&H, 1e-12));
        // horizontal links cross the zone boundary
        for (i, j) in [(0, 1), (1, 0), (2, 3), (3, 2)] {
            assert_eq!(block_norm(&H, i, j), 0.0);
        }
        // vertical links stay within a zone
        for (i, j) in [(0, 2), (2, 0), (1, 3), (3, 1)] {
            assert!(block_norm(&H, i, j) > 0.0);
            assert_eq!(H.slice(block(i, j)), H0.slice(block(i, j)));
        }
    }

    #[test]
    fn zones_after_the_fact() {
        let mass = uniform(5, 5, 1.0);
        let mut zones = ZoneMap::from_elem(mass.size(), 'a');
        zones.view_mut().slice_mut(s![1..4, 1..4]).fill('b');
        let H1 = hamiltonian(&mass, &HParams::new().zones(&zones)).unwrap();
        let H2 = hamiltonian(&mass, &HParams::new()).unwrap();
        let H3 = H2.with_zones(&zones).unwrap();
        assert_eq!(H1, H3);
        assert_ne!(H2.version(), H3.version());
        let mut raw = H2.into_matrix();
        super::zones(&mut raw, &zones, None).unwrap();
        assert_eq!(raw, *H1);
    }

    #[test]
    fn field_after_the_fact() {
        let mass = uniform(4, 5, 1.0);
        let A = landau(0.1);
        let H1 = hamiltonian(&mass, &HParams::new().field(&A)).unwrap();
        let H2 = hamiltonian(&mass, &HParams::new()).unwrap();
        let closure = |r: [f64; 2]| vec![0.0, 0.1 * r[0], 0.0];
        let H3 = H2.with_gauge_field(&closure, DEFAULT_INTERVALS).unwrap();
        assert!(is_hermitian(&H1, 1e-12));
        assert!((&*H1 - &*H3).iter().all(|d| d.norm() < 1e-12));
        let mut raw = H2.into_matrix();
        gauge_field(&mut raw, &A, None, DEFAULT_INTERVALS).unwrap();
        assert!((&*H1 - &raw).iter().all(|d| d.norm() < 1e-12));
    }

    #[test]
    fn periodic_field_hermitian() {
        let mass = uniform(4, 4, -1.0);
        let A = symmetric(0.05);
        let H = hamiltonian(&mass, &HParams::new().pbc(true, true).field(&A))
            .unwrap();
        assert!(is_hermitian(&H, 1e-12));
        let mut H2 = hamiltonian(&mass, &HParams::new().pbc(true, true)).unwrap();
        let v = H2.version();
        H2.apply_gauge_field(&A, DEFAULT_INTERVALS).unwrap();
        assert_ne!(H2.version(), v);
        assert!((&*H - &*H2).iter().all(|d| d.norm() < 1e-12));
    }

    #[test]
    fn missing_size() {
        // fresh test thread: nothing built yet
        let mut raw: nd::Array2<C64> = nd::Array2::zeros((8, 8));
        assert!(matches!(
            gauge_field(&mut raw, &landau(0.1), None, DEFAULT_INTERVALS),
            Err(MarkerError::MissingLatticeSize)
        ));
        assert!(matches!(
            Hamiltonian::from_matrix(raw, None),
            Err(MarkerError::MissingLatticeSize)
        ));
    }

    #[test]
    fn wrong_dimension() {
        let size = LatticeSize::new(2, 3).unwrap();
        let mut raw: nd::Array2<C64> = nd::Array2::zeros((8, 8));
        assert!(matches!(
            gauge_field(&mut raw, &landau(0.1), Some(size), DEFAULT_INTERVALS),
            Err(MarkerError::ShapeMismatch(_))
        ));
        let zones = ZoneMap::from_elem(LatticeSize::new(3, 3).unwrap(), 0);
        let H = hamiltonian(&uniform(2, 3, 1.0), &HParams::new()).unwrap();
        assert!(matches!(
            H.with_zones(&zones),
            Err(MarkerError::InvalidShape { .. })
        ));
    }
}
