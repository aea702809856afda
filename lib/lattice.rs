//! Lattice geometry: sizes, site indexing, and site-resolved data.
//!
//! A lattice of size `rows × cols` has sites at integer positions `(x, y)`
//! with `x` running along columns and `y` along rows, the origin sitting at the
//! bottom-left corner. Sites are flattened row-major, so the site in row `r`,
//! column `c` has linear index `r * cols + c`.

use std::ops::{ Index, IndexMut };
use itertools::Itertools;
use ndarray::{ self as nd, s };
use crate::error::{ MarkerError, MarkerResult };

/// Extent of a two-dimensional lattice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct LatticeSize {
    rows: usize,
    cols: usize,
}

impl LatticeSize {
    /// Create a new `LatticeSize`, failing if either extent is zero.
    pub fn new(rows: usize, cols: usize) -> MarkerResult<Self> {
        if rows == 0 || cols == 0 {
            return Err(MarkerError::InvalidShape {
                expected: (rows.max(1), cols.max(1)),
                got: (rows, cols),
            });
        }
        Ok(Self { rows, cols })
    }

    /// Number of rows, i.e. the extent along `y`.
    pub fn rows(&self) -> usize { self.rows }

    /// Number of columns, i.e. the extent along `x`.
    pub fn cols(&self) -> usize { self.cols }

    /// Total number of sites.
    pub fn sites(&self) -> usize { self.rows * self.cols }

    /// Dimension of single-particle operators on this lattice, accounting for
    /// the two internal components per site.
    pub fn dim(&self) -> usize { 2 * self.sites() }

    /// `(rows, cols)`
    pub fn shape(&self) -> (usize, usize) { (self.rows, self.cols) }

    /// Convert a `(row, col)` coordinate to a linear site index.
    pub fn to_linear(&self, coord: (usize, usize)) -> usize {
        coord.0 * self.cols + coord.1
    }

    /// Convert a linear site index to a `(row, col)` coordinate.
    pub fn to_coord(&self, idx: usize) -> (usize, usize) {
        (idx / self.cols, idx % self.cols)
    }

    /// Spatial position `[x, y]` of a `(row, col)` coordinate.
    pub fn position(&self, coord: (usize, usize)) -> [f64; 2] {
        [coord.1 as f64, coord.0 as f64]
    }

    /// Iterate over all `(row, col)` coordinates in linear-index order.
    pub fn coords(&self) -> impl Iterator<Item = (usize, usize)> + Clone {
        (0..self.rows).cartesian_product(0..self.cols)
    }

    /// Return an error unless `dim` is the operator dimension for this
    /// lattice.
    pub(crate) fn check_dim(&self, dim: usize) -> MarkerResult<()> {
        if dim != self.dim() {
            return Err(MarkerError::ShapeMismatch(format!(
                "operator of dimension {} does not fit a {}x{} lattice \
                (expected {})",
                dim, self.rows, self.cols, self.dim(),
            )));
        }
        Ok(())
    }
}

impl TryFrom<(usize, usize)> for LatticeSize {
    type Error = MarkerError;

    fn try_from(shape: (usize, usize)) -> MarkerResult<Self> {
        Self::new(shape.0, shape.1)
    }
}

/// Addressing conventions for raw site-resolved matrices.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Convention {
    /// Element `[r, c]` belongs to the site at row `r`, column `c`, counting
    /// rows upward from the bottom of the lattice.
    Coordinate,
    /// Element `[r, c]` is the one seen at row `r`, column `c` when the matrix
    /// is printed, i.e. rows count downward from the top of the lattice.
    Natural,
}

/// Site-resolved values over a lattice.
///
/// Values are held internally in [`Convention::Coordinate`] order; indexing
/// with a `(row, col)` pair uses the same convention.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoordinateMap<T> {
    data: nd::Array2<T>,
}

/// Partition of lattice sites into isolated zones.
///
/// Only equality between labels is meaningful.
pub type ZoneMap<L> = CoordinateMap<L>;

fn flip_rows<T: Clone>(data: nd::ArrayView2<T>) -> nd::Array2<T> {
    data.slice(s![..;-1, ..]).to_owned()
}

impl<T> CoordinateMap<T>
where T: Clone
{
    /// Wrap a matrix given in a particular addressing convention.
    ///
    /// Fails if the matrix has a zero-sized axis.
    pub fn new(data: nd::Array2<T>, conv: Convention) -> MarkerResult<Self> {
        let (rows, cols) = data.dim();
        LatticeSize::new(rows, cols)?;
        let data
            = match conv {
                Convention::Coordinate => data,
                Convention::Natural => flip_rows(data.view()),
            };
        Ok(Self { data })
    }

    /// Like [`Self::new`], but additionally require the matrix to match a
    /// declared lattice size.
    pub fn with_size(data: nd::Array2<T>, size: LatticeSize, conv: Convention)
        -> MarkerResult<Self>
    {
        if data.dim() != size.shape() {
            return Err(MarkerError::InvalidShape {
                expected: size.shape(),
                got: data.dim(),
            });
        }
        Self::new(data, conv)
    }

    /// Fill a lattice with a single value.
    pub fn from_elem(size: LatticeSize, value: T) -> Self {
        Self { data: nd::Array2::from_elem(size.shape(), value) }
    }

    /// Compute values from `(row, col)` coordinates.
    pub fn from_fn<F>(size: LatticeSize, f: F) -> Self
    where F: FnMut((usize, usize)) -> T
    {
        Self { data: nd::Array2::from_shape_fn(size.shape(), f) }
    }

    /// Express the values in a given addressing convention.
    pub fn convention(&self, conv: Convention) -> nd::Array2<T> {
        match conv {
            Convention::Coordinate => self.data.clone(),
            Convention::Natural => flip_rows(self.data.view()),
        }
    }

    /// Apply a function to every value.
    pub fn map<U, F>(&self, f: F) -> CoordinateMap<U>
    where F: FnMut(&T) -> U
    {
        CoordinateMap { data: self.data.map(f) }
    }
}

impl<T> CoordinateMap<T> {
    /// Size of the underlying lattice.
    pub fn size(&self) -> LatticeSize {
        let (rows, cols) = self.data.dim();
        // zero-sized storage is rejected on construction
        LatticeSize { rows, cols }
    }

    /// Value at a linear site index.
    pub fn get_linear(&self, idx: usize) -> Option<&T> {
        let (rows, cols) = self.data.dim();
        (idx < rows * cols).then(|| &self.data[[idx / cols, idx % cols]])
    }

    /// View the values in coordinate order.
    pub fn view(&self) -> nd::ArrayView2<T> { self.data.view() }

    /// Mutably view the values in coordinate order, e.g. to assign a region
    /// with `slice_mut`.
    pub fn view_mut(&mut self) -> nd::ArrayViewMut2<T> { self.data.view_mut() }

    /// Iterate over values in linear-index order.
    pub fn iter(&self) -> nd::iter::Iter<'_, T, nd::Ix2> { self.data.iter() }
}

impl<T> CoordinateMap<T>
where T: PartialEq
{
    /// Replace each label with the index of its equivalence class, numbered
    /// by first appearance in linear-index order.
    pub fn partition(&self) -> CoordinateMap<usize> {
        let mut labels: Vec<&T> = Vec::new();
        let data
            = self.data.map(|l| {
                if let Some(k) = labels.iter().position(|known| *known == l) {
                    k
                } else {
                    labels.push(l);
                    labels.len() - 1
                }
            });
        CoordinateMap { data }
    }
}

impl<T> Index<(usize, usize)> for CoordinateMap<T> {
    type Output = T;

    fn index(&self, coord: (usize, usize)) -> &T { &self.data[[coord.0, coord.1]] }
}

impl<T> IndexMut<(usize, usize)> for CoordinateMap<T> {
    fn index_mut(&mut self, coord: (usize, usize)) -> &mut T {
        &mut self.data[[coord.0, coord.1]]
    }
}
