//! Run configuration for the driver programs, read from TOML files.
//!
//! Every field has a default, so a configuration file only needs to list what
//! it changes:
//! ```toml
//! outdir = "output/field_on"
//!
//! [lattice]
//! rows = 16
//! cols = 16
//! mass = 1.0
//! inner_mass = 3.0
//! inner = { rows = [4, 12], cols = [4, 12] }
//!
//! [field]
//! kind = "symmetric"
//! strength = 0.01
//!
//! [evolution]
//! ramp_time = 20.0
//! step = 0.5
//! ```

use std::path::{ Path, PathBuf };
use serde::{ Deserialize, Serialize };
use thiserror::Error;
use chern_markers::{
    CoordinateMap,
    HParams,
    LatticeSize,
    MarkerError,
    ZoneMap,
    flux,
    landau,
    symmetric_about,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("couldn't parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Lattice(#[from] MarkerError),
}
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Directory for output files.
    pub outdir: PathBuf,
    pub lattice: LatticeConfig,
    pub field: FieldConfig,
    pub evolution: EvolutionConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            outdir: PathBuf::from("output"),
            lattice: LatticeConfig::default(),
            field: FieldConfig::default(),
            evolution: EvolutionConfig::default(),
        }
    }
}

/// Half-open rectangle of sites, `rows[0] <= r < rows[1]` and
/// `cols[0] <= c < cols[1]`, with rows counted from the bottom of the lattice.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub rows: [usize; 2],
    pub cols: [usize; 2],
}

impl Region {
    pub fn contains(&self, (r, c): (usize, usize)) -> bool {
        (self.rows[0]..self.rows[1]).contains(&r)
            && (self.cols[0]..self.cols[1]).contains(&c)
    }
}

/// Lattice geometry and mass landscape.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LatticeConfig {
    pub rows: usize,
    pub cols: usize,
    /// Mass on every site outside `inner`.
    pub mass: f64,
    /// Mass inside `inner`; defaults to `mass`.
    pub inner_mass: Option<f64>,
    pub inner: Option<Region>,
    /// Cut all hopping between `inner` and the rest of the lattice.
    pub separate_inner: bool,
    /// Periodic boundaries along the horizontal and vertical axes.
    pub pbc: [bool; 2],
}

impl Default for LatticeConfig {
    fn default() -> Self {
        Self {
            rows: 12,
            cols: 12,
            mass: 1.0,
            inner_mass: None,
            inner: None,
            separate_inner: false,
            pbc: [false, false],
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Uniform field in the Landau gauge `A = (0, B x)`.
    Landau,
    /// Uniform field in the symmetric gauge about `center`.
    Symmetric,
    /// Point flux tube of `strength` flux quanta at `center`.
    Flux,
}

/// Applied magnetic field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub kind: FieldKind,
    /// Field strength in flux quanta per plaquette, or total flux for
    /// [`FieldKind::Flux`].
    pub strength: f64,
    /// Gauge center or flux tube position; defaults to the center of the
    /// lattice.
    pub center: Option<[f64; 2]>,
    /// Field strengths for the Streda response.
    pub sweep: Vec<f64>,
    /// Integration intervals per bond for Peierls phases.
    pub intervals: usize,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            kind: FieldKind::Symmetric,
            strength: 0.01,
            center: None,
            sweep: vec![0.001, 0.002, 0.005, 0.01],
            intervals: chern_markers::DEFAULT_INTERVALS,
        }
    }
}

/// Field ramp.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvolutionConfig {
    /// Time over which the field is ramped linearly from zero; zero turns it on
    /// suddenly.
    pub ramp_time: f64,
    /// Additional time at full field after the ramp.
    pub hold_time: f64,
    pub step: f64,
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self { ramp_time: 10.0, hold_time: 0.0, step: 0.5 }
    }
}

impl EvolutionConfig {
    /// Sampled times `0, step, 2 step, ...` up to `ramp_time + hold_time`.
    pub fn times(&self) -> Vec<f64> {
        let total = self.ramp_time + self.hold_time;
        let n = (total / self.step + 1e-9).floor() as usize;
        (0..=n).map(|k| k as f64 * self.step).collect()
    }

    /// Fraction of the full field applied at time `t`.
    pub fn ramp(&self, t: f64) -> f64 {
        if self.ramp_time <= 0.0 { 1.0 } else { (t / self.ramp_time).clamp(0.0, 1.0) }
    }
}

/// Vector potential as a boxed closure.
pub type Potential = Box<dyn Fn([f64; 2]) -> [f64; 2]>;

impl RunConfig {
    /// Read and validate a configuration file.
    pub fn load<P>(path: P) -> ConfigResult<Self>
    where P: AsRef<Path>
    {
        let content = std::fs::read_to_string(path)?;
        content.parse()
    }

    /// Check value ranges and region bounds.
    pub fn validate(&self) -> ConfigResult<()> {
        let LatticeConfig { rows, cols, inner, .. } = &self.lattice;
        let size = self.lattice_size()?;
        if let Some(region) = inner {
            let [r0, r1] = region.rows;
            let [c0, c1] = region.cols;
            if r0 >= r1 || c0 >= c1 || r1 > *rows || c1 > *cols {
                return Err(ConfigError::Invalid(format!(
                    "inner region {:?} is empty or outside the {:?} lattice",
                    region, size.shape(),
                )));
            }
        }
        if !self.field.strength.is_finite() {
            return Err(ConfigError::Invalid("field strength must be finite".into()));
        }
        if self.field.sweep.iter().any(|b| *b == 0.0 || !b.is_finite()) {
            return Err(ConfigError::Invalid(
                "sweep field strengths must be finite and non-zero".into()
            ));
        }
        if self.field.intervals == 0 {
            return Err(ConfigError::Invalid("intervals must be positive".into()));
        }
        let EvolutionConfig { ramp_time, hold_time, step } = self.evolution;
        if step.partial_cmp(&0.0) != Some(std::cmp::Ordering::Greater) {
            return Err(ConfigError::Invalid("time step must be positive".into()));
        }
        if ramp_time < 0.0 || hold_time < 0.0 {
            return Err(ConfigError::Invalid(
                "ramp and hold times must be non-negative".into()
            ));
        }
        Ok(())
    }

    pub fn lattice_size(&self) -> ConfigResult<LatticeSize> {
        Ok(LatticeSize::new(self.lattice.rows, self.lattice.cols)?)
    }

    /// Per-site mass, with `inner_mass` on sites inside the inner region.
    pub fn mass_field(&self) -> ConfigResult<CoordinateMap<f64>> {
        let size = self.lattice_size()?;
        let LatticeConfig { mass, inner_mass, inner, .. } = &self.lattice;
        let inner_mass = inner_mass.unwrap_or(*mass);
        Ok(CoordinateMap::from_fn(size, |coord| {
            match inner {
                Some(region) if region.contains(coord) => inner_mass,
                _ => *mass,
            }
        }))
    }

    /// Zone map separating the inner region from the rest of the lattice, if
    /// requested.
    pub fn zone_map(&self) -> ConfigResult<Option<ZoneMap<bool>>> {
        let size = self.lattice_size()?;
        match (&self.lattice.inner, self.lattice.separate_inner) {
            (Some(region), true) => {
                Ok(Some(CoordinateMap::from_fn(size, |coord| region.contains(coord))))
            },
            _ => Ok(None),
        }
    }

    /// Hamiltonian parameters without a field: boundary conditions,
    /// integration intervals, and `zones` if given.
    pub fn hparams<'a>(&self, zones: Option<&ZoneMap<bool>>) -> HParams<'a> {
        let [pbc_x, pbc_y] = self.lattice.pbc;
        let params = HParams::new()
            .pbc(pbc_x, pbc_y)
            .intervals(self.field.intervals);
        match zones {
            Some(z) => params.zones(z),
            None => params,
        }
    }

    /// Gauge center or flux position, defaulting to the center of the lattice.
    pub fn field_center(&self) -> [f64; 2] {
        self.field.center.unwrap_or([
            (self.lattice.cols as f64 - 1.0) / 2.0,
            (self.lattice.rows as f64 - 1.0) / 2.0,
        ])
    }

    /// Vector potential of the configured field with strength `strength`.
    pub fn potential(&self, strength: f64) -> Potential {
        let center = self.field_center();
        match self.field.kind {
            FieldKind::Landau => {
                let A = landau(strength);
                // shift the gauge origin to the configured center
                Box::new(move |[x, y]| A([x - center[0], y - center[1]]))
            },
            FieldKind::Symmetric => Box::new(symmetric_about(strength, center)),
            FieldKind::Flux => Box::new(flux(strength, center)),
        }
    }
}

impl std::str::FromStr for RunConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}
