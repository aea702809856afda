#![allow(non_snake_case)]

//! Static topological markers of a Chern insulator.
//!
//! Computes the local Chern marker of the ground state and its Streda
//! response to a sweep of weak uniform fields, then writes both (along with
//! the mass landscape and the ground-state density) to `chern_marker.npz` in
//! the configured output directory. All site-resolved arrays are written in
//! the natural (image) convention.
//!
//! Usage: `chern_marker [config.toml]`

use std::path::PathBuf;
use anyhow::Context;
use ndarray as nd;
use num_complex::Complex64 as C64;
use rayon::iter::{ IntoParallelRefIterator, ParallelIterator };
use chern_markers::{
    Convention,
    coord_operators,
    filled_projector,
    hamiltonian,
    local_chern_marker,
    site_trace,
    streda_marker,
};
use lib::{
    mkdir,
    write_npz,
    config::RunConfig,
};

/// Site-resolved Streda response to a field of strength `B`.
fn streda_at(config: &RunConfig, P_0: &nd::Array2<C64>, B: f64)
    -> anyhow::Result<nd::Array2<f64>>
{
    let size = config.lattice_size()?;
    let mass = config.mass_field()?;
    let zones = config.zone_map()?;
    let A = config.potential(B);
    let params = config.hparams(zones.as_ref()).field(&A);
    let H_B = hamiltonian(&mass, &params)?;
    let P_B = filled_projector(&H_B, 0.0)?;
    let resp = site_trace(&streda_marker(&P_B, P_0, B)?, Some(size))?;
    log::info!("streda response at B = {:.3e} done", B);
    Ok(resp.convention(Convention::Natural))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = match std::env::args().nth(1) {
        Some(path) => RunConfig::load(&path)
            .with_context(|| format!("loading {}", path))?,
        None => RunConfig::default(),
    };
    log::info!("{:?}", config);
    let outdir: PathBuf = config.outdir.clone();
    mkdir!(outdir);

    let size = config.lattice_size()?;
    let mass = config.mass_field()?;
    let zones = config.zone_map()?;
    let H_0 = hamiltonian(&mass, &config.hparams(zones.as_ref()))?;
    let P_0 = filled_projector(&H_0, 0.0)?;
    let (X, Y) = coord_operators(Some(size), true)?;
    let lcm = site_trace(&local_chern_marker(&P_0, &X, &Y)?, Some(size))?;
    let density = site_trace(&P_0, Some(size))?;
    log::info!(
        "local chern marker: total = {:.3e}, center = {:.5}",
        lcm.iter().sum::<f64>(),
        lcm[(size.rows() / 2, size.cols() / 2)],
    );

    let streda: Vec<nd::Array2<f64>>
        = config.field.sweep.par_iter()
        .map(|B| streda_at(&config, &P_0, *B))
        .collect::<anyhow::Result<_>>()?;
    let streda_views: Vec<nd::ArrayView2<f64>>
        = streda.iter().map(|r| r.view()).collect();
    let streda: nd::Array3<f64>
        = if streda_views.is_empty() {
            nd::Array3::zeros((0, size.rows(), size.cols()))
        } else {
            nd::stack(nd::Axis(0), &streda_views)?
        };
    let fields: nd::Array1<f64> = nd::Array1::from_vec(config.field.sweep.clone());

    write_npz!(
        outdir.join("chern_marker.npz"),
        arrays: {
            "mass" => &mass.convention(Convention::Natural),
            "density" => &density.convention(Convention::Natural),
            "lcm" => &lcm.convention(Convention::Natural),
            "fields" => &fields,
            "streda" => &streda,
        }
    );
    Ok(())
}

