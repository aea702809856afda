#![allow(non_snake_case)]

//! Adiabatic switch-on of a magnetic field in a Chern insulator.
//!
//! Starting from the zero-field ground state, the configured field is ramped
//! up linearly over `ramp_time` and held for `hold_time`. At every time step
//! the evolved density matrix is reduced to site densities, local Chern
//! markers, and bond currents of both charge and marker, which are written to `field_on.npz` in the
//! configured output directory. Site-resolved arrays use the natural (image)
//! convention; currents are indexed by linear site index.
//!
//! Usage: `field_on [config.toml]`

use std::path::PathBuf;
use anyhow::Context;
use ndarray as nd;
use chern_markers::{
    Convention,
    Evolution,
    EvolutionSpec,
    coord_operators,
    currents,
    currents_with,
    filled_projector,
    hamiltonian,
    hamiltonian_fn,
    lcm_current,
    local_chern_marker,
    site_trace,
};
use lib::{
    mkdir,
    write_npz,
    config::RunConfig,
};

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
    let B = config.field.strength;

    let H_0 = hamiltonian(&mass, &config.hparams(zones.as_ref()))?;
    let P_0 = filled_projector(&H_0, 0.0)?;
    let (X, Y) = coord_operators(Some(size), true)?;

    let h = hamiltonian_fn(|t: f64| {
        let A = config.potential(B * config.evolution.ramp(t));
        hamiltonian(&mass, &config.hparams(zones.as_ref()).field(&A))
    });
    let specs = vec![
        EvolutionSpec::hamiltonian("H", &h),
        EvolutionSpec::density("P", P_0, &h),
    ];
    let time: nd::Array1<f64> = nd::Array1::from_vec(config.evolution.times());
    let nt = time.len();
    let (rows, cols) = size.shape();
    let n = size.sites();

    let mut field: nd::Array1<f64> = nd::Array1::zeros(nt);
    let mut density: nd::Array3<f64> = nd::Array3::zeros((nt, rows, cols));
    let mut lcm: nd::Array3<f64> = nd::Array3::zeros((nt, rows, cols));
    let mut J: nd::Array3<f64> = nd::Array3::zeros((nt, n, n));
    let mut J_lcm: nd::Array3<f64> = nd::Array3::zeros((nt, n, n));
    let evolution = Evolution::new(specs, time.iter().copied())?;
    for (k, frame) in evolution.enumerate() {
        let frame = frame?;
        let H = frame.hamiltonian("H")
            .context("missing hamiltonian binding")?;
        let P = frame.density("P")
            .context("missing density binding")?;
        field[k] = B * config.evolution.ramp(frame.time());
        density.slice_mut(nd::s![k, .., ..])
            .assign(&site_trace(P, Some(size))?.convention(Convention::Natural));
        lcm.slice_mut(nd::s![k, .., ..])
            .assign(
                &site_trace(&local_chern_marker(P, &X, &Y)?, Some(size))?
                    .convention(Convention::Natural)
            );
        J.slice_mut(nd::s![k, .., ..])
            .assign(&currents(H, P, Some(size))?);
        J_lcm.slice_mut(nd::s![k, .., ..])
            .assign(&currents_with(Some(size), lcm_current(H, P, &X, &Y)?)?);
        log::info!("t = {:.3} ({}/{})", frame.time(), k + 1, nt);
    }

    write_npz!(
        outdir.join("field_on.npz"),
        arrays: {
            "time" => &time,
            "field" => &field,
            "mass" => &mass.convention(Convention::Natural),
            "density" => &density,
            "lcm" => &lcm,
            "currents" => &J,
            "lcm_currents" => &J_lcm,
        }
    );
    Ok(())
}
