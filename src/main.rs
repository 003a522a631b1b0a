//! Demo entry point for the spinor GPE simulation.
//!
//! Performs the two standard stages of a condensate experiment: a
//! ground-state search by imaginary-time propagation, followed by a short
//! real-time hold of the found state. Diagnostics, coordinates, and the
//! final wavefunction are written to `./output/`.

use std::env;
use std::error::Error;

use spinor_gpe::grid::{DerivedScales, EnergyOperators, SpatialGrid};
use spinor_gpe::prop::Propagator;
use spinor_gpe::types::{
    ComputeTarget, PhysicalParameters, PropagationConfig, TimeMode, Wavefunction,
};
use spinor_gpe::utils::{write_coords, write_params, write_psi, write_samples};

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::builder().format_timestamp_secs().init();

    // Optional overrides: <imaginary steps> <real steps>
    let args: Vec<String> = env::args().collect();
    let n_imag: usize = match args.get(1) {
        Some(arg) => arg.parse()?,
        None => 500,
    };
    let n_real: usize = match args.get(2) {
        Some(arg) => arg.parse()?,
        None => 200,
    };

    let params = PhysicalParameters::default();
    let scales = DerivedScales::derive(&params)?;
    let grid = SpatialGrid::new((256, 256), (16.0, 16.0))?;
    let ops = EnergyOperators::new(&grid, &scales);
    let g = scales.interaction_strengths(&params.g_sc);
    let psi = Wavefunction::thomas_fermi(&params, &scales, &grid)?;

    println!("chemical potential: {:.4} hbar*omeg_x", scales.chem_pot);
    println!("Thomas-Fermi radius: {:.4} a_x", scales.rad_tf);

    std::fs::create_dir_all("./output")?;
    write_coords(&grid.x_lin, "./output/x.txt")?;
    write_coords(&grid.y_lin, "./output/y.txt")?;
    write_params(&params, &scales, &grid, "./output/params.txt")?;

    // Ground-state search.
    let config = PropagationConfig {
        dt: 1e-2,
        n_steps: n_imag,
        mode: TimeMode::Imaginary,
        sample_interval: 50,
        anneal_interval: 0,
        anneal_stages: 0,
        target: ComputeTarget::Cpu,
    };
    let prop = Propagator::new(&grid, ops.clone(), g, params.atom_num, psi, config)?;
    let ground = prop.propagate()?;
    write_samples(&ground.samples, "./output/samples_imag.txt")?;

    if let Some(last) = ground.samples.last() {
        println!(
            "ground state energy: {:.6} hbar*omeg_x per atom",
            last.energy / params.atom_num
        );
    }

    // Real-time hold of the found ground state.
    let config = PropagationConfig {
        dt: 1e-3,
        n_steps: n_real,
        mode: TimeMode::Real,
        sample_interval: 20,
        anneal_interval: 0,
        anneal_stages: 0,
        target: ComputeTarget::Cpu,
    };
    let prop = Propagator::new(&grid, ops, g, params.atom_num, ground.psi, config)?;
    let held = prop.propagate()?;
    write_samples(&held.samples, "./output/samples_real.txt")?;
    write_psi(&held.psi, "./output/psi")?;

    if let Some(last) = held.samples.last() {
        println!(
            "population after hold: {:.3} + {:.3} of {} atoms",
            last.pop_up, last.pop_down, params.atom_num
        );
    }

    Ok(())
}
