//! Utility functions for writing simulation results to disk.
//!
//! The propagator itself performs no I/O; these writers let the demo binary
//! and downstream analysis tools consume coordinates, wavefunctions,
//! diagnostic series, and run parameters as plain CSV/text files.

use ndarray::{Array1, Array2};
use num::complex::Complex;
use std::fs::File;
use std::io::{BufWriter, Write};

use crate::grid::{DerivedScales, SpatialGrid};
use crate::types::{DiagnosticSample, PhysicalParameters, Wavefunction};

/// Writes a 1D coordinate array as a single comma-separated line.
pub fn write_coords(data: &Array1<f64>, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    for (i, &val) in data.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write!(writer, "{}", val)?;
    }
    writeln!(writer)?;

    Ok(())
}

/// Writes one complex spin component, one grid row per line with
/// alternating real and imaginary parts.
pub fn write_component(psi: &Array2<Complex<f64>>, filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    for row in psi.rows() {
        for (i, val) in row.iter().enumerate() {
            if i > 0 {
                write!(writer, ",")?;
            }
            write!(writer, "{},{}", val.re, val.im)?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

/// Writes both spin components of a wavefunction next to `stem`,
/// as `<stem>_up.txt` and `<stem>_down.txt`.
pub fn write_psi(psi: &Wavefunction, stem: &str) -> std::io::Result<()> {
    write_component(&psi.up, &format!("{stem}_up.txt"))?;
    write_component(&psi.down, &format!("{stem}_down.txt"))
}

/// Writes the sampled diagnostic series as CSV with a header line.
pub fn write_samples(samples: &[DiagnosticSample], filename: &str) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "time,energy,pop_up,pop_down")?;
    for sample in samples {
        writeln!(
            writer,
            "{},{},{},{}",
            sample.time, sample.energy, sample.pop_up, sample.pop_down
        )?;
    }

    Ok(())
}

/// Writes the physical parameters, derived scales, and grid layout of a run.
pub fn write_params(
    params: &PhysicalParameters,
    scales: &DerivedScales,
    grid: &SpatialGrid,
    filename: &str,
) -> std::io::Result<()> {
    let file = File::create(filename)?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "atom_num: {:.4e}", params.atom_num)?;
    writeln!(
        writer,
        "pop_frac: ({}, {})",
        params.pop_frac.0, params.pop_frac.1
    )?;
    writeln!(writer, "phase_factor: {}", params.phase_factor)?;
    writeln!(writer, "omega_x: {:.4e}", params.omega.x)?;
    writeln!(writer, "omega_y: {:.4e}", params.omega.y)?;
    writeln!(writer, "omega_z: {:.4e}", params.omega.z)?;
    writeln!(
        writer,
        "g_sc: (uu: {}, dd: {}, ud: {})",
        params.g_sc.uu, params.g_sc.dd, params.g_sc.ud
    )?;
    writeln!(writer, "is_coupling: {}", params.is_coupling)?;

    writeln!(writer, "y_trap: {:.4e}", scales.y_trap)?;
    writeln!(writer, "z_trap: {:.4e}", scales.z_trap)?;
    writeln!(writer, "a_x: {:.4e}", scales.a_x)?;
    writeln!(writer, "a_sc: {:.4e}", scales.a_sc)?;
    writeln!(writer, "chem_pot: {:.4e}", scales.chem_pot)?;
    writeln!(writer, "rad_tf: {:.4e}", scales.rad_tf)?;
    writeln!(writer, "time_scale: {:.4e}", scales.time_scale)?;

    writeln!(
        writer,
        "mesh_points: ({}, {})",
        grid.mesh_points.0, grid.mesh_points.1
    )?;
    writeln!(writer, "r_sizes: ({}, {})", grid.r_sizes.0, grid.r_sizes.1)?;
    writeln!(writer, "delta_r: ({}, {})", grid.delta_r.0, grid.delta_r.1)?;
    writeln!(writer, "k_sizes: ({}, {})", grid.k_sizes.0, grid.k_sizes.1)?;
    writeln!(writer, "dv_r: {:.4e}", grid.dv_r)?;

    Ok(())
}
