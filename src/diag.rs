//! Expectation values sampled during and after propagation: inner products,
//! densities, populations, and the total energy functional.

use itertools::izip;
use ndarray::{Array2, Zip};
use num_complex::Complex;
use num_traits::Zero;

use crate::error::GpeError;
use crate::grid::{EnergyOperators, InteractionStrengths};
use crate::tensor::SpectralBackend;
use crate::types::Wavefunction;

/// An energy expectation value with a larger relative imaginary residual
/// than this indicates an upstream numerical error and is reported.
const HERMITICITY_TOL: f64 = 1e-8;

/// Inner product `Σ conj(a)·b · dv` of two same-shape fields.
pub fn inner_prod(
    a: &Array2<Complex<f64>>,
    b: &Array2<Complex<f64>>,
    dv: f64,
) -> Result<Complex<f64>, GpeError> {
    if a.dim() != b.dim() {
        return Err(GpeError::ShapeMismatch {
            expected: a.dim(),
            found: b.dim(),
        });
    }
    let mut acc = Complex::zero();
    Zip::from(a).and(b).for_each(|&x, &y| acc += x.conj() * y);
    Ok(acc * dv)
}

/// Density `|ψ|²` of one spin component.
pub fn density(psi: &Array2<Complex<f64>>) -> Array2<f64> {
    psi.mapv(|c| c.norm_sqr())
}

/// Population of one spin component, the density integrated over the grid.
pub fn population(psi: &Array2<Complex<f64>>, dv: f64) -> f64 {
    psi.iter().map(|c| c.norm_sqr()).sum::<f64>() * dv
}

/// Total energy expectation value of the spinor wavefunction.
///
/// Sums, per component, the kinetic term (spectral, through the stored
/// dispersion grids), the trap potential, the same-species and
/// cross-species mean-field terms, and, when coupling is enabled, the
/// detuning and coupling cross terms. The result is real for a valid
/// state; a non-negligible imaginary residual is logged as a warning.
pub fn energy_exp(
    psi: &Wavefunction,
    ops: &EnergyOperators,
    g: &InteractionStrengths,
    dv: f64,
    backend: &dyn SpectralBackend,
) -> f64 {
    let mut total: Complex<f64> = Complex::zero();

    for (comp, kin) in izip!(psi.components(), ops.kin_eng.iter()) {
        let mut spec = comp.clone();
        backend.fft2(&mut spec);
        spec.zip_mut_with(kin, |s, &k| *s *= k);
        backend.ifft2(&mut spec);

        let mut acc = Complex::zero();
        Zip::from(comp).and(&spec).for_each(|&c, &t| acc += c.conj() * t);
        total += acc * dv;
    }

    let n_up = density(&psi.up);
    let n_down = density(&psi.down);

    let mut real_sum = 0.0;
    Zip::from(&ops.pot_eng)
        .and(&n_up)
        .and(&n_down)
        .for_each(|&v, &nu, &nd| {
            real_sum += v * (nu + nd)
                + 0.5 * g.uu * nu * nu
                + 0.5 * g.dd * nd * nd
                + g.ud * nu * nd;
        });
    if let Some(detuning) = &ops.detuning {
        Zip::from(detuning)
            .and(&n_up)
            .and(&n_down)
            .for_each(|&d, &nu, &nd| real_sum += 0.5 * d * (nu - nd));
    }
    if let Some(coupling) = &ops.coupling {
        Zip::from(coupling)
            .and(&psi.up)
            .and(&psi.down)
            .for_each(|&o, &u, &d| real_sum += o * (u.conj() * d).re);
    }
    total += Complex::new(real_sum * dv, 0.0);

    if total.im.abs() > HERMITICITY_TOL * total.re.abs().max(1.0) {
        log::warn!(
            "energy expectation has imaginary residual {:.3e}, indicating an upstream numerical error",
            total.im
        );
    }
    total.re
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{DerivedScales, EnergyOperators, SpatialGrid};
    use crate::tensor::CpuBackend;
    use crate::types::PhysicalParameters;
    use assert_approx_eq::assert_approx_eq;

    fn gaussian_spinor(grid: &SpatialGrid, atom_num: f64) -> Wavefunction {
        // Harmonic oscillator ground state split evenly between components.
        let amp = (atom_num / (2.0 * std::f64::consts::PI)).sqrt();
        let up = Array2::from_shape_fn(grid.mesh_points, |(i, j)| {
            let x = grid.x_lin[i];
            let y = grid.y_lin[j];
            Complex::new(amp * (-(x * x + y * y) / 2.0).exp(), 0.0)
        });
        Wavefunction {
            up: up.clone(),
            down: up,
        }
    }

    #[test]
    fn test_inner_prod_conjugate_symmetry() {
        let grid = SpatialGrid::new((32, 32), (8.0, 8.0)).unwrap();
        let psi = gaussian_spinor(&grid, 100.0);

        let ab = inner_prod(&psi.up, &psi.down, grid.dv_r).unwrap();
        let ba = inner_prod(&psi.down, &psi.up, grid.dv_r).unwrap();
        assert_approx_eq!(ab.re, ba.re, 1e-12);
        assert_approx_eq!(ab.im, -ba.im, 1e-12);
    }

    #[test]
    fn test_inner_prod_shape_mismatch() {
        let a = Array2::from_elem((4, 4), Complex::new(1.0, 0.0));
        let b = Array2::from_elem((4, 6), Complex::new(1.0, 0.0));
        assert!(matches!(
            inner_prod(&a, &b, 1.0),
            Err(GpeError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_population_of_gaussian() {
        let grid = SpatialGrid::new((64, 64), (8.0, 8.0)).unwrap();
        let psi = gaussian_spinor(&grid, 1000.0);

        let total = population(&psi.up, grid.dv_r) + population(&psi.down, grid.dv_r);
        assert_approx_eq!(total, 1000.0, 1e-6);
    }

    #[test]
    fn test_energy_of_oscillator_ground_state() {
        // With interactions off, the symmetric 2D oscillator ground state
        // has energy 1.0 [hbar*omeg_x] per atom.
        let params = PhysicalParameters::default();
        let scales = DerivedScales::derive(&params).unwrap();
        let grid = SpatialGrid::new((64, 64), (8.0, 8.0)).unwrap();
        let ops = EnergyOperators::new(&grid, &scales);
        let g = InteractionStrengths {
            uu: 0.0,
            dd: 0.0,
            ud: 0.0,
        };
        let psi = gaussian_spinor(&grid, params.atom_num);
        let backend = CpuBackend::new(grid.mesh_points);

        let energy = energy_exp(&psi, &ops, &g, grid.dv_r, &backend);
        assert_approx_eq!(energy / params.atom_num, 1.0, 1e-8);
    }

    #[test]
    fn test_coupling_energy_cross_term() {
        // Equal real components under a uniform coupling field contribute
        // omega * N / 2.
        let params = PhysicalParameters::default();
        let scales = DerivedScales::derive(&params).unwrap();
        let grid = SpatialGrid::new((64, 64), (8.0, 8.0)).unwrap();
        let omega = 0.3;
        let mut ops = EnergyOperators::new(&grid, &scales);
        ops.coupling = Some(Array2::from_elem(grid.mesh_points, omega));
        ops.detuning = Some(Array2::from_elem(grid.mesh_points, 0.0));
        let g = InteractionStrengths {
            uu: 0.0,
            dd: 0.0,
            ud: 0.0,
        };
        let psi = gaussian_spinor(&grid, params.atom_num);
        let backend = CpuBackend::new(grid.mesh_points);

        let with_coupling = energy_exp(&psi, &ops, &g, grid.dv_r, &backend);
        ops.coupling = None;
        ops.detuning = None;
        let without = energy_exp(&psi, &ops, &g, grid.dv_r, &backend);

        assert_approx_eq!(
            with_coupling - without,
            omega * params.atom_num / 2.0,
            1e-6
        );
    }
}
