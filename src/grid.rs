//! Grid and parameter engine: dimensionless physical scales, real- and
//! momentum-space grids, energy operator grids, Raman coupling grids, and
//! the initial Thomas-Fermi trial wavefunction.

use ndarray::{Array1, Array2};
use num_complex::Complex;

use crate::constants::*;
use crate::error::GpeError;
use crate::types::{
    CouplingConfig, CouplingProfile, PhysicalParameters, ScatteringStrengths, Wavefunction,
};

/// Population fractions must sum to 1 within this tolerance.
const POP_SUM_TOL: f64 = 1e-12;

/// Phase factors must have unit magnitude within this tolerance.
const PHASE_TOL: f64 = 1e-12;

/// Dimensionless scales for the Thomas-Fermi solution, computed once from
/// the physical parameters. All subsequent quantities are expressed in the
/// unit system defined here.
#[derive(Debug, Clone, Copy)]
pub struct DerivedScales {
    /// Relative size of the y-axis trapping frequency to the x-axis.
    pub y_trap: f64,
    /// Relative size of the z-axis trapping frequency to the x-axis.
    pub z_trap: f64,
    /// Harmonic oscillator length scale [m].
    pub a_x: f64,
    /// Dimensionless scattering length [a_x].
    pub a_sc: f64,
    /// Chemical potential for an asymmetric harmonic BEC [hbar*omeg_x].
    pub chem_pot: f64,
    /// Thomas-Fermi radius [a_x].
    pub rad_tf: f64,
    /// Energy scale [hbar*omeg_x].
    pub e_scale: f64,
    /// Length scale [a_x].
    pub r_scale: f64,
    /// Time scale [s].
    pub time_scale: f64,
}

/// Quasi-2D mean-field interaction strengths in the dimensionless unit
/// system, one per scattering channel.
#[derive(Debug, Clone, Copy)]
pub struct InteractionStrengths {
    pub uu: f64,
    pub dd: f64,
    pub ud: f64,
}

impl DerivedScales {
    /// Compute the trap ratios, harmonic length, dimensionless scattering
    /// length, chemical potential, and Thomas-Fermi radius.
    ///
    /// The chemical potential uses the closed form for an asymmetric
    /// harmonic trap:
    ///
    /// \[\mu = \sqrt{4 N a_{sc} r_y \sqrt{r_z / 2\pi}}\]
    pub fn derive(params: &PhysicalParameters) -> Result<Self, GpeError> {
        if params.atom_num <= 0.0 {
            return Err(GpeError::InvalidParameter(format!(
                "atom number must be positive, got {}",
                params.atom_num
            )));
        }
        for (axis, omega) in [
            ("x", params.omega.x),
            ("y", params.omega.y),
            ("z", params.omega.z),
        ] {
            if omega <= 0.0 {
                return Err(GpeError::InvalidParameter(format!(
                    "trap frequency omega_{axis} must be positive, got {omega}"
                )));
            }
        }
        for (channel, g) in [
            ("uu", params.g_sc.uu),
            ("dd", params.g_sc.dd),
            ("ud", params.g_sc.ud),
        ] {
            if g <= 0.0 {
                return Err(GpeError::InvalidParameter(format!(
                    "scattering strength g_{channel} must be positive, got {g}"
                )));
            }
        }
        let (p_up, p_down) = params.pop_frac;
        if p_up < 0.0 || p_down < 0.0 {
            return Err(GpeError::InvalidParameter(format!(
                "population fractions must be non-negative, got ({p_up}, {p_down})"
            )));
        }
        if (p_up + p_down - 1.0).abs() > POP_SUM_TOL {
            return Err(GpeError::InvalidParameter(format!(
                "population fractions must sum to 1, got {}",
                p_up + p_down
            )));
        }

        let y_trap = params.omega.y / params.omega.x;
        let z_trap = params.omega.z / params.omega.x;
        let a_x = (REDUCED_PLANCK_CONSTANT / (RB87_MASS * params.omega.x)).sqrt();
        let a_sc = RB87_SCATTERING_LENGTH / a_x;
        let chem_pot =
            (4.0 * params.atom_num * a_sc * y_trap * (z_trap / (2.0 * PI)).sqrt()).sqrt();
        let rad_tf = (2.0 * chem_pot).sqrt();

        Ok(DerivedScales {
            y_trap,
            z_trap,
            a_x,
            a_sc,
            chem_pot,
            rad_tf,
            e_scale: 1.0,
            r_scale: 1.0,
            time_scale: 1.0 / params.omega.x,
        })
    }

    /// Mean-field interaction strengths for the quasi-2D reduction of the
    /// contact interaction, scaled by the relative channel strengths.
    pub fn interaction_strengths(&self, g_sc: &ScatteringStrengths) -> InteractionStrengths {
        let g_base = (8.0 * PI * self.z_trap).sqrt() * self.a_sc;
        InteractionStrengths {
            uu: g_base * g_sc.uu,
            dd: g_base * g_sc.dd,
            ud: g_base * g_sc.ud,
        }
    }
}

/// Real- and momentum-space coordinate grids and volume elements.
///
/// The grids satisfy `delta_r * mesh_points == 2 * r_sizes` and
/// `delta_k == pi / r_sizes`, the Nyquist consistency relations required
/// for the spectral transform to be its own exact inverse.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    /// Number of mesh points along x and y; both must be even.
    pub mesh_points: (usize, usize),
    /// Half size of the real-space grid along x and y [a_x].
    pub r_sizes: (f64, f64),
    /// Spacing between real-space mesh points [a_x].
    pub delta_r: (f64, f64),
    /// Half size of the momentum-space grid [1/a_x].
    pub k_sizes: (f64, f64),
    /// Spacing between momentum-space mesh points [1/a_x].
    pub delta_k: (f64, f64),
    /// Linear coordinate arrays, zero-centered [a_x] and [1/a_x].
    pub x_lin: Array1<f64>,
    pub y_lin: Array1<f64>,
    pub kx_lin: Array1<f64>,
    pub ky_lin: Array1<f64>,
    /// 2D meshes; the x coordinate varies along rows (axis 0).
    pub x_mesh: Array2<f64>,
    pub y_mesh: Array2<f64>,
    pub kx_mesh: Array2<f64>,
    pub ky_mesh: Array2<f64>,
    /// Real-space volume element used for normalization [a_x^2].
    pub dv_r: f64,
    /// Momentum-space volume element [1/a_x^2].
    pub dv_k: f64,
}

impl SpatialGrid {
    pub fn new(mesh_points: (usize, usize), r_sizes: (f64, f64)) -> Result<Self, GpeError> {
        for (axis, points) in [("x", mesh_points.0), ("y", mesh_points.1)] {
            if points == 0 || points % 2 != 0 {
                return Err(GpeError::InvalidGrid(format!(
                    "mesh point count along {axis} must be a positive even number, got {points}"
                )));
            }
        }
        for (axis, size) in [("x", r_sizes.0), ("y", r_sizes.1)] {
            if size <= 0.0 {
                return Err(GpeError::InvalidGrid(format!(
                    "half size along {axis} must be positive, got {size}"
                )));
            }
        }

        let delta_r = (
            2.0 * r_sizes.0 / mesh_points.0 as f64,
            2.0 * r_sizes.1 / mesh_points.1 as f64,
        );
        let k_sizes = (PI / delta_r.0, PI / delta_r.1);
        let delta_k = (PI / r_sizes.0, PI / r_sizes.1);

        let x_lin = linspace_open(r_sizes.0, mesh_points.0);
        let y_lin = linspace_open(r_sizes.1, mesh_points.1);
        let kx_lin = linspace_open(k_sizes.0, mesh_points.0);
        let ky_lin = linspace_open(k_sizes.1, mesh_points.1);

        let dim = mesh_points;
        let x_mesh = Array2::from_shape_fn(dim, |(i, _)| x_lin[i]);
        let y_mesh = Array2::from_shape_fn(dim, |(_, j)| y_lin[j]);
        let kx_mesh = Array2::from_shape_fn(dim, |(i, _)| kx_lin[i]);
        let ky_mesh = Array2::from_shape_fn(dim, |(_, j)| ky_lin[j]);

        Ok(SpatialGrid {
            mesh_points,
            r_sizes,
            delta_r,
            k_sizes,
            delta_k,
            x_lin,
            y_lin,
            kx_lin,
            ky_lin,
            x_mesh,
            y_mesh,
            kx_mesh,
            ky_mesh,
            dv_r: delta_r.0 * delta_r.1,
            dv_k: delta_k.0 * delta_k.1,
        })
    }

    /// Momentum meshes reordered so the zero frequency sits at index 0,
    /// matching the layout the spectral transform produces.
    pub fn transform_order_k_meshes(&self) -> (Array2<f64>, Array2<f64>) {
        let kx = to_transform_order(&self.kx_lin);
        let ky = to_transform_order(&self.ky_lin);
        let dim = self.mesh_points;
        (
            Array2::from_shape_fn(dim, |(i, _)| kx[i]),
            Array2::from_shape_fn(dim, |(_, j)| ky[j]),
        )
    }
}

/// Zero-centered, right-open linear array: `points` values spanning
/// `[-half_size, half_size)` with the endpoint excluded.
fn linspace_open(half_size: f64, points: usize) -> Array1<f64> {
    let delta = 2.0 * half_size / points as f64;
    Array1::from_shape_fn(points, |i| -half_size + i as f64 * delta)
}

/// Rotate a zero-centered linear array into transform order, putting the
/// zero value first and the negative half in the upper indices.
fn to_transform_order(lin: &Array1<f64>) -> Array1<f64> {
    let n = lin.len();
    Array1::from_shape_fn(n, |i| lin[(i + n / 2) % n])
}

/// Harmonic trap potential `(x² + (r_y·y)²) / 2` [hbar*omeg_x].
pub fn harmonic_potential(grid: &SpatialGrid, y_trap: f64) -> Array2<f64> {
    let mut pot = grid.y_mesh.mapv(|y| (y_trap * y).powi(2));
    pot.zip_mut_with(&grid.x_mesh, |p, &x| *p = (*p + x * x) / 2.0);
    pot
}

/// Free-particle dispersion `((kx - offset)² + ky²) / 2` in transform
/// order [hbar*omeg_x].
fn free_dispersion(kx: &Array2<f64>, ky: &Array2<f64>, offset: f64) -> Array2<f64> {
    let mut kin = ky.mapv(|k| k * k);
    kin.zip_mut_with(kx, |e, &k| *e = (*e + (k - offset).powi(2)) / 2.0);
    kin
}

/// Energy and coupling operator grids for a propagation run.
///
/// The potential grid lives on the real-space mesh; the kinetic grids live
/// on the momentum mesh in transform order, one per spin component so a
/// momentum-dependent coupling can shift them independently.
#[derive(Debug, Clone)]
pub struct EnergyOperators {
    /// Potential energy grid [hbar*omeg_x].
    pub pot_eng: Array2<f64>,
    /// Kinetic energy grids, up component first [hbar*omeg_x].
    pub kin_eng: [Array2<f64>; 2],
    /// Coupling strength grid, present when coupling is enabled.
    pub coupling: Option<Array2<f64>>,
    /// Coupling detuning grid, present when coupling is enabled.
    pub detuning: Option<Array2<f64>>,
}

impl EnergyOperators {
    /// Harmonic trap potential and free-particle kinetic dispersion.
    pub fn new(grid: &SpatialGrid, scales: &DerivedScales) -> Self {
        let pot_eng = harmonic_potential(grid, scales.y_trap);
        let (kx, ky) = grid.transform_order_k_meshes();
        let kin = free_dispersion(&kx, &ky, 0.0);
        EnergyOperators {
            pot_eng,
            kin_eng: [kin.clone(), kin],
            coupling: None,
            detuning: None,
        }
    }

    /// Add the Raman coupling strength and detuning grids, and shift the
    /// kinetic dispersions by the photon recoil when the coupling is
    /// momentum-dependent.
    pub fn with_coupling(mut self, grid: &SpatialGrid, config: &CouplingConfig) -> Self {
        let dim = grid.mesh_points;
        let profile = |value: f64| match config.profile {
            CouplingProfile::Uniform => Array2::from_elem(dim, value),
            CouplingProfile::Gradient => grid.x_mesh.mapv(|x| value * x / grid.r_sizes.0),
        };
        self.coupling = Some(profile(config.strength));
        self.detuning = Some(profile(config.detuning));

        if config.momentum_dependent {
            let (kx, ky) = grid.transform_order_k_meshes();
            self.kin_eng = [
                free_dispersion(&kx, &ky, config.recoil),
                free_dispersion(&kx, &ky, -config.recoil),
            ];
        }
        self
    }

    pub fn shape(&self) -> (usize, usize) {
        self.pot_eng.dim()
    }
}

impl Wavefunction {
    /// Initial trial wavefunction from the Thomas-Fermi density profile.
    ///
    /// Each component's density is the clipped profile
    /// `pop · max(0, mu - V) / g`, zero outside the Thomas-Fermi radius.
    /// The relative phase factor multiplies the down component, and the
    /// spinor is normalized so the total population equals the atom number
    /// exactly on the grid.
    pub fn thomas_fermi(
        params: &PhysicalParameters,
        scales: &DerivedScales,
        grid: &SpatialGrid,
    ) -> Result<Self, GpeError> {
        let magnitude = params.phase_factor.norm();
        if (magnitude - 1.0).abs() > PHASE_TOL {
            return Err(GpeError::InvalidPhase { magnitude });
        }

        let g = scales.interaction_strengths(&params.g_sc);
        let pot = harmonic_potential(grid, scales.y_trap);

        let amplitude = |pop: f64, g_same: f64| {
            pot.mapv(|v| (pop * (scales.chem_pot - v).max(0.0) / g_same).sqrt())
        };
        let mut up = amplitude(params.pop_frac.0, g.uu).mapv(|a| Complex::new(a, 0.0));
        let mut down = amplitude(params.pop_frac.1, g.dd).mapv(|a| a * params.phase_factor);

        let total = (up.mapv(|c| c.norm_sqr()).sum() + down.mapv(|c| c.norm_sqr()).sum())
            * grid.dv_r;
        let scale = (params.atom_num / total).sqrt();
        up.mapv_inplace(|c| c * scale);
        down.mapv_inplace(|c| c * scale);

        Ok(Wavefunction { up, down })
    }
}
