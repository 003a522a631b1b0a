//! Defines the types and structures used in the spinor GPE simulation.

use ndarray::Array2;
use num::complex::Complex;

use super::constants::*;

/// Angular trapping frequencies along the three axes [rad/s].
#[derive(Debug, Clone, Copy)]
pub struct TrapFrequencies {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Relative scattering strengths for the intra- and inter-component
/// interactions. Intercomponent scattering is symmetric, i.e. ud == du.
#[derive(Debug, Clone, Copy)]
pub struct ScatteringStrengths {
    pub uu: f64,
    pub dd: f64,
    pub ud: f64,
}

/// Physical parameters of the two-component condensate.
#[derive(Debug, Clone)]
pub struct PhysicalParameters {
    /// Total atom number.
    pub atom_num: f64,
    /// Starting population fraction in each spin component; must sum to 1.
    pub pop_frac: (f64, f64),
    /// Unit complex number; initial relative phase factor between the two
    /// spin components.
    pub phase_factor: Complex<f64>,
    pub omega: TrapFrequencies,
    pub g_sc: ScatteringStrengths,
    /// Presence of a Raman coupling between the spin components.
    pub is_coupling: bool,
}

impl Default for PhysicalParameters {
    fn default() -> Self {
        let omega0 = 2.0 * PI * 50.0;
        PhysicalParameters {
            atom_num: 1e4,
            pop_frac: (0.5, 0.5),
            phase_factor: Complex::new(1.0, 0.0),
            omega: TrapFrequencies {
                x: omega0,
                y: omega0,
                z: 40.0 * omega0,
            },
            g_sc: ScatteringStrengths {
                uu: 1.0,
                dd: 0.995,
                ud: 0.995,
            },
            is_coupling: false,
        }
    }
}

/// Imaginary-time propagation damps all but the lowest-energy mode and is
/// used to find ground states; real-time propagation simulates dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeMode {
    Imaginary,
    Real,
}

/// Compute target for a propagation run. Both targets obey the same
/// numerical contract; `Accelerator` runs the grid-point-parallel lanes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComputeTarget {
    Cpu,
    Accelerator,
}

/// Spatial profile of the coupling strength and detuning fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CouplingProfile {
    /// Constant over the whole grid.
    Uniform,
    /// Linear in the x coordinate, crossing zero at the trap center.
    Gradient,
}

/// Parameters of the Raman coupling between the spin components.
#[derive(Debug, Clone, Copy)]
pub struct CouplingConfig {
    pub profile: CouplingProfile,
    /// Peak coupling strength [hbar*omeg_x].
    pub strength: f64,
    /// Detuning from the coupling resonance [hbar*omeg_x].
    pub detuning: f64,
    /// Momentum-dependent coupling shifts each component's kinetic
    /// dispersion by the photon recoil.
    pub momentum_dependent: bool,
    /// Recoil momentum of the coupling light [1/a_x].
    pub recoil: f64,
}

/// Numerical parameters of a single propagation run; immutable once the
/// propagator has been constructed.
#[derive(Debug, Clone, Copy)]
pub struct PropagationConfig {
    /// Time-step size [1/omeg_x].
    pub dt: f64,
    /// Step budget of the run.
    pub n_steps: usize,
    pub mode: TimeMode,
    /// Diagnostics are sampled every `sample_interval` full steps.
    pub sample_interval: usize,
    /// In imaginary time, the coupling ramp advances one stage every
    /// `anneal_interval` steps; 0 disables annealing.
    pub anneal_interval: usize,
    /// Number of stages over which the coupling is ramped to full strength.
    pub anneal_stages: usize,
    pub target: ComputeTarget,
}

/// The two-component condensate wavefunction on the real-space grid.
#[derive(Debug, Clone)]
pub struct Wavefunction {
    pub up: Array2<Complex<f64>>,
    pub down: Array2<Complex<f64>>,
}

impl Wavefunction {
    pub fn shape(&self) -> (usize, usize) {
        self.up.dim()
    }

    /// Both component fields of the spinor, up first.
    pub fn components(&self) -> [&Array2<Complex<f64>>; 2] {
        [&self.up, &self.down]
    }

    /// False as soon as any field value is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        self.up
            .iter()
            .chain(self.down.iter())
            .all(|c| c.re.is_finite() && c.im.is_finite())
    }
}

/// One diagnostic record sampled during propagation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DiagnosticSample {
    /// Elapsed dimensionless time [1/omeg_x].
    pub time: f64,
    /// Total energy expectation value [hbar*omeg_x].
    pub energy: f64,
    pub pop_up: f64,
    pub pop_down: f64,
}

/// Results of a completed propagation run, owned by the caller.
#[derive(Debug, Clone)]
pub struct PropagationResult {
    /// Time-ordered diagnostic records.
    pub samples: Vec<DiagnosticSample>,
    /// The final wavefunction.
    pub psi: Wavefunction,
}
