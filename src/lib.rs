//! Simulation of a pseudospin-1/2 Bose-Einstein condensate.
//!
//! The condensate is governed by a pair of coupled Gross-Pitaevskii
//! equations; in the dimensionless units built by [`grid::DerivedScales`]
//! they read:
//!
//! \[
//! i \frac{\partial \psi_\uparrow}{\partial t} = \left[-\frac{\nabla^2}{2}
//! + V(\mathbf{r}) + g_{\uparrow\uparrow}|\psi_\uparrow|^2
//! + g_{\uparrow\downarrow}|\psi_\downarrow|^2
//! + \frac{\delta}{2}\right]\psi_\uparrow
//! + \frac{\Omega}{2}\psi_\downarrow
//! \]
//!
//! and the mirrored equation for \(\psi_\downarrow\), where
//! \(V(\mathbf{r})\) is the harmonic trap, \(g_{ij}\) are the quasi-2D
//! mean-field interaction strengths, and \(\Omega\) and \(\delta\) are the
//! optional Raman coupling strength and detuning fields.
//!
//! [`prop::Propagator`] advances the spinor in real or imaginary time with
//! a fourth-order symmetric split-step spectral method, on the CPU or on
//! the data-parallel accelerator backend.

pub mod constants;
pub mod diag;
pub mod error;
pub mod grid;
pub mod prop;
pub mod tensor;
pub mod types;
pub mod utils;

pub use error::GpeError;
pub use grid::{DerivedScales, EnergyOperators, InteractionStrengths, SpatialGrid};
pub use prop::Propagator;
pub use types::{
    ComputeTarget, CouplingConfig, CouplingProfile, DiagnosticSample, PhysicalParameters,
    PropagationConfig, PropagationResult, TimeMode, Wavefunction,
};
