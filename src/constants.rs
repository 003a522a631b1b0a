//! Physical constants used in the spinor GPE simulation.

/// Atomic mass unit in kg
pub const ATOMIC_MASS_UNIT: f64 = 1.66053906660e-27;

/// Bohr radius in meters
pub const BOHR_RADIUS: f64 = 5.29177210903e-11;

/// Reduced Planck constant in J·s
pub const REDUCED_PLANCK_CONSTANT: f64 = 1.05457182e-34;

/// Mass of a Rubidium-87 atom in kg
pub const RB87_MASS: f64 = 86.9092 * ATOMIC_MASS_UNIT;

/// s-wave scattering length of Rubidium-87 in meters, ~100.4 Bohr radii
pub const RB87_SCATTERING_LENGTH: f64 = 100.4 * BOHR_RADIUS;

pub use std::f64::consts::PI;
