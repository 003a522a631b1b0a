//! Integration tests of the full split-step propagation loop.

use num_complex::Complex;

use spinor_gpe::grid::{DerivedScales, EnergyOperators, SpatialGrid};
use spinor_gpe::prop::Propagator;
use spinor_gpe::types::{
    ComputeTarget, CouplingConfig, CouplingProfile, PhysicalParameters, PropagationConfig,
    TimeMode, Wavefunction,
};
use spinor_gpe::GpeError;

struct Setup {
    params: PhysicalParameters,
    scales: DerivedScales,
    grid: SpatialGrid,
    ops: EnergyOperators,
    psi: Wavefunction,
}

fn setup(params: PhysicalParameters, mesh: usize, r_size: f64) -> Setup {
    let scales = DerivedScales::derive(&params).unwrap();
    let grid = SpatialGrid::new((mesh, mesh), (r_size, r_size)).unwrap();
    let ops = EnergyOperators::new(&grid, &scales);
    let psi = Wavefunction::thomas_fermi(&params, &scales, &grid).unwrap();
    Setup {
        params,
        scales,
        grid,
        ops,
        psi,
    }
}

fn config(mode: TimeMode, dt: f64, n_steps: usize, sample_interval: usize) -> PropagationConfig {
    PropagationConfig {
        dt,
        n_steps,
        mode,
        sample_interval,
        anneal_interval: 0,
        anneal_stages: 0,
        target: ComputeTarget::Cpu,
    }
}

#[test]
fn imaginary_time_energy_is_non_increasing() {
    let s = setup(PhysicalParameters::default(), 64, 12.0);
    let g = s.scales.interaction_strengths(&s.params.g_sc);

    let prop = Propagator::new(
        &s.grid,
        s.ops,
        g,
        s.params.atom_num,
        s.psi,
        config(TimeMode::Imaginary, 1e-2, 120, 1),
    )
    .unwrap();
    let result = prop.propagate().unwrap();

    assert_eq!(result.samples.len(), 120);
    for pair in result.samples.windows(2) {
        let tolerance = 1e-6 * pair[0].energy.abs();
        assert!(
            pair[1].energy <= pair[0].energy + tolerance,
            "energy rose from {} to {} at t = {}",
            pair[0].energy,
            pair[1].energy,
            pair[1].time
        );
    }

    // The Thomas-Fermi trial state is not the ground state, so the descent
    // must be strict overall.
    let first = result.samples.first().unwrap().energy;
    let last = result.samples.last().unwrap().energy;
    assert!(last < first);
}

#[test]
fn real_time_conserves_population() {
    let s = setup(PhysicalParameters::default(), 64, 12.0);
    let g = s.scales.interaction_strengths(&s.params.g_sc);

    let prop = Propagator::new(
        &s.grid,
        s.ops,
        g,
        s.params.atom_num,
        s.psi,
        config(TimeMode::Real, 2e-3, 1000, 100),
    )
    .unwrap();
    let result = prop.propagate().unwrap();

    assert_eq!(result.samples.len(), 10);
    for sample in &result.samples {
        let total = sample.pop_up + sample.pop_down;
        let drift = (total - s.params.atom_num).abs() / s.params.atom_num;
        assert!(drift < 1e-6, "population drifted by {drift:.3e} at t = {}", sample.time);
    }
}

#[test]
fn nan_injection_aborts_without_touching_diagnostics() {
    let s = setup(PhysicalParameters::default(), 32, 8.0);
    let g = s.scales.interaction_strengths(&s.params.g_sc);

    // A healthy short run, whose diagnostics the fault must not disturb.
    let prop = Propagator::new(
        &s.grid,
        s.ops.clone(),
        g,
        s.params.atom_num,
        s.psi.clone(),
        config(TimeMode::Imaginary, 1e-2, 3, 1),
    )
    .unwrap();
    let healthy = prop.propagate().unwrap();
    assert_eq!(healthy.samples.len(), 3);

    // Inject a NaN and take one more step.
    let mut poisoned = healthy.psi.clone();
    poisoned.up[[0, 0]] = Complex::new(f64::NAN, 0.0);
    let prop = Propagator::new(
        &s.grid,
        s.ops,
        g,
        s.params.atom_num,
        poisoned,
        config(TimeMode::Imaginary, 1e-2, 1, 1),
    )
    .unwrap();

    match prop.propagate() {
        Err(GpeError::NumericalDivergence { step, samples }) => {
            assert_eq!(step, 0);
            assert!(samples.is_empty());
        }
        other => panic!("expected numerical divergence, got {other:?}"),
    }

    // The prior run's diagnostics are untouched.
    assert_eq!(healthy.samples.len(), 3);
    assert!(healthy.samples.iter().all(|s| s.energy.is_finite()));
}

#[test]
fn accelerator_target_matches_cpu() {
    let s = setup(PhysicalParameters::default(), 32, 8.0);
    let g = s.scales.interaction_strengths(&s.params.g_sc);

    let cpu = Propagator::new(
        &s.grid,
        s.ops.clone(),
        g,
        s.params.atom_num,
        s.psi.clone(),
        config(TimeMode::Imaginary, 1e-2, 20, 20),
    )
    .unwrap()
    .propagate()
    .unwrap();

    let mut accel_config = config(TimeMode::Imaginary, 1e-2, 20, 20);
    accel_config.target = ComputeTarget::Accelerator;
    let accel = Propagator::new(&s.grid, s.ops, g, s.params.atom_num, s.psi, accel_config)
        .unwrap()
        .propagate()
        .unwrap();

    let cpu_energy = cpu.samples.last().unwrap().energy;
    let accel_energy = accel.samples.last().unwrap().energy;
    assert!((cpu_energy - accel_energy).abs() < 1e-9 * cpu_energy.abs());

    let max_diff = cpu
        .psi
        .up
        .iter()
        .zip(accel.psi.up.iter())
        .map(|(a, b)| (a - b).norm())
        .fold(0.0, f64::max);
    assert!(max_diff < 1e-9);
}

#[test]
fn annealed_coupling_balances_populations() {
    let params = PhysicalParameters {
        pop_frac: (0.7, 0.3),
        is_coupling: true,
        ..Default::default()
    };
    let s = setup(params, 64, 12.0);
    let g = s.scales.interaction_strengths(&s.params.g_sc);

    let coupling = CouplingConfig {
        profile: CouplingProfile::Uniform,
        strength: 1.0,
        detuning: 0.0,
        momentum_dependent: false,
        recoil: 0.0,
    };
    let ops = s.ops.with_coupling(&s.grid, &coupling);

    let run_config = PropagationConfig {
        dt: 1e-2,
        n_steps: 200,
        mode: TimeMode::Imaginary,
        sample_interval: 10,
        anneal_interval: 10,
        anneal_stages: 4,
        target: ComputeTarget::Cpu,
    };
    let prop = Propagator::new(&s.grid, ops, g, s.params.atom_num, s.psi, run_config).unwrap();
    let result = prop.propagate().unwrap();

    // The coupled ground state splits the population evenly; imaginary time
    // pulls the imbalanced trial state toward it.
    let first = result.samples.first().unwrap();
    let last = result.samples.last().unwrap();
    let initial_gap = (first.pop_up - first.pop_down).abs();
    let final_gap = (last.pop_up - last.pop_down).abs();
    assert!(
        final_gap < 0.5 * initial_gap,
        "population gap only moved from {initial_gap} to {final_gap}"
    );
    assert!(result.samples.iter().all(|s| s.energy.is_finite()));
}
