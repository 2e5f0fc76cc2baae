use super::spectrum::SimulationRequest;
use crate::core::models::calculation::CalculationSetup;
use crate::core::models::setup::Projectile;
use crate::core::models::target::Layer;
use crate::core::physics::energy_loss::StoppingEngine;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, StandardNormal};

/// eV/(1e15 atoms/cm²) → MeV·cm²/mg for one amu of average atomic mass.
const MASS_STOPPING_PER_AMU: f64 = 0.60221;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoppingPoint {
    pub energy: f64,
    /// eV/(1e15 atoms/cm²).
    pub stopping: f64,
    /// MeV·cm²/mg.
    pub mass_stopping: f64,
}

/// Stopping of `projectile` in `layer` at each of `energies` (keV).
pub fn stopping_curve(
    projectile: Projectile,
    calculation: &CalculationSetup,
    layer: &Layer,
    energies: &[f64],
) -> Vec<StoppingPoint> {
    let mut layer = layer.clone();
    layer.normalize();
    let max_energy = energies.iter().copied().fold(0.0, f64::max);
    let mut engine = StoppingEngine::new(projectile, calculation, max_energy);
    engine.register(&layer);
    let medium = engine.medium(&layer, 1.0);
    let mean_mass = layer.mean_mass();
    energies
        .iter()
        .map(|&energy| {
            let stopping = engine.stopping(&medium, energy);
            let mass_stopping = if mean_mass > 0.0 {
                stopping * MASS_STOPPING_PER_AMU / mean_mass
            } else {
                0.0
            };
            StoppingPoint {
                energy,
                stopping,
                mass_stopping,
            }
        })
        .collect()
}

/// Evenly spaced energies from `from` to `to` inclusive.
pub fn energy_grid(from: f64, to: f64, points: usize) -> Vec<f64> {
    match points {
        0 => Vec::new(),
        1 => vec![from],
        _ => {
            let step = (to - from) / (points - 1) as f64;
            (0..points).map(|i| from + step * i as f64).collect()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthPoint {
    /// Depth below the surface along the normal, 1e15 atoms/cm².
    pub depth: f64,
    pub layer: usize,
    /// Projectile energy at this depth, keV.
    pub energy: f64,
}

/// Energy of the incoming projectile versus depth, sampled every depth step, until it
/// leaves the target or is stopped.
pub fn penetration_profile(request: &SimulationRequest) -> Vec<DepthPoint> {
    let engine = super::spectrum::prepare_engine(request);
    let path_in = request.experiment.inbound_path_factor();
    let step = engine.depth_step();
    let mut energy = request.experiment.beam_energy;
    let mut depth = 0.0;
    let mut profile = vec![DepthPoint {
        depth,
        layer: 0,
        energy,
    }];

    for (index, (_, layer)) in request.target.layers().enumerate() {
        if layer.is_empty() {
            continue;
        }
        let medium = engine.medium(layer, request.calculation.correction_factor(index));
        let mut crossed = 0.0;
        while crossed < layer.thickness {
            let dx = step.min(layer.thickness - crossed);
            match engine.traverse(&medium, energy, 0.0, dx * path_in) {
                Some(passage) => energy = passage.energy,
                None => {
                    profile.push(DepthPoint {
                        depth: depth + dx,
                        layer: index,
                        energy: 0.0,
                    });
                    return profile;
                }
            }
            crossed += dx;
            depth += dx;
            profile.push(DepthPoint {
                depth,
                layer: index,
                energy,
            });
        }
    }
    profile
}

/// Adds Gaussian counting noise of width √N to each channel. A fixed `seed` makes the
/// result reproducible.
///
/// Unlike plain `N + √N·z` noise, each channel is rounded to whole counts and clamped at
/// zero, so the output reads like a measured counts file.
pub fn add_counting_noise(counts: &[f64], seed: Option<u64>) -> Vec<f64> {
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    counts
        .iter()
        .map(|&n| {
            let n = n.max(0.0);
            let z: f64 = StandardNormal.sample(&mut rng);
            (n + n.sqrt() * z).round().max(0.0)
        })
        .collect()
}
