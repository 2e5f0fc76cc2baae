use super::fitness::fitness;
use crate::core::models::calculation::CalculationSetup;
use crate::core::models::setup::{DetectorSetup, ExperimentalSetup};
use crate::core::models::spectrum::{ChannelWindow, ComponentKind, ComponentSpectrum, SimulationData};
use crate::core::models::target::{Layer, Target};
use crate::core::physics::charge_fraction::charge_fraction;
use crate::core::physics::cross_section;
use crate::core::physics::energy_loss::{Medium, Passage, StoppingEngine};
use crate::core::physics::kinematics::{kinematic_factor, scattered_energy};
use crate::core::physics::math::{box_gauss_fraction, fwhm_to_variance};
use std::time::Instant;
use tracing::warn;

/// µC → particles, msr → sr, mb → cm², 1e15 atoms/cm² → atoms/cm².
const YIELD_UNITS: f64 = 6.2415e12 * 1e-3 * 1e-27 * 1e15;
/// Upper bound on depth slices per layer.
const MAX_SLICES_PER_LAYER: f64 = 200.0;
/// Gaussian tails beyond this many standard deviations are not deposited.
const TAIL_SIGMAS: f64 = 6.0;

/// Everything needed to simulate one spectrum.
#[derive(Debug, Clone)]
pub struct SimulationRequest {
    pub experiment: ExperimentalSetup,
    pub detector: DetectorSetup,
    pub target: Target,
    /// Stripping foil in front of the detector, crossed at normal incidence.
    pub foil: Option<Layer>,
    pub calculation: CalculationSetup,
    pub channels: usize,
    pub window: ChannelWindow,
}

/// Builds a stopping engine that knows every element of the target and foil.
pub fn prepare_engine(request: &SimulationRequest) -> StoppingEngine {
    let mut engine = StoppingEngine::new(
        request.experiment.projectile,
        &request.calculation,
        request.experiment.beam_energy + 3.0 * request.experiment.energy_spread,
    );
    for (_, layer) in request.target.layers() {
        engine.register(layer);
    }
    if let Some(foil) = &request.foil {
        engine.register(foil);
    }
    engine
}

/// Simulates the spectrum of `request`, scoring it against `measured` when given.
pub fn simulate(request: &SimulationRequest, measured: Option<&[f64]>) -> SimulationData {
    let engine = prepare_engine(request);
    simulate_with(&engine, request, measured)
}

/// Like [`simulate`], reusing a prepared engine. Elements unknown to the engine are
/// evaluated directly.
pub fn simulate_with(
    engine: &StoppingEngine,
    request: &SimulationRequest,
    measured: Option<&[f64]>,
) -> SimulationData {
    let started = Instant::now();
    let calibration = &request.detector.calibration;
    let energies: Vec<f64> = (0..request.channels)
        .map(|c| calibration.energy_of(c as f64))
        .collect();
    let mut spectrum = SpectrumAccumulator::new(request);

    if calibration.factor > 0.0 {
        accumulate(engine, request, &mut spectrum);
    } else {
        warn!(
            factor = calibration.factor,
            "Non-positive calibration factor; returning an empty spectrum."
        );
    }

    let SpectrumAccumulator {
        counts, components, ..
    } = spectrum;
    let fitness = measured.map(|m| fitness(&counts, m, request.window));
    SimulationData {
        energies,
        counts,
        components,
        elapsed: started.elapsed(),
        fitness,
    }
}

struct LayerContext<'a> {
    layer: &'a Layer,
    medium: Medium,
    scatterers: Vec<Scatterer>,
}

/// One scattering nucleus species of a layer.
struct Scatterer {
    z: u8,
    mass: f64,
    /// Atomic fraction times isotopic abundance.
    weight: f64,
    kinematic_factor: f64,
}

fn scatterers(layer: &Layer, projectile_mass: f64, theta: f64, isotopes: bool) -> Vec<Scatterer> {
    let mut out = Vec::new();
    for element in &layer.elements {
        let species: Vec<(f64, f64)> = if isotopes {
            element.isotopes.iter().map(|i| (i.mass, i.abundance)).collect()
        } else {
            vec![(element.mass(), 1.0)]
        };
        for (mass, abundance) in species {
            // species that cannot scatter into the detector are dropped
            if let Some(k) = kinematic_factor(projectile_mass, mass, theta) {
                out.push(Scatterer {
                    z: element.z,
                    mass,
                    weight: element.fraction * abundance,
                    kinematic_factor: k,
                });
            }
        }
    }
    out
}

fn accumulate(engine: &StoppingEngine, request: &SimulationRequest, spectrum: &mut SpectrumAccumulator) {
    let experiment = &request.experiment;
    let calculation = &request.calculation;
    let projectile = experiment.projectile;
    let path_in = experiment.inbound_path_factor();
    let path_out = experiment.outbound_path_factor();
    let theta = experiment.theta;

    let layers: Vec<LayerContext> = request
        .target
        .layers()
        .enumerate()
        .map(|(index, (_, layer))| LayerContext {
            layer,
            medium: engine.medium(layer, calculation.correction_factor(index)),
            scatterers: scatterers(layer, projectile.mass, theta, calculation.simulate_isotopes),
        })
        .collect();
    let foil = request
        .foil
        .as_ref()
        .filter(|f| !f.is_empty())
        .map(|f| (engine.medium(f, 1.0), f.thickness));

    let base_variance = fwhm_to_variance(request.detector.resolution);
    let mut energy = experiment.beam_energy;
    let mut variance = 0.0;

    'layers: for (index, ctx) in layers.iter().enumerate() {
        if ctx.layer.is_empty() {
            continue;
        }
        let slice_thickness = (ctx.layer.thickness / MAX_SLICES_PER_LAYER).max(engine.depth_step());
        let slices = (ctx.layer.thickness / slice_thickness).ceil().max(1.0) as usize;
        let dt = ctx.layer.thickness / slices as f64;

        // carries a scattered particle from `depth` inside this layer out to the detector
        let outbound = |e: f64, var: f64, depth: f64| -> Option<Passage> {
            let mut passage = engine.traverse(&ctx.medium, e, var, depth * path_out)?;
            for upper in layers[..index].iter().rev() {
                if upper.layer.is_empty() {
                    continue;
                }
                passage = engine.traverse(
                    &upper.medium,
                    passage.energy,
                    passage.variance,
                    upper.layer.thickness * path_out,
                )?;
            }
            match &foil {
                Some((medium, thickness)) => {
                    engine.traverse(medium, passage.energy, passage.variance, *thickness)
                }
                None => Some(passage),
            }
        };

        for slice in 0..slices {
            let Some(exit) = engine.traverse(&ctx.medium, energy, variance, dt * path_in) else {
                break 'layers;
            };
            let mean_energy = 0.5 * (energy + exit.energy);

            for scatterer in &ctx.scatterers {
                let k = scatterer.kinematic_factor;
                let Some(front) = outbound(
                    scattered_energy(k, energy),
                    k * k * variance,
                    slice as f64 * dt,
                ) else {
                    continue;
                };
                let Some(back) = outbound(
                    scattered_energy(k, exit.energy),
                    k * k * exit.variance,
                    (slice + 1) as f64 * dt,
                ) else {
                    continue;
                };

                let sigma_r = cross_section::screened(
                    calculation.screening,
                    projectile.z,
                    projectile.mass,
                    scatterer.z,
                    scatterer.mass,
                    mean_energy,
                    theta,
                );
                let detected = 0.5 * (front.energy + back.energy);
                let fraction = charge_fraction(
                    calculation.charge_fraction,
                    &calculation.charge_fraction_params,
                    detected,
                );
                let yield_counts = experiment.charge
                    * request.detector.solid_angle
                    * sigma_r
                    * dt
                    * path_in
                    * scatterer.weight
                    * YIELD_UNITS
                    * fraction;
                if yield_counts.is_nan() || yield_counts <= 0.0 {
                    continue;
                }
                let sigma = (base_variance
                    + fwhm_to_variance(k * experiment.energy_spread)
                    + 0.5 * (front.variance + back.variance))
                    .sqrt();
                spectrum.deposit(
                    Deposit {
                        layer: index,
                        z: scatterer.z,
                        mass: scatterer.mass,
                    },
                    back.energy,
                    front.energy,
                    sigma,
                    yield_counts,
                );
            }
            energy = exit.energy;
            variance = exit.variance;
        }
    }
}

#[derive(Clone, Copy)]
struct Deposit {
    layer: usize,
    z: u8,
    mass: f64,
}

struct SpectrumAccumulator {
    counts: Vec<f64>,
    components: Vec<ComponentSpectrum>,
    offset: f64,
    factor: f64,
    show_layers: bool,
    show_elements: bool,
    show_isotopes: bool,
    scratch: Vec<f64>,
}

impl SpectrumAccumulator {
    fn new(request: &SimulationRequest) -> Self {
        let calibration = &request.detector.calibration;
        Self {
            counts: vec![0.0; request.channels],
            components: Vec::new(),
            offset: calibration.offset,
            factor: calibration.factor,
            show_layers: request.calculation.show_layers,
            show_elements: request.calculation.show_elements,
            show_isotopes: request.calculation.show_isotopes,
            scratch: Vec::new(),
        }
    }

    fn channel_of(&self, energy: f64) -> f64 {
        (energy - self.offset) / self.factor
    }

    fn deposit(&mut self, source: Deposit, e_low: f64, e_high: f64, sigma: f64, amount: f64) {
        let n = self.counts.len();
        if n == 0 {
            return;
        }
        let reach = TAIL_SIGMAS * sigma;
        let first = self.channel_of(e_low.min(e_high) - reach).floor();
        let last = self.channel_of(e_low.max(e_high) + reach).ceil();
        if last < 0.0 || first >= n as f64 {
            return;
        }
        let first = first.max(0.0) as usize;
        let last = (last as usize).min(n - 1);

        self.scratch.clear();
        for c in first..=last {
            let a = self.offset + self.factor * c as f64;
            let b = a + self.factor;
            let share = amount * box_gauss_fraction(a, b, e_low, e_high, sigma);
            self.counts[c] += share;
            self.scratch.push(share);
        }

        if self.show_layers {
            self.add_component(ComponentKind::Layer { index: source.layer }, first);
        }
        if self.show_elements {
            self.add_component(
                ComponentKind::Element {
                    layer: source.layer,
                    z: source.z,
                },
                first,
            );
        }
        if self.show_isotopes {
            self.add_component(
                ComponentKind::Isotope {
                    layer: source.layer,
                    z: source.z,
                    mass: source.mass,
                },
                first,
            );
        }
    }

    fn add_component(&mut self, kind: ComponentKind, first: usize) {
        let n = self.counts.len();
        let index = match self.components.iter().position(|c| c.kind == kind) {
            Some(i) => i,
            None => {
                self.components.push(ComponentSpectrum {
                    kind,
                    counts: vec![0.0; n],
                });
                self.components.len() - 1
            }
        };
        let target = &mut self.components[index].counts;
        for (offset, share) in self.scratch.iter().enumerate() {
            target[first + offset] += share;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::calculation::StragglingModel;
    use crate::core::models::target::LayerElement;
    use crate::core::simulation::fixtures::carbon_request;

    fn steepest_rise(counts: &[f64]) -> usize {
        // the high-energy edge is the most negative slope going up in channel
        (1..counts.len())
            .min_by(|&a, &b| {
                let da = counts[a] - counts[a - 1];
                let db = counts[b] - counts[b - 1];
                da.partial_cmp(&db).unwrap()
            })
            .unwrap()
    }

    #[test]
    fn surface_edge_sits_at_kinematic_energy() {
        let request = carbon_request();
        let data = simulate(&request, None);
        let k = kinematic_factor(4.002603, 12.0, 160.0).unwrap();
        let expected = request.detector.calibration.channel_of(k * 2000.0);
        let edge = steepest_rise(&data.counts) as f64;
        assert!((edge - expected).abs() <= 10.0, "edge {edge}, expected {expected}");
        assert!(data.fitness.is_none());
        assert_eq!(data.energies.len(), 2048);
        assert!(data.total_counts() > 0.0);
    }

    #[test]
    fn simulation_is_deterministic() {
        let request = carbon_request();
        let a = simulate(&request, None);
        let b = simulate(&request, None);
        assert_eq!(a.counts, b.counts);
    }

    #[test]
    fn self_fitness_is_zero_and_perturbation_is_positive() {
        let request = carbon_request();
        let reference = simulate(&request, None);
        let same = simulate(&request, Some(&reference.counts));
        assert_eq!(same.fitness, Some(0.0));

        let mut thinner = request.clone();
        for layer in thinner.target.layers_mut() {
            layer.thickness = 3000.0;
        }
        let other = simulate(&thinner, Some(&reference.counts));
        assert!(other.fitness.unwrap() > 0.0);
    }

    #[test]
    fn components_sum_to_total() {
        let mut request = carbon_request();
        request.calculation.show_layers = true;
        request.calculation.show_isotopes = true;
        let data = simulate(&request, None);
        let layer_total: f64 = data
            .components
            .iter()
            .filter(|c| matches!(c.kind, ComponentKind::Layer { .. }))
            .flat_map(|c| c.counts.iter())
            .sum();
        assert!((layer_total - data.total_counts()).abs() < 1e-6 * data.total_counts());
        let isotopes = data
            .components
            .iter()
            .filter(|c| matches!(c.kind, ComponentKind::Isotope { .. }))
            .count();
        assert_eq!(isotopes, 2);
    }

    #[test]
    fn yield_scales_with_charge() {
        let request = carbon_request();
        let mut doubled = request.clone();
        doubled.experiment.charge *= 2.0;
        let a = simulate(&request, None).total_counts();
        let b = simulate(&doubled, None).total_counts();
        assert!((b / a - 2.0).abs() < 1e-9);
    }

    #[test]
    fn foil_shifts_edge_to_lower_energy() {
        let request = carbon_request();
        let mut with_foil = request.clone();
        with_foil.foil = Some(
            Layer::new(2000.0).with_element(LayerElement::from_symbol("C", 1.0).unwrap()),
        );
        with_foil.calculation.straggling = StragglingModel::None;
        let a = steepest_rise(&simulate(&request, None).counts);
        let b = steepest_rise(&simulate(&with_foil, None).counts);
        assert!(b < a);
    }

    #[test]
    fn lookup_table_barely_changes_fitness() {
        use crate::core::physics::lookup::LOOKUP_FITNESS_TOLERANCE;

        let request = carbon_request();
        let reference = simulate(&request, None);
        let mut direct = request.clone();
        direct.calculation.use_lookup_table = false;
        let data = simulate(&direct, Some(&reference.counts));
        let mean: f64 = reference.counts[..1000].iter().sum::<f64>() / 1000.0;
        assert!(data.fitness.unwrap() < LOOKUP_FITNESS_TOLERANCE * mean);
    }

    #[test]
    fn bad_calibration_returns_empty_spectrum() {
        let mut request = carbon_request();
        request.detector.calibration.factor = 0.0;
        let data = simulate(&request, None);
        assert_eq!(data.total_counts(), 0.0);
        assert_eq!(data.counts.len(), 2048);
    }
}
