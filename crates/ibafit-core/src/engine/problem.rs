use super::config::DeParameter;
use super::error::EngineError;
use super::genes::{GeneSpace, Individual};
use crate::core::models::calculation::CalculationSetup;
use crate::core::models::setup::{DetectorSetup, ExperimentalSetup};
use crate::core::models::spectrum::{ChannelWindow, MeasuredSpectrum, SimulationData};
use crate::core::models::target::{Layer, Target};
use crate::core::physics::energy_loss::StoppingEngine;
use crate::core::simulation::{SimulationRequest, prepare_engine, simulate, simulate_with};
use tracing::debug;

/// Starting configuration of a fit. Its bounds define the search space and its nominal
/// values are what a fit result is written back into.
#[derive(Debug, Clone)]
pub struct Baseline {
    pub experiment: ExperimentalSetup,
    pub detector: DetectorSetup,
    pub target: Target,
    pub foil: Option<Layer>,
    pub calculation: CalculationSetup,
}

impl Baseline {
    pub fn request(&self, channels: usize, window: ChannelWindow) -> SimulationRequest {
        SimulationRequest {
            experiment: self.experiment.clone(),
            detector: self.detector.clone(),
            target: self.target.clone(),
            foil: self.foil.clone(),
            calculation: self.calculation.clone(),
            channels,
            window,
        }
    }

    /// Writes the fitted values of `individual` into the nominal values.
    pub fn apply(&mut self, individual: &Individual) {
        self.experiment.charge = individual.charge;
        self.detector.resolution = individual.resolution;
        self.detector.calibration.factor = individual.calibration_factor;
        self.detector.calibration.offset = individual.calibration_offset;
        self.target = individual.target.clone();
    }
}

impl From<SimulationRequest> for Baseline {
    fn from(request: SimulationRequest) -> Self {
        Self {
            experiment: request.experiment,
            detector: request.detector,
            target: request.target,
            foil: request.foil,
            calculation: request.calculation,
        }
    }
}

/// Fitness oracle for one measured spectrum, shared read-only by all evaluations.
#[derive(Debug)]
pub struct FitProblem {
    baseline: Baseline,
    measured: MeasuredSpectrum,
    compressed: Vec<f64>,
    window: ChannelWindow,
    gene_space: GeneSpace,
    template: SimulationRequest,
    engine: StoppingEngine,
}

impl FitProblem {
    pub fn new(
        baseline: Baseline,
        measured: MeasuredSpectrum,
        params: &DeParameter,
    ) -> Result<Self, EngineError> {
        if measured.is_empty() {
            return Err(EngineError::Initialization(format!(
                "measured spectrum '{}' has no channels",
                measured.label
            )));
        }
        if baseline.target.is_empty() {
            return Err(EngineError::Initialization("target has no layers".into()));
        }
        let bins = params.num_bins.max(1);
        let compressed = measured.compressed(bins).counts;
        let window = params.window.compressed(bins);

        let mut template = baseline.request(compressed.len(), window);
        template.calculation.show_elements = false;
        template.calculation.show_isotopes = false;
        template.calculation.show_layers = false;
        let engine = prepare_engine(&template);
        let gene_space = GeneSpace::new(
            &baseline.experiment,
            &baseline.detector,
            &baseline.target,
            bins,
        );
        debug!(
            genes = gene_space.len(),
            free = gene_space.free_dimensions(),
            channels = compressed.len(),
            "Prepared fit problem."
        );

        Ok(Self {
            baseline,
            measured,
            compressed,
            window,
            gene_space,
            template,
            engine,
        })
    }

    pub fn baseline(&self) -> &Baseline {
        &self.baseline
    }

    pub fn measured(&self) -> &MeasuredSpectrum {
        &self.measured
    }

    pub fn gene_space(&self) -> &GeneSpace {
        &self.gene_space
    }

    /// Fit window in compressed channels.
    pub fn window(&self) -> ChannelWindow {
        self.window
    }

    fn compressed_request(&self, individual: &Individual) -> SimulationRequest {
        let mut request = self.template.clone();
        let bins = self.gene_space.num_bins() as f64;
        request.target = individual.target.clone();
        request.experiment.charge = individual.charge;
        request.detector.resolution = individual.resolution;
        request.detector.calibration.factor = individual.calibration_factor * bins;
        request.detector.calibration.offset = individual.calibration_offset;
        request
    }

    /// Fitness of `individual` against the compressed measured spectrum. Non-finite
    /// scores map to infinity so they never win a comparison.
    pub fn evaluate(&self, individual: &Individual) -> f64 {
        let request = self.compressed_request(individual);
        let data = simulate_with(&self.engine, &request, Some(&self.compressed));
        match data.fitness {
            Some(f) if f.is_finite() => f,
            _ => f64::INFINITY,
        }
    }

    pub fn evaluate_genes(&self, genes: &[f64]) -> f64 {
        self.evaluate(&self.gene_space.decode(genes))
    }

    /// Full-resolution simulation of `individual`, scored over the uncompressed window.
    pub fn simulate_individual(&self, individual: &Individual, window: ChannelWindow) -> SimulationData {
        let mut baseline = self.baseline.clone();
        baseline.apply(individual);
        let request = baseline.request(self.measured.len(), window);
        simulate(&request, Some(&self.measured.counts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::simulation::fixtures::carbon_request;

    fn params(num_bins: usize) -> DeParameter {
        DeParameter::builder()
            .population_size(8)
            .generations(2)
            .window(0, 1000)
            .num_bins(num_bins)
            .build()
            .unwrap()
    }

    #[test]
    fn baseline_individual_reproduces_its_own_spectrum() {
        let request = carbon_request();
        let measured = simulate(&request, None).counts;
        let problem = FitProblem::new(
            Baseline::from(request.clone()),
            MeasuredSpectrum::new("self", measured),
            &params(1),
        )
        .unwrap();
        let genes = problem.gene_space().encode(&problem.gene_space().decode(&[
            10.0, 15.0, 1.0, 0.0, 5000.0, 1.0,
        ]));
        assert!(problem.evaluate_genes(&genes) < 1e-12);

        let thinner = problem.gene_space().decode(&[10.0, 15.0, 1.0, 0.0, 3000.0, 1.0]);
        assert!(problem.evaluate(&thinner) > 0.0);
    }

    #[test]
    fn binned_fit_scores_compressed_channels() {
        let request = carbon_request();
        let measured = simulate(&request, None).counts;
        let problem = FitProblem::new(
            Baseline::from(request.clone()),
            MeasuredSpectrum::new("self", measured),
            &params(4),
        )
        .unwrap();
        assert_eq!(problem.window(), ChannelWindow::new(0, 250));
        let nominal = problem.gene_space().decode(&[10.0, 15.0, 4.0, 0.0, 5000.0, 1.0]);
        assert_eq!(nominal.calibration_factor, 1.0);
        let better = problem.evaluate(&nominal);
        let worse = problem.evaluate(&problem.gene_space().decode(&[10.0, 15.0, 4.0, 0.0, 2500.0, 1.0]));
        assert!(better < worse);
    }

    #[test]
    fn empty_measured_spectrum_is_rejected() {
        let request = carbon_request();
        let result = FitProblem::new(
            Baseline::from(request.clone()),
            MeasuredSpectrum::new("empty", Vec::new()),
            &params(1),
        );
        assert!(matches!(result, Err(EngineError::Initialization(_))));
    }

    #[test]
    fn apply_writes_fitted_values_into_baseline() {
        let request = carbon_request();
        let mut baseline = Baseline::from(request.clone());
        let space = GeneSpace::new(&baseline.experiment, &baseline.detector, &baseline.target, 2);
        let individual = space.decode(&[12.0, 20.0, 2.0, 0.0, 4000.0, 1.0]);
        baseline.apply(&individual);
        assert_eq!(baseline.experiment.charge, 12.0);
        assert_eq!(baseline.detector.calibration.factor, 1.0);
        let (_, layer) = baseline.target.layers().next().unwrap();
        assert_eq!(layer.thickness, 4000.0);
    }
}
