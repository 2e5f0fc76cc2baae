use crate::core::models::spectrum::{MeasuredSpectrum, SimulationData};
use crate::engine::cancel::CancellationToken;
use crate::engine::config::DeParameter;
use crate::engine::error::EngineError;
use crate::engine::evolution::{EvolutionOutcome, evolve};
use crate::engine::genes::Individual;
use crate::engine::problem::{Baseline, FitProblem};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::Termination;
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct FitOutcome {
    pub label: String,
    pub best: Individual,
    pub initial_best_fitness: f64,
    pub history: Vec<f64>,
    pub generations_completed: usize,
    pub termination: Termination,
    /// Best Individual simulated at full channel resolution against the measured spectrum.
    pub simulation: SimulationData,
}

impl FitOutcome {
    /// Writes the best Individual back into `baseline`.
    pub fn apply_to(&self, baseline: &mut Baseline) {
        baseline.apply(&self.best);
    }

    pub fn from_evolution(
        problem: &FitProblem,
        params: &DeParameter,
        evolution: EvolutionOutcome,
    ) -> Self {
        let simulation = problem.simulate_individual(&evolution.best, params.window);
        Self {
            label: problem.measured().label.clone(),
            best: evolution.best,
            initial_best_fitness: evolution.initial_best_fitness,
            history: evolution.history,
            generations_completed: evolution.generations_completed,
            termination: evolution.termination,
            simulation,
        }
    }
}

/// Fits `baseline` to `measured` on the calling thread.
#[instrument(skip_all, name = "fit_workflow", fields(spectrum = %measured.label))]
pub fn run(
    baseline: &Baseline,
    measured: MeasuredSpectrum,
    params: &DeParameter,
    cancel: &CancellationToken,
    reporter: &ProgressReporter,
) -> Result<FitOutcome, EngineError> {
    reporter.report(Progress::PhaseStart {
        name: "Preparation",
    });
    let problem = FitProblem::new(baseline.clone(), measured, params)?;
    info!(
        channels = problem.measured().len(),
        genes = problem.gene_space().len(),
        bins = params.num_bins,
        "Fit problem prepared."
    );
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart { name: "Evolution" });
    let evolution = evolve(&problem, params, cancel, reporter)?;
    reporter.report(Progress::PhaseFinish);

    reporter.report(Progress::PhaseStart {
        name: "Final Simulation",
    });
    let outcome = FitOutcome::from_evolution(&problem, params, evolution);
    reporter.report(Progress::PhaseFinish);

    info!(
        fitness = outcome.best.fitness,
        initial = outcome.initial_best_fitness,
        termination = %outcome.termination,
        "Fit finished."
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::simulation::fixtures::carbon_request;
    use crate::core::simulation::simulate;

    #[test]
    fn fit_improves_on_initial_population_and_applies() {
        let request = carbon_request();
        let measured = MeasuredSpectrum::new("carbon", simulate(&request, None).counts);
        let mut baseline = Baseline::from(request);
        let params = DeParameter::builder()
            .population_size(10)
            .generations(8)
            .window(0, 1000)
            .num_bins(4)
            .seed(Some(2024))
            .build()
            .unwrap();

        let outcome = run(
            &baseline,
            measured,
            &params,
            &CancellationToken::new(),
            &ProgressReporter::new(),
        )
        .unwrap();
        assert!(outcome.best.fitness <= outcome.initial_best_fitness);
        assert_eq!(outcome.simulation.counts.len(), 2048);
        assert!(outcome.simulation.fitness.is_some());

        outcome.apply_to(&mut baseline);
        let (_, layer) = baseline.target.layers().next().unwrap();
        assert_eq!(
            layer.thickness,
            outcome.best.target.layers().next().unwrap().1.thickness
        );
        assert_eq!(baseline.detector.calibration.factor, 1.0);
    }

    #[test]
    fn cancelled_fit_still_returns_best_of_initial_population() {
        let request = carbon_request();
        let measured = MeasuredSpectrum::new("carbon", simulate(&request, None).counts);
        let params = DeParameter::builder()
            .population_size(5)
            .generations(50)
            .window(0, 1000)
            .num_bins(8)
            .seed(Some(1))
            .build()
            .unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome = run(
            &Baseline::from(request),
            measured,
            &params,
            &cancel,
            &ProgressReporter::new(),
        )
        .unwrap();
        assert_eq!(outcome.termination, Termination::Cancelled);
        assert_eq!(outcome.generations_completed, 0);
        assert_eq!(outcome.best.fitness, outcome.initial_best_fitness);
    }
}
