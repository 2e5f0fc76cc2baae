use super::cancel::CancellationToken;
use super::config::DeParameter;
use super::error::EngineError;
use super::genes::Individual;
use super::problem::FitProblem;
use super::progress::{GenerationReport, Progress, ProgressReporter};
use super::state::{EngineState, Termination};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, instrument};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone)]
pub struct EvolutionOutcome {
    pub best: Individual,
    /// Best fitness of the initial population.
    pub initial_best_fitness: f64,
    /// Best-so-far fitness after each generation, starting with generation 0.
    pub history: Vec<f64>,
    pub generations_completed: usize,
    pub termination: Termination,
}

struct Population {
    members: Vec<Vec<f64>>,
    fitness: Vec<f64>,
}

impl Population {
    /// Index of the first member with the lowest fitness.
    fn best_index(&self) -> usize {
        let mut best = 0;
        for (i, &f) in self.fitness.iter().enumerate().skip(1) {
            if f < self.fitness[best] {
                best = i;
            }
        }
        best
    }
}

fn evaluate_all(problem: &FitProblem, members: &[Vec<f64>], parallel: bool) -> Vec<f64> {
    #[cfg(feature = "parallel")]
    {
        if parallel {
            return members
                .par_iter()
                .map(|genes| problem.evaluate_genes(genes))
                .collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    members
        .iter()
        .map(|genes| problem.evaluate_genes(genes))
        .collect()
}

/// Three mutually distinct indices, all different from `target`.
fn donors(rng: &mut StdRng, size: usize, target: usize) -> [usize; 3] {
    let mut picked = [target; 3];
    for slot in 0..3 {
        loop {
            let candidate = rng.gen_range(0..size);
            if candidate != target && !picked[..slot].contains(&candidate) {
                picked[slot] = candidate;
                break;
            }
        }
    }
    picked
}

/// DE/rand/1/bin trial vectors for the whole population. All random draws happen here,
/// before any evaluation, so results do not depend on evaluation order.
fn trial_vectors(
    rng: &mut StdRng,
    population: &Population,
    params: &DeParameter,
    problem: &FitProblem,
) -> Vec<Vec<f64>> {
    let size = population.members.len();
    let space = problem.gene_space();
    let dims = space.len();
    (0..size)
        .map(|i| {
            let [a, b, c] = donors(rng, size, i);
            let forced = rng.gen_range(0..dims);
            let target = &population.members[i];
            let (xa, xb, xc) = (
                &population.members[a],
                &population.members[b],
                &population.members[c],
            );
            let mut trial: Vec<f64> = (0..dims)
                .map(|j| {
                    if j == forced || rng.gen_bool(params.crossover_probability) {
                        xa[j] + params.mutation_factor * (xb[j] - xc[j])
                    } else {
                        target[j]
                    }
                })
                .collect();
            space.clamp(&mut trial);
            trial
        })
        .collect()
}

/// Runs differential evolution on `problem` until the generation budget is spent or
/// `cancel` is observed at a generation boundary.
#[instrument(skip_all, name = "differential_evolution")]
pub fn evolve(
    problem: &FitProblem,
    params: &DeParameter,
    cancel: &CancellationToken,
    reporter: &ProgressReporter,
) -> Result<EvolutionOutcome, EngineError> {
    params.validate()?;
    let space = problem.gene_space();
    space.ensure_searchable()?;

    reporter.report(Progress::StateChanged(EngineState::Initializing));
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let members: Vec<Vec<f64>> = (0..params.population_size)
        .map(|_| space.sample(&mut rng))
        .collect();

    reporter.report(Progress::StateChanged(EngineState::Evaluating));
    let fitness = evaluate_all(problem, &members, params.parallel);
    let mut population = Population { members, fitness };

    let first = population.best_index();
    let mut best = space.decode(&population.members[first]);
    best.fitness = population.fitness[first];
    let initial_best_fitness = best.fitness;
    let mut history = vec![best.fitness];
    info!(
        population = params.population_size,
        genes = space.len(),
        fitness = best.fitness,
        "Initial population evaluated."
    );
    reporter.report(Progress::Generation(GenerationReport {
        generation: 0,
        best_fitness: best.fitness,
        best: best.clone(),
    }));

    reporter.report(Progress::StateChanged(EngineState::Evolving));
    reporter.report(Progress::TaskStart {
        total_steps: params.generations as u64,
    });
    let mut termination = Termination::GenerationsReached;
    let mut generations_completed = 0;

    for generation in 1..=params.generations {
        if cancel.is_cancelled() {
            termination = Termination::Cancelled;
            break;
        }

        let trials = trial_vectors(&mut rng, &population, params, problem);
        let trial_fitness = evaluate_all(problem, &trials, params.parallel);

        for (i, (trial, f)) in trials.into_iter().zip(trial_fitness).enumerate() {
            if f <= population.fitness[i] {
                population.members[i] = trial;
                population.fitness[i] = f;
            }
        }

        let leader = population.best_index();
        if population.fitness[leader] < best.fitness {
            best = space.decode(&population.members[leader]);
            best.fitness = population.fitness[leader];
        }
        history.push(best.fitness);
        generations_completed = generation;
        debug!(generation, fitness = best.fitness, "Generation complete.");

        reporter.report(Progress::Generation(GenerationReport {
            generation,
            best_fitness: best.fitness,
            best: best.clone(),
        }));
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::StateChanged(termination.final_state()));
    info!(
        generations = generations_completed,
        fitness = best.fitness,
        %termination,
        "Differential evolution finished."
    );

    Ok(EvolutionOutcome {
        best,
        initial_best_fitness,
        history,
        generations_completed,
        termination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::bounds::Bounds;
    use crate::core::models::spectrum::MeasuredSpectrum;
    use crate::core::models::target::{Layer, LayerElement, Target};
    use crate::core::simulation::fixtures::carbon_request;
    use crate::core::simulation::simulate;
    use crate::engine::problem::Baseline;
    use std::sync::Mutex;

    fn problem(params: &DeParameter) -> FitProblem {
        let request = carbon_request();
        let measured = simulate(&request, None).counts;
        FitProblem::new(
            Baseline::from(request),
            MeasuredSpectrum::new("carbon", measured),
            params,
        )
        .unwrap()
    }

    fn params(seed: u64) -> DeParameter {
        DeParameter::builder()
            .population_size(8)
            .generations(6)
            .window(0, 1000)
            .num_bins(2)
            .seed(Some(seed))
            .build()
            .unwrap()
    }

    #[test]
    fn donors_are_distinct_and_exclude_target() {
        let mut rng = StdRng::seed_from_u64(1);
        for target in 0..4 {
            for _ in 0..50 {
                let [a, b, c] = donors(&mut rng, 4, target);
                assert!(a != target && b != target && c != target);
                assert!(a != b && b != c && a != c);
            }
        }
    }

    #[test]
    fn best_fitness_never_increases() {
        let params = params(11);
        let problem = problem(&params);
        let outcome = evolve(&problem, &params, &CancellationToken::new(), &ProgressReporter::new())
            .unwrap();
        assert_eq!(outcome.history.len(), 7);
        assert!(outcome.history.windows(2).all(|w| w[1] <= w[0]));
        assert!(outcome.best.fitness <= outcome.initial_best_fitness);
        assert_eq!(outcome.termination, Termination::GenerationsReached);
        let (_, layer) = outcome.best.target.layers().next().unwrap();
        assert!((2000.0..=8000.0).contains(&layer.thickness));
    }

    #[test]
    fn reported_individuals_respect_every_gene_bound() {
        let mut request = carbon_request();
        let mut target = Target::new();
        target.push_layer(
            Layer::new(3000.0)
                .with_thickness_bounds(Bounds::new(1000.0, 6000.0))
                .with_element(LayerElement::from_symbol("Si", 0.4).unwrap())
                .with_element(
                    LayerElement::from_symbol("O", 0.4)
                        .unwrap()
                        .with_fraction_bounds(Bounds::new(0.2, 0.5)),
                )
                .with_element(
                    LayerElement::from_symbol("C", 0.2)
                        .unwrap()
                        .with_fraction_bounds(Bounds::new(0.1, 0.4)),
                ),
        );
        request.target = target;
        let params = params(21);
        let measured = simulate(&request, None).counts;
        let problem = FitProblem::new(
            Baseline::from(request),
            MeasuredSpectrum::new("ternary", measured),
            &params,
        )
        .unwrap();

        let reported = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::Generation(report) = event {
                reported.lock().unwrap().push(report.best);
            }
        }));
        evolve(&problem, &params, &CancellationToken::new(), &reporter).unwrap();
        drop(reporter);

        let reported = reported.into_inner().unwrap();
        assert_eq!(reported.len(), 7);
        let space = problem.gene_space();
        let (_, baseline_layer) = problem.baseline().target.layers().next().unwrap();
        let pinned_si = baseline_layer.elements[0].fraction;
        for best in &reported {
            for (value, gene) in space.encode(best).iter().zip(space.genes()) {
                assert!(
                    gene.bounds.contains(*value),
                    "{:?} = {} outside {:?}",
                    gene.kind,
                    value,
                    gene.bounds
                );
            }
            let (_, layer) = best.target.layers().next().unwrap();
            assert_eq!(layer.elements[0].fraction, pinned_si);
            let sum: f64 = layer.elements.iter().map(|e| e.fraction).sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn same_seed_gives_identical_runs() {
        let params = params(42);
        let problem = problem(&params);
        let run = || {
            evolve(&problem, &params, &CancellationToken::new(), &ProgressReporter::new()).unwrap()
        };
        let (first, second) = (run(), run());
        assert_eq!(first.history, second.history);
        assert_eq!(first.best, second.best);
    }

    #[test]
    fn parallel_and_serial_evaluation_agree() {
        let serial = DeParameter {
            parallel: false,
            ..params(5)
        };
        let parallel = DeParameter {
            parallel: true,
            ..params(5)
        };
        let problem = problem(&serial);
        let token = CancellationToken::new();
        let a = evolve(&problem, &serial, &token, &ProgressReporter::new()).unwrap();
        let b = evolve(&problem, &parallel, &token, &ProgressReporter::new()).unwrap();
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn cancellation_stops_at_a_generation_boundary() {
        let params = params(3);
        let problem = problem(&params);
        let token = CancellationToken::new();
        let trigger = token.clone();
        let reporter = ProgressReporter::with_callback(Box::new(move |event| {
            if let Progress::Generation(report) = event {
                if report.generation == 2 {
                    trigger.cancel();
                }
            }
        }));
        let outcome = evolve(&problem, &params, &token, &reporter).unwrap();
        assert_eq!(outcome.termination, Termination::Cancelled);
        assert_eq!(outcome.generations_completed, 2);
        assert_eq!(outcome.history.len(), 3);
    }

    #[test]
    fn reports_states_in_lifecycle_order() {
        let params = DeParameter {
            generations: 1,
            ..params(9)
        };
        let problem = problem(&params);
        let states = Mutex::new(Vec::new());
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if let Progress::StateChanged(state) = event {
                states.lock().unwrap().push(state);
            }
        }));
        evolve(&problem, &params, &CancellationToken::new(), &reporter).unwrap();
        drop(reporter);
        assert_eq!(
            states.into_inner().unwrap(),
            vec![
                EngineState::Initializing,
                EngineState::Evaluating,
                EngineState::Evolving,
                EngineState::Converged,
            ]
        );
    }
}
