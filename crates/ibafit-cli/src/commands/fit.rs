use super::cancel_on_ctrl_c;
use crate::cli::FitArgs;
use crate::config::{build_session, export_session};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use ibafit::core::io::spectrum::{read_spectrum, write_simulation_file};
use ibafit::engine::genes::Individual;
use ibafit::engine::problem::FitProblem;
use ibafit::engine::state::Termination;
use ibafit::engine::worker::FitWorker;
use ibafit::workflows::fit::FitOutcome;
use tracing::{info, warn};

pub async fn run(args: FitArgs) -> Result<()> {
    let session = build_session(&args.session, Some(&args.evolution))?;

    info!("Loading measured spectrum from {:?}", &args.input);
    let measured = read_spectrum(&args.input)?;
    let label = measured.label.clone();

    let problem = FitProblem::new(session.baseline.clone(), measured, &session.evolution)?;
    info!(
        "Fit problem ready: {} free parameter(s), {} generation(s) of {} individuals.",
        problem.gene_space().free_dimensions(),
        session.evolution.generations,
        session.evolution.population_size
    );

    let progress_handler = CliProgressHandler::new();
    println!("Fitting '{}'...", label);
    let worker = FitWorker::start(
        problem,
        session.evolution.clone(),
        Some(progress_handler.get_callback()),
    )?;
    let interrupt = cancel_on_ctrl_c(worker.cancellation_token());
    let problem = worker.problem();

    let evolution = tokio::task::spawn_blocking(move || worker.wait())
        .await
        .map_err(|e| CliError::Other(anyhow::anyhow!("fit task failed: {}", e)))??;
    interrupt.abort();

    let outcome = tokio::task::block_in_place(|| {
        FitOutcome::from_evolution(&problem, &session.evolution, evolution)
    });

    if outcome.termination == Termination::Cancelled {
        warn!(
            "Fit cancelled after {} generation(s).",
            outcome.generations_completed
        );
        println!(
            "Fit cancelled after {} generation(s), reporting the best so far.",
            outcome.generations_completed
        );
    }
    print_summary(&outcome);

    if let Some(output) = &args.output {
        write_simulation_file(
            output,
            &outcome.simulation,
            Some(&problem.measured().counts),
        )?;
        println!("✓ Best-fit spectrum written to: {}", output.display());
    }

    if let Some(path) = &args.save_session {
        let mut fitted = session;
        outcome.apply_to(&mut fitted.baseline);
        export_session(&fitted).write_to_path(path)?;
        println!("✓ Fitted session written to: {}", path.display());
    }
    Ok(())
}

fn print_summary(outcome: &FitOutcome) {
    let best = &outcome.best;
    println!(
        "Fitness: {:.6e} (initial best {:.6e}) after {} generation(s)",
        best.fitness, outcome.initial_best_fitness, outcome.generations_completed
    );
    println!("  charge:      {:.6}", best.charge);
    println!("  resolution:  {:.3} keV", best.resolution);
    println!(
        "  calibration: {:.6} keV/ch, offset {:.3} keV",
        best.calibration_factor, best.calibration_offset
    );
    for line in layer_lines(best) {
        println!("  {}", line);
    }
}

fn layer_lines(best: &Individual) -> Vec<String> {
    best.target
        .layers()
        .enumerate()
        .map(|(i, (_, layer))| {
            let composition = layer
                .elements
                .iter()
                .map(|e| format!("{} {:.4}", e.symbol(), e.fraction))
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "layer {}:     {:.2} 1e15 at/cm² [{}]",
                i + 1,
                layer.thickness,
                composition
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ibafit::core::models::target::{Layer, LayerElement, Target};

    #[test]
    fn layer_lines_list_every_layer_with_its_composition() {
        let mut target = Target::new();
        target.push_layer(
            Layer::new(1200.0)
                .with_element(LayerElement::from_symbol("Si", 1.0).unwrap())
                .with_element(LayerElement::from_symbol("O", 2.0).unwrap()),
        );
        target.push_layer(
            Layer::new(300.0).with_element(LayerElement::from_symbol("Au", 1.0).unwrap()),
        );
        let best = Individual {
            target,
            charge: 1.0,
            resolution: 15.0,
            calibration_factor: 1.0,
            calibration_offset: 0.0,
            fitness: 0.5,
        };
        let lines = layer_lines(&best);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("1200.00"));
        assert!(lines[0].contains("Si 0.3333"));
        assert!(lines[0].contains("O 0.6667"));
        assert!(lines[1].starts_with("layer 2:"));
        assert!(lines[1].contains("Au 1.0000"));
    }
}
