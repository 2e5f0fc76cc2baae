use super::write_table;
use crate::cli::StoppingArgs;
use crate::config::build_session;
use crate::error::{CliError, Result};
use ibafit::core::simulation::analysis::{energy_grid, stopping_curve};
use tracing::info;

pub async fn run(args: StoppingArgs) -> Result<()> {
    let session = build_session(&args.session, None)?;
    let baseline = &session.baseline;

    let layer = args
        .layer
        .checked_sub(1)
        .and_then(|i| baseline.target.layers().nth(i))
        .map(|(_, layer)| layer)
        .ok_or_else(|| {
            CliError::Argument(format!(
                "layer {} does not exist, the target has {} layer(s)",
                args.layer,
                baseline.target.len()
            ))
        })?;

    let to = args.to.unwrap_or(baseline.experiment.beam_energy);
    if args.points == 0 || !(args.from > 0.0 && to > args.from) {
        return Err(CliError::Argument(format!(
            "invalid energy range {}..{} keV with {} points",
            args.from, to, args.points
        )));
    }
    let energies = energy_grid(args.from, to, args.points);
    info!(
        "Tabulating stopping in layer {} from {} to {} keV.",
        args.layer, args.from, to
    );

    let curve = stopping_curve(
        baseline.experiment.projectile,
        &baseline.calculation,
        layer,
        &energies,
    );
    let rows = curve.iter().map(|p| {
        vec![
            format!("{:.4}", p.energy),
            format!("{:.6}", p.stopping),
            format!("{:.6}", p.mass_stopping),
        ]
    });
    write_table(
        args.output.as_deref(),
        &["energy_kev", "stopping_ev_per_tfu", "stopping_mev_cm2_per_mg"],
        rows,
    )?;
    if let Some(path) = &args.output {
        println!("✓ Stopping table written to: {}", path.display());
    }
    Ok(())
}
