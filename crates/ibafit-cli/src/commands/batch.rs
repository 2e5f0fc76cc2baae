use super::cancel_on_ctrl_c;
use crate::cli::BatchArgs;
use crate::config::build_session;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use ibafit::engine::progress::ProgressReporter;
use ibafit::workflows::batch::{BatchDriver, FileSpectrumSource, write_report_file};
use tracing::{info, warn};

pub async fn run(args: BatchArgs) -> Result<()> {
    let session = build_session(&args.session, Some(&args.evolution))?;

    let extensions: Vec<&str> = args.extensions.iter().map(String::as_str).collect();
    let source = FileSpectrumSource::from_dir(&args.input, &extensions)?;
    if source.paths().is_empty() {
        return Err(CliError::Argument(format!(
            "no spectra with extension(s) {} found in {}",
            args.extensions.join(","),
            args.input.display()
        )));
    }
    let total = source.paths().len();
    info!("Found {} spectra in {:?}", total, &args.input);

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());
    let mut driver =
        BatchDriver::new(source, session.baseline, session.evolution).with_reporter(reporter);
    let interrupt = cancel_on_ctrl_c(driver.cancellation_token());

    println!("Fitting {} spectra...", total);
    let (entries, skipped, aborted) = tokio::task::spawn_blocking(move || {
        while let Some(step) = driver.advance() {
            println!(
                "  [{}/{}] {}: fitness {:.6e} ({})",
                step.entry.index + 1,
                total,
                step.entry.label,
                step.entry.best_fitness,
                step.entry.termination
            );
        }
        (
            driver.entries().to_vec(),
            driver.skipped().to_vec(),
            driver.is_aborted(),
        )
    })
    .await
    .map_err(|e| CliError::Other(anyhow::anyhow!("batch task failed: {}", e)))?;
    interrupt.abort();

    if aborted {
        warn!("Batch aborted after {} spectra.", entries.len());
        println!("Batch aborted, reporting {} finished spectra.", entries.len());
    }
    for skip in &skipped {
        println!("  skipped {}: {}", skip.label, skip.reason);
    }

    write_report_file(&args.report, &entries)?;
    println!(
        "✓ Report with {} fit(s) written to: {}",
        entries.len(),
        args.report.display()
    );
    Ok(())
}
