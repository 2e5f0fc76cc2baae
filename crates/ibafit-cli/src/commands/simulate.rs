use crate::cli::SimulateArgs;
use crate::config::build_session;
use crate::error::Result;
use ibafit::core::io::spectrum::{read_spectrum, write_simulation_file};
use ibafit::core::simulation::simulate;
use tracing::info;

pub async fn run(args: SimulateArgs) -> Result<()> {
    let session = build_session(&args.session, None)?;
    let request = session
        .baseline
        .request(session.channels, session.evolution.window);

    let measured = match &args.measured {
        Some(path) => {
            info!("Loading measured spectrum from {:?}", path);
            Some(read_spectrum(path)?)
        }
        None => None,
    };

    println!("Simulating {} channels...", request.channels);
    let data = tokio::task::block_in_place(|| {
        simulate(&request, measured.as_ref().map(|m| m.counts.as_slice()))
    });
    info!(
        "Simulation finished in {:.3?}, {} component spectra.",
        data.elapsed,
        data.components.len()
    );

    write_simulation_file(
        &args.output,
        &data,
        measured.as_ref().map(|m| m.counts.as_slice()),
    )?;
    println!(
        "✓ Spectrum ({:.0} counts) written to: {}",
        data.total_counts(),
        args.output.display()
    );
    if let Some(fitness) = data.fitness {
        println!("  Fitness against measured spectrum: {:.6e}", fitness);
    }
    Ok(())
}
