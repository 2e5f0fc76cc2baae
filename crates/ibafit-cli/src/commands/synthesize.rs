use crate::cli::SynthesizeArgs;
use crate::config::build_session;
use crate::error::Result;
use ibafit::core::io::spectrum::write_counts_file;
use ibafit::core::simulation::analysis::add_counting_noise;
use ibafit::core::simulation::simulate;
use tracing::info;

pub async fn run(args: SynthesizeArgs) -> Result<()> {
    let session = build_session(&args.session, None)?;
    let request = session
        .baseline
        .request(session.channels, session.evolution.window);

    let data = tokio::task::block_in_place(|| simulate(&request, None));
    info!("Adding counting noise (seed: {:?}).", args.seed);
    let noisy = add_counting_noise(&data.counts, args.seed);

    write_counts_file(&args.output, &noisy)?;
    println!(
        "✓ Synthetic spectrum ({:.0} counts) written to: {}",
        noisy.iter().sum::<f64>(),
        args.output.display()
    );
    Ok(())
}
