use super::write_table;
use crate::cli::DepthArgs;
use crate::config::build_session;
use crate::error::Result;
use ibafit::core::simulation::analysis::penetration_profile;
use tracing::info;

pub async fn run(args: DepthArgs) -> Result<()> {
    let session = build_session(&args.session, None)?;
    let request = session
        .baseline
        .request(session.channels, session.evolution.window);

    let profile = penetration_profile(&request);
    info!("Penetration profile has {} points.", profile.len());

    let rows = profile.iter().map(|p| {
        vec![
            format!("{:.3}", p.depth),
            (p.layer + 1).to_string(),
            format!("{:.4}", p.energy),
        ]
    });
    write_table(
        args.output.as_deref(),
        &["depth_tfu", "layer", "energy_kev"],
        rows,
    )?;
    if let Some(path) = &args.output {
        println!("✓ Depth profile written to: {}", path.display());
    }
    Ok(())
}
