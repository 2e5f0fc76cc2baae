pub mod batch;
pub mod depth;
pub mod fit;
pub mod simulate;
pub mod stopping;
pub mod synthesize;

use crate::error::Result;
use ibafit::engine::cancel::CancellationToken;
use std::io::Write;
use std::path::Path;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Cancels `token` on the first Ctrl-C. Abort the returned task once the work is done.
fn cancel_on_ctrl_c(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupt received, stopping after the current generation.");
                eprintln!("\nInterrupted, finishing the current generation...");
                token.cancel();
            }
            Err(e) => debug!("Cannot listen for Ctrl-C: {}", e),
        }
    })
}

/// Writes a CSV table to `output`, or to stdout when no path is given.
fn write_table<I>(output: Option<&Path>, header: &[&str], rows: I) -> Result<()>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let sink: Box<dyn Write> = match output {
        Some(path) => Box::new(std::fs::File::create(path)?),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = csv::Writer::from_writer(sink);
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn write_table_writes_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("table.csv");
        let rows = vec![
            vec!["1".to_string(), "2.5".to_string()],
            vec!["2".to_string(), "3.5".to_string()],
        ];
        write_table(Some(&path), &["a", "b"], rows).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "a,b\n1,2.5\n2,3.5\n");
    }
}
