use crate::core::io::spectrum::{SpectrumIoError, read_spectrum};
use crate::core::models::spectrum::MeasuredSpectrum;
use crate::engine::cancel::CancellationToken;
use crate::engine::config::DeParameter;
use crate::engine::error::EngineError;
use crate::engine::evolution::evolve;
use crate::engine::genes::Individual;
use crate::engine::problem::{Baseline, FitProblem};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state::Termination;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Failed to read spectrum: {0}")]
    Spectrum(#[from] SpectrumIoError),
    #[error("Fit failed: {0}")]
    Engine(#[from] EngineError),
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Spectrum index {0} is out of range")]
    IndexOutOfRange(usize),
}

/// Ordered collection of measured spectra, loaded one at a time.
pub trait SpectrumSource {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name used in reports when the spectrum cannot be loaded.
    fn label(&self, index: usize) -> String;

    fn load(&self, index: usize) -> Result<MeasuredSpectrum, BatchError>;
}

impl SpectrumSource for Vec<MeasuredSpectrum> {
    fn len(&self) -> usize {
        <[MeasuredSpectrum]>::len(self)
    }

    fn label(&self, index: usize) -> String {
        self.get(index)
            .map_or_else(|| format!("#{index}"), |s| s.label.clone())
    }

    fn load(&self, index: usize) -> Result<MeasuredSpectrum, BatchError> {
        self.get(index)
            .cloned()
            .ok_or(BatchError::IndexOutOfRange(index))
    }
}

/// Spectra stored as counts files on disk.
#[derive(Debug, Clone)]
pub struct FileSpectrumSource {
    paths: Vec<PathBuf>,
}

impl FileSpectrumSource {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    /// All regular files in `dir` with one of `extensions` (case-insensitive), sorted by name.
    pub fn from_dir(dir: &Path, extensions: &[&str]) -> Result<Self, BatchError> {
        let io_err = |e| BatchError::Io {
            path: dir.to_string_lossy().to_string(),
            source: e,
        };
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let matches = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)));
            if path.is_file() && matches {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(Self { paths })
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

impl SpectrumSource for FileSpectrumSource {
    fn len(&self) -> usize {
        self.paths.len()
    }

    fn label(&self, index: usize) -> String {
        self.paths
            .get(index)
            .map_or_else(|| format!("#{index}"), |p| p.to_string_lossy().to_string())
    }

    fn load(&self, index: usize) -> Result<MeasuredSpectrum, BatchError> {
        let path = self
            .paths
            .get(index)
            .ok_or(BatchError::IndexOutOfRange(index))?;
        Ok(read_spectrum(path)?)
    }
}

#[derive(Debug, Clone)]
pub struct BatchReportEntry {
    pub index: usize,
    pub label: String,
    pub best_fitness: f64,
    /// Best fitness of the initial population.
    pub initial_best_fitness: f64,
    pub best: Individual,
    pub generations_completed: usize,
    pub termination: Termination,
}

#[derive(Debug, Clone)]
pub struct SkippedSpectrum {
    pub index: usize,
    pub label: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BatchStep {
    pub entry: BatchReportEntry,
    pub has_more: bool,
}

/// Fits each spectrum of a source in turn against the same baseline.
pub struct BatchDriver<'a, S: SpectrumSource> {
    source: S,
    baseline: Baseline,
    params: DeParameter,
    reporter: ProgressReporter<'a>,
    cancel: CancellationToken,
    next: usize,
    entries: Vec<BatchReportEntry>,
    skipped: Vec<SkippedSpectrum>,
}

impl<'a, S: SpectrumSource> BatchDriver<'a, S> {
    pub fn new(source: S, baseline: Baseline, params: DeParameter) -> Self {
        Self {
            source,
            baseline,
            params,
            reporter: ProgressReporter::new(),
            cancel: CancellationToken::new(),
            next: 0,
            entries: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn with_reporter(mut self, reporter: ProgressReporter<'a>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Token that aborts the batch when cancelled, usable from another thread.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancels the in-flight fit and ends the batch.
    pub fn abort(&self) {
        self.cancel.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.cancel.is_cancelled()
    }

    fn has_more(&self) -> bool {
        !self.is_aborted() && self.next < self.source.len()
    }

    /// Fits the next loadable spectrum. Spectra that fail to load or fit are recorded in
    /// [`Self::skipped`] and passed over.
    #[instrument(skip_all, name = "batch_step")]
    pub fn advance(&mut self) -> Option<BatchStep> {
        while self.has_more() {
            let index = self.next;
            self.next += 1;

            let measured = match self.source.load(index) {
                Ok(spectrum) => spectrum,
                Err(e) => {
                    self.skip(index, self.source.label(index), e);
                    continue;
                }
            };
            let label = measured.label.clone();
            self.reporter.report(Progress::Message(format!(
                "Fitting spectrum {}/{}: {label}",
                index + 1,
                self.source.len()
            )));

            let outcome = FitProblem::new(self.baseline.clone(), measured, &self.params)
                .and_then(|problem| evolve(&problem, &self.params, &self.cancel, &self.reporter));
            let evolution = match outcome {
                Ok(evolution) => evolution,
                Err(e) => {
                    self.skip(index, label, e.into());
                    continue;
                }
            };

            let entry = BatchReportEntry {
                index,
                label,
                best_fitness: evolution.best.fitness,
                initial_best_fitness: evolution.initial_best_fitness,
                best: evolution.best,
                generations_completed: evolution.generations_completed,
                termination: evolution.termination,
            };
            info!(
                spectrum = %entry.label,
                fitness = entry.best_fitness,
                termination = %entry.termination,
                "Batch entry finished."
            );
            self.entries.push(entry.clone());
            return Some(BatchStep {
                entry,
                has_more: self.has_more(),
            });
        }
        None
    }

    fn skip(&mut self, index: usize, label: String, error: BatchError) {
        warn!(spectrum = %label, error = %error, "Skipping spectrum.");
        self.skipped.push(SkippedSpectrum {
            index,
            label,
            reason: error.to_string(),
        });
    }

    /// Advances until the source is exhausted or the batch is aborted.
    pub fn run_to_end(&mut self) -> &[BatchReportEntry] {
        while self.advance().is_some() {}
        &self.entries
    }

    pub fn entries(&self) -> &[BatchReportEntry] {
        &self.entries
    }

    pub fn skipped(&self) -> &[SkippedSpectrum] {
        &self.skipped
    }
}

/// Writes one report row per entry: fit summary, instrument values and layer thicknesses.
pub fn write_report(
    writer: impl Write,
    entries: &[BatchReportEntry],
    origin: &str,
) -> Result<(), BatchError> {
    let csv_err = |e: csv::Error| BatchError::Csv {
        path: origin.to_string(),
        source: e,
    };
    let layers = entries
        .iter()
        .map(|e| e.best.target.len())
        .max()
        .unwrap_or(0);
    let mut out = csv::Writer::from_writer(writer);

    let mut header: Vec<String> = [
        "label",
        "fitness",
        "initial_fitness",
        "generations",
        "termination",
        "charge",
        "resolution",
        "calibration_factor",
        "calibration_offset",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend((1..=layers).map(|i| format!("layer{i}_thickness")));
    out.write_record(&header).map_err(csv_err)?;

    for entry in entries {
        let best = &entry.best;
        let mut row = vec![
            entry.label.clone(),
            entry.best_fitness.to_string(),
            entry.initial_best_fitness.to_string(),
            entry.generations_completed.to_string(),
            entry.termination.to_string(),
            best.charge.to_string(),
            best.resolution.to_string(),
            best.calibration_factor.to_string(),
            best.calibration_offset.to_string(),
        ];
        let mut thicknesses: Vec<String> = best
            .target
            .layers()
            .map(|(_, l)| l.thickness.to_string())
            .collect();
        thicknesses.resize(layers, String::new());
        row.extend(thicknesses);
        out.write_record(&row).map_err(csv_err)?;
    }
    out.flush().map_err(|e| BatchError::Io {
        path: origin.to_string(),
        source: e,
    })
}

pub fn write_report_file(path: &Path, entries: &[BatchReportEntry]) -> Result<(), BatchError> {
    let origin = path.to_string_lossy().to_string();
    let file = std::fs::File::create(path).map_err(|e| BatchError::Io {
        path: origin.clone(),
        source: e,
    })?;
    write_report(file, entries, &origin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::io::spectrum::write_counts_file;
    use crate::core::simulation::fixtures::carbon_request;
    use crate::core::simulation::simulate;
    use std::fs;
    use tempfile::tempdir;

    fn spectra() -> Vec<MeasuredSpectrum> {
        [3000.0, 5000.0, 7000.0]
            .iter()
            .enumerate()
            .map(|(i, &thickness)| {
                let mut request = carbon_request();
                for layer in request.target.layers_mut() {
                    layer.thickness = thickness;
                }
                MeasuredSpectrum::new(format!("s{i}"), simulate(&request, None).counts)
            })
            .collect()
    }

    fn params(seed: u64) -> DeParameter {
        DeParameter::builder()
            .population_size(10)
            .generations(5)
            .window(0, 1000)
            .num_bins(4)
            .seed(Some(seed))
            .build()
            .unwrap()
    }

    fn baseline() -> Baseline {
        Baseline::from(carbon_request())
    }

    #[test]
    fn batch_fits_every_spectrum_in_order() {
        let mut driver = BatchDriver::new(spectra(), baseline(), params(8));
        let mut steps = Vec::new();
        while let Some(step) = driver.advance() {
            steps.push(step);
        }
        assert_eq!(steps.len(), 3);
        assert!(steps[0].has_more && steps[1].has_more && !steps[2].has_more);
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.entry.label, format!("s{i}"));
            assert!(step.entry.best_fitness <= step.entry.initial_best_fitness);
            assert_eq!(step.entry.generations_completed, 5);
        }
        assert!(driver.skipped().is_empty());
        assert!(driver.advance().is_none());
    }

    #[test]
    fn same_seed_batches_are_identical() {
        let a: Vec<f64> = BatchDriver::new(spectra(), baseline(), params(99))
            .run_to_end()
            .iter()
            .map(|e| e.best_fitness)
            .collect();
        let b: Vec<f64> = BatchDriver::new(spectra(), baseline(), params(99))
            .run_to_end()
            .iter()
            .map(|e| e.best_fitness)
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn unreadable_files_are_skipped() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("a.csv");
        write_counts_file(&good, &spectra()[1].counts).unwrap();
        fs::write(dir.path().join("b.csv"), "channel,counts\n0,oops\n1,bad\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = FileSpectrumSource::from_dir(dir.path(), &["csv"]).unwrap();
        assert_eq!(source.len(), 2);
        let mut driver = BatchDriver::new(source, baseline(), params(3));
        let entries = driver.run_to_end().to_vec();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label, "a");
        assert_eq!(driver.skipped().len(), 1);
        assert_eq!(driver.skipped()[0].index, 1);
    }

    #[test]
    fn aborted_batch_yields_nothing_more() {
        let mut driver = BatchDriver::new(spectra(), baseline(), params(1));
        driver.abort();
        assert!(driver.advance().is_none());
        assert!(driver.entries().is_empty());
    }

    #[test]
    fn report_has_a_row_per_entry() {
        let mut driver = BatchDriver::new(spectra(), baseline(), params(4));
        let entries = driver.run_to_end().to_vec();
        let mut buffer = Vec::new();
        write_report(&mut buffer, &entries, "mem").unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with("calibration_offset,layer1_thickness"));
        assert!(lines[1].starts_with("s0,"));
    }
}
