use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    version,
    about = "ibafit - simulate ion beam backscattering spectra and fit layered targets to measured ones.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel fitness evaluation.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Simulate the spectrum described by a session file.
    Simulate(SimulateArgs),
    /// Fit a session's free parameters to one measured spectrum.
    Fit(FitArgs),
    /// Fit every spectrum in a directory, one after another, and write a report table.
    Batch(BatchArgs),
    /// Tabulate the stopping cross-section of a target layer.
    Stopping(StoppingArgs),
    /// Tabulate the projectile energy versus depth through the target.
    Depth(DepthArgs),
    /// Write a simulated spectrum with counting noise, for testing fits.
    Synthesize(SynthesizeArgs),
}

/// Session file plus key overrides, shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    /// Path to the session file in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub session: PathBuf,

    /// Set a specific session value, overriding the session file.
    /// Can be used multiple times. Example: -S experiment.beam-energy=2200
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Overrides for the `[evolution]` section of the session.
#[derive(Args, Debug, Clone, Default)]
pub struct EvolutionArgs {
    /// Override the number of generations.
    #[arg(short, long, value_name = "INT")]
    pub generations: Option<usize>,

    /// Override the population size.
    #[arg(short, long, value_name = "INT")]
    pub population: Option<usize>,

    /// Seed the random number generator for a reproducible run.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,

    /// First channel of the fit window.
    #[arg(long, value_name = "CH")]
    pub start_ch: Option<usize>,

    /// Last channel of the fit window.
    #[arg(long, value_name = "CH")]
    pub end_ch: Option<usize>,

    /// Number of adjacent channels summed together during the fit.
    #[arg(long, value_name = "INT")]
    pub bins: Option<usize>,

    /// Evaluate each generation on a single thread.
    #[arg(long)]
    pub serial: bool,
}

#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Path for the simulated spectrum table (CSV).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Measured spectrum to score the simulation against.
    #[arg(short, long, value_name = "PATH")]
    pub measured: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct FitArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Measured spectrum to fit.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub input: PathBuf,

    /// Path for the best-fit spectrum table (CSV).
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write the session with the fitted values in place, for use as a new starting point.
    #[arg(long, value_name = "PATH")]
    pub save_session: Option<PathBuf>,

    #[command(flatten)]
    pub evolution: EvolutionArgs,
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Directory holding the measured spectra.
    #[arg(short, long, required = true, value_name = "DIR")]
    pub input: PathBuf,

    /// File extensions that count as spectra.
    #[arg(long, value_delimiter = ',', default_value = "csv,dat,txt")]
    pub extensions: Vec<String>,

    /// Path for the batch report table (CSV).
    #[arg(short, long, required = true, value_name = "PATH")]
    pub report: PathBuf,

    #[command(flatten)]
    pub evolution: EvolutionArgs,
}

#[derive(Args, Debug)]
pub struct StoppingArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Layer to tabulate, counted from the surface starting at 1.
    #[arg(short, long, default_value_t = 1, value_name = "INT")]
    pub layer: usize,

    /// Lowest energy in keV.
    #[arg(long, default_value_t = 10.0, value_name = "KEV")]
    pub from: f64,

    /// Highest energy in keV. Defaults to the beam energy.
    #[arg(long, value_name = "KEV")]
    pub to: Option<f64>,

    /// Number of energies in the table.
    #[arg(long, default_value_t = 100, value_name = "INT")]
    pub points: usize,

    /// Path for the table (CSV). Printed to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct DepthArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Path for the table (CSV). Printed to stdout when omitted.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SynthesizeArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Path for the noisy counts file.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub output: PathBuf,

    /// Seed for the counting noise.
    #[arg(long, value_name = "INT")]
    pub seed: Option<u64>,
}
