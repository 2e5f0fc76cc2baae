use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// `[min, max]` pair as written in a session file.
pub type FileBounds = [f64; 2];

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileExperiment {
    /// Chemical symbol of the projectile.
    pub projectile: Option<String>,
    /// Projectile mass in amu; the most abundant isotope when omitted.
    pub projectile_mass: Option<f64>,
    pub beam_energy: Option<f64>,
    pub energy_spread: Option<f64>,
    pub alpha: Option<f64>,
    pub theta: Option<f64>,
    pub geometry: Option<String>,
    pub charge: Option<f64>,
    pub charge_bounds: Option<FileBounds>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileDetector {
    pub resolution: Option<f64>,
    pub resolution_bounds: Option<FileBounds>,
    pub calibration_factor: Option<f64>,
    pub calibration_factor_bounds: Option<FileBounds>,
    pub calibration_offset: Option<f64>,
    pub calibration_offset_bounds: Option<FileBounds>,
    pub solid_angle: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileCalculation {
    pub stopping: Option<String>,
    pub compound: Option<String>,
    pub straggling: Option<String>,
    pub screening: Option<String>,
    pub charge_fraction: Option<String>,
    pub charge_fraction_fixed: Option<f64>,
    pub charge_fraction_intercept: Option<f64>,
    pub charge_fraction_slope: Option<f64>,
    pub use_lookup_table: Option<bool>,
    pub simulate_isotopes: Option<bool>,
    pub show_elements: Option<bool>,
    pub show_isotopes: Option<bool>,
    pub show_layers: Option<bool>,
    pub correction_factors: Option<Vec<f64>>,
    pub depth_step: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileIsotope {
    pub mass: f64,
    pub abundance: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileElement {
    pub symbol: String,
    pub fraction: f64,
    pub fraction_bounds: Option<FileBounds>,
    /// Replaces the natural isotopic composition.
    pub isotopes: Option<Vec<FileIsotope>>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileLayer {
    pub thickness: f64,
    pub thickness_bounds: Option<FileBounds>,
    pub elements: Vec<FileElement>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileEvolution {
    pub population: Option<usize>,
    pub mutation_factor: Option<f64>,
    pub crossover_probability: Option<f64>,
    pub generations: Option<usize>,
    pub start_ch: Option<usize>,
    pub end_ch: Option<usize>,
    pub num_bins: Option<usize>,
    pub seed: Option<u64>,
    pub parallel: Option<bool>,
}

#[derive(Serialize, Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileSession {
    pub channels: Option<usize>,
    pub experiment: Option<FileExperiment>,
    pub detector: Option<FileDetector>,
    pub calculation: Option<FileCalculation>,
    #[serde(default)]
    pub layers: Vec<FileLayer>,
    pub foil: Option<FileLayer>,
    pub evolution: Option<FileEvolution>,
}

impl FileSession {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading session from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn from_toml(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn to_toml(&self) -> std::result::Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    pub fn write_to_path(&self, path: &Path) -> Result<()> {
        debug!("Writing session to file: {:?}", path);
        let content = self.to_toml().map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
