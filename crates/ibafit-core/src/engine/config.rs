use crate::core::models::spectrum::ChannelWindow;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

pub const DEFAULT_MUTATION_FACTOR: f64 = 0.5;
pub const DEFAULT_CROSSOVER_PROBABILITY: f64 = 0.7;
/// rand/1 needs the target plus three distinct donors.
pub const MIN_POPULATION_SIZE: usize = 4;

/// Differential-evolution settings for one fit.
#[derive(Debug, Clone, PartialEq)]
pub struct DeParameter {
    pub population_size: usize,
    /// Differential weight F.
    pub mutation_factor: f64,
    /// Binomial crossover probability CR.
    pub crossover_probability: f64,
    pub generations: usize,
    /// Channels scored by the fitness, in uncompressed channel numbers.
    pub window: ChannelWindow,
    /// Adjacent channels summed into one during the fit.
    pub num_bins: usize,
    pub seed: Option<u64>,
    pub parallel: bool,
}

#[derive(Default)]
pub struct DeParameterBuilder {
    population_size: Option<usize>,
    mutation_factor: Option<f64>,
    crossover_probability: Option<f64>,
    generations: Option<usize>,
    window: Option<ChannelWindow>,
    num_bins: Option<usize>,
    seed: Option<u64>,
    parallel: Option<bool>,
}

impl DeParameterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn population_size(mut self, size: usize) -> Self {
        self.population_size = Some(size);
        self
    }
    pub fn mutation_factor(mut self, f: f64) -> Self {
        self.mutation_factor = Some(f);
        self
    }
    pub fn crossover_probability(mut self, cr: f64) -> Self {
        self.crossover_probability = Some(cr);
        self
    }
    pub fn generations(mut self, generations: usize) -> Self {
        self.generations = Some(generations);
        self
    }
    pub fn window(mut self, start_ch: usize, end_ch: usize) -> Self {
        self.window = Some(ChannelWindow::new(start_ch, end_ch));
        self
    }
    pub fn num_bins(mut self, bins: usize) -> Self {
        self.num_bins = Some(bins);
        self
    }
    pub fn seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    pub fn build(self) -> Result<DeParameter, ConfigError> {
        let params = DeParameter {
            population_size: self
                .population_size
                .ok_or(ConfigError::MissingParameter("population_size"))?,
            mutation_factor: self.mutation_factor.unwrap_or(DEFAULT_MUTATION_FACTOR),
            crossover_probability: self
                .crossover_probability
                .unwrap_or(DEFAULT_CROSSOVER_PROBABILITY),
            generations: self
                .generations
                .ok_or(ConfigError::MissingParameter("generations"))?,
            window: self.window.ok_or(ConfigError::MissingParameter("window"))?,
            num_bins: self.num_bins.unwrap_or(1),
            seed: self.seed,
            parallel: self.parallel.unwrap_or(cfg!(feature = "parallel")),
        };
        params.validate()?;
        Ok(params)
    }
}

impl DeParameter {
    pub fn builder() -> DeParameterBuilder {
        DeParameterBuilder::new()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.population_size < MIN_POPULATION_SIZE {
            return Err(ConfigError::InvalidParameter {
                name: "population_size",
                reason: format!(
                    "must be at least {MIN_POPULATION_SIZE}, got {}",
                    self.population_size
                ),
            });
        }
        if !(self.mutation_factor.is_finite() && self.mutation_factor > 0.0) {
            return Err(ConfigError::InvalidParameter {
                name: "mutation_factor",
                reason: format!("must be positive, got {}", self.mutation_factor),
            });
        }
        if !(0.0..=1.0).contains(&self.crossover_probability) {
            return Err(ConfigError::InvalidParameter {
                name: "crossover_probability",
                reason: format!("must lie in [0, 1], got {}", self.crossover_probability),
            });
        }
        if self.num_bins == 0 {
            return Err(ConfigError::InvalidParameter {
                name: "num_bins",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}
