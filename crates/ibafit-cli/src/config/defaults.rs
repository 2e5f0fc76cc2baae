/// Values used when neither the session file nor the command line sets them.
pub struct DefaultsConfig {
    pub channels: usize,
    pub projectile: &'static str,
    pub population: usize,
    pub generations: usize,
    pub mutation_factor: f64,
    pub crossover_probability: f64,
    pub num_bins: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            channels: 1024,
            projectile: "He",
            population: 40,
            generations: 500,
            mutation_factor: 0.5,
            crossover_probability: 0.7,
            num_bins: 1,
        }
    }
}
