/// Largest relative deviation allowed between tabulated and directly evaluated stopping.
pub const LOOKUP_TOLERANCE: f64 = 1e-3;

/// Largest fitness between spectra simulated with and without the table, relative to the
/// mean count in the fit window.
pub const LOOKUP_FITNESS_TOLERANCE: f64 = 1e-3;

pub const DEFAULT_TABLE_POINTS: usize = 2000;
pub const TABLE_MIN_ENERGY: f64 = 1.0; // keV

/// A function of energy sampled on a logarithmic grid and read back by linear interpolation.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    ln_min: f64,
    ln_step: f64,
    energies: Vec<f64>,
    values: Vec<f64>,
}

impl LookupTable {
    pub fn build(e_min: f64, e_max: f64, points: usize, f: impl Fn(f64) -> f64) -> Self {
        let points = points.max(2);
        let e_min = e_min.max(f64::MIN_POSITIVE);
        let e_max = e_max.max(e_min * (1.0 + 1e-9));
        let ln_min = e_min.ln();
        let ln_step = (e_max.ln() - ln_min) / (points - 1) as f64;
        let energies: Vec<f64> = (0..points)
            .map(|i| (ln_min + ln_step * i as f64).exp())
            .collect();
        let values = energies.iter().map(|&e| f(e)).collect();
        Self {
            ln_min,
            ln_step,
            energies,
            values,
        }
    }

    pub fn min_energy(&self) -> f64 {
        self.energies[0]
    }

    pub fn max_energy(&self) -> f64 {
        self.energies[self.energies.len() - 1]
    }

    /// Interpolated value, or `None` outside the tabulated range.
    pub fn get(&self, energy: f64) -> Option<f64> {
        if !(energy >= self.min_energy() && energy <= self.max_energy()) {
            return None;
        }
        let last = self.energies.len() - 1;
        let i = (((energy.ln() - self.ln_min) / self.ln_step) as usize).min(last - 1);
        let (e0, e1) = (self.energies[i], self.energies[i + 1]);
        let t = ((energy - e0) / (e1 - e0)).clamp(0.0, 1.0);
        Some(self.values[i] + t * (self.values[i + 1] - self.values[i]))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
