use crate::core::models::calculation::{ChargeFractionModel, ChargeFractionParams};

/// Fraction of detected particles counted at exit energy `energy` (keV).
pub fn charge_fraction(model: ChargeFractionModel, params: &ChargeFractionParams, energy: f64) -> f64 {
    match model {
        ChargeFractionModel::None => 1.0,
        ChargeFractionModel::Fixed => params.fixed.clamp(0.0, 1.0),
        ChargeFractionModel::Linear => (params.intercept + params.slope * energy).clamp(0.0, 1.0),
    }
}
