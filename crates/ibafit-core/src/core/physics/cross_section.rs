use super::kinematics::{center_of_mass_angle, center_of_mass_energy};
use crate::core::models::calculation::ScreeningModel;

/// 4·(e²/4)² in mb·keV², with e² = 1.44e-10 keV·cm.
const RUTHERFORD_PREFACTOR: f64 = 5.1837e6;

/// Laboratory-frame Rutherford cross-section in mb/sr at energy `energy` (keV).
///
/// Returns 0 where elastic scattering into `theta_deg` is kinematically impossible.
pub fn rutherford(z1: u8, m1: f64, z2: u8, m2: f64, energy: f64, theta_deg: f64) -> f64 {
    if energy <= 0.0 {
        return 0.0;
    }
    let theta = theta_deg.to_radians();
    let (sin, cos) = theta.sin_cos();
    let x = m1 / m2 * sin;
    if x.abs() >= 1.0 {
        return 0.0;
    }
    let root = (1.0 - x * x).sqrt();
    let bracket = root + cos;
    if bracket <= 0.0 || sin == 0.0 {
        return 0.0;
    }
    let zz = f64::from(z1) * f64::from(z2) / energy;
    RUTHERFORD_PREFACTOR * zz * zz / sin.powi(4) * bracket * bracket / root
}

/// Multiplicative electron-screening correction to the Rutherford cross-section.
pub fn screening_factor(
    model: ScreeningModel,
    z1: u8,
    m1: f64,
    z2: u8,
    m2: f64,
    energy: f64,
    theta_deg: f64,
) -> f64 {
    if energy <= 0.0 {
        return 1.0;
    }
    let (z1, z2f) = (f64::from(z1), f64::from(z2));
    let e_cm = center_of_mass_energy(m1, m2, energy);
    let factor = match model {
        ScreeningModel::None => 1.0,
        ScreeningModel::LEcuyer => 1.0 - 0.049 * z1 * z2f.powf(4.0 / 3.0) / e_cm,
        ScreeningModel::Andersen => {
            let v1 = 0.04873 * z1 * z2f * (z1.powf(2.0 / 3.0) + z2f.powf(2.0 / 3.0)).sqrt();
            let half_angle = (center_of_mass_angle(m1, m2, theta_deg) / 2.0).to_radians();
            let r = v1 / e_cm;
            let numerator = (1.0 + 0.5 * r).powi(2);
            let denominator = (1.0 + r + (0.5 * r / half_angle.sin()).powi(2)).powi(2);
            numerator / denominator
        }
    };
    factor.clamp(0.0, 1.0)
}

/// Screened cross-section in mb/sr.
pub fn screened(
    model: ScreeningModel,
    z1: u8,
    m1: f64,
    z2: u8,
    m2: f64,
    energy: f64,
    theta_deg: f64,
) -> f64 {
    rutherford(z1, m1, z2, m2, energy, theta_deg)
        * screening_factor(model, z1, m1, z2, m2, energy, theta_deg)
}
