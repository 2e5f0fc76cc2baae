//! Stopping cross-sections in eV/(1e15 atoms/cm²) for a projectile in a pure element.
//!
//! Electronic stopping is built from hydrogen stopping at equal velocity, scaled by the
//! squared effective charge of the projectile. Nuclear stopping uses the universal
//! ZBL reduced stopping.

use crate::core::models::calculation::StoppingModel;
use crate::core::models::setup::Projectile;

/// Bethe prefactor 4π·r_e²·m_e·c²·Z / β² per 1e15 atoms/cm², for energies in keV/u.
const BETHE_PREFACTOR: f64 = 237.5;
/// 2·m_e·c²·β² in eV per keV/u.
const TWO_ME_C2_PER_KEV_U: f64 = 2.19432;
/// Mean excitation energy per target electron, eV.
const MEAN_EXCITATION_PER_Z: f64 = 10.0;

#[inline]
fn mean_excitation(z2: f64) -> f64 {
    MEAN_EXCITATION_PER_Z * z2
}

/// Lindhard–Scharff velocity-proportional hydrogen stopping.
fn hydrogen_low(ep: f64, z2: f64) -> f64 {
    1.212 * z2 / (1.0 + z2.powf(2.0 / 3.0)).powf(1.5) * ep.sqrt()
}

/// Bethe hydrogen stopping.
fn hydrogen_high(ep: f64, z2: f64) -> f64 {
    BETHE_PREFACTOR * z2 / ep * (1.0 + TWO_ME_C2_PER_KEV_U * ep / mean_excitation(z2)).ln()
}

/// Hydrogen stopping at `ep` keV/u as the harmonic combination of the low- and
/// high-velocity forms.
pub fn hydrogen_stopping(ep: f64, z2: u8) -> f64 {
    if ep <= 0.0 {
        return 0.0;
    }
    let z2 = f64::from(z2);
    let low = hydrogen_low(ep, z2);
    let high = hydrogen_high(ep, z2);
    if low + high <= 0.0 {
        return 0.0;
    }
    low * high / (low + high)
}

/// Plain Bethe hydrogen stopping. The logarithm is taken of `1 + 2mc²β²/I` so the result
/// stays finite and non-negative down to zero velocity.
pub fn bethe_hydrogen_stopping(ep: f64, z2: u8) -> f64 {
    if ep <= 0.0 {
        return 0.0;
    }
    hydrogen_high(ep, f64::from(z2)).max(0.0)
}

/// Squared effective-charge fraction γ² of the projectile at `ep` keV/u.
pub fn effective_charge_sq(z1: u8, ep: f64, z2: u8) -> f64 {
    match z1 {
        0 | 1 => 1.0,
        2 => helium_effective_charge_sq(ep, z2),
        _ => {
            let z1 = f64::from(z1);
            let velocity = (ep.max(0.0) / 24.8).sqrt();
            let gamma = 1.0 - (-0.92 * velocity / z1.powf(2.0 / 3.0)).exp();
            gamma * gamma
        }
    }
}

fn helium_effective_charge_sq(ep: f64, z2: u8) -> f64 {
    let b = ep.max(1.0).ln();
    let a = 0.2865 + b * (0.1266 + b * (-0.001429 + b * (0.02402 + b * (-0.01135 + b * 0.001475))));
    let gamma_sq = 1.0 - (-a.min(30.0)).exp();
    let z2 = f64::from(z2);
    let shell = 1.0 + (0.007 + 0.00005 * z2) * (-(7.6 - b.max(0.0)).powi(2)).exp();
    (gamma_sq * shell * shell).max(0.0)
}

/// Electronic stopping of `projectile` at `energy` keV in element `z2`.
pub fn electronic(model: StoppingModel, projectile: &Projectile, z2: u8, energy: f64) -> f64 {
    if energy <= 0.0 || projectile.mass <= 0.0 {
        return 0.0;
    }
    let ep = energy / projectile.mass;
    let hydrogen = match model {
        StoppingModel::ZieglerBiersack => hydrogen_stopping(ep, z2),
        StoppingModel::Bethe => bethe_hydrogen_stopping(ep, z2),
    };
    let z1 = f64::from(projectile.z);
    hydrogen * effective_charge_sq(projectile.z, ep, z2) * z1 * z1
}

/// ZBL universal nuclear stopping of `projectile` at `energy` keV in a target atom (`z2`, `m2`).
pub fn nuclear(projectile: &Projectile, z2: u8, m2: f64, energy: f64) -> f64 {
    if energy <= 0.0 {
        return 0.0;
    }
    let (z1, m1) = (f64::from(projectile.z), projectile.mass);
    let z2 = f64::from(z2);
    let screening = z1.powf(0.23) + z2.powf(0.23);
    let epsilon = 32.53 * m2 * energy / (z1 * z2 * (m1 + m2) * screening);
    let reduced = if epsilon <= 30.0 {
        (1.0 + 1.1383 * epsilon).ln()
            / (2.0 * (epsilon + 0.01321 * epsilon.powf(0.21226) + 0.19593 * epsilon.sqrt()))
    } else {
        epsilon.ln() / (2.0 * epsilon)
    };
    8.462 * z1 * z2 * m1 * reduced / ((m1 + m2) * screening)
}

/// Total (electronic + nuclear) stopping cross-section.
pub fn total(model: StoppingModel, projectile: &Projectile, z2: u8, m2: f64, energy: f64) -> f64 {
    electronic(model, projectile, z2, energy) + nuclear(projectile, z2, m2, energy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopping_has_a_maximum_at_intermediate_energy() {
        let he = Projectile::HELIUM_4;
        let s = |e| electronic(StoppingModel::ZieglerBiersack, &he, 14, e);
        let (low, mid, high) = (s(20.0), s(800.0), s(20000.0));
        assert!(mid > low && mid > high, "{low} {mid} {high}");
    }

    #[test]
    fn helium_in_silicon_is_of_the_right_magnitude() {
        let s = total(StoppingModel::ZieglerBiersack, &Projectile::HELIUM_4, 14, 28.085, 2000.0);
        assert!(s > 15.0 && s < 80.0, "s = {s}");
    }

    #[test]
    fn bethe_stays_finite_and_non_negative() {
        let p = Projectile::PROTON;
        for e in [0.01, 0.1, 1.0, 5.0, 50.0] {
            let s = electronic(StoppingModel::Bethe, &p, 79, e);
            assert!(s.is_finite() && s >= 0.0, "e = {e}: {s}");
        }
    }

    #[test]
    fn effective_charge_saturates_at_high_velocity() {
        assert_eq!(effective_charge_sq(1, 10.0, 14), 1.0);
        let he = effective_charge_sq(2, 2000.0, 14);
        assert!(he > 0.95 && he < 1.05, "{he}");
        let li = effective_charge_sq(3, 5000.0, 14);
        assert!(li > 0.9 && li <= 1.0, "{li}");
        assert!(effective_charge_sq(3, 10.0, 14) < li);
    }

    #[test]
    fn nuclear_stopping_matters_only_at_low_energy() {
        let he = Projectile::HELIUM_4;
        let ratio_low = nuclear(&he, 79, 197.0, 10.0)
            / electronic(StoppingModel::ZieglerBiersack, &he, 79, 10.0);
        let ratio_high = nuclear(&he, 79, 197.0, 2000.0)
            / electronic(StoppingModel::ZieglerBiersack, &he, 79, 2000.0);
        assert!(ratio_low > ratio_high);
        assert!(ratio_high < 0.01);
    }

    #[test]
    fn zero_energy_gives_zero_stopping() {
        assert_eq!(total(StoppingModel::ZieglerBiersack, &Projectile::HELIUM_4, 6, 12.0, 0.0), 0.0);
    }
}
