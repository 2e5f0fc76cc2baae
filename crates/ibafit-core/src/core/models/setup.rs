use super::bounds::Bounds;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub z: u8,
    pub mass: f64, // amu
}

impl Projectile {
    pub const HELIUM_4: Projectile = Projectile {
        z: 2,
        mass: 4.002603,
    };
    pub const PROTON: Projectile = Projectile {
        z: 1,
        mass: 1.007825,
    };
}

impl Default for Projectile {
    fn default() -> Self {
        Self::HELIUM_4
    }
}

/// How the exit angle is derived from the incidence and scattering angles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryConvention {
    #[default]
    Ibm, // incident beam, exit beam and normal are coplanar
    Cornell, // detector in the plane perpendicular to the tilt axis
}

impl GeometryConvention {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "cornell" => Self::Cornell,
            _ => Self::Ibm,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Ibm => "ibm",
            Self::Cornell => "cornell",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentalSetup {
    pub projectile: Projectile,
    /// Beam energy in keV.
    pub beam_energy: f64,
    /// Beam energy spread, keV FWHM.
    pub energy_spread: f64,
    /// Incidence angle against the target normal, degrees.
    pub alpha: f64,
    /// Scattering angle, degrees.
    pub theta: f64,
    pub geometry: GeometryConvention,
    /// Integrated charge in µC.
    pub charge: f64,
    pub charge_bounds: Bounds,
}

impl Default for ExperimentalSetup {
    fn default() -> Self {
        Self {
            projectile: Projectile::HELIUM_4,
            beam_energy: 2000.0,
            energy_spread: 0.0,
            alpha: 0.0,
            theta: 160.0,
            geometry: GeometryConvention::Ibm,
            charge: 1.0,
            charge_bounds: Bounds::fixed(1.0),
        }
    }
}

impl ExperimentalSetup {
    /// Exit angle against the target normal, degrees.
    pub fn beta(&self) -> f64 {
        match self.geometry {
            GeometryConvention::Ibm => (180.0 - self.theta - self.alpha).abs(),
            GeometryConvention::Cornell => {
                let cos_beta = -self.theta.to_radians().cos() * self.alpha.to_radians().cos();
                cos_beta.clamp(-1.0, 1.0).acos().to_degrees()
            }
        }
    }

    /// Path-length factor 1/cos α on the way in.
    pub fn inbound_path_factor(&self) -> f64 {
        path_factor(self.alpha)
    }

    /// Path-length factor 1/|cos β| on the way out.
    pub fn outbound_path_factor(&self) -> f64 {
        path_factor(self.beta())
    }
}

fn path_factor(angle_deg: f64) -> f64 {
    let c = angle_deg.to_radians().cos().abs();
    if c < 1e-6 { 1e6 } else { 1.0 / c }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// keV per channel.
    pub factor: f64,
    pub factor_bounds: Bounds,
    /// keV at channel zero.
    pub offset: f64,
    pub offset_bounds: Bounds,
}

impl Calibration {
    pub fn new(factor: f64, offset: f64) -> Self {
        Self {
            factor,
            factor_bounds: Bounds::fixed(factor),
            offset,
            offset_bounds: Bounds::fixed(offset),
        }
    }

    #[inline]
    pub fn energy_of(&self, channel: f64) -> f64 {
        self.offset + self.factor * channel
    }

    #[inline]
    pub fn channel_of(&self, energy: f64) -> f64 {
        (energy - self.offset) / self.factor
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::new(1.0, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetectorSetup {
    /// Energy resolution, keV FWHM.
    pub resolution: f64,
    pub resolution_bounds: Bounds,
    pub calibration: Calibration,
    /// Solid angle in msr.
    pub solid_angle: f64,
}

impl Default for DetectorSetup {
    fn default() -> Self {
        Self {
            resolution: 15.0,
            resolution_bounds: Bounds::fixed(15.0),
            calibration: Calibration::default(),
            solid_angle: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ibm_beta_is_supplement_of_theta_plus_alpha() {
        let setup = ExperimentalSetup {
            alpha: 10.0,
            theta: 160.0,
            ..Default::default()
        };
        assert!((setup.beta() - 10.0).abs() < 1e-12);
        let setup = ExperimentalSetup {
            alpha: 30.0,
            theta: 170.0,
            ..Default::default()
        };
        assert!((setup.beta() - 20.0).abs() < 1e-12);
    }

    #[test]
    fn cornell_beta_follows_cosine_relation() {
        let setup = ExperimentalSetup {
            alpha: 60.0,
            theta: 170.0,
            geometry: GeometryConvention::Cornell,
            ..Default::default()
        };
        let expected = (-(170f64.to_radians().cos()) * 60f64.to_radians().cos())
            .acos()
            .to_degrees();
        assert!((setup.beta() - expected).abs() < 1e-12);
    }

    #[test]
    fn normal_incidence_conventions_agree() {
        let ibm = ExperimentalSetup::default();
        let cornell = ExperimentalSetup {
            geometry: GeometryConvention::Cornell,
            ..Default::default()
        };
        assert!((ibm.beta() - cornell.beta()).abs() < 1e-9);
    }

    #[test]
    fn calibration_maps_both_ways() {
        let cal = Calibration::new(2.5, 30.0);
        assert_eq!(cal.energy_of(100.0), 280.0);
        assert_eq!(cal.channel_of(280.0), 100.0);
    }

    #[test]
    fn unknown_geometry_name_falls_back_to_ibm() {
        assert_eq!(GeometryConvention::from_name("Cornell"), GeometryConvention::Cornell);
        assert_eq!(GeometryConvention::from_name("whatever"), GeometryConvention::Ibm);
    }
}
