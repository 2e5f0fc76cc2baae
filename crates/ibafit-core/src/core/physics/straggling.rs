use crate::core::models::calculation::StragglingModel;

/// Bohr energy-loss variance per unit Z1²·Z2, keV² per 1e15 atoms/cm².
pub const BOHR_CONSTANT: f64 = 0.26e-3;

pub fn bohr_variance(z1: u8, z2_mean: f64, areal_density: f64) -> f64 {
    let z1 = f64::from(z1);
    BOHR_CONSTANT * z1 * z1 * z2_mean * areal_density.max(0.0)
}

/// Lindhard–Scharff correction H ≤ 1 to the Bohr variance at `ep` keV/u.
pub fn chu_correction(ep: f64, z2_mean: f64) -> f64 {
    if ep <= 0.0 || z2_mean <= 0.0 {
        return 0.0;
    }
    let chi = ep / (24.8 * z2_mean);
    if chi >= 3.0 {
        return 1.0;
    }
    let l = 1.36 * chi.sqrt() - 0.016 * chi.powf(1.5);
    (0.5 * l).clamp(0.0, 1.0)
}

/// Variance (keV²) picked up in a slab of `areal_density` along the path.
pub fn slab_variance(
    model: StragglingModel,
    z1: u8,
    z2_mean: f64,
    ep: f64,
    areal_density: f64,
) -> f64 {
    match model {
        StragglingModel::None => 0.0,
        StragglingModel::Bohr => bohr_variance(z1, z2_mean, areal_density),
        StragglingModel::Chu => bohr_variance(z1, z2_mean, areal_density) * chu_correction(ep, z2_mean),
    }
}

/// Carries an energy variance through a slab whose stopping changes from `s_in` to `s_out`,
/// then adds the slab's own contribution in quadrature.
pub fn propagate(variance: f64, s_in: f64, s_out: f64, added: f64) -> f64 {
    let scaled = if s_in > 0.0 && s_out > 0.0 {
        variance * (s_out / s_in).powi(2)
    } else {
        variance
    };
    scaled + added.max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bohr_variance_is_linear_in_thickness() {
        let a = bohr_variance(2, 14.0, 100.0);
        let b = bohr_variance(2, 14.0, 200.0);
        assert!((b - 2.0 * a).abs() < 1e-12);
        assert!((a - 0.26e-3 * 4.0 * 14.0 * 100.0).abs() < 1e-12);
    }

    #[test]
    fn chu_correction_is_bounded_and_saturates() {
        assert!(chu_correction(10.0, 79.0) < 0.5);
        assert_eq!(chu_correction(1.0e5, 6.0), 1.0);
        for ep in [1.0, 10.0, 100.0, 1000.0] {
            let h = chu_correction(ep, 14.0);
            assert!((0.0..=1.0).contains(&h));
        }
    }

    #[test]
    fn none_model_adds_nothing() {
        assert_eq!(slab_variance(StragglingModel::None, 2, 14.0, 500.0, 1e4), 0.0);
        assert!(
            slab_variance(StragglingModel::Chu, 2, 14.0, 500.0, 1e4)
                <= slab_variance(StragglingModel::Bohr, 2, 14.0, 500.0, 1e4)
        );
    }

    #[test]
    fn propagation_scales_by_stopping_ratio() {
        assert!((propagate(4.0, 10.0, 20.0, 1.0) - 17.0).abs() < 1e-12);
        assert_eq!(propagate(4.0, 0.0, 20.0, 0.0), 4.0);
    }
}
