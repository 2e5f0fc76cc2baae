use std::f64::consts::{FRAC_1_SQRT_2, PI};

const FWHM_TO_SIGMA_SQ: f64 = 1.0 / (8.0 * std::f64::consts::LN_2);

/// Error function, Abramowitz & Stegun 7.1.26 (|ε| < 1.5e-7).
pub fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

/// Standard normal cumulative distribution.
#[inline]
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x * FRAC_1_SQRT_2))
}

#[inline]
pub fn normal_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * PI).sqrt()
}

/// Gaussian variance from a full width at half maximum.
#[inline]
pub fn fwhm_to_variance(fwhm: f64) -> f64 {
    fwhm * fwhm * FWHM_TO_SIGMA_SQ
}

/// ∫_{-∞}^{u} Φ(t/σ) dt, the antiderivative that turns box ⊗ Gaussian into closed form.
fn smoothed_ramp(u: f64, sigma: f64) -> f64 {
    if sigma <= 0.0 {
        return u.max(0.0);
    }
    let z = u / sigma;
    u * normal_cdf(z) + sigma * normal_pdf(z)
}

/// Fraction of a uniform box on `[e1, e2]`, convolved with a Gaussian of width `sigma`,
/// that falls into the bin `[a, b]`.
pub fn box_gauss_fraction(a: f64, b: f64, e1: f64, e2: f64, sigma: f64) -> f64 {
    let (e1, e2) = if e1 <= e2 { (e1, e2) } else { (e2, e1) };
    let width = e2 - e1;
    if width <= 1e-6 * sigma.max(1e-9) {
        let center = 0.5 * (e1 + e2);
        if sigma <= 0.0 {
            return if center >= a && center < b { 1.0 } else { 0.0 };
        }
        return normal_cdf((b - center) / sigma) - normal_cdf((a - center) / sigma);
    }
    let value = smoothed_ramp(b - e1, sigma) - smoothed_ramp(a - e1, sigma)
        - smoothed_ramp(b - e2, sigma)
        + smoothed_ramp(a - e2, sigma);
    (value / width).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erf_matches_reference_points() {
        assert!(erf(0.0).abs() < 1e-7);
        assert!((erf(0.5) - 0.5204998778).abs() < 2e-7);
        assert!((erf(1.0) - 0.8427007929).abs() < 2e-7);
        assert!((erf(-2.0) + 0.9953222650).abs() < 2e-7);
    }

    #[test]
    fn bins_covering_everything_capture_the_whole_box() {
        let total = box_gauss_fraction(-1000.0, 1000.0, 10.0, 20.0, 3.0);
        assert!((total - 1.0).abs() < 1e-6);
    }

    #[test]
    fn adjacent_bins_partition_the_box() {
        let sum: f64 = (0..60)
            .map(|i| box_gauss_fraction(i as f64, i as f64 + 1.0, 20.0, 35.0, 2.5))
            .sum();
        assert!((sum - 1.0).abs() < 1e-6, "{sum}");
    }

    #[test]
    fn zero_width_box_reduces_to_gaussian() {
        let f = box_gauss_fraction(-1.0, 1.0, 0.0, 0.0, 1.0);
        assert!((f - 0.6826894921).abs() < 1e-6);
    }

    #[test]
    fn zero_sigma_gives_geometric_overlap() {
        assert!((box_gauss_fraction(0.0, 5.0, 0.0, 10.0, 0.0) - 0.5).abs() < 1e-12);
        assert_eq!(box_gauss_fraction(20.0, 30.0, 0.0, 10.0, 0.0), 0.0);
    }

    #[test]
    fn fwhm_conversion() {
        let var = fwhm_to_variance(2.0 * (2.0 * std::f64::consts::LN_2).sqrt());
        assert!((var - 1.0).abs() < 1e-12);
    }
}
