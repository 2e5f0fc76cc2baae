/// Elastic kinematic factor K = E_scattered / E_incident for a projectile of mass `m1`
/// scattered by a target nucleus of mass `m2` into the laboratory angle `theta_deg`.
///
/// Returns `None` when no elastic scattering into `theta_deg` is possible: for `m1 > m2`
/// beyond the maximum angle `asin(m2/m1)`, and for `m1 == m2` at or beyond 90°, where the
/// radicand `m2² − m1²·sin²θ` is clamped at zero and the factor degenerates to `cos²θ`.
pub fn kinematic_factor(m1: f64, m2: f64, theta_deg: f64) -> Option<f64> {
    if m1 <= 0.0 || m2 <= 0.0 {
        return None;
    }
    let theta = theta_deg.to_radians();
    let (sin, cos) = theta.sin_cos();
    if m1 > m2 && sin > m2 / m1 {
        return None;
    }
    let radicand = (m2 * m2 - m1 * m1 * sin * sin).max(0.0);
    let numerator = radicand.sqrt() + m1 * cos;
    if numerator <= 0.0 {
        return None;
    }
    let k = numerator / (m1 + m2);
    Some(k * k)
}

/// Energy just after scattering, keV.
#[inline]
pub fn scattered_energy(k: f64, energy: f64) -> f64 {
    k * energy
}

/// Centre-of-mass scattering angle in degrees for the laboratory angle `theta_deg`.
pub fn center_of_mass_angle(m1: f64, m2: f64, theta_deg: f64) -> f64 {
    let theta = theta_deg.to_radians();
    let x = (m1 / m2 * theta.sin()).clamp(-1.0, 1.0);
    (theta + x.asin()).to_degrees()
}

/// Centre-of-mass energy for a laboratory energy `energy`.
#[inline]
pub fn center_of_mass_energy(m1: f64, m2: f64, energy: f64) -> f64 {
    energy * m2 / (m1 + m2)
}
