use crate::core::models::calculation::CompoundCorrection;

/// One element of a compound as seen by the stopping combination rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Constituent {
    pub fraction: f64, // atomic fraction
    pub mass: f64,     // amu
    pub stopping: f64, // eV/(1e15 atoms/cm²)
}

/// Combines elemental stopping cross-sections into the stopping per average compound atom.
pub fn combine(rule: CompoundCorrection, constituents: impl IntoIterator<Item = Constituent>) -> f64 {
    match rule {
        CompoundCorrection::Bragg => constituents
            .into_iter()
            .map(|c| c.fraction * c.stopping)
            .sum(),
        CompoundCorrection::MassWeighted => {
            let (weighted, total_mass) =
                constituents
                    .into_iter()
                    .fold((0.0, 0.0), |(weighted, total), c| {
                        let w = c.fraction * c.mass;
                        (weighted + w * c.stopping, total + w)
                    });
            if total_mass <= 0.0 { 0.0 } else { weighted / total_mass }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIO2: [Constituent; 2] = [
        Constituent {
            fraction: 1.0 / 3.0,
            mass: 28.085,
            stopping: 45.0,
        },
        Constituent {
            fraction: 2.0 / 3.0,
            mass: 15.999,
            stopping: 35.0,
        },
    ];

    #[test]
    fn bragg_is_atomic_fraction_weighted() {
        let s = combine(CompoundCorrection::Bragg, SIO2);
        assert!((s - (45.0 / 3.0 + 70.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn mass_weighting_favours_heavy_constituents() {
        let bragg = combine(CompoundCorrection::Bragg, SIO2);
        let mass = combine(CompoundCorrection::MassWeighted, SIO2);
        assert!(mass > bragg);
    }

    #[test]
    fn rules_agree_for_a_pure_element() {
        let pure = [Constituent {
            fraction: 1.0,
            mass: 12.0,
            stopping: 30.0,
        }];
        assert_eq!(combine(CompoundCorrection::Bragg, pure), 30.0);
        assert_eq!(combine(CompoundCorrection::MassWeighted, pure), 30.0);
    }
}
