use phf::{Map, phf_map};

/// A naturally occurring isotope: atomic mass in amu and abundance in percent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IsotopeData {
    pub mass: f64,
    pub abundance_percent: f64,
}

/// Static reference data for one chemical element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElementData {
    /// Atomic number.
    pub z: u8,
    /// Chemical symbol (e.g. "Si").
    pub symbol: &'static str,
    /// Standard atomic weight in amu.
    pub atomic_mass: f64,
    /// Natural isotopic composition. Empty for elements that are treated as monoisotopic
    /// at their standard atomic weight.
    pub isotopes: &'static [IsotopeData],
}

const fn iso(mass: f64, abundance_percent: f64) -> IsotopeData {
    IsotopeData {
        mass,
        abundance_percent,
    }
}

const fn el(
    z: u8,
    symbol: &'static str,
    atomic_mass: f64,
    isotopes: &'static [IsotopeData],
) -> ElementData {
    ElementData {
        z,
        symbol,
        atomic_mass,
        isotopes,
    }
}

const NONE: &[IsotopeData] = &[];

static ELEMENTS: [ElementData; 92] = [
    el(1, "H", 1.008, &[iso(1.007825, 99.9885), iso(2.014102, 0.0115)]),
    el(2, "He", 4.002602, &[iso(3.016029, 0.000134), iso(4.002603, 99.999866)]),
    el(3, "Li", 6.94, &[iso(6.015123, 7.59), iso(7.016004, 92.41)]),
    el(4, "Be", 9.012182, &[iso(9.012182, 100.0)]),
    el(5, "B", 10.81, &[iso(10.012937, 19.9), iso(11.009305, 80.1)]),
    el(6, "C", 12.011, &[iso(12.0, 98.93), iso(13.003355, 1.07)]),
    el(7, "N", 14.007, &[iso(14.003074, 99.636), iso(15.000109, 0.364)]),
    el(
        8,
        "O",
        15.999,
        &[
            iso(15.994915, 99.757),
            iso(16.999132, 0.038),
            iso(17.999160, 0.205),
        ],
    ),
    el(9, "F", 18.998403, &[iso(18.998403, 100.0)]),
    el(
        10,
        "Ne",
        20.180,
        &[
            iso(19.992440, 90.48),
            iso(20.993847, 0.27),
            iso(21.991385, 9.25),
        ],
    ),
    el(11, "Na", 22.989770, &[iso(22.989770, 100.0)]),
    el(
        12,
        "Mg",
        24.305,
        &[
            iso(23.985042, 78.99),
            iso(24.985837, 10.00),
            iso(25.982593, 11.01),
        ],
    ),
    el(13, "Al", 26.981538, &[iso(26.981538, 100.0)]),
    el(
        14,
        "Si",
        28.085,
        &[
            iso(27.976927, 92.2297),
            iso(28.976495, 4.6832),
            iso(29.973770, 3.0872),
        ],
    ),
    el(15, "P", 30.973762, &[iso(30.973762, 100.0)]),
    el(
        16,
        "S",
        32.06,
        &[
            iso(31.972071, 94.93),
            iso(32.971458, 0.76),
            iso(33.967867, 4.29),
            iso(35.967081, 0.02),
        ],
    ),
    el(17, "Cl", 35.45, &[iso(34.968853, 75.78), iso(36.965903, 24.22)]),
    el(
        18,
        "Ar",
        39.948,
        &[
            iso(35.967546, 0.3365),
            iso(37.962732, 0.0632),
            iso(39.962383, 99.6003),
        ],
    ),
    el(
        19,
        "K",
        39.098,
        &[
            iso(38.963707, 93.2581),
            iso(39.963999, 0.0117),
            iso(40.961826, 6.7302),
        ],
    ),
    el(
        20,
        "Ca",
        40.078,
        &[
            iso(39.962591, 96.941),
            iso(41.958618, 0.647),
            iso(42.958767, 0.135),
            iso(43.955481, 2.086),
            iso(45.953693, 0.004),
            iso(47.952534, 0.187),
        ],
    ),
    el(21, "Sc", 44.955910, NONE),
    el(
        22,
        "Ti",
        47.867,
        &[
            iso(45.952629, 8.25),
            iso(46.951764, 7.44),
            iso(47.947947, 73.72),
            iso(48.947871, 5.41),
            iso(49.944792, 5.18),
        ],
    ),
    el(23, "V", 50.942, &[iso(49.947163, 0.250), iso(50.943964, 99.750)]),
    el(
        24,
        "Cr",
        51.996,
        &[
            iso(49.946050, 4.345),
            iso(51.940512, 83.789),
            iso(52.940654, 9.501),
            iso(53.938885, 2.365),
        ],
    ),
    el(25, "Mn", 54.938050, &[iso(54.938050, 100.0)]),
    el(
        26,
        "Fe",
        55.845,
        &[
            iso(53.939615, 5.845),
            iso(55.934942, 91.754),
            iso(56.935399, 2.119),
            iso(57.933280, 0.282),
        ],
    ),
    el(27, "Co", 58.933200, &[iso(58.933200, 100.0)]),
    el(
        28,
        "Ni",
        58.693,
        &[
            iso(57.935348, 68.0769),
            iso(59.930791, 26.2231),
            iso(60.931060, 1.1399),
            iso(61.928349, 3.6345),
            iso(63.927970, 0.9256),
        ],
    ),
    el(29, "Cu", 63.546, &[iso(62.929601, 69.17), iso(64.927794, 30.83)]),
    el(
        30,
        "Zn",
        65.38,
        &[
            iso(63.929147, 48.63),
            iso(65.926037, 27.90),
            iso(66.927131, 4.10),
            iso(67.924848, 18.75),
            iso(69.925325, 0.62),
        ],
    ),
    el(31, "Ga", 69.723, &[iso(68.925581, 60.108), iso(70.924705, 39.892)]),
    el(
        32,
        "Ge",
        72.630,
        &[
            iso(69.924250, 20.84),
            iso(71.922076, 27.54),
            iso(72.923459, 7.73),
            iso(73.921178, 36.28),
            iso(75.921403, 7.61),
        ],
    ),
    el(33, "As", 74.921596, &[iso(74.921596, 100.0)]),
    el(
        34,
        "Se",
        78.971,
        &[
            iso(73.922477, 0.89),
            iso(75.919214, 9.37),
            iso(76.919915, 7.63),
            iso(77.917310, 23.77),
            iso(79.916522, 49.61),
            iso(81.916700, 8.73),
        ],
    ),
    el(35, "Br", 79.904, NONE),
    el(36, "Kr", 83.798, NONE),
    el(37, "Rb", 85.468, NONE),
    el(
        38,
        "Sr",
        87.62,
        &[
            iso(83.913425, 0.56),
            iso(85.909262, 9.86),
            iso(86.908879, 7.00),
            iso(87.905614, 82.58),
        ],
    ),
    el(39, "Y", 88.905848, &[iso(88.905848, 100.0)]),
    el(
        40,
        "Zr",
        91.224,
        &[
            iso(89.904704, 51.45),
            iso(90.905645, 11.22),
            iso(91.905040, 17.15),
            iso(93.906316, 17.38),
            iso(95.908276, 2.80),
        ],
    ),
    el(41, "Nb", 92.906378, &[iso(92.906378, 100.0)]),
    el(
        42,
        "Mo",
        95.95,
        &[
            iso(91.906810, 14.84),
            iso(93.905088, 9.25),
            iso(94.905841, 15.92),
            iso(95.904679, 16.68),
            iso(96.906021, 9.55),
            iso(97.905408, 24.13),
            iso(99.907477, 9.63),
        ],
    ),
    el(43, "Tc", 98.0, NONE),
    el(44, "Ru", 101.07, NONE),
    el(45, "Rh", 102.90550, NONE),
    el(46, "Pd", 106.42, NONE),
    el(47, "Ag", 107.8682, &[iso(106.905093, 51.839), iso(108.904756, 48.161)]),
    el(48, "Cd", 112.41, NONE),
    el(49, "In", 114.818, &[iso(112.904061, 4.29), iso(114.903878, 95.71)]),
    el(
        50,
        "Sn",
        118.71,
        &[
            iso(111.904821, 0.97),
            iso(113.902782, 0.66),
            iso(114.903346, 0.34),
            iso(115.901744, 14.54),
            iso(116.902954, 7.68),
            iso(117.901606, 24.22),
            iso(118.903309, 8.59),
            iso(119.902197, 32.58),
            iso(121.903440, 4.63),
            iso(123.905275, 5.79),
        ],
    ),
    el(51, "Sb", 121.760, &[iso(120.903818, 57.21), iso(122.904216, 42.79)]),
    el(52, "Te", 127.60, NONE),
    el(53, "I", 126.90447, NONE),
    el(54, "Xe", 131.293, NONE),
    el(55, "Cs", 132.90545, NONE),
    el(56, "Ba", 137.327, NONE),
    el(57, "La", 138.9055, NONE),
    el(58, "Ce", 140.116, NONE),
    el(59, "Pr", 140.90765, NONE),
    el(60, "Nd", 144.242, NONE),
    el(61, "Pm", 145.0, NONE),
    el(62, "Sm", 150.36, NONE),
    el(63, "Eu", 151.964, NONE),
    el(64, "Gd", 157.25, NONE),
    el(65, "Tb", 158.92534, NONE),
    el(66, "Dy", 162.500, NONE),
    el(67, "Ho", 164.93032, NONE),
    el(68, "Er", 167.259, NONE),
    el(69, "Tm", 168.93421, NONE),
    el(70, "Yb", 173.045, NONE),
    el(71, "Lu", 174.9668, NONE),
    el(
        72,
        "Hf",
        178.49,
        &[
            iso(173.940040, 0.16),
            iso(175.941402, 5.26),
            iso(176.943220, 18.60),
            iso(177.943698, 27.28),
            iso(178.945815, 13.62),
            iso(179.946549, 35.08),
        ],
    ),
    el(73, "Ta", 180.94788, &[iso(179.947466, 0.012), iso(180.947996, 99.988)]),
    el(
        74,
        "W",
        183.84,
        &[
            iso(179.946706, 0.12),
            iso(181.948206, 26.50),
            iso(182.950224, 14.31),
            iso(183.950933, 30.64),
            iso(185.954362, 28.43),
        ],
    ),
    el(75, "Re", 186.207, NONE),
    el(76, "Os", 190.23, NONE),
    el(77, "Ir", 192.217, NONE),
    el(
        78,
        "Pt",
        195.084,
        &[
            iso(189.959930, 0.014),
            iso(191.961035, 0.782),
            iso(193.962664, 32.967),
            iso(194.964774, 33.832),
            iso(195.964935, 25.242),
            iso(197.967876, 7.163),
        ],
    ),
    el(79, "Au", 196.966552, &[iso(196.966552, 100.0)]),
    el(80, "Hg", 200.592, NONE),
    el(81, "Tl", 204.38, NONE),
    el(
        82,
        "Pb",
        207.2,
        &[
            iso(203.973029, 1.4),
            iso(205.974449, 24.1),
            iso(206.975881, 22.1),
            iso(207.976636, 52.4),
        ],
    ),
    el(83, "Bi", 208.980383, &[iso(208.980383, 100.0)]),
    el(84, "Po", 209.0, NONE),
    el(85, "At", 210.0, NONE),
    el(86, "Rn", 222.0, NONE),
    el(87, "Fr", 223.0, NONE),
    el(88, "Ra", 226.0, NONE),
    el(89, "Ac", 227.0, NONE),
    el(90, "Th", 232.0377, NONE),
    el(91, "Pa", 231.03588, NONE),
    el(92, "U", 238.02891, NONE),
];

static SYMBOL_TO_Z: Map<&'static str, u8> = phf_map! {
    "H" => 1, "He" => 2, "Li" => 3, "Be" => 4, "B" => 5, "C" => 6, "N" => 7, "O" => 8,
    "F" => 9, "Ne" => 10, "Na" => 11, "Mg" => 12, "Al" => 13, "Si" => 14, "P" => 15,
    "S" => 16, "Cl" => 17, "Ar" => 18, "K" => 19, "Ca" => 20, "Sc" => 21, "Ti" => 22,
    "V" => 23, "Cr" => 24, "Mn" => 25, "Fe" => 26, "Co" => 27, "Ni" => 28, "Cu" => 29,
    "Zn" => 30, "Ga" => 31, "Ge" => 32, "As" => 33, "Se" => 34, "Br" => 35, "Kr" => 36,
    "Rb" => 37, "Sr" => 38, "Y" => 39, "Zr" => 40, "Nb" => 41, "Mo" => 42, "Tc" => 43,
    "Ru" => 44, "Rh" => 45, "Pd" => 46, "Ag" => 47, "Cd" => 48, "In" => 49, "Sn" => 50,
    "Sb" => 51, "Te" => 52, "I" => 53, "Xe" => 54, "Cs" => 55, "Ba" => 56, "La" => 57,
    "Ce" => 58, "Pr" => 59, "Nd" => 60, "Pm" => 61, "Sm" => 62, "Eu" => 63, "Gd" => 64,
    "Tb" => 65, "Dy" => 66, "Ho" => 67, "Er" => 68, "Tm" => 69, "Yb" => 70, "Lu" => 71,
    "Hf" => 72, "Ta" => 73, "W" => 74, "Re" => 75, "Os" => 76, "Ir" => 77, "Pt" => 78,
    "Au" => 79, "Hg" => 80, "Tl" => 81, "Pb" => 82, "Bi" => 83, "Po" => 84, "At" => 85,
    "Rn" => 86, "Fr" => 87, "Ra" => 88, "Ac" => 89, "Th" => 90, "Pa" => 91, "U" => 92,
};

/// Looks up the reference data of an element by atomic number (1..=92).
pub fn by_z(z: u8) -> Option<&'static ElementData> {
    if z == 0 {
        return None;
    }
    ELEMENTS.get(usize::from(z) - 1)
}

/// Looks up the reference data of an element by its chemical symbol.
pub fn by_symbol(symbol: &str) -> Option<&'static ElementData> {
    SYMBOL_TO_Z.get(symbol.trim()).and_then(|&z| by_z(z))
}

impl ElementData {
    /// Returns the natural isotopes as `(mass, abundance fraction)` pairs.
    ///
    /// Elements without tabulated isotopes yield a single entry at the standard atomic
    /// weight. Abundances are normalized to sum to one.
    pub fn natural_isotopes(&self) -> Vec<(f64, f64)> {
        if self.isotopes.is_empty() {
            return vec![(self.atomic_mass, 1.0)];
        }
        let total: f64 = self.isotopes.iter().map(|i| i.abundance_percent).sum();
        self.isotopes
            .iter()
            .map(|i| (i.mass, i.abundance_percent / total))
            .collect()
    }

    /// Mass of the most abundant isotope.
    pub fn most_abundant_mass(&self) -> f64 {
        self.isotopes
            .iter()
            .max_by(|a, b| {
                a.abundance_percent
                    .partial_cmp(&b.abundance_percent)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map_or(self.atomic_mass, |i| i.mass)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_indexed_by_atomic_number() {
        for (index, element) in ELEMENTS.iter().enumerate() {
            assert_eq!(usize::from(element.z), index + 1);
            assert_eq!(SYMBOL_TO_Z.get(element.symbol), Some(&element.z));
        }
    }

    #[test]
    fn lookup_by_symbol_and_z_agree() {
        let si = by_symbol("Si").unwrap();
        assert_eq!(si.z, 14);
        assert_eq!(by_z(14).unwrap().symbol, "Si");
        assert!(by_symbol("Xx").is_none());
        assert!(by_z(0).is_none());
        assert!(by_z(93).is_none());
    }

    #[test]
    fn natural_isotope_abundances_are_normalized() {
        for element in ELEMENTS.iter() {
            let total: f64 = element.natural_isotopes().iter().map(|(_, a)| a).sum();
            assert!((total - 1.0).abs() < 1e-9, "{}", element.symbol);
        }
    }

    #[test]
    fn isotope_weighted_mass_matches_standard_weight() {
        for symbol in ["C", "O", "Si", "Fe", "Ni", "Cu", "Ag", "W", "Pt", "Pb"] {
            let element = by_symbol(symbol).unwrap();
            let mean: f64 = element
                .natural_isotopes()
                .iter()
                .map(|(m, a)| m * a)
                .sum();
            assert!((mean - element.atomic_mass).abs() < 0.05, "{}", symbol);
        }
    }

    #[test]
    fn most_abundant_mass_picks_dominant_isotope() {
        assert_eq!(by_symbol("He").unwrap().most_abundant_mass(), 4.002603);
        assert_eq!(by_symbol("Sc").unwrap().most_abundant_mass(), 44.955910);
    }
}
