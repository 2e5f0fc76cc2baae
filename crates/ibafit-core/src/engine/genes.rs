use super::error::EngineError;
use crate::core::models::bounds::Bounds;
use crate::core::models::setup::{DetectorSetup, ExperimentalSetup};
use crate::core::models::target::{LayerElement, LayerId, Target};
use rand::Rng;
use tracing::warn;

const FRACTION_SUM_TOLERANCE: f64 = 1e-9;
const BALANCE_ITERATIONS: usize = 100;

/// A decoded candidate: a private target copy plus the fitted instrument values.
#[derive(Debug, Clone, PartialEq)]
pub struct Individual {
    pub target: Target,
    pub charge: f64,
    pub resolution: f64,
    /// Physical keV per channel, independent of any fit-time binning.
    pub calibration_factor: f64,
    pub calibration_offset: f64,
    /// `f64::INFINITY` until evaluated.
    pub fitness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneKind {
    Charge,
    Resolution,
    CalibrationFactor,
    CalibrationOffset,
    Thickness { layer: LayerId },
    Fraction { layer: LayerId, element: usize },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gene {
    pub kind: GeneKind,
    pub bounds: Bounds,
}

/// Flat, bounded parameter vector layout derived from a baseline configuration.
///
/// Genes are ordered as charge, resolution, calibration factor, calibration offset, then
/// for each layer its thickness followed by the fraction of each of its elements. The
/// calibration factor gene lives in compressed-channel units (factor × `num_bins`).
#[derive(Debug, Clone)]
pub struct GeneSpace {
    genes: Vec<Gene>,
    template: Target,
    num_bins: usize,
}

impl GeneSpace {
    pub fn new(
        experiment: &ExperimentalSetup,
        detector: &DetectorSetup,
        target: &Target,
        num_bins: usize,
    ) -> Self {
        let bins = num_bins.max(1) as f64;
        let calibration = &detector.calibration;
        let mut genes = vec![
            Gene {
                kind: GeneKind::Charge,
                bounds: experiment.charge_bounds.normalized(),
            },
            Gene {
                kind: GeneKind::Resolution,
                bounds: detector.resolution_bounds.normalized(),
            },
            Gene {
                kind: GeneKind::CalibrationFactor,
                bounds: Bounds::new(
                    calibration.factor_bounds.min * bins,
                    calibration.factor_bounds.max * bins,
                ),
            },
            Gene {
                kind: GeneKind::CalibrationOffset,
                bounds: calibration.offset_bounds.normalized(),
            },
        ];
        for (id, layer) in target.layers() {
            genes.push(Gene {
                kind: GeneKind::Thickness { layer: id },
                bounds: layer.thickness_bounds.normalized(),
            });
            for (index, bounds) in fraction_bounds(&layer.elements).into_iter().enumerate() {
                genes.push(Gene {
                    kind: GeneKind::Fraction {
                        layer: id,
                        element: index,
                    },
                    bounds,
                });
            }
        }
        Self {
            genes,
            template: target.clone(),
            num_bins: num_bins.max(1),
        }
    }

    pub fn genes(&self) -> &[Gene] {
        &self.genes
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    pub fn free_dimensions(&self) -> usize {
        self.genes.iter().filter(|g| !g.bounds.is_fixed()).count()
    }

    /// Fails when every gene is pinned, since there is nothing left to search.
    pub fn ensure_searchable(&self) -> Result<(), EngineError> {
        if self.free_dimensions() == 0 {
            return Err(EngineError::EmptyGeneSpace);
        }
        Ok(())
    }

    pub fn sample(&self, rng: &mut impl Rng) -> Vec<f64> {
        self.genes
            .iter()
            .map(|g| {
                let b = g.bounds;
                if b.is_fixed() || !b.width().is_finite() {
                    b.min
                } else {
                    rng.gen_range(b.min..=b.max)
                }
            })
            .collect()
    }

    pub fn clamp(&self, values: &mut [f64]) {
        for (value, gene) in values.iter_mut().zip(&self.genes) {
            *value = gene.bounds.clamp(*value);
        }
    }

    pub fn encode(&self, individual: &Individual) -> Vec<f64> {
        self.genes
            .iter()
            .map(|gene| match gene.kind {
                GeneKind::Charge => individual.charge,
                GeneKind::Resolution => individual.resolution,
                GeneKind::CalibrationFactor => {
                    individual.calibration_factor * self.num_bins as f64
                }
                GeneKind::CalibrationOffset => individual.calibration_offset,
                GeneKind::Thickness { layer } => individual
                    .target
                    .layer(layer)
                    .map_or(gene.bounds.min, |l| l.thickness),
                GeneKind::Fraction { layer, element } => individual
                    .target
                    .layer(layer)
                    .and_then(|l| l.elements.get(element))
                    .map_or(gene.bounds.min, |e| e.fraction),
            })
            .collect()
    }

    /// Builds an unevaluated Individual. Free layer fractions are balanced so each layer
    /// sums to one without leaving their bounds, pinned fractions keep their value, and the
    /// calibration factor is converted back to keV per uncompressed channel.
    pub fn decode(&self, values: &[f64]) -> Individual {
        let mut individual = Individual {
            target: self.template.clone(),
            charge: 0.0,
            resolution: 0.0,
            calibration_factor: 0.0,
            calibration_offset: 0.0,
            fitness: f64::INFINITY,
        };
        for (gene, &value) in self.genes.iter().zip(values) {
            match gene.kind {
                GeneKind::Charge => individual.charge = value,
                GeneKind::Resolution => individual.resolution = value,
                GeneKind::CalibrationFactor => {
                    individual.calibration_factor = value / self.num_bins as f64
                }
                GeneKind::CalibrationOffset => individual.calibration_offset = value,
                GeneKind::Thickness { layer } => {
                    if let Some(l) = individual.target.layer_mut(layer) {
                        l.thickness = value;
                    }
                }
                GeneKind::Fraction { layer, element } => {
                    if let Some(e) = individual
                        .target
                        .layer_mut(layer)
                        .and_then(|l| l.elements.get_mut(element))
                    {
                        e.fraction = value;
                        e.fraction_bounds = gene.bounds;
                    }
                }
            }
        }
        for layer in individual.target.layers_mut() {
            let bounds: Vec<Bounds> = layer.elements.iter().map(|e| e.fraction_bounds).collect();
            let mut fractions: Vec<f64> = layer.elements.iter().map(|e| e.fraction).collect();
            balance_fractions(&mut fractions, &bounds);
            for (element, fraction) in layer.elements.iter_mut().zip(fractions) {
                element.fraction = fraction;
            }
        }
        individual
    }
}

/// Fraction gene bounds of one layer, clipped to `[0, 1]`. When the bounds cannot sum to
/// one, every fraction of the layer is pinned at its baseline value.
fn fraction_bounds(elements: &[LayerElement]) -> Vec<Bounds> {
    let bounds: Vec<Bounds> = elements
        .iter()
        .map(|e| {
            let b = e.fraction_bounds.normalized();
            Bounds::new(b.min.clamp(0.0, 1.0), b.max.clamp(0.0, 1.0))
        })
        .collect();
    let lowest: f64 = bounds.iter().map(|b| b.min).sum();
    let highest: f64 = bounds.iter().map(|b| b.max).sum();
    if lowest <= 1.0 + FRACTION_SUM_TOLERANCE && highest >= 1.0 - FRACTION_SUM_TOLERANCE {
        return bounds;
    }
    warn!(
        lowest,
        highest, "Fraction bounds of a layer cannot sum to one; pinning its composition."
    );
    elements.iter().map(|e| Bounds::fixed(e.fraction)).collect()
}

/// Brings a layer's fractions to a sum of one. Pinned fractions keep their value; the free
/// ones are shifted by a common offset and clamped to their bounds, which is the closest
/// point in the bounded simplex.
fn balance_fractions(fractions: &mut [f64], bounds: &[Bounds]) {
    let mut pinned = 0.0;
    for (fraction, b) in fractions.iter_mut().zip(bounds) {
        if b.is_fixed() {
            *fraction = b.min;
            pinned += b.min;
        } else {
            *fraction = b.clamp(*fraction);
        }
    }
    let free: Vec<usize> = (0..fractions.len()).filter(|&i| !bounds[i].is_fixed()).collect();
    if free.is_empty() {
        return;
    }
    let remaining = 1.0 - pinned;
    let total = |shift: f64| -> f64 {
        free.iter()
            .map(|&i| bounds[i].clamp(fractions[i] + shift))
            .sum()
    };

    // Fractions and bounds lie in [0, 1], so a shift of ±2 saturates every free fraction.
    let (mut low, mut high) = (-2.0, 2.0);
    for _ in 0..BALANCE_ITERATIONS {
        let mid = 0.5 * (low + high);
        if total(mid) < remaining {
            low = mid;
        } else {
            high = mid;
        }
    }
    let shift = 0.5 * (low + high);
    for &i in &free {
        fractions[i] = bounds[i].clamp(fractions[i] + shift);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::setup::Calibration;
    use crate::core::models::target::{Layer, LayerElement};
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn space(num_bins: usize) -> GeneSpace {
        let experiment = ExperimentalSetup {
            charge: 10.0,
            charge_bounds: Bounds::new(5.0, 15.0),
            ..Default::default()
        };
        let mut calibration = Calibration::new(2.0, 10.0);
        calibration.factor_bounds = Bounds::new(1.5, 2.5);
        let detector = DetectorSetup {
            calibration,
            ..Default::default()
        };
        let mut target = Target::new();
        target.push_layer(
            Layer::new(1000.0)
                .with_thickness_bounds(Bounds::new(500.0, 1500.0))
                .with_element(
                    LayerElement::from_symbol("Si", 0.5)
                        .unwrap()
                        .with_fraction_bounds(Bounds::new(0.2, 0.8)),
                )
                .with_element(
                    LayerElement::from_symbol("O", 0.5)
                        .unwrap()
                        .with_fraction_bounds(Bounds::new(0.2, 0.8)),
                ),
        );
        GeneSpace::new(&experiment, &detector, &target, num_bins)
    }

    #[test]
    fn genes_follow_instrument_then_layer_order() {
        let space = space(1);
        let kinds: Vec<_> = space.genes().iter().map(|g| g.kind).collect();
        assert_eq!(kinds.len(), 7);
        assert_eq!(kinds[0], GeneKind::Charge);
        assert_eq!(kinds[3], GeneKind::CalibrationOffset);
        assert!(matches!(kinds[4], GeneKind::Thickness { .. }));
        assert!(matches!(kinds[6], GeneKind::Fraction { element: 1, .. }));
        assert_eq!(space.free_dimensions(), 5);
    }

    #[test]
    fn samples_stay_in_bounds_and_fixed_genes_are_constant() {
        let space = space(1);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let values = space.sample(&mut rng);
            for (value, gene) in values.iter().zip(space.genes()) {
                assert!(gene.bounds.contains(*value));
            }
            assert_eq!(values[1], 15.0);
            assert_eq!(values[3], 10.0);
        }
    }

    #[test]
    fn clamp_pulls_values_back_into_bounds() {
        let space = space(1);
        let mut values = vec![100.0, 0.0, -1.0, 10.0, 1e9, 0.0, f64::NAN];
        space.clamp(&mut values);
        assert_eq!(values[0], 15.0);
        assert_eq!(values[2], 1.5);
        assert_eq!(values[4], 1500.0);
        assert_eq!(values[5], 0.2);
        assert_eq!(values[6], 0.2);
    }

    #[test]
    fn decode_balances_fractions_and_unscales_calibration() {
        let space = space(4);
        let individual = space.decode(&[10.0, 15.0, 8.0, 10.0, 1200.0, 0.6, 0.2]);
        assert_eq!(individual.calibration_factor, 2.0);
        assert_eq!(individual.fitness, f64::INFINITY);
        let (_, layer) = individual.target.layers().next().unwrap();
        assert_eq!(layer.thickness, 1200.0);
        assert!((layer.elements[0].fraction - 0.7).abs() < 1e-12);
        assert!((layer.elements[1].fraction - 0.3).abs() < 1e-12);

        let encoded = space.encode(&individual);
        assert_eq!(encoded[2], 8.0);
        assert!((encoded[5] - 0.7).abs() < 1e-12);
    }

    fn ternary_target() -> Target {
        let mut target = Target::new();
        target.push_layer(
            Layer::new(1000.0)
                .with_element(LayerElement::from_symbol("Si", 0.5).unwrap())
                .with_element(
                    LayerElement::from_symbol("O", 0.3)
                        .unwrap()
                        .with_fraction_bounds(Bounds::new(0.1, 0.5)),
                )
                .with_element(
                    LayerElement::from_symbol("C", 0.2)
                        .unwrap()
                        .with_fraction_bounds(Bounds::new(0.0, 0.4)),
                ),
        );
        target
    }

    #[test]
    fn decoded_fractions_keep_pinned_values_and_stay_in_bounds() {
        let space = GeneSpace::new(
            &ExperimentalSetup::default(),
            &DetectorSetup::default(),
            &ternary_target(),
            1,
        );
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let individual = space.decode(&space.sample(&mut rng));
            let (_, layer) = individual.target.layers().next().unwrap();
            assert_eq!(layer.elements[0].fraction, 0.5);
            assert!((0.1..=0.5).contains(&layer.elements[1].fraction));
            assert!((0.0..=0.4).contains(&layer.elements[2].fraction));
            let sum: f64 = layer.elements.iter().map(|e| e.fraction).sum();
            assert!((sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn unsatisfiable_fraction_bounds_pin_the_composition() {
        let mut target = Target::new();
        target.push_layer(
            Layer::new(100.0)
                .with_element(
                    LayerElement::from_symbol("Si", 0.5)
                        .unwrap()
                        .with_fraction_bounds(Bounds::new(0.1, 0.2)),
                )
                .with_element(
                    LayerElement::from_symbol("O", 0.5)
                        .unwrap()
                        .with_fraction_bounds(Bounds::new(0.1, 0.2)),
                ),
        );
        let space = GeneSpace::new(
            &ExperimentalSetup::default(),
            &DetectorSetup::default(),
            &target,
            1,
        );
        let fractions: Vec<_> = space.genes()[5..].iter().map(|g| g.bounds).collect();
        assert_eq!(fractions, vec![Bounds::fixed(0.5), Bounds::fixed(0.5)]);
    }

    #[test]
    fn calibration_bounds_scale_with_bins() {
        let space = space(4);
        assert_eq!(space.genes()[2].bounds, Bounds::new(6.0, 10.0));
    }

    #[test]
    fn fully_pinned_space_is_not_searchable() {
        let mut target = Target::new();
        target.push_layer(Layer::new(100.0).with_element(LayerElement::from_symbol("C", 1.0).unwrap()));
        let space = GeneSpace::new(
            &ExperimentalSetup::default(),
            &DetectorSetup::default(),
            &target,
            1,
        );
        assert!(matches!(space.ensure_searchable(), Err(EngineError::EmptyGeneSpace)));
    }
}
