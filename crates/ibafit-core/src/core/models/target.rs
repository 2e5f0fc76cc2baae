use super::bounds::Bounds;
use super::element;
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

new_key_type! {
    /// Handle of a layer inside a [`Target`].
    pub struct LayerId;
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TargetError {
    #[error("Unknown element symbol: '{0}'")]
    UnknownSymbol(String),
    #[error("Atomic number {0} is outside the supported range 1..=92")]
    UnknownAtomicNumber(u8),
    #[error("Layer handle does not belong to this target")]
    UnknownLayer,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Isotope {
    pub mass: f64,      // amu
    pub abundance: f64, // fraction of the element, 0..=1
}

#[derive(Debug, Clone, PartialEq)]
pub struct LayerElement {
    pub z: u8,
    /// Atomic fraction within the layer.
    pub fraction: f64,
    pub fraction_bounds: Bounds,
    pub isotopes: Vec<Isotope>,
}

impl LayerElement {
    /// Element with its natural isotopic composition.
    pub fn natural(z: u8, fraction: f64) -> Result<Self, TargetError> {
        let data = element::by_z(z).ok_or(TargetError::UnknownAtomicNumber(z))?;
        let isotopes = data
            .natural_isotopes()
            .into_iter()
            .map(|(mass, abundance)| Isotope { mass, abundance })
            .collect();
        Ok(Self {
            z,
            fraction,
            fraction_bounds: Bounds::fixed(fraction),
            isotopes,
        })
    }

    pub fn from_symbol(symbol: &str, fraction: f64) -> Result<Self, TargetError> {
        let data =
            element::by_symbol(symbol).ok_or_else(|| TargetError::UnknownSymbol(symbol.into()))?;
        Self::natural(data.z, fraction)
    }

    pub fn with_fraction_bounds(mut self, bounds: Bounds) -> Self {
        self.fraction_bounds = bounds;
        self
    }

    /// Abundance-weighted mean isotope mass.
    pub fn mass(&self) -> f64 {
        let total: f64 = self.isotopes.iter().map(|i| i.abundance).sum();
        if total <= 0.0 {
            return element::by_z(self.z).map_or(0.0, |e| e.atomic_mass);
        }
        self.isotopes
            .iter()
            .map(|i| i.mass * i.abundance)
            .sum::<f64>()
            / total
    }

    pub fn symbol(&self) -> &'static str {
        element::by_z(self.z).map_or("?", |e| e.symbol)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Areal density in 1e15 atoms/cm².
    pub thickness: f64,
    pub thickness_bounds: Bounds,
    pub elements: Vec<LayerElement>,
}

impl Layer {
    pub fn new(thickness: f64) -> Self {
        Self {
            thickness,
            thickness_bounds: Bounds::fixed(thickness),
            elements: Vec::new(),
        }
    }

    pub fn with_thickness_bounds(mut self, bounds: Bounds) -> Self {
        self.thickness_bounds = bounds;
        self
    }

    pub fn with_element(mut self, element: LayerElement) -> Self {
        self.elements.push(element);
        self
    }

    /// Rescales the atomic fractions to sum to one. A layer whose fractions are all
    /// non-positive falls back to equal parts. Pinned fractions are re-pinned at their
    /// rescaled value; free fraction bounds already refer to the normalized layer.
    pub fn normalize(&mut self) {
        if self.elements.is_empty() {
            return;
        }
        let total: f64 = self.elements.iter().map(|e| e.fraction.max(0.0)).sum();
        let equal = 1.0 / self.elements.len() as f64;
        for e in &mut self.elements {
            e.fraction = if total > 0.0 {
                e.fraction.max(0.0) / total
            } else {
                equal
            };
            if e.fraction_bounds.is_fixed() {
                e.fraction_bounds = Bounds::fixed(e.fraction);
            }
        }
        for e in &mut self.elements {
            let total: f64 = e.isotopes.iter().map(|i| i.abundance).sum();
            if total > 0.0 && (total - 1.0).abs() > f64::EPSILON {
                for iso in &mut e.isotopes {
                    iso.abundance /= total;
                }
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() || self.thickness <= 0.0
    }

    /// Fraction-weighted mean atomic number.
    pub fn mean_z(&self) -> f64 {
        self.elements
            .iter()
            .map(|e| e.fraction * f64::from(e.z))
            .sum()
    }

    /// Fraction-weighted mean atomic mass.
    pub fn mean_mass(&self) -> f64 {
        self.elements.iter().map(|e| e.fraction * e.mass()).sum()
    }
}

/// Ordered stack of layers, beam entry first.
#[derive(Debug, Clone, Default)]
pub struct Target {
    layers: SlotMap<LayerId, Layer>,
    order: Vec<LayerId>,
}

impl Target {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_layer(&mut self, mut layer: Layer) -> LayerId {
        layer.normalize();
        let id = self.layers.insert(layer);
        self.order.push(id);
        id
    }

    pub fn remove_layer(&mut self, id: LayerId) -> Result<Layer, TargetError> {
        let layer = self.layers.remove(id).ok_or(TargetError::UnknownLayer)?;
        self.order.retain(|&other| other != id);
        Ok(layer)
    }

    pub fn layer(&self, id: LayerId) -> Option<&Layer> {
        self.layers.get(id)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut Layer> {
        self.layers.get_mut(id)
    }

    pub fn ids(&self) -> &[LayerId] {
        &self.order
    }

    /// Layers in beam order.
    pub fn layers(&self) -> impl Iterator<Item = (LayerId, &Layer)> + '_ {
        self.order.iter().map(move |&id| (id, &self.layers[id]))
    }

    pub fn layers_mut(&mut self) -> impl Iterator<Item = &mut Layer> + '_ {
        // SlotMap hands out disjoint mutable borrows only through its own iterator.
        let order = &self.order;
        let mut refs: Vec<(usize, &mut Layer)> = self
            .layers
            .iter_mut()
            .filter_map(|(id, layer)| order.iter().position(|&o| o == id).map(|p| (p, layer)))
            .collect();
        refs.sort_by_key(|(p, _)| *p);
        refs.into_iter().map(|(_, layer)| layer)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn normalize(&mut self) {
        for layer in self.layers.values_mut() {
            layer.normalize();
        }
    }

    pub fn total_thickness(&self) -> f64 {
        self.layers().map(|(_, l)| l.thickness.max(0.0)).sum()
    }
}

impl PartialEq for Target {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self
                .layers()
                .zip(other.layers())
                .all(|((_, a), (_, b))| a == b)
    }
}
