use super::compound::{self, Constituent};
use super::lookup::{DEFAULT_TABLE_POINTS, LookupTable, TABLE_MIN_ENERGY};
use super::{stopping, straggling};
use crate::core::models::calculation::{
    CalculationSetup, CompoundCorrection, DEFAULT_DEPTH_STEP, StoppingModel, StragglingModel,
};
use crate::core::models::setup::Projectile;
use crate::core::models::target::Layer;

/// Below this energy (keV) a projectile is considered stopped.
pub const EXHAUSTED_ENERGY: f64 = 1.0;

const EV_TO_KEV: f64 = 1e-3;

#[derive(Debug, Clone)]
struct ElementStopping {
    z: u8,
    mass: f64,
    table: Option<LookupTable>,
}

/// One layer prepared for stopping evaluation.
#[derive(Debug, Clone)]
pub struct Medium {
    constituents: Vec<MediumConstituent>,
    z2_mean: f64,
    correction: f64,
}

#[derive(Debug, Clone, Copy)]
struct MediumConstituent {
    fraction: f64,
    z: u8,
    mass: f64,
    slot: Option<usize>,
}

impl Medium {
    pub fn mean_z(&self) -> f64 {
        self.z2_mean
    }

    pub fn is_empty(&self) -> bool {
        self.constituents.is_empty()
    }
}

/// State of a projectile after crossing a slab.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Passage {
    pub energy: f64,   // keV
    pub variance: f64, // keV²
}

/// Energy loss and straggling of one projectile under a fixed model combination.
///
/// Elemental stopping is tabulated once per registered element when the look-up table is
/// enabled; compounds are combined on every call so layer compositions can change freely.
#[derive(Debug, Clone)]
pub struct StoppingEngine {
    projectile: Projectile,
    model: StoppingModel,
    compound: CompoundCorrection,
    straggling: StragglingModel,
    use_lookup_table: bool,
    depth_step: f64,
    max_energy: f64,
    elements: Vec<ElementStopping>,
}

/// A non-positive or non-finite step falls back to the default.
fn usable_depth_step(step: f64) -> f64 {
    if step.is_finite() && step > 0.0 {
        step
    } else {
        DEFAULT_DEPTH_STEP
    }
}

impl StoppingEngine {
    pub fn new(projectile: Projectile, calculation: &CalculationSetup, max_energy: f64) -> Self {
        Self {
            projectile,
            model: calculation.stopping,
            compound: calculation.compound,
            straggling: calculation.straggling,
            use_lookup_table: calculation.use_lookup_table,
            depth_step: usable_depth_step(calculation.depth_step),
            max_energy: max_energy.max(TABLE_MIN_ENERGY * 10.0) * 1.1,
            elements: Vec::new(),
        }
    }

    pub fn projectile(&self) -> &Projectile {
        &self.projectile
    }

    pub fn depth_step(&self) -> f64 {
        self.depth_step
    }

    /// Makes the elements of `layer` known to the engine, tabulating their stopping if enabled.
    pub fn register(&mut self, layer: &Layer) {
        for element in &layer.elements {
            let mass = element.mass();
            if self.slot_of(element.z, mass).is_some() {
                continue;
            }
            let table = self.use_lookup_table.then(|| {
                let (model, projectile, z) = (self.model, self.projectile, element.z);
                LookupTable::build(TABLE_MIN_ENERGY, self.max_energy, DEFAULT_TABLE_POINTS, |e| {
                    stopping::total(model, &projectile, z, mass, e)
                })
            });
            self.elements.push(ElementStopping {
                z: element.z,
                mass,
                table,
            });
        }
    }

    fn slot_of(&self, z: u8, mass: f64) -> Option<usize> {
        self.elements
            .iter()
            .position(|e| e.z == z && e.mass.to_bits() == mass.to_bits())
    }

    /// Prepares `layer` for evaluation with a stopping multiplier `correction`.
    pub fn medium(&self, layer: &Layer, correction: f64) -> Medium {
        let constituents = layer
            .elements
            .iter()
            .map(|e| {
                let mass = e.mass();
                MediumConstituent {
                    fraction: e.fraction,
                    z: e.z,
                    mass,
                    slot: self.slot_of(e.z, mass),
                }
            })
            .collect();
        Medium {
            constituents,
            z2_mean: layer.mean_z(),
            correction,
        }
    }

    fn eval(&self, z: u8, mass: f64, slot: Option<usize>, energy: f64) -> f64 {
        slot.and_then(|i| self.elements[i].table.as_ref())
            .and_then(|t| t.get(energy))
            .unwrap_or_else(|| stopping::total(self.model, &self.projectile, z, mass, energy))
    }

    /// Compound stopping of `medium`, eV/(1e15 atoms/cm²).
    pub fn stopping(&self, medium: &Medium, energy: f64) -> f64 {
        if energy <= 0.0 {
            return 0.0;
        }
        let constituents = medium.constituents.iter().map(|c| Constituent {
            fraction: c.fraction,
            mass: c.mass,
            stopping: self.eval(c.z, c.mass, c.slot, energy),
        });
        compound::combine(self.compound, constituents) * medium.correction
    }

    /// Carries a projectile of `energy` through `path` (1e15 atoms/cm² along the trajectory).
    ///
    /// Integrates with second-order steps no longer than the depth step. Returns `None` once
    /// the energy drops below [`EXHAUSTED_ENERGY`].
    pub fn traverse(&self, medium: &Medium, energy: f64, variance: f64, path: f64) -> Option<Passage> {
        if energy <= EXHAUSTED_ENERGY {
            return None;
        }
        if path <= 0.0 || medium.is_empty() {
            return Some(Passage { energy, variance });
        }
        let s_in = self.stopping(medium, energy);
        let mut e = energy;
        let mut remaining = path;
        while remaining > 0.0 {
            let dx = remaining.min(self.depth_step);
            let s1 = self.stopping(medium, e);
            let half = e - 0.5 * s1 * dx * EV_TO_KEV;
            if half <= EXHAUSTED_ENERGY {
                return None;
            }
            e -= self.stopping(medium, half) * dx * EV_TO_KEV;
            if e <= EXHAUSTED_ENERGY {
                return None;
            }
            remaining -= dx;
        }
        let s_out = self.stopping(medium, e);
        let mean_ep = 0.5 * (energy + e) / self.projectile.mass;
        let added = straggling::slab_variance(
            self.straggling,
            self.projectile.z,
            medium.z2_mean,
            mean_ep,
            path,
        );
        Some(Passage {
            energy: e,
            variance: straggling::propagate(variance, s_in, s_out, added),
        })
    }
}
