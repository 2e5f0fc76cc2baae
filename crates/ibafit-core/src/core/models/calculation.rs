use serde::{Deserialize, Serialize};

macro_rules! named_modes {
    ($ty:ident { $($variant:ident => [$name:literal $(, $alias:literal)*]),+ $(,)? }) => {
        impl $ty {
            /// Resolves a mode by name, case-insensitively. Unknown names resolve to the default.
            pub fn from_name(name: &str) -> Self {
                let key = name.trim().to_ascii_lowercase().replace(['-', '_', ' '], "");
                match key.as_str() {
                    $($name $(| $alias)* => Self::$variant,)+
                    _ => Self::default(),
                }
            }

            /// Canonical name, accepted by [`Self::from_name`].
            pub fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StoppingModel {
    #[default]
    ZieglerBiersack,
    Bethe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CompoundCorrection {
    #[default]
    Bragg,
    MassWeighted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StragglingModel {
    None,
    Bohr,
    #[default]
    Chu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScreeningModel {
    None,
    LEcuyer,
    #[default]
    Andersen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ChargeFractionModel {
    None,
    Fixed,
    #[default]
    Linear,
}

named_modes!(StoppingModel {
    ZieglerBiersack => ["zb", "zieglerbiersack", "ziegler"],
    Bethe => ["bethe", "bethebloch"],
});
named_modes!(CompoundCorrection {
    Bragg => ["bragg"],
    MassWeighted => ["massweighted", "mass"],
});
named_modes!(StragglingModel {
    None => ["none", "off"],
    Bohr => ["bohr"],
    Chu => ["chu"],
});
named_modes!(ScreeningModel {
    None => ["none", "off"],
    LEcuyer => ["lecuyer", "l'ecuyer"],
    Andersen => ["andersen", "anderson"],
});
named_modes!(ChargeFractionModel {
    None => ["none", "off"],
    Fixed => ["fixed", "constant"],
    Linear => ["linear"],
});

/// Parameters of the charge-fraction correction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChargeFractionParams {
    /// Constant fraction used by [`ChargeFractionModel::Fixed`].
    pub fixed: f64,
    /// `a` in `a + b·E` for [`ChargeFractionModel::Linear`].
    pub intercept: f64,
    /// `b` in `a + b·E`, per keV.
    pub slope: f64,
}

impl Default for ChargeFractionParams {
    fn default() -> Self {
        Self {
            fixed: 1.0,
            intercept: 1.0,
            slope: 0.0,
        }
    }
}

pub const DEFAULT_DEPTH_STEP: f64 = 10.0;

/// Model selection and numerical switches for one simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationSetup {
    pub stopping: StoppingModel,
    pub compound: CompoundCorrection,
    pub straggling: StragglingModel,
    pub screening: ScreeningModel,
    pub charge_fraction: ChargeFractionModel,
    pub charge_fraction_params: ChargeFractionParams,
    pub use_lookup_table: bool,
    pub simulate_isotopes: bool,
    pub show_elements: bool,
    pub show_isotopes: bool,
    pub show_layers: bool,
    /// Per-layer multipliers on the compound stopping, in beam order.
    pub correction_factors: Option<Vec<f64>>,
    /// Maximum integration step, 1e15 atoms/cm².
    pub depth_step: f64,
}

impl Default for CalculationSetup {
    fn default() -> Self {
        Self {
            stopping: StoppingModel::default(),
            compound: CompoundCorrection::default(),
            straggling: StragglingModel::default(),
            screening: ScreeningModel::default(),
            charge_fraction: ChargeFractionModel::default(),
            charge_fraction_params: ChargeFractionParams::default(),
            use_lookup_table: true,
            simulate_isotopes: true,
            show_elements: false,
            show_isotopes: false,
            show_layers: false,
            correction_factors: None,
            depth_step: DEFAULT_DEPTH_STEP,
        }
    }
}

impl CalculationSetup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stopping(&mut self, model: Option<StoppingModel>) {
        if let Some(model) = model {
            self.stopping = model;
        }
    }

    pub fn set_compound(&mut self, rule: Option<CompoundCorrection>) {
        if let Some(rule) = rule {
            self.compound = rule;
        }
    }

    pub fn set_straggling(&mut self, model: Option<StragglingModel>) {
        if let Some(model) = model {
            self.straggling = model;
        }
    }

    pub fn set_screening(&mut self, model: Option<ScreeningModel>) {
        if let Some(model) = model {
            self.screening = model;
        }
    }

    pub fn set_charge_fraction(&mut self, model: Option<ChargeFractionModel>) {
        if let Some(model) = model {
            self.charge_fraction = model;
        }
    }

    pub fn set_correction_factors(&mut self, factors: Option<&[f64]>) {
        if let Some(factors) = factors {
            self.correction_factors = Some(factors.to_vec());
        }
    }

    pub fn set_depth_step(&mut self, step: Option<f64>) {
        if let Some(step) = step.filter(|s| s.is_finite() && *s > 0.0) {
            self.depth_step = step;
        }
    }

    /// Stopping multiplier for the layer at `index` (beam order); 1 when unset.
    pub fn correction_factor(&self, index: usize) -> f64 {
        self.correction_factors
            .as_ref()
            .and_then(|f| f.get(index).copied())
            .filter(|f| f.is_finite() && *f > 0.0)
            .unwrap_or(1.0)
    }

    /// Whether any component spectra are requested.
    pub fn wants_components(&self) -> bool {
        self.show_elements || self.show_isotopes || self.show_layers
    }
}
