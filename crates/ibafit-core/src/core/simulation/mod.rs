//! # Simulation Module
//!
//! Forward model of a backscattering spectrum. [`spectrum::simulate`] slices every layer in
//! depth, follows the projectile in and the scattered particle out through the stack, and
//! deposits a Gaussian-broadened box per slice and nuclide into the channel spectrum.
//! [`fitness::fitness`] scores a simulated spectrum against a measured one, and
//! [`analysis`] offers stopping curves, depth profiles and synthetic noisy spectra built on
//! the same machinery.

pub mod analysis;
pub mod fitness;
pub mod spectrum;

pub use spectrum::{SimulationRequest, prepare_engine, simulate, simulate_with};

#[cfg(test)]
pub(crate) mod fixtures {
    use super::SimulationRequest;
    use crate::core::models::bounds::Bounds;
    use crate::core::models::calculation::CalculationSetup;
    use crate::core::models::setup::{Calibration, DetectorSetup, ExperimentalSetup};
    use crate::core::models::spectrum::ChannelWindow;
    use crate::core::models::target::{Layer, LayerElement, Target};

    /// 5000 TFU of carbon under 2 MeV He at 160°, 1 keV/channel.
    pub(crate) fn carbon_request() -> SimulationRequest {
        let mut target = Target::new();
        target.push_layer(
            Layer::new(5000.0)
                .with_thickness_bounds(Bounds::new(2000.0, 8000.0))
                .with_element(LayerElement::from_symbol("C", 1.0).unwrap()),
        );
        SimulationRequest {
            experiment: ExperimentalSetup {
                charge: 10.0,
                charge_bounds: Bounds::fixed(10.0),
                ..Default::default()
            },
            detector: DetectorSetup {
                resolution: 15.0,
                calibration: Calibration::new(1.0, 0.0),
                ..Default::default()
            },
            target,
            foil: None,
            calculation: CalculationSetup::default(),
            channels: 2048,
            window: ChannelWindow::new(0, 1000),
        }
    }
}
