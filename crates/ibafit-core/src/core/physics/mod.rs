//! # Physics Module
//!
//! Pure functions and small evaluators for ion-solid interaction in the backscattering
//! regime. Energies are in keV, stopping cross-sections in eV/(1e15 atoms/cm²) and areal
//! densities in 1e15 atoms/cm².
//!
//! - [`kinematics`] - Elastic kinematic factor and centre-of-mass conversions
//! - [`cross_section`] - Rutherford cross-section and electron screening corrections
//! - [`stopping`] - Electronic and nuclear stopping in pure elements
//! - [`lookup`] - Log-spaced stopping tables
//! - [`compound`] - Stopping combination rules for compounds
//! - [`straggling`] - Energy-loss straggling models and variance propagation
//! - [`charge_fraction`] - Detected charge-state fraction
//! - [`energy_loss`] - Step-wise transport of a projectile through layers
//! - [`math`] - Error function and Gaussian-broadened box integrals

pub mod charge_fraction;
pub mod compound;
pub mod cross_section;
pub mod energy_loss;
pub mod kinematics;
pub mod lookup;
pub mod math;
pub mod stopping;
pub mod straggling;
