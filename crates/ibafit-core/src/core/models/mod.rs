//! # Core Models Module
//!
//! Plain data describing one backscattering experiment: the element table, the layered
//! target, beam and detector setups, the calculation switches and the spectra exchanged
//! with the simulator.
//!
//! - [`element`] - Static element and natural isotope data
//! - [`bounds`] - Inclusive optimization ranges
//! - [`target`] - Layer arena and element composition
//! - [`setup`] - Beam geometry, charge and detector calibration
//! - [`calculation`] - Stopping, straggling, screening and charge-fraction model selection
//! - [`spectrum`] - Measured and simulated spectra, channel windows
//!
//! All types are values: cloning a [`target::Target`] or a setup yields an independent copy,
//! so candidate configurations never share mutable state.

pub mod bounds;
pub mod calculation;
pub mod element;
pub mod setup;
pub mod spectrum;
pub mod target;
