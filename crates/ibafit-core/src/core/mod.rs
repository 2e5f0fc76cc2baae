//! # Core Module
//!
//! The stateless foundation of the library: data models for targets, beams and detectors,
//! the physics of ion-solid interaction, the forward spectrum simulator and spectrum I/O.
//!
//! - **Models** ([`models`]) - Element table, layered targets, setups and calculation switches
//! - **Physics** ([`physics`]) - Kinematics, cross-sections, stopping, straggling and transport
//! - **Simulation** ([`simulation`]) - Channel spectra, fitness and derived analyses
//! - **File I/O** ([`io`]) - Counts tables in, simulation tables out
//!
//! Nothing in this module holds hidden state: every simulation is a pure function of its
//! request, so identical inputs always produce bit-identical spectra.

pub mod io;
pub mod models;
pub mod physics;
pub mod simulation;
