//! # ibafit Core Library
//!
//! Forward simulation of Rutherford backscattering spectra from layered targets, and
//! recovery of target composition, thickness and detector calibration from a measured
//! spectrum by differential evolution.
//!
//! ## Architecture
//!
//! - **[`core`]: The Foundation.** Plain data models (`Target`, setups, spectra), the
//!   stopping and kinematics physics, the spectrum simulator and counts-file I/O. Nothing
//!   here holds state between calls.
//!
//! - **[`engine`]: The Optimizer.** Gene encoding of a fit's free parameters, the
//!   differential-evolution loop, and a background worker with cooperative cancellation
//!   and progress events.
//!
//! - **[`workflows`]: The Public API.** Single-spectrum fits and batch runs that tie the
//!   simulator and optimizer together.

pub mod core;
pub mod engine;
pub mod workflows;
