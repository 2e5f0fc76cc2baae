//! # Workflows Module
//!
//! Top-level entry points of the library. A workflow takes a [`Baseline`] configuration and
//! measured data, drives the engine through its phases with progress reporting, and returns
//! a self-contained result.
//!
//! - **Single Fit** ([`fit`]) - one measured spectrum, ending in a full-resolution simulation
//!   of the best candidate.
//! - **Batch** ([`batch`]) - sequential fits over a [`batch::SpectrumSource`] with per-entry
//!   reports, skipping spectra that cannot be read.
//!
//! [`Baseline`]: crate::engine::problem::Baseline

pub mod batch;
pub mod fit;
