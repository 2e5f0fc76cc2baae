//! # Engine Module
//!
//! The differential-evolution fitter. A [`problem::FitProblem`] turns the simulator into a
//! fitness oracle for one measured spectrum, [`genes::GeneSpace`] maps bounded parameters
//! to flat gene vectors and back, and [`evolution::evolve`] searches that space with
//! DE/rand/1/bin.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - `DeParameter` and its builder
//! - **Encoding** ([`genes`]) - gene layout, sampling, clamping, decoding into an `Individual`
//! - **Search** ([`evolution`]) - the generational loop, seeded and optionally parallel
//! - **Execution** ([`worker`], [`cancel`]) - background thread with cooperative cancellation
//! - **Observation** ([`progress`], [`state`]) - progress events and the run lifecycle
//! - **Error Handling** ([`error`])

pub mod cancel;
pub mod config;
pub mod error;
pub mod evolution;
pub mod genes;
pub mod problem;
pub mod progress;
pub mod state;
pub mod worker;
