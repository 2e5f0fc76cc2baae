//! Reading measured spectra and writing simulation tables.
//!
//! Instrument-specific formats are out of reach here: measured spectra are plain one- or
//! two-column tables (comma, tab, semicolon or whitespace separated).

pub mod spectrum;
