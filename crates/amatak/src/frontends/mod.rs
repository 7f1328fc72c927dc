//! Frontends for the Amatak runtime
//!
//! This module contains implementations of the `Frontend` trait.

pub mod standard;

pub use standard::StandardFrontend;
