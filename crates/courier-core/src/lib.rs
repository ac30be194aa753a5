//! # courier-core
//!
//! Core types, traits, configuration, and error handling for the Courier bot runtime.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::shellexpand;
