//! Driftloop - an iterative text→image→text creative feedback loop
//!
//! A short prompt is expanded into a detailed scene description, an image is
//! synthesized from it, and the image is captioned back into a new prompt,
//! which seeds the next iteration — each cycle drifting a little further
//! from where it started.

pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod provider;
pub mod store;

pub use error::{DriftloopError, Result};
