//! Held-out evaluation of a fitted model.

pub mod domain;
pub mod service;

pub use domain::Metrics;
