//! propval: trains a random-forest house price model offline and serves it over HTTP.
pub mod api;
pub mod common;
pub mod data;
pub mod evaluation;
pub mod inference;
#[doc(hidden)]
pub mod testing;
pub mod training;

pub use common::{PropvalError, PropvalResult};
