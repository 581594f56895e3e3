//! Public entry points: the HTTP router and its error mapping.

pub mod docs;
pub mod error;
pub mod http;

pub use http::router;
