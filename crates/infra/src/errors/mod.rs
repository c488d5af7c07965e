//! Infrastructure error conversions

mod conversions;

pub use conversions::{status_message, InfraError};
