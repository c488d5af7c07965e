//! # Clubhouse Domain
//!
//! Data types shared by every Clubhouse layer.
//!
//! This crate contains:
//! - Membership application and report types
//! - The bulk action outcome and its partition rules
//! - Domain error type and Result alias
//! - Configuration structures and defaults
//!
//! ## Architecture
//! - Depends only on the `foundation` tier of `clubhouse-common`, for the
//!   `RawFailure` conversion
//! - No I/O, no async

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
