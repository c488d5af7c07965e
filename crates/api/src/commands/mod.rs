//! Command handlers - presentation layer to backend bridge
//!
//! Each handler takes the [`AppContext`](crate::AppContext) and returns a
//! serialisable value the presentation layer renders as-is.

mod applications;
mod reports;
mod status;

pub use applications::*;
pub use reports::*;
pub use status::*;
