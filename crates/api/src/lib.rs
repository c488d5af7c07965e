//! # Clubhouse App
//!
//! Application layer - command handlers and the headless entry point.
//!
//! This crate contains:
//! - Command handlers (presentation layer → backend bridge)
//! - Application context (dependency injection)
//! - Logging bootstrap
//!
//! ## Architecture
//! - Depends on `common`, `domain`, `core`, and `infra`
//! - Wires up the hexagonal architecture in exactly one place
//!   ([`AppContext`])

pub mod commands;
pub mod context;
pub mod utils;

// Re-export for convenience
pub use commands::*;
pub use context::*;
