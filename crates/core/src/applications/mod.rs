//! Membership application review

pub mod ports;
mod service;

pub use service::ApplicationService;
