//! Connectivity signals from the remote API

pub mod probe;

pub use probe::{ConnectivityProbe, HealthCheck};
