//! Report exports

pub mod ports;
mod service;

pub use service::ReportService;
