//! Render-failure containment
//!
//! A [`ContainmentBoundary`] wraps one presentation subtree. When rendering
//! that subtree panics or fails, the boundary classifies the failure, tags it
//! with a support-traceable error id and hands back a [`FallbackView`]
//! instead of letting the failure escape.
//!
//! Panics are caught with `catch_unwind`, so the workspace profiles keep
//! `panic = "unwind"`.

mod boundary;

pub use boundary::{
    generate_error_id, BoundaryState, ContainmentBoundary, ContainmentRecord, FallbackAction,
    FallbackView, Rendered, SupportReport,
};
