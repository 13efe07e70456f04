//! Tracing primitives shared by the binaries of the workspace.
pub mod tracing;

pub use crate::tracing::{TelemetryOptions, Tracing};
