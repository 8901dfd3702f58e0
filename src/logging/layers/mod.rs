//! Sinks composed onto the tracing registry.

pub mod console;
pub mod file;
