//! Fixture components and canned coupled problems for testing `mermaid`.
//!
//! [`Ramp`] is a source whose output is a known function of time, and [`Probe`] is a sink that
//! logs every value written into it and every native step it takes. The [`problems`] module
//! assembles them, together with the kinds from `mermaid-components`, into ready-made
//! [`mermaid::MermaidProblem`]s.
#![deny(unsafe_code)]
#![deny(clippy::all)]

mod fixtures;
pub mod problems;

pub use fixtures::{Probe, ProbeEvent, ProbeLocation, ProbeLog, Ramp, RampLocation};
