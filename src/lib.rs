//! The `mermaid` crate couples independently-steppable simulation components (ODE models,
//! discretized PDE models, agent-based models, ...) into one co-simulation.
//!
//! Each component keeps its own native solver and time step. The coordinator advances them
//! together on a global tick, moves values between them through [`Connector`]s at every tick,
//! and records a time history of selected variables.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mermaid::{Connector, MermaidProblem, SolveOptions};
//!
//! let problem = MermaidProblem::new(10.0)
//!     .with_component(tank)
//!     .with_component(pump)
//!     .with_connector(Connector::from_names(["tank.level"], ["pump.setpoint"])?);
//!
//! let solution = mermaid::solve(&problem, SolveOptions::default())?;
//! println!("{:?}", solution.get_by_name("tank.level")?);
//! ```
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
#![deny(clippy::all)]

pub mod component;
pub mod connector;
pub mod integrator;
pub mod problem;
pub mod sim;
pub mod slots;
pub mod value;
pub mod variable;

#[cfg(test)]
pub(crate) mod test_util;

// Re-exports
pub use component::{AnyComponent, Component, Model, Solver};
pub use connector::{Connector, Transform};
pub use integrator::{Checkpoint, ComponentIntegrator};
pub use problem::MermaidProblem;
pub use sim::{solve, LookupPolicy, MermaidIntegrator, MermaidSolution, SolveOptions, Stepping};
pub use value::Value;
pub use variable::{ConnectedVariable, Index, ParseError};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Unknown component `{0}`")]
    UnknownComponent(String),

    #[error("Duplicate component name `{0}`")]
    DuplicateComponent(String),

    #[error("Variable `{variable}` not found in component `{component}`")]
    UnknownVariable { component: String, variable: String },

    /// A connector source that its component never populated in `outputs`.
    #[error("No output value available for `{0}`")]
    MissingOutput(ConnectedVariable),

    #[error("Variable `{0}` is not recorded")]
    NotRecorded(ConnectedVariable),

    #[error("Index {index} out of range for length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Index selects no slots")]
    EmptySelection,

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Length mismatch: expected {expected} values, found {found}")]
    LengthMismatch { expected: usize, found: usize },

    #[error("Transform expects {expected} values, found {found}")]
    Arity { expected: usize, found: usize },

    #[error("Transform of connector {connector} failed")]
    Transform {
        connector: usize,
        #[source]
        source: Box<Error>,
    },

    /// A named entry, such as an agent property, that the native state does not hold.
    #[error("No native entry named `{0}`")]
    MissingEntry(String),

    #[error("`{0}` is read-only")]
    ReadOnly(String),

    #[error("Invalid time step {time_step} for component `{component}`")]
    InvalidTimeStep { component: String, time_step: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The native solver of a component failed to advance, e.g. diverged.
    #[error("Solver failure: {0}")]
    SolverFailure(String),

    #[error("Component `{component}` made no progress at t = {time}")]
    Stalled { component: String, time: f64 },

    #[error("Checkpoint of `{found}` cannot be restored into `{component}`")]
    Checkpoint { component: String, found: String },

    #[error("Simulation already finished at t = {0}")]
    Finished(f64),

    #[cfg(feature = "arrow")]
    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),
}
