//! Component kinds for the [`mermaid`] coupling core.
//!
//! Each module pairs a native configuration implementing [`mermaid::Model`] with a small
//! native solver implementing [`mermaid::Solver`]:
//!
//! * [`ode`]: ordinary differential equations, explicit Euler or classic Runge-Kutta.
//! * [`pde`]: one-dimensional fields advanced by the method of lines.
//! * [`agents`]: agent-based models with a seeded random number generator.
//! * [`duplicated`]: `N` replicas of any other kind, for fan-out.
#![deny(clippy::all)]

pub mod agents;
pub mod duplicated;
pub mod ode;
pub mod pde;

pub use agents::{jitter, Agent, AgentLocation, AgentModel, AgentWorld};
pub use duplicated::Duplicated;
pub use ode::{Method, OdeLocation, OdeModel};
pub use pde::{laplacian_1d, FieldLocation, FieldModel};
