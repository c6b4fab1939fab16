//! Static description of the sub-models taking part in a coupled problem.
//!
//! Each component kind (ODE, PDE, agent-based, ...) supplies a [`Model`], its native
//! configuration, which instantiates a [`Solver`]. The solver is the adapter between the native
//! state representation and the [`Value`]-based coupling contract; the coordinator never sees
//! the concrete kind.

use std::fmt::Debug;

use indexmap::IndexMap;

use crate::{
    integrator::{ComponentIntegrator, Integrator},
    variable::Index,
    Connector, Error, Value,
};

/// Adapter over one component kind's native solver.
pub trait Solver: Send + 'static {
    /// Native address of a named quantity, e.g. a list of state-vector slots.
    type Location: Clone + Debug + Send + Sync + 'static;

    /// Whole-state snapshot, including the native time.
    type State: Clone + Send + 'static;

    /// Advance the native solver by exactly one of its own steps.
    fn step(&mut self) -> Result<(), Error>;

    /// The native time coordinate.
    fn time(&self) -> f64;

    /// Set the native time coordinate. Callers are expected to follow up with
    /// [`Solver::mark_modified`].
    fn set_time(&mut self, time: f64);

    /// Signal that the state was changed from outside, so any cached derived quantities must be
    /// recomputed before the next step.
    fn mark_modified(&mut self);

    /// Read the value at `location`, optionally narrowed by `index`.
    fn read(&self, location: &Self::Location, index: Option<&Index>) -> Result<Value, Error>;

    /// Write `value` at `location`, optionally narrowed by `index`.
    fn write(
        &mut self,
        location: &Self::Location,
        index: Option<&Index>,
        value: &Value,
    ) -> Result<(), Error>;

    fn state(&self) -> Self::State;

    fn set_state(&mut self, state: Self::State);
}

/// Native configuration of a component kind.
pub trait Model: Send + Sync + 'static {
    type Solver: Solver;

    /// Build a fresh solver instance that advances by `time_step` per native step.
    fn instantiate(&self, time_step: f64) -> Result<Self::Solver, Error>;
}

/// Type alias for the native location type of a model's solver.
pub type LocationOf<M> = <<M as Model>::Solver as Solver>::Location;

/// One sub-model of a coupled problem.
pub struct Component<M: Model> {
    name: String,
    model: M,
    state_names: IndexMap<String, LocationOf<M>>,
    time_step: f64,
}

impl<M: Model> Component<M> {
    pub fn new(name: impl Into<String>, model: M, time_step: f64) -> Self {
        Self {
            name: name.into(),
            model,
            state_names: IndexMap::new(),
            time_step,
        }
    }

    /// Expose a native location under a human-readable variable name.
    pub fn with_state(mut self, name: impl Into<String>, location: LocationOf<M>) -> Self {
        self.state_names.insert(name.into(), location);
        self
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn state_names(&self) -> &IndexMap<String, LocationOf<M>> {
        &self.state_names
    }
}

/// Type-erased view of a [`Component`], as held by a problem.
pub trait AnyComponent: Send + Sync {
    fn name(&self) -> &str;

    /// The largest interval the native solver advances by in one call.
    fn time_step(&self) -> f64;

    /// Whether `variable` is one of this component's state names.
    fn has_state(&self, variable: &str) -> bool;

    /// Build the runtime integrator, wiring its mailboxes from `connectors`.
    fn initialize(&self, connectors: &[Connector]) -> Result<Box<dyn ComponentIntegrator>, Error>;
}

impl<M: Model> AnyComponent for Component<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn time_step(&self) -> f64 {
        self.time_step
    }

    fn has_state(&self, variable: &str) -> bool {
        self.state_names.contains_key(variable)
    }

    fn initialize(&self, connectors: &[Connector]) -> Result<Box<dyn ComponentIntegrator>, Error> {
        let solver = self.model.instantiate(self.time_step)?;
        let integrator = Integrator::new(
            self.name.clone(),
            solver,
            self.state_names.clone(),
            self.time_step,
            connectors,
        )?;
        Ok(Box::new(integrator))
    }
}

impl<M: Model> From<Component<M>> for Box<dyn AnyComponent> {
    fn from(component: Component<M>) -> Self {
        Box::new(component)
    }
}
