//! Runtime instances of components.
//!
//! A [`ComponentIntegrator`] owns a live native solver together with two mailboxes: `inputs`,
//! values pushed by connectors and written into the solver before its next advance, and
//! `outputs`, the last values read back from the solver for every variable some connector
//! reads from.

use std::any::Any;

use indexmap::IndexMap;
use itertools::Itertools;

use crate::{component::Solver, Connector, ConnectedVariable, Error, Value};

/// Pending values to push into a component before its next advance. Entries that no connector
/// has fed yet hold `None`.
pub type Inputs = IndexMap<ConnectedVariable, Option<Value>>;

/// Values last read back from a component.
pub type Outputs = IndexMap<ConnectedVariable, Value>;

/// A type-erased whole-state snapshot of one component integrator.
pub struct Checkpoint {
    component: String,
    time: f64,
    state: Box<dyn Any + Send>,
}

impl Checkpoint {
    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn time(&self) -> f64 {
        self.time
    }
}

impl std::fmt::Debug for Checkpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checkpoint")
            .field("component", &self.component)
            .field("time", &self.time)
            .finish_non_exhaustive()
    }
}

/// The steppable contract every component kind supports, independent of its native state.
pub trait ComponentIntegrator: Send {
    /// Name of the component this integrator was built from.
    fn name(&self) -> &str;

    /// The native step taken by each call to [`ComponentIntegrator::advance`].
    fn time_step(&self) -> f64;

    fn inputs(&self) -> &Inputs;

    fn inputs_mut(&mut self) -> &mut Inputs;

    fn outputs(&self) -> &Outputs;

    /// Push every pending input into the native state, mark the state as externally modified,
    /// and advance the native solver by exactly one native step.
    ///
    /// `dt` is the coordinator's global tick. It does not change the size of the native step.
    fn advance(&mut self, dt: f64) -> Result<(), Error>;

    /// Re-read every declared output key from the native state.
    fn refresh_outputs(&mut self) -> Result<(), Error>;

    fn read_state(&self, key: &ConnectedVariable) -> Result<Value, Error>;

    fn write_state(&mut self, key: &ConnectedVariable, value: &Value) -> Result<(), Error>;

    fn read_time(&self) -> f64;

    /// Set the native time. This also marks the state as externally modified.
    fn write_time(&mut self, time: f64);

    /// Snapshot the whole native state.
    fn checkpoint(&self) -> Checkpoint;

    /// Restore a snapshot taken by [`ComponentIntegrator::checkpoint`] on this same component.
    fn restore(&mut self, checkpoint: Checkpoint) -> Result<(), Error>;

    /// Number of native steps taken so far.
    fn num_steps(&self) -> usize;
}

/// The generic [`ComponentIntegrator`] over any [`Solver`].
pub struct Integrator<S: Solver> {
    name: String,
    solver: S,
    state_names: IndexMap<String, S::Location>,
    time_step: f64,
    inputs: Inputs,
    outputs: Outputs,
    num_steps: usize,
}

impl<S: Solver> Integrator<S> {
    /// Wrap `solver`, declaring as inputs every connector destination owned by `name` and as
    /// outputs every connector source owned by `name`. Outputs are populated immediately from
    /// the initial native state.
    pub fn new(
        name: String,
        solver: S,
        state_names: IndexMap<String, S::Location>,
        time_step: f64,
        connectors: &[Connector],
    ) -> Result<Self, Error> {
        let inputs: Inputs = connectors
            .iter()
            .flat_map(Connector::outputs)
            .filter(|var| var.is_owned_by(&name))
            .unique()
            .map(|var| (var.clone(), None))
            .collect();

        let output_keys = connectors
            .iter()
            .flat_map(Connector::inputs)
            .filter(|var| var.is_owned_by(&name))
            .unique()
            .cloned()
            .collect::<Vec<_>>();

        let mut integrator = Self {
            name,
            solver,
            state_names,
            time_step,
            inputs,
            outputs: IndexMap::with_capacity(output_keys.len()),
            num_steps: 0,
        };

        for key in output_keys {
            let value = integrator.read_state(&key)?;
            integrator.outputs.insert(key, value);
        }

        log::debug!(
            "Initialized component `{}` with inputs [{}] and outputs [{}]",
            integrator.name,
            integrator.inputs.keys().join(", "),
            integrator.outputs.keys().join(", ")
        );

        Ok(integrator)
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    fn location(&self, key: &ConnectedVariable) -> Result<&S::Location, Error> {
        self.state_names
            .get(key.variable())
            .ok_or_else(|| Error::UnknownVariable {
                component: self.name.clone(),
                variable: key.variable().to_owned(),
            })
    }

    fn push_inputs(&mut self) -> Result<(), Error> {
        for (key, value) in &self.inputs {
            let Some(value) = value else { continue };
            let location = self
                .state_names
                .get(key.variable())
                .ok_or_else(|| Error::UnknownVariable {
                    component: self.name.clone(),
                    variable: key.variable().to_owned(),
                })?;
            log::trace!("Pushing {key} = {value}");
            self.solver.write(location, key.index(), value)?;
        }
        Ok(())
    }
}

impl<S: Solver> ComponentIntegrator for Integrator<S> {
    fn name(&self) -> &str {
        &self.name
    }

    fn time_step(&self) -> f64 {
        self.time_step
    }

    fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    fn inputs_mut(&mut self) -> &mut Inputs {
        &mut self.inputs
    }

    fn outputs(&self) -> &Outputs {
        &self.outputs
    }

    fn advance(&mut self, dt: f64) -> Result<(), Error> {
        self.push_inputs()?;
        self.solver.mark_modified();

        log::trace!(
            "Advancing `{}` from t = {} by its native step {} (global tick {dt})",
            self.name,
            self.solver.time(),
            self.time_step
        );

        self.solver.step().inspect_err(|err| {
            log::error!(
                "Component `{}` failed at t = {}: {err}",
                self.name,
                self.solver.time()
            );
        })?;
        self.num_steps += 1;

        Ok(())
    }

    fn refresh_outputs(&mut self) -> Result<(), Error> {
        for (key, slot) in self.outputs.iter_mut() {
            let location = self
                .state_names
                .get(key.variable())
                .ok_or_else(|| Error::UnknownVariable {
                    component: self.name.clone(),
                    variable: key.variable().to_owned(),
                })?;
            *slot = self.solver.read(location, key.index())?;
        }
        Ok(())
    }

    fn read_state(&self, key: &ConnectedVariable) -> Result<Value, Error> {
        self.solver.read(self.location(key)?, key.index())
    }

    fn write_state(&mut self, key: &ConnectedVariable, value: &Value) -> Result<(), Error> {
        let location = self.location(key)?.clone();
        self.solver.write(&location, key.index(), value)
    }

    fn read_time(&self) -> f64 {
        self.solver.time()
    }

    fn write_time(&mut self, time: f64) {
        self.solver.set_time(time);
        self.solver.mark_modified();
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            component: self.name.clone(),
            time: self.solver.time(),
            state: Box::new(self.solver.state()),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) -> Result<(), Error> {
        if checkpoint.component != self.name {
            return Err(Error::Checkpoint {
                component: self.name.clone(),
                found: checkpoint.component,
            });
        }
        let state = checkpoint
            .state
            .downcast::<S::State>()
            .map_err(|_| Error::Checkpoint {
                component: self.name.clone(),
                found: checkpoint.component.clone(),
            })?;
        self.solver.set_state(*state);
        self.solver.mark_modified();
        self.refresh_outputs()
    }

    fn num_steps(&self) -> usize {
        self.num_steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_util::linear, AnyComponent};

    fn connectors() -> Vec<Connector> {
        vec![
            Connector::from_names(["a.x"], ["b.rate"]).unwrap(),
            Connector::from_names(["b.x", "a.x"], ["a.rate", "c.x"]).unwrap(),
        ]
    }

    #[test]
    fn test_mailboxes_from_connectors() {
        let connectors = connectors();
        let a = linear("a", 1.0, 0.0, 1.0).initialize(&connectors).unwrap();

        // `a.x` appears twice as a source, but is only declared once
        assert_eq!(
            a.outputs().keys().map(|k| k.literal()).collect::<Vec<_>>(),
            ["a.x"]
        );
        assert_eq!(a.outputs()[0], Value::Real(1.0));
        assert_eq!(
            a.inputs().keys().map(|k| k.literal()).collect::<Vec<_>>(),
            ["a.rate"]
        );
        assert_eq!(a.inputs()[0], None);

        let c = linear("c", 0.0, 0.0, 1.0).initialize(&connectors).unwrap();
        assert!(c.outputs().is_empty());
        assert_eq!(c.inputs().len(), 1);
    }

    #[test]
    fn test_advance_pushes_inputs_then_steps() {
        let connectors = connectors();
        let mut b = linear("b", 0.0, 0.0, 0.5).initialize(&connectors).unwrap();

        // Nothing pushed yet: the rate stays at zero
        b.advance(0.5).unwrap();
        assert_eq!(b.read_time(), 0.5);
        assert_eq!(b.read_state(&"b.x".parse().unwrap()).unwrap(), Value::Real(0.0));

        b.inputs_mut()
            .insert("b.rate".parse().unwrap(), Some(Value::Real(4.0)));
        b.advance(0.5).unwrap();
        assert_eq!(b.read_state(&"b.x".parse().unwrap()).unwrap(), Value::Real(2.0));
        assert_eq!(b.num_steps(), 2);

        // Outputs are only refreshed on request
        assert_eq!(b.outputs()[0], Value::Real(0.0));
        b.refresh_outputs().unwrap();
        assert_eq!(b.outputs()[0], Value::Real(2.0));
    }

    #[test]
    fn test_unknown_variable() {
        let connectors = vec![Connector::from_names(["a.missing"], ["b.x"]).unwrap()];
        let result = linear("a", 0.0, 0.0, 1.0).initialize(&connectors);
        assert!(matches!(
            result,
            Err(Error::UnknownVariable { component, variable })
                if component == "a" && variable == "missing"
        ));
    }

    #[test]
    fn test_indexed_write_state() {
        let mut a = linear("a", 0.0, 0.0, 1.0).initialize(&[]).unwrap();
        let key = ConnectedVariable::parse("a.x[0]").unwrap();
        a.write_state(&key, &Value::Real(3.0)).unwrap();
        assert_eq!(a.read_state(&key).unwrap(), Value::Real(3.0));

        let key = ConnectedVariable::parse("a.x[1]").unwrap();
        assert!(matches!(
            a.write_state(&key, &Value::Real(3.0)),
            Err(Error::IndexOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_checkpoint_restore() {
        let connectors = vec![Connector::from_names(["a.x"], ["b.x"]).unwrap()];
        let mut a = linear("a", 1.0, 2.0, 1.0).initialize(&connectors).unwrap();
        let checkpoint = a.checkpoint();
        assert_eq!(checkpoint.component(), "a");
        assert_eq!(checkpoint.time(), 0.0);

        a.advance(1.0).unwrap();
        a.advance(1.0).unwrap();
        a.refresh_outputs().unwrap();
        assert_eq!(a.outputs()[0], Value::Real(5.0));

        a.restore(checkpoint).unwrap();
        assert_eq!(a.read_time(), 0.0);
        assert_eq!(a.outputs()[0], Value::Real(1.0));

        let b = linear("b", 0.0, 0.0, 1.0).initialize(&connectors).unwrap();
        assert!(matches!(
            a.restore(b.checkpoint()),
            Err(Error::Checkpoint { .. })
        ));
    }

    #[test]
    fn test_write_time() {
        let mut a = linear("a", 0.0, 1.0, 0.25).initialize(&[]).unwrap();
        a.write_time(3.0);
        assert_eq!(a.read_time(), 3.0);
        a.advance(0.25).unwrap();
        assert_eq!(a.read_time(), 3.25);
    }
}
