//! Replicas of another component kind, stepped in lockstep.
//!
//! Reading a variable from a duplicated component yields one value per replica. An index on
//! the variable selects replicas rather than native slots: `Single(i)` reads replica `i` alone,
//! `Range(a..=b)` reads a `List` of the selected replicas.
//!
//! Writing a `List` with one entry per selected replica writes each entry to its replica. Any
//! other value is broadcast to every selected replica.

use mermaid::{Error, Index, Model, Solver, Value};

pub struct Duplicated<M: Model> {
    models: Vec<M>,
}

impl<M: Model> Duplicated<M> {
    /// One replica per model, in order.
    pub fn new(models: Vec<M>) -> Self {
        Self { models }
    }

    /// `n` identical replicas of `model`.
    pub fn replicate(model: M, n: usize) -> Self
    where
        M: Clone,
    {
        Self {
            models: vec![model; n],
        }
    }
}

pub struct DuplicatedSolver<S: Solver> {
    replicas: Vec<S>,
}

impl<M: Model> Model for Duplicated<M> {
    type Solver = DuplicatedSolver<M::Solver>;

    fn instantiate(&self, time_step: f64) -> Result<Self::Solver, Error> {
        if self.models.is_empty() {
            return Err(Error::InvalidConfig(
                "a duplicated component needs at least one replica".to_owned(),
            ));
        }
        let replicas = self
            .models
            .iter()
            .map(|model| model.instantiate(time_step))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DuplicatedSolver { replicas })
    }
}

impl<S: Solver> DuplicatedSolver<S> {
    pub fn replicas(&self) -> &[S] {
        &self.replicas
    }

    fn select(&self, index: Option<&Index>) -> Result<Vec<usize>, Error> {
        let len = self.replicas.len();
        match index {
            None => Ok((0..len).collect()),
            Some(index) => index
                .positions()
                .map(|i| {
                    if i < len {
                        Ok(i)
                    } else {
                        Err(Error::IndexOutOfRange { index: i, len })
                    }
                })
                .collect(),
        }
    }
}

impl<S: Solver> Solver for DuplicatedSolver<S> {
    type Location = S::Location;
    type State = Vec<S::State>;

    fn step(&mut self) -> Result<(), Error> {
        self.replicas.iter_mut().try_for_each(S::step)
    }

    /// Time of the first replica. All replicas share one time.
    fn time(&self) -> f64 {
        self.replicas[0].time()
    }

    fn set_time(&mut self, time: f64) {
        for replica in &mut self.replicas {
            replica.set_time(time);
        }
    }

    fn mark_modified(&mut self) {
        for replica in &mut self.replicas {
            replica.mark_modified();
        }
    }

    fn read(&self, location: &S::Location, index: Option<&Index>) -> Result<Value, Error> {
        if let Some(Index::Single(i)) = index {
            let replica = self.replicas.get(*i).ok_or(Error::IndexOutOfRange {
                index: *i,
                len: self.replicas.len(),
            })?;
            return replica.read(location, None);
        }
        self.select(index)?
            .into_iter()
            .map(|i| self.replicas[i].read(location, None))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List)
    }

    fn write(
        &mut self,
        location: &S::Location,
        index: Option<&Index>,
        value: &Value,
    ) -> Result<(), Error> {
        let selected = self.select(index)?;
        if selected.is_empty() {
            return Err(Error::EmptySelection);
        }
        match value {
            Value::List(values) if values.len() == selected.len() => {
                for (i, value) in selected.into_iter().zip(values) {
                    self.replicas[i].write(location, None, value)?;
                }
            }
            value => {
                for i in selected {
                    self.replicas[i].write(location, None, value)?;
                }
            }
        }
        Ok(())
    }

    fn state(&self) -> Vec<S::State> {
        self.replicas.iter().map(S::state).collect()
    }

    fn set_state(&mut self, state: Vec<S::State>) {
        debug_assert_eq!(
            state.len(),
            self.replicas.len(),
            "state does not match the number of replicas"
        );
        for (replica, state) in self.replicas.iter_mut().zip(state) {
            replica.set_state(state);
        }
    }
}
