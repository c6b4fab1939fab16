//! A minimal component kind for unit tests: a scalar `x` growing at a constant `rate`.

use crate::{slots, Component, Error, Index, Model, Solver, Value};

pub struct Linear {
    pub x0: f64,
    pub rate: f64,
}

pub struct LinearSolver {
    time: f64,
    time_step: f64,
    /// `[x, rate]`
    data: [f64; 2],
    pub modified: usize,
}

impl Model for Linear {
    type Solver = LinearSolver;

    fn instantiate(&self, time_step: f64) -> Result<LinearSolver, Error> {
        Ok(LinearSolver {
            time: 0.0,
            time_step,
            data: [self.x0, self.rate],
            modified: 0,
        })
    }
}

impl Solver for LinearSolver {
    type Location = Vec<usize>;
    type State = (f64, [f64; 2]);

    fn step(&mut self) -> Result<(), Error> {
        self.data[0] += self.data[1] * self.time_step;
        self.time += self.time_step;
        Ok(())
    }

    fn time(&self) -> f64 {
        self.time
    }

    fn set_time(&mut self, time: f64) {
        self.time = time;
    }

    fn mark_modified(&mut self) {
        self.modified += 1;
    }

    fn read(&self, location: &Vec<usize>, index: Option<&Index>) -> Result<Value, Error> {
        slots::read(&self.data, location, index)
    }

    fn write(&mut self, location: &Vec<usize>, index: Option<&Index>, value: &Value) -> Result<(), Error> {
        slots::write(&mut self.data, location, index, value)
    }

    fn state(&self) -> Self::State {
        (self.time, self.data)
    }

    fn set_state(&mut self, (time, data): Self::State) {
        self.time = time;
        self.data = data;
    }
}

/// A component exposing `x` and `rate`.
pub fn linear(name: &str, x0: f64, rate: f64, time_step: f64) -> Component<Linear> {
    Component::new(name, Linear { x0, rate }, time_step)
        .with_state("x", vec![0])
        .with_state("rate", vec![1])
}

/// A component whose `x` stays at `value`.
pub fn constant(name: &str, value: f64, time_step: f64) -> Component<Linear> {
    linear(name, value, 0.0, time_step)
}
