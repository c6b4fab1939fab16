use std::sync::{Arc, Mutex, PoisonError};

use mermaid::{slots, Component, Error, Index, Model, Solver, Value};

/// A source with output `offset + slope * t`, where `t` is its native time.
#[derive(Debug, Clone, Copy)]
pub struct Ramp {
    pub offset: f64,
    pub slope: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampLocation {
    /// The ramp output. Read-only.
    Output,
    Slope,
}

pub struct RampSolver {
    t: f64,
    time_step: f64,
    offset: f64,
    slope: f64,
}

impl Ramp {
    /// A component exposing `out` and `slope`.
    pub fn component(name: &str, offset: f64, slope: f64, time_step: f64) -> Component<Ramp> {
        Component::new(name, Ramp { offset, slope }, time_step)
            .with_state("out", RampLocation::Output)
            .with_state("slope", RampLocation::Slope)
    }
}

impl Model for Ramp {
    type Solver = RampSolver;

    fn instantiate(&self, time_step: f64) -> Result<RampSolver, Error> {
        Ok(RampSolver {
            t: 0.0,
            time_step,
            offset: self.offset,
            slope: self.slope,
        })
    }
}

impl Solver for RampSolver {
    type Location = RampLocation;
    type State = (f64, f64);

    fn step(&mut self) -> Result<(), Error> {
        self.t += self.time_step;
        Ok(())
    }

    fn time(&self) -> f64 {
        self.t
    }

    fn set_time(&mut self, time: f64) {
        self.t = time;
    }

    fn mark_modified(&mut self) {}

    fn read(&self, location: &RampLocation, index: Option<&Index>) -> Result<Value, Error> {
        let value = match location {
            RampLocation::Output => self.offset + self.slope * self.t,
            RampLocation::Slope => self.slope,
        };
        slots::read(&[value], &[0], index)
    }

    fn write(
        &mut self,
        location: &RampLocation,
        index: Option<&Index>,
        value: &Value,
    ) -> Result<(), Error> {
        match location {
            RampLocation::Output => Err(Error::ReadOnly("ramp output".to_owned())),
            RampLocation::Slope => {
                let mut data = [self.slope];
                slots::write(&mut data, &[0], index, value)?;
                self.slope = data[0];
                Ok(())
            }
        }
    }

    fn state(&self) -> (f64, f64) {
        (self.t, self.slope)
    }

    fn set_state(&mut self, (t, slope): (f64, f64)) {
        self.t = t;
        self.slope = slope;
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProbeEvent {
    Write {
        time: f64,
        index: Option<Index>,
        value: Value,
    },
    Advance {
        from: f64,
        to: f64,
    },
}

/// Shared handle on the events recorded by every instance of a [`Probe`].
#[derive(Debug, Clone, Default)]
pub struct ProbeLog(Arc<Mutex<Vec<ProbeEvent>>>);

impl ProbeLog {
    fn push(&self, event: ProbeEvent) {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn events(&self) -> Vec<ProbeEvent> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// `(time, value)` of every write, in order.
    pub fn writes(&self) -> Vec<(f64, Value)> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ProbeEvent::Write { time, value, .. } => Some((time, value)),
                ProbeEvent::Advance { .. } => None,
            })
            .collect()
    }

    /// Number of native steps taken.
    pub fn advances(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| matches!(event, ProbeEvent::Advance { .. }))
            .count()
    }
}

/// A sink that holds the last value written into it.
#[derive(Debug, Clone)]
pub struct Probe {
    initial: Value,
    log: ProbeLog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeLocation {
    /// The last value written, or the initial value.
    Last,
    /// Number of writes so far, as an `Integer`. Read-only.
    Writes,
}

pub struct ProbeSolver {
    t: f64,
    time_step: f64,
    last: Value,
    writes: usize,
    log: ProbeLog,
}

impl Probe {
    pub fn new(initial: impl Into<Value>) -> Self {
        Self {
            initial: initial.into(),
            log: ProbeLog::default(),
        }
    }

    pub fn log(&self) -> ProbeLog {
        self.log.clone()
    }

    /// A component exposing `in` and `writes`, together with its log.
    pub fn component(
        name: &str,
        initial: impl Into<Value>,
        time_step: f64,
    ) -> (Component<Probe>, ProbeLog) {
        let probe = Probe::new(initial);
        let log = probe.log();
        let component = Component::new(name, probe, time_step)
            .with_state("in", ProbeLocation::Last)
            .with_state("writes", ProbeLocation::Writes);
        (component, log)
    }
}

impl Model for Probe {
    type Solver = ProbeSolver;

    fn instantiate(&self, time_step: f64) -> Result<ProbeSolver, Error> {
        Ok(ProbeSolver {
            t: 0.0,
            time_step,
            last: self.initial.clone(),
            writes: 0,
            log: self.log.clone(),
        })
    }
}

impl Solver for ProbeSolver {
    type Location = ProbeLocation;
    type State = (f64, Value, usize);

    fn step(&mut self) -> Result<(), Error> {
        let from = self.t;
        self.t += self.time_step;
        self.log.push(ProbeEvent::Advance { from, to: self.t });
        Ok(())
    }

    fn time(&self) -> f64 {
        self.t
    }

    fn set_time(&mut self, time: f64) {
        self.t = time;
    }

    fn mark_modified(&mut self) {}

    fn read(&self, location: &ProbeLocation, _index: Option<&Index>) -> Result<Value, Error> {
        Ok(match location {
            ProbeLocation::Last => self.last.clone(),
            ProbeLocation::Writes => Value::Integer(self.writes as i64),
        })
    }

    fn write(
        &mut self,
        location: &ProbeLocation,
        index: Option<&Index>,
        value: &Value,
    ) -> Result<(), Error> {
        match location {
            ProbeLocation::Last => {
                log::trace!("Probe received {value} at t = {}", self.t);
                self.last = value.clone();
                self.writes += 1;
                self.log.push(ProbeEvent::Write {
                    time: self.t,
                    index: index.cloned(),
                    value: value.clone(),
                });
                Ok(())
            }
            ProbeLocation::Writes => Err(Error::ReadOnly("probe write count".to_owned())),
        }
    }

    fn state(&self) -> Self::State {
        (self.t, self.last.clone(), self.writes)
    }

    fn set_state(&mut self, (t, last, writes): Self::State) {
        self.t = t;
        self.last = last;
        self.writes = writes;
    }
}
