//! Ordinary differential equations `du/dt = f(u, p, t)`.

use std::sync::Arc;

use mermaid::{slots, Error, Index, Model, Solver, Value};

/// Right-hand side `f(du, u, p, t)`, writing the derivative into `du`.
pub type Rhs = Arc<dyn Fn(&mut [f64], &[f64], &[f64], f64) + Send + Sync>;

/// Explicit integration scheme.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    #[default]
    Euler,
    /// Classic fourth-order Runge-Kutta.
    Rk4,
}

/// Native configuration of an ODE component.
#[derive(Clone)]
pub struct OdeModel {
    rhs: Rhs,
    u0: Vec<f64>,
    p: Vec<f64>,
    method: Method,
}

impl OdeModel {
    pub fn new<F>(rhs: F, u0: Vec<f64>, p: Vec<f64>) -> Self
    where
        F: Fn(&mut [f64], &[f64], &[f64], f64) + Send + Sync + 'static,
    {
        Self {
            rhs: Arc::new(rhs),
            u0,
            p,
            method: Method::default(),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }
}

/// Where a coupled variable lives in an ODE component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OdeLocation {
    /// Slots of the state vector `u`.
    State(Vec<usize>),
    /// Slots of the parameter vector `p`.
    Parameter(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OdeState {
    pub t: f64,
    pub u: Vec<f64>,
    pub p: Vec<f64>,
}

pub struct OdeSolver {
    rhs: Rhs,
    method: Method,
    time_step: f64,
    t: f64,
    u: Vec<f64>,
    p: Vec<f64>,
    /// Derivative at `(u, p, t)`, valid while `du_valid` holds.
    du: Vec<f64>,
    du_valid: bool,
    evaluations: usize,
}

impl Model for OdeModel {
    type Solver = OdeSolver;

    fn instantiate(&self, time_step: f64) -> Result<OdeSolver, Error> {
        Ok(OdeSolver {
            rhs: self.rhs.clone(),
            method: self.method,
            time_step,
            t: 0.0,
            u: self.u0.clone(),
            p: self.p.clone(),
            du: vec![0.0; self.u0.len()],
            du_valid: false,
            evaluations: 0,
        })
    }
}

/// `out = u + scale * k`
fn offset(out: &mut [f64], u: &[f64], k: &[f64], scale: f64) {
    for ((out, u), k) in out.iter_mut().zip(u).zip(k) {
        *out = u + scale * k;
    }
}

impl OdeSolver {
    pub fn u(&self) -> &[f64] {
        &self.u
    }

    pub fn p(&self) -> &[f64] {
        &self.p
    }

    /// Number of right-hand side evaluations so far.
    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    fn eval(&mut self, du: &mut [f64], u: &[f64], t: f64) {
        (self.rhs)(du, u, &self.p, t);
        self.evaluations += 1;
    }

    fn refresh_derivative(&mut self) {
        let mut du = std::mem::take(&mut self.du);
        let u = std::mem::take(&mut self.u);
        self.eval(&mut du, &u, self.t);
        self.du = du;
        self.u = u;
        self.du_valid = true;
    }

    fn rk4(&mut self, h: f64) {
        let n = self.u.len();
        let (mut k2, mut k3, mut k4) = (vec![0.0; n], vec![0.0; n], vec![0.0; n]);
        let mut tmp = vec![0.0; n];
        let u = self.u.clone();
        let k1 = self.du.clone();

        offset(&mut tmp, &u, &k1, 0.5 * h);
        self.eval(&mut k2, &tmp, self.t + 0.5 * h);
        offset(&mut tmp, &u, &k2, 0.5 * h);
        self.eval(&mut k3, &tmp, self.t + 0.5 * h);
        offset(&mut tmp, &u, &k3, h);
        self.eval(&mut k4, &tmp, self.t + h);

        for i in 0..n {
            self.u[i] += h / 6.0 * (k1[i] + 2.0 * k2[i] + 2.0 * k3[i] + k4[i]);
        }
    }
}

impl Solver for OdeSolver {
    type Location = OdeLocation;
    type State = OdeState;

    fn step(&mut self) -> Result<(), Error> {
        let h = self.time_step;
        if !self.du_valid {
            self.refresh_derivative();
        }

        match self.method {
            Method::Euler => {
                for (u, du) in self.u.iter_mut().zip(&self.du) {
                    *u += h * du;
                }
            }
            Method::Rk4 => self.rk4(h),
        }
        self.t += h;

        if let Some((i, x)) = self.u.iter().enumerate().find(|(_, x)| !x.is_finite()) {
            self.du_valid = false;
            return Err(Error::SolverFailure(format!(
                "state u[{i}] = {x} at t = {}",
                self.t
            )));
        }

        self.refresh_derivative();
        Ok(())
    }

    fn time(&self) -> f64 {
        self.t
    }

    fn set_time(&mut self, time: f64) {
        self.t = time;
    }

    fn mark_modified(&mut self) {
        self.du_valid = false;
    }

    fn read(&self, location: &OdeLocation, index: Option<&Index>) -> Result<Value, Error> {
        match location {
            OdeLocation::State(slots) => slots::read(&self.u, slots, index),
            OdeLocation::Parameter(slots) => slots::read(&self.p, slots, index),
        }
    }

    fn write(
        &mut self,
        location: &OdeLocation,
        index: Option<&Index>,
        value: &Value,
    ) -> Result<(), Error> {
        match location {
            OdeLocation::State(slots) => slots::write(&mut self.u, slots, index, value),
            OdeLocation::Parameter(slots) => slots::write(&mut self.p, slots, index, value),
        }
    }

    fn state(&self) -> OdeState {
        OdeState {
            t: self.t,
            u: self.u.clone(),
            p: self.p.clone(),
        }
    }

    fn set_state(&mut self, state: OdeState) {
        self.t = state.t;
        self.u = state.u;
        self.p = state.p;
        self.du.resize(self.u.len(), 0.0);
    }
}
