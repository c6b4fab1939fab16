//! One-dimensional fields advanced by the method of lines.
//!
//! A component holds one or more fields sampled on a grid. The right-hand side computes the
//! time derivative of every field at once, and each native step takes `substeps` explicit
//! Euler steps of `time_step / substeps`.

use std::sync::Arc;

use mermaid::{slots, Error, Index, Model, Solver, Value};

/// Right-hand side `f(dfields, fields, p, t)`.
pub type FieldRhs = Arc<dyn Fn(&mut [Vec<f64>], &[Vec<f64>], &[f64], f64) + Send + Sync>;

/// Discrete Laplacian of `u` on a uniform grid of spacing `dx`, with zero-flux boundaries.
pub fn laplacian_1d(out: &mut [f64], u: &[f64], dx: f64) {
    let n = u.len();
    let scale = 1.0 / (dx * dx);
    for i in 0..n {
        let left = if i == 0 { u[i] } else { u[i - 1] };
        let right = if i + 1 == n { u[i] } else { u[i + 1] };
        out[i] = (left - 2.0 * u[i] + right) * scale;
    }
}

#[derive(Clone)]
pub struct FieldModel {
    fields: Vec<Vec<f64>>,
    p: Vec<f64>,
    rhs: FieldRhs,
    substeps: usize,
}

impl FieldModel {
    pub fn new<F>(rhs: F, fields: Vec<Vec<f64>>, p: Vec<f64>) -> Self
    where
        F: Fn(&mut [Vec<f64>], &[Vec<f64>], &[f64], f64) + Send + Sync + 'static,
    {
        Self {
            fields,
            p,
            rhs: Arc::new(rhs),
            substeps: 1,
        }
    }

    /// Split every native step into `substeps` Euler steps, for stability of stiff fields.
    pub fn with_substeps(mut self, substeps: usize) -> Self {
        self.substeps = substeps;
        self
    }
}

/// Where a coupled variable lives in a field component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldLocation {
    /// The whole `k`-th field.
    Field(usize),
    /// Selected grid points of the `k`-th field.
    Points(usize, Vec<usize>),
    Parameter(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldState {
    pub t: f64,
    pub fields: Vec<Vec<f64>>,
    pub p: Vec<f64>,
}

pub struct FieldSolver {
    rhs: FieldRhs,
    time_step: f64,
    substeps: usize,
    t: f64,
    fields: Vec<Vec<f64>>,
    dfields: Vec<Vec<f64>>,
    p: Vec<f64>,
}

impl Model for FieldModel {
    type Solver = FieldSolver;

    fn instantiate(&self, time_step: f64) -> Result<FieldSolver, Error> {
        if self.substeps == 0 {
            return Err(Error::InvalidConfig(
                "a field model needs at least one substep".to_owned(),
            ));
        }
        Ok(FieldSolver {
            rhs: self.rhs.clone(),
            time_step,
            substeps: self.substeps,
            t: 0.0,
            fields: self.fields.clone(),
            dfields: self.fields.iter().map(|f| vec![0.0; f.len()]).collect(),
            p: self.p.clone(),
        })
    }
}

impl FieldSolver {
    pub fn fields(&self) -> &[Vec<f64>] {
        &self.fields
    }

    fn field(&self, k: usize) -> Result<&[f64], Error> {
        self.fields
            .get(k)
            .map(Vec::as_slice)
            .ok_or(Error::IndexOutOfRange {
                index: k,
                len: self.fields.len(),
            })
    }

    fn field_mut(&mut self, k: usize) -> Result<&mut [f64], Error> {
        let len = self.fields.len();
        self.fields
            .get_mut(k)
            .map(Vec::as_mut_slice)
            .ok_or(Error::IndexOutOfRange { index: k, len })
    }
}

impl Solver for FieldSolver {
    type Location = FieldLocation;
    type State = FieldState;

    fn step(&mut self) -> Result<(), Error> {
        let start = self.t;
        let h = self.time_step / self.substeps as f64;

        for n in 0..self.substeps {
            let t = start + n as f64 * h;
            (self.rhs)(&mut self.dfields, &self.fields, &self.p, t);
            for (field, dfield) in self.fields.iter_mut().zip(&self.dfields) {
                for (u, du) in field.iter_mut().zip(dfield) {
                    *u += h * du;
                }
            }
        }
        self.t = start + self.time_step;

        for (k, field) in self.fields.iter().enumerate() {
            if let Some(i) = field.iter().position(|u| !u.is_finite()) {
                return Err(Error::SolverFailure(format!(
                    "field {k} is {} at point {i}, t = {}",
                    field[i], self.t
                )));
            }
        }
        Ok(())
    }

    fn time(&self) -> f64 {
        self.t
    }

    fn set_time(&mut self, time: f64) {
        self.t = time;
    }

    fn mark_modified(&mut self) {}

    fn read(&self, location: &FieldLocation, index: Option<&Index>) -> Result<Value, Error> {
        match location {
            FieldLocation::Field(k) => {
                let field = self.field(*k)?;
                let all = (0..field.len()).collect::<Vec<_>>();
                slots::read(field, &all, index)
            }
            FieldLocation::Points(k, points) => slots::read(self.field(*k)?, points, index),
            FieldLocation::Parameter(slots) => slots::read(&self.p, slots, index),
        }
    }

    fn write(
        &mut self,
        location: &FieldLocation,
        index: Option<&Index>,
        value: &Value,
    ) -> Result<(), Error> {
        match location {
            FieldLocation::Field(k) => {
                let field = self.field_mut(*k)?;
                let all = (0..field.len()).collect::<Vec<_>>();
                slots::write(field, &all, index, value)
            }
            FieldLocation::Points(k, points) => {
                slots::write(self.field_mut(*k)?, points, index, value)
            }
            FieldLocation::Parameter(slots) => slots::write(&mut self.p, slots, index, value),
        }
    }

    fn state(&self) -> FieldState {
        FieldState {
            t: self.t,
            fields: self.fields.clone(),
            p: self.p.clone(),
        }
    }

    fn set_state(&mut self, state: FieldState) {
        self.dfields = state.fields.iter().map(|f| vec![0.0; f.len()]).collect();
        self.t = state.t;
        self.fields = state.fields;
        self.p = state.p;
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use super::*;

    /// `du/dt = p[0] * d2u/dx2` on a unit-spaced grid.
    fn diffusion(u0: Vec<f64>) -> FieldModel {
        FieldModel::new(
            |du, u, p, _t| {
                laplacian_1d(&mut du[0], &u[0], 1.0);
                du[0].iter_mut().for_each(|d| *d *= p[0]);
            },
            vec![u0],
            vec![0.1],
        )
    }

    #[test]
    fn test_laplacian() {
        let mut out = [0.0; 4];
        laplacian_1d(&mut out, &[1.0, 2.0, 4.0, 8.0], 0.5);
        assert_eq!(out, [4.0, 4.0, 8.0, -16.0]);

        let mut out = [1.0];
        laplacian_1d(&mut out, &[3.0], 1.0);
        assert_eq!(out, [0.0]);
    }

    #[test]
    fn test_diffusion_conserves_mass() {
        let mut solver = diffusion(vec![0.0, 0.0, 10.0, 0.0, 0.0])
            .with_substeps(4)
            .instantiate(1.0)
            .unwrap();
        for _ in 0..10 {
            solver.step().unwrap();
        }
        assert_approx_eq!(solver.time(), 10.0, 1e-12);

        let field = &solver.fields()[0];
        assert_approx_eq!(field.iter().sum::<f64>(), 10.0, 1e-9);
        // Spreads out symmetrically, peak stays in the middle
        assert_approx_eq!(field[0], field[4], 1e-12);
        assert!(field[2] < 10.0 && field[2] > field[1] && field[1] > field[0]);
    }

    #[test]
    fn test_locations() {
        let mut solver = diffusion(vec![1.0, 2.0, 3.0, 4.0]).instantiate(1.0).unwrap();

        assert_eq!(
            solver.read(&FieldLocation::Field(0), Some(&Index::Range(1..=2))).unwrap(),
            Value::Vector(vec![2.0, 3.0])
        );
        assert_eq!(
            solver.read(&FieldLocation::Points(0, vec![3]), None).unwrap(),
            Value::Real(4.0)
        );

        // Boundary forcing: the first and last points
        let boundary = FieldLocation::Points(0, vec![0, 3]);
        solver.write(&boundary, None, &Value::Real(0.0)).unwrap();
        assert_eq!(solver.fields()[0], vec![0.0, 2.0, 3.0, 0.0]);

        solver
            .write(&FieldLocation::Parameter(vec![0]), None, &Value::Real(0.5))
            .unwrap();
        assert_eq!(
            solver.read(&FieldLocation::Parameter(vec![0]), None).unwrap(),
            Value::Real(0.5)
        );

        assert!(matches!(
            solver.read(&FieldLocation::Field(1), None),
            Err(Error::IndexOutOfRange { index: 1, len: 1 })
        ));
    }

    #[test]
    fn test_zero_substeps() {
        let model = diffusion(vec![0.0]).with_substeps(0);
        assert!(matches!(model.instantiate(1.0), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_unstable_step_fails() {
        let model = FieldModel::new(
            |du, u, _, _| {
                for (du, u) in du[0].iter_mut().zip(&u[0]) {
                    *du = u * 1e300;
                }
            },
            vec![vec![1e300]],
            vec![],
        );
        let mut solver = model.instantiate(1.0).unwrap();
        assert!(matches!(solver.step(), Err(Error::SolverFailure(_))));
    }
}
