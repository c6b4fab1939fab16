//! The co-simulation coordinator.
//!
//! [`MermaidIntegrator`] drives the global clock: each tick it hands the [`CoupledSystem`] to a
//! [`SteppingPolicy`], then records the requested variables into a [`MermaidSolution`]. One
//! sample is recorded at the start time before any component advances.

mod options;
mod params;
mod solution;
mod stepping;
mod system;

use indexmap::IndexMap;
use itertools::Itertools;

pub use options::{LookupPolicy, SolveOptions, Stepping};
pub use params::SimParams;
pub use solution::MermaidSolution;
pub use stepping::{MinimumTimeStep, SteppingPolicy, SubStep};
pub use system::{CoupledSystem, Diagnostic, Endpoint};

use crate::{ConnectedVariable, Error, MermaidProblem, Value};

#[derive(Default, Debug, Clone, PartialEq)]
pub struct SimStats {
    /// End time of the simulation
    pub end_time: f64,
    /// Number of global ticks taken
    pub num_ticks: usize,
    /// Number of native steps taken by each component
    pub num_steps: IndexMap<String, usize>,
}

/// The live coupled simulation built from a [`MermaidProblem`].
pub struct MermaidIntegrator<'a> {
    system: CoupledSystem<'a>,
    policy: Box<dyn SteppingPolicy>,
    save_vars: Vec<ConnectedVariable>,
    solution: MermaidSolution,
}

impl<'a> MermaidIntegrator<'a> {
    /// Build one integrator per component, in problem order, and record the initial sample.
    pub fn new(problem: &'a MermaidProblem, options: SolveOptions) -> Result<Self, Error> {
        let policy = options.stepping.policy();
        Self::with_policy(problem, options, policy)
    }

    /// Like [`MermaidIntegrator::new`], with a custom stepping policy. `options.stepping` is
    /// ignored.
    pub fn with_policy(
        problem: &'a MermaidProblem,
        options: SolveOptions,
        policy: Box<dyn SteppingPolicy>,
    ) -> Result<Self, Error> {
        let params = SimParams::new_from_options(problem, &options)?;

        let diagnostics = problem.validate()?;
        if options.lookup == LookupPolicy::Strict {
            if let Some(missing) = diagnostics.iter().find_map(|d| match d {
                Diagnostic::MissingComponent { variable, .. } => Some(variable),
                Diagnostic::SkippedConnector { .. } => None,
            }) {
                return Err(Error::UnknownComponent(missing.component().to_owned()));
            }
        }

        let connectors = problem.connectors();
        let mut integrators = problem
            .components()
            .iter()
            .map(|component| component.initialize(connectors))
            .collect::<Result<Vec<_>, _>>()?;

        if let Some(start_time) = options.start_time {
            for integrator in &mut integrators {
                integrator.write_time(start_time);
            }
        }

        // Sources in missing components are diagnosed, not recorded
        let save_vars = if options.save_vars.is_empty() {
            connectors
                .iter()
                .flat_map(|c| c.inputs())
                .filter(|var| problem.component(var.component()).is_some())
                .unique()
                .cloned()
                .collect()
        } else {
            options.save_vars
        };

        if let Some(var) = save_vars
            .iter()
            .find(|var| problem.component(var.component()).is_none())
        {
            return Err(Error::UnknownComponent(var.component().to_owned()));
        }

        log::debug!(
            "Coupling {} components over {} connectors, dt = {}, t = [{}, {}], recording [{}]",
            integrators.len(),
            connectors.len(),
            params.dt,
            params.start_time,
            params.max_t,
            save_vars.iter().join(", ")
        );

        let mut system = CoupledSystem {
            integrators,
            connectors,
            params,
            lookup: options.lookup,
            current_time: params.start_time,
            num_ticks: 0,
            diagnostics: Default::default(),
        };
        for diagnostic in diagnostics {
            system.record(diagnostic);
        }

        let solution = MermaidSolution::with_capacity(&save_vars, params.num_points());

        let mut this = Self {
            system,
            policy,
            save_vars,
            solution,
        };
        this.record()?;
        Ok(this)
    }

    fn record(&mut self) -> Result<(), Error> {
        let values = self
            .save_vars
            .iter()
            .map(|var| self.read(var))
            .collect::<Result<Vec<_>, _>>()?;
        log::trace!("Recording {} variables at t = {}", values.len(), self.system.current_time);
        self.solution.push(self.system.current_time, values);
        Ok(())
    }

    /// Read the current value of any variable directly from its component.
    pub fn read(&self, var: &ConnectedVariable) -> Result<Value, Error> {
        self.system
            .integrator(var.component())
            .ok_or_else(|| Error::UnknownComponent(var.component().to_owned()))?
            .read_state(var)
    }

    pub fn current_time(&self) -> f64 {
        self.system.current_time
    }

    pub fn params(&self) -> &SimParams {
        &self.system.params
    }

    pub fn system(&self) -> &CoupledSystem<'a> {
        &self.system
    }

    /// Distinct diagnostics observed so far, in the order first seen.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.system.diagnostics()
    }

    /// The solution recorded so far.
    pub fn solution(&self) -> &MermaidSolution {
        &self.solution
    }

    pub fn is_finished(&self) -> bool {
        self.system.params.is_finished(self.system.current_time)
    }

    pub fn stats(&self) -> SimStats {
        SimStats {
            end_time: self.system.current_time,
            num_ticks: self.system.num_ticks,
            num_steps: self
                .system
                .integrators
                .iter()
                .map(|i| (i.name().to_owned(), i.num_steps()))
                .collect(),
        }
    }

    /// Advance by one global tick and record a sample.
    pub fn step(&mut self) -> Result<(), Error> {
        if self.is_finished() {
            return Err(Error::Finished(self.system.current_time));
        }
        let dt = self.system.params.dt;
        self.policy.step(&mut self.system, dt)?;
        self.record()
    }

    /// Run until the horizon and return the recorded solution.
    pub fn solve(self) -> Result<MermaidSolution, Error> {
        self.solve_with_stats().map(|(solution, _)| solution)
    }

    /// Run until the horizon and return the recorded solution with run statistics.
    pub fn solve_with_stats(mut self) -> Result<(MermaidSolution, SimStats), Error> {
        while !self.is_finished() {
            self.step()?;
        }
        let stats = self.stats();
        log::info!(
            "Simulation finished at t = {} after {} ticks.",
            stats.end_time,
            stats.num_ticks
        );
        Ok((self.solution, stats))
    }
}

/// Build the coordinator for `problem` and run it to the horizon.
pub fn solve(problem: &MermaidProblem, options: SolveOptions) -> Result<MermaidSolution, Error> {
    MermaidIntegrator::new(problem, options)?.solve()
}
