//! Message passing between component integrators.

use indexmap::IndexSet;

use crate::{integrator::ComponentIntegrator, ConnectedVariable, Connector, Error};

use super::{options::LookupPolicy, params::SimParams};

/// Which side of a connector a variable sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Source,
    Destination,
}

/// A non-fatal problem observed while coupling.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Diagnostic {
    /// A connector endpoint names a component that is not part of the problem. The endpoint is
    /// dropped.
    MissingComponent {
        connector: usize,
        variable: ConnectedVariable,
        endpoint: Endpoint,
    },
    /// A connector was not evaluated because some of its sources could not be resolved.
    SkippedConnector { connector: usize },
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::MissingComponent {
                connector,
                variable,
                endpoint,
            } => write!(
                f,
                "connector {connector}: {endpoint:?} `{variable}` names unknown component `{}`",
                variable.component()
            ),
            Diagnostic::SkippedConnector { connector } => {
                write!(f, "connector {connector}: skipped, unresolved sources")
            }
        }
    }
}

/// The live coupled system: every component integrator, the connectors between them, and the
/// global clock. This is what a [`super::SteppingPolicy`] operates on.
pub struct CoupledSystem<'a> {
    pub(crate) integrators: Vec<Box<dyn ComponentIntegrator>>,
    pub(crate) connectors: &'a [Connector],
    pub(crate) params: SimParams,
    pub(crate) lookup: LookupPolicy,
    pub(crate) current_time: f64,
    pub(crate) num_ticks: usize,
    pub(crate) diagnostics: IndexSet<Diagnostic>,
}

impl<'a> CoupledSystem<'a> {
    pub fn integrators(&self) -> &[Box<dyn ComponentIntegrator>] {
        &self.integrators
    }

    pub fn integrators_mut(&mut self) -> &mut [Box<dyn ComponentIntegrator>] {
        &mut self.integrators
    }

    pub fn connectors(&self) -> &'a [Connector] {
        self.connectors
    }

    pub fn params(&self) -> &SimParams {
        &self.params
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Time the global clock will show after the current tick completes.
    pub fn next_time(&self) -> f64 {
        self.params.tick_time(self.num_ticks + 1)
    }

    pub fn num_ticks(&self) -> usize {
        self.num_ticks
    }

    /// Every distinct diagnostic recorded so far, in the order first seen.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    /// Find an integrator by component name.
    pub fn integrator(&self, name: &str) -> Option<&dyn ComponentIntegrator> {
        self.integrators
            .iter()
            .find(|i| i.name() == name)
            .map(|i| i.as_ref())
    }

    fn integrator_mut(&mut self, name: &str) -> Option<&mut Box<dyn ComponentIntegrator>> {
        self.integrators.iter_mut().find(|i| i.name() == name)
    }

    /// Advance the global clock by one tick.
    pub fn tick(&mut self) {
        self.num_ticks += 1;
        self.current_time = self.params.tick_time(self.num_ticks);
    }

    fn lookup_miss(
        &mut self,
        connector: usize,
        variable: &ConnectedVariable,
        endpoint: Endpoint,
    ) -> Result<(), Error> {
        if self.lookup == LookupPolicy::Strict {
            return Err(Error::UnknownComponent(variable.component().to_owned()));
        }
        let diagnostic = Diagnostic::MissingComponent {
            connector,
            variable: variable.clone(),
            endpoint,
        };
        self.record(diagnostic);
        Ok(())
    }

    pub(crate) fn record(&mut self, diagnostic: Diagnostic) {
        if self.lookup == LookupPolicy::Warn && !self.diagnostics.contains(&diagnostic) {
            log::warn!("{diagnostic}");
        }
        self.diagnostics.insert(diagnostic);
    }

    /// Resolve every connector, in declaration order, and push the result into the input
    /// mailbox of every destination.
    ///
    /// Sources are read from the owning integrator's `outputs`, so all values pushed during one
    /// call reflect the state before any component advances.
    pub fn update_inputs(&mut self) -> Result<(), Error> {
        let connectors = self.connectors;
        for (index, connector) in connectors.iter().enumerate() {
            let mut values = Vec::with_capacity(connector.inputs().len());
            let mut unresolved = false;

            for source in connector.inputs() {
                match self.integrator(source.component()) {
                    Some(integrator) => {
                        let value = integrator
                            .outputs()
                            .get(source)
                            .cloned()
                            .ok_or_else(|| Error::MissingOutput(source.clone()))?;
                        values.push(value);
                    }
                    None => {
                        self.lookup_miss(index, source, Endpoint::Source)?;
                        unresolved = true;
                    }
                }
            }

            // A transform would see the wrong arity, and an empty collection carries nothing.
            if values.is_empty() || (unresolved && connector.transform().is_some()) {
                self.record(Diagnostic::SkippedConnector { connector: index });
                continue;
            }

            let value = connector
                .combine(values)
                .map_err(|source| Error::Transform {
                    connector: index,
                    source: Box::new(source),
                })?;
            log::trace!("Connector {index} {connector} resolved to {value}");

            for destination in connector.outputs() {
                match self.integrator_mut(destination.component()) {
                    Some(integrator) => {
                        integrator
                            .inputs_mut()
                            .insert(destination.clone(), Some(value.clone()));
                    }
                    None => self.lookup_miss(index, destination, Endpoint::Destination)?,
                }
            }
        }
        Ok(())
    }

    /// Re-read every integrator's declared outputs from its native state.
    pub fn update_outputs(&mut self) -> Result<(), Error> {
        self.integrators
            .iter_mut()
            .try_for_each(|integrator| integrator.refresh_outputs())
    }
}
