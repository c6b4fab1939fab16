//! The static definition of a coupled problem.

use std::collections::HashSet;

use crate::{
    component::AnyComponent,
    sim::{Diagnostic, Endpoint},
    Connector, Error,
};

/// Components, the connectors between them, and the simulation horizon.
pub struct MermaidProblem {
    components: Vec<Box<dyn AnyComponent>>,
    connectors: Vec<Connector>,
    max_t: f64,
}

impl MermaidProblem {
    pub fn new(max_t: f64) -> Self {
        Self {
            components: Vec::new(),
            connectors: Vec::new(),
            max_t,
        }
    }

    /// Append a component. Component order is preserved by the coordinator.
    pub fn with_component(mut self, component: impl Into<Box<dyn AnyComponent>>) -> Self {
        self.components.push(component.into());
        self
    }

    pub fn with_connector(mut self, connector: Connector) -> Self {
        self.connectors.push(connector);
        self
    }

    pub fn components(&self) -> &[Box<dyn AnyComponent>] {
        &self.components
    }

    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    pub fn max_t(&self) -> f64 {
        self.max_t
    }

    pub fn component(&self, name: &str) -> Option<&dyn AnyComponent> {
        self.components
            .iter()
            .find(|c| c.name() == name)
            .map(|c| c.as_ref())
    }

    /// Check the problem for definition errors.
    ///
    /// Fails on duplicate component names, non-positive native time steps, an invalid horizon,
    /// transforms whose arity disagrees with their connector, and variables that a known
    /// component does not expose. Connector endpoints naming unknown components are returned
    /// as diagnostics; whether they are fatal is up to the caller.
    pub fn validate(&self) -> Result<Vec<Diagnostic>, Error> {
        if !self.max_t.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "horizon must be finite, got {}",
                self.max_t
            )));
        }

        let mut names = HashSet::new();
        for component in &self.components {
            if !names.insert(component.name()) {
                return Err(Error::DuplicateComponent(component.name().to_owned()));
            }
            let time_step = component.time_step();
            if !(time_step.is_finite() && time_step > 0.0) {
                return Err(Error::InvalidTimeStep {
                    component: component.name().to_owned(),
                    time_step,
                });
            }
        }

        let mut diagnostics = Vec::new();
        for (index, connector) in self.connectors.iter().enumerate() {
            if let Some(arity) = connector.transform().and_then(|t| t.arity()) {
                if arity != connector.inputs().len() {
                    return Err(Error::Arity {
                        expected: arity,
                        found: connector.inputs().len(),
                    });
                }
            }

            let endpoints = connector
                .inputs()
                .iter()
                .map(|var| (var, Endpoint::Source))
                .chain(connector.outputs().iter().map(|var| (var, Endpoint::Destination)));

            for (variable, endpoint) in endpoints {
                match self.component(variable.component()) {
                    Some(component) if !component.has_state(variable.variable()) => {
                        return Err(Error::UnknownVariable {
                            component: variable.component().to_owned(),
                            variable: variable.variable().to_owned(),
                        });
                    }
                    Some(_) => {}
                    None => diagnostics.push(Diagnostic::MissingComponent {
                        connector: index,
                        variable: variable.clone(),
                        endpoint,
                    }),
                }
            }
        }

        Ok(diagnostics)
    }
}

impl std::fmt::Debug for MermaidProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MermaidProblem")
            .field(
                "components",
                &self.components.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("connectors", &self.connectors)
            .field("max_t", &self.max_t)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{test_util::linear, ConnectedVariable, Transform};

    fn pair() -> MermaidProblem {
        MermaidProblem::new(4.0)
            .with_component(linear("a", 1.0, 0.0, 1.0))
            .with_component(linear("b", 2.0, 0.0, 1.0))
    }

    #[test]
    fn test_valid_problem() {
        let problem = pair().with_connector(Connector::from_names(["a.x"], ["b.rate"]).unwrap());
        assert!(problem.validate().unwrap().is_empty());
        assert_eq!(problem.component("b").map(|c| c.name()), Some("b"));
        assert!(problem.component("c").is_none());
    }

    #[test]
    fn test_duplicate_component() {
        let problem = pair().with_component(linear("a", 0.0, 0.0, 1.0));
        assert!(matches!(
            problem.validate(),
            Err(Error::DuplicateComponent(name)) if name == "a"
        ));
    }

    #[rstest]
    #[case(0.0)]
    #[case(-0.5)]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn test_invalid_time_step(#[case] time_step: f64) {
        let problem = pair().with_component(linear("c", 0.0, 0.0, time_step));
        assert!(matches!(
            problem.validate(),
            Err(Error::InvalidTimeStep { component, .. }) if component == "c"
        ));
    }

    #[test]
    fn test_invalid_horizon() {
        let problem = MermaidProblem::new(f64::NAN).with_component(linear("a", 0.0, 0.0, 1.0));
        assert!(matches!(problem.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_transform_arity() {
        let connector = Connector::from_names(["a.x"], ["b.rate"])
            .unwrap()
            .with_transform(Transform::binary(|a, b| a + b));
        let problem = pair().with_connector(connector);
        assert!(matches!(
            problem.validate(),
            Err(Error::Arity {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_unknown_variable() {
        let problem = pair().with_connector(Connector::from_names(["a.y"], ["b.x"]).unwrap());
        assert!(matches!(
            problem.validate(),
            Err(Error::UnknownVariable { component, variable }) if component == "a" && variable == "y"
        ));
    }

    #[test]
    fn test_missing_component_is_diagnostic() {
        let problem = pair()
            .with_connector(Connector::from_names(["a.x"], ["b.rate", "ghost.x"]).unwrap())
            .with_connector(Connector::from_names(["phantom.y"], ["a.rate"]).unwrap());
        let diagnostics = problem.validate().unwrap();
        assert_eq!(
            diagnostics,
            vec![
                Diagnostic::MissingComponent {
                    connector: 0,
                    variable: ConnectedVariable::parse("ghost.x").unwrap(),
                    endpoint: Endpoint::Destination,
                },
                Diagnostic::MissingComponent {
                    connector: 1,
                    variable: ConnectedVariable::parse("phantom.y").unwrap(),
                    endpoint: Endpoint::Source,
                },
            ]
        );
    }
}
