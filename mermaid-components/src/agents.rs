//! Agent-based models.
//!
//! An [`AgentWorld`] holds a population of agents with numeric attributes, a set of global
//! model properties, and a seeded random number generator. Each native step applies the agent
//! step to every agent in order, then the model step to the whole world.

use std::sync::Arc;

use indexmap::IndexMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use mermaid::{slots, Error, Index, Model, Solver, Value};

/// Global, model-level properties.
pub type Properties = IndexMap<String, f64>;

pub type AgentStep = Arc<dyn Fn(&mut Agent, &Properties, &mut ChaCha8Rng) + Send + Sync>;

pub type ModelStep = Arc<dyn Fn(&mut AgentWorld) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: usize,
    pub attributes: IndexMap<String, f64>,
}

impl Agent {
    pub fn new(id: usize) -> Self {
        Self {
            id,
            attributes: IndexMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Result<f64, Error> {
        self.attributes
            .get(name)
            .copied()
            .ok_or_else(|| Error::MissingEntry(name.to_owned()))
    }
}

/// A uniform random offset in `[-scale, scale)`.
pub fn jitter(rng: &mut ChaCha8Rng, scale: f64) -> f64 {
    scale * (2.0 * rng.gen::<f64>() - 1.0)
}

/// The native state of an agent-based component.
#[derive(Debug, Clone)]
pub struct AgentWorld {
    pub time: f64,
    pub time_step: f64,
    pub agents: Vec<Agent>,
    pub properties: Properties,
    pub rng: ChaCha8Rng,
}

#[derive(Clone)]
pub struct AgentModel {
    agents: Vec<Agent>,
    properties: Properties,
    agent_step: Option<AgentStep>,
    model_step: Option<ModelStep>,
    seed: u64,
}

impl AgentModel {
    pub fn new(agents: Vec<Agent>, seed: u64) -> Self {
        Self {
            agents,
            properties: Properties::new(),
            agent_step: None,
            model_step: None,
            seed,
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: f64) -> Self {
        self.properties.insert(name.into(), value);
        self
    }

    pub fn with_agent_step<F>(mut self, step: F) -> Self
    where
        F: Fn(&mut Agent, &Properties, &mut ChaCha8Rng) + Send + Sync + 'static,
    {
        self.agent_step = Some(Arc::new(step));
        self
    }

    pub fn with_model_step<F>(mut self, step: F) -> Self
    where
        F: Fn(&mut AgentWorld) + Send + Sync + 'static,
    {
        self.model_step = Some(Arc::new(step));
        self
    }
}

/// Where a coupled variable lives in an agent-based component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentLocation {
    /// A global model property, read as a `Real`.
    Property(String),
    /// One attribute across all agents, read as a `Vector` in agent order. An index selects
    /// agents by position.
    Attribute(String),
    /// The number of agents, read as an `Integer`. Read-only.
    Count,
}

pub struct AgentSolver {
    world: AgentWorld,
    agent_step: Option<AgentStep>,
    model_step: Option<ModelStep>,
}

impl Model for AgentModel {
    type Solver = AgentSolver;

    fn instantiate(&self, time_step: f64) -> Result<AgentSolver, Error> {
        Ok(AgentSolver {
            world: AgentWorld {
                time: 0.0,
                time_step,
                agents: self.agents.clone(),
                properties: self.properties.clone(),
                rng: ChaCha8Rng::seed_from_u64(self.seed),
            },
            agent_step: self.agent_step.clone(),
            model_step: self.model_step.clone(),
        })
    }
}

impl AgentSolver {
    pub fn world(&self) -> &AgentWorld {
        &self.world
    }

    fn attribute(&self, name: &str) -> Result<Vec<f64>, Error> {
        self.world.agents.iter().map(|agent| agent.get(name)).collect()
    }
}

impl Solver for AgentSolver {
    type Location = AgentLocation;
    type State = AgentWorld;

    fn step(&mut self) -> Result<(), Error> {
        let world = &mut self.world;
        if let Some(agent_step) = &self.agent_step {
            for agent in world.agents.iter_mut() {
                agent_step(agent, &world.properties, &mut world.rng);
            }
        }
        if let Some(model_step) = &self.model_step {
            model_step(world);
        }
        world.time += world.time_step;
        log::trace!(
            "Agent world at t = {} has {} agents",
            world.time,
            world.agents.len()
        );
        Ok(())
    }

    fn time(&self) -> f64 {
        self.world.time
    }

    fn set_time(&mut self, time: f64) {
        self.world.time = time;
    }

    fn mark_modified(&mut self) {}

    fn read(&self, location: &AgentLocation, index: Option<&Index>) -> Result<Value, Error> {
        match location {
            AgentLocation::Property(name) => {
                let value = self
                    .world
                    .properties
                    .get(name)
                    .copied()
                    .ok_or_else(|| Error::MissingEntry(name.clone()))?;
                slots::read(&[value], &[0], index)
            }
            AgentLocation::Attribute(name) => {
                let values = self.attribute(name)?;
                match index {
                    None => Ok(Value::Vector(values)),
                    Some(_) => {
                        let all = (0..values.len()).collect::<Vec<_>>();
                        slots::read(&values, &all, index)
                    }
                }
            }
            AgentLocation::Count => Ok(Value::Integer(self.world.agents.len() as i64)),
        }
    }

    fn write(
        &mut self,
        location: &AgentLocation,
        index: Option<&Index>,
        value: &Value,
    ) -> Result<(), Error> {
        match location {
            AgentLocation::Property(name) => {
                let property = self
                    .world
                    .properties
                    .get_mut(name)
                    .ok_or_else(|| Error::MissingEntry(name.clone()))?;
                let mut data = [*property];
                slots::write(&mut data, &[0], index, value)?;
                *property = data[0];
                Ok(())
            }
            // An extinct population has nothing to write to
            AgentLocation::Attribute(_) if index.is_none() && self.world.agents.is_empty() => {
                Ok(())
            }
            AgentLocation::Attribute(name) => {
                let mut values = self.attribute(name)?;
                let all = (0..values.len()).collect::<Vec<_>>();
                slots::write(&mut values, &all, index, value)?;
                for (agent, value) in self.world.agents.iter_mut().zip(values) {
                    agent.attributes.insert(name.clone(), value);
                }
                Ok(())
            }
            AgentLocation::Count => Err(Error::ReadOnly("agent count".to_owned())),
        }
    }

    fn state(&self) -> AgentWorld {
        self.world.clone()
    }

    fn set_state(&mut self, state: AgentWorld) {
        self.world = state;
    }
}
