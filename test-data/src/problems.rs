//! Canned coupled problems.

use anyhow::Context;
use mermaid::{Component, Connector, Error, MermaidProblem, Transform, Value};
use mermaid_components::{
    jitter, laplacian_1d, Agent, AgentLocation, AgentModel, FieldLocation, FieldModel, Method,
    OdeLocation, OdeModel,
};

use crate::{Probe, ProbeLog, Ramp};

/// Ramp `a` (`a.out = t`, native step 1.0) feeding probe `b` (native step 2.0) through
/// `a.out -> b.in`, up to `t = 4`.
pub fn two_rate() -> anyhow::Result<(MermaidProblem, ProbeLog)> {
    let (sink, log) = Probe::component("b", 0.0, 2.0);
    let problem = MermaidProblem::new(4.0)
        .with_component(Ramp::component("a", 0.0, 1.0, 1.0))
        .with_component(sink)
        .with_connector(Connector::from_names(["a.out"], ["b.in"])?);
    Ok((problem, log))
}

/// A constant source `src.out = 5` broadcast to probes `p0`, `p1`, ... by a single connector.
pub fn fan_out(n: usize) -> anyhow::Result<(MermaidProblem, Vec<ProbeLog>)> {
    let mut problem = MermaidProblem::new(1.0).with_component(Ramp::component("src", 5.0, 0.0, 0.5));
    let mut logs = Vec::with_capacity(n);
    let mut destinations = Vec::with_capacity(n);
    for i in 0..n {
        let name = format!("p{i}");
        let (probe, log) = Probe::component(&name, 0.0, 0.5);
        problem = problem.with_component(probe);
        logs.push(log);
        destinations.push(format!("{name}.in"));
    }
    let connector = Connector::from_names(["src.out"], &destinations)
        .with_context(|| format!("Connecting to {destinations:?}"))?;
    Ok((problem.with_connector(connector), logs))
}

/// Mean of a vector-valued input.
fn mean() -> Transform {
    Transform::with_arity(1, |values| {
        let values = values[0].to_vector()?;
        if values.is_empty() {
            return Err(Error::EmptySelection);
        }
        Ok(Value::Real(values.iter().sum::<f64>() / values.len() as f64))
    })
}

/// A loop across three component kinds, up to `t = 2`:
///
/// * `tank`: an ODE cooling towards its ambient temperature, native step 0.1.
/// * `rod`: heat diffusing along ten grid points, native step 0.1 in two substeps.
/// * `crowd`: five agents whose temperature relaxes towards the environment, native step 0.5.
///
/// The tank heats the hot end of the rod, the cold end of the rod sets the environment of the
/// crowd, and the mean crowd temperature becomes the ambient temperature of the tank.
pub fn thermal_chain() -> anyhow::Result<MermaidProblem> {
    let tank = OdeModel::new(
        |du, u, p, _t| du[0] = -p[0] * (u[0] - p[1]),
        vec![80.0],
        vec![0.1, 20.0],
    )
    .with_method(Method::Rk4);

    let rod = FieldModel::new(
        |du, u, p, _t| {
            laplacian_1d(&mut du[0], &u[0], 1.0);
            du[0].iter_mut().for_each(|d| *d *= p[0]);
        },
        vec![vec![20.0; 10]],
        vec![0.5],
    )
    .with_substeps(2);

    let agents = (0..5)
        .map(|id| Agent::new(id).with_attribute("temperature", 20.0))
        .collect();
    let crowd = AgentModel::new(agents, 42)
        .with_property("temperature", 20.0)
        .with_agent_step(|agent, properties, rng| {
            let target = properties["temperature"];
            let t = &mut agent.attributes["temperature"];
            *t += 0.1 * (target - *t) + jitter(rng, 0.01);
        });

    let problem = MermaidProblem::new(2.0)
        .with_component(
            Component::new("tank", tank, 0.1)
                .with_state("temperature", OdeLocation::State(vec![0]))
                .with_state("ambient", OdeLocation::Parameter(vec![1])),
        )
        .with_component(
            Component::new("rod", rod, 0.1)
                .with_state("field", FieldLocation::Field(0))
                .with_state("hot_end", FieldLocation::Points(0, vec![0]))
                .with_state("cold_end", FieldLocation::Points(0, vec![9])),
        )
        .with_component(
            Component::new("crowd", crowd, 0.5)
                .with_state("environment", AgentLocation::Property("temperature".to_owned()))
                .with_state("temperature", AgentLocation::Attribute("temperature".to_owned()))
                .with_state("count", AgentLocation::Count),
        )
        .with_connector(Connector::from_names(["tank.temperature"], ["rod.hot_end"])?)
        .with_connector(Connector::from_names(["rod.cold_end"], ["crowd.environment"])?)
        .with_connector(
            Connector::from_names(["crowd.temperature"], ["tank.ambient"])?.with_transform(mean()),
        );
    Ok(problem)
}
