//! Coupling ODE, PDE and agent-based components in one loop.

use assert_approx_eq::assert_approx_eq;
use mermaid::{
    Component, ConnectedVariable, Connector, Error, MermaidIntegrator, MermaidProblem,
    SolveOptions, Stepping, Value,
};
use mermaid_components::{OdeLocation, OdeModel};
use mermaid_test_data::problems;

fn options() -> SolveOptions {
    let save_vars = [
        "tank.temperature",
        "rod.field",
        "rod.field[0:1]",
        "crowd.count",
        "crowd.temperature",
    ]
    .map(|name| ConnectedVariable::parse(name).unwrap());
    SolveOptions::default()
        .with_stepping(Stepping::SubStep)
        .with_save_vars(save_vars)
}

#[test_log::test]
fn test_thermal_chain() -> anyhow::Result<()> {
    let problem = problems::thermal_chain()?;
    let (solution, stats) = MermaidIntegrator::new(&problem, options())?.solve_with_stats()?;

    assert_eq!(solution.len(), 21);
    assert_eq!(stats.num_ticks, 20);
    assert_approx_eq!(stats.end_time, 2.0, 1e-12);
    assert_eq!(stats.num_steps["tank"], 20);
    assert_eq!(stats.num_steps["rod"], 20);
    assert_eq!(stats.num_steps["crowd"], 4);

    // The tank cools towards the crowd
    let tank = solution.reals(&ConnectedVariable::parse("tank.temperature")?)?;
    assert_eq!(tank[0], 80.0);
    assert!(tank.windows(2).all(|w| w[1] < w[0]));

    // ... while heating the rod from its hot end
    let Some(Value::Vector(field)) = solution.get_by_name("rod.field")?.and_then(<[_]>::last)
    else {
        anyhow::bail!("rod.field was not recorded as a vector");
    };
    assert_eq!(field.len(), 10);
    assert!(field[0] > field[1] && field[1] > 20.0);

    let Some(Value::Vector(ends)) = solution.get_by_name("rod.field[0:1]")?.and_then(<[_]>::last)
    else {
        anyhow::bail!("rod.field[0:1] was not recorded as a vector");
    };
    assert_eq!(ends, &field[0..2]);

    let count = solution.get_by_name("crowd.count")?.unwrap_or_default();
    assert!(count.iter().all(|c| *c == Value::Integer(5)));
    Ok(())
}

#[test_log::test]
fn test_thermal_chain_is_reproducible() -> anyhow::Result<()> {
    let problem = problems::thermal_chain()?;
    let first = mermaid::solve(&problem, options())?;
    let second = mermaid::solve(&problem, options())?;
    assert_eq!(first, second);
    Ok(())
}

/// `du/dt = u^2` from a huge `u` overflows on the first step, and feeds `sink.u`.
fn blowup() -> anyhow::Result<MermaidProblem> {
    let source = OdeModel::new(|du, u, _, _| du[0] = u[0] * u[0], vec![1e200], vec![]);
    let sink = OdeModel::new(|du, _, p, _| du[0] = p[0], vec![0.0], vec![0.0]);
    Ok(MermaidProblem::new(3.0)
        .with_component(
            Component::new("sink", sink, 0.5)
                .with_state("u", OdeLocation::State(vec![0]))
                .with_state("rate", OdeLocation::Parameter(vec![0])),
        )
        .with_component(
            Component::new("source", source, 1.0).with_state("u", OdeLocation::State(vec![0])),
        )
        .with_connector(Connector::from_names(["source.u"], ["sink.rate"])?))
}

#[test_log::test]
fn test_solver_failure_propagates() -> anyhow::Result<()> {
    let problem = blowup()?;
    for stepping in [Stepping::MinimumTimeStep, Stepping::SubStep] {
        let options = SolveOptions::default().with_stepping(stepping);
        let result = mermaid::solve(&problem, options);
        assert!(
            matches!(result, Err(Error::SolverFailure(_))),
            "{stepping:?}: {result:?}"
        );
    }

    let mut integrator = MermaidIntegrator::new(&problem, SolveOptions::default())?;
    assert!(matches!(integrator.step(), Err(Error::SolverFailure(_))));
    // The failed tick is not recorded
    assert_eq!(integrator.solution().len(), 1);
    assert_eq!(integrator.current_time(), 0.0);
    Ok(())
}

#[cfg(feature = "arrow")]
#[test_log::test]
fn test_thermal_chain_record_batch() -> anyhow::Result<()> {
    use arrow::{array::AsArray, datatypes::{DataType, Float64Type, Int64Type}};

    let problem = problems::thermal_chain()?;
    let batch = mermaid::solve(&problem, options())?.to_record_batch()?;
    assert_eq!(batch.num_rows(), 21);
    assert_eq!(batch.num_columns(), 6);

    let time = batch
        .column_by_name("time")
        .unwrap()
        .as_primitive::<Float64Type>();
    assert_eq!(time.value(0), 0.0);

    let count = batch
        .column_by_name("crowd.count")
        .unwrap()
        .as_primitive::<Int64Type>();
    assert_eq!(count.value(20), 5);

    let field = batch.column_by_name("rod.field").unwrap();
    assert!(matches!(field.data_type(), DataType::List(_)));
    assert_eq!(field.as_list::<i32>().value(20).len(), 10);
    Ok(())
}
