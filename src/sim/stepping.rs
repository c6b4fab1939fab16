//! Policies deciding how the coordinator advances one global tick.

use crate::Error;

use super::{options::Stepping, system::CoupledSystem};

/// One global tick of a coupled system.
///
/// Implementations must resolve inputs before any component advances, and must advance the
/// global clock exactly once via [`CoupledSystem::tick`].
pub trait SteppingPolicy: Send {
    fn step(&mut self, system: &mut CoupledSystem<'_>, dt: f64) -> Result<(), Error>;
}

impl Stepping {
    pub fn policy(self) -> Box<dyn SteppingPolicy> {
        match self {
            Stepping::MinimumTimeStep => Box::new(MinimumTimeStep),
            Stepping::SubStep => Box::new(SubStep),
        }
    }
}

/// Push inputs, advance every component by one native step, refresh outputs.
///
/// With the global tick chosen as the smallest native step, a component with a larger native
/// step advances further than the tick on every call, so its native time runs ahead of the
/// global clock. Nothing is done to realign it.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinimumTimeStep;

impl SteppingPolicy for MinimumTimeStep {
    fn step(&mut self, system: &mut CoupledSystem<'_>, dt: f64) -> Result<(), Error> {
        system.update_inputs()?;
        for integrator in system.integrators_mut() {
            integrator.advance(dt)?;
        }
        system.update_outputs()?;
        system.tick();
        Ok(())
    }
}

/// Push inputs, then let every component take native steps until its own time reaches the end
/// of the tick. Inputs are held constant over those steps.
///
/// A component already at or past the end of the tick does not advance; one whose native step
/// does not divide the tick overshoots by less than one native step.
#[derive(Debug, Default, Clone, Copy)]
pub struct SubStep;

impl SteppingPolicy for SubStep {
    fn step(&mut self, system: &mut CoupledSystem<'_>, dt: f64) -> Result<(), Error> {
        let target = system.next_time();
        let tolerance = dt * 1e-9;

        system.update_inputs()?;
        for integrator in system.integrators_mut() {
            while integrator.read_time() < target - tolerance {
                let before = integrator.read_time();
                integrator.advance(dt)?;
                if integrator.read_time() <= before {
                    return Err(Error::Stalled {
                        component: integrator.name().to_owned(),
                        time: before,
                    });
                }
            }
        }
        system.update_outputs()?;
        system.tick();
        Ok(())
    }
}
