use crate::{Error, MermaidProblem};

use super::options::SolveOptions;

/// Clock parameters of a coupled solve, derived from a problem and its options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimParams {
    pub start_time: f64,
    pub max_t: f64,
    /// The global tick.
    pub dt: f64,
}

impl SimParams {
    pub fn new_from_options(problem: &MermaidProblem, options: &SolveOptions) -> Result<Self, Error> {
        let start_time = options.start_time.unwrap_or(0.0);
        let max_t = problem.max_t();

        if !start_time.is_finite() {
            return Err(Error::InvalidConfig(format!(
                "`start_time` must be finite, got {start_time}"
            )));
        }
        if !max_t.is_finite() || max_t < start_time {
            return Err(Error::InvalidConfig(format!(
                "horizon {max_t} must be finite and not before the start time {start_time}"
            )));
        }

        let dt = match options.time_step {
            Some(dt) => dt,
            None => problem
                .components()
                .iter()
                .map(|c| c.time_step())
                .reduce(f64::min)
                .ok_or_else(|| Error::InvalidConfig("problem has no components".to_owned()))?,
        };

        if !(dt.is_finite() && dt > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "the global time step must be positive, got {dt}"
            )));
        }

        Ok(Self {
            start_time,
            max_t,
            dt,
        })
    }

    /// Time of the `n`-th tick.
    ///
    /// Computed by multiplication rather than accumulation so that `max_t = N * dt` is reached
    /// after exactly `N` ticks.
    pub fn tick_time(&self, n: usize) -> f64 {
        self.start_time + n as f64 * self.dt
    }

    /// Whether `time` has reached the horizon, allowing for floating point round-off.
    pub fn is_finished(&self, time: f64) -> bool {
        time >= self.max_t - self.dt * 1e-9
    }

    /// Upper bound on the number of recorded samples, including the initial one.
    pub fn num_points(&self) -> usize {
        ((self.max_t - self.start_time) / self.dt).ceil() as usize + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::constant;

    #[test]
    fn test_dt_is_min_native_step() {
        let problem = MermaidProblem::new(4.0)
            .with_component(constant("a", 1.0, 1.0))
            .with_component(constant("b", 2.0, 0.5));
        let params = SimParams::new_from_options(&problem, &SolveOptions::default()).unwrap();
        assert_eq!(params.dt, 1.0);
        assert_eq!(params.start_time, 0.0);
        assert_eq!(params.num_points(), 5);
    }

    #[test]
    fn test_time_step_override() {
        let problem = MermaidProblem::new(1.0).with_component(constant("a", 1.0, 1.0));
        let options = SolveOptions::default().with_time_step(0.25);
        let params = SimParams::new_from_options(&problem, &options).unwrap();
        assert_eq!(params.dt, 0.25);

        let options = SolveOptions::default().with_time_step(0.0);
        assert!(matches!(
            SimParams::new_from_options(&problem, &options),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_invalid_problems() {
        let problem = MermaidProblem::new(1.0);
        assert!(matches!(
            SimParams::new_from_options(&problem, &SolveOptions::default()),
            Err(Error::InvalidConfig(_))
        ));

        let problem = MermaidProblem::new(f64::NAN).with_component(constant("a", 1.0, 1.0));
        assert!(SimParams::new_from_options(&problem, &SolveOptions::default()).is_err());

        let problem = MermaidProblem::new(1.0).with_component(constant("a", 1.0, 1.0));
        let options = SolveOptions::default().with_start_time(2.0);
        assert!(SimParams::new_from_options(&problem, &options).is_err());
    }

    #[test]
    fn test_tick_times() {
        let params = SimParams {
            start_time: 0.0,
            max_t: 1.0,
            dt: 0.1,
        };
        let ticks = (0..)
            .map(|n| params.tick_time(n))
            .position(|t| params.is_finished(t))
            .unwrap();
        assert_eq!(ticks, 10);
    }
}
