use crate::ConnectedVariable;

/// What to do when a connector names a component that is not part of the problem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LookupPolicy {
    /// Drop the endpoint and record a diagnostic.
    Ignore,
    /// Drop the endpoint, record a diagnostic and log a warning the first time it is seen.
    #[default]
    Warn,
    /// Fail with [`crate::Error::UnknownComponent`], checked before the first tick.
    Strict,
}

/// How the coordinator advances components within one global tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Stepping {
    /// Every component takes exactly one native step per tick. A component whose native step
    /// exceeds the tick runs ahead of the global clock.
    #[default]
    MinimumTimeStep,
    /// Every component takes native steps until its own time reaches the end of the tick.
    SubStep,
}

/// Options for a coupled solve.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SolveOptions {
    /// Variables to record. Default is every connector source, in first-seen order.
    pub save_vars: Vec<ConnectedVariable>,

    /// Handling of connector endpoints that name unknown components.
    pub lookup: LookupPolicy,

    pub stepping: Stepping,

    /// Global tick. Default is the smallest native time step over all components.
    pub time_step: Option<f64>,

    /// Initial value of the global clock, also written to each component's native time.
    /// Default is to leave native times untouched and start the clock at 0.
    pub start_time: Option<f64>,
}

impl SolveOptions {
    /// Record these variables instead of the default set.
    pub fn with_save_vars(mut self, save_vars: impl IntoIterator<Item = ConnectedVariable>) -> Self {
        self.save_vars = save_vars.into_iter().collect();
        self
    }

    pub fn with_lookup(mut self, lookup: LookupPolicy) -> Self {
        self.lookup = lookup;
        self
    }

    pub fn with_stepping(mut self, stepping: Stepping) -> Self {
        self.stepping = stepping;
        self
    }

    pub fn with_time_step(mut self, time_step: f64) -> Self {
        self.time_step = Some(time_step);
        self
    }

    pub fn with_start_time(mut self, start_time: f64) -> Self {
        self.start_time = Some(start_time);
        self
    }
}
