//! Timestepping and output configuration.
//!
//! Validation happens once, at [`Bucket`](crate::bucket::Bucket)
//! construction; after that the run loop trusts every value here.

use pail_core::ConfigurationError;

use crate::schedule::OutputStream;

/// Timestepping parameters for a run.
#[derive(Clone, Debug, PartialEq)]
pub struct TimestepConfig {
    /// Simulation time at which the run starts.
    pub start_time: f64,
    /// Simulation time at or beyond which the run completes.
    pub finish_time: f64,
    /// Fixed timestep size.
    pub timestep: f64,
    /// Symbol under which the timestep value is published, if any.
    ///
    /// When set, forms can reference the timestep as a single-entry
    /// coefficient under this name.
    pub timestep_symbol: Option<String>,
    /// Fixed number of nonlinear solve passes per timestep.
    pub nonlinear_iterations: u32,
    /// Steady-state tolerance; `None` disables early termination.
    pub steadystate_tol: Option<f64>,
}

impl TimestepConfig {
    /// Check the configuration for contradictions.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::InvalidTimestep`] for a non-finite or
    /// non-positive timestep, [`ConfigurationError::FinishBeforeStart`]
    /// if the finish time precedes the start time,
    /// [`ConfigurationError::NoNonlinearIterations`] for zero solve
    /// passes, and [`ConfigurationError::InvalidSteadyStateTolerance`]
    /// for a non-finite or non-positive tolerance.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(ConfigurationError::InvalidTimestep {
                value: self.timestep,
            });
        }
        if self.finish_time < self.start_time {
            return Err(ConfigurationError::FinishBeforeStart {
                start: self.start_time,
                finish: self.finish_time,
            });
        }
        if self.nonlinear_iterations == 0 {
            return Err(ConfigurationError::NoNonlinearIterations);
        }
        if let Some(tol) = self.steadystate_tol {
            if !tol.is_finite() || tol <= 0.0 {
                return Err(ConfigurationError::InvalidSteadyStateTolerance { value: tol });
            }
        }
        Ok(())
    }
}

/// How often one output stream dumps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DumpPeriod {
    /// Dump when more than this much simulation time has elapsed since
    /// the previous dump.
    Time(f64),
    /// Dump every this many completed timesteps.
    TimestepInterval(u64),
}

/// Per-stream dump periods.
///
/// `None` for a stream means dump at every opportunity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DumpConfig {
    /// Period for per-system visualization output.
    pub visualization: Option<DumpPeriod>,
    /// Period for the statistics file.
    pub statistics: Option<DumpPeriod>,
    /// Period for the steady-state file.
    pub steadystate: Option<DumpPeriod>,
    /// Period for the detectors file.
    pub detectors: Option<DumpPeriod>,
}

impl DumpConfig {
    /// Check every configured period.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::InvalidDumpPeriod`] naming the offending
    /// stream for a non-finite or non-positive time period, or a zero
    /// timestep interval.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for (stream, period) in [
            (OutputStream::Visualization, &self.visualization),
            (OutputStream::Statistics, &self.statistics),
            (OutputStream::SteadyState, &self.steadystate),
            (OutputStream::Detectors, &self.detectors),
        ] {
            let valid = match period {
                None => true,
                Some(DumpPeriod::Time(p)) => p.is_finite() && *p > 0.0,
                Some(DumpPeriod::TimestepInterval(k)) => *k > 0,
            };
            if !valid {
                return Err(ConfigurationError::InvalidDumpPeriod {
                    stream: stream.to_string(),
                });
            }
        }
        Ok(())
    }

    /// The period configured for `stream`.
    pub fn period(&self, stream: OutputStream) -> Option<DumpPeriod> {
        match stream {
            OutputStream::Visualization => self.visualization,
            OutputStream::Statistics => self.statistics,
            OutputStream::SteadyState => self.steadystate,
            OutputStream::Detectors => self.detectors,
        }
    }
}
