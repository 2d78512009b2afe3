//! Decides, per output stream, whether the current moment dumps.

use std::fmt;

use crate::config::{DumpConfig, DumpPeriod};

/// The four output streams with independent dump cadences.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputStream {
    /// Per-system visualization files.
    Visualization,
    /// The bucket-wide statistics file.
    Statistics,
    /// The steady-state change file.
    SteadyState,
    /// The detectors file.
    Detectors,
}

impl OutputStream {
    const ALL: [OutputStream; 4] = [
        OutputStream::Visualization,
        OutputStream::Statistics,
        OutputStream::SteadyState,
        OutputStream::Detectors,
    ];
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Visualization => "visualization",
            Self::Statistics => "statistics",
            Self::SteadyState => "steadystate",
            Self::Detectors => "detectors",
        };
        write!(f, "{s}")
    }
}

/// Per-stream dump state.
#[derive(Clone, Debug)]
struct StreamState {
    period: Option<DumpPeriod>,
    /// Simulation time of the last time-based dump, once one happened.
    last_dump_time: Option<f64>,
}

/// Tracks dump cadence for every output stream.
///
/// A query only mutates state (the stream's last dump time) when it
/// answers `true`; a `false` answer leaves the scheduler exactly as it
/// was, so re-querying is harmless.
#[derive(Clone, Debug)]
pub struct DumpScheduler {
    streams: [StreamState; 4],
}

impl DumpScheduler {
    /// Build a scheduler from validated per-stream periods.
    pub fn new(config: &DumpConfig) -> Self {
        let streams = OutputStream::ALL.map(|s| StreamState {
            period: config.period(s),
            last_dump_time: None,
        });
        Self { streams }
    }

    /// Whether `stream` dumps now.
    ///
    /// `current_time` and `start_time` drive time-based periods;
    /// `timestep_count` drives count-based periods. A stream with no
    /// period always dumps.
    pub fn should_dump(
        &mut self,
        stream: OutputStream,
        current_time: f64,
        start_time: f64,
        timestep_count: u64,
    ) -> bool {
        let state = &mut self.streams[stream as usize];
        match state.period {
            None => true,
            Some(DumpPeriod::Time(period)) => {
                if current_time == start_time {
                    state.last_dump_time = Some(current_time);
                    return true;
                }
                let last = state.last_dump_time.unwrap_or(start_time);
                if current_time - last > period {
                    state.last_dump_time = Some(current_time);
                    true
                } else {
                    false
                }
            }
            Some(DumpPeriod::TimestepInterval(period)) => {
                // TODO: this reads as period % count; decide whether it
                // should be count % period. Changing it alters every
                // existing run's dump cadence, so it stays for now.
                timestep_count == 0 || period % timestep_count == 0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time_scheduler(period: f64) -> DumpScheduler {
        DumpScheduler::new(&DumpConfig {
            statistics: Some(DumpPeriod::Time(period)),
            ..DumpConfig::default()
        })
    }

    #[test]
    fn no_period_always_dumps() {
        let mut sched = DumpScheduler::new(&DumpConfig::default());
        for n in 0..5 {
            assert!(sched.should_dump(OutputStream::Statistics, n as f64, 0.0, n));
        }
    }

    #[test]
    fn time_period_requires_strictly_more_than_period_elapsed() {
        let mut sched = time_scheduler(1.0);
        // Initial output at the start time always dumps.
        assert!(sched.should_dump(OutputStream::Statistics, 0.0, 0.0, 0));
        assert!(!sched.should_dump(OutputStream::Statistics, 0.5, 0.0, 1));
        // Exactly one period elapsed is not enough.
        assert!(!sched.should_dump(OutputStream::Statistics, 1.0, 0.0, 2));
        assert!(sched.should_dump(OutputStream::Statistics, 1.5, 0.0, 3));
        // The last dump time advanced to 1.5.
        assert!(!sched.should_dump(OutputStream::Statistics, 2.0, 0.0, 4));
        assert!(sched.should_dump(OutputStream::Statistics, 3.0, 0.0, 5));
    }

    #[test]
    fn false_answer_leaves_state_unchanged() {
        let mut sched = time_scheduler(1.0);
        assert!(sched.should_dump(OutputStream::Statistics, 0.0, 0.0, 0));
        // Repeated false queries never advance the last dump time.
        for _ in 0..3 {
            assert!(!sched.should_dump(OutputStream::Statistics, 0.9, 0.0, 1));
        }
        assert!(sched.should_dump(OutputStream::Statistics, 1.1, 0.0, 2));
    }

    #[test]
    fn streams_are_independent() {
        let mut sched = DumpScheduler::new(&DumpConfig {
            statistics: Some(DumpPeriod::Time(10.0)),
            ..DumpConfig::default()
        });
        assert!(sched.should_dump(OutputStream::Statistics, 0.0, 0.0, 0));
        assert!(!sched.should_dump(OutputStream::Statistics, 1.0, 0.0, 1));
        // Visualization has no period and keeps dumping.
        assert!(sched.should_dump(OutputStream::Visualization, 1.0, 0.0, 1));
    }

    #[test]
    fn timestep_interval_divides_the_period() {
        let mut sched = DumpScheduler::new(&DumpConfig {
            detectors: Some(DumpPeriod::TimestepInterval(6)),
            ..DumpConfig::default()
        });
        // Count 0 (initial output) dumps.
        assert!(sched.should_dump(OutputStream::Detectors, 0.0, 0.0, 0));
        // Dumps exactly when the count divides the period.
        assert!(sched.should_dump(OutputStream::Detectors, 0.1, 0.0, 1));
        assert!(sched.should_dump(OutputStream::Detectors, 0.2, 0.0, 2));
        assert!(sched.should_dump(OutputStream::Detectors, 0.3, 0.0, 3));
        assert!(!sched.should_dump(OutputStream::Detectors, 0.4, 0.0, 4));
        assert!(!sched.should_dump(OutputStream::Detectors, 0.5, 0.0, 5));
        assert!(sched.should_dump(OutputStream::Detectors, 0.6, 0.0, 6));
        assert!(!sched.should_dump(OutputStream::Detectors, 0.7, 0.0, 7));
    }
}
