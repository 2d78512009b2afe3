//! The run loop: solve, advance, output, check, accept.
//!
//! One timestep is: a fixed number of nonlinear solve passes over
//! every system, advance time, dump whatever the scheduler says is
//! due, evaluate completion against the *un-accepted* state, then
//! accept the state. The completion check deliberately precedes the
//! update so the steady-state comparison sees the old state before it
//! is overwritten; the update runs even on the final timestep, leaving
//! the bucket consistent for checkpointing.

use std::error::Error;
use std::fmt;
use std::io;

use pail_core::SolveError;

use crate::bucket::Bucket;
use crate::cancel::CancelToken;
use crate::schedule::OutputStream;

/// Errors terminating a run.
#[derive(Debug)]
pub enum RunError {
    /// A system's nonlinear solve failed.
    Solve(SolveError),
    /// A diagnostics or visualization write failed.
    Diagnostics(io::Error),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Solve(e) => write!(f, "nonlinear solve failed: {e}"),
            Self::Diagnostics(e) => write!(f, "diagnostic output failed: {e}"),
        }
    }
}

impl Error for RunError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Solve(e) => Some(e),
            Self::Diagnostics(e) => Some(e),
        }
    }
}

impl From<SolveError> for RunError {
    fn from(e: SolveError) -> Self {
        Self::Solve(e)
    }
}

impl From<io::Error> for RunError {
    fn from(e: io::Error) -> Self {
        Self::Diagnostics(e)
    }
}

impl Bucket {
    /// Drive the timeloop to completion.
    ///
    /// Writes headers and the initial output, then repeats timesteps
    /// until the finish time is reached, a steady state is attained,
    /// or `cancel` fires. Cancellation is polled once per timestep, so
    /// an in-flight timestep always completes and dumps. At least one
    /// timestep always runs.
    ///
    /// # Errors
    ///
    /// [`RunError`] on the first solve or output failure.
    pub fn run(&mut self, cancel: &CancelToken) -> Result<(), RunError> {
        self.write_headers()?;
        self.output()?;
        log::info!("entering timeloop for bucket '{}'", self.name);
        loop {
            log::info!(
                "timestep {} (t = {})",
                self.timestep_count + 1,
                self.current_time + self.timestep
            );
            for pass in 0..self.nonlinear_iterations {
                self.iteration_count = pass;
                self.solve()?;
            }
            self.current_time += self.timestep;
            self.timestep_count += 1;
            self.output()?;
            let complete = self.complete(cancel);
            self.update();
            if complete {
                break;
            }
        }
        log::info!(
            "finished timeloop for bucket '{}' after {} timesteps",
            self.name,
            self.timestep_count
        );
        Ok(())
    }

    /// Run one nonlinear solve pass over every system, in order.
    ///
    /// # Errors
    ///
    /// The first [`SolveError`] any system reports.
    pub fn solve(&mut self) -> Result<(), SolveError> {
        for (_, system) in self.systems.iter() {
            system.borrow_mut().solve()?;
        }
        Ok(())
    }

    /// Accept every system's iterated state.
    pub fn update(&mut self) {
        for (_, system) in self.systems.iter() {
            system.borrow_mut().update();
        }
    }

    /// Whether every system's largest change is below the tolerance.
    ///
    /// Always `false` when no tolerance is configured.
    pub fn steady_state_attained(&self) -> bool {
        let Some(tol) = self.steadystate_tol else {
            return false;
        };
        let mut max_change = 0.0f64;
        for (name, system) in self.systems.iter() {
            let change = system.borrow().max_change();
            log::debug!("system '{name}' max change {change}");
            max_change = max_change.max(change);
        }
        log::info!("maximum change over all systems: {max_change}");
        max_change < tol
    }

    fn complete(&self, cancel: &CancelToken) -> bool {
        let mut complete = false;
        if self.current_time >= self.finish_time {
            log::info!("finish time {} reached", self.finish_time);
            complete = true;
        }
        if self.steady_state_attained() {
            log::info!("steady state attained");
            complete = true;
        }
        if cancel.is_cancelled() {
            log::warn!("cancellation requested, terminating after this timestep");
            complete = true;
        }
        complete
    }

    /// Write every attached file's header, exactly once.
    ///
    /// # Errors
    ///
    /// Any I/O error from a header write.
    pub fn write_headers(&mut self) -> io::Result<()> {
        if self.headers_written {
            return Ok(());
        }
        for file in [
            self.statistics_file.clone(),
            self.steadystate_file.clone(),
            self.detectors_file.clone(),
        ]
        .into_iter()
        .flatten()
        {
            file.borrow_mut().write_header(self)?;
        }
        self.headers_written = true;
        Ok(())
    }

    /// Dump whatever is due on each output stream.
    ///
    /// Stream order is statistics, detectors, steady-state, then
    /// per-system visualization. The steady-state file is skipped
    /// before the first timestep completes, since there is no previous
    /// state to compare against.
    ///
    /// # Errors
    ///
    /// Any I/O error from a write.
    pub fn output(&mut self) -> io::Result<()> {
        let (t, t0, n) = (self.current_time, self.start_time, self.timestep_count);
        let dump_statistics = self
            .scheduler
            .should_dump(OutputStream::Statistics, t, t0, n);
        let dump_detectors = self.scheduler.should_dump(OutputStream::Detectors, t, t0, n);
        let dump_steadystate = self
            .scheduler
            .should_dump(OutputStream::SteadyState, t, t0, n);
        let dump_visualization = self
            .scheduler
            .should_dump(OutputStream::Visualization, t, t0, n);

        if dump_statistics {
            if let Some(file) = self.statistics_file.clone() {
                file.borrow_mut().write_data(self)?;
            }
        }
        if dump_detectors {
            if let Some(file) = self.detectors_file.clone() {
                file.borrow_mut().write_data(self)?;
            }
        }
        if dump_steadystate && n > 0 {
            if let Some(file) = self.steadystate_file.clone() {
                file.borrow_mut().write_data(self)?;
            }
        }
        if dump_visualization {
            for (_, system) in self.systems.iter() {
                system.borrow().write_visualization()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use pail_core::{
        BilinearForm, BilinearFormRef, FormCoefficients, FunctionRef, LinearForm, LinearFormRef,
        Matrix, Vector,
    };

    use crate::callbacks::{CallbackContext, NonlinearSolver};
    use crate::config::{DumpConfig, TimestepConfig};
    use crate::diagnostics::DiagnosticsFile;
    use crate::system::System;

    struct NullForm;

    impl FormCoefficients for NullForm {
        fn num_coefficients(&self) -> usize {
            0
        }
        fn coefficient_name(&self, _i: usize) -> &str {
            unreachable!()
        }
        fn set_coefficient(&mut self, _name: &str, _function: FunctionRef) {}
    }

    impl LinearForm for NullForm {
        fn name(&self) -> &str {
            "null"
        }
        fn assemble_into(&self, target: &mut Vector, _reset_tensor: bool) -> Result<(), SolveError> {
            target.zero();
            Ok(())
        }
    }

    impl BilinearForm for NullForm {
        fn name(&self) -> &str {
            "null"
        }
        fn assemble_into(&self, target: &mut Matrix, _reset_tensor: bool) -> Result<(), SolveError> {
            target.zero();
            Ok(())
        }
    }

    fn null_context(iterated: FunctionRef) -> CallbackContext {
        let residual: LinearFormRef = Rc::new(RefCell::new(NullForm));
        let jacobian: BilinearFormRef = Rc::new(RefCell::new(NullForm));
        CallbackContext::new(iterated, residual, jacobian, Vec::new())
    }

    /// Counts invocations and otherwise leaves the unknown alone.
    struct CountingSolver {
        calls: Rc<RefCell<usize>>,
    }

    impl NonlinearSolver for CountingSolver {
        fn name(&self) -> &str {
            "counting"
        }
        fn solve(&mut self, _ctx: &CallbackContext, _unknown: &mut Vector) -> Result<(), SolveError> {
            *self.calls.borrow_mut() += 1;
            Ok(())
        }
    }

    /// Writes a fixed value into every entry of the unknown.
    struct ConstantSolver {
        value: f64,
    }

    impl NonlinearSolver for ConstantSolver {
        fn name(&self) -> &str {
            "constant"
        }
        fn solve(&mut self, _ctx: &CallbackContext, unknown: &mut Vector) -> Result<(), SolveError> {
            for v in unknown.as_mut_slice() {
                *v = self.value;
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct Counts {
        headers: usize,
        data: usize,
        closed: bool,
    }

    struct CountingFile {
        counts: Rc<RefCell<Counts>>,
    }

    impl DiagnosticsFile for CountingFile {
        fn write_header(&mut self, _bucket: &Bucket) -> io::Result<()> {
            self.counts.borrow_mut().headers += 1;
            Ok(())
        }
        fn write_data(&mut self, _bucket: &Bucket) -> io::Result<()> {
            self.counts.borrow_mut().data += 1;
            Ok(())
        }
        fn close(&mut self) -> io::Result<()> {
            self.counts.borrow_mut().closed = true;
            Ok(())
        }
    }

    fn config(finish_time: f64, iterations: u32, tol: Option<f64>) -> TimestepConfig {
        TimestepConfig {
            start_time: 0.0,
            finish_time,
            timestep: 0.5,
            timestep_symbol: None,
            nonlinear_iterations: iterations,
            steadystate_tol: tol,
        }
    }

    fn bucket_with_solver(
        cfg: TimestepConfig,
        solver: Box<dyn NonlinearSolver>,
    ) -> Bucket {
        let mut bucket = Bucket::new("model", cfg, &DumpConfig::default()).unwrap();
        let mut sys = System::new("heat", "T");
        sys.register_field("temperature", "T_f", 2).unwrap();
        let ctx = null_context(sys.iterated_function().clone());
        sys.attach_solver("solver", solver, ctx).unwrap();
        bucket.register_system(sys).unwrap();
        bucket
    }

    #[test]
    fn runs_until_the_finish_time() {
        let calls = Rc::new(RefCell::new(0));
        let mut bucket = bucket_with_solver(
            config(1.5, 1, None),
            Box::new(CountingSolver { calls: calls.clone() }),
        );
        let counts = Rc::new(RefCell::new(Counts::default()));
        bucket.set_statistics_file(Rc::new(RefCell::new(CountingFile {
            counts: counts.clone(),
        })));

        bucket.run(&CancelToken::new()).unwrap();

        assert_eq!(bucket.timestep_count(), 3);
        assert_eq!(bucket.current_time(), 1.5);
        assert_eq!(*calls.borrow(), 3);
        // One header, one initial output plus one per timestep.
        assert_eq!(counts.borrow().headers, 1);
        assert_eq!(counts.borrow().data, 4);
    }

    #[test]
    fn every_timestep_runs_the_configured_solve_passes() {
        let calls = Rc::new(RefCell::new(0));
        let mut bucket = bucket_with_solver(
            config(1.0, 3, None),
            Box::new(CountingSolver { calls: calls.clone() }),
        );
        bucket.run(&CancelToken::new()).unwrap();
        assert_eq!(bucket.timestep_count(), 2);
        assert_eq!(*calls.borrow(), 6);
    }

    #[test]
    fn update_runs_after_the_final_completion_check() {
        let mut bucket =
            bucket_with_solver(config(0.5, 1, None), Box::new(ConstantSolver { value: 5.0 }));
        bucket.run(&CancelToken::new()).unwrap();

        // The final timestep's state was accepted before returning.
        let sys = bucket.fetch_system("heat").unwrap();
        assert_eq!(sys.borrow().function().borrow().vector().as_slice(), &[5.0, 5.0]);
        assert_eq!(
            sys.borrow().old_function().borrow().vector().as_slice(),
            &[5.0, 5.0]
        );
    }

    #[test]
    fn steady_state_terminates_early() {
        // A no-op solver leaves the state unchanged, so the very first
        // timestep already satisfies any tolerance.
        let calls = Rc::new(RefCell::new(0));
        let mut bucket = bucket_with_solver(
            config(1000.0, 1, Some(1e-9)),
            Box::new(CountingSolver { calls: calls.clone() }),
        );
        bucket.run(&CancelToken::new()).unwrap();
        assert_eq!(bucket.timestep_count(), 1);
    }

    #[test]
    fn no_tolerance_never_reads_as_steady() {
        let mut bucket = bucket_with_solver(
            config(2.0, 1, None),
            Box::new(ConstantSolver { value: 0.0 }),
        );
        assert!(!bucket.steady_state_attained());
        bucket.run(&CancelToken::new()).unwrap();
        assert_eq!(bucket.timestep_count(), 4);
    }

    #[test]
    fn cancellation_finishes_the_in_flight_timestep() {
        let counts = Rc::new(RefCell::new(Counts::default()));
        let mut bucket = bucket_with_solver(
            config(1000.0, 1, None),
            Box::new(ConstantSolver { value: 1.0 }),
        );
        bucket.set_statistics_file(Rc::new(RefCell::new(CountingFile {
            counts: counts.clone(),
        })));

        let cancel = CancelToken::new();
        cancel.cancel();
        bucket.run(&cancel).unwrap();

        // Exactly one full timestep ran and dumped.
        assert_eq!(bucket.timestep_count(), 1);
        assert_eq!(counts.borrow().data, 2);
    }

    #[test]
    fn steadystate_file_skips_the_initial_output() {
        let stats = Rc::new(RefCell::new(Counts::default()));
        let steady = Rc::new(RefCell::new(Counts::default()));
        let mut bucket = bucket_with_solver(
            config(1.0, 1, None),
            Box::new(ConstantSolver { value: 0.0 }),
        );
        bucket.set_statistics_file(Rc::new(RefCell::new(CountingFile {
            counts: stats.clone(),
        })));
        bucket.set_steadystate_file(Rc::new(RefCell::new(CountingFile {
            counts: steady.clone(),
        })));

        bucket.run(&CancelToken::new()).unwrap();

        assert_eq!(bucket.timestep_count(), 2);
        assert_eq!(stats.borrow().data, 3);
        // No previous state exists at the initial output.
        assert_eq!(steady.borrow().data, 2);
    }

    #[test]
    fn solver_failure_aborts_the_run() {
        struct FailingSolver;
        impl NonlinearSolver for FailingSolver {
            fn name(&self) -> &str {
                "failing"
            }
            fn solve(
                &mut self,
                _ctx: &CallbackContext,
                _unknown: &mut Vector,
            ) -> Result<(), SolveError> {
                Err(SolveError::Solver {
                    name: "failing".to_string(),
                    reason: "diverged".to_string(),
                })
            }
        }

        let mut bucket = bucket_with_solver(config(1.0, 1, None), Box::new(FailingSolver));
        match bucket.run(&CancelToken::new()) {
            Err(RunError::Solve(SolveError::Solver { name, .. })) => assert_eq!(name, "failing"),
            other => panic!("expected solver failure, got {other:?}"),
        }
    }

    #[test]
    fn headers_write_exactly_once_across_runs() {
        let counts = Rc::new(RefCell::new(Counts::default()));
        let mut bucket = bucket_with_solver(
            config(0.5, 1, None),
            Box::new(ConstantSolver { value: 0.0 }),
        );
        bucket.set_statistics_file(Rc::new(RefCell::new(CountingFile {
            counts: counts.clone(),
        })));

        bucket.write_headers().unwrap();
        bucket.write_headers().unwrap();
        assert_eq!(counts.borrow().headers, 1);
    }
}
