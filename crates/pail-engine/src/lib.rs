//! Orchestration engine for multi-system nonlinear PDE timestepping.
//!
//! Provides the [`Bucket`](bucket::Bucket) — the simulation root that
//! owns every registry and drives the timeloop — plus dump scheduling,
//! the nonlinear-solver callback context, and recursive field-split
//! construction for nested block preconditioners.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bucket;
pub mod callbacks;
pub mod cancel;
pub mod config;
pub mod diagnostics;
pub mod fieldsplit;
pub mod schedule;
pub mod system;
pub mod timeloop;

pub use bucket::Bucket;
pub use callbacks::{CallbackContext, NonlinearSolver, NonlinearUpdate, SparsityFlag};
pub use cancel::CancelToken;
pub use config::{DumpConfig, DumpPeriod, TimestepConfig};
pub use diagnostics::{
    DetectorSet, DiagnosticsFile, DiagnosticsFileRef, VisualizationWriter, VisualizationWriterRef,
};
pub use fieldsplit::{build_root_split, build_split, IndexSetNode, SplitSpec};
pub use schedule::{DumpScheduler, OutputStream};
pub use system::{FunctionBucket, System, SystemRef};
pub use timeloop::RunError;
