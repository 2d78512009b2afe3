//! Pail: an orchestration harness for multi-system nonlinear PDE
//! timestepping.
//!
//! A model registers its meshes, systems, fields, and coefficients
//! into a [`Bucket`], runs the symbol fill pass so forms can resolve
//! function states by name, and then drives the timeloop with
//! [`Bucket::run`]. The finite-element assembly, boundary conditions,
//! and the nonlinear solver itself live behind traits; this crate
//! supplies the wiring, scheduling, and state management around them.
//!
//! The crate is a facade: everything here re-exports from
//! [`pail_core`] (registries, symbols, collaborator traits) and
//! [`pail_engine`] (the bucket, timeloop, callbacks, field splits).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub use pail_core::{
    iterated_symbol, old_symbol, BcRef, BilinearForm, BilinearFormRef, BoundaryCondition,
    CoefficientExpression, ConfigurationError, EntityKind, ExpressionRef, FormCoefficients,
    Function, FunctionRef, FunctionSpace, FunctionSpaceRef, LinearForm, LinearFormRef, Matrix,
    Mesh, MeshRef, Registry, RegistryError, SolveError, SymbolEntry, SymbolRegistry, Vector,
};

pub use pail_engine::{
    build_root_split, build_split, Bucket, CallbackContext, CancelToken, DetectorSet,
    DiagnosticsFile, DiagnosticsFileRef, DumpConfig, DumpPeriod, DumpScheduler, FunctionBucket,
    IndexSetNode, NonlinearSolver, NonlinearUpdate, OutputStream, RunError, SparsityFlag,
    SplitSpec, System, SystemRef, TimestepConfig, VisualizationWriter, VisualizationWriterRef,
};
