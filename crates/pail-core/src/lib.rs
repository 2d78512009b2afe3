//! Core types and traits for the Pail simulation harness.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the name-keyed registries, the symbol table that resolves field and
//! coefficient states, the dense vector/matrix value types the solver
//! callbacks operate on, and the traits behind which the external
//! finite-element and solver libraries sit.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod function;
pub mod linalg;
pub mod mesh;
pub mod registry;
pub mod symbol;
pub mod traits;

pub use error::{ConfigurationError, EntityKind, RegistryError, SolveError};
pub use function::{Function, FunctionRef};
pub use linalg::{Matrix, Vector};
pub use mesh::{FunctionSpace, FunctionSpaceRef, Mesh, MeshRef};
pub use registry::Registry;
pub use symbol::{iterated_symbol, old_symbol, SymbolEntry, SymbolRegistry};
pub use traits::{
    BcRef, BilinearForm, BilinearFormRef, BoundaryCondition, CoefficientExpression,
    ExpressionRef, FormCoefficients, LinearForm, LinearFormRef,
};
