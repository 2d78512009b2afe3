//! Error types for the Pail simulation harness.
//!
//! Three families, by when they can occur: [`RegistryError`] and
//! [`ConfigurationError`] are setup-time and always fatal (they mean
//! the model description is wired wrong); [`SolveError`] aborts the
//! current nonlinear solve. There is no retry at this layer.

use std::error::Error;
use std::fmt;

/// What kind of entity a registry holds, for error messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityKind {
    /// A mesh shared between systems.
    Mesh,
    /// A system of coupled fields and coefficients.
    System,
    /// A field solved for within a system.
    Field,
    /// A coefficient supplied to or derived within a system.
    Coefficient,
    /// A function space held for coefficient interpolation.
    FunctionSpace,
    /// A named set of detector positions.
    DetectorSet,
    /// A symbol binding a name to a function state.
    Symbol,
    /// An alias from a derived symbol back to its base symbol.
    BaseSymbol,
    /// A nonlinear solver attached to a system.
    Solver,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Mesh => "mesh",
            Self::System => "system",
            Self::Field => "field",
            Self::Coefficient => "coefficient",
            Self::FunctionSpace => "function space",
            Self::DetectorSet => "detector set",
            Self::Symbol => "symbol",
            Self::BaseSymbol => "base symbol",
            Self::Solver => "solver",
        };
        write!(f, "{s}")
    }
}

/// Errors from name-keyed registry access.
///
/// Both variants indicate a wiring bug in the model description and
/// abort setup immediately; neither is recovered from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// A name was registered twice in the same registry.
    DuplicateName {
        /// What kind of registry rejected the name.
        kind: EntityKind,
        /// The colliding name.
        name: String,
    },
    /// A name was fetched that was never registered.
    NotFound {
        /// What kind of registry was searched.
        kind: EntityKind,
        /// The missing name.
        name: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateName { kind, name } => {
                write!(f, "{kind} named '{name}' already exists")
            }
            Self::NotFound { kind, name } => {
                write!(f, "{kind} named '{name}' does not exist")
            }
        }
    }
}

impl Error for RegistryError {}

/// Errors detected while validating or wiring the simulation setup.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigurationError {
    /// A field split references a field absent from its system.
    UnknownSplitField {
        /// Name of the split definition.
        split: String,
        /// The field name that could not be resolved.
        field: String,
    },
    /// The timestep is NaN, infinite, zero, or negative.
    InvalidTimestep {
        /// The invalid value.
        value: f64,
    },
    /// The finish time precedes the start time.
    FinishBeforeStart {
        /// Configured start time.
        start: f64,
        /// Configured finish time.
        finish: f64,
    },
    /// Zero nonlinear iterations were requested; every timestep must
    /// perform at least one solve pass.
    NoNonlinearIterations,
    /// A time-based dump period is NaN, infinite, zero, or negative,
    /// or a timestep-based period is zero.
    InvalidDumpPeriod {
        /// Which output stream carried the bad period.
        stream: String,
    },
    /// The steady-state tolerance is NaN, infinite, zero, or negative.
    InvalidSteadyStateTolerance {
        /// The invalid value.
        value: f64,
    },
    /// The symbol fill pass was run more than once.
    SymbolsAlreadyFilled,
    /// A form requested a coefficient whose symbol is registered but
    /// has no function bound yet.
    UnboundSymbol {
        /// The placeholder symbol.
        name: String,
    },
    /// A registry operation failed during setup.
    Registry(RegistryError),
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSplitField { split, field } => {
                write!(f, "field split '{split}' references unknown field '{field}'")
            }
            Self::InvalidTimestep { value } => {
                write!(f, "timestep must be finite and positive, got {value}")
            }
            Self::FinishBeforeStart { start, finish } => {
                write!(f, "finish time {finish} precedes start time {start}")
            }
            Self::NoNonlinearIterations => {
                write!(f, "at least one nonlinear iteration per timestep is required")
            }
            Self::InvalidDumpPeriod { stream } => {
                write!(f, "invalid dump period for stream '{stream}'")
            }
            Self::InvalidSteadyStateTolerance { value } => {
                write!(
                    f,
                    "steady state tolerance must be finite and positive, got {value}"
                )
            }
            Self::SymbolsAlreadyFilled => {
                write!(f, "symbol fill pass has already run")
            }
            Self::UnboundSymbol { name } => {
                write!(f, "symbol '{name}' is registered but has no function bound")
            }
            Self::Registry(e) => write!(f, "{e}"),
        }
    }
}

impl Error for ConfigurationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<RegistryError> for ConfigurationError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

/// Errors aborting the current nonlinear solve.
///
/// These originate in the external assembly/solver collaborators and
/// are not locally recoverable; any retry policy (reduced timestep,
/// solver switching) belongs to a caller above this layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SolveError {
    /// Form assembly failed.
    Assembly {
        /// Name of the form being assembled.
        form: String,
        /// Description of the failure.
        reason: String,
    },
    /// A boundary condition could not be applied.
    BoundaryCondition {
        /// Position of the condition in registration order.
        index: usize,
        /// Description of the failure.
        reason: String,
    },
    /// A distinct preconditioner form is configured but the solver
    /// supplied no preconditioner matrix to assemble into.
    MissingPreconditionerMatrix,
    /// The external nonlinear solver reported failure.
    Solver {
        /// Name of the failing solver.
        name: String,
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for SolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assembly { form, reason } => {
                write!(f, "assembly of form '{form}' failed: {reason}")
            }
            Self::BoundaryCondition { index, reason } => {
                write!(f, "boundary condition {index} failed: {reason}")
            }
            Self::MissingPreconditionerMatrix => {
                write!(
                    f,
                    "preconditioner form configured but no preconditioner matrix supplied"
                )
            }
            Self::Solver { name, reason } => {
                write!(f, "solver '{name}' failed: {reason}")
            }
        }
    }
}

impl Error for SolveError {}
