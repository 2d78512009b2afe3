//! Trait seams for the external FEM and solver collaborators.
//!
//! The harness never assembles a form or evaluates an expression
//! itself; it drives these traits. Test doubles implement them with a
//! few lines, and a real backend wraps its library objects the same
//! way.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::SolveError;
use crate::function::{Function, FunctionRef};
use crate::linalg::{Matrix, Vector};

/// Shared handle to a linear (residual) form.
pub type LinearFormRef = Rc<RefCell<dyn LinearForm>>;

/// Shared handle to a bilinear (Jacobian) form.
pub type BilinearFormRef = Rc<RefCell<dyn BilinearForm>>;

/// Shared handle to a boundary condition.
pub type BcRef = Rc<dyn BoundaryCondition>;

/// Shared handle to a coefficient expression.
pub type ExpressionRef = Rc<dyn CoefficientExpression>;

/// Coefficient plumbing common to linear and bilinear forms.
///
/// A form declares the (possibly derived) symbols of the coefficients
/// it needs; the bucket resolves each symbol and attaches the matching
/// function state.
pub trait FormCoefficients {
    /// Number of coefficients this form requires.
    fn num_coefficients(&self) -> usize;

    /// Symbol of coefficient `i`; may carry a `_n`/`_i` suffix.
    fn coefficient_name(&self, i: usize) -> &str;

    /// Attach `function` as the coefficient registered under `name`.
    fn set_coefficient(&mut self, name: &str, function: FunctionRef);
}

/// A linear form assembled into a vector (the residual).
pub trait LinearForm: FormCoefficients {
    /// The form's name, for error reporting.
    fn name(&self) -> &str;

    /// Assemble into `target`.
    ///
    /// The harness always passes `reset_tensor = false`: the target
    /// keeps its storage and the assembly accumulates into it after
    /// zeroing the values, never re-deriving the sparsity.
    fn assemble_into(&self, target: &mut Vector, reset_tensor: bool) -> Result<(), SolveError>;
}

/// A bilinear form assembled into a matrix (the Jacobian or its
/// preconditioner).
pub trait BilinearForm: FormCoefficients {
    /// The form's name, for error reporting.
    fn name(&self) -> &str;

    /// Assemble into `target`; `reset_tensor` as for [`LinearForm`].
    fn assemble_into(&self, target: &mut Matrix, reset_tensor: bool) -> Result<(), SolveError>;
}

/// A boundary condition applied after assembly.
///
/// Applying conditions post-assembly lets one set of forms be reused
/// with different condition sets; Dirichlet-type application this way
/// does not preserve matrix symmetry.
pub trait BoundaryCondition {
    /// Apply to an assembled residual vector, given the current iterate.
    fn apply_vector(&self, vector: &mut Vector, iterate: &Vector) -> Result<(), SolveError>;

    /// Apply to an assembled matrix.
    fn apply_matrix(&self, matrix: &mut Matrix) -> Result<(), SolveError>;
}

/// A coefficient expression depending on the iterated state.
///
/// Re-evaluated inside every solver callback so nonlinear coefficients
/// track the solver's current iterate.
pub trait CoefficientExpression {
    /// Evaluate against the owning system's iterated function.
    fn evaluate(&self, system_iterated: &Function) -> Vector;
}
