//! The nonlinear solver's residual and Jacobian callbacks.
//!
//! A [`CallbackContext`] is a self-contained capability object: it
//! holds shared handles to exactly the state a callback touches (the
//! system's iterated function, the nonlinear coefficient updates, the
//! forms and boundary conditions) and nothing else. The solver drives
//! it through [`residual`](CallbackContext::residual) and
//! [`jacobian`](CallbackContext::jacobian) without ever seeing the
//! bucket.

use pail_core::{
    BcRef, BilinearFormRef, ExpressionRef, FunctionRef, LinearFormRef, Matrix, SolveError, Vector,
};

/// How the assembled matrix's sparsity relates to the previous call.
///
/// Storage is preallocated once and every assembly accumulates in
/// place, so the pattern never changes between calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SparsityFlag {
    /// The nonzero pattern is identical to the previous assembly.
    SamePattern,
}

/// One nonlinear coefficient to refresh inside every callback.
///
/// `expression` is evaluated against `source` (the owning system's
/// iterated function) and the result overwrites `target` (the
/// coefficient's iterated state), so coefficients depending on the
/// solution track the solver's current iterate.
#[derive(Clone)]
pub struct NonlinearUpdate {
    /// The coefficient state being refreshed.
    pub target: FunctionRef,
    /// The function the expression reads.
    pub source: FunctionRef,
    /// The expression producing the coefficient's values.
    pub expression: ExpressionRef,
}

/// Everything a residual or Jacobian evaluation needs.
pub struct CallbackContext {
    iterated: FunctionRef,
    nonlinear_updates: Vec<NonlinearUpdate>,
    residual_form: LinearFormRef,
    jacobian_form: BilinearFormRef,
    jacobian_pc_form: Option<BilinearFormRef>,
    bcs: Vec<BcRef>,
    ident_zeros: bool,
    ident_zeros_pc: bool,
}

impl CallbackContext {
    /// Create a context over a system's iterated function and forms.
    pub fn new(
        iterated: FunctionRef,
        residual_form: LinearFormRef,
        jacobian_form: BilinearFormRef,
        bcs: Vec<BcRef>,
    ) -> Self {
        Self {
            iterated,
            nonlinear_updates: Vec::new(),
            residual_form,
            jacobian_form,
            jacobian_pc_form: None,
            bcs,
            ident_zeros: false,
            ident_zeros_pc: false,
        }
    }

    /// Assemble a distinct preconditioner matrix from `form`.
    pub fn with_preconditioner_form(mut self, form: BilinearFormRef) -> Self {
        self.jacobian_pc_form = Some(form);
        self
    }

    /// Enable the zero-row identity fix-up on the Jacobian and, if a
    /// distinct preconditioner form is configured, on its matrix.
    pub fn with_ident_zeros(mut self, jacobian: bool, preconditioner: bool) -> Self {
        self.ident_zeros = jacobian;
        self.ident_zeros_pc = preconditioner;
        self
    }

    /// Attach the coefficient refreshes to run inside every callback.
    pub fn with_nonlinear_updates(mut self, updates: Vec<NonlinearUpdate>) -> Self {
        self.nonlinear_updates = updates;
        self
    }

    /// Alias the solver's iterate into the iterated function and
    /// refresh every nonlinear coefficient against it.
    fn synchronize(&self, x: &Vector) {
        self.iterated.borrow_mut().assign(x);
        for update in &self.nonlinear_updates {
            let values = update.expression.evaluate(&update.source.borrow());
            update.target.borrow_mut().assign(&values);
        }
    }

    /// Evaluate the residual at iterate `x` into `out`.
    ///
    /// Synchronizes state, assembles the residual form without
    /// resetting the tensor, then applies every boundary condition in
    /// registration order.
    ///
    /// # Errors
    ///
    /// [`SolveError`] from assembly or a boundary condition.
    pub fn residual(&self, x: &Vector, out: &mut Vector) -> Result<(), SolveError> {
        self.synchronize(x);
        let form = self.residual_form.borrow();
        log::debug!("assembling residual form '{}'", form.name());
        form.assemble_into(out, false)?;
        for bc in &self.bcs {
            bc.apply_vector(out, x)?;
        }
        Ok(())
    }

    /// Evaluate the Jacobian at iterate `x` into `matrix` and, when a
    /// distinct preconditioner form is configured, into `matrix_pc`.
    ///
    /// Synchronizes state exactly as [`residual`](Self::residual),
    /// assembles without resetting tensors, applies boundary
    /// conditions in registration order, then runs the zero-row
    /// identity fix-up where enabled.
    ///
    /// # Errors
    ///
    /// [`SolveError::MissingPreconditionerMatrix`] if a preconditioner
    /// form is configured but `matrix_pc` is `None`; otherwise any
    /// [`SolveError`] from assembly or a boundary condition.
    pub fn jacobian(
        &self,
        x: &Vector,
        matrix: &mut Matrix,
        matrix_pc: Option<&mut Matrix>,
    ) -> Result<SparsityFlag, SolveError> {
        self.synchronize(x);

        let form = self.jacobian_form.borrow();
        log::debug!("assembling jacobian form '{}'", form.name());
        form.assemble_into(matrix, false)?;
        for bc in &self.bcs {
            bc.apply_matrix(matrix)?;
        }
        if self.ident_zeros {
            matrix.ident_zeros();
        }

        if let Some(pc_form) = &self.jacobian_pc_form {
            let pc = matrix_pc.ok_or(SolveError::MissingPreconditionerMatrix)?;
            let pc_form = pc_form.borrow();
            log::debug!("assembling preconditioner form '{}'", pc_form.name());
            pc_form.assemble_into(pc, false)?;
            for bc in &self.bcs {
                bc.apply_matrix(pc)?;
            }
            if self.ident_zeros_pc {
                pc.ident_zeros();
            }
        }

        Ok(SparsityFlag::SamePattern)
    }
}

/// The external nonlinear solver seam.
///
/// A solver receives the callback context and the unknown vector (a
/// copy of the iterated state); on success the harness copies the
/// unknown back into the iterated function.
pub trait NonlinearSolver {
    /// The solver's name, for error reporting and logs.
    fn name(&self) -> &str;

    /// Drive the callbacks until convergence, leaving the solution in
    /// `unknown`.
    ///
    /// # Errors
    ///
    /// [`SolveError`] when the solve diverges or a callback fails.
    fn solve(&mut self, ctx: &CallbackContext, unknown: &mut Vector) -> Result<(), SolveError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    use pail_core::{
        BilinearForm, BoundaryCondition, CoefficientExpression, FormCoefficients, Function,
        LinearForm,
    };

    struct ConstForm {
        name: String,
        value: f64,
    }

    impl FormCoefficients for ConstForm {
        fn num_coefficients(&self) -> usize {
            0
        }
        fn coefficient_name(&self, _i: usize) -> &str {
            unreachable!()
        }
        fn set_coefficient(&mut self, _name: &str, _function: FunctionRef) {}
    }

    impl LinearForm for ConstForm {
        fn name(&self) -> &str {
            &self.name
        }
        fn assemble_into(&self, target: &mut Vector, _reset_tensor: bool) -> Result<(), SolveError> {
            target.zero();
            for i in 0..target.len() {
                target.add(i, self.value);
            }
            Ok(())
        }
    }

    struct DiagonalForm {
        name: String,
        diagonal: Vec<f64>,
    }

    impl FormCoefficients for DiagonalForm {
        fn num_coefficients(&self) -> usize {
            0
        }
        fn coefficient_name(&self, _i: usize) -> &str {
            unreachable!()
        }
        fn set_coefficient(&mut self, _name: &str, _function: FunctionRef) {}
    }

    impl BilinearForm for DiagonalForm {
        fn name(&self) -> &str {
            &self.name
        }
        fn assemble_into(&self, target: &mut Matrix, _reset_tensor: bool) -> Result<(), SolveError> {
            target.zero();
            for (i, v) in self.diagonal.iter().enumerate() {
                target.set(i, i, *v);
            }
            Ok(())
        }
    }

    struct RecordingBc {
        id: usize,
        log: Rc<RefCell<Vec<usize>>>,
    }

    impl BoundaryCondition for RecordingBc {
        fn apply_vector(&self, _vector: &mut Vector, _iterate: &Vector) -> Result<(), SolveError> {
            self.log.borrow_mut().push(self.id);
            Ok(())
        }
        fn apply_matrix(&self, _matrix: &mut Matrix) -> Result<(), SolveError> {
            self.log.borrow_mut().push(self.id);
            Ok(())
        }
    }

    struct Doubler;

    impl CoefficientExpression for Doubler {
        fn evaluate(&self, system_iterated: &Function) -> Vector {
            let doubled: Vec<f64> = system_iterated
                .vector()
                .as_slice()
                .iter()
                .map(|v| 2.0 * v)
                .collect();
            Vector::from_values(doubled)
        }
    }

    fn residual_form(value: f64) -> LinearFormRef {
        Rc::new(RefCell::new(ConstForm {
            name: "residual".to_string(),
            value,
        }))
    }

    fn jacobian_form(diagonal: Vec<f64>) -> BilinearFormRef {
        Rc::new(RefCell::new(DiagonalForm {
            name: "jacobian".to_string(),
            diagonal,
        }))
    }

    fn context(len: usize) -> (CallbackContext, FunctionRef) {
        let iterated = Function::new("u_i", len).into_shared();
        let ctx = CallbackContext::new(
            iterated.clone(),
            residual_form(1.0),
            jacobian_form(vec![1.0; len]),
            Vec::new(),
        );
        (ctx, iterated)
    }

    #[test]
    fn residual_aliases_iterate_into_iterated_function() {
        let (ctx, iterated) = context(3);
        let x = Vector::from_values(vec![4.0, 5.0, 6.0]);
        let mut out = Vector::zeros(3);
        ctx.residual(&x, &mut out).unwrap();
        assert_eq!(iterated.borrow().vector().as_slice(), x.as_slice());
        assert_eq!(out.as_slice(), &[1.0, 1.0, 1.0]);
    }

    #[test]
    fn nonlinear_coefficients_track_the_iterate() {
        let iterated = Function::new("u_i", 2).into_shared();
        let coefficient = Function::new("kappa_i", 2).into_shared();
        let ctx = CallbackContext::new(
            iterated.clone(),
            residual_form(0.0),
            jacobian_form(vec![1.0, 1.0]),
            Vec::new(),
        )
        .with_nonlinear_updates(vec![NonlinearUpdate {
            target: coefficient.clone(),
            source: iterated,
            expression: Rc::new(Doubler),
        }]);

        let mut out = Vector::zeros(2);
        ctx.residual(&Vector::from_values(vec![1.5, -2.0]), &mut out)
            .unwrap();
        assert_eq!(coefficient.borrow().vector().as_slice(), &[3.0, -4.0]);
    }

    #[test]
    fn boundary_conditions_apply_in_registration_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let bcs: Vec<BcRef> = (0..3)
            .map(|id| {
                Rc::new(RecordingBc {
                    id,
                    log: log.clone(),
                }) as BcRef
            })
            .collect();
        let iterated = Function::new("u_i", 2).into_shared();
        let ctx = CallbackContext::new(
            iterated,
            residual_form(0.0),
            jacobian_form(vec![1.0, 1.0]),
            bcs,
        );

        let x = Vector::zeros(2);
        let mut out = Vector::zeros(2);
        ctx.residual(&x, &mut out).unwrap();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);

        log.borrow_mut().clear();
        let mut m = Matrix::zeros(2, 2);
        ctx.jacobian(&x, &mut m, None).unwrap();
        assert_eq!(*log.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn jacobian_reports_same_pattern_and_fixes_zero_rows() {
        let iterated = Function::new("u_i", 3).into_shared();
        // Middle row assembles to zero.
        let ctx = CallbackContext::new(
            iterated,
            residual_form(0.0),
            jacobian_form(vec![2.0, 0.0, 2.0]),
            Vec::new(),
        )
        .with_ident_zeros(true, false);

        let mut m = Matrix::zeros(3, 3);
        let flag = ctx.jacobian(&Vector::zeros(3), &mut m, None).unwrap();
        assert_eq!(flag, SparsityFlag::SamePattern);
        assert_eq!(m.get(1, 1), 1.0);
        assert_eq!(m.get(0, 0), 2.0);
    }

    #[test]
    fn preconditioner_form_requires_its_matrix() {
        let iterated = Function::new("u_i", 2).into_shared();
        let ctx = CallbackContext::new(
            iterated,
            residual_form(0.0),
            jacobian_form(vec![1.0, 1.0]),
            Vec::new(),
        )
        .with_preconditioner_form(jacobian_form(vec![3.0, 3.0]));

        let mut m = Matrix::zeros(2, 2);
        let err = ctx.jacobian(&Vector::zeros(2), &mut m, None).unwrap_err();
        assert_eq!(err, SolveError::MissingPreconditionerMatrix);

        let mut pc = Matrix::zeros(2, 2);
        ctx.jacobian(&Vector::zeros(2), &mut m, Some(&mut pc)).unwrap();
        assert_eq!(pc.get(0, 0), 3.0);
        assert_eq!(m.get(0, 0), 1.0);
    }
}
