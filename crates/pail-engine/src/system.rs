//! Systems: coupled fields, coefficients, and their solvers.
//!
//! A [`System`] owns three state functions over one mixed function
//! space — current, previous-timestep (`_n`), and in-iteration (`_i`)
//! — and two registries of [`FunctionBucket`]s. Fields alias the
//! system's own state at a contiguous degree-of-freedom range;
//! coefficients carry state of their own.

use std::cell::RefCell;
use std::io;
use std::ops::Range;
use std::rc::Rc;

use indexmap::IndexMap;

use pail_core::{
    iterated_symbol, old_symbol, EntityKind, ExpressionRef, Function, FunctionRef, Registry,
    RegistryError, SolveError, Vector,
};

use crate::callbacks::{CallbackContext, NonlinearSolver};
use crate::diagnostics::VisualizationWriterRef;

/// Shared handle to a [`System`].
pub type SystemRef = Rc<RefCell<System>>;

/// A field or coefficient within a system.
///
/// Both carry the same three-state shape; the difference is ownership.
/// A field's handles alias the parent system's functions, a
/// coefficient's handles are its own.
pub struct FunctionBucket {
    name: String,
    symbol: String,
    function: FunctionRef,
    oldfunction: FunctionRef,
    iteratedfunction: FunctionRef,
    expression: Option<ExpressionRef>,
}

impl FunctionBucket {
    /// The field or coefficient name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The base symbol forms use to reference this function.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The current state.
    pub fn function(&self) -> &FunctionRef {
        &self.function
    }

    /// The previous-timestep state.
    pub fn old_function(&self) -> &FunctionRef {
        &self.oldfunction
    }

    /// The in-iteration state.
    pub fn iterated_function(&self) -> &FunctionRef {
        &self.iteratedfunction
    }

    /// The expression a nonlinear coefficient is evaluated from.
    pub fn expression(&self) -> Option<&ExpressionRef> {
        self.expression.as_ref()
    }
}

/// A nonlinear solver paired with its callback context.
pub struct SolverBucket {
    solver: Box<dyn NonlinearSolver>,
    context: CallbackContext,
}

impl SolverBucket {
    /// The callback context this solver drives.
    pub fn context(&self) -> &CallbackContext {
        &self.context
    }
}

/// One system of coupled fields with its coefficients and solvers.
pub struct System {
    name: String,
    symbol: String,
    function: FunctionRef,
    oldfunction: FunctionRef,
    iteratedfunction: FunctionRef,
    fields: Registry<FunctionBucket>,
    coefficients: Registry<FunctionBucket>,
    field_ranges: IndexMap<String, Range<usize>>,
    solvers: Registry<SolverBucket>,
    visualization: Option<VisualizationWriterRef>,
}

impl System {
    /// Create an empty system publishing its state under `symbol`.
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            function: Function::new(symbol, 0).into_shared(),
            oldfunction: Function::new(&old_symbol(symbol), 0).into_shared(),
            iteratedfunction: Function::new(&iterated_symbol(symbol), 0).into_shared(),
            fields: Registry::new(EntityKind::Field),
            coefficients: Registry::new(EntityKind::Coefficient),
            field_ranges: IndexMap::new(),
            solvers: Registry::new(EntityKind::Solver),
            visualization: None,
        }
    }

    /// The system's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The system's base symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The system's current state function.
    pub fn function(&self) -> &FunctionRef {
        &self.function
    }

    /// The system's previous-timestep state function.
    pub fn old_function(&self) -> &FunctionRef {
        &self.oldfunction
    }

    /// The system's in-iteration state function.
    pub fn iterated_function(&self) -> &FunctionRef {
        &self.iteratedfunction
    }

    /// The field registry, in registration order.
    pub fn fields(&self) -> &Registry<FunctionBucket> {
        &self.fields
    }

    /// The coefficient registry, in registration order.
    pub fn coefficients(&self) -> &Registry<FunctionBucket> {
        &self.coefficients
    }

    /// Register a field of `size` degrees of freedom.
    ///
    /// The field occupies the next contiguous range of the system's
    /// state vectors, which grow to accommodate it; its function
    /// handles alias the system's own states.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if a field named `name` exists.
    pub fn register_field(
        &mut self,
        name: &str,
        symbol: &str,
        size: usize,
    ) -> Result<(), RegistryError> {
        let offset = self.total_dofs();
        self.fields.register(
            name,
            FunctionBucket {
                name: name.to_string(),
                symbol: symbol.to_string(),
                function: self.function.clone(),
                oldfunction: self.oldfunction.clone(),
                iteratedfunction: self.iteratedfunction.clone(),
                expression: None,
            },
        )?;
        for state in [&self.function, &self.oldfunction, &self.iteratedfunction] {
            state.borrow_mut().vector_mut().resize(offset + size);
        }
        self.field_ranges
            .insert(name.to_string(), offset..offset + size);
        Ok(())
    }

    /// Register a coefficient with its own three-state storage.
    ///
    /// All three states start from `initial`. A coefficient with an
    /// `expression` is re-evaluated inside every solver callback.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if a coefficient named `name`
    /// exists.
    pub fn register_coefficient(
        &mut self,
        name: &str,
        symbol: &str,
        initial: Vector,
        expression: Option<ExpressionRef>,
    ) -> Result<(), RegistryError> {
        self.coefficients.register(
            name,
            FunctionBucket {
                name: name.to_string(),
                symbol: symbol.to_string(),
                function: Function::from_vector(symbol, initial.clone()).into_shared(),
                oldfunction: Function::from_vector(&old_symbol(symbol), initial.clone())
                    .into_shared(),
                iteratedfunction: Function::from_vector(&iterated_symbol(symbol), initial)
                    .into_shared(),
                expression,
            },
        )
    }

    /// Attach a solver and its callback context.
    ///
    /// Solvers run in attachment order within every solve pass.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if a solver named `name` exists.
    pub fn attach_solver(
        &mut self,
        name: &str,
        solver: Box<dyn NonlinearSolver>,
        context: CallbackContext,
    ) -> Result<(), RegistryError> {
        self.solvers.register(name, SolverBucket { solver, context })
    }

    /// Attach the system's visualization writer.
    pub fn set_visualization(&mut self, writer: VisualizationWriterRef) {
        self.visualization = Some(writer);
    }

    /// Total degrees of freedom across registered fields.
    pub fn total_dofs(&self) -> usize {
        self.function.borrow().vector().len()
    }

    /// The contiguous degree-of-freedom range of field `name`.
    pub fn field_range(&self, name: &str) -> Option<Range<usize>> {
        self.field_ranges.get(name).cloned()
    }

    /// Run every attached solver once, in attachment order.
    ///
    /// Each solver works on a copy of the iterated state; on success
    /// the copy is written back, so a failing solver leaves the
    /// iterated function at its pre-solve values.
    ///
    /// # Errors
    ///
    /// The first [`SolveError`] any solver reports.
    pub fn solve(&mut self) -> Result<(), SolveError> {
        let iterated = self.iteratedfunction.clone();
        for (name, bucket) in self.solvers.iter_mut() {
            log::info!("solving system '{}' with solver '{name}'", self.name);
            let mut unknown = iterated.borrow().vector().clone();
            bucket.solver.solve(&bucket.context, &mut unknown)?;
            iterated.borrow_mut().assign(&unknown);
        }
        Ok(())
    }

    /// Accept the iterated state: current takes the iterated values,
    /// then the previous-timestep state takes the current values.
    pub fn update(&mut self) {
        {
            let iterated = self.iteratedfunction.borrow();
            self.function.borrow_mut().assign(iterated.vector());
        }
        {
            let current = self.function.borrow();
            self.oldfunction.borrow_mut().assign(current.vector());
        }
        for (_, coefficient) in self.coefficients.iter() {
            {
                let iterated = coefficient.iteratedfunction.borrow();
                coefficient.function.borrow_mut().assign(iterated.vector());
            }
            let current = coefficient.function.borrow();
            coefficient.oldfunction.borrow_mut().assign(current.vector());
        }
    }

    /// Largest absolute change between the iterated and the
    /// previous-timestep state.
    pub fn max_change(&self) -> f64 {
        self.iteratedfunction
            .borrow()
            .vector()
            .max_abs_diff(self.oldfunction.borrow().vector())
    }

    /// Write visualization output, if a writer is attached.
    ///
    /// # Errors
    ///
    /// Any I/O error from the writer.
    pub fn write_visualization(&self) -> io::Result<()> {
        if let Some(writer) = &self.visualization {
            writer.borrow_mut().write(self)?;
        }
        Ok(())
    }

    /// Wrap this system in a shared handle.
    pub fn into_shared(self) -> SystemRef {
        Rc::new(RefCell::new(self))
    }
}
