//! The bucket: root container and owner of every registry.
//!
//! A [`Bucket`] holds the meshes, systems, detector sets, and symbol
//! registry of one simulation, plus the timestepping state the run
//! loop advances. Population order is: construct, register entities,
//! run the symbol fill pass, attach coefficients to forms, then
//! [`run`](Bucket::run).

use pail_core::{
    iterated_symbol, old_symbol, ConfigurationError, EntityKind, FormCoefficients, Function,
    FunctionRef, FunctionSpaceRef, MeshRef, Registry, RegistryError, SymbolRegistry,
};

use crate::callbacks::NonlinearUpdate;
use crate::config::{DumpConfig, TimestepConfig};
use crate::diagnostics::{DetectorSet, DiagnosticsFileRef};
use crate::schedule::DumpScheduler;
use crate::system::{System, SystemRef};

/// The simulation root.
pub struct Bucket {
    pub(crate) name: String,
    pub(crate) start_time: f64,
    pub(crate) current_time: f64,
    pub(crate) finish_time: f64,
    pub(crate) timestep: f64,
    timestep_symbol: Option<String>,
    timestep_function: FunctionRef,
    pub(crate) timestep_count: u64,
    pub(crate) nonlinear_iterations: u32,
    pub(crate) iteration_count: u32,
    pub(crate) steadystate_tol: Option<f64>,
    meshes: Registry<MeshRef>,
    pub(crate) systems: Registry<SystemRef>,
    coefficient_spaces: Registry<FunctionSpaceRef>,
    detector_sets: Registry<DetectorSet>,
    symbols: SymbolRegistry,
    pub(crate) scheduler: DumpScheduler,
    pub(crate) statistics_file: Option<DiagnosticsFileRef>,
    pub(crate) steadystate_file: Option<DiagnosticsFileRef>,
    pub(crate) detectors_file: Option<DiagnosticsFileRef>,
    symbols_filled: bool,
    pub(crate) headers_written: bool,
}

impl Bucket {
    /// Create a bucket from validated configuration.
    ///
    /// # Errors
    ///
    /// Any [`ConfigurationError`] the timestepping or dump
    /// configuration fails validation with.
    pub fn new(
        name: &str,
        timestepping: TimestepConfig,
        dumps: &DumpConfig,
    ) -> Result<Self, ConfigurationError> {
        timestepping.validate()?;
        dumps.validate()?;
        let timestep_name = timestepping.timestep_symbol.as_deref().unwrap_or("timestep");
        Ok(Self {
            name: name.to_string(),
            start_time: timestepping.start_time,
            current_time: timestepping.start_time,
            finish_time: timestepping.finish_time,
            timestep: timestepping.timestep,
            timestep_function: Function::constant(timestep_name, timestepping.timestep)
                .into_shared(),
            timestep_symbol: timestepping.timestep_symbol,
            timestep_count: 0,
            nonlinear_iterations: timestepping.nonlinear_iterations,
            iteration_count: 0,
            steadystate_tol: timestepping.steadystate_tol,
            meshes: Registry::new(EntityKind::Mesh),
            systems: Registry::new(EntityKind::System),
            coefficient_spaces: Registry::new(EntityKind::FunctionSpace),
            detector_sets: Registry::new(EntityKind::DetectorSet),
            symbols: SymbolRegistry::new(),
            scheduler: DumpScheduler::new(dumps),
            statistics_file: None,
            steadystate_file: None,
            detectors_file: None,
            symbols_filled: false,
            headers_written: false,
        })
    }

    // ── Accessors ───────────────────────────────────────────────────

    /// The bucket's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Simulation time the run started from.
    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    /// Current simulation time.
    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Simulation time at or beyond which the run completes.
    pub fn finish_time(&self) -> f64 {
        self.finish_time
    }

    /// The fixed timestep size.
    pub fn timestep(&self) -> f64 {
        self.timestep
    }

    /// Number of completed timesteps.
    pub fn timestep_count(&self) -> u64 {
        self.timestep_count
    }

    /// Nonlinear solve passes per timestep.
    pub fn nonlinear_iterations(&self) -> u32 {
        self.nonlinear_iterations
    }

    /// Zero-based index of the solve pass currently (or last) running.
    pub fn iteration_count(&self) -> u32 {
        self.iteration_count
    }

    /// The steady-state tolerance, if early termination is enabled.
    pub fn steadystate_tol(&self) -> Option<f64> {
        self.steadystate_tol
    }

    /// The system registry, in registration order.
    pub fn systems(&self) -> &Registry<SystemRef> {
        &self.systems
    }

    /// The detector-set registry, in registration order.
    pub fn detector_sets(&self) -> &Registry<DetectorSet> {
        &self.detector_sets
    }

    /// The symbol registry.
    pub fn symbols(&self) -> &SymbolRegistry {
        &self.symbols
    }

    // ── Registration ────────────────────────────────────────────────

    /// Register a mesh under its name.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] on a name collision.
    pub fn register_mesh(&mut self, mesh: MeshRef) -> Result<(), RegistryError> {
        let name = mesh.name().to_string();
        self.meshes.register(&name, mesh)
    }

    /// Fetch a registered mesh.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if no mesh has that name.
    pub fn fetch_mesh(&self, name: &str) -> Result<MeshRef, RegistryError> {
        self.meshes.fetch(name).cloned()
    }

    /// Register a system, returning its shared handle.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] on a name collision.
    pub fn register_system(&mut self, system: System) -> Result<SystemRef, RegistryError> {
        let name = system.name().to_string();
        let shared = system.into_shared();
        self.systems.register(&name, shared.clone())?;
        Ok(shared)
    }

    /// Fetch a registered system.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if no system has that name.
    pub fn fetch_system(&self, name: &str) -> Result<SystemRef, RegistryError> {
        self.systems.fetch(name).cloned()
    }

    /// Register a function space held for coefficient interpolation.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] on a name collision.
    pub fn register_coefficient_space(
        &mut self,
        name: &str,
        space: FunctionSpaceRef,
    ) -> Result<(), RegistryError> {
        self.coefficient_spaces.register(name, space)
    }

    /// Fetch a registered coefficient function space.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if no space has that name.
    pub fn fetch_coefficient_space(&self, name: &str) -> Result<FunctionSpaceRef, RegistryError> {
        self.coefficient_spaces.fetch(name).cloned()
    }

    /// Register a detector set under its name.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] on a name collision.
    pub fn register_detector_set(&mut self, set: DetectorSet) -> Result<(), RegistryError> {
        let name = set.name().to_string();
        self.detector_sets.register(&name, set)
    }

    /// Fetch a registered detector set.
    ///
    /// # Errors
    ///
    /// [`RegistryError::NotFound`] if no set has that name.
    pub fn fetch_detector_set(&self, name: &str) -> Result<&DetectorSet, RegistryError> {
        self.detector_sets.fetch(name)
    }

    /// Reserve a symbol before its function exists.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateName`] if the symbol is taken.
    pub fn register_placeholder_symbol(&mut self, name: &str) -> Result<(), RegistryError> {
        self.symbols.register_placeholder(name)
    }

    /// Attach a function to a previously reserved symbol.
    ///
    /// # Errors
    ///
    /// [`RegistryError`] if the symbol is unknown or already bound.
    pub fn bind_symbol(&mut self, name: &str, function: FunctionRef) -> Result<(), RegistryError> {
        self.symbols.bind(name, function)
    }

    /// Attach the statistics diagnostics file.
    pub fn set_statistics_file(&mut self, file: DiagnosticsFileRef) {
        self.statistics_file = Some(file);
    }

    /// Attach the steady-state diagnostics file.
    pub fn set_steadystate_file(&mut self, file: DiagnosticsFileRef) {
        self.steadystate_file = Some(file);
    }

    /// Attach the detectors diagnostics file.
    pub fn set_detectors_file(&mut self, file: DiagnosticsFileRef) {
        self.detectors_file = Some(file);
    }

    // ── Symbol fill ─────────────────────────────────────────────────

    /// Populate the symbol registry from every registered system.
    ///
    /// For each system and each of its fields, the base, `_n`, and
    /// `_i` symbols bind to the system's three shared states (fields
    /// alias their parent's storage). Each coefficient's symbols bind
    /// to the coefficient's own states. Every derived symbol gains an
    /// alias back to its base. If a timestep symbol is configured, it
    /// binds to the single-entry timestep function.
    ///
    /// Runs exactly once, after all registration and before any form
    /// has coefficients attached.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::SymbolsAlreadyFilled`] on a second call;
    /// otherwise any symbol collision as a registry error.
    pub fn fill_symbols(&mut self) -> Result<(), ConfigurationError> {
        if self.symbols_filled {
            return Err(ConfigurationError::SymbolsAlreadyFilled);
        }

        if let Some(symbol) = self.timestep_symbol.clone() {
            self.symbols.register(&symbol, self.timestep_function.clone())?;
            self.symbols.register_alias(&symbol, &symbol)?;
        }

        for (_, system) in self.systems.iter() {
            let system = system.borrow();
            let base = system.symbol().to_string();

            self.symbols.register(&base, system.function().clone())?;
            self.symbols
                .register(&old_symbol(&base), system.old_function().clone())?;
            self.symbols
                .register(&iterated_symbol(&base), system.iterated_function().clone())?;
            for derived in [base.clone(), old_symbol(&base), iterated_symbol(&base)] {
                self.symbols.register_alias(&base, &derived)?;
            }

            for (_, field) in system.fields().iter() {
                let symbol = field.symbol().to_string();
                self.symbols.register(&symbol, system.function().clone())?;
                self.symbols
                    .register(&old_symbol(&symbol), system.old_function().clone())?;
                self.symbols
                    .register(&iterated_symbol(&symbol), system.iterated_function().clone())?;
                for derived in [symbol.clone(), old_symbol(&symbol), iterated_symbol(&symbol)] {
                    self.symbols.register_alias(&symbol, &derived)?;
                }
            }

            for (_, coefficient) in system.coefficients().iter() {
                let symbol = coefficient.symbol().to_string();
                self.symbols
                    .register(&symbol, coefficient.function().clone())?;
                self.symbols
                    .register(&old_symbol(&symbol), coefficient.old_function().clone())?;
                self.symbols.register(
                    &iterated_symbol(&symbol),
                    coefficient.iterated_function().clone(),
                )?;
                for derived in [symbol.clone(), old_symbol(&symbol), iterated_symbol(&symbol)] {
                    self.symbols.register_alias(&symbol, &derived)?;
                }
            }
        }

        self.symbols_filled = true;
        log::debug!("symbol fill pass complete for bucket '{}'", self.name);
        Ok(())
    }

    /// Resolve and attach every coefficient a form declares.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::UnboundSymbol`] if a declared symbol is a
    /// placeholder; a registry error if it was never registered.
    pub fn attach_coefficients(
        &self,
        form: &mut dyn FormCoefficients,
    ) -> Result<(), ConfigurationError> {
        for i in 0..form.num_coefficients() {
            let name = form.coefficient_name(i).to_string();
            match self.symbols.fetch_function(&name)? {
                Some(function) => form.set_coefficient(&name, function),
                None => return Err(ConfigurationError::UnboundSymbol { name }),
            }
        }
        Ok(())
    }

    /// Collect the coefficient refreshes every solver callback runs.
    ///
    /// One entry per coefficient with an expression, across all
    /// systems in registration order.
    pub fn nonlinear_updates(&self) -> Vec<NonlinearUpdate> {
        let mut updates = Vec::new();
        for (_, system) in self.systems.iter() {
            let system = system.borrow();
            for (_, coefficient) in system.coefficients().iter() {
                if let Some(expression) = coefficient.expression() {
                    updates.push(NonlinearUpdate {
                        target: coefficient.iterated_function().clone(),
                        source: system.iterated_function().clone(),
                        expression: expression.clone(),
                    });
                }
            }
        }
        updates
    }
}

impl Drop for Bucket {
    fn drop(&mut self) {
        for (stream, file) in [
            ("statistics", &self.statistics_file),
            ("steadystate", &self.steadystate_file),
            ("detectors", &self.detectors_file),
        ] {
            if let Some(file) = file {
                if let Err(e) = file.borrow_mut().close() {
                    log::warn!("failed to close {stream} file: {e}");
                }
            }
        }
    }
}
