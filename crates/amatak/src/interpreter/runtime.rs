//! Global state of an initialized context

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::config::InterpreterConfig;
use crate::error::{AmatakError, Result};
use crate::eval;
use crate::exception::ExceptionRegistry;
use crate::frontend::{CompiledUnit, Frontend};
use crate::module::{validate_module_name, ModuleLoader, ModuleRegistry, ModuleState};
use crate::store::{ObjectStore, StoreLimits};
use crate::value::ValueRef;

use super::FinalizeReport;

/// Name of the module host code runs in.
pub const MAIN_MODULE: &str = "__main__";

/// Everything an initialized interpreter owns: the object store, module
/// and exception registries, and its collaborators.
///
/// The executor works against this type; hosts reach it through
/// [`Interpreter`](super::Interpreter).
pub struct Runtime {
    pub(crate) store: ObjectStore,
    pub(crate) modules: ModuleRegistry,
    pub(crate) exceptions: ExceptionRegistry,
    frontend: Arc<dyn Frontend>,
    loader: Arc<dyn ModuleLoader>,
    config: InterpreterConfig,
    interrupt: Arc<AtomicBool>,
    import_depth: usize,
    main: ValueRef,
}

impl Runtime {
    pub(crate) fn new(
        config: InterpreterConfig,
        frontend: Arc<dyn Frontend>,
        loader: Arc<dyn ModuleLoader>,
        interrupt: Arc<AtomicBool>,
    ) -> Result<Self> {
        let mut store = ObjectStore::new(StoreLimits {
            max_objects: config.max_objects,
            memory_limit: config.memory_limit,
        })?;
        let exceptions = ExceptionRegistry::new();
        let mut modules = ModuleRegistry::new(config.search_path.clone());
        let main = store.module(MAIN_MODULE)?;
        modules.insert_loading(MAIN_MODULE, main, None)?;
        modules.mark_loaded(MAIN_MODULE)?;
        Ok(Self {
            store,
            modules,
            exceptions,
            frontend,
            loader,
            config,
            interrupt,
            import_depth: 0,
            main,
        })
    }

    /// The object store.
    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    /// The exception registry.
    pub fn exceptions(&self) -> &ExceptionRegistry {
        &self.exceptions
    }

    /// The module registry.
    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    /// Active configuration.
    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    /// The `__main__` module (borrowed; the registry owns it).
    pub fn main_module(&self) -> ValueRef {
        self.main
    }

    /// Fail with a RuntimeError if the host requested an interrupt.
    ///
    /// The request is consumed, so the next run starts clean.
    pub fn check_interrupt(&self) -> Result<()> {
        if self.interrupt.swap(false, Ordering::AcqRel) {
            return Err(AmatakError::Runtime("execution interrupted".to_string()));
        }
        Ok(())
    }

    /// Compile `source` with the context's frontend.
    pub fn compile(&self, source: &str, filename: &str) -> Result<CompiledUnit> {
        self.frontend
            .compile(source, filename)
            .map_err(AmatakError::from)
    }

    /// Execute `unit` in `namespace`, returning an owned result.
    pub fn execute(&mut self, unit: &CompiledUnit, namespace: ValueRef) -> Result<ValueRef> {
        eval::exec_unit(self, unit, namespace)
    }

    /// Return module `name`, loading and executing it on first import.
    ///
    /// A module that is still executing (a circular import) is returned in
    /// its partially initialized state. A module whose body fails is removed
    /// from the cache so a later import retries it.
    pub fn import_module(&mut self, name: &str) -> Result<ValueRef> {
        validate_module_name(name)?;

        if let Some(entry) = self.modules.get(name) {
            let module = entry.value;
            if entry.state == ModuleState::Loading {
                debug!(module = name, "circular import returns partial module");
            }
            self.store.retain(module)?;
            return Ok(module);
        }

        if self.import_depth >= self.config.max_import_depth {
            return Err(AmatakError::Import(format!(
                "maximum import depth of {} exceeded importing '{}'",
                self.config.max_import_depth, name
            )));
        }

        let source = self
            .loader
            .load(self.modules.search_path(), name, &self.config.module_extension)?
            .ok_or_else(|| AmatakError::Import(format!("no module named '{}'", name)))?;
        let filename = source.path.display().to_string();
        let unit = self.compile(&source.text, &filename)?;

        let module = self.store.module(name)?;
        self.modules
            .insert_loading(name, module, Some(source.path))?;
        debug!(module = name, path = %filename, "loading module");

        self.import_depth += 1;
        let result = self.execute(&unit, module);
        self.import_depth -= 1;

        match result {
            Ok(value) => {
                self.store.discard(value);
                self.modules.mark_loaded(name)?;
                self.store.retain(module)?;
                debug!(module = name, "module loaded");
                Ok(module)
            }
            Err(err) => {
                if let Some(entry) = self.modules.remove(name) {
                    self.store.discard(entry.value);
                }
                debug!(module = name, %err, "module failed to load");
                Err(err)
            }
        }
    }

    /// Release every module, reclaim cycles and force-free what is left.
    pub(crate) fn teardown(mut self) -> FinalizeReport {
        let modules_released = self.modules.teardown(&mut self.store);
        let report = self.store.teardown();
        FinalizeReport {
            modules_released,
            cyclic_objects: report.cyclic_objects,
            leaked_objects: report.leaked_objects,
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("store", &self.store)
            .field("modules", &self.modules.len())
            .field("exceptions", &self.exceptions.len())
            .field("frontend", &self.frontend.name())
            .field("import_depth", &self.import_depth)
            .finish()
    }
}
