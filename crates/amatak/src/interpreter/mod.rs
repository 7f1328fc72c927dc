//! Interpreter context and host embedding API
//!
//! An [`Interpreter`] moves through
//! `Uninitialized -> Ready -> (Running <-> Ready) -> Finalized`.
//! A failed `compile`, `run`, `execute` or `import_module` leaves its
//! exception active and the context in `Running` until the host takes or
//! clears it; until then those calls fail with a LifecycleError so that no
//! exception is silently replaced.

mod runtime;

pub use runtime::{Runtime, MAIN_MODULE};

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error};

use crate::config::InterpreterConfig;
use crate::error::{AmatakError, Result};
use crate::exception::{CategoryId, ExceptionInfo, ExceptionRegistry};
use crate::frontend::{CompiledUnit, Frontend};
use crate::frontends::StandardFrontend;
use crate::module::{FileSystemLoader, ModuleLoader, ModuleRegistry};
use crate::store::ObjectStore;
use crate::value::{HostValue, ValueRef};

/// File name used for source passed to `run` and `compile`.
pub const STRING_SOURCE: &str = "<string>";

/// Lifecycle state of an interpreter context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Created, `initialize` not yet called
    Uninitialized,
    /// Initialized and idle
    Ready,
    /// Executing, or stopped on an exception the host has not handled
    Running,
    /// Torn down; only `initialize` is accepted
    Finalized,
}

/// What `finalize` released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FinalizeReport {
    /// Cached modules released
    pub modules_released: usize,
    /// Values reclaimed by cycle collection, including those only a cycle
    /// kept alive
    pub cyclic_objects: usize,
    /// Values still referenced by the host, freed by force
    pub leaked_objects: usize,
}

/// Requests cooperative cancellation of a running context from another thread.
#[derive(Debug, Clone)]
pub struct InterruptHandle(Arc<AtomicBool>);

impl InterruptHandle {
    /// Ask the executor to stop at the next statement or loop iteration.
    pub fn interrupt(&self) {
        self.0.store(true, Ordering::Release);
    }
}

/// An interpreter context.
///
/// # Example
///
/// ```
/// use amatak::{Interpreter, InterpreterConfig};
///
/// let mut interp = Interpreter::new(InterpreterConfig::default());
/// interp.initialize().unwrap();
/// let v = interp.run("let x = 40; x + 2").unwrap();
/// assert_eq!(interp.store().unwrap().as_int(v), Some(42));
/// interp.release(v).unwrap();
/// interp.finalize().unwrap();
/// ```
pub struct Interpreter {
    config: InterpreterConfig,
    frontend: Arc<dyn Frontend>,
    loader: Arc<dyn ModuleLoader>,
    interrupt: Arc<AtomicBool>,
    state: LifecycleState,
    runtime: Option<Runtime>,
    active_exception: Option<ValueRef>,
}

impl Interpreter {
    /// Create an uninitialized context using the standard frontend and
    /// file-system module loader.
    pub fn new(config: InterpreterConfig) -> Self {
        let frontend = StandardFrontend::new().with_max_nesting(config.max_nesting_depth);
        Self {
            config,
            frontend: Arc::new(frontend),
            loader: Arc::new(FileSystemLoader),
            interrupt: Arc::new(AtomicBool::new(false)),
            state: LifecycleState::Uninitialized,
            runtime: None,
            active_exception: None,
        }
    }

    /// Use `frontend` as the compiler collaborator (builder pattern).
    pub fn with_frontend(mut self, frontend: impl Frontend + 'static) -> Self {
        self.frontend = Arc::new(frontend);
        self
    }

    /// Use `loader` to resolve modules (builder pattern).
    pub fn with_loader(mut self, loader: impl ModuleLoader + 'static) -> Self {
        self.loader = Arc::new(loader);
        self
    }

    // ═══════════════════════════════════════════════════════════════════
    // Lifecycle
    // ═══════════════════════════════════════════════════════════════════

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Build the object store, register built-in exception categories and
    /// create `__main__`.
    ///
    /// Idempotent while initialized; allowed again after `finalize`.
    pub fn initialize(&mut self) -> Result<()> {
        if self.runtime.is_some() {
            return Ok(());
        }
        let runtime = Runtime::new(
            self.config.clone(),
            Arc::clone(&self.frontend),
            Arc::clone(&self.loader),
            Arc::clone(&self.interrupt),
        )
        .map_err(|err| self.check_fatal(err))?;
        self.interrupt.store(false, Ordering::Release);
        self.runtime = Some(runtime);
        self.state = LifecycleState::Ready;
        debug!(frontend = self.frontend.name(), "interpreter initialized");
        Ok(())
    }

    /// Release the active exception and every module, reclaim cycles and
    /// force-free what remains, then drop the types and exception table.
    pub fn finalize(&mut self) -> Result<FinalizeReport> {
        let mut runtime = self.runtime.take().ok_or_else(|| not_initialized(self.state))?;
        if let Some(exc) = self.active_exception.take() {
            runtime.store.discard(exc);
        }
        let report = runtime.teardown();
        self.state = LifecycleState::Finalized;
        debug!(
            modules = report.modules_released,
            cycles = report.cyclic_objects,
            leaked = report.leaked_objects,
            "interpreter finalized"
        );
        Ok(report)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Compile and execute
    // ═══════════════════════════════════════════════════════════════════

    /// Compile `source`. A parse failure leaves a `SyntaxError` active.
    pub fn compile(&mut self, source: &str) -> Result<CompiledUnit> {
        self.ready_runtime()?;
        let compiled = self.runtime()?.compile(source, STRING_SOURCE);
        self.settle(compiled)
    }

    /// Execute `unit` in `__main__`, returning the value of its final
    /// expression statement.
    pub fn execute(&mut self, unit: &CompiledUnit) -> Result<ValueRef> {
        let runtime = self.ready_runtime()?;
        let main = runtime.main_module();
        self.state = LifecycleState::Running;
        let result = self.runtime_mut()?.execute(unit, main);
        self.settle(result)
    }

    /// Compile and execute `source` in `__main__`.
    ///
    /// Empty source, or source ending in a `;`-terminated statement,
    /// evaluates to `None`.
    pub fn run(&mut self, source: &str) -> Result<ValueRef> {
        let unit = self.compile(source)?;
        self.execute(&unit)
    }

    /// Import module `name`, returning a new reference to it.
    pub fn import_module(&mut self, name: &str) -> Result<ValueRef> {
        self.ready_runtime()?;
        self.state = LifecycleState::Running;
        let result = self.runtime_mut()?.import_module(name);
        self.settle(result)
    }

    /// Append a directory to the module search path.
    ///
    /// Before `initialize` the entry goes into the configuration.
    pub fn add_search_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        match self.state {
            LifecycleState::Uninitialized => {
                self.config.search_path.push(path.as_ref().to_path_buf());
                Ok(())
            }
            _ => {
                self.runtime_mut()?.modules.add_search_path(path);
                Ok(())
            }
        }
    }

    /// Handle for interrupting this context from another thread.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        InterruptHandle(Arc::clone(&self.interrupt))
    }

    // ═══════════════════════════════════════════════════════════════════
    // Exceptions
    // ═══════════════════════════════════════════════════════════════════

    /// Register a new exception category under `parent`.
    pub fn register_exception(&mut self, name: &str, parent: CategoryId) -> Result<CategoryId> {
        let id = self.runtime_mut()?.exceptions.register(name, parent)?;
        debug!(category = name, "registered exception category");
        Ok(id)
    }

    /// Raise an exception of `category` from host code, making it active.
    pub fn raise(&mut self, category: CategoryId, message: impl Into<String>) -> Result<()> {
        self.ensure_no_pending()?;
        let runtime = self.runtime_mut()?;
        let exc = runtime
            .exceptions
            .new_exception(&mut runtime.store, category, message, None)?;
        self.active_exception = Some(exc);
        self.state = LifecycleState::Running;
        Ok(())
    }

    /// Raise an exception of the category named `category_name`.
    pub fn set_error_message(&mut self, category_name: &str, text: impl Into<String>) -> Result<()> {
        let category = self
            .exceptions()?
            .lookup(category_name)
            .ok_or_else(|| AmatakError::UnknownCategory(category_name.to_string()))?;
        self.raise(category, text)
    }

    /// Description of the active exception, if any.
    pub fn active_exception(&self) -> Option<ExceptionInfo> {
        let exc = self.active_exception?;
        let runtime = self.runtime.as_ref()?;
        runtime.exceptions.info(&runtime.store, exc).ok()
    }

    /// Hand the active exception value to the host, which must release it.
    pub fn take_exception(&mut self) -> Result<Option<ValueRef>> {
        self.runtime()?;
        let Some(exc) = self.active_exception.take() else {
            return Ok(None);
        };
        self.state = LifecycleState::Ready;
        Ok(Some(exc))
    }

    /// Discard the active exception.
    pub fn clear_exception(&mut self) -> Result<()> {
        let runtime = self.runtime.as_mut().ok_or_else(|| not_initialized(self.state))?;
        if let Some(exc) = self.active_exception.take() {
            runtime.store.discard(exc);
        }
        self.state = LifecycleState::Ready;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════
    // Values
    // ═══════════════════════════════════════════════════════════════════

    /// The object store.
    pub fn store(&self) -> Result<&ObjectStore> {
        Ok(&self.runtime()?.store)
    }

    /// Mutable access to the object store.
    pub fn store_mut(&mut self) -> Result<&mut ObjectStore> {
        Ok(&mut self.runtime_mut()?.store)
    }

    /// The exception registry.
    pub fn exceptions(&self) -> Result<&ExceptionRegistry> {
        Ok(&self.runtime()?.exceptions)
    }

    /// The module registry.
    pub fn modules(&self) -> Result<&ModuleRegistry> {
        Ok(&self.runtime()?.modules)
    }

    /// Release a reference the host owns.
    pub fn release(&mut self, v: ValueRef) -> Result<()> {
        self.store_mut()?.release(v)
    }

    /// Copy `v` out as a detached [`HostValue`].
    pub fn to_host(&self, v: ValueRef) -> Result<HostValue> {
        self.store()?.export(v)
    }

    /// Build a value from a detached [`HostValue`].
    pub fn from_host(&mut self, value: &HostValue) -> Result<ValueRef> {
        self.store_mut()?.import_host(value)
    }

    // ═══════════════════════════════════════════════════════════════════
    // Internals
    // ═══════════════════════════════════════════════════════════════════

    fn runtime(&self) -> Result<&Runtime> {
        self.runtime.as_ref().ok_or_else(|| not_initialized(self.state))
    }

    fn runtime_mut(&mut self) -> Result<&mut Runtime> {
        let state = self.state;
        self.runtime.as_mut().ok_or_else(|| not_initialized(state))
    }

    fn ensure_no_pending(&self) -> Result<()> {
        match self.active_exception() {
            Some(info) => Err(AmatakError::Lifecycle(format!(
                "an exception is pending ({}); take or clear it first",
                info
            ))),
            None if self.active_exception.is_some() => Err(AmatakError::Lifecycle(
                "an exception is pending; take or clear it first".to_string(),
            )),
            None => Ok(()),
        }
    }

    /// The runtime, provided no exception is pending.
    fn ready_runtime(&self) -> Result<&Runtime> {
        let runtime = self.runtime()?;
        self.ensure_no_pending()?;
        Ok(runtime)
    }

    /// Turn a failure into the active exception; return to `Ready` on success.
    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                self.state = LifecycleState::Ready;
                Ok(value)
            }
            Err(err) => Err(self.activate(err)),
        }
    }

    fn activate(&mut self, err: AmatakError) -> AmatakError {
        let err = self.check_fatal(err);
        let Some(runtime) = self.runtime.as_mut() else {
            return err;
        };
        let exc = match runtime.exceptions.exception_for_error(&mut runtime.store, err.clone()) {
            Ok(exc) => exc,
            Err(raise_err) => {
                debug!(%raise_err, "could not allocate exception value");
                self.state = LifecycleState::Ready;
                return err;
            }
        };
        match runtime.exceptions.info(&runtime.store, exc) {
            Ok(info) => {
                debug!(exception = %info, "exception raised");
                self.active_exception = Some(exc);
                self.state = LifecycleState::Running;
                AmatakError::Uncaught(Box::new(info))
            }
            Err(info_err) => {
                runtime.store.discard(exc);
                self.state = LifecycleState::Ready;
                info_err
            }
        }
    }

    fn check_fatal(&self, err: AmatakError) -> AmatakError {
        if err.is_allocation() && self.config.fatal_on_allocation_failure {
            error!(%err, "allocation failure is fatal; aborting");
            std::process::abort();
        }
        err
    }
}

fn not_initialized(state: LifecycleState) -> AmatakError {
    match state {
        LifecycleState::Finalized => {
            AmatakError::Lifecycle("interpreter has been finalized".to_string())
        }
        _ => AmatakError::Lifecycle("interpreter is not initialized".to_string()),
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(InterpreterConfig::default())
    }
}

impl std::fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interpreter")
            .field("state", &self.state)
            .field("runtime", &self.runtime)
            .field("active_exception", &self.active_exception)
            .finish()
    }
}
