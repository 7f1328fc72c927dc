//! # Amatak
//!
//! The runtime core of the Amatak embeddable scripting language.
//!
//! Amatak values live in a reference-counted object store. Each value has a
//! type descriptor carrying optional number, sequence and mapping protocol
//! tables, and every operation on a value is dispatched through those tables.
//! An interpreter context owns the store together with the loaded modules,
//! the exception categories and the module search path, and exposes
//! compile / execute entry points to the host.
//!
//! ## Architecture
//!
//! - **Values and types**: `ValueRef` handles, `Payload`s, `TypeDescriptor`s
//! - **Object store**: allocation, reference counting, protocol dispatch,
//!   attributes, weak handles, cycle detection
//! - **Registries**: exception categories and the module cache
//! - **Frontend**: the compiler boundary, with a `syn`-based standard frontend
//! - **Executor**: a tree walker over compiled units
//! - **Interpreter**: lifecycle and the host embedding API

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod eval;
pub mod exception;
pub mod frontend;
pub mod frontends;
pub mod interpreter;
pub mod module;
pub mod store;
pub mod types;
pub mod value;

// Re-export main types
pub use config::InterpreterConfig;
pub use error::{AmatakError, Result};
pub use eval::{Evaluate, Frame};
pub use exception::{
    BuiltinCategories, CategoryId, ExceptionCategory, ExceptionInfo, ExceptionRegistry,
};
pub use frontend::{live_compiled_units, CompiledUnit, Frontend, ParseError, SourceLocation};
pub use frontends::StandardFrontend;
pub use interpreter::{
    FinalizeReport, InterruptHandle, Interpreter, LifecycleState, Runtime, MAIN_MODULE,
    STRING_SOURCE,
};
pub use module::{
    FileSystemLoader, InMemoryLoader, ModuleEntry, ModuleLoader, ModuleRegistry, ModuleSource,
    ModuleState,
};
pub use store::{global_live_objects, ObjectStore, StoreLimits, StoreStats, TeardownReport};
pub use types::{
    BuiltinTypes, MappingOp, MappingProtocol, NumberOp, NumberProtocol, Operation, Protocol,
    SequenceOp, SequenceProtocol, TypeBuilder, TypeDescriptor, TypeRef,
};
pub use value::{DictKey, HostValue, Payload, ValueRef, WeakHandle};

/// Amatak version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
