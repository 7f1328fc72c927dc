//! Compiler boundary for the Amatak runtime
//!
//! This module defines the `Frontend` trait through which the runtime
//! obtains executable code. The runtime never parses source text itself.
//!
//! # Architecture
//!
//! ```text
//! Source Code → [Frontend] → CompiledUnit (syn statements) → [Executor] → ValueRef
//! ```
//!
//! Frontends are responsible for:
//! - Turning source text into a `CompiledUnit`
//! - Reporting malformed source with a location
//!
//! The runtime is responsible for:
//! - Executing the unit against an object store
//! - Turning a `ParseError` into a `SyntaxError` exception

use std::cell::Cell;
use std::fmt;

use crate::error::AmatakError;

// ═══════════════════════════════════════════════════════════════════════
// ERROR TYPES
// ═══════════════════════════════════════════════════════════════════════

/// Error that occurred during parsing.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Human-readable error message
    pub message: String,

    /// Optional source location
    pub location: Option<SourceLocation>,

    /// Optional source snippet for context
    pub snippet: Option<String>,
}

impl ParseError {
    /// Create a new parse error with just a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            snippet: None,
        }
    }

    /// Add location information to the error.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Add a source snippet for context.
    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.snippet = Some(snippet.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " at {}", loc)?;
        }
        if let Some(snippet) = &self.snippet {
            write!(f, "\n{}", snippet)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for AmatakError {
    fn from(err: ParseError) -> Self {
        AmatakError::Syntax {
            message: err.message,
            location: err.location,
        }
    }
}

/// Source code location for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// File name or identifier
    pub file: String,

    /// Line number (1-indexed)
    pub line: usize,

    /// Column number (1-indexed)
    pub column: usize,
}

impl SourceLocation {
    /// Create a new source location.
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

// ═══════════════════════════════════════════════════════════════════════
// COMPILED CODE
// ═══════════════════════════════════════════════════════════════════════

thread_local! {
    static LIVE_UNITS: Cell<usize> = const { Cell::new(0) };
}

/// Number of compiled units alive on the current thread.
pub fn live_compiled_units() -> usize {
    LIVE_UNITS.try_with(Cell::get).unwrap_or(0)
}

/// Clear the current thread's span table if no compiled unit is alive.
///
/// Parsing records each source text in a thread-local table that span
/// positions point into. Spans of units already dropped are never looked up
/// again, so the table is reset once the last unit on the thread is gone.
pub fn release_spans_if_idle() {
    if LIVE_UNITS.try_with(Cell::get) == Ok(0) {
        proc_macro2::extra::invalidate_current_thread_spans();
    }
}

/// Keeps the thread's live unit count.
#[derive(Debug)]
struct UnitGuard(());

impl UnitGuard {
    fn new() -> Self {
        let _ = LIVE_UNITS.try_with(|n| n.set(n.get() + 1));
        Self(())
    }
}

impl Clone for UnitGuard {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl Drop for UnitGuard {
    fn drop(&mut self) {
        let remaining = LIVE_UNITS.try_with(|n| {
            let left = n.get().saturating_sub(1);
            n.set(left);
            left
        });
        if remaining == Ok(0) {
            proc_macro2::extra::invalidate_current_thread_spans();
        }
    }
}

/// Executable form of one source text.
///
/// Holds `syn` statements, which are tied to the thread that parsed them, so
/// units are compiled and executed within a single call and never cached.
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    /// File name the source was compiled as
    pub filename: String,

    /// Top-level statements in source order
    pub stmts: Vec<syn::Stmt>,

    // declared last so the statements drop first
    _guard: UnitGuard,
}

impl CompiledUnit {
    /// Wrap parsed statements.
    pub fn new(filename: impl Into<String>, stmts: Vec<syn::Stmt>) -> Self {
        Self {
            filename: filename.into(),
            stmts,
            _guard: UnitGuard::new(),
        }
    }

    /// Whether the unit has no statements.
    pub fn is_empty(&self) -> bool {
        self.stmts.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════
// FRONTEND TRAIT
// ═══════════════════════════════════════════════════════════════════════

/// Compiler collaborator of an interpreter context.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use amatak::frontend::{CompiledUnit, Frontend, ParseError};
///
/// struct EmptyFrontend;
///
/// impl Frontend for EmptyFrontend {
///     fn compile(&self, _source: &str, filename: &str) -> Result<CompiledUnit, ParseError> {
///         Ok(CompiledUnit::new(filename, vec![]))
///     }
///
///     fn name(&self) -> &str {
///         "empty"
///     }
///
///     fn file_extension(&self) -> &str {
///         "amatak"
///     }
/// }
/// ```
pub trait Frontend: Send + Sync {
    /// Compile source text.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the source cannot be parsed.
    fn compile(&self, source: &str, filename: &str) -> Result<CompiledUnit, ParseError>;

    /// Return the name of this frontend.
    fn name(&self) -> &str;

    /// Return the file extension of source files for this frontend.
    fn file_extension(&self) -> &str;
}
