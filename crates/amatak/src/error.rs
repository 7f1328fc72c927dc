//! Error types for the Amatak runtime core

use thiserror::Error;

use crate::exception::ExceptionInfo;
use crate::frontend::SourceLocation;
use crate::value::ValueRef;

/// Main error type for runtime core operations.
///
/// The first group of variants mirrors the language's exception taxonomy and
/// is turned into an exception value when it crosses the interpreter boundary.
/// `Thrown` carries an exception value that already exists in the store, and
/// `Uncaught` is what the host finally observes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AmatakError {
    /// Malformed source text
    #[error("SyntaxError: {message}")]
    Syntax {
        /// Human-readable error message
        message: String,
        /// Where the frontend found the problem
        location: Option<SourceLocation>,
    },

    /// Protocol or operation unsupported for a value's type
    #[error("TypeError: {0}")]
    Type(String),

    /// Operation valid for the type but argument out of domain
    #[error("ValueError: {0}")]
    Value(String),

    /// Module or search path resolution failure
    #[error("ImportError: {0}")]
    Import(String),

    /// Violated core invariant (stale handle, unsupported construct, interrupt)
    #[error("RuntimeError: {0}")]
    Runtime(String),

    /// The object store could not obtain memory or hit a configured limit
    #[error("AllocationError: {0}")]
    Allocation(String),

    /// API misuse ordering, e.g. running on a finalized context
    #[error("LifecycleError: {0}")]
    Lifecycle(String),

    /// Exception category name registered twice
    #[error("DuplicateDefinitionError: exception category `{0}` is already registered")]
    DuplicateDefinition(String),

    /// Parent category (or category by name) not registered
    #[error("unknown exception category: {0}")]
    UnknownCategory(String),

    /// An exception value propagating through the executor.
    ///
    /// The error owns one reference to the value.
    #[error("exception raised (value {0:?})")]
    Thrown(ValueRef),

    /// An exception surfaced to the host; the value stays active in the interpreter
    #[error("{0}")]
    Uncaught(Box<ExceptionInfo>),
}

impl AmatakError {
    /// Name of the built-in exception category this error raises as.
    pub fn category_name(&self) -> &'static str {
        match self {
            AmatakError::Syntax { .. } => "SyntaxError",
            AmatakError::Type(_) => "TypeError",
            AmatakError::Value(_) => "ValueError",
            AmatakError::Import(_) => "ImportError",
            AmatakError::Runtime(_)
            | AmatakError::Allocation(_)
            | AmatakError::Lifecycle(_)
            | AmatakError::DuplicateDefinition(_)
            | AmatakError::UnknownCategory(_) => "RuntimeError",
            AmatakError::Thrown(_) | AmatakError::Uncaught(_) => "BaseException",
        }
    }

    /// The message carried by this error, without the category prefix.
    pub fn message(&self) -> String {
        match self {
            AmatakError::Syntax { message, .. } => message.clone(),
            AmatakError::Type(m)
            | AmatakError::Value(m)
            | AmatakError::Import(m)
            | AmatakError::Runtime(m)
            | AmatakError::Allocation(m)
            | AmatakError::Lifecycle(m) => m.clone(),
            AmatakError::DuplicateDefinition(_) | AmatakError::UnknownCategory(_) => {
                self.to_string()
            }
            AmatakError::Thrown(v) => format!("exception value {:?}", v),
            AmatakError::Uncaught(info) => info.message.clone(),
        }
    }

    /// The surfaced exception, if this error is one.
    pub fn exception(&self) -> Option<&ExceptionInfo> {
        match self {
            AmatakError::Uncaught(info) => Some(info),
            _ => None,
        }
    }

    /// Whether the host should treat this error as an allocation failure.
    pub fn is_allocation(&self) -> bool {
        matches!(self, AmatakError::Allocation(_))
    }
}

/// Result type alias for runtime core operations
pub type Result<T> = std::result::Result<T, AmatakError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_mapping() {
        assert_eq!(AmatakError::Type("x".into()).category_name(), "TypeError");
        assert_eq!(AmatakError::Value("x".into()).category_name(), "ValueError");
        assert_eq!(AmatakError::Import("x".into()).category_name(), "ImportError");
        assert_eq!(
            AmatakError::Lifecycle("x".into()).category_name(),
            "RuntimeError"
        );
        assert_eq!(
            AmatakError::Allocation("x".into()).category_name(),
            "RuntimeError"
        );
    }

    #[test]
    fn test_display_has_category_prefix() {
        let err = AmatakError::Value("division by zero".into());
        assert_eq!(err.to_string(), "ValueError: division by zero");
        assert_eq!(err.message(), "division by zero");
    }
}
