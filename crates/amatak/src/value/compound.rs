//! Compound payloads: modules and exceptions

use crate::exception::CategoryId;
use crate::frontend::SourceLocation;

use super::AttrDict;

/// Payload of a module value.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleData {
    /// Dotted module name
    pub name: String,

    /// Module namespace
    pub attrs: AttrDict,
}

impl ModuleData {
    /// Create an empty module namespace.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: AttrDict::new(),
        }
    }
}

/// Payload of an exception value.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionData {
    /// Category the exception was raised as
    pub category: CategoryId,

    /// Human-readable message
    pub message: String,

    /// Source location, set for syntax errors
    pub location: Option<SourceLocation>,

    /// Extra attributes attached by the executor or the host
    pub attrs: AttrDict,
}

impl ExceptionData {
    /// Create an exception payload without location.
    pub fn new(category: CategoryId, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            location: None,
            attrs: AttrDict::new(),
        }
    }

    /// Attach a source location (builder pattern).
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}
