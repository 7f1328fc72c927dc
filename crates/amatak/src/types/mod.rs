//! Type descriptors
//!
//! Every stored value points at one [`TypeDescriptor`]. The descriptor names
//! the type and carries the optional protocol tables that the store's
//! `dispatch` consults.

mod builtins;
mod protocol;

pub use builtins::BuiltinTypes;
pub use protocol::{
    MappingOp, MappingProtocol, NumberOp, NumberProtocol, Operation, Protocol, SequenceOp,
    SequenceProtocol,
};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared handle to a type descriptor.
pub type TypeRef = Arc<TypeDescriptor>;

static NEXT_TYPE_ID: AtomicU64 = AtomicU64::new(1);

/// Shape and behaviour of a value.
///
/// Immutable once built, except for the version tag, which only grows and is
/// bumped on structural changes to invalidate cached attribute lookups.
pub struct TypeDescriptor {
    id: u64,
    name: String,
    basic_size: usize,
    number: Option<Arc<dyn NumberProtocol>>,
    sequence: Option<Arc<dyn SequenceProtocol>>,
    mapping: Option<Arc<dyn MappingProtocol>>,
    has_dict: bool,
    weakrefable: bool,
    exception: bool,
    version: AtomicU64,
}

impl TypeDescriptor {
    /// Start building a type.
    pub fn builder(name: impl Into<String>) -> TypeBuilder {
        TypeBuilder::new(name)
    }

    /// Process-unique identity of this descriptor.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Type name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Basic per-instance size hint in bytes.
    pub fn basic_size(&self) -> usize {
        self.basic_size
    }

    /// Number protocol table, if implemented.
    pub fn number(&self) -> Option<&Arc<dyn NumberProtocol>> {
        self.number.as_ref()
    }

    /// Sequence protocol table, if implemented.
    pub fn sequence(&self) -> Option<&Arc<dyn SequenceProtocol>> {
        self.sequence.as_ref()
    }

    /// Mapping protocol table, if implemented.
    pub fn mapping(&self) -> Option<&Arc<dyn MappingProtocol>> {
        self.mapping.as_ref()
    }

    /// Whether the type carries a table for `protocol`.
    pub fn implements(&self, protocol: Protocol) -> bool {
        match protocol {
            Protocol::Number => self.number.is_some(),
            Protocol::Sequence => self.sequence.is_some(),
            Protocol::Mapping => self.mapping.is_some(),
        }
    }

    /// Whether instances carry an attribute dictionary.
    pub fn has_dict(&self) -> bool {
        self.has_dict
    }

    /// Whether weak handles can be taken to instances.
    pub fn is_weakrefable(&self) -> bool {
        self.weakrefable
    }

    /// Whether this is an exception category type.
    pub fn is_exception(&self) -> bool {
        self.exception
    }

    /// Current version tag.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Acquire)
    }

    /// Record a structural change; returns the new version.
    pub fn bump_version(&self) -> u64 {
        self.version.fetch_add(1, Ordering::AcqRel) + 1
    }
}

impl fmt::Debug for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDescriptor")
            .field("name", &self.name)
            .field("basic_size", &self.basic_size)
            .field("number", &self.number.is_some())
            .field("sequence", &self.sequence.is_some())
            .field("mapping", &self.mapping.is_some())
            .field("has_dict", &self.has_dict)
            .field("weakrefable", &self.weakrefable)
            .field("exception", &self.exception)
            .field("version", &self.version())
            .finish()
    }
}

/// Builder for [`TypeDescriptor`].
pub struct TypeBuilder {
    name: String,
    basic_size: usize,
    number: Option<Arc<dyn NumberProtocol>>,
    sequence: Option<Arc<dyn SequenceProtocol>>,
    mapping: Option<Arc<dyn MappingProtocol>>,
    has_dict: bool,
    weakrefable: bool,
    exception: bool,
}

impl TypeBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            basic_size: 16,
            number: None,
            sequence: None,
            mapping: None,
            has_dict: false,
            weakrefable: false,
            exception: false,
        }
    }

    /// Set the basic size hint.
    pub fn basic_size(mut self, size: usize) -> Self {
        self.basic_size = size;
        self
    }

    /// Attach a number protocol table.
    pub fn number(mut self, table: impl NumberProtocol + 'static) -> Self {
        self.number = Some(Arc::new(table));
        self
    }

    /// Attach a sequence protocol table.
    pub fn sequence(mut self, table: impl SequenceProtocol + 'static) -> Self {
        self.sequence = Some(Arc::new(table));
        self
    }

    /// Attach a mapping protocol table.
    pub fn mapping(mut self, table: impl MappingProtocol + 'static) -> Self {
        self.mapping = Some(Arc::new(table));
        self
    }

    /// Give instances an attribute dictionary.
    pub fn with_dict(mut self) -> Self {
        self.has_dict = true;
        self
    }

    /// Allow weak handles to instances.
    pub fn weakrefable(mut self) -> Self {
        self.weakrefable = true;
        self
    }

    /// Mark as an exception category type.
    pub fn exception(mut self) -> Self {
        self.exception = true;
        self
    }

    /// Finish the descriptor.
    pub fn build(self) -> TypeRef {
        Arc::new(TypeDescriptor {
            id: NEXT_TYPE_ID.fetch_add(1, Ordering::Relaxed),
            name: self.name,
            basic_size: self.basic_size,
            number: self.number,
            sequence: self.sequence,
            mapping: self.mapping,
            has_dict: self.has_dict,
            weakrefable: self.weakrefable,
            exception: self.exception,
            version: AtomicU64::new(0),
        })
    }
}
