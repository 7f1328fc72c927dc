//! Exception categories
//!
//! Categories form a single-rooted tree. Each one owns the type descriptor
//! its exception values are allocated with, so `store.type_name(exc)` is the
//! category name.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{AmatakError, Result};
use crate::frontend::SourceLocation;
use crate::store::ObjectStore;
use crate::types::{TypeDescriptor, TypeRef};
use crate::value::{ExceptionData, Payload, ValueRef};

/// Index of a registered exception category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CategoryId(usize);

impl CategoryId {
    /// Position in registration order.
    pub fn index(self) -> usize {
        self.0
    }
}

/// A registered exception category.
#[derive(Debug, Clone)]
pub struct ExceptionCategory {
    id: CategoryId,
    name: String,
    parent: Option<CategoryId>,
    ty: TypeRef,
}

impl ExceptionCategory {
    /// Registry id.
    pub fn id(&self) -> CategoryId {
        self.id
    }

    /// Category name, e.g. `ValueError`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent category; `None` only for the root.
    pub fn parent(&self) -> Option<CategoryId> {
        self.parent
    }

    /// Type descriptor of this category's exception values.
    pub fn type_ref(&self) -> &TypeRef {
        &self.ty
    }
}

/// Ids of the categories every registry starts with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuiltinCategories {
    /// `BaseException`, the root
    pub base: CategoryId,
    /// `SyntaxError`
    pub syntax: CategoryId,
    /// `RuntimeError`
    pub runtime: CategoryId,
    /// `TypeError`
    pub type_error: CategoryId,
    /// `ValueError`
    pub value: CategoryId,
    /// `ImportError`
    pub import: CategoryId,
}

/// Table of exception categories owned by one interpreter context.
#[derive(Debug, Clone)]
pub struct ExceptionRegistry {
    categories: Vec<ExceptionCategory>,
    by_name: IndexMap<String, CategoryId>,
    builtins: BuiltinCategories,
}

impl ExceptionRegistry {
    /// A registry holding `BaseException` and its built-in children.
    pub fn new() -> Self {
        let mut registry = Self {
            categories: Vec::new(),
            by_name: IndexMap::new(),
            builtins: BuiltinCategories {
                base: CategoryId(0),
                syntax: CategoryId(0),
                runtime: CategoryId(0),
                type_error: CategoryId(0),
                value: CategoryId(0),
                import: CategoryId(0),
            },
        };
        let base = registry.insert("BaseException", None);
        registry.builtins = BuiltinCategories {
            base,
            syntax: registry.insert("SyntaxError", Some(base)),
            runtime: registry.insert("RuntimeError", Some(base)),
            type_error: registry.insert("TypeError", Some(base)),
            value: registry.insert("ValueError", Some(base)),
            import: registry.insert("ImportError", Some(base)),
        };
        registry
    }

    fn insert(&mut self, name: &str, parent: Option<CategoryId>) -> CategoryId {
        let id = CategoryId(self.categories.len());
        let ty = TypeDescriptor::builder(name)
            .basic_size(64)
            .with_dict()
            .exception()
            .build();
        self.categories.push(ExceptionCategory {
            id,
            name: name.to_string(),
            parent,
            ty,
        });
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// The pre-registered categories.
    pub fn builtins(&self) -> BuiltinCategories {
        self.builtins
    }

    /// Register a new category under `parent`.
    ///
    /// A name that is already registered is rejected and the existing
    /// category is left untouched.
    pub fn register(&mut self, name: &str, parent: CategoryId) -> Result<CategoryId> {
        if self.by_name.contains_key(name) {
            return Err(AmatakError::DuplicateDefinition(name.to_string()));
        }
        if parent.0 >= self.categories.len() {
            return Err(AmatakError::UnknownCategory(format!(
                "parent id {}",
                parent.0
            )));
        }
        Ok(self.insert(name, Some(parent)))
    }

    /// Register a new category under the parent named `parent`.
    pub fn register_by_name(&mut self, name: &str, parent: &str) -> Result<CategoryId> {
        let parent = self
            .lookup(parent)
            .ok_or_else(|| AmatakError::UnknownCategory(parent.to_string()))?;
        self.register(name, parent)
    }

    /// Find a category by name.
    pub fn lookup(&self, name: &str) -> Option<CategoryId> {
        self.by_name.get(name).copied()
    }

    /// The category with id `id`.
    pub fn get(&self, id: CategoryId) -> Option<&ExceptionCategory> {
        self.categories.get(id.0)
    }

    /// Number of registered categories.
    pub fn len(&self) -> usize {
        self.categories.len()
    }

    /// Always false: the root is registered at construction.
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Whether `candidate` is `category` or one of its descendants.
    pub fn matches(&self, category: CategoryId, candidate: CategoryId) -> bool {
        let mut current = Some(candidate);
        while let Some(id) = current {
            if id == category {
                return true;
            }
            current = self.get(id).and_then(|c| c.parent);
        }
        false
    }

    /// Category names from `id` up to the root.
    pub fn chain(&self, id: CategoryId) -> Vec<String> {
        let mut names = Vec::new();
        let mut current = self.get(id);
        while let Some(category) = current {
            names.push(category.name.clone());
            current = category.parent.and_then(|p| self.get(p));
        }
        names
    }

    /// The category a host-side error raises as.
    pub fn category_for(&self, err: &AmatakError) -> CategoryId {
        self.lookup(err.category_name())
            .unwrap_or(self.builtins.base)
    }

    /// Allocate an exception value of `category`.
    pub fn new_exception(
        &self,
        store: &mut ObjectStore,
        category: CategoryId,
        message: impl Into<String>,
        location: Option<SourceLocation>,
    ) -> Result<ValueRef> {
        let ty = self
            .get(category)
            .map(|c| c.ty.clone())
            .ok_or_else(|| AmatakError::UnknownCategory(format!("id {}", category.0)))?;
        let mut data = ExceptionData::new(category, message);
        data.location = location;
        store.allocate(&ty, Payload::Exception(data))
    }

    /// Allocate the exception value a host-side error stands for.
    ///
    /// `Thrown` already carries its value and is returned as is.
    pub fn exception_for_error(&self, store: &mut ObjectStore, err: AmatakError) -> Result<ValueRef> {
        match err {
            AmatakError::Thrown(v) => Ok(v),
            AmatakError::Syntax { message, location } => {
                self.new_exception(store, self.builtins.syntax, message, location)
            }
            AmatakError::Uncaught(info) => {
                let category = self.lookup(&info.category).unwrap_or(self.builtins.base);
                self.new_exception(store, category, info.message, info.location)
            }
            other => {
                let category = self.category_for(&other);
                self.new_exception(store, category, other.message(), None)
            }
        }
    }

    /// Category of the exception value `exc`.
    pub fn category_of(&self, store: &ObjectStore, exc: ValueRef) -> Result<CategoryId> {
        match store.payload(exc)? {
            Payload::Exception(data) => Ok(data.category),
            _ => Err(AmatakError::Type(format!(
                "'{}' object is not an exception",
                store.type_name(exc)?
            ))),
        }
    }

    /// Detached description of the exception value `exc`.
    pub fn info(&self, store: &ObjectStore, exc: ValueRef) -> Result<ExceptionInfo> {
        match store.payload(exc)? {
            Payload::Exception(data) => {
                let chain = self.chain(data.category);
                Ok(ExceptionInfo {
                    category: chain
                        .first()
                        .cloned()
                        .unwrap_or_else(|| store.type_name(exc).unwrap_or_default().to_string()),
                    chain,
                    message: data.message.clone(),
                    location: data.location.clone(),
                })
            }
            _ => Err(AmatakError::Type(format!(
                "'{}' object is not an exception",
                store.type_name(exc)?
            ))),
        }
    }
}

impl Default for ExceptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// An exception as the host sees it, detached from the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionInfo {
    /// Category name
    pub category: String,
    /// Category names from the category up to `BaseException`
    pub chain: Vec<String>,
    /// Message text
    pub message: String,
    /// Source location, when known
    pub location: Option<SourceLocation>,
}

impl ExceptionInfo {
    /// Whether the exception is `category` or a descendant of it.
    pub fn is(&self, category: &str) -> bool {
        self.chain.iter().any(|name| name == category)
    }
}

impl fmt::Display for ExceptionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.message)?;
        if let Some(location) = &self.location {
            write!(f, " at {}", location)?;
        }
        Ok(())
    }
}
