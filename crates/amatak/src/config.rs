//! Interpreter configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AmatakError, Result};
use crate::frontends::standard::DEFAULT_MAX_NESTING;

/// Environment variable whose entries are prepended to the search path.
pub const SEARCH_PATH_ENV: &str = "AMATAK_PATH";

/// Configuration for an [`Interpreter`](crate::Interpreter).
///
/// Controls the initial module search path, recursion limits and object
/// store limits. The search path here only seeds the module registry at
/// `initialize()`; later changes go through `add_search_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterpreterConfig {
    /// Directories searched for modules, highest priority first
    pub search_path: Vec<PathBuf>,

    /// File extension of module sources (without the dot)
    pub module_extension: String,

    /// Maximum nesting of in-progress imports
    pub max_import_depth: usize,

    /// Maximum expression nesting depth in the executor
    pub max_eval_depth: usize,

    /// Maximum bracket nesting accepted by the standard frontend
    pub max_nesting_depth: usize,

    /// Maximum number of live objects in the store
    pub max_objects: Option<usize>,

    /// Maximum number of accounted bytes in the store
    pub memory_limit: Option<usize>,

    /// Abort the process instead of raising when allocation fails
    pub fatal_on_allocation_failure: bool,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        Self {
            search_path: vec![PathBuf::from(".")],
            module_extension: "amatak".to_string(),
            max_import_depth: 64,
            max_eval_depth: 256,
            max_nesting_depth: DEFAULT_MAX_NESTING,
            max_objects: None,
            memory_limit: None,
            fatal_on_allocation_failure: false,
        }
    }
}

impl InterpreterConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Default configuration with `AMATAK_PATH` entries in front of the search path.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(raw) = std::env::var_os(SEARCH_PATH_ENV) {
            let mut path: Vec<PathBuf> = std::env::split_paths(&raw)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            path.append(&mut config.search_path);
            config.search_path = path;
        }
        config
    }

    /// Parse a configuration from JSON; missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| AmatakError::Value(format!("invalid interpreter configuration: {}", e)))
    }

    /// Replace the initial search path.
    pub fn with_search_path<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_path = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Set the module file extension.
    pub fn with_module_extension(mut self, ext: impl Into<String>) -> Self {
        self.module_extension = ext.into();
        self
    }

    /// Limit the number of live objects.
    pub fn with_max_objects(mut self, max: usize) -> Self {
        self.max_objects = Some(max);
        self
    }

    /// Limit the accounted memory of the store.
    pub fn with_memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    /// Set the maximum expression nesting depth.
    pub fn with_max_eval_depth(mut self, depth: usize) -> Self {
        self.max_eval_depth = depth;
        self
    }

    /// Set the maximum source nesting depth.
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }

    /// Set the maximum import nesting depth.
    pub fn with_max_import_depth(mut self, depth: usize) -> Self {
        self.max_import_depth = depth;
        self
    }
}
