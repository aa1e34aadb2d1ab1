//! Configuration structures for schema construction.
//!
//! [`SchemaOptions`] controls the behaviour that a schema imposes on everything parsed against
//! it: how many distinguished names are memoised and how strictly attribute names are checked.

use crate::Error;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Default capacity of the per-schema distinguished name cache.
pub const DEFAULT_DN_CACHE_CAPACITY: usize = 100;

/// Upper bound accepted for the distinguished name cache capacity.
pub const MAX_DN_CACHE_CAPACITY: usize = 100_000;

/// Options applied by a schema to parsing and caching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SchemaOptions {
    /// Number of parsed distinguished names retained per schema (0 disables the cache)
    #[validate(range(max = 100_000))]
    #[serde(default = "default_dn_cache_capacity")]
    pub dn_cache_capacity: usize,

    /// Whether attribute names and options may contain `_` and `.`
    #[serde(default = "default_allow_malformed_names_and_options")]
    pub allow_malformed_names_and_options: bool,
}

const fn default_dn_cache_capacity() -> usize {
    DEFAULT_DN_CACHE_CAPACITY
}

const fn default_allow_malformed_names_and_options() -> bool {
    false
}

impl SchemaOptions {
    /// Create options with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dn_cache_capacity: default_dn_cache_capacity(),
            allow_malformed_names_and_options: default_allow_malformed_names_and_options(),
        }
    }

    /// Set the distinguished name cache capacity.
    #[must_use]
    pub const fn with_dn_cache_capacity(mut self, capacity: usize) -> Self {
        self.dn_cache_capacity = capacity;
        self
    }

    /// Disable the distinguished name cache.
    #[must_use]
    pub const fn without_dn_cache(mut self) -> Self {
        self.dn_cache_capacity = 0;
        self
    }

    /// Allow `_` and `.` in attribute names and options.
    #[must_use]
    pub const fn with_malformed_names_and_options(mut self, allow: bool) -> Self {
        self.allow_malformed_names_and_options = allow;
        self
    }

    /// Validate the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigError`] if any option is out of range.
    pub fn validated(self) -> Result<Self, Error> {
        self.validate()
            .map_err(|e| Error::ConfigError(format!("Invalid schema options: {e}")))?;
        Ok(self)
    }
}

impl Default for SchemaOptions {
    fn default() -> Self {
        Self::new()
    }
}
