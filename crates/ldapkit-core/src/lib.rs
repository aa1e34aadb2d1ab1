//! # ldapkit-core
//!
//! Core types shared by the ldapkit directory model.
//!
//! ## Modules
//!
//! - [`error`] - Error type and result alias
//! - [`condition`] - Three-valued filter logic
//! - [`config`] - Options applied by schemas to parsing and caching

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod condition;
pub mod config;
pub mod error;

pub use condition::ConditionResult;
pub use config::{SchemaOptions, DEFAULT_DN_CACHE_CAPACITY, MAX_DN_CACHE_CAPACITY};
pub use error::{Error, Result};
