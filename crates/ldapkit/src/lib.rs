//! LDAP directory model: schema, distinguished names, attribute descriptions, filters and
//! matchers.
//!
//! Names and descriptions are parsed against a [`Schema`], which resolves attribute types and
//! supplies the matching rules used to compare values. Filters compile into [`Matcher`]s that
//! evaluate entries with the three-valued logic of RFC 4511.
//!
//! ```
//! use ldapkit::{ConditionResult, Dn, Filter, LdapEntry, Schema};
//!
//! let schema = Schema::core();
//! let entry = LdapEntry::from_strings(
//!     schema,
//!     "cn=Bob,dc=example,dc=com",
//!     [("cn", ["Bob"]), ("mail", ["bob@example.com"])],
//! )?;
//! let matcher = Filter::parse("(&(cn=bob)(mail=*))")?.matcher(schema);
//! assert_eq!(matcher.matches(&entry), ConditionResult::True);
//!
//! let base = Dn::parse("dc=example,dc=com", schema)?;
//! assert!(base.is_ancestor_of(entry.dn()));
//! # Ok::<(), ldapkit::Error>(())
//! ```

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod attribute_description;
mod dn;
mod dn_cache;
mod entry;
mod filter;
mod matcher;
mod rdn;
mod reader;
pub mod schema;
mod search;

pub use attribute_description::AttributeDescription;
pub use dn::{Dn, Rdns};
pub use dn_cache::{DnCache, DnCacheStats};
pub use entry::{Attribute, Entry, LdapEntry};
pub use filter::Filter;
pub use ldapkit_core::{ConditionResult, Error, SchemaOptions};
pub use matcher::Matcher;
pub use rdn::{Ava, Rdn};
pub use schema::{Schema, SchemaBuilder};
pub use search::{search, SearchScope};

/// Convenient result alias that reuses the core error type.
pub type Result<T> = ldapkit_core::Result<T>;
