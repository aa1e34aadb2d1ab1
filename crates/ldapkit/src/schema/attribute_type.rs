//! Attribute types and their unresolved definitions.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::matching_rule::MatchingRule;
use super::syntax::Syntax;

/// OID of the `objectClass` attribute type.
pub const OBJECT_CLASS_OID: &str = "2.5.4.0";

/// Intended use of an attribute type (RFC 4512 §4.1.2).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AttributeUsage {
    /// Ordinary user attribute.
    #[default]
    UserApplications,
    /// Operational attribute used by directory operations.
    DirectoryOperation,
    /// Operational attribute shared across DSAs.
    DistributedOperation,
    /// Operational attribute local to one DSA.
    DsaOperation,
}

impl AttributeUsage {
    /// Returns true for every usage except `UserApplications`.
    #[must_use]
    pub const fn is_operational(self) -> bool {
        !matches!(self, Self::UserApplications)
    }
}

pub(crate) struct AttributeTypeInner {
    pub(crate) oid: String,
    pub(crate) names: Vec<String>,
    pub(crate) description: Option<String>,
    pub(crate) superior: Option<AttributeType>,
    pub(crate) equality: Option<MatchingRule>,
    pub(crate) ordering: Option<MatchingRule>,
    pub(crate) substring: Option<MatchingRule>,
    pub(crate) approximate: Option<MatchingRule>,
    pub(crate) syntax: Syntax,
    pub(crate) single_value: bool,
    pub(crate) usage: AttributeUsage,
}

/// A resolved attribute type, owned by a [`Schema`](super::Schema).
///
/// Cloning is cheap. Equality, hashing and ordering use the numeric OID.
#[derive(Clone)]
pub struct AttributeType(pub(crate) Arc<AttributeTypeInner>);

impl AttributeType {
    /// Numeric OID.
    #[must_use]
    pub fn oid(&self) -> &str {
        &self.0.oid
    }

    /// Names in definition order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.0.names
    }

    /// First name, or the OID when the type is unnamed.
    #[must_use]
    pub fn name_or_oid(&self) -> &str {
        self.0.names.first().map_or(self.oid(), String::as_str)
    }

    /// Returns true if `name` is one of the type's names (case-insensitive) or its OID.
    #[must_use]
    pub fn has_name_or_oid(&self, name: &str) -> bool {
        self.0.oid == name || self.0.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    /// Description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    /// Direct superior type.
    #[must_use]
    pub fn superior(&self) -> Option<&AttributeType> {
        self.0.superior.as_ref()
    }

    /// Equality matching rule, possibly inherited.
    #[must_use]
    pub fn equality_matching_rule(&self) -> Option<&MatchingRule> {
        self.0.equality.as_ref()
    }

    /// Ordering matching rule, possibly inherited.
    #[must_use]
    pub fn ordering_matching_rule(&self) -> Option<&MatchingRule> {
        self.0.ordering.as_ref()
    }

    /// Substring matching rule, possibly inherited.
    #[must_use]
    pub fn substring_matching_rule(&self) -> Option<&MatchingRule> {
        self.0.substring.as_ref()
    }

    /// Approximate matching rule, possibly inherited.
    #[must_use]
    pub fn approximate_matching_rule(&self) -> Option<&MatchingRule> {
        self.0.approximate.as_ref()
    }

    /// Syntax, possibly inherited.
    #[must_use]
    pub fn syntax(&self) -> &Syntax {
        &self.0.syntax
    }

    /// Whether the type permits at most one value.
    #[must_use]
    pub fn is_single_value(&self) -> bool {
        self.0.single_value
    }

    /// Usage of the type.
    #[must_use]
    pub fn usage(&self) -> AttributeUsage {
        self.0.usage
    }

    /// Returns true for operational attribute types.
    #[must_use]
    pub fn is_operational(&self) -> bool {
        self.0.usage.is_operational()
    }

    /// Returns true for the `objectClass` attribute type.
    #[must_use]
    pub fn is_object_class(&self) -> bool {
        self.0.oid == OBJECT_CLASS_OID
    }

    /// Returns true if this type equals `other` or inherits from it.
    #[must_use]
    pub fn is_sub_type_of(&self, other: &AttributeType) -> bool {
        let mut current = Some(self);
        while let Some(attribute_type) = current {
            if attribute_type == other {
                return true;
            }
            current = attribute_type.superior();
        }
        false
    }

    /// Returns true if `other` equals this type or inherits from it.
    #[must_use]
    pub fn is_super_type_of(&self, other: &AttributeType) -> bool {
        other.is_sub_type_of(self)
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for AttributeType {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.0.oid == other.0.oid
    }
}

impl Eq for AttributeType {}

impl Hash for AttributeType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.oid.hash(state);
    }
}

impl Ord for AttributeType {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_oids(&self.0.oid, &other.0.oid)
    }
}

impl PartialOrd for AttributeType {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeType")
            .field("oid", &self.0.oid)
            .field("names", &self.0.names)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name_or_oid())
    }
}

/// Compares dotted OIDs arc by arc, numerically.
///
/// Arcs that are not plain digit strings fall back to byte ordering.
pub(crate) fn compare_oids(left: &str, right: &str) -> Ordering {
    let mut left_arcs = left.split('.');
    let mut right_arcs = right.split('.');
    loop {
        match (left_arcs.next(), right_arcs.next()) {
            (Some(l), Some(r)) => {
                let l = l.trim_start_matches('0');
                let r = r.trim_start_matches('0');
                let numeric = l.bytes().all(|b| b.is_ascii_digit())
                    && r.bytes().all(|b| b.is_ascii_digit());
                let compared = if numeric {
                    l.len().cmp(&r.len()).then_with(|| l.cmp(r))
                } else {
                    l.cmp(r)
                };
                if compared.is_ne() {
                    return compared;
                }
            }
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (None, None) => return left.cmp(right),
        }
    }
}

/// Unresolved attribute type definition, referencing rules, syntax and superior by name or OID.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AttributeTypeDefinition {
    pub(crate) oid: String,
    pub(crate) names: Vec<String>,
    pub(crate) description: Option<String>,
    pub(crate) superior: Option<String>,
    pub(crate) equality: Option<String>,
    pub(crate) ordering: Option<String>,
    pub(crate) substring: Option<String>,
    pub(crate) approximate: Option<String>,
    pub(crate) syntax: Option<String>,
    pub(crate) single_value: bool,
    pub(crate) usage: AttributeUsage,
}

impl AttributeTypeDefinition {
    /// Starts a definition for the given OID.
    #[must_use]
    pub fn new(oid: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            ..Self::default()
        }
    }

    /// Appends a name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the superior type.
    #[must_use]
    pub fn superior(mut self, superior: impl Into<String>) -> Self {
        self.superior = Some(superior.into());
        self
    }

    /// Sets the equality matching rule.
    #[must_use]
    pub fn equality(mut self, rule: impl Into<String>) -> Self {
        self.equality = Some(rule.into());
        self
    }

    /// Sets the ordering matching rule.
    #[must_use]
    pub fn ordering(mut self, rule: impl Into<String>) -> Self {
        self.ordering = Some(rule.into());
        self
    }

    /// Sets the substring matching rule.
    #[must_use]
    pub fn substring(mut self, rule: impl Into<String>) -> Self {
        self.substring = Some(rule.into());
        self
    }

    /// Sets the approximate matching rule.
    #[must_use]
    pub fn approximate(mut self, rule: impl Into<String>) -> Self {
        self.approximate = Some(rule.into());
        self
    }

    /// Sets the syntax OID.
    #[must_use]
    pub fn syntax(mut self, oid: impl Into<String>) -> Self {
        self.syntax = Some(oid.into());
        self
    }

    /// Marks the type single-valued.
    #[must_use]
    pub fn single_value(mut self) -> Self {
        self.single_value = true;
        self
    }

    /// Sets the usage.
    #[must_use]
    pub fn usage(mut self, usage: AttributeUsage) -> Self {
        self.usage = usage;
        self
    }

    /// OID of the definition.
    #[must_use]
    pub fn oid(&self) -> &str {
        &self.oid
    }
}
