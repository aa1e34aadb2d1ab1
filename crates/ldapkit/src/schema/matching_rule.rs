//! Matching rules and the assertions they produce.
//!
//! The comparison algorithms themselves are pluggable: a [`MatchingRule`] names a rule and
//! delegates to a [`MatchingRuleImpl`], which normalizes stored values and turns asserted
//! values into [`Assertion`]s.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ldapkit_core::{ConditionResult, Error};

use super::attribute_type::AttributeType;
use crate::Result;

/// A predicate bound to one asserted value, tested against normalized stored values.
#[cfg_attr(test, mockall::automock)]
pub trait Assertion: Send + Sync {
    /// Evaluates the assertion against a value already normalized by the same rule.
    fn matches(&self, normalized_value: &[u8]) -> ConditionResult;
}

/// The algorithm behind a matching rule.
///
/// Equality and approximate rules return assertions that test for a match, ordering rules return
/// assertions that test whether the stored value sorts strictly before the asserted value.
#[cfg_attr(test, mockall::automock)]
pub trait MatchingRuleImpl: Send + Sync {
    /// Normalizes a stored attribute value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the value is not valid for the rule's syntax.
    fn normalize_attribute_value(&self, value: &[u8]) -> Result<Vec<u8>>;

    /// Builds an assertion for a single asserted value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] if the asserted value is not valid for the rule's syntax.
    fn assertion(&self, value: &[u8]) -> Result<Box<dyn Assertion>>;

    /// Builds a substrings assertion.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule does not support substring matching or a component cannot
    /// be decoded.
    fn substrings_assertion<'a>(
        &self,
        initial: Option<&'a [u8]>,
        any: &[Vec<u8>],
        final_value: Option<&'a [u8]>,
    ) -> Result<Box<dyn Assertion>> {
        let _ = (initial, any, final_value);
        Err(Error::InvalidArgument(
            "matching rule does not support substring assertions".to_string(),
        ))
    }
}

struct MatchingRuleInner {
    oid: String,
    names: Vec<String>,
    description: Option<String>,
    syntax_oid: Option<String>,
    implementation: Arc<dyn MatchingRuleImpl>,
}

/// A named matching rule.
///
/// Cloning is cheap; equality and hashing use the OID.
#[derive(Clone)]
pub struct MatchingRule(Arc<MatchingRuleInner>);

impl MatchingRule {
    /// Starts building a matching rule with the given OID and algorithm.
    #[must_use]
    pub fn builder(
        oid: impl Into<String>,
        implementation: impl MatchingRuleImpl + 'static,
    ) -> MatchingRuleBuilder {
        MatchingRuleBuilder {
            oid: oid.into(),
            names: Vec::new(),
            description: None,
            syntax_oid: None,
            implementation: Arc::new(implementation),
        }
    }

    /// Numeric OID of the rule.
    #[must_use]
    pub fn oid(&self) -> &str {
        &self.0.oid
    }

    /// Names of the rule, in definition order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.0.names
    }

    /// Optional human-readable description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.0.description.as_deref()
    }

    /// OID of the assertion syntax, if declared.
    #[must_use]
    pub fn syntax_oid(&self) -> Option<&str> {
        self.0.syntax_oid.as_deref()
    }

    /// First name of the rule, or its OID when unnamed.
    #[must_use]
    pub fn name_or_oid(&self) -> &str {
        self.0.names.first().map_or(self.oid(), String::as_str)
    }

    /// Returns true if `name` is one of the rule's names (case-insensitive) or its OID.
    #[must_use]
    pub fn has_name_or_oid(&self, name: &str) -> bool {
        self.0.oid == name || self.0.names.iter().any(|n| n.eq_ignore_ascii_case(name))
    }

    /// Normalizes a stored attribute value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be decoded by the rule.
    pub fn normalize_attribute_value(&self, value: &[u8]) -> Result<Vec<u8>> {
        self.0.implementation.normalize_attribute_value(value)
    }

    /// Builds an assertion for an asserted value.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be decoded by the rule.
    pub fn assertion(&self, value: &[u8]) -> Result<Box<dyn Assertion>> {
        self.0.implementation.assertion(value)
    }

    /// Builds a substrings assertion.
    ///
    /// # Errors
    ///
    /// Returns an error if the rule has no substring semantics or a component cannot be decoded.
    pub fn substrings_assertion(
        &self,
        initial: Option<&[u8]>,
        any: &[Vec<u8>],
        final_value: Option<&[u8]>,
    ) -> Result<Box<dyn Assertion>> {
        self.0
            .implementation
            .substrings_assertion(initial, any, final_value)
    }
}

impl PartialEq for MatchingRule {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.oid == other.0.oid
    }
}

impl Eq for MatchingRule {}

impl Hash for MatchingRule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.oid.hash(state);
    }
}

impl fmt::Debug for MatchingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchingRule")
            .field("oid", &self.0.oid)
            .field("names", &self.0.names)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for MatchingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name_or_oid())
    }
}

/// Builder for [`MatchingRule`].
pub struct MatchingRuleBuilder {
    oid: String,
    names: Vec<String>,
    description: Option<String>,
    syntax_oid: Option<String>,
    implementation: Arc<dyn MatchingRuleImpl>,
}

impl MatchingRuleBuilder {
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

    /// Sets the assertion syntax OID.
    #[must_use]
    pub fn syntax(mut self, oid: impl Into<String>) -> Self {
        self.syntax_oid = Some(oid.into());
        self
    }

    /// Builds the [`MatchingRule`].
    #[must_use]
    pub fn build(self) -> MatchingRule {
        MatchingRule(Arc::new(MatchingRuleInner {
            oid: self.oid,
            names: self.names,
            description: self.description,
            syntax_oid: self.syntax_oid,
            implementation: self.implementation,
        }))
    }
}

/// The set of attribute types a matching rule may be applied to in extensible filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingRuleUse {
    rule_oid: String,
    attribute_oids: Arc<HashSet<String>>,
}

impl MatchingRuleUse {
    pub(crate) fn new(rule_oid: impl Into<String>, attribute_oids: HashSet<String>) -> Self {
        Self {
            rule_oid: rule_oid.into(),
            attribute_oids: Arc::new(attribute_oids),
        }
    }

    /// OID of the matching rule this use describes.
    #[must_use]
    pub fn rule_oid(&self) -> &str {
        &self.rule_oid
    }

    /// Returns true if the rule applies to `attribute_type`.
    #[must_use]
    pub fn has_attribute(&self, attribute_type: &AttributeType) -> bool {
        self.attribute_oids.contains(attribute_type.oid())
    }

    /// Number of attribute types covered.
    #[must_use]
    pub fn attribute_count(&self) -> usize {
        self.attribute_oids.len()
    }
}

/// Unresolved matching rule use, referencing elements by name or OID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchingRuleUseDefinition {
    pub(crate) rule: String,
    pub(crate) attributes: Vec<String>,
}

impl MatchingRuleUseDefinition {
    /// Creates a definition for the rule named `rule`.
    #[must_use]
    pub fn new(rule: impl Into<String>) -> Self {
        Self {
            rule: rule.into(),
            attributes: Vec::new(),
        }
    }

    /// Adds an attribute type (name or OID) the rule applies to.
    #[must_use]
    pub fn applies_to(mut self, attribute: impl Into<String>) -> Self {
        self.attributes.push(attribute.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_names_and_syntax() {
        let mut implementation = MockMatchingRuleImpl::new();
        implementation
            .expect_normalize_attribute_value()
            .returning(|value| Ok(value.to_ascii_lowercase()));
        let rule = MatchingRule::builder("1.2.3.4", implementation)
            .name("testMatch")
            .syntax("1.3.6.1.4.1.1466.115.121.1.15")
            .description("test rule")
            .build();

        assert_eq!(rule.name_or_oid(), "testMatch");
        assert!(rule.has_name_or_oid("TESTMATCH"));
        assert!(rule.has_name_or_oid("1.2.3.4"));
        assert_eq!(rule.syntax_oid(), Some("1.3.6.1.4.1.1466.115.121.1.15"));
        assert_eq!(rule.description(), Some("test rule"));
        assert_eq!(rule.normalize_attribute_value(b"ABC").unwrap(), b"abc");
        assert_eq!(rule.to_string(), "testMatch");
    }

    #[test]
    fn substrings_are_unsupported_by_default() {
        struct Identity;
        impl MatchingRuleImpl for Identity {
            fn normalize_attribute_value(&self, value: &[u8]) -> Result<Vec<u8>> {
                Ok(value.to_vec())
            }
            fn assertion(&self, _value: &[u8]) -> Result<Box<dyn Assertion>> {
                Err(Error::InvalidArgument("unused".to_string()))
            }
        }

        let rule = MatchingRule::builder("1.2.3", Identity).build();
        assert!(rule.substrings_assertion(Some(b"a"), &[], None).is_err());
        assert_eq!(rule.name_or_oid(), "1.2.3");
    }

    #[test]
    fn equality_uses_oid() {
        let a = MatchingRule::builder("1.2.3", MockMatchingRuleImpl::new())
            .name("a")
            .build();
        let b = MatchingRule::builder("1.2.3", MockMatchingRuleImpl::new())
            .name("b")
            .build();
        let c = MatchingRule::builder("1.2.4", MockMatchingRuleImpl::new()).build();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
