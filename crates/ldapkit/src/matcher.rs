//! Compiled filters.
//!
//! [`Matcher::compile`] resolves every attribute description, matching rule and asserted value
//! of a [`Filter`] once, so evaluation never consults the schema again. Compilation cannot fail:
//! a component that cannot be resolved becomes a matcher that always evaluates to
//! `Undefined`, which only that component of the filter is affected by.
//!
//! Evaluation follows RFC 4511 §4.5.1.7. An assertion over an attribute is `True` when any
//! value matches, otherwise `Undefined` when any value could not be evaluated, otherwise
//! `False`. An absent attribute is `False`. Attributes are looked up together with their
//! subtypes, so `(name=Bob)` matches an entry holding `cn: Bob`.

use std::fmt;

use ldapkit_core::ConditionResult;
use tracing::debug;

use crate::attribute_description::AttributeDescription;
use crate::entry::{Attribute, Entry};
use crate::filter::Filter;
use crate::schema::{Assertion, MatchingRule, MatchingRuleUse, Schema};

/// A filter bound to a schema, ready to evaluate against entries.
///
/// Matchers are immutable and may be shared between threads.
pub struct Matcher(Kind);

enum Kind {
    Constant(ConditionResult),
    And(Vec<Matcher>),
    Or(Vec<Matcher>),
    Not(Box<Matcher>),
    Present(AttributeDescription),
    Value(ValueTest),
    LessOrEqual {
        description: AttributeDescription,
        ordering: Option<RuleAssertion>,
        equality: Option<RuleAssertion>,
    },
    Extensible(Extensible),
}

/// A rule together with an assertion it produced.
struct RuleAssertion {
    rule: MatchingRule,
    assertion: Box<dyn Assertion>,
}

impl RuleAssertion {
    fn new(rule: &MatchingRule, value: &[u8]) -> Option<Self> {
        match rule.assertion(value) {
            Ok(assertion) => Some(Self {
                rule: rule.clone(),
                assertion,
            }),
            Err(err) => {
                debug!(rule = %rule, error = %err, "asserted value rejected by matching rule");
                None
            }
        }
    }

    fn test(&self, value: &[u8]) -> ConditionResult {
        match self.rule.normalize_attribute_value(value) {
            Ok(normalized) => self.assertion.matches(&normalized),
            Err(_) => ConditionResult::Undefined,
        }
    }
}

struct ValueTest {
    description: AttributeDescription,
    test: RuleAssertion,
    inverted: bool,
}

struct Extensible {
    description: Option<AttributeDescription>,
    test: RuleAssertion,
    rule_use: Option<MatchingRuleUse>,
    dn_attributes: bool,
}

impl Matcher {
    /// Compiles `filter` against `schema`.
    #[must_use]
    pub fn compile(filter: &Filter, schema: &Schema) -> Self {
        match filter {
            Filter::And(filters) => Self::and(filters.iter().map(|f| Self::compile(f, schema))),
            Filter::Or(filters) => Self::or(filters.iter().map(|f| Self::compile(f, schema))),
            Filter::Not(inner) => Self::not(Self::compile(inner, schema)),
            Filter::Equality { attribute, value } => {
                compile_value(filter, schema, attribute, value, ValueRule::Equality)
            }
            Filter::Approx { attribute, value } => {
                compile_value(filter, schema, attribute, value, ValueRule::Approximate)
            }
            Filter::GreaterOrEqual { attribute, value } => {
                compile_value(filter, schema, attribute, value, ValueRule::GreaterOrEqual)
            }
            Filter::Substrings {
                attribute,
                initial,
                any,
                final_value,
            } => compile_substrings(
                filter,
                schema,
                attribute,
                initial.as_deref(),
                any,
                final_value.as_deref(),
            ),
            Filter::LessOrEqual { attribute, value } => {
                compile_less_or_equal(filter, schema, attribute, value)
            }
            Filter::Present { attribute } => match describe(filter, schema, attribute) {
                Some(description) => Self(Kind::Present(description)),
                None => Self::undefined(),
            },
            Filter::Extensible {
                matching_rule,
                attribute,
                value,
                dn_attributes,
            } => compile_extensible(
                filter,
                schema,
                matching_rule.as_deref(),
                attribute.as_deref(),
                value,
                *dn_attributes,
            ),
            Filter::Unrecognized { tag, .. } => {
                debug!(tag, "unrecognized filter choice compiles to undefined");
                Self::undefined()
            }
        }
    }

    /// A matcher that always evaluates to `result`.
    #[must_use]
    pub const fn constant(result: ConditionResult) -> Self {
        Self(Kind::Constant(result))
    }

    /// A matcher that always evaluates to `Undefined`.
    #[must_use]
    pub const fn undefined() -> Self {
        Self::constant(ConditionResult::Undefined)
    }

    /// Conjunction. Evaluation stops at the first `False` child.
    #[must_use]
    pub fn and(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        Self(Kind::And(matchers.into_iter().collect()))
    }

    /// Disjunction. Evaluation stops at the first `True` child.
    #[must_use]
    pub fn or(matchers: impl IntoIterator<Item = Matcher>) -> Self {
        Self(Kind::Or(matchers.into_iter().collect()))
    }

    /// Negation; `Undefined` stays `Undefined`.
    #[must_use]
    pub fn not(matcher: Matcher) -> Self {
        Self(Kind::Not(Box::new(matcher)))
    }

    /// Returns true if this matcher evaluates to `Undefined` for every entry.
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self.0, Kind::Constant(ConditionResult::Undefined))
    }

    /// Evaluates the matcher against `entry`.
    pub fn matches<E: Entry + ?Sized>(&self, entry: &E) -> ConditionResult {
        match &self.0 {
            Kind::Constant(result) => *result,
            Kind::And(matchers) => ConditionResult::all(matchers.iter().map(|m| m.matches(entry))),
            Kind::Or(matchers) => ConditionResult::any(matchers.iter().map(|m| m.matches(entry))),
            Kind::Not(matcher) => !matcher.matches(entry),
            Kind::Present(description) => {
                ConditionResult::from_bool(entry.attributes_matching(description).next().is_some())
            }
            Kind::Value(value) => any_value(entry, &value.description, |stored| {
                let result = value.test.test(stored);
                if value.inverted {
                    !result
                } else {
                    result
                }
            }),
            Kind::LessOrEqual {
                description,
                ordering,
                equality,
            } => any_value(entry, description, |stored| {
                less_or_equal(ordering.as_ref(), equality.as_ref(), stored)
            }),
            Kind::Extensible(extensible) => extensible.matches(entry),
        }
    }
}

impl fmt::Debug for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Kind::Constant(result) => write!(f, "Constant({result})"),
            Kind::And(matchers) => f.debug_tuple("And").field(matchers).finish(),
            Kind::Or(matchers) => f.debug_tuple("Or").field(matchers).finish(),
            Kind::Not(matcher) => f.debug_tuple("Not").field(matcher).finish(),
            Kind::Present(description) => write!(f, "Present({description})"),
            Kind::Value(value) => write!(
                f,
                "Value({}, {}{})",
                value.description,
                value.test.rule,
                if value.inverted { ", inverted" } else { "" }
            ),
            Kind::LessOrEqual { description, .. } => write!(f, "LessOrEqual({description})"),
            Kind::Extensible(extensible) => write!(
                f,
                "Extensible({}, {})",
                extensible
                    .description
                    .as_ref()
                    .map_or("*", AttributeDescription::as_str),
                extensible.test.rule
            ),
        }
    }
}

fn any_value<E, F>(entry: &E, description: &AttributeDescription, test: F) -> ConditionResult
where
    E: Entry + ?Sized,
    F: Fn(&[u8]) -> ConditionResult,
{
    ConditionResult::any(
        entry
            .attributes_matching(description)
            .flat_map(Attribute::values)
            .map(Vec::as_slice)
            .map(test),
    )
}

fn less_or_equal(
    ordering: Option<&RuleAssertion>,
    equality: Option<&RuleAssertion>,
    value: &[u8],
) -> ConditionResult {
    let ordered = ordering.map(|ordering| ordering.test(value));
    if ordered == Some(ConditionResult::True) {
        return ConditionResult::True;
    }
    let equal = equality.map(|equality| equality.test(value));
    if equal == Some(ConditionResult::True) {
        return ConditionResult::True;
    }
    ordered.or(equal).unwrap_or(ConditionResult::Undefined)
}

impl Extensible {
    fn matches<E: Entry + ?Sized>(&self, entry: &E) -> ConditionResult {
        let values = match (&self.description, &self.rule_use) {
            (Some(description), _) => any_value(entry, description, |value| self.test.test(value)),
            (None, Some(rule_use)) => ConditionResult::any(
                entry
                    .attributes()
                    .filter(|attribute| {
                        rule_use.has_attribute(attribute.description().attribute_type())
                    })
                    .flat_map(Attribute::values)
                    .map(|value| self.test.test(value)),
            ),
            (None, None) => ConditionResult::Undefined,
        };
        if !self.dn_attributes || values.is_true() {
            return values;
        }

        let dn = ConditionResult::any(
            entry
                .name()
                .rdns()
                .flat_map(|rdn| rdn.iter())
                .filter(|ava| match (&self.description, &self.rule_use) {
                    (Some(description), _) => ava
                        .attribute_type()
                        .is_sub_type_of(description.attribute_type()),
                    (None, Some(rule_use)) => rule_use.has_attribute(ava.attribute_type()),
                    (None, None) => false,
                })
                .map(|ava| self.test.test(ava.value())),
        );
        values.or(dn)
    }
}

#[derive(Clone, Copy)]
enum ValueRule {
    Equality,
    Approximate,
    GreaterOrEqual,
}

fn undefined(filter: &Filter, reason: &str) -> Matcher {
    debug!(filter = %filter, reason, "filter component compiles to undefined");
    Matcher::undefined()
}

fn describe(filter: &Filter, schema: &Schema, attribute: &str) -> Option<AttributeDescription> {
    match AttributeDescription::parse(attribute, schema) {
        Ok(description) => Some(description),
        Err(err) => {
            debug!(filter = %filter, error = %err, "attribute description not resolved");
            None
        }
    }
}

fn compile_value(
    filter: &Filter,
    schema: &Schema,
    attribute: &str,
    value: &[u8],
    kind: ValueRule,
) -> Matcher {
    let Some(description) = describe(filter, schema, attribute) else {
        return Matcher::undefined();
    };
    let attribute_type = description.attribute_type();
    let rule = match kind {
        ValueRule::Equality => attribute_type.equality_matching_rule(),
        ValueRule::Approximate => attribute_type.approximate_matching_rule(),
        ValueRule::GreaterOrEqual => attribute_type.ordering_matching_rule(),
    };
    let Some(rule) = rule else {
        return undefined(filter, "attribute type has no suitable matching rule");
    };
    let Some(test) = RuleAssertion::new(rule, value) else {
        return undefined(filter, "asserted value is invalid");
    };
    Matcher(Kind::Value(ValueTest {
        description,
        test,
        inverted: matches!(kind, ValueRule::GreaterOrEqual),
    }))
}

fn compile_substrings(
    filter: &Filter,
    schema: &Schema,
    attribute: &str,
    initial: Option<&[u8]>,
    any: &[Vec<u8>],
    final_value: Option<&[u8]>,
) -> Matcher {
    let Some(description) = describe(filter, schema, attribute) else {
        return Matcher::undefined();
    };
    let Some(rule) = description.attribute_type().substring_matching_rule().cloned() else {
        return undefined(filter, "attribute type has no substring matching rule");
    };
    let assertion = match rule.substrings_assertion(initial, any, final_value) {
        Ok(assertion) => assertion,
        Err(err) => {
            debug!(filter = %filter, error = %err, "substrings assertion rejected");
            return Matcher::undefined();
        }
    };
    Matcher(Kind::Value(ValueTest {
        description,
        test: RuleAssertion { rule, assertion },
        inverted: false,
    }))
}

fn compile_less_or_equal(filter: &Filter, schema: &Schema, attribute: &str, value: &[u8]) -> Matcher {
    let Some(description) = describe(filter, schema, attribute) else {
        return Matcher::undefined();
    };
    let attribute_type = description.attribute_type();
    let ordering = match attribute_type.ordering_matching_rule() {
        Some(rule) => match RuleAssertion::new(rule, value) {
            Some(test) => Some(test),
            None => return undefined(filter, "asserted value is invalid for the ordering rule"),
        },
        None => None,
    };
    let equality = match attribute_type.equality_matching_rule() {
        Some(rule) => match RuleAssertion::new(rule, value) {
            Some(test) => Some(test),
            None => return undefined(filter, "asserted value is invalid for the equality rule"),
        },
        None => None,
    };
    if ordering.is_none() && equality.is_none() {
        return undefined(filter, "attribute type has no ordering or equality matching rule");
    }
    Matcher(Kind::LessOrEqual {
        description,
        ordering,
        equality,
    })
}

fn compile_extensible(
    filter: &Filter,
    schema: &Schema,
    matching_rule: Option<&str>,
    attribute: Option<&str>,
    value: &[u8],
    dn_attributes: bool,
) -> Matcher {
    let description = match attribute {
        Some(attribute) => match describe(filter, schema, attribute) {
            Some(description) => Some(description),
            None => return Matcher::undefined(),
        },
        None => None,
    };

    let (rule, rule_use) = match (matching_rule, &description) {
        (Some(name), description) => {
            let Some(rule) = schema.matching_rule(name) else {
                return undefined(filter, "unknown matching rule");
            };
            let Some(rule_use) = schema.matching_rule_use(&rule).cloned() else {
                return undefined(filter, "matching rule has no matching rule use");
            };
            if let Some(description) = description {
                if !rule_use.has_attribute(description.attribute_type()) {
                    return undefined(filter, "matching rule does not apply to attribute type");
                }
            }
            (rule, Some(rule_use))
        }
        (None, Some(description)) => {
            let Some(rule) = description.attribute_type().equality_matching_rule() else {
                return undefined(filter, "attribute type has no equality matching rule");
            };
            (rule.clone(), None)
        }
        (None, None) => {
            return undefined(filter, "neither matching rule nor attribute description given")
        }
    };

    let Some(test) = RuleAssertion::new(&rule, value) else {
        return undefined(filter, "asserted value is invalid");
    };
    Matcher(Kind::Extensible(Extensible {
        description,
        test,
        rule_use,
        dn_attributes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::Dn;
    use crate::entry::LdapEntry;
    use crate::schema::{
        AttributeTypeDefinition, MatchingRuleUseDefinition, MockAssertion, MockMatchingRuleImpl,
    };
    use ldapkit_core::Error;

    fn bob() -> LdapEntry {
        LdapEntry::from_strings(
            Schema::core(),
            "cn=Bob,ou=People,dc=example,dc=com",
            [
                ("objectClass", vec!["top", "person"]),
                ("cn", vec!["Bob", "Robert"]),
                ("cn;lang-fr", vec!["Bobbi"]),
                ("uidNumber", vec!["1000"]),
                ("mail", vec!["bob@example.com"]),
                ("description", vec![]),
            ],
        )
        .unwrap()
    }

    fn eval(filter: &str, entry: &LdapEntry) -> ConditionResult {
        Filter::parse(filter)
            .unwrap()
            .matcher(Schema::core())
            .matches(entry)
    }

    #[test]
    fn equality_is_case_insensitive_for_cn() {
        let entry = bob();
        assert_eq!(eval("(cn=Bob)", &entry), ConditionResult::True);
        assert_eq!(eval("(cn=bob)", &entry), ConditionResult::True);
        assert_eq!(eval("(cn=robert)", &entry), ConditionResult::True);
        assert_eq!(eval("(cn=Alice)", &entry), ConditionResult::False);
        assert_eq!(eval("(sn=Bob)", &entry), ConditionResult::False);
    }

    #[test]
    fn supertype_and_option_lookup() {
        let entry = bob();
        assert_eq!(eval("(name=Bobbi)", &entry), ConditionResult::True);
        assert_eq!(eval("(cn;lang-fr=Bob)", &entry), ConditionResult::False);
        assert_eq!(eval("(cn;lang-fr=bobbi)", &entry), ConditionResult::True);
    }

    #[test]
    fn present_never_undefined() {
        let entry = bob();
        assert_eq!(eval("(mail=*)", &entry), ConditionResult::True);
        assert_eq!(eval("(description=*)", &entry), ConditionResult::True);
        assert_eq!(eval("(sn=*)", &entry), ConditionResult::False);
        assert_eq!(eval("(shoeSize=*)", &entry), ConditionResult::Undefined);
    }

    #[test]
    fn substrings() {
        let entry = bob();
        assert_eq!(eval("(cn=B*)", &entry), ConditionResult::True);
        assert_eq!(eval("(cn=*ber*)", &entry), ConditionResult::True);
        assert_eq!(eval("(mail=*@EXAMPLE.com)", &entry), ConditionResult::True);
        assert_eq!(eval("(cn=X*)", &entry), ConditionResult::False);
        assert_eq!(eval("(uidNumber=1*)", &entry), ConditionResult::Undefined);
    }

    #[test]
    fn ordering_filters() {
        let entry = bob();
        assert_eq!(eval("(uidNumber>=1000)", &entry), ConditionResult::True);
        assert_eq!(eval("(uidNumber>=999)", &entry), ConditionResult::True);
        assert_eq!(eval("(uidNumber>=1001)", &entry), ConditionResult::False);
        assert_eq!(eval("(uidNumber<=1000)", &entry), ConditionResult::True);
        assert_eq!(eval("(uidNumber<=1001)", &entry), ConditionResult::True);
        assert_eq!(eval("(uidNumber<=999)", &entry), ConditionResult::False);
        assert_eq!(eval("(uidNumber>=abc)", &entry), ConditionResult::Undefined);
    }

    #[test]
    fn less_or_equal_falls_back_to_equality() {
        let entry = bob();
        // mail has no ordering rule
        assert_eq!(eval("(mail<=BOB@example.com)", &entry), ConditionResult::True);
        assert_eq!(eval("(mail<=zed@example.com)", &entry), ConditionResult::False);
        // userPassword only has an equality rule and the entry holds no password
        assert_eq!(eval("(userPassword<=x)", &entry), ConditionResult::False);
    }

    #[test]
    fn approx_without_approximate_rule_is_undefined() {
        let entry = bob();
        assert_eq!(eval("(cn~=BOB)", &entry), ConditionResult::Undefined);
        assert_eq!(eval("(cn~=Alice)", &entry), ConditionResult::Undefined);
        assert!(Filter::parse("(mail~=x)").unwrap().matcher(Schema::core()).is_undefined());
    }

    #[test]
    fn less_or_equal_rejects_values_the_ordering_rule_cannot_decode() {
        let schema = Schema::builder("mixed")
            .with_core_schema()
            .add_attribute_type(
                AttributeTypeDefinition::new("1.3.6.1.4.1.99999.3.1")
                    .name("roomNumber")
                    .equality("caseIgnoreMatch")
                    .ordering("integerOrderingMatch")
                    .syntax("1.3.6.1.4.1.1466.115.121.1.15"),
            )
            .build()
            .unwrap();
        let entry =
            LdapEntry::from_strings(&schema, "cn=Room", [("roomNumber", ["abc", "12"])]).unwrap();
        let eval = |text: &str| Filter::parse(text).unwrap().matcher(&schema).matches(&entry);

        assert!(Filter::parse("(roomNumber<=abc)").unwrap().matcher(&schema).is_undefined());
        assert_eq!(eval("(roomNumber<=abc)"), ConditionResult::Undefined);
        assert_eq!(eval("(roomNumber<=20)"), ConditionResult::True);
        assert_eq!(eval("(roomNumber<=5)"), ConditionResult::Undefined);
    }

    #[test]
    fn logic_laws() {
        let entry = bob();
        assert_eq!(eval("(&(cn=Bob)(shoeSize=1))", &entry), ConditionResult::Undefined);
        assert_eq!(eval("(&(cn=Alice)(shoeSize=1))", &entry), ConditionResult::False);
        assert_eq!(eval("(|(cn=Bob)(shoeSize=1))", &entry), ConditionResult::True);
        assert_eq!(eval("(|(cn=Alice)(shoeSize=1))", &entry), ConditionResult::Undefined);
        assert_eq!(eval("(!(shoeSize=1))", &entry), ConditionResult::Undefined);
        assert_eq!(eval("(!(cn=Alice))", &entry), ConditionResult::True);
        assert_eq!(eval("(&)", &entry), ConditionResult::True);
        assert_eq!(eval("(|)", &entry), ConditionResult::False);
    }

    #[test]
    fn constant_combinators() {
        let entry = bob();
        let and = Matcher::and([
            Matcher::constant(ConditionResult::False),
            Matcher::undefined(),
        ]);
        assert_eq!(and.matches(&entry), ConditionResult::False);
        let or = Matcher::or([
            Matcher::constant(ConditionResult::True),
            Matcher::undefined(),
        ]);
        assert_eq!(or.matches(&entry), ConditionResult::True);
        assert_eq!(Matcher::not(Matcher::undefined()).matches(&entry), ConditionResult::Undefined);
    }

    #[test]
    fn unresolvable_components_compile_to_undefined() {
        let schema = Schema::core();
        for text in [
            "(shoeSize=9)",
            "(userPassword=*x*)",
            "(uidNumber=abc)",
            "(cn:noSuchRule:=x)",
            "(mail:integerMatch:=1)",
            "(:noSuchRule:=x)",
        ] {
            let filter = Filter::parse(text).unwrap();
            assert!(filter.matcher(schema).is_undefined(), "{text}");
        }
        let unrecognized = Filter::Unrecognized {
            tag: 0xaa,
            data: Vec::new(),
        };
        assert!(unrecognized.matcher(schema).is_undefined());
    }

    #[test]
    fn extensible_with_attribute_and_rule() {
        let entry = bob();
        assert_eq!(eval("(cn:caseExactMatch:=Bob)", &entry), ConditionResult::True);
        assert_eq!(eval("(cn:caseExactMatch:=bob)", &entry), ConditionResult::False);
        assert_eq!(eval("(cn:=ROBERT)", &entry), ConditionResult::True);
    }

    #[test]
    fn extensible_rule_only_uses_matching_rule_use() {
        let entry = bob();
        assert_eq!(eval("(:caseIgnoreIA5Match:=BOB@EXAMPLE.COM)", &entry), ConditionResult::True);
        assert_eq!(eval("(:integerMatch:=1000)", &entry), ConditionResult::True);
        assert_eq!(eval("(:integerMatch:=7)", &entry), ConditionResult::False);
    }

    #[test]
    fn extensible_dn_attributes() {
        let entry = bob();
        assert_eq!(eval("(ou:=people)", &entry), ConditionResult::False);
        assert_eq!(eval("(ou:dn:=people)", &entry), ConditionResult::True);
        assert_eq!(eval("(:dn:caseIgnoreIA5Match:=EXAMPLE)", &entry), ConditionResult::True);
        assert_eq!(eval("(name:dn:=people)", &entry), ConditionResult::True);
        assert_eq!(eval("(sn:dn:=people)", &entry), ConditionResult::False);
    }

    fn mocked_schema(assertion_result: ConditionResult, normalize_fails: bool) -> Schema {
        let mut implementation = MockMatchingRuleImpl::new();
        implementation
            .expect_normalize_attribute_value()
            .returning(move |value| {
                if normalize_fails && value == b"bad" {
                    Err(Error::decode("bad", "rejected"))
                } else {
                    Ok(value.to_vec())
                }
            });
        implementation.expect_assertion().returning(move |_| {
            let mut assertion = MockAssertion::new();
            assertion
                .expect_matches()
                .returning(move |value| {
                    if value == b"hit" {
                        ConditionResult::True
                    } else {
                        assertion_result
                    }
                });
            Ok(Box::new(assertion) as Box<dyn Assertion>)
        });
        Schema::builder("mocked")
            .add_matching_rule(MatchingRule::builder("1.1.1", implementation).name("mockMatch").build())
            .add_attribute_type(
                AttributeTypeDefinition::new("1.1.2")
                    .name("sample")
                    .equality("mockMatch")
                    .syntax("1.1.3"),
            )
            .add_matching_rule_use(MatchingRuleUseDefinition::new("mockMatch").applies_to("sample"))
            .add_syntax(crate::schema::Syntax::new("1.1.3", "Sample"))
            .build()
            .unwrap()
    }

    fn sample_entry(schema: &Schema, values: &[&str]) -> LdapEntry {
        LdapEntry::from_strings(schema, "", [("sample", values.to_vec())]).unwrap()
    }

    #[test]
    fn any_true_value_wins() {
        let schema = mocked_schema(ConditionResult::Undefined, true);
        let entry = sample_entry(&schema, &["bad", "other", "hit"]);
        let matcher = Filter::equality("sample", "x").matcher(&schema);
        assert_eq!(matcher.matches(&entry), ConditionResult::True);
    }

    #[test]
    fn undefined_value_beats_false() {
        let schema = mocked_schema(ConditionResult::False, true);
        let matcher = Filter::equality("sample", "x").matcher(&schema);
        assert_eq!(
            matcher.matches(&sample_entry(&schema, &["other", "bad"])),
            ConditionResult::Undefined
        );
        assert_eq!(
            matcher.matches(&sample_entry(&schema, &["other"])),
            ConditionResult::False
        );
        assert_eq!(matcher.matches(&sample_entry(&schema, &[])), ConditionResult::False);
    }

    #[test]
    fn greater_or_equal_inverts_per_value() {
        let schema = mocked_schema(ConditionResult::Undefined, false);
        let rule = schema.matching_rule("mockMatch").unwrap();
        let test = RuleAssertion::new(&rule, b"x").unwrap();
        let description = AttributeDescription::parse("sample", &schema).unwrap();
        let matcher = Matcher(Kind::Value(ValueTest {
            description,
            test,
            inverted: true,
        }));
        // "hit" tests as less-than, so it is not greater-or-equal
        assert_eq!(
            matcher.matches(&sample_entry(&schema, &["hit"])),
            ConditionResult::False
        );
        assert_eq!(
            matcher.matches(&sample_entry(&schema, &["other"])),
            ConditionResult::Undefined
        );
    }

    #[test]
    fn and_stops_at_first_false() {
        let schema = mocked_schema(ConditionResult::True, false);
        let entry = sample_entry(&schema, &["x"]);

        let mut never = MockAssertion::new();
        never.expect_matches().times(0);
        let rule = schema.matching_rule("mockMatch").unwrap();
        let description = AttributeDescription::parse("sample", &schema).unwrap();
        let untouched = Matcher(Kind::Value(ValueTest {
            description,
            test: RuleAssertion {
                rule,
                assertion: Box::new(never),
            },
            inverted: false,
        }));

        let matcher = Matcher::and([Matcher::constant(ConditionResult::False), untouched]);
        assert_eq!(matcher.matches(&entry), ConditionResult::False);
    }

    #[test]
    fn substrings_build_one_assertion_from_the_rule() {
        let mut implementation = MockMatchingRuleImpl::new();
        implementation
            .expect_normalize_attribute_value()
            .returning(|value| Ok(value.to_vec()));
        implementation
            .expect_substrings_assertion()
            .times(1)
            .returning(|_, _, _| {
                let mut assertion = MockAssertion::new();
                assertion
                    .expect_matches()
                    .returning(|value| ConditionResult::from_bool(value.starts_with(b"ab")));
                Ok(Box::new(assertion) as Box<dyn Assertion>)
            });
        let schema = Schema::builder("substrings")
            .add_syntax(crate::schema::Syntax::new("1.1.3", "Sample"))
            .add_matching_rule(
                MatchingRule::builder("1.1.1", implementation)
                    .name("mockSubstringsMatch")
                    .build(),
            )
            .add_attribute_type(
                AttributeTypeDefinition::new("1.1.2")
                    .name("sample")
                    .substring("mockSubstringsMatch")
                    .syntax("1.1.3"),
            )
            .build()
            .unwrap();

        let matcher = Filter::parse("(sample=ab*)").unwrap().matcher(&schema);
        assert!(!matcher.is_undefined());
        let entry = |value: &str| LdapEntry::from_strings(&schema, "", [("sample", [value])]).unwrap();
        assert_eq!(matcher.matches(&entry("abc")), ConditionResult::True);
        assert_eq!(matcher.matches(&entry("xyz")), ConditionResult::False);
    }

    #[test]
    fn matches_root_entries() {
        let entry = LdapEntry::new(Dn::root());
        assert_eq!(eval("(objectClass=*)", &entry), ConditionResult::False);
        assert_eq!(eval("(:dn:caseIgnoreMatch:=x)", &entry), ConditionResult::False);
    }
}
