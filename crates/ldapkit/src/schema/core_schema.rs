//! Built-in syntaxes, matching rules and attribute types (RFC 4517, RFC 4519, RFC 2307).

use super::attribute_type::AttributeTypeDefinition;
use super::matching_rule::MatchingRule;
use super::rules::{BuiltinRule, Normalizer, RuleKind};
use super::syntax::Syntax;
use super::SchemaBuilder;

const BOOLEAN: &str = "1.3.6.1.4.1.1466.115.121.1.7";
const COUNTRY_STRING: &str = "1.3.6.1.4.1.1466.115.121.1.11";
const DN: &str = "1.3.6.1.4.1.1466.115.121.1.12";
const DIRECTORY_STRING: &str = "1.3.6.1.4.1.1466.115.121.1.15";
const IA5_STRING: &str = "1.3.6.1.4.1.1466.115.121.1.26";
const INTEGER: &str = "1.3.6.1.4.1.1466.115.121.1.27";
const OID: &str = "1.3.6.1.4.1.1466.115.121.1.38";
const OCTET_STRING: &str = "1.3.6.1.4.1.1466.115.121.1.40";
const SUBSTRING_ASSERTION: &str = "1.3.6.1.4.1.1466.115.121.1.58";

const RULES: &[(&str, &str, Normalizer, RuleKind, &str)] = &[
    ("2.5.13.0", "objectIdentifierMatch", Normalizer::ObjectIdentifier, RuleKind::Equality, OID),
    ("2.5.13.1", "distinguishedNameMatch", Normalizer::DistinguishedName, RuleKind::Equality, DN),
    ("2.5.13.2", "caseIgnoreMatch", Normalizer::CaseIgnore, RuleKind::Equality, DIRECTORY_STRING),
    ("2.5.13.3", "caseIgnoreOrderingMatch", Normalizer::CaseIgnore, RuleKind::Ordering, DIRECTORY_STRING),
    ("2.5.13.4", "caseIgnoreSubstringsMatch", Normalizer::CaseIgnore, RuleKind::Substrings, SUBSTRING_ASSERTION),
    ("2.5.13.5", "caseExactMatch", Normalizer::CaseExact, RuleKind::Equality, DIRECTORY_STRING),
    ("2.5.13.6", "caseExactOrderingMatch", Normalizer::CaseExact, RuleKind::Ordering, DIRECTORY_STRING),
    ("2.5.13.7", "caseExactSubstringsMatch", Normalizer::CaseExact, RuleKind::Substrings, SUBSTRING_ASSERTION),
    ("2.5.13.13", "booleanMatch", Normalizer::Boolean, RuleKind::Equality, BOOLEAN),
    ("2.5.13.14", "integerMatch", Normalizer::Integer, RuleKind::Equality, INTEGER),
    ("2.5.13.15", "integerOrderingMatch", Normalizer::Integer, RuleKind::Ordering, INTEGER),
    ("2.5.13.17", "octetStringMatch", Normalizer::OctetString, RuleKind::Equality, OCTET_STRING),
    ("2.5.13.18", "octetStringOrderingMatch", Normalizer::OctetString, RuleKind::Ordering, OCTET_STRING),
    ("1.3.6.1.4.1.1466.109.114.2", "caseIgnoreIA5Match", Normalizer::CaseIgnoreIa5, RuleKind::Equality, IA5_STRING),
    ("1.3.6.1.4.1.1466.109.114.3", "caseIgnoreIA5SubstringsMatch", Normalizer::CaseIgnoreIa5, RuleKind::Substrings, SUBSTRING_ASSERTION),
];

pub(super) fn install(builder: SchemaBuilder) -> SchemaBuilder {
    let syntaxes = [
        Syntax::new(BOOLEAN, "Boolean"),
        Syntax::new(COUNTRY_STRING, "Country String"),
        Syntax::new(DN, "DN"),
        Syntax::new(DIRECTORY_STRING, "Directory String"),
        Syntax::new(IA5_STRING, "IA5 String"),
        Syntax::new(INTEGER, "INTEGER"),
        Syntax::new(OID, "OID"),
        Syntax::new(OCTET_STRING, "Octet String").binary(),
        Syntax::new(SUBSTRING_ASSERTION, "Substring Assertion"),
    ];
    let builder = syntaxes.into_iter().fold(builder, SchemaBuilder::add_syntax);

    let builder = RULES
        .iter()
        .fold(builder, |builder, &(oid, name, normalizer, kind, syntax)| {
            builder.add_matching_rule(
                MatchingRule::builder(oid, BuiltinRule::new(normalizer, kind))
                    .name(name)
                    .syntax(syntax)
                    .build(),
            )
        });

    attribute_types()
        .into_iter()
        .fold(builder, SchemaBuilder::add_attribute_type)
}

fn named(oid: &str, names: &[&str]) -> AttributeTypeDefinition {
    names
        .iter()
        .fold(AttributeTypeDefinition::new(oid), |definition, name| definition.name(*name))
}

fn name_subtype(oid: &str, names: &[&str]) -> AttributeTypeDefinition {
    named(oid, names).superior("name")
}

fn ia5(oid: &str, names: &[&str]) -> AttributeTypeDefinition {
    named(oid, names)
        .equality("caseIgnoreIA5Match")
        .substring("caseIgnoreIA5SubstringsMatch")
        .syntax(IA5_STRING)
}

fn integer(oid: &str, name: &str) -> AttributeTypeDefinition {
    named(oid, &[name])
        .equality("integerMatch")
        .ordering("integerOrderingMatch")
        .syntax(INTEGER)
        .single_value()
}

fn attribute_types() -> Vec<AttributeTypeDefinition> {
    vec![
        named("2.5.4.0", &["objectClass"])
            .equality("objectIdentifierMatch")
            .syntax(OID),
        named("2.5.4.41", &["name"])
            .equality("caseIgnoreMatch")
            .substring("caseIgnoreSubstringsMatch")
            .syntax(DIRECTORY_STRING),
        name_subtype("2.5.4.3", &["cn", "commonName"]),
        name_subtype("2.5.4.4", &["sn", "surname"]),
        name_subtype("2.5.4.42", &["givenName", "gn"]),
        name_subtype("2.5.4.11", &["ou", "organizationalUnitName"]),
        name_subtype("2.5.4.10", &["o", "organizationName"]),
        name_subtype("2.5.4.7", &["l", "localityName"]),
        name_subtype("2.5.4.8", &["st", "stateOrProvinceName"]),
        name_subtype("2.5.4.6", &["c", "countryName"])
            .syntax(COUNTRY_STRING)
            .single_value(),
        named("2.5.4.13", &["description"])
            .equality("caseIgnoreMatch")
            .substring("caseIgnoreSubstringsMatch")
            .syntax(DIRECTORY_STRING),
        named("2.5.4.49", &["distinguishedName"])
            .equality("distinguishedNameMatch")
            .syntax(DN),
        named("2.5.4.31", &["member"]).superior("distinguishedName"),
        named("2.5.4.35", &["userPassword"])
            .equality("octetStringMatch")
            .syntax(OCTET_STRING),
        named("0.9.2342.19200300.100.1.1", &["uid", "userid"])
            .equality("caseIgnoreMatch")
            .substring("caseIgnoreSubstringsMatch")
            .syntax(DIRECTORY_STRING),
        ia5("0.9.2342.19200300.100.1.3", &["mail", "rfc822Mailbox"]),
        ia5("0.9.2342.19200300.100.1.25", &["dc", "domainComponent"]).single_value(),
        integer("1.3.6.1.1.1.1.0", "uidNumber"),
        integer("1.3.6.1.1.1.1.1", "gidNumber"),
    ]
}

#[cfg(test)]
mod tests {
    use crate::schema::{AttributeType, MatchingRule, Schema};

    #[test]
    fn core_rules_are_registered_by_name_and_oid() {
        let schema = Schema::core();
        for (oid, name, ..) in super::RULES {
            let by_name = schema.matching_rule(name).unwrap();
            assert_eq!(by_name.oid(), *oid);
            assert_eq!(schema.matching_rule(oid).unwrap(), by_name);
        }
    }

    #[test]
    fn name_subtypes_inherit_rules() {
        let schema = Schema::core();
        let surname = schema.attribute_type("surname").unwrap();
        assert_eq!(
            surname.substring_matching_rule().map(MatchingRule::name_or_oid),
            Some("caseIgnoreSubstringsMatch")
        );
        let country = schema.attribute_type("c").unwrap();
        assert_eq!(country.syntax().oid(), super::COUNTRY_STRING);
        assert!(country.is_single_value());
    }

    #[test]
    fn member_is_a_distinguished_name() {
        let schema = Schema::core();
        let member = schema.attribute_type("member").unwrap();
        assert_eq!(
            member.superior().map(AttributeType::name_or_oid),
            Some("distinguishedName")
        );
        assert_eq!(
            member.equality_matching_rule().map(MatchingRule::oid),
            Some("2.5.13.1")
        );
    }

    #[test]
    fn user_password_is_binary() {
        let schema = Schema::core();
        let password = schema.attribute_type("userPassword").unwrap();
        assert!(!password.syntax().is_human_readable());
    }

    #[test]
    fn case_exact_applies_to_directory_strings() {
        let schema = Schema::core();
        let rule = schema.matching_rule("caseExactMatch").unwrap();
        let rule_use = schema.matching_rule_use(&rule).unwrap();
        assert!(rule_use.has_attribute(&schema.attribute_type("cn").unwrap()));
        assert!(!rule_use.has_attribute(&schema.attribute_type("mail").unwrap()));
    }
}
