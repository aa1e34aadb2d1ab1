//! Integration tests for distinguished names, RDNs and attribute descriptions.

use ldapkit::schema::{AttributeTypeDefinition, Syntax};
use ldapkit::{AttributeDescription, Ava, Dn, Rdn, Schema, SchemaOptions};

const NAMES: &[&str] = &[
    "dc=example,dc=com",
    "cn=Bob,dc=example,dc=com",
    "CN=Bob , OU=People ; DC=Example,DC=COM",
    "cn=Smith\\, John+uid=jsmith,ou=People,dc=example,dc=com",
    "uid=#6a646f65,dc=example,dc=com",
    "cn=\"Quoted, Name\",dc=example,dc=com",
    "2.5.4.3=Numeric,dc=example,dc=com",
];

fn uncached_schema() -> Schema {
    Schema::builder("uncached")
        .with_core_schema()
        .options(SchemaOptions::new().without_dn_cache())
        .build()
        .unwrap()
}

#[test]
fn test_independent_parses_are_equal() {
    let schema = uncached_schema();
    for name in NAMES {
        let first = Dn::parse(name, &schema).unwrap();
        let second = Dn::parse(name, &schema).unwrap();
        assert!(!first.ptr_eq(&second), "{name}");
        assert_eq!(first, second, "{name}");

        let canonical = first.to_string();
        let reparsed = Dn::parse(&canonical, &schema).unwrap();
        assert_eq!(reparsed.to_string(), canonical, "{name}");
        assert_eq!(reparsed, first, "{name}");
    }
    assert!(schema.dn_cache().is_empty());
}

#[test]
fn test_canonical_forms() {
    let schema = Schema::core();
    let cases = [
        ("CN=Bob , OU=People ; DC=Example,DC=COM", "cn=Bob,ou=People,dc=Example,dc=COM"),
        ("2.5.4.3=Numeric,dc=example,dc=com", "cn=Numeric,dc=example,dc=com"),
        ("cn=\"Quoted, Name\",dc=example,dc=com", "cn=Quoted\\, Name,dc=example,dc=com"),
        ("userPassword=#00ff", "userPassword=#00ff"),
        ("cn=Smith+uid=jsmith", "uid=jsmith+cn=Smith"),
        ("", ""),
    ];
    for (input, expected) in cases {
        assert_eq!(Dn::parse(input, schema).unwrap().to_string(), expected, "{input}");
    }
}

#[test]
fn test_parent_string_form() {
    let schema = Schema::core();
    let dn = Dn::parse("cn=Bob,dc=example,dc=com", schema).unwrap();
    let parent = Dn::parse("dc=example,dc=com", schema).unwrap();
    assert_eq!(dn.parent().unwrap().to_string(), parent.to_string());
}

#[test]
fn test_ancestry_is_reflexive_and_rooted() {
    let schema = Schema::core();
    for name in NAMES {
        let dn = Dn::parse(name, schema).unwrap();
        assert!(dn.is_ancestor_of(&dn), "{name}");
        assert!(dn.is_descendant_of(&dn), "{name}");
        assert!(Dn::root().is_ancestor_of(&dn), "{name}");
        assert!(!dn.is_ancestor_of(&Dn::root()), "{name}");
    }

    let base = Dn::parse("DC=Example,DC=Com", schema).unwrap();
    let leaf = Dn::parse("cn=Bob,ou=People,dc=example,dc=com", schema).unwrap();
    assert!(base.is_ancestor_of(&leaf));
    assert!(!leaf.is_ancestor_of(&base));
    assert!(leaf.is_descendant_of(&base));
    assert!(!base.is_parent_of(&leaf));
    assert!(leaf.parent().unwrap().is_child_of(&base));
}

#[test]
fn test_shared_suffixes_hit_the_cache() {
    let schema = Schema::builder("cached").with_core_schema().build().unwrap();
    for uid in ["alice", "bob", "carol", "dave"] {
        Dn::parse(&format!("uid={uid},ou=People,dc=example,dc=com"), &schema).unwrap();
    }
    let stats = schema.dn_cache().stats();
    assert_eq!(stats.hits, 3);
    assert_eq!(schema.dn_cache().len(), 7);
    assert!(stats.hit_ratio() > 0.0);
}

#[test]
fn test_cache_is_bounded() {
    let schema = Schema::builder("small")
        .with_core_schema()
        .options(SchemaOptions::new().with_dn_cache_capacity(5))
        .build()
        .unwrap();
    for index in 0..20 {
        Dn::parse(&format!("cn=user{index},dc=example,dc=com"), &schema).unwrap();
    }
    assert_eq!(schema.dn_cache().len(), 5);
    assert_eq!(schema.dn_cache().capacity(), 5);
}

#[test]
fn test_subtype_relation_with_options() {
    let schema = Schema::core();
    for name in ["cn", "mail", "uidNumber", "objectClass"] {
        let attribute_type = schema.attribute_type(name).unwrap();
        let plain = AttributeDescription::new(attribute_type.clone());
        let both = AttributeDescription::with_options(attribute_type.clone(), ["x", "y"]);
        let one = AttributeDescription::with_option(attribute_type, "x");

        assert!(both.is_sub_type_of(&plain), "{name}");
        assert!(!plain.is_sub_type_of(&one), "{name}");
        assert!(plain.is_super_type_of(&both), "{name}");
    }

    let name = AttributeDescription::parse("name", schema).unwrap();
    let cn = AttributeDescription::parse("cn;lang-en", schema).unwrap();
    assert!(cn.is_sub_type_of(&name));
    assert!(!name.is_sub_type_of(&cn));
}

#[test]
fn test_adding_an_option_is_idempotent() {
    let schema = Schema::core();
    let cn = AttributeDescription::parse("cn", schema).unwrap();
    let first = cn.add_option("X");
    let second = first.add_option("x");
    assert_eq!(first, second);
    assert!(second.ptr_eq(&first));
    assert_eq!(first.as_str(), "cn;X");
    assert_eq!(first, AttributeDescription::parse("CN;x", schema).unwrap());
}

#[test]
fn test_object_class_description_is_shared() {
    let schema = Schema::core();
    let parsed = AttributeDescription::parse("objectClass", schema).unwrap();
    assert!(parsed.ptr_eq(schema.object_class_description().unwrap()));
    assert!(parsed.is_object_class());
}

#[test]
fn test_multi_valued_rdn_ordering_is_canonical() {
    let schema = Schema::core();
    let uid = Ava::new(schema.attribute_type("uid").unwrap(), "jsmith");
    let cn = Ava::new(schema.attribute_type("cn").unwrap(), "John");

    let forward = Rdn::from_avas([uid.clone(), cn.clone()]).unwrap();
    let backward = Rdn::from_avas([cn, uid]).unwrap();
    assert_eq!(forward.to_string(), backward.to_string());
    assert_eq!(forward, backward);
    assert_eq!(forward, Rdn::parse("UID=JSmith+CN=john", schema).unwrap());
}

#[test]
fn test_custom_schema_types_resolve_by_oid() {
    let schema = Schema::builder("custom")
        .with_core_schema()
        .add_syntax(Syntax::new("1.3.6.1.4.1.99999.1", "Ticket"))
        .add_attribute_type(
            AttributeTypeDefinition::new("1.3.6.1.4.1.99999.2.1")
                .name("ticketId")
                .equality("caseIgnoreMatch")
                .syntax("1.3.6.1.4.1.99999.1"),
        )
        .build()
        .unwrap();
    let by_name = Dn::parse("ticketId=ABC-1,dc=example", &schema).unwrap();
    let by_oid = Dn::parse("1.3.6.1.4.1.99999.2.1=abc-1,dc=example", &schema).unwrap();
    assert_eq!(by_name, by_oid);
    assert_eq!(by_oid.to_string(), "ticketId=abc-1,dc=example");
    assert!(Dn::parse("ticketId=ABC-1", Schema::core()).is_err());
}
