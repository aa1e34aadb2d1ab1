//! Schema elements and the resolved [`Schema`] they are looked up in.
//!
//! A schema is assembled with a [`SchemaBuilder`] from syntaxes, matching rules, attribute type
//! definitions and matching rule uses. Building resolves every name reference, applies
//! inheritance from superior types and derives implicit matching rule uses. The result is
//! immutable and cheap to clone; it also owns the distinguished name parse cache used by
//! [`Dn::parse`](crate::Dn::parse).

mod attribute_type;
mod core_schema;
mod matching_rule;
mod rules;
mod syntax;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use ldapkit_core::{Error, SchemaOptions};
use once_cell::sync::Lazy;
use tracing::{error, warn};

pub use attribute_type::{AttributeType, AttributeTypeDefinition, AttributeUsage, OBJECT_CLASS_OID};
pub use matching_rule::{
    Assertion, MatchingRule, MatchingRuleBuilder, MatchingRuleImpl, MatchingRuleUse,
    MatchingRuleUseDefinition,
};
pub use syntax::Syntax;

use attribute_type::AttributeTypeInner;

#[cfg(test)]
pub(crate) use matching_rule::{MockAssertion, MockMatchingRuleImpl};

use crate::attribute_description::AttributeDescription;
use crate::dn_cache::DnCache;
use crate::Result;

static CORE_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    SchemaBuilder::new("core")
        .with_core_schema()
        .build()
        .unwrap_or_else(|err| {
            error!(error = %err, "failed to build the core schema");
            Schema::empty("core")
        })
});

struct SchemaInner {
    name: String,
    options: SchemaOptions,
    syntaxes: HashMap<String, Syntax>,
    matching_rules: HashMap<String, MatchingRule>,
    attribute_types: HashMap<String, AttributeType>,
    attribute_type_list: Vec<AttributeType>,
    matching_rule_uses: HashMap<String, MatchingRuleUse>,
    object_class: Option<AttributeDescription>,
    dn_cache: DnCache,
}

/// An immutable, resolved schema.
///
/// Clones share the same elements and DN cache.
#[derive(Clone)]
pub struct Schema(Arc<SchemaInner>);

impl Schema {
    /// Starts building a schema.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    /// The process-wide schema holding the built-in core elements.
    #[must_use]
    pub fn core() -> &'static Schema {
        &CORE_SCHEMA
    }

    /// A schema without any elements.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        let options = SchemaOptions::default();
        Self(Arc::new(SchemaInner {
            name: name.into(),
            dn_cache: DnCache::new(options.dn_cache_capacity),
            options,
            syntaxes: HashMap::new(),
            matching_rules: HashMap::new(),
            attribute_types: HashMap::new(),
            attribute_type_list: Vec::new(),
            matching_rule_uses: HashMap::new(),
            object_class: None,
        }))
    }

    /// Name given to the schema when it was built.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Options the schema was built with.
    #[must_use]
    pub fn options(&self) -> &SchemaOptions {
        &self.0.options
    }

    /// Looks up an attribute type by name (case-insensitive) or OID.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownAttributeType`] if the schema has no such type.
    pub fn attribute_type(&self, name_or_oid: &str) -> Result<AttributeType> {
        self.0
            .attribute_types
            .get(&name_or_oid.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| Error::UnknownAttributeType {
                name: name_or_oid.to_string(),
                input: name_or_oid.to_string(),
            })
    }

    /// Iterates over all attribute types, in definition order.
    pub fn attribute_types(&self) -> impl Iterator<Item = &AttributeType> + '_ {
        self.0.attribute_type_list.iter()
    }

    /// Looks up a matching rule by name (case-insensitive) or OID.
    #[must_use]
    pub fn matching_rule(&self, name_or_oid: &str) -> Option<MatchingRule> {
        self.0
            .matching_rules
            .get(&name_or_oid.to_ascii_lowercase())
            .cloned()
    }

    /// Returns the matching rule use describing which attribute types `rule` applies to.
    #[must_use]
    pub fn matching_rule_use(&self, rule: &MatchingRule) -> Option<&MatchingRuleUse> {
        self.0.matching_rule_uses.get(rule.oid())
    }

    /// Looks up a syntax by OID.
    #[must_use]
    pub fn syntax(&self, oid: &str) -> Option<&Syntax> {
        self.0.syntaxes.get(oid)
    }

    /// The shared `objectClass` attribute description, if the schema defines `objectClass`.
    #[must_use]
    pub fn object_class_description(&self) -> Option<&AttributeDescription> {
        self.0.object_class.as_ref()
    }

    /// The distinguished name parse cache owned by this schema.
    #[must_use]
    pub fn dn_cache(&self) -> &DnCache {
        &self.0.dn_cache
    }

    /// Returns true if both handles refer to the same schema instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.0.name)
            .field("attribute_types", &self.0.attribute_type_list.len())
            .field("matching_rule_uses", &self.0.matching_rule_uses.len())
            .finish_non_exhaustive()
    }
}

/// Collects schema definitions and resolves them into a [`Schema`].
pub struct SchemaBuilder {
    name: String,
    options: SchemaOptions,
    syntaxes: Vec<Syntax>,
    matching_rules: Vec<MatchingRule>,
    attribute_types: Vec<AttributeTypeDefinition>,
    matching_rule_uses: Vec<MatchingRuleUseDefinition>,
}

impl SchemaBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: SchemaOptions::default(),
            syntaxes: Vec::new(),
            matching_rules: Vec::new(),
            attribute_types: Vec::new(),
            matching_rule_uses: Vec::new(),
        }
    }

    /// Sets the schema options.
    #[must_use]
    pub fn options(mut self, options: SchemaOptions) -> Self {
        self.options = options;
        self
    }

    /// Adds the built-in core syntaxes, matching rules and attribute types.
    #[must_use]
    pub fn with_core_schema(self) -> Self {
        core_schema::install(self)
    }

    /// Adds a syntax.
    #[must_use]
    pub fn add_syntax(mut self, syntax: Syntax) -> Self {
        self.syntaxes.push(syntax);
        self
    }

    /// Adds a matching rule.
    #[must_use]
    pub fn add_matching_rule(mut self, rule: MatchingRule) -> Self {
        self.matching_rules.push(rule);
        self
    }

    /// Adds an attribute type definition.
    #[must_use]
    pub fn add_attribute_type(mut self, definition: AttributeTypeDefinition) -> Self {
        self.attribute_types.push(definition);
        self
    }

    /// Adds an explicit matching rule use.
    #[must_use]
    pub fn add_matching_rule_use(mut self, definition: MatchingRuleUseDefinition) -> Self {
        self.matching_rule_uses.push(definition);
        self
    }

    /// Resolves all definitions into a schema.
    ///
    /// Later definitions with an OID already seen replace the earlier ones.
    ///
    /// # Errors
    ///
    /// - [`Error::ConfigError`] if the options are invalid
    /// - [`Error::UnknownSchemaElement`] if a definition references a missing element
    /// - [`Error::SchemaConflict`] for superior cycles or types with neither superior nor syntax
    pub fn build(self) -> Result<Schema> {
        let options = self.options.validated()?;

        let mut syntaxes = HashMap::new();
        for syntax in self.syntaxes {
            if let Some(previous) = syntaxes.insert(syntax.oid().to_string(), syntax) {
                warn!(oid = previous.oid(), "replacing duplicate syntax");
            }
        }

        let mut rule_list: Vec<MatchingRule> = Vec::new();
        for rule in self.matching_rules {
            if let Some(index) = rule_list.iter().position(|r| r.oid() == rule.oid()) {
                warn!(oid = rule.oid(), "replacing duplicate matching rule");
                rule_list[index] = rule;
            } else {
                rule_list.push(rule);
            }
        }
        let mut matching_rules = HashMap::new();
        for rule in &rule_list {
            matching_rules.insert(rule.oid().to_ascii_lowercase(), rule.clone());
            for name in rule.names() {
                if let Some(previous) = matching_rules.insert(name.to_ascii_lowercase(), rule.clone()) {
                    if previous.oid() != rule.oid() {
                        warn!(name = %name, oid = rule.oid(), "matching rule name reassigned");
                    }
                }
            }
        }

        let mut definitions: Vec<AttributeTypeDefinition> = Vec::new();
        for definition in self.attribute_types {
            if let Some(index) = definitions.iter().position(|d| d.oid == definition.oid) {
                warn!(oid = %definition.oid, "replacing duplicate attribute type");
                definitions[index] = definition;
            } else {
                definitions.push(definition);
            }
        }
        let mut definition_keys = HashMap::new();
        for (index, definition) in definitions.iter().enumerate() {
            definition_keys.insert(definition.oid.to_ascii_lowercase(), index);
            for name in &definition.names {
                if let Some(previous) = definition_keys.insert(name.to_ascii_lowercase(), index) {
                    if previous != index {
                        warn!(name = %name, oid = %definition.oid, "attribute type name reassigned");
                    }
                }
            }
        }

        let resolver = Resolver {
            definitions: &definitions,
            definition_keys: &definition_keys,
            matching_rules: &matching_rules,
            syntaxes: &syntaxes,
        };
        let mut resolved: HashMap<usize, AttributeType> = HashMap::new();
        let mut attribute_type_list = Vec::with_capacity(definitions.len());
        for index in 0..definitions.len() {
            let mut visiting = HashSet::new();
            attribute_type_list.push(resolver.resolve(index, &mut resolved, &mut visiting)?);
        }

        let mut attribute_types = HashMap::new();
        for attribute_type in &attribute_type_list {
            attribute_types.insert(attribute_type.oid().to_ascii_lowercase(), attribute_type.clone());
            for name in attribute_type.names() {
                attribute_types.insert(name.to_ascii_lowercase(), attribute_type.clone());
            }
        }

        let matching_rule_uses = derive_matching_rule_uses(
            self.matching_rule_uses,
            &rule_list,
            &matching_rules,
            &attribute_types,
            &attribute_type_list,
        )?;

        let object_class = attribute_types
            .get(attribute_type::OBJECT_CLASS_OID)
            .cloned()
            .map(AttributeDescription::new);

        Ok(Schema(Arc::new(SchemaInner {
            name: self.name,
            dn_cache: DnCache::new(options.dn_cache_capacity),
            options,
            syntaxes,
            matching_rules,
            attribute_types,
            attribute_type_list,
            matching_rule_uses,
            object_class,
        })))
    }
}

struct Resolver<'a> {
    definitions: &'a [AttributeTypeDefinition],
    definition_keys: &'a HashMap<String, usize>,
    matching_rules: &'a HashMap<String, MatchingRule>,
    syntaxes: &'a HashMap<String, Syntax>,
}

impl Resolver<'_> {
    fn resolve(
        &self,
        index: usize,
        resolved: &mut HashMap<usize, AttributeType>,
        visiting: &mut HashSet<usize>,
    ) -> Result<AttributeType> {
        if let Some(attribute_type) = resolved.get(&index) {
            return Ok(attribute_type.clone());
        }
        let definition = &self.definitions[index];
        if !visiting.insert(index) {
            return Err(Error::SchemaConflict(format!(
                "superior chain of attribute type {} is cyclic",
                definition.oid
            )));
        }

        let superior = match &definition.superior {
            Some(name) => {
                let superior_index = self
                    .definition_keys
                    .get(&name.to_ascii_lowercase())
                    .copied()
                    .ok_or_else(|| {
                        Error::UnknownSchemaElement(format!(
                            "superior type {name} of attribute type {}",
                            definition.oid
                        ))
                    })?;
                Some(self.resolve(superior_index, resolved, visiting)?)
            }
            None => None,
        };

        let rule = |name: &Option<String>, inherited: Option<&MatchingRule>| -> Result<Option<MatchingRule>> {
            match name {
                Some(name) => self
                    .matching_rules
                    .get(&name.to_ascii_lowercase())
                    .cloned()
                    .map(Some)
                    .ok_or_else(|| {
                        Error::UnknownSchemaElement(format!(
                            "matching rule {name} of attribute type {}",
                            definition.oid
                        ))
                    }),
                None => Ok(inherited.cloned()),
            }
        };
        let inherited = superior.as_ref().map(|s| &s.0);

        let syntax = match (&definition.syntax, inherited) {
            (Some(oid), _) => self.syntaxes.get(oid).cloned().ok_or_else(|| {
                Error::UnknownSchemaElement(format!(
                    "syntax {oid} of attribute type {}",
                    definition.oid
                ))
            })?,
            (None, Some(superior)) => superior.syntax.clone(),
            (None, None) => {
                return Err(Error::SchemaConflict(format!(
                    "attribute type {} has neither a superior nor a syntax",
                    definition.oid
                )))
            }
        };

        let attribute_type = AttributeType(Arc::new(AttributeTypeInner {
            oid: definition.oid.clone(),
            names: definition.names.clone(),
            description: definition.description.clone(),
            equality: rule(&definition.equality, inherited.and_then(|s| s.equality.as_ref()))?,
            ordering: rule(&definition.ordering, inherited.and_then(|s| s.ordering.as_ref()))?,
            substring: rule(&definition.substring, inherited.and_then(|s| s.substring.as_ref()))?,
            approximate: rule(
                &definition.approximate,
                inherited.and_then(|s| s.approximate.as_ref()),
            )?,
            syntax,
            single_value: definition.single_value,
            usage: definition.usage,
            superior,
        }));
        visiting.remove(&index);
        resolved.insert(index, attribute_type.clone());
        Ok(attribute_type)
    }
}

/// Resolves explicit matching rule uses and derives implicit ones for the remaining rules.
///
/// An implicit use covers every attribute type that names the rule in one of its rule slots or
/// whose syntax is the rule's assertion syntax.
fn derive_matching_rule_uses(
    explicit: Vec<MatchingRuleUseDefinition>,
    rules: &[MatchingRule],
    rules_by_key: &HashMap<String, MatchingRule>,
    attribute_types_by_key: &HashMap<String, AttributeType>,
    attribute_types: &[AttributeType],
) -> Result<HashMap<String, MatchingRuleUse>> {
    let mut uses = HashMap::new();
    for definition in explicit {
        let rule = rules_by_key
            .get(&definition.rule.to_ascii_lowercase())
            .ok_or_else(|| {
                Error::UnknownSchemaElement(format!(
                    "matching rule {} of matching rule use",
                    definition.rule
                ))
            })?;
        let mut oids = HashSet::new();
        for name in &definition.attributes {
            let attribute_type = attribute_types_by_key
                .get(&name.to_ascii_lowercase())
                .ok_or_else(|| {
                    Error::UnknownSchemaElement(format!(
                        "attribute type {name} of matching rule use {}",
                        definition.rule
                    ))
                })?;
            oids.insert(attribute_type.oid().to_string());
        }
        if uses
            .insert(rule.oid().to_string(), MatchingRuleUse::new(rule.oid(), oids))
            .is_some()
        {
            warn!(oid = rule.oid(), "replacing duplicate matching rule use");
        }
    }

    for rule in rules {
        if uses.contains_key(rule.oid()) {
            continue;
        }
        let oids: HashSet<String> = attribute_types
            .iter()
            .filter(|attribute_type| {
                let inner = &attribute_type.0;
                [&inner.equality, &inner.ordering, &inner.substring, &inner.approximate]
                    .into_iter()
                    .flatten()
                    .any(|r| r == rule)
                    || rule.syntax_oid() == Some(attribute_type.syntax().oid())
            })
            .map(|attribute_type| attribute_type.oid().to_string())
            .collect();
        if !oids.is_empty() {
            uses.insert(rule.oid().to_string(), MatchingRuleUse::new(rule.oid(), oids));
        }
    }
    Ok(uses)
}
