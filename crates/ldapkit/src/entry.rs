//! Directory entries as seen by matchers.

use crate::attribute_description::AttributeDescription;
use crate::dn::Dn;
use crate::schema::Schema;
use crate::Result;

/// An attribute description with its values, in the order they were added.
#[derive(Debug, Clone)]
pub struct Attribute {
    description: AttributeDescription,
    values: Vec<Vec<u8>>,
}

impl Attribute {
    /// Creates an attribute without values.
    #[must_use]
    pub fn new(description: AttributeDescription) -> Self {
        Self {
            description,
            values: Vec::new(),
        }
    }

    /// Creates an attribute holding `values`.
    #[must_use]
    pub fn with_values<I, V>(description: AttributeDescription, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        let mut attribute = Self::new(description);
        for value in values {
            attribute.add_value(value);
        }
        attribute
    }

    /// The attribute description.
    #[must_use]
    pub fn description(&self) -> &AttributeDescription {
        &self.description
    }

    /// All values.
    #[must_use]
    pub fn values(&self) -> &[Vec<u8>] {
        &self.values
    }

    /// Adds a value unless an identical one is already present.
    pub fn add_value(&mut self, value: impl Into<Vec<u8>>) {
        let value = value.into();
        if !self.values.contains(&value) {
            self.values.push(value);
        }
    }

    /// The first value.
    #[must_use]
    pub fn first(&self) -> Option<&[u8]> {
        self.values.first().map(Vec::as_slice)
    }

    /// The first value, if it is UTF-8.
    #[must_use]
    pub fn first_str(&self) -> Option<&str> {
        self.first().and_then(|value| std::str::from_utf8(value).ok())
    }

    /// Returns true if the attribute has no values.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }
}

/// A named set of attributes that matchers can evaluate.
pub trait Entry {
    /// The entry's distinguished name.
    fn name(&self) -> &Dn;

    /// All attributes of the entry.
    fn attributes(&self) -> Box<dyn Iterator<Item = &Attribute> + '_>;

    /// The attribute with exactly this description.
    fn attribute(&self, description: &AttributeDescription) -> Option<&Attribute> {
        self.attributes()
            .find(|attribute| attribute.description() == description)
    }

    /// Attributes whose description is `description` or one of its subtypes, so `name` also
    /// yields `cn` and `cn;lang-en`.
    fn attributes_matching<'a>(
        &'a self,
        description: &'a AttributeDescription,
    ) -> Box<dyn Iterator<Item = &'a Attribute> + 'a> {
        Box::new(
            self.attributes()
                .filter(move |attribute| attribute.description().is_sub_type_of(description)),
        )
    }
}

/// In-memory entry.
#[derive(Debug, Clone)]
pub struct LdapEntry {
    dn: Dn,
    attributes: Vec<Attribute>,
}

impl LdapEntry {
    /// Creates an entry without attributes.
    #[must_use]
    pub fn new(dn: Dn) -> Self {
        Self {
            dn,
            attributes: Vec::new(),
        }
    }

    /// Adds values under `description`, merging with an attribute of the same description.
    #[must_use]
    pub fn with_attribute<I, V>(mut self, description: AttributeDescription, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        for value in values {
            self.add_value(description.clone(), value);
        }
        if self.attribute(&description).is_none() {
            self.attributes.push(Attribute::new(description));
        }
        self
    }

    /// Adds a single value.
    pub fn add_value(&mut self, description: AttributeDescription, value: impl Into<Vec<u8>>) {
        match self
            .attributes
            .iter_mut()
            .find(|attribute| attribute.description == description)
        {
            Some(attribute) => attribute.add_value(value),
            None => self
                .attributes
                .push(Attribute::with_values(description, [value])),
        }
    }

    /// Builds an entry from its string form: a DN and `(description, values)` pairs.
    ///
    /// # Errors
    ///
    /// Returns the parse error of the DN or of the first invalid attribute description.
    pub fn from_strings<I, K, V, S>(schema: &Schema, dn: &str, attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut entry = Self::new(Dn::parse(dn, schema)?);
        for (name, values) in attributes {
            let description = AttributeDescription::parse(name.as_ref(), schema)?;
            entry = entry.with_attribute(
                description,
                values.into_iter().map(|value| value.as_ref().as_bytes().to_vec()),
            );
        }
        Ok(entry)
    }

    /// The entry's distinguished name.
    #[must_use]
    pub fn dn(&self) -> &Dn {
        &self.dn
    }

    /// Finds an attribute by its textual description, e.g. `cn` or `cn;lang-en`. A bare name
    /// also finds the type under any of its other names.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|attribute| {
            let description = attribute.description();
            description.as_str().eq_ignore_ascii_case(name)
                || (!description.has_options() && description.attribute_type().has_name_or_oid(name))
        })
    }

    /// Returns the first value of the attribute if present.
    #[must_use]
    pub fn first(&self, name: &str) -> Option<&[u8]> {
        self.get(name).and_then(Attribute::first)
    }

    /// Returns the first value of the attribute as a string.
    #[must_use]
    pub fn first_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Attribute::first_str)
    }

    /// Returns all values for the attribute.
    #[must_use]
    pub fn values(&self, name: &str) -> Option<&[Vec<u8>]> {
        self.get(name).map(Attribute::values)
    }

    /// Parses the attribute as boolean (`TRUE` / `true` / `1`).
    #[must_use]
    pub fn bool_value(&self, name: &str) -> bool {
        self.first_str(name)
            .is_some_and(|value| value.eq_ignore_ascii_case("true") || value == "1")
    }
}

impl Entry for LdapEntry {
    fn name(&self) -> &Dn {
        &self.dn
    }

    fn attributes(&self) -> Box<dyn Iterator<Item = &Attribute> + '_> {
        Box::new(self.attributes.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entry() -> LdapEntry {
        LdapEntry::from_strings(
            Schema::core(),
            "uid=jdoe,dc=example,dc=com",
            [
                ("uid", vec!["jdoe"]),
                ("commonName", vec!["John Doe"]),
                ("cn;lang-fr", vec!["Jean Doe"]),
                ("description", vec!["TRUE"]),
                ("cn", vec!["Johnny", "John Doe"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn from_strings_merges_equal_descriptions() {
        let entry = sample_entry();
        let values = entry.values("cn").unwrap();
        assert_eq!(values, [b"John Doe".to_vec(), b"Johnny".to_vec()]);
        assert_eq!(entry.attributes().count(), 4);
    }

    #[test]
    fn lookups_by_name() {
        let entry = sample_entry();
        assert_eq!(entry.first_str("uid"), Some("jdoe"));
        assert_eq!(entry.first_str("userid"), Some("jdoe"));
        assert_eq!(entry.first_str("CN;LANG-FR"), Some("Jean Doe"));
        assert!(entry.first("sn").is_none());
        assert!(entry.bool_value("description"));
        assert!(!entry.bool_value("uid"));
        assert_eq!(entry.dn().to_string(), "uid=jdoe,dc=example,dc=com");
    }

    #[test]
    fn exact_and_subtype_lookup() {
        let entry = sample_entry();
        let schema = Schema::core();
        let cn = AttributeDescription::parse("cn", schema).unwrap();
        let name = AttributeDescription::parse("name", schema).unwrap();

        assert_eq!(entry.attribute(&cn).map(Attribute::len), Some(2));
        assert!(entry.attribute(&name).is_none());
        assert_eq!(entry.attributes_matching(&name).count(), 2);
        assert_eq!(entry.attributes_matching(&cn).count(), 2);

        let french = cn.add_option("lang-fr");
        let found: Vec<_> = entry
            .attributes_matching(&french)
            .filter_map(Attribute::first_str)
            .collect();
        assert_eq!(found, ["Jean Doe"]);
    }

    #[test]
    fn empty_attribute_is_kept() {
        let schema = Schema::core();
        let mail = AttributeDescription::parse("mail", schema).unwrap();
        let entry = LdapEntry::new(Dn::root()).with_attribute(mail.clone(), Vec::<Vec<u8>>::new());
        let attribute = entry.attribute(&mail).unwrap();
        assert!(attribute.is_empty());
        assert!(attribute.first().is_none());
    }

    #[test]
    fn unknown_attribute_is_an_error() {
        let result = LdapEntry::from_strings(Schema::core(), "dc=com", [("shoeSize", ["42"])]);
        assert_eq!(result.unwrap_err().error_code(), "UNKNOWN_ATTRIBUTE_TYPE");
    }
}
