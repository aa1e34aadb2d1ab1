//! Attribute descriptions: an attribute type plus a set of options (RFC 4512 §2.5).
//!
//! Options are compared case-insensitively. Each description keeps the options twice: in the
//! spelling and order they were given, for display, and lower-cased and sorted, for every
//! comparison. The number of options only selects a representation; behaviour is the same.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ldapkit_core::Error;
use serde::{Serialize, Serializer};

use crate::schema::{AttributeType, Schema};
use crate::Result;

#[derive(Debug)]
enum Options {
    None,
    Single {
        option: String,
        normalized: String,
    },
    Multiple {
        options: Vec<String>,
        normalized: Vec<String>,
    },
}

impl Options {
    fn from_parts(mut display: Vec<String>, mut normalized: Vec<String>) -> Self {
        match display.len() {
            0 => Self::None,
            1 => Self::Single {
                option: display.remove(0),
                normalized: normalized.remove(0),
            },
            _ => {
                normalized.sort();
                Self::Multiple {
                    options: display,
                    normalized,
                }
            }
        }
    }

    fn display(&self) -> &[String] {
        match self {
            Self::None => &[],
            Self::Single { option, .. } => std::slice::from_ref(option),
            Self::Multiple { options, .. } => options,
        }
    }

    fn normalized(&self) -> &[String] {
        match self {
            Self::None => &[],
            Self::Single { normalized, .. } => std::slice::from_ref(normalized),
            Self::Multiple { normalized, .. } => normalized,
        }
    }

    fn contains(&self, normalized_option: &str) -> bool {
        match self {
            Self::None => false,
            Self::Single { normalized, .. } => normalized == normalized_option,
            Self::Multiple { normalized, .. } => normalized
                .binary_search_by(|candidate| candidate.as_str().cmp(normalized_option))
                .is_ok(),
        }
    }
}

#[derive(Debug)]
struct Inner {
    text: String,
    attribute_type: AttributeType,
    options: Options,
}

/// An immutable attribute description such as `cn` or `cn;lang-en;binary`.
///
/// Cloning is cheap. Equality and hashing consider the attribute type and the normalized option
/// set only, so `cn;Lang-EN` equals `commonName;lang-en`.
#[derive(Clone)]
pub struct AttributeDescription(Arc<Inner>);

impl AttributeDescription {
    /// Creates a description without options.
    #[must_use]
    pub fn new(attribute_type: AttributeType) -> Self {
        let text = attribute_type.name_or_oid().to_string();
        Self::from_parts(text, attribute_type, Vec::new(), Vec::new())
    }

    /// Creates a description with a single option.
    #[must_use]
    pub fn with_option(attribute_type: AttributeType, option: impl AsRef<str>) -> Self {
        Self::with_options(attribute_type, [option])
    }

    /// Creates a description with the given options.
    ///
    /// Options whose lower-cased form was already seen are dropped; the first spelling is kept
    /// for display.
    #[must_use]
    pub fn with_options<I, S>(attribute_type: AttributeType, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut display = Vec::new();
        let mut normalized = Vec::new();
        for option in options {
            let option = option.as_ref();
            let lower = option.to_lowercase();
            if !normalized.contains(&lower) {
                display.push(option.to_string());
                normalized.push(lower);
            }
        }
        let mut text = attribute_type.name_or_oid().to_string();
        for option in &display {
            text.push(';');
            text.push_str(option);
        }
        Self::from_parts(text, attribute_type, display, normalized)
    }

    fn from_parts(
        text: String,
        attribute_type: AttributeType,
        display: Vec<String>,
        normalized: Vec<String>,
    ) -> Self {
        Self(Arc::new(Inner {
            text,
            attribute_type,
            options: Options::from_parts(display, normalized),
        }))
    }

    /// Returns a description with `option` added.
    ///
    /// When the option is already present (ignoring case) the result shares this instance, so
    /// [`ptr_eq`](Self::ptr_eq) holds between the two.
    #[must_use]
    pub fn add_option(&self, option: &str) -> Self {
        let lower = option.to_lowercase();
        if self.0.options.contains(&lower) {
            return self.clone();
        }
        let mut display = self.0.options.display().to_vec();
        display.push(option.to_string());
        let mut normalized = self.0.options.normalized().to_vec();
        normalized.push(lower);
        let text = format!("{};{option}", self.0.text);
        Self::from_parts(text, self.0.attribute_type.clone(), display, normalized)
    }

    /// Parses `type[;option]*`, resolving the type against `schema`. Surrounding whitespace is
    /// not part of the grammar and is rejected.
    ///
    /// # Errors
    ///
    /// - [`Error::Decode`] if the text is empty or contains an illegal character, with its
    ///   position
    /// - [`Error::UnknownAttributeType`] if the schema does not define the type
    pub fn parse(input: &str, schema: &Schema) -> Result<Self> {
        if let Some(object_class) = schema.object_class_description() {
            if input == object_class.as_str() {
                return Ok(object_class.clone());
            }
        }

        if input.is_empty() {
            return Err(Error::decode_at(
                input,
                0,
                "attribute description is empty",
            ));
        }

        let allow_malformed = schema.options().allow_malformed_names_and_options;
        let mut parts = input.split(';');
        let name = parts.next().unwrap_or_default();
        check_attribute_type(input, name, 0, allow_malformed)?;

        let mut position = name.len();
        let mut options = Vec::new();
        for option in parts {
            position += 1;
            check_option(input, option, position, allow_malformed)?;
            options.push(option);
            position += option.len();
        }

        let attribute_type =
            schema
                .attribute_type(name)
                .map_err(|_| Error::UnknownAttributeType {
                    name: name.to_string(),
                    input: input.to_string(),
                })?;

        let mut display = Vec::with_capacity(options.len());
        let mut normalized = Vec::with_capacity(options.len());
        for option in options {
            let lower = option.to_lowercase();
            if !normalized.contains(&lower) {
                display.push(option.to_string());
                normalized.push(lower);
            }
        }
        Ok(Self::from_parts(
            input.to_string(),
            attribute_type,
            display,
            normalized,
        ))
    }

    /// The attribute type.
    #[must_use]
    pub fn attribute_type(&self) -> &AttributeType {
        &self.0.attribute_type
    }

    /// Textual form, as parsed or constructed.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0.text
    }

    /// Options in display order and original spelling.
    pub fn options(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.options.display().iter().map(String::as_str)
    }

    /// Lower-cased options, sorted ascending.
    #[must_use]
    pub fn normalized_options(&self) -> &[String] {
        self.0.options.normalized()
    }

    /// Returns true if the option is present, ignoring case.
    #[must_use]
    pub fn contains_option(&self, option: &str) -> bool {
        self.0.options.contains(&option.to_lowercase())
    }

    /// Returns true if there is at least one option.
    #[must_use]
    pub fn has_options(&self) -> bool {
        !matches!(self.0.options, Options::None)
    }

    /// Number of distinct options.
    #[must_use]
    pub fn option_count(&self) -> usize {
        self.0.options.normalized().len()
    }

    /// Returns true if this description names the `objectClass` type without options.
    #[must_use]
    pub fn is_object_class(&self) -> bool {
        !self.has_options() && self.0.attribute_type.is_object_class()
    }

    /// Returns true if the type is `other`'s type or a subtype of it and the options are a
    /// superset of `other`'s.
    #[must_use]
    pub fn is_sub_type_of(&self, other: &AttributeDescription) -> bool {
        self.0.attribute_type.is_sub_type_of(&other.0.attribute_type)
            && other
                .normalized_options()
                .iter()
                .all(|option| self.0.options.contains(option))
    }

    /// Mirror of [`is_sub_type_of`](Self::is_sub_type_of).
    #[must_use]
    pub fn is_super_type_of(&self, other: &AttributeDescription) -> bool {
        other.is_sub_type_of(self)
    }

    /// Returns true if both handles share one instance.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn category(&self) -> usize {
        self.option_count().min(2)
    }
}

fn check_attribute_type(input: &str, name: &str, offset: usize, allow_malformed: bool) -> Result<()> {
    let Some(first) = name.chars().next() else {
        return Err(Error::decode_at(input, offset, "attribute type is empty"));
    };
    if first.is_ascii_digit() {
        let mut position = offset;
        for arc in name.split('.') {
            if arc.is_empty() {
                return Err(Error::decode_at(
                    input,
                    position,
                    format!("empty arc in numeric OID at position {position}"),
                ));
            }
            if let Some((index, ch)) = arc.char_indices().find(|(_, ch)| !ch.is_ascii_digit()) {
                return Err(illegal_character(input, ch, position + index));
            }
            position += arc.len() + 1;
        }
        return Ok(());
    }
    if !first.is_ascii_alphabetic() {
        return Err(illegal_character(input, first, offset));
    }
    check_keychars(input, name, offset, allow_malformed)
}

fn check_option(input: &str, option: &str, position: usize, allow_malformed: bool) -> Result<()> {
    if option.is_empty() {
        return Err(Error::decode_at(
            input,
            position,
            format!("empty option at position {position}"),
        ));
    }
    check_keychars(input, option, position, allow_malformed)
}

fn check_keychars(input: &str, text: &str, offset: usize, allow_malformed: bool) -> Result<()> {
    match text.char_indices().find(|(_, ch)| {
        !(ch.is_ascii_alphanumeric() || *ch == '-' || (allow_malformed && (*ch == '_' || *ch == '.')))
    }) {
        Some((index, ch)) => Err(illegal_character(input, ch, offset + index)),
        None => Ok(()),
    }
}

fn illegal_character(input: &str, ch: char, position: usize) -> Error {
    Error::decode_at(
        input,
        position,
        format!("illegal character `{ch}` at position {position}"),
    )
}

impl PartialEq for AttributeDescription {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.0.attribute_type == other.0.attribute_type
                && self.normalized_options() == other.normalized_options())
    }
}

impl Eq for AttributeDescription {}

impl Hash for AttributeDescription {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.attribute_type.hash(state);
        self.normalized_options().hash(state);
    }
}

impl Ord for AttributeDescription {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .attribute_type
            .cmp(&other.0.attribute_type)
            .then_with(|| self.category().cmp(&other.category()))
            .then_with(|| self.normalized_options().cmp(other.normalized_options()))
    }
}

impl PartialOrd for AttributeDescription {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for AttributeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.text)
    }
}

impl fmt::Debug for AttributeDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AttributeDescription").field(&self.0.text).finish()
    }
}

impl Serialize for AttributeDescription {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.text)
    }
}
