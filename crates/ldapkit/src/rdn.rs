//! Relative distinguished names.

use std::fmt;
use std::hash::{Hash, Hasher};

use ldapkit_core::{ConditionResult, Error};
use serde::{Serialize, Serializer};

use crate::reader::{to_hex, DnReader};
use crate::schema::{AttributeType, Schema};
use crate::Result;

/// One attribute type and value pair of an RDN.
#[derive(Clone)]
pub struct Ava {
    attribute_type: AttributeType,
    value: Vec<u8>,
}

impl Ava {
    /// Creates a pair from a type and a raw value.
    #[must_use]
    pub fn new(attribute_type: AttributeType, value: impl Into<Vec<u8>>) -> Self {
        Self {
            attribute_type,
            value: value.into(),
        }
    }

    /// The attribute type.
    #[must_use]
    pub fn attribute_type(&self) -> &AttributeType {
        &self.attribute_type
    }

    /// The raw value.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// The raw value as UTF-8, if it is valid UTF-8.
    #[must_use]
    pub fn value_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.value).ok()
    }

    /// Compares with `other` using the type's equality matching rule.
    ///
    /// Different types never match. Without an equality rule, values are compared byte for
    /// byte. A value the rule cannot decode gives `Undefined`.
    #[must_use]
    pub fn matches(&self, other: &Ava) -> ConditionResult {
        if self.attribute_type != other.attribute_type {
            return ConditionResult::False;
        }
        if self.value == other.value {
            return ConditionResult::True;
        }
        let Some(rule) = self.attribute_type.equality_matching_rule() else {
            return ConditionResult::False;
        };
        let Ok(normalized) = rule.normalize_attribute_value(&other.value) else {
            return ConditionResult::Undefined;
        };
        match rule.assertion(&self.value) {
            Ok(assertion) => assertion.matches(&normalized),
            Err(_) => ConditionResult::Undefined,
        }
    }

    /// Value normalized by the equality rule, falling back to the raw bytes.
    pub(crate) fn normalized_value(&self) -> Vec<u8> {
        self.attribute_type
            .equality_matching_rule()
            .and_then(|rule| rule.normalize_attribute_value(&self.value).ok())
            .unwrap_or_else(|| self.value.clone())
    }

    fn is_human_readable(&self) -> bool {
        self.attribute_type.syntax().is_human_readable()
    }
}

impl PartialEq for Ava {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other).is_true()
    }
}

impl Hash for Ava {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.attribute_type.hash(state);
        self.normalized_value().hash(state);
    }
}

impl fmt::Display for Ava {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}=", self.attribute_type.name_or_oid())?;
        match self.value_str() {
            Some(value) if self.is_human_readable() => f.write_str(&escape_value(value)),
            _ => write!(f, "#{}", to_hex(&self.value)),
        }
    }
}

impl fmt::Debug for Ava {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ava({self})")
    }
}

/// Escapes an RFC 4514 attribute value.
pub(crate) fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for (index, ch) in value.char_indices() {
        let is_first = index == 0;
        let is_last = index + ch.len_utf8() == value.len();
        match ch {
            '\0' => escaped.push_str("\\00"),
            '"' | '+' | ',' | ';' | '<' | '=' | '>' | '\\' => {
                escaped.push('\\');
                escaped.push(ch);
            }
            ' ' if is_first || is_last => escaped.push_str("\\ "),
            '#' if is_first => escaped.push_str("\\#"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[derive(Clone)]
enum Repr {
    Single(Ava),
    Multi(Box<[Ava]>),
}

/// A relative distinguished name: one or more attribute type and value pairs.
///
/// Multi-valued RDNs keep their pairs sorted by attribute type OID, which fixes both the string
/// form and the pairing used by [`Rdn::matches`].
#[derive(Clone)]
pub struct Rdn(Repr);

impl Rdn {
    /// Creates a single-valued RDN.
    #[must_use]
    pub fn new(attribute_type: AttributeType, value: impl Into<Vec<u8>>) -> Self {
        Self(Repr::Single(Ava::new(attribute_type, value)))
    }

    /// Creates an RDN from pairs, sorting them into canonical order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `avas` is empty.
    pub fn from_avas(avas: impl IntoIterator<Item = Ava>) -> Result<Self> {
        let mut avas: Vec<Ava> = avas.into_iter().collect();
        match avas.len() {
            0 => Err(Error::InvalidArgument(
                "an RDN needs at least one attribute type and value".to_string(),
            )),
            1 => Ok(Self(Repr::Single(avas.remove(0)))),
            _ => {
                avas.sort_by(|a, b| a.attribute_type.cmp(&b.attribute_type));
                Ok(Self(Repr::Multi(avas.into_boxed_slice())))
            }
        }
    }

    /// Parses `type=value[+type=value]*`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] for malformed text and [`Error::UnknownAttributeType`] for a
    /// type the schema does not define.
    pub fn parse(input: &str, schema: &Schema) -> Result<Self> {
        let mut reader = DnReader::new(input);
        let rdn = Self::decode(&mut reader, schema)?;
        reader.skip_spaces();
        if reader.is_at_end() {
            Ok(rdn)
        } else {
            Err(reader.unexpected_at(reader.position(), "after RDN"))
        }
    }

    pub(crate) fn decode(reader: &mut DnReader<'_>, schema: &Schema) -> Result<Self> {
        let allow_malformed = schema.options().allow_malformed_names_and_options;
        let mut avas = Vec::new();
        loop {
            reader.skip_spaces();
            let name = reader.read_attribute_name(allow_malformed)?;
            reader.skip_spaces();
            if reader.peek() != Some(b'=') {
                let position = reader.position();
                return Err(reader.error_at(
                    position,
                    format!("expected `=` after attribute name `{name}` at position {position}"),
                ));
            }
            reader.advance();
            let attribute_type =
                schema
                    .attribute_type(name)
                    .map_err(|_| Error::UnknownAttributeType {
                        name: name.to_string(),
                        input: reader.input().to_string(),
                    })?;
            reader.skip_spaces();
            let value = reader.read_attribute_value()?;
            avas.push(Ava::new(attribute_type, value));

            reader.skip_spaces();
            if reader.peek() == Some(b'+') {
                reader.advance();
            } else {
                return Self::from_avas(avas);
            }
        }
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Always false; an RDN has at least one pair.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Returns true if the RDN has more than one pair.
    #[must_use]
    pub fn is_multi_valued(&self) -> bool {
        matches!(self.0, Repr::Multi(_))
    }

    /// Pairs in canonical order.
    #[must_use]
    pub fn as_slice(&self) -> &[Ava] {
        match &self.0 {
            Repr::Single(ava) => std::slice::from_ref(ava),
            Repr::Multi(avas) => avas,
        }
    }

    /// Iterates over the pairs in canonical order.
    pub fn iter(&self) -> std::slice::Iter<'_, Ava> {
        self.as_slice().iter()
    }

    /// First pair, which is the only one for single-valued RDNs.
    #[must_use]
    pub fn first(&self) -> &Ava {
        match &self.0 {
            Repr::Single(ava) => ava,
            Repr::Multi(avas) => &avas[0],
        }
    }

    /// Raw value for `attribute_type`, if present.
    #[must_use]
    pub fn attribute_value(&self, attribute_type: &AttributeType) -> Option<&[u8]> {
        match &self.0 {
            Repr::Single(ava) => (ava.attribute_type == *attribute_type).then_some(ava.value()),
            Repr::Multi(avas) => avas
                .iter()
                .find(|ava| ava.attribute_type == *attribute_type)
                .map(Ava::value),
        }
    }

    /// Three-valued comparison.
    ///
    /// RDNs with a different number of pairs never match. Otherwise pairs are compared in
    /// canonical order: the first `False` decides, and any `Undefined` makes the result
    /// `Undefined`.
    #[must_use]
    pub fn matches(&self, other: &Rdn) -> ConditionResult {
        match (&self.0, &other.0) {
            (Repr::Single(a), Repr::Single(b)) => a.matches(b),
            (Repr::Multi(a), Repr::Multi(b)) if a.len() == b.len() => {
                ConditionResult::all(a.iter().zip(b.iter()).map(|(x, y)| x.matches(y)))
            }
            _ => ConditionResult::False,
        }
    }
}

impl<'a> IntoIterator for &'a Rdn {
    type Item = &'a Ava;
    type IntoIter = std::slice::Iter<'a, Ava>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl PartialEq for Rdn {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other).is_true()
    }
}

impl Hash for Rdn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.len().hash(state);
        for ava in self {
            ava.hash(state);
        }
    }
}

impl fmt::Display for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, ava) in self.iter().enumerate() {
            if index > 0 {
                f.write_str("+")?;
            }
            write!(f, "{ava}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Rdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rdn({self})")
    }
}

impl Serialize for Rdn {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
