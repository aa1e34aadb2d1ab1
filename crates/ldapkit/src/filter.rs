//! Search filters and their RFC 4515 string form.
//!
//! A [`Filter`] is a plain syntax tree: attribute descriptions and matching rules are kept as
//! text and only resolved when the filter is compiled into a [`Matcher`] against a schema.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use ldapkit_core::Error;
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};

use crate::matcher::Matcher;
use crate::reader::{hex_digit, to_hex};
use crate::schema::Schema;
use crate::Result;

/// A search filter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Filter {
    /// All sub-filters match. An empty list is absolute true.
    And(Vec<Filter>),
    /// Any sub-filter matches. An empty list is absolute false.
    Or(Vec<Filter>),
    /// The sub-filter does not match.
    Not(Box<Filter>),
    /// `(attr=value)`
    Equality {
        /// Attribute description
        attribute: String,
        /// Asserted value
        value: Vec<u8>,
    },
    /// `(attr=initial*any*final)`
    Substrings {
        /// Attribute description
        attribute: String,
        /// Leading component
        initial: Option<Vec<u8>>,
        /// Middle components, in order
        any: Vec<Vec<u8>>,
        /// Trailing component
        final_value: Option<Vec<u8>>,
    },
    /// `(attr>=value)`
    GreaterOrEqual {
        /// Attribute description
        attribute: String,
        /// Asserted value
        value: Vec<u8>,
    },
    /// `(attr<=value)`
    LessOrEqual {
        /// Attribute description
        attribute: String,
        /// Asserted value
        value: Vec<u8>,
    },
    /// `(attr=*)`
    Present {
        /// Attribute description
        attribute: String,
    },
    /// `(attr~=value)`
    Approx {
        /// Attribute description
        attribute: String,
        /// Asserted value
        value: Vec<u8>,
    },
    /// `(attr:dn:rule:=value)`
    Extensible {
        /// Matching rule name or OID
        matching_rule: Option<String>,
        /// Attribute description
        attribute: Option<String>,
        /// Asserted value
        value: Vec<u8>,
        /// Whether the entry's DN attributes are also tested
        dn_attributes: bool,
    },
    /// A filter choice this library does not understand, kept as its BER tag and contents.
    Unrecognized {
        /// BER tag
        tag: u8,
        /// Raw contents
        data: Vec<u8>,
    },
}

impl Filter {
    /// `(&...)`
    #[must_use]
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::And(filters.into_iter().collect())
    }

    /// `(|...)`
    #[must_use]
    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        Self::Or(filters.into_iter().collect())
    }

    /// `(!filter)`
    #[must_use]
    pub fn not(filter: Filter) -> Self {
        Self::Not(Box::new(filter))
    }

    /// `(attribute=value)`
    #[must_use]
    pub fn equality(attribute: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::Equality {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// `(attribute=initial*any*final)`
    #[must_use]
    pub fn substrings<I, V>(
        attribute: impl Into<String>,
        initial: Option<&[u8]>,
        any: I,
        final_value: Option<&[u8]>,
    ) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Vec<u8>>,
    {
        Self::Substrings {
            attribute: attribute.into(),
            initial: initial.map(<[u8]>::to_vec),
            any: any.into_iter().map(Into::into).collect(),
            final_value: final_value.map(<[u8]>::to_vec),
        }
    }

    /// `(attribute>=value)`
    #[must_use]
    pub fn greater_or_equal(attribute: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::GreaterOrEqual {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// `(attribute<=value)`
    #[must_use]
    pub fn less_or_equal(attribute: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::LessOrEqual {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// `(attribute=*)`
    #[must_use]
    pub fn present(attribute: impl Into<String>) -> Self {
        Self::Present {
            attribute: attribute.into(),
        }
    }

    /// `(attribute~=value)`
    #[must_use]
    pub fn approx(attribute: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self::Approx {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// `(attribute:dn:rule:=value)`; at least one of `matching_rule` and `attribute` should be
    /// given for the filter to match anything.
    #[must_use]
    pub fn extensible(
        matching_rule: Option<&str>,
        attribute: Option<&str>,
        value: impl Into<Vec<u8>>,
        dn_attributes: bool,
    ) -> Self {
        Self::Extensible {
            matching_rule: matching_rule.map(str::to_string),
            attribute: attribute.map(str::to_string),
            value: value.into(),
            dn_attributes,
        }
    }

    /// `(objectClass=*)`, which matches every entry.
    #[must_use]
    pub fn object_class_present() -> Self {
        Self::present("objectClass")
    }

    /// Parses the RFC 4515 string form. The outer parentheses may be omitted for a single
    /// item, as in `cn=Bob`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`] with the offending position if the text is malformed.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = FilterParser::new(input);
        parser.skip_spaces();
        let filter = if parser.peek() == Some(b'(') {
            parser.parse_filter()?
        } else {
            parser.parse_item(None)?
        };
        parser.skip_spaces();
        if parser.is_at_end() {
            Ok(filter)
        } else {
            Err(parser.unexpected("after filter"))
        }
    }

    /// Compiles the filter against `schema`.
    #[must_use]
    pub fn matcher(&self, schema: &Schema) -> Matcher {
        Matcher::compile(self, schema)
    }
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

struct FilterParser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> FilterParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    fn error(&self, position: usize, reason: impl Into<String>) -> Error {
        Error::decode_at(self.input, position, reason)
    }

    fn unexpected(&self, context: &str) -> Error {
        match self.input.get(self.pos..).and_then(|rest| rest.chars().next()) {
            Some(ch) => self.error(
                self.pos,
                format!("unexpected character `{ch}` at position {} {context}", self.pos),
            ),
            None => self.error(self.pos, format!("unexpected end of input {context}")),
        }
    }

    fn expect(&mut self, expected: u8, context: &str) -> Result<()> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected(context))
        }
    }

    fn parse_filter(&mut self) -> Result<Filter> {
        self.expect(b'(', "at start of filter")?;
        let filter = match self.peek() {
            Some(b'&') => {
                self.pos += 1;
                Filter::And(self.parse_list()?)
            }
            Some(b'|') => {
                self.pos += 1;
                Filter::Or(self.parse_list()?)
            }
            Some(b'!') => {
                self.pos += 1;
                self.skip_spaces();
                let inner = self.parse_filter()?;
                self.skip_spaces();
                Filter::not(inner)
            }
            _ => self.parse_item(Some(b')'))?,
        };
        self.expect(b')', "at end of filter")?;
        Ok(filter)
    }

    fn parse_list(&mut self) -> Result<Vec<Filter>> {
        let mut filters = Vec::new();
        loop {
            self.skip_spaces();
            if self.peek() != Some(b'(') {
                return Ok(filters);
            }
            filters.push(self.parse_filter()?);
        }
    }

    /// Parses `attr op value` or an extensible match, stopping before `terminator` (or at the
    /// end of input when there is none).
    fn parse_item(&mut self, terminator: Option<u8>) -> Result<Filter> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b';' | b'_'))
        {
            self.pos += 1;
        }
        let attribute = &self.input[start..self.pos];

        match self.peek() {
            Some(b':') => return self.parse_extensible(attribute, terminator),
            _ if attribute.is_empty() => {
                return Err(self.error(
                    start,
                    format!("missing attribute description at position {start}"),
                ));
            }
            _ => {}
        }

        let attribute = attribute.to_string();
        match self.peek() {
            Some(b'=') => {
                self.pos += 1;
                self.parse_equality_like(attribute, terminator)
            }
            Some(op @ (b'~' | b'>' | b'<')) => {
                self.pos += 1;
                self.expect(b'=', "in filter operator")?;
                let value = self.read_value(terminator)?;
                Ok(match op {
                    b'~' => Filter::Approx { attribute, value },
                    b'>' => Filter::GreaterOrEqual { attribute, value },
                    _ => Filter::LessOrEqual { attribute, value },
                })
            }
            _ => Err(self.unexpected("in filter item")),
        }
    }

    fn parse_equality_like(&mut self, attribute: String, terminator: Option<u8>) -> Result<Filter> {
        let pieces = self.read_pieces(terminator)?;
        if let [value] = pieces.as_slice() {
            return Ok(Filter::Equality {
                attribute,
                value: value.clone(),
            });
        }
        if pieces.len() == 2 && pieces.iter().all(Vec::is_empty) {
            return Ok(Filter::Present { attribute });
        }

        let last = pieces.len() - 1;
        let mut initial = None;
        let mut any = Vec::new();
        let mut final_value = None;
        for (index, piece) in pieces.into_iter().enumerate() {
            if piece.is_empty() {
                continue;
            }
            if index == 0 {
                initial = Some(piece);
            } else if index == last {
                final_value = Some(piece);
            } else {
                any.push(piece);
            }
        }
        Ok(Filter::Substrings {
            attribute,
            initial,
            any,
            final_value,
        })
    }

    fn parse_extensible(&mut self, attribute: &str, terminator: Option<u8>) -> Result<Filter> {
        let start = self.pos;
        let mut dn_attributes = false;
        let mut matching_rule: Option<String> = None;
        loop {
            self.expect(b':', "in extensible match")?;
            if self.peek() == Some(b'=') {
                self.pos += 1;
                break;
            }
            let token_start = self.pos;
            while self
                .peek()
                .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_'))
            {
                self.pos += 1;
            }
            let token = &self.input[token_start..self.pos];
            if token.is_empty() {
                return Err(self.unexpected("in extensible match"));
            }
            if token.eq_ignore_ascii_case("dn") && !dn_attributes && matching_rule.is_none() {
                dn_attributes = true;
            } else if matching_rule.is_none() {
                matching_rule = Some(token.to_string());
            } else {
                return Err(self.error(
                    token_start,
                    format!("unexpected `{token}` at position {token_start} in extensible match"),
                ));
            }
        }

        if attribute.is_empty() && matching_rule.is_none() {
            return Err(self.error(
                start,
                "extensible match needs an attribute description or a matching rule",
            ));
        }
        let value = self.read_value(terminator)?;
        Ok(Filter::Extensible {
            matching_rule,
            attribute: (!attribute.is_empty()).then(|| attribute.to_string()),
            value,
            dn_attributes,
        })
    }

    fn read_value(&mut self, terminator: Option<u8>) -> Result<Vec<u8>> {
        let star = self.pos;
        let mut pieces = self.read_pieces(terminator)?;
        if pieces.len() > 1 {
            let offset = self.input[star..]
                .find('*')
                .map_or(star, |found| star + found);
            return Err(self.error(offset, format!("unescaped `*` at position {offset}")));
        }
        Ok(pieces.pop().unwrap_or_default())
    }

    /// Reads an assertion value split on unescaped `*`.
    fn read_pieces(&mut self, terminator: Option<u8>) -> Result<Vec<Vec<u8>>> {
        let mut pieces = Vec::new();
        let mut current = Vec::new();
        loop {
            match self.peek() {
                None if terminator.is_none() => break,
                None => return Err(self.unexpected("in assertion value")),
                Some(b) if Some(b) == terminator => break,
                Some(b'*') => {
                    self.pos += 1;
                    pieces.push(std::mem::take(&mut current));
                }
                Some(b'\\') => {
                    self.pos += 1;
                    current.push(self.read_escape()?);
                }
                Some(b'(' | b')' | 0) => return Err(self.unexpected("in assertion value")),
                Some(b) => {
                    self.pos += 1;
                    current.push(b);
                }
            }
        }
        pieces.push(current);
        Ok(pieces)
    }

    fn read_escape(&mut self) -> Result<u8> {
        let start = self.pos - 1;
        match (self.bytes.get(self.pos), self.bytes.get(self.pos + 1)) {
            (Some(&hi), Some(&lo)) if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() => {
                self.pos += 2;
                Ok((hex_digit(hi) << 4) | hex_digit(lo))
            }
            _ => Err(self.error(
                start,
                format!("invalid escape sequence at position {start}, expected two hex digits"),
            )),
        }
    }
}

fn write_value(out: &mut fmt::Formatter<'_>, value: &[u8]) -> fmt::Result {
    match std::str::from_utf8(value) {
        Ok(text) => {
            for ch in text.chars() {
                match ch {
                    '*' => out.write_str("\\2a")?,
                    '(' => out.write_str("\\28")?,
                    ')' => out.write_str("\\29")?,
                    '\\' => out.write_str("\\5c")?,
                    '\0' => out.write_str("\\00")?,
                    c if c.is_control() => {
                        let mut buffer = [0; 4];
                        for b in c.encode_utf8(&mut buffer).bytes() {
                            write!(out, "\\{}", to_hex(&[b]))?;
                        }
                    }
                    c => out.write_char(c)?,
                }
            }
        }
        Err(_) => {
            for &b in value {
                if (b.is_ascii_graphic() || b == b' ') && !matches!(b, b'*' | b'(' | b')' | b'\\') {
                    out.write_char(char::from(b))?;
                } else {
                    write!(out, "\\{}", to_hex(&[b]))?;
                }
            }
        }
    }
    Ok(())
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(filters) => list(f, '&', filters),
            Self::Or(filters) => list(f, '|', filters),
            Self::Not(filter) => write!(f, "(!{filter})"),
            Self::Equality { attribute, value } => simple(f, attribute, "=", value),
            Self::GreaterOrEqual { attribute, value } => simple(f, attribute, ">=", value),
            Self::LessOrEqual { attribute, value } => simple(f, attribute, "<=", value),
            Self::Approx { attribute, value } => simple(f, attribute, "~=", value),
            Self::Present { attribute } => write!(f, "({attribute}=*)"),
            Self::Substrings {
                attribute,
                initial,
                any,
                final_value,
            } => {
                write!(f, "({attribute}=")?;
                if let Some(initial) = initial {
                    write_value(f, initial)?;
                }
                f.write_char('*')?;
                for piece in any {
                    write_value(f, piece)?;
                    f.write_char('*')?;
                }
                if let Some(final_value) = final_value {
                    write_value(f, final_value)?;
                }
                f.write_char(')')
            }
            Self::Extensible {
                matching_rule,
                attribute,
                value,
                dn_attributes,
            } => {
                f.write_char('(')?;
                if let Some(attribute) = attribute {
                    f.write_str(attribute)?;
                }
                if *dn_attributes {
                    f.write_str(":dn")?;
                }
                if let Some(rule) = matching_rule {
                    write!(f, ":{rule}")?;
                }
                f.write_str(":=")?;
                write_value(f, value)?;
                f.write_char(')')
            }
            Self::Unrecognized { tag, data } => write!(f, "(?{tag:02x}={})", to_hex(data)),
        }
    }
}

fn list(f: &mut fmt::Formatter<'_>, operator: char, filters: &[Filter]) -> fmt::Result {
    write!(f, "({operator}")?;
    for filter in filters {
        write!(f, "{filter}")?;
    }
    f.write_char(')')
}

fn simple(f: &mut fmt::Formatter<'_>, attribute: &str, operator: &str, value: &[u8]) -> fmt::Result {
    write!(f, "({attribute}{operator}")?;
    write_value(f, value)?;
    f.write_char(')')
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Filter::parse(&text).map_err(de::Error::custom)
    }
}
