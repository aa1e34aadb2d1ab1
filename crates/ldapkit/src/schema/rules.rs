//! Built-in matching rule algorithms used by the core schema.
//!
//! String preparation is a simplified form of RFC 4518: values are decoded as UTF-8, runs of
//! whitespace collapse to one space, leading and trailing whitespace is dropped and case-ignore
//! rules lower-case the result. Integers of any length normalize to a sign byte, a digit count and
//! the digits, complemented for negative numbers, so byte order matches numeric order and
//! ordering assertions can compare bytes directly.

use ldapkit_core::{ConditionResult, Error};

use super::matching_rule::{Assertion, MatchingRuleImpl};
use crate::rdn::escape_value;
use crate::reader::{to_hex, DnReader};
use crate::Result;

/// How stored and asserted values are normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Normalizer {
    CaseIgnore,
    CaseExact,
    CaseIgnoreIa5,
    Integer,
    Boolean,
    OctetString,
    ObjectIdentifier,
    DistinguishedName,
}

/// What an assertion built by the rule tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RuleKind {
    Equality,
    Ordering,
    Substrings,
}

/// A matching rule implementation built from a normalizer and a rule kind.
#[derive(Debug, Clone, Copy)]
pub(crate) struct BuiltinRule {
    normalizer: Normalizer,
    kind: RuleKind,
}

impl BuiltinRule {
    pub(crate) const fn new(normalizer: Normalizer, kind: RuleKind) -> Self {
        Self { normalizer, kind }
    }

    fn substrings(
        &self,
        initial: Option<&[u8]>,
        any: &[Vec<u8>],
        final_value: Option<&[u8]>,
    ) -> Result<SubstringsAssertion> {
        let piece = |value: &[u8]| self.normalizer.normalize(value, false);
        Ok(SubstringsAssertion {
            initial: initial.map(piece).transpose()?,
            any: any
                .iter()
                .map(|value| piece(value))
                .filter(|value| !matches!(value, Ok(v) if v.is_empty()))
                .collect::<Result<_>>()?,
            final_value: final_value.map(piece).transpose()?,
        })
    }
}

impl MatchingRuleImpl for BuiltinRule {
    fn normalize_attribute_value(&self, value: &[u8]) -> Result<Vec<u8>> {
        self.normalizer.normalize(value, true)
    }

    fn assertion(&self, value: &[u8]) -> Result<Box<dyn Assertion>> {
        match self.kind {
            RuleKind::Equality => Ok(Box::new(EqualityAssertion(
                self.normalizer.normalize(value, true)?,
            ))),
            RuleKind::Ordering => Ok(Box::new(LessThanAssertion(
                self.normalizer.normalize(value, true)?,
            ))),
            RuleKind::Substrings => {
                // RFC 4517 SubstringAssertion: initial*any*...*final
                let parts: Vec<&[u8]> = value.split(|b| *b == b'*').collect();
                if parts.len() < 2 {
                    return Err(Error::decode(
                        String::from_utf8_lossy(value),
                        "substring assertion must contain `*`",
                    ));
                }
                let non_empty = |part: &&[u8]| !part.is_empty();
                let initial = parts.first().copied().filter(non_empty);
                let final_value = parts.last().copied().filter(non_empty);
                let any: Vec<Vec<u8>> = parts[1..parts.len() - 1]
                    .iter()
                    .copied()
                    .filter(non_empty)
                    .map(<[u8]>::to_vec)
                    .collect();
                Ok(Box::new(self.substrings(initial, &any, final_value)?))
            }
        }
    }

    fn substrings_assertion<'a>(
        &self,
        initial: Option<&'a [u8]>,
        any: &[Vec<u8>],
        final_value: Option<&'a [u8]>,
    ) -> Result<Box<dyn Assertion>> {
        if self.kind != RuleKind::Substrings {
            return Err(Error::InvalidArgument(
                "matching rule does not support substring assertions".to_string(),
            ));
        }
        Ok(Box::new(self.substrings(initial, any, final_value)?))
    }
}

impl Normalizer {
    /// Normalizes a value. `trim` is false for substring components, whose edge spaces matter.
    fn normalize(self, value: &[u8], trim: bool) -> Result<Vec<u8>> {
        match self {
            Self::CaseIgnore => prepare_string(value, true, trim).map(String::into_bytes),
            Self::CaseExact => prepare_string(value, false, trim).map(String::into_bytes),
            Self::CaseIgnoreIa5 => {
                if !value.is_ascii() {
                    return Err(decode_error(value, "value is not an IA5 string"));
                }
                prepare_string(value, true, trim).map(String::into_bytes)
            }
            Self::Integer => normalize_integer(value),
            Self::Boolean => normalize_boolean(value),
            Self::OctetString => Ok(value.to_vec()),
            Self::ObjectIdentifier => normalize_oid(value),
            Self::DistinguishedName => normalize_dn(value),
        }
    }
}

fn decode_error(value: &[u8], reason: &str) -> Error {
    Error::decode(String::from_utf8_lossy(value), reason)
}

fn as_utf8(value: &[u8]) -> Result<&str> {
    std::str::from_utf8(value).map_err(|_| decode_error(value, "value is not valid UTF-8"))
}

fn prepare_string(value: &[u8], fold_case: bool, trim: bool) -> Result<String> {
    let text = as_utf8(value)?;
    let mut prepared = String::with_capacity(text.len());
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && (!trim || !prepared.is_empty()) {
            prepared.push(' ');
        }
        pending_space = false;
        if fold_case {
            prepared.extend(ch.to_lowercase());
        } else {
            prepared.push(ch);
        }
    }
    if pending_space && !trim {
        prepared.push(' ');
    }
    Ok(prepared)
}

const INTEGER_NEGATIVE: u8 = 0;
const INTEGER_ZERO: u8 = 1;
const INTEGER_POSITIVE: u8 = 2;

fn normalize_integer(value: &[u8]) -> Result<Vec<u8>> {
    let text = as_utf8(value)?.trim();
    let (negative, digits) = match text.as_bytes() {
        [b'-', rest @ ..] => (true, rest),
        [b'+', rest @ ..] => (false, rest),
        rest => (false, rest),
    };
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(decode_error(value, "value is not an integer"));
    }
    let significant = match digits.iter().position(|digit| *digit != b'0') {
        Some(start) => &digits[start..],
        None => return Ok(vec![INTEGER_ZERO]),
    };
    let count = u32::try_from(significant.len())
        .map_err(|_| decode_error(value, "integer has too many digits"))?;

    let mut normalized = Vec::with_capacity(significant.len() + 5);
    if negative {
        normalized.push(INTEGER_NEGATIVE);
        normalized.extend_from_slice(&(!count).to_be_bytes());
        normalized.extend(significant.iter().map(|digit| !digit));
    } else {
        normalized.push(INTEGER_POSITIVE);
        normalized.extend_from_slice(&count.to_be_bytes());
        normalized.extend_from_slice(significant);
    }
    Ok(normalized)
}

fn normalize_boolean(value: &[u8]) -> Result<Vec<u8>> {
    let text = as_utf8(value)?.trim();
    if text.eq_ignore_ascii_case("TRUE") {
        Ok(b"TRUE".to_vec())
    } else if text.eq_ignore_ascii_case("FALSE") {
        Ok(b"FALSE".to_vec())
    } else {
        Err(decode_error(value, "value is not TRUE or FALSE"))
    }
}

fn normalize_oid(value: &[u8]) -> Result<Vec<u8>> {
    let text = as_utf8(value)?.trim();
    if text.is_empty()
        || !text
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'.' || b == b'-')
    {
        return Err(decode_error(value, "value is not an object identifier"));
    }
    Ok(text.to_ascii_lowercase().into_bytes())
}

/// Schema-independent DN normalization: attribute names are lower-cased (no alias or OID
/// resolution), values are prepared case-insensitively and multi-valued RDNs are sorted.
fn normalize_dn(value: &[u8]) -> Result<Vec<u8>> {
    let text = as_utf8(value)?;
    let mut reader = DnReader::new(text);
    reader.skip_spaces();
    if reader.is_at_end() {
        return Ok(Vec::new());
    }

    let mut rdns = Vec::new();
    loop {
        let mut avas = Vec::new();
        loop {
            reader.skip_spaces();
            let name = reader.read_attribute_name(true)?.to_ascii_lowercase();
            reader.skip_spaces();
            reader.expect(b'=', "after attribute name")?;
            reader.skip_spaces();
            let raw = reader.read_attribute_value()?;
            let rendered = match prepare_string(&raw, true, true) {
                Ok(prepared) => escape_value(&prepared),
                Err(_) => format!("#{}", to_hex(&raw)),
            };
            avas.push(format!("{name}={rendered}"));
            reader.skip_spaces();
            if reader.peek() == Some(b'+') {
                reader.advance();
            } else {
                break;
            }
        }
        avas.sort();
        rdns.push(avas.join("+"));
        match reader.peek() {
            None => break,
            Some(b',' | b';') => {
                reader.advance();
            }
            Some(_) => return Err(reader.unexpected_at(reader.position(), "after attribute value")),
        }
    }
    Ok(rdns.join(",").into_bytes())
}

struct EqualityAssertion(Vec<u8>);

impl Assertion for EqualityAssertion {
    fn matches(&self, normalized_value: &[u8]) -> ConditionResult {
        ConditionResult::from_bool(normalized_value == self.0.as_slice())
    }
}

/// True when the stored value sorts strictly before the asserted value.
struct LessThanAssertion(Vec<u8>);

impl Assertion for LessThanAssertion {
    fn matches(&self, normalized_value: &[u8]) -> ConditionResult {
        ConditionResult::from_bool(normalized_value < self.0.as_slice())
    }
}

struct SubstringsAssertion {
    initial: Option<Vec<u8>>,
    any: Vec<Vec<u8>>,
    final_value: Option<Vec<u8>>,
}

impl Assertion for SubstringsAssertion {
    fn matches(&self, normalized_value: &[u8]) -> ConditionResult {
        let mut rest = normalized_value;
        if let Some(initial) = &self.initial {
            match rest.strip_prefix(initial.as_slice()) {
                Some(remaining) => rest = remaining,
                None => return ConditionResult::False,
            }
        }
        if let Some(final_value) = &self.final_value {
            match rest.strip_suffix(final_value.as_slice()) {
                Some(remaining) => rest = remaining,
                None => return ConditionResult::False,
            }
        }
        for piece in &self.any {
            match find(rest, piece) {
                Some(index) => rest = &rest[index + piece.len()..],
                None => return ConditionResult::False,
            }
        }
        ConditionResult::True
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
