//! Cursor over the RFC 4514 string form of distinguished names.
//!
//! All positions reported in errors are byte offsets into the complete input, including when the
//! reader was started part-way through it.

use ldapkit_core::Error;

use crate::Result;

/// Characters that may follow a backslash in a DN value.
const ESCAPABLE: &[u8] = b" \"#+,;<=>\\";

pub(crate) struct DnReader<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> DnReader<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self::at(input, 0)
    }

    pub(crate) fn at(input: &'a str, offset: usize) -> Self {
        Self {
            input,
            bytes: input.as_bytes(),
            pos: offset.min(input.len()),
        }
    }

    pub(crate) fn input(&self) -> &'a str {
        self.input
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    pub(crate) fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub(crate) fn skip_spaces(&mut self) {
        while self.peek() == Some(b' ') {
            self.pos += 1;
        }
    }

    pub(crate) fn error_at(&self, position: usize, reason: impl Into<String>) -> Error {
        Error::decode_at(self.input, position, reason)
    }

    /// Error naming the character found at `position`.
    pub(crate) fn unexpected_at(&self, position: usize, context: &str) -> Error {
        match self.input.get(position..).and_then(|rest| rest.chars().next()) {
            Some(ch) => self.error_at(
                position,
                format!("unexpected character `{ch}` at position {position} {context}"),
            ),
            None => self.error_at(position, format!("unexpected end of input {context}")),
        }
    }

    pub(crate) fn expect(&mut self, expected: u8, context: &str) -> Result<()> {
        if self.peek() == Some(expected) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected_at(self.pos, context))
        }
    }

    /// Reads a `keystring` or `numericoid` attribute type.
    pub(crate) fn read_attribute_name(&mut self, allow_malformed: bool) -> Result<&'a str> {
        let start = self.pos;
        match self.peek() {
            Some(b) if b.is_ascii_digit() => self.read_numeric_oid()?,
            Some(b) if b.is_ascii_alphabetic() => {
                while let Some(b) = self.peek() {
                    if is_keychar(b, allow_malformed) {
                        self.pos += 1;
                    } else {
                        break;
                    }
                }
            }
            Some(b'=') => {
                return Err(self.error_at(start, format!("missing attribute name at position {start}")))
            }
            _ => return Err(self.unexpected_at(start, "in attribute name")),
        }

        match self.peek() {
            None | Some(b'=' | b' ') => Ok(&self.input[start..self.pos]),
            Some(_) => Err(self.unexpected_at(self.pos, "in attribute name")),
        }
    }

    fn read_numeric_oid(&mut self) -> Result<()> {
        let mut arc_start = self.pos;
        loop {
            while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
            if self.pos == arc_start {
                return Err(self.error_at(
                    self.pos,
                    format!("empty arc in numeric OID at position {}", self.pos),
                ));
            }
            if self.peek() == Some(b'.') {
                self.pos += 1;
                arc_start = self.pos;
            } else {
                return Ok(());
            }
        }
    }

    /// Reads one attribute value in hex, quoted or plain form, returning the raw bytes.
    ///
    /// Trailing unescaped spaces of a plain value are consumed but not returned. The reader is
    /// left on the delimiter that ended the value.
    pub(crate) fn read_attribute_value(&mut self) -> Result<Vec<u8>> {
        match self.peek() {
            Some(b'#') => self.read_hex_value(),
            Some(b'"') => self.read_quoted_value(),
            _ => self.read_plain_value(),
        }
    }

    fn read_hex_value(&mut self) -> Result<Vec<u8>> {
        let start = self.pos;
        self.pos += 1;
        let digits_start = self.pos;
        while self.peek().is_some_and(|b| b.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        let digits = &self.bytes[digits_start..self.pos];
        if digits.len() < 2 {
            if self.peek().is_some_and(|b| !is_value_end(b)) {
                return Err(self.unexpected_at(self.pos, "in hex value"));
            }
            return Err(self.error_at(
                start,
                format!("hex value at position {start} must contain at least one byte"),
            ));
        }
        if digits.len() % 2 != 0 {
            return Err(self.error_at(
                start,
                format!("hex value at position {start} has an odd number of digits"),
            ));
        }
        if self.peek().is_some_and(|b| !is_value_end(b)) {
            return Err(self.unexpected_at(self.pos, "in hex value"));
        }
        Ok(digits
            .chunks_exact(2)
            .map(|pair| (hex_digit(pair[0]) << 4) | hex_digit(pair[1]))
            .collect())
    }

    fn read_quoted_value(&mut self) -> Result<Vec<u8>> {
        let start = self.pos;
        self.pos += 1;
        let mut value = Vec::new();
        loop {
            match self.peek() {
                None => {
                    return Err(self.error_at(
                        start,
                        format!("unterminated quoted value starting at position {start}"),
                    ))
                }
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(value);
                }
                Some(b'\\') => value.push(self.read_escape()?),
                Some(b) => {
                    value.push(b);
                    self.pos += 1;
                }
            }
        }
    }

    fn read_plain_value(&mut self) -> Result<Vec<u8>> {
        let start = self.pos;
        let mut value = Vec::new();
        let mut significant = 0;
        while let Some(b) = self.peek() {
            match b {
                b',' | b';' | b'+' => break,
                b'\\' => {
                    value.push(self.read_escape()?);
                    significant = value.len();
                }
                _ => {
                    value.push(b);
                    self.pos += 1;
                    if b != b' ' {
                        significant = value.len();
                    }
                }
            }
        }
        value.truncate(significant);
        if value.is_empty() {
            return Err(self.error_at(
                start,
                format!("attribute value at position {start} is empty"),
            ));
        }
        Ok(value)
    }

    fn read_escape(&mut self) -> Result<u8> {
        let start = self.pos;
        self.pos += 1;
        match self.peek() {
            None => Err(self.error_at(
                start,
                format!("unterminated escape sequence at position {start}"),
            )),
            Some(high) if high.is_ascii_hexdigit() => {
                match self.bytes.get(self.pos + 1).copied() {
                    Some(low) if low.is_ascii_hexdigit() => {
                        self.pos += 2;
                        Ok((hex_digit(high) << 4) | hex_digit(low))
                    }
                    _ => Err(self.error_at(
                        start,
                        format!("invalid hex escape at position {start}"),
                    )),
                }
            }
            Some(b) if ESCAPABLE.contains(&b) => {
                self.pos += 1;
                Ok(b)
            }
            Some(_) => Err(self.unexpected_at(self.pos, "after `\\`")),
        }
    }
}

fn is_keychar(b: u8, allow_malformed: bool) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || (allow_malformed && (b == b'_' || b == b'.'))
}

fn is_value_end(b: u8) -> bool {
    matches!(b, b',' | b';' | b'+' | b' ')
}

/// Value of an ASCII hex digit. Callers check `is_ascii_hexdigit` first.
pub(crate) fn hex_digit(b: u8) -> u8 {
    match b {
        b'0'..=b'9' => b - b'0',
        b'a'..=b'f' => b - b'a' + 10,
        b'A'..=b'F' => b - b'A' + 10,
        _ => 0,
    }
}

/// Lowercase hex rendering of `bytes`.
pub(crate) fn to_hex(bytes: &[u8]) -> String {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        out.push(char::from(DIGITS[usize::from(b >> 4)]));
        out.push(char::from(DIGITS[usize::from(b & 0x0f)]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(input: &str) -> Result<Vec<u8>> {
        DnReader::new(input).read_attribute_value()
    }

    #[test]
    fn reads_keystring_and_numeric_oid() {
        let mut reader = DnReader::new("cn=Bob");
        assert_eq!(reader.read_attribute_name(false).unwrap(), "cn");
        assert_eq!(reader.peek(), Some(b'='));

        let mut reader = DnReader::new("2.5.4.3 = Bob");
        assert_eq!(reader.read_attribute_name(false).unwrap(), "2.5.4.3");
    }

    #[test]
    fn rejects_illegal_name_characters() {
        let err = DnReader::new("c$n=Bob").read_attribute_name(false).unwrap_err();
        assert_eq!(err.position(), Some(1));

        let err = DnReader::new("my_attr=x").read_attribute_name(false).unwrap_err();
        assert_eq!(err.position(), Some(2));
        assert_eq!(
            DnReader::new("my_attr=x").read_attribute_name(true).unwrap(),
            "my_attr"
        );

        let err = DnReader::new("2..5=x").read_attribute_name(false).unwrap_err();
        assert_eq!(err.position(), Some(2));

        let err = DnReader::new("=x").read_attribute_name(false).unwrap_err();
        assert_eq!(err.position(), Some(0));
    }

    #[test]
    fn reads_plain_values_with_escapes() {
        assert_eq!(value("Smith\\, John,dc=x").unwrap(), b"Smith, John");
        assert_eq!(value("Bob   ,dc=x").unwrap(), b"Bob");
        assert_eq!(value("Bob\\ ").unwrap(), b"Bob ");
        assert_eq!(value("caf\\C3\\A9").unwrap(), "café".as_bytes());
        assert_eq!(value("a=b").unwrap(), b"a=b");
    }

    #[test]
    fn reads_hex_values() {
        assert_eq!(value("#04024869").unwrap(), vec![0x04, 0x02, 0x48, 0x69]);
        assert!(value("#048").unwrap_err().to_string().contains("odd number"));
        assert!(value("#").unwrap_err().to_string().contains("at least one byte"));
        let err = value("#04zz").unwrap_err();
        assert_eq!(err.position(), Some(3));
    }

    #[test]
    fn reads_quoted_values() {
        assert_eq!(value("\"a,b+c\"").unwrap(), b"a,b+c");
        assert_eq!(value("\"say \\\"hi\\\"\"").unwrap(), b"say \"hi\"");
        assert!(value("\"open").is_err());
    }

    #[test]
    fn rejects_empty_and_bad_escapes() {
        assert!(value(",dc=x").unwrap_err().to_string().contains("empty"));
        assert!(value("").is_err());
        let err = value("ab\\q").unwrap_err();
        assert_eq!(err.position(), Some(3));
        let err = value("ab\\").unwrap_err();
        assert_eq!(err.position(), Some(2));
    }

    #[test]
    fn positions_are_absolute() {
        let mut reader = DnReader::at("cn=a,o=b$c=d", 5);
        assert_eq!(reader.read_attribute_name(false).unwrap(), "o");
        reader.expect(b'=', "after attribute name").unwrap();
        assert_eq!(reader.read_attribute_value().unwrap(), b"b$c=d");
        assert_eq!(reader.position(), 12);
    }

    #[test]
    fn hex_rendering() {
        assert_eq!(to_hex(&[0x00, 0xab, 0x10]), "00ab10");
    }
}
