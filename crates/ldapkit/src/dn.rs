//! Distinguished names.
//!
//! A [`Dn`] is an immutable chain of RDNs from the entry up to the root, with parents shared
//! between the names derived from them. Parsing goes through the schema's
//! [`DnCache`](crate::DnCache): each suffix of a freshly decoded name is cached as well, so names
//! under a common base only decode that base once.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use ldapkit_core::ConditionResult;
use once_cell::sync::OnceCell;
use serde::{Serialize, Serializer};

use crate::rdn::Rdn;
use crate::reader::DnReader;
use crate::schema::Schema;
use crate::Result;

struct DnNode {
    rdn: Rdn,
    parent: Dn,
    depth: usize,
    text: OnceCell<String>,
}

/// An immutable distinguished name.
///
/// Cloning is cheap. Equality is rule-based: two names are equal when [`Dn::matches`] is
/// `True`, so `CN=Bob,DC=Example` equals `cn=bob, dc=example` under the core schema.
#[derive(Clone)]
pub struct Dn(Option<Arc<DnNode>>);

impl Dn {
    /// The root DN, which has no RDNs.
    #[must_use]
    pub const fn root() -> Self {
        Self(None)
    }

    /// Parses the RFC 4514 string form of a name.
    ///
    /// An empty or all-space string is the root DN. Both `,` and `;` separate RDNs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Decode`](ldapkit_core::Error::Decode) for malformed text and
    /// [`Error::UnknownAttributeType`](ldapkit_core::Error::UnknownAttributeType) for an attribute
    /// type the schema does not define.
    pub fn parse(input: &str, schema: &Schema) -> Result<Self> {
        if input.trim_matches(' ').is_empty() {
            return Ok(Self::root());
        }
        let cache = schema.dn_cache();
        if let Some(dn) = cache.get(input) {
            return Ok(dn);
        }
        let dn = Self::decode(input, schema)?;
        cache.insert(input, dn.clone());
        Ok(dn)
    }

    /// Decodes RDNs left to right until the end of input or a suffix already in the cache, then
    /// links them from the top down, caching each new proper suffix.
    fn decode(input: &str, schema: &Schema) -> Result<Self> {
        let cache = schema.dn_cache();
        let mut pending = Vec::new();
        let mut offset = 0;
        let mut base = Self::root();
        loop {
            let mut reader = DnReader::at(input, offset);
            let rdn = Rdn::decode(&mut reader, schema)?;
            pending.push((offset, rdn));
            match reader.peek() {
                None => break,
                Some(b',' | b';') => {
                    let separator = reader.position();
                    reader.advance();
                    reader.skip_spaces();
                    if reader.is_at_end() {
                        return Err(reader.error_at(
                            separator,
                            format!("trailing RDN separator at position {separator}"),
                        ));
                    }
                    offset = reader.position();
                    if let Some(parent) = cache.get(&input[offset..]) {
                        base = parent;
                        break;
                    }
                }
                Some(_) => return Err(reader.unexpected_at(reader.position(), "after RDN")),
            }
        }

        let mut dn = base;
        for (offset, rdn) in pending.into_iter().rev() {
            dn = dn.child(rdn);
            if offset > 0 {
                cache.insert(&input[offset..], dn.clone());
            }
        }
        Ok(dn)
    }

    /// Returns the immediate child of this name with the given RDN.
    #[must_use]
    pub fn child(&self, rdn: Rdn) -> Self {
        Self(Some(Arc::new(DnNode {
            rdn,
            parent: self.clone(),
            depth: self.depth() + 1,
            text: OnceCell::new(),
        })))
    }

    /// Returns a descendant with `rdns` prepended, nearest first: the last RDN becomes the
    /// child of `self` and the first RDN becomes the leaf.
    #[must_use]
    pub fn child_all<I>(&self, rdns: I) -> Self
    where
        I: IntoIterator<Item = Rdn>,
        I::IntoIter: DoubleEndedIterator,
    {
        rdns.into_iter()
            .rev()
            .fold(self.clone(), |dn, rdn| dn.child(rdn))
    }

    /// The parent, or `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<&Dn> {
        self.0.as_ref().map(|node| &node.parent)
    }

    /// The ancestor `levels` steps up, `None` if the name is not that deep.
    #[must_use]
    pub fn parent_at(&self, levels: usize) -> Option<&Dn> {
        let mut current = self;
        for _ in 0..levels {
            current = current.parent()?;
        }
        Some(current)
    }

    /// The leaf RDN, or `None` for the root.
    #[must_use]
    pub fn rdn(&self) -> Option<&Rdn> {
        self.0.as_ref().map(|node| &node.rdn)
    }

    /// Number of RDNs.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.0.as_ref().map_or(0, |node| node.depth)
    }

    /// Returns true for the root DN.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.0.is_none()
    }

    /// Iterates over the RDNs from the leaf up to the top.
    #[must_use]
    pub fn rdns(&self) -> Rdns<'_> {
        Rdns { current: self }
    }

    /// String form, computed once per name and shared by every clone.
    ///
    /// Building it reuses the text of the nearest ancestor that already has one.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match &self.0 {
            None => "",
            Some(node) => node.text.get_or_init(|| {
                let mut text = node.rdn.to_string();
                let mut current = &node.parent;
                while let Some(ancestor) = &current.0 {
                    text.push(',');
                    if let Some(known) = ancestor.text.get() {
                        text.push_str(known);
                        break;
                    }
                    text.push_str(&ancestor.rdn.to_string());
                    current = &ancestor.parent;
                }
                text
            }),
        }
    }

    /// Three-valued structural comparison.
    ///
    /// `True` when every RDN matches its counterpart up to the root, `False` when the depths
    /// differ or any RDN pair is `False`, and `Undefined` otherwise.
    #[must_use]
    pub fn matches(&self, other: &Dn) -> ConditionResult {
        if self.depth() != other.depth() {
            return ConditionResult::False;
        }
        let mut result = ConditionResult::True;
        let (mut left, mut right) = (self, other);
        while let (Some(a), Some(b)) = (&left.0, &right.0) {
            if Arc::ptr_eq(a, b) {
                break;
            }
            match a.rdn.matches(&b.rdn) {
                ConditionResult::False => return ConditionResult::False,
                rdn => result = result.and(rdn),
            }
            left = &a.parent;
            right = &b.parent;
        }
        result
    }

    /// Returns true if this name equals `other` or is one of its ancestors.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Dn) -> bool {
        other
            .depth()
            .checked_sub(self.depth())
            .and_then(|levels| other.parent_at(levels))
            .is_some_and(|ancestor| ancestor == self)
    }

    /// Returns true if this name equals `other` or is one of its descendants.
    #[must_use]
    pub fn is_descendant_of(&self, other: &Dn) -> bool {
        other.is_ancestor_of(self)
    }

    /// Returns true if `parent` is the immediate parent of this name.
    #[must_use]
    pub fn is_child_of(&self, parent: &Dn) -> bool {
        self.parent().is_some_and(|own| own == parent)
    }

    /// Returns true if this name is the immediate parent of `child`.
    #[must_use]
    pub fn is_parent_of(&self, child: &Dn) -> bool {
        child.is_child_of(self)
    }

    /// Returns true if both handles share one instance. Two roots always do.
    #[must_use]
    pub fn ptr_eq(&self, other: &Dn) -> bool {
        match (&self.0, &other.0) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}

/// Iterator over the RDNs of a [`Dn`], leaf first.
#[derive(Clone)]
pub struct Rdns<'a> {
    current: &'a Dn,
}

impl<'a> Iterator for Rdns<'a> {
    type Item = &'a Rdn;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current.0.as_ref()?;
        self.current = &node.parent;
        Some(&node.rdn)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let depth = self.current.depth();
        (depth, Some(depth))
    }
}

impl ExactSizeIterator for Rdns<'_> {}

impl Drop for Dn {
    fn drop(&mut self) {
        let mut next = self.0.take();
        while let Some(node) = next {
            next = Arc::into_inner(node).and_then(|mut node| node.parent.0.take());
        }
    }
}

impl Default for Dn {
    fn default() -> Self {
        Self::root()
    }
}

impl PartialEq for Dn {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other).is_true()
    }
}

impl Eq for Dn {}

impl Hash for Dn {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.depth().hash(state);
        for rdn in self.rdns() {
            rdn.hash(state);
        }
    }
}

impl fmt::Display for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Dn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Dn").field(&self.as_str()).finish()
    }
}

impl Serialize for Dn {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldapkit_core::SchemaOptions;
    use std::collections::HashSet;

    fn parse(text: &str) -> Dn {
        Dn::parse(text, Schema::core()).unwrap()
    }

    fn uncached_schema() -> Schema {
        Schema::builder("uncached")
            .with_core_schema()
            .options(SchemaOptions::new().without_dn_cache())
            .build()
            .unwrap()
    }

    #[test]
    fn empty_string_is_root() {
        assert!(parse("").is_root());
        assert!(parse("   ").is_root());
        assert_eq!(Dn::root().depth(), 0);
        assert_eq!(Dn::root().to_string(), "");
        assert!(Dn::root().parent().is_none());
        assert!(Dn::root().rdn().is_none());
    }

    #[test]
    fn parse_simple_dn() {
        let dn = parse("cn=John Doe,ou=People,dc=example,dc=com");
        assert_eq!(dn.depth(), 4);
        assert_eq!(dn.to_string(), "cn=John Doe,ou=People,dc=example,dc=com");
        assert_eq!(dn.rdn().unwrap().to_string(), "cn=John Doe");
        let rdns: Vec<String> = dn.rdns().map(ToString::to_string).collect();
        assert_eq!(rdns, ["cn=John Doe", "ou=People", "dc=example", "dc=com"]);
    }

    #[test]
    fn parse_dn_with_escape_and_spaces() {
        let dn = parse("cn=Smith\\, John ;  ou=People , dc=example");
        assert_eq!(dn.depth(), 3);
        assert_eq!(dn.to_string(), "cn=Smith\\, John,ou=People,dc=example");
    }

    #[test]
    fn equal_across_spellings_and_parses() {
        let a = parse("CN=Bob,DC=Example,DC=COM");
        let b = Dn::parse("cn=bob, dc=example, dc=com", &uncached_schema()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.matches(&b), ConditionResult::True);

        let mut set = HashSet::new();
        set.insert(a.clone());
        assert!(set.contains(&b));

        assert_ne!(a, parse("cn=Alice,dc=example,dc=com"));
        assert_ne!(a, parse("dc=example,dc=com"));
    }

    #[test]
    fn parent_matches_parsed_suffix() {
        let dn = parse("cn=Bob,dc=example,dc=com");
        assert_eq!(
            dn.parent().unwrap().to_string(),
            parse("dc=example,dc=com").to_string()
        );
        assert_eq!(dn.parent_at(2).unwrap().to_string(), "dc=com");
        assert!(dn.parent_at(3).unwrap().is_root());
        assert!(dn.parent_at(4).is_none());
        assert_eq!(dn.parent_at(0), Some(&dn));
    }

    #[test]
    fn ancestry() {
        let base = parse("dc=example,dc=com");
        let people = parse("ou=People,dc=example,dc=com");
        let bob = parse("cn=Bob,ou=People,dc=example,dc=com");

        assert!(bob.is_ancestor_of(&bob));
        assert!(Dn::root().is_ancestor_of(&bob));
        assert!(base.is_ancestor_of(&bob));
        assert!(!bob.is_ancestor_of(&base));
        assert!(bob.is_descendant_of(&base));
        assert!(bob.is_child_of(&people));
        assert!(!bob.is_child_of(&base));
        assert!(people.is_parent_of(&bob));
        assert!(!parse("dc=other,dc=com").is_ancestor_of(&bob));
    }

    #[test]
    fn child_all_prepends_nearest_first() {
        let schema = Schema::core();
        let base = parse("dc=example,dc=com");
        let cn = Rdn::parse("cn=Bob", schema).unwrap();
        let ou = Rdn::parse("ou=People", schema).unwrap();
        let dn = base.child_all([cn, ou]);
        assert_eq!(dn.to_string(), "cn=Bob,ou=People,dc=example,dc=com");
        assert!(dn.parent().unwrap().parent().unwrap().ptr_eq(&base));
    }

    #[test]
    fn cache_shares_parents() {
        let schema = Schema::builder("shared").with_core_schema().build().unwrap();
        let bob = Dn::parse("cn=Bob,dc=example,dc=com", &schema).unwrap();
        assert_eq!(schema.dn_cache().len(), 3);
        let alice = Dn::parse("cn=Alice,dc=example,dc=com", &schema).unwrap();
        assert!(bob.parent().unwrap().ptr_eq(alice.parent().unwrap()));
        let again = Dn::parse("cn=Bob,dc=example,dc=com", &schema).unwrap();
        assert!(again.ptr_eq(&bob));
        assert!(schema.dn_cache().stats().hits >= 2);
    }

    #[test]
    fn parse_without_cache() {
        let schema = uncached_schema();
        let dn = Dn::parse("cn=Bob,dc=example", &schema).unwrap();
        assert_eq!(dn.depth(), 2);
        assert!(schema.dn_cache().is_empty());
    }

    #[test]
    fn parse_errors_report_positions() {
        let schema = Schema::core();
        let position = |s: &str| Dn::parse(s, schema).unwrap_err().position();
        assert_eq!(position("cn=Bob,"), Some(6));
        assert_eq!(position("cn=Bob, "), Some(6));
        assert_eq!(position("cn=Bob,,dc=com"), Some(7));
        assert_eq!(position("cn=Bob,dc"), Some(9));
        assert_eq!(position("cn=Bob,dc=#0"), Some(10));
        let err = Dn::parse("cn=Bob,foo=bar", schema).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_ATTRIBUTE_TYPE");
    }

    #[test]
    fn deep_names_do_not_exhaust_the_stack() {
        const DEPTH: usize = 10_000;
        let text = vec!["dc=a"; DEPTH].join(",");
        for schema in [Schema::core().clone(), uncached_schema()] {
            let dn = Dn::parse(&text, &schema).unwrap();
            assert_eq!(dn.depth(), DEPTH);
            let other = Dn::parse(&text.to_uppercase(), &uncached_schema()).unwrap();
            assert_eq!(dn.matches(&other), ConditionResult::True);
            assert!(dn.parent().unwrap().is_ancestor_of(&dn));
            assert_eq!(dn.as_str().len(), text.len());
            drop(other);
        }
    }

    #[test]
    fn text_reuses_known_ancestors() {
        let base = parse("dc=example,dc=com");
        assert_eq!(base.as_str(), "dc=example,dc=com");
        let schema = Schema::core();
        let dn = base.child(Rdn::parse("cn=Bob", schema).unwrap());
        assert_eq!(dn.as_str(), "cn=Bob,dc=example,dc=com");
        assert_eq!(dn.parent().unwrap().as_str(), "dc=example,dc=com");
    }

    #[test]
    fn serializes_as_string() {
        let dn = parse("cn=Bob,dc=com");
        assert_eq!(serde_json::to_string(&dn).unwrap(), "\"cn=Bob,dc=com\"");
        assert_eq!(format!("{dn:?}"), "Dn(\"cn=Bob,dc=com\")");
    }
}
