//! Search scopes and in-memory search.

use std::fmt;
use std::str::FromStr;

use ldapkit_core::Error;
use serde::{Deserialize, Serialize};

use crate::dn::Dn;
use crate::entry::Entry;
use crate::matcher::Matcher;

/// Represents the search scope for LDAP queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    /// Base object only.
    Base,
    /// One level below the base.
    OneLevel,
    /// Entire subtree.
    #[default]
    Subtree,
    /// Entire subtree, excluding the base itself.
    Subordinates,
}

impl SearchScope {
    /// Returns true if `dn` is within this scope of `base`.
    #[must_use]
    pub fn contains(self, base: &Dn, dn: &Dn) -> bool {
        match self {
            Self::Base => dn == base,
            Self::OneLevel => dn.is_child_of(base),
            Self::Subtree => base.is_ancestor_of(dn),
            Self::Subordinates => dn.depth() > base.depth() && base.is_ancestor_of(dn),
        }
    }

    /// Keyword used for this scope in LDAP URLs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::OneLevel => "one",
            Self::Subtree => "sub",
            Self::Subordinates => "subordinates",
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "base" => Ok(Self::Base),
            "one" | "onelevel" => Ok(Self::OneLevel),
            "sub" | "subtree" => Ok(Self::Subtree),
            "subordinates" | "children" => Ok(Self::Subordinates),
            _ => Err(Error::InvalidArgument(format!("unknown search scope `{s}`"))),
        }
    }
}

/// Returns the entries within `scope` of `base` that `matcher` evaluates to `True` for.
pub fn search<'a, E, I>(
    entries: I,
    base: &'a Dn,
    scope: SearchScope,
    matcher: &'a Matcher,
) -> impl Iterator<Item = &'a E> + 'a
where
    E: Entry + ?Sized + 'a,
    I: IntoIterator<Item = &'a E>,
    I::IntoIter: 'a,
{
    entries.into_iter().filter(move |entry| {
        scope.contains(base, entry.name()) && matcher.matches(*entry).is_true()
    })
}
