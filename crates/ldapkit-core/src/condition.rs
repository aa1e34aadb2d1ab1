//! Three-valued logic used by filter evaluation.
//!
//! RFC 4511 §4.5.1.7 evaluates every filter component to TRUE, FALSE or Undefined. Undefined
//! covers components that cannot be decided, such as an assertion against an attribute whose
//! matching rule is unknown or a stored value that fails to normalize.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Not;

/// The outcome of evaluating a filter component against an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConditionResult {
    /// The condition holds.
    True,
    /// The condition does not hold.
    False,
    /// The condition could not be decided.
    Undefined,
}

impl ConditionResult {
    /// Converts a boolean into `True` or `False`.
    #[must_use]
    pub const fn from_bool(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }

    /// Three-valued conjunction.
    #[must_use]
    pub const fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::False, _) | (_, Self::False) => Self::False,
            (Self::True, Self::True) => Self::True,
            _ => Self::Undefined,
        }
    }

    /// Three-valued disjunction.
    #[must_use]
    pub const fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::True, _) | (_, Self::True) => Self::True,
            (Self::False, Self::False) => Self::False,
            _ => Self::Undefined,
        }
    }

    /// Folds results with AND semantics, evaluating lazily.
    ///
    /// Stops at the first `False`; otherwise every result is consumed so that an `Undefined`
    /// anywhere is reported.
    pub fn all<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut outcome = Self::True;
        for result in results {
            match result {
                Self::False => return Self::False,
                Self::Undefined => outcome = Self::Undefined,
                Self::True => {}
            }
        }
        outcome
    }

    /// Folds results with OR semantics, evaluating lazily.
    ///
    /// Stops at the first `True`; otherwise `Undefined` wins over `False`.
    pub fn any<I>(results: I) -> Self
    where
        I: IntoIterator<Item = Self>,
    {
        let mut outcome = Self::False;
        for result in results {
            match result {
                Self::True => return Self::True,
                Self::Undefined => outcome = Self::Undefined,
                Self::False => {}
            }
        }
        outcome
    }

    /// Returns true only for `True`.
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::True)
    }

    /// Returns true only for `False`.
    #[must_use]
    pub const fn is_false(self) -> bool {
        matches!(self, Self::False)
    }

    /// Returns true only for `Undefined`.
    #[must_use]
    pub const fn is_undefined(self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Collapses to a boolean, treating `Undefined` as false.
    #[must_use]
    pub const fn to_bool(self) -> bool {
        self.is_true()
    }
}

/// Logical negation. `Undefined` stays `Undefined`.
impl Not for ConditionResult {
    type Output = Self;

    fn not(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
            Self::Undefined => Self::Undefined,
        }
    }
}

impl From<bool> for ConditionResult {
    fn from(value: bool) -> Self {
        Self::from_bool(value)
    }
}

impl fmt::Display for ConditionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Undefined => "UNDEFINED",
        })
    }
}
