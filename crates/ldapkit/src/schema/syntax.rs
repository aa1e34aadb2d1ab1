//! Attribute syntaxes.

use serde::Serialize;

/// An LDAP syntax definition (RFC 4512 §4.1.5).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Syntax {
    oid: String,
    description: String,
    human_readable: bool,
}

impl Syntax {
    /// Creates a human-readable syntax.
    #[must_use]
    pub fn new(oid: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            oid: oid.into(),
            description: description.into(),
            human_readable: true,
        }
    }

    /// Marks the syntax as binary (values render as `#` followed by hex in DNs).
    #[must_use]
    pub fn binary(mut self) -> Self {
        self.human_readable = false;
        self
    }

    /// Numeric OID of the syntax.
    #[must_use]
    pub fn oid(&self) -> &str {
        &self.oid
    }

    /// Description of the syntax.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Whether values of this syntax are human-readable strings.
    #[must_use]
    pub fn is_human_readable(&self) -> bool {
        self.human_readable
    }
}
