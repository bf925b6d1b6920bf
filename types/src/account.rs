//! Account identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a ledger participant: a staker, the admin, a reward
/// recipient, or the custody account itself.
///
/// Identities are opaque strings handed to us by the surrounding system;
/// the ledger only requires them to be non-empty.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create a new account id from a raw string.
    ///
    /// # Panics
    /// Panics if the string is empty. Use [`AccountId::parse`] for untrusted input.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(!s.is_empty(), "account id must not be empty");
        Self(s)
    }

    /// Parse an account id from untrusted input.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Return the raw id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AccountId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
