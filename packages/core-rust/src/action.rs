//! Action grammar: `"domain.operation"` strings and domain-name validation.
//!
//! An action names which capability and which of its operations a dispatch
//! call targets. The wire format is a single string split on the first `.`;
//! both halves must be non-empty. Domain names are further restricted to
//! identifier syntax so they can double as registry keys.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

/// Identifier syntax required of capability domain names.
static DOMAIN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("^[a-zA-Z_][a-zA-Z0-9_]*$").expect("literal regex compiles"));

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// A parsed `domain.operation` action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Action {
    domain: String,
    operation: String,
}

impl Action {
    /// Parses an action string of the form `domain.operation`.
    ///
    /// The split happens at the first `.`, so operation segments may
    /// themselves contain dots: `"storage.admin.compact"` targets the
    /// `storage` domain with operation `admin.compact`.
    ///
    /// # Errors
    ///
    /// Returns [`ActionParseError`] when the separator is missing or either
    /// half is empty.
    pub fn parse(raw: &str) -> Result<Self, ActionParseError> {
        let Some((domain, operation)) = raw.split_once('.') else {
            return Err(ActionParseError::MissingSeparator {
                raw: raw.to_string(),
            });
        };
        if domain.is_empty() || operation.is_empty() {
            return Err(ActionParseError::EmptySegment {
                raw: raw.to_string(),
            });
        }
        Ok(Self {
            domain: domain.to_string(),
            operation: operation.to_string(),
        })
    }

    /// The capability domain segment.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// The operation segment.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.operation)
    }
}

/// Returns `true` if `name` is a syntactically valid capability domain name.
///
/// Checked at registration time; actions themselves are only split, so a
/// malformed domain in an action string simply fails the registry lookup.
#[must_use]
pub fn is_valid_domain_name(name: &str) -> bool {
    DOMAIN_NAME.is_match(name)
}

/// Errors from parsing an action string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionParseError {
    #[error("action {raw:?} is missing the `.` separator")]
    MissingSeparator { raw: String },
    #[error("action {raw:?} has an empty domain or operation segment")]
    EmptySegment { raw: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
