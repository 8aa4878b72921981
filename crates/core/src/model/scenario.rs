use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::model::ids::ScenarioId;

//
// ─── ERRORS ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum OptionKeyError {
    #[error("option key cannot be empty")]
    Empty,

    #[error("option key is too long: {len} characters")]
    TooLong { len: usize },
}

//
// ─── OPTION KEY ───────────────────────────────────────────────────────────────
//

/// Label of an answer option as shown to the player ("A", "B", ...).
///
/// Keys are trimmed and upper-cased so that `"a"` and `" A"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OptionKey(String);

impl OptionKey {
    const MAX_LEN: usize = 8;

    /// Parse and normalize an option key.
    ///
    /// # Errors
    ///
    /// Returns `OptionKeyError::Empty` for blank input and
    /// `OptionKeyError::TooLong` for keys longer than eight characters.
    pub fn parse(raw: impl AsRef<str>) -> Result<Self, OptionKeyError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(OptionKeyError::Empty);
        }
        let len = trimmed.chars().count();
        if len > Self::MAX_LEN {
            return Err(OptionKeyError::TooLong { len });
        }
        Ok(Self(trimmed.to_uppercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OptionKey {
    type Error = OptionKeyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<OptionKey> for String {
    fn from(value: OptionKey) -> Self {
        value.0
    }
}

impl fmt::Display for OptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

//
// ─── BACKEND RECORDS ──────────────────────────────────────────────────────────
//

/// Scenario metadata as listed by the backend. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub id: ScenarioId,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub phase: Option<u32>,
}

/// One answer option of a scenario as listed by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    #[serde(alias = "scenario")]
    pub scenario_id: ScenarioId,
    pub option: OptionKey,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
    #[serde(default)]
    pub explanation: Option<String>,
}
