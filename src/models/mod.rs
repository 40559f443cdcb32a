use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub mod match_record;
pub mod snapshot;

// Re-exports for convenience
pub use match_record::*;
pub use snapshot::*;

/// Opaque token naming one tracked polling subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(String);

impl MatchId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for MatchId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for MatchId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl AsRef<str> for MatchId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Lifecycle of a tracked match, derived from its latest snapshot.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    Pending,
    InProgress,
    Concluded,
}

impl MatchPhase {
    pub fn is_terminal(self) -> bool {
        self == MatchPhase::Concluded
    }
}

/// Routing hint handed back from registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CoarseStatus {
    Started,
    Waiting,
}

impl CoarseStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            CoarseStatus::Started => "started",
            CoarseStatus::Waiting => "waiting",
        }
    }
}

impl fmt::Display for CoarseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Time-ordered so ids issued later sort after earlier ones
pub fn generate_id() -> MatchId {
    MatchId(Uuid::now_v7().simple().to_string())
}
