use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{MatchId, MatchPhase, MatchSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: MatchId,
    pub source_url: String,
    pub registered_at: DateTime<Utc>,
    pub last_snapshot: Option<MatchSnapshot>,

    // Cycle bookkeeping
    pub refresh_count: u64,
    pub failure_count: u64,
    pub last_error: Option<String>,
}

impl MatchRecord {
    pub fn new(id: MatchId, source_url: String, registered_at: DateTime<Utc>) -> Self {
        Self {
            id,
            source_url,
            registered_at,
            last_snapshot: None,
            refresh_count: 0,
            failure_count: 0,
            last_error: None,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.last_snapshot
            .as_ref()
            .map(|snapshot| snapshot.phase)
            .unwrap_or(MatchPhase::Pending)
    }

    pub fn is_concluded(&self) -> bool {
        self.phase().is_terminal()
    }
}
