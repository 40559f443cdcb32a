use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{ExtractorConfig, LabelConfig};
use crate::models::{CoarseStatus, MatchPhase};

/// Fields pulled from one rendered match page. Scores stay free-form text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MatchData {
    pub home_team: String,
    pub away_team: String,
    pub home_score: String,
    pub away_score: String,
    pub period: String,
    pub match_started: bool,
}

/// The latest extracted result for a match. `data` is absent for the
/// pending placeholder, which serializes as `{status, phase, lastChecked}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchSnapshot {
    #[serde(flatten)]
    pub data: Option<MatchData>,
    pub status: String,
    pub phase: MatchPhase,
    #[serde(rename = "lastChecked")]
    pub checked_at: DateTime<Utc>,
}

impl MatchSnapshot {
    pub fn is_pending(&self) -> bool {
        self.data.is_none()
    }
}

/// Turns extracted data into snapshots and derives labels, phase and the
/// coarse routing hint from it.
#[derive(Debug, Clone)]
pub struct StatusRules {
    in_progress_label: String,
    pending_label: String,
    period_marker: String,
    concluded_markers: Vec<String>,
}

impl StatusRules {
    pub fn new(labels: &LabelConfig, extractor: &ExtractorConfig) -> Self {
        Self {
            in_progress_label: labels.in_progress.clone(),
            pending_label: labels.pending.clone(),
            period_marker: extractor.period_marker.clone(),
            concluded_markers: extractor.concluded_markers.clone(),
        }
    }

    pub fn snapshot(&self, data: MatchData, checked_at: DateTime<Utc>) -> MatchSnapshot {
        let status = if data.period.is_empty() {
            self.in_progress_label.clone()
        } else {
            data.period.clone()
        };
        let phase = self.phase_for_period(&data.period);

        MatchSnapshot {
            data: Some(data),
            status,
            phase,
            checked_at,
        }
    }

    pub fn pending(&self, checked_at: DateTime<Utc>) -> MatchSnapshot {
        MatchSnapshot {
            data: None,
            status: self.pending_label.clone(),
            phase: MatchPhase::Pending,
            checked_at,
        }
    }

    /// A match counts as concluded once its period text carries a terminal marker.
    pub fn is_concluded(&self, period: &str) -> bool {
        self.concluded_markers
            .iter()
            .any(|marker| !marker.is_empty() && period.contains(marker.as_str()))
    }

    pub fn phase_for_period(&self, period: &str) -> MatchPhase {
        if self.is_concluded(period) {
            MatchPhase::Concluded
        } else {
            MatchPhase::InProgress
        }
    }

    pub fn coarse_status(&self, snapshot: &MatchSnapshot) -> CoarseStatus {
        if !snapshot.is_pending() && snapshot.status.contains(self.period_marker.as_str()) {
            CoarseStatus::Started
        } else {
            CoarseStatus::Waiting
        }
    }
}

impl Default for StatusRules {
    fn default() -> Self {
        Self::new(&LabelConfig::default(), &ExtractorConfig::default())
    }
}
