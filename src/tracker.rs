use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;

use crate::config::{AppConfig, StatusPolicy};
use crate::extractor::PageExtractor;
use crate::fetcher::PageFetcher;
use crate::models::{CoarseStatus, MatchData, MatchId, MatchRecord, MatchSnapshot, StatusRules};
use crate::registry::MatchRegistry;
use crate::utils::error::{AppError, Result};

/// What a caller gets back from registering a match.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub match_id: MatchId,
    pub status: CoarseStatus,
    pub snapshot: MatchSnapshot,
}

/// Outcome of one scheduler firing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickReport {
    pub checked: usize,
    pub refreshed: usize,
    pub failed: usize,
    pub skipped_concluded: usize,
    pub pruned: usize,
    pub total_time_ms: u64,
}

/// Ties the fetcher, extractor and registry together.
pub struct MatchTracker {
    registry: Arc<MatchRegistry>,
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn PageExtractor>,
    rules: StatusRules,
    policy: StatusPolicy,
    ttl: Option<chrono::Duration>,
}

impl MatchTracker {
    pub fn new(
        registry: Arc<MatchRegistry>,
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn PageExtractor>,
        config: &AppConfig,
    ) -> Self {
        Self {
            registry,
            fetcher,
            extractor,
            rules: StatusRules::new(&config.labels, &config.extractor),
            policy: config.registry.status_policy,
            ttl: config
                .registry
                .ttl_hours
                .map(|hours| chrono::Duration::hours(hours as i64)),
        }
    }

    pub fn registry(&self) -> &Arc<MatchRegistry> {
        &self.registry
    }

    pub fn rules(&self) -> &StatusRules {
        &self.rules
    }

    /// Registers `url` and runs one Fetch+Extract cycle before returning.
    ///
    /// A failed first cycle still registers the match; it gets the pending
    /// placeholder and the scheduler retries on its next firing.
    pub async fn register(&self, url: &str) -> Result<Registration> {
        let url = url.trim();
        let parsed = url::Url::parse(url)
            .map_err(|e| AppError::Validation(format!("Invalid URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AppError::Validation(format!(
                "Unsupported URL scheme: {}",
                parsed.scheme()
            )));
        }

        let registration = self.registry.register(url.to_string()).await?;
        let record = registration.record;
        tracing::info!(match_id = %record.id, url = %record.source_url, "Registered match");

        let snapshot = match self.run_cycle(&record.id, &record.source_url, true).await {
            Ok(snapshot) => snapshot,
            Err(_) => self.rules.pending(self.registry.now()),
        };
        drop(registration.first_cycle);
        let status = self.rules.coarse_status(&snapshot);

        Ok(Registration {
            match_id: record.id,
            status,
            snapshot,
        })
    }

    /// Latest snapshot for `id`, following the configured [`StatusPolicy`].
    ///
    /// Unknown ids and failed cycles answer with the pending placeholder.
    pub async fn status(&self, id: &MatchId) -> MatchSnapshot {
        let record = match self.registry.get(id).await {
            Some(record) => record,
            None => {
                tracing::warn!(match_id = %id, "Status requested for unknown match");
                return self.rules.pending(self.registry.now());
            }
        };

        if self.policy == StatusPolicy::Fresh && !record.is_concluded() {
            return match self.refresh(id).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(match_id = %id, "Fresh status unavailable: {}", e);
                    self.rules.pending(self.registry.now())
                }
            };
        }

        record
            .last_snapshot
            .unwrap_or_else(|| self.rules.pending(self.registry.now()))
    }

    pub async fn lookup(&self, id: &MatchId) -> Result<MatchRecord> {
        self.registry.get(id).await.ok_or_else(|| AppError::NotFound {
            resource: format!("match {}", id),
        })
    }

    pub async fn list(&self) -> Vec<MatchRecord> {
        self.registry.list().await
    }

    pub async fn unregister(&self, id: &MatchId) -> Result<MatchRecord> {
        let record = self.registry.remove(id).await.ok_or_else(|| AppError::NotFound {
            resource: format!("match {}", id),
        })?;
        tracing::info!(match_id = %id, "Unregistered match");
        Ok(record)
    }

    /// Runs a cycle for `id` unless one is already in flight, in which case
    /// the caller waits for it and shares its result.
    pub async fn refresh(&self, id: &MatchId) -> Result<MatchSnapshot> {
        self.refresh_inner(id, false)
            .await?
            .ok_or_else(|| AppError::Internal(format!("refresh of match {} was skipped", id)))
    }

    /// Like [`refresh`](Self::refresh), but leaves a match alone if it turned
    /// out concluded by the time its cycle lock was acquired. `Ok(None)` means skipped.
    async fn refresh_inner(
        &self,
        id: &MatchId,
        skip_concluded: bool,
    ) -> Result<Option<MatchSnapshot>> {
        let not_found = || AppError::NotFound {
            resource: format!("match {}", id),
        };

        let handle = self.registry.cycle_handle(id).await.ok_or_else(not_found)?;
        let _guard = handle.lock.lock().await;

        let record = self.registry.get(id).await.ok_or_else(not_found)?;
        let cycles = self.registry.cycles(id).await.ok_or_else(not_found)?;

        if cycles != handle.cycles {
            tracing::debug!(match_id = %id, "Joined in-flight refresh");
            if let Some(error) = record.last_error {
                return Err(AppError::Refresh(error));
            }
            return Ok(Some(
                record
                    .last_snapshot
                    .unwrap_or_else(|| self.rules.pending(self.registry.now())),
            ));
        }

        if skip_concluded && record.is_concluded() {
            return Ok(None);
        }

        self.run_cycle(id, &record.source_url, false).await.map(Some)
    }

    /// Refreshes every registered match once, one after another.
    pub async fn tick(&self) -> TickReport {
        let start_time = Instant::now();
        let mut report = TickReport::default();

        if let Some(ttl) = self.ttl {
            let expired = self
                .registry
                .prune_registered_before(self.registry.now() - ttl)
                .await;
            for id in &expired {
                tracing::info!(match_id = %id, "Dropped expired match");
            }
            report.pruned = expired.len();
        }

        for record in self.registry.list().await {
            if record.is_concluded() {
                report.skipped_concluded += 1;
                continue;
            }

            match self.refresh_inner(&record.id, true).await {
                Ok(Some(snapshot)) => {
                    tracing::info!(match_id = %record.id, status = %snapshot.status, "Match refreshed");
                    report.checked += 1;
                    report.refreshed += 1;
                }
                Ok(None) => {
                    report.skipped_concluded += 1;
                }
                Err(AppError::NotFound { .. }) => {
                    tracing::debug!(match_id = %record.id, "Match unregistered during firing");
                    report.checked += 1;
                }
                Err(e) => {
                    tracing::debug!(match_id = %record.id, "Refresh failed: {}", e);
                    report.checked += 1;
                    report.failed += 1;
                }
            }
        }

        report.total_time_ms = start_time.elapsed().as_millis() as u64;
        report
    }

    async fn run_cycle(
        &self,
        id: &MatchId,
        url: &str,
        placeholder_on_failure: bool,
    ) -> Result<MatchSnapshot> {
        match self.fetch_and_extract(url).await {
            Ok(data) => {
                let snapshot = self.rules.snapshot(data, self.registry.now());
                if !self.registry.record_success(id, snapshot.clone()).await {
                    tracing::debug!(match_id = %id, "Discarding snapshot for unregistered match");
                }
                Ok(snapshot)
            }
            Err(e) => {
                tracing::error!(match_id = %id, url = %url, "Fetch+Extract failed: {}", e);
                let placeholder = placeholder_on_failure.then(|| self.rules.pending(self.registry.now()));
                self.registry.record_failure(id, e.to_string(), placeholder).await;
                Err(e)
            }
        }
    }

    async fn fetch_and_extract(&self, url: &str) -> Result<MatchData> {
        let page = self.fetcher.fetch(url).await?;
        tracing::debug!(
            url = %url,
            final_url = %page.final_url,
            response_time_ms = page.response_time_ms,
            "Page loaded"
        );
        self.extractor.extract(&page.html)
    }
}
