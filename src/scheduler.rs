use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_cron_scheduler::{Job, JobScheduler};
use uuid::Uuid;

use crate::config::SchedulerConfig;
use crate::tracker::{MatchTracker, TickReport};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SchedulerStats {
    pub firings: u64,
    pub skipped_firings: u64,
    pub matches_refreshed: u64,
    pub failed_refreshes: u64,
    pub matches_pruned: u64,
    pub last_firing: Option<DateTime<Utc>>,
    pub last_report: Option<TickReport>,
    pub uptime_seconds: u64,
}

/// Fires on `refresh_cron` and refreshes every registered match.
///
/// Matches within a firing are refreshed one at a time. A firing that starts
/// while the previous one is still running is skipped.
pub struct MatchScheduler {
    scheduler: JobScheduler,
    tracker: Arc<MatchTracker>,
    config: SchedulerConfig,
    firing: Arc<AtomicBool>,
    stats: Arc<RwLock<SchedulerStats>>,
    job_id: Option<Uuid>,
    start_time: DateTime<Utc>,
}

impl MatchScheduler {
    pub async fn new(tracker: Arc<MatchTracker>, config: SchedulerConfig) -> Result<Self> {
        let scheduler = JobScheduler::new().await?;

        Ok(Self {
            scheduler,
            tracker,
            config,
            firing: Arc::new(AtomicBool::new(false)),
            stats: Arc::new(RwLock::new(SchedulerStats::default())),
            job_id: None,
            start_time: Utc::now(),
        })
    }

    pub async fn start(&mut self) -> Result<()> {
        if !self.config.enabled {
            tracing::warn!("Match scheduler disabled by configuration");
            return Ok(());
        }

        let tracker = Arc::clone(&self.tracker);
        let firing = Arc::clone(&self.firing);
        let stats = Arc::clone(&self.stats);

        let job = Job::new_async(self.config.refresh_cron.as_str(), move |_uuid, _l| {
            let tracker = Arc::clone(&tracker);
            let firing = Arc::clone(&firing);
            let stats = Arc::clone(&stats);

            Box::pin(async move {
                Self::execute_firing(tracker, firing, stats).await;
            })
        })?;

        self.job_id = Some(self.scheduler.add(job).await?);
        self.scheduler.start().await?;

        tracing::info!("Match scheduler started with cron: {}", self.config.refresh_cron);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        if let Some(job_id) = self.job_id.take() {
            self.scheduler.remove(&job_id).await?;
        }
        self.scheduler.shutdown().await?;
        tracing::info!("Match scheduler shutdown");
        Ok(())
    }

    /// Runs one firing immediately, outside of the cron schedule.
    pub async fn run_now(&self) -> Option<TickReport> {
        Self::execute_firing(
            Arc::clone(&self.tracker),
            Arc::clone(&self.firing),
            Arc::clone(&self.stats),
        )
        .await
    }

    pub fn is_firing(&self) -> bool {
        self.firing.load(Ordering::Acquire)
    }

    pub async fn get_stats(&self) -> SchedulerStats {
        let mut stats = self.stats.read().await.clone();
        let uptime = Utc::now().signed_duration_since(self.start_time);
        stats.uptime_seconds = uptime.num_seconds().max(0) as u64;
        stats
    }

    async fn execute_firing(
        tracker: Arc<MatchTracker>,
        firing: Arc<AtomicBool>,
        stats: Arc<RwLock<SchedulerStats>>,
    ) -> Option<TickReport> {
        let Some(_guard) = FiringGuard::acquire(&firing) else {
            tracing::warn!("Previous firing still running, skipping this one");
            stats.write().await.skipped_firings += 1;
            return None;
        };

        tracing::debug!("Starting scheduled refresh of all matches");
        let report = tracker.tick().await;
        tracing::info!(
            checked = report.checked,
            refreshed = report.refreshed,
            failed = report.failed,
            skipped_concluded = report.skipped_concluded,
            pruned = report.pruned,
            total_time_ms = report.total_time_ms,
            "Firing complete"
        );

        let mut stats = stats.write().await;
        stats.firings += 1;
        stats.matches_refreshed += report.refreshed as u64;
        stats.failed_refreshes += report.failed as u64;
        stats.matches_pruned += report.pruned as u64;
        stats.last_firing = Some(Utc::now());
        stats.last_report = Some(report.clone());

        Some(report)
    }
}

/// Holds the firing flag for the duration of one firing.
struct FiringGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> FiringGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for FiringGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}
