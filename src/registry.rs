use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::models::{generate_id, MatchId, MatchRecord, MatchSnapshot};
use crate::utils::error::{AppError, Result};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> MatchId;
}

/// UUIDv7 ids: unique and ordered by creation time.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeOrderedIds;

impl IdGenerator for TimeOrderedIds {
    fn next_id(&self) -> MatchId {
        generate_id()
    }
}

/// `prefix-1`, `prefix-2`, ... Deterministic ids for tests and fixtures.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> MatchId {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        MatchId::new(format!("{}-{}", self.prefix, n))
    }
}

/// Per-match guard handed to whoever runs a refresh cycle.
#[derive(Clone)]
pub struct CycleHandle {
    pub lock: Arc<Mutex<()>>,
    /// Completed cycles at the time the handle was taken.
    pub cycles: u64,
}

struct RegistryEntry {
    record: MatchRecord,
    refresh_lock: Arc<Mutex<()>>,
    cycles: u64,
}

/// A freshly created record whose first cycle lock is already held. Nobody
/// else can run a cycle for it until `first_cycle` is dropped.
pub struct NewRegistration {
    pub record: MatchRecord,
    pub first_cycle: OwnedMutexGuard<()>,
}

/// In-memory table of tracked matches.
pub struct MatchRegistry {
    entries: RwLock<HashMap<MatchId, RegistryEntry>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl MatchRegistry {
    pub fn new() -> Self {
        Self::with_sources(Arc::new(SystemClock), Arc::new(TimeOrderedIds))
    }

    pub fn with_sources(clock: Arc<dyn Clock>, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            ids,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Creates a new record. The same URL registered twice gets two records.
    ///
    /// The record becomes visible with its cycle lock already taken, so a
    /// concurrent firing waits for the caller's first cycle and reuses it.
    pub async fn register(&self, source_url: String) -> Result<NewRegistration> {
        let id = self.ids.next_id();
        let record = MatchRecord::new(id.clone(), source_url, self.clock.now());
        let refresh_lock = Arc::new(Mutex::new(()));
        let first_cycle = Arc::clone(&refresh_lock).lock_owned().await;

        let mut entries = self.entries.write().await;
        if entries.contains_key(&id) {
            return Err(AppError::IdCollision { id: id.to_string() });
        }
        entries.insert(
            id,
            RegistryEntry {
                record: record.clone(),
                refresh_lock,
                cycles: 0,
            },
        );

        Ok(NewRegistration {
            record,
            first_cycle,
        })
    }

    pub async fn get(&self, id: &MatchId) -> Option<MatchRecord> {
        let entries = self.entries.read().await;
        entries.get(id).map(|entry| entry.record.clone())
    }

    pub async fn contains(&self, id: &MatchId) -> bool {
        self.entries.read().await.contains_key(id)
    }

    /// All records, oldest registration first.
    pub async fn list(&self) -> Vec<MatchRecord> {
        let entries = self.entries.read().await;
        let mut records: Vec<MatchRecord> =
            entries.values().map(|entry| entry.record.clone()).collect();
        records.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        records
    }

    pub async fn ids(&self) -> Vec<MatchId> {
        self.list().await.into_iter().map(|record| record.id).collect()
    }

    pub async fn cycle_handle(&self, id: &MatchId) -> Option<CycleHandle> {
        let entries = self.entries.read().await;
        entries.get(id).map(|entry| CycleHandle {
            lock: Arc::clone(&entry.refresh_lock),
            cycles: entry.cycles,
        })
    }

    pub async fn cycles(&self, id: &MatchId) -> Option<u64> {
        self.entries.read().await.get(id).map(|entry| entry.cycles)
    }

    /// Replaces the snapshot wholesale. Returns `false` if the match was
    /// unregistered while the cycle ran.
    pub async fn record_success(&self, id: &MatchId, snapshot: MatchSnapshot) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(id) {
            Some(entry) => {
                entry.record.last_snapshot = Some(snapshot);
                entry.record.refresh_count += 1;
                entry.record.last_error = None;
                entry.cycles += 1;
                true
            }
            None => false,
        }
    }

    /// Records a failed cycle. The stored snapshot only changes when a
    /// `placeholder` is given and nothing was stored yet.
    pub async fn record_failure(
        &self,
        id: &MatchId,
        error: String,
        placeholder: Option<MatchSnapshot>,
    ) -> bool {
        let mut entries = self.entries.write().await;
        match entries.get_mut(id) {
            Some(entry) => {
                if entry.record.last_snapshot.is_none() {
                    entry.record.last_snapshot = placeholder;
                }
                entry.record.failure_count += 1;
                entry.record.last_error = Some(error);
                entry.cycles += 1;
                true
            }
            None => false,
        }
    }

    pub async fn remove(&self, id: &MatchId) -> Option<MatchRecord> {
        self.entries.write().await.remove(id).map(|entry| entry.record)
    }

    /// Drops every record registered before `cutoff`.
    pub async fn prune_registered_before(&self, cutoff: DateTime<Utc>) -> Vec<MatchId> {
        let mut entries = self.entries.write().await;
        let expired: Vec<MatchId> = entries
            .values()
            .filter(|entry| entry.record.registered_at < cutoff)
            .map(|entry| entry.record.id.clone())
            .collect();

        for id in &expired {
            entries.remove(id);
        }
        expired
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for MatchRegistry {
    fn default() -> Self {
        Self::new()
    }
}
