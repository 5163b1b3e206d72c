use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::ai::ChartImage;
use crate::clock::{Clock, SystemClock};
use crate::journal::stats::JournalStats;
use crate::journal::thumbnail::Thumbnailer;
use crate::models::{AnalysisRecord, JournalEntry, Outcome, TradeMode};
use crate::storage::{KeyValueStore, StorageError};

/// Key the whole journal is stored under, as one JSON array.
pub const JOURNAL_KEY: &str = "chart_journal_entries";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalConfig {
    /// Oldest entries are evicted past this many.
    pub capacity: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self { capacity: 50 }
    }
}

/// Newest-first log of saved analyses on top of a key-value store.
///
/// Every mutating call reads the full list, changes it and writes it back.
/// A failed write leaves the previously stored list untouched.
pub struct JournalStore<S: KeyValueStore> {
    storage: S,
    config: JournalConfig,
    thumbnailer: Thumbnailer,
    clock: Arc<dyn Clock>,
}

impl<S: KeyValueStore> JournalStore<S> {
    pub fn new(storage: S, config: JournalConfig, thumbnailer: Thumbnailer) -> Self {
        Self {
            storage,
            config: JournalConfig {
                capacity: config.capacity.max(1),
            },
            thumbnailer,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// All entries, newest first. Missing or corrupt storage reads as empty.
    pub fn list_entries(&self) -> Vec<JournalEntry> {
        let Some(raw) = self.storage.read(JOURNAL_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<JournalEntry>>(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Journal storage is unreadable, treating as empty: {}", e);
                Vec::new()
            }
        }
    }

    pub fn find_entry(&self, id: &str) -> Option<JournalEntry> {
        self.list_entries().into_iter().find(|e| e.id == id)
    }

    /// Save a finished analysis. Never fails the caller: storage problems are
    /// logged and the write is dropped. Returns the new id when it was stored.
    pub async fn add_entry(
        &self,
        mode: TradeMode,
        image: &ChartImage,
        analysis: &AnalysisRecord,
        pair: Option<&str>,
        is_confluence: bool,
    ) -> Option<String> {
        let thumbnail = self
            .thumbnailer
            .thumbnail_blocking(image.bytes.clone())
            .await
            .into_data_url();

        let entry = JournalEntry {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: self.clock.now(),
            mode,
            thumbnail,
            image_file_name: image.file_name.clone(),
            decision: analysis.decision,
            confidence: analysis.confidence_score,
            analysis: analysis.clone(),
            outcome: Outcome::Pending,
            outcome_updated_at: None,
            pair: normalize_pair(pair),
            notes: None,
            pnl: None,
            is_confluence,
        };
        let id = entry.id.clone();

        let mut entries = self.list_entries();
        entries.insert(0, entry);
        if entries.len() > self.config.capacity {
            let evicted = entries.len() - self.config.capacity;
            entries.truncate(self.config.capacity);
            info!("Journal at capacity, evicted {} oldest entr(ies)", evicted);
        }

        if self.persist_with_fallback(entries) {
            debug!("Saved journal entry {}", id);
            Some(id)
        } else {
            None
        }
    }

    /// Set the outcome of an entry. `notes`/`pnl` are only overwritten when given.
    /// Returns false when the id is unknown, `pnl` is not finite or the write fails.
    pub fn update_outcome(
        &self,
        id: &str,
        outcome: Outcome,
        notes: Option<&str>,
        pnl: Option<f64>,
    ) -> bool {
        if pnl.is_some_and(|p| !p.is_finite()) {
            warn!("Rejecting non-finite pnl for journal entry {}", id);
            return false;
        }
        let now = self.clock.now();
        self.modify_entry(id, |entry| {
            entry.outcome = outcome;
            entry.outcome_updated_at = Some(now);
            if let Some(notes) = notes {
                entry.notes = Some(notes.to_string());
            }
            if let Some(pnl) = pnl {
                entry.pnl = Some(pnl);
            }
        })
    }

    /// Set or clear (empty string) the instrument of an entry.
    pub fn update_pair(&self, id: &str, pair: &str) -> bool {
        let pair = normalize_pair(Some(pair));
        self.modify_entry(id, |entry| entry.pair = pair)
    }

    /// Remove an entry. Unknown ids are ignored.
    pub fn delete_entry(&self, id: &str) {
        let mut entries = self.list_entries();
        let before = entries.len();
        entries.retain(|e| e.id != id);
        if entries.len() == before {
            return;
        }
        if let Err(e) = self.persist(&entries) {
            error!("Failed to delete journal entry {}: {}", id, e);
        }
    }

    pub fn clear_all(&self) {
        self.storage.remove(JOURNAL_KEY);
        info!("Journal cleared");
    }

    pub fn compute_stats(&self) -> JournalStats {
        JournalStats::from_entries(&self.list_entries())
    }

    fn modify_entry(&self, id: &str, change: impl FnOnce(&mut JournalEntry)) -> bool {
        let mut entries = self.list_entries();
        let Some(entry) = entries.iter_mut().find(|e| e.id == id) else {
            debug!("Journal entry {} not found", id);
            return false;
        };
        change(entry);
        match self.persist(&entries) {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to update journal entry {}: {}", id, e);
                false
            }
        }
    }

    fn persist(&self, entries: &[JournalEntry]) -> Result<(), StorageError> {
        let raw = serde_json::to_string(entries)?;
        self.storage.write(JOURNAL_KEY, &raw)
    }

    /// Write `entries` (new entry first). On quota errors, drop the oldest
    /// entry and retry, then drop the new entry's thumbnail and retry.
    fn persist_with_fallback(&self, mut entries: Vec<JournalEntry>) -> bool {
        let err = match self.persist(&entries) {
            Ok(()) => return true,
            Err(e) => e,
        };
        if !err.is_quota_exceeded() {
            error!("Failed to save journal entry: {}", err);
            return false;
        }

        if entries.len() > 1 {
            if let Some(dropped) = entries.pop() {
                warn!("{}; dropping oldest journal entry {}", err, dropped.id);
            }
            let err = match self.persist(&entries) {
                Ok(()) => return true,
                Err(e) => e,
            };
            if !err.is_quota_exceeded() {
                error!("Failed to save journal entry: {}", err);
                return false;
            }
        }

        let Some(newest) = entries.first_mut() else {
            return false;
        };
        warn!("Journal storage still full; saving new entry without thumbnail");
        newest.thumbnail.clear();
        match self.persist(&entries) {
            Ok(()) => true,
            Err(e) => {
                error!("Giving up on journal write: {}", e);
                false
            }
        }
    }
}

fn normalize_pair(pair: Option<&str>) -> Option<String> {
    pair.map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_uppercase)
}
