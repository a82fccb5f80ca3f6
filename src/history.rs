//! History ledger: saved jobs, most recently completed first.
//!
//! Entries are whole-value snapshots keyed by job id. The full list is
//! written to the record store after every mutation and read once when the
//! ledger is opened.

use std::sync::{Mutex, MutexGuard};

use crate::job::TranscriptionJob;
use crate::store::{RecordStore, HISTORY_RECORD};

#[derive(Debug)]
pub struct HistoryLedger {
    entries: Mutex<Vec<TranscriptionJob>>,
    store: Option<RecordStore>,
}

impl HistoryLedger {
    /// A ledger that is never persisted.
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            store: None,
        }
    }

    /// Open the ledger backed by `store`. A missing or unreadable record
    /// starts an empty ledger.
    pub fn open(store: RecordStore) -> Self {
        let mut entries: Vec<TranscriptionJob> =
            store.load_or_absent(HISTORY_RECORD).unwrap_or_default();
        dedup_by_id(&mut entries);
        tracing::debug!("Loaded {} history entries", entries.len());
        Self {
            entries: Mutex::new(entries),
            store: Some(store),
        }
    }

    /// Insert at the front. Returns false (and leaves the ledger unchanged)
    /// if an entry with the same id already exists.
    pub fn append(&self, job: TranscriptionJob) -> bool {
        let mut entries = self.lock();
        if entries.iter().any(|j| j.id() == job.id()) {
            tracing::error!(job_id = %job.id(), "Refusing duplicate history entry");
            return false;
        }
        tracing::info!(job_id = %job.id(), "Saved job to history");
        entries.insert(0, job);
        self.persist(&entries);
        true
    }

    /// Replace the entry for `job_id` with `mutate(entry)`, in place.
    /// Returns false if no such entry exists.
    pub fn sync_update<F>(&self, job_id: &str, mutate: F) -> bool
    where
        F: FnOnce(&TranscriptionJob) -> TranscriptionJob,
    {
        let mut entries = self.lock();
        let Some(index) = entries.iter().position(|j| j.id() == job_id) else {
            return false;
        };
        let updated = mutate(&entries[index]);
        if updated.id() != job_id {
            tracing::error!(job_id, new_id = %updated.id(), "History update changed the job id, ignoring");
            return false;
        }
        entries[index] = updated;
        self.persist(&entries);
        true
    }

    /// Delete the entry for `job_id`. Returns false if absent.
    pub fn remove(&self, job_id: &str) -> bool {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|j| j.id() != job_id);
        if entries.len() == before {
            return false;
        }
        tracing::info!(job_id, "Removed job from history");
        self.persist(&entries);
        true
    }

    /// Snapshot of all entries, most recent first.
    pub fn list(&self) -> Vec<TranscriptionJob> {
        self.lock().clone()
    }

    pub fn get(&self, job_id: &str) -> Option<TranscriptionJob> {
        self.lock().iter().find(|j| j.id() == job_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TranscriptionJob>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, entries: &[TranscriptionJob]) {
        if let Some(store) = &self.store {
            if let Err(e) = store.save(HISTORY_RECORD, entries) {
                tracing::error!("Failed to save history: {:#}", e);
            }
        }
    }
}

// A hand-edited record could carry the same id twice; keep the first (newest).
fn dedup_by_id(entries: &mut Vec<TranscriptionJob>) {
    let mut seen = std::collections::HashSet::new();
    entries.retain(|j| seen.insert(j.id().to_string()));
}
