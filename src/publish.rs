//! Site publishing index updates
//!
//! The workload the CLI drives through the event queue: content items are
//! added to or removed from a site's search index in batches.

use anyhow::{bail, Result};
use log::{debug, info};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crate::queue::BatchProcessor;

/// What to do with a content item in the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexAction {
    Add,
    Remove,
}

/// A single queued index change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexUpdate {
    pub content_id: u64,
    pub action: IndexAction,
}

impl IndexUpdate {
    pub fn add(content_id: u64) -> Self {
        Self { content_id, action: IndexAction::Add }
    }

    pub fn remove(content_id: u64) -> Self {
        Self { content_id, action: IndexAction::Remove }
    }
}

/// Summary of the index once processing finished
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    /// Documents currently indexed
    pub documents: usize,
    pub updates_applied: u64,
    pub batches: usize,
    pub largest_batch: usize,
    pub rejected_batches: u64,
}

#[derive(Debug, Default)]
struct IndexState {
    /// content id -> revision (number of times it was added)
    documents: BTreeMap<u64, u32>,
    updates_applied: u64,
    batch_sizes: Vec<usize>,
    rejected_batches: u64,
}

/// In-memory search index fed by queued [`IndexUpdate`] batches
#[derive(Debug, Default)]
pub struct SearchIndex {
    state: Mutex<IndexState>,
    apply_delay: Duration,
    open: AtomicBool,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a slow index writer by sleeping per batch
    pub fn with_apply_delay(delay: Duration) -> Self {
        Self {
            apply_delay: delay,
            ..Self::default()
        }
    }

    pub fn contains(&self, content_id: u64) -> bool {
        self.state.lock().documents.contains_key(&content_id)
    }

    pub fn revision(&self, content_id: u64) -> Option<u32> {
        self.state.lock().documents.get(&content_id).copied()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn summary(&self) -> IndexSummary {
        let state = self.state.lock();
        IndexSummary {
            documents: state.documents.len(),
            updates_applied: state.updates_applied,
            batches: state.batch_sizes.len(),
            largest_batch: state.batch_sizes.iter().copied().max().unwrap_or(0),
            rejected_batches: state.rejected_batches,
        }
    }
}

impl BatchProcessor<IndexUpdate> for SearchIndex {
    fn prepare(&self) -> Result<()> {
        self.open.store(true, Ordering::Release);
        debug!("Search index opened");
        Ok(())
    }

    /// Apply a batch atomically: a batch containing an invalid update is rejected whole
    fn process_batch(&self, batch: Vec<IndexUpdate>) -> Result<()> {
        if let Some(invalid) = batch.iter().find(|update| update.content_id == 0) {
            self.state.lock().rejected_batches += 1;
            bail!("invalid content id {} in batch of {}", invalid.content_id, batch.len());
        }

        if !self.apply_delay.is_zero() {
            thread::sleep(self.apply_delay);
        }

        let mut state = self.state.lock();
        for update in &batch {
            match update.action {
                IndexAction::Add => {
                    *state.documents.entry(update.content_id).or_insert(0) += 1;
                }
                IndexAction::Remove => {
                    state.documents.remove(&update.content_id);
                }
            }
        }
        state.updates_applied += batch.len() as u64;
        state.batch_sizes.push(batch.len());
        debug!("Applied {} index updates", batch.len());
        Ok(())
    }

    fn finish(&self) {
        self.open.store(false, Ordering::Release);
        let summary = self.summary();
        info!(
            "Search index closed: {} documents after {} updates",
            summary.documents, summary.updates_applied
        );
    }
}
