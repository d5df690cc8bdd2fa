//! Quiz session state machine.
//!
//! A session owns the selected bank, the persisted used-items mapping and at
//! most one batch. Drawing is sampling without replacement against the union
//! of the persisted record and the names marked since the bank was selected,
//! so an item never repeats until its history is cleared.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use uuid::Uuid;

use crate::error::{SessionError, StoreError};
use crate::model::{Bank, Entry};
use crate::report::{BankStats, QuizResult};
use crate::traits::{UsedItems, UsedItemsStore};

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    NoBank,
    BankSelected,
    /// A batch exists and no item is live.
    Drawing,
    /// An item is live and waiting for a mark.
    InProgress,
    Finished,
}

#[derive(Debug)]
struct QuizBatch {
    id: Uuid,
    started_at: DateTime<Utc>,
    clock: Instant,
    queue: VecDeque<String>,
    total: usize,
    current_index: usize,
    current: Option<String>,
    correct: Vec<String>,
    wrong: Vec<String>,
    /// Names marked in this batch and not yet written to the store.
    marked: HashSet<String>,
    elapsed_ms: u64,
    finished: bool,
}

/// Drives one user's quiz over a single selected bank.
pub struct QuizSession {
    store: Arc<dyn UsedItemsStore>,
    persisted: UsedItems,
    bank: Option<Arc<Bank>>,
    transient_used: HashSet<String>,
    batch: Option<QuizBatch>,
    rng: StdRng,
}

impl QuizSession {
    /// Create a session, loading the persisted record from `store`.
    pub fn new(store: Arc<dyn UsedItemsStore>) -> Self {
        Self::with_rng(store, StdRng::from_os_rng())
    }

    /// Create a session with a deterministic draw order.
    pub fn with_seed(store: Arc<dyn UsedItemsStore>, seed: u64) -> Self {
        Self::with_rng(store, StdRng::seed_from_u64(seed))
    }

    fn with_rng(store: Arc<dyn UsedItemsStore>, rng: StdRng) -> Self {
        let persisted = store.load();
        Self {
            store,
            persisted,
            bank: None,
            transient_used: HashSet::new(),
            batch: None,
            rng,
        }
    }

    pub fn state(&self) -> SessionState {
        match (&self.bank, &self.batch) {
            (None, _) => SessionState::NoBank,
            (Some(_), None) => SessionState::BankSelected,
            (Some(_), Some(batch)) if batch.finished => SessionState::Finished,
            (Some(_), Some(batch)) if batch.current.is_some() => SessionState::InProgress,
            (Some(_), Some(_)) => SessionState::Drawing,
        }
    }

    pub fn bank(&self) -> Option<&Arc<Bank>> {
        self.bank.as_ref()
    }

    /// The persisted mapping as last loaded or saved.
    pub fn persisted(&self) -> &UsedItems {
        &self.persisted
    }

    /// Select a bank. Any batch, saved or not, is discarded.
    pub fn set_bank(&mut self, bank: Arc<Bank>) {
        tracing::debug!(bank = %bank.key, "bank selected");
        self.bank = Some(bank);
        self.batch = None;
        self.transient_used.clear();
    }

    /// Draw up to `quantity` unused names and start the clock.
    ///
    /// Returns the number of names actually drawn. On failure the session
    /// is left untouched. Unsaved marks of a previous batch carry over to
    /// the new one.
    pub fn start_quiz(&mut self, quantity: usize) -> Result<usize, SessionError> {
        let bank = self.bank.clone().ok_or(SessionError::NoBankSelected)?;
        if quantity == 0 {
            return Err(SessionError::InvalidQuantity);
        }

        let used = self.effective_used(&bank.key);
        let mut remaining: Vec<String> = bank
            .remaining_items(&used)
            .into_iter()
            .map(str::to_string)
            .collect();
        if remaining.is_empty() {
            return Err(SessionError::NoRemainingItems);
        }

        remaining.shuffle(&mut self.rng);
        remaining.truncate(quantity);
        let total = remaining.len();

        let carried = self
            .batch
            .take()
            .map(|previous| previous.marked)
            .unwrap_or_default();

        let batch = QuizBatch {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            clock: Instant::now(),
            queue: remaining.into(),
            total,
            current_index: 0,
            current: None,
            correct: Vec::new(),
            wrong: Vec::new(),
            marked: carried,
            elapsed_ms: 0,
            finished: false,
        };
        tracing::info!(bank = %bank.key, batch = %batch.id, total, "quiz started");
        self.batch = Some(batch);
        Ok(total)
    }

    /// Make the next drawn name live. `None` once the queue is exhausted.
    pub fn next_item(&mut self) -> Option<String> {
        let batch = self.batch.as_mut()?;
        match batch.queue.pop_front() {
            Some(name) => {
                batch.current_index += 1;
                batch.current = Some(name.clone());
                Some(name)
            }
            None => {
                batch.current = None;
                None
            }
        }
    }

    pub fn mark_correct(&mut self) -> Result<(), SessionError> {
        let name = self.take_live()?;
        if let Some(batch) = self.batch.as_mut() {
            batch.correct.push(name);
        }
        Ok(())
    }

    pub fn mark_wrong(&mut self) -> Result<(), SessionError> {
        let name = self.take_live()?;
        if let Some(batch) = self.batch.as_mut() {
            batch.wrong.push(name);
        }
        Ok(())
    }

    /// Clear the live item and record it as used.
    fn take_live(&mut self) -> Result<String, SessionError> {
        let batch = self.batch.as_mut().ok_or(SessionError::NoLiveItem)?;
        let name = batch.current.take().ok_or(SessionError::NoLiveItem)?;
        batch.marked.insert(name.clone());
        self.transient_used.insert(name.clone());
        Ok(name)
    }

    /// Stop the clock. Calling it again keeps the first elapsed value.
    pub fn finish_quiz(&mut self) -> Result<(), SessionError> {
        let batch = self.batch.as_mut().ok_or(SessionError::NoBatch)?;
        if !batch.finished {
            batch.elapsed_ms = batch.clock.elapsed().as_millis() as u64;
            batch.finished = true;
            tracing::info!(
                batch = %batch.id,
                correct = batch.correct.len(),
                wrong = batch.wrong.len(),
                "quiz finished"
            );
        }
        Ok(())
    }

    /// Merge the batch's marked names into the persisted record and write it.
    ///
    /// Does nothing when no bank is selected or nothing is pending.
    pub fn save_progress(&mut self) -> Result<(), StoreError> {
        let (Some(bank), Some(batch)) = (self.bank.as_ref(), self.batch.as_mut()) else {
            return Ok(());
        };
        if batch.marked.is_empty() {
            return Ok(());
        }

        let mut updated = self.persisted.clone();
        updated
            .entry(bank.key.clone())
            .or_default()
            .extend(batch.marked.iter().cloned());
        self.store.save(&updated)?;

        tracing::info!(bank = %bank.key, saved = batch.marked.len(), "progress saved");
        self.persisted = updated;
        batch.marked.clear();
        Ok(())
    }

    /// Forget every drawn name of `bank_key`, including unsaved marks when it
    /// is the selected bank, and persist.
    pub fn clear_used_items(&mut self, bank_key: &str) -> Result<(), StoreError> {
        let mut updated = self.persisted.clone();
        if let Some(names) = updated.get_mut(bank_key) {
            names.clear();
        }
        self.store.save(&updated)?;
        self.persisted = updated;

        if self.bank.as_ref().is_some_and(|b| b.key == bank_key) {
            self.transient_used.clear();
            if let Some(batch) = self.batch.as_mut() {
                batch.marked.clear();
            }
        }
        tracing::info!(bank = %bank_key, "used items cleared");
        Ok(())
    }

    /// Persisted names of `bank_key`, plus this session's marks when it is
    /// the selected bank.
    fn effective_used(&self, bank_key: &str) -> HashSet<String> {
        let mut used: HashSet<String> = self
            .persisted
            .get(bank_key)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default();
        if self.bank.as_ref().is_some_and(|b| b.key == bank_key) {
            used.extend(self.transient_used.iter().cloned());
        }
        used
    }

    /// Entries of `bank` that can still be drawn. Stale names are ignored.
    pub fn remaining_count(&self, bank: &Bank) -> usize {
        bank.remaining_items(&self.effective_used(&bank.key)).len()
    }

    pub fn bank_stats(&self, bank: &Bank) -> BankStats {
        let (current_index, batch_total, correct, wrong) = match &self.batch {
            Some(b) => (b.current_index, b.total, b.correct.len(), b.wrong.len()),
            None => (0, 0, 0, 0),
        };
        BankStats {
            bank_name: bank.display_name.clone(),
            total: bank.total_count(),
            remaining: self.remaining_count(bank),
            current_index,
            batch_total,
            correct,
            wrong,
        }
    }

    pub fn quiz_result(&self) -> Result<QuizResult, SessionError> {
        let batch = self.batch.as_ref().ok_or(SessionError::NoBatch)?;
        Ok(QuizResult {
            batch_id: batch.id,
            started_at: batch.started_at,
            bank_name: self
                .bank
                .as_ref()
                .map(|b| b.display_name.clone())
                .unwrap_or_default(),
            total: batch.total,
            correct: batch.correct.len(),
            wrong: batch.wrong.len(),
            elapsed_ms: batch.elapsed_ms,
            wrong_items: batch.wrong.clone(),
        })
    }

    /// Entries marked wrong in this batch, in marking order.
    pub fn wrong_item_details(&self) -> Vec<&Entry> {
        let (Some(bank), Some(batch)) = (&self.bank, &self.batch) else {
            return Vec::new();
        };
        batch
            .wrong
            .iter()
            .filter_map(|name| bank.entry(name))
            .collect()
    }

    pub fn current_item(&self) -> Option<&str> {
        self.batch.as_ref()?.current.as_deref()
    }

    pub fn current_item_detail(&self) -> Option<&Entry> {
        let name = self.current_item()?;
        self.bank.as_ref()?.entry(name)
    }

    /// `(current 1-based index, batch total)`.
    pub fn progress(&self) -> (usize, usize) {
        self.batch
            .as_ref()
            .map_or((0, 0), |b| (b.current_index, b.total))
    }

    /// Whether the batch has no queued and no live item.
    pub fn is_exhausted(&self) -> bool {
        self.batch
            .as_ref()
            .is_some_and(|b| b.queue.is_empty() && b.current.is_none())
    }

    /// Whether any marks are waiting for `save_progress`.
    pub fn has_unsaved_marks(&self) -> bool {
        self.batch.as_ref().is_some_and(|b| !b.marked.is_empty())
    }
}
