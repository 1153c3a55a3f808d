//! Discovery engine.
//!
//! Hands out random batches of bookmarks the user has not been shown in the
//! current cycle. Once every eligible bookmark has been shown the history is
//! reset and a new cycle begins.
//!
//! # Locking
//!
//! The ledger sits behind a [`RwLock`]. Selection and progress take the read
//! lock. Commits, removals and resets take the write lock, so all persisted
//! writes are mutually exclusive. The exhaustion reset inside
//! [`DiscoveryEngine::select_batch`] re-checks the unseen set after taking the
//! write lock, so a commit racing with the reset is never lost or doubled.
//!
//! Selection does not mark anything as shown. Callers show the batch and then
//! [`commit`](DiscoveryEngine::commit) the identifiers the user actually saw.

use crate::models::{BookmarkId, BookmarkPredicate, BookmarkRef, EngineState, Progress, SelectionResult};
use crate::services::ShownSetLedger;
use crate::storage::traits::LedgerBackend;
use crate::{Error, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;
use tracing::instrument;

/// Random, non-repeating bookmark selection over a shown-set ledger.
#[derive(Debug)]
pub struct DiscoveryEngine {
    ledger: RwLock<ShownSetLedger>,
    rng: Mutex<StdRng>,
    state: Mutex<EngineState>,
    /// Eligible population seen by the most recent selection or progress call.
    last_eligible_total: AtomicUsize,
}

impl DiscoveryEngine {
    /// Creates an engine over an already loaded ledger.
    #[must_use]
    pub fn new(ledger: ShownSetLedger) -> Self {
        let last_eligible_total = ledger.state().total_at_last_observation;
        Self {
            ledger: RwLock::new(ledger),
            rng: Mutex::new(StdRng::from_rng(&mut rand::rng())),
            state: Mutex::new(EngineState::Cycling),
            last_eligible_total: AtomicUsize::new(last_eligible_total),
        }
    }

    /// Loads the ledger from `backend` and creates an engine over it.
    ///
    /// A corrupt ledger is replaced by an empty one; the load error is
    /// returned alongside the engine so the caller can report it.
    pub fn open(backend: Arc<dyn LedgerBackend>) -> (Self, Option<Error>) {
        let (ledger, recovered) = ShownSetLedger::load_or_recover(backend);
        (Self::new(ledger), recovered)
    }

    /// Replaces the random source with a seeded one for reproducible draws.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    /// Selects up to `count` unseen bookmarks from `pool`.
    ///
    /// Bookmarks failing `filter` are ignored. Duplicate identifiers in
    /// `pool` count once (first occurrence wins). When every eligible
    /// bookmark has already been shown the history is reset first and
    /// [`SelectionResult::cycle_completed`] is set.
    ///
    /// Nothing is marked as shown; call [`commit`](Self::commit) for that.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidArgument`] if `count` is zero. No state changes.
    /// - [`Error::Persistence`] if the exhaustion reset could not be saved.
    ///   The reset still applies in memory and the state is
    ///   [`EngineState::JustReset`] until [`acknowledge_reset`](Self::acknowledge_reset),
    ///   so the notice survives the failed call.
    #[instrument(skip(self, pool, filter), fields(pool_size = pool.len()))]
    pub fn select_batch<P>(
        &self,
        pool: &[BookmarkRef],
        filter: &P,
        count: usize,
    ) -> Result<SelectionResult>
    where
        P: BookmarkPredicate + ?Sized,
    {
        if count == 0 {
            return Err(Error::InvalidArgument(
                "batch size must be at least 1".to_string(),
            ));
        }

        let start = Instant::now();

        let eligible = eligible_set(pool, filter);
        self.last_eligible_total
            .store(eligible.len(), Ordering::SeqCst);

        if eligible.is_empty() {
            tracing::debug!("No eligible bookmarks");
            return Ok(SelectionResult::empty());
        }

        let mut unseen = {
            let ledger = self.read_ledger()?;
            unseen_of(&eligible, &ledger)
        };

        let mut cycle_completed = false;
        if unseen.is_empty() {
            let mut ledger = self.write_ledger()?;
            // A concurrent remove may have reopened part of the set.
            unseen = unseen_of(&eligible, &ledger);
            if unseen.is_empty() {
                let reset = ledger.reset(eligible.len());
                drop(ledger);

                self.set_state(EngineState::JustReset);
                metrics::counter!("discovery_cycles_completed_total").increment(1);
                tracing::info!(eligible = eligible.len(), "Completed a full discovery cycle");

                reset?;
                unseen.clone_from(&eligible);
                cycle_completed = true;
            }
        }

        let selected = self.draw(&unseen, count)?;

        metrics::counter!("discovery_selections_total").increment(1);
        metrics::histogram!("discovery_selection_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);
        tracing::debug!(
            selected = selected.len(),
            eligible = eligible.len(),
            unseen = unseen.len(),
            cycle_completed,
            "Selected discovery batch"
        );

        Ok(SelectionResult {
            selected,
            cycle_completed,
            eligible_count: eligible.len(),
            unseen_count: unseen.len(),
        })
    }

    /// Marks identifiers as shown. Returns how many were new.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the ledger could not be saved; the
    /// identifiers still count as shown for this session.
    #[instrument(skip(self, ids))]
    pub fn commit(&self, ids: impl IntoIterator<Item = BookmarkId>) -> Result<usize> {
        let added = self.write_ledger()?.mark_shown(ids)?;
        metrics::counter!("discovery_committed_total").increment(added as u64);
        Ok(added)
    }

    /// Forgets a bookmark that was deleted or merged away.
    ///
    /// Returns whether the bookmark had been shown in this cycle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the ledger could not be saved.
    #[instrument(skip(self), fields(id = %id))]
    pub fn on_bookmark_removed(&self, id: &BookmarkId) -> Result<bool> {
        self.write_ledger()?.remove(id)
    }

    /// Clears the shown history on user request.
    ///
    /// The watermark is set to the eligible population of the most recent
    /// selection or progress call.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Persistence`] if the ledger could not be saved.
    #[instrument(skip(self))]
    pub fn reset_history(&self) -> Result<()> {
        let total = self.last_eligible_total();
        let result = self.write_ledger()?.reset(total);
        self.set_state(EngineState::Cycling);
        result
    }

    /// Shown/total counters for the bookmarks in `pool` passing `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the ledger lock is poisoned.
    pub fn progress<P>(&self, pool: &[BookmarkRef], filter: &P) -> Result<Progress>
    where
        P: BookmarkPredicate + ?Sized,
    {
        let eligible = eligible_set(pool, filter);
        self.last_eligible_total
            .store(eligible.len(), Ordering::SeqCst);

        let ledger = self.read_ledger()?;
        Ok(ledger.progress(eligible.iter().map(|b| &b.id)))
    }

    /// Current engine state.
    ///
    /// [`EngineState::JustReset`] persists across selections until the
    /// caller acknowledges it or resets the history.
    #[must_use]
    pub fn state(&self) -> EngineState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clears a pending reset notice.
    pub fn acknowledge_reset(&self) {
        self.set_state(EngineState::Cycling);
    }

    /// Eligible population recorded by the most recent selection or progress
    /// call, or the stored watermark before the first call.
    #[must_use]
    pub fn last_eligible_total(&self) -> usize {
        self.last_eligible_total.load(Ordering::SeqCst)
    }

    /// Number of identifiers currently recorded as shown.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OperationFailed`] if the ledger lock is poisoned.
    pub fn shown_count(&self) -> Result<usize> {
        Ok(self.read_ledger()?.state().len())
    }

    fn draw(&self, unseen: &[&BookmarkRef], count: usize) -> Result<Vec<BookmarkRef>> {
        let amount = count.min(unseen.len());
        let mut rng = self.rng.lock().map_err(|_| Error::OperationFailed {
            operation: "select_batch".to_string(),
            cause: "random source lock poisoned".to_string(),
        })?;

        Ok(rand::seq::index::sample(&mut *rng, unseen.len(), amount)
            .into_iter()
            .map(|i| unseen[i].clone())
            .collect())
    }

    fn set_state(&self, state: EngineState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    fn read_ledger(&self) -> Result<RwLockReadGuard<'_, ShownSetLedger>> {
        self.ledger.read().map_err(|_| Error::OperationFailed {
            operation: "read_ledger".to_string(),
            cause: "ledger lock poisoned".to_string(),
        })
    }

    fn write_ledger(&self) -> Result<RwLockWriteGuard<'_, ShownSetLedger>> {
        self.ledger.write().map_err(|_| Error::OperationFailed {
            operation: "write_ledger".to_string(),
            cause: "ledger lock poisoned".to_string(),
        })
    }
}

/// Bookmarks passing `filter`, first occurrence per identifier, pool order.
fn eligible_set<'a, P>(pool: &'a [BookmarkRef], filter: &P) -> Vec<&'a BookmarkRef>
where
    P: BookmarkPredicate + ?Sized,
{
    let mut seen = HashSet::with_capacity(pool.len());
    pool.iter()
        .filter(|b| filter.matches(b))
        .filter(|b| seen.insert(&b.id))
        .collect()
}

fn unseen_of<'a>(eligible: &[&'a BookmarkRef], ledger: &ShownSetLedger) -> Vec<&'a BookmarkRef> {
    eligible
        .iter()
        .copied()
        .filter(|b| !ledger.contains(&b.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookmarkFilter;
    use crate::storage::MemoryLedgerBackend;

    fn pool(ids: &[&str]) -> Vec<BookmarkRef> {
        ids.iter()
            .map(|id| BookmarkRef::new(*id, format!("https://{id}.example"), id.to_uppercase()))
            .collect()
    }

    fn engine() -> (DiscoveryEngine, Arc<MemoryLedgerBackend>) {
        let backend = Arc::new(MemoryLedgerBackend::new());
        let ledger = ShownSetLedger::empty(backend.clone());
        (DiscoveryEngine::new(ledger).with_seed(7), backend)
    }

    fn ids_of(result: &SelectionResult) -> Vec<BookmarkId> {
        result.selected.iter().map(|b| b.id.clone()).collect()
    }

    #[test]
    fn test_zero_count_rejected_without_state_change() {
        let (engine, backend) = engine();
        let err = engine
            .select_batch(&pool(&["a"]), &BookmarkFilter::new(), 0)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert_eq!(backend.save_count(), 0);
        assert_eq!(engine.last_eligible_total(), 0);
    }

    #[test]
    fn test_empty_pool() {
        let (engine, _) = engine();
        let result = engine.select_batch(&[], &BookmarkFilter::new(), 5).unwrap();
        assert!(result.is_empty());
        assert!(!result.cycle_completed);
    }

    #[test]
    fn test_filter_excludes_everything() {
        let (engine, _) = engine();
        let filter = BookmarkFilter::new().with_category("Nope");
        let result = engine.select_batch(&pool(&["a", "b"]), &filter, 5).unwrap();
        assert!(result.is_empty());
        assert!(!result.cycle_completed);
        assert_eq!(engine.state(), EngineState::Cycling);
    }

    #[test]
    fn test_count_larger_than_unseen() {
        let (engine, _) = engine();
        let result = engine
            .select_batch(&pool(&["a", "b", "c"]), &BookmarkFilter::new(), 10)
            .unwrap();
        assert_eq!(result.selected.len(), 3);
        assert_eq!(result.eligible_count, 3);
    }

    #[test]
    fn test_selection_does_not_commit() {
        let (engine, backend) = engine();
        let items = pool(&["a", "b", "c"]);
        engine.select_batch(&items, &BookmarkFilter::new(), 2).unwrap();
        assert_eq!(engine.shown_count().unwrap(), 0);
        assert_eq!(backend.save_count(), 0);
    }

    #[test]
    fn test_no_repeat_then_cycle() {
        let (engine, _) = engine();
        let items = pool(&["a", "b", "c", "d", "e"]);
        let filter = BookmarkFilter::new();

        let mut seen = HashSet::new();
        for _ in 0..2 {
            let result = engine.select_batch(&items, &filter, 2).unwrap();
            assert!(!result.cycle_completed);
            for id in ids_of(&result) {
                assert!(seen.insert(id), "bookmark repeated within a cycle");
            }
            engine.commit(ids_of(&result)).unwrap();
        }

        let last = engine.select_batch(&items, &filter, 2).unwrap();
        assert_eq!(last.selected.len(), 1);
        assert!(!seen.contains(&last.selected[0].id));
        engine.commit(ids_of(&last)).unwrap();

        let next = engine.select_batch(&items, &filter, 2).unwrap();
        assert!(next.cycle_completed);
        assert_eq!(next.selected.len(), 2);
        assert_eq!(next.unseen_count, 5);
        assert_eq!(engine.state(), EngineState::JustReset);

        engine.acknowledge_reset();
        assert_eq!(engine.state(), EngineState::Cycling);
    }

    #[test]
    fn test_duplicate_ids_in_pool_count_once() {
        let (engine, _) = engine();
        let mut items = pool(&["a", "b"]);
        items.push(BookmarkRef::new("a", "https://A.example/", "Again"));

        let result = engine.select_batch(&items, &BookmarkFilter::new(), 5).unwrap();
        assert_eq!(result.eligible_count, 2);
        assert_eq!(result.selected.len(), 2);
        assert!(result.selected.iter().all(|b| b.title != "Again"));
    }

    #[test]
    fn test_closure_filter() {
        let (engine, _) = engine();
        let items = pool(&["a", "b", "c"]);
        let only_b = |b: &BookmarkRef| b.id.as_str() == "b";
        let result = engine.select_batch(&items, &only_b, 3).unwrap();
        assert_eq!(ids_of(&result), vec![BookmarkId::from("b")]);
    }

    #[test]
    fn test_seeded_engines_agree() {
        let items = pool(&["a", "b", "c", "d", "e", "f", "g", "h"]);
        let first = engine().0.select_batch(&items, &BookmarkFilter::new(), 3).unwrap();
        let second = engine().0.select_batch(&items, &BookmarkFilter::new(), 3).unwrap();
        assert_eq!(ids_of(&first), ids_of(&second));
    }

    #[test]
    fn test_progress_and_reset_history() {
        let (engine, backend) = engine();
        let items = pool(&["a", "b", "c", "d"]);
        let filter = BookmarkFilter::new();

        engine.commit(vec![BookmarkId::from("a"), BookmarkId::from("b")]).unwrap();
        assert_eq!(engine.progress(&items, &filter).unwrap(), Progress::new(2, 4));

        engine.reset_history().unwrap();
        assert_eq!(engine.progress(&items, &filter).unwrap(), Progress::new(0, 4));
        assert_eq!(engine.state(), EngineState::Cycling);
        assert_eq!(backend.snapshot().unwrap().total_at_last_observation, 4);
    }

    #[test]
    fn test_removed_bookmark_leaves_history() {
        let (engine, _) = engine();
        engine.commit(vec![BookmarkId::from("b")]).unwrap();

        assert!(engine.on_bookmark_removed(&BookmarkId::from("b")).unwrap());
        assert!(!engine.on_bookmark_removed(&BookmarkId::from("b")).unwrap());

        let remaining = pool(&["a", "c"]);
        assert_eq!(
            engine.progress(&remaining, &BookmarkFilter::new()).unwrap(),
            Progress::new(0, 2)
        );
    }

    #[test]
    fn test_failed_exhaustion_reset_reports_persistence_error() {
        let (engine, backend) = engine();
        let items = pool(&["a", "b"]);
        engine.commit(items.iter().map(|b| b.id.clone())).unwrap();

        backend.set_fail_writes(true);
        let err = engine
            .select_batch(&items, &BookmarkFilter::new(), 1)
            .unwrap_err();
        assert!(matches!(err, Error::Persistence { .. }));
        assert_eq!(engine.state(), EngineState::JustReset);
        assert_eq!(engine.shown_count().unwrap(), 0);

        backend.set_fail_writes(false);
        let result = engine.select_batch(&items, &BookmarkFilter::new(), 1).unwrap();
        assert!(!result.cycle_completed);
        assert_eq!(result.selected.len(), 1);
        assert_eq!(engine.state(), EngineState::JustReset);

        engine.acknowledge_reset();
        assert_eq!(engine.state(), EngineState::Cycling);
    }

    #[test]
    fn test_reset_notice_waits_for_acknowledgement() {
        let (engine, _) = engine();
        let items = pool(&["a"]);
        let filter = BookmarkFilter::new();
        engine.commit(ids_of(&engine.select_batch(&items, &filter, 1).unwrap())).unwrap();

        assert!(engine.select_batch(&items, &filter, 1).unwrap().cycle_completed);
        assert!(!engine.select_batch(&items, &filter, 1).unwrap().cycle_completed);
        assert_eq!(engine.state(), EngineState::JustReset);

        engine.reset_history().unwrap();
        assert_eq!(engine.state(), EngineState::Cycling);
    }
}
