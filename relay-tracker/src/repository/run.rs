//! Run Repository
//!
//! In-memory storage of pipeline runs.
//!
//! Every run sits behind its own mutex, so mutations of one run are
//! serialized while different runs proceed independently. The index lock is
//! only held to insert or look up a record, never across a transition.
//! Updates are applied to a copy that replaces the stored run only on
//! success, so readers never observe a half-applied transition.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use relay_core::domain::run::PipelineRun;
use uuid::Uuid;

type RunHandle = Arc<Mutex<PipelineRun>>;

/// Authoritative store of all pipeline runs
#[derive(Debug, Default)]
pub struct RunStore {
    runs: RwLock<HashMap<Uuid, RunHandle>>,
    last_number: AtomicU64,
}

impl RunStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve the next sequential run number
    pub fn next_number(&self) -> u64 {
        self.last_number.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Append a new run record
    pub fn insert(&self, run: PipelineRun) {
        let id = run.id;
        self.runs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, Arc::new(Mutex::new(run)));
    }

    /// Snapshot of a run by ID
    pub fn find_by_id(&self, id: Uuid) -> Option<PipelineRun> {
        self.handle(id).map(|handle| lock(&handle).clone())
    }

    /// Snapshot of every stored run, in no particular order
    pub fn list_all(&self) -> Vec<PipelineRun> {
        let handles: Vec<RunHandle> = self
            .runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();

        handles.iter().map(|handle| lock(handle).clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `f` to a run under its lock
    ///
    /// Returns `None` for an unknown ID. When `f` fails the stored run is left
    /// untouched; otherwise the updated run replaces it and a snapshot is
    /// returned alongside `f`'s output.
    pub fn update<T, E>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut PipelineRun) -> Result<T, E>,
    ) -> Option<Result<(T, PipelineRun), E>> {
        let handle = self.handle(id)?;
        let mut guard = lock(&handle);

        let mut draft = guard.clone();
        Some(f(&mut draft).map(|output| {
            *guard = draft.clone();
            (output, draft)
        }))
    }

    fn handle(&self, id: Uuid) -> Option<RunHandle> {
        self.runs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }
}

// A poisoned run lock still guards a consistent record: updates only swap in
// a fully built copy.
fn lock(handle: &RunHandle) -> MutexGuard<'_, PipelineRun> {
    handle.lock().unwrap_or_else(PoisonError::into_inner)
}
