//! Shared refresh state.
//!
//! Every phase change goes through [`transition`], which enforces that at
//! most one kind is Running at any time.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, error};

use super::types::{
    KindStatus, RefreshKind, RefreshPhase, Transition, TransitionError,
};

#[derive(Debug, Default)]
struct Inner {
    phases: HashMap<RefreshKind, RefreshPhase>,
    rerun: HashSet<RefreshKind>,
    pending_shows: BTreeSet<u32>,
    initialized: bool,
}

impl Inner {
    fn phase(&self, kind: RefreshKind) -> RefreshPhase {
        self.phases.get(&kind).copied().unwrap_or_default()
    }

    fn running(&self) -> Option<RefreshKind> {
        RefreshKind::PRIORITY
            .into_iter()
            .find(|k| self.phase(*k) == RefreshPhase::Running)
    }
}

fn transition(
    inner: &mut Inner,
    kind: RefreshKind,
    event: Transition,
) -> Result<RefreshPhase, TransitionError> {
    let phase = inner.phase(kind);
    let next = match (phase, event) {
        (RefreshPhase::Idle, Transition::Request) => RefreshPhase::Pending,
        (RefreshPhase::Pending, Transition::Request) => RefreshPhase::Pending,
        (RefreshPhase::Running, Transition::Request) => {
            inner.rerun.insert(kind);
            RefreshPhase::Running
        }
        (RefreshPhase::Pending, Transition::Start) => {
            if let Some(running) = inner.running() {
                return Err(TransitionError::Busy { kind, running });
            }
            RefreshPhase::Running
        }
        (RefreshPhase::Running, Transition::Finish) => {
            if inner.rerun.remove(&kind) {
                RefreshPhase::Pending
            } else {
                RefreshPhase::Idle
            }
        }
        (phase, transition) => {
            return Err(TransitionError::Invalid {
                kind,
                phase,
                transition,
            })
        }
    };
    inner.phases.insert(kind, next);
    Ok(next)
}

/// Pick the next kind to start, or `None` while anything is running.
pub fn select_next(phases: &HashMap<RefreshKind, RefreshPhase>) -> Option<RefreshKind> {
    let phase = |k: &RefreshKind| phases.get(k).copied().unwrap_or_default();
    if RefreshKind::PRIORITY
        .iter()
        .any(|k| phase(k) == RefreshPhase::Running)
    {
        return None;
    }
    RefreshKind::PRIORITY
        .into_iter()
        .find(|k| phase(k) == RefreshPhase::Pending)
}

/// Cloneable handle to the process-wide refresh state.
#[derive(Clone, Default)]
pub struct RefreshState {
    inner: Arc<Mutex<Inner>>,
}

impl RefreshState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The critical sections never panic, so a poisoned lock still holds
        // consistent data.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Ask for a kind to run. Idempotent while pending; remembered while running.
    pub fn request(&self, kind: RefreshKind) {
        let mut inner = self.lock();
        if let Err(e) = transition(&mut inner, kind, Transition::Request) {
            error!("Refresh request rejected: {}", e);
        } else {
            debug!("Refresh {} requested", kind);
        }
    }

    /// Move a pending kind to Running.
    pub fn try_start(&self, kind: RefreshKind) -> Result<(), TransitionError> {
        let mut inner = self.lock();
        transition(&mut inner, kind, Transition::Start).map(|_| ())
    }

    /// Atomically select the highest-priority pending kind and start it.
    pub fn start_next(&self) -> Option<RefreshKind> {
        let mut inner = self.lock();
        let kind = select_next(&inner.phases)?;
        transition(&mut inner, kind, Transition::Start).ok()?;
        Some(kind)
    }

    /// Mark a running kind finished.
    pub fn finish(&self, kind: RefreshKind) {
        let mut inner = self.lock();
        if let Err(e) = transition(&mut inner, kind, Transition::Finish) {
            error!("Refresh finish rejected: {}", e);
        }
    }

    pub fn phase(&self, kind: RefreshKind) -> RefreshPhase {
        self.lock().phase(kind)
    }

    pub fn running_kind(&self) -> Option<RefreshKind> {
        self.lock().running()
    }

    pub fn mark_initialized(&self) {
        self.lock().initialized = true;
    }

    pub fn is_initialized(&self) -> bool {
        self.lock().initialized
    }

    /// Queue a show for the next Episodes refresh.
    pub fn plan_show_update(&self, show_id: u32) {
        let mut inner = self.lock();
        inner.pending_shows.insert(show_id);
        if let Err(e) = transition(&mut inner, RefreshKind::Episodes, Transition::Request) {
            error!("Show update request rejected: {}", e);
        }
    }

    /// Drain the shows queued by [`Self::plan_show_update`].
    pub fn take_pending_shows(&self) -> Vec<u32> {
        std::mem::take(&mut self.lock().pending_shows)
            .into_iter()
            .collect()
    }

    pub fn pending_show_count(&self) -> usize {
        self.lock().pending_shows.len()
    }

    pub fn kinds(&self) -> Vec<KindStatus> {
        let inner = self.lock();
        RefreshKind::PRIORITY
            .into_iter()
            .map(|kind| KindStatus {
                kind,
                phase: inner.phase(kind),
                rerun_requested: inner.rerun.contains(&kind),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_moves_idle_to_pending() {
        let state = RefreshState::new();
        assert_eq!(state.phase(RefreshKind::Movies), RefreshPhase::Idle);
        state.request(RefreshKind::Movies);
        state.request(RefreshKind::Movies);
        assert_eq!(state.phase(RefreshKind::Movies), RefreshPhase::Pending);
    }

    #[test]
    fn test_priority_order() {
        let state = RefreshState::new();
        state.request(RefreshKind::Movies);
        state.request(RefreshKind::Overall);
        state.request(RefreshKind::HostLibrary);

        assert_eq!(state.start_next(), Some(RefreshKind::HostLibrary));
        assert_eq!(state.start_next(), None);
        state.finish(RefreshKind::HostLibrary);

        assert_eq!(state.start_next(), Some(RefreshKind::Movies));
        state.finish(RefreshKind::Movies);
        assert_eq!(state.start_next(), Some(RefreshKind::Overall));
        state.finish(RefreshKind::Overall);
        assert_eq!(state.start_next(), None);
    }

    #[test]
    fn test_only_one_kind_runs() {
        let state = RefreshState::new();
        state.request(RefreshKind::Movies);
        state.request(RefreshKind::Shows);

        state.try_start(RefreshKind::Movies).unwrap();
        let err = state.try_start(RefreshKind::Shows).unwrap_err();
        assert_eq!(
            err,
            TransitionError::Busy {
                kind: RefreshKind::Shows,
                running: RefreshKind::Movies
            }
        );
        assert_eq!(state.phase(RefreshKind::Shows), RefreshPhase::Pending);

        state.finish(RefreshKind::Movies);
        assert_eq!(state.start_next(), Some(RefreshKind::Shows));
        assert_eq!(state.running_kind(), Some(RefreshKind::Shows));
    }

    #[test]
    fn test_start_requires_pending() {
        let state = RefreshState::new();
        let err = state.try_start(RefreshKind::Episodes).unwrap_err();
        assert!(matches!(err, TransitionError::Invalid { .. }));
    }

    #[test]
    fn test_request_while_running_reruns() {
        let state = RefreshState::new();
        state.request(RefreshKind::RemoteList);
        state.try_start(RefreshKind::RemoteList).unwrap();
        state.request(RefreshKind::RemoteList);
        assert_eq!(state.phase(RefreshKind::RemoteList), RefreshPhase::Running);

        state.finish(RefreshKind::RemoteList);
        assert_eq!(state.phase(RefreshKind::RemoteList), RefreshPhase::Pending);
        state.try_start(RefreshKind::RemoteList).unwrap();
        state.finish(RefreshKind::RemoteList);
        assert_eq!(state.phase(RefreshKind::RemoteList), RefreshPhase::Idle);
    }

    #[test]
    fn test_select_next_is_pure() {
        let mut phases = HashMap::new();
        assert_eq!(select_next(&phases), None);

        phases.insert(RefreshKind::Episodes, RefreshPhase::Pending);
        phases.insert(RefreshKind::RemoteList, RefreshPhase::Pending);
        assert_eq!(select_next(&phases), Some(RefreshKind::RemoteList));

        phases.insert(RefreshKind::Overall, RefreshPhase::Running);
        assert_eq!(select_next(&phases), None);
    }

    #[test]
    fn test_plan_show_update() {
        let state = RefreshState::new();
        state.plan_show_update(5);
        state.plan_show_update(3);
        state.plan_show_update(5);

        assert_eq!(state.phase(RefreshKind::Episodes), RefreshPhase::Pending);
        assert_eq!(state.pending_show_count(), 2);
        assert_eq!(state.take_pending_shows(), vec![3, 5]);
        assert!(state.take_pending_shows().is_empty());
    }

    #[test]
    fn test_plan_show_update_while_episodes_run() {
        let state = RefreshState::new();
        state.plan_show_update(1);
        state.try_start(RefreshKind::Episodes).unwrap();
        assert_eq!(state.take_pending_shows(), vec![1]);

        state.plan_show_update(2);
        assert_eq!(state.phase(RefreshKind::Episodes), RefreshPhase::Running);

        state.finish(RefreshKind::Episodes);
        assert_eq!(state.phase(RefreshKind::Episodes), RefreshPhase::Pending);
        assert_eq!(state.take_pending_shows(), vec![2]);
    }
}
