//! Refresh coordinator implementation.
//!
//! A single scheduler loop ticks at a fixed base interval. Each tick it
//! evaluates a small table of timed triggers, then starts at most one
//! pending refresh kind on its own task.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::state::RefreshState;
use super::types::{RefreshKind, RefreshStatus};
use super::RefreshRunner;
use crate::config::{LibraryConfig, SchedulerConfig};
use crate::host::HostControl;
use crate::metrics;
use crate::removal::{RemovalQueue, RemovalWorker};

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Conditions for the timed content update.
#[derive(Debug, Clone, Copy)]
pub struct UpdateGate {
    pub sync_enabled: bool,
    pub sync_during_playback: bool,
}

impl From<&LibraryConfig> for UpdateGate {
    fn from(config: &LibraryConfig) -> Self {
        Self {
            sync_enabled: config.enabled && config.sync_enabled,
            sync_during_playback: config.sync_during_playback,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerAction {
    /// Request Movies and Shows, subject to the [`UpdateGate`].
    ContentUpdate,
    /// Request RemoteList.
    RemoteListSync,
    /// Run the maintenance sweep.
    Maintenance,
}

struct Trigger {
    action: TriggerAction,
    every: Duration,
    next_due: Instant,
}

struct TriggerTable {
    triggers: Vec<Trigger>,
}

impl TriggerTable {
    fn new(config: &SchedulerConfig, now: Instant) -> Self {
        let mut table = Self {
            triggers: Vec::new(),
        };
        if let Some(every) = config.update_frequency() {
            table.push(TriggerAction::ContentUpdate, every, now);
        }
        table.push(TriggerAction::RemoteListSync, config.list_sync_frequency(), now);
        table.push(TriggerAction::Maintenance, config.maintenance_interval(), now);
        table
    }

    fn push(&mut self, action: TriggerAction, every: Duration, now: Instant) {
        self.triggers.push(Trigger {
            action,
            every,
            next_due: now + every,
        });
    }

    /// Actions due at `now`, in table order. Each due trigger is rescheduled.
    fn due(&mut self, now: Instant) -> Vec<TriggerAction> {
        let mut actions = Vec::new();
        for trigger in &mut self.triggers {
            if now >= trigger.next_due {
                actions.push(trigger.action);
                trigger.next_due = now + trigger.every;
            }
        }
        actions
    }
}

/// Shared pieces the spawned loops work with.
#[derive(Clone)]
struct SchedulerCore {
    config: SchedulerConfig,
    gate: UpdateGate,
    state: RefreshState,
    runner: Arc<dyn RefreshRunner>,
    host: Arc<dyn HostControl>,
    sweeping: Arc<AtomicBool>,
}

impl SchedulerCore {
    async fn handle(&self, action: TriggerAction) {
        match action {
            TriggerAction::ContentUpdate => {
                if !self.gate.sync_enabled {
                    debug!("Content update skipped, library sync disabled");
                    return;
                }
                if !self.gate.sync_during_playback && self.host.is_playing().await {
                    debug!("Content update skipped during playback");
                    return;
                }
                self.state.request(RefreshKind::Movies);
                self.state.request(RefreshKind::Shows);
            }
            TriggerAction::RemoteListSync => self.state.request(RefreshKind::RemoteList),
            TriggerAction::Maintenance => self.spawn_maintenance(),
        }
    }

    /// Start the next pending kind, if allowed.
    async fn dispatch(&self) -> Option<RefreshKind> {
        if !self.state.is_initialized() || self.state.running_kind().is_some() {
            return None;
        }
        if self.config.pause_during_playback && self.host.is_playing().await {
            return None;
        }

        let kind = self.state.start_next()?;
        let core = self.clone();
        tokio::spawn(async move {
            core.execute(kind).await;
        });
        Some(kind)
    }

    /// Run a kind that was already moved to Running.
    async fn execute(&self, kind: RefreshKind) {
        let started = Instant::now();
        info!("Refresh {} started", kind);

        let result = self.runner.run_refresh(kind).await;
        self.state.finish(kind);

        metrics::REFRESH_DURATION
            .with_label_values(&[kind.as_str()])
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(()) => {
                metrics::REFRESH_RUNS
                    .with_label_values(&[kind.as_str(), "success"])
                    .inc();
                info!("Refresh {} finished in {:?}", kind, started.elapsed());
            }
            Err(e) => {
                metrics::REFRESH_RUNS
                    .with_label_values(&[kind.as_str(), "failed"])
                    .inc();
                warn!("Refresh {} failed: {}", kind, e);
            }
        }
    }

    fn spawn_maintenance(&self) {
        if self.sweeping.swap(true, Ordering::SeqCst) {
            debug!("Maintenance sweep still running, skipping");
            return;
        }

        let runner = Arc::clone(&self.runner);
        let sweeping = Arc::clone(&self.sweeping);
        tokio::spawn(async move {
            match runner.run_maintenance().await {
                Ok(0) => {}
                Ok(cleared) => info!("Maintenance sweep cleared {} records", cleared),
                Err(e) => warn!("Maintenance sweep failed: {}", e),
            }
            sweeping.store(false, Ordering::SeqCst);
        });
    }

    async fn startup(self, mut shutdown_rx: broadcast::Receiver<()>) {
        tokio::select! {
            _ = shutdown_rx.recv() => return,
            _ = tokio::time::sleep(self.config.startup_grace()) => {}
        }

        self.state.request(RefreshKind::Overall);
        match self.state.try_start(RefreshKind::Overall) {
            Ok(()) => self.execute(RefreshKind::Overall).await,
            Err(e) => warn!("Startup refresh not started: {}", e),
        }
        self.state.mark_initialized();
        info!("Library initialized");

        if let Some(delay) = self.config.update_delay() {
            tokio::select! {
                _ = shutdown_rx.recv() => {}
                _ = tokio::time::sleep(delay) => {
                    debug!("Delayed startup update");
                    self.state.request(RefreshKind::RemoteList);
                    self.state.request(RefreshKind::Shows);
                }
            }
        }
    }

    async fn scheduler_loop(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut triggers = TriggerTable::new(&self.config, Instant::now());

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Scheduler loop shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    for action in triggers.due(Instant::now()) {
                        self.handle(action).await;
                    }
                    self.dispatch().await;
                }
            }
        }
    }
}

/// Owns the scheduler loop, the startup sequence and the removal worker.
pub struct RefreshCoordinator {
    core: SchedulerCore,
    removal_worker: Mutex<Option<RemovalWorker>>,
    removal_queue: Option<RemovalQueue>,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RefreshCoordinator {
    pub fn new(
        config: SchedulerConfig,
        gate: UpdateGate,
        state: RefreshState,
        runner: Arc<dyn RefreshRunner>,
        host: Arc<dyn HostControl>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            core: SchedulerCore {
                config,
                gate,
                state,
                runner,
                host,
                sweeping: Arc::new(AtomicBool::new(false)),
            },
            removal_worker: Mutex::new(None),
            removal_queue: None,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Run the removal worker alongside the scheduler. `queue` is closed on stop.
    pub fn with_removal_worker(mut self, worker: RemovalWorker, queue: RemovalQueue) -> Self {
        self.removal_worker = Mutex::new(Some(worker));
        self.removal_queue = Some(queue);
        self
    }

    /// Start the coordinator (spawns background tasks).
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("Coordinator already running");
            return;
        }

        info!("Starting refresh coordinator");

        let mut handles = Vec::new();

        let worker = self
            .removal_worker
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(worker) = worker {
            handles.push(tokio::spawn(worker.run(self.shutdown_tx.subscribe())));
        }

        handles.push(tokio::spawn(
            self.core.clone().startup(self.shutdown_tx.subscribe()),
        ));
        handles.push(tokio::spawn(
            self.core
                .clone()
                .scheduler_loop(self.shutdown_tx.subscribe()),
        ));

        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.extend(handles);
        }

        info!("Refresh coordinator started");
    }

    /// Stop the coordinator gracefully.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("Coordinator not running");
            return;
        }

        info!("Stopping refresh coordinator");

        if let Some(queue) = &self.removal_queue {
            queue.close();
        }
        self.core.runner.close();
        let _ = self.shutdown_tx.send(());

        let handles: Vec<JoinHandle<()>> = match self.tasks.lock() {
            Ok(mut tasks) => tasks.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for handle in handles {
            if tokio::time::timeout(STOP_TIMEOUT, handle).await.is_err() {
                warn!("Coordinator task did not stop within {:?}", STOP_TIMEOUT);
            }
        }

        info!("Refresh coordinator stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Mark a kind Pending.
    pub fn request(&self, kind: RefreshKind) {
        self.core.state.request(kind);
    }

    pub fn state(&self) -> &RefreshState {
        &self.core.state
    }

    /// Evaluate the scheduling policy once, outside the loop.
    pub async fn tick(&self) -> Option<RefreshKind> {
        self.core.dispatch().await
    }

    pub fn status(&self) -> RefreshStatus {
        let state = &self.core.state;
        RefreshStatus {
            running: self.is_running(),
            initialized: state.is_initialized(),
            kinds: state.kinds(),
            pending_shows: state.pending_show_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LibraryError;
    use crate::refresh::RefreshPhase;
    use crate::testing::MockHost;
    use async_trait::async_trait;
    use tokio::sync::Notify;

    #[derive(Default)]
    struct MockRunner {
        calls: Mutex<Vec<RefreshKind>>,
        blocked: Mutex<Vec<RefreshKind>>,
        release: Notify,
        sweeps: Mutex<usize>,
        closed: AtomicBool,
    }

    impl MockRunner {
        fn block(&self, kind: RefreshKind) {
            self.blocked.lock().unwrap().push(kind);
        }

        fn calls(&self) -> Vec<RefreshKind> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl RefreshRunner for MockRunner {
        async fn run_refresh(&self, kind: RefreshKind) -> Result<(), LibraryError> {
            self.calls.lock().unwrap().push(kind);
            let blocked = self.blocked.lock().unwrap().contains(&kind);
            if blocked {
                self.release.notified().await;
            }
            if kind == RefreshKind::Episodes {
                return Err(LibraryError::Storage("disk full".to_string()));
            }
            Ok(())
        }

        async fn run_maintenance(&self) -> Result<usize, LibraryError> {
            *self.sweeps.lock().unwrap() += 1;
            Ok(0)
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    fn coordinator(
        runner: Arc<MockRunner>,
        host: Arc<MockHost>,
    ) -> RefreshCoordinator {
        let config = SchedulerConfig {
            startup_grace_secs: 5,
            ..SchedulerConfig::default()
        };
        let gate = UpdateGate {
            sync_enabled: true,
            sync_during_playback: false,
        };
        RefreshCoordinator::new(config, gate, RefreshState::new(), runner, host)
    }

    async fn settle() {
        for _ in 0..20 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_runs_overall_then_initializes() {
        let runner = Arc::new(MockRunner::default());
        let coordinator = coordinator(runner.clone(), Arc::new(MockHost::new()));

        coordinator.start().await;
        assert!(coordinator.is_running());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(!coordinator.state().is_initialized());
        assert!(runner.calls().is_empty());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(coordinator.state().is_initialized());
        assert_eq!(runner.calls(), vec![RefreshKind::Overall]);
        assert_eq!(
            coordinator.state().phase(RefreshKind::Overall),
            RefreshPhase::Idle
        );

        coordinator.stop().await;
        assert!(!coordinator.is_running());
        assert!(runner.closed.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_nothing_dispatched_before_initialization() {
        let runner = Arc::new(MockRunner::default());
        let coordinator = coordinator(runner.clone(), Arc::new(MockHost::new()));

        coordinator.request(RefreshKind::Movies);
        assert_eq!(coordinator.tick().await, None);

        coordinator.state().mark_initialized();
        assert_eq!(coordinator.tick().await, Some(RefreshKind::Movies));
    }

    #[tokio::test]
    async fn test_dispatch_follows_priority() {
        let runner = Arc::new(MockRunner::default());
        let coordinator = coordinator(runner.clone(), Arc::new(MockHost::new()));
        coordinator.state().mark_initialized();

        coordinator.request(RefreshKind::Movies);
        coordinator.request(RefreshKind::HostLibrary);

        assert_eq!(coordinator.tick().await, Some(RefreshKind::HostLibrary));
        settle().await;
        assert_eq!(coordinator.tick().await, Some(RefreshKind::Movies));
        settle().await;
        assert_eq!(
            runner.calls(),
            vec![RefreshKind::HostLibrary, RefreshKind::Movies]
        );
    }

    #[tokio::test]
    async fn test_running_kind_blocks_others() {
        let runner = Arc::new(MockRunner::default());
        runner.block(RefreshKind::Movies);
        let coordinator = coordinator(runner.clone(), Arc::new(MockHost::new()));
        coordinator.state().mark_initialized();

        coordinator.request(RefreshKind::Movies);
        assert_eq!(coordinator.tick().await, Some(RefreshKind::Movies));
        settle().await;

        coordinator.request(RefreshKind::Shows);
        assert_eq!(coordinator.tick().await, None);
        assert_eq!(
            coordinator.state().phase(RefreshKind::Shows),
            RefreshPhase::Pending
        );

        runner.release.notify_one();
        settle().await;
        assert_eq!(
            coordinator.state().phase(RefreshKind::Movies),
            RefreshPhase::Idle
        );
        assert_eq!(coordinator.tick().await, Some(RefreshKind::Shows));
    }

    #[tokio::test]
    async fn test_failed_refresh_returns_to_idle() {
        let runner = Arc::new(MockRunner::default());
        let coordinator = coordinator(runner.clone(), Arc::new(MockHost::new()));
        coordinator.state().mark_initialized();

        coordinator.request(RefreshKind::Episodes);
        assert_eq!(coordinator.tick().await, Some(RefreshKind::Episodes));
        settle().await;

        // No immediate retry; the next timed trigger asks again.
        assert_eq!(
            coordinator.state().phase(RefreshKind::Episodes),
            RefreshPhase::Idle
        );
        assert_eq!(coordinator.tick().await, None);
    }

    #[tokio::test]
    async fn test_pause_during_playback() {
        let runner = Arc::new(MockRunner::default());
        let host = Arc::new(MockHost::new());
        host.set_playing(true).await;

        let mut coordinator = coordinator(runner.clone(), host.clone());
        coordinator.core.config.pause_during_playback = true;
        coordinator.state().mark_initialized();
        coordinator.request(RefreshKind::Movies);

        assert_eq!(coordinator.tick().await, None);
        host.set_playing(false).await;
        assert_eq!(coordinator.tick().await, Some(RefreshKind::Movies));
    }

    #[tokio::test]
    async fn test_content_update_gate() {
        let runner = Arc::new(MockRunner::default());
        let host = Arc::new(MockHost::new());
        let coordinator = coordinator(runner, host.clone());

        host.set_playing(true).await;
        coordinator.core.handle(TriggerAction::ContentUpdate).await;
        assert_eq!(
            coordinator.state().phase(RefreshKind::Movies),
            RefreshPhase::Idle
        );

        host.set_playing(false).await;
        coordinator.core.handle(TriggerAction::ContentUpdate).await;
        assert_eq!(
            coordinator.state().phase(RefreshKind::Movies),
            RefreshPhase::Pending
        );
        assert_eq!(
            coordinator.state().phase(RefreshKind::Shows),
            RefreshPhase::Pending
        );
    }

    #[tokio::test]
    async fn test_maintenance_trigger_runs_sweep() {
        let runner = Arc::new(MockRunner::default());
        let coordinator = coordinator(runner.clone(), Arc::new(MockHost::new()));

        coordinator.core.handle(TriggerAction::Maintenance).await;
        settle().await;
        assert_eq!(*runner.sweeps.lock().unwrap(), 1);
        assert!(!coordinator.core.sweeping.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_table() {
        let config = SchedulerConfig {
            update_frequency_hours: 1,
            list_sync_frequency_minutes: 10,
            maintenance_interval_secs: 30,
            ..SchedulerConfig::default()
        };
        let start = Instant::now();
        let mut table = TriggerTable::new(&config, start);

        assert!(table.due(start).is_empty());
        assert_eq!(
            table.due(start + Duration::from_secs(30)),
            vec![TriggerAction::Maintenance]
        );
        assert_eq!(
            table.due(start + Duration::from_secs(3600)),
            vec![
                TriggerAction::ContentUpdate,
                TriggerAction::RemoteListSync,
                TriggerAction::Maintenance
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_table_zero_frequencies() {
        let config = SchedulerConfig {
            update_frequency_hours: 0,
            list_sync_frequency_minutes: 0,
            maintenance_interval_secs: 3600,
            ..SchedulerConfig::default()
        };
        let start = Instant::now();
        let mut table = TriggerTable::new(&config, start);

        // A zero list sync frequency still syncs every minute.
        assert_eq!(
            table.due(start + Duration::from_secs(60)),
            vec![TriggerAction::RemoteListSync]
        );
        // A zero update frequency never schedules a content update.
        let actions = table.due(start + Duration::from_secs(3600));
        assert!(!actions.contains(&TriggerAction::ContentUpdate));
        assert_eq!(
            actions,
            vec![TriggerAction::RemoteListSync, TriggerAction::Maintenance]
        );
    }

    #[tokio::test]
    async fn test_status_snapshot() {
        let coordinator = coordinator(
            Arc::new(MockRunner::default()),
            Arc::new(MockHost::new()),
        );
        coordinator.state().plan_show_update(12);

        let status = coordinator.status();
        assert!(!status.running);
        assert!(!status.initialized);
        assert_eq!(status.pending_shows, 1);
        assert_eq!(status.kinds.len(), 6);
        assert_eq!(status.kinds[0].kind, RefreshKind::HostLibrary);
    }
}
