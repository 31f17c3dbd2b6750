//! Removal worker: buffers [`RemovalEvent`]s and flushes them periodically.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::{RemovalEvent, RemovalTarget};
use crate::host::{HostControl, RescanMode};
use crate::index::DuplicateIndex;
use crate::ledger::{LibraryItem, StateLedger};
use crate::metrics;

/// What a single flush did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    Empty,
    Single {
        label: String,
        confirmed: bool,
    },
    Batch {
        labels: Vec<String>,
        promoted_shows: Vec<u32>,
        /// `None` when nothing was left to confirm.
        confirmed: Option<bool>,
    },
}

pub struct RemovalWorker {
    rx: mpsc::UnboundedReceiver<RemovalEvent>,
    ledger: Arc<dyn StateLedger>,
    index: Arc<dyn DuplicateIndex>,
    host: Arc<dyn HostControl>,
    target: Arc<dyn RemovalTarget>,
    interval: Duration,
    buffer: Vec<RemovalEvent>,
}

impl RemovalWorker {
    pub fn new(
        rx: mpsc::UnboundedReceiver<RemovalEvent>,
        ledger: Arc<dyn StateLedger>,
        index: Arc<dyn DuplicateIndex>,
        host: Arc<dyn HostControl>,
        target: Arc<dyn RemovalTarget>,
        interval: Duration,
    ) -> Self {
        Self {
            rx,
            ledger,
            index,
            host,
            target,
            interval,
            buffer: Vec::new(),
        }
    }

    /// Run until shutdown. Events still buffered at shutdown are dropped.
    pub async fn run(mut self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        info!("Removal worker started (flush every {:?})", self.interval);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    if !self.buffer.is_empty() {
                        info!("Discarding {} buffered removals on shutdown", self.buffer.len());
                    }
                    break;
                }
                _ = ticker.tick() => {
                    self.flush().await;
                }
                event = self.rx.recv() => match event {
                    Some(event) => {
                        debug!("Buffered removal of {}", event.label());
                        self.buffer.push(event);
                    }
                    None => {
                        if !self.buffer.is_empty() {
                            info!("Discarding {} buffered removals, queue closed", self.buffer.len());
                        }
                        break;
                    }
                },
            }
        }

        info!("Removal worker stopped");
    }

    /// Process everything buffered so far.
    pub async fn flush(&mut self) -> FlushOutcome {
        let mut events = std::mem::take(&mut self.buffer);
        match events.len() {
            0 => FlushOutcome::Empty,
            1 => match events.pop() {
                Some(event) => self.flush_single(event).await,
                None => FlushOutcome::Empty,
            },
            _ => self.flush_batch(events).await,
        }
    }

    async fn flush_single(&self, event: RemovalEvent) -> FlushOutcome {
        if let Err(e) = self.target.remove_episode_artifacts(&event).await {
            warn!("Failed to remove artifacts of {}: {}", event.label(), e);
        }

        let item = LibraryItem::episode(event.episode_id, event.show_id, event.season, event.episode)
            .deleted();
        if let Err(e) = self.ledger.save(&item) {
            warn!("Failed to mark {} deleted: {}", event.label(), e);
        }

        let label = event.label();
        let confirmed = self.confirm_and_clean(std::slice::from_ref(&label)).await;
        metrics::REMOVAL_FLUSHES.with_label_values(&["single"]).inc();

        FlushOutcome::Single { label, confirmed }
    }

    async fn flush_batch(&self, events: Vec<RemovalEvent>) -> FlushOutcome {
        let mut groups: BTreeMap<(String, u32), Vec<RemovalEvent>> = BTreeMap::new();
        for event in events {
            groups
                .entry((event.show_name.clone(), event.show_id))
                .or_default()
                .push(event);
        }

        let mut labels = Vec::new();
        let mut promoted_shows = Vec::new();
        let mut deleted = Vec::new();

        for ((show_name, show_id), group) in groups {
            let distinct: HashSet<(u32, u32)> =
                group.iter().map(|e| (e.season, e.episode)).collect();

            let known = match self.index.show_episode_count(show_id).await {
                Ok(count) => Some(count),
                Err(e) => {
                    warn!("Could not count local episodes of {}: {}", show_name, e);
                    None
                }
            };

            if known == Some(distinct.len()) {
                match self.target.remove_show(show_id).await {
                    Ok(()) => {
                        info!(
                            "All {} local episodes of {} removed, removing the show",
                            distinct.len(),
                            show_name
                        );
                        metrics::SHOWS_PROMOTED.inc();
                        promoted_shows.push(show_id);
                        continue;
                    }
                    Err(e) => warn!("Failed to remove show {}: {}", show_name, e),
                }
            }

            for event in &group {
                if let Err(e) = self.target.remove_episode_artifacts(event).await {
                    warn!("Failed to remove artifacts of {}: {}", event.label(), e);
                }
                deleted.push(
                    LibraryItem::episode(event.episode_id, event.show_id, event.season, event.episode)
                        .deleted(),
                );
            }
            labels.push(format!("{} episodes of {}", distinct.len(), show_name));
        }

        if let Err(e) = self.ledger.save_batch(&deleted) {
            warn!("Failed to mark {} episodes deleted: {}", deleted.len(), e);
        }

        let confirmed = if labels.is_empty() {
            None
        } else {
            Some(self.confirm_and_clean(&labels).await)
        };
        metrics::REMOVAL_FLUSHES.with_label_values(&["batch"]).inc();

        FlushOutcome::Batch {
            labels,
            promoted_shows,
            confirmed,
        }
    }

    async fn confirm_and_clean(&self, labels: &[String]) -> bool {
        let message = format!("Removed from library: {}", labels.join(", "));
        if !self.host.confirm(&message).await {
            debug!("Host clean declined");
            return false;
        }
        if let Err(e) = self.host.rescan_library(RescanMode::Clean).await {
            warn!("Host clean failed: {}", e);
        }
        true
    }
}
