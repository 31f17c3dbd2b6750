//! Debounced episode removal.
//!
//! Episode removals arrive one at a time but usually in bursts (the host
//! deletes a whole season, or a whole show). [`RemovalQueue`] is the
//! sending half; [`RemovalWorker`] buffers events and flushes them on a
//! fixed interval, turning a burst into a single ledger batch and a single
//! confirmation. A burst that covers every local episode of a show becomes
//! one show removal.

mod worker;

pub use worker::{FlushOutcome, RemovalWorker};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::LibraryError;

/// A single episode removal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovalEvent {
    pub episode_id: u32,
    pub show_id: u32,
    pub show_name: String,
    pub season: u32,
    pub episode: u32,
}

impl RemovalEvent {
    /// Human readable label, e.g. "Dark S01E02".
    pub fn label(&self) -> String {
        format!("{} S{:02}E{:02}", self.show_name, self.season, self.episode)
    }
}

/// Sending half of the removal queue. Cheap to clone.
#[derive(Clone)]
pub struct RemovalQueue {
    tx: mpsc::UnboundedSender<RemovalEvent>,
    closed: Arc<AtomicBool>,
}

impl RemovalQueue {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<RemovalEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                closed: Arc::new(AtomicBool::new(false)),
            },
            rx,
        )
    }

    /// Enqueue an event. Returns false once the queue is closed.
    pub fn send(&self, event: RemovalEvent) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            warn!("Removal queue closed, dropping {}", event.label());
            return false;
        }
        match self.tx.send(event) {
            Ok(()) => true,
            Err(e) => {
                warn!("Removal worker gone, dropping {}", e.0.label());
                false
            }
        }
    }

    /// Refuse further events.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.tx.is_closed()
    }
}

/// Side effects the worker needs from the library.
#[async_trait]
pub trait RemovalTarget: Send + Sync {
    /// Remove a whole show (artifacts and ledger state).
    async fn remove_show(&self, show_id: u32) -> Result<(), LibraryError>;

    /// Delete the artifacts of a single episode. Returns whether any existed.
    async fn remove_episode_artifacts(&self, event: &RemovalEvent) -> Result<bool, LibraryError>;
}
