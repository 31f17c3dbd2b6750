//! Mock host for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::host::{HostControl, HostError, RescanMode};

/// Mock implementation of the HostControl trait.
///
/// Records notifications, confirmation prompts and rescans. Confirmations
/// answer yes unless told otherwise.
#[derive(Debug)]
pub struct MockHost {
    notifications: Arc<RwLock<Vec<String>>>,
    confirmations: Arc<RwLock<Vec<String>>>,
    rescans: Arc<RwLock<Vec<RescanMode>>>,
    confirm_answer: Arc<RwLock<bool>>,
    playing: Arc<RwLock<bool>>,
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            notifications: Arc::new(RwLock::new(Vec::new())),
            confirmations: Arc::new(RwLock::new(Vec::new())),
            rescans: Arc::new(RwLock::new(Vec::new())),
            confirm_answer: Arc::new(RwLock::new(true)),
            playing: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn set_confirm_answer(&self, answer: bool) {
        *self.confirm_answer.write().await = answer;
    }

    pub async fn set_playing(&self, playing: bool) {
        *self.playing.write().await = playing;
    }

    pub async fn notifications(&self) -> Vec<String> {
        self.notifications.read().await.clone()
    }

    pub async fn confirmations(&self) -> Vec<String> {
        self.confirmations.read().await.clone()
    }

    pub async fn rescans(&self) -> Vec<RescanMode> {
        self.rescans.read().await.clone()
    }
}

#[async_trait]
impl HostControl for MockHost {
    async fn notify(&self, message: &str) {
        self.notifications.write().await.push(message.to_string());
    }

    async fn confirm(&self, message: &str) -> bool {
        self.confirmations.write().await.push(message.to_string());
        *self.confirm_answer.read().await
    }

    async fn rescan_library(&self, mode: RescanMode) -> Result<(), HostError> {
        self.rescans.write().await.push(mode);
        Ok(())
    }

    async fn is_playing(&self) -> bool {
        *self.playing.read().await
    }
}
