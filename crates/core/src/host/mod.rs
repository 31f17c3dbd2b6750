//! Host media center control.
//!
//! Notifications, confirmations, library rescans and playback status.

mod headless;
mod kodi;

pub use headless::HeadlessHost;
pub use kodi::{KodiConfig, KodiHost};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("host returned an error: {0}")]
    Rpc(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RescanMode {
    /// Pick up new artifacts.
    Scan,
    /// Drop entries whose artifacts are gone.
    Clean,
}

#[async_trait]
pub trait HostControl: Send + Sync {
    /// Show a passive notification.
    async fn notify(&self, message: &str);

    /// Ask the user to confirm. Hosts that cannot ask answer from configuration.
    async fn confirm(&self, message: &str) -> bool;

    async fn rescan_library(&self, mode: RescanMode) -> Result<(), HostError>;

    /// Whether playback is active. Unreachable hosts read as idle.
    async fn is_playing(&self) -> bool;
}
