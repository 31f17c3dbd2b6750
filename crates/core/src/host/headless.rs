use async_trait::async_trait;
use tracing::info;

use super::{HostControl, HostError, RescanMode};

/// Host used when no media center is attached. Notifications go to the log.
pub struct HeadlessHost {
    auto_confirm: bool,
}

impl HeadlessHost {
    pub fn new(auto_confirm: bool) -> Self {
        Self { auto_confirm }
    }
}

#[async_trait]
impl HostControl for HeadlessHost {
    async fn notify(&self, message: &str) {
        info!("Notification: {}", message);
    }

    async fn confirm(&self, message: &str) -> bool {
        info!("Confirmation ({}): {}", self.auto_confirm, message);
        self.auto_confirm
    }

    async fn rescan_library(&self, mode: RescanMode) -> Result<(), HostError> {
        info!("Library {:?} requested, no host attached", mode);
        Ok(())
    }

    async fn is_playing(&self) -> bool {
        false
    }
}
