//! Kodi JSON-RPC host.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::{HostControl, HostError, RescanMode};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KodiConfig {
    /// JSON-RPC endpoint, e.g. "http://localhost:8080/jsonrpc".
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_timeout() -> u32 {
    10
}

pub struct KodiHost {
    client: Client,
    config: KodiConfig,
    /// JSON-RPC has no blocking dialog, so confirmations are answered from config.
    auto_confirm: bool,
}

impl KodiHost {
    pub fn new(config: KodiConfig, auto_confirm: bool) -> Result<Self, HostError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;
        Ok(Self {
            client,
            config,
            auto_confirm,
        })
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, HostError> {
        debug!("Kodi RPC: {}", method);

        let body = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1,
        });

        let mut request = self.client.post(&self.config.url).json(&body);
        if let Some(username) = &self.config.username {
            request = request.basic_auth(username, self.config.password.as_deref());
        }

        let response: RpcResponse = request.send().await?.error_for_status()?.json().await?;
        if let Some(error) = response.error {
            return Err(HostError::Rpc(format!("{} ({})", error.message, error.code)));
        }
        Ok(response.result.unwrap_or(Value::Null))
    }
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[async_trait]
impl HostControl for KodiHost {
    async fn notify(&self, message: &str) {
        let params = json!({ "title": "vlibrary", "message": message });
        if let Err(e) = self.call("GUI.ShowNotification", params).await {
            warn!("Failed to notify host: {}", e);
        }
    }

    async fn confirm(&self, message: &str) -> bool {
        info!("Confirmation ({}): {}", self.auto_confirm, message);
        self.notify(message).await;
        self.auto_confirm
    }

    async fn rescan_library(&self, mode: RescanMode) -> Result<(), HostError> {
        let method = match mode {
            RescanMode::Scan => "VideoLibrary.Scan",
            RescanMode::Clean => "VideoLibrary.Clean",
        };
        self.call(method, json!({})).await?;
        info!("Requested host {}", method);
        Ok(())
    }

    async fn is_playing(&self) -> bool {
        match self.call("Player.GetActivePlayers", json!({})).await {
            Ok(Value::Array(players)) => !players.is_empty(),
            Ok(_) => false,
            Err(e) => {
                debug!("Playback status unavailable: {}", e);
                false
            }
        }
    }
}
