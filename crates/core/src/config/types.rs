use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::host::KodiConfig;
use crate::lists::{ListId, TraktConfig};
use crate::metadata::TmdbConfig;
use crate::render::RenderConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub library: LibraryConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub tmdb: Option<TmdbConfig>,
    #[serde(default)]
    pub trakt: Option<TraktConfig>,
    #[serde(default)]
    pub host: HostConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Database configuration. Ledger and cache share the file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("vlibrary.db")
}

/// When a sync that added items may rescan the host library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LibraryUpdatePolicy {
    #[default]
    Always,
    Ask,
    Never,
}

/// Library layout and rendering configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LibraryConfig {
    /// Root directory; `Movies/` and `Shows/` are created below it.
    #[serde(default)]
    pub path: PathBuf,
    /// Whether the library feature is enabled at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Language for metadata lookups.
    #[serde(default = "default_language")]
    pub language: String,
    /// Language used for names written into artifacts.
    #[serde(default = "default_language")]
    pub strm_language: String,
    /// Plugin id baked into play links.
    #[serde(default = "default_plugin_id")]
    pub plugin_id: String,
    /// Name artifacts after localized titles instead of original ones.
    #[serde(default)]
    pub localized_titles: bool,
    #[serde(default = "default_true")]
    pub write_nfo_movies: bool,
    #[serde(default = "default_true")]
    pub write_nfo_shows: bool,
    /// Render season 0.
    #[serde(default)]
    pub include_specials: bool,
    #[serde(default)]
    pub include_unaired_seasons: bool,
    #[serde(default)]
    pub include_unaired_episodes: bool,
    /// Background content updates on the fixed-hour timer.
    #[serde(default = "default_true")]
    pub sync_enabled: bool,
    /// Allow background content updates during playback.
    #[serde(default)]
    pub sync_during_playback: bool,
    #[serde(default)]
    pub update_policy: LibraryUpdatePolicy,
}

impl LibraryConfig {
    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            library_path: self.path.clone(),
            plugin_id: self.plugin_id.clone(),
            localized_titles: self.localized_titles,
            write_nfo_movies: self.write_nfo_movies,
            write_nfo_shows: self.write_nfo_shows,
        }
    }
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            enabled: true,
            language: default_language(),
            strm_language: default_language(),
            plugin_id: default_plugin_id(),
            localized_titles: false,
            write_nfo_movies: true,
            write_nfo_shows: true,
            include_specials: false,
            include_unaired_seasons: false,
            include_unaired_episodes: false,
            sync_enabled: true,
            sync_during_playback: false,
            update_policy: LibraryUpdatePolicy::default(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_language() -> String {
    "en".to_string()
}

fn default_plugin_id() -> String {
    "plugin.video.vlibrary".to_string()
}

/// Refresh coordinator timing
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchedulerConfig {
    /// Base tick of the coordinator loop, in milliseconds.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Delay before the startup Overall refresh, in seconds.
    #[serde(default = "default_startup_grace_secs")]
    pub startup_grace_secs: u64,
    /// Content update timer, in hours (0 disables).
    #[serde(default = "default_update_frequency_hours")]
    pub update_frequency_hours: u64,
    /// Remote list sync timer, in minutes (minimum 1).
    #[serde(default = "default_list_sync_minutes")]
    pub list_sync_frequency_minutes: u64,
    /// Maintenance sweep timer, in seconds.
    #[serde(default = "default_maintenance_secs")]
    pub maintenance_interval_secs: u64,
    /// One-shot content update after startup, in seconds (0 disables, minimum 10).
    #[serde(default)]
    pub update_delay_secs: u64,
    /// Removal queue flush interval, in milliseconds.
    #[serde(default = "default_removal_debounce_ms")]
    pub removal_debounce_ms: u64,
    /// Hold off starting refreshes while the host is playing.
    #[serde(default)]
    pub pause_during_playback: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            startup_grace_secs: default_startup_grace_secs(),
            update_frequency_hours: default_update_frequency_hours(),
            list_sync_frequency_minutes: default_list_sync_minutes(),
            maintenance_interval_secs: default_maintenance_secs(),
            update_delay_secs: 0,
            removal_debounce_ms: default_removal_debounce_ms(),
            pause_during_playback: false,
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    pub fn startup_grace(&self) -> Duration {
        Duration::from_secs(self.startup_grace_secs)
    }

    pub fn update_frequency(&self) -> Option<Duration> {
        (self.update_frequency_hours > 0)
            .then(|| Duration::from_secs(self.update_frequency_hours * 3600))
    }

    pub fn list_sync_frequency(&self) -> Duration {
        Duration::from_secs(self.list_sync_frequency_minutes.max(1) * 60)
    }

    pub fn maintenance_interval(&self) -> Duration {
        Duration::from_secs(self.maintenance_interval_secs.max(1))
    }

    pub fn update_delay(&self) -> Option<Duration> {
        (self.update_delay_secs > 0).then(|| Duration::from_secs(self.update_delay_secs.max(10)))
    }

    pub fn removal_debounce(&self) -> Duration {
        Duration::from_millis(self.removal_debounce_ms.max(1))
    }
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_startup_grace_secs() -> u64 {
    5
}

fn default_update_frequency_hours() -> u64 {
    12
}

fn default_list_sync_minutes() -> u64 {
    30
}

fn default_maintenance_secs() -> u64 {
    30
}

fn default_removal_debounce_ms() -> u64 {
    3000
}

/// First pass behaviour for a list kind that was never synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapPolicy {
    /// Process the whole current list.
    #[default]
    FullList,
    /// Diff against the (empty) previous snapshot plus anything not yet local.
    DiffWithBackfill,
}

/// Remote list sync configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    #[serde(default = "default_lists")]
    pub movie_lists: Vec<ListId>,
    #[serde(default = "default_lists")]
    pub show_lists: Vec<ListId>,
    #[serde(default)]
    pub bootstrap_policy: BootstrapPolicy,
    /// Lifetime of the show sync cursor, in hours.
    #[serde(default = "default_cursor_ttl_hours")]
    pub cursor_ttl_hours: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            movie_lists: default_lists(),
            show_lists: default_lists(),
            bootstrap_policy: BootstrapPolicy::default(),
            cursor_ttl_hours: default_cursor_ttl_hours(),
        }
    }
}

impl SyncConfig {
    pub fn cursor_ttl(&self) -> Duration {
        Duration::from_secs(self.cursor_ttl_hours * 3600)
    }
}

fn default_lists() -> Vec<ListId> {
    vec![ListId::Watchlist]
}

fn default_cursor_ttl_hours() -> u64 {
    24 * 7
}

/// Available host backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HostBackend {
    #[default]
    Headless,
    Kodi,
}

/// Host media center configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    #[serde(default)]
    pub backend: HostBackend,
    /// Answer used for confirmations the host cannot ask interactively.
    #[serde(default = "default_true")]
    pub auto_confirm: bool,
    /// Kodi-specific configuration (required when backend = "kodi")
    #[serde(default)]
    pub kodi: Option<KodiConfig>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            backend: HostBackend::default(),
            auto_confirm: true,
            kodi: None,
        }
    }
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub library: LibraryConfig,
    pub scheduler: SchedulerConfig,
    pub sync: SyncConfig,
    pub tmdb_configured: bool,
    pub trakt_configured: bool,
    pub host: SanitizedHostConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedHostConfig {
    pub backend: HostBackend,
    pub auto_confirm: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kodi_url: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            library: config.library.clone(),
            scheduler: config.scheduler.clone(),
            sync: config.sync.clone(),
            tmdb_configured: config
                .tmdb
                .as_ref()
                .is_some_and(|t| !t.api_key.is_empty()),
            trakt_configured: config
                .trakt
                .as_ref()
                .is_some_and(|t| !t.client_id.is_empty() && !t.access_token.is_empty()),
            host: SanitizedHostConfig {
                backend: config.host.backend,
                auto_confirm: config.host.auto_confirm,
                kodi_url: config.host.kodi.as_ref().map(|k| k.url.clone()),
            },
        }
    }
}
