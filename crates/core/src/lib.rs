pub mod cache;
pub mod config;
pub mod diff;
pub mod error;
pub mod host;
pub mod index;
pub mod ledger;
pub mod library;
pub mod lists;
pub mod metadata;
pub mod metrics;
pub mod refresh;
pub mod removal;
pub mod render;
pub mod sync;
pub mod testing;

pub use cache::{CacheError, CacheExt, KeyValueCache, SqliteCache};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use error::LibraryError;
pub use host::{HeadlessHost, HostControl, HostError, KodiHost, RescanMode};
pub use index::{DuplicateIndex, FsDuplicateIndex};
pub use ledger::{ItemState, LedgerError, LedgerFilter, LibraryItem, MediaKind, SqliteLedger, StateLedger};
pub use library::{Collaborators, Library};
pub use lists::{ListId, ListKind, ListProvider, SnapshotListProvider, TraktClient};
pub use metadata::{MetadataProvider, TmdbClient};
pub use refresh::{RefreshCoordinator, RefreshKind, RefreshState, RefreshStatus};
pub use removal::{RemovalQueue, RemovalWorker};
pub use render::{Renderer, StrmRenderer};
pub use sync::{SyncOptions, SyncReport};
