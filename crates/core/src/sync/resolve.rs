//! Foreign id resolution with caching.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cache::{keys, CacheExt, KeyValueCache};
use crate::ledger::MediaKind;
use crate::lists::RemoteIds;
use crate::metadata::{IdSpace, MetadataProvider};

/// Lifetime of a cached resolution.
const RESOLVE_TTL: Duration = Duration::from_secs(30 * 24 * 3600);

pub struct IdResolver {
    metadata: Arc<dyn MetadataProvider>,
    cache: Arc<dyn KeyValueCache>,
}

impl IdResolver {
    pub fn new(metadata: Arc<dyn MetadataProvider>, cache: Arc<dyn KeyValueCache>) -> Self {
        Self { metadata, cache }
    }

    /// Canonical id for a list entry, or `None` when it cannot be resolved.
    ///
    /// Shows try TVDB before IMDB; movies only have IMDB.
    pub async fn resolve(&self, ids: &RemoteIds, kind: MediaKind) -> Option<u32> {
        if let Some(id) = ids.tmdb.filter(|id| *id != 0) {
            return Some(id);
        }

        let mut foreign = Vec::new();
        if kind != MediaKind::Movie {
            if let Some(tvdb) = ids.tvdb {
                foreign.push((IdSpace::Tvdb, tvdb.to_string()));
            }
        }
        if let Some(imdb) = &ids.imdb {
            foreign.push((IdSpace::Imdb, imdb.clone()));
        }

        for (space, foreign_id) in foreign {
            if let Some(id) = self.resolve_one(&foreign_id, space, kind).await {
                return Some(id);
            }
        }
        None
    }

    async fn resolve_one(&self, foreign_id: &str, space: IdSpace, kind: MediaKind) -> Option<u32> {
        let key = format!(
            "{}{}.{}.{}",
            keys::RESOLVE_PREFIX,
            space.as_str(),
            kind,
            foreign_id
        );

        match self.cache.get_json::<u32>(&key) {
            Ok(Some(id)) => return Some(id),
            Ok(None) => {}
            Err(e) => debug!("Resolve cache read failed for {}: {}", key, e),
        }

        let ids = match self
            .metadata
            .resolve_external_id(foreign_id, space, kind)
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                warn!(
                    "Failed to resolve {} id {}: {}",
                    space.as_str(),
                    foreign_id,
                    e
                );
                return None;
            }
        };

        let id = ids.first().copied()?;
        if let Err(e) = self.cache.set_json(&key, &id, Some(RESOLVE_TTL)) {
            debug!("Resolve cache write failed for {}: {}", key, e);
        }
        Some(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::SqliteCache;
    use crate::testing::MockMetadataProvider;

    fn resolver(metadata: Arc<MockMetadataProvider>) -> IdResolver {
        IdResolver::new(metadata, Arc::new(SqliteCache::in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_direct_id_needs_no_lookup() {
        let metadata = Arc::new(MockMetadataProvider::new());
        let resolver = resolver(metadata.clone());
        let ids = RemoteIds {
            trakt: 1,
            tmdb: Some(603),
            ..Default::default()
        };

        assert_eq!(resolver.resolve(&ids, MediaKind::Movie).await, Some(603));
        assert!(metadata.recorded_resolves().await.is_empty());
    }

    #[tokio::test]
    async fn test_show_prefers_tvdb_and_caches() {
        let metadata = Arc::new(MockMetadataProvider::new());
        metadata
            .add_resolution(IdSpace::Tvdb, "81189", MediaKind::Show, 1396)
            .await;
        metadata
            .add_resolution(IdSpace::Imdb, "tt0903747", MediaKind::Show, 9999)
            .await;
        let resolver = resolver(metadata.clone());
        let ids = RemoteIds {
            trakt: 1,
            tmdb: None,
            imdb: Some("tt0903747".to_string()),
            tvdb: Some(81189),
        };

        assert_eq!(resolver.resolve(&ids, MediaKind::Show).await, Some(1396));
        assert_eq!(resolver.resolve(&ids, MediaKind::Show).await, Some(1396));
        assert_eq!(metadata.recorded_resolves().await.len(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_imdb() {
        let metadata = Arc::new(MockMetadataProvider::new());
        metadata
            .add_resolution(IdSpace::Imdb, "tt0903747", MediaKind::Show, 1396)
            .await;
        let resolver = resolver(metadata.clone());
        let ids = RemoteIds {
            trakt: 1,
            tmdb: None,
            imdb: Some("tt0903747".to_string()),
            tvdb: Some(5),
        };

        assert_eq!(resolver.resolve(&ids, MediaKind::Show).await, Some(1396));
    }

    #[tokio::test]
    async fn test_unresolvable() {
        let metadata = Arc::new(MockMetadataProvider::new());
        let resolver = resolver(metadata);
        let ids = RemoteIds {
            trakt: 1,
            imdb: Some("tt0000001".to_string()),
            ..Default::default()
        };
        assert_eq!(resolver.resolve(&ids, MediaKind::Movie).await, None);
        assert_eq!(
            resolver
                .resolve(&RemoteIds::default(), MediaKind::Show)
                .await,
            None
        );
    }
}
