//! Filesystem-backed duplicate index.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::{DuplicateIndex, IndexError};
use crate::render::{parse_link, PlayLink};

/// Deepest level scanned below a media root (`Show/Season N/file.strm`).
const MAX_DEPTH: usize = 3;

#[derive(Debug, Clone)]
struct Artifact {
    path: PathBuf,
    link: PlayLink,
}

pub struct FsDuplicateIndex {
    movies_dir: PathBuf,
    shows_dir: PathBuf,
}

impl FsDuplicateIndex {
    pub fn new(movies_dir: PathBuf, shows_dir: PathBuf) -> Self {
        Self {
            movies_dir,
            shows_dir,
        }
    }

    async fn scan(root: &Path) -> Result<Vec<Artifact>, IndexError> {
        let root = root.to_path_buf();
        tokio::task::spawn_blocking(move || Self::walk(&root)).await?
    }

    fn walk(root: &Path) -> Result<Vec<Artifact>, IndexError> {
        let mut artifacts = Vec::new();
        if !root.exists() {
            return Ok(artifacts);
        }

        for entry in WalkDir::new(root).min_depth(1).max_depth(MAX_DEPTH) {
            let entry = entry.map_err(|source| IndexError::Scan {
                path: source
                    .path()
                    .map_or_else(|| root.to_path_buf(), Path::to_path_buf),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            if path.extension().is_none_or(|ext| ext != "strm") {
                continue;
            }

            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    if let Some(link) = parse_link(&content) {
                        artifacts.push(Artifact { path, link });
                    }
                }
                Err(e) => debug!("Unreadable artifact {}: {}", path.display(), e),
            }
        }
        Ok(artifacts)
    }

    async fn scan_or_empty(root: &Path) -> Vec<Artifact> {
        Self::scan(root).await.unwrap_or_else(|e| {
            warn!("Duplicate index scan failed: {}", e);
            Vec::new()
        })
    }

    async fn episodes_of(&self, show_id: u32) -> Vec<Artifact> {
        Self::scan_or_empty(&self.shows_dir)
            .await
            .into_iter()
            .filter(|a| matches!(a.link, PlayLink::Episode { show_id: s, .. } if s == show_id))
            .collect()
    }

    async fn episode_artifacts(&self, show_id: u32, season: u32, episode: u32) -> Vec<Artifact> {
        let wanted = PlayLink::Episode {
            show_id,
            season,
            episode,
        };
        Self::scan_or_empty(&self.shows_dir)
            .await
            .into_iter()
            .filter(|a| a.link == wanted)
            .collect()
    }

    async fn movie_artifacts(&self, id: u32) -> Vec<Artifact> {
        Self::scan_or_empty(&self.movies_dir)
            .await
            .into_iter()
            .filter(|a| a.link == PlayLink::Movie { id })
            .collect()
    }

    /// The top-level directory below `root` containing `path`.
    fn top_dir(root: &Path, path: &Path) -> Option<PathBuf> {
        let relative = path.strip_prefix(root).ok()?;
        match relative.components().next()? {
            Component::Normal(first) if relative.components().count() > 1 => {
                Some(root.join(first))
            }
            _ => None,
        }
    }

    fn unique_top_dirs(root: &Path, artifacts: &[Artifact]) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = Vec::new();
        for artifact in artifacts {
            if let Some(dir) = Self::top_dir(root, &artifact.path) {
                if !dirs.contains(&dir) {
                    dirs.push(dir);
                }
            }
        }
        dirs
    }
}

#[async_trait]
impl DuplicateIndex for FsDuplicateIndex {
    async fn is_duplicate_movie(&self, id: u32) -> bool {
        !self.movie_artifacts(id).await.is_empty()
    }

    async fn is_duplicate_show(&self, id: u32) -> bool {
        !self.episodes_of(id).await.is_empty()
    }

    async fn is_duplicate_episode(&self, show_id: u32, season: u32, episode: u32) -> bool {
        !self
            .episode_artifacts(show_id, season, episode)
            .await
            .is_empty()
    }

    async fn local_movie_ids(&self) -> HashSet<u32> {
        Self::scan_or_empty(&self.movies_dir)
            .await
            .into_iter()
            .filter_map(|a| match a.link {
                PlayLink::Movie { id } => Some(id),
                _ => None,
            })
            .collect()
    }

    async fn local_show_ids(&self) -> HashSet<u32> {
        Self::scan_or_empty(&self.shows_dir)
            .await
            .into_iter()
            .filter_map(|a| match a.link {
                PlayLink::Episode { show_id, .. } => Some(show_id),
                _ => None,
            })
            .collect()
    }

    async fn show_episode_count(&self, show_id: u32) -> Result<usize, IndexError> {
        let distinct: HashSet<(u32, u32)> = Self::scan(&self.shows_dir)
            .await?
            .into_iter()
            .filter_map(|a| match a.link {
                PlayLink::Episode {
                    show_id: s,
                    season,
                    episode,
                } if s == show_id => Some((season, episode)),
                _ => None,
            })
            .collect();
        Ok(distinct.len())
    }

    async fn movie_dirs(&self, id: u32) -> Vec<PathBuf> {
        Self::unique_top_dirs(&self.movies_dir, &self.movie_artifacts(id).await)
    }

    async fn show_dirs(&self, show_id: u32) -> Vec<PathBuf> {
        Self::unique_top_dirs(&self.shows_dir, &self.episodes_of(show_id).await)
    }

    async fn episode_files(&self, show_id: u32, season: u32, episode: u32) -> Vec<PathBuf> {
        self.episode_artifacts(show_id, season, episode)
            .await
            .into_iter()
            .map(|a| a.path)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{episode_link, movie_link};
    use tempfile::TempDir;

    const PLUGIN: &str = "plugin.video.vlibrary";

    struct Fixture {
        _dir: TempDir,
        movies: PathBuf,
        shows: PathBuf,
        index: FsDuplicateIndex,
    }

    fn fixture() -> Fixture {
        let dir = TempDir::new().unwrap();
        let movies = dir.path().join("Movies");
        let shows = dir.path().join("Shows");
        std::fs::create_dir_all(&movies).unwrap();
        std::fs::create_dir_all(&shows).unwrap();
        let index = FsDuplicateIndex::new(movies.clone(), shows.clone());
        Fixture {
            _dir: dir,
            movies,
            shows,
            index,
        }
    }

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn test_movie_detection() {
        let f = fixture();
        write(
            &f.movies.join("Heat (1995)/Heat (1995).strm"),
            &movie_link(PLUGIN, 949),
        );
        write(&f.movies.join("Other/readme.txt"), &movie_link(PLUGIN, 1));

        assert!(f.index.is_duplicate_movie(949).await);
        assert!(!f.index.is_duplicate_movie(1).await);
        assert_eq!(
            f.index.movie_dirs(949).await,
            vec![f.movies.join("Heat (1995)")]
        );
        assert_eq!(f.index.local_movie_ids().await, HashSet::from([949]));
    }

    #[tokio::test]
    async fn test_show_and_episode_detection() {
        let f = fixture();
        let show_dir = f.shows.join("Dark (2017)");
        write(
            &show_dir.join("Season 1/Dark (2017) S01E01.strm"),
            &episode_link(PLUGIN, 70523, 1, 1),
        );
        write(
            &show_dir.join("Season 1/Dark (2017) S01E02.strm"),
            &episode_link(PLUGIN, 70523, 1, 2),
        );
        // A stray copy of an episode counts once.
        write(
            &show_dir.join("Season 1/copy.strm"),
            &episode_link(PLUGIN, 70523, 1, 2),
        );

        assert!(f.index.is_duplicate_show(70523).await);
        assert!(!f.index.is_duplicate_show(1).await);
        assert!(f.index.is_duplicate_episode(70523, 1, 2).await);
        assert!(!f.index.is_duplicate_episode(70523, 2, 1).await);
        assert_eq!(f.index.show_episode_count(70523).await.unwrap(), 2);
        assert_eq!(f.index.show_dirs(70523).await, vec![show_dir]);
        assert_eq!(f.index.episode_files(70523, 1, 2).await.len(), 2);
        assert_eq!(f.index.local_show_ids().await, HashSet::from([70523]));
    }

    #[tokio::test]
    async fn test_ignores_artifacts_below_max_depth() {
        let f = fixture();
        write(
            &f.shows.join("Dark (2017)/Season 1/extras/deep.strm"),
            &episode_link(PLUGIN, 70523, 1, 9),
        );

        assert!(!f.index.is_duplicate_episode(70523, 1, 9).await);
        assert!(f.index.local_show_ids().await.is_empty());
    }

    #[tokio::test]
    async fn test_reflects_disk_changes_immediately() {
        let f = fixture();
        let file = f.movies.join("Up (2009)/Up (2009).strm");
        write(&file, &movie_link(PLUGIN, 14160));
        assert!(f.index.is_duplicate_movie(14160).await);

        std::fs::remove_file(&file).unwrap();
        assert!(!f.index.is_duplicate_movie(14160).await);
    }

    #[tokio::test]
    async fn test_missing_roots_are_empty() {
        let dir = TempDir::new().unwrap();
        let index = FsDuplicateIndex::new(dir.path().join("nope"), dir.path().join("nada"));
        assert!(!index.is_duplicate_movie(1).await);
        assert_eq!(index.show_episode_count(1).await.unwrap(), 0);
        assert!(index.local_movie_ids().await.is_empty());
    }
}
