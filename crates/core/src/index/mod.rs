//! Duplicate index.
//!
//! Answers "is this already present locally?" by reading the play links of
//! the artifacts on disk. Nothing is cached between queries, and the
//! filesystem walk runs off the async executor.

mod fs;

pub use fs::FsDuplicateIndex;

use std::collections::HashSet;
use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("failed to scan {path}: {source}")]
    Scan {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

#[async_trait]
pub trait DuplicateIndex: Send + Sync {
    async fn is_duplicate_movie(&self, id: u32) -> bool;

    async fn is_duplicate_show(&self, id: u32) -> bool;

    async fn is_duplicate_episode(&self, show_id: u32, season: u32, episode: u32) -> bool;

    /// Every movie id present locally, from a single scan.
    async fn local_movie_ids(&self) -> HashSet<u32>;

    /// Every show id with at least one episode present locally.
    async fn local_show_ids(&self) -> HashSet<u32>;

    /// Number of distinct episodes of a show present locally.
    async fn show_episode_count(&self, show_id: u32) -> Result<usize, IndexError>;

    /// Directories holding artifacts of a movie.
    async fn movie_dirs(&self, id: u32) -> Vec<PathBuf>;

    /// Directories holding artifacts of a show.
    async fn show_dirs(&self, show_id: u32) -> Vec<PathBuf>;

    /// Artifact files of a single episode.
    async fn episode_files(&self, show_id: u32, season: u32, episode: u32) -> Vec<PathBuf>;
}
