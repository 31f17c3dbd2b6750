//! Mock duplicate index for testing.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::index::{DuplicateIndex, IndexError};

#[derive(Debug, Default)]
struct Contents {
    movies: HashSet<u32>,
    shows: HashSet<u32>,
    episodes: HashMap<u32, HashSet<(u32, u32)>>,
}

/// In-memory DuplicateIndex. Reports no artifact paths.
///
/// Setup is synchronous so fake writers can register what they render
/// without awaiting.
#[derive(Debug, Default)]
pub struct MockDuplicateIndex {
    contents: Mutex<Contents>,
}

impl MockDuplicateIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> MutexGuard<'_, Contents> {
        self.contents.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_movie(&self, id: u32) {
        self.contents().movies.insert(id);
    }

    pub fn add_show(&self, id: u32) {
        self.contents().shows.insert(id);
    }

    /// Register episodes as `(season, episode)` pairs. Also registers the show.
    pub fn add_episodes(&self, show_id: u32, episodes: &[(u32, u32)]) {
        let mut contents = self.contents();
        contents.shows.insert(show_id);
        contents
            .episodes
            .entry(show_id)
            .or_default()
            .extend(episodes.iter().copied());
    }

    pub fn remove_episode(&self, show_id: u32, season: u32, episode: u32) {
        if let Some(set) = self.contents().episodes.get_mut(&show_id) {
            set.remove(&(season, episode));
        }
    }
}

#[async_trait]
impl DuplicateIndex for MockDuplicateIndex {
    async fn is_duplicate_movie(&self, id: u32) -> bool {
        self.contents().movies.contains(&id)
    }

    async fn is_duplicate_show(&self, id: u32) -> bool {
        self.contents().shows.contains(&id)
    }

    async fn is_duplicate_episode(&self, show_id: u32, season: u32, episode: u32) -> bool {
        self.contents()
            .episodes
            .get(&show_id)
            .is_some_and(|set| set.contains(&(season, episode)))
    }

    async fn local_movie_ids(&self) -> HashSet<u32> {
        self.contents().movies.clone()
    }

    async fn local_show_ids(&self) -> HashSet<u32> {
        self.contents().shows.clone()
    }

    async fn show_episode_count(&self, show_id: u32) -> Result<usize, IndexError> {
        Ok(self
            .contents()
            .episodes
            .get(&show_id)
            .map_or(0, HashSet::len))
    }

    async fn movie_dirs(&self, _id: u32) -> Vec<PathBuf> {
        Vec::new()
    }

    async fn show_dirs(&self, _show_id: u32) -> Vec<PathBuf> {
        Vec::new()
    }

    async fn episode_files(&self, _show_id: u32, _season: u32, _episode: u32) -> Vec<PathBuf> {
        Vec::new()
    }
}
