//! `.strm` file renderer.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use super::links::{episode_link, movie_link};
use super::{RenderError, RenderOptions, Renderer, ShowRender};
use crate::metadata::{Movie, Show};

pub const MOVIES_DIR: &str = "Movies";
pub const SHOWS_DIR: &str = "Shows";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub library_path: PathBuf,
    /// Plugin id baked into play links.
    pub plugin_id: String,
    /// Name artifacts after the localized title instead of the original one.
    #[serde(default)]
    pub localized_titles: bool,
    #[serde(default = "default_true")]
    pub write_nfo_movies: bool,
    #[serde(default = "default_true")]
    pub write_nfo_shows: bool,
}

fn default_true() -> bool {
    true
}

pub struct StrmRenderer {
    config: RenderConfig,
}

impl StrmRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn movies_dir(&self) -> PathBuf {
        self.config.library_path.join(MOVIES_DIR)
    }

    pub fn shows_dir(&self) -> PathBuf {
        self.config.library_path.join(SHOWS_DIR)
    }

    fn movie_name(&self, movie: &Movie) -> String {
        let title = match &movie.original_title {
            Some(original) if !self.config.localized_titles && !original.is_empty() => original,
            _ => &movie.title,
        };
        with_year(title, movie.year())
    }

    fn show_name(&self, show: &Show) -> String {
        let name = match &show.original_name {
            Some(original) if !self.config.localized_titles && !original.is_empty() => original,
            _ => &show.name,
        };
        with_year(name, show.year())
    }

    async fn write_file(
        path: &Path,
        content: &str,
        force: bool,
    ) -> Result<bool, RenderError> {
        if !force && fs::try_exists(path).await.unwrap_or(false) {
            debug!("Skipping existing artifact {}", path.display());
            return Ok(false);
        }
        fs::write(path, content)
            .await
            .map_err(|e| RenderError::io(path, e))?;
        Ok(true)
    }

    async fn ensure_dir(path: &Path) -> Result<(), RenderError> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| RenderError::io(path, e))
    }
}

#[async_trait]
impl Renderer for StrmRenderer {
    async fn render_movie(
        &self,
        movie: &Movie,
        options: RenderOptions,
    ) -> Result<Vec<PathBuf>, RenderError> {
        let name = self.movie_name(movie);
        let dir = self.movies_dir().join(&name);
        Self::ensure_dir(&dir).await?;

        let mut written = Vec::new();

        let strm_path = dir.join(format!("{}.strm", name));
        let link = movie_link(&self.config.plugin_id, movie.id);
        if Self::write_file(&strm_path, &link, options.force).await? {
            written.push(strm_path);
        }

        if self.config.write_nfo_movies {
            let nfo_path = dir.join(format!("{}.nfo", name));
            let nfo = format!("https://www.themoviedb.org/movie/{}", movie.id);
            if Self::write_file(&nfo_path, &nfo, options.force).await? {
                written.push(nfo_path);
            }
        }

        info!("Rendered movie {} ({} files)", name, written.len());
        Ok(written)
    }

    async fn render_show(
        &self,
        request: &ShowRender<'_>,
        options: RenderOptions,
    ) -> Result<Vec<PathBuf>, RenderError> {
        let show = request.show;
        let name = self.show_name(show);
        let dir = request
            .existing_dir
            .clone()
            .unwrap_or_else(|| self.shows_dir().join(&name));
        Self::ensure_dir(&dir).await?;

        let mut written = Vec::new();

        if self.config.write_nfo_shows {
            let nfo_path = dir.join("tvshow.nfo");
            let nfo = format!("https://www.themoviedb.org/tv/{}", show.id);
            if Self::write_file(&nfo_path, &nfo, options.force).await? {
                written.push(nfo_path);
            }
        }

        for episode in request.episodes {
            let season_dir = dir.join(format!("Season {}", episode.season_number));
            Self::ensure_dir(&season_dir).await?;

            let file = season_dir.join(format!(
                "{} S{:02}E{:02}.strm",
                name, episode.season_number, episode.episode_number
            ));
            let link = episode_link(
                &self.config.plugin_id,
                show.id,
                episode.season_number,
                episode.episode_number,
            );
            if Self::write_file(&file, &link, options.force).await? {
                written.push(file);
            }
        }

        info!(
            "Rendered show {} ({} of {} episodes written)",
            name,
            written.iter().filter(|p| is_strm(p)).count(),
            request.episodes.len()
        );
        Ok(written)
    }

    fn movie_dirs(&self, movie: &Movie) -> Vec<PathBuf> {
        let mut dirs = vec![self.movies_dir().join(with_year(&movie.title, movie.year()))];
        if let Some(original) = movie.original_title.as_deref().filter(|o| !o.is_empty()) {
            let dir = self.movies_dir().join(with_year(original, movie.year()));
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs.retain(|d| d.is_dir());
        dirs
    }

    fn show_dirs(&self, show: &Show) -> Vec<PathBuf> {
        let mut dirs = vec![self.shows_dir().join(with_year(&show.name, show.year()))];
        if let Some(original) = show.original_name.as_deref().filter(|o| !o.is_empty()) {
            let dir = self.shows_dir().join(with_year(original, show.year()));
            if !dirs.contains(&dir) {
                dirs.push(dir);
            }
        }
        dirs.retain(|d| d.is_dir());
        dirs
    }

    async fn remove_artifacts(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>, RenderError> {
        let mut removed = Vec::new();
        for path in paths {
            let meta = match fs::metadata(path).await {
                Ok(meta) => meta,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(RenderError::io(path, e)),
            };

            let result = if meta.is_dir() {
                fs::remove_dir_all(path).await
            } else {
                fs::remove_file(path).await
            };
            result.map_err(|e| RenderError::io(path, e))?;

            debug!("Removed {}", path.display());
            removed.push(path.clone());
        }
        Ok(removed)
    }
}

fn with_year(name: &str, year: Option<u32>) -> String {
    let name = to_file_name(name);
    match year {
        Some(year) => format!("{} ({})", name, year),
        None => name,
    }
}

/// Strip characters that are not allowed in file names on common filesystems.
pub(crate) fn to_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*'))
        .filter(|c| !c.is_control())
        .collect();
    cleaned.trim().trim_end_matches('.').trim().to_string()
}

fn is_strm(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "strm")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Episode;
    use crate::render::{parse_link, PlayLink};
    use tempfile::TempDir;

    fn renderer(dir: &TempDir) -> StrmRenderer {
        StrmRenderer::new(RenderConfig {
            library_path: dir.path().to_path_buf(),
            plugin_id: "plugin.video.vlibrary".to_string(),
            localized_titles: false,
            write_nfo_movies: true,
            write_nfo_shows: false,
        })
    }

    fn movie() -> Movie {
        Movie {
            id: 550,
            title: "Fight Club".to_string(),
            original_title: Some("Fight Club".to_string()),
            release_date: Some("1999-10-15".to_string()),
            imdb_id: None,
        }
    }

    fn show() -> Show {
        Show {
            id: 1396,
            name: "Breaking Bad".to_string(),
            original_name: None,
            first_air_date: Some("2008-01-20".to_string()),
            imdb_id: None,
            tvdb_id: None,
            seasons: vec![],
        }
    }

    fn episode(season: u32, number: u32) -> Episode {
        Episode {
            id: 62000 + season * 100 + number,
            season_number: season,
            episode_number: number,
            name: format!("Episode {}", number),
            air_date: Some("2008-01-20".to_string()),
        }
    }

    #[test]
    fn test_to_file_name() {
        assert_eq!(to_file_name("Mission: Impossible"), "Mission Impossible");
        assert_eq!(to_file_name("What If...?"), "What If");
        assert_eq!(to_file_name("AC/DC"), "ACDC");
    }

    #[tokio::test]
    async fn test_render_movie_writes_strm_and_nfo() {
        let dir = TempDir::new().unwrap();
        let renderer = renderer(&dir);

        let written = renderer
            .render_movie(&movie(), RenderOptions::default())
            .await
            .unwrap();
        assert_eq!(written.len(), 2);

        let strm = dir
            .path()
            .join("Movies/Fight Club (1999)/Fight Club (1999).strm");
        let content = std::fs::read_to_string(&strm).unwrap();
        assert_eq!(parse_link(&content), Some(PlayLink::Movie { id: 550 }));

        // Second render without force leaves files alone.
        let again = renderer
            .render_movie(&movie(), RenderOptions::default())
            .await
            .unwrap();
        assert!(again.is_empty());

        let forced = renderer
            .render_movie(&movie(), RenderOptions { force: true })
            .await
            .unwrap();
        assert_eq!(forced.len(), 2);
    }

    #[tokio::test]
    async fn test_render_show_episodes() {
        let dir = TempDir::new().unwrap();
        let renderer = renderer(&dir);
        let show = show();
        let episodes = vec![episode(1, 1), episode(1, 2), episode(2, 1)];

        let written = renderer
            .render_show(
                &ShowRender {
                    show: &show,
                    episodes: &episodes,
                    existing_dir: None,
                },
                RenderOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(written.len(), 3);

        let file = dir
            .path()
            .join("Shows/Breaking Bad (2008)/Season 2/Breaking Bad (2008) S02E01.strm");
        assert!(file.exists());
    }

    #[tokio::test]
    async fn test_render_show_into_existing_dir() {
        let dir = TempDir::new().unwrap();
        let renderer = renderer(&dir);
        let existing = dir.path().join("Shows/Breaking Bad");
        let show = show();
        let episodes = vec![episode(1, 1)];

        renderer
            .render_show(
                &ShowRender {
                    show: &show,
                    episodes: &episodes,
                    existing_dir: Some(existing.clone()),
                },
                RenderOptions::default(),
            )
            .await
            .unwrap();

        assert!(existing.join("Season 1").is_dir());
        assert!(!dir.path().join("Shows/Breaking Bad (2008)").exists());
    }

    #[tokio::test]
    async fn test_dirs_and_remove_artifacts() {
        let dir = TempDir::new().unwrap();
        let renderer = renderer(&dir);
        let movie = movie();

        assert!(renderer.movie_dirs(&movie).is_empty());
        renderer
            .render_movie(&movie, RenderOptions::default())
            .await
            .unwrap();

        let dirs = renderer.movie_dirs(&movie);
        assert_eq!(dirs.len(), 1);

        let missing = dir.path().join("Movies/Nope");
        let removed = renderer
            .remove_artifacts(&[dirs[0].clone(), missing])
            .await
            .unwrap();
        assert_eq!(removed, dirs);
        assert!(!dirs[0].exists());
    }
}
