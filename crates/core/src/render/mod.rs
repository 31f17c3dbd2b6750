//! Artifact rendering.
//!
//! Turns metadata into `.strm` (and optionally `.nfo`) files under the
//! library root, and removes them again.

mod links;
mod strm;

pub use links::{episode_link, movie_link, parse_link, PlayLink};
pub use strm::{RenderConfig, StrmRenderer, MOVIES_DIR, SHOWS_DIR};

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::metadata::{Episode, Movie, Show};

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("nothing to render: {0}")]
    Empty(String),
}

impl RenderError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RenderError::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RenderOptions {
    /// Overwrite artifacts that already exist.
    pub force: bool,
}

/// A show render request.
#[derive(Debug, Clone)]
pub struct ShowRender<'a> {
    pub show: &'a Show,
    pub episodes: &'a [Episode],
    /// Directory already holding artifacts for this show, if any.
    pub existing_dir: Option<PathBuf>,
}

#[async_trait]
pub trait Renderer: Send + Sync {
    /// Write the artifacts for a movie. Returns the files written.
    async fn render_movie(
        &self,
        movie: &Movie,
        options: RenderOptions,
    ) -> Result<Vec<PathBuf>, RenderError>;

    /// Write episode artifacts for a show. Returns the files written.
    async fn render_show(
        &self,
        request: &ShowRender<'_>,
        options: RenderOptions,
    ) -> Result<Vec<PathBuf>, RenderError>;

    /// Name-derived directories that would hold this movie's artifacts.
    fn movie_dirs(&self, movie: &Movie) -> Vec<PathBuf>;

    /// Name-derived directories that would hold this show's artifacts.
    fn show_dirs(&self, show: &Show) -> Vec<PathBuf>;

    /// Delete files or directories. Missing paths are skipped.
    ///
    /// Returns the paths actually removed.
    async fn remove_artifacts(&self, paths: &[PathBuf]) -> Result<Vec<PathBuf>, RenderError>;
}
