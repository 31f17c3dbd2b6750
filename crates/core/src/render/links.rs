//! Play links written into `.strm` artifacts.
//!
//! The link is the only thing the duplicate index reads back, so it must
//! carry every id needed to recognise the artifact.

use once_cell::sync::Lazy;
use regex_lite::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayLink {
    Movie { id: u32 },
    Episode { show_id: u32, season: u32, episode: u32 },
}

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^plugin://[^/]+/library/(?:movie/play/(\d+)|show/play/(\d+)/(\d+)/(\d+))/?$")
        .expect("play link regex is valid")
});

pub fn movie_link(plugin_id: &str, id: u32) -> String {
    format!("plugin://{}/library/movie/play/{}", plugin_id, id)
}

pub fn episode_link(plugin_id: &str, show_id: u32, season: u32, episode: u32) -> String {
    format!(
        "plugin://{}/library/show/play/{}/{}/{}",
        plugin_id, show_id, season, episode
    )
}

/// Parse the content of a `.strm` file. Foreign links yield `None`.
pub fn parse_link(content: &str) -> Option<PlayLink> {
    let caps = LINK_RE.captures(content.trim())?;
    if let Some(id) = caps.get(1) {
        return Some(PlayLink::Movie {
            id: id.as_str().parse().ok()?,
        });
    }
    Some(PlayLink::Episode {
        show_id: caps.get(2)?.as_str().parse().ok()?,
        season: caps.get(3)?.as_str().parse().ok()?,
        episode: caps.get(4)?.as_str().parse().ok()?,
    })
}
