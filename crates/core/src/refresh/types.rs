use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Kinds of background refresh work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshKind {
    Overall,
    Movies,
    Shows,
    Episodes,
    HostLibrary,
    RemoteList,
}

impl RefreshKind {
    /// Order in which pending kinds are started, highest priority first.
    pub const PRIORITY: [RefreshKind; 6] = [
        RefreshKind::HostLibrary,
        RefreshKind::RemoteList,
        RefreshKind::Movies,
        RefreshKind::Shows,
        RefreshKind::Episodes,
        RefreshKind::Overall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RefreshKind::Overall => "overall",
            RefreshKind::Movies => "movies",
            RefreshKind::Shows => "shows",
            RefreshKind::Episodes => "episodes",
            RefreshKind::HostLibrary => "host_library",
            RefreshKind::RemoteList => "remote_list",
        }
    }
}

impl fmt::Display for RefreshKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefreshKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RefreshKind::PRIORITY
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown refresh kind: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshPhase {
    #[default]
    Idle,
    Pending,
    Running,
}

/// Events driving a kind through `Idle -> Pending -> Running -> Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Request,
    Start,
    Finish,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("{kind} cannot start while {running} is running")]
    Busy {
        kind: RefreshKind,
        running: RefreshKind,
    },

    #[error("{kind} cannot {transition:?} from {phase:?}")]
    Invalid {
        kind: RefreshKind,
        phase: RefreshPhase,
        transition: Transition,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct KindStatus {
    pub kind: RefreshKind,
    pub phase: RefreshPhase,
    /// Requested again while running.
    pub rerun_requested: bool,
}

/// Snapshot of the coordinator for the API.
#[derive(Debug, Clone, Serialize)]
pub struct RefreshStatus {
    pub running: bool,
    pub initialized: bool,
    pub kinds: Vec<KindStatus>,
    pub pending_shows: usize,
}
