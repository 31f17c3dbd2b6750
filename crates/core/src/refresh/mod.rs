//! Refresh coordination.
//!
//! Background work is split into [`RefreshKind`]s. Each kind moves through
//! `Idle -> Pending -> Running -> Idle`; callers only ever request Pending,
//! and the coordinator starts the highest-priority pending kind once nothing
//! else is running:
//! - **Exclusive**: at most one kind runs system-wide
//! - **Ordered**: HostLibrary > RemoteList > Movies > Shows > Episodes > Overall
//! - **Gated**: nothing starts until the startup Overall refresh completed

mod coordinator;
mod state;
mod types;

pub use coordinator::{RefreshCoordinator, TriggerAction, UpdateGate};
pub use state::{select_next, RefreshState};
pub use types::{
    KindStatus, RefreshKind, RefreshPhase, RefreshStatus, Transition, TransitionError,
};

use async_trait::async_trait;

use crate::error::LibraryError;

/// Executes the work behind each refresh kind.
#[async_trait]
pub trait RefreshRunner: Send + Sync {
    async fn run_refresh(&self, kind: RefreshKind) -> Result<(), LibraryError>;

    /// Periodic cleanup of the ledger. Returns the number of records cleared.
    async fn run_maintenance(&self) -> Result<usize, LibraryError>;

    /// Shutdown signal; long passes stop at the next item boundary.
    fn close(&self) {}
}
