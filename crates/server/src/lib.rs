//! HTTP control surface for the vlibrary daemon.

pub mod api;
pub mod metrics;
pub mod state;
