pub mod error;
pub mod handlers;
pub mod library;
pub mod middleware;
pub mod refresh;
pub mod routes;

pub use routes::create_router;
