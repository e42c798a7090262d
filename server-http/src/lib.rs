pub mod api;
pub mod bootstrap;
pub mod handlers;
pub mod routes;
pub mod state;

// Re-export key types
pub use bootstrap::build_backends;
pub use routes::build_router;
pub use state::{AppState, Backend};
