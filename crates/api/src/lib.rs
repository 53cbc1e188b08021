//! HTTP API layer for the attribution engine.

pub mod extractors;
pub mod response;
pub mod routes;
pub mod state;

pub use routes::router;
pub use state::AppState;
