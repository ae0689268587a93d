//! Clausewise HTTP surface — contract analysis and per-caller transcripts.

pub mod routes;
pub mod state;
pub mod transcripts;

pub use routes::build_router;
pub use state::AppState;
