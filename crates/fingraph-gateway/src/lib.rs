//! fingraph gateway - HTTP surface over the knowledge pipeline

pub mod error;
pub mod server;

pub use error::ApiError;
pub use server::{router, start_server, AppState};
