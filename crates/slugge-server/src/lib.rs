pub mod config;
pub mod connection;
pub mod error;
pub mod handlers;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::ApiError;
pub use server::{build_router, start, ServerHandle};
pub use state::AppState;
