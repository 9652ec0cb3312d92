//! HTTP gateway for the asset packager.

pub mod config;
pub mod error;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::Server;
