//! Authoritative RTS game server library.

pub mod commands;
pub mod config;
pub mod rules;
pub mod server;

// Re-export commonly used types
pub use commands::CommandError;
pub use config::Config;
pub use server::{run, serve, ServerState};
