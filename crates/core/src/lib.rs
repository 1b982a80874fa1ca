//! Bootstrap launcher for the Qdrant MCP server.
//!
//! Resolves the server's runtime configuration from the environment (falling
//! back to built-in defaults) and starts `mcp-server-qdrant` with it. The
//! server's exit code is passed through unchanged.

pub mod config;
pub mod launcher;

pub use config::{ConfigKey, RuntimeConfig, ValueSource};
pub use launcher::{
    DEFAULT_SERVER_BIN, LaunchError, Launcher, Running, SERVER_BIN_ENV, SERVER_PORT,
    ServerCommand, TRANSPORT_ENV, Transport, exit_code,
};
