//! HTTP server module.
//!
//! Serves the router over plain HTTP (TLS is expected to terminate at a reverse
//! proxy) and drains connections gracefully on SIGTERM/SIGINT.

mod server;
mod shutdown;

pub use server::{start_server, ServerError};
