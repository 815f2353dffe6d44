//! HTTP server for build metadata and health endpoints
//!
//! Conventionally mounted under `/-/`:
//! - `/-/info` - Build metadata
//! - `/-/alive` - Liveness probe (should the process be restarted)
//! - `/-/ready` - Readiness probe (should the process receive traffic)
//! - `/-/ping` - Always `pong`

mod handler;

pub use handler::{
    run_meta_server, serve, MetaHandler, ALIVE_PATH, BASE_PATH, INFO_PATH, PING_PATH, READY_PATH,
};

#[cfg(test)]
#[path = "handler_test.rs"]
mod tests;
