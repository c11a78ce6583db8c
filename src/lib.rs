//! Crossbeat - cross-cloud heartbeat between two independently deployed
//! endpoints. Each side answers authenticated liveness checks and
//! periodically checks its peer, logging one structured record per attempt.

pub mod config;
pub mod error;
pub mod gateway;
pub mod heartbeat;
pub mod utils;

pub use config::{HeartbeatConfig, Secret};
pub use error::{CrossbeatError, Result};
