//! Utility modules for Crossbeat.

pub mod logging;
