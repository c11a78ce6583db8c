//! Heartbeat exchange - token check, responder, outcome classification,
//! initiator and the interval scheduler that drives it.

pub mod initiator;
pub mod outcome;
pub mod responder;
pub mod scheduler;
pub mod token;

pub use initiator::{
    Acknowledgment, Initiator, InitiatorConfig, LatencySource, DEFAULT_TIMEOUT_SECS,
    PEER_LATENCY_HEADER,
};
pub use outcome::{
    classify, AttemptSignal, Direction, HeartbeatOutcome, OutcomeKind, Severity,
};
pub use responder::{HeartbeatRequest, HeartbeatResponse, HeartbeatStatus, Responder};
pub use scheduler::{HeartbeatScheduler, HeartbeatTask};
pub use token::{is_authorized, AUTH_HEADER};
