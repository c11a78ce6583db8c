//! Outcome classification for a single heartbeat attempt.
//!
//! Every initiator attempt resolves to exactly one of four results:
//! `SUCCESS`, `HTTP_FAILURE`, `TIMEOUT` or `EXCEPTION`. The classified
//! outcome doubles as the structured log record for the attempt.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CrossbeatError, Result};

/// Which way a heartbeat travels: source cloud -> target cloud.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    #[default]
    AToB,
    BToA,
}

impl Direction {
    /// Stable label used in log records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::AToB => "A_TO_B",
            Direction::BToA => "B_TO_A",
        }
    }

    /// The opposite direction (the peer's initiator).
    pub fn reverse(&self) -> Self {
        match self {
            Direction::AToB => Direction::BToA,
            Direction::BToA => Direction::AToB,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = CrossbeatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "a_to_b" => Ok(Direction::AToB),
            "b_to_a" => Ok(Direction::BToA),
            other => Err(CrossbeatError::Config(format!(
                "Unknown heartbeat direction '{}'. Use a_to_b or b_to_a",
                other
            ))),
        }
    }
}

/// Result class of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutcomeKind {
    /// Peer answered 200.
    Success,
    /// Peer answered with any other status.
    HttpFailure,
    /// No answer before the deadline.
    Timeout,
    /// Any other transport or protocol failure.
    Exception,
}

impl OutcomeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeKind::Success => "SUCCESS",
            OutcomeKind::HttpFailure => "HTTP_FAILURE",
            OutcomeKind::Timeout => "TIMEOUT",
            OutcomeKind::Exception => "EXCEPTION",
        }
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log level an outcome is reported at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warn,
    Error,
}

/// What the transport reported for an attempt, before classification.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptSignal {
    /// A response arrived. `latency_millis` is `None` when the chosen
    /// latency source has no value (reported as `N/A`).
    Response {
        status: u16,
        latency_millis: Option<f64>,
    },
    /// The request exceeded its deadline.
    Timeout(String),
    /// Connection, DNS, TLS or protocol failure.
    Transport(String),
}

impl AttemptSignal {
    /// Map a client error to a failure signal.
    pub fn from_reqwest_error(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            AttemptSignal::Timeout(err.to_string())
        } else {
            AttemptSignal::Transport(err.to_string())
        }
    }
}

/// Classified result of one initiator attempt; also the structured log record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatOutcome {
    /// Per-invocation identifier.
    pub invocation_id: Uuid,
    /// Attempt start, sampled once before the request is issued.
    #[serde(rename = "timestampUTC")]
    pub timestamp_utc: DateTime<Utc>,
    pub direction: Direction,
    pub result: OutcomeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_millis: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

/// Classify an attempt signal into an outcome.
///
/// Total over its input: every signal maps to exactly one `OutcomeKind`.
pub fn classify(
    timestamp_utc: DateTime<Utc>,
    direction: Direction,
    signal: AttemptSignal,
) -> HeartbeatOutcome {
    let mut outcome = HeartbeatOutcome {
        invocation_id: Uuid::new_v4(),
        timestamp_utc,
        direction,
        result: OutcomeKind::Exception,
        http_status: None,
        latency_millis: None,
        error_detail: None,
    };

    match signal {
        AttemptSignal::Response {
            status,
            latency_millis,
        } => {
            outcome.result = if status == 200 {
                OutcomeKind::Success
            } else {
                OutcomeKind::HttpFailure
            };
            outcome.http_status = Some(status);
            outcome.latency_millis = latency_millis;
        }
        AttemptSignal::Timeout(detail) => {
            outcome.result = OutcomeKind::Timeout;
            outcome.error_detail = Some(detail);
        }
        AttemptSignal::Transport(detail) => {
            outcome.result = OutcomeKind::Exception;
            outcome.error_detail = Some(detail);
        }
    }

    outcome
}

impl HeartbeatOutcome {
    /// Whether the peer answered 200.
    pub fn is_success(&self) -> bool {
        self.result == OutcomeKind::Success
    }

    /// Log level for this outcome: remote failures warn, no answer is an error.
    pub fn severity(&self) -> Severity {
        match self.result {
            OutcomeKind::Success => Severity::Info,
            OutcomeKind::HttpFailure => Severity::Warn,
            OutcomeKind::Timeout | OutcomeKind::Exception => Severity::Error,
        }
    }

    /// ISO-8601 attempt timestamp.
    pub fn timestamp_rfc3339(&self) -> String {
        self.timestamp_utc
            .to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Latency rendered for human-readable logs, `N/A` when unknown.
    pub fn latency_display(&self) -> String {
        match self.latency_millis {
            Some(ms) => format!("{:.2} ms", ms),
            None => "N/A".to_string(),
        }
    }

    /// One-line summary, e.g. `[A_TO_B] 2026-... SUCCESS 200, 120.00 ms`.
    pub fn summary(&self) -> String {
        let ts = self.timestamp_rfc3339();
        match (self.http_status, self.error_detail.as_deref()) {
            (Some(status), _) => format!(
                "[{}] {} {} {}, {}",
                self.direction,
                ts,
                self.result,
                status,
                self.latency_display()
            ),
            (None, Some(detail)) => {
                format!("[{}] {} {} {}", self.direction, ts, self.result, detail)
            }
            (None, None) => format!("[{}] {} {}", self.direction, ts, self.result),
        }
    }

    /// Serialized record as a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}
