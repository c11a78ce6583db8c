//! Initiator side of the heartbeat exchange.
//!
//! One invocation issues a single GET to the peer's responder, classifies
//! what happened and logs exactly one outcome record followed by exactly one
//! `completed` record. Check failures never escape `run()`.

use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::config::Secret;
use crate::error::{CrossbeatError, Result};

use super::outcome::{classify, AttemptSignal, Direction, HeartbeatOutcome, Severity};
use super::scheduler::HeartbeatTask;
use super::token::AUTH_HEADER;

/// Header a responder may set with its own handling time in milliseconds.
pub const PEER_LATENCY_HEADER: &str = "x-response-time-ms";

/// Deadline for a single attempt.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Where the reported latency comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencySource {
    /// Wall-clock time from request start to response headers, measured here.
    #[default]
    Local,
    /// The peer's `x-response-time-ms` header; `N/A` when absent.
    PeerHeader,
}

impl fmt::Display for LatencySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LatencySource::Local => f.write_str("local"),
            LatencySource::PeerHeader => f.write_str("peer_header"),
        }
    }
}

impl FromStr for LatencySource {
    type Err = CrossbeatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "local" => Ok(LatencySource::Local),
            "peer_header" | "peer" => Ok(LatencySource::PeerHeader),
            other => Err(CrossbeatError::Config(format!(
                "Unknown latency source '{}'. Use local or peer_header",
                other
            ))),
        }
    }
}

/// Everything an initiator needs, resolved at startup.
#[derive(Debug, Clone)]
pub struct InitiatorConfig {
    /// Role name of this side, used in log records.
    pub role: String,
    pub direction: Direction,
    pub secret: Secret,
    /// The peer's responder URL.
    pub peer_endpoint: Url,
    pub timeout: Duration,
    pub latency_source: LatencySource,
}

impl InitiatorConfig {
    pub fn new(role: &str, direction: Direction, secret: Secret, peer_endpoint: Url) -> Self {
        Self {
            role: role.to_string(),
            direction,
            secret,
            peer_endpoint,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            latency_source: LatencySource::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_latency_source(mut self, latency_source: LatencySource) -> Self {
        self.latency_source = latency_source;
        self
    }
}

/// Fixed reply handed back to the invoking scheduler or platform.
///
/// Always `200`: it reports that the invocation ran, not that the peer is up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgment {
    pub status_code: u16,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Acknowledgment {
    pub fn completed() -> Self {
        Self {
            status_code: 200,
            message: "Execution completed".to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Issues heartbeat checks to the peer.
pub struct Initiator {
    config: InitiatorConfig,
    auth_value: HeaderValue,
    client: Client,
}

impl Initiator {
    /// Build the initiator and its HTTP client.
    pub fn new(config: InitiatorConfig) -> Result<Self> {
        let mut auth_value = HeaderValue::from_str(config.secret.expose()).map_err(|_| {
            CrossbeatError::Config("Heartbeat secret is not a valid header value".to_string())
        })?;
        auth_value.set_sensitive(true);

        let client = Client::builder()
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            config,
            auth_value,
            client,
        })
    }

    pub fn config(&self) -> &InitiatorConfig {
        &self.config
    }

    /// Run one heartbeat attempt against the peer.
    pub async fn run(&self) -> HeartbeatOutcome {
        let started_at = Utc::now();
        let _completion = CompletionGuard {
            role: &self.config.role,
            direction: self.config.direction,
            started_at,
        };

        let signal = self.attempt().await;
        let outcome = classify(started_at, self.config.direction, signal);
        emit_outcome(&self.config.role, &outcome);
        outcome
    }

    /// Platform reply for a finished invocation.
    pub fn acknowledge(&self, _outcome: &HeartbeatOutcome) -> Acknowledgment {
        Acknowledgment::completed()
    }

    async fn attempt(&self) -> AttemptSignal {
        let start = Instant::now();
        let sent = self
            .client
            .get(self.config.peer_endpoint.clone())
            .header(AUTH_HEADER, self.auth_value.clone())
            .send()
            .await;

        match sent {
            Ok(response) => {
                let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
                let latency_millis = match self.config.latency_source {
                    LatencySource::Local => Some(elapsed_ms),
                    LatencySource::PeerHeader => peer_latency(response.headers()),
                };
                AttemptSignal::Response {
                    status: response.status().as_u16(),
                    latency_millis,
                }
            }
            Err(e) => AttemptSignal::from_reqwest_error(&e),
        }
    }
}

#[async_trait]
impl HeartbeatTask for Initiator {
    fn name(&self) -> &str {
        &self.config.role
    }

    async fn run(&self) -> HeartbeatOutcome {
        Initiator::run(self).await
    }
}

/// Parse the peer-advertised latency header.
fn peer_latency(headers: &HeaderMap) -> Option<f64> {
    headers
        .get(PEER_LATENCY_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok())
        .filter(|ms| ms.is_finite() && *ms >= 0.0)
}

// Field names follow the outcome record contract.
macro_rules! outcome_event {
    ($level:ident, $role:expr, $outcome:expr) => {
        $level!(
            event = "heartbeat_outcome",
            role = %$role,
            invocationId = %$outcome.invocation_id,
            direction = %$outcome.direction,
            timestampUTC = %$outcome.timestamp_rfc3339(),
            result = %$outcome.result,
            httpStatus = $outcome.http_status,
            latencyMillis = $outcome.latency_millis,
            errorDetail = $outcome.error_detail.as_deref(),
            "{}",
            $outcome.summary()
        )
    };
}

fn emit_outcome(role: &str, outcome: &HeartbeatOutcome) {
    match outcome.severity() {
        Severity::Info => outcome_event!(info, role, outcome),
        Severity::Warn => outcome_event!(warn, role, outcome),
        Severity::Error => outcome_event!(error, role, outcome),
    }
}

/// Logs the `completed` record when an invocation scope ends, on any path.
struct CompletionGuard<'a> {
    role: &'a str,
    direction: Direction,
    started_at: DateTime<Utc>,
}

impl Drop for CompletionGuard<'_> {
    fn drop(&mut self) {
        let timestamp = self
            .started_at
            .to_rfc3339_opts(SecondsFormat::Micros, true);
        info!(
            event = "heartbeat_completed",
            role = %self.role,
            direction = %self.direction,
            timestampUTC = %timestamp,
            result = "completed",
            "[{}] {} Completed.",
            self.direction,
            timestamp
        );
    }
}
