//! Configuration for Crossbeat
//!
//! Values are read once at startup from the process environment (after
//! loading a `.env` file if one exists) and then shared read-only by the
//! responder and initiator.
//!
//! | Variable                   | Default        |
//! |----------------------------|----------------|
//! | `HEARTBEAT_SECRET`         | required       |
//! | `PEER_ENDPOINT`            | required for checks |
//! | `HEARTBEAT_ROLE`           | `a`            |
//! | `HEARTBEAT_DIRECTION`      | `a_to_b`       |
//! | `HEARTBEAT_TIMEOUT_SECS`   | `10`           |
//! | `HEARTBEAT_INTERVAL`       | `5m`           |
//! | `HEARTBEAT_LATENCY_SOURCE` | `local`        |
//! | `HEARTBEAT_BIND`           | `0.0.0.0:8080` |
//! | `HEARTBEAT_LOG_FORMAT`     | `json`         |

use std::fmt;
use std::net::SocketAddr;
use std::time::Duration;

use reqwest::Url;

use crate::error::{CrossbeatError, Result};
use crate::heartbeat::{Direction, InitiatorConfig, LatencySource, Responder, DEFAULT_TIMEOUT_SECS};
use crate::utils::logging::LogFormat;

pub const SECRET_VAR: &str = "HEARTBEAT_SECRET";
/// Older deployments named the secret this way.
pub const LEGACY_SECRET_VAR: &str = "HTTPHEARTBEAT_SECRET";
pub const PEER_ENDPOINT_VAR: &str = "PEER_ENDPOINT";
pub const ROLE_VAR: &str = "HEARTBEAT_ROLE";
pub const DIRECTION_VAR: &str = "HEARTBEAT_DIRECTION";
pub const TIMEOUT_VAR: &str = "HEARTBEAT_TIMEOUT_SECS";
pub const INTERVAL_VAR: &str = "HEARTBEAT_INTERVAL";
pub const LATENCY_SOURCE_VAR: &str = "HEARTBEAT_LATENCY_SOURCE";
pub const BIND_VAR: &str = "HEARTBEAT_BIND";
pub const LOG_FORMAT_VAR: &str = "HEARTBEAT_LOG_FORMAT";

const DEFAULT_ROLE: &str = "a";
const DEFAULT_INTERVAL_SECS: u64 = 300;
const DEFAULT_PORT: u16 = 8080;

/// Shared heartbeat token. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a token. An empty token is rejected so checks fail closed.
    ///
    /// The token travels in an HTTP header, so it must be printable ASCII
    /// without leading or trailing whitespace; anything else would reach the
    /// peer altered and never match.
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(CrossbeatError::Config(format!(
                "{} must not be empty",
                SECRET_VAR
            )));
        }
        if !value.bytes().all(|b| (b' '..=b'~').contains(&b)) {
            return Err(CrossbeatError::Config(format!(
                "{} must contain only printable ASCII characters",
                SECRET_VAR
            )));
        }
        if value.trim() != value {
            return Err(CrossbeatError::Config(format!(
                "{} must not start or end with whitespace",
                SECRET_VAR
            )));
        }
        Ok(Self(value))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Process-wide heartbeat configuration.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Role name of this side (e.g. "aws", "azure").
    pub role: String,
    /// Direction of this side's outbound checks.
    pub direction: Direction,
    pub secret: Secret,
    /// Peer responder URL; only the initiator needs it.
    pub peer_endpoint: Option<String>,
    pub timeout: Duration,
    pub interval: Duration,
    pub latency_source: LatencySource,
    pub bind: SocketAddr,
    pub log_format: LogFormat,
}

impl HeartbeatConfig {
    /// Create a config with defaults for everything except the secret.
    pub fn new(secret: Secret) -> Self {
        Self {
            role: DEFAULT_ROLE.to_string(),
            direction: Direction::default(),
            secret,
            peer_endpoint: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            latency_source: LatencySource::default(),
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            log_format: LogFormat::default(),
        }
    }

    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let secret = var(SECRET_VAR)
            .or_else(|| var(LEGACY_SECRET_VAR))
            .ok_or_else(|| CrossbeatError::Config(format!("{} is not set", SECRET_VAR)))?;
        let mut config = Self::new(Secret::new(secret)?);

        if let Some(role) = var(ROLE_VAR) {
            config.role = role.trim().to_string();
        }
        if let Some(direction) = var(DIRECTION_VAR) {
            config.direction = direction.parse()?;
        }
        config.peer_endpoint = var(PEER_ENDPOINT_VAR).map(|v| v.trim().to_string());
        if let Some(timeout) = var(TIMEOUT_VAR) {
            let secs: u64 = timeout.trim().parse().map_err(|_| {
                CrossbeatError::Config(format!("{} must be a whole number of seconds", TIMEOUT_VAR))
            })?;
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(interval) = var(INTERVAL_VAR) {
            config.interval = Duration::from_secs(parse_interval(&interval)?);
        }
        if let Some(source) = var(LATENCY_SOURCE_VAR) {
            config.latency_source = source.parse()?;
        }
        if let Some(bind) = var(BIND_VAR) {
            config.bind = bind.trim().parse().map_err(|_| {
                CrossbeatError::Config(format!("Invalid {} address '{}'", BIND_VAR, bind))
            })?;
        }
        if let Some(format) = var(LOG_FORMAT_VAR) {
            config.log_format = format.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values that cannot be expressed by the field types.
    pub fn validate(&self) -> Result<()> {
        if self.role.is_empty() {
            return Err(CrossbeatError::Config(format!("{} must not be empty", ROLE_VAR)));
        }
        if self.timeout.is_zero() {
            return Err(CrossbeatError::Config(format!(
                "{} must be greater than zero",
                TIMEOUT_VAR
            )));
        }
        if let Some(endpoint) = &self.peer_endpoint {
            parse_peer_endpoint(endpoint)?;
        }
        Ok(())
    }

    /// Responder guarding this side.
    pub fn responder(&self) -> Responder {
        Responder::new(&self.role, self.secret.clone())
    }

    /// Initiator settings; fails when no peer endpoint is configured.
    pub fn initiator(&self) -> Result<InitiatorConfig> {
        let endpoint = self.peer_endpoint.as_deref().ok_or_else(|| {
            CrossbeatError::Config(format!("{} is not set", PEER_ENDPOINT_VAR))
        })?;
        let url = parse_peer_endpoint(endpoint)?;

        Ok(
            InitiatorConfig::new(&self.role, self.direction, self.secret.clone(), url)
                .with_timeout(self.timeout)
                .with_latency_source(self.latency_source),
        )
    }
}

/// Parse and check a peer URL: only http/https with a host.
pub fn parse_peer_endpoint(endpoint: &str) -> Result<Url> {
    let url = Url::parse(endpoint.trim()).map_err(|e| {
        CrossbeatError::Config(format!("Invalid {} '{}': {}", PEER_ENDPOINT_VAR, endpoint, e))
    })?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(CrossbeatError::Config(format!(
                "{} must be http or https, got '{}'",
                PEER_ENDPOINT_VAR, other
            )));
        }
    }
    if url.host_str().is_none() {
        return Err(CrossbeatError::Config(format!(
            "{} has no host",
            PEER_ENDPOINT_VAR
        )));
    }

    Ok(url)
}

/// Parse interval string like "1h", "30m", "15m", "60s" into seconds.
pub fn parse_interval(s: &str) -> Result<u64> {
    let s = s.trim().to_lowercase();
    let invalid = || {
        CrossbeatError::Config(format!(
            "Invalid interval '{}'. Use formats like 1h, 30m, or 60s",
            s
        ))
    };

    let (digits, multiplier) = if let Some(hours) = s.strip_suffix('h') {
        (hours, 3600)
    } else if let Some(mins) = s.strip_suffix('m') {
        (mins, 60)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1)
    } else {
        (s.as_str(), 1)
    };

    let n: u64 = digits.trim().parse().map_err(|_| invalid())?;
    n.checked_mul(multiplier).ok_or_else(invalid)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<HeartbeatConfig> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        HeartbeatConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[(SECRET_VAR, "abc123")]).unwrap();
        assert_eq!(config.secret.expose(), "abc123");
        assert_eq!(config.role, "a");
        assert_eq!(config.direction, Direction::AToB);
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.interval, Duration::from_secs(300));
        assert_eq!(config.latency_source, LatencySource::Local);
        assert_eq!(config.bind.port(), 8080);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.peer_endpoint.is_none());
    }

    #[test]
    fn test_full_environment() {
        let config = load(&[
            (SECRET_VAR, "abc123"),
            (PEER_ENDPOINT_VAR, "https://peer.example.com/api/heartbeat"),
            (ROLE_VAR, "azure"),
            (DIRECTION_VAR, "b_to_a"),
            (TIMEOUT_VAR, "3"),
            (INTERVAL_VAR, "1m"),
            (LATENCY_SOURCE_VAR, "peer_header"),
            (BIND_VAR, "127.0.0.1:9000"),
            (LOG_FORMAT_VAR, "text"),
        ])
        .unwrap();

        assert_eq!(config.role, "azure");
        assert_eq!(config.direction, Direction::BToA);
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.latency_source, LatencySource::PeerHeader);
        assert_eq!(config.bind.to_string(), "127.0.0.1:9000");
        assert_eq!(config.log_format, LogFormat::Text);

        let initiator = config.initiator().unwrap();
        assert_eq!(initiator.peer_endpoint.host_str(), Some("peer.example.com"));
        assert_eq!(initiator.timeout, Duration::from_secs(3));
        assert_eq!(initiator.direction, Direction::BToA);
    }

    #[test]
    fn test_legacy_secret_variable() {
        let config = load(&[(LEGACY_SECRET_VAR, "legacy")]).unwrap();
        assert_eq!(config.secret.expose(), "legacy");
    }

    #[test]
    fn test_blank_secret_falls_back_to_legacy_variable() {
        let config = load(&[(SECRET_VAR, ""), (LEGACY_SECRET_VAR, "legacy")]).unwrap();
        assert_eq!(config.secret.expose(), "legacy");

        let config = load(&[(SECRET_VAR, "   "), (LEGACY_SECRET_VAR, "legacy")]).unwrap();
        assert_eq!(config.secret.expose(), "legacy");
    }

    #[test]
    fn test_secret_must_survive_header_transport() {
        for bad in ["pässwörd", "abc123 ", " abc123", "\tabc123", "abc\n123", "abc\u{7f}"] {
            assert!(
                matches!(Secret::new(bad), Err(CrossbeatError::Config(_))),
                "{:?} should be rejected",
                bad
            );
        }
        assert!(Secret::new("abc 123").is_ok());
        assert!(Secret::new("A-z_0.9~!@#$%^&*()").is_ok());
        assert!(load(&[(SECRET_VAR, "abc123 ")]).is_err());
    }

    #[test]
    fn test_missing_or_empty_secret_is_rejected() {
        assert!(matches!(load(&[]), Err(CrossbeatError::Config(_))));
        assert!(matches!(
            load(&[(SECRET_VAR, "")]),
            Err(CrossbeatError::Config(_))
        ));
    }

    #[test]
    fn test_initiator_requires_peer_endpoint() {
        let config = load(&[(SECRET_VAR, "abc123")]).unwrap();
        assert!(config.initiator().is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let bad = [
            (PEER_ENDPOINT_VAR, "ftp://peer.example.com"),
            (PEER_ENDPOINT_VAR, "not a url"),
            (DIRECTION_VAR, "up"),
            (TIMEOUT_VAR, "ten"),
            (TIMEOUT_VAR, "0"),
            (INTERVAL_VAR, "soon"),
            (LATENCY_SOURCE_VAR, "guess"),
            (BIND_VAR, "localhost"),
        ];
        for (key, value) in bad {
            let result = load(&[(SECRET_VAR, "abc123"), (key, value)]);
            assert!(result.is_err(), "{}={} should be rejected", key, value);
        }
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let secret = Secret::new("hunter2").unwrap();
        assert_eq!(format!("{:?}", secret), "Secret(***)");
        let config = HeartbeatConfig::new(secret);
        assert!(!format!("{:?}", config).contains("hunter2"));
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("1h").unwrap(), 3600);
        assert_eq!(parse_interval("30m").unwrap(), 1800);
        assert_eq!(parse_interval("60s").unwrap(), 60);
        assert_eq!(parse_interval("3600").unwrap(), 3600);
        assert!(parse_interval("abc").is_err());
        assert!(parse_interval("").is_err());
    }
}
