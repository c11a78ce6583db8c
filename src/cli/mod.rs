//! Command implementations for the `crossbeat` binary.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::{info, warn};

use crossbeat::config::parse_interval;
use crossbeat::gateway;
use crossbeat::heartbeat::{HeartbeatScheduler, HeartbeatTask, Initiator};
use crossbeat::HeartbeatConfig;

/// Flags that override values read from the environment.
#[derive(Args, Debug, Default, Clone)]
pub(crate) struct Overrides {
    /// Role name of this side, used in logs
    #[arg(long, global = true)]
    pub role: Option<String>,

    /// Direction of outbound checks (a_to_b or b_to_a)
    #[arg(long, global = true)]
    pub direction: Option<String>,

    /// Peer responder URL
    #[arg(long, global = true)]
    pub peer: Option<String>,

    /// Responder listen address
    #[arg(long, global = true)]
    pub bind: Option<SocketAddr>,

    /// Check interval (e.g. 30s, 5m, 1h)
    #[arg(long, global = true)]
    pub interval: Option<String>,

    /// Per-attempt timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Latency source (local or peer_header)
    #[arg(long, global = true)]
    pub latency_source: Option<String>,

    /// Log format (json or text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,
}

impl Overrides {
    /// Apply flags on top of an environment-derived config.
    pub fn apply(&self, mut config: HeartbeatConfig) -> crossbeat::Result<HeartbeatConfig> {
        if let Some(role) = &self.role {
            config.role = role.trim().to_string();
        }
        if let Some(direction) = &self.direction {
            config.direction = direction.parse()?;
        }
        if let Some(peer) = &self.peer {
            config.peer_endpoint = Some(peer.trim().to_string());
        }
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(interval) = &self.interval {
            config.interval = Duration::from_secs(parse_interval(interval)?);
        }
        if let Some(timeout) = self.timeout {
            config.timeout = Duration::from_secs(timeout);
        }
        if let Some(source) = &self.latency_source {
            config.latency_source = source.parse()?;
        }
        if let Some(format) = &self.log_format {
            config.log_format = format.parse()?;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Resolves on Ctrl+C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn build_initiator(config: &HeartbeatConfig) -> Result<Arc<Initiator>> {
    let initiator_config = config
        .initiator()
        .context("Initiator needs a peer endpoint")?;
    let initiator = Initiator::new(initiator_config).context("Failed to build HTTP client")?;
    Ok(Arc::new(initiator))
}

/// Serve the responder until Ctrl+C.
pub(crate) async fn cmd_respond(config: HeartbeatConfig) -> Result<()> {
    let responder = Arc::new(config.responder());
    gateway::serve(config.bind, responder, shutdown_signal())
        .await
        .with_context(|| format!("Responder failed on {}", config.bind))
}

/// Run a single check and print the platform acknowledgment.
pub(crate) async fn cmd_check(config: HeartbeatConfig) -> Result<()> {
    let initiator = build_initiator(&config)?;
    let outcome = initiator.run().await;
    let ack = initiator.acknowledge(&outcome);
    println!("{}", serde_json::to_string_pretty(&ack)?);
    Ok(())
}

/// Check the peer on an interval until Ctrl+C.
pub(crate) async fn cmd_schedule(config: HeartbeatConfig) -> Result<()> {
    let task: Arc<dyn HeartbeatTask> = build_initiator(&config)?;
    let scheduler = HeartbeatScheduler::new(task, config.interval);

    scheduler.start().await;
    shutdown_signal().await;
    scheduler.stop().await;
    Ok(())
}

/// Serve the responder and check the peer on an interval, until Ctrl+C.
pub(crate) async fn cmd_run(config: HeartbeatConfig) -> Result<()> {
    let task: Arc<dyn HeartbeatTask> = build_initiator(&config)?;
    let scheduler = HeartbeatScheduler::new(task, config.interval);
    let responder = Arc::new(config.responder());

    scheduler.start().await;
    let served = gateway::serve(config.bind, responder, shutdown_signal()).await;
    scheduler.stop().await;

    served.with_context(|| format!("Responder failed on {}", config.bind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeat::heartbeat::{Direction, LatencySource};
    use crossbeat::utils::logging::LogFormat;
    use crossbeat::Secret;

    fn base() -> HeartbeatConfig {
        HeartbeatConfig::new(Secret::new("abc123").unwrap())
    }

    #[test]
    fn test_empty_overrides_keep_config() {
        let config = Overrides::default().apply(base()).unwrap();
        assert_eq!(config.role, "a");
        assert_eq!(config.direction, Direction::AToB);
        assert!(config.peer_endpoint.is_none());
    }

    #[test]
    fn test_overrides_apply() {
        let overrides = Overrides {
            role: Some("azure".into()),
            direction: Some("b_to_a".into()),
            peer: Some("https://peer.example.com/".into()),
            bind: Some("127.0.0.1:9001".parse().unwrap()),
            interval: Some("90s".into()),
            timeout: Some(4),
            latency_source: Some("peer_header".into()),
            log_format: Some("text".into()),
        };
        let config = overrides.apply(base()).unwrap();

        assert_eq!(config.role, "azure");
        assert_eq!(config.direction, Direction::BToA);
        assert_eq!(config.peer_endpoint.as_deref(), Some("https://peer.example.com/"));
        assert_eq!(config.bind.port(), 9001);
        assert_eq!(config.interval, Duration::from_secs(90));
        assert_eq!(config.timeout, Duration::from_secs(4));
        assert_eq!(config.latency_source, LatencySource::PeerHeader);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let overrides = Overrides {
            peer: Some("file:///etc/passwd".into()),
            ..Overrides::default()
        };
        assert!(overrides.apply(base()).is_err());
    }

    #[test]
    fn test_build_initiator_requires_peer() {
        assert!(build_initiator(&base()).is_err());
    }
}
