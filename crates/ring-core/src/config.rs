//! Configuration system for ringd.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. explicit path (first CLI argument to ringd)
//!   2. $RING_CONFIG
//!   3. $XDG_CONFIG_HOME/ringd/config.toml
//!   4. ~/.config/ringd/config.toml

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ring::{NodeId, NodeIdentity, RingError, RingMembership};
use crate::wire::MAX_DATA_LEN;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    pub node: NodeConfig,
    pub timing: TimingConfig,
    pub events: EventsConfig,
    /// Application sends performed every time this node holds the token.
    pub on_hold: Vec<HoldSend>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// This node's id. Must appear in `ring`.
    pub id: NodeId,
    /// Local UDP address to bind.
    pub bind: SocketAddr,
    /// Every member of the ring, this node included. Order does not matter.
    pub ring: Vec<NodeId>,
    /// Relay address every datagram is sent to.
    pub relay: SocketAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Minimum time a node holds the token before forwarding it.
    pub hold_min_ms: u64,
    /// Silence after which the origin regenerates the token.
    pub token_timeout_ms: u64,
    /// Upper bound on one wait of the logic loop.
    pub poll_interval_ms: u64,
    /// Delay before the origin creates the very first token.
    pub settle_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Event log file. Empty = `node{id}_events.jsonl` in the working directory.
    pub path: PathBuf,
}

/// One application send. `to = None` broadcasts to every other member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldSend {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<NodeId>,
    pub data: String,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            timing: TimingConfig::default(),
            events: EventsConfig::default(),
            on_hold: vec![
                HoldSend {
                    to: Some(2),
                    data: "Hello Node2".into(),
                },
                HoldSend {
                    to: Some(3),
                    data: "Hello Node3".into(),
                },
            ],
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            id: 1,
            bind: SocketAddr::from(([127, 0, 0, 1], 5001)),
            ring: vec![1, 2, 3],
            relay: SocketAddr::from(([127, 0, 0, 1], 5002)),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            hold_min_ms: 100,
            token_timeout_ms: 1000,
            poll_interval_ms: 100,
            settle_delay_ms: 2000,
        }
    }
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
        }
    }
}

impl TimingConfig {
    pub fn hold_min(&self) -> Duration {
        Duration::from_millis(self.hold_min_ms)
    }

    pub fn token_timeout(&self) -> Duration {
        Duration::from_millis(self.token_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("ringd")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
    #[error("invalid ring: {0}")]
    Ring(#[from] RingError),
    #[error("on_hold entry for {to:?} is {len} bytes, maximum {MAX_DATA_LEN}")]
    HoldPayloadTooLarge { to: Option<NodeId>, len: usize },
    #[error("on_hold destination {0} is not a ring member")]
    UnknownHoldDestination(NodeId),
    #[error("timing value {0} must be greater than zero")]
    ZeroTiming(&'static str),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl RingConfig {
    /// Load config from the default location: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::file_path())
    }

    /// Load config from `path` (defaults when the file does not exist),
    /// then apply env overrides.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(path)
                .map_err(|e| ConfigError::ReadFailed(path.to_path_buf(), e))?;
            Self::from_toml(&text).map_err(|e| ConfigError::ParseFailed(path.to_path_buf(), e))?
        } else {
            RingConfig::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("RING_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config to `path` if nothing is there. Returns the path.
    pub fn write_default_if_missing(path: &Path) -> Result<PathBuf, ConfigError> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
            }
            let text = toml::to_string_pretty(&RingConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(path, text)
                .map_err(|e| ConfigError::WriteFailed(path.to_path_buf(), e))?;
        }
        Ok(path.to_path_buf())
    }

    /// Event log path with the per-node default filled in.
    pub fn events_path(&self) -> PathBuf {
        if self.events.path.as_os_str().is_empty() {
            PathBuf::from(format!("node{}_events.jsonl", self.node.id))
        } else {
            self.events.path.clone()
        }
    }

    /// Check the config and build this node's identity from it.
    pub fn identity(&self) -> Result<NodeIdentity, ConfigError> {
        let ring = RingMembership::new(self.node.ring.iter().copied())?;
        let identity = NodeIdentity::new(self.node.id, self.node.bind, ring)?;

        for (name, value) in [
            ("hold_min_ms", self.timing.hold_min_ms),
            ("token_timeout_ms", self.timing.token_timeout_ms),
            ("poll_interval_ms", self.timing.poll_interval_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroTiming(name));
            }
        }

        for send in &self.on_hold {
            if send.data.len() > MAX_DATA_LEN {
                return Err(ConfigError::HoldPayloadTooLarge {
                    to: send.to,
                    len: send.data.len(),
                });
            }
            if let Some(to) = send.to {
                if !identity.ring().contains(to) {
                    return Err(ConfigError::UnknownHoldDestination(to));
                }
            }
        }

        Ok(identity)
    }

    /// Apply RING_* env var overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("RING_NODE__ID") {
            if let Ok(id) = v.parse() {
                self.node.id = id;
            }
        }
        if let Ok(v) = std::env::var("RING_NODE__BIND") {
            if let Ok(addr) = v.parse() {
                self.node.bind = addr;
            }
        }
        if let Ok(v) = std::env::var("RING_NODE__RELAY") {
            if let Ok(addr) = v.parse() {
                self.node.relay = addr;
            }
        }
        if let Ok(v) = std::env::var("RING_NODE__RING") {
            if let Some(ring) = parse_ring_list(&v) {
                self.node.ring = ring;
            }
        }
        if let Ok(v) = std::env::var("RING_TIMING__HOLD_MIN_MS") {
            if let Ok(ms) = v.parse() {
                self.timing.hold_min_ms = ms;
            }
        }
        if let Ok(v) = std::env::var("RING_TIMING__TOKEN_TIMEOUT_MS") {
            if let Ok(ms) = v.parse() {
                self.timing.token_timeout_ms = ms;
            }
        }
        if let Ok(v) = std::env::var("RING_EVENTS__PATH") {
            self.events.path = PathBuf::from(v);
        }
    }
}

/// "1, 2,3" → [1, 2, 3]. Any unparsable entry rejects the whole list.
fn parse_ring_list(s: &str) -> Option<Vec<NodeId>> {
    s.split(',')
        .map(|part| part.trim().parse().ok())
        .collect()
}
