use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::ccs::types::Coordinates;
use crate::storage::Stack;

/// A stack to create when no yard snapshot exists yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackConfig {
    pub name: String,
    pub coordinates: Coordinates,
    /// Slot count; falls back to [`TamsConfig::default_stack_height`] when unset.
    pub height: Option<usize>,
}

impl StackConfig {
    pub fn into_stack(self, default_height: usize) -> Stack {
        Stack::new(
            self.name,
            self.coordinates,
            self.height.unwrap_or(default_height),
        )
    }
}

/// Parses `name:x:y:z` or `name:x:y:z:height`.
impl FromStr for StackConfig {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 4 && parts.len() != 5 {
            return Err(format!(
                "invalid stack {s:?}, expected name:x:y:z[:height]"
            ));
        }
        let name = parts[0].trim();
        if name.is_empty() {
            return Err(format!("invalid stack {s:?}, name is empty"));
        }
        let coord = |i: usize| {
            parts[i]
                .trim()
                .parse::<i64>()
                .map_err(|e| format!("invalid coordinate {:?} in {s:?}: {e}", parts[i]))
        };
        let coordinates = Coordinates::new(coord(1)?, coord(2)?, coord(3)?);
        let height = match parts.get(4) {
            Some(h) => Some(
                h.trim()
                    .parse::<usize>()
                    .map_err(|e| format!("invalid height {h:?} in {s:?}: {e}"))?,
            ),
            None => None,
        };
        Ok(Self {
            name: name.to_string(),
            coordinates,
            height,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TamsConfig {
    /// Base URL of the crane control system
    pub ccs_url: String,
    /// Where the crane posts status, details, alarms and metrics
    pub crane_listen_addr: SocketAddr,
    /// Where the operator UI is served
    pub web_listen_addr: SocketAddr,
    pub poll_interval_ms: u64,
    /// Per-request timeout for calls to the crane
    pub request_timeout_ms: u64,
    pub snapshot_path: PathBuf,
    pub stacks: Vec<StackConfig>,
    pub default_stack_height: usize,
    pub verbose: bool,
    /// Trace every HTTP request on both servers
    pub log_web_calls: bool,
}

impl Default for TamsConfig {
    fn default() -> Self {
        Self {
            ccs_url: "http://127.0.0.1:9999".to_string(),
            crane_listen_addr: SocketAddr::from(([0, 0, 0, 0], 9998)),
            web_listen_addr: SocketAddr::from(([0, 0, 0, 0], 7000)),
            poll_interval_ms: 1000,
            request_timeout_ms: 5000,
            snapshot_path: PathBuf::from("export.json"),
            stacks: Vec::new(),
            default_stack_height: 2,
            verbose: false,
            log_web_calls: false,
        }
    }
}

impl TamsConfig {
    pub fn new(ccs_url: impl Into<String>) -> Self {
        Self {
            ccs_url: ccs_url.into(),
            ..Default::default()
        }
    }

    pub fn with_stack(mut self, stack: StackConfig) -> Self {
        self.stacks.push(stack);
        self
    }

    pub fn with_snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.snapshot_path = path.into();
        self
    }

    /// Seed stacks built from [`stacks`](Self::stacks).
    pub fn seed_stacks(&self) -> Vec<Stack> {
        self.stacks
            .iter()
            .cloned()
            .map(|s| s.into_stack(self.default_stack_height))
            .collect()
    }
}
