use std::path::{Path, PathBuf};
use std::time::Duration;

use eternity_protocol::MAX_FRAME_SIZE;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

/// What to do when a request outlives `request_timeout`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadlinePolicy {
    /// Send nothing; the late result is discarded.
    Suppress,
    /// Answer `0x00` at the deadline; the late result is discarded.
    #[default]
    ReplyFailure,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub store_root: PathBuf,
    /// WebSocket URI of the local anonymizing-network client.
    pub client_uri: String,
    /// Upper bound on requests executing at once.
    pub max_in_flight: usize,
    pub request_queue_capacity: usize,
    pub response_queue_capacity: usize,
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
    pub on_deadline: DeadlinePolicy,
    pub max_frame_size: usize,
    /// Written into the store snapshot; never contacted.
    pub peers: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("./eternity"),
            client_uri: "ws://127.0.0.1:1977".into(),
            max_in_flight: 32,
            request_queue_capacity: 50,
            response_queue_capacity: 50,
            request_timeout: Duration::from_secs(30),
            on_deadline: DeadlinePolicy::default(),
            max_frame_size: MAX_FRAME_SIZE,
            peers: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Load from a TOML file. Missing keys take their defaults.
    pub fn load(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    pub fn validate(&self) -> ServerResult<()> {
        let zero = [
            ("max_in_flight", self.max_in_flight),
            ("request_queue_capacity", self.request_queue_capacity),
            ("response_queue_capacity", self.response_queue_capacity),
        ]
        .into_iter()
        .find(|(_, value)| *value == 0);
        if let Some((name, _)) = zero {
            return Err(ServerError::Config(format!("{name} must be at least 1")));
        }
        if self.request_timeout.is_zero() {
            return Err(ServerError::Config("request_timeout must be positive".into()));
        }
        Ok(())
    }
}

/// `Duration` as whole seconds.
mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
