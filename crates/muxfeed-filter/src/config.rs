use std::path::Path;

use muxfeed_frame::{FrameConfig, DEFAULT_MAX_PAYLOAD};
use serde::{Deserialize, Serialize};

use crate::context::validate_protocol_name;
use crate::error::{FilterError, Result};

/// Default upper bound for one upstream read issued by the frame pump.
pub const DEFAULT_READ_CHUNK_SIZE: usize = 8 * 1024;

/// Multiplexed protocol offered when nothing else is configured.
pub const DEFAULT_PROTOCOL: &str = "mx/1";

/// Configuration for an [`InputFilter`](crate::InputFilter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FilterConfig {
    /// Maximum bytes requested from the upstream per pump step.
    pub read_chunk_size: usize,
    /// Largest frame payload accepted from the wire.
    pub max_payload_size: usize,
    /// Multiplexed protocol names, in order of preference.
    pub multiplexed_protocols: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: DEFAULT_READ_CHUNK_SIZE,
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            multiplexed_protocols: vec![DEFAULT_PROTOCOL.to_string()],
        }
    }
}

impl FilterConfig {
    /// Load and validate a JSON config file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read(path.as_ref())?;
        let config: Self = serde_json::from_slice(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.read_chunk_size == 0 {
            return Err(FilterError::InvalidConfig(
                "read_chunk_size must be greater than zero".to_string(),
            ));
        }
        if self.max_payload_size == 0 {
            return Err(FilterError::InvalidConfig(
                "max_payload_size must be greater than zero".to_string(),
            ));
        }
        if self.multiplexed_protocols.is_empty() {
            return Err(FilterError::InvalidConfig(
                "at least one multiplexed protocol is required".to_string(),
            ));
        }
        for name in &self.multiplexed_protocols {
            validate_protocol_name(name)?;
        }
        Ok(())
    }

    pub fn frame_config(&self) -> FrameConfig {
        FrameConfig {
            max_payload_size: self.max_payload_size,
        }
    }
}
