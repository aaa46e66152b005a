use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tracing::debug;

use crate::config::FilterConfig;
use crate::error::{FilterError, Result};

const MAX_PROTOCOL_LEN: usize = 32;

/// Protocol used when the client offers nothing multiplexed.
pub const HTTP_1_1: &str = "http/1.1";

/// Outcome of protocol selection for one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolState {
    /// Selection has not run yet.
    Pending,
    /// The connection carries the multiplexed framing.
    Multiplexed,
    /// The connection carries plain bytes.
    Plain,
}

impl ProtocolState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Multiplexed,
            2 => Self::Plain,
            _ => Self::Pending,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Multiplexed => 1,
            Self::Plain => 2,
        }
    }
}

/// Per-connection state shared between the negotiation layer, the input
/// filter and whatever tears the connection down.
///
/// Held in an `Arc`; every field is atomic so it can be updated while a
/// read is in progress.
#[derive(Debug, Default)]
pub struct ConnectionContext {
    protocol: AtomicU8,
    aborted: AtomicBool,
}

impl ConnectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context whose protocol is already decided.
    pub fn with_protocol(state: ProtocolState) -> Self {
        let ctx = Self::new();
        ctx.set_protocol(state);
        ctx
    }

    pub fn protocol(&self) -> ProtocolState {
        ProtocolState::from_u8(self.protocol.load(Ordering::Acquire))
    }

    pub fn set_protocol(&self, state: ProtocolState) {
        self.protocol.store(state.as_u8(), Ordering::Release);
    }

    /// Mark the connection aborted. Irreversible.
    pub fn abort(&self) {
        if !self.aborted.swap(true, Ordering::AcqRel) {
            debug!("connection aborted");
        }
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.load(Ordering::Acquire)
    }
}

/// Chooses between the multiplexed protocols this side speaks and plain
/// HTTP/1.1, given what the client offers.
#[derive(Debug, Clone)]
pub struct ProtocolSelector {
    multiplexed: Vec<String>,
}

impl ProtocolSelector {
    /// `protocols` lists the supported multiplexed protocols, most preferred
    /// first.
    pub fn new<I, S>(protocols: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let multiplexed: Vec<String> = protocols.into_iter().map(Into::into).collect();
        for name in &multiplexed {
            validate_protocol_name(name)?;
        }
        Ok(Self { multiplexed })
    }

    pub fn from_config(config: &FilterConfig) -> Result<Self> {
        Self::new(config.multiplexed_protocols.iter().cloned())
    }

    /// Pick the most preferred supported protocol the client offers, or
    /// [`HTTP_1_1`].
    pub fn select<'a>(&'a self, offered: &[&'a str]) -> Result<&'a str> {
        for name in offered {
            validate_protocol_name(name)?;
        }
        let selected = self
            .multiplexed
            .iter()
            .find(|ours| offered.contains(&ours.as_str()))
            .map_or(HTTP_1_1, String::as_str);
        debug!(?offered, selected, "protocol selected");
        Ok(selected)
    }

    pub fn is_multiplexed(&self, name: &str) -> bool {
        self.multiplexed.iter().any(|ours| ours == name)
    }

    /// Record `selected` on `context`.
    pub fn apply(&self, context: &ConnectionContext, selected: &str) -> ProtocolState {
        let state = if self.is_multiplexed(selected) {
            ProtocolState::Multiplexed
        } else {
            ProtocolState::Plain
        };
        context.set_protocol(state);
        state
    }
}

pub(crate) fn validate_protocol_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_PROTOCOL_LEN {
        return Err(FilterError::InvalidProtocol(format!(
            "invalid protocol name length: {}",
            name.len()
        )));
    }
    if !name.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(FilterError::InvalidProtocol(format!(
            "protocol name '{}' must be printable ASCII",
            name.escape_default()
        )));
    }
    Ok(())
}
