//! Resources that media operations act on

use std::fmt;
use std::sync::Arc;

use ari_api::key::{BRIDGE, CHANNEL};
use ari_api::{Key, ResourceTransport};
use ari_stream::Bus;

use crate::error::{OperationError, Result};

/// A channel or bridge handle: its key plus the transport and bus used to
/// command it and follow its events
#[derive(Clone)]
pub struct Target {
    key: Key,
    transport: Arc<dyn ResourceTransport>,
    bus: Bus,
}

impl Target {
    /// Fails unless `key` names a specific channel or bridge
    pub fn new(key: Key, transport: Arc<dyn ResourceTransport>, bus: Bus) -> Result<Self> {
        if key.kind() != CHANNEL && key.kind() != BRIDGE {
            return Err(OperationError::InvalidRequest(format!(
                "{} is not a channel or bridge",
                key
            )));
        }
        if key.id().is_empty() {
            return Err(OperationError::InvalidRequest(format!(
                "{} does not name a single {}",
                key,
                key.kind()
            )));
        }

        Ok(Self { key, transport, bus })
    }

    pub fn key(&self) -> &Key {
        &self.key
    }

    pub fn transport(&self) -> &dyn ResourceTransport {
        self.transport.as_ref()
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// REST path of `action` on this resource, e.g. `channels/c1/record`
    pub(crate) fn path(&self, action: &str) -> String {
        format!("{}s/{}/{}", self.key.kind(), self.key.id(), action)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Target").field("key", &self.key).finish()
    }
}
