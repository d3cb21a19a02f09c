//! Messages between the client and the server, and the client side of the sync.
//!
//! There are three messages on one reliable channel:
//! 1. [ClientMessage::RequestOverrides]: client asks for its full override set
//! 2. [ClientMessage::SetOverride]: client changed one marker. server merges, saves and answers with the full set
//! 3. [ServerMessage::OverridesSync]: the full set. the client replaces its whole store with it
//!
//! Replacing instead of merging means a client can never drift away from the server after reconnects.

use beacon_link::{Marker, PlayerId};
use glam::DVec3;
use indexmap::IndexMap;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{resolve_numeric_id, stable_key, OverrideStore, StableKey, SyncError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetOverride {
    /// resolved numeric id of the marker. lets the host identify the marker if it wants to
    pub marker_id: i32,
    pub enabled: bool,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub title: String,
}

impl SetOverride {
    /// `None` if the marker has no position
    pub fn for_marker(marker: &Marker, enabled: bool) -> Option<Self> {
        let DVec3 { x, y, z } = marker.position?;
        Some(Self {
            marker_id: resolve_numeric_id(marker),
            enabled,
            x,
            y,
            z,
            title: marker.title_or_empty().to_owned(),
        })
    }
    pub fn key(&self) -> StableKey {
        stable_key(self.x, self.y, self.z, &self.title)
    }
}

/// Full override set of one player, as two parallel lists
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OverridesSync {
    pub keys: Vec<String>,
    pub enabled: Vec<bool>,
}

impl OverridesSync {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = (&'a StableKey, &'a bool)>) -> Self {
        let (keys, enabled) = entries
            .into_iter()
            .map(|(k, v)| (k.as_str().to_owned(), *v))
            .unzip();
        Self { keys, enabled }
    }
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.keys.len() != self.enabled.len() {
            return Err(SyncError::LengthMismatch {
                keys: self.keys.len(),
                values: self.enabled.len(),
            });
        }
        Ok(())
    }
    /// Pairs up the lists. Extra items in the longer list and empty keys are dropped.
    pub fn entries(&self) -> impl Iterator<Item = (StableKey, bool)> + '_ {
        self.keys
            .iter()
            .zip(self.enabled.iter())
            .filter(|(k, _)| !k.is_empty())
            .map(|(k, v)| (StableKey::from_raw(k.as_str()), *v))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientMessage {
    RequestOverrides,
    SetOverride(SetOverride),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerMessage {
    OverridesSync(OverridesSync),
}

/// Payload for hosts whose channel carries bytes
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, SyncError> {
    Ok(serde_json::to_vec(message)?)
}

pub fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, SyncError> {
    Ok(serde_json::from_slice(payload)?)
}

/// The client end of the host network channel
pub trait ClientChannel {
    fn is_connected(&self) -> bool;
    fn send(&mut self, message: ClientMessage) -> Result<(), SyncError>;
}

/// The server end of the host network channel
pub trait ServerChannel {
    fn send_to(&mut self, player: &PlayerId, message: ServerMessage) -> Result<(), SyncError>;
}

/// Client side sync state.
///
/// Asks for the saved overrides once, a little after the channel connects.
/// Overrides changed while disconnected are kept (latest per marker wins) and sent as soon as the channel is up.
#[derive(Debug, Default)]
pub struct ClientSync {
    connected_at: Option<f64>,
    requested: bool,
    deferred: IndexMap<StableKey, SetOverride>,
}

impl ClientSync {
    /// seconds between the channel connecting and the override request
    pub const REQUEST_DELAY: f64 = 0.5;

    pub fn tick(&mut self, timestamp: f64, channel: &mut dyn ClientChannel) {
        if !channel.is_connected() {
            self.connected_at = None;
            return;
        }
        let connected_at = *self.connected_at.get_or_insert(timestamp);
        self.flush_deferred(channel);
        if !self.requested && timestamp - connected_at >= Self::REQUEST_DELAY {
            match channel.send(ClientMessage::RequestOverrides) {
                Ok(_) => {
                    self.requested = true;
                    info!("requested saved beacon overrides from server");
                }
                Err(e) => {
                    warn!(?e, "failed to request beacon overrides");
                }
            }
        }
    }

    /// Sends right away if possible, otherwise keeps it for later.
    pub fn send_override(&mut self, message: SetOverride, channel: &mut dyn ClientChannel) {
        if !channel.is_connected() {
            warn!(key = %message.key(), "beacon override updated, but the channel is not connected yet. deferring");
            self.deferred.insert(message.key(), message);
            return;
        }
        self.flush_deferred(channel);
        if !self.deferred.is_empty() {
            self.deferred.insert(message.key(), message);
            return;
        }
        if let Err(e) = channel.send(ClientMessage::SetOverride(message.clone())) {
            warn!(?e, key = %message.key(), "failed to send beacon override. deferring");
            self.deferred.insert(message.key(), message);
        }
    }

    fn flush_deferred(&mut self, channel: &mut dyn ClientChannel) {
        if self.deferred.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.deferred);
        let mut failed = false;
        for (key, message) in pending {
            if failed {
                self.deferred.insert(key, message);
                continue;
            }
            if let Err(e) = channel.send(ClientMessage::SetOverride(message.clone())) {
                warn!(?e, %key, "failed to flush deferred beacon override");
                failed = true;
                self.deferred.insert(key, message);
            }
        }
        if !failed {
            debug!("flushed deferred beacon overrides");
        }
    }

    /// overrides that are waiting for the channel
    pub fn deferred(&self) -> impl Iterator<Item = &SetOverride> {
        self.deferred.values()
    }

    pub fn has_requested(&self) -> bool {
        self.requested
    }

    /// Replaces the whole store with the server's set. Applying the same sync twice changes nothing.
    pub fn apply_sync(sync: &OverridesSync, store: &mut OverrideStore) {
        if let Err(e) = sync.validate() {
            warn!(?e, "override sync lists differ in length. using the common prefix");
        }
        store.replace_all(sync.entries());
        debug!(count = store.len(), "applied override sync");
    }
}
