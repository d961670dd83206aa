//! Concrete event shapes
//!
//! Each struct flattens the common [`EventHeader`] and adds the snapshots the
//! event carries. `keys()` lists one key per embedded resource, located on
//! the node and application named in the header.

use serde::{Deserialize, Serialize};

use super::model::{
    target_key, BridgeData, ChannelData, DeviceStateData, EndpointData, LiveRecordingData,
    PlaybackData,
};
use super::time::Timestamp;
use crate::key::{self, Key, Keys};

/// Fields shared by every event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventHeader {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub application: String,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    /// Identifier of the Asterisk node that emitted the event
    #[serde(default)]
    pub asterisk_id: Option<String>,
}

impl EventHeader {
    /// Builds a key located where this event came from
    pub fn key(&self, kind: &str, id: impl Into<String>) -> Key {
        Key::new(kind, id)
            .with_node(self.asterisk_id.clone().unwrap_or_default())
            .with_app(self.application.clone())
    }

    /// Key of the application itself, for events that embed no resource
    pub fn application_key(&self) -> Key {
        self.key(key::APPLICATION, self.application.clone())
    }

    fn located(&self, key: Key) -> Key {
        let (kind, id) = (key.kind().to_string(), key.id().to_string());
        self.key(&kind, id)
    }

    fn channel(&self, channel: &ChannelData) -> Key {
        self.key(key::CHANNEL, channel.id.clone())
    }

    fn bridge(&self, bridge: &BridgeData) -> Key {
        self.key(key::BRIDGE, bridge.id.clone())
    }

    fn target(&self, target_uri: &str) -> Option<Key> {
        target_key(target_uri).map(|key| self.located(key))
    }
}

/// An event whose type has no typed shape; the raw object is kept as-is
///
/// Its only key is the application key, so it reaches wildcard and
/// application-scoped subscriptions.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericEvent {
    pub header: EventHeader,
    pub raw: serde_json::Value,
}

impl GenericEvent {
    pub fn keys(&self) -> Keys {
        vec![self.header.application_key()].into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationReplaced {
    #[serde(flatten)]
    pub header: EventHeader,
}

impl ApplicationReplaced {
    pub fn keys(&self) -> Keys {
        vec![self.header.application_key()].into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeCreated {
    #[serde(flatten)]
    pub header: EventHeader,
    pub bridge: BridgeData,
}

impl BridgeCreated {
    pub fn keys(&self) -> Keys {
        vec![self.header.bridge(&self.bridge)].into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeDestroyed {
    #[serde(flatten)]
    pub header: EventHeader,
    pub bridge: BridgeData,
}

impl BridgeDestroyed {
    pub fn keys(&self) -> Keys {
        vec![self.header.bridge(&self.bridge)].into()
    }
}

/// Two bridges merged; `bridge_from` no longer exists afterwards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeMerged {
    #[serde(flatten)]
    pub header: EventHeader,
    pub bridge: BridgeData,
    pub bridge_from: BridgeData,
}

impl BridgeMerged {
    pub fn keys(&self) -> Keys {
        vec![
            self.header.bridge(&self.bridge),
            self.header.bridge(&self.bridge_from),
        ]
        .into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelCreated {
    #[serde(flatten)]
    pub header: EventHeader,
    pub channel: ChannelData,
}

impl ChannelCreated {
    pub fn keys(&self) -> Keys {
        vec![self.header.channel(&self.channel)].into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDestroyed {
    #[serde(flatten)]
    pub header: EventHeader,
    pub channel: ChannelData,
    #[serde(default)]
    pub cause: i64,
    #[serde(default)]
    pub cause_txt: String,
}

impl ChannelDestroyed {
    pub fn keys(&self) -> Keys {
        vec![self.header.channel(&self.channel)].into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelStateChange {
    #[serde(flatten)]
    pub header: EventHeader,
    pub channel: ChannelData,
}

impl ChannelStateChange {
    pub fn keys(&self) -> Keys {
        vec![self.header.channel(&self.channel)].into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDtmfReceived {
    #[serde(flatten)]
    pub header: EventHeader,
    pub channel: ChannelData,
    pub digit: String,
    #[serde(default)]
    pub duration_ms: i64,
}

impl ChannelDtmfReceived {
    pub fn keys(&self) -> Keys {
        vec![self.header.channel(&self.channel)].into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelHangupRequest {
    #[serde(flatten)]
    pub header: EventHeader,
    pub channel: ChannelData,
    #[serde(default)]
    pub cause: Option<i64>,
    #[serde(default)]
    pub soft: Option<bool>,
}

impl ChannelHangupRequest {
    pub fn keys(&self) -> Keys {
        vec![self.header.channel(&self.channel)].into()
    }
}

/// A variable changed; without a channel the variable is global and the
/// event concerns the application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelVarset {
    #[serde(flatten)]
    pub header: EventHeader,
    #[serde(default)]
    pub channel: Option<ChannelData>,
    pub variable: String,
    #[serde(default)]
    pub value: String,
}

impl ChannelVarset {
    pub fn keys(&self) -> Keys {
        match &self.channel {
            Some(channel) => vec![self.header.channel(channel)].into(),
            None => vec![self.header.application_key()].into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelEnteredBridge {
    #[serde(flatten)]
    pub header: EventHeader,
    pub bridge: BridgeData,
    pub channel: ChannelData,
}

impl ChannelEnteredBridge {
    pub fn keys(&self) -> Keys {
        vec![
            self.header.bridge(&self.bridge),
            self.header.channel(&self.channel),
        ]
        .into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelLeftBridge {
    #[serde(flatten)]
    pub header: EventHeader,
    pub bridge: BridgeData,
    pub channel: ChannelData,
}

impl ChannelLeftBridge {
    pub fn keys(&self) -> Keys {
        vec![
            self.header.bridge(&self.bridge),
            self.header.channel(&self.channel),
        ]
        .into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelDialplan {
    #[serde(flatten)]
    pub header: EventHeader,
    pub channel: ChannelData,
    #[serde(default)]
    pub dialplan_app: String,
    #[serde(default)]
    pub dialplan_app_data: String,
}

impl ChannelDialplan {
    pub fn keys(&self) -> Keys {
        vec![self.header.channel(&self.channel)].into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelTalkingStarted {
    #[serde(flatten)]
    pub header: EventHeader,
    pub channel: ChannelData,
}

impl ChannelTalkingStarted {
    pub fn keys(&self) -> Keys {
        vec![self.header.channel(&self.channel)].into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelTalkingFinished {
    #[serde(flatten)]
    pub header: EventHeader,
    pub channel: ChannelData,
    /// Talking time in milliseconds
    #[serde(default)]
    pub duration: i64,
}

impl ChannelTalkingFinished {
    pub fn keys(&self) -> Keys {
        vec![self.header.channel(&self.channel)].into()
    }
}

/// Dialing state changed for `peer`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dial {
    #[serde(flatten)]
    pub header: EventHeader,
    pub peer: ChannelData,
    #[serde(default)]
    pub caller: Option<ChannelData>,
    #[serde(default)]
    pub forwarded: Option<ChannelData>,
    #[serde(default)]
    pub dialstatus: String,
    #[serde(default)]
    pub dialstring: Option<String>,
    #[serde(default)]
    pub forward: Option<String>,
}

impl Dial {
    pub fn keys(&self) -> Keys {
        std::iter::once(&self.peer)
            .chain(self.caller.iter())
            .chain(self.forwarded.iter())
            .map(|channel| self.header.channel(channel))
            .collect()
    }
}

/// A channel entered the application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StasisStart {
    #[serde(flatten)]
    pub header: EventHeader,
    pub channel: ChannelData,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub replace_channel: Option<ChannelData>,
}

impl StasisStart {
    pub fn keys(&self) -> Keys {
        std::iter::once(&self.channel)
            .chain(self.replace_channel.iter())
            .map(|channel| self.header.channel(channel))
            .collect()
    }
}

/// A channel left the application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StasisEnd {
    #[serde(flatten)]
    pub header: EventHeader,
    pub channel: ChannelData,
}

impl StasisEnd {
    pub fn keys(&self) -> Keys {
        vec![self.header.channel(&self.channel)].into()
    }
}

fn playback_keys(header: &EventHeader, playback: &PlaybackData) -> Keys {
    std::iter::once(header.key(key::PLAYBACK, playback.id.clone()))
        .chain(header.target(&playback.target_uri))
        .collect()
}

fn recording_keys(header: &EventHeader, recording: &LiveRecordingData) -> Keys {
    std::iter::once(header.key(key::LIVE_RECORDING, recording.name.clone()))
        .chain(header.target(&recording.target_uri))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackStarted {
    #[serde(flatten)]
    pub header: EventHeader,
    pub playback: PlaybackData,
}

impl PlaybackStarted {
    pub fn keys(&self) -> Keys {
        playback_keys(&self.header, &self.playback)
    }
}

/// A playback moved on to the next media URI of a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackContinuing {
    #[serde(flatten)]
    pub header: EventHeader,
    pub playback: PlaybackData,
}

impl PlaybackContinuing {
    pub fn keys(&self) -> Keys {
        playback_keys(&self.header, &self.playback)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackFinished {
    #[serde(flatten)]
    pub header: EventHeader,
    pub playback: PlaybackData,
}

impl PlaybackFinished {
    pub fn keys(&self) -> Keys {
        playback_keys(&self.header, &self.playback)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingStarted {
    #[serde(flatten)]
    pub header: EventHeader,
    pub recording: LiveRecordingData,
}

impl RecordingStarted {
    pub fn keys(&self) -> Keys {
        recording_keys(&self.header, &self.recording)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingFinished {
    #[serde(flatten)]
    pub header: EventHeader,
    pub recording: LiveRecordingData,
}

impl RecordingFinished {
    pub fn keys(&self) -> Keys {
        recording_keys(&self.header, &self.recording)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingFailed {
    #[serde(flatten)]
    pub header: EventHeader,
    pub recording: LiveRecordingData,
}

impl RecordingFailed {
    pub fn keys(&self) -> Keys {
        recording_keys(&self.header, &self.recording)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStateChanged {
    #[serde(flatten)]
    pub header: EventHeader,
    pub device_state: DeviceStateData,
}

impl DeviceStateChanged {
    pub fn keys(&self) -> Keys {
        vec![self
            .header
            .key(key::DEVICE_STATE, self.device_state.name.clone())]
        .into()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointStateChange {
    #[serde(flatten)]
    pub header: EventHeader,
    pub endpoint: EndpointData,
}

impl EndpointStateChange {
    pub fn keys(&self) -> Keys {
        vec![self.header.key(key::ENDPOINT, self.endpoint.id())].into()
    }
}
