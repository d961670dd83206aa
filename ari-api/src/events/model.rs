//! Resource snapshots embedded in events

use serde::{Deserialize, Serialize};

use super::time::Timestamp;
use crate::key::{self, Key};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerId {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub number: String,
}

/// Dialplan location (context, extension, priority)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialplanCep {
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub exten: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub app_name: Option<String>,
    #[serde(default)]
    pub app_data: Option<String>,
}

/// Snapshot of a channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelData {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub caller: CallerId,
    #[serde(default)]
    pub connected: CallerId,
    #[serde(default)]
    pub accountcode: String,
    #[serde(default)]
    pub dialplan: Option<DialplanCep>,
    #[serde(default)]
    pub creationtime: Option<Timestamp>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Snapshot of a bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeData {
    pub id: String,
    #[serde(default)]
    pub technology: String,
    #[serde(default)]
    pub bridge_type: String,
    #[serde(default)]
    pub bridge_class: String,
    #[serde(default)]
    pub creator: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub channels: Vec<String>,
    #[serde(default)]
    pub video_mode: Option<String>,
    #[serde(default)]
    pub video_source_id: Option<String>,
    #[serde(default)]
    pub creationtime: Option<Timestamp>,
}

/// Snapshot of a media playback
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackData {
    pub id: String,
    #[serde(default)]
    pub media_uri: String,
    #[serde(default)]
    pub next_media_uri: Option<String>,
    #[serde(default)]
    pub target_uri: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub state: String,
}

/// Snapshot of a recording in progress
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveRecordingData {
    pub name: String,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub target_uri: String,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub talking_duration: Option<i64>,
    #[serde(default)]
    pub silence_duration: Option<i64>,
    #[serde(default)]
    pub cause: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointData {
    pub technology: String,
    pub resource: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub channel_ids: Vec<String>,
}

impl EndpointData {
    /// Endpoint ids take the `technology/resource` form
    pub fn id(&self) -> String {
        format!("{}/{}", self.technology, self.resource)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceStateData {
    pub name: String,
    #[serde(default)]
    pub state: String,
}

/// Parses a `target_uri` such as `channel:1461600101.12` into a key.
///
/// Only the kinds ARI can play to or record from are recognized.
pub fn target_key(target_uri: &str) -> Option<Key> {
    let (scheme, id) = target_uri.split_once(':')?;
    let kind = match scheme {
        "channel" => key::CHANNEL,
        "bridge" => key::BRIDGE,
        "endpoint" => key::ENDPOINT,
        "recording" => key::STORED_RECORDING,
        _ => return None,
    };
    if id.is_empty() {
        return None;
    }
    Some(Key::new(kind, id))
}
