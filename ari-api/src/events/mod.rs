//! Typed ARI events
//!
//! Frames arriving on the event WebSocket are JSON objects tagged by their
//! `type` field. [`Event::decode`] looks the tag up in a registry of decode
//! functions and produces the matching [`Event`] variant. Tags without a
//! registered shape are passed through as [`Event::Unknown`] so newer Asterisk
//! versions never break the stream.

pub mod model;
pub mod time;
pub mod types;

use serde_json::Value;

use crate::error::DecodeError;
use crate::key::Keys;

pub use model::*;
pub use time::{Timestamp, TIMESTAMP_FORMAT};
pub use types::*;

/// Decodes a JSON object into one event shape
pub type DecodeFn = fn(Value) -> Result<Event, serde_json::Error>;

/// Declares the event enum, its type-tag constants and the decode registry
/// from a single list of shapes.
macro_rules! define_events {
    ($($(#[$meta:meta])* $variant:ident => $tag:ident),* $(,)?) => {
        paste::paste! {
            /// Type tags of every typed event, plus the [`event_types::ALL`] sentinel
            pub mod event_types {
                /// Matches every event type in a subscription filter
                pub const ALL: &str = "all";
                $(pub const $tag: &str = stringify!($variant);)*
            }

            /// A decoded ARI event
            #[derive(Debug, Clone, PartialEq)]
            pub enum Event {
                $($(#[$meta])* $variant($variant),)*
                /// Event with an unregistered type tag
                Unknown(GenericEvent),
            }

            impl Event {
                pub fn header(&self) -> &EventHeader {
                    match self {
                        $(Event::$variant(event) => &event.header,)*
                        Event::Unknown(event) => &event.header,
                    }
                }

                /// Keys of every resource this event concerns, in snapshot order
                pub fn keys(&self) -> Keys {
                    match self {
                        $(Event::$variant(event) => event.keys(),)*
                        Event::Unknown(event) => event.keys(),
                    }
                }
            }

            $(
                fn [<decode_ $tag:lower>](value: Value) -> Result<Event, serde_json::Error> {
                    serde_json::from_value::<$variant>(value).map(Event::$variant)
                }
            )*

            static REGISTRY: &[(&str, DecodeFn)] = &[
                $((stringify!($variant), [<decode_ $tag:lower>] as DecodeFn),)*
            ];
        }
    };
}

define_events! {
    ApplicationReplaced => APPLICATION_REPLACED,
    BridgeCreated => BRIDGE_CREATED,
    BridgeDestroyed => BRIDGE_DESTROYED,
    BridgeMerged => BRIDGE_MERGED,
    ChannelCreated => CHANNEL_CREATED,
    ChannelDestroyed => CHANNEL_DESTROYED,
    ChannelStateChange => CHANNEL_STATE_CHANGE,
    ChannelDtmfReceived => CHANNEL_DTMF_RECEIVED,
    ChannelHangupRequest => CHANNEL_HANGUP_REQUEST,
    ChannelVarset => CHANNEL_VARSET,
    ChannelEnteredBridge => CHANNEL_ENTERED_BRIDGE,
    ChannelLeftBridge => CHANNEL_LEFT_BRIDGE,
    ChannelDialplan => CHANNEL_DIALPLAN,
    ChannelTalkingStarted => CHANNEL_TALKING_STARTED,
    ChannelTalkingFinished => CHANNEL_TALKING_FINISHED,
    Dial => DIAL,
    StasisStart => STASIS_START,
    StasisEnd => STASIS_END,
    PlaybackStarted => PLAYBACK_STARTED,
    PlaybackContinuing => PLAYBACK_CONTINUING,
    PlaybackFinished => PLAYBACK_FINISHED,
    RecordingStarted => RECORDING_STARTED,
    RecordingFinished => RECORDING_FINISHED,
    RecordingFailed => RECORDING_FAILED,
    DeviceStateChanged => DEVICE_STATE_CHANGED,
    EndpointStateChange => ENDPOINT_STATE_CHANGE,
}

/// Finds the decode function registered for a type tag
pub fn lookup(event_type: &str) -> Option<DecodeFn> {
    REGISTRY
        .iter()
        .find(|(tag, _)| *tag == event_type)
        .map(|(_, decode)| *decode)
}

/// Every type tag with a typed shape
pub fn known_types() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(tag, _)| *tag)
}

/// Fields holding a timestamp, in the header or in a resource snapshot
const TIMESTAMP_FIELDS: &[&str] = &["timestamp", "creationtime"];

/// Parses every timestamp field in the frame so a malformed one surfaces as
/// [`DecodeError::TimeFormat`] wherever it sits.
fn check_timestamps(value: &Value) -> Result<(), DecodeError> {
    match value {
        Value::Object(object) => {
            for (field, inner) in object {
                match inner {
                    Value::String(raw) if TIMESTAMP_FIELDS.contains(&field.as_str()) => {
                        Timestamp::parse(raw)?;
                    }
                    _ => check_timestamps(inner)?,
                }
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(check_timestamps),
        _ => Ok(()),
    }
}

impl Event {
    /// Decodes one frame from the event stream.
    pub fn decode(bytes: &[u8]) -> Result<Event, DecodeError> {
        let value: Value = serde_json::from_slice(bytes).map_err(DecodeError::Json)?;
        Self::from_value(value)
    }

    /// Decodes an already-parsed JSON value.
    pub fn from_value(value: Value) -> Result<Event, DecodeError> {
        let object = value.as_object().ok_or(DecodeError::NotAnObject)?;
        let event_type = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or(DecodeError::MissingType)?
            .to_string();

        check_timestamps(&value)?;

        match lookup(&event_type) {
            Some(decode) => {
                decode(value).map_err(|source| DecodeError::Payload { event_type, source })
            }
            None => {
                let header = serde_json::from_value::<EventHeader>(value.clone())
                    .map_err(|source| DecodeError::Payload { event_type, source })?;
                Ok(Event::Unknown(GenericEvent { header, raw: value }))
            }
        }
    }

    /// The `type` tag of this event
    pub fn event_type(&self) -> &str {
        &self.header().event_type
    }

    /// Name of the application the event was delivered to
    pub fn application(&self) -> &str {
        &self.header().application
    }

    pub fn timestamp(&self) -> Option<&Timestamp> {
        self.header().timestamp.as_ref()
    }

    /// Asterisk node that emitted the event, if reported
    pub fn node(&self) -> Option<&str> {
        self.header().asterisk_id.as_deref()
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Event::Unknown(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{self, Key};

    #[test]
    fn test_registry_covers_every_tag_constant() {
        let known: Vec<_> = known_types().collect();
        assert_eq!(known.len(), 26);
        assert!(known.contains(&event_types::CHANNEL_ENTERED_BRIDGE));
        assert!(known.contains(&event_types::CHANNEL_DTMF_RECEIVED));
        assert!(!known.contains(&event_types::ALL));
        assert!(lookup("NoSuchEvent").is_none());
    }

    #[test]
    fn test_decode_channel_entered_bridge() {
        let frame = br#"{
            "type": "ChannelEnteredBridge",
            "application": "ivr",
            "timestamp": "2016-03-21T17:17:55.416-0500",
            "asterisk_id": "ast-01",
            "bridge": {"id": "X", "technology": "simple_bridge", "bridge_type": "mixing", "channels": ["Y"]},
            "channel": {"id": "Y", "name": "PJSIP/alice-00000001", "state": "Up"}
        }"#;

        let event = Event::decode(frame).unwrap();
        assert_eq!(event.event_type(), event_types::CHANNEL_ENTERED_BRIDGE);
        assert_eq!(event.application(), "ivr");
        assert_eq!(event.node(), Some("ast-01"));

        let keys = event.keys();
        assert_eq!(keys.len(), 2);
        let bridge = keys.filter(&[Key::of_kind(key::BRIDGE)]);
        let channel = keys.filter(&[Key::of_kind(key::CHANNEL)]);
        assert_eq!(bridge.ids(), vec!["X"]);
        assert_eq!(channel.ids(), vec!["Y"]);
        assert_eq!(bridge.single().map(Key::node), Some("ast-01"));
        assert_eq!(bridge.single().map(Key::app), Some("ivr"));
    }

    #[test]
    fn test_unknown_type_passes_through() {
        let frame = br#"{"type":"ChannelUnholdish","application":"ivr","extra":42}"#;
        let event = Event::decode(frame).unwrap();

        assert!(event.is_unknown());
        assert_eq!(event.event_type(), "ChannelUnholdish");
        assert_eq!(event.keys().into_vec(), vec![Key::new(key::APPLICATION, "ivr").with_app("ivr")]);
        match event {
            Event::Unknown(generic) => assert_eq!(generic.raw["extra"], 42),
            other => panic!("expected unknown event, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(Event::decode(b"not json"), Err(DecodeError::Json(_))));
        assert!(matches!(Event::decode(b"[1,2]"), Err(DecodeError::NotAnObject)));
        assert!(matches!(
            Event::decode(br#"{"application":"ivr"}"#),
            Err(DecodeError::MissingType)
        ));
        assert!(matches!(
            Event::decode(br#"{"type":7}"#),
            Err(DecodeError::MissingType)
        ));
        assert!(matches!(
            Event::decode(br#"{"type":"StasisEnd","application":"ivr"}"#),
            Err(DecodeError::Payload { .. })
        ));
    }

    #[test]
    fn test_bad_header_timestamp_is_time_format_error() {
        let frame = br#"{"type":"StasisEnd","timestamp":"2016-03-21 17:17","channel":{"id":"c1"}}"#;
        match Event::decode(frame) {
            Err(DecodeError::TimeFormat(error)) => assert_eq!(error.value, "2016-03-21 17:17"),
            other => panic!("expected time format error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_snapshot_timestamp_is_time_format_error() {
        let frame = br#"{"type":"StasisEnd","channel":{"id":"c1","creationtime":"today"}}"#;
        match Event::decode(frame) {
            Err(DecodeError::TimeFormat(error)) => assert_eq!(error.value, "today"),
            other => panic!("expected time format error, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_nested_timestamp_is_time_format_error() {
        let frame = br#"{
            "type": "ChannelEnteredBridge",
            "application": "ivr",
            "timestamp": "2016-03-21T17:17:55.416-0500",
            "bridge": {"id": "X", "creationtime": "2016-03-21 17:17:55"},
            "channel": {"id": "Y"}
        }"#;
        assert!(matches!(Event::decode(frame), Err(DecodeError::TimeFormat(_))));
    }

    #[test]
    fn test_global_varset_concerns_application() {
        let frame = br#"{"type":"ChannelVarset","application":"ivr","variable":"GLOBAL_X","value":"1"}"#;
        let event = Event::decode(frame).unwrap();
        let keys = event.keys();
        assert_eq!(keys.single().map(Key::kind), Some(key::APPLICATION));
        assert_eq!(keys.single().map(Key::id), Some("ivr"));
    }
}
