//! ARI timestamps
//!
//! Asterisk stamps events and snapshots as `2016-03-21T17:17:55.416-0500`:
//! millisecond precision and a colon-less UTC offset. Anything else is
//! rejected rather than guessed at.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::TimeFormatError;

/// strftime pattern of ARI timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f%z";

// "YYYY-MM-DDTHH:MM:SS.mmm" followed by "+HHMM"; 'd' is any ASCII digit
const SHAPE: &[u8] = b"dddd-dd-ddTdd:dd:dd.ddd";

/// A point in time with the offset it was reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<FixedOffset>);

impl Timestamp {
    pub fn parse(value: &str) -> Result<Self, TimeFormatError> {
        let error = || TimeFormatError {
            value: value.to_string(),
        };

        if !has_ari_shape(value.as_bytes()) {
            return Err(error());
        }

        DateTime::parse_from_str(value, TIMESTAMP_FORMAT)
            .map(Timestamp)
            .map_err(|_| error())
    }

    pub fn as_datetime(&self) -> &DateTime<FixedOffset> {
        &self.0
    }

    pub fn into_datetime(self) -> DateTime<FixedOffset> {
        self.0
    }
}

fn has_ari_shape(bytes: &[u8]) -> bool {
    if bytes.len() != SHAPE.len() + 5 {
        return false;
    }

    let (body, offset) = bytes.split_at(SHAPE.len());
    let body_ok = body.iter().zip(SHAPE).all(|(b, s)| match s {
        b'd' => b.is_ascii_digit(),
        other => b == other,
    });

    body_ok && matches!(offset[0], b'+' | b'-') && offset[1..].iter().all(u8::is_ascii_digit)
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self(value)
    }
}

impl FromStr for Timestamp {
    type Err = TimeFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(TIMESTAMP_FORMAT))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::parse(&raw).map_err(serde::de::Error::custom)
    }
}
