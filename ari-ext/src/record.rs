//! Live recording
//!
//! [`record`] starts a recording and returns once the server reports it
//! started. The caller then keeps the [`RecordingSession`] and awaits the
//! outcome with [`RecordingSession::wait_finished`].

use std::fmt;
use std::time::Duration;

use ari_api::{event_types, key, Event};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::coordinator::{
    Coordinator, InFlight, Outcome, Signal, Started, Tracking, DEFAULT_START_TIMEOUT,
};
use crate::error::{OperationError, Result};
use crate::play::response_field;
use crate::target::Target;

/// Extra time allowed beyond the maximum duration for the finish event
pub const RECORDING_MARGIN: Duration = Duration::from_secs(5);

/// Overall wait when the recording has no maximum duration
pub const UNBOUNDED_RECORDING_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Recording events, correlated by recording name
pub const RECORDING: Tracking = Tracking {
    kind: key::LIVE_RECORDING,
    event_types: &[
        event_types::RECORDING_STARTED,
        event_types::RECORDING_FINISHED,
        event_types::RECORDING_FAILED,
    ],
    classify: classify_recording,
};

fn classify_recording(event: &Event) -> Option<(&str, Signal)> {
    match event {
        Event::RecordingStarted(e) => Some((e.recording.name.as_str(), Signal::Started)),
        Event::RecordingFinished(e) => Some((e.recording.name.as_str(), Signal::Finished)),
        Event::RecordingFailed(e) => Some((
            e.recording.name.as_str(),
            Signal::Failed(
                e.recording
                    .cause
                    .clone()
                    .unwrap_or_else(|| "recording failed".to_string()),
            ),
        )),
        _ => None,
    }
}

/// DTMF digit that stops the recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminateOn {
    #[default]
    None,
    Any,
    Star,
    Hash,
}

impl fmt::Display for TerminateOn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TerminateOn::None => "none",
            TerminateOn::Any => "any",
            TerminateOn::Star => "*",
            TerminateOn::Hash => "#",
        })
    }
}

/// What to do when a stored recording with the same name exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IfExists {
    #[default]
    Fail,
    Overwrite,
    Append,
}

impl fmt::Display for IfExists {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IfExists::Fail => "fail",
            IfExists::Overwrite => "overwrite",
            IfExists::Append => "append",
        })
    }
}

#[derive(Debug, Clone)]
pub struct RecordOptions {
    /// Recording name; a random one is used when unset
    pub name: Option<String>,
    /// Default: wav
    pub format: String,
    /// Default: unbounded
    pub max_duration: Option<Duration>,
    /// Default: unbounded
    pub max_silence: Option<Duration>,
    pub beep: bool,
    pub terminate_on: TerminateOn,
    pub if_exists: IfExists,
    /// Default: 1 second
    pub start_timeout: Duration,
    /// Overrides the wait derived from `max_duration`
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            name: None,
            format: "wav".to_string(),
            max_duration: None,
            max_silence: None,
            beep: false,
            terminate_on: TerminateOn::default(),
            if_exists: IfExists::default(),
            start_timeout: DEFAULT_START_TIMEOUT,
            timeout: None,
            cancel: CancellationToken::new(),
        }
    }
}

impl RecordOptions {
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_max_duration(mut self, duration: Duration) -> Self {
        self.max_duration = Some(duration);
        self
    }

    pub fn with_max_silence(mut self, duration: Duration) -> Self {
        self.max_silence = Some(duration);
        self
    }

    pub fn with_beep(mut self, beep: bool) -> Self {
        self.beep = beep;
        self
    }

    pub fn with_terminate_on(mut self, terminate_on: TerminateOn) -> Self {
        self.terminate_on = terminate_on;
        self
    }

    pub fn with_if_exists(mut self, if_exists: IfExists) -> Self {
        self.if_exists = if_exists;
        self
    }

    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Wait for the finish event, measured from the start event
    pub fn overall_timeout(&self) -> Duration {
        self.timeout.unwrap_or(match self.max_duration {
            Some(max) => max + RECORDING_MARGIN,
            None => UNBOUNDED_RECORDING_TIMEOUT,
        })
    }

    fn body(&self, name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "format": self.format,
            "maxDurationSeconds": self.max_duration.map(|d| d.as_secs()).unwrap_or(0),
            "maxSilenceSeconds": self.max_silence.map(|d| d.as_secs()).unwrap_or(0),
            "beep": self.beep,
            "terminateOn": self.terminate_on.to_string(),
            "ifExists": self.if_exists.to_string(),
        })
    }
}

/// A recording that has started
#[derive(Debug)]
pub struct RecordingSession {
    in_flight: InFlight,
    timeout: Duration,
}

impl RecordingSession {
    pub fn name(&self) -> &str {
        self.in_flight.id()
    }

    pub fn started(&self) -> &Event {
        self.in_flight.started()
    }

    /// Wait for the recording to finish or fail
    pub async fn wait_finished(self) -> Result<Outcome> {
        self.in_flight.wait_finished(self.timeout).await
    }

    /// Stop waiting; the recording itself keeps going
    pub fn cancel(&self) {
        self.in_flight.cancel();
    }
}

/// Start recording `target`
///
/// Returns `None` when cancelled before the recording started.
pub async fn record(target: &Target, options: &RecordOptions) -> Result<Option<RecordingSession>> {
    let name = options
        .name
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if options.format.is_empty() {
        return Err(OperationError::InvalidRequest(
            "recording format must not be empty".to_string(),
        ));
    }

    let path = target.path("record");
    let body = options.body(&name);
    tracing::debug!(resource = %target.key(), "Starting recording {}", name);

    let started = Coordinator::new(target.bus().clone(), RECORDING)
        .start_timeout(options.start_timeout)
        .cancel_token(options.cancel.clone())
        .start(target.key(), move || async move {
            let response = target.transport().post(&path, Some(&body)).await?;
            Ok::<_, OperationError>(response_field(response.as_ref(), "name").unwrap_or(name))
        })
        .await?;

    Ok(match started {
        Started::Running(in_flight) => Some(RecordingSession {
            in_flight,
            timeout: options.overall_timeout(),
        }),
        Started::Canceled => None,
    })
}
