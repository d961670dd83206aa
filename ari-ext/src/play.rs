//! Media playback
//!
//! [`play`] starts one media URI on a channel or bridge and waits until the
//! server reports it finished.

use std::time::Duration;

use ari_api::{event_types, key, Event};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::coordinator::{Coordinator, Outcome, Signal, Tracking, DEFAULT_START_TIMEOUT};
use crate::error::{OperationError, Result};
use crate::target::Target;

/// Default wait for a started playback to finish
pub const DEFAULT_PLAYBACK_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Playback events, correlated by playback id
pub const PLAYBACK: Tracking = Tracking {
    kind: key::PLAYBACK,
    event_types: &[event_types::PLAYBACK_STARTED, event_types::PLAYBACK_FINISHED],
    classify: classify_playback,
};

fn classify_playback(event: &Event) -> Option<(&str, Signal)> {
    match event {
        Event::PlaybackStarted(started) => Some((started.playback.id.as_str(), Signal::Started)),
        Event::PlaybackFinished(finished) if finished.playback.state == "failed" => Some((
            finished.playback.id.as_str(),
            Signal::Failed(format!("could not play {}", finished.playback.media_uri)),
        )),
        Event::PlaybackFinished(finished) => {
            Some((finished.playback.id.as_str(), Signal::Finished))
        }
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct PlayOptions {
    /// Playback id to request; a random one is used when unset
    pub id: Option<String>,
    /// Language for `sound:` media
    pub language: Option<String>,
    /// Default: 1 second
    pub start_timeout: Duration,
    /// Measured from the start event. Default: 10 minutes
    pub timeout: Duration,
    pub cancel: CancellationToken,
}

impl Default for PlayOptions {
    fn default() -> Self {
        Self {
            id: None,
            language: None,
            start_timeout: DEFAULT_START_TIMEOUT,
            timeout: DEFAULT_PLAYBACK_TIMEOUT,
            cancel: CancellationToken::new(),
        }
    }
}

impl PlayOptions {
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_start_timeout(mut self, timeout: Duration) -> Self {
        self.start_timeout = timeout;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Play `media` on `target` and wait for it to finish
pub async fn play(target: &Target, media: &str, options: &PlayOptions) -> Result<Outcome> {
    let playback_id = options
        .id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let path = target.path(&format!("play/{}", playback_id));

    let mut body = json!({ "media": media });
    if let Some(language) = &options.language {
        body["lang"] = Value::String(language.clone());
    }

    tracing::debug!(resource = %target.key(), %media, "Starting playback {}", playback_id);

    Coordinator::new(target.bus().clone(), PLAYBACK)
        .start_timeout(options.start_timeout)
        .cancel_token(options.cancel.clone())
        .run(target.key(), options.timeout, move || async move {
            let response = target.transport().post(&path, Some(&body)).await?;
            Ok::<_, OperationError>(response_field(response.as_ref(), "id").unwrap_or(playback_id))
        })
        .await
}

/// Play each URI in turn, stopping at the first error or cancellation
///
/// Every playback gets its own id; `options.id` is ignored.
pub async fn play_sequence(target: &Target, media: &[&str], options: &PlayOptions) -> Result<Outcome> {
    if media.is_empty() {
        return Err(OperationError::InvalidRequest("no media to play".to_string()));
    }

    let options = PlayOptions {
        id: None,
        ..options.clone()
    };

    let mut last = Outcome::Canceled;
    for uri in media {
        last = play(target, uri, &options).await?;
        if last.is_canceled() {
            break;
        }
    }
    Ok(last)
}

/// String field of a command response, if present and non-empty
pub(crate) fn response_field(response: Option<&Value>, field: &str) -> Option<String> {
    response
        .and_then(|value| value.get(field))
        .and_then(Value::as_str)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
