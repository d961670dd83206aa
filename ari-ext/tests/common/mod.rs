//! Mock ARI server for operation tests
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ari_api::key::CHANNEL;
use ari_api::{ApiError, Event, Key, ResourceTransport};
use ari_ext::Target;
use ari_stream::Bus;
use async_trait::async_trait;
use serde_json::{json, Value};

/// How the server answers one command
pub struct Reaction {
    pub response: Result<Option<Value>, ApiError>,
    /// Events published after the response, each after its delay
    pub events: Vec<(Duration, Value)>,
}

impl Reaction {
    pub fn ok(events: Vec<(Duration, Value)>) -> Self {
        Self {
            response: Ok(None),
            events,
        }
    }
}

type React = Box<dyn Fn(&str, &Value) -> Reaction + Send + Sync>;

/// Answers POSTs with scripted reactions and publishes their events on a bus
pub struct MockServer {
    bus: Bus,
    posts: Mutex<Vec<(String, Value)>>,
    react: React,
}

impl MockServer {
    pub fn new<F>(bus: &Bus, react: F) -> Arc<Self>
    where
        F: Fn(&str, &Value) -> Reaction + Send + Sync + 'static,
    {
        Arc::new(Self {
            bus: bus.clone(),
            posts: Mutex::new(Vec::new()),
            react: Box::new(react),
        })
    }

    pub fn posts(&self) -> Vec<(String, Value)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResourceTransport for MockServer {
    async fn get(&self, _path: &str) -> Result<Option<Value>, ApiError> {
        Ok(None)
    }

    async fn post(&self, path: &str, body: Option<&Value>) -> Result<Option<Value>, ApiError> {
        let body = body.cloned().unwrap_or(Value::Null);
        self.posts.lock().unwrap().push((path.to_string(), body.clone()));

        let reaction = (self.react)(path, &body);
        let bus = self.bus.clone();
        tokio::spawn(async move {
            for (delay, event) in reaction.events {
                tokio::time::sleep(delay).await;
                bus.send(decode(&event));
            }
        });
        reaction.response
    }

    async fn put(&self, _path: &str, _body: Option<&Value>) -> Result<Option<Value>, ApiError> {
        Ok(None)
    }

    async fn delete(&self, _path: &str, _query: &[(&str, &str)]) -> Result<Option<Value>, ApiError> {
        Ok(None)
    }
}

pub fn decode(value: &Value) -> Event {
    Event::decode(&serde_json::to_vec(value).unwrap()).unwrap()
}

pub fn channel_target(server: &Arc<MockServer>, bus: &Bus) -> Target {
    Target::new(
        Key::new(CHANNEL, "c1").with_app("ivr"),
        server.clone(),
        bus.clone(),
    )
    .unwrap()
}

/// Playback id from a `channels/c1/play/<id>` path
pub fn playback_id(path: &str) -> String {
    path.rsplit('/').next().unwrap_or_default().to_string()
}

pub fn playback(event_type: &str, id: &str, state: &str) -> Value {
    json!({
        "type": event_type,
        "application": "ivr",
        "timestamp": "2016-03-21T17:17:55.416-0500",
        "playback": {
            "id": id,
            "media_uri": "sound:hello-world",
            "target_uri": "channel:c1",
            "state": state
        }
    })
}

pub fn recording(event_type: &str, name: &str, cause: Option<&str>) -> Value {
    let mut event = json!({
        "type": event_type,
        "application": "ivr",
        "recording": {
            "name": name,
            "format": "wav",
            "state": "recording",
            "target_uri": "channel:c1"
        }
    });
    if let Some(cause) = cause {
        event["recording"]["cause"] = json!(cause);
    }
    event
}

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}
