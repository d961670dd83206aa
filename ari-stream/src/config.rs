//! Client configuration
//!
//! [`ClientConfig`] names the ARI application and where to reach it, plus the
//! tuning knobs of the event stream.

use std::time::Duration;

use ari_api::HttpTransport;

use crate::error::{Result, StreamError};

/// Default REST endpoint of a local Asterisk
pub const DEFAULT_URL: &str = "http://localhost:8088/ari";

/// Default event-stream endpoint of a local Asterisk
pub const DEFAULT_WEBSOCKET_URL: &str = "ws://localhost:8088/ari/events";

/// Connection settings for one ARI application
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Name of the Stasis application to register
    /// Default: empty (must be set)
    pub application: String,

    /// Base URL of the REST interface
    /// Default: http://localhost:8088/ari
    pub url: String,

    /// URL of the event-stream endpoint
    /// Default: ws://localhost:8088/ari/events
    pub websocket_url: String,

    /// ARI user
    /// Default: empty
    pub username: String,

    /// ARI password
    /// Default: empty
    pub password: String,

    /// Pause between reconnect attempts after the stream drops
    /// Default: 100 milliseconds
    pub reconnect_delay: Duration,

    /// Longest wait for the stream's close handshake before it is abandoned
    /// Default: 1 second
    pub close_timeout: Duration,

    /// Capacity of each subscription's delivery queue
    /// Default: 100
    pub subscription_queue_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            application: String::new(),
            url: DEFAULT_URL.to_string(),
            websocket_url: DEFAULT_WEBSOCKET_URL.to_string(),
            username: String::new(),
            password: String::new(),
            reconnect_delay: Duration::from_millis(100),
            close_timeout: Duration::from_secs(1),
            subscription_queue_size: crate::bus::DEFAULT_QUEUE_SIZE,
        }
    }
}

impl ClientConfig {
    /// Create a configuration for `application` with default endpoints
    pub fn new(application: impl Into<String>) -> Self {
        Self {
            application: application.into(),
            ..Default::default()
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.application.trim().is_empty() {
            return Err(StreamError::Configuration(
                "application name must not be empty".to_string(),
            ));
        }

        if self.url.is_empty() {
            return Err(StreamError::Configuration(
                "url must not be empty".to_string(),
            ));
        }

        if self.websocket_url.is_empty() {
            return Err(StreamError::Configuration(
                "websocket_url must not be empty".to_string(),
            ));
        }

        if self.subscription_queue_size == 0 {
            return Err(StreamError::Configuration(
                "subscription_queue_size must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_websocket_url(mut self, websocket_url: impl Into<String>) -> Self {
        self.websocket_url = websocket_url.into();
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_close_timeout(mut self, timeout: Duration) -> Self {
        self.close_timeout = timeout;
        self
    }

    pub fn with_subscription_queue_size(mut self, size: usize) -> Self {
        self.subscription_queue_size = size;
        self
    }

    /// REST transport for the same server and credentials
    pub fn rest_transport(&self) -> HttpTransport {
        HttpTransport::new(self.url.clone(), self.username.clone(), self.password.clone())
    }
}
