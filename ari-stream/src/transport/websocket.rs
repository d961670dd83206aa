use async_trait::async_trait;
use futures::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::{EventTransport, FrameStream};
use crate::config::ClientConfig;
use crate::error::TransportError;

/// Build the event-stream URL: the endpoint plus `app` and `api_key`
/// (`user:password`) query parameters
pub fn events_url(
    websocket_url: &str,
    application: &str,
    username: &str,
    password: &str,
) -> Result<Url, TransportError> {
    let mut url = Url::parse(websocket_url)
        .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", websocket_url, e)))?;

    match url.scheme() {
        "ws" | "wss" => {}
        other => {
            return Err(TransportError::InvalidUrl(format!(
                "{}: unsupported scheme {}",
                websocket_url, other
            )))
        }
    }

    url.query_pairs_mut()
        .append_pair("app", application)
        .append_pair("api_key", &format!("{}:{}", username, password));

    Ok(url)
}

/// [`EventTransport`] over a WebSocket
#[derive(Debug, Clone)]
pub struct WebSocketTransport {
    url: Url,
}

impl WebSocketTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let url = events_url(
            &config.websocket_url,
            &config.application,
            &config.username,
            &config.password,
        )?;
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl EventTransport for WebSocketTransport {
    async fn open(&self) -> Result<Box<dyn FrameStream>, TransportError> {
        tracing::debug!(
            "Opening event stream at {}{}",
            self.url.host_str().unwrap_or_default(),
            self.url.path()
        );

        let (socket, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;

        Ok(Box::new(WebSocketFrames {
            socket,
            closed: false,
        }))
    }
}

struct WebSocketFrames {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
    closed: bool,
}

#[async_trait]
impl FrameStream for WebSocketFrames {
    async fn next_frame(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        if self.closed {
            return None;
        }

        loop {
            match self.socket.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.into_bytes())),
                Ok(Message::Binary(data)) => return Some(Ok(data)),
                Ok(Message::Close(frame)) => {
                    tracing::debug!("Event stream closed by peer: {:?}", frame);
                    self.closed = true;
                    return None;
                }
                // control frames are answered by tungstenite itself
                Ok(_) => continue,
                Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => {
                    self.closed = true;
                    return None;
                }
                Err(e) => return Some(Err(TransportError::Read(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        match self.socket.close(None).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(TransportError::Close(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_events_url_carries_app_and_credentials() {
        let url = events_url("ws://pbx:8088/ari/events", "ivr", "asterisk", "secret").unwrap();
        assert_eq!(
            url.as_str(),
            "ws://pbx:8088/ari/events?app=ivr&api_key=asterisk%3Asecret"
        );
    }

    #[rstest]
    #[case("not a url")]
    #[case("http://pbx:8088/ari/events")]
    fn test_events_url_rejects(#[case] endpoint: &str) {
        assert!(matches!(
            events_url(endpoint, "ivr", "u", "p"),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_transport_from_config() {
        let config = ClientConfig::new("ivr").with_credentials("u", "p");
        let transport = WebSocketTransport::new(&config).unwrap();
        assert_eq!(transport.url().query(), Some("app=ivr&api_key=u%3Ap"));
    }

    #[tokio::test]
    async fn test_open_unreachable_is_connect_error() {
        let config = ClientConfig::new("ivr").with_websocket_url("ws://127.0.0.1:1/ari/events");
        let transport = WebSocketTransport::new(&config).unwrap();
        assert!(matches!(transport.open().await, Err(TransportError::Connect(_))));
    }
}
