//! Test helpers shared by the ari-stream integration tests
#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use ari_stream::{Event, EventTransport, FrameStream, TransportError};
use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing_subscriber::fmt::MakeWriter;

/// What the server does on one connection attempt
pub enum Attempt {
    Refuse,
    Accept(mpsc::UnboundedReceiver<Frame>),
    /// Accepts, but the close handshake never completes
    Unresponsive(mpsc::UnboundedReceiver<Frame>),
}

pub enum Frame {
    Data(Vec<u8>),
    Broken(String),
}

/// Feeds frames into one accepted connection; dropping it ends the stream
#[derive(Clone)]
pub struct Feed(mpsc::UnboundedSender<Frame>);

impl Feed {
    pub fn send(&self, frame: impl Into<Vec<u8>>) {
        let _ = self.0.send(Frame::Data(frame.into()));
    }

    pub fn send_event(&self, event: &Value) {
        self.send(serde_json::to_vec(event).unwrap());
    }

    pub fn break_stream(&self, reason: &str) {
        let _ = self.0.send(Frame::Broken(reason.to_string()));
    }
}

pub fn accept() -> (Attempt, Feed) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Attempt::Accept(rx), Feed(tx))
}

pub fn accept_unresponsive() -> (Attempt, Feed) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Attempt::Unresponsive(rx), Feed(tx))
}

/// [`EventTransport`] that plays back scripted connection attempts; once the
/// script runs out every attempt is refused
#[derive(Default)]
pub struct ScriptedTransport {
    attempts: Mutex<VecDeque<Attempt>>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new(attempts: Vec<Attempt>) -> Arc<Self> {
        Arc::new(Self {
            attempts: Mutex::new(attempts.into()),
            ..Default::default()
        })
    }

    pub fn push(&self, attempt: Attempt) {
        self.attempts.lock().unwrap().push_back(attempt);
    }

    /// Connection attempts made so far
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Streams closed by the reader
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventTransport for ScriptedTransport {
    async fn open(&self) -> Result<Box<dyn FrameStream>, TransportError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        let attempt = self.attempts.lock().unwrap().pop_front();
        match attempt {
            Some(Attempt::Accept(frames)) => Ok(Box::new(ScriptedStream {
                frames,
                closed: false,
                hangs_on_close: false,
                close_count: Arc::clone(&self.closed),
            })),
            Some(Attempt::Unresponsive(frames)) => Ok(Box::new(ScriptedStream {
                frames,
                closed: false,
                hangs_on_close: true,
                close_count: Arc::clone(&self.closed),
            })),
            Some(Attempt::Refuse) | None => {
                Err(TransportError::Connect("connection refused".to_string()))
            }
        }
    }
}

struct ScriptedStream {
    frames: mpsc::UnboundedReceiver<Frame>,
    closed: bool,
    hangs_on_close: bool,
    close_count: Arc<AtomicUsize>,
}

#[async_trait]
impl FrameStream for ScriptedStream {
    async fn next_frame(&mut self) -> Option<Result<Vec<u8>, TransportError>> {
        match self.frames.recv().await? {
            Frame::Data(data) => Some(Ok(data)),
            Frame::Broken(reason) => Some(Err(TransportError::Read(reason))),
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        if self.hangs_on_close {
            std::future::pending::<()>().await;
        }
        if !self.closed {
            self.closed = true;
            self.close_count.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

pub fn channel_event(event_type: &str, channel: &str) -> Value {
    json!({
        "type": event_type,
        "application": "ivr",
        "timestamp": "2016-03-21T17:17:55.416-0500",
        "asterisk_id": "ast-01",
        "channel": {"id": channel, "name": format!("PJSIP/{}", channel), "state": "Up"}
    })
}

pub fn entered_bridge(bridge: &str, channel: &str) -> Event {
    let frame = json!({
        "type": "ChannelEnteredBridge",
        "application": "ivr",
        "asterisk_id": "ast-01",
        "bridge": {"id": bridge, "technology": "simple_bridge"},
        "channel": {"id": channel}
    });
    Event::decode(&serde_json::to_vec(&frame).unwrap()).unwrap()
}

/// Collects formatted log output in memory
#[derive(Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn dispatch(&self) -> tracing::Dispatch {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        tracing::Dispatch::new(subscriber)
    }
}

pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter(Arc::clone(&self.0))
    }
}
