//! Connection lifecycle against a scripted transport

mod common;

use std::sync::Arc;
use std::time::Duration;

use ari_stream::{
    event_types, ClientConfig, Connection, ConnectionState, Key, StreamError, TransportError,
};
use common::{
    accept, accept_unresponsive, channel_event, Attempt, LogCapture, ScriptedTransport,
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

const WAIT: Duration = Duration::from_secs(2);

fn config() -> ClientConfig {
    ClientConfig::new("ivr").with_reconnect_delay(Duration::from_millis(10))
}

async fn wait_for(state: &mut watch::Receiver<ConnectionState>, wanted: ConnectionState) {
    tokio::time::timeout(WAIT, state.wait_for(|current| *current == wanted))
        .await
        .expect("state not reached in time")
        .expect("state channel closed");
}

async fn eventually(check: impl Fn() -> bool) {
    tokio::time::timeout(WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_first_connect_failure_is_reported() {
    let transport = ScriptedTransport::new(vec![Attempt::Refuse]);

    let result = Connection::builder(config())
        .transport(transport.clone())
        .connect()
        .await;

    assert!(matches!(
        result,
        Err(StreamError::Transport(TransportError::Connect(_)))
    ));
    assert_eq!(transport.opened(), 1);
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_connecting() {
    let transport = ScriptedTransport::new(vec![]);

    let result = Connection::builder(ClientConfig::default())
        .transport(transport.clone())
        .connect()
        .await;

    assert!(matches!(result, Err(StreamError::Configuration(_))));
    assert_eq!(transport.opened(), 0);
}

#[tokio::test]
async fn test_frames_are_published_in_order() {
    let (attempt, feed) = accept();
    let transport = ScriptedTransport::new(vec![attempt]);
    let connection = Connection::builder(config())
        .transport(transport.clone())
        .connect()
        .await
        .unwrap();

    let mut subscription = connection
        .bus()
        .subscribe(Key::for_app("ivr"), &[event_types::ALL]);

    feed.send_event(&channel_event("StasisStart", "c1"));
    feed.send_event(&channel_event("ChannelStateChange", "c1"));
    feed.send_event(&channel_event("StasisEnd", "c1"));

    for expected in ["StasisStart", "ChannelStateChange", "StasisEnd"] {
        let event = subscription.next_timeout(WAIT).await.unwrap();
        assert_eq!(event.event_type(), expected);
    }

    connection.close().await;
}

#[tokio::test]
async fn test_bad_frames_are_skipped_and_logged() {
    let logs = LogCapture::default();
    let (attempt, feed) = accept();
    let transport = ScriptedTransport::new(vec![attempt]);
    let connection = Connection::builder(config())
        .transport(transport.clone())
        .logger(logs.dispatch())
        .connect()
        .await
        .unwrap();

    let mut subscription = connection
        .bus()
        .subscribe(Key::default(), &[event_types::ALL]);

    feed.send("");
    feed.send("not json");
    feed.send(r#"{"application":"ivr"}"#);
    feed.send_event(&channel_event("StasisEnd", "c1"));

    let event = subscription.next_timeout(WAIT).await.unwrap();
    assert_eq!(event.event_type(), "StasisEnd");
    assert_eq!(connection.state(), ConnectionState::Streaming);

    connection.close().await;

    let output = logs.contents();
    assert_eq!(output.matches("Dropping undecodable frame").count(), 2);
    assert!(output.contains("ari_events"));
}

#[tokio::test]
async fn test_reconnects_after_stream_breaks() {
    let (first, first_feed) = accept();
    let (second, second_feed) = accept();
    let transport = ScriptedTransport::new(vec![first, Attempt::Refuse, second]);
    let connection = Connection::builder(config())
        .transport(transport.clone())
        .connect()
        .await
        .unwrap();

    let mut subscription = connection
        .bus()
        .subscribe(Key::new("channel", "c1"), &[event_types::ALL]);
    let mut state = connection.watch_state();

    first_feed.send_event(&channel_event("StasisStart", "c1"));
    assert!(subscription.next_timeout(WAIT).await.is_some());

    first_feed.break_stream("connection reset");
    wait_for(&mut state, ConnectionState::Disconnected).await;
    wait_for(&mut state, ConnectionState::Streaming).await;

    second_feed.send_event(&channel_event("StasisEnd", "c1"));
    let event = subscription.next_timeout(WAIT).await.unwrap();
    assert_eq!(event.event_type(), "StasisEnd");

    assert_eq!(transport.opened(), 3);
    assert_eq!(transport.closed(), 1);

    connection.close().await;
}

#[tokio::test]
async fn test_server_close_triggers_reconnect() {
    let (first, first_feed) = accept();
    let (second, second_feed) = accept();
    let transport = ScriptedTransport::new(vec![first, second]);
    let connection = Connection::builder(config())
        .transport(transport.clone())
        .connect()
        .await
        .unwrap();
    let mut subscription = connection
        .bus()
        .subscribe(Key::default(), &[event_types::ALL]);

    drop(first_feed);

    second_feed.send_event(&channel_event("StasisStart", "c9"));
    let event = subscription.next_timeout(WAIT).await.unwrap();
    assert_eq!(event.keys().ids(), vec!["c9"]);
    assert_eq!(transport.opened(), 2);

    connection.close().await;
}

#[tokio::test]
async fn test_close_terminates_and_is_idempotent() {
    let (attempt, _feed) = accept();
    let transport = ScriptedTransport::new(vec![attempt]);
    let connection = Connection::builder(config())
        .transport(transport.clone())
        .connect()
        .await
        .unwrap();
    let mut subscription = connection
        .bus()
        .subscribe(Key::default(), &[event_types::ALL]);

    connection.close().await;
    connection.close().await;

    assert_eq!(connection.state(), ConnectionState::Terminated);
    assert!(connection.bus().is_closed());
    assert!(subscription.next().await.is_none());
    assert_eq!(transport.closed(), 1);
}

#[tokio::test]
async fn test_close_gives_up_on_unanswered_close_handshake() {
    let logs = LogCapture::default();
    let (attempt, _feed) = accept_unresponsive();
    let transport = ScriptedTransport::new(vec![attempt]);
    let connection = Connection::builder(config().with_close_timeout(Duration::from_millis(20)))
        .transport(transport.clone())
        .logger(logs.dispatch())
        .connect()
        .await
        .unwrap();

    tokio::time::timeout(WAIT, connection.close())
        .await
        .expect("close stalled on the stream");

    assert_eq!(connection.state(), ConnectionState::Terminated);
    assert_eq!(transport.closed(), 0);
    assert!(logs.contents().contains("Event stream close timed out"));
}

#[tokio::test]
async fn test_stop_signal_terminates_while_retrying() {
    let (attempt, feed) = accept();
    let transport = ScriptedTransport::new(vec![attempt]);
    let stop = CancellationToken::new();
    let connection = Connection::builder(config())
        .transport(transport.clone())
        .stop_signal(stop.clone())
        .connect()
        .await
        .unwrap();
    let mut state = connection.watch_state();

    // every later attempt is refused, so the reader keeps retrying
    drop(feed);
    eventually(|| transport.opened() >= 3).await;
    assert_ne!(connection.state(), ConnectionState::Streaming);

    stop.cancel();
    wait_for(&mut state, ConnectionState::Terminated).await;
    assert!(connection.bus().is_closed());
    assert_eq!(connection.state(), ConnectionState::Terminated);
}

#[tokio::test]
async fn test_dropping_connection_stops_reader() {
    let (attempt, _feed) = accept();
    let transport = ScriptedTransport::new(vec![attempt]);
    let connection = Connection::builder(config())
        .transport(transport.clone())
        .connect()
        .await
        .unwrap();
    let mut state = connection.watch_state();
    let bus = connection.bus().clone();

    drop(connection);

    wait_for(&mut state, ConnectionState::Terminated).await;
    assert!(bus.is_closed());
    assert_eq!(transport.closed(), 1);
}

#[tokio::test]
async fn test_shared_transport_between_connections() {
    let (first, first_feed) = accept();
    let (second, second_feed) = accept();
    let transport = Arc::new(ScriptedTransport::default());
    transport.push(first);
    transport.push(second);

    let a = Connection::builder(ClientConfig::new("a"))
        .transport(transport.clone())
        .connect()
        .await
        .unwrap();
    let b = Connection::builder(ClientConfig::new("b"))
        .transport(transport.clone())
        .connect()
        .await
        .unwrap();

    let mut on_a = a.bus().subscribe(Key::default(), &[event_types::ALL]);
    let mut on_b = b.bus().subscribe(Key::default(), &[event_types::ALL]);

    first_feed.send_event(&channel_event("StasisStart", "c1"));
    assert!(on_a.next_timeout(WAIT).await.is_some());
    assert!(on_b.try_next().is_none());

    second_feed.send_event(&channel_event("StasisStart", "c2"));
    assert!(on_b.next_timeout(WAIT).await.is_some());

    a.close().await;
    assert!(!b.bus().is_closed());
    b.close().await;
}
