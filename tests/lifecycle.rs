//! End-to-end runs of the plain pipeline against a recording server.

use std::io::Read;
use std::net::TcpListener as StdListener;

use scripted_client::config::defaults::DEFAULT_PAYLOAD;
use scripted_client::config::InboundUnit;
use scripted_client::net::LifecycleState;
use scripted_client::{ClientError, ClientSettings, PayloadSource, SignalError, Target};

use common::{RecordingServer, ScriptedConsole, ServerScript, WAIT};

mod common;

#[tokio::test]
async fn run_without_payload_sends_nothing() {
    let server = RecordingServer::plain(ServerScript::default()).await;
    let client = common::client(server.target(), None, "");
    let connected = client.connected();
    let payload_sent = client.payload_sent();
    let threshold = client.threshold_received();

    let handle = client.start().unwrap();
    assert!(common::join(handle).await.is_ok());

    assert!(connected.wait().await.is_ok());
    assert!(payload_sent.wait().await.is_ok());
    // Zero threshold is met as soon as the pipeline is installed.
    assert!(threshold.wait().await.is_ok());
    assert!(server.received().await.is_empty());
}

#[tokio::test]
async fn payload_then_console_until_sentinel() {
    let server = RecordingServer::plain(ServerScript::default()).await;
    let client = common::client(server.target(), Some(b"PAYLOAD"), "hello\nBYE\nignored\n");
    let payload_sent = client.payload_sent();

    let handle = client.start().unwrap();
    assert!(common::join(handle).await.is_ok());

    assert!(payload_sent.wait().await.is_ok());
    assert_eq!(server.received().await, b"PAYLOADhelloBYE");
}

#[tokio::test]
async fn console_end_of_input_closes_the_run() {
    let server = RecordingServer::plain(ServerScript::default()).await;
    let client = common::client(server.target(), Some(DEFAULT_PAYLOAD), "a\r\nb");

    let handle = client.start().unwrap();
    assert!(common::join(handle).await.is_ok());

    let mut expected = DEFAULT_PAYLOAD.to_vec();
    expected.extend_from_slice(b"ab");
    assert_eq!(server.received().await, expected);
}

struct BrokenPayload;

impl Read for BrokenPayload {
    fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
    }
}

#[tokio::test]
async fn payload_read_failure_skips_interactive_phase() {
    let server = RecordingServer::plain(ServerScript::default()).await;
    let mut client = common::client(server.target(), None, "hello
bye
");
    client.set_payload(Some(PayloadSource::from_reader(BrokenPayload)));
    let connected = client.connected();
    let payload_sent = client.payload_sent();

    let handle = client.start().unwrap();
    let result = common::join(handle).await;

    assert!(matches!(result, Err(ClientError::Payload(_))));
    assert!(connected.wait().await.is_ok());
    assert!(matches!(
        payload_sent.wait().await,
        Err(SignalError::Failed(ClientError::Payload(_)))
    ));
    assert!(server.received().await.is_empty());
}

#[tokio::test]
async fn refused_connect_fails_every_signal() {
    let port = {
        let listener = StdListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = common::client(Target::new("127.0.0.1", port), Some(b"never"), "");
    let connected = client.connected();
    let payload_sent = client.payload_sent();
    let threshold = client.threshold_received();

    let handle = client.start().unwrap();
    tokio::time::timeout(WAIT, handle.closed()).await.unwrap();
    assert_eq!(handle.state(), LifecycleState::Closed);

    let result = common::join(handle).await;
    assert!(matches!(result, Err(ClientError::Connect { .. })));
    assert!(matches!(
        connected.wait().await,
        Err(SignalError::Failed(ClientError::Connect { .. }))
    ));
    assert!(payload_sent.wait().await.is_err());
    assert!(threshold.wait().await.is_err());
}

#[tokio::test]
async fn disconnect_is_idempotent_and_fails_pending_signals() {
    let server = RecordingServer::plain(ServerScript::default()).await;
    let (feeder, console) = ScriptedConsole::new();
    let mut client = scripted_client::ScriptedClient::new(server.target(), None);
    client.set_console(console);
    client.set_threshold(5);
    let threshold = client.threshold_received();

    let handle = client.start().unwrap();
    assert!(tokio::time::timeout(WAIT, handle.connected().wait()).await.unwrap().is_ok());

    let released = handle.disconnect();
    assert!(tokio::time::timeout(WAIT, released.wait()).await.unwrap().is_ok());
    assert!(matches!(
        threshold.wait().await,
        Err(SignalError::Failed(ClientError::Disconnected))
    ));

    // The driver is still parked on the console; end its input.
    drop(feeder);
    tokio::time::timeout(WAIT, handle.closed()).await.unwrap();
    assert_eq!(handle.state(), LifecycleState::Closed);

    let again = handle.disconnect();
    assert!(again.is_settled());
    let _ = common::join(handle).await;
}

#[tokio::test]
async fn disconnect_after_close_is_a_no_op() {
    let server = RecordingServer::plain(ServerScript::default()).await;
    let handle = common::client(server.target(), Some(b"x"), "").start().unwrap();

    tokio::time::timeout(WAIT, handle.closed()).await.unwrap();
    assert!(handle.disconnect().is_settled());
    assert!(handle.disconnect().is_settled());
    assert!(handle.payload_sent().try_get().unwrap().is_ok());
    assert!(common::join(handle).await.is_ok());
    assert_eq!(server.received().await, b"x");
}

#[tokio::test]
async fn concurrent_clients_are_isolated() {
    let first = RecordingServer::plain(ServerScript::default()).await;
    let second = RecordingServer::plain(ServerScript::default()).await;

    let a = common::client(first.target(), Some(b"AAAA"), "one\nbye\n").start().unwrap();
    let b = common::client(second.target(), Some(b"BBBB"), "two\n").start().unwrap();
    assert_ne!(a.id(), b.id());

    assert!(common::join(a).await.is_ok());
    assert!(common::join(b).await.is_ok());
    assert_eq!(first.received().await, b"AAAAonebye");
    assert_eq!(second.received().await, b"BBBBtwo");
}

#[tokio::test]
async fn frame_threshold_is_met_by_server_greeting() {
    let server = RecordingServer::plain(ServerScript {
        greeting: DEFAULT_PAYLOAD,
        hang_up: false,
    })
    .await;
    let (feeder, console) = ScriptedConsole::new();
    let mut client = scripted_client::ScriptedClient::new(server.target(), None);
    client.set_console(console);
    client.set_threshold(2);
    let threshold = client.threshold_received();

    let handle = client.start().unwrap();
    assert!(tokio::time::timeout(WAIT, threshold.wait()).await.unwrap().is_ok());

    feeder.send(b"bye\n".to_vec()).unwrap();
    assert!(common::join(handle).await.is_ok());
    assert_eq!(server.received().await, b"bye");
}

#[tokio::test]
async fn byte_threshold_counts_raw_bytes() {
    let server = RecordingServer::plain(ServerScript {
        greeting: b"0123456789",
        hang_up: false,
    })
    .await;
    let (feeder, console) = ScriptedConsole::new();
    let mut client = scripted_client::ScriptedClient::new(server.target(), None);
    client.set_console(console);
    client.set_threshold(10);
    client.set_settings(ClientSettings {
        unit: InboundUnit::Bytes,
        ..ClientSettings::default()
    });
    let threshold = client.threshold_received();

    let handle = client.start().unwrap();
    assert!(tokio::time::timeout(WAIT, threshold.wait()).await.unwrap().is_ok());

    drop(feeder);
    assert!(common::join(handle).await.is_ok());
}

#[tokio::test]
async fn peer_close_before_threshold_fails_it() {
    let server = RecordingServer::plain(ServerScript {
        greeting: &DEFAULT_PAYLOAD[..8],
        hang_up: true,
    })
    .await;
    let (feeder, console) = ScriptedConsole::new();
    let mut client = scripted_client::ScriptedClient::new(server.target(), None);
    client.set_console(console);
    client.set_threshold(3);
    let threshold = client.threshold_received();

    let handle = client.start().unwrap();
    let outcome = tokio::time::timeout(WAIT, threshold.wait()).await.unwrap();
    assert!(matches!(
        outcome,
        Err(SignalError::Failed(ClientError::PeerClosed {
            received: 1,
            expected: 3
        }))
    ));

    drop(feeder);
    let _ = common::join(handle).await;
}
