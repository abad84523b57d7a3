//! Client behaviour against a minimal in-process websocket server.

#![allow(missing_docs)]

use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tally_client::{ClientConfig, ClientEvent, ClientState, Envelope, ReconnectingClient};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message;

const WAIT: Duration = Duration::from_secs(5);

async fn next_event(events: &mut UnboundedReceiver<ClientEvent>) -> ClientEvent {
    timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for client event")
        .expect("event stream ended")
}

fn fast_config(url: String) -> ClientConfig {
    ClientConfig::new(url)
        .base_delay(Duration::from_millis(20))
        .max_delay(Duration::from_millis(100))
        .jitter_range(Duration::ZERO)
}

async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn answers_pings_and_forwards_messages() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        ws.send(Message::Text(Envelope::ping().to_text().into()))
            .await
            .unwrap();
        let reply = ws.next().await.unwrap().unwrap();
        ws.send(Message::Text(
            r#"{"type":"device_status","payload":{"status":"online"}}"#.into(),
        ))
        .await
        .unwrap();
        let reply = Envelope::decode(reply.to_text().unwrap()).unwrap();
        // Keep the socket open until the client hangs up.
        while let Some(Ok(_)) = ws.next().await {}
        reply
    });

    let (client, mut events) = ReconnectingClient::spawn(fast_config(url)).unwrap();
    assert_eq!(next_event(&mut events).await, ClientEvent::Opened);
    assert_eq!(client.state(), ClientState::Open);

    match next_event(&mut events).await {
        ClientEvent::Message(env) => {
            assert_eq!(env.kind, "device_status");
            assert_eq!(env.payload["status"], "online");
        }
        other => panic!("unexpected {other:?}"),
    }

    client.disconnect(true);
    assert_eq!(next_event(&mut events).await, ClientEvent::Closed);
    client.join().await;

    let reply = server.await.unwrap();
    assert_eq!(reply.kind, "pong");
}

#[tokio::test]
async fn reconnects_after_server_drop() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        drop(ws);

        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let (client, mut events) = ReconnectingClient::spawn(fast_config(url)).unwrap();
    assert_eq!(next_event(&mut events).await, ClientEvent::Opened);

    match next_event(&mut events).await {
        ClientEvent::Disconnected { attempt, retry_in } => {
            assert_eq!(attempt, 1);
            assert_eq!(retry_in, Duration::from_millis(40));
        }
        other => panic!("unexpected {other:?}"),
    }

    assert_eq!(next_event(&mut events).await, ClientEvent::Opened);
    assert_eq!(client.attempts(), 0);
    client.disconnect(true);
    client.join().await;
}

#[tokio::test]
async fn silent_peer_is_dropped_after_pong_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    let accepted = Arc::new(AtomicUsize::new(0));
    let pings = Arc::new(AtomicUsize::new(0));

    // Reads everything, answers nothing.
    tokio::spawn({
        let accepted = Arc::clone(&accepted);
        let pings = Arc::clone(&pings);
        async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                accepted.fetch_add(1, Ordering::SeqCst);
                let pings = Arc::clone(&pings);
                tokio::spawn(async move {
                    let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
                    while let Some(Ok(frame)) = ws.next().await {
                        let is_ping = frame
                            .to_text()
                            .ok()
                            .and_then(Envelope::decode)
                            .is_some_and(|e| e.kind == "ping");
                        if is_ping {
                            pings.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        }
    });

    let config = fast_config(url)
        .ping_interval(Duration::from_millis(50))
        .pong_timeout(Duration::from_millis(200));
    let (client, mut events) = ReconnectingClient::spawn(config).unwrap();
    assert_eq!(next_event(&mut events).await, ClientEvent::Opened);
    let opened_at = tokio::time::Instant::now();

    match next_event(&mut events).await {
        ClientEvent::Disconnected { attempt, retry_in } => {
            assert_eq!(attempt, 1);
            assert_eq!(retry_in, Duration::from_millis(40));
        }
        other => panic!("unexpected {other:?}"),
    }
    let elapsed = opened_at.elapsed();
    // First ping at 50ms, deadline 200ms after it.
    assert!(elapsed >= Duration::from_millis(200), "dropped too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "dropped too late: {elapsed:?}");
    assert!(pings.load(Ordering::SeqCst) >= 1);

    assert_eq!(next_event(&mut events).await, ClientEvent::Opened);
    assert_eq!(accepted.load(Ordering::SeqCst), 2);

    client.disconnect(true);
    client.join().await;
}

#[tokio::test]
async fn gives_up_after_budget() {
    let url = format!("ws://127.0.0.1:{}/ws", unused_port().await);
    let (client, mut events) =
        ReconnectingClient::spawn(fast_config(url).max_attempts(2)).unwrap();

    assert!(!client.send(&Envelope::pong()));

    for expected in 1..=2 {
        match next_event(&mut events).await {
            ClientEvent::Disconnected { attempt, .. } => assert_eq!(attempt, expected),
            other => panic!("unexpected {other:?}"),
        }
    }
    assert_eq!(
        next_event(&mut events).await,
        ClientEvent::Failed { attempts: 2 }
    );

    assert!(client.is_failed());
    assert_eq!(client.state(), ClientState::Closed);
    client.join().await;
}

#[test]
fn rejects_non_websocket_urls() {
    assert!(ReconnectingClient::spawn(ClientConfig::new("http://example.com")).is_err());
}
