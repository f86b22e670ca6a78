//! End-to-end tests for [`GridClient`] over a real local WebSocket server.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use gridlink::prelude::*;
use gridlink::{GridClientBuilder, GridlinkError, NoUpstream, StaticUpstream};
use gridlink_protocol::{Envelope, FrameCodec, ServerStats, WireCodec};
use gridlink_sync::SyncError;
use gridlink_transport::Frame;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;

type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

async fn listen() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, format!("ws://{addr}/websocket"))
}

async fn accept(listener: &TcpListener) -> ServerWs {
    let (stream, _) = listener.accept().await.unwrap();
    tokio_tungstenite::accept_async(stream).await.unwrap()
}

fn codec() -> FrameCodec<WireCodec> {
    FrameCodec::default()
}

async fn send(ws: &mut ServerWs, envelope: Envelope) {
    let bytes = codec().encode(&envelope).unwrap();
    ws.send(Message::Binary(bytes.into())).await.unwrap();
}

async fn next_request(ws: &mut ServerWs) -> Envelope {
    loop {
        match ws.next().await.unwrap().unwrap() {
            Message::Binary(data) => {
                return codec().try_decode(&Frame::Binary(data.to_vec())).unwrap();
            }
            _ => continue,
        }
    }
}

fn snapshot(time: u64, x: u32, y: u32) -> ServerState {
    ServerState::new(time, PlayerState::new("me", x, y))
}

fn recorder<U: Upstream>(client: &GridClient<U>) -> Arc<Mutex<Vec<u64>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    client.on_new_state(move |state| sink.lock().unwrap().push(state.time));
    seen
}

async fn wait_connected<U: Upstream>(client: &GridClient<U>) {
    let mut rx = client.watch_connection();
    rx.wait_for(|s| *s == ConnectionState::Connected)
        .await
        .unwrap();
}

/// Polls until `check` holds. Real sockets need real time.
async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met in time");
}

// =========================================================================
// Setup
// =========================================================================

#[tokio::test]
async fn test_connect_refuses_plain_ws_by_default() {
    let result = GridClient::builder()
        .url("ws://127.0.0.1:1/websocket")
        .connect();
    assert!(matches!(result, Err(GridlinkError::InsecureUrl(_))));
}

#[tokio::test]
async fn test_connect_without_endpoint_fails() {
    assert!(matches!(
        GridClient::builder().connect(),
        Err(GridlinkError::MissingEndpoint)
    ));
}

#[cfg(feature = "tls")]
#[tokio::test]
async fn test_host_resolves_to_secure_endpoint() {
    let client = GridClient::builder().host("grid.invalid").connect().unwrap();
    assert_eq!(client.url().as_str(), "wss://grid.invalid/websocket");
    client.close();
}

#[cfg(not(feature = "tls"))]
#[tokio::test]
async fn test_secure_endpoint_without_tls_fails_at_setup() {
    let result = GridClient::builder().host("grid.invalid").connect();
    match result {
        Err(GridlinkError::TlsUnavailable(endpoint)) => {
            assert_eq!(endpoint, "wss://grid.invalid/websocket");
        }
        Err(other) => panic!("expected TlsUnavailable, got {other}"),
        Ok(_) => panic!("expected TlsUnavailable, got a client"),
    }
}

/// A plain-ws client pointed at a port nobody listens on.
fn offline_builder() -> GridClientBuilder {
    GridClient::builder()
        .url("ws://127.0.0.1:1/websocket")
        .allow_insecure(true)
}

// =========================================================================
// Realtime flow
// =========================================================================

#[tokio::test]
async fn test_move_round_trip_over_websocket() {
    let (listener, url) = listen().await;
    let client = GridClient::builder()
        .url(url)
        .allow_insecure(true)
        .connect()
        .unwrap();
    let seen = recorder(&client);
    let mut server = accept(&listener).await;
    wait_connected(&client).await;

    send(&mut server, Envelope::StateUpdate(snapshot(41, 2, 2))).await;
    eventually(|| seen.lock().unwrap().len() == 1).await;

    let fov = FieldOfView::new(0, 0, 10, 10);
    let server_task = tokio::spawn(async move {
        let request = next_request(&mut server).await;
        // A push that races the response is held back by the client.
        send(&mut server, Envelope::StateUpdate(snapshot(50, 9, 9))).await;
        send(&mut server, Envelope::MoveResponse(snapshot(42, 2, 3))).await;
        (request, server)
    });

    let outcome = client.move_to(2, 3, fov).await;
    let (request, _server) = server_task.await.unwrap();

    match request {
        Envelope::MoveRequest(data) => {
            assert_eq!((data.grid_x, data.grid_y, data.fov), (2, 3, fov));
        }
        other => panic!("unexpected {}", other.kind()),
    }
    assert!(matches!(
        outcome,
        MoveOutcome::Responded {
            time: 42,
            offer: Offer::Notified
        }
    ));
    assert_eq!(*seen.lock().unwrap(), vec![41, 42]);
    assert_eq!(client.last_update_time(), 42);
    assert_eq!(client.stats().suppressed, 1);
    client.close();
}

#[tokio::test]
async fn test_undecodable_frames_are_ignored() {
    let (listener, url) = listen().await;
    let client = GridClient::builder()
        .url(url)
        .allow_insecure(true)
        .connect()
        .unwrap();
    let seen = recorder(&client);
    let mut server = accept(&listener).await;

    server.send(Message::Text("hello".into())).await.unwrap();
    server
        .send(Message::Binary(vec![1, 2, 3].into()))
        .await
        .unwrap();
    send(&mut server, Envelope::StateUpdate(snapshot(7, 0, 0))).await;

    eventually(|| !seen.lock().unwrap().is_empty()).await;
    assert_eq!(*seen.lock().unwrap(), vec![7]);
    client.close();
}

#[tokio::test]
async fn test_moves_sent_while_offline_are_flushed_on_reconnect() {
    let (listener, url) = listen().await;
    let client = Arc::new(
        GridClient::builder()
            .url(url)
            .allow_insecure(true)
            .connect()
            .unwrap(),
    );

    let first = accept(&listener).await;
    wait_connected(&client).await;
    drop(first);
    client
        .watch_connection()
        .wait_for(|s| *s != ConnectionState::Connected)
        .await
        .unwrap();

    let mover = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.move_to(1, 1, FieldOfView::new(0, 0, 4, 4)).await }
    });

    // The request reaches the next connection, and its answer completes
    // the move.
    let mut second = accept(&listener).await;
    let request = next_request(&mut second).await;
    assert_eq!(request.kind(), "move-request");
    send(&mut second, Envelope::MoveResponse(snapshot(3, 1, 1))).await;

    assert!(mover.await.unwrap().is_responded());
    client.close();
}

#[tokio::test]
async fn test_close_fails_a_waiting_move() {
    let (listener, url) = listen().await;
    let client = Arc::new(
        GridClient::builder()
            .url(url)
            .allow_insecure(true)
            .connect()
            .unwrap(),
    );
    let mut server = accept(&listener).await;

    let mover = tokio::spawn({
        let client = Arc::clone(&client);
        async move { client.move_to(1, 0, FieldOfView::new(0, 0, 4, 4)).await }
    });
    next_request(&mut server).await;

    client.close();
    assert!(matches!(
        mover.await.unwrap(),
        MoveOutcome::NoResponse(SyncError::MailboxClosed)
    ));
}

// =========================================================================
// Upstream
// =========================================================================

fn game_config() -> GameConfig {
    GameConfig {
        world_grid_size: [64, 64],
        max_active_players: 500,
        player_size: 48,
        grid_cell_size: 64,
        player_move_duration_ms: 300,
    }
}

#[tokio::test]
async fn test_static_upstream_serves_config_and_state() {
    let mut state = snapshot(1, 0, 0);
    state.stats = Some(ServerStats {
        online_players: 3,
        total_cells: 9,
    });
    let client = offline_builder()
        .upstream(StaticUpstream::new(game_config()).with_state(state))
        .connect()
        .unwrap();

    assert_eq!(client.get_config().await.unwrap(), game_config());
    let plain = client.get_state(false).await.unwrap().unwrap();
    assert!(plain.stats.is_none());
    let with_stats = client.get_state(true).await.unwrap().unwrap();
    assert_eq!(with_stats.stats.map(|s| s.online_players), Some(3));
    client.close();
}

#[tokio::test]
async fn test_no_upstream_reports_an_error() {
    let client: GridClient<NoUpstream> = offline_builder().connect().unwrap();
    assert!(matches!(
        client.get_config().await,
        Err(GridlinkError::Upstream(_))
    ));
    client.close();
}
