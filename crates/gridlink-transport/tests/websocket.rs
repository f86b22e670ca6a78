//! Integration tests for the WebSocket connector.
//!
//! These tests spin up a real WebSocket server on a random local port and
//! dial it with [`WebSocketConnector`], checking that frames flow both
//! ways and that closure is reported as `Ok(None)`.

#[cfg(feature = "websocket")]
mod websocket {
    use futures_util::{SinkExt, StreamExt};
    use gridlink_transport::{
        Connection, ConnectionManager, ConnectionState, Connector, Frame,
        TransportError, WebSocketConnector,
    };
    use tokio::net::TcpListener;
    use tokio_tungstenite::tungstenite::Message;

    type ServerWs = tokio_tungstenite::WebSocketStream<tokio::net::TcpStream>;

    /// Binds a listener on a random port and returns it with its URL.
    async fn listen() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = listener.local_addr().expect("local addr");
        (listener, format!("ws://{addr}"))
    }

    async fn accept(listener: &TcpListener) -> ServerWs {
        let (stream, _) = listener.accept().await.expect("should accept");
        tokio_tungstenite::accept_async(stream)
            .await
            .expect("handshake")
    }

    #[tokio::test]
    async fn test_websocket_connect_and_send_receive() {
        let (listener, url) = listen().await;
        let server = tokio::spawn(async move { accept(&listener).await });

        let conn = WebSocketConnector::new(url)
            .connect()
            .await
            .expect("should connect");
        let mut server_ws = server.await.expect("task should complete");

        assert!(conn.id().into_inner() > 0);

        // --- Client sends, server receives ---
        conn.send(b"hello from client").await.expect("send");
        let msg = server_ws.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"hello from client");

        // --- Server sends binary, client receives ---
        server_ws
            .send(Message::Binary(b"hello from server".to_vec().into()))
            .await
            .unwrap();
        let frame = conn.recv().await.expect("recv").expect("frame");
        assert_eq!(frame, Frame::Binary(b"hello from server".to_vec()));

        // --- Text frames are surfaced as text, not reinterpreted ---
        server_ws
            .send(Message::Text("plain text".into()))
            .await
            .unwrap();
        let frame = conn.recv().await.expect("recv").expect("frame");
        assert_eq!(frame, Frame::Text("plain text".into()));

        conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_server_close() {
        let (listener, url) = listen().await;
        let server = tokio::spawn(async move { accept(&listener).await });

        let conn = WebSocketConnector::new(url).connect().await.unwrap();
        let mut server_ws = server.await.unwrap();

        server_ws.send(Message::Close(None)).await.unwrap();

        let result = conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on server close");
    }

    #[tokio::test]
    async fn test_websocket_connect_to_closed_port_fails() {
        let (listener, url) = listen().await;
        drop(listener);

        match WebSocketConnector::new(url).connect().await {
            Err(TransportError::ConnectFailed(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::ConnectionRefused);
            }
            Err(other) => panic!("expected ConnectFailed, got {other}"),
            Ok(_) => panic!("connect to a closed port should fail"),
        }
    }

    #[cfg(not(feature = "tls"))]
    #[tokio::test]
    async fn test_websocket_wss_without_tls_is_unsupported() {
        let (listener, url) = listen().await;
        let url = url.replacen("ws://", "wss://", 1);

        match WebSocketConnector::new(url).connect().await {
            Err(TransportError::ConnectFailed(e)) => {
                assert_eq!(e.kind(), std::io::ErrorKind::Unsupported);
            }
            Err(other) => panic!("expected ConnectFailed, got {other}"),
            Ok(_) => panic!("wss should not connect without TLS"),
        }
        drop(listener);
    }

    #[tokio::test]
    async fn test_manager_reconnects_over_websocket() {
        let (listener, url) = listen().await;

        let (frames_tx, mut frames) = tokio::sync::mpsc::unbounded_channel();
        let manager = ConnectionManager::builder(WebSocketConnector::new(url))
            .on_frame(move |frame| {
                let _ = frames_tx.send(frame);
            })
            .connect();

        // First connection: push one frame, then drop the socket.
        let mut first = accept(&listener).await;
        first
            .send(Message::Binary(vec![1].into()))
            .await
            .unwrap();
        assert_eq!(frames.recv().await.unwrap(), Frame::Binary(vec![1]));
        drop(first);

        // The manager dials again on its own (first retry is immediate).
        let mut second = accept(&listener).await;
        let mut state = manager.watch_state();
        state
            .wait_for(|s| *s == ConnectionState::Connected)
            .await
            .unwrap();

        manager.send(b"again".to_vec());
        let msg = second.next().await.unwrap().unwrap();
        assert_eq!(msg.into_data().as_ref(), b"again");

        manager.close();
    }
}
