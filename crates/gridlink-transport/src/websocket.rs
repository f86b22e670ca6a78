//! WebSocket connector implementation using `tokio-tungstenite`.

use std::io::ErrorKind;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::error::UrlError;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{Connection, ConnectionId, Connector, Frame, TransportError};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// The `io::ErrorKind` closest to a tungstenite failure.
fn error_kind(e: &tungstenite::Error) -> ErrorKind {
    match e {
        tungstenite::Error::Io(io) => io.kind(),
        tungstenite::Error::Url(UrlError::TlsFeatureNotEnabled) => ErrorKind::Unsupported,
        tungstenite::Error::Url(_) => ErrorKind::InvalidInput,
        tungstenite::Error::Http(_) => ErrorKind::ConnectionRefused,
        tungstenite::Error::Protocol(_) => ErrorKind::InvalidData,
        tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
            ErrorKind::NotConnected
        }
        _ => ErrorKind::Other,
    }
}

fn io_err(e: tungstenite::Error) -> std::io::Error {
    std::io::Error::new(error_kind(&e), e)
}

/// Opens WebSocket connections to a fixed URL.
///
/// `wss://` URLs need the `tls` feature.
#[derive(Debug, Clone)]
pub struct WebSocketConnector {
    url: String,
}

impl WebSocketConnector {
    /// Creates a connector for the given `ws://` or `wss://` URL.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }

    /// The endpoint this connector dials.
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for WebSocketConnector {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn connect(&self) -> Result<Self::Connection, Self::Error> {
        let (ws, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| TransportError::ConnectFailed(io_err(e)))?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, url = %self.url, "opened WebSocket connection");

        // Split so the writer and the reader never contend for
        // the same lock.
        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// A single client-side WebSocket connection.
pub struct WebSocketConnection {
    id: ConnectionId,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .send(Message::Binary(data.to_vec().into()))
            .await
            .map_err(|e| TransportError::SendFailed(io_err(e)))
    }

    async fn recv(&self) -> Result<Option<Frame>, Self::Error> {
        let mut stream = self.stream.lock().await;
        while let Some(msg) = stream.next().await {
            let msg = msg.map_err(|e| TransportError::ReceiveFailed(io_err(e)))?;
            match msg {
                Message::Binary(data) => return Ok(Some(Frame::Binary(data.into()))),
                Message::Text(text) => return Ok(Some(Frame::Text(text.as_str().to_owned()))),
                Message::Close(frame) => {
                    tracing::debug!(id = %self.id, ?frame, "peer closed WebSocket");
                    return Ok(None);
                }
                // Ping/pong are answered by tungstenite itself.
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    async fn close(&self) -> Result<(), Self::Error> {
        self.sink
            .lock()
            .await
            .close()
            .await
            .map_err(|e| TransportError::SendFailed(io_err(e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
