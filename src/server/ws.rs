//! WebSocket transport for subscriber connections

use axum::extract::ws::{Message, WebSocket};
use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};

use crate::error::TransportError;
use crate::session::{PeerReader, PeerWriter};

/// Split an upgraded socket into connection halves
pub fn split(socket: WebSocket) -> (WsReader, WsWriter) {
    let (sink, stream) = socket.split();
    (WsReader { stream }, WsWriter { sink })
}

/// Inbound half of a WebSocket
pub struct WsReader {
    stream: SplitStream<WebSocket>,
}

impl PeerReader for WsReader {
    async fn recv(&mut self) -> Result<Option<Bytes>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(Bytes::copy_from_slice(text.as_str().as_bytes())))
                }
                Some(Ok(Message::Binary(data))) => return Ok(Some(data)),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                // Pings are answered by the socket itself
                Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                Some(Err(e)) => return Err(TransportError::Io(e.to_string())),
            }
        }
    }
}

/// Outbound half of a WebSocket
///
/// Envelopes go out as text frames; payloads that are not UTF-8 go out as
/// binary frames with the same bytes.
pub struct WsWriter {
    sink: SplitSink<WebSocket, Message>,
}

impl PeerWriter for WsWriter {
    async fn send(&mut self, payload: Bytes) -> Result<(), TransportError> {
        let message = match String::from_utf8(payload.to_vec()) {
            Ok(text) => Message::Text(text.into()),
            Err(_) => Message::Binary(payload),
        };

        self.sink
            .send(message)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&mut self) {
        let _ = self.sink.close().await;
    }
}
