//! Gateway WebSocket Client
//!
//! Implements the feed transport port over a WebSocket connection to the
//! vendor gateway. Authentication is carried in the upgrade request's query
//! string; an HTTP 403 on upgrade means the session credential was revoked,
//! which the relay distinguishes from ordinary connection failures.
//!
//! The socket is split into write and read halves matching the port's
//! sink/source contract. Ping/pong keepalives are handled by the WebSocket
//! library itself.

use async_trait::async_trait;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite};

use crate::application::ports::feed_port::{
    FeedCommand, FeedError, FeedMessage, FeedSink, FeedSource, FeedTransport,
};
use crate::domain::session::SessionToken;

use super::codec::{FrameCodec, InboundFrame};
use super::messages::{CommandFrame, ControlKind};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Configuration for the gateway WebSocket client.
#[derive(Debug, Clone)]
pub struct WsFeedConfig {
    /// Gateway WebSocket URL, without credentials.
    pub url: String,
    /// Vendor API key.
    pub api_key: String,
}

/// WebSocket implementation of the feed transport port.
pub struct WsFeedTransport {
    config: WsFeedConfig,
    codec: FrameCodec,
}

impl WsFeedTransport {
    /// Create a new transport.
    #[must_use]
    pub const fn new(config: WsFeedConfig) -> Self {
        Self {
            config,
            codec: FrameCodec::new(),
        }
    }

    fn connect_url(&self, session: &SessionToken) -> String {
        format!(
            "{}?api_key={}&access_token={}",
            self.config.url,
            self.config.api_key,
            session.as_str()
        )
    }
}

#[async_trait]
impl FeedTransport for WsFeedTransport {
    async fn connect(
        &self,
        session: &SessionToken,
    ) -> Result<(Box<dyn FeedSink>, Box<dyn FeedSource>), FeedError> {
        let url = self.connect_url(session);
        tracing::debug!(url = %self.config.url, "Opening gateway WebSocket");

        match connect_async(&url).await {
            Ok((stream, _response)) => {
                let (write, read) = stream.split();
                Ok((
                    Box::new(WsFeedSink {
                        write,
                        codec: self.codec.clone(),
                    }),
                    Box::new(WsFeedSource {
                        read,
                        codec: self.codec.clone(),
                    }),
                ))
            }
            Err(tungstenite::Error::Http(response)) if response.status().as_u16() == 403 => {
                Err(FeedError::AuthRejected(format!(
                    "gateway refused upgrade with status {}",
                    response.status()
                )))
            }
            Err(e) => Err(FeedError::Connect(e.to_string())),
        }
    }
}

struct WsFeedSink {
    write: SplitSink<WsStream, Message>,
    codec: FrameCodec,
}

#[async_trait]
impl FeedSink for WsFeedSink {
    async fn send(&mut self, command: FeedCommand) -> Result<(), FeedError> {
        let frame = CommandFrame::from(command);
        let json = self
            .codec
            .encode(&frame)
            .map_err(|e| FeedError::Codec(e.to_string()))?;

        self.write
            .send(Message::Text(json.into()))
            .await
            .map_err(|e| FeedError::Transport(e.to_string()))
    }
}

struct WsFeedSource {
    read: SplitStream<WsStream>,
    codec: FrameCodec,
}

#[async_trait]
impl FeedSource for WsFeedSource {
    async fn next_message(&mut self) -> Option<Result<FeedMessage, FeedError>> {
        loop {
            let message = self.read.next().await?;

            match message {
                Ok(Message::Text(text)) => match self.codec.decode(text.as_str()) {
                    Ok(InboundFrame::Ticks(batch)) => {
                        return Some(Ok(FeedMessage::Ticks(batch)));
                    }
                    Ok(InboundFrame::Control(control)) => match control.kind {
                        ControlKind::Error => {
                            return Some(Ok(FeedMessage::Error {
                                code: control.code.unwrap_or_default(),
                                message: control.data_text(),
                            }));
                        }
                        ControlKind::Order | ControlKind::Message | ControlKind::Unknown => {
                            tracing::trace!(kind = ?control.kind, "Ignoring control frame");
                        }
                    },
                    Err(e) => {
                        return Some(Err(FeedError::Codec(e.to_string())));
                    }
                },
                Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => {}
                Ok(Message::Binary(_)) => {
                    // The gateway's binary framing is not spoken here.
                    tracing::trace!("Ignoring binary frame");
                }
                Ok(Message::Close(frame)) => {
                    return Some(Ok(FeedMessage::Closed {
                        reason: frame.map(|f| f.reason.to_string()),
                    }));
                }
                Err(e) => {
                    return Some(Err(FeedError::Transport(e.to_string())));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_url_carries_credentials() {
        let transport = WsFeedTransport::new(WsFeedConfig {
            url: "wss://feed.example.com/stream".to_string(),
            api_key: "key123".to_string(),
        });

        let url = transport.connect_url(&SessionToken::new("tok456"));
        assert_eq!(
            url,
            "wss://feed.example.com/stream?api_key=key123&access_token=tok456"
        );
    }
}
