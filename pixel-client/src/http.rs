//! Document store backed by a `pixel-server` instance.
//!
//! Reads and writes go through `GET`/`PUT /api/canvas`; the live feed is the
//! server's `/ws` WebSocket, which sends a `snapshot` frame per write.

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use pixel_core::{CanvasDocument, FeedMessage};
use reqwest::{Client, StatusCode};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::store::{DocumentStore, DocumentStream};

const DOCUMENT_PATH: &str = "/api/canvas";
const FEED_PATH: &str = "/ws";

/// HTTP + WebSocket client for the document server.
#[derive(Debug, Clone)]
pub struct HttpDocumentStore {
    http: Client,
    document_url: Url,
    feed_url: Url,
}

impl HttpDocumentStore {
    /// Create a store talking to the server at `base_url`, e.g.
    /// `http://127.0.0.1:9473`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidUrl`] if the URL is malformed or not
    /// `http`/`https`, and [`SyncError::Http`] if the client fails to build.
    pub fn new(base_url: impl AsRef<str>, config: &SyncConfig) -> Result<Self, SyncError> {
        let base =
            Url::parse(base_url.as_ref()).map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
        let feed_scheme = match base.scheme() {
            "http" => "ws",
            "https" => "wss",
            other => {
                return Err(SyncError::InvalidUrl(format!(
                    "unsupported scheme {other:?}"
                )))
            }
        };

        let document_url = base
            .join(DOCUMENT_PATH)
            .map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
        let mut feed_url = base
            .join(FEED_PATH)
            .map_err(|e| SyncError::InvalidUrl(e.to_string()))?;
        feed_url
            .set_scheme(feed_scheme)
            .map_err(|()| SyncError::InvalidUrl(format!("cannot use scheme {feed_scheme}")))?;

        let http = Client::builder()
            .user_agent(concat!("pixelpals/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            document_url,
            feed_url,
        })
    }

    /// URL of the document resource.
    #[must_use]
    pub fn document_url(&self) -> &Url {
        &self.document_url
    }

    /// URL of the live feed.
    #[must_use]
    pub fn feed_url(&self) -> &Url {
        &self.feed_url
    }
}

#[async_trait]
impl DocumentStore for HttpDocumentStore {
    async fn get(&self) -> Result<Option<CanvasDocument>, SyncError> {
        let response = self.http.get(self.document_url.clone()).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json().await?)),
            status => Err(SyncError::Status {
                status: status.as_u16(),
                url: self.document_url.to_string(),
            }),
        }
    }

    async fn set(&self, document: &CanvasDocument) -> Result<(), SyncError> {
        let response = self
            .http
            .put(self.document_url.clone())
            .json(document)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(SyncError::Status {
                status: status.as_u16(),
                url: self.document_url.to_string(),
            })
        }
    }

    async fn subscribe(&self) -> Result<DocumentStream, SyncError> {
        let (socket, _) = tokio_tungstenite::connect_async(self.feed_url.as_str())
            .await
            .map_err(|e| SyncError::Feed(e.to_string()))?;
        tracing::debug!(url = %self.feed_url, "Live feed connected");

        let feed = stream::unfold(Some(socket), |state| async move {
            let mut socket = state?;
            loop {
                let message = match socket.next().await {
                    Some(Ok(message)) => message,
                    Some(Err(e)) => return Some((Err(SyncError::Feed(e.to_string())), None)),
                    None => {
                        return Some((Err(SyncError::Feed("connection closed".into())), None));
                    }
                };
                match message {
                    Message::Text(text) => match serde_json::from_str::<FeedMessage>(&text) {
                        Ok(FeedMessage::Snapshot { document }) => {
                            return Some((Ok(document), Some(socket)));
                        }
                        Ok(FeedMessage::Error { message }) => {
                            tracing::warn!(%message, "Server reported feed error");
                        }
                        Ok(FeedMessage::Ping | FeedMessage::Pong) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "Ignoring malformed feed frame");
                        }
                    },
                    Message::Close(frame) => {
                        let reason = frame.map_or_else(
                            || "closed by server".to_string(),
                            |f| f.reason.to_string(),
                        );
                        return Some((Err(SyncError::Feed(reason)), None));
                    }
                    _ => {}
                }
            }
        });

        Ok(feed.boxed())
    }
}
