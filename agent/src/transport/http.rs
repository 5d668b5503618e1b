//! reqwest-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, Url};
use tether_engine::{Collection, EntityId};

use super::{Transport, TransportError, TransportResult};

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_decode() {
            TransportError::Decode(e.to_string())
        } else {
            TransportError::Network(e.to_string())
        }
    }
}

/// Transport speaking REST to `{base_url}/{collection}[/{id}]`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    auth_token: Option<String>,
}

impl HttpTransport {
    /// Build a transport. `timeout` bounds each request.
    pub fn new(
        base_url: &str,
        auth_token: Option<String>,
        timeout: Duration,
    ) -> TransportResult<Self> {
        let parsed = Url::parse(base_url).map_err(|e| TransportError::InvalidBaseUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.cannot_be_a_base() {
            return Err(TransportError::InvalidBaseUrl {
                url: base_url.to_string(),
                reason: "cannot carry a path".to_string(),
            });
        }
        let base_url = parsed;

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            auth_token,
        })
    }

    /// Underlying client, shared with the reachability probe.
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, collection: Collection, id: Option<&EntityId>) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(collection.path_segment());
            if let Some(id) = id {
                segments.push(id.as_str());
            }
        }
        url
    }

    async fn send(&self, request: RequestBuilder) -> TransportResult<Response> {
        let request = match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(TransportError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn create(
        &self,
        collection: Collection,
        body: &serde_json::Value,
    ) -> TransportResult<()> {
        let url = self.url(collection, None);
        tracing::debug!(%url, "POST");
        self.send(self.client.post(url).json(body)).await?;
        Ok(())
    }

    async fn update(
        &self,
        collection: Collection,
        id: &EntityId,
        body: &serde_json::Value,
    ) -> TransportResult<()> {
        let url = self.url(collection, Some(id));
        tracing::debug!(%url, "PUT");
        self.send(self.client.put(url).json(body)).await?;
        Ok(())
    }

    async fn delete(&self, collection: Collection, id: &EntityId) -> TransportResult<()> {
        let url = self.url(collection, Some(id));
        tracing::debug!(%url, "DELETE");
        self.send(self.client.delete(url)).await?;
        Ok(())
    }

    async fn list(&self, collection: Collection) -> TransportResult<Vec<serde_json::Value>> {
        let url = self.url(collection, None);
        tracing::debug!(%url, "GET");
        let body: serde_json::Value = self.send(self.client.get(url)).await?.json().await?;
        unwrap_list(body)
    }
}

/// Accept either a bare array or an `{"data": [...]}` envelope.
fn unwrap_list(body: serde_json::Value) -> TransportResult<Vec<serde_json::Value>> {
    match body {
        serde_json::Value::Array(items) => Ok(items),
        serde_json::Value::Object(mut map) => match map.remove("data") {
            Some(serde_json::Value::Array(items)) => Ok(items),
            _ => Err(TransportError::Decode(
                "expected an array or a 'data' array".to_string(),
            )),
        },
        other => Err(TransportError::Decode(format!(
            "expected an array, got {other}"
        ))),
    }
}
