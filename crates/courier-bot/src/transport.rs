//! HTTP transport for the Bot API.
//!
//! Calls go to `{api_url}/bot{token}/{method}` with a JSON body; files are
//! streamed from `{api_url}/file/bot{token}/{path}`.
//! Docs: <https://core.telegram.org/bots/api#making-requests>

use async_trait::async_trait;
use courier_core::{
    error::CourierError,
    traits::{FileStream, Transport, Upload},
};
use futures_util::TryStreamExt;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tokio_util::io::StreamReader;
use tracing::debug;

/// Response envelope shared by every Bot API method.
#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    result: Option<Value>,
    error_code: Option<i64>,
    description: Option<String>,
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    migrate_to_chat_id: Option<i64>,
    retry_after: Option<u64>,
}

/// Bot API transport over `reqwest`.
pub struct HttpTransport {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl HttpTransport {
    /// Create a transport for `api_url` (e.g. `https://api.telegram.org`).
    pub fn new(api_url: &str, token: &str) -> Self {
        Self::with_client(reqwest::Client::new(), api_url, token)
    }

    /// Create a transport sharing an existing HTTP client.
    pub fn with_client(client: reqwest::Client, api_url: &str, token: &str) -> Self {
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.api_url, self.token)
    }

    fn file_url(&self, server_path: &str) -> String {
        format!("{}/file/bot{}/{server_path}", self.api_url, self.token)
    }

    async fn stream(&self, url: &str, timeout: Duration) -> Result<FileStream, CourierError> {
        let resp = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(network_error)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CourierError::api(
                i64::from(status.as_u16()),
                format!("expected status 200 but got {status}"),
            ));
        }

        let body = resp
            .bytes_stream()
            .map_err(|e| std::io::Error::other(e.without_url()));
        Ok(Box::new(StreamReader::new(Box::pin(body))))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, CourierError> {
        debug!("bot api call: {method}");
        let resp = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(&params)
            .send()
            .await
            .map_err(network_error)?;
        decode_response(resp).await
    }

    async fn upload(
        &self,
        method: &str,
        params: Value,
        upload: Upload,
        timeout: Duration,
    ) -> Result<Value, CourierError> {
        debug!("bot api upload: {method} ({} bytes)", upload.bytes.len());
        let part = reqwest::multipart::Part::bytes(upload.bytes).file_name(upload.file_name);

        let mut form = reqwest::multipart::Form::new();
        if let Value::Object(fields) = params {
            for (key, value) in fields {
                let text = match value {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                form = form.text(key, text);
            }
        }
        form = form.part(upload.field, part);

        let resp = self
            .client
            .post(self.method_url(method))
            .timeout(timeout)
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;
        decode_response(resp).await
    }

    async fn download_file(
        &self,
        server_path: &str,
        timeout: Duration,
    ) -> Result<FileStream, CourierError> {
        self.stream(&self.file_url(server_path), timeout).await
    }

    async fn fetch_url(&self, url: &str, timeout: Duration) -> Result<FileStream, CourierError> {
        self.stream(url, timeout).await
    }
}

/// Classify a `reqwest` failure. The URL is dropped so the token never
/// reaches logs.
fn network_error(e: reqwest::Error) -> CourierError {
    CourierError::Network(e.without_url().to_string())
}

async fn decode_response(resp: reqwest::Response) -> Result<Value, CourierError> {
    let status = resp.status();
    let body = resp.bytes().await.map_err(network_error)?;

    match serde_json::from_slice::<ApiResponse>(&body) {
        Ok(envelope) if envelope.ok && status.is_success() => {
            Ok(envelope.result.unwrap_or(Value::Null))
        }
        Ok(envelope) => {
            let params = envelope.parameters;
            Err(CourierError::Api {
                code: envelope
                    .error_code
                    .unwrap_or_else(|| i64::from(status.as_u16())),
                description: envelope
                    .description
                    .unwrap_or_else(|| status.to_string()),
                retry_after: params.as_ref().and_then(|p| p.retry_after),
                migrate_to_chat_id: params.as_ref().and_then(|p| p.migrate_to_chat_id),
            })
        }
        Err(e) if status.is_success() => Err(CourierError::Serialization(e)),
        Err(_) => {
            let text = String::from_utf8_lossy(&body);
            let description = if text.trim().is_empty() {
                status.to_string()
            } else {
                text.trim().to_string()
            };
            Err(CourierError::api(i64::from(status.as_u16()), description))
        }
    }
}
