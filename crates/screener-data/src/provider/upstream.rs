//! HTTP 업스트림 클라이언트.
//!
//! `GET {base_url}/{endpoint}/{symbol}?apikey=...` 형식으로 요청합니다.
//! 한도 초과는 HTTP 429 외에도 200 응답 본문의
//! `{"Error Message": "... limit ..."}` 형태로 올 수 있습니다.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use super::{RequestSpec, UpstreamClient, UpstreamError};

/// 업스트림 오류 메시지 키.
const ERROR_MESSAGE_KEY: &str = "Error Message";

/// HTTP 업스트림 클라이언트.
pub struct HttpUpstreamClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl std::fmt::Debug for HttpUpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpUpstreamClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl HttpUpstreamClient {
    /// 새 클라이언트 생성.
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
    ) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("screener-ingest/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| UpstreamError::Transport(format!("HTTP 클라이언트 생성 실패: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// 요청 URL (API 키 제외).
    pub fn url_for(&self, request: &RequestSpec) -> String {
        format!("{}/{}", self.base_url, request.path())
    }
}

/// 200 응답 본문에 담긴 오류 메시지 분류.
fn classify_error_body(body: &Value) -> Option<UpstreamError> {
    let message = body.get(ERROR_MESSAGE_KEY)?.as_str()?;
    if message.to_lowercase().contains("limit") {
        Some(UpstreamError::Throttled)
    } else {
        Some(UpstreamError::Status {
            status: StatusCode::OK.as_u16(),
            message: message.to_string(),
        })
    }
}

#[async_trait]
impl UpstreamClient for HttpUpstreamClient {
    async fn get(&self, request: &RequestSpec) -> Result<Value, UpstreamError> {
        let url = self.url_for(request);
        debug!(url = %url, "업스트림 요청");

        let response = self
            .client
            .get(&url)
            .query(&request.query)
            .query(&[("apikey", self.api_key.expose_secret())])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(endpoint = %request.endpoint, "업스트림 429 응답");
            return Err(UpstreamError::Throttled);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes)?;

        if let Some(err) = classify_error_body(&body) {
            if err.is_throttled() {
                warn!(endpoint = %request.endpoint, "업스트림 한도 초과 메시지");
            }
            return Err(err);
        }

        Ok(body)
    }
}
