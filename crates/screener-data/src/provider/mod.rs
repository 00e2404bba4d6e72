//! 업스트림 펀더멘털 API.
//!
//! 종목당 여러 서브 리소스(프로필, 시세, 재무비율, 재무제표, 핵심지표, 성장률)를
//! 개별 엔드포인트로 조회합니다. 응답은 다음 중 하나로 분류됩니다:
//!
//! - JSON 페이로드 (성공)
//! - 429 / 한도 초과 메시지 → [`UpstreamError::Throttled`]
//! - 그 외 4xx/5xx → [`UpstreamError::Status`]
//! - 연결/타임아웃 → [`UpstreamError::Transport`]
//! - 잘못된 JSON → [`UpstreamError::Decode`]

pub mod payload;
pub mod symbol_list;
pub mod upstream;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

pub use payload::{decimal_field, first_record, numeric_field, text_field, FieldValue};
pub use symbol_list::{parse_symbol_list, symbol_list_request, SYMBOL_LIST_ENDPOINT};
pub use upstream::HttpUpstreamClient;

/// 업스트림 요청 오류.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UpstreamError {
    /// 요청 한도 초과 (HTTP 429 또는 한도 메시지)
    #[error("Rate limit exceeded")]
    Throttled,

    /// 429 이외의 비정상 상태 코드
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// 연결 실패, 타임아웃 등 전송 계층 오류
    #[error("Transport error: {0}")]
    Transport(String),

    /// 응답 본문 디코딩 실패
    #[error("Decode error: {0}")]
    Decode(String),
}

impl UpstreamError {
    /// 요청 한도 초과인지 확인.
    pub fn is_throttled(&self) -> bool {
        matches!(self, UpstreamError::Throttled)
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        // URL 쿼리에 API 키가 있으므로 메시지에서 제외
        let err = err.without_url();
        if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for UpstreamError {
    fn from(err: serde_json::Error) -> Self {
        UpstreamError::Decode(err.to_string())
    }
}

/// 단일 업스트림 요청 명세.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestSpec {
    /// 엔드포인트 경로 (예: "ratios-ttm", "stock/list")
    pub endpoint: String,
    /// 경로에 붙는 심볼
    pub symbol: Option<String>,
    /// 추가 쿼리 파라미터
    pub query: Vec<(String, String)>,
}

impl RequestSpec {
    /// 심볼 없는 요청.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            symbol: None,
            query: Vec::new(),
        }
    }

    /// 심볼 경로 요청.
    pub fn for_symbol(endpoint: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            symbol: Some(symbol.into()),
            query: Vec::new(),
        }
    }

    /// 쿼리 파라미터 추가.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// base URL 기준 전체 경로.
    pub fn path(&self) -> String {
        match &self.symbol {
            Some(symbol) => format!("{}/{}", self.endpoint.trim_matches('/'), symbol),
            None => self.endpoint.trim_matches('/').to_string(),
        }
    }
}

impl fmt::Display for RequestSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// 종목 레코드를 구성하는 서브 리소스.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubResource {
    Profile,
    Quote,
    Ratios,
    Financials,
    KeyMetrics,
    Growth,
}

impl SubResource {
    /// 전체 서브 리소스.
    pub const ALL: [SubResource; 6] = [
        SubResource::Profile,
        SubResource::Quote,
        SubResource::Ratios,
        SubResource::Financials,
        SubResource::KeyMetrics,
        SubResource::Growth,
    ];

    /// 엔드포인트 경로.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Quote => "quote",
            Self::Ratios => "ratios-ttm",
            Self::Financials => "financial-statements",
            Self::KeyMetrics => "key-metrics-ttm",
            Self::Growth => "financial-growth",
        }
    }

    /// 심볼에 대한 요청 명세.
    ///
    /// 재무제표와 성장률은 최신 1개 기간만 조회합니다.
    pub fn request(&self, ticker: &str) -> RequestSpec {
        let spec = RequestSpec::for_symbol(self.endpoint(), ticker);
        match self {
            Self::Financials => spec.with_query("period", "annual").with_query("limit", "1"),
            Self::Growth => spec.with_query("limit", "1"),
            _ => spec,
        }
    }
}

impl fmt::Display for SubResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

/// 업스트림 API 클라이언트.
///
/// 레이트 제어는 호출자(수집기) 책임입니다. 구현체는 응답 분류만 담당합니다.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// 단일 GET 요청.
    async fn get(&self, request: &RequestSpec) -> std::result::Result<Value, UpstreamError>;
}
