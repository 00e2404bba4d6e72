//! 에러 타입 정의.

use screener_core::CoreError;
use screener_data::{DataError, UpstreamError};
use thiserror::Error;

/// Collector 에러 타입
#[derive(Debug, Error)]
pub enum CollectorError {
    /// 설정 에러
    #[error("Configuration error: {0}")]
    Config(String),

    /// 데이터 소스 에러 (업스트림 API)
    #[error("Data source error: {0}")]
    DataSource(#[from] UpstreamError),

    /// 레이트 컨트롤러를 거친 요청 실패
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// 저장소 에러
    #[error("Storage error: {0}")]
    Storage(#[from] DataError),

    /// 도메인 규칙 위반
    #[error("Domain error: {0}")]
    Core(#[from] CoreError),

    /// 실행 실패 (플러시 실패 등)
    #[error("Run failed: {0}")]
    Run(String),
}

/// 단일 논리 요청 실패 (Fetch Executor).
///
/// 한도 초과는 재시도되므로 그 자체로는 나타나지 않고,
/// 예산이나 재시도 한도를 넘긴 경우에만 `BudgetExhausted` / `RetriesExhausted`로 드러납니다.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Decode error: {0}")]
    Decode(String),

    /// 실행 시간 예산 소진
    #[error("Run time budget exhausted")]
    BudgetExhausted,

    /// 한도 초과 재시도 횟수 초과
    #[error("Throttle retries exhausted after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },
}

impl FetchError {
    /// 실행 시간 예산 소진으로 인한 중단인지.
    pub fn is_budget_exhausted(&self) -> bool {
        matches!(self, FetchError::BudgetExhausted)
    }
}

/// 종목 레코드 구성 실패.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// 모든 서브 리소스가 비어 있거나 실패
    #[error("No data available for {symbol}")]
    NoData { symbol: String },

    /// 실행 시간 예산 소진으로 일부 요청 중단
    #[error("Run time budget exhausted while building {symbol}")]
    BudgetExhausted { symbol: String },
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, CollectorError>;
