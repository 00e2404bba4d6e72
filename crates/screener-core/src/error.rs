//! 도메인 에러 타입.

use thiserror::Error;

use crate::domain::RunStatus;

/// 도메인 모델 에러.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// 잘못된 심볼 (빈 티커 등)
    #[error("잘못된 심볼: {0}")]
    InvalidSymbol(String),

    /// 알 수 없는 추적 필드 이름
    #[error("알 수 없는 필드: {0}")]
    UnknownField(String),

    /// 허용되지 않는 실행 상태 전이
    #[error("허용되지 않는 상태 전이: {from} → {to}")]
    InvalidTransition { from: RunStatus, to: RunStatus },
}

/// 도메인 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;
