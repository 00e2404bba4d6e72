//! # Screener Core
//!
//! 펀더멘털 수집 파이프라인의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 수집 시스템 전반에서 사용되는 기본 타입을 제공합니다:
//! - 심볼 및 심볼 제외 필터
//! - 종목 레코드와 데이터 품질 정보
//! - 수집 실행 상태 (RunState)
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
