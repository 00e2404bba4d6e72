//! Rate-limited fundamentals ingestion scheduler.
//!
//! 이 crate는 업스트림 펀더멘털 API의 요청 한도 안에서 종목 레코드를
//! 주기적으로 갱신하는 수집기를 제공합니다:
//! - 레이트 컨트롤러 (엔드포인트 클래스별 윈도우, 적응형 동시성, 백오프)
//! - Fetch Executor (한도 초과 재시도 루프, 실행 예산 마감)
//! - 우선순위 계산과 로테이션 배치 선택
//! - 레코드 구성, 검증, 종합 점수
//! - Run Orchestrator (윈도우 단위 처리, 일괄 upsert, 상태 발행)

pub mod config;
pub mod error;
pub mod executor;
pub mod modules;
pub mod stats;
pub mod throttle;

pub use config::CollectorConfig;
pub use error::{BuildError, CollectorError, FetchError, Result};
pub use executor::FetchExecutor;
pub use modules::RunOrchestrator;
pub use stats::CollectionStats;
pub use throttle::{EndpointClass, EndpointClassTable, Outcome, RateController, ThrottleConfig};
