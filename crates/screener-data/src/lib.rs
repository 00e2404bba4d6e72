//! 업스트림 데이터 소스와 레코드 저장소.
//!
//! 이 crate는 다음을 제공합니다:
//! - 업스트림 펀더멘털 API 클라이언트 (HTTP, 429 분류)
//! - 서브 리소스 요청 명세 및 JSON 페이로드 추출 유틸리티
//! - 심볼 목록 스냅샷 파싱
//! - 레코드 저장소 계약 (`RecordStore`) 및 PostgreSQL / 인메모리 구현
//! - 실행 체크포인트 (로테이션 커서)

pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};

pub use provider::{
    HttpUpstreamClient, RequestSpec, SubResource, UpstreamClient, UpstreamError,
};
pub use storage::postgres::DatabaseConfig;
pub use storage::{
    Checkpoint, CheckpointStatus, MemoryRecordStore, PgRecordStore, RecordStore,
};
