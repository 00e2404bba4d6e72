//! 레코드 저장소.
//!
//! 수집기는 저장소를 좁은 계약으로만 사용합니다:
//! - `bulk_upsert`: 심볼 기준 일괄 upsert (플러시 단위 all-or-nothing)
//! - `read_known_symbols`: 우선순위 계산용 `{symbol, last_updated, data_quality}`
//! - `count_all`: 전체 레코드 수
//! - 체크포인트 읽기/쓰기 (로테이션 커서)

pub mod checkpoint;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use screener_core::{KnownRecord, StockRecord};

use crate::error::Result;

pub use checkpoint::{Checkpoint, CheckpointStatus};
pub use memory::MemoryRecordStore;
pub use postgres::PgRecordStore;

/// 레코드 저장소 계약.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// 심볼 기준 일괄 upsert.
    ///
    /// 같은 레코드 집합으로 두 번 호출해도 결과 상태는 같습니다.
    async fn bulk_upsert(&self, records: &[StockRecord]) -> Result<usize>;

    /// 저장된 모든 심볼의 갱신 시각과 품질 정보.
    async fn read_known_symbols(&self) -> Result<Vec<KnownRecord>>;

    /// 단일 레코드 조회.
    async fn read_record(&self, symbol: &str) -> Result<Option<StockRecord>>;

    /// 전체 레코드 수.
    async fn count_all(&self) -> Result<i64>;

    /// 체크포인트 로드.
    async fn load_checkpoint(&self, workflow: &str) -> Result<Option<Checkpoint>>;

    /// 체크포인트 저장 (워크플로우 이름 기준 upsert).
    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()>;
}
