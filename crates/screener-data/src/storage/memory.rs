//! 인메모리 레코드 저장소.
//!
//! `--dry-run` 실행과 테스트에서 사용합니다. 프로세스 종료 시 내용은 사라집니다.

use async_trait::async_trait;
use screener_core::{KnownRecord, StockRecord};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::{Checkpoint, RecordStore};
use crate::error::Result;

/// 인메모리 [`RecordStore`].
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, StockRecord>>,
    checkpoints: RwLock<HashMap<String, Checkpoint>>,
    flushes: AtomicUsize,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 초기 레코드로 생성.
    pub fn with_records(records: impl IntoIterator<Item = StockRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|r| (r.symbol.clone(), r))
            .collect();
        Self {
            records: RwLock::new(map),
            ..Self::default()
        }
    }

    /// 비어 있지 않은 `bulk_upsert` 호출 횟수.
    pub fn flush_count(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }

    /// 현재 저장된 전체 레코드 (심볼 순).
    pub async fn snapshot(&self) -> Vec<StockRecord> {
        let records = self.records.read().await;
        let mut all: Vec<StockRecord> = records.values().cloned().collect();
        all.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        all
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn bulk_upsert(&self, records: &[StockRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut map = self.records.write().await;
        for record in records {
            map.insert(record.symbol.clone(), record.clone());
        }
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(records.len())
    }

    async fn read_known_symbols(&self) -> Result<Vec<KnownRecord>> {
        let map = self.records.read().await;
        Ok(map.values().map(KnownRecord::from).collect())
    }

    async fn read_record(&self, symbol: &str) -> Result<Option<StockRecord>> {
        Ok(self.records.read().await.get(symbol).cloned())
    }

    async fn count_all(&self) -> Result<i64> {
        Ok(self.records.read().await.len() as i64)
    }

    async fn load_checkpoint(&self, workflow: &str) -> Result<Option<Checkpoint>> {
        Ok(self.checkpoints.read().await.get(workflow).cloned())
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> Result<()> {
        self.checkpoints
            .write()
            .await
            .insert(checkpoint.workflow.clone(), checkpoint.clone());
        Ok(())
    }
}
