//! Run Orchestrator.
//!
//! 한 번의 수집 실행을 구동합니다.
//!
//! ```text
//! 우선순위 계산 → 로테이션 배치 선택 → 윈도우 반복 {
//!     예산 확인 → 동시 레코드 구성 → 일괄 upsert → 상태 발행
//! }
//! ```
//!
//! - 윈도우 크기는 매 윈도우 직전에 컨트롤러의 현재 동시성으로 정합니다.
//! - 심볼 단위 실패는 격리되어 `failed`로만 집계됩니다.
//! - 플러시 실패는 실행 전체를 `Error`로 끝냅니다.
//! - 예산 소진 시 진행 중인 윈도우는 끝까지 처리하고 `Completed`로 멈춥니다
//!   (`remaining > 0`).

use chrono::Utc;
use futures::future::join_all;
use screener_core::{RunState, StockRecord, Symbol};
use screener_data::{Checkpoint, CheckpointStatus, RecordStore, UpstreamClient};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::prioritizer::{fallback_order, prioritize};
use super::record_builder::RecordBuilder;
use super::rotation;
use super::scoring::ScoringTable;
use crate::config::RunConfig;
use crate::error::BuildError;
use crate::executor::FetchExecutor;
use crate::throttle::RateController;

/// 로테이션 커서 체크포인트 이름.
pub const ROTATION_WORKFLOW: &str = "fundamental_rotation";

/// 수집 실행 구동기.
pub struct RunOrchestrator {
    store: Arc<dyn RecordStore>,
    client: Arc<dyn UpstreamClient>,
    controller: Arc<RateController>,
    scoring: Arc<ScoringTable>,
    config: RunConfig,
    status_tx: watch::Sender<RunState>,
}

impl RunOrchestrator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        client: Arc<dyn UpstreamClient>,
        controller: Arc<RateController>,
        config: RunConfig,
    ) -> Self {
        let (status_tx, _) = watch::channel(RunState::new());
        Self {
            store,
            client,
            controller,
            scoring: Arc::new(ScoringTable::default()),
            config,
            status_tx,
        }
    }

    /// 점수 테이블 교체.
    pub fn with_scoring(mut self, scoring: ScoringTable) -> Self {
        self.scoring = Arc::new(scoring);
        self
    }

    /// 실행 상태 구독. 윈도우마다 최신 스냅샷이 발행됩니다.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.status_tx.subscribe()
    }

    pub fn controller(&self) -> &Arc<RateController> {
        &self.controller
    }

    fn publish(&self, state: &RunState) {
        self.status_tx.send_replace(state.clone());
    }

    /// 수집 실행. 최종 상태를 반환합니다.
    pub async fn run(&self, universe: &[Symbol]) -> RunState {
        let started = Instant::now();
        let deadline = started + self.config.time_budget();

        let mut state = RunState::new();
        if let Err(e) = state.start(Utc::now()) {
            error!(error = %e, "실행 시작 실패");
            return state;
        }
        info!(
            run_id = %state.run_id,
            universe = universe.len(),
            batch_size = self.config.batch_size,
            budget_secs = self.config.time_budget_secs,
            "펀더멘털 수집 시작"
        );

        let ordered = self.prioritized(universe).await;
        let cursor = self.load_cursor().await;
        let (batch, next_cursor) = rotation::select(&ordered, self.config.batch_size, cursor);

        state.set_total(batch.len());
        self.publish(&state);
        debug!(cursor, next_cursor, batch = batch.len(), "로테이션 배치 선택");

        self.save_checkpoint(next_cursor, 0, CheckpointStatus::Running)
            .await;

        let builder = RecordBuilder::new(
            FetchExecutor::new(Arc::clone(&self.client), Arc::clone(&self.controller))
                .with_deadline(deadline)
                .with_max_retries(self.config.max_throttle_retries),
            Arc::clone(&self.scoring),
        );

        let mut offset = 0;
        let mut stopped_early = false;

        while offset < batch.len() {
            if Instant::now() >= deadline {
                warn!(
                    remaining = batch.len() - offset,
                    "실행 시간 예산 소진, 조기 종료"
                );
                stopped_early = true;
                break;
            }

            let window = self.controller.current_concurrency().max(1);
            let end = (offset + window).min(batch.len());
            let symbols = &batch[offset..end];
            offset = end;

            let results = join_all(symbols.iter().map(|s| builder.build(s))).await;

            let mut buffer: Vec<StockRecord> = Vec::with_capacity(results.len());
            let mut budget_hit = false;
            for (symbol, result) in symbols.iter().zip(results) {
                match result {
                    Ok(record) => buffer.push(record),
                    Err(BuildError::BudgetExhausted { .. }) => budget_hit = true,
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "종목 수집 실패");
                        state.record_failure();
                    }
                }
            }

            if let Err(e) = self.flush(&buffer).await {
                error!(run_id = %state.run_id, error = %e, records = buffer.len(), "플러시 실패, 실행 중단");
                if let Err(te) = state.fail(Utc::now(), format!("flush failed: {e}")) {
                    error!(error = %te, "상태 전이 실패");
                }
                self.save_checkpoint(next_cursor, state.progress.completed, CheckpointStatus::Error)
                    .await;
                self.publish(&state);
                return state;
            }
            for record in &buffer {
                state.record_success(&record.data_quality);
            }

            debug!(
                window,
                completed = state.progress.completed,
                failed = state.progress.failed,
                remaining = state.progress.remaining(),
                "윈도우 처리 완료"
            );
            self.publish(&state);

            if budget_hit {
                warn!(remaining = state.progress.remaining(), "요청 중 예산 소진, 조기 종료");
                stopped_early = true;
                break;
            }
        }

        if let Err(e) = state.complete(Utc::now(), stopped_early) {
            error!(error = %e, "상태 전이 실패");
        }
        let status = if stopped_early {
            CheckpointStatus::Interrupted
        } else {
            CheckpointStatus::Completed
        };
        self.save_checkpoint(next_cursor, state.progress.completed, status)
            .await;
        self.publish(&state);

        info!(
            run_id = %state.run_id,
            completed = state.progress.completed,
            failed = state.progress.failed,
            remaining = state.progress.remaining(),
            completeness = state.data_quality.completeness_score,
            stopped_early,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "펀더멘털 수집 종료"
        );
        state
    }

    /// 우선순위 순서의 심볼 목록. 저장소 조회에 실패하면 입력 순서.
    async fn prioritized(&self, universe: &[Symbol]) -> Vec<Symbol> {
        let entries = match self.store.read_known_symbols().await {
            Ok(known) => prioritize(universe, &known, Utc::now()),
            Err(e) => {
                warn!(error = %e, "기존 레코드 조회 실패, 입력 순서 사용");
                fallback_order(universe)
            }
        };
        entries.into_iter().map(|e| e.symbol).collect()
    }

    async fn load_cursor(&self) -> usize {
        match self.store.load_checkpoint(ROTATION_WORKFLOW).await {
            Ok(Some(checkpoint)) => checkpoint.cursor,
            Ok(None) => 0,
            Err(e) => {
                warn!(error = %e, "체크포인트 조회 실패, 커서 0에서 시작");
                0
            }
        }
    }

    async fn save_checkpoint(&self, cursor: usize, processed: usize, status: CheckpointStatus) {
        let checkpoint =
            Checkpoint::new(ROTATION_WORKFLOW, cursor, status).with_processed(processed);
        if let Err(e) = self.store.save_checkpoint(&checkpoint).await {
            warn!(error = %e, status = %status, "체크포인트 저장 실패");
        }
    }

    async fn flush(&self, records: &[StockRecord]) -> screener_data::Result<()> {
        if records.is_empty() {
            return Ok(());
        }
        let written = self.store.bulk_upsert(records).await?;
        debug!(written, "레코드 플러시");
        Ok(())
    }
}
