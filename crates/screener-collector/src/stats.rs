//! 수집 통계 구조체.

use screener_core::{RunState, RunStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 수집 작업 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionStats {
    /// 총 시도 횟수
    pub total: usize,
    /// 성공 횟수
    pub success: usize,
    /// 에러 횟수
    pub errors: usize,
    /// 건너뛴 횟수 (필터 제외, 예산 소진으로 미처리)
    pub skipped: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl CollectionStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 실행 상태에서 요약 통계 생성
    pub fn from_run(state: &RunState, elapsed: Duration) -> Self {
        let progress = state.progress;
        Self {
            total: progress.total,
            success: progress.completed,
            errors: progress.failed,
            skipped: progress.remaining(),
            elapsed,
        }
    }

    /// 성공률 계산 (%)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.success as f64 / self.total as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            total = self.total,
            success = self.success,
            errors = self.errors,
            skipped = self.skipped,
            success_rate = format!("{:.1}%", self.success_rate()),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "수집 완료"
        );
    }
}

/// 실행 결과 로그 (상태별 레벨).
pub fn log_run(state: &RunState, elapsed: Duration) {
    let stats = CollectionStats::from_run(state, elapsed);
    match state.status {
        RunStatus::Error => tracing::error!(
            run_id = %state.run_id,
            completed = stats.success,
            failed = stats.errors,
            error = state.last_error.as_deref().unwrap_or("unknown"),
            "펀더멘털 수집 실패"
        ),
        _ => stats.log_summary("펀더멘털 수집"),
    }
}
