//! 수집 실행 상태.
//!
//! # 상태 전이
//!
//! ```text
//! Idle ──start──> Running ──complete──> Completed
//!   │                │
//!   └────fail────────┴──────fail──────> Error
//! ```
//!
//! 시간 예산 소진으로 일찍 멈춘 실행도 `Completed`입니다 (`remaining > 0`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::record::{DataQuality, TrackedField};
use crate::error::{CoreError, CoreResult};

/// 실행 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Error,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }

    /// 종료 상태인지.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 진행 카운터.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunProgress {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
}

impl RunProgress {
    /// 아직 처리되지 않은 심볼 수.
    pub fn remaining(&self) -> usize {
        self.total.saturating_sub(self.completed + self.failed)
    }
}

/// 실행 단위 데이터 품질 집계.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RunDataQuality {
    /// 필드별 누락 레코드 수
    pub missing_fields: BTreeMap<TrackedField, usize>,
    /// 집계 완성도 (0-100)
    pub completeness_score: u8,
}

/// 집계 완성도 계산.
///
/// `max(0, round(100 × (1 − meanMissingFieldsPerRecord / tracked)))`.
/// 처리된 레코드가 없으면 0입니다.
pub fn aggregate_completeness(total_missing: usize, records: usize, tracked: usize) -> u8 {
    if records == 0 || tracked == 0 {
        return 0;
    }
    let mean_missing = total_missing as f64 / records as f64;
    (100.0 * (1.0 - mean_missing / tracked as f64))
        .round()
        .clamp(0.0, 100.0) as u8
}

/// 한 번의 수집 실행 상태.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub progress: RunProgress,
    pub data_quality: RunDataQuality,
    /// 시간 예산 소진으로 조기 종료했는지
    pub stopped_early: bool,
    pub last_error: Option<String>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    /// 유휴 상태의 새 실행.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            status: RunStatus::Idle,
            start_time: None,
            end_time: None,
            progress: RunProgress::default(),
            data_quality: RunDataQuality::default(),
            stopped_early: false,
            last_error: None,
        }
    }

    /// Idle → Running. 통계를 초기화합니다.
    pub fn start(&mut self, now: DateTime<Utc>) -> CoreResult<()> {
        self.transition(RunStatus::Running)?;
        self.start_time = Some(now);
        self.end_time = None;
        self.progress = RunProgress::default();
        self.data_quality = RunDataQuality::default();
        self.stopped_early = false;
        self.last_error = None;
        Ok(())
    }

    /// 배치 크기 확정.
    pub fn set_total(&mut self, total: usize) {
        self.progress.total = total;
    }

    /// 성공한 레코드 반영.
    pub fn record_success(&mut self, quality: &DataQuality) {
        self.progress.completed += 1;
        for field in &quality.missing_fields {
            *self.data_quality.missing_fields.entry(*field).or_insert(0) += 1;
        }
        self.refresh_completeness();
    }

    /// 실패한 심볼 반영.
    pub fn record_failure(&mut self) {
        self.progress.failed += 1;
    }

    /// Running → Completed.
    pub fn complete(&mut self, now: DateTime<Utc>, stopped_early: bool) -> CoreResult<()> {
        self.transition(RunStatus::Completed)?;
        self.end_time = Some(now);
        self.stopped_early = stopped_early;
        self.refresh_completeness();
        Ok(())
    }

    /// Idle/Running → Error. 진행 스냅샷은 보존됩니다.
    pub fn fail(&mut self, now: DateTime<Utc>, error: impl Into<String>) -> CoreResult<()> {
        self.transition(RunStatus::Error)?;
        self.end_time = Some(now);
        self.last_error = Some(error.into());
        self.refresh_completeness();
        Ok(())
    }

    /// 운영자/UI용 상태 보고서.
    pub fn report(&self) -> RunStatusReport {
        RunStatusReport {
            run_id: self.run_id,
            status: self.status,
            start_time: self.start_time,
            end_time: self.end_time,
            progress: ProgressReport {
                total: self.progress.total,
                completed: self.progress.completed,
                failed: self.progress.failed,
                remaining: self.progress.remaining(),
            },
            data_quality: self.data_quality.clone(),
            last_error: self.last_error.clone(),
        }
    }

    fn refresh_completeness(&mut self) {
        let total_missing: usize = self.data_quality.missing_fields.values().sum();
        self.data_quality.completeness_score = aggregate_completeness(
            total_missing,
            self.progress.completed,
            TrackedField::COUNT,
        );
    }

    fn transition(&mut self, to: RunStatus) -> CoreResult<()> {
        let allowed = matches!(
            (self.status, to),
            (RunStatus::Idle, RunStatus::Running)
                | (RunStatus::Running, RunStatus::Completed)
                | (RunStatus::Running, RunStatus::Error)
                | (RunStatus::Idle, RunStatus::Error)
        );
        if !allowed {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}

/// 진행 보고 (remaining 포함).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub remaining: usize,
}

/// 외부 노출용 실행 상태.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatusReport {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub progress: ProgressReport,
    pub data_quality: RunDataQuality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}
