//! 수집 실행 체크포인트.
//!
//! 로테이션 커서와 마지막 실행 상태를 워크플로우 이름별로 보관합니다.
//! 프로세스가 재시작되어도 다음 실행이 이전 배치 뒤에서 이어지도록 합니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DataError;

/// 체크포인트 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    /// 실행 중
    Running,
    /// 중단됨 (재개 가능)
    Interrupted,
    /// 완료됨
    Completed,
    /// 유휴 상태
    Idle,
    /// 오류로 종료
    Error,
}

impl CheckpointStatus {
    /// 문자열로 변환
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Interrupted => "interrupted",
            Self::Completed => "completed",
            Self::Idle => "idle",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for CheckpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckpointStatus {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "running" => Ok(Self::Running),
            "interrupted" => Ok(Self::Interrupted),
            "completed" => Ok(Self::Completed),
            "idle" => Ok(Self::Idle),
            "error" => Ok(Self::Error),
            other => Err(DataError::InvalidData(format!(
                "알 수 없는 체크포인트 상태: {other}"
            ))),
        }
    }
}

/// 워크플로우 체크포인트.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// 워크플로우 이름 (e.g., "fundamental_ingest")
    pub workflow: String,
    /// 다음 실행의 로테이션 시작 위치
    pub cursor: usize,
    /// 마지막 실행에서 처리한 종목 수
    pub total_processed: usize,
    pub status: CheckpointStatus,
    pub updated_at: DateTime<Utc>,
}

impl Checkpoint {
    /// 새 체크포인트.
    pub fn new(workflow: impl Into<String>, cursor: usize, status: CheckpointStatus) -> Self {
        Self {
            workflow: workflow.into(),
            cursor,
            total_processed: 0,
            status,
            updated_at: Utc::now(),
        }
    }

    /// 처리 수 지정.
    pub fn with_processed(mut self, total_processed: usize) -> Self {
        self.total_processed = total_processed;
        self
    }
}
