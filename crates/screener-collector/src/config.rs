//! 환경변수 기반 설정 모듈.

use crate::error::CollectorError;
use crate::throttle::{EndpointClassTable, ThrottleConfig};
use crate::Result;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

/// Collector 전체 설정
#[derive(Debug)]
pub struct CollectorConfig {
    /// 데이터베이스 URL (`--dry-run`이면 없어도 됨)
    pub database_url: Option<String>,
    /// 업스트림 API 설정
    pub upstream: UpstreamConfig,
    /// 실행 설정
    pub run: RunConfig,
    /// 레이트 컨트롤러 설정
    pub throttle: ThrottleConfig,
    /// 엔드포인트 클래스 테이블 TOML 경로 (없으면 기본 테이블)
    pub endpoint_classes_path: Option<PathBuf>,
    /// 심볼 동기화 설정
    pub symbol_sync: SymbolSyncConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// 업스트림 API 설정
#[derive(Debug)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub api_key: SecretString,
    /// 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

/// 실행 설정
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// 실행 시간 예산 (초)
    pub time_budget_secs: u64,
    /// 로테이션 배치 크기
    pub batch_size: usize,
    /// 한도 초과 재시도 상한 (없으면 예산까지 무제한)
    pub max_throttle_retries: Option<u32>,
    /// 인메모리 저장소로 실행 (DB 미사용)
    pub dry_run: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            time_budget_secs: 270,
            batch_size: 200,
            max_throttle_retries: None,
            dry_run: false,
        }
    }
}

/// 심볼 동기화 설정
#[derive(Debug, Clone)]
pub struct SymbolSyncConfig {
    /// 주요 거래소 (이외 거래소 심볼은 제외)
    pub exchanges: Vec<String>,
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 실행 주기 (분 단위)
    pub interval_minutes: u64,
}

const DEFAULT_BASE_URL: &str = "https://financialmodelingprep.com/api/v3";
const DEFAULT_EXCHANGES: &str = "NYSE,NASDAQ,AMEX";

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = ThrottleConfig::default();
        let config = Self {
            database_url: std::env::var("DATABASE_URL").ok().filter(|v| !v.is_empty()),
            upstream: UpstreamConfig {
                base_url: std::env::var("UPSTREAM_BASE_URL")
                    .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
                api_key: SecretString::from(std::env::var("UPSTREAM_API_KEY").unwrap_or_default()),
                timeout_secs: env_var_parse("UPSTREAM_TIMEOUT_SECS", 30),
            },
            run: RunConfig {
                time_budget_secs: env_var_parse("RUN_TIME_BUDGET_SECS", 270),
                batch_size: env_var_parse("ROTATION_BATCH_SIZE", 200),
                max_throttle_retries: std::env::var("MAX_THROTTLE_RETRIES")
                    .ok()
                    .and_then(|v| v.parse().ok()),
                dry_run: env_var_bool("DRY_RUN", false),
            },
            throttle: ThrottleConfig {
                initial_concurrency: env_var_parse("CONCURRENCY_INITIAL", defaults.initial_concurrency),
                min_concurrency: env_var_parse("CONCURRENCY_MIN", defaults.min_concurrency),
                max_concurrency: env_var_parse("CONCURRENCY_MAX", defaults.max_concurrency),
                concurrency_step: env_var_parse("CONCURRENCY_STEP", defaults.concurrency_step),
                success_threshold: env_var_parse("SUCCESS_THRESHOLD", defaults.success_threshold),
                throttle_threshold: env_var_parse("THROTTLE_THRESHOLD", defaults.throttle_threshold),
                initial_backoff: Duration::from_millis(env_var_parse("BACKOFF_INITIAL_MS", 1000)),
                max_backoff: Duration::from_millis(env_var_parse("BACKOFF_MAX_MS", 60_000)),
                backoff_factor: env_var_parse("BACKOFF_FACTOR", defaults.backoff_factor),
            },
            endpoint_classes_path: std::env::var("ENDPOINT_CLASSES_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            symbol_sync: SymbolSyncConfig {
                exchanges: parse_list(
                    &std::env::var("SYMBOL_EXCHANGES").unwrap_or_else(|_| DEFAULT_EXCHANGES.to_string()),
                ),
            },
            daemon: DaemonConfig {
                interval_minutes: env_var_parse("DAEMON_INTERVAL_MINUTES", 15),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        self.throttle.validate()?;
        if self.run.batch_size == 0 {
            return Err(CollectorError::Config(
                "ROTATION_BATCH_SIZE는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.run.time_budget_secs == 0 {
            return Err(CollectorError::Config(
                "RUN_TIME_BUDGET_SECS는 1 이상이어야 합니다".to_string(),
            ));
        }
        if self.daemon.interval_minutes == 0 {
            return Err(CollectorError::Config(
                "DAEMON_INTERVAL_MINUTES는 1 이상이어야 합니다".to_string(),
            ));
        }
        Ok(())
    }

    /// 데이터베이스 URL (필수인 경로에서 사용)
    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url.as_deref().ok_or_else(|| {
            CollectorError::Config("DATABASE_URL 환경변수가 설정되지 않았습니다".to_string())
        })
    }

    /// 엔드포인트 클래스 테이블 로드
    pub fn endpoint_classes(&self) -> Result<EndpointClassTable> {
        match &self.endpoint_classes_path {
            Some(path) => EndpointClassTable::load(path),
            None => Ok(EndpointClassTable::default()),
        }
    }
}

impl UpstreamConfig {
    /// 요청 타임아웃을 Duration으로 반환
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RunConfig {
    /// 실행 시간 예산을 Duration으로 반환
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }
}

impl DaemonConfig {
    /// 실행 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

/// 쉼표 구분 목록 파싱 (빈 항목 제외, 대문자 정규화)
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// 환경변수에서 값을 파싱 (실패 시 기본값 사용)
fn env_var_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// 환경변수에서 bool 값 파싱
fn env_var_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CollectorConfig {
        CollectorConfig {
            database_url: None,
            upstream: UpstreamConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                api_key: SecretString::from("test-key".to_string()),
                timeout_secs: 30,
            },
            run: RunConfig::default(),
            throttle: ThrottleConfig::default(),
            endpoint_classes_path: None,
            symbol_sync: SymbolSyncConfig {
                exchanges: parse_list(DEFAULT_EXCHANGES),
            },
            daemon: DaemonConfig {
                interval_minutes: 15,
            },
        }
    }

    #[test]
    fn test_parse_list() {
        assert_eq!(parse_list(" nyse, ,Nasdaq,"), vec!["NYSE", "NASDAQ"]);
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_validate() {
        let config = sample();
        assert!(config.validate().is_ok());
        assert!(config.require_database_url().is_err());
        assert_eq!(config.run.time_budget(), Duration::from_secs(270));
        assert_eq!(config.daemon.interval(), Duration::from_secs(900));

        let mut bad = sample();
        bad.run.batch_size = 0;
        assert!(matches!(bad.validate(), Err(CollectorError::Config(_))));

        let mut bad = sample();
        bad.throttle.min_concurrency = 10;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_default_endpoint_classes() {
        let classes = sample().endpoint_classes().unwrap();
        assert_eq!(classes.classify("profile").name, "default");
        assert_eq!(classes.classify("stock/list").name, "symbol-list");
    }
}
