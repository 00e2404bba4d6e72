//! 엔드포인트 클래스 (레이트 한도 프로필).
//!
//! 업스트림 엔드포인트는 한도가 서로 다릅니다. 대부분은 분당 수백 회를 허용하지만
//! bulk 계열 엔드포인트는 분당 1회로 제한됩니다.
//!
//! # 분류 규칙
//!
//! 1. 설정된 패턴과 정확히 일치 → 해당 클래스
//! 2. bulk 마커 문자열 포함 → bulk 클래스
//! 3. 그 외 → default 클래스
//!
//! # TOML 형식
//!
//! ```toml
//! bulk_marker = "bulk"
//!
//! [default]
//! name = "default"
//! max_requests_per_window = 750
//! window_secs = 60
//!
//! [bulk]
//! name = "bulk"
//! max_requests_per_window = 1
//! window_secs = 60
//! min_spacing_ms = 60000
//!
//! [[exact]]
//! pattern = "stock/list"
//! name = "symbol-list"
//! max_requests_per_window = 1
//! window_secs = 60
//! min_spacing_ms = 60000
//! ```

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::error::{CollectorError, Result};

/// 레이트 한도 프로필.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointClass {
    /// 클래스 이름 (상태 키)
    pub name: String,
    /// 윈도우당 최대 요청 수
    pub max_requests_per_window: u32,
    /// 윈도우 길이
    pub window: Duration,
    /// 연속 요청 간 최소 간격
    pub min_spacing: Duration,
}

impl EndpointClass {
    pub fn new(
        name: impl Into<String>,
        max_requests_per_window: u32,
        window: Duration,
        min_spacing: Duration,
    ) -> Self {
        Self {
            name: name.into(),
            max_requests_per_window,
            window,
            min_spacing,
        }
    }

    /// 기본 클래스: 분당 750회, 간격 제한 없음.
    pub fn default_class() -> Self {
        Self::new("default", 750, Duration::from_secs(60), Duration::ZERO)
    }

    /// bulk 클래스: 분당 1회, 60초 간격.
    pub fn bulk_class() -> Self {
        Self::new(
            "bulk",
            1,
            Duration::from_secs(60),
            Duration::from_secs(60),
        )
    }

    fn validate(&self) -> Result<()> {
        if self.max_requests_per_window == 0 {
            return Err(CollectorError::Config(format!(
                "엔드포인트 클래스 '{}': max_requests_per_window는 1 이상이어야 합니다",
                self.name
            )));
        }
        if self.window.is_zero() {
            return Err(CollectorError::Config(format!(
                "엔드포인트 클래스 '{}': window는 0보다 커야 합니다",
                self.name
            )));
        }
        Ok(())
    }
}

/// 엔드포인트 → 클래스 분류 테이블.
#[derive(Debug, Clone)]
pub struct EndpointClassTable {
    default: EndpointClass,
    exact: Vec<(String, EndpointClass)>,
    bulk_marker: String,
    bulk: EndpointClass,
}

impl Default for EndpointClassTable {
    fn default() -> Self {
        Self {
            default: EndpointClass::default_class(),
            exact: vec![(
                screener_data::provider::SYMBOL_LIST_ENDPOINT.to_string(),
                EndpointClass::new(
                    "symbol-list",
                    1,
                    Duration::from_secs(60),
                    Duration::from_secs(60),
                ),
            )],
            bulk_marker: "bulk".to_string(),
            bulk: EndpointClass::bulk_class(),
        }
    }
}

impl EndpointClassTable {
    /// 직접 구성.
    pub fn new(default: EndpointClass, bulk_marker: impl Into<String>, bulk: EndpointClass) -> Self {
        Self {
            default,
            exact: Vec::new(),
            bulk_marker: bulk_marker.into(),
            bulk,
        }
    }

    /// 정확 일치 패턴 추가.
    pub fn with_exact(mut self, pattern: impl Into<String>, class: EndpointClass) -> Self {
        self.exact.push((pattern.into(), class));
        self
    }

    /// 엔드포인트 분류.
    pub fn classify(&self, endpoint: &str) -> &EndpointClass {
        let endpoint = endpoint.trim_matches('/');

        if let Some((_, class)) = self.exact.iter().find(|(pattern, _)| pattern == endpoint) {
            return class;
        }
        if !self.bulk_marker.is_empty() && endpoint.contains(&self.bulk_marker) {
            return &self.bulk;
        }
        &self.default
    }

    pub fn default_class(&self) -> &EndpointClass {
        &self.default
    }

    /// 모든 클래스 검증.
    pub fn validate(&self) -> Result<()> {
        self.default.validate()?;
        self.bulk.validate()?;
        for (_, class) in &self.exact {
            class.validate()?;
        }
        Ok(())
    }

    /// TOML 문자열에서 로드.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let raw: RawTable = toml::from_str(content)
            .map_err(|e| CollectorError::Config(format!("엔드포인트 클래스 파싱 실패: {e}")))?;
        let table = raw.into_table();
        table.validate()?;
        Ok(table)
    }

    /// TOML 파일에서 로드.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CollectorError::Config(format!("{} 읽기 실패: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }
}

#[derive(Debug, Deserialize)]
struct RawClass {
    name: String,
    max_requests_per_window: u32,
    window_secs: u64,
    #[serde(default)]
    min_spacing_ms: u64,
}

impl From<RawClass> for EndpointClass {
    fn from(raw: RawClass) -> Self {
        EndpointClass::new(
            raw.name,
            raw.max_requests_per_window,
            Duration::from_secs(raw.window_secs),
            Duration::from_millis(raw.min_spacing_ms),
        )
    }
}

#[derive(Debug, Deserialize)]
struct RawExact {
    pattern: String,
    #[serde(flatten)]
    class: RawClass,
}

#[derive(Debug, Deserialize)]
struct RawTable {
    default: RawClass,
    #[serde(default = "default_bulk_marker")]
    bulk_marker: String,
    bulk: Option<RawClass>,
    #[serde(default)]
    exact: Vec<RawExact>,
}

fn default_bulk_marker() -> String {
    "bulk".to_string()
}

impl RawTable {
    fn into_table(self) -> EndpointClassTable {
        let bulk = self
            .bulk
            .map(EndpointClass::from)
            .unwrap_or_else(EndpointClass::bulk_class);

        self.exact.into_iter().fold(
            EndpointClassTable::new(self.default.into(), self.bulk_marker, bulk),
            |table, raw| {
                let pattern = raw.pattern.trim_matches('/').to_string();
                table.with_exact(pattern, raw.class.into())
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_order() {
        let table = EndpointClassTable::default();

        assert_eq!(table.classify("stock/list").name, "symbol-list");
        assert_eq!(table.classify("/stock/list/").name, "symbol-list");
        assert_eq!(table.classify("profile-bulk").name, "bulk");
        assert_eq!(table.classify("ratios-ttm").name, "default");
        assert_eq!(table.classify("stock/list-extra").name, "default");
    }

    #[test]
    fn test_default_limits() {
        let table = EndpointClassTable::default();
        let default = table.classify("quote");
        assert_eq!(default.max_requests_per_window, 750);
        assert_eq!(default.window, Duration::from_secs(60));
        assert_eq!(default.min_spacing, Duration::ZERO);

        let bulk = table.classify("income-statement-bulk");
        assert_eq!(bulk.max_requests_per_window, 1);
        assert_eq!(bulk.min_spacing, Duration::from_secs(60));
    }

    #[test]
    fn test_from_toml() {
        let toml = r#"
            bulk_marker = "batch"

            [default]
            name = "default"
            max_requests_per_window = 300
            window_secs = 60

            [[exact]]
            pattern = "/stock/list"
            name = "list"
            max_requests_per_window = 2
            window_secs = 120
            min_spacing_ms = 500
        "#;

        let table = EndpointClassTable::from_toml_str(toml).unwrap();
        assert_eq!(table.classify("quote").max_requests_per_window, 300);
        assert_eq!(table.classify("batch-quote").name, "bulk");
        assert_eq!(table.classify("profile-bulk").name, "default");

        let list = table.classify("stock/list");
        assert_eq!(list.name, "list");
        assert_eq!(list.window, Duration::from_secs(120));
        assert_eq!(list.min_spacing, Duration::from_millis(500));
    }

    #[test]
    fn test_toml_rejects_zero_limit() {
        let toml = r#"
            [default]
            name = "default"
            max_requests_per_window = 0
            window_secs = 60
        "#;
        assert!(matches!(
            EndpointClassTable::from_toml_str(toml),
            Err(CollectorError::Config(_))
        ));
    }
}
