//! 심볼 및 심볼 제외 필터 정의.
//!
//! - `Symbol` - 업스트림 심볼 목록 스냅샷에서 생성되는 불변 식별자
//! - `SecurityType` - 증권 유형 (보통주, ETF, 펀드 등)
//! - `SymbolFilter` - 보통주/주요 거래소 외 종목을 제외하는 필터

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::error::{CoreError, CoreResult};

/// 증권 유형.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SecurityType {
    /// 보통주
    CommonStock,
    /// 상장지수펀드
    Etf,
    /// 뮤추얼 펀드 / 기타 펀드
    Fund,
    /// 신탁
    Trust,
    /// 알 수 없음
    #[default]
    Unknown,
}

impl SecurityType {
    /// 업스트림 `type` 문자열에서 파싱.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "stock" | "common stock" | "common_stock" | "cs" => Self::CommonStock,
            "etf" => Self::Etf,
            "fund" | "mutual fund" => Self::Fund,
            "trust" => Self::Trust,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for SecurityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CommonStock => write!(f, "common_stock"),
            Self::Etf => write!(f, "etf"),
            Self::Fund => write!(f, "fund"),
            Self::Trust => write!(f, "trust"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// 수집 대상 종목 식별자.
///
/// 생성 이후 변경되지 않습니다. 티커는 대문자로 정규화됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol {
    /// 티커 (예: AAPL)
    pub ticker: String,
    /// 거래소 약어 (예: NASDAQ)
    pub exchange: String,
    /// 표시용 종목명
    pub display_name: String,
}

impl Symbol {
    /// 새 심볼 생성.
    pub fn new(
        ticker: impl Into<String>,
        exchange: impl Into<String>,
        display_name: impl Into<String>,
    ) -> CoreResult<Self> {
        let ticker = ticker.into().trim().to_uppercase();
        if ticker.is_empty() {
            return Err(CoreError::InvalidSymbol("빈 티커".to_string()));
        }

        Ok(Self {
            ticker,
            exchange: exchange.into().trim().to_uppercase(),
            display_name: display_name.into().trim().to_string(),
        })
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ticker)
    }
}

/// 심볼 목록 스냅샷의 한 항목 (필터 적용 전).
#[derive(Debug, Clone)]
pub struct ListedSecurity {
    pub symbol: Symbol,
    pub security_type: SecurityType,
}

/// 심볼 제외 필터.
///
/// 보통주가 아니거나 주요 거래소에 상장되지 않은 종목은 수집 대상에서 제외됩니다.
#[derive(Debug, Clone)]
pub struct SymbolFilter {
    /// 허용 거래소 (대문자)
    pub primary_exchanges: HashSet<String>,
    /// 보통주만 허용
    pub common_stock_only: bool,
}

impl Default for SymbolFilter {
    fn default() -> Self {
        Self::with_exchanges(["NYSE", "NASDAQ", "AMEX"])
    }
}

impl SymbolFilter {
    /// 허용 거래소 목록으로 생성.
    pub fn with_exchanges<I, S>(exchanges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            primary_exchanges: exchanges
                .into_iter()
                .map(|e| e.as_ref().trim().to_uppercase())
                .filter(|e| !e.is_empty())
                .collect(),
            common_stock_only: true,
        }
    }

    /// 단일 항목 허용 여부.
    pub fn accepts(&self, security: &ListedSecurity) -> bool {
        if self.common_stock_only && security.security_type != SecurityType::CommonStock {
            return false;
        }
        self.primary_exchanges.is_empty()
            || self
                .primary_exchanges
                .contains(&security.symbol.exchange)
    }

    /// 필터를 적용하고 티커 기준 중복을 제거합니다 (먼저 나온 항목 유지).
    pub fn apply(&self, securities: Vec<ListedSecurity>) -> Vec<Symbol> {
        let mut seen = HashSet::new();
        securities
            .into_iter()
            .filter(|s| self.accepts(s))
            .filter(|s| seen.insert(s.symbol.ticker.clone()))
            .map(|s| s.symbol)
            .collect()
    }
}
