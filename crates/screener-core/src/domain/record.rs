//! 종목 레코드 및 데이터 품질 모델.
//!
//! `StockRecord`는 저장소에 upsert되는 단위입니다. 한 번의 수집-검증 사이클마다
//! 통째로 교체되며 부분 갱신되지 않습니다.
//!
//! 값을 얻지 못한 지표는 `None`("unavailable")으로 남고 `missing_fields`에 기록됩니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// 품질 점수 계산 대상 필드.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TrackedField {
    #[serde(rename = "marketCap")]
    MarketCap,
    #[serde(rename = "price")]
    Price,
    #[serde(rename = "peRatio")]
    PeRatio,
    #[serde(rename = "priceToBook")]
    PriceToBook,
    #[serde(rename = "debtToEquity")]
    DebtToEquity,
    #[serde(rename = "netDebtToEBITDA")]
    NetDebtToEbitda,
    #[serde(rename = "returnOnEquity")]
    ReturnOnEquity,
    #[serde(rename = "netProfitMargin")]
    NetProfitMargin,
    #[serde(rename = "currentRatio")]
    CurrentRatio,
    #[serde(rename = "dividendYield")]
    DividendYield,
    #[serde(rename = "revenueGrowth")]
    RevenueGrowth,
    #[serde(rename = "epsGrowth")]
    EpsGrowth,
}

impl TrackedField {
    /// 전체 추적 필드.
    pub const ALL: [TrackedField; 12] = [
        TrackedField::MarketCap,
        TrackedField::Price,
        TrackedField::PeRatio,
        TrackedField::PriceToBook,
        TrackedField::DebtToEquity,
        TrackedField::NetDebtToEbitda,
        TrackedField::ReturnOnEquity,
        TrackedField::NetProfitMargin,
        TrackedField::CurrentRatio,
        TrackedField::DividendYield,
        TrackedField::RevenueGrowth,
        TrackedField::EpsGrowth,
    ];

    /// 추적 필드 수.
    pub const COUNT: usize = Self::ALL.len();

    /// 직렬화 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MarketCap => "marketCap",
            Self::Price => "price",
            Self::PeRatio => "peRatio",
            Self::PriceToBook => "priceToBook",
            Self::DebtToEquity => "debtToEquity",
            Self::NetDebtToEbitda => "netDebtToEBITDA",
            Self::ReturnOnEquity => "returnOnEquity",
            Self::NetProfitMargin => "netProfitMargin",
            Self::CurrentRatio => "currentRatio",
            Self::DividendYield => "dividendYield",
            Self::RevenueGrowth => "revenueGrowth",
            Self::EpsGrowth => "epsGrowth",
        }
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackedField {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::UnknownField(s.to_string()))
    }
}

/// 필드 검증 실패 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationIssue {
    /// 숫자가 아님
    NonNumeric,
    /// 최소값 미만
    BelowMinimum,
    /// 최대값 초과
    AboveMaximum,
    /// 0이 자리표시 값으로 쓰인 경우
    PlaceholderZero,
    /// 음수 불가 필드에 음수
    Negative,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NonNumeric => "non_numeric",
            Self::BelowMinimum => "below_minimum",
            Self::AboveMaximum => "above_maximum",
            Self::PlaceholderZero => "placeholder_zero",
            Self::Negative => "negative",
        };
        f.write_str(s)
    }
}

/// 완성도 점수 계산.
///
/// `max(0, round(100 × (1 − (missing + invalid) / tracked)))`
pub fn completeness_score(missing: usize, invalid: usize, tracked: usize) -> u8 {
    if tracked == 0 {
        return 0;
    }
    let deficit = (missing + invalid) as f64 / tracked as f64;
    (100.0 * (1.0 - deficit)).round().clamp(0.0, 100.0) as u8
}

/// 레코드 단위 데이터 품질 정보.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataQuality {
    /// 값을 얻지 못한 필드
    pub missing_fields: Vec<TrackedField>,
    /// 필드별 검증 이슈
    pub validation_issues: BTreeMap<TrackedField, Vec<ValidationIssue>>,
    /// 완성도 (0-100)
    pub completeness_score: u8,
}

impl DataQuality {
    /// 누락/검증 결과로부터 생성 (완성도 자동 계산).
    pub fn new(
        missing_fields: Vec<TrackedField>,
        validation_issues: BTreeMap<TrackedField, Vec<ValidationIssue>>,
    ) -> Self {
        let completeness_score = completeness_score(
            missing_fields.len(),
            validation_issues.len(),
            TrackedField::COUNT,
        );
        Self {
            missing_fields,
            validation_issues,
            completeness_score,
        }
    }

    /// 필드가 누락되었는지.
    pub fn is_missing(&self, field: TrackedField) -> bool {
        self.missing_fields.contains(&field)
    }

    /// 필드가 유효한 값인지 (누락도, 검증 이슈도 없음).
    pub fn is_valid(&self, field: TrackedField) -> bool {
        !self.is_missing(field) && !self.validation_issues.contains_key(&field)
    }
}

/// 회사 기본 정보.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CompanyProfile {
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub currency: Option<String>,
}

/// 시세/시장 지표.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MarketMetrics {
    pub price: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub volume: Option<Decimal>,
    pub year_high: Option<Decimal>,
    pub year_low: Option<Decimal>,
}

/// 재무 비율.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FinancialRatios {
    pub pe_ratio: Option<Decimal>,
    pub price_to_book: Option<Decimal>,
    pub debt_to_equity: Option<Decimal>,
    pub net_debt_to_ebitda: Option<Decimal>,
    pub return_on_equity: Option<Decimal>,
    pub net_profit_margin: Option<Decimal>,
    pub current_ratio: Option<Decimal>,
    pub dividend_yield: Option<Decimal>,
    pub revenue_growth: Option<Decimal>,
    pub eps_growth: Option<Decimal>,
}

/// 저장 단위 종목 레코드.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    /// 티커 (upsert 키)
    pub symbol: String,
    pub company: CompanyProfile,
    pub market: MarketMetrics,
    pub ratios: FinancialRatios,
    pub data_quality: DataQuality,
    /// 종합 점수 (0-100)
    pub composite_score: u8,
    pub last_updated: DateTime<Utc>,
}

impl StockRecord {
    /// 추적 필드 값 조회.
    pub fn metric(&self, field: TrackedField) -> Option<Decimal> {
        match field {
            TrackedField::MarketCap => self.market.market_cap,
            TrackedField::Price => self.market.price,
            TrackedField::PeRatio => self.ratios.pe_ratio,
            TrackedField::PriceToBook => self.ratios.price_to_book,
            TrackedField::DebtToEquity => self.ratios.debt_to_equity,
            TrackedField::NetDebtToEbitda => self.ratios.net_debt_to_ebitda,
            TrackedField::ReturnOnEquity => self.ratios.return_on_equity,
            TrackedField::NetProfitMargin => self.ratios.net_profit_margin,
            TrackedField::CurrentRatio => self.ratios.current_ratio,
            TrackedField::DividendYield => self.ratios.dividend_yield,
            TrackedField::RevenueGrowth => self.ratios.revenue_growth,
            TrackedField::EpsGrowth => self.ratios.eps_growth,
        }
    }
}

/// 저장소에 이미 존재하는 심볼의 요약 (우선순위 계산용).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownRecord {
    pub symbol: String,
    pub last_updated: DateTime<Utc>,
    pub data_quality: DataQuality,
}

impl From<&StockRecord> for KnownRecord {
    fn from(record: &StockRecord) -> Self {
        Self {
            symbol: record.symbol.clone(),
            last_updated: record.last_updated,
            data_quality: record.data_quality.clone(),
        }
    }
}
