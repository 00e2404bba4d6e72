//! 재무제표 원시 값에서 파생 지표 계산.
//!
//! 직접 제공되는 비율이 없을 때의 대체 경로입니다. 필요한 구성 요소가 하나라도
//! 없으면 값을 추정하지 않고 `None`으로 둡니다.

use rust_decimal::Decimal;
use screener_data::provider::decimal_field;
use serde_json::Value;

/// 재무제표 원시 구성 요소.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFinancials {
    pub total_debt: Option<Decimal>,
    pub cash: Option<Decimal>,
    pub ebitda: Option<Decimal>,
    pub equity: Option<Decimal>,
    pub net_income: Option<Decimal>,
}

impl RawFinancials {
    /// 최신 기간 재무제표 레코드에서 추출.
    pub fn from_statement(record: &Value) -> Self {
        Self {
            total_debt: decimal_field(record, "totalDebt"),
            cash: decimal_field(record, "cashAndCashEquivalents")
                .or_else(|| decimal_field(record, "cashAndShortTermInvestments")),
            ebitda: decimal_field(record, "ebitda"),
            equity: decimal_field(record, "totalStockholdersEquity")
                .or_else(|| decimal_field(record, "totalEquity")),
            net_income: decimal_field(record, "netIncome"),
        }
    }
}

/// 파생 지표.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedMetrics {
    pub net_debt_to_ebitda: Option<Decimal>,
    pub debt_to_equity: Option<Decimal>,
    pub return_on_equity: Option<Decimal>,
}

/// 계산 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Derived {
    Available(DerivedMetrics),
    /// 어떤 지표도 계산할 수 없음
    Unavailable,
}

impl Derived {
    pub fn metrics(&self) -> Option<&DerivedMetrics> {
        match self {
            Derived::Available(m) => Some(m),
            Derived::Unavailable => None,
        }
    }
}

fn ratio(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    if denominator.is_zero() {
        return None;
    }
    numerator.checked_div(denominator).map(|r| r.round_dp(4))
}

/// 파생 지표 계산 (순수 함수).
pub fn compute_derived(raw: &RawFinancials) -> Derived {
    let net_debt_to_ebitda = match (raw.total_debt, raw.cash, raw.ebitda) {
        (Some(debt), Some(cash), Some(ebitda)) => {
            debt.checked_sub(cash).and_then(|net| ratio(net, ebitda))
        }
        _ => None,
    };
    let debt_to_equity = match (raw.total_debt, raw.equity) {
        (Some(debt), Some(equity)) => ratio(debt, equity),
        _ => None,
    };
    let return_on_equity = match (raw.net_income, raw.equity) {
        (Some(income), Some(equity)) => ratio(income, equity),
        _ => None,
    };

    let metrics = DerivedMetrics {
        net_debt_to_ebitda,
        debt_to_equity,
        return_on_equity,
    };

    if metrics == DerivedMetrics::default() {
        Derived::Unavailable
    } else {
        Derived::Available(metrics)
    }
}
