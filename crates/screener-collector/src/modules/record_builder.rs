//! Record Builder & Validator.
//!
//! 종목마다 6개 서브 리소스를 동시에 조회해 하나의 [`StockRecord`]로 합칩니다.
//!
//! - 서브 리소스 하나가 비었거나 실패하면 레코드는 열화될 뿐 실패하지 않습니다.
//!   해당 필드는 `None`이 되고 `missing_fields`에 기록됩니다.
//! - 직접 제공되는 비율이 없으면 재무제표 원시 값으로 파생 계산합니다.
//! - 모든 서브 리소스가 비면 `BuildError::NoData`
//! - 실행 시간 예산이 소진되면 `BuildError::BudgetExhausted`

use chrono::Utc;
use screener_core::{
    CompanyProfile, FinancialRatios, MarketMetrics, StockRecord, Symbol, TrackedField,
};
use screener_data::provider::{first_record, numeric_field, text_field, FieldValue};
use screener_data::SubResource::{self, Financials, Growth, KeyMetrics, Profile, Quote, Ratios};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn, Instrument};

use super::derived::{compute_derived, DerivedMetrics, RawFinancials};
use super::scoring::ScoringTable;
use super::validation::QualityCollector;
use crate::error::{BuildError, FetchError};
use crate::executor::FetchExecutor;

/// 한 종목의 서브 리소스 응답 (최신 레코드만).
#[derive(Debug, Clone, Default)]
pub struct SubResources {
    pub profile: Option<Value>,
    pub quote: Option<Value>,
    pub ratios: Option<Value>,
    pub financials: Option<Value>,
    pub key_metrics: Option<Value>,
    pub growth: Option<Value>,
}

impl SubResources {
    fn is_empty(&self) -> bool {
        self.profile.is_none()
            && self.quote.is_none()
            && self.ratios.is_none()
            && self.financials.is_none()
            && self.key_metrics.is_none()
            && self.growth.is_none()
    }

    fn get(&self, resource: SubResource) -> Option<&Value> {
        match resource {
            Profile => self.profile.as_ref(),
            Quote => self.quote.as_ref(),
            Ratios => self.ratios.as_ref(),
            Financials => self.financials.as_ref(),
            KeyMetrics => self.key_metrics.as_ref(),
            Growth => self.growth.as_ref(),
        }
    }

    /// 후보 (서브 리소스, 키) 중 첫 번째 숫자 값.
    ///
    /// 숫자가 하나도 없고 숫자가 아닌 값이 있으면 `NonNumeric`, 모두 없으면 `Missing`.
    fn numeric(&self, sources: &[(SubResource, &str)]) -> FieldValue {
        let mut fallback = FieldValue::Missing;
        for (resource, key) in sources {
            let Some(record) = self.get(*resource) else {
                continue;
            };
            match numeric_field(record, key) {
                FieldValue::Number(n) => return FieldValue::Number(n),
                non_numeric @ FieldValue::NonNumeric(_) if fallback.is_missing() => {
                    fallback = non_numeric;
                }
                _ => {}
            }
        }
        fallback
    }

    fn text(&self, sources: &[(SubResource, &str)]) -> Option<String> {
        sources
            .iter()
            .find_map(|(resource, key)| self.get(*resource).and_then(|r| text_field(r, key)))
    }
}

/// 추적 필드별 직접 소스 (우선순위 순).
fn direct_sources(field: TrackedField) -> &'static [(SubResource, &'static str)] {
    match field {
        TrackedField::MarketCap => &[(Quote, "marketCap"), (Profile, "mktCap"), (KeyMetrics, "marketCapTTM")],
        TrackedField::Price => &[(Quote, "price"), (Profile, "price")],
        TrackedField::PeRatio => &[(Ratios, "peRatioTTM"), (Quote, "pe"), (KeyMetrics, "peRatioTTM")],
        TrackedField::PriceToBook => &[(Ratios, "priceToBookRatioTTM"), (KeyMetrics, "pbRatioTTM")],
        TrackedField::DebtToEquity => &[(Ratios, "debtEquityRatioTTM"), (KeyMetrics, "debtToEquityTTM")],
        TrackedField::NetDebtToEbitda => &[(KeyMetrics, "netDebtToEBITDATTM")],
        TrackedField::ReturnOnEquity => &[(Ratios, "returnOnEquityTTM"), (KeyMetrics, "roeTTM")],
        TrackedField::NetProfitMargin => &[(Ratios, "netProfitMarginTTM")],
        TrackedField::CurrentRatio => &[(Ratios, "currentRatioTTM"), (KeyMetrics, "currentRatioTTM")],
        TrackedField::DividendYield => &[(Ratios, "dividendYieldTTM"), (KeyMetrics, "dividendYieldTTM")],
        TrackedField::RevenueGrowth => &[(Growth, "revenueGrowth")],
        TrackedField::EpsGrowth => &[(Growth, "epsgrowth"), (Growth, "epsGrowth")],
    }
}

/// 파생 계산으로 대체 가능한 필드의 값.
fn derived_value(field: TrackedField, derived: &DerivedMetrics) -> Option<rust_decimal::Decimal> {
    match field {
        TrackedField::NetDebtToEbitda => derived.net_debt_to_ebitda,
        TrackedField::DebtToEquity => derived.debt_to_equity,
        TrackedField::ReturnOnEquity => derived.return_on_equity,
        _ => None,
    }
}

/// 서브 리소스 응답을 검증된 레코드로 조립 (순수 함수).
pub fn assemble(symbol: &Symbol, resources: &SubResources, scoring: &ScoringTable) -> StockRecord {
    let derived = resources
        .financials
        .as_ref()
        .map(|statement| compute_derived(&RawFinancials::from_statement(statement)))
        .and_then(|d| d.metrics().cloned())
        .unwrap_or_default();

    let mut quality = QualityCollector::new();
    let mut value = |field: TrackedField| {
        let mut raw = resources.numeric(direct_sources(field));
        if raw.is_missing() {
            if let Some(d) = derived_value(field, &derived) {
                debug!(symbol = %symbol, field = %field, "파생 지표로 대체");
                raw = FieldValue::Number(d);
            }
        }
        quality.check(field, &raw)
    };

    let market = MarketMetrics {
        price: value(TrackedField::Price),
        market_cap: value(TrackedField::MarketCap),
        volume: resources
            .numeric(&[(Quote, "volume"), (Profile, "volAvg")])
            .number(),
        year_high: resources.numeric(&[(Quote, "yearHigh")]).number(),
        year_low: resources.numeric(&[(Quote, "yearLow")]).number(),
    };

    let ratios = FinancialRatios {
        pe_ratio: value(TrackedField::PeRatio),
        price_to_book: value(TrackedField::PriceToBook),
        debt_to_equity: value(TrackedField::DebtToEquity),
        net_debt_to_ebitda: value(TrackedField::NetDebtToEbitda),
        return_on_equity: value(TrackedField::ReturnOnEquity),
        net_profit_margin: value(TrackedField::NetProfitMargin),
        current_ratio: value(TrackedField::CurrentRatio),
        dividend_yield: value(TrackedField::DividendYield),
        revenue_growth: value(TrackedField::RevenueGrowth),
        eps_growth: value(TrackedField::EpsGrowth),
    };

    let company = CompanyProfile {
        name: resources
            .text(&[(Profile, "companyName"), (Quote, "name")])
            .or_else(|| Some(symbol.display_name.clone()).filter(|n| !n.is_empty())),
        exchange: resources
            .text(&[(Profile, "exchangeShortName"), (Quote, "exchange")])
            .or_else(|| Some(symbol.exchange.clone()).filter(|e| !e.is_empty())),
        sector: resources.text(&[(Profile, "sector")]),
        industry: resources.text(&[(Profile, "industry")]),
        currency: resources.text(&[(Profile, "currency")]),
    };

    let mut record = StockRecord {
        symbol: symbol.ticker.clone(),
        company,
        market,
        ratios,
        data_quality: quality.finish(),
        composite_score: 0,
        last_updated: Utc::now(),
    };
    record.composite_score = scoring.composite_score(&record);
    record
}

/// 레코드 빌더.
#[derive(Clone)]
pub struct RecordBuilder {
    executor: FetchExecutor,
    scoring: Arc<ScoringTable>,
}

impl RecordBuilder {
    pub fn new(executor: FetchExecutor, scoring: Arc<ScoringTable>) -> Self {
        Self { executor, scoring }
    }

    /// 종목 레코드 구성.
    pub async fn build(&self, symbol: &Symbol) -> Result<StockRecord, BuildError> {
        let span = screener_core::symbol_span!("build_record", symbol);
        self.build_inner(symbol).instrument(span).await
    }

    async fn build_inner(&self, symbol: &Symbol) -> Result<StockRecord, BuildError> {
        let ticker = symbol.ticker.as_str();

        let (profile, quote, ratios, financials, key_metrics, growth) = tokio::join!(
            self.fetch_one(Profile, ticker),
            self.fetch_one(Quote, ticker),
            self.fetch_one(Ratios, ticker),
            self.fetch_one(Financials, ticker),
            self.fetch_one(KeyMetrics, ticker),
            self.fetch_one(Growth, ticker),
        );

        let results = [&profile, &quote, &ratios, &financials, &key_metrics, &growth];
        if results
            .iter()
            .any(|r| matches!(r, Err(FetchError::BudgetExhausted)))
        {
            return Err(BuildError::BudgetExhausted {
                symbol: ticker.to_string(),
            });
        }

        let resources = SubResources {
            profile: profile.ok().flatten(),
            quote: quote.ok().flatten(),
            ratios: ratios.ok().flatten(),
            financials: financials.ok().flatten(),
            key_metrics: key_metrics.ok().flatten(),
            growth: growth.ok().flatten(),
        };

        if resources.is_empty() {
            return Err(BuildError::NoData {
                symbol: ticker.to_string(),
            });
        }

        let record = assemble(symbol, &resources, &self.scoring);
        debug!(
            completeness = record.data_quality.completeness_score,
            composite = record.composite_score,
            missing = record.data_quality.missing_fields.len(),
            "레코드 구성 완료"
        );
        Ok(record)
    }

    /// 서브 리소스 하나 조회. 비어 있으면 `Ok(None)`.
    async fn fetch_one(
        &self,
        resource: SubResource,
        ticker: &str,
    ) -> Result<Option<Value>, FetchError> {
        match self.executor.fetch(&resource.request(ticker)).await {
            Ok(payload) => {
                let record = first_record(&payload).cloned();
                if record.is_none() {
                    debug!(resource = %resource, "빈 응답");
                }
                Ok(record)
            }
            Err(err) => {
                if !err.is_budget_exhausted() {
                    warn!(resource = %resource, error = %err, "서브 리소스 실패, 레코드 열화");
                }
                Err(err)
            }
        }
    }
}
