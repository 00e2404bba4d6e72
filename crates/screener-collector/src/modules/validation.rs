//! 필드 검증 정책.
//!
//! 필드마다 고유 정책을 가집니다. 예를 들어 부채 비율은 음수(순현금)일 수 있지만
//! 가격은 음수일 수 없습니다. 검증 실패 값은 레코드에 남지만 종합 점수에는
//! 쓰이지 않고 `validation_issues`에 기록되어 완성도를 낮춥니다.

use rust_decimal::Decimal;
use screener_core::{DataQuality, TrackedField, ValidationIssue};
use screener_data::provider::FieldValue;
use std::collections::BTreeMap;

/// 단일 필드 검증 정책.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FieldPolicy {
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
    /// 0을 "값 없음" 자리표시로 취급
    pub zero_is_placeholder: bool,
    pub non_negative: bool,
}

impl FieldPolicy {
    fn range(min: Decimal, max: Decimal) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            zero_is_placeholder: false,
            non_negative: false,
        }
    }

    fn positive(max: Option<Decimal>) -> Self {
        Self {
            min: None,
            max,
            zero_is_placeholder: true,
            non_negative: true,
        }
    }

    fn placeholder_zero(mut self) -> Self {
        self.zero_is_placeholder = true;
        self
    }

    /// 숫자 값 검사.
    pub fn check(&self, value: Decimal) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        if self.non_negative && value.is_sign_negative() && !value.is_zero() {
            issues.push(ValidationIssue::Negative);
        }
        if self.zero_is_placeholder && value.is_zero() {
            issues.push(ValidationIssue::PlaceholderZero);
        }
        if self.min.is_some_and(|min| value < min) {
            issues.push(ValidationIssue::BelowMinimum);
        }
        if self.max.is_some_and(|max| value > max) {
            issues.push(ValidationIssue::AboveMaximum);
        }
        issues
    }
}

/// 필드별 기본 정책.
pub fn policy_for(field: TrackedField) -> FieldPolicy {
    use TrackedField::*;

    match field {
        MarketCap => FieldPolicy::positive(None),
        Price => FieldPolicy::positive(Some(Decimal::from(1_000_000))),
        PeRatio => FieldPolicy::range(Decimal::from(-10_000), Decimal::from(10_000)).placeholder_zero(),
        PriceToBook => FieldPolicy::range(Decimal::from(-1_000), Decimal::from(1_000)).placeholder_zero(),
        DebtToEquity => FieldPolicy::range(Decimal::from(-100), Decimal::from(100)),
        NetDebtToEbitda => FieldPolicy::range(Decimal::from(-100), Decimal::from(100)),
        ReturnOnEquity => FieldPolicy::range(Decimal::from(-10), Decimal::from(10)),
        NetProfitMargin => FieldPolicy::range(Decimal::from(-10), Decimal::from(10)),
        CurrentRatio => FieldPolicy::positive(Some(Decimal::from(100))),
        DividendYield => FieldPolicy {
            min: None,
            max: Some(Decimal::ONE),
            zero_is_placeholder: false,
            non_negative: true,
        },
        RevenueGrowth => FieldPolicy::range(Decimal::NEGATIVE_ONE, Decimal::from(100)),
        EpsGrowth => FieldPolicy::range(Decimal::from(-100), Decimal::from(100)),
    }
}

/// 레코드 단위 검증 누적기.
#[derive(Debug, Default)]
pub struct QualityCollector {
    missing: Vec<TrackedField>,
    issues: BTreeMap<TrackedField, Vec<ValidationIssue>>,
}

impl QualityCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// 필드 값을 검증하고 레코드에 저장할 값을 반환.
    ///
    /// 누락이면 `missing_fields`, 숫자가 아니거나 정책 위반이면
    /// `validation_issues`에 기록합니다. 정책 위반 숫자는 그대로 반환됩니다.
    pub fn check(&mut self, field: TrackedField, value: &FieldValue) -> Option<Decimal> {
        match value {
            FieldValue::Missing => {
                self.missing.push(field);
                None
            }
            FieldValue::NonNumeric(_) => {
                self.issues.insert(field, vec![ValidationIssue::NonNumeric]);
                None
            }
            FieldValue::Number(n) => {
                let issues = policy_for(field).check(*n);
                if !issues.is_empty() {
                    self.issues.insert(field, issues);
                }
                Some(*n)
            }
        }
    }

    /// 데이터 품질 정보로 마무리.
    pub fn finish(mut self) -> DataQuality {
        self.missing.sort();
        self.missing.dedup();
        DataQuality::new(self.missing, self.issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_price_policy() {
        let policy = policy_for(TrackedField::Price);
        assert!(policy.check(dec!(190.5)).is_empty());
        assert_eq!(policy.check(dec!(0)), vec![ValidationIssue::PlaceholderZero]);
        assert_eq!(policy.check(dec!(-1)), vec![ValidationIssue::Negative]);
        assert_eq!(policy.check(dec!(2000000)), vec![ValidationIssue::AboveMaximum]);
    }

    #[test]
    fn test_leverage_may_be_negative() {
        let policy = policy_for(TrackedField::NetDebtToEbitda);
        assert!(policy.check(dec!(-1.5)).is_empty());
        assert!(policy.check(dec!(0)).is_empty());
        assert_eq!(policy.check(dec!(-150)), vec![ValidationIssue::BelowMinimum]);
    }

    #[test]
    fn test_dividend_yield_zero_is_valid() {
        let policy = policy_for(TrackedField::DividendYield);
        assert!(policy.check(dec!(0)).is_empty());
        assert_eq!(policy.check(dec!(1.5)), vec![ValidationIssue::AboveMaximum]);
    }

    #[test]
    fn test_collector_scores_missing_and_invalid() {
        let mut collector = QualityCollector::new();

        assert_eq!(
            collector.check(TrackedField::Price, &FieldValue::Number(dec!(10))),
            Some(dec!(10))
        );
        assert_eq!(collector.check(TrackedField::PeRatio, &FieldValue::Missing), None);
        assert_eq!(
            collector.check(TrackedField::CurrentRatio, &FieldValue::NonNumeric("n/a".into())),
            None
        );
        assert_eq!(
            collector.check(TrackedField::MarketCap, &FieldValue::Number(dec!(0))),
            Some(dec!(0))
        );

        let quality = collector.finish();
        assert_eq!(quality.missing_fields, vec![TrackedField::PeRatio]);
        assert_eq!(
            quality.validation_issues.get(&TrackedField::CurrentRatio),
            Some(&vec![ValidationIssue::NonNumeric])
        );
        assert!(!quality.is_valid(TrackedField::MarketCap));
        assert!(quality.is_valid(TrackedField::Price));
        // (1 + 2) / 12 결손 → 75
        assert_eq!(quality.completeness_score, 75);
    }
}
