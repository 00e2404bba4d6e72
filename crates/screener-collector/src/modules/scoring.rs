//! 종합 점수 (composite score).
//!
//! 지표별 구간 테이블로 점수를 매기는 설명 가능한 휴리스틱입니다.
//! 임계값은 알고리즘이 아니라 설정 데이터이며, 기본 테이블은 다음과 같습니다:
//!
//! | 구성 요소 | 필드 | 배점 | 구간 |
//! |---|---|---|---|
//! | 시가총액 | marketCap | 20 | ≥200B:20, ≥10B:15, ≥2B:10, ≥300M:5 |
//! | 레버리지 | netDebtToEBITDA | 20 | <1:20, <2:15, <3:10, <4:5 |
//! | 밸류에이션 | peRatio | 20 | [0,15):20, [15,25):15, [25,35):8 |
//! | 수익성 | returnOnEquity | 15 | ≥0.20:15, ≥0.15:12, ≥0.10:8, ≥0.05:4 |
//! | 장부가치 | priceToBook | 10 | [0,1):10, [1,3):7, [3,5):3 |
//! | 성장 | revenueGrowth | 15 | ≥0.20:15, ≥0.10:10, ≥0.05:6, >0:3 |
//!
//! 누락되었거나 검증에 실패한 필드는 0점입니다. 합계는 100으로 제한됩니다.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use screener_core::{StockRecord, TrackedField};
use serde::Serialize;

/// 점수 구간. 첫 번째로 일치하는 구간의 점수를 사용합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tier {
    pub min: Option<Decimal>,
    pub min_inclusive: bool,
    /// 상한 (미포함)
    pub max: Option<Decimal>,
    pub points: u8,
}

impl Tier {
    /// `value >= min`
    pub fn at_least(min: Decimal, points: u8) -> Self {
        Self {
            min: Some(min),
            min_inclusive: true,
            max: None,
            points,
        }
    }

    /// `value > min`
    pub fn above(min: Decimal, points: u8) -> Self {
        Self {
            min: Some(min),
            min_inclusive: false,
            max: None,
            points,
        }
    }

    /// `value < max`
    pub fn below(max: Decimal, points: u8) -> Self {
        Self {
            min: None,
            min_inclusive: true,
            max: Some(max),
            points,
        }
    }

    /// `min <= value < max`
    pub fn between(min: Decimal, max: Decimal, points: u8) -> Self {
        Self {
            min: Some(min),
            min_inclusive: true,
            max: Some(max),
            points,
        }
    }

    pub fn matches(&self, value: Decimal) -> bool {
        let above_min = match self.min {
            Some(min) if self.min_inclusive => value >= min,
            Some(min) => value > min,
            None => true,
        };
        above_min && self.max.map_or(true, |max| value < max)
    }
}

/// 점수 구성 요소.
#[derive(Debug, Clone)]
pub struct ScoreComponent {
    pub name: &'static str,
    pub field: TrackedField,
    pub max_points: u8,
    pub tiers: Vec<Tier>,
}

impl ScoreComponent {
    /// 값에 대한 점수 (배점 초과 불가).
    pub fn points_for(&self, value: Decimal) -> u8 {
        self.tiers
            .iter()
            .find(|t| t.matches(value))
            .map_or(0, |t| t.points.min(self.max_points))
    }
}

/// 구성 요소별 점수.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoreLine {
    pub component: &'static str,
    pub points: u8,
}

/// 점수 테이블.
#[derive(Debug, Clone)]
pub struct ScoringTable {
    components: Vec<ScoreComponent>,
}

/// 종합 점수 상한.
pub const MAX_COMPOSITE_SCORE: u8 = 100;

impl Default for ScoringTable {
    fn default() -> Self {
        Self::new(vec![
            ScoreComponent {
                name: "market_cap",
                field: TrackedField::MarketCap,
                max_points: 20,
                tiers: vec![
                    Tier::at_least(dec!(200000000000), 20),
                    Tier::at_least(dec!(10000000000), 15),
                    Tier::at_least(dec!(2000000000), 10),
                    Tier::at_least(dec!(300000000), 5),
                ],
            },
            ScoreComponent {
                name: "leverage",
                field: TrackedField::NetDebtToEbitda,
                max_points: 20,
                tiers: vec![
                    Tier::below(dec!(1), 20),
                    Tier::below(dec!(2), 15),
                    Tier::below(dec!(3), 10),
                    Tier::below(dec!(4), 5),
                ],
            },
            ScoreComponent {
                name: "valuation",
                field: TrackedField::PeRatio,
                max_points: 20,
                tiers: vec![
                    Tier::between(dec!(0), dec!(15), 20),
                    Tier::between(dec!(15), dec!(25), 15),
                    Tier::between(dec!(25), dec!(35), 8),
                ],
            },
            ScoreComponent {
                name: "profitability",
                field: TrackedField::ReturnOnEquity,
                max_points: 15,
                tiers: vec![
                    Tier::at_least(dec!(0.20), 15),
                    Tier::at_least(dec!(0.15), 12),
                    Tier::at_least(dec!(0.10), 8),
                    Tier::at_least(dec!(0.05), 4),
                ],
            },
            ScoreComponent {
                name: "book_value",
                field: TrackedField::PriceToBook,
                max_points: 10,
                tiers: vec![
                    Tier::between(dec!(0), dec!(1), 10),
                    Tier::between(dec!(1), dec!(3), 7),
                    Tier::between(dec!(3), dec!(5), 3),
                ],
            },
            ScoreComponent {
                name: "growth",
                field: TrackedField::RevenueGrowth,
                max_points: 15,
                tiers: vec![
                    Tier::at_least(dec!(0.20), 15),
                    Tier::at_least(dec!(0.10), 10),
                    Tier::at_least(dec!(0.05), 6),
                    Tier::above(dec!(0), 3),
                ],
            },
        ])
    }
}

impl ScoringTable {
    pub fn new(components: Vec<ScoreComponent>) -> Self {
        Self { components }
    }

    pub fn components(&self) -> &[ScoreComponent] {
        &self.components
    }

    /// 구성 요소별 점수. 유효한 값만 채점합니다.
    pub fn breakdown(&self, record: &StockRecord) -> Vec<ScoreLine> {
        self.components
            .iter()
            .map(|c| {
                let points = if record.data_quality.is_valid(c.field) {
                    record.metric(c.field).map_or(0, |v| c.points_for(v))
                } else {
                    0
                };
                ScoreLine {
                    component: c.name,
                    points,
                }
            })
            .collect()
    }

    /// 종합 점수 (0-100).
    pub fn composite_score(&self, record: &StockRecord) -> u8 {
        let total: u32 = self
            .breakdown(record)
            .iter()
            .map(|l| u32::from(l.points))
            .sum();
        total.min(u32::from(MAX_COMPOSITE_SCORE)) as u8
    }
}
