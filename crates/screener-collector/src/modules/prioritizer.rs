//! Symbol Prioritizer.
//!
//! 갱신 순서를 정하기 위해 심볼마다 우선순위 점수(0-100)를 계산합니다.
//!
//! - 저장된 적 없는 심볼: 100
//! - 저장된 심볼: `min(50, round(7 × 경과일)) + min(50, round(50 × (1 − 완성도/100)))`
//!
//! 점수 내림차순 안정 정렬이며 동점은 입력 순서를 유지합니다.
//! 점수 계산이 실패하면 입력 순서를 그대로 사용합니다 (최적화일 뿐 정확성 요건이 아님).

use chrono::{DateTime, Utc};
use screener_core::{KnownRecord, Symbol};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// 경과일당 가중치.
const STALENESS_PER_DAY: f64 = 7.0;
/// 요소별 상한.
const COMPONENT_CAP: f64 = 50.0;
/// 미수집 심볼 점수.
const NEVER_FETCHED_SCORE: u8 = 100;

/// 우선순위 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityReason {
    /// 저장된 적 없음
    NeverFetched,
    /// 경과 시간이 주 요인
    Stale,
    /// 품질 결손이 주 요인
    LowQuality,
    /// 점수 계산 실패로 입력 순서 사용
    Fallback,
}

/// 우선순위 항목 (실행마다 재계산).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityEntry {
    pub symbol: Symbol,
    pub priority_score: u8,
    pub reason: PriorityReason,
}

/// 점수 계산 실패.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PrioritizeError {
    #[error("{symbol}: completeness score {score} out of range")]
    InvalidCompleteness { symbol: String, score: u8 },
}

fn staleness_component(last_updated: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let days = (now - last_updated).num_seconds().max(0) as f64 / 86_400.0;
    (STALENESS_PER_DAY * days).round().min(COMPONENT_CAP)
}

fn quality_component(completeness: u8) -> f64 {
    (COMPONENT_CAP * (1.0 - f64::from(completeness) / 100.0))
        .round()
        .clamp(0.0, COMPONENT_CAP)
}

/// 우선순위 계산 (실패 시 에러).
pub fn try_prioritize(
    symbols: &[Symbol],
    known: &[KnownRecord],
    now: DateTime<Utc>,
) -> Result<Vec<PriorityEntry>, PrioritizeError> {
    let by_symbol: HashMap<&str, &KnownRecord> =
        known.iter().map(|k| (k.symbol.as_str(), k)).collect();

    let mut entries = symbols
        .iter()
        .map(|symbol| {
            let Some(record) = by_symbol.get(symbol.ticker.as_str()) else {
                return Ok(PriorityEntry {
                    symbol: symbol.clone(),
                    priority_score: NEVER_FETCHED_SCORE,
                    reason: PriorityReason::NeverFetched,
                });
            };

            let completeness = record.data_quality.completeness_score;
            if completeness > 100 {
                return Err(PrioritizeError::InvalidCompleteness {
                    symbol: symbol.ticker.clone(),
                    score: completeness,
                });
            }

            let stale = staleness_component(record.last_updated, now);
            let quality = quality_component(completeness);

            Ok(PriorityEntry {
                symbol: symbol.clone(),
                priority_score: (stale + quality) as u8,
                reason: if stale >= quality {
                    PriorityReason::Stale
                } else {
                    PriorityReason::LowQuality
                },
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    // sort_by는 안정 정렬
    entries.sort_by(|a, b| b.priority_score.cmp(&a.priority_score));
    Ok(entries)
}

/// 우선순위 계산. 실패하면 입력 순서로 대체합니다.
pub fn prioritize(
    symbols: &[Symbol],
    known: &[KnownRecord],
    now: DateTime<Utc>,
) -> Vec<PriorityEntry> {
    match try_prioritize(symbols, known, now) {
        Ok(entries) => {
            debug!(
                total = entries.len(),
                never_fetched = entries
                    .iter()
                    .filter(|e| e.reason == PriorityReason::NeverFetched)
                    .count(),
                "우선순위 계산 완료"
            );
            entries
        }
        Err(e) => {
            warn!(error = %e, "우선순위 계산 실패, 입력 순서 사용");
            fallback_order(symbols)
        }
    }
}

/// 입력 순서 그대로의 항목.
pub fn fallback_order(symbols: &[Symbol]) -> Vec<PriorityEntry> {
    symbols
        .iter()
        .map(|symbol| PriorityEntry {
            symbol: symbol.clone(),
            priority_score: 0,
            reason: PriorityReason::Fallback,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use screener_core::{DataQuality, TrackedField};
    use std::collections::BTreeMap;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()
    }

    fn sym(t: &str) -> Symbol {
        Symbol::new(t, "NYSE", t).unwrap()
    }

    fn known(t: &str, age: Duration, missing: usize) -> KnownRecord {
        KnownRecord {
            symbol: t.to_string(),
            last_updated: now() - age,
            data_quality: DataQuality::new(
                TrackedField::ALL[..missing].to_vec(),
                BTreeMap::new(),
            ),
        }
    }

    #[test]
    fn test_never_fetched_scores_100_first() {
        let symbols = vec![sym("OLD"), sym("NEW")];
        let records = vec![known("OLD", Duration::days(30), 0)];

        let entries = prioritize(&symbols, &records, now());
        assert_eq!(entries[0].symbol.ticker, "NEW");
        assert_eq!(entries[0].priority_score, 100);
        assert_eq!(entries[0].reason, PriorityReason::NeverFetched);
    }

    #[test]
    fn test_score_components() {
        // 2일 경과 → 14, 결손 6/12 (완성도 50) → 25
        let records = vec![known("A", Duration::days(2), 6)];
        let entries = prioritize(&[sym("A")], &records, now());
        assert_eq!(entries[0].priority_score, 39);
        assert_eq!(entries[0].reason, PriorityReason::LowQuality);

        // 10일 경과 → 50 상한, 결손 없음
        let records = vec![known("B", Duration::days(10), 0)];
        let entries = prioritize(&[sym("B")], &records, now());
        assert_eq!(entries[0].priority_score, 50);
        assert_eq!(entries[0].reason, PriorityReason::Stale);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let symbols = vec![sym("X"), sym("Y"), sym("Z")];
        let records = vec![
            known("X", Duration::hours(1), 0),
            known("Y", Duration::hours(1), 0),
            known("Z", Duration::hours(1), 0),
        ];
        let entries = prioritize(&symbols, &records, now());
        let order: Vec<&str> = entries.iter().map(|e| e.symbol.ticker.as_str()).collect();
        assert_eq!(order, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn test_future_timestamp_counts_as_fresh() {
        let records = vec![known("F", Duration::days(-3), 0)];
        let entries = prioritize(&[sym("F")], &records, now());
        assert_eq!(entries[0].priority_score, 0);
    }

    #[test]
    fn test_invalid_completeness_falls_back_to_input_order() {
        let symbols = vec![sym("A"), sym("B")];
        let mut bad = known("B", Duration::days(1), 0);
        bad.data_quality.completeness_score = 150;

        assert!(try_prioritize(&symbols, &[bad.clone()], now()).is_err());

        let entries = prioritize(&symbols, &[bad], now());
        let order: Vec<&str> = entries.iter().map(|e| e.symbol.ticker.as_str()).collect();
        assert_eq!(order, vec!["A", "B"]);
        assert!(entries.iter().all(|e| e.reason == PriorityReason::Fallback));
    }

    proptest! {
        #[test]
        fn prop_priority_bounds(
            age_secs in -1_000_000i64..100_000_000,
            completeness in 0u8..=100,
        ) {
            let record = KnownRecord {
                symbol: "P".to_string(),
                last_updated: now() - Duration::seconds(age_secs),
                data_quality: DataQuality {
                    completeness_score: completeness,
                    ..DataQuality::default()
                },
            };
            let entries = prioritize(&[sym("P"), sym("Q")], &[record], now());

            prop_assert!(entries.iter().all(|e| e.priority_score <= 100));
            let q = entries.iter().find(|e| e.symbol.ticker == "Q").unwrap();
            prop_assert_eq!(q.priority_score, 100);
        }
    }
}
