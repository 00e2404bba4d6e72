//! 심볼 동기화 모듈.
//!
//! 업스트림 심볼 목록 스냅샷을 받아 수집 대상 유니버스를 만듭니다.
//! 목록 엔드포인트는 엄격한 bulk 계열 클래스(분당 1회)로 분류되므로
//! 레이트 컨트롤러를 반드시 거쳐야 합니다.

use screener_core::{Symbol, SymbolFilter};
use screener_data::provider::{parse_symbol_list, symbol_list_request};
use std::time::Instant;

use crate::executor::FetchExecutor;
use crate::{CollectionStats, Result};

/// 심볼 유니버스 조회.
///
/// 보통주/주요 거래소 필터와 티커 중복 제거를 적용한 목록을 반환합니다.
pub async fn fetch_universe(
    executor: &FetchExecutor,
    filter: &SymbolFilter,
) -> Result<(Vec<Symbol>, CollectionStats)> {
    let start = Instant::now();
    let mut stats = CollectionStats::new();

    tracing::info!("심볼 목록 동기화 시작");

    let payload = executor.fetch(&symbol_list_request()).await?;
    let listed = parse_symbol_list(payload)?;
    stats.total = listed.len();

    let symbols = filter.apply(listed);
    stats.success = symbols.len();
    stats.skipped = stats.total - stats.success;
    stats.elapsed = start.elapsed();

    tracing::info!(
        listed = stats.total,
        accepted = stats.success,
        excluded = stats.skipped,
        "심볼 목록 동기화 완료"
    );

    Ok((symbols, stats))
}

/// 쉼표 구분 티커 목록으로 유니버스 구성 (`--symbols` 옵션).
///
/// 빈 항목은 건너뛰고 중복은 먼저 나온 항목만 남깁니다.
pub fn parse_symbols(list: &str) -> Vec<Symbol> {
    let mut seen = std::collections::HashSet::new();
    list.split(',')
        .filter_map(|t| Symbol::new(t, "", "").ok())
        .filter(|s| seen.insert(s.ticker.clone()))
        .collect()
}
