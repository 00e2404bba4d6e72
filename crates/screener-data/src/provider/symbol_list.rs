//! 업스트림 심볼 목록 스냅샷.
//!
//! 응답 형식: `[{"symbol", "name", "exchangeShortName", "type"}, ...]`

use screener_core::{ListedSecurity, SecurityType, Symbol};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::{RequestSpec, UpstreamError};

/// 심볼 목록 엔드포인트 (strict bulk 클래스).
pub const SYMBOL_LIST_ENDPOINT: &str = "stock/list";

/// 심볼 목록 요청.
pub fn symbol_list_request() -> RequestSpec {
    RequestSpec::new(SYMBOL_LIST_ENDPOINT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawListing {
    symbol: Option<String>,
    name: Option<String>,
    exchange_short_name: Option<String>,
    #[serde(rename = "type")]
    security_type: Option<String>,
}

/// 심볼 목록 응답 파싱.
///
/// 티커가 비어 있는 항목은 건너뜁니다. 필터링은 호출자가
/// [`screener_core::SymbolFilter`]로 수행합니다.
pub fn parse_symbol_list(payload: Value) -> Result<Vec<ListedSecurity>, UpstreamError> {
    let rows: Vec<RawListing> = serde_json::from_value(payload)?;
    let total = rows.len();

    let listed: Vec<ListedSecurity> = rows
        .into_iter()
        .filter_map(|row| {
            let symbol = Symbol::new(
                row.symbol.unwrap_or_default(),
                row.exchange_short_name.unwrap_or_default(),
                row.name.unwrap_or_default(),
            )
            .ok()?;
            Some(ListedSecurity {
                symbol,
                security_type: row
                    .security_type
                    .as_deref()
                    .map(SecurityType::parse)
                    .unwrap_or_default(),
            })
        })
        .collect();

    debug!(total, parsed = listed.len(), "심볼 목록 파싱");
    Ok(listed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use screener_core::SymbolFilter;
    use serde_json::json;

    #[test]
    fn test_parse_and_filter() {
        let payload = json!([
            {"symbol": "aapl", "name": "Apple Inc.", "exchangeShortName": "NASDAQ", "type": "stock"},
            {"symbol": "SPY", "name": "SPDR S&P 500", "exchangeShortName": "AMEX", "type": "etf"},
            {"symbol": "", "name": "Blank", "exchangeShortName": "NYSE", "type": "stock"},
            {"symbol": "XYZ", "name": "OTC Co", "exchangeShortName": "OTC", "type": "stock"},
            {"symbol": "AAPL", "name": "Apple dup", "exchangeShortName": "NASDAQ", "type": "stock"},
            {"symbol": "KO", "name": null, "exchangeShortName": "NYSE", "type": "stock"}
        ]);

        let listed = parse_symbol_list(payload).unwrap();
        assert_eq!(listed.len(), 5);

        let symbols = SymbolFilter::default().apply(listed);
        let tickers: Vec<&str> = symbols.iter().map(|s| s.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["AAPL", "KO"]);
        assert_eq!(symbols[0].display_name, "Apple Inc.");
    }

    #[test]
    fn test_parse_rejects_non_array() {
        let err = parse_symbol_list(json!({"Error Message": "bad"})).unwrap_err();
        assert!(matches!(err, UpstreamError::Decode(_)));
    }
}
