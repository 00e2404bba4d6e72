//! JSON 페이로드 추출 유틸리티.
//!
//! 업스트림 응답은 객체 하나이거나 객체 배열(기간별)입니다. 배열이면 첫 원소가
//! 최신 기간입니다. 숫자는 JSON 숫자 또는 숫자 문자열로 올 수 있습니다.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// 응답에서 첫 레코드 추출.
///
/// 빈 배열, `null`, 빈 객체는 "데이터 없음"으로 간주합니다.
pub fn first_record(payload: &Value) -> Option<&Value> {
    let record = match payload {
        Value::Array(items) => items.first()?,
        Value::Object(_) => payload,
        _ => return None,
    };

    match record {
        Value::Object(map) if !map.is_empty() => Some(record),
        _ => None,
    }
}

/// 숫자 필드 추출 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// 키가 없거나 `null` / 빈 문자열
    Missing,
    /// 값은 있으나 숫자로 해석 불가
    NonNumeric(String),
    /// 숫자
    Number(Decimal),
}

impl FieldValue {
    /// 숫자 값.
    pub fn number(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(d) => Some(*d),
            _ => None,
        }
    }

    /// 누락 여부.
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }
}

/// 숫자 필드 추출.
pub fn numeric_field(record: &Value, key: &str) -> FieldValue {
    match record.get(key) {
        None | Some(Value::Null) => FieldValue::Missing,
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Number(Decimal::from(i))
            } else if let Some(u) = n.as_u64() {
                FieldValue::Number(Decimal::from(u))
            } else {
                // f64는 이진 표현 잡음을 잘라냅니다
                n.as_f64()
                    .and_then(Decimal::from_f64)
                    .map(|d| FieldValue::Number(d.round_dp(6).normalize()))
                    .unwrap_or_else(|| FieldValue::NonNumeric(n.to_string()))
            }
        }
        Some(Value::String(s)) => parse_numeric_str(s),
        Some(other) => FieldValue::NonNumeric(other.to_string()),
    }
}

fn parse_numeric_str(raw: &str) -> FieldValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return FieldValue::Missing;
    }

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map(FieldValue::Number)
        .unwrap_or_else(|_| FieldValue::NonNumeric(trimmed.to_string()))
}

/// 숫자 필드를 `Option<Decimal>`로 추출 (숫자가 아니면 `None`).
pub fn decimal_field(record: &Value, key: &str) -> Option<Decimal> {
    numeric_field(record, key).number()
}

/// 문자열 필드 추출 (공백 제거, 빈 문자열은 `None`).
pub fn text_field(record: &Value, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
