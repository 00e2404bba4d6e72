//! 인메모리 저장소 계약 테스트.

use chrono::{TimeZone, Utc};
use rust_decimal_macros::dec;
use screener_core::{
    CompanyProfile, DataQuality, FinancialRatios, MarketMetrics, StockRecord, TrackedField,
};
use screener_data::{Checkpoint, CheckpointStatus, MemoryRecordStore, RecordStore};
use std::collections::BTreeMap;

fn record(symbol: &str, price: rust_decimal::Decimal) -> StockRecord {
    StockRecord {
        symbol: symbol.to_string(),
        company: CompanyProfile {
            name: Some(format!("{symbol} Corp")),
            ..Default::default()
        },
        market: MarketMetrics {
            price: Some(price),
            ..Default::default()
        },
        ratios: FinancialRatios::default(),
        data_quality: DataQuality::new(vec![TrackedField::PeRatio], BTreeMap::new()),
        composite_score: 40,
        last_updated: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
    }
}

#[tokio::test]
async fn test_bulk_upsert_is_idempotent() {
    let store = MemoryRecordStore::new();
    let batch = vec![record("AAPL", dec!(190.5)), record("MSFT", dec!(410))];

    store.bulk_upsert(&batch).await.unwrap();
    let first = store.snapshot().await;

    store.bulk_upsert(&batch).await.unwrap();
    let second = store.snapshot().await;

    assert_eq!(first, second);
    assert_eq!(store.count_all().await.unwrap(), 2);
    assert_eq!(store.flush_count(), 2);
}

#[tokio::test]
async fn test_upsert_replaces_whole_record() {
    let store = MemoryRecordStore::with_records([record("AAPL", dec!(100))]);

    let mut updated = record("AAPL", dec!(120));
    updated.company.name = None;
    store.bulk_upsert(&[updated.clone()]).await.unwrap();

    let stored = store.read_record("AAPL").await.unwrap().unwrap();
    assert_eq!(stored, updated);
    assert_eq!(store.count_all().await.unwrap(), 1);
}

#[tokio::test]
async fn test_empty_flush_is_noop() {
    let store = MemoryRecordStore::new();
    assert_eq!(store.bulk_upsert(&[]).await.unwrap(), 0);
    assert_eq!(store.flush_count(), 0);
}

#[tokio::test]
async fn test_known_symbols_carry_quality() {
    let store = MemoryRecordStore::with_records([record("KO", dec!(60))]);
    let known = store.read_known_symbols().await.unwrap();

    assert_eq!(known.len(), 1);
    assert_eq!(known[0].symbol, "KO");
    assert_eq!(known[0].data_quality.completeness_score, 92);
}

#[tokio::test]
async fn test_checkpoint_round_trip() {
    let store = MemoryRecordStore::new();
    assert!(store.load_checkpoint("fundamental_ingest").await.unwrap().is_none());

    let checkpoint =
        Checkpoint::new("fundamental_ingest", 200, CheckpointStatus::Completed).with_processed(200);
    store.save_checkpoint(&checkpoint).await.unwrap();

    let loaded = store.load_checkpoint("fundamental_ingest").await.unwrap().unwrap();
    assert_eq!(loaded.cursor, 200);
    assert_eq!(loaded.status, CheckpointStatus::Completed);
}
