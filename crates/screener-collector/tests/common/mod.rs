//! 수집기 통합 테스트 공용 도구.

#![allow(dead_code)]

use async_trait::async_trait;
use screener_collector::{EndpointClassTable, RateController, ThrottleConfig};
use screener_core::{KnownRecord, StockRecord, Symbol};
use screener_data::storage::Checkpoint;
use screener_data::{
    DataError, MemoryRecordStore, RecordStore, RequestSpec, SubResource, UpstreamClient,
    UpstreamError,
};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Reply = Result<Value, UpstreamError>;

/// 경로별로 응답을 미리 정해 둔 업스트림 클라이언트.
///
/// 응답 큐의 마지막 항목은 소진되지 않고 반복됩니다. 정해지지 않은 경로는 빈 배열.
#[derive(Default)]
pub struct ScriptedClient {
    scripts: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
    latency: Option<Duration>,
    requests: AtomicUsize,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// 모든 요청에 지연 추가.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn script(&self, path: impl Into<String>, replies: Vec<Reply>) {
        let mut scripts = self.scripts.lock().unwrap();
        scripts.insert(path.into(), replies.into());
    }

    pub fn script_resource(&self, resource: SubResource, ticker: &str, replies: Vec<Reply>) {
        self.script(resource.request(ticker).path(), replies);
    }

    /// 6개 서브 리소스 모두 정상 응답.
    pub fn script_full(&self, ticker: &str) {
        for resource in SubResource::ALL {
            self.script_resource(resource, ticker, vec![Ok(fixture(resource, ticker))]);
        }
    }

    pub fn calls_to(&self, path: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.as_str() == path)
            .count()
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UpstreamClient for ScriptedClient {
    async fn get(&self, request: &RequestSpec) -> Result<Value, UpstreamError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let path = request.path();
        self.calls.lock().unwrap().push(path.clone());

        let mut scripts = self.scripts.lock().unwrap();
        match scripts.get_mut(&path) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or_else(|| Ok(json!([]))),
            None => Ok(json!([])),
        }
    }
}

/// 서브 리소스 정상 응답 픽스처.
///
/// 핵심지표에는 `netDebtToEBITDATTM`이 없으므로 해당 필드는 재무제표 파생 계산에 의존합니다.
pub fn fixture(resource: SubResource, ticker: &str) -> Value {
    match resource {
        SubResource::Profile => json!([{
            "symbol": ticker,
            "companyName": format!("{ticker} Holdings"),
            "exchangeShortName": "NYSE",
            "sector": "Industrials",
            "industry": "Machinery",
            "currency": "USD",
            "mktCap": 52000000000i64
        }]),
        SubResource::Quote => json!([{
            "symbol": ticker,
            "price": 120.5,
            "marketCap": 52000000000i64,
            "volume": 3400000,
            "yearHigh": 140.0,
            "yearLow": 95.25,
            "pe": 21.4
        }]),
        SubResource::Ratios => json!([{
            "peRatioTTM": 21.4,
            "priceToBookRatioTTM": 3.2,
            "debtEquityRatioTTM": 0.55,
            "returnOnEquityTTM": 0.18,
            "netProfitMarginTTM": 0.11,
            "currentRatioTTM": 1.4,
            "dividendYieldTTM": 0.021
        }]),
        SubResource::Financials => json!([{
            "date": "2025-12-31",
            "totalDebt": 12000000000i64,
            "cashAndCashEquivalents": 4000000000i64,
            "ebitda": 8000000000i64,
            "totalStockholdersEquity": 21000000000i64,
            "netIncome": 3800000000i64
        }]),
        SubResource::KeyMetrics => json!([{
            "marketCapTTM": 52000000000i64,
            "currentRatioTTM": 1.4
        }]),
        SubResource::Growth => json!([{
            "revenueGrowth": 0.08,
            "epsgrowth": 0.12
        }]),
    }
}

pub fn symbols(tickers: &[&str]) -> Vec<Symbol> {
    tickers
        .iter()
        .map(|t| Symbol::new(*t, "NYSE", format!("{t} Holdings")).unwrap())
        .collect()
}

pub fn controller() -> Arc<RateController> {
    Arc::new(RateController::new(ThrottleConfig::default(), EndpointClassTable::default()).unwrap())
}

/// 플러시가 항상 실패하는 저장소 (체크포인트는 정상).
#[derive(Default)]
pub struct FailingStore {
    inner: MemoryRecordStore,
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn bulk_upsert(&self, _records: &[StockRecord]) -> screener_data::Result<usize> {
        Err(DataError::QueryError("could not extend file: No space left on device".to_string()))
    }

    async fn read_known_symbols(&self) -> screener_data::Result<Vec<KnownRecord>> {
        self.inner.read_known_symbols().await
    }

    async fn read_record(&self, symbol: &str) -> screener_data::Result<Option<StockRecord>> {
        self.inner.read_record(symbol).await
    }

    async fn count_all(&self) -> screener_data::Result<i64> {
        self.inner.count_all().await
    }

    async fn load_checkpoint(&self, workflow: &str) -> screener_data::Result<Option<Checkpoint>> {
        self.inner.load_checkpoint(workflow).await
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> screener_data::Result<()> {
        self.inner.save_checkpoint(checkpoint).await
    }
}

/// 플러시마다 레코드 수를 기록하는 저장소.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemoryRecordStore,
    flushes: Mutex<Vec<usize>>,
}

impl RecordingStore {
    /// 플러시별 레코드 수 (순서대로).
    pub fn flush_sizes(&self) -> Vec<usize> {
        self.flushes.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordStore for RecordingStore {
    async fn bulk_upsert(&self, records: &[StockRecord]) -> screener_data::Result<usize> {
        self.flushes.lock().unwrap().push(records.len());
        self.inner.bulk_upsert(records).await
    }

    async fn read_known_symbols(&self) -> screener_data::Result<Vec<KnownRecord>> {
        self.inner.read_known_symbols().await
    }

    async fn read_record(&self, symbol: &str) -> screener_data::Result<Option<StockRecord>> {
        self.inner.read_record(symbol).await
    }

    async fn count_all(&self) -> screener_data::Result<i64> {
        self.inner.count_all().await
    }

    async fn load_checkpoint(&self, workflow: &str) -> screener_data::Result<Option<Checkpoint>> {
        self.inner.load_checkpoint(workflow).await
    }

    async fn save_checkpoint(&self, checkpoint: &Checkpoint) -> screener_data::Result<()> {
        self.inner.save_checkpoint(checkpoint).await
    }
}
