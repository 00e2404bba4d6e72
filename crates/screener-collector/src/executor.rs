//! Fetch Executor.
//!
//! 단일 논리 요청을 레이트 컨트롤러를 거쳐 발행하고 결과를 분류합니다.
//!
//! - 한도 초과: `report(Throttled)`로 백오프 후 같은 요청을 다시 시도
//! - 전송 오류 / 비정상 상태 / 디코딩 실패: `report(OtherError)` 후 즉시 실패 반환
//! - 성공: `report(Success)` 후 페이로드 반환
//!
//! 재시도는 재귀가 아닌 루프이며, 실행 시간 예산(deadline)과 선택적
//! 최대 재시도 횟수로 끝이 보장됩니다.

use screener_data::{RequestSpec, UpstreamClient, UpstreamError};
use serde_json::Value;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::FetchError;
use crate::throttle::{EndpointClass, Outcome, RateController};

/// Fetch Executor.
#[derive(Clone)]
pub struct FetchExecutor {
    client: Arc<dyn UpstreamClient>,
    controller: Arc<RateController>,
    deadline: Option<Instant>,
    max_throttle_retries: Option<u32>,
}

impl FetchExecutor {
    pub fn new(client: Arc<dyn UpstreamClient>, controller: Arc<RateController>) -> Self {
        Self {
            client,
            controller,
            deadline: None,
            max_throttle_retries: None,
        }
    }

    /// 실행 시간 예산 마감 시각.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// 한도 초과 재시도 횟수 상한 (`None`이면 마감 시각까지 무제한).
    pub fn with_max_retries(mut self, max_throttle_retries: Option<u32>) -> Self {
        self.max_throttle_retries = max_throttle_retries;
        self
    }

    pub fn controller(&self) -> &Arc<RateController> {
        &self.controller
    }

    fn past_deadline(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// 요청 엔드포인트로 클래스를 분류해 실행.
    pub async fn fetch(&self, request: &RequestSpec) -> Result<Value, FetchError> {
        let class = self.controller.classify(&request.endpoint).clone();
        self.execute(&class, request).await
    }

    /// 단일 논리 요청 실행.
    pub async fn execute(
        &self,
        class: &EndpointClass,
        request: &RequestSpec,
    ) -> Result<Value, FetchError> {
        let mut throttled: u32 = 0;

        loop {
            if self.past_deadline() {
                return Err(FetchError::BudgetExhausted);
            }

            // 슬롯 대기 중에도 마감 시각을 넘기지 않음
            match self.deadline {
                Some(deadline) => {
                    tokio::select! {
                        biased;
                        _ = self.controller.acquire(class) => {}
                        _ = tokio::time::sleep_until(deadline) => {
                            debug!(request = %request, "슬롯 대기 중 예산 소진");
                            return Err(FetchError::BudgetExhausted);
                        }
                    }
                }
                None => {
                    self.controller.acquire(class).await;
                }
            }

            match self.client.get(request).await {
                Ok(payload) => {
                    self.controller.report(class, Outcome::Success).await;
                    if throttled > 0 {
                        debug!(request = %request, retries = throttled, "재시도 후 성공");
                    }
                    return Ok(payload);
                }
                Err(UpstreamError::Throttled) => {
                    throttled += 1;
                    warn!(request = %request, attempt = throttled, "한도 초과 응답");

                    match self.deadline {
                        Some(deadline) => {
                            tokio::select! {
                                biased;
                                _ = self.controller.report(class, Outcome::Throttled) => {}
                                _ = tokio::time::sleep_until(deadline) => {
                                    return Err(FetchError::BudgetExhausted);
                                }
                            }
                        }
                        None => self.controller.report(class, Outcome::Throttled).await,
                    }

                    if self.max_throttle_retries.is_some_and(|max| throttled > max) {
                        return Err(FetchError::RetriesExhausted {
                            attempts: throttled,
                        });
                    }
                }
                Err(err) => {
                    self.controller.report(class, Outcome::OtherError).await;
                    debug!(request = %request, error = %err, "요청 실패");
                    return Err(terminal_error(err));
                }
            }
        }
    }
}

/// 재시도하지 않는 업스트림 오류 변환.
fn terminal_error(err: UpstreamError) -> FetchError {
    match err {
        UpstreamError::Status { status, message } => FetchError::Status { status, message },
        UpstreamError::Decode(msg) => FetchError::Decode(msg),
        UpstreamError::Transport(msg) => FetchError::Transport(msg),
        UpstreamError::Throttled => FetchError::RetriesExhausted { attempts: 0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::throttle::{EndpointClassTable, ThrottleConfig};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// 미리 정한 응답을 순서대로 돌려주는 클라이언트.
    struct Sequence {
        responses: Mutex<VecDeque<Result<Value, UpstreamError>>>,
        calls: Mutex<usize>,
    }

    impl Sequence {
        fn new(responses: Vec<Result<Value, UpstreamError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            })
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl UpstreamClient for Sequence {
        async fn get(&self, _request: &RequestSpec) -> Result<Value, UpstreamError> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(UpstreamError::Throttled))
        }
    }

    fn executor(client: Arc<Sequence>) -> FetchExecutor {
        let controller =
            RateController::new(ThrottleConfig::default(), EndpointClassTable::default()).unwrap();
        FetchExecutor::new(client, Arc::new(controller))
    }

    fn request() -> RequestSpec {
        RequestSpec::for_symbol("ratios-ttm", "AAPL")
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_first_try() {
        let client = Sequence::new(vec![Ok(json!([{"peRatioTTM": 20}]))]);
        let exec = executor(client.clone());

        let payload = exec.fetch(&request()).await.unwrap();
        assert_eq!(payload[0]["peRatioTTM"], 20);
        assert_eq!(client.calls(), 1);
        assert_eq!(exec.controller().snapshot().consecutive_successes, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_then_success_retries_same_request() {
        let client = Sequence::new(vec![Err(UpstreamError::Throttled), Ok(json!({"ok": true}))]);
        let exec = executor(client.clone());

        let start = Instant::now();
        let payload = exec.fetch(&request()).await.unwrap();

        assert_eq!(payload["ok"], true);
        assert_eq!(client.calls(), 2);
        assert_eq!(exec.controller().snapshot().backoffs("default"), 1);
        assert_eq!(Instant::now() - start, Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_terminal() {
        let client = Sequence::new(vec![
            Err(UpstreamError::Transport("connection reset".to_string())),
            Ok(json!({})),
        ]);
        let exec = executor(client.clone());

        let err = exec.fetch(&request()).await.unwrap_err();
        assert_eq!(err, FetchError::Transport("connection reset".to_string()));
        assert_eq!(client.calls(), 1);
        assert_eq!(exec.controller().snapshot().total_backoffs(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_error_maps_through() {
        let client = Sequence::new(vec![Err(UpstreamError::Status {
            status: 404,
            message: "not found".to_string(),
        })]);
        let exec = executor(client);

        assert!(matches!(
            exec.fetch(&request()).await,
            Err(FetchError::Status { status: 404, .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_endless_throttle_stops_at_deadline() {
        let client = Sequence::new(vec![]);
        let deadline = Instant::now() + Duration::from_secs(30);
        let exec = executor(client.clone()).with_deadline(deadline);

        let err = exec.fetch(&request()).await.unwrap_err();
        assert_eq!(err, FetchError::BudgetExhausted);
        assert!(Instant::now() <= deadline + Duration::from_millis(1));
        assert!(client.calls() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_bounded_retries() {
        let client = Sequence::new(vec![]);
        let exec = executor(client.clone()).with_max_retries(Some(2));

        let err = exec.fetch(&request()).await.unwrap_err();
        assert_eq!(err, FetchError::RetriesExhausted { attempts: 3 });
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_interrupts_slot_wait() {
        let client = Sequence::new(vec![Ok(json!({})), Ok(json!({}))]);
        let deadline = Instant::now() + Duration::from_secs(5);
        let exec = executor(client.clone()).with_deadline(deadline);
        let class = EndpointClass::new("tight", 1, Duration::from_secs(60), Duration::ZERO);

        let start = Instant::now();
        assert!(exec.execute(&class, &request()).await.is_ok());

        let err = exec.execute(&class, &request()).await.unwrap_err();
        assert_eq!(err, FetchError::BudgetExhausted);
        assert_eq!(Instant::now() - start, Duration::from_secs(5));
        assert_eq!(client.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_deadline_skips_request() {
        let client = Sequence::new(vec![Ok(json!({}))]);
        let exec = executor(client.clone()).with_deadline(Instant::now());

        assert_eq!(exec.fetch(&request()).await, Err(FetchError::BudgetExhausted));
        assert_eq!(client.calls(), 0);
    }
}
