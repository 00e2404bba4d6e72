//! 레이트 컨트롤러.
//!
//! 엔드포인트 클래스별 요청 윈도우/간격과 전역 적응형 동시성·백오프 상태를
//! 단독으로 소유합니다. 다른 컴포넌트는 `acquire` / `report`로만 상태를 바꿉니다.
//!
//! # 예약 방식 대기
//!
//! `acquire`는 잠금 안에서 요청 발행 시각을 예약하고, 잠금을 푼 뒤 그 시각까지
//! 대기합니다. 동시에 들어온 요청도 순서대로 서로 다른 슬롯을 받으므로
//! 한도를 넘지 않으며 요청이 버려지지 않습니다.
//!
//! # 적응형 동시성
//!
//! ```text
//! success × success_threshold  → concurrency += step (≤ max)
//! throttled × throttle_threshold → concurrency -= step (≥ min)
//! throttled                     → backoff *= factor (≤ max), 이후 backoff만큼 sleep
//! ```
//!
//! 백오프는 성공으로 줄어들지 않고 [`RateController::reload`]로만 초기화됩니다.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::endpoint::{EndpointClass, EndpointClassTable};
use crate::error::{CollectorError, Result};

/// 적응형 동시성/백오프 설정.
#[derive(Debug, Clone, PartialEq)]
pub struct ThrottleConfig {
    pub initial_concurrency: usize,
    pub min_concurrency: usize,
    pub max_concurrency: usize,
    /// 동시성 증감 단위
    pub concurrency_step: usize,
    /// 동시성 증가에 필요한 연속 성공 수
    pub success_threshold: u32,
    /// 동시성 감소에 필요한 연속 한도 초과 수
    pub throttle_threshold: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    /// 한도 초과마다 곱하는 배수
    pub backoff_factor: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            initial_concurrency: 5,
            min_concurrency: 1,
            max_concurrency: 20,
            concurrency_step: 1,
            success_threshold: 20,
            throttle_threshold: 3,
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_millis(60_000),
            backoff_factor: 2.0,
        }
    }
}

impl ThrottleConfig {
    /// 설정 검증.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(CollectorError::Config(msg));

        if self.min_concurrency == 0 {
            return fail("min_concurrency는 1 이상이어야 합니다".to_string());
        }
        if self.min_concurrency > self.max_concurrency {
            return fail(format!(
                "min_concurrency({}) > max_concurrency({})",
                self.min_concurrency, self.max_concurrency
            ));
        }
        if !(self.min_concurrency..=self.max_concurrency).contains(&self.initial_concurrency) {
            return fail(format!(
                "initial_concurrency({})가 [{}, {}] 범위 밖입니다",
                self.initial_concurrency, self.min_concurrency, self.max_concurrency
            ));
        }
        if self.concurrency_step == 0 {
            return fail("concurrency_step은 1 이상이어야 합니다".to_string());
        }
        if self.success_threshold == 0 || self.throttle_threshold == 0 {
            return fail("임계치는 1 이상이어야 합니다".to_string());
        }
        if self.initial_backoff > self.max_backoff {
            return fail(format!(
                "initial_backoff({:?}) > max_backoff({:?})",
                self.initial_backoff, self.max_backoff
            ));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 1.0 {
            return fail(format!("backoff_factor({})는 1 이상이어야 합니다", self.backoff_factor));
        }
        Ok(())
    }

    fn clamp_concurrency(&self, value: usize) -> usize {
        value.clamp(self.min_concurrency, self.max_concurrency)
    }

    fn next_backoff(&self, current: Duration) -> Duration {
        let scaled = current.as_secs_f64() * self.backoff_factor;
        if scaled >= self.max_backoff.as_secs_f64() {
            self.max_backoff
        } else {
            Duration::from_secs_f64(scaled).clamp(self.initial_backoff, self.max_backoff)
        }
    }
}

/// 요청 결과.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Throttled,
    /// 한도 초과 이외의 실패 (상태 조정 없음)
    OtherError,
}

/// 요청 허가.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    /// 클래스 이름
    pub class: String,
    /// 허가까지 대기한 시간
    pub waited: Duration,
}

/// 엔드포인트 클래스별 상태.
#[derive(Debug, Clone)]
struct EndpointState {
    requests_in_window: u32,
    window_start: Instant,
    last_request: Option<Instant>,
    grants: u64,
    backoffs: u64,
}

impl EndpointState {
    fn new(now: Instant) -> Self {
        Self {
            requests_in_window: 0,
            window_start: now,
            last_request: None,
            grants: 0,
            backoffs: 0,
        }
    }

    /// 다음 요청 슬롯을 예약하고 `now` 기준 대기 시간을 반환.
    fn reserve(&mut self, class: &EndpointClass, now: Instant) -> Duration {
        let mut at = now;

        if let Some(last) = self.last_request {
            at = at.max(last + class.min_spacing);
        }

        // 경계 포함: 경과 시간이 정확히 window이면 이미 새 윈도우
        if at.duration_since(self.window_start) >= class.window {
            self.window_start = at;
            self.requests_in_window = 0;
        }

        if self.requests_in_window >= class.max_requests_per_window {
            at = at.max(self.window_start + class.window);
            self.window_start = at;
            self.requests_in_window = 0;
        }

        self.requests_in_window += 1;
        self.last_request = Some(at);
        self.grants += 1;

        at.saturating_duration_since(now)
    }
}

/// 전역 스로틀 상태.
#[derive(Debug, Clone)]
struct GlobalThrottleState {
    concurrency: usize,
    backoff: Duration,
    consecutive_successes: u32,
    consecutive_throttles: u32,
}

impl GlobalThrottleState {
    fn from_config(config: &ThrottleConfig) -> Self {
        Self {
            concurrency: config.clamp_concurrency(config.initial_concurrency),
            backoff: config.initial_backoff,
            consecutive_successes: 0,
            consecutive_throttles: 0,
        }
    }
}

#[derive(Debug)]
struct Inner {
    config: ThrottleConfig,
    global: GlobalThrottleState,
    endpoints: HashMap<String, EndpointState>,
}

/// 엔드포인트 클래스별 관측 값.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EndpointSnapshot {
    pub grants: u64,
    pub backoffs: u64,
    pub requests_in_window: u32,
}

/// 컨트롤러 관측 스냅샷.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControllerSnapshot {
    pub concurrency: usize,
    pub backoff_ms: u64,
    pub consecutive_successes: u32,
    pub consecutive_throttles: u32,
    pub endpoints: BTreeMap<String, EndpointSnapshot>,
}

impl ControllerSnapshot {
    /// 특정 클래스의 백오프 횟수.
    pub fn backoffs(&self, class: &str) -> u64 {
        self.endpoints.get(class).map_or(0, |e| e.backoffs)
    }

    /// 특정 클래스의 허가 횟수.
    pub fn grants(&self, class: &str) -> u64 {
        self.endpoints.get(class).map_or(0, |e| e.grants)
    }

    /// 전체 백오프 횟수.
    pub fn total_backoffs(&self) -> u64 {
        self.endpoints.values().map(|e| e.backoffs).sum()
    }
}

/// 레이트 컨트롤러.
#[derive(Debug)]
pub struct RateController {
    classes: EndpointClassTable,
    inner: Mutex<Inner>,
}

impl RateController {
    /// 새 컨트롤러 생성.
    pub fn new(config: ThrottleConfig, classes: EndpointClassTable) -> Result<Self> {
        config.validate()?;
        classes.validate()?;

        Ok(Self {
            classes,
            inner: Mutex::new(Inner {
                global: GlobalThrottleState::from_config(&config),
                config,
                endpoints: HashMap::new(),
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("RateController mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// 엔드포인트 분류.
    pub fn classify(&self, endpoint: &str) -> &EndpointClass {
        self.classes.classify(endpoint)
    }

    /// 요청 허가. 윈도우/간격 제한에 걸리면 필요한 만큼 대기합니다.
    pub async fn acquire(&self, class: &EndpointClass) -> Grant {
        let delay = {
            let mut inner = self.lock();
            let now = Instant::now();
            inner
                .endpoints
                .entry(class.name.clone())
                .or_insert_with(|| EndpointState::new(now))
                .reserve(class, now)
        };

        if !delay.is_zero() {
            debug!(
                class = %class.name,
                delay_ms = delay.as_millis() as u64,
                "요청 슬롯 대기"
            );
            tokio::time::sleep(delay).await;
        }

        Grant {
            class: class.name.clone(),
            waited: delay,
        }
    }

    /// 요청 결과 보고.
    ///
    /// `Throttled`이면 증가된 백오프만큼 대기한 뒤 반환합니다.
    pub async fn report(&self, class: &EndpointClass, outcome: Outcome) {
        if let Some(backoff) = self.record(class, outcome) {
            tokio::time::sleep(backoff).await;
        }
    }

    /// 상태 갱신 (대기 없음). 한도 초과면 대기해야 할 백오프를 반환.
    fn record(&self, class: &EndpointClass, outcome: Outcome) -> Option<Duration> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let config = &inner.config;
        let global = &mut inner.global;

        match outcome {
            Outcome::Success => {
                global.consecutive_throttles = 0;
                global.consecutive_successes += 1;

                if global.consecutive_successes >= config.success_threshold {
                    global.consecutive_successes = 0;
                    let next = config.clamp_concurrency(global.concurrency + config.concurrency_step);
                    if next != global.concurrency {
                        info!(from = global.concurrency, to = next, "동시성 증가");
                        global.concurrency = next;
                    }
                }
                None
            }
            Outcome::Throttled => {
                global.consecutive_successes = 0;
                global.consecutive_throttles += 1;

                if global.consecutive_throttles >= config.throttle_threshold {
                    global.consecutive_throttles = 0;
                    let next = config.clamp_concurrency(
                        global.concurrency.saturating_sub(config.concurrency_step),
                    );
                    if next != global.concurrency {
                        warn!(from = global.concurrency, to = next, "동시성 감소");
                        global.concurrency = next;
                    }
                }

                global.backoff = config.next_backoff(global.backoff);
                let backoff = global.backoff;

                let now = Instant::now();
                inner
                    .endpoints
                    .entry(class.name.clone())
                    .or_insert_with(|| EndpointState::new(now))
                    .backoffs += 1;

                warn!(
                    class = %class.name,
                    backoff_ms = backoff.as_millis() as u64,
                    "한도 초과, 백오프"
                );
                Some(backoff)
            }
            Outcome::OtherError => {
                debug!(class = %class.name, "요청 실패 (상태 조정 없음)");
                None
            }
        }
    }

    /// 현재 동시성.
    pub fn current_concurrency(&self) -> usize {
        self.lock().global.concurrency
    }

    /// 현재 백오프.
    pub fn current_backoff(&self) -> Duration {
        self.lock().global.backoff
    }

    /// 설정 재적용. 동시성은 새 범위로 clamp, 백오프와 연속 카운터는 초기화.
    pub fn reload(&self, config: ThrottleConfig) -> Result<()> {
        config.validate()?;

        let mut inner = self.lock();
        let concurrency = config.clamp_concurrency(inner.global.concurrency);
        inner.global = GlobalThrottleState {
            concurrency,
            ..GlobalThrottleState::from_config(&config)
        };
        inner.config = config;

        info!(concurrency, "스로틀 설정 재적용");
        Ok(())
    }

    /// 관측 스냅샷.
    pub fn snapshot(&self) -> ControllerSnapshot {
        let inner = self.lock();
        ControllerSnapshot {
            concurrency: inner.global.concurrency,
            backoff_ms: inner.global.backoff.as_millis() as u64,
            consecutive_successes: inner.global.consecutive_successes,
            consecutive_throttles: inner.global.consecutive_throttles,
            endpoints: inner
                .endpoints
                .iter()
                .map(|(name, state)| {
                    (
                        name.clone(),
                        EndpointSnapshot {
                            grants: state.grants,
                            backoffs: state.backoffs,
                            requests_in_window: state.requests_in_window,
                        },
                    )
                })
                .collect(),
        }
    }
}
