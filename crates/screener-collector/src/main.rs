//! Fundamentals ingestion scheduler CLI.

use clap::{Parser, Subcommand};
use screener_collector::modules::{fetch_universe, parse_symbols};
use screener_collector::stats::log_run;
use screener_collector::{
    CollectorConfig, CollectorError, FetchExecutor, RateController, RunOrchestrator,
};
use screener_core::{init_logging, LogConfig, RunStatus, Symbol, SymbolFilter};
use screener_data::{
    DatabaseConfig, HttpUpstreamClient, MemoryRecordStore, PgRecordStore, RecordStore,
    UpstreamClient,
};
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "screener-collector")]
#[command(about = "Rate-limited fundamentals ingestion scheduler", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// 한 번의 수집 실행
    Run {
        /// 특정 심볼만 수집 (쉼표로 구분, 예: "AAPL,MSFT")
        #[arg(long)]
        symbols: Option<String>,

        /// 인메모리 저장소 사용 (DB에 쓰지 않음)
        #[arg(long)]
        dry_run: bool,
    },

    /// 데몬 모드: 주기적으로 수집 실행
    Daemon,

    /// 저장된 레코드 수 출력
    Count,

    /// 심볼 목록 동기화 (필터 적용 후 종목 수 출력)
    SyncSymbols,
}

/// 실행에 필요한 공유 구성 요소.
struct Runtime {
    store: Arc<dyn RecordStore>,
    client: Arc<dyn UpstreamClient>,
    controller: Arc<RateController>,
}

impl Runtime {
    async fn build(config: &CollectorConfig, dry_run: bool) -> Result<Self, CollectorError> {
        let store: Arc<dyn RecordStore> = if dry_run {
            tracing::info!("dry-run: 인메모리 저장소 사용");
            Arc::new(MemoryRecordStore::new())
        } else {
            Arc::new(connect_store(config).await?)
        };

        let client = HttpUpstreamClient::new(
            config.upstream.base_url.as_str(),
            SecretString::from(config.upstream.api_key.expose_secret().to_owned()),
            config.upstream.timeout(),
        )?;
        let controller = RateController::new(config.throttle.clone(), config.endpoint_classes()?)?;

        Ok(Self {
            store,
            client: Arc::new(client),
            controller: Arc::new(controller),
        })
    }

    fn executor(&self) -> FetchExecutor {
        FetchExecutor::new(Arc::clone(&self.client), Arc::clone(&self.controller))
    }

    fn orchestrator(&self, config: &CollectorConfig) -> RunOrchestrator {
        RunOrchestrator::new(
            Arc::clone(&self.store),
            Arc::clone(&self.client),
            Arc::clone(&self.controller),
            config.run.clone(),
        )
    }

    /// 유니버스 조회 (`--symbols`가 있으면 그 목록).
    async fn universe(
        &self,
        config: &CollectorConfig,
        symbols: Option<&str>,
    ) -> Result<Vec<Symbol>, CollectorError> {
        if let Some(list) = symbols {
            return Ok(parse_symbols(list));
        }
        let filter = SymbolFilter::with_exchanges(&config.symbol_sync.exchanges);
        let (universe, stats) = fetch_universe(&self.executor(), &filter).await?;
        stats.log_summary("심볼 동기화");
        Ok(universe)
    }

    /// 유니버스 조회 후 한 번 실행.
    async fn run_once(
        &self,
        config: &CollectorConfig,
        symbols: Option<&str>,
    ) -> Result<(), CollectorError> {
        let start = Instant::now();
        let universe = self.universe(config, symbols).await?;
        let state = self.orchestrator(config).run(&universe).await;
        log_run(&state, start.elapsed());

        let snapshot = self.controller.snapshot();
        tracing::debug!(
            concurrency = snapshot.concurrency,
            backoff_ms = snapshot.backoff_ms,
            backoffs = snapshot.total_backoffs(),
            "레이트 컨트롤러 상태"
        );

        if state.status == RunStatus::Error {
            return Err(CollectorError::Run(state.last_error.unwrap_or_default()));
        }
        Ok(())
    }
}

async fn connect_store(config: &CollectorConfig) -> Result<PgRecordStore, CollectorError> {
    let url = config.require_database_url()?;
    let store = PgRecordStore::connect(&DatabaseConfig::new(url)).await?;
    store.migrate().await?;
    tracing::info!("데이터베이스 연결 성공");
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 로깅 초기화
    init_logging(LogConfig::new(cli.log_level.as_str()).format_from_env())?;

    tracing::info!("Screener Collector 시작");

    // 설정 로드
    let config = CollectorConfig::from_env()?;
    tracing::debug!(
        base_url = %config.upstream.base_url,
        batch_size = config.run.batch_size,
        budget_secs = config.run.time_budget_secs,
        "설정 로드 완료"
    );

    // 명령 실행
    match cli.command {
        Commands::Run { symbols, dry_run } => {
            let runtime = Runtime::build(&config, dry_run || config.run.dry_run).await?;
            runtime.run_once(&config, symbols.as_deref()).await?;
        }
        Commands::Count => {
            let store = connect_store(&config).await?;
            let count = store.count_all().await?;
            println!("{count}");
        }
        Commands::SyncSymbols => {
            let runtime = Runtime::build(&config, true).await?;
            let universe = runtime.universe(&config, None).await?;
            println!("{}", universe.len());
        }
        Commands::Daemon => {
            tracing::info!(
                "=== 데몬 모드 시작 (주기: {}분) ===",
                config.daemon.interval_minutes
            );

            let runtime = Runtime::build(&config, config.run.dry_run).await?;
            let mut interval = tokio::time::interval(config.daemon.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("종료 신호 수신, 데몬 종료 중...");
                        break;
                    }
                    _ = interval.tick() => {
                        if let Err(e) = runtime.run_once(&config, None).await {
                            tracing::error!("수집 실행 실패: {}", e);
                        }
                        tracing::info!(
                            "=== 실행 완료, 다음 실행: {}분 후 ===",
                            config.daemon.interval_minutes
                        );
                    }
                }
            }
        }
    }

    tracing::info!("Screener Collector 종료");
    Ok(())
}
