//! 실시간 대시보드 동기화 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 전체 채널 구독 후 30초마다 저장소 요약 출력
//! dashsync watch
//!
//! # 특정 채널만, 시작 전에 최근 24시간 백필
//! dashsync watch -c stock_quotes,sales --backfill-hours 24
//!
//! # REST 히스토리만 조회해서 요약 출력
//! dashsync backfill --hours 6 --symbol AAPL --format json
//!
//! # 지역/부서 필터
//! dashsync backfill --hours 24 --region EU --department Ops
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use dash_core::logging::{init_logging, LogConfig};
use dash_core::AppConfig;
use tracing::info;

mod commands;

use commands::backfill::{run_backfill, BackfillArgs};
use commands::summary::OutputFormat;
use commands::watch::{run_watch, WatchArgs};

#[derive(Parser)]
#[command(name = "dashsync")]
#[command(about = "Real-time dashboard sync client", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 설정 파일 경로 (기본: config/dashsync.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// 채널 구독 후 Ctrl-C까지 실시간 수신
    Watch {
        /// 구독 채널 (쉼표로 구분, 기본: 설정값)
        #[arg(short, long, value_delimiter = ',')]
        channels: Vec<String>,

        /// WebSocket URL (기본: 설정값)
        #[arg(long)]
        url: Option<String>,

        /// 요약 출력 주기 (초)
        #[arg(long, default_value = "30")]
        summary_secs: u64,

        /// 연결 전 최근 N시간 백필
        #[arg(long)]
        backfill_hours: Option<i64>,
    },

    /// REST API에서 과거 데이터 로드
    Backfill {
        /// 최근 N시간 범위 (없으면 서버 기본값)
        #[arg(long)]
        hours: Option<i64>,

        /// 시세 심볼
        #[arg(short, long)]
        symbol: Option<String>,

        /// 최대 건수
        #[arg(short, long)]
        limit: Option<u32>,

        /// 판매 카테고리 (범위 조회)
        #[arg(long)]
        category: Option<String>,

        /// 판매 지역 (범위 조회)
        #[arg(long)]
        region: Option<String>,

        /// 이벤트 유형
        #[arg(long)]
        event_type: Option<String>,

        /// 지표 유형
        #[arg(long)]
        metric_type: Option<String>,

        /// 지표 부서
        #[arg(long)]
        department: Option<String>,

        /// 출력 형식 (table, json)
        #[arg(short, long, default_value = "table")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let path = cli
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config/dashsync.toml"));
    let mut config = AppConfig::load(Some(&path))
        .with_context(|| format!("설정 로드 실패: {}", path.display()))?;

    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(format) = cli.log_format {
        config.logging.format = format;
    }
    init_logging(LogConfig::from(&config.logging)).map_err(|e| anyhow!("로깅 초기화 실패: {}", e))?;

    info!("dashsync 시작");

    match cli.command {
        Commands::Watch {
            channels,
            url,
            summary_secs,
            backfill_hours,
        } => {
            let args = WatchArgs {
                channels,
                url,
                summary_secs,
                backfill_hours,
            };
            run_watch(&config, args).await?;
        }
        Commands::Backfill {
            hours,
            symbol,
            limit,
            category,
            region,
            event_type,
            metric_type,
            department,
            format,
        } => {
            let args = BackfillArgs {
                hours,
                symbol,
                limit,
                category,
                region,
                event_type,
                metric_type,
                department,
                format: OutputFormat::parse(&format)?,
            };
            run_backfill(&config, args).await?;
        }
    }

    info!("dashsync 종료");
    Ok(())
}
