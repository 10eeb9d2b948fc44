//! 실시간 수신 명령.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use dash_core::{AppConfig, AppState, Domain};
use dash_sync::{SyncClient, SyncOptions, WsConnector};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use super::backfill::{build_query, load_history};
use super::summary::StoreSummary;

/// 수신 명령 인자.
#[derive(Debug, Clone)]
pub struct WatchArgs {
    /// 구독 채널 (비어 있으면 설정값)
    pub channels: Vec<String>,
    /// WebSocket URL (없으면 설정값)
    pub url: Option<String>,
    /// 요약 출력 주기 (초)
    pub summary_secs: u64,
    /// 연결 전 백필 범위 (시간)
    pub backfill_hours: Option<i64>,
}

/// 인자와 설정으로 연결 옵션을 만듭니다.
pub fn build_options(config: &AppConfig, args: &WatchArgs) -> SyncOptions {
    let options = SyncOptions::from(&config.sync);
    if args.channels.is_empty() {
        return options;
    }

    for channel in &args.channels {
        if Domain::from_channel(channel).is_none() {
            warn!(channel = %channel, "알 수 없는 채널, 서버 데이터는 무시됩니다");
        }
    }
    options.with_channels(args.channels.iter().cloned())
}

/// `watch` 명령 실행.
pub async fn run_watch(config: &AppConfig, args: WatchArgs) -> Result<()> {
    let state = AppState::new(&config.store);

    if let Some(hours) = args.backfill_hours {
        let query = build_query(Some(hours), None, None)?;
        load_history(config, &state, &query).await?;
    }

    let url = args.url.clone().unwrap_or_else(|| config.sync.ws_url.clone());
    let options = build_options(config, &args);
    info!(url = %url, channels = ?options.channels, "실시간 수신 시작");

    let client = SyncClient::start(Arc::new(WsConnector::new(url)), state.clone(), options);
    let mut connected = client.watch_connected();

    let mut summary = tokio::time::interval(Duration::from_secs(args.summary_secs.max(1)));
    summary.set_missed_tick_behavior(MissedTickBehavior::Skip);
    summary.tick().await;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("종료 신호 수신, 연결 종료 중...");
                break;
            }
            changed = connected.changed() => {
                if changed.is_err() {
                    break;
                }
                let is_connected = *connected.borrow_and_update();
                if is_connected {
                    info!("연결됨");
                } else {
                    warn!("연결 끊김, 재연결 대기");
                }
            }
            _ = summary.tick() => {
                StoreSummary::collect(&state).log();
                client.stats().log_summary("watch");
            }
        }
    }

    client.shutdown().await;
    StoreSummary::collect(&state).log();
    client.stats().log_summary("watch");
    Ok(())
}
