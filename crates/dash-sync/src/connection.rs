//! 연결 관리자.
//!
//! 단일 전송 연결을 소유하고 상태 머신을 구동합니다.
//!
//! ```text
//! Disconnected ──▶ Connecting ──▶ Connected
//!      ▲               │              │
//!      └───── 3초 대기 ◀┴──────────────┘
//! ```
//!
//! - 연결 성공 시 희망 구독 집합 전체를 추가 순서대로 재전송합니다.
//! - 전송 에러, 핸드셰이크 실패, 원격 종료는 모두 `Disconnected`로 흡수되며
//!   고정 지연 후 재연결합니다. 재시도 횟수 제한은 없습니다.
//! - `shutdown()`은 진행 중인 연결 시도, 재연결 대기, 수신 루프를 모두 취소하고
//!   열린 연결을 닫습니다.

use parking_lot::Mutex;
use std::future::pending;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use dash_core::{AppState, SyncConfig};

use crate::envelope::Directive;
use crate::registry::SubscriptionRegistry;
use crate::router::{MessageRouter, Routed};
use crate::transport::{Connector, Transport};

/// 연결 끊김 후 재연결까지의 고정 지연.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// 기본 ping 주기.
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// 연결 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// 연결 관리자 옵션.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// 재연결 지연
    pub reconnect_delay: Duration,
    /// ping 주기 (None이면 비활성)
    pub ping_interval: Option<Duration>,
    /// 시작 시 희망 구독 채널
    pub channels: Vec<String>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            reconnect_delay: RECONNECT_DELAY,
            ping_interval: Some(PING_INTERVAL),
            channels: Vec::new(),
        }
    }
}

impl SyncOptions {
    pub fn with_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.channels = channels.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_ping_interval(mut self, period: Option<Duration>) -> Self {
        self.ping_interval = period;
        self
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self::default()
            .with_reconnect_delay(config.reconnect_delay())
            .with_channels(config.channels.iter().cloned())
    }
}

/// 연결 관리자 카운터.
#[derive(Debug, Default)]
pub struct SyncStats {
    connects: AtomicU64,
    connect_failures: AtomicU64,
    disconnects: AtomicU64,
    frames_routed: AtomicU64,
    frames_dropped: AtomicU64,
}

/// `SyncStats` 시점 값.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStatsSnapshot {
    /// 연결 성공 횟수
    pub connects: u64,
    /// 연결 시도 실패 횟수
    pub connect_failures: u64,
    /// 연결된 세션이 끊긴 횟수
    pub disconnects: u64,
    /// 저장소에 반영된 데이터 메시지
    pub frames_routed: u64,
    /// 디코딩 실패로 폐기된 메시지
    pub frames_dropped: u64,
}

impl SyncStats {
    pub fn snapshot(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            connects: self.connects.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            frames_routed: self.frames_routed.load(Ordering::Relaxed),
            frames_dropped: self.frames_dropped.load(Ordering::Relaxed),
        }
    }

    fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl SyncStatsSnapshot {
    /// 요약 로그 출력.
    pub fn log_summary(&self, operation: &str) {
        info!(
            operation = operation,
            connects = self.connects,
            connect_failures = self.connect_failures,
            disconnects = self.disconnects,
            frames_routed = self.frames_routed,
            frames_dropped = self.frames_dropped,
            "동기화 통계"
        );
    }
}

/// 핸들과 백그라운드 태스크가 공유하는 상태.
///
/// 레지스트리 잠금 안에서 연결 상태를 바꾸고 지시를 큐에 넣기 때문에
/// 재전송 스냅샷과 즉시 전송 지시가 겹치거나 빠지지 않습니다.
struct Shared {
    registry: Mutex<SubscriptionRegistry>,
    state: watch::Sender<ConnectionState>,
    connected: watch::Sender<bool>,
    directives: mpsc::UnboundedSender<Directive>,
    stats: SyncStats,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
        self.connected
            .send_replace(state == ConnectionState::Connected);
    }

    fn current(&self) -> ConnectionState {
        *self.state.borrow()
    }
}

/// 실시간 동기화 클라이언트 핸들.
///
/// `start`로 백그라운드 태스크를 띄우고, 핸들을 통해 구독을 변경하거나
/// 연결 상태를 관찰합니다. 핸들을 drop하면 태스크도 취소됩니다.
pub struct SyncClient {
    shared: Arc<Shared>,
    app_state: AppState,
    shutdown: CancellationToken,
    task: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl SyncClient {
    /// 연결 관리자 태스크를 시작합니다.
    ///
    /// tokio 런타임 안에서 호출해야 합니다.
    pub fn start(connector: Arc<dyn Connector>, app_state: AppState, options: SyncOptions) -> Self {
        let (directives_tx, directives_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        let (connected_tx, _) = watch::channel(false);

        let registry: SubscriptionRegistry = options.channels.iter().cloned().collect();

        let shared = Arc::new(Shared {
            registry: Mutex::new(registry),
            state: state_tx,
            connected: connected_tx,
            directives: directives_tx,
            stats: SyncStats::default(),
        });
        let shutdown = CancellationToken::new();

        let worker = Worker {
            connector,
            router: MessageRouter::new(app_state.clone()),
            shared: Arc::clone(&shared),
            directives: directives_rx,
            reconnect_delay: options.reconnect_delay,
            ping_interval: options.ping_interval,
            shutdown: shutdown.clone(),
        };
        let task = tokio::spawn(worker.run());

        Self {
            shared,
            app_state,
            shutdown,
            task: tokio::sync::Mutex::new(Some(task)),
        }
    }

    /// 채널을 구독합니다.
    ///
    /// 희망 집합에 추가하고, 연결 중이면 이미 있던 채널이라도 구독 지시를
    /// 즉시 보냅니다. 새로 추가되었으면 `true`.
    pub fn subscribe(&self, channel: impl Into<String>) -> bool {
        let channel = channel.into();
        let mut registry = self.shared.registry.lock();
        let added = registry.insert(channel.clone());

        if self.shared.current() == ConnectionState::Connected {
            let _ = self.shared.directives.send(Directive::subscribe(channel));
        } else {
            debug!(channel = %channel, "연결 전 구독 등록, 연결 시 전송");
        }
        added
    }

    /// 채널 구독을 해제합니다.
    ///
    /// 희망 집합에 있던 채널이면 `true`.
    pub fn unsubscribe(&self, channel: &str) -> bool {
        let mut registry = self.shared.registry.lock();
        let removed = registry.remove(channel);

        if self.shared.current() == ConnectionState::Connected {
            let _ = self.shared.directives.send(Directive::unsubscribe(channel));
        }
        removed
    }

    /// 현재 연결 상태.
    pub fn state(&self) -> ConnectionState {
        self.shared.current()
    }

    pub fn is_connected(&self) -> bool {
        *self.shared.connected.borrow()
    }

    /// 연결 상태 관찰자.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    /// 연결 여부 관찰자. `Connected` 상태일 때만 true.
    pub fn watch_connected(&self) -> watch::Receiver<bool> {
        self.shared.connected.subscribe()
    }

    /// 희망 구독 채널 (추가 순서).
    pub fn desired_channels(&self) -> Vec<String> {
        self.shared.registry.lock().channels()
    }

    pub fn stats(&self) -> SyncStatsSnapshot {
        self.shared.stats.snapshot()
    }

    /// 라우터가 쓰는 애플리케이션 상태.
    pub fn app_state(&self) -> &AppState {
        &self.app_state
    }

    /// 태스크를 종료하고 완료될 때까지 기다립니다.
    ///
    /// 여러 번 호출해도 안전합니다.
    pub async fn shutdown(&self) {
        self.shutdown.cancel();

        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!("동기화 태스크 종료 에러: {}", e);
            }
        }
    }

    /// 종료 요청 여부.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Drop for SyncClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// ==================== 백그라운드 태스크 ====================

/// 세션 종료 사유.
enum SessionEnd {
    Shutdown,
    Lost(String),
}

struct Worker {
    connector: Arc<dyn Connector>,
    router: MessageRouter,
    shared: Arc<Shared>,
    directives: mpsc::UnboundedReceiver<Directive>,
    reconnect_delay: Duration,
    ping_interval: Option<Duration>,
    shutdown: CancellationToken,
}

impl Worker {
    async fn run(mut self) {
        let endpoint = self.connector.endpoint().to_string();
        info!(endpoint = %endpoint, "동기화 시작");

        loop {
            self.shared.set_state(ConnectionState::Connecting);

            let connected = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                result = self.connector.connect() => result,
            };

            match connected {
                Ok(transport) => match self.drive(transport).await {
                    SessionEnd::Shutdown => break,
                    SessionEnd::Lost(reason) => {
                        SyncStats::incr(&self.shared.stats.disconnects);
                        warn!(endpoint = %endpoint, reason = %reason, "연결 끊김");
                    }
                },
                Err(e) => {
                    SyncStats::incr(&self.shared.stats.connect_failures);
                    warn!(endpoint = %endpoint, error = %e, "연결 실패");
                }
            }

            self.shared.set_state(ConnectionState::Disconnected);
            info!(
                delay_ms = self.reconnect_delay.as_millis() as u64,
                "재연결 예약"
            );

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = sleep(self.reconnect_delay) => {}
            }
        }

        self.shared.set_state(ConnectionState::Disconnected);
        info!(endpoint = %endpoint, "동기화 종료");
    }

    /// 연결된 세션 하나를 끝날 때까지 처리합니다.
    async fn drive(&mut self, mut transport: Box<dyn Transport>) -> SessionEnd {
        let replay = {
            let registry = self.shared.registry.lock();
            // 연결 전에 쌓인 지시는 재전송 스냅샷에 이미 반영됨
            while self.directives.try_recv().is_ok() {}
            self.shared.set_state(ConnectionState::Connected);
            registry.replay()
        };
        SyncStats::incr(&self.shared.stats.connects);
        info!(channels = replay.len(), "연결됨, 구독 복원");

        for directive in replay {
            if let Err(e) = transport.send_text(directive.to_json()).await {
                return SessionEnd::Lost(format!("구독 복원 실패: {}", e));
            }
            debug!(channel = %directive.channel(), "구독 복원");
        }

        let mut ping = self.ping_interval.map(|period| {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    if let Err(e) = transport.close().await {
                        debug!("연결 종료 중 에러: {}", e);
                    }
                    return SessionEnd::Shutdown;
                }
                frame = transport.next_text() => match frame {
                    Some(Ok(text)) => self.handle_frame(&text),
                    Some(Err(e)) => return SessionEnd::Lost(e.to_string()),
                    None => return SessionEnd::Lost("원격 종료".to_string()),
                },
                Some(directive) = self.directives.recv() => {
                    if let Err(e) = transport.send_text(directive.to_json()).await {
                        return SessionEnd::Lost(format!("지시 전송 실패: {}", e));
                    }
                    debug!(directive = ?directive, "지시 전송");
                }
                _ = tick(&mut ping) => {
                    if let Err(e) = transport.ping().await {
                        return SessionEnd::Lost(format!("Ping 전송 실패: {}", e));
                    }
                }
            }
        }
    }

    fn handle_frame(&self, text: &str) {
        match self.router.route_text(text) {
            Ok(Routed::Stored(domain)) => {
                SyncStats::incr(&self.shared.stats.frames_routed);
                trace!(domain = %domain, "레코드 저장");
            }
            Ok(_) => {}
            Err(e) => {
                SyncStats::incr(&self.shared.stats.frames_dropped);
                warn!(error = %e, "메시지 폐기");
            }
        }
    }
}

async fn tick(ping: &mut Option<Interval>) {
    match ping {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => pending::<()>().await,
    }
}
