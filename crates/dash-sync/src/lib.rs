//! 실시간 채널 동기화.
//!
//! 하나의 영속 연결 위에서 여러 데이터 채널을 다중화해 받아
//! `dash_core` 저장소에 반영합니다.
//!
//! # 구성
//!
//! - [`connection`]: 연결 상태 머신, 재연결, 구독 복원
//! - [`registry`]: 희망 구독 집합
//! - [`router`]: 채널 → 도메인 저장소 라우팅
//! - [`envelope`]: 와이어 메시지 타입
//! - [`transport`]: 전송 추상화와 WebSocket 구현
//! - [`simulated`]: 인메모리 전송
//! - [`backfill`]: REST 히스토리 백필
//!
//! # 사용 예
//!
//! ```ignore
//! use std::sync::Arc;
//! use dash_core::AppState;
//! use dash_sync::{SyncClient, SyncOptions, WsConnector};
//!
//! let state = AppState::with_defaults();
//! let client = SyncClient::start(
//!     Arc::new(WsConnector::new("ws://localhost:8080/ws")),
//!     state.clone(),
//!     SyncOptions::default().with_channels(["stock_quotes", "sales"]),
//! );
//!
//! client.subscribe("user_events");
//! // ...
//! client.shutdown().await;
//! ```

pub mod backfill;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod registry;
pub mod router;
pub mod simulated;
pub mod transport;

pub use backfill::{
    backfill_all, BackfillOutcome, BackfillReport, HistoryBatch, HistoryProvider, HistoryQuery,
    RestHistoryClient, TimeRange,
};
pub use connection::{
    ConnectionState, SyncClient, SyncOptions, SyncStats, SyncStatsSnapshot, PING_INTERVAL,
    RECONNECT_DELAY,
};
pub use envelope::{Directive, Envelope};
pub use error::{SyncError, SyncResult};
pub use registry::SubscriptionRegistry;
pub use router::{MessageRouter, RouteError, Routed};
pub use simulated::{SimulatedConnector, SimulatedServer, SimulatedSession};
pub use transport::{Connector, Transport, WsConnector, WsTransport};
