//! 인메모리 시뮬레이션 전송.
//!
//! 실제 소켓 없이 연결 관리자를 구동합니다. 연결 시도마다 서버 쪽
//! `SimulatedSession`이 `SimulatedServer`로 전달되어, 테스트가 클라이언트가
//! 보낸 지시를 확인하고 프레임을 주입하거나 연결을 끊을 수 있습니다.
//!
//! ```ignore
//! let (connector, mut server) = SimulatedConnector::new();
//! let client = SyncClient::start(Arc::new(connector), state, options);
//! let mut session = server.next_session().await.unwrap();
//! session.push(r#"{"type":"subscribed","channel":"sales"}"#);
//! session.disconnect();
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::error::{SyncError, SyncResult};
use crate::transport::{Connector, Transport};

const SIMULATED_ENDPOINT: &str = "sim://local";

/// 시뮬레이션 커넥터.
pub struct SimulatedConnector {
    /// true면 연결 시도를 거부
    refusing: AtomicBool,
    /// 시도 횟수
    attempts: watch::Sender<usize>,
    /// 시도 시각 기록
    attempt_log: Mutex<Vec<Instant>>,
    /// 새 세션 전달
    sessions: mpsc::UnboundedSender<SimulatedSession>,
}

/// 서버 쪽 세션 수신기.
pub struct SimulatedServer {
    sessions: mpsc::UnboundedReceiver<SimulatedSession>,
}

impl SimulatedConnector {
    /// 커넥터와 서버 쪽 수신기를 생성합니다.
    pub fn new() -> (Self, SimulatedServer) {
        let (sessions_tx, sessions_rx) = mpsc::unbounded_channel();
        let (attempts, _) = watch::channel(0);
        (
            Self {
                refusing: AtomicBool::new(false),
                attempts,
                attempt_log: Mutex::new(Vec::new()),
                sessions: sessions_tx,
            },
            SimulatedServer {
                sessions: sessions_rx,
            },
        )
    }

    /// 이후 연결 시도를 거부할지 설정합니다.
    pub fn set_refusing(&self, refusing: bool) {
        self.refusing.store(refusing, Ordering::SeqCst);
    }

    /// 지금까지의 연결 시도 횟수.
    pub fn attempts(&self) -> usize {
        *self.attempts.borrow()
    }

    /// 연결 시도 시각 목록.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempt_log.lock().clone()
    }

    /// 시도 횟수가 `count` 이상이 될 때까지 대기합니다.
    pub async fn wait_for_attempts(&self, count: usize) {
        let mut rx = self.attempts.subscribe();
        let _ = rx.wait_for(|n| *n >= count).await;
    }
}

#[async_trait]
impl Connector for SimulatedConnector {
    async fn connect(&self) -> SyncResult<Box<dyn Transport>> {
        self.attempt_log.lock().push(Instant::now());
        self.attempts.send_modify(|n| *n += 1);

        if self.refusing.load(Ordering::SeqCst) {
            return Err(SyncError::Network("connection refused".to_string()));
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let session = SimulatedSession {
            sent: outbound_rx,
            inbound: Some(inbound_tx),
        };
        self.sessions
            .send(session)
            .map_err(|_| SyncError::Network("simulated server dropped".to_string()))?;

        Ok(Box::new(SimulatedTransport {
            outbound: outbound_tx,
            inbound: inbound_rx,
        }))
    }

    fn endpoint(&self) -> &str {
        SIMULATED_ENDPOINT
    }
}

impl SimulatedServer {
    /// 다음으로 수립된 세션.
    pub async fn next_session(&mut self) -> Option<SimulatedSession> {
        self.sessions.recv().await
    }

    /// 대기 없이 세션 하나를 꺼냅니다.
    pub fn try_next_session(&mut self) -> Option<SimulatedSession> {
        self.sessions.try_recv().ok()
    }
}

/// 한 연결의 서버 쪽 끝.
pub struct SimulatedSession {
    sent: mpsc::UnboundedReceiver<String>,
    inbound: Option<mpsc::UnboundedSender<SyncResult<String>>>,
}

impl SimulatedSession {
    /// 클라이언트가 보낸 다음 프레임. 클라이언트가 연결을 닫으면 `None`.
    pub async fn recv(&mut self) -> Option<String> {
        self.sent.recv().await
    }

    /// 지금까지 도착한 프레임을 모두 꺼냅니다.
    pub fn drain_sent(&mut self) -> Vec<String> {
        let mut frames = Vec::new();
        while let Ok(frame) = self.sent.try_recv() {
            frames.push(frame);
        }
        frames
    }

    /// 클라이언트가 보낸 프레임을 JSON으로 파싱해 꺼냅니다.
    pub fn drain_sent_json(&mut self) -> Vec<Value> {
        self.drain_sent()
            .iter()
            .filter_map(|f| serde_json::from_str(f).ok())
            .collect()
    }

    /// 텍스트 프레임을 클라이언트로 보냅니다.
    pub fn push(&self, text: impl Into<String>) -> bool {
        match &self.inbound {
            Some(tx) => tx.send(Ok(text.into())).is_ok(),
            None => false,
        }
    }

    /// `data` 메시지를 보냅니다.
    pub fn push_data(&self, channel: &str, data: Value) -> bool {
        self.push(json!({"type": "data", "channel": channel, "data": data}).to_string())
    }

    /// 전송 에러를 주입합니다. 이후 세션은 끊긴 것으로 취급됩니다.
    pub fn fail(&mut self, reason: &str) {
        if let Some(tx) = self.inbound.take() {
            let _ = tx.send(Err(SyncError::Network(reason.to_string())));
        }
    }

    /// 원격 종료.
    pub fn disconnect(mut self) {
        self.inbound.take();
    }

    /// 클라이언트가 전송 쪽을 닫았는지 여부.
    pub fn is_client_closed(&self) -> bool {
        self.sent.is_closed()
    }
}

struct SimulatedTransport {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<SyncResult<String>>,
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn send_text(&mut self, text: String) -> SyncResult<()> {
        self.outbound
            .send(text)
            .map_err(|_| SyncError::Disconnected("simulated peer gone".to_string()))
    }

    async fn next_text(&mut self) -> Option<SyncResult<String>> {
        self.inbound.recv().await
    }

    async fn close(&mut self) -> SyncResult<()> {
        self.inbound.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_session_round_trip() {
        let (connector, mut server) = SimulatedConnector::new();

        let mut transport = connector.connect().await.unwrap();
        let mut session = server.next_session().await.unwrap();

        transport.send_text("hello".to_string()).await.unwrap();
        assert_eq!(session.recv().await.as_deref(), Some("hello"));

        assert!(session.push("world"));
        assert_eq!(transport.next_text().await.unwrap().unwrap(), "world");

        session.disconnect();
        assert!(transport.next_text().await.is_none());
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_refusing() {
        let (connector, mut server) = SimulatedConnector::new();
        connector.set_refusing(true);

        assert!(connector.connect().await.is_err());
        assert_eq!(connector.attempts(), 1);
        assert!(server.try_next_session().is_none());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let (connector, mut server) = SimulatedConnector::new();
        let mut transport = connector.connect().await.unwrap();
        let mut session = server.next_session().await.unwrap();

        session.fail("reset by peer");
        assert!(matches!(transport.next_text().await, Some(Err(SyncError::Network(_)))));
        assert!(transport.next_text().await.is_none());
    }
}
