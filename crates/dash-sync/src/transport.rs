//! 전송 계층 추상화.
//!
//! 연결 관리자는 `Connector`로 연결을 열고 `Transport`로 텍스트 프레임을
//! 주고받습니다. 실제 소켓(WebSocket)과 테스트용 시뮬레이션 전송이 같은
//! 인터페이스를 구현합니다.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::{SyncError, SyncResult};

/// 열린 양방향 텍스트 프레임 연결.
///
/// 연결 관리자만 소유합니다.
#[async_trait]
pub trait Transport: Send {
    /// 텍스트 프레임 전송.
    async fn send_text(&mut self, text: String) -> SyncResult<()>;

    /// 다음 텍스트 프레임 수신.
    ///
    /// 원격 종료 시 `None`, 전송 에러 시 `Some(Err)`.
    async fn next_text(&mut self) -> Option<SyncResult<String>>;

    /// 연결 유지용 ping.
    async fn ping(&mut self) -> SyncResult<()> {
        Ok(())
    }

    /// 연결 종료.
    async fn close(&mut self) -> SyncResult<()>;
}

/// 전송 연결 생성기.
#[async_trait]
pub trait Connector: Send + Sync {
    /// 새 연결을 엽니다 (핸드셰이크 포함).
    async fn connect(&self) -> SyncResult<Box<dyn Transport>>;

    /// 로그용 대상 이름.
    fn endpoint(&self) -> &str;
}

// ==================== WebSocket ====================

/// tokio-tungstenite 기반 WebSocket 커넥터.
#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self) -> SyncResult<Box<dyn Transport>> {
        info!("WebSocket 연결 중: {}", self.url);

        let (stream, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| SyncError::Network(format!("WebSocket 연결 실패: {}", e)))?;

        info!("WebSocket 연결 성공: {}", self.url);
        Ok(Box::new(WsTransport { stream }))
    }

    fn endpoint(&self) -> &str {
        &self.url
    }
}

/// 열린 WebSocket 연결.
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl Transport for WsTransport {
    async fn send_text(&mut self, text: String) -> SyncResult<()> {
        self.stream.send(Message::Text(text)).await?;
        Ok(())
    }

    async fn next_text(&mut self) -> Option<SyncResult<String>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Ping(data)) => {
                    debug!("Ping 수신, Pong 응답");
                    if let Err(e) = self.stream.send(Message::Pong(data)).await {
                        return Some(Err(e.into()));
                    }
                }
                Ok(Message::Close(frame)) => {
                    warn!("서버에서 연결 종료 요청: {:?}", frame);
                    return None;
                }
                Ok(Message::Binary(_)) => {
                    debug!("바이너리 프레임 무시");
                }
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
        }
    }

    async fn ping(&mut self) -> SyncResult<()> {
        self.stream.send(Message::Ping(Vec::new())).await?;
        Ok(())
    }

    async fn close(&mut self) -> SyncResult<()> {
        match self.stream.close(None).await {
            Ok(()) => Ok(()),
            Err(tokio_tungstenite::tungstenite::Error::ConnectionClosed)
            | Err(tokio_tungstenite::tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_refused_is_network_error() {
        // 바인딩 후 즉시 닫아서 사용되지 않는 포트 확보
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let connector = WsConnector::new(format!("ws://{}/ws", addr));
        let err = connector.connect().await.err().unwrap();

        assert!(matches!(err, SyncError::Network(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_endpoint() {
        let connector = WsConnector::new("ws://localhost:8080/ws");
        assert_eq!(connector.endpoint(), "ws://localhost:8080/ws");
    }
}
