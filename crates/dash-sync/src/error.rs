//! 동기화 계층 에러 타입.

use thiserror::Error;

/// 전송/백필 관련 에러.
///
/// 연결 관리자 내부에서만 사용되며 호출자에게 전파되지 않습니다.
/// 연결 상태 변화(Disconnected)와 재연결 예약으로 흡수됩니다.
#[derive(Debug, Error)]
pub enum SyncError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 원격 종료 또는 스트림 종료
    #[error("Disconnected: {0}")]
    Disconnected(String),

    /// WebSocket 프로토콜 에러
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// 파싱/역직렬화 에러
    #[error("Parse error: {0}")]
    Parse(String),

    /// HTTP 상태 에러
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),
}

/// 동기화 작업을 위한 Result 타입.
pub type SyncResult<T> = Result<T, SyncError>;

impl SyncError {
    /// 재시도 가능한 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Network(_)
            | SyncError::Disconnected(_)
            | SyncError::WebSocket(_)
            | SyncError::Timeout(_) => true,
            SyncError::Http { status, .. } => *status >= 500 || *status == 429,
            SyncError::Parse(_) => false,
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for SyncError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => {
                SyncError::Disconnected(err.to_string())
            }
            WsError::Io(e) => SyncError::Network(e.to_string()),
            other => SyncError::WebSocket(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SyncError::Timeout(err.to_string())
        } else if err.is_decode() {
            SyncError::Parse(err.to_string())
        } else if let Some(status) = err.status() {
            SyncError::Http {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            SyncError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Parse(err.to_string())
    }
}
