//! 와이어 메시지 타입.
//!
//! 모든 메시지는 JSON 텍스트 프레임입니다.
//!
//! ## 클라이언트 → 서버
//!
//! ```json
//! {"type": "subscribe", "channel": "stock_quotes"}
//! {"type": "unsubscribe", "channel": "stock_quotes"}
//! ```
//!
//! ## 서버 → 클라이언트
//!
//! ```json
//! {"type": "subscribed", "channel": "stock_quotes"}
//! {"type": "data", "channel": "stock_quotes", "data": {...}}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::router::RouteError;

// ==================== 서버 → 클라이언트 ====================

/// 서버에서 수신한 메시지.
///
/// 알 수 없는 `type`이나 필수 필드가 빠진 메시지는 디코딩 단계에서 거부됩니다.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Envelope {
    /// 구독 확인
    Subscribed {
        #[serde(default)]
        channel: Option<String>,
    },
    /// 구독 해제 확인
    Unsubscribed {
        #[serde(default)]
        channel: Option<String>,
    },
    /// 채널 데이터
    Data {
        /// 채널 이름
        channel: String,
        /// 도메인 레코드 객체
        data: Value,
    },
}

impl Envelope {
    /// JSON 텍스트 프레임을 디코딩합니다.
    pub fn decode(text: &str) -> Result<Self, RouteError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| RouteError::Malformed(e.to_string()))?;

        match value.get("type").and_then(Value::as_str) {
            Some("subscribed" | "unsubscribed" | "data") => {}
            Some(other) => return Err(RouteError::UnknownKind(other.to_string())),
            None => return Err(RouteError::Malformed("missing `type`".to_string())),
        }

        serde_json::from_value(value).map_err(|e| RouteError::Malformed(e.to_string()))
    }

    /// 메시지의 채널 (확인 메시지는 없을 수 있음).
    pub fn channel(&self) -> Option<&str> {
        match self {
            Envelope::Subscribed { channel } | Envelope::Unsubscribed { channel } => {
                channel.as_deref()
            }
            Envelope::Data { channel, .. } => Some(channel),
        }
    }
}

// ==================== 클라이언트 → 서버 ====================

/// 서버로 보내는 구독 지시.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Directive {
    /// 채널 구독
    Subscribe { channel: String },
    /// 채널 구독 해제
    Unsubscribe { channel: String },
}

impl Directive {
    pub fn subscribe(channel: impl Into<String>) -> Self {
        Directive::Subscribe {
            channel: channel.into(),
        }
    }

    pub fn unsubscribe(channel: impl Into<String>) -> Self {
        Directive::Unsubscribe {
            channel: channel.into(),
        }
    }

    /// 지시 대상 채널.
    pub fn channel(&self) -> &str {
        match self {
            Directive::Subscribe { channel } | Directive::Unsubscribe { channel } => channel,
        }
    }

    /// JSON 문자열로 직렬화.
    pub fn to_json(&self) -> String {
        // 문자열 필드만 있는 enum이므로 직렬화는 실패하지 않음
        serde_json::to_string(self).unwrap_or_default()
    }
}
