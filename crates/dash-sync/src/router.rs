//! 메시지 라우터.
//!
//! 디코딩된 메시지의 채널로 도메인을 찾아 해당 저장소에 레코드를 추가합니다.
//! 잘못된 메시지 하나는 폐기될 뿐 연결이나 저장소 상태에 영향을 주지 않습니다.

use dash_core::{AppState, DashError, Domain, DomainRecord};
use thiserror::Error;
use tracing::{debug, trace};

use crate::envelope::Envelope;

/// 단일 메시지 라우팅 실패.
#[derive(Debug, Error)]
pub enum RouteError {
    /// JSON이 아니거나 필수 필드 누락
    #[error("잘못된 메시지 형식: {0}")]
    Malformed(String),

    /// 알 수 없는 메시지 타입
    #[error("알 수 없는 메시지 타입: {0}")]
    UnknownKind(String),

    /// 페이로드가 객체가 아님
    #[error("{channel}: 페이로드가 객체가 아닙니다")]
    NotAnObject { channel: String },

    /// 페이로드가 도메인 스키마와 맞지 않음
    #[error("{channel}: 스키마 불일치: {reason}")]
    Schema { channel: String, reason: String },

    /// 레코드 값 검증 실패
    #[error("{channel}: 검증 실패: {reason}")]
    Invalid { channel: String, reason: String },
}

/// 라우팅 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Routed {
    /// 구독/해제 확인 (저장소 변경 없음)
    Ack,
    /// 레코드가 도메인 저장소에 추가됨
    Stored(Domain),
    /// 알 수 없는 채널 (무시)
    UnknownChannel(String),
}

/// 채널 → 저장소 라우터.
///
/// 저장소에 쓰는 유일한 실시간 경로입니다.
#[derive(Debug, Clone)]
pub struct MessageRouter {
    state: AppState,
}

impl MessageRouter {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    /// 대상 상태.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// 텍스트 프레임을 디코딩해 라우팅합니다.
    pub fn route_text(&self, text: &str) -> Result<Routed, RouteError> {
        let envelope = Envelope::decode(text)?;
        self.route(envelope)
    }

    /// 메시지를 라우팅합니다.
    pub fn route(&self, envelope: Envelope) -> Result<Routed, RouteError> {
        let (channel, data) = match envelope {
            Envelope::Subscribed { channel } | Envelope::Unsubscribed { channel } => {
                trace!(channel = ?channel, "구독 확인 수신");
                return Ok(Routed::Ack);
            }
            Envelope::Data { channel, data } => (channel, data),
        };

        let Some(domain) = Domain::from_channel(&channel) else {
            debug!(channel = %channel, "알 수 없는 채널, 메시지 무시");
            return Ok(Routed::UnknownChannel(channel));
        };
        let _span = dash_core::channel_span!("route", channel, domain).entered();

        if !data.is_object() {
            return Err(RouteError::NotAnObject { channel });
        }

        let record = DomainRecord::decode(domain, data.clone()).map_err(|e| match e {
            DashError::Validation(reason) => RouteError::Invalid {
                channel: channel.clone(),
                reason,
            },
            other => RouteError::Schema {
                channel: channel.clone(),
                reason: other.to_string(),
            },
        })?;

        self.state.apply(record);
        self.state.record_feed(&channel, domain, data);
        Ok(Routed::Stored(domain))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn quote_frame(symbol: &str, close: i64, ts: &str) -> String {
        json!({
            "type": "data",
            "channel": "stock_quotes",
            "data": {
                "symbol": symbol,
                "timestamp": ts,
                "open": close, "high": close, "low": close, "close": close,
                "volume": 10
            }
        })
        .to_string()
    }

    #[test]
    fn test_quote_supersedes_by_timestamp() {
        let router = MessageRouter::new(AppState::with_defaults());

        router
            .route_text(&quote_frame("AAPL", 100, "2024-03-01T10:00:00Z"))
            .unwrap();
        router
            .route_text(&quote_frame("AAPL", 102, "2024-03-01T10:00:05Z"))
            .unwrap();

        let quotes = router.state().quotes.read();
        assert_eq!(quotes.latest("AAPL").unwrap().close, dec!(102));
        assert_eq!(quotes.len(), 2);
    }

    #[test]
    fn test_feed_keeps_routed_payload() {
        let router = MessageRouter::new(AppState::with_defaults());
        router
            .route_text(&quote_frame("AAPL", 100, "2024-03-01T10:00:00Z"))
            .unwrap();
        assert!(router
            .route_text(&quote_frame("", 1, "2024-03-01T10:00:01Z"))
            .is_err());

        let feed = router.state().feed.read();
        assert_eq!(feed.len(), 1);
        let entry = feed.latest().unwrap();
        assert_eq!(entry.channel, "stock_quotes");
        assert_eq!(entry.domain, Domain::Quotes);
        assert_eq!(entry.data["symbol"], "AAPL");
        assert_eq!(entry.data["close"], 100);
    }

    #[test]
    fn test_large_sales_do_not_break_totals() {
        let router = MessageRouter::new(AppState::with_defaults());
        for i in 0..2 {
            let frame = json!({
                "type": "data",
                "channel": "sales",
                "data": {
                    "timestamp": format!("2024-03-01T10:00:0{}Z", i),
                    "product_id": format!("P{}", i),
                    "product_name": "Bulk",
                    "quantity": 9_000_000_000_000_000_000i64,
                    "unit_price": "1",
                    "revenue": "50000000000000000000000000000"
                }
            });
            assert_eq!(
                router.route_text(&frame.to_string()).unwrap(),
                Routed::Stored(Domain::Sales)
            );
        }

        let sales = router.state().sales.read();
        assert_eq!(sales.total_revenue(), rust_decimal::Decimal::MAX);
        assert_eq!(sales.total_quantity(), i64::MAX);
    }

    #[test]
    fn test_ack_is_not_forwarded() {
        let router = MessageRouter::new(AppState::with_defaults());
        let routed = router
            .route_text(r#"{"type":"subscribed","channel":"sales"}"#)
            .unwrap();

        assert_eq!(routed, Routed::Ack);
        assert!(router.state().feed.read().is_empty());
    }

    #[test]
    fn test_unknown_channel_is_dropped_silently() {
        let router = MessageRouter::new(AppState::with_defaults());
        let routed = router
            .route_text(r#"{"type":"data","channel":"crypto_ticks","data":{"x":1}}"#)
            .unwrap();

        assert_eq!(routed, Routed::UnknownChannel("crypto_ticks".to_string()));
        assert_eq!(router.state().len_of(Domain::Quotes), 0);
    }

    #[test]
    fn test_payload_errors() {
        let router = MessageRouter::new(AppState::with_defaults());

        let err = router
            .route_text(r#"{"type":"data","channel":"sales","data":"oops"}"#)
            .unwrap_err();
        assert!(matches!(err, RouteError::NotAnObject { .. }));

        let err = router
            .route_text(r#"{"type":"data","channel":"sales","data":null}"#)
            .unwrap_err();
        assert!(matches!(err, RouteError::NotAnObject { .. }));

        let err = router
            .route_text(r#"{"type":"data","channel":"sales","data":{"product_id":"P1"}}"#)
            .unwrap_err();
        assert!(matches!(err, RouteError::Schema { .. }));

        let err = router
            .route_text(&quote_frame("", 1, "2024-03-01T10:00:00Z"))
            .unwrap_err();
        assert!(matches!(err, RouteError::Invalid { .. }));

        assert_eq!(router.state().len_of(Domain::Sales), 0);
        assert_eq!(router.state().len_of(Domain::Quotes), 0);
    }

    #[test]
    fn test_one_bad_message_then_ten_good() {
        let router = MessageRouter::new(AppState::with_defaults());

        assert!(router
            .route_text(r#"{"type":"data","channel":"stock_quotes","data":{"symbol":"#)
            .is_err());

        for i in 0..10 {
            let ts = format!("2024-03-01T10:00:{:02}Z", i);
            assert_eq!(
                router.route_text(&quote_frame("MSFT", 300 + i, &ts)).unwrap(),
                Routed::Stored(Domain::Quotes)
            );
        }

        assert_eq!(router.state().len_of(Domain::Quotes), 10);
        assert_eq!(router.state().feed.read().len(), 10);
    }
}
