//! 도메인 레코드 및 채널 매핑.
//!
//! - `StockQuote` - 시세 (키: symbol)
//! - `Sale` - 판매 거래 (키: product_id)
//! - `UserEvent` - 사용자 행동 이벤트 (키: event_type)
//! - `FinancialMetric` - 재무 지표 (키: department)

mod records;

pub use records::*;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;

use crate::error::DashResult;

/// 레코드 도메인.
///
/// 채널 이름과 1:1로 대응합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Domain {
    /// 주식 시세
    Quotes,
    /// 판매
    Sales,
    /// 사용자 이벤트
    Events,
    /// 재무 지표
    Metrics,
}

impl Domain {
    /// 모든 도메인 (채널 기본 구독 순서).
    pub const ALL: [Domain; 4] = [
        Domain::Quotes,
        Domain::Sales,
        Domain::Events,
        Domain::Metrics,
    ];

    /// 채널 이름에서 도메인을 찾습니다.
    ///
    /// 알 수 없는 채널은 `None`을 반환합니다.
    pub fn from_channel(channel: &str) -> Option<Self> {
        match channel {
            "stock_quotes" => Some(Domain::Quotes),
            "sales" => Some(Domain::Sales),
            "user_events" => Some(Domain::Events),
            "financial_metrics" => Some(Domain::Metrics),
            _ => None,
        }
    }

    /// 도메인의 채널 이름.
    pub fn channel(&self) -> &'static str {
        match self {
            Domain::Quotes => "stock_quotes",
            Domain::Sales => "sales",
            Domain::Events => "user_events",
            Domain::Metrics => "financial_metrics",
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Quotes => "quotes",
            Domain::Sales => "sales",
            Domain::Events => "events",
            Domain::Metrics => "metrics",
        };
        f.write_str(name)
    }
}

/// 저장소에 보관되는 도메인 레코드 공통 인터페이스.
///
/// 레코드는 수신 후 변경되지 않으며, 같은 키의 새 레코드는
/// 히스토리의 이전 레코드를 대체하지 않고 최신 인덱스만 갱신합니다.
pub trait Record: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// 레코드가 속한 도메인
    const DOMAIN: Domain;

    /// 최신 인덱스에 사용하는 자연 키
    fn key(&self) -> &str;

    /// 레코드 발생 시각
    fn timestamp(&self) -> DateTime<Utc>;

    /// 스키마 수준을 넘어서는 값 검증.
    fn validate(&self) -> DashResult<()> {
        Ok(())
    }
}

/// 도메인을 구분하지 않고 전달되는 레코드.
#[derive(Debug, Clone)]
pub enum DomainRecord {
    /// 시세
    Quote(StockQuote),
    /// 판매
    Sale(Sale),
    /// 사용자 이벤트
    Event(UserEvent),
    /// 재무 지표
    Metric(FinancialMetric),
}

impl DomainRecord {
    /// 레코드 도메인.
    pub fn domain(&self) -> Domain {
        match self {
            DomainRecord::Quote(_) => Domain::Quotes,
            DomainRecord::Sale(_) => Domain::Sales,
            DomainRecord::Event(_) => Domain::Events,
            DomainRecord::Metric(_) => Domain::Metrics,
        }
    }

    /// 도메인에 맞는 스키마로 JSON 페이로드를 디코딩하고 검증합니다.
    pub fn decode(domain: Domain, payload: serde_json::Value) -> DashResult<Self> {
        fn typed<R: Record>(payload: serde_json::Value) -> DashResult<R> {
            let record: R = serde_json::from_value(payload)?;
            record.validate()?;
            Ok(record)
        }

        if !payload.is_object() {
            return Err(crate::DashError::Decode(format!(
                "{} 페이로드가 객체가 아닙니다",
                domain
            )));
        }

        Ok(match domain {
            Domain::Quotes => DomainRecord::Quote(typed(payload)?),
            Domain::Sales => DomainRecord::Sale(typed(payload)?),
            Domain::Events => DomainRecord::Event(typed(payload)?),
            Domain::Metrics => DomainRecord::Metric(typed(payload)?),
        })
    }
}
