//! 도메인 레코드 구조체.
//!
//! 필드 이름은 서버 JSON과 동일합니다. 금액/가격은 `Decimal`을 사용합니다.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Domain, Record};
use crate::error::{DashError, DashResult};

/// 주식 시세.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    /// 레코드 ID
    #[serde(default)]
    pub id: u64,
    /// 종목 심볼
    pub symbol: String,
    /// 시세 시각
    pub timestamp: DateTime<Utc>,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량
    pub volume: i64,
    /// 매수 호가
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bid: Option<Decimal>,
    /// 매도 호가
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ask: Option<Decimal>,
    /// 전일 대비
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change: Option<Decimal>,
    /// 등락률 (%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for StockQuote {
    const DOMAIN: Domain = Domain::Quotes;

    fn key(&self) -> &str {
        &self.symbol
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn validate(&self) -> DashResult<()> {
        if self.symbol.trim().is_empty() {
            return Err(DashError::Validation("시세 심볼이 비어 있습니다".to_string()));
        }
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| p.is_sign_negative()) || self.volume < 0 {
            return Err(DashError::Validation(format!(
                "{}: 음수 가격 또는 거래량",
                self.symbol
            )));
        }
        if self.high < self.low {
            return Err(DashError::Validation(format!(
                "{}: 고가({})가 저가({})보다 낮습니다",
                self.symbol, self.high, self.low
            )));
        }
        Ok(())
    }
}

/// 판매 거래.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    #[serde(default)]
    pub id: u64,
    /// 거래 시각
    pub timestamp: DateTime<Utc>,
    /// 상품 ID
    pub product_id: String,
    /// 상품명
    pub product_name: String,
    /// 카테고리
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// 고객 ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    /// 판매 지역
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// 수량
    pub quantity: i64,
    /// 단가
    pub unit_price: Decimal,
    /// 할인 금액
    #[serde(default)]
    pub discount: Decimal,
    /// 매출
    pub revenue: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for Sale {
    const DOMAIN: Domain = Domain::Sales;

    fn key(&self) -> &str {
        &self.product_id
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn validate(&self) -> DashResult<()> {
        if self.product_id.trim().is_empty() {
            return Err(DashError::Validation("상품 ID가 비어 있습니다".to_string()));
        }
        if self.quantity < 0 {
            return Err(DashError::Validation(format!(
                "{}: 음수 수량 {}",
                self.product_id, self.quantity
            )));
        }
        Ok(())
    }
}

/// 사용자 행동 이벤트.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserEvent {
    #[serde(default)]
    pub id: u64,
    /// 이벤트 시각
    pub timestamp: DateTime<Utc>,
    /// 이벤트 유형 (page_view, click, purchase, ...)
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    /// 원본 JSON 문자열 메타데이터
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for UserEvent {
    const DOMAIN: Domain = Domain::Events;

    fn key(&self) -> &str {
        &self.event_type
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn validate(&self) -> DashResult<()> {
        if self.event_type.trim().is_empty() {
            return Err(DashError::Validation("이벤트 유형이 비어 있습니다".to_string()));
        }
        Ok(())
    }
}

/// 재무 지표.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetric {
    #[serde(default)]
    pub id: u64,
    /// 집계 시각
    pub timestamp: DateTime<Utc>,
    /// 지표 유형 (revenue, expense, profit, margin)
    pub metric_type: String,
    /// 부서 (없으면 빈 문자열)
    #[serde(default)]
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// 실적
    pub amount: Decimal,
    /// 예산
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Decimal>,
    /// 예산 대비 차이
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance: Option<Decimal>,
    /// 예산 대비 차이율 (%)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variance_pct: Option<Decimal>,
    /// 집계 주기 (daily, weekly, monthly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Record for FinancialMetric {
    const DOMAIN: Domain = Domain::Metrics;

    fn key(&self) -> &str {
        &self.department
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    fn validate(&self) -> DashResult<()> {
        if self.metric_type.trim().is_empty() {
            return Err(DashError::Validation("지표 유형이 비어 있습니다".to_string()));
        }
        Ok(())
    }
}
