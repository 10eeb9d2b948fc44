//! 도메인별 파생 집계.
//!
//! 모든 집계는 호출 시점의 히스토리에서 다시 계산합니다.
//! 히스토리 길이가 제한되어 있으므로 최악의 경우에도 O(N)입니다.
//!
//! 합계는 포화 연산을 사용합니다. 검증을 통과한 큰 값이 여럿 쌓여도
//! 패닉 없이 `Decimal::MAX`(또는 `i64::MAX`)에서 멈춥니다.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

use super::BoundedStore;
use crate::domain::{FinancialMetric, Sale, StockQuote, UserEvent};

/// 시세 저장소.
pub type QuoteStore = BoundedStore<StockQuote>;
/// 판매 저장소.
pub type SalesStore = BoundedStore<Sale>;
/// 사용자 이벤트 저장소.
pub type EventStore = BoundedStore<UserEvent>;
/// 재무 지표 저장소.
pub type MetricStore = BoundedStore<FinancialMetric>;

/// 포화 합계.
fn saturating_sum(values: impl Iterator<Item = Decimal>) -> Decimal {
    values.fold(Decimal::ZERO, Decimal::saturating_add)
}

impl BoundedStore<StockQuote> {
    /// 히스토리에 등장한 심볼 (정렬됨).
    pub fn symbols(&self) -> Vec<String> {
        self.history()
            .map(|q| q.symbol.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// 심볼의 시세 시계열 (도착 순서).
    pub fn series(&self, symbol: &str) -> Vec<&StockQuote> {
        self.history().filter(|q| q.symbol == symbol).collect()
    }

    /// 히스토리 창 안에서 심볼의 종가 변화량.
    ///
    /// 첫 시세와 마지막 시세의 종가 차이입니다. 시세가 없으면 `None`.
    pub fn change_over_window(&self, symbol: &str) -> Option<Decimal> {
        let mut series = self.history().filter(|q| q.symbol == symbol);
        let first = series.next()?;
        let last = series.last().unwrap_or(first);
        Some(last.close.saturating_sub(first.close))
    }
}

impl BoundedStore<Sale> {
    /// 총 매출.
    pub fn total_revenue(&self) -> Decimal {
        saturating_sum(self.history().map(|s| s.revenue))
    }

    /// 총 판매 수량.
    pub fn total_quantity(&self) -> i64 {
        self.history()
            .map(|s| s.quantity)
            .fold(0i64, i64::saturating_add)
    }

    /// 일자별 매출 (UTC 기준).
    pub fn revenue_by_day(&self) -> BTreeMap<NaiveDate, Decimal> {
        let mut by_day = BTreeMap::new();
        for sale in self.history() {
            let total = by_day
                .entry(sale.timestamp.date_naive())
                .or_insert(Decimal::ZERO);
            *total = total.saturating_add(sale.revenue);
        }
        by_day
    }

    /// 지역별 매출. 지역이 없는 거래는 "unknown"으로 집계합니다.
    pub fn revenue_by_region(&self) -> BTreeMap<String, Decimal> {
        let mut by_region = BTreeMap::new();
        for sale in self.history() {
            let region = sale.region.clone().unwrap_or_else(|| "unknown".to_string());
            let total = by_region.entry(region).or_insert(Decimal::ZERO);
            *total = total.saturating_add(sale.revenue);
        }
        by_region
    }
}

impl BoundedStore<UserEvent> {
    /// 이벤트 유형별 발생 건수.
    pub fn counts_by_type(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for event in self.history() {
            *counts.entry(event.event_type.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// 특정 유형의 이벤트 건수.
    pub fn count_of(&self, event_type: &str) -> usize {
        self.history()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    /// 고유 사용자 수.
    pub fn unique_users(&self) -> usize {
        self.history()
            .filter_map(|e| e.user_id.as_deref())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// 부서별 실적/예산 요약.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DepartmentSummary {
    /// 실적 합계
    pub actual: Decimal,
    /// 예산 합계 (예산 없는 지표는 0)
    pub budget: Decimal,
}

impl DepartmentSummary {
    /// 예산 대비 차이.
    pub fn variance(&self) -> Decimal {
        self.actual.saturating_sub(self.budget)
    }
}

impl BoundedStore<FinancialMetric> {
    /// 지표 유형별 금액 합계 (예: "revenue", "expense").
    pub fn total_for_type(&self, metric_type: &str) -> Decimal {
        saturating_sum(
            self.history()
                .filter(|m| m.metric_type == metric_type)
                .map(|m| m.amount),
        )
    }

    /// 히스토리에 등장한 부서 (빈 부서 제외, 정렬됨).
    pub fn departments(&self) -> Vec<String> {
        self.history()
            .filter(|m| !m.department.is_empty())
            .map(|m| m.department.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// 부서의 실적/예산 합계.
    pub fn department_summary(&self, department: &str) -> DepartmentSummary {
        self.history()
            .filter(|m| m.department == department)
            .fold(DepartmentSummary::default(), |mut acc, m| {
                acc.actual = acc.actual.saturating_add(m.amount);
                acc.budget = acc.budget.saturating_add(m.budget.unwrap_or(Decimal::ZERO));
                acc
            })
    }
}
