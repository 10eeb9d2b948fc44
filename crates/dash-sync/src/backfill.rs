//! 과거 데이터 백필.
//!
//! REST API에서 도메인별 히스토리를 조회해 저장소를 교체합니다.
//! 조회 실패는 "데이터 없음"으로 취급되어 해당 저장소는 그대로 유지됩니다.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use dash_core::{
    ApiConfig, AppState, Domain, FinancialMetric, Record, Sale, StockQuote, Stored, UserEvent,
};

use crate::error::{SyncError, SyncResult};

/// 조회 시간 범위.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// 현재 시각 기준 최근 `window` 구간.
    ///
    /// 시작 시각이 표현 범위를 벗어나면 `None`.
    pub fn last(window: TimeDelta) -> Option<Self> {
        let end = Utc::now();
        let start = end.checked_sub_signed(window)?;
        Some(Self { start, end })
    }

    /// 최근 `hours`시간 구간.
    pub fn last_hours(hours: i64) -> Option<Self> {
        Self::last(TimeDelta::try_hours(hours)?)
    }

    fn query_pairs(&self) -> [(&'static str, String); 2] {
        [
            ("start", self.start.to_rfc3339_opts(SecondsFormat::Secs, true)),
            ("end", self.end.to_rfc3339_opts(SecondsFormat::Secs, true)),
        ]
    }
}

/// 히스토리 조회 조건.
///
/// 필터는 서버가 지원하는 조합에서만 쿼리로 전송됩니다.
/// 시간 범위 조회에서 서버가 무시하는 필터(이벤트 유형, 지표 유형/부서)는
/// 클라이언트에서 적용하고, `limit`은 범위 조회에서도 최신 N건으로 적용됩니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    /// 시간 범위 (없으면 서버 기본값: 최근 N건)
    pub range: Option<TimeRange>,
    /// 시세 조회 심볼
    pub symbol: Option<String>,
    /// 최대 건수
    pub limit: Option<u32>,
    /// 판매 카테고리 (범위 조회에서만 서버 필터)
    pub category: Option<String>,
    /// 판매 지역 (범위 조회에서만 서버 필터)
    pub region: Option<String>,
    /// 이벤트 유형
    pub event_type: Option<String>,
    /// 지표 유형
    pub metric_type: Option<String>,
    /// 지표 부서
    pub department: Option<String>,
}

impl HistoryQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(mut self, range: TimeRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = Some(symbol.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_event_type(mut self, event_type: impl Into<String>) -> Self {
        self.event_type = Some(event_type.into());
        self
    }

    pub fn with_metric_type(mut self, metric_type: impl Into<String>) -> Self {
        self.metric_type = Some(metric_type.into());
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }
}

/// 조회된 히스토리 묶음.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryBatch<R> {
    /// 스키마를 통과한 레코드
    pub records: Vec<R>,
    /// 스키마 불일치로 제외된 행 수
    pub skipped: usize,
}

impl<R> HistoryBatch<R> {
    pub fn new(records: Vec<R>) -> Self {
        Self {
            records,
            skipped: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn retain(mut self, keep: impl Fn(&R) -> bool) -> Self {
        self.records.retain(|r| keep(r));
        self
    }
}

impl<R> From<Vec<R>> for HistoryBatch<R> {
    fn from(records: Vec<R>) -> Self {
        Self::new(records)
    }
}

/// 행 단위로 디코딩합니다. 스키마가 맞지 않는 행은 건너뜁니다.
fn decode_rows<R: DeserializeOwned>(path: &str, rows: Vec<serde_json::Value>) -> HistoryBatch<R> {
    let mut batch = HistoryBatch::new(Vec::with_capacity(rows.len()));
    for row in rows {
        match serde_json::from_value(row) {
            Ok(record) => batch.records.push(record),
            Err(e) => {
                debug!(path, error = %e, "스키마 불일치 행 제외");
                batch.skipped += 1;
            }
        }
    }
    batch
}

/// 도메인별 과거 데이터 조회 기능.
#[async_trait]
pub trait HistoryProvider: Send + Sync {
    async fn fetch_quotes(&self, query: &HistoryQuery) -> SyncResult<HistoryBatch<StockQuote>>;
    async fn fetch_sales(&self, query: &HistoryQuery) -> SyncResult<HistoryBatch<Sale>>;
    async fn fetch_events(&self, query: &HistoryQuery) -> SyncResult<HistoryBatch<UserEvent>>;
    async fn fetch_metrics(&self, query: &HistoryQuery)
        -> SyncResult<HistoryBatch<FinancialMetric>>;
}

#[derive(Deserialize)]
struct RevenueBody {
    revenue: Decimal,
}

/// REST API 히스토리 클라이언트.
#[derive(Debug, Clone)]
pub struct RestHistoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl RestHistoryClient {
    /// 새 클라이언트 생성.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SyncError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// 설정에서 생성.
    pub fn from_config(config: &ApiConfig) -> SyncResult<Self> {
        Self::new(config.base_url.clone(), config.timeout())
    }

    /// 구간 총매출 (`/api/sales/revenue`).
    pub async fn fetch_sales_revenue(&self, range: &TimeRange) -> SyncResult<Decimal> {
        let body = self
            .get_text("/api/sales/revenue", &range.query_pairs())
            .await?;
        let parsed: RevenueBody = serde_json::from_str(&body)?;
        Ok(parsed.revenue)
    }

    async fn get_text(&self, path: &str, params: &[(&str, String)]) -> SyncResult<String> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, params = ?params, "히스토리 API 요청");

        let response = self
            .client
            .get(&url)
            .query(params)
            .header("Accept", "application/json")
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SyncError::Http {
                status: status.as_u16(),
                message: format!("{} - {}", path, body),
            });
        }

        Ok(response.text().await?)
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> SyncResult<HistoryBatch<T>> {
        let body = self.get_text(path, params).await?;
        // 빈 결과는 null로 올 수 있음
        let rows: Option<Vec<serde_json::Value>> = serde_json::from_str(&body)?;
        Ok(decode_rows(path, rows.unwrap_or_default()))
    }

    fn sales_params(query: &HistoryQuery) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        match &query.range {
            Some(range) => {
                params.extend(range.query_pairs());
                if let Some(category) = &query.category {
                    params.push(("category", category.clone()));
                }
                if let Some(region) = &query.region {
                    params.push(("region", region.clone()));
                }
            }
            None => push_limit(&mut params, query),
        }
        params
    }

    fn event_params(query: &HistoryQuery) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        match &query.range {
            Some(range) => params.extend(range.query_pairs()),
            None => {
                push_limit(&mut params, query);
                if let Some(event_type) = &query.event_type {
                    params.push(("type", event_type.clone()));
                }
            }
        }
        params
    }

    fn metric_params(query: &HistoryQuery) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        match &query.range {
            Some(range) => params.extend(range.query_pairs()),
            None => {
                push_limit(&mut params, query);
                // 서버는 type을 department보다 우선 적용
                if let Some(metric_type) = &query.metric_type {
                    params.push(("type", metric_type.clone()));
                } else if let Some(department) = &query.department {
                    params.push(("department", department.clone()));
                }
            }
        }
        params
    }
}

fn push_limit(params: &mut Vec<(&'static str, String)>, query: &HistoryQuery) {
    if let Some(limit) = query.limit {
        params.push(("limit", limit.to_string()));
    }
}

#[async_trait]
impl HistoryProvider for RestHistoryClient {
    async fn fetch_quotes(&self, query: &HistoryQuery) -> SyncResult<HistoryBatch<StockQuote>> {
        match (&query.symbol, &query.range) {
            (Some(symbol), Some(range)) => {
                let mut params = vec![("symbol", symbol.clone())];
                params.extend(range.query_pairs());
                self.get_list("/api/stocks/range", &params).await
            }
            _ => {
                let mut params = Vec::new();
                if let Some(symbol) = &query.symbol {
                    params.push(("symbol", symbol.clone()));
                }
                push_limit(&mut params, query);
                self.get_list("/api/stocks", &params).await
            }
        }
    }

    async fn fetch_sales(&self, query: &HistoryQuery) -> SyncResult<HistoryBatch<Sale>> {
        self.get_list("/api/sales", &Self::sales_params(query)).await
    }

    async fn fetch_events(&self, query: &HistoryQuery) -> SyncResult<HistoryBatch<UserEvent>> {
        let batch: HistoryBatch<UserEvent> =
            self.get_list("/api/events", &Self::event_params(query)).await?;
        match (&query.range, &query.event_type) {
            (Some(_), Some(event_type)) => Ok(batch.retain(|e| &e.event_type == event_type)),
            _ => Ok(batch),
        }
    }

    async fn fetch_metrics(
        &self,
        query: &HistoryQuery,
    ) -> SyncResult<HistoryBatch<FinancialMetric>> {
        let batch: HistoryBatch<FinancialMetric> =
            self.get_list("/api/metrics", &Self::metric_params(query)).await?;
        if query.range.is_none() {
            return Ok(batch);
        }
        Ok(batch.retain(|m| {
            query.metric_type.as_ref().map_or(true, |t| &m.metric_type == t)
                && query.department.as_ref().map_or(true, |d| &m.department == d)
        }))
    }
}

/// 도메인 하나의 백필 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackfillOutcome {
    /// 저장소 교체됨
    Loaded { records: usize, skipped: usize },
    /// 조회 실패, 저장소 유지
    Failed(String),
}

/// 전체 백필 결과.
#[derive(Debug, Clone)]
pub struct BackfillReport {
    pub outcomes: Vec<(Domain, BackfillOutcome)>,
    pub elapsed: Duration,
}

impl BackfillReport {
    pub fn outcome(&self, domain: Domain) -> Option<&BackfillOutcome> {
        self.outcomes
            .iter()
            .find(|(d, _)| *d == domain)
            .map(|(_, o)| o)
    }

    /// 로드된 레코드 총합.
    pub fn total_records(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, o)| match o {
                BackfillOutcome::Loaded { records, .. } => *records,
                BackfillOutcome::Failed(_) => 0,
            })
            .sum()
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, BackfillOutcome::Failed(_)))
            .count()
    }

    /// 요약 로그 출력.
    pub fn log_summary(&self) {
        info!(
            domains = self.outcomes.len(),
            records = self.total_records(),
            failures = self.failures(),
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "백필 완료"
        );
    }
}

/// 네 도메인을 모두 조회해 저장소를 교체합니다.
///
/// 도메인별로 독립적이며, 한 도메인의 실패가 다른 도메인에 영향을 주지 않습니다.
pub async fn backfill_all(
    provider: &dyn HistoryProvider,
    state: &AppState,
    query: &HistoryQuery,
) -> BackfillReport {
    let started = Instant::now();

    let limit = query.limit.map(|l| l as usize);
    let outcomes = vec![
        (Domain::Quotes, load(state, provider.fetch_quotes(query).await, limit)),
        (Domain::Sales, load(state, provider.fetch_sales(query).await, limit)),
        (Domain::Events, load(state, provider.fetch_events(query).await, limit)),
        (Domain::Metrics, load(state, provider.fetch_metrics(query).await, limit)),
    ];

    BackfillReport {
        outcomes,
        elapsed: started.elapsed(),
    }
}

fn load<R: Stored>(
    state: &AppState,
    fetched: SyncResult<HistoryBatch<R>>,
    limit: Option<usize>,
) -> BackfillOutcome {
    let batch = match fetched {
        Ok(batch) => batch,
        Err(e) => {
            warn!(domain = %R::DOMAIN, error = %e, "백필 실패, 기존 데이터 유지");
            return BackfillOutcome::Failed(e.to_string());
        }
    };

    let total = batch.records.len();
    let mut valid: Vec<R> = batch
        .records
        .into_iter()
        .filter(|r| match r.validate() {
            Ok(()) => true,
            Err(e) => {
                debug!(domain = %R::DOMAIN, error = %e, "유효하지 않은 레코드 제외");
                false
            }
        })
        .collect();
    let skipped = batch.skipped + (total - valid.len());

    // 서버는 최신순으로 줄 수 있으므로 오래된 것부터 정렬
    valid.sort_by_key(|r| r.timestamp());
    if let Some(limit) = limit {
        let excess = valid.len().saturating_sub(limit);
        valid.drain(..excess);
    }
    let loaded = valid.len();
    state.replace(valid);

    debug!(domain = %R::DOMAIN, records = loaded, skipped, "백필 적용");
    BackfillOutcome::Loaded {
        records: loaded,
        skipped,
    }
}
