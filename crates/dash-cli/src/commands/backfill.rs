//! REST 히스토리 백필 명령.

use anyhow::{anyhow, Context, Result};
use dash_core::{AppConfig, AppState};
use dash_sync::{backfill_all, BackfillReport, HistoryQuery, RestHistoryClient, TimeRange};
use tracing::{info, warn};

use super::summary::{OutputFormat, StoreSummary};

/// 백필 명령 인자.
#[derive(Debug, Clone)]
pub struct BackfillArgs {
    /// 최근 N시간
    pub hours: Option<i64>,
    /// 시세 심볼
    pub symbol: Option<String>,
    /// 최대 건수
    pub limit: Option<u32>,
    /// 판매 카테고리
    pub category: Option<String>,
    /// 판매 지역
    pub region: Option<String>,
    /// 이벤트 유형
    pub event_type: Option<String>,
    /// 지표 유형
    pub metric_type: Option<String>,
    /// 지표 부서
    pub department: Option<String>,
    /// 출력 형식
    pub format: OutputFormat,
}

/// 인자로 조회 조건을 만듭니다.
///
/// 시간 범위가 표현 가능한 범위를 벗어나면 에러를 반환합니다.
pub fn build_query(
    hours: Option<i64>,
    symbol: Option<String>,
    limit: Option<u32>,
) -> Result<HistoryQuery> {
    let mut query = HistoryQuery::new();
    if let Some(hours) = hours.filter(|h| *h > 0) {
        let range = TimeRange::last_hours(hours)
            .ok_or_else(|| anyhow!("조회 범위가 너무 큽니다: {}시간", hours))?;
        query = query.with_range(range);
    }
    if let Some(symbol) = symbol {
        query = query.with_symbol(symbol);
    }
    if let Some(limit) = limit {
        query = query.with_limit(limit);
    }
    Ok(query)
}

/// 도메인 필터를 적용합니다.
pub fn apply_filters(mut query: HistoryQuery, args: &BackfillArgs) -> HistoryQuery {
    if let Some(category) = &args.category {
        query = query.with_category(category.clone());
    }
    if let Some(region) = &args.region {
        query = query.with_region(region.clone());
    }
    if let Some(event_type) = &args.event_type {
        query = query.with_event_type(event_type.clone());
    }
    if let Some(metric_type) = &args.metric_type {
        query = query.with_metric_type(metric_type.clone());
    }
    if let Some(department) = &args.department {
        query = query.with_department(department.clone());
    }
    query
}

/// 상태에 백필을 적용합니다.
pub async fn load_history(
    config: &AppConfig,
    state: &AppState,
    query: &HistoryQuery,
) -> Result<BackfillReport> {
    let client = RestHistoryClient::from_config(&config.api)
        .context("히스토리 클라이언트 생성 실패")?;

    info!(base_url = %config.api.base_url, "백필 시작");
    let report = backfill_all(&client, state, query).await;
    report.log_summary();
    Ok(report)
}

/// `backfill` 명령 실행.
pub async fn run_backfill(config: &AppConfig, args: BackfillArgs) -> Result<()> {
    let state = AppState::new(&config.store);
    let query = build_query(args.hours, args.symbol.clone(), args.limit)?;
    let query = apply_filters(query, &args);

    let report = load_history(config, &state, &query).await?;
    if report.failures() > 0 {
        warn!(failures = report.failures(), "일부 도메인 백필 실패, 빈 결과로 표시");
    }

    if let Some(range) = &query.range {
        let client = RestHistoryClient::from_config(&config.api)
            .context("히스토리 클라이언트 생성 실패")?;
        match client.fetch_sales_revenue(range).await {
            Ok(revenue) => info!(revenue = %revenue, "서버 집계 구간 매출"),
            Err(e) => warn!(error = %e, "구간 매출 조회 실패"),
        }
    }

    println!("{}", StoreSummary::collect(&state).render(args.format)?);
    Ok(())
}
