//! 저장소 요약 출력.

use std::collections::BTreeMap;

use anyhow::Result;
use dash_core::AppState;
use serde::Serialize;
use tracing::info;

/// 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            _ => Err(anyhow::anyhow!("Invalid format: {}. Use: table, json", s)),
        }
    }
}

/// 심볼별 최신 시세.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteLine {
    pub symbol: String,
    pub close: String,
    /// 히스토리 창 내 종가 변화
    pub window_change: Option<String>,
}

/// 부서별 실적/예산.
#[derive(Debug, Clone, Serialize)]
pub struct DepartmentLine {
    pub department: String,
    pub actual: String,
    pub budget: String,
    pub variance: String,
}

/// 네 저장소의 시점 요약.
#[derive(Debug, Clone, Serialize)]
pub struct StoreSummary {
    pub quotes: usize,
    pub latest_quotes: Vec<QuoteLine>,
    pub sales: usize,
    pub total_revenue: String,
    pub total_quantity: i64,
    pub revenue_by_region: BTreeMap<String, String>,
    pub events: usize,
    pub events_by_type: BTreeMap<String, usize>,
    pub unique_users: usize,
    pub metrics: usize,
    pub departments: Vec<DepartmentLine>,
    pub recent_messages: usize,
}

impl StoreSummary {
    /// 현재 저장소 상태에서 요약을 만듭니다.
    pub fn collect(state: &AppState) -> Self {
        let quotes = state.quotes.read();
        let latest_quotes = quotes
            .symbols()
            .into_iter()
            .filter_map(|symbol| {
                let latest = quotes.latest(&symbol)?;
                Some(QuoteLine {
                    close: latest.close.to_string(),
                    window_change: quotes.change_over_window(&symbol).map(|c| c.to_string()),
                    symbol,
                })
            })
            .collect();

        let sales = state.sales.read();
        let events = state.events.read();
        let metrics = state.metrics.read();

        let departments = metrics
            .departments()
            .into_iter()
            .map(|department| {
                let summary = metrics.department_summary(&department);
                DepartmentLine {
                    actual: summary.actual.to_string(),
                    budget: summary.budget.to_string(),
                    variance: summary.variance().to_string(),
                    department,
                }
            })
            .collect();

        Self {
            quotes: quotes.len(),
            latest_quotes,
            sales: sales.len(),
            total_revenue: sales.total_revenue().to_string(),
            total_quantity: sales.total_quantity(),
            revenue_by_region: sales
                .revenue_by_region()
                .into_iter()
                .map(|(region, revenue)| (region, revenue.to_string()))
                .collect(),
            events: events.len(),
            events_by_type: events.counts_by_type(),
            unique_users: events.unique_users(),
            metrics: metrics.len(),
            departments,
            recent_messages: state.feed.read().len(),
        }
    }

    /// 한 줄 요약 로그.
    pub fn log(&self) {
        info!(
            quotes = self.quotes,
            symbols = self.latest_quotes.len(),
            sales = self.sales,
            revenue = %self.total_revenue,
            events = self.events,
            unique_users = self.unique_users,
            metrics = self.metrics,
            recent_messages = self.recent_messages,
            "저장소 요약"
        );
    }

    /// 형식에 맞춰 렌더링합니다.
    pub fn render(&self, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(self)?),
            OutputFormat::Table => Ok(self.render_table()),
        }
    }

    fn render_table(&self) -> String {
        let mut out = String::new();

        out.push_str(&format!("Quotes ({} records)\n", self.quotes));
        for line in &self.latest_quotes {
            out.push_str(&format!(
                "  {:<10} close={:<12} change={}\n",
                line.symbol,
                line.close,
                line.window_change.as_deref().unwrap_or("-")
            ));
        }

        out.push_str(&format!(
            "Sales ({} records) revenue={} quantity={}\n",
            self.sales, self.total_revenue, self.total_quantity
        ));
        for (region, revenue) in &self.revenue_by_region {
            out.push_str(&format!("  {:<10} {}\n", region, revenue));
        }

        out.push_str(&format!(
            "Events ({} records) unique_users={}\n",
            self.events, self.unique_users
        ));
        for (event_type, count) in &self.events_by_type {
            out.push_str(&format!("  {:<16} {}\n", event_type, count));
        }

        out.push_str(&format!("Metrics ({} records)\n", self.metrics));
        for line in &self.departments {
            out.push_str(&format!(
                "  {:<12} actual={} budget={} variance={}\n",
                line.department, line.actual, line.budget, line.variance
            ));
        }

        out
    }
}
