//! 애플리케이션 상태.
//!
//! 네 도메인 저장소를 소유하는 단일 객체입니다. 시작 시 한 번 생성해
//! 연결 관리자와 UI 계층에 복제(Arc 공유)해서 전달합니다.
//!
//! 쓰기는 메시지 라우터와 백필만 수행하고, 읽기는 어디서나 동기적으로 할 수 있습니다.
//! 변경이 생기면 `StoreUpdate`가 브로드캐스트됩니다.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::aggregates::{EventStore, MetricStore, QuoteStore, SalesStore};
use super::BoundedStore;
use crate::config::StoreConfig;
use crate::domain::{Domain, DomainRecord, FinancialMetric, Record, Sale, StockQuote, UserEvent};

/// 공유 저장소 핸들.
pub type SharedStore<R> = Arc<RwLock<BoundedStore<R>>>;

/// 저장소 변경 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    /// 실시간 레코드 추가
    Appended,
    /// 백필로 히스토리 교체
    Replaced,
}

/// 저장소 변경 알림.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreUpdate {
    /// 변경된 도메인
    pub domain: Domain,
    /// 변경 종류
    pub kind: UpdateKind,
}

/// 최근 수신 피드 항목.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedEntry {
    /// 수신 채널
    pub channel: String,
    /// 대상 도메인
    pub domain: Domain,
    /// 검증을 통과한 원본 페이로드
    pub data: serde_json::Value,
    /// 수신 시각
    pub received_at: DateTime<Utc>,
}

/// 최근 라우팅된 데이터 메시지 기록 (용량 제한).
#[derive(Debug, Clone)]
pub struct RecentFeed {
    capacity: usize,
    entries: VecDeque<FeedEntry>,
}

impl RecentFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, entry: FeedEntry) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// 가장 최근 항목.
    pub fn latest(&self) -> Option<&FeedEntry> {
        self.entries.back()
    }

    /// 오래된 것부터 순회합니다.
    pub fn iter(&self) -> impl Iterator<Item = &FeedEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// 레코드 타입과 `AppState`의 저장소를 연결합니다.
pub trait Stored: Record {
    /// 이 레코드 타입의 저장소.
    fn store(state: &AppState) -> &SharedStore<Self>;
}

impl Stored for StockQuote {
    fn store(state: &AppState) -> &SharedStore<Self> {
        &state.quotes
    }
}

impl Stored for Sale {
    fn store(state: &AppState) -> &SharedStore<Self> {
        &state.sales
    }
}

impl Stored for UserEvent {
    fn store(state: &AppState) -> &SharedStore<Self> {
        &state.events
    }
}

impl Stored for FinancialMetric {
    fn store(state: &AppState) -> &SharedStore<Self> {
        &state.metrics
    }
}

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 시세 저장소
    pub quotes: Arc<RwLock<QuoteStore>>,
    /// 판매 저장소
    pub sales: Arc<RwLock<SalesStore>>,
    /// 사용자 이벤트 저장소
    pub events: Arc<RwLock<EventStore>>,
    /// 재무 지표 저장소
    pub metrics: Arc<RwLock<MetricStore>>,
    /// 최근 수신 피드
    pub feed: Arc<RwLock<RecentFeed>>,
    updates: broadcast::Sender<StoreUpdate>,
}

impl AppState {
    /// 설정값으로 상태를 생성합니다.
    pub fn new(config: &StoreConfig) -> Self {
        let capacity = config.history_capacity;
        let (updates, _) = broadcast::channel(256);
        Self {
            quotes: Arc::new(RwLock::new(BoundedStore::new(capacity))),
            sales: Arc::new(RwLock::new(BoundedStore::new(capacity))),
            events: Arc::new(RwLock::new(BoundedStore::new(capacity))),
            metrics: Arc::new(RwLock::new(BoundedStore::new(capacity))),
            feed: Arc::new(RwLock::new(RecentFeed::new(config.feed_capacity))),
            updates,
        }
    }

    /// 기본 용량(1000)으로 상태를 생성합니다.
    pub fn with_defaults() -> Self {
        Self::new(&StoreConfig::default())
    }

    /// 저장소 변경 알림 수신기.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<StoreUpdate> {
        self.updates.subscribe()
    }

    /// 레코드 하나를 해당 저장소에 추가합니다.
    pub fn append<R: Stored>(&self, record: R) {
        R::store(self).write().append(record);
        self.notify(R::DOMAIN, UpdateKind::Appended);
    }

    /// 해당 저장소의 히스토리를 교체합니다.
    pub fn replace<R: Stored>(&self, records: Vec<R>) {
        R::store(self).write().replace(records);
        self.notify(R::DOMAIN, UpdateKind::Replaced);
    }

    /// 도메인 구분 없는 레코드를 추가합니다.
    pub fn apply(&self, record: DomainRecord) {
        match record {
            DomainRecord::Quote(r) => self.append(r),
            DomainRecord::Sale(r) => self.append(r),
            DomainRecord::Event(r) => self.append(r),
            DomainRecord::Metric(r) => self.append(r),
        }
    }

    /// 수신 피드에 항목을 기록합니다.
    pub fn record_feed(&self, channel: &str, domain: Domain, data: serde_json::Value) {
        self.feed.write().push(FeedEntry {
            channel: channel.to_string(),
            domain,
            data,
            received_at: Utc::now(),
        });
    }

    /// 도메인별 히스토리 길이.
    pub fn len_of(&self, domain: Domain) -> usize {
        match domain {
            Domain::Quotes => self.quotes.read().len(),
            Domain::Sales => self.sales.read().len(),
            Domain::Events => self.events.read().len(),
            Domain::Metrics => self.metrics.read().len(),
        }
    }

    fn notify(&self, domain: Domain, kind: UpdateKind) {
        // 수신자가 없으면 전송 실패는 무시
        let _ = self.updates.send(StoreUpdate { domain, kind });
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("quotes", &self.len_of(Domain::Quotes))
            .field("sales", &self.len_of(Domain::Sales))
            .field("events", &self.len_of(Domain::Events))
            .field("metrics", &self.len_of(Domain::Metrics))
            .finish()
    }
}
