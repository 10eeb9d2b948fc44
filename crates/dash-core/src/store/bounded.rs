//! 용량 제한 히스토리 + 최신 키 인덱스.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};

use crate::domain::Record;

/// 도메인 하나의 제한된 히스토리 저장소.
///
/// - 히스토리는 도착 순서를 유지하며 길이가 `capacity`를 넘지 않습니다 (FIFO 제거).
/// - 최신 인덱스는 키별로 가장 큰 timestamp의 레코드를 가리키며,
///   동률이면 나중에 도착한 레코드가 이깁니다.
///
/// 최신 인덱스의 레코드는 히스토리에서 제거된 뒤에도 더 새로운 레코드가
/// 오기 전까지 유지됩니다.
#[derive(Debug, Clone)]
pub struct BoundedStore<R: Record> {
    capacity: usize,
    history: VecDeque<R>,
    latest: HashMap<String, R>,
}

impl<R: Record> BoundedStore<R> {
    /// 지정한 용량으로 빈 저장소를 생성합니다.
    ///
    /// 용량 0은 1로 올림합니다.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            history: VecDeque::with_capacity(capacity),
            latest: HashMap::new(),
        }
    }

    /// 레코드를 추가합니다.
    ///
    /// 용량을 초과하면 가장 오래된 레코드를 제거하고 그 레코드를 반환합니다.
    pub fn append(&mut self, record: R) -> Option<R> {
        self.index(&record);

        let evicted = if self.history.len() >= self.capacity {
            self.history.pop_front()
        } else {
            None
        };
        self.history.push_back(record);
        evicted
    }

    /// 히스토리를 통째로 교체하고 최신 인덱스를 다시 만듭니다.
    ///
    /// 입력이 용량보다 길면 마지막 `capacity`개만 유지합니다.
    pub fn replace(&mut self, records: Vec<R>) {
        let skip = records.len().saturating_sub(self.capacity);

        self.history.clear();
        self.latest.clear();

        for record in records.into_iter().skip(skip) {
            self.index(&record);
            self.history.push_back(record);
        }
    }

    fn index(&mut self, record: &R) {
        let newer = match self.latest.get(record.key()) {
            Some(current) => record.timestamp() >= current.timestamp(),
            None => true,
        };
        if newer {
            self.latest.insert(record.key().to_string(), record.clone());
        }
    }

    /// 히스토리 (오래된 것부터).
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &R> + ExactSizeIterator + '_ {
        self.history.iter()
    }

    /// 히스토리를 Vec으로 복사합니다.
    pub fn to_vec(&self) -> Vec<R> {
        self.history.iter().cloned().collect()
    }

    /// 키의 최신 레코드.
    pub fn latest(&self, key: &str) -> Option<&R> {
        self.latest.get(key)
    }

    /// 전체 최신 인덱스.
    pub fn latest_map(&self) -> &HashMap<String, R> {
        &self.latest
    }

    /// 가장 마지막에 추가된 레코드.
    pub fn last(&self) -> Option<&R> {
        self.history.back()
    }

    /// 히스토리 안에서 가장 오래된/최근 timestamp.
    pub fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let mut iter = self.history.iter().map(|r| r.timestamp());
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), t| (lo.min(t), hi.max(t))))
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 히스토리와 인덱스를 모두 비웁니다.
    pub fn clear(&mut self) {
        self.history.clear();
        self.latest.clear();
    }
}

impl<R: Record> Default for BoundedStore<R> {
    fn default() -> Self {
        Self::new(super::DEFAULT_HISTORY_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::StockQuote;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn quote(symbol: &str, close: Decimal, secs: i64) -> StockQuote {
        StockQuote {
            id: 0,
            symbol: symbol.to_string(),
            timestamp: Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100,
            bid: None,
            ask: None,
            change: None,
            change_pct: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_newer_quote_supersedes() {
        let mut store = BoundedStore::new(1000);
        store.append(quote("AAPL", dec!(100), 1));
        store.append(quote("AAPL", dec!(102), 2));

        assert_eq!(store.latest("AAPL").unwrap().close, dec!(102));
        assert_eq!(store.len(), 2);
        // 이전 레코드는 히스토리에 그대로 남음
        assert_eq!(store.history().next().unwrap().close, dec!(100));
    }

    #[test]
    fn test_fifo_eviction() {
        let mut store = BoundedStore::new(3);
        for (i, close) in [dec!(1), dec!(2), dec!(3)].into_iter().enumerate() {
            assert!(store.append(quote("R", close, i as i64)).is_none());
        }

        let evicted = store.append(quote("R", dec!(4), 3)).unwrap();
        assert_eq!(evicted.close, dec!(1));

        let closes: Vec<_> = store.history().map(|q| q.close).collect();
        assert_eq!(closes, vec![dec!(2), dec!(3), dec!(4)]);
    }

    #[test]
    fn test_older_record_does_not_replace_latest() {
        let mut store = BoundedStore::new(10);
        store.append(quote("TSLA", dec!(200), 10));
        store.append(quote("TSLA", dec!(150), 5));

        assert_eq!(store.latest("TSLA").unwrap().close, dec!(200));
        assert_eq!(store.last().unwrap().close, dec!(150));
    }

    #[test]
    fn test_equal_timestamp_later_arrival_wins() {
        let mut store = BoundedStore::new(10);
        store.append(quote("NVDA", dec!(1), 7));
        store.append(quote("NVDA", dec!(2), 7));

        assert_eq!(store.latest("NVDA").unwrap().close, dec!(2));
    }

    #[test]
    fn test_latest_outlives_eviction() {
        let mut store = BoundedStore::new(2);
        store.append(quote("AMD", dec!(90), 1));
        store.append(quote("INTC", dec!(30), 2));
        store.append(quote("INTC", dec!(31), 3));

        assert!(store.history().all(|q| q.symbol == "INTC"));
        assert_eq!(store.latest("AMD").unwrap().close, dec!(90));
    }

    #[test]
    fn test_replace_truncates_and_rebuilds_index() {
        let mut store = BoundedStore::new(3);
        store.append(quote("OLD", dec!(1), 0));

        let batch = vec![
            quote("META", dec!(10), 4),
            quote("META", dec!(11), 1),
            quote("META", dec!(12), 3),
            quote("GOOGL", dec!(13), 2),
        ];
        store.replace(batch);

        assert_eq!(store.len(), 3);
        assert!(store.latest("OLD").is_none());
        // 잘린 첫 레코드(ts=4)는 인덱스에도 반영되지 않음
        assert_eq!(store.latest("META").unwrap().close, dec!(12));
        assert_eq!(store.latest("GOOGL").unwrap().close, dec!(13));
    }

    #[test]
    fn test_time_range() {
        let mut store = BoundedStore::new(5);
        assert!(store.time_range().is_none());

        store.append(quote("A", dec!(1), 30));
        store.append(quote("A", dec!(1), 10));
        store.append(quote("A", dec!(1), 20));

        let (lo, hi) = store.time_range().unwrap();
        assert_eq!(hi - lo, chrono::Duration::seconds(20));
    }

    #[test]
    fn test_zero_capacity_rounds_up() {
        let mut store: BoundedStore<StockQuote> = BoundedStore::new(0);
        store.append(quote("A", dec!(1), 1));
        store.append(quote("A", dec!(2), 2));
        assert_eq!(store.capacity(), 1);
        assert_eq!(store.len(), 1);
    }
}
