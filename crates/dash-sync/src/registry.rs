//! 희망 구독 집합 관리.
//!
//! 애플리케이션이 받고 싶은 채널 목록을 추가 순서대로 보관합니다.
//! 연결 상태와 무관하게 유지되며, (재)연결 시마다 전체 목록이 다시 전송됩니다.
//! 서버 측 구독 상태는 신뢰하지 않습니다.

use indexmap::IndexSet;

use crate::envelope::Directive;

/// 구독 레지스트리.
#[derive(Debug, Clone, Default)]
pub struct SubscriptionRegistry {
    desired: IndexSet<String>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 채널을 희망 집합에 추가합니다.
    ///
    /// 새로 추가되었으면 `true`. 이미 있던 채널이어도 호출자는
    /// 연결 중이라면 구독 지시를 다시 보냅니다.
    pub fn insert(&mut self, channel: impl Into<String>) -> bool {
        self.desired.insert(channel.into())
    }

    /// 채널을 희망 집합에서 제거합니다.
    ///
    /// 추가 순서는 유지됩니다.
    pub fn remove(&mut self, channel: &str) -> bool {
        self.desired.shift_remove(channel)
    }

    pub fn contains(&self, channel: &str) -> bool {
        self.desired.contains(channel)
    }

    /// 희망 채널 목록 (추가 순서).
    pub fn channels(&self) -> Vec<String> {
        self.desired.iter().cloned().collect()
    }

    /// 재연결 시 전송할 구독 지시 목록.
    pub fn replay(&self) -> Vec<Directive> {
        self.desired.iter().map(Directive::subscribe).collect()
    }

    pub fn len(&self) -> usize {
        self.desired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.desired.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for SubscriptionRegistry {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut registry = Self::new();
        for channel in iter {
            registry.insert(channel);
        }
        registry
    }
}
