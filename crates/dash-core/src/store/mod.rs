//! 저장소 계층.
//!
//! - `BoundedStore` - 용량 제한 히스토리 + 키별 최신 인덱스
//! - 도메인별 파생 집계 (매출 합계, 이벤트 유형별 건수 등)
//! - `AppState` - 네 저장소를 소유하는 공유 상태

mod aggregates;
mod bounded;
mod state;

pub use aggregates::*;
pub use bounded::BoundedStore;
pub use state::*;

/// 도메인별 히스토리 기본 용량.
pub const DEFAULT_HISTORY_CAPACITY: usize = 1000;

/// 최근 수신 피드 기본 용량.
pub const DEFAULT_FEED_CAPACITY: usize = 100;
