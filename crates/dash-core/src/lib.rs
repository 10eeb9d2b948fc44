//! # Dash Core
//!
//! 실시간 대시보드 동기화 코어의 도메인 모델과 저장소를 제공합니다.
//!
//! - 도메인 레코드 (시세, 판매, 사용자 이벤트, 재무 지표)
//! - 용량 제한 히스토리와 키별 최신 인덱스
//! - 도메인별 파생 집계
//! - 애플리케이션 공유 상태
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod store;

pub use self::config::*;
pub use self::domain::*;
pub use self::error::*;
pub use self::store::*;
