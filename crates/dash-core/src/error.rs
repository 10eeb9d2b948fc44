//! 대시보드 동기화 코어의 에러 타입.
//!
//! 설정 로드와 레코드 디코딩/검증에서 발생하는 에러를 정의합니다.

use thiserror::Error;

/// 코어 에러.
#[derive(Debug, Error)]
pub enum DashError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 디코딩 에러 (잘못된 메시지/페이로드 형식)
    #[error("디코딩 에러: {0}")]
    Decode(String),

    /// 레코드 검증 실패
    #[error("검증 실패: {0}")]
    Validation(String),
}

/// 코어 작업을 위한 Result 타입.
pub type DashResult<T> = Result<T, DashError>;

impl DashError {
    /// 단일 메시지만 폐기하면 되는 에러인지 확인합니다.
    ///
    /// 디코딩/검증 실패는 연결이나 저장소 상태에 영향을 주지 않습니다.
    pub fn is_message_local(&self) -> bool {
        matches!(self, DashError::Decode(_) | DashError::Validation(_))
    }
}

impl From<serde_json::Error> for DashError {
    fn from(err: serde_json::Error) -> Self {
        DashError::Decode(err.to_string())
    }
}

impl From<config::ConfigError> for DashError {
    fn from(err: config::ConfigError) -> Self {
        DashError::Config(err.to_string())
    }
}
