//! 설정 관리.
//!
//! 기본값 → 설정 파일(선택) → `DASH__` 접두사 환경 변수 순으로 병합합니다.
//!
//! ```toml
//! [sync]
//! ws_url = "ws://localhost:8080/ws"
//! reconnect_delay_ms = 3000
//! channels = ["stock_quotes", "sales"]
//!
//! [api]
//! base_url = "http://localhost:8080"
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::Domain;
use crate::error::DashResult;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 실시간 동기화 설정
    #[serde(default)]
    pub sync: SyncConfig,
    /// REST API(백필) 설정
    #[serde(default)]
    pub api: ApiConfig,
    /// 저장소 설정
    #[serde(default)]
    pub store: StoreConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// 실시간 채널 동기화 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// WebSocket 엔드포인트
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// 재연결 대기 시간 (밀리초)
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// 시작 시 구독할 채널 목록
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
}

fn default_ws_url() -> String {
    "ws://localhost:8080/ws".to_string()
}
fn default_reconnect_delay() -> u64 {
    3000
}
fn default_channels() -> Vec<String> {
    Domain::ALL.iter().map(|d| d.channel().to_string()).collect()
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            reconnect_delay_ms: default_reconnect_delay(),
            channels: default_channels(),
        }
    }
}

impl SyncConfig {
    /// 재연결 대기 시간을 Duration으로 반환
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

/// 히스토리 조회용 REST API 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// API 기본 URL
    #[serde(default = "default_api_url")]
    pub base_url: String,
    /// 요청 타임아웃 (초)
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}
fn default_api_timeout() -> u64 {
    10
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_api_url(),
            timeout_secs: default_api_timeout(),
        }
    }
}

impl ApiConfig {
    /// 요청 타임아웃을 Duration으로 반환
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// 저장소 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// 도메인별 히스토리 최대 길이
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// 최근 수신 피드 최대 길이
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
}

fn default_history_capacity() -> usize {
    crate::store::DEFAULT_HISTORY_CAPACITY
}
fn default_feed_capacity() -> usize {
    crate::store::DEFAULT_FEED_CAPACITY
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            feed_capacity: default_feed_capacity(),
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    #[serde(default = "default_log_level")]
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl AppConfig {
    /// 설정 파일(선택)과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 주어지지 않거나 존재하지 않으면 기본값과 환경 변수만 사용합니다.
    pub fn load(path: Option<&Path>) -> DashResult<Self> {
        let mut builder = config::Config::builder()
            .set_default("sync.ws_url", default_ws_url())?
            .set_default("sync.reconnect_delay_ms", default_reconnect_delay())?
            .set_default("api.base_url", default_api_url())?;

        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("DASH")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("sync.channels")
                    .try_parsing(true),
            )
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    /// 기본 경로(`config/dashsync.toml`)에서 설정을 로드합니다.
    pub fn load_default() -> DashResult<Self> {
        Self::load(Some(Path::new("config/dashsync.toml")))
    }

    fn validate(&self) -> DashResult<()> {
        if self.store.history_capacity == 0 {
            return Err(crate::DashError::Config(
                "store.history_capacity는 1 이상이어야 합니다".to_string(),
            ));
        }
        if !(self.sync.ws_url.starts_with("ws://") || self.sync.ws_url.starts_with("wss://")) {
            return Err(crate::DashError::Config(format!(
                "지원하지 않는 WebSocket URL: {}",
                self.sync.ws_url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.sync.reconnect_delay(), Duration::from_millis(3000));
        assert_eq!(config.store.history_capacity, 1000);
        assert_eq!(config.store.feed_capacity, 100);
        assert_eq!(
            config.sync.channels,
            vec!["stock_quotes", "sales", "user_events", "financial_metrics"]
        );
    }

    #[test]
    fn test_load_without_file() {
        let config = AppConfig::load(None).unwrap();
        assert!(config.sync.ws_url.starts_with("ws"));
        assert_eq!(config.api.timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_validate_rejects_zero_capacity() {
        let mut config = AppConfig::default();
        config.store.history_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_http_ws_url() {
        let mut config = AppConfig::default();
        config.sync.ws_url = "http://localhost:8080/ws".to_string();
        assert!(config.validate().is_err());
    }
}
