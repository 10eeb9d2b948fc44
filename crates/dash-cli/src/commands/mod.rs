//! CLI 명령어 구현 모듈.

pub mod backfill;
pub mod summary;
pub mod watch;
