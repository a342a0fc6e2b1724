//! LogShield 공통 크레이트
//!
//! 모든 LogShield 크레이트가 공유하는 도메인 타입, 에러, 설정, 확장 trait,
//! 메트릭 이름을 정의합니다.
//!
//! # 모듈 구성
//!
//! - [`types`]: [`Event`], [`Alert`], [`Severity`]
//! - [`error`]: 에러 분류 ([`ParseError`], [`SourceError`], [`SinkError`] 등)
//! - [`config`]: `logshield.toml` 설정
//! - [`pipeline`]: [`LogParser`], [`Detector`], [`Pipeline`] trait
//! - [`metrics`]: 메트릭 이름 상수

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{
    ConfigError, LogshieldError, ParseError, PipelineError, SinkError, SourceError,
};

// 설정
pub use config::LogshieldConfig;

// 파이프라인 trait
pub use pipeline::{Detector, HealthStatus, LogParser, Pipeline};

// 도메인 타입
pub use types::{Alert, Event, Severity};
