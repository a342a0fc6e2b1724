//! LogShield 로그 파이프라인
//!
//! 여러 로그 파일을 동시에 추적하고, 각 라인을 [`Event`](logshield_core::types::Event)로
//! 정규화한 뒤, 슬라이딩 윈도우 임계값 규칙으로 평가하여 알림을 생성합니다.
//!
//! # 모듈 구성
//!
//! - [`collector`]: 파일 추적 태스크와 소스 다중화, 일시정지 게이트
//! - [`normalizer`]: `<timestamp> key=value ...` 라인 정규화
//! - [`window`]: 키별 슬라이딩 윈도우 카운터 (모든 규칙이 공유)
//! - [`rule`]: 로그인/SSH 브루트포스, 웹 경로 열거 규칙
//! - [`alert`]: 임계값 도달 결과를 알림으로 변환
//! - [`history`]: 표시용 bounded 알림 히스토리
//! - [`sink`]: 모든 탐지기 상태를 소유하는 단일 소비자 액터
//! - [`pipeline`]: 전체 파이프라인 오케스트레이션 (Pipeline trait 구현)
//! - [`config`]: 파이프라인 설정 (core 설정 확장)
//! - [`error`]: 도메인 에러 타입
//!
//! # 아키텍처
//!
//! ```text
//! FileTailer x N -> mpsc -> AlertSink -> [login, ssh, web] detectors -> mpsc -> presenter
//!     |                         |                  |
//!  Normalizer            pause gate        SlidingWindow<ip>
//! ```

pub mod alert;
pub mod config;
pub mod error;
pub mod history;
pub mod normalizer;
pub mod pipeline;
pub mod sink;
pub mod window;

pub mod collector;
pub mod rule;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{LogPipeline, LogPipelineBuilder};

// 설정
pub use config::{PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::LogPipelineError;

// 정규화
pub use normalizer::KeyValueNormalizer;

// 탐지
pub use rule::{RulePolicy, ThresholdDetector, build_detectors};
pub use window::{Observation, SlidingWindow};

// 수집기
pub use collector::{IngestMessage, PauseGate, SourceMultiplexer};

// 싱크
pub use history::AlertHistory;
pub use sink::{AlertSink, SinkHandle, SinkOutput, SinkStats};
