//! 파이프라인 trait: 모듈 확장 포인트 정의

use std::fmt;
use std::future::Future;

use serde::Serialize;

use crate::error::{LogshieldError, ParseError};
use crate::types::{Alert, Event};

/// 로그 라인 파서 trait
///
/// 원시 텍스트 한 줄을 [`Event`]로 정규화합니다.
/// 공유 상태를 갖지 않아야 하며, 여러 수집 태스크에서 동시에 호출됩니다.
pub trait LogParser: Send + Sync {
    /// 지원하는 로그 형식 이름
    fn format_name(&self) -> &str;

    /// 한 줄을 이벤트로 파싱
    fn parse(&self, line: &str) -> Result<Event, ParseError>;
}

/// 상태를 갖는 탐지기 trait
///
/// 모든 탐지기 상태는 단일 소비자 태스크(알림 싱크)만 변경합니다.
/// 따라서 `&mut self`로 처리하며 내부에 락이 필요 없습니다.
pub trait Detector: Send + Sync {
    /// 탐지 규칙 ID
    fn rule_id(&self) -> &str;

    /// 이벤트를 처리하여 임계값 도달 시 알림을 반환
    ///
    /// 술어(predicate)에 맞지 않는 이벤트는 상태를 변경하지 않습니다.
    fn process(&mut self, event: &Event) -> Option<Alert>;

    /// 현재 윈도우 상태를 보유한 키 수
    fn tracked_keys(&self) -> usize;
}

/// 생명주기를 갖는 파이프라인 trait
pub trait Pipeline: Send {
    /// 파이프라인을 시작합니다.
    fn start(&mut self) -> impl Future<Output = Result<(), LogshieldError>> + Send;

    /// 파이프라인을 정지합니다.
    fn stop(&mut self) -> impl Future<Output = Result<(), LogshieldError>> + Send;

    /// 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// 모듈 건강 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작하지만 일부 기능 저하
    Degraded(String),
    /// 동작 불가
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 여부
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 동작 불가 여부
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}
