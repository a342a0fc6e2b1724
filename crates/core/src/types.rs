//! 도메인 타입: 시스템 전역에서 사용되는 공통 타입
//!
//! 정규화된 로그 이벤트([`Event`])와 탐지 결과([`Alert`])를 정의합니다.
//! 두 타입 모두 생성 후 변경되지 않으며, 파이프라인 단계 사이에서
//! 소유권이 이동(single-owner hand-off)합니다.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// 정규화된 보안 로그 이벤트
///
/// 노멀라이저가 한 번 생성하며 이후 변경되지 않습니다.
/// 선택 필드는 원본 라인에 없거나 값이 비어 있으면 `None`입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// 이벤트 발생 시각 (UTC로 정규화)
    pub timestamp: DateTime<Utc>,
    /// 서비스명 (auth, ssh, web 등), 항상 비어 있지 않음
    pub service: String,
    /// 동작 (login, auth 등)
    pub action: Option<String>,
    /// 사용자명
    pub user: Option<String>,
    /// 클라이언트 IP
    pub ip: Option<String>,
    /// 결과 상태 (FAIL, OK, 404 등)
    pub status: Option<String>,
    /// 요청 경로 (웹 로그)
    pub path: Option<String>,
    /// 원본 라인 (줄바꿈 문자만 제외, 앞뒤 공백 포함)
    pub raw: String,
}

impl Event {
    /// 필수 필드만으로 이벤트를 생성합니다.
    pub fn new(timestamp: DateTime<Utc>, service: impl Into<String>) -> Self {
        Self {
            timestamp,
            service: service.into(),
            action: None,
            user: None,
            ip: None,
            status: None,
            path: None,
            raw: String::new(),
        }
    }

    /// action 값을 반환합니다.
    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    /// ip 값을 반환합니다.
    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    /// status 값을 반환합니다.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// path 값을 반환합니다.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} service={} action={} user={} ip={} status={} path={}",
            self.timestamp.format("%H:%M:%S"),
            self.service,
            self.action().unwrap_or("-"),
            self.user.as_deref().unwrap_or("-"),
            self.ip().unwrap_or("-"),
            self.status().unwrap_or("-"),
            self.path().unwrap_or("-"),
        )
    }
}

/// 보안 알림
///
/// 탐지기가 생성하고 외부 프레젠테이션/리포트 계층이 소비합니다.
/// 한 번 발행된 알림은 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alert {
    /// 알림 ID (UUID v4)
    pub id: String,
    /// 알림 생성 시각 (벽시계)
    pub timestamp: DateTime<Utc>,
    /// 심각도
    pub severity: Severity,
    /// 알림 제목
    pub title: String,
    /// 사람이 읽는 본문
    pub body: String,
    /// 탐지 규칙 ID
    pub rule_id: String,
    /// 관련 IP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    /// 관련 서비스
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

impl Alert {
    /// 목록 표시용 한 줄 요약을 반환합니다.
    pub fn summary(&self) -> String {
        format!(
            "[{}] {}  ({})",
            self.severity.label(),
            self.title,
            self.timestamp.format("%H:%M:%S")
        )
    }
}

impl fmt::Display for Alert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} (rule: {}) at {}",
            self.severity,
            self.title,
            self.rule_id,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }
}

/// 심각도 레벨
///
/// `Ord` 구현으로 심각도 비교가 가능합니다 (`Low < Medium < High < Critical`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// 낮은 심각도
    Low,
    /// 중간 심각도
    #[default]
    Medium,
    /// 높은 심각도
    High,
    /// 치명적, 즉시 대응 필요
    Critical,
}

impl Severity {
    /// 대문자 표시 레이블 (`HIGH` 등)
    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// 메트릭 레이블 등에 쓰이는 소문자 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_alert() -> Alert {
        Alert {
            id: "a-1".to_owned(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
            severity: Severity::High,
            title: "SSH brute force suspected".to_owned(),
            body: "IP: 10.0.0.1".to_owned(),
            rule_id: "SSH_BRUTE_FORCE".to_owned(),
            ip: Some("10.0.0.1".to_owned()),
            service: None,
        }
    }

    #[test]
    fn severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn alert_serializes_lowercase_severity_and_skips_missing_fields() {
        let json = serde_json::to_value(sample_alert()).unwrap();
        assert_eq!(json["severity"], "high");
        assert_eq!(json["rule_id"], "SSH_BRUTE_FORCE");
        assert_eq!(json["ip"], "10.0.0.1");
        assert!(json.get("service").is_none());
    }

    #[test]
    fn alert_summary_format() {
        let summary = sample_alert().summary();
        assert_eq!(summary, "[HIGH] SSH brute force suspected  (12:00:00)");
    }

    #[test]
    fn event_display_uses_dash_for_missing_fields() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 15, 8, 30, 5).unwrap();
        let event = Event::new(ts, "auth");
        let text = event.to_string();
        assert!(text.starts_with("08:30:05 service=auth"));
        assert!(text.contains("ip=-"));
    }
}
