//! 탐지 규칙 정책 타입
//!
//! 각 규칙은 매칭 술어, 그룹화 키 추출, 알림 문구만 제공합니다.
//! 윈도우 카운팅과 억제는 모든 규칙이 [`SlidingWindow`](crate::window::SlidingWindow)
//! 하나로 공유합니다.

use logshield_core::types::{Event, Severity};

/// 웹 경로 열거에서 민감하다고 보는 경로 조각 (부분 문자열 매칭)
pub const SENSITIVE_PATHS: &[&str] = &["/wp-login", "/admin", "/.env", "phpmyadmin"];

/// 웹 경로 열거에서 실패로 보는 HTTP 상태
pub const ERROR_STATUSES: &[&str] = &["401", "403", "404"];

/// 컴파일 타임에 고정된 규칙 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RulePolicy {
    /// service=auth action=login status=FAIL
    LoginBruteForce,
    /// service=ssh action=auth status=FAIL
    SshBruteForce,
    /// service=web, 민감 경로 + 4xx 상태
    WebEnumeration,
}

impl RulePolicy {
    /// 처리 순서대로 모든 규칙을 반환합니다.
    pub const ALL: [RulePolicy; 3] = [
        RulePolicy::LoginBruteForce,
        RulePolicy::SshBruteForce,
        RulePolicy::WebEnumeration,
    ];

    /// 알림에 기록되는 규칙 ID
    pub fn rule_id(&self) -> &'static str {
        match self {
            Self::LoginBruteForce => "BRUTE_FORCE_LOGIN",
            Self::SshBruteForce => "SSH_BRUTE_FORCE",
            Self::WebEnumeration => "WEB_ENUMERATION",
        }
    }

    /// 설정 파일의 섹션 이름 (`[detection.<name>]`)
    pub fn config_name(&self) -> &'static str {
        match self {
            Self::LoginBruteForce => "login_brute_force",
            Self::SshBruteForce => "ssh_brute_force",
            Self::WebEnumeration => "web_enumeration",
        }
    }

    /// 알림 제목
    pub fn title(&self) -> &'static str {
        match self {
            Self::LoginBruteForce => "Login brute force suspected",
            Self::SshBruteForce => "SSH brute force suspected",
            Self::WebEnumeration => "Web path enumeration suspected",
        }
    }

    /// 알림 심각도
    pub fn severity(&self) -> Severity {
        match self {
            Self::LoginBruteForce | Self::SshBruteForce => Severity::High,
            Self::WebEnumeration => Severity::Medium,
        }
    }

    /// 알림 본문의 설명 문장
    pub fn description(&self) -> &'static str {
        match self {
            Self::LoginBruteForce => {
                "Login failures from the same IP repeated within a short period."
            }
            Self::SshBruteForce => {
                "SSH authentication failures from the same IP repeated within a short period."
            }
            Self::WebEnumeration => {
                "Requests for admin pages or environment files repeatedly failed."
            }
        }
    }

    /// 본문에서 횟수 앞에 붙는 이름
    pub fn count_label(&self) -> &'static str {
        match self {
            Self::LoginBruteForce => "Failed logins",
            Self::SshBruteForce => "Failed SSH auths",
            Self::WebEnumeration => "Sensitive path probes",
        }
    }

    /// 이벤트가 규칙의 술어에 맞는지 확인합니다.
    pub fn matches(&self, event: &Event) -> bool {
        match self {
            Self::LoginBruteForce => {
                event.service == "auth"
                    && event.action() == Some("login")
                    && event.status() == Some("FAIL")
            }
            Self::SshBruteForce => {
                event.service == "ssh"
                    && event.action() == Some("auth")
                    && event.status() == Some("FAIL")
            }
            Self::WebEnumeration => {
                event.service == "web"
                    && event.path().is_some_and(is_sensitive_path)
                    && event.status().is_some_and(is_error_status)
            }
        }
    }

    /// 윈도우 그룹화 키 (클라이언트 IP). 없으면 상태를 건드리지 않습니다.
    pub fn group_key<'a>(&self, event: &'a Event) -> Option<&'a str> {
        event.ip()
    }
}

/// 경로가 민감 경로 조각 중 하나를 포함하는지 확인합니다.
pub fn is_sensitive_path(path: &str) -> bool {
    SENSITIVE_PATHS.iter().any(|target| path.contains(target))
}

/// 상태가 401/403/404 중 하나인지 확인합니다.
pub fn is_error_status(status: &str) -> bool {
    ERROR_STATUSES.contains(&status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn event(service: &str, action: Option<&str>, status: Option<&str>) -> Event {
        let mut ev = Event::new(Utc::now(), service);
        ev.action = action.map(str::to_owned);
        ev.status = status.map(str::to_owned);
        ev.ip = Some("10.0.0.1".to_owned());
        ev
    }

    #[test]
    fn login_predicate() {
        let policy = RulePolicy::LoginBruteForce;
        assert!(policy.matches(&event("auth", Some("login"), Some("FAIL"))));
        assert!(!policy.matches(&event("auth", Some("login"), Some("OK"))));
        assert!(!policy.matches(&event("ssh", Some("login"), Some("FAIL"))));
        assert!(!policy.matches(&event("auth", None, Some("FAIL"))));
    }

    #[test]
    fn ssh_predicate() {
        let policy = RulePolicy::SshBruteForce;
        assert!(policy.matches(&event("ssh", Some("auth"), Some("FAIL"))));
        assert!(!policy.matches(&event("ssh", Some("login"), Some("FAIL"))));
    }

    #[test]
    fn web_predicate_needs_sensitive_path_and_error_status() {
        let policy = RulePolicy::WebEnumeration;
        let mut ev = event("web", None, Some("404"));
        ev.path = Some("/blog/wp-login.php".to_owned());
        assert!(policy.matches(&ev));

        ev.status = Some("200".to_owned());
        assert!(!policy.matches(&ev));

        ev.status = Some("403".to_owned());
        ev.path = Some("/index.html".to_owned());
        assert!(!policy.matches(&ev));

        ev.path = None;
        assert!(!policy.matches(&ev));
    }

    #[test]
    fn sensitive_path_is_substring_match() {
        assert!(is_sensitive_path("/phpmyadmin/index.php"));
        assert!(is_sensitive_path("/app/.env"));
        assert!(is_sensitive_path("/administrator"));
        assert!(!is_sensitive_path("/login"));
    }

    #[test]
    fn metadata_matches_rule_table() {
        assert_eq!(RulePolicy::LoginBruteForce.rule_id(), "BRUTE_FORCE_LOGIN");
        assert_eq!(RulePolicy::SshBruteForce.severity(), Severity::High);
        assert_eq!(RulePolicy::WebEnumeration.severity(), Severity::Medium);
        assert_eq!(RulePolicy::WebEnumeration.config_name(), "web_enumeration");
    }

    #[test]
    fn group_key_is_ip() {
        let mut ev = event("ssh", Some("auth"), Some("FAIL"));
        assert_eq!(RulePolicy::SshBruteForce.group_key(&ev), Some("10.0.0.1"));
        ev.ip = None;
        assert_eq!(RulePolicy::SshBruteForce.group_key(&ev), None);
    }
}
