//! 임계값 탐지기 -- 규칙 정책 + 슬라이딩 윈도우

use std::time::Duration;

use logshield_core::config::{DetectionConfig, RuleConfig};
use logshield_core::pipeline::Detector;
use logshield_core::types::{Alert, Event};

use crate::alert::threshold_alert;
use crate::rule::RulePolicy;
use crate::window::SlidingWindow;

/// 규칙 하나에 대응하는 상태 보유 탐지기
///
/// 술어에 맞고 그룹화 키가 있는 이벤트만 윈도우에 기록합니다.
/// 키의 횟수가 임계값에 도달하면 알림을 만들고 해당 키를 초기화하여
/// 다음 알림에는 새 누적이 필요하도록 합니다.
#[derive(Debug)]
pub struct ThresholdDetector {
    policy: RulePolicy,
    threshold: usize,
    window_secs: u64,
    window: SlidingWindow<String>,
}

impl ThresholdDetector {
    /// 새 탐지기를 생성합니다.
    pub fn new(policy: RulePolicy, window_secs: u64, threshold: usize) -> Self {
        Self {
            policy,
            threshold: threshold.max(1),
            window_secs,
            window: SlidingWindow::new(Duration::from_secs(window_secs)),
        }
    }

    /// 규칙 설정에서 탐지기를 생성합니다.
    pub fn from_config(policy: RulePolicy, config: &RuleConfig) -> Self {
        Self::new(policy, config.window_secs, config.threshold)
    }

    /// 윈도우의 최대 추적 키 수를 설정합니다.
    pub fn with_max_keys(mut self, max_keys: usize) -> Self {
        self.window = self.window.with_max_keys(max_keys);
        self
    }

    /// 규칙 정책
    pub fn policy(&self) -> RulePolicy {
        self.policy
    }

    /// 임계값
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// 키의 현재 누적 횟수
    pub fn occurrences(&self, key: &str) -> usize {
        self.window.occurrences(&key.to_owned())
    }
}

impl Detector for ThresholdDetector {
    fn rule_id(&self) -> &str {
        self.policy.rule_id()
    }

    fn process(&mut self, event: &Event) -> Option<Alert> {
        if !self.policy.matches(event) {
            return None;
        }
        let key = self.policy.group_key(event)?;

        let observation = self.window.observe(key.to_owned(), event.timestamp);
        if observation.count < self.threshold {
            return None;
        }

        let alert = threshold_alert(
            self.policy,
            key,
            &observation,
            self.window_secs,
            &event.service,
        );
        self.window.reset(&key.to_owned());

        tracing::info!(
            rule_id = self.policy.rule_id(),
            ip = key,
            count = observation.count,
            "threshold reached"
        );

        Some(alert)
    }

    fn tracked_keys(&self) -> usize {
        self.window.tracked_keys()
    }
}

/// 탐지 설정에서 활성화된 탐지기를 고정 순서(login, ssh, web)로 생성합니다.
pub fn build_detectors(config: &DetectionConfig) -> Vec<ThresholdDetector> {
    RulePolicy::ALL
        .into_iter()
        .filter_map(|policy| {
            let rule = match policy {
                RulePolicy::LoginBruteForce => &config.login_brute_force,
                RulePolicy::SshBruteForce => &config.ssh_brute_force,
                RulePolicy::WebEnumeration => &config.web_enumeration,
            };
            if !rule.enabled {
                tracing::info!(rule = policy.config_name(), "detection rule disabled");
                return None;
            }
            Some(
                ThresholdDetector::from_config(policy, rule)
                    .with_max_keys(config.max_keys_per_rule),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    fn login_fail(ip: &str, secs: i64) -> Event {
        let mut ev = Event::new(at(secs), "auth");
        ev.action = Some("login".to_owned());
        ev.status = Some("FAIL".to_owned());
        ev.ip = Some(ip.to_owned());
        ev
    }

    fn ssh_fail(ip: &str, secs: i64) -> Event {
        let mut ev = Event::new(at(secs), "ssh");
        ev.action = Some("auth".to_owned());
        ev.status = Some("FAIL".to_owned());
        ev.ip = Some(ip.to_owned());
        ev
    }

    fn web_probe(ip: &str, secs: i64, path: &str, status: &str) -> Event {
        let mut ev = Event::new(at(secs), "web");
        ev.path = Some(path.to_owned());
        ev.status = Some(status.to_owned());
        ev.ip = Some(ip.to_owned());
        ev
    }

    #[test]
    fn threshold_minus_one_does_not_fire() {
        let mut det = ThresholdDetector::new(RulePolicy::LoginBruteForce, 20, 5);
        for i in 0..4 {
            assert!(det.process(&login_fail("1.1.1.1", i)).is_none());
        }
        assert_eq!(det.occurrences("1.1.1.1"), 4);
    }

    #[test]
    fn threshold_fires_exactly_once_and_resets_key() {
        let mut det = ThresholdDetector::new(RulePolicy::LoginBruteForce, 20, 5);
        let alerts: Vec<Alert> = (0..5)
            .filter_map(|i| det.process(&login_fail("1.1.1.1", i)))
            .collect();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].rule_id, "BRUTE_FORCE_LOGIN");
        assert!(alerts[0].body.contains("Failed logins: 5 (20s window)"));

        // 억제: 다음 이벤트는 1부터 다시 카운트
        assert!(det.process(&login_fail("1.1.1.1", 5)).is_none());
        assert_eq!(det.occurrences("1.1.1.1"), 1);
    }

    #[test]
    fn boundary_event_counts_and_fires_at_window_edge() {
        let mut det = ThresholdDetector::new(RulePolicy::LoginBruteForce, 20, 5);
        let mut fired_at = Vec::new();
        for secs in [0, 5, 10, 15, 20, 25] {
            if det.process(&login_fail("1.1.1.1", secs)).is_some() {
                fired_at.push(secs);
            }
        }
        // 0s는 [0s, 20s] 안에 남아 있으므로 20s에 발화, 25s는 새 누적
        assert_eq!(fired_at, vec![20]);
        assert_eq!(det.occurrences("1.1.1.1"), 1);
    }

    #[test]
    fn spread_out_events_never_fire() {
        let mut det = ThresholdDetector::new(RulePolicy::SshBruteForce, 30, 6);
        for i in 0..20 {
            assert!(det.process(&ssh_fail("2.2.2.2", i * 10)).is_none());
        }
    }

    #[test]
    fn non_matching_events_do_not_touch_state() {
        let mut det = ThresholdDetector::new(RulePolicy::SshBruteForce, 30, 6);
        let mut ok = ssh_fail("2.2.2.2", 0);
        ok.status = Some("OK".to_owned());
        det.process(&ok);
        det.process(&login_fail("2.2.2.2", 1));
        assert_eq!(det.tracked_keys(), 0);
    }

    #[test]
    fn event_without_ip_is_ignored() {
        let mut det = ThresholdDetector::new(RulePolicy::LoginBruteForce, 20, 1);
        let mut ev = login_fail("x", 0);
        ev.ip = None;
        assert!(det.process(&ev).is_none());
        assert_eq!(det.tracked_keys(), 0);
    }

    #[test]
    fn keys_accumulate_independently() {
        let mut det = ThresholdDetector::new(RulePolicy::WebEnumeration, 30, 4);
        for i in 0..3 {
            assert!(det.process(&web_probe("a", i, "/admin", "403")).is_none());
            assert!(det.process(&web_probe("b", i, "/.env", "404")).is_none());
        }
        let alert = det.process(&web_probe("b", 4, "/.env", "404")).unwrap();
        assert_eq!(alert.ip.as_deref(), Some("b"));
        assert_eq!(alert.service.as_deref(), Some("web"));
        assert_eq!(det.occurrences("a"), 3);
    }

    #[test]
    fn build_detectors_uses_fixed_order_and_skips_disabled() {
        let mut config = DetectionConfig::default();
        let all: Vec<String> = build_detectors(&config)
            .iter()
            .map(|d| d.rule_id().to_owned())
            .collect();
        assert_eq!(
            all,
            vec!["BRUTE_FORCE_LOGIN", "SSH_BRUTE_FORCE", "WEB_ENUMERATION"]
        );

        config.ssh_brute_force.enabled = false;
        let detectors = build_detectors(&config);
        assert_eq!(detectors.len(), 2);
        assert_eq!(detectors[1].policy(), RulePolicy::WebEnumeration);
    }

    #[test]
    fn build_detectors_applies_overrides() {
        let mut config = DetectionConfig::default();
        config.login_brute_force = RuleConfig::new(60, 2);
        let mut detectors = build_detectors(&config);
        let login = &mut detectors[0];
        assert_eq!(login.threshold(), 2);
        assert!(login.process(&login_fail("9.9.9.9", 0)).is_none());
        assert!(login.process(&login_fail("9.9.9.9", 50)).is_some());
    }
}
