//! 알림 생성 -- 임계값 도달 결과를 [`Alert`]로 변환합니다.

use chrono::{DateTime, SecondsFormat, Utc};
use logshield_core::types::Alert;

use crate::rule::RulePolicy;
use crate::window::Observation;

/// 임계값 도달 시 알림을 생성합니다.
///
/// 알림 시각은 이벤트 시각이 아니라 생성 시점의 벽시계입니다.
/// 본문에는 키, 횟수, 윈도우 길이, 최초/마지막 발생 시각, 설명이 들어갑니다.
pub fn threshold_alert(
    policy: RulePolicy,
    key: &str,
    observation: &Observation,
    window_secs: u64,
    service: &str,
) -> Alert {
    Alert {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp: Utc::now(),
        severity: policy.severity(),
        title: policy.title().to_owned(),
        body: format_body(policy, key, observation, window_secs),
        rule_id: policy.rule_id().to_owned(),
        ip: Some(key.to_owned()),
        service: Some(service.to_owned()),
    }
}

fn format_body(
    policy: RulePolicy,
    key: &str,
    observation: &Observation,
    window_secs: u64,
) -> String {
    format!(
        "IP: {key}\n\
         {label}: {count} ({window_secs}s window)\n\
         First seen: {first}\n\
         Last seen: {last}\n\
         Description: {description}",
        label = policy.count_label(),
        count = observation.count,
        first = rfc3339(observation.first),
        last = rfc3339(observation.last),
        description = policy.description(),
    )
}

fn rfc3339(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}
