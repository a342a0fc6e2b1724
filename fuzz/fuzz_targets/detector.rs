#![no_main]

use arbitrary::Arbitrary;
use chrono::{TimeDelta, TimeZone, Utc};
use libfuzzer_sys::fuzz_target;

use logshield_core::pipeline::Detector;
use logshield_core::types::Event;
use logshield_pipeline::{RulePolicy, ThresholdDetector};

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    window_secs: u8,
    threshold: u8,
    max_keys: u8,
    /// 이벤트 목록 (최대 256개로 제한)
    events: Vec<FuzzEvent>,
}

#[derive(Arbitrary, Debug)]
struct FuzzEvent {
    /// 이전 이벤트 대비 시간 이동 (음수면 역순 도착)
    delta_secs: i8,
    ip: u8,
    failed: bool,
}

fuzz_target!(|input: FuzzInput| {
    let window_secs = u64::from(input.window_secs.max(1));
    let threshold = usize::from(input.threshold.max(1));
    let max_keys = usize::from(input.max_keys.max(1));

    let mut detector = ThresholdDetector::new(RulePolicy::SshBruteForce, window_secs, threshold)
        .with_max_keys(max_keys);

    let Some(base) = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).single() else {
        return;
    };
    let mut now = base;

    for ev in input.events.iter().take(256) {
        now += TimeDelta::seconds(i64::from(ev.delta_secs));

        let ip = format!("10.0.0.{}", ev.ip);
        let mut event = Event::new(now, "ssh");
        event.action = Some("auth".to_owned());
        event.status = Some(if ev.failed { "FAIL" } else { "OK" }.to_owned());
        event.ip = Some(ip.clone());

        let fired = detector.process(&event).is_some();

        // 발화한 키는 비워지고, 그 외에는 임계값 미만이어야 한다
        let remaining = detector.occurrences(&ip);
        if fired {
            assert_eq!(remaining, 0);
        } else {
            assert!(remaining < threshold);
        }
        assert!(detector.tracked_keys() <= max_keys);
    }
});
