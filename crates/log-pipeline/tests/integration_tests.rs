//! 통합 테스트 -- 파이프라인 전체 흐름 검증
//!
//! 실제 파일을 추적하여 수집부터 알림 생성까지의 흐름을 검증합니다.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;

use logshield_core::config::{RuleConfig, StartPosition};
use logshield_core::pipeline::{HealthStatus, Pipeline};
use logshield_core::types::{Alert, Severity};
use logshield_pipeline::{
    LogPipeline, LogPipelineBuilder, PipelineConfig, PipelineConfigBuilder, SinkOutput,
};

const RECV_TIMEOUT: Duration = Duration::from_secs(5);

fn test_config() -> PipelineConfig {
    PipelineConfigBuilder::new()
        .poll_interval_ms(10)
        .start_position(StartPosition::Beginning)
        .build()
        .expect("valid config")
}

fn login_failure(ip: &str, second: u32) -> String {
    format!("2024-01-15T12:00:{second:02}Z service=auth action=login user=admin ip={ip} status=FAIL")
}

fn write_lines(path: &Path, lines: &[String]) {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .expect("open log file");
    for line in lines {
        writeln!(file, "{line}").expect("write line");
    }
    file.flush().expect("flush");
}

fn build(
    config: PipelineConfig,
    sources: Vec<PathBuf>,
) -> (LogPipeline, mpsc::Receiver<SinkOutput>) {
    let (pipeline, rx) = LogPipelineBuilder::new()
        .config(config)
        .sources(sources)
        .build()
        .expect("build pipeline");
    (pipeline, rx.expect("builder creates output channel"))
}

async fn next_alert(rx: &mut mpsc::Receiver<SinkOutput>) -> Alert {
    loop {
        let output = tokio::time::timeout(RECV_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for alert")
            .expect("output channel closed");
        if let SinkOutput::Alert(alert) = output {
            return alert;
        }
    }
}

/// 지정 시간 동안 도착한 알림을 모두 모읍니다.
async fn drain_alerts(rx: &mut mpsc::Receiver<SinkOutput>, wait: Duration) -> Vec<Alert> {
    let mut alerts = Vec::new();
    let deadline = tokio::time::Instant::now() + wait;
    while let Ok(Some(output)) = tokio::time::timeout_at(deadline, rx.recv()).await {
        if let SinkOutput::Alert(alert) = output {
            alerts.push(alert);
        }
    }
    alerts
}

#[tokio::test]
async fn login_failures_in_file_produce_alert() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auth.log");
    let lines: Vec<String> = (0..5).map(|i| login_failure("10.0.0.5", i)).collect();
    write_lines(&path, &lines);

    let (mut pipeline, mut rx) = build(test_config(), vec![path]);
    pipeline.start().await.unwrap();

    let alert = next_alert(&mut rx).await;
    assert_eq!(alert.rule_id, "BRUTE_FORCE_LOGIN");
    assert_eq!(alert.severity, Severity::High);
    assert_eq!(alert.ip.as_deref(), Some("10.0.0.5"));
    assert!(alert.body.contains("Failed logins: 5 (20s window)"));
    assert!(alert.body.contains("First seen: 2024-01-15T12:00:00Z"));
    assert!(alert.body.contains("Last seen: 2024-01-15T12:00:04Z"));

    pipeline.stop().await.unwrap();
    let stats = pipeline.final_stats().expect("final stats after stop");
    assert_eq!(stats.events_total, 5);
    assert_eq!(stats.alerts_total, 1);
}

#[tokio::test]
async fn lines_appended_after_start_are_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ssh.log");
    write_lines(&path, &[]);

    let (mut pipeline, mut rx) = build(test_config(), vec![path.clone()]);
    pipeline.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let lines: Vec<String> = (0..6)
        .map(|i| format!("2024-01-15T12:00:{i:02}Z service=ssh action=auth ip=203.0.113.9 status=FAIL"))
        .collect();
    write_lines(&path, &lines);

    let alert = next_alert(&mut rx).await;
    assert_eq!(alert.rule_id, "SSH_BRUTE_FORCE");
    assert!(alert.body.contains("Failed SSH auths: 6 (30s window)"));

    pipeline.stop().await.unwrap();
}

#[tokio::test]
async fn same_ip_across_sources_shares_one_window() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.log");
    let b = dir.path().join("b.log");
    write_lines(&a, &(0..3).map(|i| login_failure("198.51.100.7", i)).collect::<Vec<_>>());
    write_lines(&b, &(3..5).map(|i| login_failure("198.51.100.7", i)).collect::<Vec<_>>());

    let (mut pipeline, mut rx) = build(test_config(), vec![a, b]);
    pipeline.start().await.unwrap();

    let alerts = drain_alerts(&mut rx, Duration::from_millis(500)).await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].rule_id, "BRUTE_FORCE_LOGIN");

    pipeline.stop().await.unwrap();
}

#[tokio::test]
async fn concurrent_writers_cross_threshold_at_expected_points() {
    const IP: &str = "198.51.100.23";
    const PACE: Duration = Duration::from_millis(40);

    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a.log");
    let b = dir.path().join("b.log");
    write_lines(&a, &[]);
    write_lines(&b, &[]);

    let (mut pipeline, mut rx) = build(test_config(), vec![a.clone(), b.clone()]);
    pipeline.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    // a.log에 짝수 초, b.log에 홀수 초를 번갈아 기록
    let (to_b, mut b_turn) = mpsc::channel::<()>(1);
    let (to_a, mut a_turn) = mpsc::channel::<()>(1);

    let writer_a = tokio::spawn(async move {
        for second in (0..10).step_by(2) {
            write_lines(&a, &[login_failure(IP, second)]);
            tokio::time::sleep(PACE).await;
            to_b.send(()).await.unwrap();
            a_turn.recv().await.unwrap();
        }
    });
    let writer_b = tokio::spawn(async move {
        for second in (1..10).step_by(2) {
            b_turn.recv().await.unwrap();
            write_lines(&b, &[login_failure(IP, second)]);
            tokio::time::sleep(PACE).await;
            to_a.send(()).await.unwrap();
        }
    });
    writer_a.await.unwrap();
    writer_b.await.unwrap();

    let alerts = drain_alerts(&mut rx, Duration::from_millis(500)).await;
    assert_eq!(alerts.len(), 2);
    for alert in &alerts {
        assert_eq!(alert.ip.as_deref(), Some(IP));
        assert!(alert.body.contains("Failed logins: 5 (20s window)"));
    }
    assert!(alerts[0].body.contains("First seen: 2024-01-15T12:00:00Z"));
    assert!(alerts[0].body.contains("Last seen: 2024-01-15T12:00:04Z"));
    assert!(alerts[1].body.contains("First seen: 2024-01-15T12:00:05Z"));
    assert!(alerts[1].body.contains("Last seen: 2024-01-15T12:00:09Z"));

    pipeline.stop().await.unwrap();
    let stats = pipeline.final_stats().expect("final stats after stop");
    assert_eq!(stats.events_total, 10);
    assert_eq!(stats.alerts_total, 2);
}

#[tokio::test]
async fn mixed_traffic_fires_each_rule_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mixed.log");
    let mut lines = Vec::new();
    for i in 0..5 {
        lines.push(login_failure("10.0.0.1", i));
    }
    for i in 0..6 {
        lines.push(format!(
            "2024-01-15T12:00:{:02}Z service=ssh action=auth ip=10.0.0.2 status=FAIL",
            10 + i
        ));
    }
    for (i, target) in ["/wp-login.php", "/admin", "/.env", "/phpmyadmin/index.php"]
        .iter()
        .enumerate()
    {
        lines.push(format!(
            "2024-01-15T12:00:{:02}Z service=web ip=10.0.0.3 path={target} status=404",
            20 + i
        ));
    }
    // 매칭되지 않는 정상 트래픽
    lines.push("2024-01-15T12:00:30Z service=web ip=10.0.0.3 path=/index.html status=200".to_owned());
    lines.push("2024-01-15T12:00:31Z service=auth action=login ip=10.0.0.1 status=OK".to_owned());
    write_lines(&path, &lines);

    let (mut pipeline, mut rx) = build(test_config(), vec![path]);
    pipeline.start().await.unwrap();

    let alerts = drain_alerts(&mut rx, Duration::from_millis(500)).await;
    let rule_ids: Vec<&str> = alerts.iter().map(|a| a.rule_id.as_str()).collect();
    assert_eq!(
        rule_ids,
        vec!["BRUTE_FORCE_LOGIN", "SSH_BRUTE_FORCE", "WEB_ENUMERATION"]
    );
    assert_eq!(alerts[2].severity, Severity::Medium);

    pipeline.stop().await.unwrap();
}

#[tokio::test]
async fn malformed_lines_become_advisories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.log");
    write_lines(
        &path,
        &[
            "not-a-timestamp service=auth".to_owned(),
            "2024-01-15T12:00:00Z action=login".to_owned(),
        ],
    );

    let (mut pipeline, mut rx) = build(test_config(), vec![path]);
    let control = pipeline.control();
    pipeline.start().await.unwrap();

    let mut advisories = Vec::new();
    while advisories.len() < 2 {
        let output = tokio::time::timeout(RECV_TIMEOUT, rx.recv())
            .await
            .unwrap()
            .unwrap();
        if let SinkOutput::Advisory(text) = output {
            advisories.push(text);
        }
    }
    assert!(advisories.iter().all(|a| a.starts_with("parse error")));

    let stats = control.stats().await.unwrap();
    assert_eq!(stats.parse_errors, 2);
    assert_eq!(stats.events_total, 2);
    assert_eq!(stats.alerts_total, 0);

    pipeline.stop().await.unwrap();
}

#[tokio::test]
async fn paused_pipeline_ignores_lines_until_resumed() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auth.log");
    write_lines(&path, &[]);

    let (mut pipeline, mut rx) = build(test_config(), vec![path.clone()]);
    let control = pipeline.control();
    control.pause();
    pipeline.start().await.unwrap();

    write_lines(&path, &(0..5).map(|i| login_failure("10.9.9.9", i)).collect::<Vec<_>>());
    let alerts = drain_alerts(&mut rx, Duration::from_millis(300)).await;
    assert!(alerts.is_empty());

    let stats = control.stats().await.unwrap();
    assert!(stats.paused);
    assert_eq!(stats.events_total, 0);

    // 재개 후에는 새로 추가된 라인만 처리
    control.resume();
    write_lines(&path, &(10..15).map(|i| login_failure("10.9.9.9", i)).collect::<Vec<_>>());
    let alert = next_alert(&mut rx).await;
    assert!(alert.body.contains("First seen: 2024-01-15T12:00:10Z"));

    pipeline.stop().await.unwrap();
}

#[tokio::test]
async fn snapshot_and_reset_through_control_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auth.log");
    write_lines(&path, &(0..5).map(|i| login_failure("10.0.0.5", i)).collect::<Vec<_>>());

    let (mut pipeline, mut rx) = build(test_config(), vec![path]);
    let control = pipeline.control();
    pipeline.start().await.unwrap();

    let alert = next_alert(&mut rx).await;
    let snapshot = control.snapshot_alerts().await.unwrap();
    assert_eq!(snapshot.len(), 1);
    assert_eq!(snapshot[0].id, alert.id);

    control.reset().await.unwrap();
    assert!(control.snapshot_alerts().await.unwrap().is_empty());
    let stats = control.stats().await.unwrap();
    assert_eq!(stats.alerts_total, 0);
    assert_eq!(stats.events_total, 0);

    pipeline.stop().await.unwrap();
    assert!(control.snapshot_alerts().await.is_err());
}

#[tokio::test]
async fn missing_source_degrades_health() {
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.log");
    write_lines(&good, &[]);
    let missing = dir.path().join("missing.log");

    let (mut pipeline, mut rx) = build(test_config(), vec![good, missing]);
    assert!(pipeline.health_check().await.is_unhealthy());
    pipeline.start().await.unwrap();

    let output = tokio::time::timeout(RECV_TIMEOUT, rx.recv())
        .await
        .unwrap()
        .unwrap();
    match output {
        SinkOutput::Advisory(text) => assert!(text.starts_with("source error")),
        SinkOutput::Alert(alert) => panic!("unexpected alert: {alert}"),
    }

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(
        pipeline.health_check().await,
        HealthStatus::Degraded("1 of 2 sources terminated".to_owned())
    );
    assert_eq!(pipeline.live_sources(), 1);

    pipeline.stop().await.unwrap();
    assert!(pipeline.health_check().await.is_unhealthy());
}

#[tokio::test]
async fn disabled_rule_never_fires() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auth.log");
    write_lines(&path, &(0..10).map(|i| login_failure("10.0.0.5", i)).collect::<Vec<_>>());

    let mut rule = RuleConfig::new(20, 5);
    rule.enabled = false;
    let config = PipelineConfigBuilder::new()
        .poll_interval_ms(10)
        .start_position(StartPosition::Beginning)
        .login_brute_force(rule)
        .build()
        .unwrap();

    let (mut pipeline, mut rx) = build(config, vec![path]);
    pipeline.start().await.unwrap();

    let alerts = drain_alerts(&mut rx, Duration::from_millis(300)).await;
    assert!(alerts.is_empty());

    pipeline.stop().await.unwrap();
    let stats = pipeline.final_stats().unwrap();
    assert_eq!(stats.events_total, 10);
    assert!(stats.tracked_keys.iter().all(|(rule, _)| rule != "BRUTE_FORCE_LOGIN"));
}

#[tokio::test]
async fn stopped_pipeline_cannot_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("auth.log");
    write_lines(&path, &[]);

    let (mut pipeline, _rx) = build(test_config(), vec![path]);
    pipeline.start().await.unwrap();
    assert!(pipeline.start().await.is_err());
    pipeline.stop().await.unwrap();
    assert!(pipeline.stop().await.is_err());
    assert!(pipeline.start().await.is_err());
    assert_eq!(pipeline.state_name(), "stopped");
}
