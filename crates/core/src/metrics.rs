//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logshield_`
//! - 모듈명: `ingest_`, `detection_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(logshield_core::metrics::INGEST_LINES_READ_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 심각도 레이블 키 (low, medium, high, critical)
pub const LABEL_SEVERITY: &str = "severity";

/// 규칙 ID 레이블 키
pub const LABEL_RULE: &str = "rule";

/// 에러 종류 레이블 키 (open, read)
pub const LABEL_KIND: &str = "kind";

// ─── Ingest 메트릭 ─────────────────────────────────────────────────

/// Ingest: 모든 소스에서 읽은 비어 있지 않은 라인 수 (counter)
pub const INGEST_LINES_READ_TOTAL: &str = "logshield_ingest_lines_read_total";

/// Ingest: 길이 초과 또는 일시정지로 소스에서 버려진 라인 수 (counter)
pub const INGEST_LINES_DROPPED_TOTAL: &str = "logshield_ingest_lines_dropped_total";

/// Ingest: 소스 에러 수 (counter, label: kind)
pub const INGEST_SOURCE_ERRORS_TOTAL: &str = "logshield_ingest_source_errors_total";

/// Ingest: 파일 로테이션/truncation 감지 횟수 (counter)
pub const INGEST_ROTATIONS_TOTAL: &str = "logshield_ingest_rotations_total";

/// Ingest: 현재 실행 중인 소스 태스크 수 (gauge)
pub const INGEST_ACTIVE_SOURCES: &str = "logshield_ingest_active_sources";

// ─── Detection 메트릭 ───────────────────────────────────────────────

/// Detection: 탐지기를 통과한 이벤트 수 (counter)
pub const DETECTION_EVENTS_PROCESSED_TOTAL: &str = "logshield_detection_events_processed_total";

/// Detection: 파싱 에러 수 (counter)
pub const DETECTION_PARSE_ERRORS_TOTAL: &str = "logshield_detection_parse_errors_total";

/// Detection: 발행된 알림 수 (counter, labels: rule, severity)
pub const DETECTION_ALERTS_TOTAL: &str = "logshield_detection_alerts_total";

/// Detection: 규칙별 윈도우 상태 키 수 (gauge, label: rule)
pub const DETECTION_TRACKED_KEYS: &str = "logshield_detection_tracked_keys";

/// Detection: 이벤트 한 건 처리 지연 시간 (histogram, 초)
pub const DETECTION_PROCESSING_DURATION_SECONDS: &str =
    "logshield_detection_processing_duration_seconds";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "logshield_daemon_uptime_seconds";

/// Daemon: 리포트 저장 실패 수 (counter)
pub const DAEMON_REPORT_ERRORS_TOTAL: &str = "logshield_daemon_report_errors_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `logshield-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    // Ingest
    describe_counter!(
        INGEST_LINES_READ_TOTAL,
        "Total number of non-empty log lines read from all sources"
    );
    describe_counter!(
        INGEST_LINES_DROPPED_TOTAL,
        "Total number of lines dropped at the source (oversized or paused)"
    );
    describe_counter!(
        INGEST_SOURCE_ERRORS_TOTAL,
        "Total number of source open/read failures"
    );
    describe_counter!(
        INGEST_ROTATIONS_TOTAL,
        "Total number of detected file rotations and truncations"
    );
    describe_gauge!(
        INGEST_ACTIVE_SOURCES,
        "Number of source tailing tasks currently running"
    );

    // Detection
    describe_counter!(
        DETECTION_EVENTS_PROCESSED_TOTAL,
        "Total number of normalized events evaluated by the detectors"
    );
    describe_counter!(
        DETECTION_PARSE_ERRORS_TOTAL,
        "Total number of lines rejected by the normalizer"
    );
    describe_counter!(
        DETECTION_ALERTS_TOTAL,
        "Total number of alerts emitted, by rule and severity"
    );
    describe_gauge!(
        DETECTION_TRACKED_KEYS,
        "Number of grouping keys holding sliding-window state, by rule"
    );
    describe_histogram!(
        DETECTION_PROCESSING_DURATION_SECONDS,
        "Time to run one event through all detectors in seconds"
    );

    // Daemon
    describe_gauge!(DAEMON_UPTIME_SECONDS, "Daemon uptime in seconds");
    describe_counter!(
        DAEMON_REPORT_ERRORS_TOTAL,
        "Total number of failed report saves"
    );
}
