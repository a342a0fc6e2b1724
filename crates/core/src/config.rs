//! 설정 관리: logshield.toml 파싱 및 런타임 설정
//!
//! [`LogshieldConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`LOGSHIELD_INGEST_POLL_INTERVAL_MS=500` 형식)
//! 3. 설정 파일 (`logshield.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), logshield_core::error::LogshieldError> {
//! use logshield_core::config::LogshieldConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드
//! let config = LogshieldConfig::load("logshield.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = LogshieldConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, LogshieldError};

/// LogShield 통합 설정
///
/// `logshield.toml` 파일의 최상위 구조를 나타냅니다.
/// 각 모듈은 자기 섹션만 읽어 사용합니다.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogshieldConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 수집 설정
    #[serde(default)]
    pub ingest: IngestConfig,
    /// 탐지 규칙 설정
    #[serde(default)]
    pub detection: DetectionConfig,
    /// 리포트 저장 설정
    #[serde(default)]
    pub report: ReportConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl LogshieldConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, LogshieldError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, LogshieldError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LogshieldError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                LogshieldError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, LogshieldError> {
        toml::from_str(toml_str).map_err(|e| {
            LogshieldError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `LOGSHIELD_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "LOGSHIELD_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LOGSHIELD_GENERAL_LOG_FORMAT");

        // Ingest
        override_csv(&mut self.ingest.sources, "LOGSHIELD_INGEST_SOURCES");
        override_usize(
            &mut self.ingest.channel_capacity,
            "LOGSHIELD_INGEST_CHANNEL_CAPACITY",
        );
        override_u64(
            &mut self.ingest.poll_interval_ms,
            "LOGSHIELD_INGEST_POLL_INTERVAL_MS",
        );
        override_usize(
            &mut self.ingest.max_line_length,
            "LOGSHIELD_INGEST_MAX_LINE_LENGTH",
        );
        if let Ok(val) = std::env::var("LOGSHIELD_INGEST_START_POSITION") {
            match val.as_str() {
                "end" => self.ingest.start_position = StartPosition::End,
                "beginning" => self.ingest.start_position = StartPosition::Beginning,
                _ => warn!(
                    env_key = "LOGSHIELD_INGEST_START_POSITION",
                    value = val.as_str(),
                    "unknown start position in env var, ignoring"
                ),
            }
        }

        // Detection
        override_usize(
            &mut self.detection.history_limit,
            "LOGSHIELD_DETECTION_HISTORY_LIMIT",
        );
        override_usize(
            &mut self.detection.max_keys_per_rule,
            "LOGSHIELD_DETECTION_MAX_KEYS_PER_RULE",
        );
        override_rule(
            &mut self.detection.login_brute_force,
            "LOGSHIELD_DETECTION_LOGIN_BRUTE_FORCE",
        );
        override_rule(
            &mut self.detection.ssh_brute_force,
            "LOGSHIELD_DETECTION_SSH_BRUTE_FORCE",
        );
        override_rule(
            &mut self.detection.web_enumeration,
            "LOGSHIELD_DETECTION_WEB_ENUMERATION",
        );

        // Report
        override_string(&mut self.report.path, "LOGSHIELD_REPORT_PATH");
        override_bool(&mut self.report.save_on_exit, "LOGSHIELD_REPORT_SAVE_ON_EXIT");

        // Metrics
        override_bool(&mut self.metrics.enabled, "LOGSHIELD_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "LOGSHIELD_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "LOGSHIELD_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogshieldError> {
        // log_level 검증
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        // log_format 검증
        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.ingest.sources.iter().all(|s| s.trim().is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "ingest.sources".to_owned(),
                reason: "at least one source must be configured".to_owned(),
            }
            .into());
        }

        if self.ingest.channel_capacity == 0 {
            return Err(invalid("ingest.channel_capacity", "must be greater than 0"));
        }
        if self.ingest.poll_interval_ms == 0 {
            return Err(invalid("ingest.poll_interval_ms", "must be greater than 0"));
        }
        if self.ingest.max_line_length == 0 {
            return Err(invalid("ingest.max_line_length", "must be greater than 0"));
        }
        if self.detection.history_limit == 0 {
            return Err(invalid("detection.history_limit", "must be greater than 0"));
        }
        if self.detection.max_keys_per_rule == 0 {
            return Err(invalid(
                "detection.max_keys_per_rule",
                "must be greater than 0",
            ));
        }

        for (name, rule) in self.detection.rules() {
            if rule.window_secs == 0 {
                return Err(invalid(
                    &format!("detection.{name}.window_secs"),
                    "must be greater than 0",
                ));
            }
            if rule.threshold == 0 {
                return Err(invalid(
                    &format!("detection.{name}.threshold"),
                    "must be greater than 0",
                ));
            }
        }

        if self.report.path.trim().is_empty() {
            return Err(invalid("report.path", "must not be empty"));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: &str) -> LogshieldError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.to_owned(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 수집 시작 위치
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartPosition {
    /// 파일 끝에서 시작 (새로 추가되는 라인만 수집)
    #[default]
    End,
    /// 파일 처음부터 재생한 뒤 계속 추적
    Beginning,
}

/// 수집 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// 소스 경로 또는 패턴 (`./logs/*.log`, 디렉토리, 파일)
    pub sources: Vec<String>,
    /// 다중화 채널 용량 (가득 차면 수집 태스크가 대기)
    pub channel_capacity: usize,
    /// 파일 상태 체크 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 최대 라인 길이 (바이트)
    pub max_line_length: usize,
    /// 시작 위치
    pub start_position: StartPosition,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            sources: vec!["./logs/*.log".to_owned()],
            channel_capacity: 1024,
            poll_interval_ms: 250,
            max_line_length: 64 * 1024, // 64KB
            start_position: StartPosition::End,
        }
    }
}

/// 단일 임계값 규칙 설정
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    /// 활성화 여부
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 슬라이딩 윈도우 길이 (초)
    pub window_secs: u64,
    /// 알림 임계값 (윈도우 내 발생 횟수)
    pub threshold: usize,
}

fn default_true() -> bool {
    true
}

impl RuleConfig {
    /// 활성화된 규칙 설정을 생성합니다.
    pub fn new(window_secs: u64, threshold: usize) -> Self {
        Self {
            enabled: true,
            window_secs,
            threshold,
        }
    }
}

/// 탐지 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// 표시용 알림 히스토리 최대 개수
    pub history_limit: usize,
    /// 규칙당 윈도우 상태 키 최대 개수 (메모리 상한)
    pub max_keys_per_rule: usize,
    /// 로그인 브루트포스
    pub login_brute_force: RuleConfig,
    /// SSH 브루트포스
    pub ssh_brute_force: RuleConfig,
    /// 웹 경로 열거
    pub web_enumeration: RuleConfig,
}

impl DetectionConfig {
    /// 규칙 이름과 설정을 고정 순서로 반환합니다.
    pub fn rules(&self) -> [(&'static str, &RuleConfig); 3] {
        [
            ("login_brute_force", &self.login_brute_force),
            ("ssh_brute_force", &self.ssh_brute_force),
            ("web_enumeration", &self.web_enumeration),
        ]
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            history_limit: 100,
            max_keys_per_rule: 100_000,
            login_brute_force: RuleConfig::new(20, 5),
            ssh_brute_force: RuleConfig::new(30, 6),
            web_enumeration: RuleConfig::new(30, 4),
        }
    }
}

/// 리포트 저장 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// JSON 리포트 경로
    pub path: String,
    /// 종료 시 자동 저장
    pub save_on_exit: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            path: "report.json".to_owned(),
            save_on_exit: false,
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 경로 (현재 `/metrics`만 지원)
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9100,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    override_parsed(target, env_key);
}

fn override_usize(target: &mut usize, env_key: &str) {
    override_parsed(target, env_key);
}

fn override_u64(target: &mut u64, env_key: &str) {
    override_parsed(target, env_key);
}

fn override_u16(target: &mut u16, env_key: &str) {
    override_parsed(target, env_key);
}

fn override_parsed<T: std::str::FromStr>(target: &mut T, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse value from env var, ignoring"
            ),
        }
    }
}

fn override_rule(target: &mut RuleConfig, prefix: &str) {
    override_bool(&mut target.enabled, &format!("{prefix}_ENABLED"));
    override_u64(&mut target.window_secs, &format!("{prefix}_WINDOW_SECS"));
    override_usize(&mut target.threshold, &format!("{prefix}_THRESHOLD"));
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
