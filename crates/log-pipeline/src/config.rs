//! 로그 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`LogshieldConfig`](logshield_core::config::LogshieldConfig)
//! 중 `[ingest]`, `[detection]` 섹션을 기반으로 파이프라인 전용 설정을 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use logshield_core::config::LogshieldConfig;
//! use logshield_pipeline::config::PipelineConfig;
//!
//! let core_config = LogshieldConfig::default();
//! let config = PipelineConfig::from_core(&core_config);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use logshield_core::config::{DetectionConfig, LogshieldConfig, RuleConfig, StartPosition};

use crate::error::LogPipelineError;

/// 로그 파이프라인 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// 다중화 채널 용량
    pub channel_capacity: usize,
    /// 파일 상태 체크 주기 (밀리초)
    pub poll_interval_ms: u64,
    /// 최대 라인 길이 (바이트)
    pub max_line_length: usize,
    /// 수집 시작 위치
    pub start_position: StartPosition,
    /// 탐지 규칙 및 히스토리 설정
    pub detection: DetectionConfig,

    // --- 확장 설정 (core에 없는 추가 필드) ---
    /// 프레젠테이션 채널 용량
    pub output_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_core(&LogshieldConfig::default())
    }
}

impl PipelineConfig {
    /// core 설정에서 파이프라인 설정을 생성합니다.
    ///
    /// core 설정에 없는 확장 필드는 기본값이 적용됩니다.
    pub fn from_core(core: &LogshieldConfig) -> Self {
        Self {
            channel_capacity: core.ingest.channel_capacity,
            poll_interval_ms: core.ingest.poll_interval_ms,
            max_line_length: core.ingest.max_line_length,
            start_position: core.ingest.start_position,
            detection: core.detection.clone(),
            output_capacity: 256,
        }
    }

    /// 파일 폴링 주기
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        const MAX_CHANNEL_CAPACITY: usize = 1_000_000;
        const MAX_POLL_INTERVAL_MS: u64 = 60_000;
        const MAX_LINE_LENGTH: usize = 16 * 1024 * 1024; // 16MB
        const MAX_HISTORY_LIMIT: usize = 100_000;
        const MAX_WINDOW_SECS: u64 = 86_400; // 1 day

        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(LogPipelineError::Config {
                field: "channel_capacity".to_owned(),
                reason: format!("must be 1-{}", MAX_CHANNEL_CAPACITY),
            });
        }

        if self.output_capacity == 0 || self.output_capacity > MAX_CHANNEL_CAPACITY {
            return Err(LogPipelineError::Config {
                field: "output_capacity".to_owned(),
                reason: format!("must be 1-{}", MAX_CHANNEL_CAPACITY),
            });
        }

        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(LogPipelineError::Config {
                field: "poll_interval_ms".to_owned(),
                reason: format!("must be 1-{}", MAX_POLL_INTERVAL_MS),
            });
        }

        if self.max_line_length == 0 || self.max_line_length > MAX_LINE_LENGTH {
            return Err(LogPipelineError::Config {
                field: "max_line_length".to_owned(),
                reason: format!("must be 1-{}", MAX_LINE_LENGTH),
            });
        }

        if self.detection.history_limit == 0 || self.detection.history_limit > MAX_HISTORY_LIMIT {
            return Err(LogPipelineError::Config {
                field: "history_limit".to_owned(),
                reason: format!("must be 1-{}", MAX_HISTORY_LIMIT),
            });
        }

        if self.detection.max_keys_per_rule == 0 {
            return Err(LogPipelineError::Config {
                field: "max_keys_per_rule".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        for (name, rule) in self.detection.rules() {
            if rule.window_secs == 0 || rule.window_secs > MAX_WINDOW_SECS {
                return Err(LogPipelineError::Config {
                    field: format!("{name}.window_secs"),
                    reason: format!("must be 1-{}", MAX_WINDOW_SECS),
                });
            }
            if rule.threshold == 0 {
                return Err(LogPipelineError::Config {
                    field: format!("{name}.threshold"),
                    reason: "must be greater than 0".to_owned(),
                });
            }
        }

        Ok(())
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 다중화 채널 용량을 설정합니다.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// 프레젠테이션 채널 용량을 설정합니다.
    pub fn output_capacity(mut self, capacity: usize) -> Self {
        self.config.output_capacity = capacity;
        self
    }

    /// 폴링 주기(밀리초)를 설정합니다.
    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    /// 최대 라인 길이를 설정합니다.
    pub fn max_line_length(mut self, len: usize) -> Self {
        self.config.max_line_length = len;
        self
    }

    /// 수집 시작 위치를 설정합니다.
    pub fn start_position(mut self, position: StartPosition) -> Self {
        self.config.start_position = position;
        self
    }

    /// 알림 히스토리 최대 개수를 설정합니다.
    pub fn history_limit(mut self, limit: usize) -> Self {
        self.config.detection.history_limit = limit;
        self
    }

    /// 규칙당 최대 추적 키 수를 설정합니다.
    pub fn max_keys_per_rule(mut self, max: usize) -> Self {
        self.config.detection.max_keys_per_rule = max;
        self
    }

    /// 로그인 브루트포스 규칙을 설정합니다.
    pub fn login_brute_force(mut self, rule: RuleConfig) -> Self {
        self.config.detection.login_brute_force = rule;
        self
    }

    /// SSH 브루트포스 규칙을 설정합니다.
    pub fn ssh_brute_force(mut self, rule: RuleConfig) -> Self {
        self.config.detection.ssh_brute_force = rule;
        self
    }

    /// 웹 경로 열거 규칙을 설정합니다.
    pub fn web_enumeration(mut self, rule: RuleConfig) -> Self {
        self.config.detection.web_enumeration = rule;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
