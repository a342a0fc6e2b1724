//! 에러 타입: 도메인별 에러 정의
//!
//! 이 크레이트의 어떤 에러도 프로세스를 종료시키지 않습니다.
//! 파싱/소스/싱크 에러는 모두 권고(advisory) 메시지로 UI에 전달되고
//! 파이프라인은 계속 동작합니다.

/// LogShield 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum LogshieldError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// 로그 라인 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 로그 소스 에러
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// 알림 싱크(리포트 저장) 에러
    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 생명주기/채널 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 이미 실행 중
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("pipeline not running")]
    NotRunning,

    /// 채널 전송 실패
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 채널 수신 실패
    #[error("channel receive failed: {0}")]
    ChannelRecv(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),
}

/// 로그 라인 정규화 실패
///
/// 잘못된 라인은 카운트되고 건너뜁니다. 파이프라인은 멈추지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// 공백만 있는 라인
    #[error("empty line")]
    EmptyLine,

    /// 토큰 수 부족 (타임스탬프 + 최소 1개 필드 필요)
    #[error("bad format: expected '<timestamp> key=value ...'")]
    BadFormat,

    /// 첫 토큰이 RFC 3339 타임스탬프가 아님
    #[error("bad timestamp '{token}': {reason}")]
    BadTimestamp { token: String, reason: String },

    /// service 필드 누락
    #[error("missing service field")]
    MissingService,
}

/// 로그 소스 에러
///
/// 한 소스의 실패는 해당 소스 태스크에만 국한됩니다.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    /// 소스를 열 수 없음, 한 번 보고되고 태스크 종료
    #[error("failed to open source {path}: {reason}")]
    Open { path: String, reason: String },

    /// 복구 불가능한 읽기 실패, Open과 동일하게 태스크 종료
    #[error("failed to read source {path}: {reason}")]
    Read { path: String, reason: String },
}

impl SourceError {
    /// 에러가 발생한 소스 경로를 반환합니다.
    pub fn path(&self) -> &str {
        match self {
            Self::Open { path, .. } | Self::Read { path, .. } => path,
        }
    }
}

/// 알림 스냅샷 직렬화/저장 에러
///
/// 보고만 되며 실시간 탐지에는 영향을 주지 않습니다.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// 직렬화 실패
    #[error("failed to serialize alerts: {0}")]
    Serialize(#[from] serde_json::Error),

    /// 파일 쓰기 실패
    #[error("failed to write report {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// 저장할 알림이 없음
    #[error("no alerts to save")]
    Empty,
}
