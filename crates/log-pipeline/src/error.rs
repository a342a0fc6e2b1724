//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 로그 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<LogPipelineError> for LogshieldError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! 라인 단위 파싱 실패와 소스 단위 실패는 이 타입이 아니라
//! core의 [`ParseError`](logshield_core::error::ParseError),
//! [`SourceError`](logshield_core::error::SourceError)로 표현되며
//! 파이프라인을 멈추지 않습니다.

use logshield_core::error::{LogshieldError, PipelineError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 생명주기 에러 (이미 실행 중, 실행 중이 아님 등)
    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),

    /// 백그라운드 태스크 join 실패
    #[error("task join error: {0}")]
    Join(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<LogPipelineError> for LogshieldError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Channel(msg) => {
                LogshieldError::Pipeline(PipelineError::ChannelSend(msg))
            }
            LogPipelineError::Io(e) => LogshieldError::Io(e),
            other => LogshieldError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}
