//! 로그 수집 모듈 -- 여러 파일 소스를 동시에 추적합니다.
//!
//! # 수집 소스
//! - [`FileTailer`]: 파일 추적 (`tail -F` 방식, 로테이션/truncation 대응)
//! - [`SourceMultiplexer`]: 소스마다 [`FileTailer`] 태스크 하나씩 스폰
//!
//! # 아키텍처
//! 각 소스는 자체 tokio 태스크에서 실행되며, 정규화된 결과를
//! 하나의 bounded `mpsc::Sender<IngestMessage>` 채널로 보냅니다.
//! 채널이 가득 차면 수집 태스크가 대기합니다 (드롭하지 않음).
//!
//! ```text
//! file A -> FileTailer --\
//! file B -> FileTailer ----> mpsc<IngestMessage> -> AlertSink
//! file C -> FileTailer --/
//! ```

pub mod file;
pub mod multiplexer;

pub use file::{FileTailer, FileTailerConfig};
pub use multiplexer::SourceMultiplexer;

use std::sync::Arc;

use logshield_core::error::{ParseError, SourceError};
use logshield_core::types::Event;
use tokio::sync::watch;

/// 수집 태스크가 싱크로 보내는 메시지
#[derive(Debug, Clone)]
pub enum IngestMessage {
    /// 정규화된 이벤트
    Event {
        /// 소스 식별자 (파일 경로)
        source: Arc<str>,
        /// 이벤트
        event: Event,
    },
    /// 정규화 실패한 라인
    ParseFailure {
        /// 소스 식별자
        source: Arc<str>,
        /// 원본 라인
        line: String,
        /// 실패 사유
        error: ParseError,
    },
    /// 소스 태스크 종료를 유발한 실패
    SourceFailure {
        /// 소스 식별자
        source: Arc<str>,
        /// 실패 사유
        error: SourceError,
    },
}

/// 수집 소스 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceStatus {
    /// 실행 중
    Running,
    /// 에러로 중단됨
    Failed(String),
    /// 정상 종료됨 (취소)
    Stopped,
}

/// 일시정지 게이트
///
/// 수집 태스크와 싱크가 같은 플래그를 공유합니다.
/// 일시정지 중에는 라인이 탐지기에 도달하지 않지만 탐지기 상태는 그대로 유지됩니다.
#[derive(Debug, Clone)]
pub struct PauseGate {
    tx: Arc<watch::Sender<bool>>,
}

impl PauseGate {
    /// 실행 상태(일시정지 아님)로 새 게이트를 생성합니다.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// 일시정지합니다.
    pub fn pause(&self) {
        self.set_paused(true);
    }

    /// 재개합니다.
    pub fn resume(&self) {
        self.set_paused(false);
    }

    /// 상태를 반전하고 새 상태(일시정지 여부)를 반환합니다.
    pub fn toggle(&self) -> bool {
        let mut now_paused = false;
        self.tx.send_modify(|paused| {
            *paused = !*paused;
            now_paused = *paused;
        });
        tracing::info!(paused = now_paused, "pause state changed");
        now_paused
    }

    /// 일시정지 여부를 설정하고 이전 상태를 반환합니다.
    pub fn set_paused(&self, paused: bool) -> bool {
        let previous = self.tx.send_replace(paused);
        if previous != paused {
            tracing::info!(paused, "pause state changed");
        }
        previous
    }

    /// 현재 일시정지 중인지 확인합니다.
    pub fn is_paused(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new()
    }
}
