//! 파일 기반 로그 수집기
//!
//! 로그 파일을 감시하며 새로운 라인이 추가되면 정규화하여 전달합니다.
//! `tail -F`와 유사한 동작을 비동기 방식으로 구현합니다.
//!
//! # 로테이션 감지
//! - inode/device 변경 감지 (logrotate 등): 남은 라인을 읽은 뒤 새 파일을 처음부터 다시 엽니다
//! - 파일 크기 축소 감지 (truncation): 오프셋 0으로 되감습니다
//! - 로테이션 직후 파일이 아직 없으면 다음 폴링까지 기다립니다
//!
//! # 실패
//! 시작 시 열기 실패와 복구 불가능한 읽기 실패는 [`IngestMessage::SourceFailure`]로
//! 한 번 보고되고 태스크가 종료됩니다. 다른 소스에는 영향이 없습니다.

use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use logshield_core::config::StartPosition;
use logshield_core::error::SourceError;
use logshield_core::metrics as m;
use logshield_core::pipeline::LogParser;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{IngestMessage, PauseGate, SourceStatus};
use crate::config::PipelineConfig;

/// 한 번에 읽는 바이트 수
const READ_CHUNK_SIZE: usize = 8 * 1024;

/// 파일 수집기 설정
#[derive(Debug, Clone)]
pub struct FileTailerConfig {
    /// 파일 상태 체크 주기
    pub poll_interval: Duration,
    /// 최대 라인 길이 (바이트)
    pub max_line_length: usize,
    /// 시작 위치
    pub start_position: StartPosition,
}

impl Default for FileTailerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            max_line_length: 64 * 1024, // 64KB
            start_position: StartPosition::End,
        }
    }
}

impl FileTailerConfig {
    /// 파이프라인 설정에서 수집기 설정을 생성합니다.
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            max_line_length: config.max_line_length,
            start_position: config.start_position,
        }
    }
}

/// 파일 식별자 (Unix: device + inode)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileIdentity {
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
}

#[cfg(unix)]
fn identity(meta: &std::fs::Metadata) -> Option<FileIdentity> {
    use std::os::unix::fs::MetadataExt;
    Some(FileIdentity {
        dev: meta.dev(),
        ino: meta.ino(),
    })
}

#[cfg(not(unix))]
fn identity(_meta: &std::fs::Metadata) -> Option<FileIdentity> {
    None
}

/// 파일별 추적 상태
#[derive(Debug)]
struct TailState {
    /// 마지막 읽기 위치 (바이트 오프셋)
    offset: u64,
    /// 개행을 아직 만나지 못한 부분 라인
    pending: Vec<u8>,
    /// 최대 길이를 넘은 라인을 개행까지 버리는 중
    discarding: bool,
    identity: Option<FileIdentity>,
}

impl TailState {
    fn new(offset: u64, identity: Option<FileIdentity>) -> Self {
        Self {
            offset,
            pending: Vec::new(),
            discarding: false,
            identity,
        }
    }

    fn rewind(&mut self) {
        self.offset = 0;
        self.pending.clear();
        self.discarding = false;
    }
}

/// 루프 계속 여부
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// 취소되었거나 싱크가 닫힘
    Stop,
}

/// 파일 기반 로그 수집기
///
/// 하나의 파일을 주기적으로 폴링하여 새로운 라인을 정규화한 뒤 전달합니다.
/// 라인 순서는 소스 안에서 보존됩니다.
pub struct FileTailer {
    path: PathBuf,
    source: Arc<str>,
    config: FileTailerConfig,
    parser: Arc<dyn LogParser>,
    tx: mpsc::Sender<IngestMessage>,
    gate: PauseGate,
    cancel: CancellationToken,
}

impl FileTailer {
    /// 새 파일 수집기를 생성합니다.
    pub fn new(
        path: impl Into<PathBuf>,
        config: FileTailerConfig,
        parser: Arc<dyn LogParser>,
        tx: mpsc::Sender<IngestMessage>,
        gate: PauseGate,
        cancel: CancellationToken,
    ) -> Self {
        let path = path.into();
        let source: Arc<str> = Arc::from(path.display().to_string());
        Self {
            path,
            source,
            config,
            parser,
            tx,
            gate,
            cancel,
        }
    }

    /// 취소되거나 실패할 때까지 파일을 추적합니다.
    ///
    /// `tokio::spawn`으로 별도 태스크에서 호출하세요.
    pub async fn run(self) -> SourceStatus {
        metrics::gauge!(m::INGEST_ACTIVE_SOURCES).increment(1.0);
        let status = self.tail().await;
        metrics::gauge!(m::INGEST_ACTIVE_SOURCES).decrement(1.0);

        debug!(source = %self.source, ?status, "source task finished");
        status
    }

    async fn tail(&self) -> SourceStatus {
        let (mut file, mut state) = match self.open_initial().await {
            Ok(opened) => opened,
            Err(e) => return self.fail(e).await,
        };

        info!(
            source = %self.source,
            offset = state.offset,
            "tailing source"
        );

        loop {
            match self.drain(&mut file, &mut state).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => return SourceStatus::Stopped,
                Err(e) => return self.fail(e).await,
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return SourceStatus::Stopped,
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }

            match self.check_rotation(&mut file, &mut state).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Stop) => return SourceStatus::Stopped,
                Err(e) => return self.fail(e).await,
            }
        }
    }

    async fn open_initial(&self) -> Result<(File, TailState), SourceError> {
        let mut file = File::open(&self.path)
            .await
            .map_err(|e| open_error(&self.path, &e))?;
        let meta = file
            .metadata()
            .await
            .map_err(|e| open_error(&self.path, &e))?;

        let offset = match self.config.start_position {
            StartPosition::End => file
                .seek(SeekFrom::End(0))
                .await
                .map_err(|e| open_error(&self.path, &e))?,
            StartPosition::Beginning => 0,
        };

        Ok((file, TailState::new(offset, identity(&meta))))
    }

    /// 현재 파일 끝까지 읽습니다.
    async fn drain(&self, file: &mut File, state: &mut TailState) -> Result<Flow, SourceError> {
        let mut buf = vec![0u8; READ_CHUNK_SIZE];
        loop {
            let read = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(Flow::Stop),
                result = file.read(&mut buf) => result,
            };
            let n = read.map_err(|e| read_error(&self.path, &e))?;
            if n == 0 {
                return Ok(Flow::Continue);
            }

            state.offset += n as u64;
            if self.consume(&buf[..n], state).await == Flow::Stop {
                return Ok(Flow::Stop);
            }
        }
    }

    /// 읽은 바이트를 라인 단위로 잘라 전달합니다.
    async fn consume(&self, chunk: &[u8], state: &mut TailState) -> Flow {
        for segment in chunk.split_inclusive(|&b| b == b'\n') {
            let complete = segment.last() == Some(&b'\n');
            let body = if complete {
                &segment[..segment.len() - 1]
            } else {
                segment
            };

            if !state.discarding {
                if state.pending.len() + body.len() > self.config.max_line_length {
                    state.discarding = true;
                    state.pending.clear();
                    metrics::counter!(m::INGEST_LINES_DROPPED_TOTAL).increment(1);
                    warn!(
                        source = %self.source,
                        max_line_length = self.config.max_line_length,
                        "line exceeds maximum length, dropping"
                    );
                } else {
                    state.pending.extend_from_slice(body);
                }
            }

            if !complete {
                continue;
            }
            if state.discarding {
                state.discarding = false;
                continue;
            }

            let text = String::from_utf8_lossy(&state.pending);
            let line = text.strip_suffix('\r').unwrap_or(&text).to_owned();
            state.pending.clear();
            if line.trim().is_empty() {
                continue;
            }
            if self.forward(line).await == Flow::Stop {
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    async fn forward(&self, line: String) -> Flow {
        metrics::counter!(m::INGEST_LINES_READ_TOTAL).increment(1);

        if self.gate.is_paused() {
            metrics::counter!(m::INGEST_LINES_DROPPED_TOTAL).increment(1);
            return Flow::Continue;
        }

        let msg = match self.parser.parse(&line) {
            Ok(event) => IngestMessage::Event {
                source: Arc::clone(&self.source),
                event,
            },
            Err(error) => IngestMessage::ParseFailure {
                source: Arc::clone(&self.source),
                line,
                error,
            },
        };
        self.send(msg).await
    }

    /// 채널이 가득 차면 대기합니다 (backpressure).
    async fn send(&self, msg: IngestMessage) -> Flow {
        tokio::select! {
            _ = self.cancel.cancelled() => Flow::Stop,
            result = self.tx.send(msg) => match result {
                Ok(()) => Flow::Continue,
                Err(_) => {
                    debug!(source = %self.source, "ingest channel closed, stopping source");
                    Flow::Stop
                }
            },
        }
    }

    /// 로테이션/truncation 여부를 확인하고 필요하면 다시 엽니다.
    async fn check_rotation(
        &self,
        file: &mut File,
        state: &mut TailState,
    ) -> Result<Flow, SourceError> {
        let meta = match tokio::fs::metadata(&self.path).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(source = %self.source, "source path missing, waiting for recreation");
                return Ok(Flow::Continue);
            }
            Err(e) => return Err(read_error(&self.path, &e)),
        };

        let current = identity(&meta);
        if current.is_some() && current != state.identity {
            // 이전 파일에 남은 라인을 먼저 읽음
            if self.drain(file, state).await? == Flow::Stop {
                return Ok(Flow::Stop);
            }

            *file = File::open(&self.path)
                .await
                .map_err(|e| open_error(&self.path, &e))?;
            state.rewind();
            state.identity = current;

            metrics::counter!(m::INGEST_ROTATIONS_TOTAL).increment(1);
            info!(source = %self.source, "source rotated, reopened from start");
        } else if meta.len() < state.offset {
            file.seek(SeekFrom::Start(0))
                .await
                .map_err(|e| read_error(&self.path, &e))?;
            state.rewind();

            metrics::counter!(m::INGEST_ROTATIONS_TOTAL).increment(1);
            info!(source = %self.source, "source truncated, rewinding");
        }

        Ok(Flow::Continue)
    }

    async fn fail(&self, error: SourceError) -> SourceStatus {
        let kind = match error {
            SourceError::Open { .. } => "open",
            SourceError::Read { .. } => "read",
        };
        metrics::counter!(m::INGEST_SOURCE_ERRORS_TOTAL, m::LABEL_KIND => kind).increment(1);
        warn!(source = %self.source, error = %error, "source failed, stopping");

        let status = SourceStatus::Failed(error.to_string());
        let msg = IngestMessage::SourceFailure {
            source: Arc::clone(&self.source),
            error,
        };
        // 싱크가 이미 닫혔다면 보고할 곳이 없음
        let _ = self.send(msg).await;
        status
    }
}

fn open_error(path: &Path, e: &io::Error) -> SourceError {
    SourceError::Open {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

fn read_error(path: &Path, e: &io::Error) -> SourceError {
    SourceError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}
