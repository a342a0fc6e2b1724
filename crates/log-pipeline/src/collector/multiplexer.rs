//! 소스 다중화 -- 소스마다 수집 태스크를 스폰하고 추적합니다.

use std::path::PathBuf;
use std::sync::Arc;

use logshield_core::pipeline::LogParser;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{FileTailer, FileTailerConfig, IngestMessage, PauseGate, SourceStatus};

/// 실행 중인 소스 태스크
struct SourceTask {
    path: PathBuf,
    handle: JoinHandle<SourceStatus>,
}

/// N개의 파일 소스 → 하나의 채널
///
/// 각 소스는 독립된 태스크이므로 한 소스의 실패가 다른 소스에 영향을 주지 않습니다.
pub struct SourceMultiplexer {
    config: FileTailerConfig,
    parser: Arc<dyn LogParser>,
    gate: PauseGate,
    tasks: Vec<SourceTask>,
    /// 종료된 태스크의 최종 상태
    finished: Vec<(PathBuf, SourceStatus)>,
}

impl SourceMultiplexer {
    /// 새 다중화기를 생성합니다.
    pub fn new(config: FileTailerConfig, parser: Arc<dyn LogParser>, gate: PauseGate) -> Self {
        Self {
            config,
            parser,
            gate,
            tasks: Vec::new(),
            finished: Vec::new(),
        }
    }

    /// 소스마다 수집 태스크를 스폰합니다.
    ///
    /// 각 태스크는 `tx`의 복제본을 가지므로, 모든 태스크가 종료되면
    /// 수신측이 닫힙니다.
    pub fn spawn_all(
        &mut self,
        sources: &[PathBuf],
        tx: &mpsc::Sender<IngestMessage>,
        cancel: &CancellationToken,
    ) {
        for path in sources {
            let tailer = FileTailer::new(
                path.clone(),
                self.config.clone(),
                Arc::clone(&self.parser),
                tx.clone(),
                self.gate.clone(),
                cancel.child_token(),
            );
            let handle = tokio::spawn(tailer.run());
            self.tasks.push(SourceTask {
                path: path.clone(),
                handle,
            });
        }

        tracing::info!(sources = sources.len(), "source tasks spawned");
    }

    /// 등록된 전체 소스 수
    pub fn total(&self) -> usize {
        self.tasks.len() + self.finished.len()
    }

    /// 아직 실행 중인 소스 수
    pub fn live(&self) -> usize {
        self.tasks.iter().filter(|t| !t.handle.is_finished()).count()
    }

    /// 종료된 소스 경로 목록
    pub fn terminated(&self) -> Vec<PathBuf> {
        self.tasks
            .iter()
            .filter(|t| t.handle.is_finished())
            .map(|t| t.path.clone())
            .chain(self.finished.iter().map(|(p, _)| p.clone()))
            .collect()
    }

    /// 모든 태스크가 끝날 때까지 기다리고 최종 상태를 반환합니다.
    ///
    /// 취소 토큰을 먼저 취소한 뒤 호출해야 합니다.
    pub async fn join_all(&mut self) -> Vec<(PathBuf, SourceStatus)> {
        for task in self.tasks.drain(..) {
            let status = match task.handle.await {
                Ok(status) => status,
                Err(e) => {
                    tracing::error!(source = %task.path.display(), error = %e, "source task panicked");
                    SourceStatus::Failed(e.to_string())
                }
            };
            self.finished.push((task.path, status));
        }
        std::mem::take(&mut self.finished)
    }

    /// 모든 태스크를 즉시 중단합니다.
    pub fn abort_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.handle.abort();
        }
        self.finished.clear();
    }
}
