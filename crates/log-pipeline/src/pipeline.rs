//! 파이프라인 오케스트레이션 -- 수집/정규화/탐지/알림의 전체 흐름을 관리합니다.
//!
//! [`LogPipeline`]은 core의 [`Pipeline`](logshield_core::pipeline::Pipeline) trait을 구현하여
//! `logshield-daemon`에서 start/stop/health_check 생명주기로 관리됩니다.
//!
//! # 내부 아키텍처
//! ```text
//! FileTailer x N -> mpsc<IngestMessage> -> AlertSink (detectors) -> mpsc<SinkOutput> -> downstream
//!                                              ^
//!                                 SinkHandle --+ (pause/resume/reset/snapshot/stats)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use logshield_core::error::{LogshieldError, PipelineError};
use logshield_core::pipeline::{Detector, HealthStatus, LogParser, Pipeline};

use crate::collector::{FileTailerConfig, PauseGate, SourceMultiplexer};
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::normalizer::KeyValueNormalizer;
use crate::rule::build_detectors;
use crate::sink::{AlertSink, SinkCommand, SinkHandle, SinkOutput, SinkStats};

/// 제어 명령 채널 용량
const COMMAND_CHANNEL_CAPACITY: usize = 16;

/// 파이프라인 실행 상태
#[derive(Debug, Clone, PartialEq, Eq)]
enum PipelineState {
    /// 초기화됨, 아직 시작하지 않음
    Initialized,
    /// 실행 중
    Running,
    /// 정지됨
    Stopped,
}

/// 로그 파이프라인
///
/// # 사용 예시
/// ```ignore
/// use logshield_pipeline::{LogPipeline, LogPipelineBuilder};
///
/// let (mut pipeline, output_rx) = LogPipelineBuilder::new()
///     .config(config)
///     .sources(paths)
///     .build()?;
///
/// let control = pipeline.control();
/// pipeline.start().await?;
/// ```
pub struct LogPipeline {
    config: PipelineConfig,
    state: PipelineState,
    sources: Vec<PathBuf>,
    gate: PauseGate,
    /// 알림 출력 채널 (싱크 -> downstream)
    output_tx: mpsc::Sender<SinkOutput>,
    command_tx: mpsc::Sender<SinkCommand>,
    command_rx: Option<mpsc::Receiver<SinkCommand>>,
    cancel: CancellationToken,
    multiplexer: SourceMultiplexer,
    sink_task: Option<JoinHandle<SinkStats>>,
    final_stats: Option<SinkStats>,
}

impl LogPipeline {
    /// 현재 상태를 반환합니다.
    pub fn state_name(&self) -> &str {
        match self.state {
            PipelineState::Initialized => "initialized",
            PipelineState::Running => "running",
            PipelineState::Stopped => "stopped",
        }
    }

    /// 추적 대상 소스 목록
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// 파이프라인 설정
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// 싱크 제어 핸들을 반환합니다.
    pub fn control(&self) -> SinkHandle {
        SinkHandle::new(self.gate.clone(), self.command_tx.clone())
    }

    /// 실행 중인 소스 수
    pub fn live_sources(&self) -> usize {
        self.multiplexer.live()
    }

    /// 정지 시점의 최종 통계
    pub fn final_stats(&self) -> Option<&SinkStats> {
        self.final_stats.as_ref()
    }
}

impl Pipeline for LogPipeline {
    async fn start(&mut self) -> Result<(), LogshieldError> {
        match self.state {
            PipelineState::Running => return Err(PipelineError::AlreadyRunning.into()),
            PipelineState::Stopped => {
                return Err(LogPipelineError::Lifecycle(
                    "a stopped pipeline cannot be restarted".to_owned(),
                )
                .into());
            }
            PipelineState::Initialized => {}
        }

        let command_rx = self.command_rx.take().ok_or_else(|| {
            LogPipelineError::Lifecycle("command channel already consumed".to_owned())
        })?;

        tracing::info!(sources = self.sources.len(), "starting log pipeline");

        // 1. 탐지기 생성 (고정 순서: login, ssh, web)
        let detectors: Vec<Box<dyn Detector>> = build_detectors(&self.config.detection)
            .into_iter()
            .map(|d| Box::new(d) as Box<dyn Detector>)
            .collect();
        if detectors.is_empty() {
            tracing::warn!("all detection rules are disabled");
        }

        // 2. 싱크 태스크 스폰
        let (ingest_tx, ingest_rx) = mpsc::channel(self.config.channel_capacity);
        let sink = AlertSink::new(
            detectors,
            self.config.detection.history_limit,
            self.gate.clone(),
            self.output_tx.clone(),
        );
        self.sink_task = Some(tokio::spawn(sink.run(
            ingest_rx,
            command_rx,
            self.cancel.child_token(),
        )));

        // 3. 소스 태스크 스폰 (송신측은 태스크들만 보유)
        self.multiplexer
            .spawn_all(&self.sources, &ingest_tx, &self.cancel);
        drop(ingest_tx);

        self.state = PipelineState::Running;
        tracing::info!("log pipeline started");
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), LogshieldError> {
        if self.state != PipelineState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        tracing::info!("stopping log pipeline");

        // 1. 소스와 싱크에 취소 전파 (부분 라인은 버림)
        self.cancel.cancel();

        // 2. 소스 태스크 종료 대기
        let statuses = self.multiplexer.join_all().await;
        tracing::debug!(sources = statuses.len(), "source tasks joined");

        // 3. 싱크 종료 대기
        if let Some(task) = self.sink_task.take() {
            let stats = task
                .await
                .map_err(|e| LogPipelineError::Join(e.to_string()))?;
            self.final_stats = Some(stats);
        }

        self.state = PipelineState::Stopped;
        tracing::info!("log pipeline stopped");
        Ok(())
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            PipelineState::Running => {
                if self.sink_task.as_ref().is_none_or(|t| t.is_finished()) {
                    return HealthStatus::Unhealthy("alert sink terminated".to_owned());
                }

                let total = self.multiplexer.total();
                let live = self.multiplexer.live();
                if live == 0 {
                    HealthStatus::Degraded("no active sources".to_owned())
                } else if live < total {
                    HealthStatus::Degraded(format!(
                        "{} of {} sources terminated",
                        total - live,
                        total
                    ))
                } else {
                    HealthStatus::Healthy
                }
            }
            PipelineState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            PipelineState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// 로그 파이프라인 빌더
///
/// 파이프라인을 구성하고 필요한 채널을 생성합니다.
pub struct LogPipelineBuilder {
    config: PipelineConfig,
    sources: Vec<PathBuf>,
    parser: Option<Arc<dyn LogParser>>,
    output_tx: Option<mpsc::Sender<SinkOutput>>,
}

impl LogPipelineBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            sources: Vec::new(),
            parser: None,
            output_tx: None,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// 추적할 소스 파일 목록을 지정합니다.
    pub fn sources(mut self, sources: Vec<PathBuf>) -> Self {
        self.sources = sources;
        self
    }

    /// 라인 파서를 교체합니다. 기본값은 [`KeyValueNormalizer`]입니다.
    pub fn parser(mut self, parser: Arc<dyn LogParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// 외부 출력 채널을 설정합니다.
    ///
    /// 설정하지 않으면 빌더가 새 채널을 생성합니다.
    pub fn output_sender(mut self, tx: mpsc::Sender<SinkOutput>) -> Self {
        self.output_tx = Some(tx);
        self
    }

    /// 파이프라인을 빌드합니다.
    ///
    /// # Returns
    /// - `LogPipeline`: 파이프라인 인스턴스
    /// - `Option<mpsc::Receiver<SinkOutput>>`: 출력 수신 채널
    ///   (외부 output_sender를 설정한 경우 None)
    pub fn build(
        self,
    ) -> Result<(LogPipeline, Option<mpsc::Receiver<SinkOutput>>), LogPipelineError> {
        self.config.validate()?;

        if self.sources.is_empty() {
            return Err(LogPipelineError::Config {
                field: "sources".to_owned(),
                reason: "at least one source must be configured".to_owned(),
            });
        }

        let (output_tx, output_rx) = match self.output_tx {
            Some(tx) => (tx, None),
            None => {
                let (tx, rx) = mpsc::channel(self.config.output_capacity);
                (tx, Some(rx))
            }
        };

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let parser: Arc<dyn LogParser> = match self.parser {
            Some(parser) => parser,
            None => Arc::new(KeyValueNormalizer::new()),
        };
        let gate = PauseGate::new();
        let multiplexer = SourceMultiplexer::new(
            FileTailerConfig::from_pipeline(&self.config),
            parser,
            gate.clone(),
        );

        let pipeline = LogPipeline {
            config: self.config,
            state: PipelineState::Initialized,
            sources: self.sources,
            gate,
            output_tx,
            command_tx,
            command_rx: Some(command_rx),
            cancel: CancellationToken::new(),
            multiplexer,
            sink_task: None,
            final_stats: None,
        };

        Ok((pipeline, output_rx))
    }
}

impl Default for LogPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> LogPipelineBuilder {
        LogPipelineBuilder::new().sources(vec![PathBuf::from("/tmp/logshield-test.log")])
    }

    #[test]
    fn builder_creates_pipeline() {
        let (pipeline, output_rx) = builder().build().unwrap();
        assert_eq!(pipeline.state_name(), "initialized");
        assert!(output_rx.is_some());
        assert_eq!(pipeline.sources().len(), 1);
    }

    #[test]
    fn builder_with_external_output_sender() {
        let (tx, _rx) = mpsc::channel(10);
        let (_pipeline, rx) = builder().output_sender(tx).build().unwrap();
        assert!(rx.is_none());
    }

    #[test]
    fn builder_without_sources_fails() {
        let result = LogPipelineBuilder::new().build();
        assert!(matches!(result, Err(LogPipelineError::Config { .. })));
    }

    #[test]
    fn builder_with_invalid_config_fails() {
        let config = PipelineConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        assert!(builder().config(config).build().is_err());
    }

    #[tokio::test]
    async fn pipeline_lifecycle_errors() {
        let (mut pipeline, _rx) = builder().build().unwrap();

        assert!(pipeline.health_check().await.is_unhealthy());
        assert!(pipeline.stop().await.is_err());
    }

    #[tokio::test]
    async fn start_twice_fails_and_stop_then_restart_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.log");
        std::fs::write(&path, "").unwrap();

        let (mut pipeline, _rx) = LogPipelineBuilder::new()
            .sources(vec![path])
            .build()
            .unwrap();

        pipeline.start().await.unwrap();
        assert!(matches!(
            pipeline.start().await,
            Err(LogshieldError::Pipeline(PipelineError::AlreadyRunning))
        ));

        pipeline.stop().await.unwrap();
        assert_eq!(pipeline.state_name(), "stopped");
        assert!(pipeline.final_stats().is_some());
        assert!(pipeline.start().await.is_err());
        assert!(pipeline.health_check().await.is_unhealthy());
    }
}
