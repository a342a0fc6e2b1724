//! 알림 싱크 -- 모든 탐지기 상태를 소유하는 단일 소비자 액터
//!
//! # 단일 작성자 불변식
//! 탐지기와 슬라이딩 윈도우 상태는 [`AlertSink`] 태스크만 변경합니다.
//! 수집 태스크는 채널로 메시지를 보낼 뿐이며, 외부 제어(리셋, 스냅샷, 통계)도
//! 명령 채널을 통해 두 메시지 사이에서 처리됩니다. 따라서 락이 필요 없습니다.
//!
//! # 일시정지
//! 일시정지 중 도착한 이벤트와 파싱 실패는 카운트하지도, 탐지기에 넣지도 않습니다.
//! 탐지기 상태는 변경되지 않으므로 재개 후 이전 상태가 그대로 유지됩니다.
//! 소스 실패는 일시정지와 무관하게 항상 전달됩니다.

use std::time::Instant;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use logshield_core::metrics as m;
use logshield_core::pipeline::Detector;
use logshield_core::types::Alert;

use crate::collector::{IngestMessage, PauseGate};
use crate::error::LogPipelineError;
use crate::history::AlertHistory;

/// 프레젠테이션 계층으로 전달되는 출력
#[derive(Debug, Clone)]
pub enum SinkOutput {
    /// 탐지 알림
    Alert(Alert),
    /// 권고 메시지 (파싱 실패, 소스 실패 등)
    Advisory(String),
}

/// 싱크 제어 명령
#[derive(Debug)]
pub enum SinkCommand {
    /// 히스토리와 카운터 초기화 (탐지기 윈도우는 유지)
    Reset,
    /// 현재 히스토리 복사본 요청
    Snapshot(oneshot::Sender<Vec<Alert>>),
    /// 통계 요청
    Stats(oneshot::Sender<SinkStats>),
}

/// 싱크 통계
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SinkStats {
    /// 처리한 라인 수 (이벤트 + 파싱 실패)
    pub events_total: u64,
    /// 파싱 실패 수
    pub parse_errors: u64,
    /// 발행한 알림 수
    pub alerts_total: u64,
    /// 보고된 소스 실패 수
    pub source_failures: u64,
    /// 현재 히스토리 길이
    pub history_len: usize,
    /// 일시정지 여부
    pub paused: bool,
    /// 규칙별 윈도우 상태 키 수
    pub tracked_keys: Vec<(String, usize)>,
}

/// 싱크 제어 핸들
///
/// 복제 가능하며 프레젠테이션 계층(콘솔 등)이 보유합니다.
#[derive(Debug, Clone)]
pub struct SinkHandle {
    gate: PauseGate,
    commands: mpsc::Sender<SinkCommand>,
}

impl SinkHandle {
    /// 새 핸들을 생성합니다.
    pub fn new(gate: PauseGate, commands: mpsc::Sender<SinkCommand>) -> Self {
        Self { gate, commands }
    }

    /// 일시정지합니다.
    pub fn pause(&self) {
        self.gate.pause();
    }

    /// 재개합니다.
    pub fn resume(&self) {
        self.gate.resume();
    }

    /// 일시정지 상태를 반전하고 새 상태를 반환합니다.
    pub fn toggle_pause(&self) -> bool {
        self.gate.toggle()
    }

    /// 일시정지 중인지 확인합니다.
    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    /// 히스토리와 카운터를 초기화합니다.
    pub async fn reset(&self) -> Result<(), LogPipelineError> {
        self.commands
            .send(SinkCommand::Reset)
            .await
            .map_err(|_| LogPipelineError::Channel("alert sink is not running".to_owned()))
    }

    /// 현재 히스토리의 일관된 복사본을 반환합니다 (오래된 순).
    pub async fn snapshot_alerts(&self) -> Result<Vec<Alert>, LogPipelineError> {
        let (tx, rx) = oneshot::channel();
        self.request(SinkCommand::Snapshot(tx), rx).await
    }

    /// 통계를 반환합니다.
    pub async fn stats(&self) -> Result<SinkStats, LogPipelineError> {
        let (tx, rx) = oneshot::channel();
        self.request(SinkCommand::Stats(tx), rx).await
    }

    async fn request<T>(
        &self,
        command: SinkCommand,
        rx: oneshot::Receiver<T>,
    ) -> Result<T, LogPipelineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| LogPipelineError::Channel("alert sink is not running".to_owned()))?;
        rx.await
            .map_err(|_| LogPipelineError::Channel("alert sink dropped the request".to_owned()))
    }
}

/// 단일 소비자 알림 싱크
pub struct AlertSink {
    detectors: Vec<Box<dyn Detector>>,
    history: AlertHistory,
    gate: PauseGate,
    output: mpsc::Sender<SinkOutput>,
    stats: SinkStats,
}

impl AlertSink {
    /// 새 싱크를 생성합니다. 탐지기는 주어진 순서대로 실행됩니다.
    pub fn new(
        detectors: Vec<Box<dyn Detector>>,
        history_limit: usize,
        gate: PauseGate,
        output: mpsc::Sender<SinkOutput>,
    ) -> Self {
        Self {
            detectors,
            history: AlertHistory::new(history_limit),
            gate,
            output,
            stats: SinkStats::default(),
        }
    }

    /// 메시지 하나를 처리하고 프레젠테이션으로 보낼 출력을 반환합니다.
    pub fn handle_message(&mut self, msg: IngestMessage) -> Vec<SinkOutput> {
        match msg {
            IngestMessage::Event { event, .. } => {
                if self.gate.is_paused() {
                    return Vec::new();
                }
                self.stats.events_total += 1;

                let started = Instant::now();
                let mut outputs = Vec::new();
                for detector in &mut self.detectors {
                    if let Some(alert) = detector.process(&event) {
                        metrics::counter!(
                            m::DETECTION_ALERTS_TOTAL,
                            m::LABEL_RULE => alert.rule_id.clone(),
                            m::LABEL_SEVERITY => alert.severity.as_str()
                        )
                        .increment(1);
                        self.stats.alerts_total += 1;
                        self.history.push(alert.clone());
                        outputs.push(SinkOutput::Alert(alert));
                    }
                }

                metrics::counter!(m::DETECTION_EVENTS_PROCESSED_TOTAL).increment(1);
                metrics::histogram!(m::DETECTION_PROCESSING_DURATION_SECONDS)
                    .record(started.elapsed().as_secs_f64());
                outputs
            }
            IngestMessage::ParseFailure {
                source,
                line,
                error,
            } => {
                if self.gate.is_paused() {
                    return Vec::new();
                }
                self.stats.events_total += 1;
                self.stats.parse_errors += 1;
                metrics::counter!(m::DETECTION_PARSE_ERRORS_TOTAL).increment(1);
                debug!(source = %source, line = %line, error = %error, "failed to parse line");

                vec![SinkOutput::Advisory(format!("parse error ({source}): {error}"))]
            }
            IngestMessage::SourceFailure { source, error } => {
                self.stats.source_failures += 1;
                warn!(source = %source, error = %error, "source terminated");
                vec![SinkOutput::Advisory(format!("source error: {error}"))]
            }
        }
    }

    /// 제어 명령 하나를 처리합니다.
    pub fn handle_command(&mut self, command: SinkCommand) {
        match command {
            SinkCommand::Reset => {
                self.history.clear();
                self.stats.events_total = 0;
                self.stats.parse_errors = 0;
                self.stats.alerts_total = 0;
                self.stats.source_failures = 0;
                info!("alert history and counters reset");
            }
            SinkCommand::Snapshot(reply) => {
                let _ = reply.send(self.history.snapshot());
            }
            SinkCommand::Stats(reply) => {
                let _ = reply.send(self.current_stats());
            }
        }
    }

    /// 현재 통계
    pub fn current_stats(&self) -> SinkStats {
        SinkStats {
            history_len: self.history.len(),
            paused: self.gate.is_paused(),
            tracked_keys: self
                .detectors
                .iter()
                .map(|d| (d.rule_id().to_owned(), d.tracked_keys()))
                .collect(),
            ..self.stats.clone()
        }
    }

    /// 취소될 때까지 메시지와 명령을 처리합니다.
    ///
    /// 모든 수집 태스크가 종료되어 수신 채널이 닫혀도, 취소 전까지는
    /// 제어 명령(스냅샷, 통계)을 계속 처리합니다.
    pub async fn run(
        mut self,
        mut rx: mpsc::Receiver<IngestMessage>,
        mut commands: mpsc::Receiver<SinkCommand>,
        cancel: CancellationToken,
    ) -> SinkStats {
        info!(detectors = self.detectors.len(), "alert sink started");
        let mut ingest_open = true;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                Some(command) = commands.recv() => self.handle_command(command),

                msg = rx.recv(), if ingest_open => match msg {
                    Some(msg) => {
                        for output in self.handle_message(msg) {
                            if !self.forward(output, &cancel).await {
                                break;
                            }
                        }
                        self.publish_gauges();
                    }
                    None => {
                        info!("all sources finished, ingest channel closed");
                        ingest_open = false;
                    }
                },
            }
        }

        let stats = self.current_stats();
        info!(
            events = stats.events_total,
            alerts = stats.alerts_total,
            "alert sink stopped"
        );
        stats
    }

    /// 출력을 프레젠테이션으로 보냅니다. 취소되면 `false`를 반환합니다.
    async fn forward(&self, output: SinkOutput, cancel: &CancellationToken) -> bool {
        tokio::select! {
            _ = cancel.cancelled() => false,
            result = self.output.send(output) => {
                if result.is_err() {
                    debug!("presentation channel closed, output discarded");
                }
                true
            }
        }
    }

    fn publish_gauges(&self) {
        for detector in &self.detectors {
            metrics::gauge!(
                m::DETECTION_TRACKED_KEYS,
                m::LABEL_RULE => detector.rule_id().to_owned()
            )
            .set(detector.tracked_keys() as f64);
        }
    }
}
