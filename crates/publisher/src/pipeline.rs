//! 디스패치 파이프라인 -- 오브젝트 파싱부터 싱크 전달까지의 전체 흐름
//!
//! [`Publisher`]는 생성 시 샘플러 태스크와 싱크 태스크를 한 번만 띄우고,
//! 이후 여러 [`Publisher::publish`] 호출이 같은 백그라운드 단계를 공유합니다.
//!
//! # 내부 아키텍처
//! ```text
//! publish(object) --parse/shape/enrich--> parsed(mpsc) --> dyn_sample --> sampled(mpsc) --> run_sinks
//!                                                                                            |
//!                                                                            Honeycomb / Loki / Channel
//! ```
//!
//! 두 채널은 작은 용량(기본 1)으로 묶여 있어 느린 싱크가 샘플러를, 샘플러가
//! 파서를, 파서가 `publish` 호출자를 차례로 막습니다. 별도의 큐 길이 제한이나
//! 드롭 정책은 없습니다.

use std::path::Path;
use std::time::Instant;

use honeyaws_core::event::Event;
use honeyaws_core::metrics as m;
use honeyaws_core::pipeline::{DynEventSink, LogParser};
use honeyaws_core::types::DownloadedObject;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::PublisherConfig;
use crate::enrich::Enricher;
use crate::error::PublisherError;
use crate::parser::{DEFAULT_MAX_LINE_SIZE, FormatParser};
use crate::sampler::{build_sampler, dyn_sample};
use crate::sink::run_sinks;

/// 오브젝트 하나의 처리 결과
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishSummary {
    /// 읽은 라인 수
    pub lines: usize,
    /// 샘플러로 넘긴 이벤트 수
    pub events: usize,
    /// 건너뛴 잘못된 레코드 수
    pub malformed: usize,
}

/// AWS 액세스 로그 퍼블리셔
///
/// # 사용 예시
/// ```ignore
/// use honeyaws_publisher::{PublisherBuilder, PublisherConfig, LokiSink};
///
/// let publisher = PublisherBuilder::new()
///     .config(config)
///     .sink(Box::new(loki_sink))
///     .build()?;
///
/// publisher.publish(&object).await?;
/// publisher.close().await?;
/// ```
pub struct Publisher {
    config: PublisherConfig,
    parser: FormatParser,
    enricher: Enricher,
    parsed_tx: mpsc::Sender<Event>,
    sampler_task: JoinHandle<()>,
    sink_task: JoinHandle<()>,
}

impl Publisher {
    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// 다운로드된 오브젝트를 파싱해 샘플러로 넘기고, 끝나면 로컬 파일을 삭제합니다.
    ///
    /// 모든 라인이 샘플러에 전달된 뒤 반환하며, 백엔드 전달 완료를 기다리지 않습니다.
    ///
    /// # Errors
    /// - `ParseFailure`: 파일을 열거나 읽을 수 없음 (파일은 삭제하지 않음)
    /// - `CleanupFailure`: 이벤트 전달 후 파일 삭제 실패
    /// - `Channel`: 샘플러가 이미 종료됨
    pub async fn publish(&self, object: &DownloadedObject) -> Result<PublishSummary, PublisherError> {
        let result = self.publish_inner(object).await;
        match &result {
            Ok(summary) => {
                metrics::counter!(m::PUBLISHER_OBJECTS_PUBLISHED_TOTAL).increment(1);
                info!(
                    object = %object.object,
                    lines = summary.lines,
                    events = summary.events,
                    malformed = summary.malformed,
                    "object published"
                );
            }
            Err(e) => {
                metrics::counter!(m::PUBLISHER_OBJECTS_FAILED_TOTAL).increment(1);
                error!(object = %object.object, error = %e, "object failed");
            }
        }
        result
    }

    async fn publish_inner(&self, object: &DownloadedObject) -> Result<PublishSummary, PublisherError> {
        if object.format != self.parser.format() {
            return Err(PublisherError::ParseFailure {
                object: object.object.clone(),
                reason: format!(
                    "object format {} does not match publisher format {}",
                    object.format,
                    self.parser.format()
                ),
            });
        }

        debug!(object = %object.object, "parse events begin");
        let started = Instant::now();
        let summary = self.parse_events(object).await?;
        metrics::histogram!(m::PUBLISHER_OBJECT_PARSE_DURATION_SECONDS)
            .record(started.elapsed().as_secs_f64());
        debug!(object = %object.object, "parse events end");

        remove_object(&object.filename).await?;
        Ok(summary)
    }

    async fn parse_events(&self, object: &DownloadedObject) -> Result<PublishSummary, PublisherError> {
        let parse_failure = |e: std::io::Error| PublisherError::ParseFailure {
            object: object.object.clone(),
            reason: e.to_string(),
        };

        let file = tokio::fs::File::open(&object.filename)
            .await
            .map_err(parse_failure)?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut summary = PublishSummary::default();
        let format = self.parser.format();

        loop {
            buf.clear();
            let n = read_line_bounded(&mut reader, &mut buf, LINE_BUFFER_LIMIT)
                .await
                .map_err(parse_failure)?;
            if n == 0 {
                break;
            }
            summary.lines += 1;

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(['\n', '\r']);

            match self.parser.parse_line(line) {
                Ok(Some(mut event)) => {
                    self.enricher.enrich(&mut event);
                    metrics::counter!(m::PARSER_LINES_PARSED_TOTAL, m::LABEL_FORMAT => format.as_str())
                        .increment(1);
                    self.parsed_tx.send(event).await.map_err(|_| {
                        PublisherError::Channel("sampler stopped before object was parsed".to_owned())
                    })?;
                    summary.events += 1;
                }
                Ok(None) => {}
                Err(e) => {
                    summary.malformed += 1;
                    metrics::counter!(m::PARSER_MALFORMED_RECORDS_TOTAL, m::LABEL_FORMAT => format.as_str())
                        .increment(1);
                    let err = PublisherError::MalformedRecord {
                        format: format.as_str().to_owned(),
                        line: summary.lines,
                        reason: e.to_string(),
                    };
                    warn!(object = %object.object, error = %err, "skipping record");
                }
            }
        }

        Ok(summary)
    }

    /// 파이프라인을 종료합니다.
    ///
    /// 파싱 채널을 닫고 샘플러와 싱크 태스크가 남은 이벤트를 모두 처리하고
    /// 싱크를 flush할 때까지 기다립니다. `self`를 소비하므로 한 번만 호출됩니다.
    pub async fn close(self) -> Result<(), PublisherError> {
        info!("closing publisher");
        drop(self.parsed_tx);

        self.sampler_task
            .await
            .map_err(|e| PublisherError::Channel(format!("sampler task failed: {e}")))?;
        self.sink_task
            .await
            .map_err(|e| PublisherError::Channel(format!("sink task failed: {e}")))?;

        info!("publisher closed");
        Ok(())
    }
}

/// 라인 버퍼 상한. 초과분은 버려지고 파서의 크기 검사에서 거부됩니다.
const LINE_BUFFER_LIMIT: usize = DEFAULT_MAX_LINE_SIZE + 2;

/// `\n`까지 한 라인을 소비하되 `buf`에는 최대 `limit` 바이트만 보관합니다.
///
/// 소비한 바이트 수를 반환하며 0이면 EOF입니다.
async fn read_line_bounded<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    limit: usize,
) -> std::io::Result<usize> {
    let mut consumed = 0;
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(consumed);
        }
        let (used, done) = match available.iter().position(|b| *b == b'\n') {
            Some(i) => (i + 1, true),
            None => (available.len(), false),
        };
        let room = limit.saturating_sub(buf.len());
        buf.extend_from_slice(&available[..used.min(room)]);
        reader.consume(used);
        consumed += used;
        if done {
            return Ok(consumed);
        }
    }
}

async fn remove_object(path: &Path) -> Result<(), PublisherError> {
    tokio::fs::remove_file(path)
        .await
        .map_err(|source| PublisherError::CleanupFailure {
            path: path.to_path_buf(),
            source,
        })
}

/// 퍼블리셔 빌더
///
/// 파서, 보강기, 채널을 구성하고 백그라운드 태스크를 시작합니다.
/// tokio 런타임 안에서 호출해야 합니다.
#[derive(Default)]
pub struct PublisherBuilder {
    config: PublisherConfig,
    sinks: Vec<Box<dyn DynEventSink>>,
}

impl PublisherBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 퍼블리셔 설정을 지정합니다.
    pub fn config(mut self, config: PublisherConfig) -> Self {
        self.config = config;
        self
    }

    /// 싱크를 추가합니다. 추가한 순서대로 호출됩니다.
    pub fn sink(mut self, sink: Box<dyn DynEventSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// 여러 싱크를 한 번에 추가합니다.
    pub fn sinks(mut self, sinks: impl IntoIterator<Item = Box<dyn DynEventSink>>) -> Self {
        self.sinks.extend(sinks);
        self
    }

    /// 퍼블리셔를 빌드하고 샘플러/싱크 태스크를 시작합니다.
    pub fn build(self) -> Result<Publisher, PublisherError> {
        self.config.validate()?;

        if self.sinks.is_empty() {
            return Err(PublisherError::Config {
                field: "sinks".to_owned(),
                reason: "at least one sink must be configured".to_owned(),
            });
        }

        let runtime = tokio::runtime::Handle::try_current().map_err(|e| PublisherError::Config {
            field: "runtime".to_owned(),
            reason: format!("publisher must be built inside a tokio runtime: {e}"),
        })?;

        let parser = FormatParser::for_format(self.config.format)?;
        let enricher = Enricher::new(
            self.config.format,
            self.config.edge_mode,
            self.config.trace_enrichment,
        );

        let (parsed_tx, parsed_rx) = mpsc::channel(self.config.channel_capacity);
        let (sampled_tx, sampled_rx) = mpsc::channel(self.config.channel_capacity);

        let sampler = build_sampler(
            self.config.sampler,
            self.config.sample_rate,
            self.config.decay,
            self.config.sampler_interval,
        );
        let sampler_task = runtime.spawn(dyn_sample(
            sampler,
            self.config.format,
            self.config.sampler_interval,
            parsed_rx,
            sampled_tx,
        ));
        let sink_task = runtime.spawn(run_sinks(
            self.sinks,
            self.config.flush_interval,
            sampled_rx,
        ));

        info!(
            format = %self.config.format,
            dataset = %self.config.dataset,
            sample_rate = self.config.sample_rate,
            "publisher started"
        );

        Ok(Publisher {
            config: self.config,
            parser,
            enricher,
            parsed_tx,
            sampler_task,
            sink_task,
        })
    }
}
