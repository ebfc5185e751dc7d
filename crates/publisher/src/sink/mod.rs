//! 텔레메트리 싱크 -- 샘플링된 이벤트를 백엔드로 전달
//!
//! 각 싱크는 core의 [`EventSink`](honeyaws_core::pipeline::EventSink)를 구현하고
//! [`DynEventSink`]로 박싱되어 하나의 전송 루프([`run_sinks`])에서 순서대로 호출됩니다.
//!
//! # 구현체
//! - [`HoneycombSink`]: 배치 단위 구조화 이벤트 전송
//! - [`LokiSink`]: 이벤트 하나당 HTTP POST 한 번 (Basic 인증)
//! - [`ChannelSink`]: mpsc 채널로 전달 (임베딩/테스트용)
//!
//! 전송 실패는 이벤트 단위로 로깅되고 폐기되며 재시도하지 않습니다.
//! 배치 싱크는 전송 루프의 주기적 flush로 부분 배치를 내보냅니다.

pub mod channel;
pub mod honeycomb;
pub mod loki;

pub use channel::ChannelSink;
pub use honeycomb::HoneycombSink;
pub use loki::LokiSink;

use std::time::Duration;

use honeyaws_core::error::SinkError;
use honeyaws_core::event::Event;
use honeyaws_core::metrics as m;
use honeyaws_core::pipeline::DynEventSink;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::error::PublisherError;

/// 요청 타임아웃이 설정된 HTTP 클라이언트를 생성합니다.
pub(crate) fn http_client(sink: &str, timeout: Duration) -> Result<reqwest::Client, PublisherError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| PublisherError::Config {
            field: format!("{sink}.timeout_secs"),
            reason: format!("failed to build http client: {e}"),
        })
}

/// `reqwest` 응답을 상태 코드 기준으로 검사합니다.
pub(crate) fn check_response(
    sink: &str,
    result: Result<reqwest::Response, reqwest::Error>,
) -> Result<(), SinkError> {
    let response = result.map_err(|e| SinkError::Request {
        sink: sink.to_owned(),
        reason: e.to_string(),
    })?;
    let status = response.status();
    if status.is_success() {
        Ok(())
    } else {
        Err(SinkError::Status {
            sink: sink.to_owned(),
            status: status.as_u16(),
        })
    }
}

/// 샘플링된 이벤트를 모든 싱크에 전달하는 장기 실행 루프
///
/// `flush_interval`마다 모든 싱크를 flush하여 배치 크기에 못 미치는 이벤트도
/// 전달되도록 합니다. 입력 채널이 닫히면 마지막으로 flush하고 종료합니다.
/// 싱크 하나의 실패는 다른 싱크나 다음 이벤트에 영향을 주지 않습니다.
pub async fn run_sinks(
    mut sinks: Vec<Box<dyn DynEventSink>>,
    flush_interval: Duration,
    mut input: mpsc::Receiver<Event>,
) {
    let names: Vec<String> = sinks.iter().map(|s| s.name().to_owned()).collect();
    info!(
        sinks = ?names,
        flush_interval_ms = flush_interval.as_millis() as u64,
        "sink loop started"
    );

    let mut ticker = tokio::time::interval(flush_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // 첫 tick은 즉시 완료됨
    ticker.tick().await;

    loop {
        tokio::select! {
            received = input.recv() => {
                let Some(event) = received else {
                    break;
                };
                deliver(&mut sinks, &event).await;
            }
            _ = ticker.tick() => {
                flush_all(&mut sinks).await;
            }
        }
    }

    debug!("sampled channel closed, flushing sinks");
    flush_all(&mut sinks).await;
    info!("sink loop stopped");
}

async fn deliver(sinks: &mut [Box<dyn DynEventSink>], event: &Event) {
    for sink in sinks.iter_mut() {
        let name = sink.name().to_owned();
        match sink.send(event).await {
            Ok(()) => {
                metrics::counter!(m::SINK_EVENTS_PUBLISHED_TOTAL, m::LABEL_SINK => name)
                    .increment(1);
            }
            Err(e) => {
                let err = PublisherError::PublishFailure {
                    sink: name.clone(),
                    source: e,
                };
                error!(sink = %name, error = %err, "dropping event");
                metrics::counter!(m::SINK_PUBLISH_FAILURES_TOTAL, m::LABEL_SINK => name)
                    .increment(1);
            }
        }
    }
}

async fn flush_all(sinks: &mut [Box<dyn DynEventSink>]) {
    for sink in sinks.iter_mut() {
        if let Err(e) = sink.flush().await {
            error!(sink = %sink.name(), error = %e, "flush failed");
        }
    }
}
