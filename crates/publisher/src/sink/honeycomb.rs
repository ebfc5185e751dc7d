//! 구조화 이벤트 싱크 (Honeycomb batch API)
//!
//! 이벤트를 메모리에 모았다가 `batch_size`에 도달하거나 `flush()`가 호출되면
//! `{api_host}/1/batch/{dataset}`로 한 번에 전송합니다. `flush()`는 전송 루프가
//! 주기적으로 호출합니다. 배치 전송이 실패하면 해당 배치의 이벤트는 모두 폐기됩니다.
//!
//! 데이터셋 이름은 URL 경로 세그먼트로 퍼센트 인코딩됩니다.

use std::time::Duration;

use honeyaws_core::config::HoneycombSection;
use honeyaws_core::error::SinkError;
use honeyaws_core::event::{Event, FieldValue};
use honeyaws_core::pipeline::EventSink;
use reqwest::Url;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use super::{check_response, http_client};
use crate::error::PublisherError;

const SINK_NAME: &str = "honeycomb";

/// 팀 write key 헤더
pub const TEAM_HEADER: &str = "X-Honeycomb-Team";

#[derive(Debug, Clone, Serialize)]
struct BatchEvent {
    time: String,
    samplerate: u32,
    data: BTreeMap<String, FieldValue>,
}

/// Honeycomb batch 싱크
pub struct HoneycombSink {
    client: reqwest::Client,
    url: Url,
    write_key: String,
    batch_size: usize,
    pending: Vec<BatchEvent>,
}

impl HoneycombSink {
    /// 새 싱크를 생성합니다.
    pub fn new(
        api_host: &str,
        dataset: &str,
        write_key: impl Into<String>,
        batch_size: usize,
        timeout: Duration,
    ) -> Result<Self, PublisherError> {
        if batch_size == 0 {
            return Err(PublisherError::Config {
                field: "honeycomb.batch_size".to_owned(),
                reason: "must be at least 1".to_owned(),
            });
        }
        Ok(Self {
            client: http_client(SINK_NAME, timeout)?,
            url: batch_url(api_host, dataset)?,
            write_key: write_key.into(),
            batch_size,
            pending: Vec::with_capacity(batch_size),
        })
    }

    /// `[honeycomb]` 설정 섹션에서 싱크를 생성합니다.
    pub fn from_config(section: &HoneycombSection, dataset: &str) -> Result<Self, PublisherError> {
        Self::new(
            &section.api_host,
            dataset,
            section.write_key.clone(),
            section.batch_size,
            Duration::from_secs(section.timeout_secs),
        )
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// 버퍼에 쌓인 이벤트 수
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    async fn send_batch(&mut self) -> Result<(), SinkError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let batch = std::mem::take(&mut self.pending);
        let body = serde_json::to_string(&batch).map_err(|e| SinkError::Serialize {
            sink: SINK_NAME.to_owned(),
            reason: e.to_string(),
        })?;

        let result = self
            .client
            .post(self.url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(TEAM_HEADER, &self.write_key)
            .body(body)
            .send()
            .await;
        check_response(SINK_NAME, result)?;
        debug!(events = batch.len(), "sent batch");
        Ok(())
    }
}

/// `{api_host}/1/batch/{dataset}` URL을 만듭니다. `dataset`은 세그먼트 하나로 인코딩됩니다.
fn batch_url(api_host: &str, dataset: &str) -> Result<Url, PublisherError> {
    let invalid = |reason: String| PublisherError::Config {
        field: "honeycomb.api_host".to_owned(),
        reason,
    };
    let mut url = Url::parse(api_host).map_err(|e| invalid(format!("invalid url '{api_host}': {e}")))?;
    url.path_segments_mut()
        .map_err(|()| invalid(format!("'{api_host}' cannot be a base url")))?
        .pop_if_empty()
        .extend(["1", "batch", dataset]);
    Ok(url)
}

impl EventSink for HoneycombSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    async fn send(&mut self, event: &Event) -> Result<(), SinkError> {
        self.pending.push(BatchEvent {
            time: event.timestamp.to_rfc3339(),
            samplerate: event.sample_rate(),
            data: event.data.clone(),
        });
        if self.pending.len() >= self.batch_size {
            self.send_batch().await?;
        }
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        self.send_batch().await
    }
}
