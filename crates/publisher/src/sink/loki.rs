//! HTTP 로그 집계 싱크 (Loki push API)
//!
//! 이벤트마다 `data`를 JSON 문자열로 직렬화해 스트림 하나짜리 push 요청으로
//! 감싸고, Basic 인증으로 동기 POST 합니다.
//!
//! ```json
//! {"streams":[{"stream":{"environment":"dev","service":"honeyaws","aws_elb":"my-lb"},
//!              "values":[["1501533057975041000","{\"elb\":\"my-lb\",...}"]]}]}
//! ```

use std::time::Duration;

use honeyaws_core::config::LokiSection;
use honeyaws_core::error::SinkError;
use honeyaws_core::event::Event;
use honeyaws_core::pipeline::EventSink;
use serde::Serialize;
use tracing::debug;

use super::{check_response, http_client};
use crate::error::PublisherError;

const SINK_NAME: &str = "loki";

/// 스트림 레이블의 서비스명
pub const SERVICE_LABEL: &str = "honeyaws";

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    streams: [Stream<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Stream<'a> {
    stream: StreamLabels<'a>,
    values: [[String; 2]; 1],
}

#[derive(Debug, Serialize)]
struct StreamLabels<'a> {
    environment: &'a str,
    service: &'a str,
    aws_elb: String,
}

/// Loki push 싱크
pub struct LokiSink {
    client: reqwest::Client,
    endpoint: String,
    user_id: String,
    api_key: String,
    environment: String,
}

impl LokiSink {
    /// 새 싱크를 생성합니다. HTTP 클라이언트는 요청마다 `timeout`을 적용합니다.
    pub fn new(
        endpoint: impl Into<String>,
        user_id: impl Into<String>,
        api_key: impl Into<String>,
        environment: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, PublisherError> {
        let endpoint = endpoint.into();
        if endpoint.is_empty() {
            return Err(PublisherError::Config {
                field: "loki.endpoint".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }
        Ok(Self {
            client: http_client(SINK_NAME, timeout)?,
            endpoint,
            user_id: user_id.into(),
            api_key: api_key.into(),
            environment: environment.into(),
        })
    }

    /// `[loki]` 설정 섹션에서 싱크를 생성합니다.
    pub fn from_config(section: &LokiSection, environment: &str) -> Result<Self, PublisherError> {
        Self::new(
            section.endpoint.clone(),
            section.user_id.clone(),
            section.api_key.clone(),
            environment,
            Duration::from_secs(section.timeout_secs),
        )
    }

    /// 이벤트 하나의 push 요청 본문을 만듭니다.
    fn body(&self, event: &Event) -> Result<String, SinkError> {
        let serialize_err = |e: serde_json::Error| SinkError::Serialize {
            sink: SINK_NAME.to_owned(),
            reason: e.to_string(),
        };

        let line = event.data_json().map_err(serialize_err)?;
        let request = PushRequest {
            streams: [Stream {
                stream: StreamLabels {
                    environment: &self.environment,
                    service: SERVICE_LABEL,
                    aws_elb: event.get("elb").map(|v| v.to_string()).unwrap_or_default(),
                },
                values: [[event.unix_nanos().to_string(), line]],
            }],
        };
        serde_json::to_string(&request).map_err(serialize_err)
    }
}

impl EventSink for LokiSink {
    fn name(&self) -> &str {
        SINK_NAME
    }

    async fn send(&mut self, event: &Event) -> Result<(), SinkError> {
        let body = self.body(event)?;
        let result = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .basic_auth(&self.user_id, Some(&self.api_key))
            .body(body)
            .send()
            .await;
        check_response(SINK_NAME, result)?;
        debug!(endpoint = %self.endpoint, "pushed event");
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), SinkError> {
        // 요청마다 동기 전송하므로 버퍼가 없음
        Ok(())
    }
}
