//! Classic ELB 액세스 로그 파서 (`aws_elb`)
//!
//! # 라인 형식
//! ```text
//! timestamp elb client:port backend:port request_processing_time backend_processing_time
//! response_processing_time elb_status_code backend_status_code received_bytes sent_bytes
//! "request" "user_agent" ssl_cipher ssl_protocol
//! ```
//!
//! 타임스탬프는 RFC 3339이며 이벤트 시각으로 사용되고 `data`에는 남지 않습니다.

use chrono::{DateTime, Utc};
use honeyaws_core::error::ParseError;
use honeyaws_core::event::Event;
use honeyaws_core::pipeline::LogParser;
use honeyaws_core::types::LogFormat;

use super::{DEFAULT_MAX_LINE_SIZE, FieldKind, LineFormat, check_line_size, malformed};
use crate::error::PublisherError;

/// ELB 로그 템플릿
pub const ELB_TEMPLATE: &str = r#"$timestamp $elb $client_authority $backend_authority $request_processing_time $backend_processing_time $response_processing_time $elb_status_code $backend_status_code $received_bytes $sent_bytes "$request" "$user_agent" $ssl_cipher $ssl_protocol"#;

/// ELB/ALB 공통 필드 타입
pub(crate) fn load_balancer_field_kind(name: &str) -> FieldKind {
    match name {
        "request_processing_time" | "backend_processing_time" | "response_processing_time" => {
            FieldKind::Float
        }
        "elb_status_code" | "backend_status_code" | "received_bytes" | "sent_bytes"
        | "matched_rule_priority" => FieldKind::Int,
        _ => FieldKind::Str,
    }
}

/// RFC 3339 타임스탬프를 UTC로 파싱합니다.
pub(crate) fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Classic ELB 파서
pub struct ElbParser {
    line_format: LineFormat,
    max_line_size: usize,
}

impl ElbParser {
    /// ELB 템플릿을 컴파일하여 파서를 생성합니다.
    pub fn new() -> Result<Self, PublisherError> {
        Ok(Self {
            line_format: LineFormat::compile(ELB_TEMPLATE, load_balancer_field_kind)?,
            max_line_size: DEFAULT_MAX_LINE_SIZE,
        })
    }

    /// 최대 라인 크기를 설정합니다.
    pub fn with_max_line_size(mut self, size: usize) -> Self {
        self.max_line_size = size;
        self
    }
}

impl LogParser for ElbParser {
    fn format(&self) -> LogFormat {
        LogFormat::Elb
    }

    fn parse_line(&self, line: &str) -> Result<Option<Event>, ParseError> {
        if line.trim().is_empty() {
            return Ok(None);
        }
        check_line_size(LogFormat::Elb, line, self.max_line_size)?;

        let mut data = self
            .line_format
            .extract(line)
            .map_err(|reason| malformed(LogFormat::Elb, reason))?;

        let raw_ts = data
            .remove("timestamp")
            .ok_or_else(|| malformed(LogFormat::Elb, "missing timestamp"))?;
        let timestamp = raw_ts
            .as_str()
            .and_then(parse_rfc3339)
            .ok_or_else(|| malformed(LogFormat::Elb, format!("invalid timestamp: {raw_ts}")))?;

        Ok(Some(Event { timestamp, data }))
    }
}
