//! CloudFront 웹 배포 액세스 로그 파서 (`aws_cf_web`)
//!
//! 탭으로 구분되며 날짜와 시각이 별도 열입니다. `#Version`, `#Fields` 같은
//! 헤더 지시어와 빈 줄은 이벤트를 만들지 않습니다.

use chrono::{DateTime, NaiveDateTime, Utc};
use honeyaws_core::error::ParseError;
use honeyaws_core::event::Event;
use honeyaws_core::pipeline::LogParser;
use honeyaws_core::types::LogFormat;

use super::{DEFAULT_MAX_LINE_SIZE, FieldKind, LineFormat, check_line_size, malformed};
use crate::error::PublisherError;

/// CloudFront 로그 템플릿
pub const CLOUDFRONT_TEMPLATE: &str = "$date $time $x_edge_location $sc_bytes $c_ip $cs_method $cs_host $cs_uri_stem $sc_status $cs_referer $cs_user_agent $cs_uri_query $cs_cookie $x_edge_result_type $x_edge_request_id $x_host_header $cs_protocol $cs_bytes $time_taken $x_forwarded_for $ssl_protocol $ssl_cipher $x_edge_response_result_type $cs_protocol_version";

/// `time_taken`까지의 열 수 (2017년 이전 로그 호환)
pub const CLOUDFRONT_MIN_FIELDS: usize = 19;

fn cloudfront_field_kind(name: &str) -> FieldKind {
    match name {
        "sc_bytes" | "sc_status" | "cs_bytes" => FieldKind::Int,
        "time_taken" => FieldKind::Float,
        _ => FieldKind::Str,
    }
}

/// CloudFront 파서
pub struct CloudFrontParser {
    line_format: LineFormat,
    max_line_size: usize,
}

impl CloudFrontParser {
    /// CloudFront 템플릿을 컴파일하여 파서를 생성합니다.
    pub fn new() -> Result<Self, PublisherError> {
        Ok(Self {
            line_format: LineFormat::compile(CLOUDFRONT_TEMPLATE, cloudfront_field_kind)?
                .with_required(CLOUDFRONT_MIN_FIELDS)?,
            max_line_size: DEFAULT_MAX_LINE_SIZE,
        })
    }

    /// 최대 라인 크기를 설정합니다.
    pub fn with_max_line_size(mut self, size: usize) -> Self {
        self.max_line_size = size;
        self
    }

    fn parse_timestamp(date: &str, time: &str) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

impl LogParser for CloudFrontParser {
    fn format(&self) -> LogFormat {
        LogFormat::CloudFront
    }

    fn parse_line(&self, line: &str) -> Result<Option<Event>, ParseError> {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }
        check_line_size(LogFormat::CloudFront, line, self.max_line_size)?;

        let mut data = self
            .line_format
            .extract(line)
            .map_err(|reason| malformed(LogFormat::CloudFront, reason))?;

        let date = data.remove("date");
        let time = data.remove("time");
        let timestamp = match (&date, &time) {
            (Some(d), Some(t)) => d
                .as_str()
                .zip(t.as_str())
                .and_then(|(d, t)| Self::parse_timestamp(d, t)),
            _ => None,
        }
        .ok_or_else(|| {
            malformed(
                LogFormat::CloudFront,
                format!(
                    "invalid date/time: {} {}",
                    date.as_ref().map(|v| v.to_string()).unwrap_or_default(),
                    time.as_ref().map(|v| v.to_string()).unwrap_or_default()
                ),
            )
        })?;

        Ok(Some(Event { timestamp, data }))
    }
}
