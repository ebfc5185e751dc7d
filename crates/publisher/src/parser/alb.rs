//! ALB 액세스 로그 파서 (`aws_alb`)
//!
//! ELB 형식 앞에 `type`과 `response_time`이 붙고, 뒤에 대상 그룹, trace 헤더,
//! 도메인, 인증서, 규칙 우선순위, 요청 생성 시각이 이어집니다.
//!
//! 이벤트 시각은 요청 생성 시각(`$timestamp`)입니다. 이 열이 추가되기 전의
//! 로그(20열)는 `response_time`을 대신 사용합니다. `response_time`은 trace 보강에서
//! 기간을 계산할 수 있도록 문자열 그대로 `data`에 남깁니다.

use honeyaws_core::error::ParseError;
use honeyaws_core::event::Event;
use honeyaws_core::pipeline::LogParser;
use honeyaws_core::types::LogFormat;

use super::elb::{load_balancer_field_kind, parse_rfc3339};
use super::{DEFAULT_MAX_LINE_SIZE, LineFormat, check_line_size, malformed};
use crate::error::PublisherError;

/// ALB 로그 템플릿
pub const ALB_TEMPLATE: &str = r#"$type $response_time $elb $client_authority $backend_authority $request_processing_time $backend_processing_time $response_processing_time $elb_status_code $backend_status_code $received_bytes $sent_bytes "$request" "$user_agent" $ssl_cipher $ssl_protocol $target_group_arn "$trace_id" "$domain_name" "$chosen_cert_arn" $matched_rule_priority $timestamp"#;

/// `chosen_cert_arn`까지의 열 수
pub const ALB_MIN_FIELDS: usize = 20;

/// ALB 파서
pub struct AlbParser {
    line_format: LineFormat,
    max_line_size: usize,
}

impl AlbParser {
    /// ALB 템플릿을 컴파일하여 파서를 생성합니다.
    pub fn new() -> Result<Self, PublisherError> {
        Ok(Self {
            line_format: LineFormat::compile(ALB_TEMPLATE, load_balancer_field_kind)?
                .with_required(ALB_MIN_FIELDS)?,
            max_line_size: DEFAULT_MAX_LINE_SIZE,
        })
    }

    /// 최대 라인 크기를 설정합니다.
    pub fn with_max_line_size(mut self, size: usize) -> Self {
        self.max_line_size = size;
        self
    }
}

impl LogParser for AlbParser {
    fn format(&self) -> LogFormat {
        LogFormat::Alb
    }

    fn parse_line(&self, line: &str) -> Result<Option<Event>, ParseError> {
        if line.trim().is_empty() {
            return Ok(None);
        }
        check_line_size(LogFormat::Alb, line, self.max_line_size)?;

        let mut data = self
            .line_format
            .extract(line)
            .map_err(|reason| malformed(LogFormat::Alb, reason))?;

        let timestamp = match data.remove("timestamp") {
            Some(raw) => raw.as_str().and_then(parse_rfc3339).ok_or_else(|| {
                malformed(LogFormat::Alb, format!("invalid request creation time: {raw}"))
            })?,
            None => data
                .get("response_time")
                .and_then(|v| v.as_str())
                .and_then(parse_rfc3339)
                .ok_or_else(|| malformed(LogFormat::Alb, "missing or invalid response_time"))?,
        };

        Ok(Some(Event { timestamp, data }))
    }
}
