//! 이벤트 보강 -- 센티널 값 정리와 ALB trace 필드 재구성
//!
//! AWS는 업스트림 타임아웃이나 연결 끊김이 있으면 처리 시간 필드를 `-1`로
//! 기록합니다. [`drop_negative_times`]는 이런 필드를 삭제하고 `error` 필드에
//! 사유를 남깁니다. 여러 필드가 음수이면 마지막으로 검사한 필드의 메시지만 남습니다.
//!
//! ALB는 `X-Amzn-Trace-Id` 헤더를 `trace_id` 열에 기록합니다.
//! [`add_trace_data`]는 이를 분산 추적 필드(`trace.trace_id`, `trace.span_id`,
//! `trace.parent_id`)로 풀어냅니다.
//!
//! 두 단계 모두 멱등입니다.

use honeyaws_core::event::{ERROR_FIELD, Event};
use honeyaws_core::types::LogFormat;

use crate::parser::elb::parse_rfc3339;
use crate::shaper::RequestShaper;

/// 음수 센티널을 검사하는 처리 시간 필드 (검사 순서)
pub const TIME_FIELDS: [&str; 4] = [
    "response_processing_time",
    "request_processing_time",
    "backend_processing_time",
    "time_taken",
];

/// trace 헤더가 보존되는 필드명
pub const TRACE_HEADER_FIELD: &str = "request.headers.x-amzn-trace-id";

/// 음수 처리 시간 필드를 삭제하고 `error`에 사유를 기록합니다.
pub fn drop_negative_times(event: &mut Event) {
    for field in TIME_FIELDS {
        let negative = event.get_f64(field).is_some_and(|v| v < 0.0);
        if negative {
            event.remove(field);
            event.insert(
                ERROR_FIELD,
                format!(
                    "{field} was -1 -- upstream server timed out, disconnected, or sent malformed response"
                ),
            );
        }
    }
}

/// ALB `trace_id` 헤더에서 trace 필드를 재구성합니다.
///
/// `edge_mode`이면 `Parent`를 무시하여 로드 밸런서가 항상 trace의 루트가 됩니다.
/// 헤더가 없으면 아무것도 하지 않습니다.
pub fn add_trace_data(event: &mut Event, edge_mode: bool) {
    let Some(header) = event.get_str("trace_id").map(str::to_owned) else {
        return;
    };

    let mut root_span = true;
    for part in header.split(';') {
        let mut kv = part.split('=');
        let (Some(key), Some(val), None) = (kv.next(), kv.next(), kv.next()) else {
            continue;
        };
        match key {
            "Root" => event.insert("trace.trace_id", val),
            "Self" => {
                event.insert("trace.span_id", val);
                root_span = false;
            }
            "Parent" => {
                if !edge_mode {
                    event.insert("trace.parent_id", val);
                    root_span = false;
                }
            }
            "Sampled" => event.insert("sampled", val),
            other => event.insert(other, val),
        }
    }

    if root_span {
        if let Some(trace_id) = event.get_str("trace.trace_id").map(str::to_owned) {
            event.insert("trace.span_id", trace_id);
        }
    }

    if let Some(duration_ms) = duration_ms(event) {
        event.insert("duration_ms", duration_ms);
    }

    if let Some(elb) = event.get_str("elb").map(str::to_owned) {
        event.insert("service_name", elb);
    }
    if let Some(path) = event.get_str("request_path").map(str::to_owned) {
        event.insert("name", path);
    }

    event.remove("trace_id");
    event.insert(TRACE_HEADER_FIELD, header);
}

/// 응답 시각과 요청 시각의 차이(ms). 양수가 아니면 `request_processing_time`(초)을
/// ms로 환산해 사용합니다.
fn duration_ms(event: &Event) -> Option<f64> {
    let from_response = event
        .get_str("response_time")
        .and_then(parse_rfc3339)
        .map(|end| (end - event.timestamp).num_milliseconds())
        .filter(|ms| *ms > 0)
        .map(|ms| ms as f64);

    from_response.or_else(|| {
        event
            .get_f64("request_processing_time")
            .filter(|secs| *secs > 0.0)
            .map(|secs| secs * 1000.0)
    })
}

/// 형식별 보강 단계 묶음
///
/// 순서: 요청 라인 분해 → 센티널 정리 → trace 재구성.
#[derive(Debug, Clone)]
pub struct Enricher {
    format: LogFormat,
    shaper: RequestShaper,
    edge_mode: bool,
    trace_enrichment: bool,
}

impl Enricher {
    pub fn new(format: LogFormat, edge_mode: bool, trace_enrichment: bool) -> Self {
        Self {
            format,
            shaper: RequestShaper::default(),
            edge_mode,
            trace_enrichment,
        }
    }

    /// 이벤트 하나를 보강합니다.
    pub fn enrich(&self, event: &mut Event) {
        if self.format.is_load_balancer() {
            self.shaper.shape(event);
        }
        drop_negative_times(event);
        if self.trace_enrichment && self.format == LogFormat::Alb {
            add_trace_data(event, self.edge_mode);
        }
    }
}
