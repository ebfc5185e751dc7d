//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `honeyaws_`
//! - 단계명: `parser_`, `sampler_`, `sink_`, `publisher_`, `daemon_`
//! - 접미어: `_total` (counter), `_seconds` (histogram)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(honeyaws_core::metrics::PARSER_LINES_PARSED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 로그 형식 레이블 키 (aws_elb, aws_alb, aws_cf_web)
pub const LABEL_FORMAT: &str = "format";

/// 싱크 이름 레이블 키 (honeycomb, loki, channel)
pub const LABEL_SINK: &str = "sink";

// ─── Parser 메트릭 ──────────────────────────────────────────────────

/// Parser: 이벤트로 변환된 라인 수 (counter, label: format)
pub const PARSER_LINES_PARSED_TOTAL: &str = "honeyaws_parser_lines_parsed_total";

/// Parser: 파싱 실패로 건너뛴 라인 수 (counter, label: format)
pub const PARSER_MALFORMED_RECORDS_TOTAL: &str = "honeyaws_parser_malformed_records_total";

// ─── Sampler 메트릭 ─────────────────────────────────────────────────

/// Sampler: 유지된 이벤트 수 (counter)
pub const SAMPLER_EVENTS_KEPT_TOTAL: &str = "honeyaws_sampler_events_kept_total";

/// Sampler: 드롭된 이벤트 수 (counter)
pub const SAMPLER_EVENTS_DROPPED_TOTAL: &str = "honeyaws_sampler_events_dropped_total";

// ─── Sink 메트릭 ────────────────────────────────────────────────────

/// Sink: 전송 성공 이벤트 수 (counter, label: sink)
pub const SINK_EVENTS_PUBLISHED_TOTAL: &str = "honeyaws_sink_events_published_total";

/// Sink: 전송 실패 이벤트 수 (counter, label: sink)
pub const SINK_PUBLISH_FAILURES_TOTAL: &str = "honeyaws_sink_publish_failures_total";

// ─── Publisher 메트릭 ───────────────────────────────────────────────

/// Publisher: 성공적으로 처리된 오브젝트 수 (counter)
pub const PUBLISHER_OBJECTS_PUBLISHED_TOTAL: &str = "honeyaws_publisher_objects_published_total";

/// Publisher: 실패한 오브젝트 수 (counter)
pub const PUBLISHER_OBJECTS_FAILED_TOTAL: &str = "honeyaws_publisher_objects_failed_total";

/// Publisher: 오브젝트 하나를 파싱하는 데 걸린 시간 (histogram, 초)
pub const PUBLISHER_OBJECT_PARSE_DURATION_SECONDS: &str =
    "honeyaws_publisher_object_parse_duration_seconds";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 상태 저장소에 이미 기록되어 건너뛴 오브젝트 수 (counter)
pub const DAEMON_OBJECTS_SKIPPED_TOTAL: &str = "honeyaws_daemon_objects_skipped_total";

/// Daemon: 상태 조회, 스풀 복사, 발행 중 하나라도 실패한 오브젝트 수 (counter)
pub const DAEMON_OBJECTS_FAILED_TOTAL: &str = "honeyaws_daemon_objects_failed_total";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 오브젝트 파싱 시간 히스토그램 버킷 (초)
///
/// 10ms ~ 300s 범위 (대형 ALB 로그 오브젝트 포함)
pub const OBJECT_PARSE_DURATION_BUCKETS: [f64; 9] =
    [0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0, 120.0, 300.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `honeyaws-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_histogram};

    describe_counter!(
        PARSER_LINES_PARSED_TOTAL,
        "Total number of access log lines parsed into events"
    );
    describe_counter!(
        PARSER_MALFORMED_RECORDS_TOTAL,
        "Total number of malformed access log lines skipped"
    );
    describe_counter!(
        SAMPLER_EVENTS_KEPT_TOTAL,
        "Total number of events kept by the dynamic sampler"
    );
    describe_counter!(
        SAMPLER_EVENTS_DROPPED_TOTAL,
        "Total number of events dropped by the dynamic sampler"
    );
    describe_counter!(
        SINK_EVENTS_PUBLISHED_TOTAL,
        "Total number of events delivered to a telemetry sink"
    );
    describe_counter!(
        SINK_PUBLISH_FAILURES_TOTAL,
        "Total number of events a telemetry sink failed to deliver"
    );
    describe_counter!(
        PUBLISHER_OBJECTS_PUBLISHED_TOTAL,
        "Total number of downloaded objects fully parsed and cleaned up"
    );
    describe_counter!(
        PUBLISHER_OBJECTS_FAILED_TOTAL,
        "Total number of downloaded objects that failed to publish"
    );
    describe_counter!(
        DAEMON_OBJECTS_SKIPPED_TOTAL,
        "Total number of objects skipped because they were already processed"
    );
    describe_counter!(
        DAEMON_OBJECTS_FAILED_TOTAL,
        "Total number of objects the daemon failed to stage or publish"
    );
    describe_histogram!(
        PUBLISHER_OBJECT_PARSE_DURATION_SECONDS,
        "Time to parse one downloaded object in seconds"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METRIC_NAMES: &[&str] = &[
        PARSER_LINES_PARSED_TOTAL,
        PARSER_MALFORMED_RECORDS_TOTAL,
        SAMPLER_EVENTS_KEPT_TOTAL,
        SAMPLER_EVENTS_DROPPED_TOTAL,
        SINK_EVENTS_PUBLISHED_TOTAL,
        SINK_PUBLISH_FAILURES_TOTAL,
        PUBLISHER_OBJECTS_PUBLISHED_TOTAL,
        PUBLISHER_OBJECTS_FAILED_TOTAL,
        PUBLISHER_OBJECT_PARSE_DURATION_SECONDS,
        DAEMON_OBJECTS_SKIPPED_TOTAL,
        DAEMON_OBJECTS_FAILED_TOTAL,
    ];

    #[test]
    fn all_metrics_start_with_honeyaws_prefix() {
        for name in ALL_METRIC_NAMES {
            assert!(
                name.starts_with("honeyaws_"),
                "Metric '{}' does not start with 'honeyaws_' prefix",
                name
            );
        }
    }

    #[test]
    fn describe_all_does_not_panic() {
        // 레코더 없이 호출해도 패닉하지 않아야 함
        describe_all();
    }

    #[test]
    fn parse_duration_buckets_are_sorted() {
        let buckets = OBJECT_PARSE_DURATION_BUCKETS;
        for i in 1..buckets.len() {
            assert!(buckets[i] > buckets[i - 1]);
        }
    }
}
