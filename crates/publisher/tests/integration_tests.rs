//! 통합 테스트 -- 오브젝트 파싱부터 싱크 전달까지의 전체 흐름 검증

use std::io::Write;
use std::path::PathBuf;

use tokio::sync::mpsc;

use honeyaws_core::event::{ERROR_FIELD, Event, FieldValue};
use honeyaws_core::types::{DownloadedObject, LogFormat};
use honeyaws_publisher::{
    ChannelSink, LokiSink, PublisherBuilder, PublisherConfig, PublisherConfigBuilder,
    PublisherError,
};

const ELB_LINE: &str = r#"2017-07-31T20:30:57.975041Z spline_reticulation_lb 10.11.12.13:47882 10.3.47.87:8080 0.000021 0.010962 0.000016 200 200 766 17 "PUT https://api.simulation.io:443/reticulate/spline/1 HTTP/1.1" "libhoney-go/1.3.3" ECDHE-RSA-AES128-GCM-SHA256 TLSv1.2"#;

const ALB_LINE: &str = r#"https 2018-07-02T22:23:00.186641Z app/my-loadbalancer/50dc6c495c0c9188 192.168.131.39:2817 10.0.0.1:80 0.086 0.048 0.037 200 200 0 57 "GET https://www.example.com:443/cart?id=7 HTTP/1.1" "curl/7.46.0" ECDHE-RSA-AES128-GCM-SHA256 TLSv1.2 arn:aws:elasticloadbalancing:us-east-2:123456789012:targetgroup/my-targets/73e2d6bc24d8a067 "Root=1-58337281-1d84f3d73c47ec4e58577259;Parent=53995c3f42cd8ad8;Self=1-58337281-aaaa" "www.example.com" "-" 1 2018-07-02T22:22:48.364000Z "forward" "-" "-""#;

const CF_TIMEOUT_LINE: &str = "2014-05-23\t01:13:11\tFRA2\t182\t192.0.2.10\tGET\td111111abcdef8.cloudfront.net\t/view/my/file.html\t504\twww.displaymyfiles.com\tMozilla/4.0\t-\t-\tError\tMRVMF7KydIvxMWfJIglgwHQwZsbG2IhRJ07sn9AkKUFSHS9EXAMPLE==\td111111abcdef8.cloudfront.net\thttp\t-\t-1\t-\t-\t-\tError\tHTTP/1.1";

/// 라인들을 임시 파일에 쓰고 삭제되지 않도록 경로를 유지합니다.
fn write_object(lines: &[&str]) -> PathBuf {
    let mut file = tempfile::NamedTempFile::new().expect("failed to create temp file");
    for line in lines {
        writeln!(file, "{line}").expect("failed to write line");
    }
    file.into_temp_path().keep().expect("failed to keep temp file")
}

async fn collect(mut rx: mpsc::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

/// 채널 싱크 하나로 파이프라인을 실행하고 전달된 이벤트를 반환합니다.
async fn run_with_channel(
    config: PublisherConfig,
    objects: &[DownloadedObject],
) -> (Vec<Result<honeyaws_publisher::PublishSummary, PublisherError>>, Vec<Event>) {
    let (tx, rx) = mpsc::channel(1024);
    let publisher = PublisherBuilder::new()
        .config(config)
        .sink(Box::new(ChannelSink::new(tx)))
        .build()
        .expect("failed to build publisher");

    let mut results = Vec::new();
    for object in objects {
        results.push(publisher.publish(object).await);
    }
    publisher.close().await.expect("failed to close publisher");
    (results, collect(rx).await)
}

/// 정상 라인 3개와 잘못된 라인 1개: 이벤트 3개, 오브젝트 성공, 파일 삭제
#[tokio::test]
async fn test_malformed_line_is_skipped() {
    let path = write_object(&[ELB_LINE, "not an access log line", ELB_LINE, ELB_LINE]);
    let object = DownloadedObject::new("AWSLogs/elb/1.log", &path, LogFormat::Elb);

    let (results, events) = run_with_channel(PublisherConfig::default(), &[object]).await;

    let summary = results[0].as_ref().expect("publish should succeed");
    assert_eq!(summary.lines, 4);
    assert_eq!(summary.events, 3);
    assert_eq!(summary.malformed, 1);
    assert_eq!(events.len(), 3);
    assert!(!path.exists(), "object file should be removed after publish");
}

/// ELB 예시 라인의 필드 검증
#[tokio::test]
async fn test_elb_event_fields() {
    let path = write_object(&[ELB_LINE]);
    let object = DownloadedObject::new("elb.log", &path, LogFormat::Elb);

    let (_, events) = run_with_channel(PublisherConfig::default(), &[object]).await;
    let event = &events[0];

    assert_eq!(event.get("backend_status_code"), Some(&FieldValue::Int(200)));
    assert_eq!(event.get_str("ssl_protocol"), Some("TLSv1.2"));
    assert_eq!(event.get_str("elb"), Some("spline_reticulation_lb"));
    assert_eq!(event.get_str("request_method"), Some("PUT"));
    assert_eq!(event.get_str("request_path"), Some("/reticulate/spline/1"));
    assert!(!event.contains(ERROR_FIELD));
    assert!(!event.contains("timestamp"));
    assert_eq!(event.timestamp.to_rfc3339(), "2017-07-31T20:30:57.975041+00:00");
}

/// CloudFront time_taken = -1: 필드 삭제 + error 기록
#[tokio::test]
async fn test_cloudfront_negative_time_taken() {
    let path = write_object(&["#Version: 1.0", CF_TIMEOUT_LINE]);
    let object = DownloadedObject::new("cf.log", &path, LogFormat::CloudFront);
    let config = PublisherConfigBuilder::new()
        .format(LogFormat::CloudFront)
        .build()
        .expect("valid config");

    let (results, events) = run_with_channel(config, &[object]).await;
    assert_eq!(results[0].as_ref().map(|s| s.events).ok(), Some(1));

    let event = &events[0];
    assert!(!event.contains("time_taken"));
    assert_eq!(
        event.get_str(ERROR_FIELD),
        Some("time_taken was -1 -- upstream server timed out, disconnected, or sent malformed response")
    );
    assert_eq!(event.get("sc_status"), Some(&FieldValue::Int(504)));
}

/// ALB trace 재구성: Parent가 있으면 자식 span
#[tokio::test]
async fn test_alb_trace_fields() {
    let path = write_object(&[ALB_LINE]);
    let object = DownloadedObject::new("alb.log", &path, LogFormat::Alb);
    let config = PublisherConfigBuilder::new()
        .format(LogFormat::Alb)
        .trace_enrichment(true)
        .build()
        .expect("valid config");

    let (_, events) = run_with_channel(config, &[object]).await;
    let event = &events[0];

    assert_eq!(
        event.get_str("trace.trace_id"),
        Some("1-58337281-1d84f3d73c47ec4e58577259")
    );
    assert_eq!(event.get_str("trace.parent_id"), Some("53995c3f42cd8ad8"));
    assert_eq!(event.get_str("trace.span_id"), Some("1-58337281-aaaa"));
    assert_eq!(event.get_str("service_name"), Some("app/my-loadbalancer/50dc6c495c0c9188"));
    assert_eq!(event.get_str("name"), Some("/cart"));
    assert!(!event.contains("trace_id"));
    assert!(event.contains("request.headers.x-amzn-trace-id"));
    // response_time - request_creation_time
    assert_eq!(event.get_f64("duration_ms"), Some(11822.0));
}

/// edge 모드: Parent를 무시하고 로드 밸런서가 루트 span이 됨
#[tokio::test]
async fn test_alb_edge_mode_ignores_parent() {
    let line = ALB_LINE.replace(";Self=1-58337281-aaaa", "");
    let path = write_object(&[line.as_str()]);
    let object = DownloadedObject::new("alb.log", &path, LogFormat::Alb);
    let config = PublisherConfigBuilder::new()
        .format(LogFormat::Alb)
        .trace_enrichment(true)
        .edge_mode(true)
        .build()
        .expect("valid config");

    let (_, events) = run_with_channel(config, &[object]).await;
    let event = &events[0];

    assert!(!event.contains("trace.parent_id"));
    assert_eq!(event.get_str("trace.span_id"), event.get_str("trace.trace_id"));
}

/// trace 보강이 꺼져 있으면 trace_id 열이 그대로 남음
#[tokio::test]
async fn test_alb_without_trace_enrichment() {
    let path = write_object(&[ALB_LINE]);
    let object = DownloadedObject::new("alb.log", &path, LogFormat::Alb);
    let config = PublisherConfigBuilder::new()
        .format(LogFormat::Alb)
        .build()
        .expect("valid config");

    let (_, events) = run_with_channel(config, &[object]).await;
    assert!(events[0].contains("trace_id"));
    assert!(!events[0].contains("trace.trace_id"));
}

/// 유지된 이벤트에는 유효 샘플 레이트가 기록됨
#[tokio::test]
async fn test_sample_rate_annotation() {
    let lines = vec![ELB_LINE; 50];
    let path = write_object(&lines);
    let object = DownloadedObject::new("elb.log", &path, LogFormat::Elb);
    let config = PublisherConfigBuilder::new()
        .sample_rate(5)
        .build()
        .expect("valid config");

    let (_, events) = run_with_channel(config, &[object]).await;

    assert_eq!(events.len(), 10);
    assert!(events.iter().all(|e| e.sample_rate() == 5));
}

/// 없는 파일은 ParseFailure이고 파이프라인은 계속 동작함
#[tokio::test]
async fn test_missing_file_then_valid_object() {
    let missing = DownloadedObject::new("gone.log", "/nonexistent/honeyaws/gone.log", LogFormat::Elb);
    let path = write_object(&[ELB_LINE]);
    let valid = DownloadedObject::new("ok.log", &path, LogFormat::Elb);

    let (results, events) = run_with_channel(PublisherConfig::default(), &[missing, valid]).await;

    assert!(matches!(results[0], Err(PublisherError::ParseFailure { .. })));
    assert!(results[1].is_ok());
    assert_eq!(events.len(), 1);
}

/// 여러 오브젝트를 동시에 publish해도 모든 이벤트가 전달됨
#[tokio::test]
async fn test_concurrent_publish() {
    let (tx, rx) = mpsc::channel(1024);
    let publisher = std::sync::Arc::new(
        PublisherBuilder::new()
            .config(PublisherConfig::default())
            .sink(Box::new(ChannelSink::new(tx)))
            .build()
            .expect("failed to build publisher"),
    );

    let mut handles = Vec::new();
    for i in 0..4 {
        let publisher = std::sync::Arc::clone(&publisher);
        let lines = vec![ELB_LINE; 5];
        let path = write_object(&lines);
        handles.push(tokio::spawn(async move {
            let object = DownloadedObject::new(format!("obj-{i}"), &path, LogFormat::Elb);
            publisher.publish(&object).await
        }));
    }
    for handle in handles {
        handle.await.expect("task panicked").expect("publish failed");
    }

    let publisher = std::sync::Arc::into_inner(publisher).expect("publisher still shared");
    publisher.close().await.expect("failed to close publisher");
    assert_eq!(collect(rx).await.len(), 20);
}

/// Loki 싱크 종단 간 흐름 (mockito)
#[tokio::test]
async fn test_loki_end_to_end() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/loki/api/v1/push")
        .match_header("authorization", "Basic dXNlcjprZXk=")
        .match_body(mockito::Matcher::Regex(
            r#""aws_elb":"spline_reticulation_lb""#.to_owned(),
        ))
        .with_status(204)
        .expect(2)
        .create_async()
        .await;

    let sink = LokiSink::new(
        format!("{}/loki/api/v1/push", server.url()),
        "user",
        "key",
        "test",
        std::time::Duration::from_secs(5),
    )
    .expect("valid sink");

    let publisher = PublisherBuilder::new()
        .config(PublisherConfig::default())
        .sink(Box::new(sink))
        .build()
        .expect("failed to build publisher");

    let path = write_object(&[ELB_LINE, ELB_LINE]);
    let object = DownloadedObject::new("elb.log", &path, LogFormat::Elb);
    publisher.publish(&object).await.expect("publish failed");
    publisher.close().await.expect("close failed");

    mock.assert_async().await;
}
