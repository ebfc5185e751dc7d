//! honeyaws.toml 통합 설정 테스트
//!
//! - honeyaws.toml.example 파싱 테스트
//! - 환경변수 우선순위 테스트
//! - 파일 로딩 / 잘못된 값 에러 테스트

use std::io::Write;

use honeyaws_core::config::HoneyawsConfig;
use honeyaws_core::error::{ConfigError, HoneyawsError};
use honeyaws_core::types::LogFormat;
use serial_test::serial;

// =============================================================================
// honeyaws.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let content = include_str!("../../../honeyaws.toml.example");
    let config = HoneyawsConfig::parse(content).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.state_dir, "/var/lib/honeyaws");
    assert_eq!(config.publisher.format, LogFormat::Elb);
    assert_eq!(config.publisher.dataset, "aws-$SERVICE-access");
    assert_eq!(config.sampler.interval_secs, 300);
    assert_eq!(config.sampler.decay, 0.5);
}

#[test]
fn example_config_passes_validation() {
    let content = include_str!("../../../honeyaws.toml.example");
    let config = HoneyawsConfig::parse(content).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

// =============================================================================
// 파일 로딩
// =============================================================================

#[tokio::test]
#[serial]
async fn load_reads_file_and_validates() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "[publisher]\nformat = \"aws_cf_web\"\n\n[sampler]\nsampler_type = \"ema\"\ndecay = 0.2"
    )
    .unwrap();

    let config = HoneyawsConfig::load(file.path()).await.unwrap();
    assert_eq!(config.publisher.format, LogFormat::CloudFront);
    assert_eq!(config.sampler.sampler_type, "ema");
    assert_eq!(config.resolved_dataset(), "aws-cloudfront-access");
}

#[tokio::test]
#[serial]
async fn load_rejects_invalid_decay() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[sampler]\ndecay = 1.0").unwrap();

    let err = HoneyawsConfig::load(file.path()).await.unwrap_err();
    assert!(matches!(
        err,
        HoneyawsError::Config(ConfigError::InvalidValue { ref field, .. }) if field == "sampler.decay"
    ));
}

// =============================================================================
// 환경변수 우선순위
// =============================================================================

#[test]
#[serial]
fn env_overrides_take_precedence_over_file() {
    let mut config = HoneyawsConfig::parse("[publisher]\nedge_mode = false\nsample_rate = 5")
        .expect("should parse");

    // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
    unsafe {
        std::env::set_var("HONEYAWS_PUBLISHER_EDGE_MODE", "true");
        std::env::set_var("HONEYAWS_PUBLISHER_SAMPLE_RATE", "20");
        std::env::set_var("HONEYAWS_PUBLISHER_FORMAT", "aws_alb");
    }
    config.apply_env_overrides();
    unsafe {
        std::env::remove_var("HONEYAWS_PUBLISHER_EDGE_MODE");
        std::env::remove_var("HONEYAWS_PUBLISHER_SAMPLE_RATE");
        std::env::remove_var("HONEYAWS_PUBLISHER_FORMAT");
    }

    assert!(config.publisher.edge_mode);
    assert_eq!(config.publisher.sample_rate, 20);
    assert_eq!(config.publisher.format, LogFormat::Alb);
}

#[test]
#[serial]
fn unparsable_env_override_keeps_file_value() {
    let mut config = HoneyawsConfig::parse("[sampler]\ninterval_secs = 60").expect("should parse");

    // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
    unsafe { std::env::set_var("HONEYAWS_SAMPLER_INTERVAL_SECS", "soon") };
    config.apply_env_overrides();
    unsafe { std::env::remove_var("HONEYAWS_SAMPLER_INTERVAL_SECS") };

    assert_eq!(config.sampler.interval_secs, 60);
}
