//! Integration tests for metrics server functionality.

use honeyaws_core::config::MetricsConfig;
use honeyaws_daemon::metrics_server;
use serial_test::serial;

#[test]
fn test_listen_addr_resolves_config() {
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "127.0.0.1".to_owned(),
        port: 9100,
    };
    let addr = metrics_server::listen_addr(&config).expect("should parse address");
    assert_eq!(addr.port(), 9100);
    assert!(addr.ip().is_loopback());
}

#[tokio::test]
#[serial]
async fn test_install_metrics_recorder_fails_with_invalid_address() {
    // Given: an invalid listen address
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "999.999.999.999".to_owned(),
        port: 9100,
    };

    // Then: installation fails before touching the global recorder
    assert!(metrics_server::install_metrics_recorder(&config).is_err());
}

#[tokio::test]
#[serial]
async fn test_install_metrics_recorder_succeeds_with_valid_config() {
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "127.0.0.1".to_owned(),
        port: 19100,
    };

    let result = metrics_server::install_metrics_recorder(&config);
    assert!(
        result.is_ok(),
        "install_metrics_recorder should succeed with valid config: {:?}",
        result.err()
    );

    // A second global recorder is rejected.
    let again = MetricsConfig {
        port: 19101,
        ..config
    };
    assert!(metrics_server::install_metrics_recorder(&again).is_err());
}
