//! End-to-end runs of the library against a local mock server

mod common;

use network_speed_tester::{
    logging::MeasurementLogger, models::Config, AppError, SpeedTestApp,
};
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

fn config_for(server: &MockServer) -> Config {
    Config {
        server_url: server.uri(),
        metadata_url: server.uri(),
        latency_count: 5,
        timeout_seconds: Some(10),
        enable_color: false,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_full_run_builds_report() {
    let server = common::start_speed_server().await;

    let app = SpeedTestApp::new(config_for(&server))
        .unwrap()
        .with_logger(MeasurementLogger::quiet());
    let report = app.run().await.unwrap();

    assert_eq!(report.server.city, "Amsterdam");
    assert_eq!(report.server.code, "AMS");
    assert_eq!(report.client.ip, "198.51.100.23");
    assert_eq!(report.client.region, "NL");

    assert_eq!(report.latency.samples, 5);
    assert!(report.latency.min <= report.latency.median);
    assert!(report.latency.median <= report.latency.max);
    assert!(report.latency.jitter_mean >= 0.0);

    // Default presets: 2 downloads, 10 + 10 + 8 uploads
    assert_eq!(report.download.samples, 2);
    assert_eq!(report.upload.samples, 28);
    assert!(report.download.p90 > 0.0);
    assert!(report.upload.p90 > 0.0);
    assert_eq!(report.failures.total(), 0);

    // Plain-HTTP IP-literal server: no lookup, no handshake
    assert!(report.phases.dns_ms.is_none());
    assert!(report.phases.tls_ms.is_none());
    assert!(report.phases.tcp_ms.is_some());
    assert_eq!(report.phases.server_ms, Some(1.25));
}

#[tokio::test]
async fn test_upload_speed_follows_server_time() {
    let server = common::start_speed_server().await;

    let report = SpeedTestApp::new(config_for(&server))
        .unwrap()
        .with_logger(MeasurementLogger::quiet())
        .run()
        .await
        .unwrap();

    // 1,001,000 bytes in 8 ms is the fastest upload sample
    let fastest = 1_001_000.0 * 8.0 / 0.008 / 1e6;
    assert!((report.upload.max - fastest).abs() < 1e-6);
    let slowest = 11_000.0 * 8.0 / 0.008 / 1e6;
    assert!((report.upload.min - slowest).abs() < 1e-6);
}

#[tokio::test]
async fn test_missing_metadata_aborts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/__down"))
        .respond_with(ResponseTemplate::new(200).insert_header("server-timing", "cfRequestDuration;dur=1"))
        .mount(&server)
        .await;

    let result = SpeedTestApp::new(config_for(&server))
        .unwrap()
        .with_logger(MeasurementLogger::quiet())
        .run()
        .await;

    assert!(matches!(result, Err(AppError::Network(_))));
}

#[tokio::test]
async fn test_malformed_locations_abort_with_parse_error() {
    let server = common::start_speed_server().await;
    Mock::given(method("GET"))
        .and(path("/locations"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cdn-cgi/trace"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ip=198.51.100.23\nloc=NL\ncolo=AMS\n"))
        .mount(&server)
        .await;

    let result = SpeedTestApp::new(config_for(&server))
        .unwrap()
        .with_logger(MeasurementLogger::quiet())
        .run()
        .await;

    assert!(matches!(result, Err(AppError::Parse(_))));
}

#[tokio::test]
async fn test_unreachable_measurements_fail_with_statistics_error() {
    let server = MockServer::start().await;
    common::mount_metadata(&server).await;
    // No measurement routes: every request gets a 404 without server-timing
    let result = SpeedTestApp::new(config_for(&server))
        .unwrap()
        .with_logger(MeasurementLogger::quiet())
        .run()
        .await;

    match result {
        Err(AppError::Statistics(message)) => assert!(message.contains("latency")),
        other => panic!("expected a statistics error, got {:?}", other.map(|r| r.server)),
    }
}
