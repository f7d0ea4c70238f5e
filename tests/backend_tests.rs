//! Metrics client against a mock intake API.

mod common;

use network_health::backend::MetricsClient;
use network_health::error::HealthError;
use network_health::metrics::normalize;
use network_health::probes::iperf::parse_bandwidth_output;
use network_health::probes::{RawMetricSet, TestType};
use secrecy::SecretString;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const API_KEY: &str = "0123456789abcdef";

fn client_for(server: &MockServer) -> MetricsClient {
    MetricsClient::new(
        SecretString::from(API_KEY.to_string()),
        "probe-01",
        &common::backend_config(&server.uri()),
    )
    .unwrap()
}

fn ping_metrics() -> RawMetricSet {
    [
        ("packet_loss", "0"),
        ("minimum_latency", "0.984"),
        ("average_latency", "1.081"),
        ("max_latency", "1.210"),
        ("standard_deviation_latency", "0.095"),
    ]
    .into_iter()
    .collect()
}

async fn mount_validate(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/api/v1/validate"))
        .and(header("DD-API-KEY", API_KEY))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(status).set_body_string(r#"{"valid":true}"#))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_submit_before_validation_makes_no_requests() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let batch = normalize(&ping_metrics(), client.host(), TestType::PingLocal).unwrap();
    let err = client.submit(&batch).await.unwrap_err();

    assert!(matches!(err, HealthError::NotAuthenticated));
    let received = server.received_requests().await.unwrap();
    assert!(received.is_empty());
}

#[tokio::test]
async fn test_forbidden_validation_leaves_client_unauthenticated() {
    let server = MockServer::start().await;
    mount_validate(&server, 403).await;
    Mock::given(method("POST"))
        .and(path("/api/v2/series"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    let err = client.validate_credentials().await.unwrap_err();
    match err {
        HealthError::AuthenticationFailed { status, reason } => {
            assert_eq!(status, 403);
            assert_eq!(reason, "Forbidden");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!client.is_validated());

    let err = client
        .submit_metrics(&ping_metrics(), TestType::PingLocal)
        .await
        .unwrap_err();
    assert!(matches!(err, HealthError::NotAuthenticated));
}

#[tokio::test]
async fn test_validated_client_posts_series_envelope() {
    let server = MockServer::start().await;
    mount_validate(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/api/v2/series"))
        .and(header("DD-API-KEY", API_KEY))
        .and(header("Content-Type", "application/json"))
        .and(header("Accept", "application/json"))
        .respond_with(ResponseTemplate::new(202).set_body_string(r#"{"errors":[]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    client.validate_credentials().await.unwrap();
    assert!(client.is_validated());

    client
        .submit_metrics(&ping_metrics(), TestType::PingRemote)
        .await
        .unwrap();
    assert!(client.is_validated());

    let received = server.received_requests().await.unwrap();
    let post = received
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .expect("series request");
    let body: serde_json::Value = serde_json::from_slice(&post.body).unwrap();
    let series = body["series"].as_array().unwrap();

    assert_eq!(series.len(), 5);
    assert_eq!(series[0]["metric"], "network_health.ping_remote.packet_loss");
    assert_eq!(series[0]["type"], 1);
    assert_eq!(series[0]["unit"], "percent");
    assert_eq!(series[1]["unit"], "millisecond");
    assert_eq!(series[1]["type"], 2);
    assert_eq!(series[0]["resources"][0]["name"], "probe-01");
    assert_eq!(series[0]["resources"][0]["type"], "host");

    let ts = &series[0]["points"][0]["timestamp"];
    assert!(series.iter().all(|s| &s["points"][0]["timestamp"] == ts));
}

#[tokio::test]
async fn test_rejected_submission_is_distinct_error() {
    let server = MockServer::start().await;
    mount_validate(&server, 200).await;
    Mock::given(method("POST"))
        .and(path("/api/v2/series"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    client.validate_credentials().await.unwrap();

    let bandwidth = parse_bandwidth_output(common::IPERF_OUTPUT).unwrap();
    let err = client
        .submit_metrics(&bandwidth, TestType::BandwidthLocal)
        .await
        .unwrap_err();
    match err {
        HealthError::SubmissionFailed { status, reason } => {
            assert_eq!(status, 400);
            assert_eq!(reason, "Bad Request");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // a failed submission does not revoke validation
    assert!(client.is_validated());
}

#[tokio::test]
async fn test_revalidation_failure_drops_validated_state() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/validate"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/validate"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let mut client = client_for(&server);
    client.validate_credentials().await.unwrap();
    assert!(client.is_validated());

    let err = client.validate_credentials().await.unwrap_err();
    assert!(matches!(err, HealthError::AuthenticationFailed { status: 401, .. }));
    assert!(!client.is_validated());
}

#[tokio::test]
async fn test_unreachable_backend_is_transport_error() {
    let config = common::backend_config("http://127.0.0.1:9");
    let mut client =
        MetricsClient::new(SecretString::from(API_KEY.to_string()), "probe-01", &config).unwrap();
    let err = client.validate_credentials().await.unwrap_err();
    assert!(matches!(err, HealthError::Transport(_)));
    assert!(!client.is_validated());
}

#[test]
fn test_debug_output_hides_api_key() {
    let config = common::backend_config("http://127.0.0.1:9");
    let client =
        MetricsClient::new(SecretString::from(API_KEY.to_string()), "probe-01", &config).unwrap();
    assert!(!format!("{client:?}").contains(API_KEY));
}
