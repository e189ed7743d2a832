use bgv_ingest::{LokiSource, LokiSourceConfig, RecordSource, SourceError, TimeRange};
use chrono::{DateTime, TimeZone, Utc};
use httpmock::prelude::*;
use serde_json::json;

const T0_NS: i64 = 1_771_581_600_000_000_000; // 2026-02-20T10:00:00Z

fn window() -> TimeRange {
    TimeRange::new(
        Some(Utc.timestamp_nanos(T0_NS)),
        Some(Utc.timestamp_nanos(T0_NS + 3_600_000_000_000)),
    )
}

fn source_for(server: &MockServer, page_limit: usize) -> LokiSource {
    LokiSource::new(LokiSourceConfig {
        base_url: server.base_url(),
        page_limit,
        ..LokiSourceConfig::default()
    })
    .unwrap()
}

fn streams(values: Vec<(i64, serde_json::Value)>) -> serde_json::Value {
    let values: Vec<serde_json::Value> = values
        .into_iter()
        .map(|(ns, line)| json!([ns.to_string(), line.to_string()]))
        .collect();
    json!({
        "status": "success",
        "data": {
            "resultType": "streams",
            "result": [{"stream": {"app": "bg-producer"}, "values": values}]
        }
    })
}

#[tokio::test]
async fn single_page_yields_sorted_records_with_entry_timestamps() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/loki/api/v1/query_range")
                .query_param("direction", "forward")
                .query_param("limit", "100");
            then.status(200).json_body(streams(vec![
                (T0_NS + 2, json!({"seq": 2, "partition": 1, "offset": 20})),
                (T0_NS + 1, json!({"seq": 1, "partition": 0, "offset": 10})),
                (T0_NS + 3, json!({"seq": 3, "timestamp": "1999-01-01T00:00:00Z"})),
            ]));
        })
        .await;

    let src = source_for(&server, 100);
    let got = src.fetch_produced(&window()).await.unwrap();
    mock.assert_hits_async(1).await;

    let seqs: Vec<i64> = got.records.iter().map(|r| r.seq).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
    assert!(got.skipped.is_empty());

    // Entry time wins over the line's own timestamp field.
    let want: DateTime<Utc> = Utc.timestamp_nanos(T0_NS + 3);
    assert_eq!(got.records[2].timestamp, want);
    assert_eq!(got.records[2].partition, -1);
}

#[tokio::test]
async fn full_pages_advance_start_past_newest_entry() {
    let server = MockServer::start_async().await;
    let start = T0_NS.to_string();
    let second = (T0_NS + 21).to_string();

    let first_page = server
        .mock_async(|when, then| {
            when.path("/loki/api/v1/query_range")
                .query_param("start", start.as_str());
            then.status(200).json_body(streams(vec![
                (T0_NS + 10, json!({"seq": 1})),
                (T0_NS + 20, json!({"seq": 2})),
            ]));
        })
        .await;
    let second_page = server
        .mock_async(|when, then| {
            when.path("/loki/api/v1/query_range")
                .query_param("start", second.as_str());
            then.status(200)
                .json_body(streams(vec![(T0_NS + 30, json!({"seq": 3}))]));
        })
        .await;

    let src = source_for(&server, 2);
    let got = src.fetch_produced(&window()).await.unwrap();

    first_page.assert_hits_async(1).await;
    second_page.assert_hits_async(1).await;
    assert_eq!(got.records.len(), 3);
}

#[tokio::test]
async fn malformed_lines_are_diagnostics_not_errors() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path("/loki/api/v1/query_range");
            then.status(200).json_body(json!({
                "status": "success",
                "data": {"resultType": "streams", "result": [
                    {"stream": {}, "values": [
                        [(T0_NS + 1).to_string(), "{\"seq\": 7, \"group_id\": \"g1\"}"],
                        [(T0_NS + 2).to_string(), "level=info msg=\"Message consumed\""],
                        [(T0_NS + 3).to_string(), "{\"seq\": 7}"]
                    ]}
                ]}
            }));
        })
        .await;

    let src = source_for(&server, 100);
    let got = src.fetch_consumed(&window()).await.unwrap();

    assert_eq!(got.records.len(), 2);
    assert_eq!(got.records[0].group_id, "g1");
    assert_eq!(got.records[1].group_id, "unknown");
    assert_eq!(got.skipped.len(), 1);
    assert_eq!(got.skipped[0].location, format!("loki@{}", T0_NS + 2));
}

#[tokio::test]
async fn http_error_status_is_a_format_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path("/loki/api/v1/query_range");
            then.status(500).body("too many outstanding requests");
        })
        .await;

    let err = source_for(&server, 100)
        .fetch_produced(&window())
        .await
        .unwrap_err();
    match err {
        SourceError::Format { detail, .. } => {
            assert!(detail.contains("500"), "{detail}");
            assert!(detail.contains("too many outstanding requests"));
        }
        other => panic!("expected Format, got {other:?}"),
    }
}

#[tokio::test]
async fn non_success_status_field_is_a_format_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path("/loki/api/v1/query_range");
            then.status(200)
                .json_body(json!({"status": "error", "error": "parse error"}));
        })
        .await;

    let err = source_for(&server, 100)
        .fetch_consumed(&window())
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Format { .. }), "{err:?}");
}

#[tokio::test]
async fn unreachable_endpoint_is_a_connectivity_error() {
    let src = LokiSource::new(LokiSourceConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        ..LokiSourceConfig::default()
    })
    .unwrap();

    let err = src.fetch_produced(&window()).await.unwrap_err();
    match err {
        SourceError::Connectivity { source, .. } => assert_eq!(source, "http://127.0.0.1:1"),
        other => panic!("expected Connectivity, got {other:?}"),
    }
}

#[tokio::test]
async fn auth_and_tenant_headers_are_sent() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.path("/loki/api/v1/query_range")
                .header("authorization", "Bearer glsa_test_token")
                .header("X-Scope-OrgID", "team-a");
            then.status(200).json_body(streams(vec![]));
        })
        .await;

    let src = LokiSource::new(LokiSourceConfig {
        base_url: server.base_url(),
        bearer_token: Some("glsa_test_token".to_string()),
        tenant_id: Some("team-a".to_string()),
        ..LokiSourceConfig::default()
    })
    .unwrap();

    let got = src.fetch_produced(&window()).await.unwrap();
    mock.assert_hits_async(1).await;
    assert!(got.records.is_empty());
}

#[tokio::test]
async fn open_range_is_rejected_before_any_request() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.path("/loki/api/v1/query_range");
            then.status(200).json_body(streams(vec![]));
        })
        .await;

    let err = source_for(&server, 100)
        .fetch_produced(&TimeRange::unbounded())
        .await
        .unwrap_err();
    assert!(matches!(err, SourceError::Config(_)));
    mock.assert_hits_async(0).await;
}
