//! Integration tests for influxdb3-flight.
//!
//! These tests require a running InfluxDB 3 instance and are skipped unless
//! `INFLUX_HOST`, `INFLUX_TOKEN` and `INFLUX_DATABASE` are set, e.g.:
//!
//! ```bash
//! INFLUX_HOST=http://localhost:8181 INFLUX_TOKEN=... INFLUX_DATABASE=test \
//!     cargo test --test integration
//! ```
//!
//! Seed data is written through the HTTP line-protocol endpoint before
//! each test that needs it.

use std::sync::Arc;
use std::time::Duration;

use arrow_array::{ArrayRef, RecordBatch, StringArray};
use futures::StreamExt;
use influxdb3_flight::options::{QueryType, with_database, with_query_type};
use influxdb3_flight::{Client, ClientConfig, Error};
use serial_test::serial;

/// Client built from the environment, or `None` when no server is configured.
fn live_client() -> Option<Client> {
    let config = match ClientConfig::from_env() {
        Ok(config) if config.database.is_some() => config,
        _ => {
            eprintln!("Skipping test: INFLUX_HOST/INFLUX_TOKEN/INFLUX_DATABASE not set");
            return None;
        }
    };
    Some(Client::new(config).expect("client from environment"))
}

/// Write line protocol through the v3 HTTP API.
async fn write_lines(config: &ClientConfig, lines: &str) -> Result<(), Box<dyn std::error::Error>> {
    let url = format!(
        "{}/api/v3/write_lp?db={}&precision=nanosecond",
        config.host.trim_end_matches('/'),
        config.database.as_deref().unwrap_or_default()
    );

    let response = reqwest::Client::new()
        .post(&url)
        .header("Authorization", format!("Bearer {}", config.token))
        .header("Content-Type", "text/plain")
        .body(lines.to_string())
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await?;
        return Err(format!("Write failed: {} - {}", status, body).into());
    }

    Ok(())
}

/// Generate line protocol for N data points with distinct timestamps.
fn generate_line_protocol(measurement: &str, count: usize) -> String {
    let base_ts = 1_700_000_000_000_000_000i64; // 2023-11-14
    (0..count)
        .map(|i| {
            format!(
                "{},host=server{},region=us-east value={}.{} {}",
                measurement,
                i % 10,
                i % 100,
                i % 1000,
                base_ts + (i as i64 * 1_000_000_000)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Basic Integration Tests
// ============================================================================

#[tokio::test]
#[serial]
async fn test_basic_query() {
    let Some(client) = live_client() else { return };

    let measurement = "it_basic";
    write_lines(client.config(), &generate_line_protocol(measurement, 100))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let mut it = client
        .query(&format!(
            "SELECT * FROM {} WHERE time >= '2023-11-14T00:00:00Z'",
            measurement
        ))
        .await
        .unwrap();

    let mut count = 0;
    while let Some(record) = it.next_record().await.unwrap() {
        assert!(record.time().is_some());
        assert!(record.get_string("host").is_some());
        count += 1;
    }
    assert_eq!(count, 100, "Expected 100 records, got {}", count);
}

#[tokio::test]
#[serial]
async fn test_parametrized_query() {
    let Some(client) = live_client() else { return };

    let measurement = "it_params";
    write_lines(client.config(), &generate_line_protocol(measurement, 20))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let host: ArrayRef = Arc::new(StringArray::from(vec!["server3"]));
    let params = RecordBatch::try_from_iter([("host", host)]).unwrap();

    let records = client
        .query_parametrized(
            &format!("SELECT * FROM {} WHERE host = $host", measurement),
            params,
        )
        .await
        .unwrap()
        .collect_records()
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.get_string("host").as_deref() == Some("server3")));
}

#[tokio::test]
#[serial]
async fn test_influxql_query() {
    let Some(client) = live_client() else { return };

    let batches = client
        .query_with("SHOW MEASUREMENTS", [with_query_type(QueryType::InfluxQl)])
        .await
        .unwrap()
        .collect_batches()
        .await
        .unwrap();

    assert!(batches.iter().map(|b| b.num_rows()).sum::<usize>() > 0);
}

// ============================================================================
// Error Handling Tests
// ============================================================================

#[tokio::test]
#[serial]
async fn test_invalid_query_syntax() {
    let Some(client) = live_client() else { return };

    let result = client.query("SELEC nothing FROM").await;
    assert!(matches!(result, Err(Error::Remote { .. })));
}

#[tokio::test]
#[serial]
async fn test_unknown_database() {
    let Some(client) = live_client() else { return };

    let result = client
        .query_with("SELECT 1", [with_database("database_that_does_not_exist_12345")])
        .await;
    assert!(matches!(result, Err(Error::Remote { .. })));
}

#[tokio::test]
#[serial]
async fn test_query_reusable_after_error() {
    let Some(client) = live_client() else { return };

    assert!(client.query("SELEC").await.is_err());

    let rows: Vec<_> = client
        .query("SELECT 1 AS one")
        .await
        .unwrap()
        .into_record_stream()
        .collect()
        .await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].as_ref().unwrap().get_long("one"), Some(1));
}

#[tokio::test]
#[ignore] // Run with: cargo test --test integration test_large_result -- --ignored
#[serial]
async fn test_large_result() {
    let Some(client) = live_client() else { return };

    let measurement = "it_large";
    let total = 100_000;
    for chunk in 0..10 {
        let lines = generate_line_protocol(measurement, total / 10)
            .replace("server", &format!("chunk{}-server", chunk));
        write_lines(client.config(), &lines).await.unwrap();
    }
    tokio::time::sleep(Duration::from_secs(2)).await;

    let mut stream = client
        .query(&format!("SELECT * FROM {}", measurement))
        .await
        .unwrap()
        .into_batch_stream();

    let mut rows = 0;
    while let Some(batch) = stream.next().await {
        rows += batch.unwrap().num_rows();
    }
    assert!(rows >= total / 10);
}
