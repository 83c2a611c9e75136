//! End-to-end tests for ingestion, flushing and per-minute queries
//!
//! Each test runs a full service against its own temporary partition directory.

use hr_metrics::config::Config;
use hr_metrics::models::{RawReading, Reading};
use hr_metrics::query::QueryRequest;
use hr_metrics::Service;
use serde_json::json;
use tempfile::TempDir;

fn config(temp: &TempDir) -> Config {
    Config::with_data_dir(temp.path())
}

fn reading(device: &str, user: &str, ts: &str, hr: i32) -> Reading {
    Reading::new(device, user, ts, hr).expect("valid reading")
}

fn range(user: &str, start: &str, end: &str) -> QueryRequest {
    QueryRequest::parse(user, start, end, None).expect("valid range")
}

mod batch_tests {
    use super::*;

    #[tokio::test]
    async fn test_counts_add_up_and_valid_rows_are_queryable() {
        let temp = TempDir::new().unwrap();
        let service = Service::start(config(&temp)).unwrap();

        let batch: Vec<RawReading> = vec![
            json!({ "device_id": "device_a", "user_id": "u1",
                    "timestamp": "2024-01-15T10:00:00Z", "heart_rate": 70 }),
            json!({ "device_id": "device_a", "user_id": "u1",
                    "timestamp": "2024-01-15T10:01:00Z", "heart_rate": 71 }),
            json!({ "device_id": "device_a", "user_id": "u1", "timestamp": "bogus", "heart_rate": 72 }),
            json!({ "user_id": "u1", "timestamp": "2024-01-15T10:03:00Z", "heart_rate": 73 }),
        ]
        .into_iter()
        .map(RawReading::from_value)
        .collect();
        let total = batch.len();

        let outcome = service.submit_batch(batch).await;
        assert_eq!(outcome.accepted, 2);
        assert_eq!(outcome.rejected, 2);
        assert_eq!(outcome.total(), total);

        service.flush().await.unwrap();
        let samples = service
            .query(&range("u1", "2024-01-15T10:00:00Z", "2024-01-15T10:59:00Z"))
            .await
            .unwrap();
        assert_eq!(samples.len(), 2);

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_client_duplicates_are_kept() {
        let temp = TempDir::new().unwrap();
        let service = Service::start(config(&temp)).unwrap();

        service.submit_reading(reading("device_a", "u1", "2024-01-15T10:00:00Z", 60)).await;
        service.submit_reading(reading("device_a", "u1", "2024-01-15T10:00:00Z", 60)).await;
        service.submit_reading(reading("device_a", "u1", "2024-01-15T10:00:30Z", 90)).await;
        service.flush().await.unwrap();

        let day = chrono::NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(service.store().read_partition(day).unwrap().len(), 3);

        // Duplicates weigh into the mean: (60 + 60 + 90) / 3
        let samples = service
            .query(&range("u1", "2024-01-15T10:00:00Z", "2024-01-15T10:01:00Z"))
            .await
            .unwrap();
        assert_eq!(samples[0].heart_rate, 70.0);

        service.shutdown().await.unwrap();
    }
}

mod query_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_store_returns_nothing() {
        let temp = TempDir::new().unwrap();
        let service = Service::start(config(&temp)).unwrap();

        let samples = service
            .query(&range("anyone", "2020-01-01T00:00:00Z", "2030-01-01T00:00:00Z"))
            .await
            .unwrap();
        assert!(samples.is_empty());

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_repeat_query_is_identical() {
        let temp = TempDir::new().unwrap();
        let service = Service::start(config(&temp)).unwrap();

        for (i, hr) in [70, 80, 90].iter().enumerate() {
            let ts = format!("2024-01-15T10:0{}:15Z", i);
            service.submit_reading(reading("device_b", "u1", &ts, *hr)).await;
        }
        service.flush().await.unwrap();

        let request = range("u1", "2024-01-15T10:00:00Z", "2024-01-15T11:00:00Z");
        let first = service.query(&request).await.unwrap();
        let second = service.query(&request).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_sorted_without_duplicate_minutes() {
        let temp = TempDir::new().unwrap();
        let service = Service::start(config(&temp)).unwrap();

        // Deliberately out of order, several readings per minute, two devices
        let rows = [
            ("device_b", "2024-01-15T10:03:10Z", 90),
            ("device_a", "2024-01-15T10:01:50Z", 70),
            ("device_b", "2024-01-15T10:01:05Z", 95),
            ("device_a", "2024-01-15T10:00:00Z", 65),
            ("device_a", "2024-01-15T10:03:59.999Z", 75),
            ("device_b", "2024-01-15T10:02:30Z", 85),
        ];
        for (device, ts, hr) in rows {
            service.submit_reading(reading(device, "u1", ts, hr)).await;
        }
        service.flush().await.unwrap();

        let samples = service
            .query(&range("u1", "2024-01-15T10:00:00Z", "2024-01-15T10:59:59Z"))
            .await
            .unwrap();
        let minutes: Vec<String> = samples.iter().map(|s| s.timestamp_str()).collect();
        let mut sorted = minutes.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(minutes, sorted);
        assert_eq!(minutes.len(), 4);

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_cross_partition_range() {
        let temp = TempDir::new().unwrap();
        let service = Service::start(config(&temp)).unwrap();

        service.submit_reading(reading("device_a", "u1", "2024-01-16T00:00:30Z", 66)).await;
        service.submit_reading(reading("device_a", "u1", "2024-01-15T23:59:10Z", 64)).await;
        service.flush().await.unwrap();

        let samples = service
            .query(&range("u1", "2024-01-15T23:00:00Z", "2024-01-16T01:00:00Z"))
            .await
            .unwrap();
        let got: Vec<(String, f64)> = samples
            .iter()
            .map(|s| (s.timestamp_str(), s.heart_rate))
            .collect();
        assert_eq!(
            got,
            vec![
                ("2024-01-15T23:59:00Z".to_string(), 64.0),
                ("2024-01-16T00:00:00Z".to_string(), 66.0),
            ]
        );

        service.shutdown().await.unwrap();
    }
}

mod priority_tests {
    use super::*;

    #[tokio::test]
    async fn test_device_a_wins_over_device_b() {
        let temp = TempDir::new().unwrap();
        let service = Service::start(config(&temp)).unwrap();

        service.submit_reading(reading("device_b", "u1", "2024-01-15T10:00:00Z", 80)).await;
        service.submit_reading(reading("device_a", "u1", "2024-01-15T10:00:00Z", 75)).await;
        service.submit_reading(reading("device_a", "u1", "2024-01-15T10:00:40Z", 77)).await;
        service.flush().await.unwrap();

        let samples = service
            .query(&range("u1", "2024-01-15T10:00:00Z", "2024-01-15T10:01:00Z"))
            .await
            .unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].device_id, "device_a");
        assert_eq!(samples[0].heart_rate, 76.0);

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_mean_of_three() {
        let temp = TempDir::new().unwrap();
        let service = Service::start(config(&temp)).unwrap();

        for (sec, hr) in [(5, 70), (25, 72), (45, 74)] {
            let ts = format!("2024-01-15T10:00:{:02}Z", sec);
            service.submit_reading(reading("device_a", "u1", &ts, hr)).await;
        }
        service.flush().await.unwrap();

        let samples = service
            .query(&range("u1", "2024-01-15T10:00:00Z", "2024-01-15T10:01:00Z"))
            .await
            .unwrap();
        assert_eq!(samples[0].heart_rate, 72.00);

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_unknown_device_never_outranks() {
        let temp = TempDir::new().unwrap();
        let service = Service::start(config(&temp)).unwrap();

        service.submit_reading(reading("0_unlisted", "u1", "2024-01-15T10:00:00Z", 150)).await;
        service.submit_reading(reading("device_b", "u1", "2024-01-15T10:00:20Z", 81)).await;
        service.submit_reading(reading("0_unlisted", "u1", "2024-01-15T10:01:00Z", 150)).await;
        service.flush().await.unwrap();

        let samples = service
            .query(&range("u1", "2024-01-15T10:00:00Z", "2024-01-15T10:02:00Z"))
            .await
            .unwrap();
        assert_eq!(samples[0].device_id, "device_b");
        // Alone in its minute, an unlisted device still reports
        assert_eq!(samples[1].device_id, "0_unlisted");

        service.shutdown().await.unwrap();
    }
}

mod lifecycle_tests {
    use super::*;

    #[tokio::test]
    async fn test_threshold_makes_readings_queryable() {
        let temp = TempDir::new().unwrap();
        let cfg = Config {
            batch_size: 5,
            flush_interval_secs: 3600,
            ..config(&temp)
        };
        let service = Service::start(cfg).unwrap();

        for minute in 0..5 {
            let ts = format!("2024-01-15T10:{:02}:00Z", minute);
            service.submit_reading(reading("device_a", "u1", &ts, 70)).await;
        }

        // No flush call: the fifth reading crossed the threshold
        let samples = service
            .query(&range("u1", "2024-01-15T10:00:00Z", "2024-01-15T10:10:00Z"))
            .await
            .unwrap();
        assert_eq!(samples.len(), 5);

        service.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_persists_for_next_service() {
        let temp = TempDir::new().unwrap();

        let service = Service::start(config(&temp)).unwrap();
        service.submit_reading(reading("device_a", "u1", "2024-01-15T10:00:00Z", 70)).await;
        service.shutdown().await.unwrap();

        let reopened = Service::start(config(&temp)).unwrap();
        let samples = reopened
            .query(&range("u1", "2024-01-15T00:00:00Z", "2024-01-15T23:59:59Z"))
            .await
            .unwrap();
        assert_eq!(samples.len(), 1);
        reopened.shutdown().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_with_background_flush() {
        let temp = TempDir::new().unwrap();
        let cfg = Config {
            batch_size: 13,
            flush_interval_secs: 1,
            ..config(&temp)
        };
        let service = Service::start(cfg).unwrap();

        let mut handles = Vec::new();
        for user in 0..4 {
            let buffer = service.buffer();
            handles.push(tokio::spawn(async move {
                for minute in 0..30 {
                    let ts = format!("2024-01-15T11:{:02}:00Z", minute);
                    let r = Reading::new("device_a", format!("user_{}", user), ts, 60 + minute)
                        .unwrap();
                    buffer.ingest_one(r).await;
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        service.flush().await.unwrap();

        for user in 0..4 {
            let samples = service
                .query(&range(
                    &format!("user_{}", user),
                    "2024-01-15T11:00:00Z",
                    "2024-01-15T11:59:00Z",
                ))
                .await
                .unwrap();
            assert_eq!(samples.len(), 30);
        }

        service.shutdown().await.unwrap();
    }
}
