//! Streaming and chunked batch resolution.

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;

use fedview_core::fixtures::StaticFetcher;
use fedview_core::FetchError;
use fedview_resolver::{BatchConfig, BatchOutcome, BatchResolver, ErrorKind};

use common::*;

fn batch(fetcher: StaticFetcher, chunk_pause: Duration) -> BatchResolver {
    let resolver = Arc::new(resolver(fetcher, ScriptedProbe::healthy()));
    BatchResolver::new(
        resolver,
        BatchConfig {
            chunk_size: 5,
            chunk_pause,
        },
    )
    .unwrap()
}

fn twelve_posts() -> (StaticFetcher, Vec<String>) {
    let mut fetcher = fetcher_with_alice();
    let mut ids = Vec::new();
    for n in 1..=12 {
        fetcher = fetcher.with_post(alice_post(n));
        ids.push(status_url(n));
    }
    (fetcher, ids)
}

#[test]
fn test_zero_chunk_size_is_rejected() {
    let resolver = Arc::new(resolver(StaticFetcher::new(), ScriptedProbe::healthy()));
    let config = BatchConfig {
        chunk_size: 0,
        ..BatchConfig::default()
    };
    assert!(BatchResolver::new(resolver, config).is_err());
}

#[test]
fn test_chunk_plan() {
    let batch = batch(StaticFetcher::new(), Duration::ZERO);
    assert_eq!(batch.chunk_plan(12), vec![0..5, 5..10, 10..12]);
    assert_eq!(batch.chunk_plan(5), vec![0..5]);
    assert!(batch.chunk_plan(0).is_empty());
}

#[tokio::test]
async fn test_chunks_of_five_five_two() {
    let (fetcher, ids) = twelve_posts();
    let batch = batch(fetcher, Duration::from_millis(10));

    let reports: Vec<_> = batch.chunks(ids).collect().await;

    let sizes: Vec<_> = reports.iter().map(|r| r.results.len()).collect();
    assert_eq!(sizes, vec![5, 5, 2]);
    let offsets: Vec<_> = reports.iter().map(|r| r.offset).collect();
    assert_eq!(offsets, vec![0, 5, 10]);
    assert!(reports
        .iter()
        .flat_map(|r| &r.results)
        .all(|item| matches!(item.outcome, BatchOutcome::Resolved(_))));
    assert_eq!(reports[2].results[1].identifier, status_url(12));
}

#[tokio::test]
async fn test_failed_chunk_does_not_stop_later_chunks() {
    let (fetcher, ids) = twelve_posts();
    let fetcher = fetcher.with_panic(status_url(7));
    let batch = batch(fetcher, Duration::ZERO);

    let reports: Vec<_> = batch.chunks(ids).collect().await;

    assert_eq!(reports.len(), 3);
    assert_eq!(reports[1].index, 1);
    assert!(reports[1].results.iter().all(|item| matches!(
        &item.outcome,
        BatchOutcome::Failed(err) if err.kind == ErrorKind::Unknown
    )));
    assert_eq!(reports[1].results[0].identifier, status_url(6));
    assert!(reports[2]
        .results
        .iter()
        .all(|item| item.outcome.resolved().is_some()));
}

#[tokio::test]
async fn test_stream_delivers_around_a_hung_item() {
    let fetcher = fetcher_with_alice()
        .with_post(alice_post(1))
        .with_hang(status_url(2))
        .with_post(alice_post(3));
    let batch = batch(fetcher, Duration::ZERO);

    let results: Vec<_> = batch
        .stream([status_url(1), status_url(2), status_url(3)])
        .collect()
        .await;

    assert_eq!(results.len(), 3);
    let order: Vec<_> = results.iter().map(|r| r.identifier.clone()).collect();
    assert_eq!(order[2], status_url(2));
    assert!(order[..2].contains(&status_url(1)));
    assert!(order[..2].contains(&status_url(3)));
    assert!(matches!(
        &results[2].outcome,
        BatchOutcome::Failed(err) if err.kind == ErrorKind::Timeout
    ));
}

#[tokio::test]
async fn test_panicking_item_fails_alone() {
    let fetcher = fetcher_with_alice()
        .with_post(alice_post(1))
        .with_panic(status_url(2));
    let batch = batch(fetcher, Duration::ZERO);

    let results = batch.resolve_all([status_url(1), status_url(2)]).await;

    assert!(results[0].outcome.resolved().is_some());
    match &results[1].outcome {
        BatchOutcome::Failed(err) => {
            assert_eq!(err.kind, ErrorKind::Unknown);
            assert_eq!(err.hostname, HOST);
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[tokio::test]
async fn test_outcomes_and_input_order() {
    let refused = "https://down.example/users/bob/statuses/1".to_string();
    let fetcher = fetcher_with_alice()
        .with_post(alice_post(1))
        .with_delay(status_url(1), Duration::from_millis(50))
        .with_failure(
            refused.clone(),
            FetchError::ConnectionRefused {
                host: "down.example".to_string(),
            },
        );
    let batch = batch(fetcher, Duration::ZERO);

    let ids = vec![status_url(1), status_url(404), ALICE.to_string(), refused];
    let results = batch.resolve_all(ids.clone()).await;

    let order: Vec<_> = results.iter().map(|r| r.identifier.clone()).collect();
    assert_eq!(order, ids);
    assert_eq!(results[0].outcome.label(), "resolved");
    assert!(matches!(results[1].outcome, BatchOutcome::Unavailable { .. }));
    assert!(matches!(results[2].outcome, BatchOutcome::Unavailable { .. }));
    assert!(matches!(
        &results[3].outcome,
        BatchOutcome::Failed(err) if err.hostname == "down.example"
    ));
}

#[tokio::test]
async fn test_dispatch_returns_one_pending_item_per_identifier() {
    let (fetcher, ids) = twelve_posts();
    let batch = batch(fetcher, Duration::ZERO);

    let pending = batch.dispatch(ids.iter().take(3).cloned());
    assert_eq!(pending.len(), 3);
    assert_eq!(pending[0].identifier(), status_url(1));

    for item in pending {
        let identifier = item.identifier().to_string();
        let result = item.settle().await;
        assert_eq!(result.identifier, identifier);
        assert!(result.outcome.resolved().is_some());
    }
}

#[tokio::test]
async fn test_aborted_item_is_reported() {
    let fetcher = fetcher_with_alice().with_hang(status_url(1));
    let batch = batch(fetcher, Duration::ZERO);

    let mut pending = batch.dispatch([status_url(1)]);
    let item = pending.remove(0);
    item.abort();
    let result = item.settle().await;

    assert!(matches!(
        &result.outcome,
        BatchOutcome::Failed(err) if err.kind == ErrorKind::Unknown
    ));
}

#[test]
fn test_item_result_json() {
    let result = fedview_resolver::BatchItemResult {
        identifier: "https://m.example/users/alice/statuses/1".to_string(),
        outcome: BatchOutcome::Unavailable {
            reason: "nothing found".to_string(),
        },
    };
    let value = serde_json::to_value(&result).unwrap();
    assert_eq!(value["status"], "unavailable");
    assert_eq!(value["reason"], "nothing found");
}
