//! Pagination behaviour of `PagedFetcher` against a scripted provider.

mod support;

use std::sync::Arc;

use calsync_core::PagedFetcher;
use calsync_domain::{CalSyncError, PageRequest, SyncWindow};
use support::fixtures::{page, reference_time, single};
use support::provider::FakeProviderClient;

fn window() -> SyncWindow {
    SyncWindow::around(reference_time(), 365, 365).expect("window should fit")
}

#[tokio::test]
async fn collects_every_page_and_keeps_the_last_delta_link() {
    support::init_test_logging();

    // Arrange
    let provider = FakeProviderClient::new()
        .with_page(page(
            vec![
                single("a", "2025-01-10T09:00:00", "2025-01-10T10:00:00"),
                single("b", "2025-01-11T09:00:00", "2025-01-11T10:00:00"),
            ],
            Some("https://provider/page2"),
            None,
        ))
        .with_page(page(
            vec![single("c", "2025-01-12T09:00:00", "2025-01-12T10:00:00")],
            Some("https://provider/page3"),
            None,
        ))
        .with_page(page(
            vec![single("d", "2025-01-13T09:00:00", "2025-01-13T10:00:00")],
            None,
            Some("https://provider/delta?token=final"),
        ));
    let fetcher = PagedFetcher::new(Arc::new(provider.clone()), 100);

    // Act
    let outcome = fetcher.fetch(None, None, false, window()).await.expect("fetch should succeed");

    // Assert
    let ids: Vec<_> = outcome.events.iter().map(|e| e.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c", "d"]);
    assert_eq!(outcome.next_token.as_deref(), Some("https://provider/delta?token=final"));
    assert_eq!(outcome.pages, 3);
    assert!(!outcome.incremental);

    let requests = provider.requests();
    assert_eq!(requests.len(), 3);
    assert!(matches!(requests[0], PageRequest::Window { .. }));
    assert_eq!(requests[1], PageRequest::NextLink("https://provider/page2".to_string()));
    assert_eq!(requests[2], PageRequest::NextLink("https://provider/page3".to_string()));
}

#[tokio::test]
async fn a_later_delta_link_replaces_an_earlier_one() {
    let provider = FakeProviderClient::new()
        .with_page(page(Vec::new(), Some("next"), Some("early")))
        .with_page(page(Vec::new(), None, Some("late")));
    let fetcher = PagedFetcher::new(Arc::new(provider), 100);

    let outcome = fetcher.fetch(None, None, false, window()).await.expect("fetch should succeed");

    assert_eq!(outcome.next_token.as_deref(), Some("late"));
}

#[tokio::test]
async fn an_earlier_delta_link_survives_a_final_page_without_one() {
    let provider = FakeProviderClient::new()
        .with_page(page(Vec::new(), Some("next"), Some("early")))
        .with_page(page(Vec::new(), None, None));
    let fetcher = PagedFetcher::new(Arc::new(provider), 100);

    let outcome = fetcher.fetch(None, None, false, window()).await.expect("fetch should succeed");

    assert_eq!(outcome.next_token.as_deref(), Some("early"));
}

#[tokio::test]
async fn no_delta_link_yields_no_token() {
    let provider = FakeProviderClient::new().with_page(page(Vec::new(), None, None));
    let fetcher = PagedFetcher::new(Arc::new(provider), 100);

    let outcome = fetcher.fetch(None, None, false, window()).await.expect("fetch should succeed");

    assert!(outcome.next_token.is_none());
}

#[tokio::test]
async fn incremental_fetch_starts_from_the_prior_token() {
    let provider = FakeProviderClient::new().with_page(page(Vec::new(), None, Some("delta-2")));
    let fetcher = PagedFetcher::new(Arc::new(provider.clone()), 100);

    let outcome = fetcher
        .fetch(Some("work"), Some("delta-1"), false, window())
        .await
        .expect("fetch should succeed");

    assert!(outcome.incremental);
    assert_eq!(
        provider.requests()[0],
        PageRequest::Delta { calendar_id: Some("work".to_string()), token: "delta-1".to_string() }
    );
}

#[tokio::test]
async fn a_failed_middle_page_fails_the_whole_fetch() {
    let provider = FakeProviderClient::new()
        .with_page(page(
            vec![single("a", "2025-01-10T09:00:00", "2025-01-10T10:00:00")],
            Some("next"),
            None,
        ))
        .with_page_error(CalSyncError::Network("gateway timeout".to_string()));
    let fetcher = PagedFetcher::new(Arc::new(provider), 100);

    let result = fetcher.fetch(None, None, false, window()).await;

    assert!(matches!(result, Err(CalSyncError::Network(_))));
}
