use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use shopfront_filter::AddressConfig;
use shopfront_filter::FilterController;
use shopfront_filter::SortOption;
use shopfront_query::Audience;
use shopfront_query::BrowseSession;
use shopfront_query::DropReason;
use shopfront_query::ExecutorConfig;
use shopfront_query::FetchOutcome;
use shopfront_query::LoadStatus;
use shopfront_query::QueryError;
use shopfront_query::QueryExecutor;
use shopfront_query::StatusFilter;
use shopfront_store::MemoryBackend;
use shopfront_taxonomy::TaxonomyStore;
use std::sync::Arc;
use std::time::Duration;

async fn setup(latency: Option<Duration>, address: &str) -> (Arc<MemoryBackend>, FilterController) {
    let fixture: serde_json::Value =
        serde_json::from_str(include_str!("../../fixtures/catalog.json")).unwrap();
    let mut backend = MemoryBackend::from_fixture(fixture).unwrap();
    if let Some(latency) = latency {
        backend = backend.with_latency(latency);
    }
    let backend = Arc::new(backend);
    let taxonomy = TaxonomyStore::new(backend.clone()).load().await.unwrap();
    let controller = FilterController::with_address(taxonomy, AddressConfig::default(), address);
    (backend, controller)
}

fn session(backend: Arc<MemoryBackend>, controller: &FilterController) -> BrowseSession {
    BrowseSession::storefront(
        QueryExecutor::new(backend, ExecutorConfig::default()),
        controller.subscribe(),
    )
}

#[tokio::test(start_paused = true)]
async fn loads_the_controllers_state() {
    let (backend, controller) = setup(None, "/store/bags").await;
    let session = session(backend, &controller);
    assert_eq!(session.status().await, LoadStatus::Idle);

    assert_matches!(
        session.fetch(true).await,
        FetchOutcome::Loaded {
            request_id: 1,
            total_count: 2
        }
    );
    assert_eq!(session.status().await, LoadStatus::Ready);
    assert_eq!(session.result_revision().await, Some(controller.revision()));
}

#[tokio::test(start_paused = true)]
async fn unforced_fetches_are_throttled() {
    let (backend, controller) = setup(None, "/store").await;
    let session = session(backend, &controller);

    assert_matches!(session.refresh().await, FetchOutcome::Loaded { .. });
    tokio::time::advance(Duration::from_millis(500)).await;
    assert_matches!(
        session.refresh().await,
        FetchOutcome::Dropped(DropReason::Throttled)
    );
    assert_matches!(session.fetch(true).await, FetchOutcome::Loaded { .. });
}

#[tokio::test(start_paused = true)]
async fn second_fetch_while_one_runs_is_dropped() {
    let (backend, controller) = setup(Some(Duration::from_millis(100)), "/store").await;
    let session = session(backend, &controller);

    let (first, second) = tokio::join!(session.fetch(true), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.fetch(true).await
    });
    assert_matches!(first, FetchOutcome::Loaded { .. });
    assert_matches!(second, FetchOutcome::Dropped(DropReason::InFlight));
}

#[tokio::test(start_paused = true)]
async fn response_for_an_old_revision_is_discarded() {
    let (backend, mut controller) = setup(Some(Duration::from_millis(100)), "/store").await;
    let session = session(backend, &controller);

    let (outcome, _) = tokio::join!(session.fetch(true), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.set_search_text("chrono");
    });
    assert_matches!(outcome, FetchOutcome::Stale { request_id: 1 });
    assert_eq!(session.result().await, None);
    assert_eq!(session.status().await, LoadStatus::Idle);

    assert_matches!(
        session.fetch(true).await,
        FetchOutcome::Loaded { total_count: 2, .. }
    );
}

#[tokio::test(start_paused = true)]
async fn invalidated_fetch_is_stale() {
    let (backend, controller) = setup(Some(Duration::from_millis(100)), "/store").await;
    let session = session(backend, &controller);

    let (outcome, _) = tokio::join!(session.fetch(true), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.invalidate().await;
    });
    assert_matches!(outcome, FetchOutcome::Stale { .. });
}

#[tokio::test(start_paused = true)]
async fn exhausted_retries_surface_as_failed_status() {
    let (backend, controller) = setup(None, "/store").await;
    let session = session(backend.clone(), &controller);
    assert_matches!(session.fetch(true).await, FetchOutcome::Loaded { .. });

    backend.fail_next(4);
    assert_matches!(
        session.fetch(true).await,
        FetchOutcome::Failed(QueryError::Exhausted { attempts: 4, .. })
    );
    assert_eq!(
        session.status().await,
        LoadStatus::Failed("Could not load products. Please try again.".to_string())
    );
    assert!(session.result().await.is_some(), "last good page is kept");
}

#[tokio::test(start_paused = true)]
async fn run_follows_controller_changes_until_it_closes() {
    let (backend, mut controller) = setup(None, "/store?page=2").await;
    let session = session(backend, &controller);

    tokio::join!(session.run(), async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.select_category(Some("c-watches".into()));
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.set_sort_option(SortOption::PriceAsc);
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(controller);
    });

    let result = session.result().await.unwrap();
    assert_eq!(result.page, 1);
    assert_eq!(result.total_count, 5);
    assert_eq!(
        result.items.first().map(|item| item.id.as_str()),
        Some("p6")
    );
}

#[tokio::test]
async fn page_size_change_refetches() {
    let (backend, controller) = setup(None, "/store").await;
    let session = session(backend, &controller);
    assert_matches!(session.set_page_size(2).await, FetchOutcome::Loaded { .. });
    assert_eq!(session.result().await.map(|page| page.items.len()), Some(2));
}

#[tokio::test]
async fn status_selector_is_admin_only() {
    let (backend, controller) = setup(None, "/store/watches").await;
    let storefront = session(backend.clone(), &controller);
    assert_matches!(
        storefront.set_status_filter(StatusFilter::All).await,
        Err(QueryError::InvalidRequest(_))
    );

    let admin = BrowseSession::new(
        QueryExecutor::new(backend, ExecutorConfig::default()),
        controller.subscribe(),
        Audience::Admin(StatusFilter::Published),
    );
    assert_matches!(
        admin.set_status_filter(StatusFilter::All).await,
        Ok(FetchOutcome::Loaded { total_count: 6, .. })
    );
}

#[tokio::test(start_paused = true)]
async fn page_size_change_during_a_fetch_is_not_lost() {
    let (backend, controller) = setup(Some(Duration::from_millis(100)), "/store").await;
    let session = session(backend, &controller);

    let (first, resized) = tokio::join!(session.fetch(true), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.set_page_size(2).await
    });
    assert_matches!(resized, FetchOutcome::Dropped(DropReason::InFlight));
    assert_matches!(first, FetchOutcome::Loaded { total_count: 7, .. });

    let result = session.result().await.unwrap();
    assert_eq!(result.page_size, 2);
    assert_eq!(result.items.len(), 2);
    assert_eq!(session.status().await, LoadStatus::Ready);
}

#[tokio::test(start_paused = true)]
async fn status_change_during_a_fetch_is_applied() {
    let (backend, controller) = setup(Some(Duration::from_millis(100)), "/store").await;
    let admin = BrowseSession::new(
        QueryExecutor::new(backend, ExecutorConfig::default()),
        controller.subscribe(),
        Audience::Admin(StatusFilter::Published),
    );

    let (first, switched) = tokio::join!(admin.fetch(true), async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        admin.set_status_filter(StatusFilter::All).await
    });
    assert_matches!(switched, Ok(FetchOutcome::Dropped(DropReason::InFlight)));
    assert_matches!(first, FetchOutcome::Loaded { total_count: 8, .. });
    assert_eq!(admin.result().await.map(|page| page.total_count), Some(8));
}

#[tokio::test(start_paused = true)]
async fn run_does_not_refetch_a_revision_it_already_loaded() {
    let (backend, mut controller) = setup(Some(Duration::from_millis(100)), "/store").await;
    let session = session(backend.clone(), &controller);
    let selects_before = backend.select_calls();

    let ((), revision) = tokio::join!(session.run(), async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        controller.select_category(Some("c-bags".into()));
        let revision = controller.revision();
        tokio::time::sleep(Duration::from_millis(500)).await;
        drop(controller);
        revision
    });

    // One stale response, one retry for the new revision, nothing after.
    assert_eq!(backend.select_calls() - selects_before, 2);
    assert_eq!(session.result_revision().await, Some(revision));
    assert_eq!(session.result().await.map(|page| page.total_count), Some(2));
}
