use crate::error::QueryError;
use crate::error::Result;
use crate::executor::QueryExecutor;
use crate::model::QueryResult;
use crate::request::QueryRequest;
use crate::request::StatusFilter;
use crate::sequencer::DropReason;
use crate::sequencer::FetchSequencer;
use shopfront_filter::FilterSnapshot;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use tokio::sync::Mutex;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;

/// Loading flags for the results area.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    /// Terminal "could not load products" state; the previous page is kept.
    Failed(String),
}

/// What happened to one fetch attempt.
#[derive(Debug)]
pub enum FetchOutcome {
    Loaded { request_id: u64, total_count: u64 },
    Dropped(DropReason),
    /// The filters moved on (or the ticket was invalidated) while the fetch ran.
    Stale { request_id: u64 },
    Failed(QueryError),
}

/// Which products a session may see.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Audience {
    Storefront,
    Admin(StatusFilter),
}

impl Audience {
    fn status(self) -> StatusFilter {
        match self {
            Audience::Storefront => StatusFilter::Published,
            Audience::Admin(status) => status,
        }
    }
}

#[derive(Debug, Default)]
struct View {
    status: LoadStatus,
    result: Option<QueryResult>,
    revision: Option<u64>,
    /// Filter revision of the last fetch that loaded or failed.
    settled: Option<u64>,
}

/// Keeps one product listing in step with a filter controller.
///
/// Fetches go through a [`FetchSequencer`]; a response is applied only if its
/// request id is still the latest and the filter revision it was built from
/// is still current. A forced fetch that finds another one in flight is not
/// lost: the fetch holding the ticket runs it once it finishes.
pub struct BrowseSession {
    executor: QueryExecutor,
    sequencer: FetchSequencer,
    filters: watch::Receiver<FilterSnapshot>,
    page_size: AtomicU32,
    refetch_pending: AtomicBool,
    audience: Mutex<Audience>,
    view: Mutex<View>,
}

impl BrowseSession {
    pub fn new(
        executor: QueryExecutor,
        filters: watch::Receiver<FilterSnapshot>,
        audience: Audience,
    ) -> Self {
        let config = executor.config();
        let sequencer = FetchSequencer::new(config.min_fetch_interval());
        let page_size = AtomicU32::new(config.page_size);
        Self {
            executor,
            sequencer,
            filters,
            page_size,
            refetch_pending: AtomicBool::new(false),
            audience: Mutex::new(audience),
            view: Mutex::new(View::default()),
        }
    }

    pub fn storefront(executor: QueryExecutor, filters: watch::Receiver<FilterSnapshot>) -> Self {
        Self::new(executor, filters, Audience::Storefront)
    }

    pub async fn status(&self) -> LoadStatus {
        self.view.lock().await.status.clone()
    }

    /// Last applied page, if any.
    pub async fn result(&self) -> Option<QueryResult> {
        self.view.lock().await.result.clone()
    }

    /// Filter revision the current result was built from.
    pub async fn result_revision(&self) -> Option<u64> {
        self.view.lock().await.revision
    }

    pub fn page_size(&self) -> u32 {
        self.page_size.load(Ordering::SeqCst)
    }

    /// Change the page size and refetch. A response still in flight for the
    /// old size is discarded.
    pub async fn set_page_size(&self, page_size: u32) -> FetchOutcome {
        self.page_size.store(page_size.max(1), Ordering::SeqCst);
        self.sequencer.invalidate().await;
        self.fetch(true).await
    }

    /// Switch the admin status selector and refetch. The storefront always
    /// shows published products only.
    pub async fn set_status_filter(&self, status: StatusFilter) -> Result<FetchOutcome> {
        {
            let mut audience = self.audience.lock().await;
            if *audience == Audience::Storefront {
                return Err(QueryError::InvalidRequest(
                    "the storefront only lists published products".to_string(),
                ));
            }
            *audience = Audience::Admin(status);
        }
        self.sequencer.invalidate().await;
        Ok(self.fetch(true).await)
    }

    /// Make the fetch currently in flight, if any, stale.
    pub async fn invalidate(&self) {
        self.sequencer.invalidate().await;
    }

    /// Non-forced refresh; subject to the throttle.
    pub async fn refresh(&self) -> FetchOutcome {
        self.fetch(false).await
    }

    /// Run one guarded fetch for the current filter state, followed by any
    /// forced refetch requested while it was running.
    pub async fn fetch(&self, force: bool) -> FetchOutcome {
        let mut outcome = self.fetch_once(force).await;
        while !matches!(outcome, FetchOutcome::Dropped(_))
            && self.refetch_pending.swap(false, Ordering::SeqCst)
        {
            debug!("running refetch requested during the last fetch");
            outcome = self.fetch_once(true).await;
        }
        outcome
    }

    async fn fetch_once(&self, force: bool) -> FetchOutcome {
        let ticket = match self.sequencer.begin(force).await {
            Ok(ticket) => ticket,
            Err(reason) => {
                if force && reason == DropReason::InFlight {
                    self.refetch_pending.store(true, Ordering::SeqCst);
                }
                debug!(?reason, force, "fetch dropped");
                return FetchOutcome::Dropped(reason);
            }
        };
        // Settings are read below, after the ticket, so this fetch covers
        // every request made before it started.
        self.refetch_pending.store(false, Ordering::SeqCst);
        let request_id = ticket.request_id;
        let snapshot = self.filters.borrow().clone();
        let status = self.audience.lock().await.status();
        let request = QueryRequest::from_filter(&snapshot.state, self.page_size(), status);
        self.view.lock().await.status = LoadStatus::Loading;

        let outcome = self.executor.execute(&request).await;

        let latest = self.sequencer.finish(ticket).await;
        let current_revision = self.filters.borrow().revision;
        if !latest || current_revision != snapshot.revision {
            debug!(
                request_id,
                revision = snapshot.revision,
                current_revision,
                "discarding stale product response"
            );
            let mut view = self.view.lock().await;
            if view.status == LoadStatus::Loading {
                view.status = if view.result.is_some() {
                    LoadStatus::Ready
                } else {
                    LoadStatus::Idle
                };
            }
            return FetchOutcome::Stale { request_id };
        }

        let mut view = self.view.lock().await;
        view.settled = Some(snapshot.revision);
        match outcome {
            Ok(result) => {
                let total_count = result.total_count;
                view.status = LoadStatus::Ready;
                view.result = Some(result);
                view.revision = Some(snapshot.revision);
                FetchOutcome::Loaded {
                    request_id,
                    total_count,
                }
            }
            Err(err) => {
                view.status = LoadStatus::Failed(err.user_message());
                FetchOutcome::Failed(err)
            }
        }
    }

    /// Fetch once, then refetch (forced) after every filter change until the
    /// controller is dropped.
    pub async fn run(&self) {
        let mut filters = self.filters.clone();
        self.settle(&mut filters, false).await;
        while filters.changed().await.is_ok() {
            self.settle(&mut filters, true).await;
        }
        info!("filter controller closed, browse session stopping");
    }

    /// Fetch until the latest filter revision has loaded or failed, then mark
    /// it seen on `filters` so `changed()` only wakes for newer revisions.
    async fn settle(&self, filters: &mut watch::Receiver<FilterSnapshot>, force: bool) {
        let mut force = force;
        loop {
            let outcome = self.fetch_until_current(force).await;
            let seen = filters.borrow_and_update().revision;
            // The ticket holder runs the refetch an in-flight drop recorded.
            if matches!(outcome, FetchOutcome::Dropped(DropReason::InFlight)) {
                return;
            }
            if self.view.lock().await.settled == Some(seen) {
                return;
            }
            force = true;
        }
    }

    async fn fetch_until_current(&self, force: bool) -> FetchOutcome {
        let mut force = force;
        loop {
            match self.fetch(force).await {
                FetchOutcome::Stale { .. } => force = true,
                outcome => return outcome,
            }
        }
    }
}
