use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Why a fetch was not started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DropReason {
    /// Another fetch for this context is still running.
    InFlight,
    /// A non-forced fetch came too soon after the last completed one.
    Throttled,
}

/// Permission to run one fetch. Hand it back to [`FetchSequencer::finish`].
#[derive(Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub request_id: u64,
}

#[derive(Debug, Default)]
struct SequencerState {
    in_flight: bool,
    last_completed: Option<Instant>,
    latest_issued: u64,
}

/// Admission control for catalog fetches: one in flight at a time, a minimum
/// interval between non-forced fetches, and monotonically increasing request
/// ids for recognising stale responses.
#[derive(Debug)]
pub struct FetchSequencer {
    min_interval: Duration,
    state: Mutex<SequencerState>,
}

impl FetchSequencer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            state: Mutex::new(SequencerState::default()),
        }
    }

    /// Try to start a fetch. `force` skips the throttle but never the
    /// in-flight guard.
    pub async fn begin(&self, force: bool) -> Result<FetchTicket, DropReason> {
        let mut state = self.state.lock().await;
        if state.in_flight {
            return Err(DropReason::InFlight);
        }
        let throttled = state
            .last_completed
            .is_some_and(|completed| completed.elapsed() < self.min_interval);
        if throttled && !force {
            return Err(DropReason::Throttled);
        }
        state.in_flight = true;
        state.latest_issued += 1;
        Ok(FetchTicket {
            request_id: state.latest_issued,
        })
    }

    /// Mark the ticket's fetch complete. Returns `false` when a newer request
    /// id has been issued since, meaning the response is stale.
    pub async fn finish(&self, ticket: FetchTicket) -> bool {
        let mut state = self.state.lock().await;
        state.in_flight = false;
        state.last_completed = Some(Instant::now());
        ticket.request_id == state.latest_issued
    }

    /// Make any response still in flight stale.
    pub async fn invalidate(&self) {
        self.state.lock().await.latest_issued += 1;
    }

    pub async fn is_in_flight(&self) -> bool {
        self.state.lock().await.in_flight
    }
}
