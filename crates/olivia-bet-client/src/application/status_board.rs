//! # Status Board
//!
//! Owner of the single observable status object.
//!
//! Every attempt holds a generation number. Updates from a generation that
//! is no longer current are dropped, which is how cancellation, dismissal
//! and superseded attempts stop affecting what the user sees.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};

use crate::domain::{invariant_status_transition, StatusReport, SubmissionStatus};

/// Attempt generation.
pub type Generation = u64;

/// Capacity of the transition log channel.
pub const TRANSITION_LOG_CAPACITY: usize = 64;

/// Publishes [`StatusReport`]s on a watch channel.
pub struct StatusBoard {
    sender: watch::Sender<StatusReport>,
    transitions: broadcast::Sender<StatusReport>,
    generation: Mutex<Generation>,
    reset_delay: Duration,
}

impl StatusBoard {
    /// Idle board whose terminal states reset after `reset_delay`.
    pub fn new(reset_delay: Duration) -> Arc<Self> {
        let (sender, _) = watch::channel(StatusReport::idle());
        let (transitions, _) = broadcast::channel(TRANSITION_LOG_CAPACITY);
        Arc::new(Self {
            sender,
            transitions,
            generation: Mutex::new(0),
            reset_delay,
        })
    }

    /// Latest report.
    pub fn current(&self) -> StatusReport {
        self.sender.borrow().clone()
    }

    /// Subscribe to changes. Intermediate states may be coalesced.
    pub fn subscribe(&self) -> watch::Receiver<StatusReport> {
        self.sender.subscribe()
    }

    /// Every published report, in order.
    pub fn transitions(&self) -> broadcast::Receiver<StatusReport> {
        self.transitions.subscribe()
    }

    fn emit(&self, report: StatusReport) {
        let _ = self.transitions.send(report.clone());
        self.sender.send_replace(report);
    }

    /// Start a new generation, superseding any attempt in flight.
    pub fn begin(&self) -> Generation {
        let mut generation = self.generation.lock();
        *generation += 1;
        if self.sender.borrow().status != SubmissionStatus::Idle {
            self.emit(StatusReport::idle());
        }
        *generation
    }

    /// Whether `generation` is still the one being shown.
    pub fn is_current(&self, generation: Generation) -> bool {
        *self.generation.lock() == generation
    }

    /// Publish `report` if `generation` is current and the transition is legal.
    pub fn publish(&self, generation: Generation, report: StatusReport) -> bool {
        let current = self.generation.lock();
        if *current != generation {
            debug!(generation, current = *current, "[bet-client] stale status update dropped");
            return false;
        }
        let from = self.sender.borrow().status;
        if !invariant_status_transition(from, report.status) {
            warn!(%from, to = %report.status, "[bet-client] illegal status transition ignored");
            return false;
        }
        if report.status == SubmissionStatus::Error {
            error!(
                attempt = ?report.attempt_id,
                message = %report.message,
                error = report.error.as_deref().unwrap_or(""),
                "[bet-client] attempt failed"
            );
        } else {
            info!(
                %from,
                to = %report.status,
                attempt = ?report.attempt_id,
                "[bet-client] status transition"
            );
        }
        self.emit(report);
        true
    }

    /// Publish a terminal report and schedule the return to idle.
    pub fn finish(self: &Arc<Self>, generation: Generation, report: StatusReport) {
        if !self.publish(generation, report) {
            return;
        }
        let board = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(board.reset_delay).await;
            board.reset_if_current(generation);
        });
    }

    /// Return to idle now and invalidate the current generation.
    pub fn dismiss(&self) {
        let mut generation = self.generation.lock();
        *generation += 1;
        self.emit(StatusReport::idle());
    }

    /// Dismiss only if `generation` is still current.
    pub fn cancel(&self, generation: Generation) -> bool {
        let mut current = self.generation.lock();
        if *current != generation {
            return false;
        }
        *current += 1;
        self.emit(StatusReport::idle());
        true
    }

    fn reset_if_current(&self, generation: Generation) {
        let current = self.generation.lock();
        if *current == generation && self.sender.borrow().status.is_terminal() {
            self.emit(StatusReport::idle());
        }
    }
}
