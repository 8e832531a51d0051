//! Interrupt and deadline handling
//!
//! On the first SIGINT/SIGTERM, or once the global deadline passes, files
//! that have not started are recorded as cancelled. Files already in flight
//! finish and their outputs are kept. A second interrupt exits immediately.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

use crate::summary::ExitCode;

/// Why queued work stopped being started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    Interrupted,
    TimedOut,
}

impl CancelReason {
    pub fn message(&self) -> &'static str {
        match self {
            CancelReason::Interrupted => "interrupted before processing started",
            CancelReason::TimedOut => "global timeout elapsed before processing started",
        }
    }
}

/// Action to take on a received signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: stop starting new files
    InitiateCancellation,
    /// Second signal: exit now
    ImmediateExit,
    Ignore,
}

/// Shared cancellation state, read by workers before each file
#[derive(Debug)]
pub struct CancelState {
    cancel_requested: AtomicBool,
    signal_count: AtomicU8,
    deadline: Option<Instant>,
}

impl Default for CancelState {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CancelState {
    /// Create a state whose deadline is `timeout` from now
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            cancel_requested: AtomicBool::new(false),
            signal_count: AtomicU8::new(0),
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    pub fn request_cancel(&self) {
        self.cancel_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_cancel_requested(&self) -> bool {
        self.cancel_requested.load(Ordering::SeqCst)
    }

    pub fn is_timed_out(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Reason new work must not start, if any. Interrupts win over timeouts.
    pub fn reason(&self) -> Option<CancelReason> {
        if self.is_cancel_requested() {
            Some(CancelReason::Interrupted)
        } else if self.is_timed_out() {
            Some(CancelReason::TimedOut)
        } else {
            None
        }
    }

    pub fn signal_count(&self) -> u8 {
        self.signal_count.load(Ordering::SeqCst)
    }

    /// Handle a SIGINT/SIGTERM
    pub fn handle_signal(&self) -> SignalAction {
        match self.signal_count.fetch_add(1, Ordering::SeqCst) {
            0 => {
                self.request_cancel();
                SignalAction::InitiateCancellation
            }
            1 => SignalAction::ImmediateExit,
            _ => SignalAction::Ignore,
        }
    }
}

/// Installs the process-wide interrupt handler
pub struct SignalHandler {
    state: Arc<CancelState>,
}

impl SignalHandler {
    pub fn new(state: Arc<CancelState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> Arc<CancelState> {
        Arc::clone(&self.state)
    }

    /// Install the handler. Must be called at most once per process.
    pub fn install(&self) -> Result<(), ctrlc::Error> {
        let state = Arc::clone(&self.state);
        ctrlc::set_handler(move || match state.handle_signal() {
            SignalAction::InitiateCancellation => {
                warn!("interrupt received, finishing in-flight files and skipping the rest");
            }
            SignalAction::ImmediateExit => {
                warn!("second interrupt received, exiting immediately");
                std::process::exit(ExitCode::Failed.as_i32());
            }
            SignalAction::Ignore => {}
        })
    }
}
