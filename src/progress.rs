//! Progress estimation
//!
//! Deterministic functions of counts and elapsed time only. Estimates are
//! advisory: they feed user-facing progress reporting and never gate a
//! phase transition.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::session::SessionStatus;

/// Completion percentage within one phase, 0-100.
///
/// `total_items == 0` yields the phase's defined completion value rather
/// than dividing by zero: an active work phase with nothing to do is done
/// (100), while the setup phases report 0 until they finish.
pub fn phase_progress(status: SessionStatus, total_items: usize, completed_items: usize) -> u8 {
    if total_items == 0 {
        return match status {
            SessionStatus::Installing | SessionStatus::Configuring | SessionStatus::Verifying => {
                100
            }
            SessionStatus::Completed => 100,
            SessionStatus::Pending | SessionStatus::Preparation | SessionStatus::Failed => 0,
        };
    }
    let completed = completed_items.min(total_items) as u128;
    ((completed * 100) / total_items as u128) as u8
}

/// Overall percentage across the whole session lifecycle.
///
/// Statuses map to a static weight table; the Installing span is scaled by
/// the fraction of components installed so far.
pub fn overall_progress(status: SessionStatus, total_items: usize, completed_items: usize) -> u8 {
    match status {
        SessionStatus::Pending => 0,
        SessionStatus::Preparation => 5,
        SessionStatus::Installing => {
            // Installing spans 10% to 80% of the overall run
            let fraction = phase_progress(status, total_items, completed_items) as u32;
            (10 + (fraction * 70) / 100) as u8
        }
        SessionStatus::Configuring => 85,
        SessionStatus::Verifying => 95,
        SessionStatus::Completed => 100,
        SessionStatus::Failed => 0, // Progress is meaningless for a failed run
    }
}

/// Remaining-time estimate by linear extrapolation:
/// `remaining ≈ elapsed × (100 − percent) / percent`.
///
/// `percent_complete == 0` returns the `Duration::ZERO` sentinel ("unknown")
/// rather than an unbounded value.
pub fn estimate_remaining(percent_complete: u8, elapsed: Duration) -> Duration {
    if percent_complete == 0 {
        return Duration::ZERO;
    }
    let percent = u64::from(percent_complete.min(100));
    let elapsed_secs = elapsed.as_secs_f64();
    let remaining = elapsed_secs * (100 - percent) as f64 / percent as f64;
    Duration::from_secs_f64(remaining)
}

/// One progress report sent over the orchestrator's side channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub status: SessionStatus,
    pub percent_complete: u8,
    pub components_installed: usize,
    pub components_total: usize,
    pub message: String,
}

impl ProgressUpdate {
    pub fn new(
        status: SessionStatus,
        components_installed: usize,
        components_total: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            percent_complete: overall_progress(status, components_total, components_installed),
            components_installed,
            components_total,
            message: message.into(),
        }
    }
}
