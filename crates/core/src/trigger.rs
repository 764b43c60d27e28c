//! Trigger-window evaluation for once-per-day scheduled jobs.
//!
//! The report scheduler only has a coarse per-minute poll available, so a
//! single configured time-of-day is covered by several overlapping windows:
//! the exact configured minute, a late catch-up for missed ticks, and a
//! hard end-of-day cutoff. [`evaluate`] is the one decision function all of
//! them go through; it is pure so the overlap rules can be tested without a
//! clock or a database.

use chrono::{NaiveTime, Timelike};
use serde::Serialize;

/// Hour of day (24h) at which the end-of-day fallback fires, regardless of
/// the configured report time.
pub const HARD_CUTOFF_HOUR: u32 = 23;

// ---------------------------------------------------------------------------
// TriggerPath
// ---------------------------------------------------------------------------

/// Which of the overlapping trigger windows matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TriggerPath {
    /// Process start found the configured time already passed today.
    Startup,
    /// The poll tick landed exactly on the configured (hour, minute).
    ExactTime,
    /// The configured time has passed but the cutoff has not been reached;
    /// covers ticks lost to scheduler jitter or a busy process.
    LateCatchUp,
    /// Past the hard cutoff hour with no successful run recorded today.
    HardCutoff,
}

impl TriggerPath {
    /// Short human-readable label used in log lines.
    pub fn label(self) -> &'static str {
        match self {
            TriggerPath::Startup => "startup",
            TriggerPath::ExactTime => "exact-time",
            TriggerPath::LateCatchUp => "late-catch-up",
            TriggerPath::HardCutoff => "hard-cutoff",
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Decide whether a daily job should fire at `now` given its configured
/// `scheduled` time-of-day.
///
/// Returns the matching [`TriggerPath`], or `None` when no window applies.
/// The caller is responsible for the "already ran today" check against the
/// persisted run log; this function only evaluates the clock.
///
/// Window precedence when several overlap: exact minute beats hard cutoff
/// beats late catch-up, so log lines attribute a run to the most specific
/// window that matched.
pub fn evaluate(now: NaiveTime, scheduled: NaiveTime, at_startup: bool) -> Option<TriggerPath> {
    let past_cutoff = now.hour() >= HARD_CUTOFF_HOUR;

    if at_startup {
        if now > scheduled || past_cutoff {
            return Some(TriggerPath::Startup);
        }
        return None;
    }

    if now.hour() == scheduled.hour() && now.minute() == scheduled.minute() {
        return Some(TriggerPath::ExactTime);
    }
    if past_cutoff {
        return Some(TriggerPath::HardCutoff);
    }
    if now > scheduled {
        return Some(TriggerPath::LateCatchUp);
    }

    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).expect("valid test time")
    }

    // -- tick evaluation ------------------------------------------------------

    #[test]
    fn before_the_window_nothing_fires() {
        assert_eq!(evaluate(at(9, 0), at(10, 45), false), None);
    }

    #[test]
    fn exact_minute_fires_exact_time() {
        assert_eq!(
            evaluate(at(10, 45), at(10, 45), false),
            Some(TriggerPath::ExactTime)
        );
    }

    #[test]
    fn exact_minute_matches_regardless_of_seconds() {
        let now = NaiveTime::from_hms_opt(10, 45, 37).expect("valid test time");
        assert_eq!(evaluate(now, at(10, 45), false), Some(TriggerPath::ExactTime));
    }

    #[test]
    fn missed_tick_is_covered_by_late_catch_up() {
        // The 10:45 tick was skipped entirely; 10:50 must still fire.
        assert_eq!(
            evaluate(at(10, 50), at(10, 45), false),
            Some(TriggerPath::LateCatchUp)
        );
    }

    #[test]
    fn late_catch_up_stops_at_the_cutoff() {
        assert_eq!(
            evaluate(at(23, 5), at(10, 45), false),
            Some(TriggerPath::HardCutoff)
        );
    }

    #[test]
    fn cutoff_fires_even_before_the_configured_time() {
        // Configured for 23:30 but the cutoff does not wait for it.
        assert_eq!(
            evaluate(at(23, 0), at(23, 30), false),
            Some(TriggerPath::HardCutoff)
        );
    }

    #[test]
    fn exact_minute_wins_over_cutoff() {
        assert_eq!(
            evaluate(at(23, 30), at(23, 30), false),
            Some(TriggerPath::ExactTime)
        );
    }

    // -- startup evaluation ---------------------------------------------------

    #[test]
    fn startup_before_the_configured_time_does_nothing() {
        assert_eq!(evaluate(at(8, 0), at(10, 45), true), None);
    }

    #[test]
    fn startup_after_the_configured_time_fires() {
        assert_eq!(
            evaluate(at(11, 0), at(10, 45), true),
            Some(TriggerPath::Startup)
        );
    }

    #[test]
    fn startup_past_cutoff_fires_even_with_future_schedule() {
        assert_eq!(
            evaluate(at(23, 10), at(23, 30), true),
            Some(TriggerPath::Startup)
        );
    }

    // -- labels ---------------------------------------------------------------

    #[test]
    fn labels_are_stable() {
        assert_eq!(TriggerPath::Startup.label(), "startup");
        assert_eq!(TriggerPath::ExactTime.label(), "exact-time");
        assert_eq!(TriggerPath::LateCatchUp.label(), "late-catch-up");
        assert_eq!(TriggerPath::HardCutoff.label(), "hard-cutoff");
    }
}
