//! Habit streak calculation
//!
//! Pure functions over a habit's completion-date set. Streaks are always
//! re-derivable from the set alone, so toggling a day on and off leaves the
//! recomputed values exactly as if the toggle never happened.

use std::collections::BTreeSet;

use chrono::{Days, Local, NaiveDate};

/// Current and longest consecutive-day runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Streaks {
    /// Length of the run ending at today, or yesterday if today is not yet
    /// marked; 0 when neither day is marked
    pub current: u32,
    /// Maximum run length anywhere in the history; 0 only for an empty set
    pub longest: u32,
}

/// Streaks relative to the local calendar date.
///
/// Completion dates are local dates and are never UTC-shifted.
pub fn calculate_today(dates: &BTreeSet<NaiveDate>) -> Streaks {
    calculate(dates, Local::now().date_naive())
}

/// Streaks relative to an explicit "today"
pub fn calculate(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> Streaks {
    if dates.is_empty() {
        return Streaks::default();
    }

    Streaks {
        current: current_run(dates, today),
        longest: longest_run(dates),
    }
}

/// Walk backwards from the anchor day counting consecutive marked days.
///
/// The anchor is today when marked, otherwise yesterday; the run terminates
/// at the first gap of more than one calendar day.
fn current_run(dates: &BTreeSet<NaiveDate>, today: NaiveDate) -> u32 {
    let anchor = if dates.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) if dates.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut run = 0;
    let mut day = anchor;
    while dates.contains(&day) {
        run += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    run
}

/// Longest run of dates each exactly one calendar day apart
fn longest_run(dates: &BTreeSet<NaiveDate>) -> u32 {
    let mut longest = 0;
    let mut run = 0;
    let mut previous: Option<NaiveDate> = None;

    for &date in dates {
        run = match previous {
            Some(prev) if prev.checked_add_days(Days::new(1)) == Some(date) => run + 1,
            _ => 1,
        };
        longest = longest.max(run);
        previous = Some(date);
    }
    longest
}
