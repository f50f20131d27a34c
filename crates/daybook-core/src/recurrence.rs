//! Recurring-task roll-forward
//!
//! When a recurring task transitions to completed, its next occurrence is
//! created with the due date advanced by the recurrence frequency. The
//! computation is pure; the caller observes the transition and is expected
//! to gate it through a [`RollForwardGuard`] so a rapid off/on toggle cannot
//! schedule the same occurrence twice.

use std::collections::HashSet;

use chrono::{Datelike, Days, NaiveDate};

use crate::models::{Frequency, Task};

/// Next due date for a recurrence frequency.
///
/// Monthly recurrence lands on the same day of the next month, clamped to
/// that month's last valid day (Jan 31 rolls to Feb 28/29).
pub fn next_due_date(due: NaiveDate, frequency: Frequency) -> NaiveDate {
    match frequency {
        Frequency::Daily => due + Days::new(1),
        Frequency::Weekly => due + Days::new(7),
        Frequency::Monthly => add_month_clamped(due),
    }
}

fn add_month_clamped(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };

    let mut day = date.day();
    loop {
        if let Some(next) = NaiveDate::from_ymd_opt(year, month, day) {
            return next;
        }
        day -= 1;
    }
}

/// A rolled-forward occurrence plus its idempotency key
#[derive(Debug, Clone)]
pub struct RollForward {
    /// Draft next occurrence; identity and creation stamp are assigned by
    /// the collection when it is added
    pub task: Task,
    /// Derived from the source task's id and due date; two roll-forwards of
    /// the same completion produce the same key
    pub key: String,
}

/// Compute the next occurrence of a just-completed recurring task.
///
/// Triggered only by the transition into the completed state, never by any
/// other update and never by re-toggling an already-completed task; the
/// caller passes `became_completed` for exactly that transition. Returns
/// `None` when the task is not recurring, has no due date, or the
/// transition was not observed.
pub fn roll_forward(task: &Task, became_completed: bool) -> Option<RollForward> {
    if !became_completed {
        return None;
    }
    let recurrence = task.recurring?;
    let due = task.due_date?;

    let next = Task {
        id: String::new(),
        text: task.text.clone(),
        completed: false,
        priority: task.priority,
        due_date: Some(next_due_date(due, recurrence.frequency)),
        parent_id: task.parent_id.clone(),
        recurring: task.recurring,
        created_at: 0,
        updated_at: None,
    };

    Some(RollForward {
        task: next,
        key: format!("{}:{}", task.id, due),
    })
}

/// Admits each roll-forward key exactly once.
///
/// Without the guard a rapid off/on toggle looks like two completion
/// transitions and would schedule the next occurrence twice; holding the
/// keys here makes the trigger idempotent.
#[derive(Debug, Default)]
pub struct RollForwardGuard {
    seen: HashSet<String>,
}

impl RollForwardGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time a key is seen, `false` after
    pub fn admit(&mut self, key: &str) -> bool {
        self.seen.insert(key.to_string())
    }
}
