//! Multi-partition calendar aggregation
//!
//! Pure transforms merging tasks, journal entries and achievements into one
//! ordered, source-tagged event list for a date range. Each entity type is
//! matched against its own date-bearing field: a task's due date, a journal
//! entry's creation day (as a local calendar date), an achievement's own
//! date. The algorithms never touch storage; consumers hand them collection
//! snapshots.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate, TimeZone};

use crate::models::{Achievement, JournalEntry, Task, Timestamp};

/// Inclusive calendar-date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// A range covering a single day
    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day <= self.end
    }
}

/// Which collection a calendar event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventSource {
    Task,
    Journal,
    Achievement,
}

/// One entry in the merged calendar
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub source: EventSource,
    /// Id of the originating record
    pub id: String,
    /// The calendar day this event belongs to
    pub day: NaiveDate,
    /// Task text, journal title, or achievement text
    pub label: String,
}

/// The local calendar day of an epoch-milliseconds stamp.
///
/// Local, never UTC-shifted: an entry written at 23:30 belongs to that
/// local day regardless of timezone offset.
pub fn local_day(at: Timestamp) -> Option<NaiveDate> {
    Local
        .timestamp_millis_opt(at)
        .single()
        .map(|dt| dt.date_naive())
}

/// Merge snapshots into one ordered, source-tagged event list.
///
/// Events are ordered by day, then source, then id, so re-computation over
/// the same snapshots always yields the same list.
pub fn aggregate(
    range: DateRange,
    tasks: &[Task],
    journal: &[JournalEntry],
    achievements: &[Achievement],
) -> Vec<CalendarEvent> {
    let mut events = Vec::new();

    for task in tasks {
        if let Some(due) = task.due_date {
            if range.contains(due) {
                events.push(CalendarEvent {
                    source: EventSource::Task,
                    id: task.id.clone(),
                    day: due,
                    label: task.text.clone(),
                });
            }
        }
    }

    for entry in journal {
        if let Some(day) = local_day(entry.created_at) {
            if range.contains(day) {
                events.push(CalendarEvent {
                    source: EventSource::Journal,
                    id: entry.id.clone(),
                    day,
                    label: entry.title.clone(),
                });
            }
        }
    }

    for achievement in achievements {
        if range.contains(achievement.date) {
            events.push(CalendarEvent {
                source: EventSource::Achievement,
                id: achievement.id.clone(),
                day: achievement.date,
                label: achievement.text.clone(),
            });
        }
    }

    events.sort_by(|a, b| {
        (a.day, a.source, &a.id).cmp(&(b.day, b.source, &b.id))
    });
    events
}

/// Group an aggregated list by calendar day.
///
/// The map iterates days in order and each day's events keep their
/// deterministic order, so a given day always maps to the same subset.
pub fn group_by_day(events: Vec<CalendarEvent>) -> BTreeMap<NaiveDate, Vec<CalendarEvent>> {
    let mut by_day: BTreeMap<NaiveDate, Vec<CalendarEvent>> = BTreeMap::new();
    for event in events {
        by_day.entry(event.day).or_default().push(event);
    }
    by_day
}
