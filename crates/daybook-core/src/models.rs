//! Data models for Daybook
//!
//! Defines the persisted record types: tasks, notes, journal entries, goals,
//! timelines, folders, achievements and outbox items. Records serialize with
//! camelCase field names so the on-disk JSON matches the backup file format.

use std::collections::BTreeSet;

use chrono::{NaiveDate, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Milliseconds since the Unix epoch
pub type Timestamp = i64;

/// Current time as epoch milliseconds
pub fn now_millis() -> Timestamp {
    Utc::now().timestamp_millis()
}

/// Capability trait for anything stored in a record partition.
///
/// One implementation per concrete record type; the generic
/// [`Collection`](crate::collection::Collection) is instantiated against it.
/// An empty `id` or a zero `created_at` means "not yet assigned" and is
/// filled in by the collection's add operation.
pub trait Record: Serialize + DeserializeOwned + Clone {
    /// Name of the partition this record type lives in
    const PARTITION: &'static str;

    fn id(&self) -> &str;
    fn created_at(&self) -> Timestamp;
    fn updated_at(&self) -> Option<Timestamp>;

    fn set_id(&mut self, id: String);
    fn set_created_at(&mut self, at: Timestamp);
    fn set_updated_at(&mut self, at: Timestamp);
}

macro_rules! impl_record {
    ($ty:ty, $partition:literal) => {
        impl Record for $ty {
            const PARTITION: &'static str = $partition;

            fn id(&self) -> &str {
                &self.id
            }

            fn created_at(&self) -> Timestamp {
                self.created_at
            }

            fn updated_at(&self) -> Option<Timestamp> {
                self.updated_at
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn set_created_at(&mut self, at: Timestamp) {
                self.created_at = at;
            }

            fn set_updated_at(&mut self, at: Timestamp) {
                self.updated_at = Some(at);
            }
        }
    };
}

/// Task priority, stored as a number 0-3
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Priority {
    #[default]
    None,
    Low,
    Medium,
    High,
}

impl TryFrom<u8> for Priority {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Priority::None),
            1 => Ok(Priority::Low),
            2 => Ok(Priority::Medium),
            3 => Ok(Priority::High),
            other => Err(format!("priority out of range: {}", other)),
        }
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value as u8
    }
}

/// How often a recurring task repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

/// Recurrence descriptor attached to a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recurrence {
    pub frequency: Frequency,
}

/// A to-do item, optionally nested under a parent task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique identifier
    pub id: String,
    /// Task description
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub priority: Priority,
    /// Calendar due date, no time component
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Parent task for sub-tasks; no cycle check is enforced
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Present when the task repeats
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring: Option<Recurrence>,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Task {
    /// Create a new task with the given text
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            completed: false,
            priority: Priority::None,
            due_date: None,
            parent_id: None,
            recurring: None,
            created_at: now_millis(),
            updated_at: None,
        }
    }
}

impl_record!(Task, "tasks");

/// A rich-text note with tags, optionally filed in a folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    /// Rich-text body
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub folder_id: Option<String>,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Note {
    /// Create a new note with the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: String::new(),
            tags: Vec::new(),
            folder_id: None,
            created_at: now_millis(),
            updated_at: None,
        }
    }

    /// Add a tag if not already present
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
    }

    /// Remove a tag
    pub fn remove_tag(&mut self, tag: &str) {
        if let Some(pos) = self.tags.iter().position(|t| t == tag) {
            self.tags.remove(pos);
        }
    }
}

impl_record!(Note, "notes");

/// A dated journal entry, optionally filed in a folder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl JournalEntry {
    /// Create a new journal entry with the given title
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            content: String::new(),
            folder_id: None,
            created_at: now_millis(),
            updated_at: None,
        }
    }
}

impl_record!(JournalEntry, "journal");

/// What a habit's optional target counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Completions,
    Streak,
}

/// Goal variant data, discriminated by the `type` tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GoalKind {
    /// A daily habit tracked by completion dates
    #[serde(rename_all = "camelCase")]
    Habit {
        /// Completion dates; a set, so duplicates are impossible
        #[serde(default)]
        completed_dates: BTreeSet<NaiveDate>,
        /// Derived from `completed_dates`, cached for display
        #[serde(default)]
        current_streak: u32,
        #[serde(default)]
        longest_streak: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_type: Option<TargetType>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target_value: Option<f64>,
    },
    /// A measurable goal with a numeric target
    #[serde(rename_all = "camelCase")]
    Target {
        #[serde(default)]
        current_value: f64,
        target_value: f64,
        unit: String,
    },
}

/// A habit or measurable goal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: String,
    pub text: String,
    #[serde(flatten)]
    pub kind: GoalKind,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Goal {
    /// Create a new habit goal
    pub fn new_habit(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            kind: GoalKind::Habit {
                completed_dates: BTreeSet::new(),
                current_streak: 0,
                longest_streak: 0,
                target_type: None,
                target_value: None,
            },
            created_at: now_millis(),
            updated_at: None,
        }
    }

    /// Create a new measurable goal
    pub fn new_target(text: impl Into<String>, target_value: f64, unit: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            kind: GoalKind::Target {
                current_value: 0.0,
                target_value,
                unit: unit.into(),
            },
            created_at: now_millis(),
            updated_at: None,
        }
    }

    /// Toggle a habit completion date.
    ///
    /// Returns `true` if the date is now marked, `false` if it was unmarked.
    /// No-op returning `false` for target goals.
    pub fn toggle_habit_day(&mut self, date: NaiveDate) -> bool {
        match &mut self.kind {
            GoalKind::Habit {
                completed_dates, ..
            } => {
                if completed_dates.remove(&date) {
                    false
                } else {
                    completed_dates.insert(date);
                    true
                }
            }
            GoalKind::Target { .. } => false,
        }
    }

    /// Recompute the cached streak fields from the completion-date set.
    ///
    /// The streaks are purely re-derivable from the dates, so toggling a day
    /// on and off leaves them exactly as if the toggle never happened.
    pub fn refresh_streaks(&mut self, today: NaiveDate) {
        if let GoalKind::Habit {
            completed_dates,
            current_streak,
            longest_streak,
            ..
        } = &mut self.kind
        {
            let streaks = crate::streaks::calculate(completed_dates, today);
            *current_streak = streaks.current;
            *longest_streak = streaks.longest;
        }
    }
}

impl_record!(Goal, "goals");

/// An event embedded in a timeline.
///
/// Events have identity but no independent persistence lifecycle; they are
/// owned by exactly one [`Timeline`] and only reachable through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub description: String,
}

impl TimelineEvent {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: title.into(),
            date,
            description: String::new(),
        }
    }
}

/// A named, ordered list of events.
///
/// The timeline is an aggregate root: its events are mutated only via
/// whole-timeline read-modify-write, and there is no concurrency token to
/// detect a lost update if two consumers edit the same timeline at once
/// (single-writer-per-aggregate contract).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub events: Vec<TimelineEvent>,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Timeline {
    /// Create a new empty timeline
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            events: Vec::new(),
            created_at: now_millis(),
            updated_at: None,
        }
    }

    /// Append an event
    pub fn add_event(&mut self, event: TimelineEvent) {
        self.events.push(event);
    }

    /// Remove an event by id, if present
    pub fn remove_event(&mut self, event_id: &str) {
        self.events.retain(|e| e.id != event_id);
    }
}

impl_record!(Timeline, "timelines");

/// Which record type a folder organizes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FolderKind {
    Note,
    Journal,
}

/// A folder for grouping notes or journal entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FolderKind,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Folder {
    pub fn new(name: impl Into<String>, kind: FolderKind) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            kind,
            created_at: now_millis(),
            updated_at: None,
        }
    }
}

impl_record!(Folder, "folders");

/// A free-text accomplishment tied to a calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Achievement {
    pub id: String,
    pub text: String,
    pub date: NaiveDate,
    pub created_at: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
}

impl Achievement {
    pub fn new(text: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            text: text.into(),
            date,
            created_at: now_millis(),
            updated_at: None,
        }
    }
}

impl_record!(Achievement, "achievements");

/// A queued outgoing feedback message, drained on reconnect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackItem {
    pub id: String,
    pub subject: String,
    pub body: String,
    pub created_at: Timestamp,
}

impl FeedbackItem {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            subject: subject.into(),
            body: body.into(),
            created_at: now_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_task_new() {
        let task = Task::new("Write report");
        assert!(!task.id.is_empty());
        assert_eq!(task.text, "Write report");
        assert!(!task.completed);
        assert_eq!(task.priority, Priority::None);
        assert!(task.due_date.is_none());
        assert!(task.updated_at.is_none());
    }

    #[test]
    fn test_task_serialization_uses_camel_case() {
        let mut task = Task::new("Review");
        task.due_date = Some(date("2024-01-10"));
        task.priority = Priority::High;
        task.recurring = Some(Recurrence {
            frequency: Frequency::Weekly,
        });

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["dueDate"], "2024-01-10");
        assert_eq!(json["priority"], 3);
        assert_eq!(json["recurring"]["frequency"], "weekly");
        assert!(json.get("createdAt").is_some());

        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn test_priority_out_of_range_rejected() {
        let result: Result<Priority, _> = serde_json::from_value(serde_json::json!(4));
        assert!(result.is_err());
    }

    #[test]
    fn test_note_tags() {
        let mut note = Note::new("Ideas");
        note.add_tag("rust");
        note.add_tag("rust");
        note.add_tag("planning");
        assert_eq!(note.tags, vec!["rust", "planning"]);

        note.remove_tag("rust");
        assert_eq!(note.tags, vec!["planning"]);
    }

    #[test]
    fn test_goal_kind_discriminated_by_type_tag() {
        let habit = Goal::new_habit("Meditate");
        let json = serde_json::to_value(&habit).unwrap();
        assert_eq!(json["type"], "habit");

        let target = Goal::new_target("Read books", 12.0, "books");
        let json = serde_json::to_value(&target).unwrap();
        assert_eq!(json["type"], "target");
        assert_eq!(json["targetValue"], 12.0);

        let back: Goal = serde_json::from_value(json).unwrap();
        assert_eq!(back, target);
    }

    #[test]
    fn test_habit_dates_deduplicate() {
        let mut goal = Goal::new_habit("Run");
        assert!(goal.toggle_habit_day(date("2024-03-01")));
        // Toggling again removes, never duplicates
        assert!(!goal.toggle_habit_day(date("2024-03-01")));
        assert!(goal.toggle_habit_day(date("2024-03-01")));

        if let GoalKind::Habit {
            completed_dates, ..
        } = &goal.kind
        {
            assert_eq!(completed_dates.len(), 1);
        } else {
            panic!("expected habit");
        }
    }

    #[test]
    fn test_refresh_streaks_rederivable_after_toggle() {
        let today = date("2024-03-10");
        let mut goal = Goal::new_habit("Stretch");
        goal.toggle_habit_day(date("2024-03-09"));
        goal.toggle_habit_day(date("2024-03-10"));
        goal.refresh_streaks(today);
        let before = goal.clone();

        // Toggle a day on and back off; recomputed streaks must match
        goal.toggle_habit_day(date("2024-03-05"));
        goal.refresh_streaks(today);
        goal.toggle_habit_day(date("2024-03-05"));
        goal.refresh_streaks(today);
        assert_eq!(goal.kind, before.kind);
    }

    #[test]
    fn test_timeline_owns_events() {
        let mut timeline = Timeline::new("Career");
        let event = TimelineEvent::new("First job", date("2020-06-01"));
        let event_id = event.id.clone();
        timeline.add_event(event);
        assert_eq!(timeline.events.len(), 1);

        timeline.remove_event(&event_id);
        assert!(timeline.events.is_empty());
    }

    #[test]
    fn test_folder_type_tag() {
        let folder = Folder::new("Work", FolderKind::Journal);
        let json = serde_json::to_value(&folder).unwrap();
        assert_eq!(json["type"], "journal");
    }

    #[test]
    fn test_record_identity_assignment() {
        let mut task = Task::new("x");
        task.set_id("fixed-id".to_string());
        task.set_created_at(1000);
        task.set_updated_at(2000);
        assert_eq!(task.id(), "fixed-id");
        assert_eq!(task.created_at(), 1000);
        assert_eq!(task.updated_at(), Some(2000));
        assert_eq!(Task::PARTITION, "tasks");
    }
}
