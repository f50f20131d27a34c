//! Daybook Core Library
//!
//! This crate provides the core functionality for Daybook, a local-first
//! personal data store for tasks, notes, journal entries, goals, timelines
//! and achievements.
//!
//! # Architecture
//!
//! - **SQLite**: one table per data partition, records stored as JSON
//! - **Collections**: typed reactive bindings over a partition, invalidated
//!   through a shared data-version counter
//!
//! All state lives in the local database; there is no server authority.
//!
//! # Quick Start
//!
//! ```text
//! let engine = Rc::new(StorageEngine::open(&Config::load()?)?);
//! let versions = DataVersion::new();
//! let notifier: Rc<dyn Notifier> = Rc::new(NullNotifier);
//!
//! let mut tasks: Collection<Task> = Collection::new(engine, &versions, notifier);
//! tasks.add(Task::new("Water plants"))?;
//! for task in tasks.items()? {
//!     println!("{}", task.text);
//! }
//! ```
//!
//! # Modules
//!
//! - `storage`: partitioned SQLite engine (main entry point)
//! - `models`: data structures for all persisted record types
//! - `collection`: typed reactive binding over a partition
//! - `version`: data-version invalidation counter
//! - `streaks`, `recurrence`, `calendar`: pure derived algorithms
//! - `backup`: export/import of the full store
//! - `folders`: folder deletion cascade
//! - `outbox`: offline feedback queue
//! - `config`: application configuration

pub mod backup;
pub mod calendar;
pub mod collection;
pub mod config;
pub mod folders;
pub mod models;
pub mod notify;
pub mod outbox;
pub mod recurrence;
pub mod storage;
pub mod streaks;
pub mod version;

pub use backup::{export_store, import_backup, validate_backup, BackupError};
pub use calendar::{aggregate, group_by_day, CalendarEvent, DateRange, EventSource};
pub use collection::Collection;
pub use config::Config;
pub use folders::delete_folder;
pub use models::{
    Achievement, FeedbackItem, Folder, FolderKind, Frequency, Goal, GoalKind, JournalEntry, Note,
    Priority, Record, Recurrence, Task, Timeline, TimelineEvent,
};
pub use notify::{MemoryNotifier, NoticeLevel, Notifier, NullNotifier};
pub use outbox::{DrainOutcome, Outbox};
pub use recurrence::{next_due_date, roll_forward, RollForward, RollForwardGuard};
pub use storage::{IndexRange, StorageEngine, StorageError, StorageResult};
pub use streaks::Streaks;
pub use version::{DataVersion, Subscription};
