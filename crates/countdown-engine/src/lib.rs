//! # countdown-engine
//!
//! Temporal-phase computation for countdown and event widgets.
//!
//! Given an event with optional recurrence, the engine resolves the next
//! occurrence, classifies any instant into one of five lifecycle phases,
//! and selects the widget appearance configured for that phase. Every
//! computation takes an explicit "now" anchor; nothing here reads the
//! system clock, so behavior is fully deterministic and testable.
//!
//! ## Modules
//!
//! - [`recurrence`] — Repeat rules and next-occurrence resolution
//! - [`cache`] — Same-day memoization of resolved occurrences
//! - [`event`] — The event model and its data-provider traits
//! - [`builder`] — Validated event construction and editing
//! - [`phase`] — Lifecycle phase kinds, time-offset windows, classification
//! - [`template`] — Per-phase widget appearance and active-phase selection
//! - [`calendar`] — Export of repeat rules as RRULE-style descriptors
//! - [`reminder`] — Reminder offsets relative to the event start
//! - [`error`] — Error types

pub mod builder;
pub mod cache;
pub mod calendar;
pub mod error;
pub mod event;
pub mod phase;
pub mod recurrence;
pub mod reminder;
pub mod template;

pub use builder::EventBuilder;
pub use cache::OccurrenceCache;
pub use calendar::{recurrence_descriptors, Frequency, RecurrenceDescriptor};
pub use error::{EngineError, Result};
pub use event::{Event, EventInfoProvider, EventKind, EventSnapshot, RecurringEvent};
pub use phase::{classify, PhaseTimeKind, PhaseTimeRule, TimeOffset};
pub use recurrence::{
    days_to_next_repeat, resolve_next_start, try_resolve_next_start, RecurrenceKind,
    RecurrenceRule, RepeatPeriod, WeekdaySet,
};
pub use reminder::Reminder;
pub use template::{Background, BackgroundKind, PhaseTemplate, WidgetPhase};
