//! Event entities and the recurring-event contract.
//!
//! [`Event`] is the full user-facing countdown event; [`EventSnapshot`] is
//! the recurrence-relevant subset bound into a widget template so the
//! template can render without holding the live entity. Both expose the
//! [`RecurringEvent`] contract, which derives the next occurrence through
//! the resolver with per-day memoization.

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::OccurrenceCache;
use crate::recurrence::{resolve_next_start, RecurrenceRule};
use crate::reminder::Reminder;

// ── Contracts ───────────────────────────────────────────────────────────────

/// The recurrence-bearing event contract.
///
/// Provided methods derive the next occurrence via the resolver, memoized
/// per calendar day through [`OccurrenceCache`]. Implementors only expose
/// their stored fields.
pub trait RecurringEvent {
    fn title(&self) -> &str;
    fn start_date(&self) -> NaiveDateTime;
    fn end_date(&self) -> NaiveDateTime;
    fn is_repeat_enabled(&self) -> bool;
    fn recurrence(&self) -> &RecurrenceRule;
    fn occurrence_cache(&self) -> &OccurrenceCache;

    /// The start of the nearest upcoming occurrence relative to `now`.
    ///
    /// Non-repeating events always answer their original start date; the
    /// cache is bypassed entirely for them.
    fn next_start_date(&self, now: NaiveDateTime) -> NaiveDateTime {
        if !self.is_repeat_enabled() {
            return self.start_date();
        }
        self.occurrence_cache().get_or_compute(now, || {
            resolve_next_start(self.recurrence(), true, self.start_date(), now)
        })
    }

    /// The end of the nearest upcoming occurrence: the next start's date
    /// carrying the original end's time-of-day.
    ///
    /// For multi-day events this can land before the next start (an event
    /// spanning Jun 10 09:00 to Jun 14 08:00 yields Jun 10 08:00). The
    /// occurrence duration is not carried over; callers needing the true
    /// end of a multi-day occurrence must add the span themselves.
    fn next_end_date(&self, now: NaiveDateTime) -> NaiveDateTime {
        let next_start = self.next_start_date(now);
        let end_time = self.end_date().time();
        next_start
            .date()
            .and_hms_opt(end_time.hour(), end_time.minute(), 0)
            .unwrap_or(next_start)
    }

    /// Whole calendar days between `now` and the next occurrence.
    fn days_until_next_start(&self, now: NaiveDateTime) -> i64 {
        (self.next_start_date(now).date() - now.date()).num_days()
    }
}

/// Read-only snapshot contract consumed by phase content rendering.
///
/// Phase definitions hold a shared handle to a provider; they never own the
/// event itself.
pub trait EventInfoProvider {
    fn widget_title(&self) -> &str;
    fn event_title(&self) -> &str;
    fn end_date(&self) -> NaiveDateTime;
    fn next_start_date(&self, now: NaiveDateTime) -> NaiveDateTime;
    fn next_end_date(&self, now: NaiveDateTime) -> NaiveDateTime;
    fn days_until_next_start(&self, now: NaiveDateTime) -> i64;
}

// ── Event ───────────────────────────────────────────────────────────────────

/// Who created the record; builtin data is not editable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EventKind {
    #[default]
    User,
    Builtin,
}

/// A user-defined countdown event.
///
/// Core fields are immutable after construction except through
/// [`EventBuilder::apply_to`](crate::builder::EventBuilder::apply_to), which
/// also invalidates the occurrence cache. The cache is transient: excluded
/// from serialization and from equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub is_all_day: bool,
    pub is_enabled: bool,
    pub icon: String,
    pub color_hex: String,
    pub background_image: Option<String>,
    pub is_repeat_enabled: bool,
    pub recurrence: RecurrenceRule,
    pub is_reminder_enabled: bool,
    pub first_reminder: Reminder,
    pub second_reminder: Reminder,
    pub tag: Option<String>,
    pub kind: EventKind,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(skip)]
    pub(crate) cache: OccurrenceCache,
}

impl Event {
    /// Drop the memoized next occurrence. Called by every builder-driven
    /// edit; must also be called after any direct field mutation that
    /// touches dates or recurrence.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }

    /// Capture the recurrence-relevant subset for binding into a template.
    pub fn snapshot(&self) -> EventSnapshot {
        EventSnapshot {
            id: Uuid::new_v4(),
            title: self.title.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            is_all_day: self.is_all_day,
            is_enabled: self.is_enabled,
            is_repeat_enabled: self.is_repeat_enabled,
            recurrence: self.recurrence.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            cache: OccurrenceCache::new(),
        }
    }
}

// Equality deliberately ignores the cache: memoization state is not part of
// the event's identity.
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.start_date == other.start_date
            && self.end_date == other.end_date
            && self.is_all_day == other.is_all_day
            && self.is_enabled == other.is_enabled
            && self.icon == other.icon
            && self.color_hex == other.color_hex
            && self.background_image == other.background_image
            && self.is_repeat_enabled == other.is_repeat_enabled
            && self.recurrence == other.recurrence
            && self.is_reminder_enabled == other.is_reminder_enabled
            && self.first_reminder == other.first_reminder
            && self.second_reminder == other.second_reminder
            && self.tag == other.tag
            && self.kind == other.kind
            && self.created_at == other.created_at
            && self.updated_at == other.updated_at
    }
}

impl RecurringEvent for Event {
    fn title(&self) -> &str {
        &self.title
    }

    fn start_date(&self) -> NaiveDateTime {
        self.start_date
    }

    fn end_date(&self) -> NaiveDateTime {
        self.end_date
    }

    fn is_repeat_enabled(&self) -> bool {
        self.is_repeat_enabled
    }

    fn recurrence(&self) -> &RecurrenceRule {
        &self.recurrence
    }

    fn occurrence_cache(&self) -> &OccurrenceCache {
        &self.cache
    }
}

// ── EventSnapshot ───────────────────────────────────────────────────────────

/// The recurrence-relevant subset of an event, owned by a widget template.
///
/// Templates render from the snapshot rather than the live entity, so a
/// widget keeps working even while the event is being edited. Carries its
/// own transient occurrence cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSnapshot {
    pub id: Uuid,
    pub title: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub is_all_day: bool,
    pub is_enabled: bool,
    pub is_repeat_enabled: bool,
    pub recurrence: RecurrenceRule,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(skip)]
    pub(crate) cache: OccurrenceCache,
}

impl EventSnapshot {
    /// True when the snapshot still matches the recurrence-relevant fields
    /// of the live event.
    pub fn matches(&self, event: &Event) -> bool {
        self.title == event.title
            && self.start_date == event.start_date
            && self.end_date == event.end_date
            && self.is_all_day == event.is_all_day
            && self.is_enabled == event.is_enabled
            && self.is_repeat_enabled == event.is_repeat_enabled
            && self.recurrence == event.recurrence
    }

    pub fn invalidate_cache(&self) {
        self.cache.invalidate();
    }
}

impl PartialEq for EventSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.start_date == other.start_date
            && self.end_date == other.end_date
            && self.is_all_day == other.is_all_day
            && self.is_enabled == other.is_enabled
            && self.is_repeat_enabled == other.is_repeat_enabled
            && self.recurrence == other.recurrence
            && self.created_at == other.created_at
            && self.updated_at == other.updated_at
    }
}

impl RecurringEvent for EventSnapshot {
    fn title(&self) -> &str {
        &self.title
    }

    fn start_date(&self) -> NaiveDateTime {
        self.start_date
    }

    fn end_date(&self) -> NaiveDateTime {
        self.end_date
    }

    fn is_repeat_enabled(&self) -> bool {
        self.is_repeat_enabled
    }

    fn recurrence(&self) -> &RecurrenceRule {
        &self.recurrence
    }

    fn occurrence_cache(&self) -> &OccurrenceCache {
        &self.cache
    }
}

impl EventInfoProvider for EventSnapshot {
    fn widget_title(&self) -> &str {
        ""
    }

    fn event_title(&self) -> &str {
        &self.title
    }

    fn end_date(&self) -> NaiveDateTime {
        self.end_date
    }

    fn next_start_date(&self, now: NaiveDateTime) -> NaiveDateTime {
        RecurringEvent::next_start_date(self, now)
    }

    fn next_end_date(&self, now: NaiveDateTime) -> NaiveDateTime {
        RecurringEvent::next_end_date(self, now)
    }

    fn days_until_next_start(&self, now: NaiveDateTime) -> i64 {
        RecurringEvent::days_until_next_start(self, now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::EventBuilder;
    use crate::recurrence::RepeatPeriod;
    use chrono::NaiveDate;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn repeating_event() -> Event {
        EventBuilder::new(dt(2024, 5, 4, 12, 0))
            .title("Piano lesson")
            .start_date(dt(2024, 5, 4, 15, 0))
            .end_date(dt(2024, 5, 4, 16, 0))
            .icon("013-ice cream")
            .color_hex("#2f261e")
            .repeat(RepeatPeriod::Daily, 1)
            .build(dt(2024, 5, 4, 12, 0))
            .unwrap()
    }

    #[test]
    fn test_non_repeating_next_start_is_start() {
        let event = EventBuilder::new(dt(2024, 5, 4, 12, 0))
            .title("Exam")
            .start_date(dt(2024, 5, 10, 9, 0))
            .end_date(dt(2024, 5, 10, 11, 0))
            .icon("002-pumpkin")
            .color_hex("#aabbcc")
            .build(dt(2024, 5, 4, 12, 0))
            .unwrap();
        assert_eq!(
            event.next_start_date(dt(2026, 1, 1, 0, 0)),
            dt(2024, 5, 10, 9, 0)
        );
    }

    #[test]
    fn test_next_end_carries_end_time_of_day() {
        let event = repeating_event();
        let now = dt(2024, 5, 20, 8, 0);
        assert_eq!(event.next_start_date(now), dt(2024, 5, 20, 15, 0));
        assert_eq!(event.next_end_date(now), dt(2024, 5, 20, 16, 0));
    }

    #[test]
    fn test_next_end_of_multi_day_event_ignores_span() {
        // Ends four days after the start, earlier in the day. The derived
        // end keeps only the time-of-day, so it precedes the next start.
        let event = EventBuilder::new(dt(2024, 5, 4, 12, 0))
            .title("Conference")
            .start_date(dt(2024, 6, 10, 9, 0))
            .end_date(dt(2024, 6, 14, 8, 0))
            .icon("007-lantern")
            .color_hex("#aabbcc")
            .build(dt(2024, 5, 4, 12, 0))
            .unwrap();
        let now = dt(2024, 6, 1, 12, 0);
        assert_eq!(event.next_start_date(now), dt(2024, 6, 10, 9, 0));
        assert_eq!(event.next_end_date(now), dt(2024, 6, 10, 8, 0));
    }

    #[test]
    fn test_days_until_next_start_counts_calendar_days() {
        let event = EventBuilder::new(dt(2024, 5, 4, 12, 0))
            .title("Trip")
            .start_date(dt(2024, 5, 10, 9, 0))
            .end_date(dt(2024, 5, 12, 18, 0))
            .icon("004-shaved ice")
            .color_hex("#aabbcc")
            .build(dt(2024, 5, 4, 12, 0))
            .unwrap();
        // Late on May 4 it is still 6 calendar days away.
        assert_eq!(event.days_until_next_start(dt(2024, 5, 4, 23, 59)), 6);
    }

    #[test]
    fn test_cached_value_survives_unnoticed_mutation_until_invalidated() {
        let mut event = repeating_event();
        let now = dt(2024, 5, 20, 8, 0);
        let first = event.next_start_date(now);

        // Mutating the rule directly without invalidation: the stale value
        // is still served on the same day.
        event.recurrence.interval = 5;
        assert_eq!(event.next_start_date(dt(2024, 5, 20, 12, 0)), first);

        // Explicit invalidation forces recomputation under the new rule.
        event.invalidate_cache();
        let recomputed = event.next_start_date(dt(2024, 5, 20, 12, 0));
        assert_ne!(recomputed, first);
    }

    #[test]
    fn test_day_rollover_recomputes() {
        let event = repeating_event();
        let first = event.next_start_date(dt(2024, 5, 20, 8, 0));
        assert_eq!(first, dt(2024, 5, 20, 15, 0));
        let next_day = event.next_start_date(dt(2024, 5, 21, 8, 0));
        assert_eq!(next_day, dt(2024, 5, 21, 15, 0));
    }

    #[test]
    fn test_equality_ignores_cache_state() {
        // The cache is memoization, not identity.
        let event = repeating_event();
        let warm = event.clone();
        warm.next_start_date(dt(2024, 5, 20, 8, 0));
        assert_eq!(event, warm);
    }

    #[test]
    fn test_snapshot_provides_event_info() {
        let event = repeating_event();
        let snapshot = event.snapshot();
        assert!(snapshot.matches(&event));
        let now = dt(2024, 5, 20, 8, 0);
        assert_eq!(snapshot.event_title(), "Piano lesson");
        assert_eq!(
            EventInfoProvider::next_start_date(&snapshot, now),
            dt(2024, 5, 20, 15, 0)
        );
        assert_eq!(EventInfoProvider::days_until_next_start(&snapshot, now), 0);
    }

    #[test]
    fn test_serialization_skips_cache() {
        let event = repeating_event();
        event.next_start_date(dt(2024, 5, 20, 8, 0));
        let json = serde_json::to_string(&event).unwrap();
        assert!(!json.contains("cache"));
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        // The deserialized copy starts cold.
        assert_eq!(back.cache.lookup(dt(2024, 5, 20, 9, 0)), None);
    }
}
