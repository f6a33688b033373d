//! Validating builder for [`Event`].
//!
//! All event construction and editing funnels through here: the builder
//! checks the date ordering, repeat-end, and required-field invariants
//! before an [`Event`] ever exists, and re-checks them on edits applied to
//! an existing one.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cache::OccurrenceCache;
use crate::error::{EngineError, Result};
use crate::event::{Event, EventKind};
use crate::recurrence::{RecurrenceKind, RecurrenceRule, RepeatPeriod, WeekdaySet};
use crate::reminder::Reminder;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBuilder {
    pub title: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub is_all_day: bool,
    pub is_enabled: bool,
    pub icon: String,
    pub color_hex: String,
    pub background_image: Option<String>,
    pub is_repeat_enabled: bool,
    pub recurrence_kind: RecurrenceKind,
    pub repeat_period: RepeatPeriod,
    pub repeat_interval: u32,
    pub repeat_weekdays: WeekdaySet,
    /// When false, `repeat_end_date` is ignored and cleared on build.
    pub has_repeat_end_date: bool,
    pub repeat_end_date: Option<NaiveDateTime>,
    pub is_reminder_enabled: bool,
    pub first_reminder: Reminder,
    pub second_reminder: Reminder,
    pub tag: Option<String>,
    pub kind: EventKind,
}

impl EventBuilder {
    /// A fresh builder anchored at `now`: an enabled all-day event spanning
    /// today from midnight to 23:59.
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            title: String::new(),
            start_date: day_start(now),
            end_date: late_day_end(now),
            is_all_day: true,
            is_enabled: true,
            icon: String::new(),
            color_hex: String::new(),
            background_image: None,
            is_repeat_enabled: false,
            recurrence_kind: RecurrenceKind::SingleCycle,
            repeat_period: RepeatPeriod::Daily,
            repeat_interval: 1,
            repeat_weekdays: WeekdaySet::empty(),
            has_repeat_end_date: false,
            repeat_end_date: None,
            is_reminder_enabled: false,
            first_reminder: Reminder::None,
            second_reminder: Reminder::None,
            tag: None,
            kind: EventKind::User,
        }
    }

    /// A builder pre-filled from an existing event, for editing flows.
    pub fn from_event(event: &Event) -> Self {
        Self {
            title: event.title.clone(),
            start_date: event.start_date,
            end_date: event.end_date,
            is_all_day: event.is_all_day,
            is_enabled: event.is_enabled,
            icon: event.icon.clone(),
            color_hex: event.color_hex.clone(),
            background_image: event.background_image.clone(),
            is_repeat_enabled: event.is_repeat_enabled,
            recurrence_kind: event.recurrence.kind,
            repeat_period: event.recurrence.period,
            repeat_interval: event.recurrence.interval,
            repeat_weekdays: event.recurrence.weekdays,
            has_repeat_end_date: event.recurrence.end_date.is_some(),
            repeat_end_date: event.recurrence.end_date,
            is_reminder_enabled: event.is_reminder_enabled,
            first_reminder: event.first_reminder,
            second_reminder: event.second_reminder,
            tag: event.tag.clone(),
            kind: event.kind,
        }
    }

    // ── Chainable setters ───────────────────────────────────────────────

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn start_date(mut self, date: NaiveDateTime) -> Self {
        self.start_date = date;
        self
    }

    pub fn end_date(mut self, date: NaiveDateTime) -> Self {
        self.end_date = date;
        self
    }

    pub fn all_day(mut self, all_day: bool) -> Self {
        self.is_all_day = all_day;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.is_enabled = enabled;
        self
    }

    pub fn icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn color_hex(mut self, color_hex: impl Into<String>) -> Self {
        self.color_hex = color_hex.into();
        self
    }

    pub fn background_image(mut self, image: impl Into<String>) -> Self {
        self.background_image = Some(image.into());
        self
    }

    /// Enable single-cycle repetition every `interval` periods.
    pub fn repeat(mut self, period: RepeatPeriod, interval: u32) -> Self {
        self.is_repeat_enabled = true;
        self.recurrence_kind = RecurrenceKind::SingleCycle;
        self.repeat_period = period;
        self.repeat_interval = interval;
        self
    }

    /// Enable custom-weekly repetition on the given weekday set.
    pub fn repeat_custom_weekly(mut self, weekdays: WeekdaySet) -> Self {
        self.is_repeat_enabled = true;
        self.recurrence_kind = RecurrenceKind::CustomWeekly;
        self.repeat_weekdays = weekdays;
        self
    }

    pub fn repeat_end_date(mut self, date: NaiveDateTime) -> Self {
        self.has_repeat_end_date = true;
        self.repeat_end_date = Some(date);
        self
    }

    pub fn no_repeat_end_date(mut self) -> Self {
        self.has_repeat_end_date = false;
        self.repeat_end_date = None;
        self
    }

    pub fn reminders(mut self, first: Reminder, second: Reminder) -> Self {
        self.is_reminder_enabled = first != Reminder::None || second != Reminder::None;
        self.first_reminder = first;
        self.second_reminder = second;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn event_kind(mut self, kind: EventKind) -> Self {
        self.kind = kind;
        self
    }

    /// Snap the dates to the all-day shape: start at midnight, end at 23:59
    /// of the start day.
    pub fn snap_to_all_day(mut self) -> Self {
        self.is_all_day = true;
        self.start_date = day_start(self.start_date);
        self.end_date = late_day_end(self.start_date);
        self
    }

    // ── Finalization ────────────────────────────────────────────────────

    /// Validate and construct the event. `now` stamps the creation time.
    ///
    /// # Errors
    ///
    /// - [`EngineError::StartAfterEnd`] unless `start_date < end_date`
    /// - [`EngineError::RepeatEndBeforeEventEnd`] when a repeat end date
    ///   (normalized to the end of its day) precedes the event end
    /// - [`EngineError::InvalidInterval`] / [`EngineError::EmptyWeekdayMask`]
    ///   for malformed recurrence settings
    /// - [`EngineError::MissingTitle`] / [`EngineError::MissingIcon`] /
    ///   [`EngineError::MissingColor`] for empty display fields
    pub fn build(&self, now: NaiveDateTime) -> Result<Event> {
        let recurrence = self.validate()?;
        Ok(Event {
            id: Uuid::new_v4(),
            title: self.title.clone(),
            start_date: self.start_date,
            end_date: self.end_date,
            is_all_day: self.is_all_day,
            is_enabled: self.is_enabled,
            icon: self.icon.clone(),
            color_hex: self.color_hex.clone(),
            background_image: self.background_image.clone(),
            is_repeat_enabled: self.is_repeat_enabled,
            recurrence,
            is_reminder_enabled: self.is_reminder_enabled,
            first_reminder: self.first_reminder,
            second_reminder: self.second_reminder,
            tag: self.tag.clone(),
            kind: self.kind,
            created_at: now,
            updated_at: now,
            cache: OccurrenceCache::new(),
        })
    }

    /// Apply the builder's fields to an existing event, re-running the same
    /// validation as [`build`](Self::build). Invalidates the occurrence
    /// cache and bumps the update stamp.
    pub fn apply_to(&self, event: &mut Event, now: NaiveDateTime) -> Result<()> {
        let recurrence = self.validate()?;
        event.title = self.title.clone();
        event.start_date = self.start_date;
        event.end_date = self.end_date;
        event.is_all_day = self.is_all_day;
        event.is_enabled = self.is_enabled;
        event.icon = self.icon.clone();
        event.color_hex = self.color_hex.clone();
        event.background_image = self.background_image.clone();
        event.is_repeat_enabled = self.is_repeat_enabled;
        event.recurrence = recurrence;
        event.is_reminder_enabled = self.is_reminder_enabled;
        event.first_reminder = self.first_reminder;
        event.second_reminder = self.second_reminder;
        event.tag = self.tag.clone();
        event.updated_at = now;
        event.invalidate_cache();
        Ok(())
    }

    /// Run the construction invariants and assemble the recurrence rule.
    fn validate(&self) -> Result<RecurrenceRule> {
        if self.start_date >= self.end_date {
            return Err(EngineError::StartAfterEnd);
        }

        // The repeat end always covers its whole final day.
        let repeat_end = if self.is_repeat_enabled && self.has_repeat_end_date {
            match self.repeat_end_date {
                Some(date) => {
                    let normalized = end_of_day(date);
                    if normalized < self.end_date {
                        return Err(EngineError::RepeatEndBeforeEventEnd);
                    }
                    Some(normalized)
                }
                None => None,
            }
        } else {
            None
        };

        if self.title.is_empty() {
            return Err(EngineError::MissingTitle);
        }
        if self.icon.is_empty() {
            return Err(EngineError::MissingIcon);
        }
        if self.color_hex.is_empty() {
            return Err(EngineError::MissingColor);
        }

        let rule = RecurrenceRule {
            kind: self.recurrence_kind,
            period: self.repeat_period,
            interval: self.repeat_interval,
            end_date: repeat_end,
            weekdays: self.repeat_weekdays,
        };
        if self.is_repeat_enabled {
            rule.validate()?;
        }
        Ok(rule)
    }
}

fn day_start(dt: NaiveDateTime) -> NaiveDateTime {
    dt.date().and_hms_opt(0, 0, 0).unwrap_or(dt)
}

/// 23:59:00 — the all-day end shape used for freshly built events.
fn late_day_end(dt: NaiveDateTime) -> NaiveDateTime {
    dt.date().and_hms_opt(23, 59, 0).unwrap_or(dt)
}

/// 23:59:59 — the normalized repeat-end boundary.
fn end_of_day(dt: NaiveDateTime) -> NaiveDateTime {
    dt.date().and_hms_opt(23, 59, 59).unwrap_or(dt)
}
