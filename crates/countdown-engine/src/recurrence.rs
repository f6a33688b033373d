//! Recurrence rules and next-occurrence resolution.
//!
//! Provides pure functions for computing the nearest upcoming occurrence of
//! a repeating event. All functions take explicit inputs (no system clock
//! access) — the caller provides the "now" anchor, keeping the computation
//! deterministic and testable.
//!
//! Two recurrence shapes exist:
//!
//! - **Single cycle** — repeat every N days/weeks/months/years, anchored to
//!   the event's original start date. Monthly and yearly recurrence anchored
//!   on day 29/30/31 clamps to the last day of short months (Feb 29 falls
//!   back to Feb 28 in non-leap years).
//! - **Custom weekly** — repeat on an explicit set of weekdays, encoded as a
//!   7-bit mask (bit 0 = Monday … bit 6 = Sunday).

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{EngineError, Result};

// ── Rule value types ────────────────────────────────────────────────────────

/// The period of a single-cycle recurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RepeatPeriod {
    #[default]
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// Discriminates how a rule repeats: by period, or on explicit weekdays.
///
/// `CustomWeekly` ignores [`RepeatPeriod`] entirely and consults the
/// weekday mask instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecurrenceKind {
    #[default]
    SingleCycle,
    CustomWeekly,
}

/// A set of weekdays encoded as a 7-bit mask (bit 0 = Monday … bit 6 = Sunday).
///
/// The raw byte is the persisted representation: `0b0000_1111` means
/// Monday through Thursday. Deserialization routes through [`from_bits`],
/// so bits above the 7th never survive into a live set.
///
/// [`from_bits`]: Self::from_bits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u8")]
pub struct WeekdaySet(u8);

impl From<u8> for WeekdaySet {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}

impl WeekdaySet {
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Build a set from a raw mask; bits above the 7th are discarded.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & 0x7f)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn contains(self, weekday: Weekday) -> bool {
        self.0 & (1 << weekday.num_days_from_monday()) != 0
    }

    pub fn insert(&mut self, weekday: Weekday) {
        self.0 |= 1 << weekday.num_days_from_monday();
    }

    /// Iterate the selected weekdays in Monday-first order.
    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        const WEEK: [Weekday; 7] = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        WEEK.into_iter().filter(move |wd| self.contains(*wd))
    }
}

impl FromIterator<Weekday> for WeekdaySet {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut set = Self::empty();
        for wd in iter {
            set.insert(wd);
        }
        set
    }
}

/// How an event repeats: kind, period, interval, optional end, weekday mask.
///
/// Only meaningful when the owning event has repetition enabled. The mask is
/// consulted only for [`RecurrenceKind::CustomWeekly`]; the period and
/// interval only for [`RecurrenceKind::SingleCycle`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceRule {
    pub kind: RecurrenceKind,
    pub period: RepeatPeriod,
    /// Repeat every N periods; at least 1.
    pub interval: u32,
    /// Once passed, the rule produces no further occurrences.
    pub end_date: Option<NaiveDateTime>,
    pub weekdays: WeekdaySet,
}

impl Default for RecurrenceRule {
    fn default() -> Self {
        Self {
            kind: RecurrenceKind::SingleCycle,
            period: RepeatPeriod::Daily,
            interval: 1,
            end_date: None,
            weekdays: WeekdaySet::empty(),
        }
    }
}

impl RecurrenceRule {
    /// A single-cycle rule repeating every `interval` periods.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidInterval`] if `interval` is zero.
    pub fn single_cycle(period: RepeatPeriod, interval: u32) -> Result<Self> {
        if interval < 1 {
            return Err(EngineError::InvalidInterval(interval));
        }
        Ok(Self {
            kind: RecurrenceKind::SingleCycle,
            period,
            interval,
            ..Self::default()
        })
    }

    /// A custom-weekly rule repeating on the given weekdays.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::EmptyWeekdayMask`] if no weekday is selected —
    /// a zero mask would yield no occurrences at all.
    pub fn custom_weekly(weekdays: WeekdaySet) -> Result<Self> {
        if weekdays.is_empty() {
            return Err(EngineError::EmptyWeekdayMask);
        }
        Ok(Self {
            kind: RecurrenceKind::CustomWeekly,
            weekdays,
            ..Self::default()
        })
    }

    pub fn with_end_date(mut self, end_date: NaiveDateTime) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Re-check the construction invariants, for rules built field-by-field.
    pub fn validate(&self) -> Result<()> {
        if self.interval < 1 {
            return Err(EngineError::InvalidInterval(self.interval));
        }
        if self.kind == RecurrenceKind::CustomWeekly && self.weekdays.is_empty() {
            return Err(EngineError::EmptyWeekdayMask);
        }
        Ok(())
    }
}

// ── Resolution ──────────────────────────────────────────────────────────────

/// Compute the nearest upcoming occurrence of a repeating event.
///
/// # Arguments
///
/// * `rule` — the recurrence configuration
/// * `repeat_enabled` — when false the original start is returned unchanged
/// * `original_start` — the event's original start instant (the anchor)
/// * `now` — the reference instant
///
/// # Behavior
///
/// The occurrence is `original_start` itself when repetition is disabled,
/// when `now` falls on the same calendar day as the start, when the start is
/// still in the future, or when the recurrence end date has passed
/// (exhausted rules fall back to the original start rather than reporting
/// "no occurrence"). Otherwise the smallest non-negative day offset from
/// `now` that satisfies the pattern is applied, and the result carries the
/// **time-of-day of `original_start`** (seconds zeroed), not of `now`.
///
/// # Errors
///
/// Returns [`EngineError::EmptyWeekdayMask`] for a custom-weekly rule with a
/// zero mask. Use [`resolve_next_start`] for the non-failing variant.
pub fn try_resolve_next_start(
    rule: &RecurrenceRule,
    repeat_enabled: bool,
    original_start: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<NaiveDateTime> {
    if !repeat_enabled {
        return Ok(original_start);
    }
    let resolved = next_occurrence_date(rule, original_start, now)?;
    Ok(at_time_of(resolved, original_start))
}

/// Non-failing variant of [`try_resolve_next_start`].
///
/// A malformed rule that skipped builder validation must not crash the
/// caller: resolution errors log a warning and fall back to no advancement.
pub fn resolve_next_start(
    rule: &RecurrenceRule,
    repeat_enabled: bool,
    original_start: NaiveDateTime,
    now: NaiveDateTime,
) -> NaiveDateTime {
    match try_resolve_next_start(rule, repeat_enabled, original_start, now) {
        Ok(resolved) => resolved,
        Err(err) => {
            warn!(%err, "recurrence resolution failed, keeping original start");
            original_start
        }
    }
}

/// The date-level part of resolution: where the next occurrence lands.
fn next_occurrence_date(
    rule: &RecurrenceRule,
    original_start: NaiveDateTime,
    now: NaiveDateTime,
) -> Result<NaiveDateTime> {
    // Occurrence is today: no advancement.
    if original_start.date() == now.date() {
        return Ok(original_start);
    }

    // Countdown has not started yet.
    if original_start >= now {
        return Ok(original_start);
    }

    // Recurrence exhausted.
    if let Some(end) = rule.end_date {
        if now > end {
            return Ok(original_start);
        }
    }

    let days = days_to_next_repeat(rule, original_start.date(), now.date())?;
    let candidate = now + Duration::days(days);

    // The next occurrence would overshoot the recurrence end. Falls back to
    // the original start, matching the historical behavior even though it
    // under-reports the last valid occurrence.
    if let Some(end) = rule.end_date {
        if candidate > end {
            return Ok(original_start);
        }
    }

    Ok(candidate)
}

/// Smallest non-negative day offset from `today` that satisfies the pattern.
///
/// # Errors
///
/// Returns [`EngineError::EmptyWeekdayMask`] for a zero custom-weekly mask.
pub fn days_to_next_repeat(
    rule: &RecurrenceRule,
    anchor: NaiveDate,
    today: NaiveDate,
) -> Result<i64> {
    match rule.kind {
        RecurrenceKind::CustomWeekly => {
            if rule.weekdays.is_empty() {
                return Err(EngineError::EmptyWeekdayMask);
            }
            for offset in 0..7 {
                let day = today + Duration::days(offset);
                if rule.weekdays.contains(day.weekday()) {
                    return Ok(offset);
                }
            }
            // A non-empty mask always matches within one week.
            Err(EngineError::EmptyWeekdayMask)
        }
        RecurrenceKind::SingleCycle => {
            let interval = i64::from(rule.interval.max(1));
            Ok(match rule.period {
                RepeatPeriod::Daily => next_aligned_day(anchor, today, interval),
                RepeatPeriod::Weekly => next_aligned_day(anchor, today, 7 * interval),
                RepeatPeriod::Monthly => next_monthly(anchor, today, rule.interval),
                RepeatPeriod::Yearly => next_yearly(anchor, today, rule.interval),
            })
        }
    }
}

/// Day offset to the next multiple of `step` days since `anchor`.
fn next_aligned_day(anchor: NaiveDate, today: NaiveDate, step: i64) -> i64 {
    let elapsed = (today - anchor).num_days();
    if elapsed <= 0 {
        return 0;
    }
    let rem = elapsed % step;
    if rem == 0 {
        0
    } else {
        step - rem
    }
}

/// Day offset to the next interval-aligned month carrying the anchor's
/// day-of-month, clamped to the last day of short months.
///
/// Clamping makes "repeat on the 31st" land on Apr 30 / Feb 28 (or 29)
/// rather than skipping those months, and "repeat on the 29th/30th" land on
/// the last day of February.
fn next_monthly(anchor: NaiveDate, today: NaiveDate, interval: u32) -> i64 {
    let interval = interval.max(1) as i32;
    let anchor_months = anchor.year() * 12 + anchor.month0() as i32;
    let today_months = today.year() * 12 + today.month0() as i32;

    let elapsed = (today_months - anchor_months).max(0);
    let rem = elapsed % interval;
    let mut months = if rem == 0 {
        today_months
    } else {
        today_months + (interval - rem)
    };

    loop {
        let year = months.div_euclid(12);
        let month = months.rem_euclid(12) as u32 + 1;
        let day = clamp_day(year, month, anchor.day());
        if let Some(date) = NaiveDate::from_ymd_opt(year, month, day) {
            if date >= today {
                return (date - today).num_days();
            }
        }
        months += interval;
    }
}

/// Day offset to the next interval-aligned year carrying the anchor's
/// month and day. A Feb 29 anchor falls back to Feb 28 in non-leap years.
fn next_yearly(anchor: NaiveDate, today: NaiveDate, interval: u32) -> i64 {
    let interval = interval.max(1) as i32;
    let elapsed = (today.year() - anchor.year()).max(0);
    let rem = elapsed % interval;
    let mut year = if rem == 0 {
        today.year()
    } else {
        today.year() + (interval - rem)
    };

    loop {
        let day = clamp_day(year, anchor.month(), anchor.day());
        if let Some(date) = NaiveDate::from_ymd_opt(year, anchor.month(), day) {
            if date >= today {
                return (date - today).num_days();
            }
        }
        year += interval;
    }
}

/// Clamp a day-of-month to the length of the given month.
fn clamp_day(year: i32, month: u32, day: u32) -> u32 {
    day.min(days_in_month(year, month))
}

/// Number of days in a month, leap years included.
pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map_or(28, |last| last.day())
}

/// Apply the hour and minute of `time_source` to `resolved`, zeroing seconds.
fn at_time_of(resolved: NaiveDateTime, time_source: NaiveDateTime) -> NaiveDateTime {
    let time = time_source.time();
    resolved
        .date()
        .and_hms_opt(time.hour(), time.minute(), 0)
        .unwrap_or(resolved)
}

// ── Tests ───────────────────────────────────────────────────────────────────
