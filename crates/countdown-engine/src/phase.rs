//! Phase classification: where "now" falls in an event's lifecycle.
//!
//! Every instant maps to exactly one of five phase kinds, tested in a fixed
//! order against the event's next start and end. The `During` phase is
//! further subdivided by [`PhaseTimeRule`] windows expressed as offsets from
//! the start instant.

use chrono::{Duration, NaiveDateTime};
use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

// ── Phase kinds ─────────────────────────────────────────────────────────

/// The five lifecycle phases, in classification order.
///
/// Serialized as the integers 1 through 5 for compatibility with stored
/// widget templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PhaseTimeKind {
    /// Now is before the calendar day the event starts on.
    BeforeStartDate,
    /// Same calendar day as the start, but before the start instant.
    StartDayBeforeStartTime,
    /// Between the start and end instants.
    During,
    /// Past the end instant, but still on or before the end's calendar day.
    EndTimeBeforeEndDate,
    /// Past the end of the end date's calendar day.
    AfterEndDate,
}

impl PhaseTimeKind {
    pub const ALL: [PhaseTimeKind; 5] = [
        PhaseTimeKind::BeforeStartDate,
        PhaseTimeKind::StartDayBeforeStartTime,
        PhaseTimeKind::During,
        PhaseTimeKind::EndTimeBeforeEndDate,
        PhaseTimeKind::AfterEndDate,
    ];

    /// The stable integer representation used on the wire.
    pub const fn repr(self) -> u8 {
        match self {
            Self::BeforeStartDate => 1,
            Self::StartDayBeforeStartTime => 2,
            Self::During => 3,
            Self::EndTimeBeforeEndDate => 4,
            Self::AfterEndDate => 5,
        }
    }

    pub const fn from_repr(repr: u8) -> Option<Self> {
        match repr {
            1 => Some(Self::BeforeStartDate),
            2 => Some(Self::StartDayBeforeStartTime),
            3 => Some(Self::During),
            4 => Some(Self::EndTimeBeforeEndDate),
            5 => Some(Self::AfterEndDate),
            _ => None,
        }
    }
}

impl Serialize for PhaseTimeKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.repr())
    }
}

impl<'de> Deserialize<'de> for PhaseTimeKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let repr = u8::deserialize(deserializer)?;
        Self::from_repr(repr)
            .ok_or_else(|| de::Error::custom(format!("invalid phase kind {repr}, expected 1..=5")))
    }
}

// ── Time offsets ────────────────────────────────────────────────────────

/// A signed offset from the event's start instant, with a distinguished
/// "unbounded" value that stands for the event's end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeOffset {
    pub seconds: i64,
    /// When set, `seconds` is ignored and the offset resolves to the event
    /// end instant.
    pub is_max: bool,
}

impl TimeOffset {
    pub const fn new(seconds: i64) -> Self {
        Self { seconds, is_max: false }
    }

    pub const fn unbounded() -> Self {
        Self { seconds: 0, is_max: true }
    }

    /// Resolve against the event boundaries: `start + seconds`, or `end`
    /// when unbounded.
    pub fn resolve(self, start: NaiveDateTime, end: NaiveDateTime) -> NaiveDateTime {
        if self.is_max {
            end
        } else {
            start + Duration::seconds(self.seconds)
        }
    }
}

impl PartialOrd for TimeOffset {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimeOffset {
    /// Unbounded sorts after every finite offset.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.is_max, self.seconds).cmp(&(other.is_max, other.seconds))
    }
}

impl Default for TimeOffset {
    fn default() -> Self {
        Self::new(0)
    }
}

// ── Rules ───────────────────────────────────────────────────────────────

/// A sub-window of the `During` phase, bounded by two offsets from the
/// event start. Both boundaries are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseTimeRule {
    pub phase_time_kind: PhaseTimeKind,
    pub begin_time_offset: TimeOffset,
    pub end_time_offset: TimeOffset,
    /// Retained for stored templates; not consulted during matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekday: Option<u8>,
}

impl PhaseTimeRule {
    pub fn new(kind: PhaseTimeKind, begin: TimeOffset, end: TimeOffset) -> Self {
        Self {
            phase_time_kind: kind,
            begin_time_offset: begin,
            end_time_offset: end,
            weekday: None,
        }
    }

    /// A rule covering the entire phase of `kind`.
    pub fn covering(kind: PhaseTimeKind) -> Self {
        Self::new(kind, TimeOffset::new(0), TimeOffset::unbounded())
    }

    /// Whether `now` lands inside this rule's window, given the event
    /// boundaries. Only meaningful for `During` rules; rules for the other
    /// kinds match whenever the kind itself matches.
    pub fn matches(&self, now: NaiveDateTime, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        if classify(now, start, end) != self.phase_time_kind {
            return false;
        }
        if self.phase_time_kind != PhaseTimeKind::During {
            return true;
        }
        let begin = self.begin_time_offset.resolve(start, end);
        let window_end = self.end_time_offset.resolve(start, end);
        begin <= now && now <= window_end
    }
}

impl PartialOrd for PhaseTimeRule {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PhaseTimeRule {
    /// Kind first, then window start. Gives the display order of rules
    /// within a template.
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.phase_time_kind, self.begin_time_offset)
            .cmp(&(other.phase_time_kind, other.begin_time_offset))
    }
}

// ── Classification ──────────────────────────────────────────────────────

pub(crate) fn day_start(dt: NaiveDateTime) -> NaiveDateTime {
    dt.date().and_hms_opt(0, 0, 0).unwrap_or(dt)
}

pub(crate) fn day_end(dt: NaiveDateTime) -> NaiveDateTime {
    dt.date().and_hms_opt(23, 59, 59).unwrap_or(dt)
}

/// Map `now` to its phase, given the event's (already resolved) start and
/// end instants. The checks run in a fixed order so every instant lands in
/// exactly one phase.
pub fn classify(now: NaiveDateTime, start: NaiveDateTime, end: NaiveDateTime) -> PhaseTimeKind {
    if now < day_start(start) {
        PhaseTimeKind::BeforeStartDate
    } else if now > day_end(end) {
        PhaseTimeKind::AfterEndDate
    } else if now < start {
        PhaseTimeKind::StartDayBeforeStartTime
    } else if now < end {
        PhaseTimeKind::During
    } else {
        PhaseTimeKind::EndTimeBeforeEndDate
    }
}
