//! Reminder offsets attached to events.
//!
//! The engine only decides *whether* a reminder offset applies and what that
//! offset is; scheduling the actual notification belongs to the external
//! calendar-integration layer.

use serde::{Deserialize, Serialize};

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const WEEK: i64 = 7 * DAY;

/// When a reminder fires, relative to the event.
///
/// Most variants are offsets from the event's start instant. The `*NineAm`
/// variants are day-anchored: their offset is relative to the **start of the
/// event's start day** and lands at 09:00 of the respective day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Reminder {
    #[default]
    None,
    AtStart,
    FiveMinutesBefore,
    TenMinutesBefore,
    FifteenMinutesBefore,
    TwentyFiveMinutesBefore,
    ThirtyMinutesBefore,
    OneHourBefore,
    TwoHoursBefore,
    OneDayBefore,
    TwoDaysBefore,
    OneWeekBefore,
    EventDayNineAm,
    DayBeforeNineAm,
    TwoDaysBeforeNineAm,
    WeekBeforeNineAm,
}

impl Reminder {
    /// Signed offset in seconds from the reminder's anchor instant.
    pub const fn offset_seconds(self) -> i64 {
        match self {
            Self::None | Self::AtStart => 0,
            Self::FiveMinutesBefore => -5 * MINUTE,
            Self::TenMinutesBefore => -10 * MINUTE,
            Self::FifteenMinutesBefore => -15 * MINUTE,
            Self::TwentyFiveMinutesBefore => -25 * MINUTE,
            Self::ThirtyMinutesBefore => -30 * MINUTE,
            Self::OneHourBefore => -HOUR,
            Self::TwoHoursBefore => -2 * HOUR,
            Self::OneDayBefore => -DAY,
            Self::TwoDaysBefore => -2 * DAY,
            Self::OneWeekBefore => -WEEK,
            Self::EventDayNineAm => 9 * HOUR,
            Self::DayBeforeNineAm => -DAY + 9 * HOUR,
            Self::TwoDaysBeforeNineAm => -2 * DAY + 9 * HOUR,
            Self::WeekBeforeNineAm => -WEEK + 9 * HOUR,
        }
    }

    /// True for the 09:00 variants whose offset is relative to the start of
    /// the event's start day rather than the start instant.
    pub const fn is_day_anchored(self) -> bool {
        matches!(
            self,
            Self::EventDayNineAm
                | Self::DayBeforeNineAm
                | Self::TwoDaysBeforeNineAm
                | Self::WeekBeforeNineAm
        )
    }

    /// The offset to apply, or `None` when no reminder is configured.
    pub fn trigger_offset(self) -> Option<i64> {
        match self {
            Self::None => None,
            other => Some(other.offset_seconds()),
        }
    }
}
