//! Export of recurrence settings as calendar-style rules.
//!
//! The in-engine resolver clamps month-end anchors (the 29th, 30th, and
//! 31st) to shorter months, but standard RRULE semantics silently skip
//! months without the anchor day. The descriptors emitted here compensate
//! with BYSETPOS=-1 rules so external calendars land on the same days the
//! resolver does.

use chrono::{Datelike, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::recurrence::{RecurrenceKind, RepeatPeriod, WeekdaySet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl From<RepeatPeriod> for Frequency {
    fn from(period: RepeatPeriod) -> Self {
        match period {
            RepeatPeriod::Daily => Frequency::Daily,
            RepeatPeriod::Weekly => Frequency::Weekly,
            RepeatPeriod::Monthly => Frequency::Monthly,
            RepeatPeriod::Yearly => Frequency::Yearly,
        }
    }
}

impl Frequency {
    const fn as_rrule(self) -> &'static str {
        match self {
            Frequency::Daily => "DAILY",
            Frequency::Weekly => "WEEKLY",
            Frequency::Monthly => "MONTHLY",
            Frequency::Yearly => "YEARLY",
        }
    }
}

/// One calendar recurrence rule. An event may export several descriptors
/// when its anchor day needs month-length compensation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurrenceDescriptor {
    pub frequency: Frequency,
    pub interval: u32,
    #[serde(default, skip_serializing_if = "weekdays_empty")]
    pub weekdays: WeekdaySet,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub days_of_month: Vec<u8>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub months: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_position: Option<i8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<NaiveDateTime>,
}

impl RecurrenceDescriptor {
    fn plain(frequency: Frequency, interval: u32, until: Option<NaiveDateTime>) -> Self {
        Self {
            frequency,
            interval,
            weekdays: WeekdaySet::empty(),
            days_of_month: Vec::new(),
            months: Vec::new(),
            set_position: None,
            until,
        }
    }

    /// Render as an RFC 5545 RRULE value, e.g.
    /// `FREQ=MONTHLY;INTERVAL=1;BYMONTHDAY=28,29;BYMONTH=2;BYSETPOS=-1`.
    pub fn to_rrule_string(&self) -> String {
        let mut out = format!(
            "FREQ={};INTERVAL={}",
            self.frequency.as_rrule(),
            self.interval
        );
        if !self.weekdays.is_empty() {
            let days: Vec<&str> = self.weekdays.iter().map(weekday_code).collect();
            out.push_str(";BYDAY=");
            out.push_str(&days.join(","));
        }
        if !self.days_of_month.is_empty() {
            out.push_str(";BYMONTHDAY=");
            out.push_str(&join_u8(&self.days_of_month));
        }
        if !self.months.is_empty() {
            out.push_str(";BYMONTH=");
            out.push_str(&join_u8(&self.months));
        }
        if let Some(pos) = self.set_position {
            out.push_str(&format!(";BYSETPOS={pos}"));
        }
        if let Some(until) = self.until {
            out.push_str(&format!(";UNTIL={}Z", until.format("%Y%m%dT%H%M%S")));
        }
        out
    }
}

fn weekday_code(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "MO",
        Weekday::Tue => "TU",
        Weekday::Wed => "WE",
        Weekday::Thu => "TH",
        Weekday::Fri => "FR",
        Weekday::Sat => "SA",
        Weekday::Sun => "SU",
    }
}

fn weekdays_empty(set: &WeekdaySet) -> bool {
    set.is_empty()
}

fn join_u8(values: &[u8]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// The calendar rules equivalent to an event's recurrence settings. Empty
/// when repetition is disabled.
pub fn recurrence_descriptors(event: &Event) -> Vec<RecurrenceDescriptor> {
    if !event.is_repeat_enabled {
        return Vec::new();
    }
    let rule = &event.recurrence;
    let until = rule.end_date;

    if rule.kind == RecurrenceKind::CustomWeekly {
        let mut descriptor = RecurrenceDescriptor::plain(Frequency::Weekly, 1, until);
        descriptor.weekdays = rule.weekdays;
        return vec![descriptor];
    }

    let frequency = Frequency::from(rule.period);
    let anchor_day = event.start_date.day() as u8;
    let anchor_month = event.start_date.month() as u8;

    match rule.period {
        RepeatPeriod::Monthly => monthly_descriptors(anchor_day, rule.interval, until),
        RepeatPeriod::Yearly if anchor_month == 2 && anchor_day == 29 => {
            // Leap-day anchor: last of Feb 28/29 every year.
            let mut descriptor = RecurrenceDescriptor::plain(frequency, rule.interval, until);
            descriptor.days_of_month = vec![28, 29];
            descriptor.months = vec![2];
            descriptor.set_position = Some(-1);
            vec![descriptor]
        }
        _ => vec![RecurrenceDescriptor::plain(frequency, rule.interval, until)],
    }
}

fn monthly_descriptors(
    anchor_day: u8,
    interval: u32,
    until: Option<NaiveDateTime>,
) -> Vec<RecurrenceDescriptor> {
    match anchor_day {
        29 | 30 => {
            // February lacks the anchor day (always for 30, in non-leap
            // years for 29), so add a last-of-candidates rule for it
            // alongside the standard one.
            let mut february = RecurrenceDescriptor::plain(Frequency::Monthly, interval, until);
            february.days_of_month = vec![anchor_day - 1, anchor_day];
            february.months = vec![2];
            february.set_position = Some(-1);
            vec![
                february,
                RecurrenceDescriptor::plain(Frequency::Monthly, interval, until),
            ]
        }
        31 => {
            // One rule handles every month: the last existing day among
            // 28 through 31.
            let mut descriptor = RecurrenceDescriptor::plain(Frequency::Monthly, interval, until);
            descriptor.days_of_month = vec![28, 29, 30, 31];
            descriptor.set_position = Some(-1);
            vec![descriptor]
        }
        _ => vec![RecurrenceDescriptor::plain(Frequency::Monthly, interval, until)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::EventBuilder;
    use chrono::NaiveDate;
    use rrule::{RRule, Unvalidated};

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn event_starting(start: NaiveDateTime) -> EventBuilder {
        EventBuilder::new(dt(2024, 1, 1, 12, 0))
            .title("Rent")
            .start_date(start)
            .end_date(start + chrono::Duration::hours(1))
            .icon("044-coin")
            .color_hex("#efeeef")
    }

    fn assert_parses(rrule: &str) {
        rrule
            .parse::<RRule<Unvalidated>>()
            .unwrap_or_else(|e| panic!("{rrule}: {e}"));
    }

    #[test]
    fn test_disabled_repeat_exports_nothing() {
        let event = event_starting(dt(2024, 3, 15, 9, 0))
            .build(dt(2024, 1, 1, 12, 0))
            .unwrap();
        assert!(recurrence_descriptors(&event).is_empty());
    }

    #[test]
    fn test_plain_daily() {
        let event = event_starting(dt(2024, 3, 15, 9, 0))
            .repeat(RepeatPeriod::Daily, 3)
            .build(dt(2024, 1, 1, 12, 0))
            .unwrap();
        let descriptors = recurrence_descriptors(&event);
        assert_eq!(descriptors.len(), 1);
        assert_eq!(descriptors[0].to_rrule_string(), "FREQ=DAILY;INTERVAL=3");
        assert_parses(&descriptors[0].to_rrule_string());
    }

    #[test]
    fn test_custom_weekly_exports_byday() {
        let mut weekdays = WeekdaySet::empty();
        weekdays.insert(Weekday::Mon);
        weekdays.insert(Weekday::Wed);
        let event = event_starting(dt(2024, 3, 11, 9, 0))
            .repeat_custom_weekly(weekdays)
            .build(dt(2024, 1, 1, 12, 0))
            .unwrap();
        let descriptors = recurrence_descriptors(&event);
        assert_eq!(descriptors.len(), 1);
        let rrule = descriptors[0].to_rrule_string();
        assert_eq!(rrule, "FREQ=WEEKLY;INTERVAL=1;BYDAY=MO,WE");
        assert_parses(&rrule);
    }

    #[test]
    fn test_monthly_day_29_compensates_february() {
        let event = event_starting(dt(2024, 1, 29, 9, 0))
            .repeat(RepeatPeriod::Monthly, 1)
            .build(dt(2024, 1, 1, 12, 0))
            .unwrap();
        let descriptors = recurrence_descriptors(&event);
        assert_eq!(descriptors.len(), 2);
        assert_eq!(
            descriptors[0].to_rrule_string(),
            "FREQ=MONTHLY;INTERVAL=1;BYMONTHDAY=28,29;BYMONTH=2;BYSETPOS=-1"
        );
        assert_eq!(descriptors[1].to_rrule_string(), "FREQ=MONTHLY;INTERVAL=1");
        for d in &descriptors {
            assert_parses(&d.to_rrule_string());
        }
    }

    #[test]
    fn test_monthly_day_31_single_setpos_rule() {
        let event = event_starting(dt(2024, 1, 31, 9, 0))
            .repeat(RepeatPeriod::Monthly, 1)
            .build(dt(2024, 1, 1, 12, 0))
            .unwrap();
        let descriptors = recurrence_descriptors(&event);
        assert_eq!(descriptors.len(), 1);
        let rrule = descriptors[0].to_rrule_string();
        assert_eq!(rrule, "FREQ=MONTHLY;INTERVAL=1;BYMONTHDAY=28,29,30,31;BYSETPOS=-1");
        assert_parses(&rrule);
    }

    #[test]
    fn test_yearly_leap_day_anchor() {
        let event = event_starting(dt(2024, 2, 29, 9, 0))
            .repeat(RepeatPeriod::Yearly, 1)
            .build(dt(2024, 1, 1, 12, 0))
            .unwrap();
        let descriptors = recurrence_descriptors(&event);
        assert_eq!(descriptors.len(), 1);
        let rrule = descriptors[0].to_rrule_string();
        assert_eq!(rrule, "FREQ=YEARLY;INTERVAL=1;BYMONTHDAY=28,29;BYMONTH=2;BYSETPOS=-1");
        assert_parses(&rrule);
    }

    #[test]
    fn test_yearly_plain_anchor() {
        let event = event_starting(dt(2024, 7, 4, 9, 0))
            .repeat(RepeatPeriod::Yearly, 2)
            .build(dt(2024, 1, 1, 12, 0))
            .unwrap();
        let descriptors = recurrence_descriptors(&event);
        assert_eq!(descriptors[0].to_rrule_string(), "FREQ=YEARLY;INTERVAL=2");
    }

    #[test]
    fn test_until_appended_in_utc_shape() {
        let event = event_starting(dt(2024, 3, 15, 9, 0))
            .repeat(RepeatPeriod::Weekly, 1)
            .repeat_end_date(dt(2024, 12, 31, 0, 0))
            .build(dt(2024, 1, 1, 12, 0))
            .unwrap();
        let rrule = recurrence_descriptors(&event)[0].to_rrule_string();
        assert_eq!(rrule, "FREQ=WEEKLY;INTERVAL=1;UNTIL=20241231T235959Z");
        assert_parses(&rrule);
    }
}
