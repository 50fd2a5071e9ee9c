//! Period arithmetic: the preceding bucket and the comparison bucket of a [`PeriodKey`].
//!
//! Comparisons hold the sub-position fixed and move one calendar level up: the same quarter of
//! last year, the same decad three months ago, the same weekday last week. Day-level arithmetic
//! that lands past the end of a shorter month clamps to that month's last day.

use crate::calendar::{iso_weeks_in, shift_month, Calendar, Decad, PeriodKey};
use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime};
use rollup_model::{ComparisonKind, WeekNumbering};

impl Calendar {
    /// The bucket immediately preceding `key` at the same granularity.
    pub fn previous_period(&self, key: &PeriodKey) -> Option<PeriodKey> {
        Some(match *key {
            PeriodKey::Year(year) => PeriodKey::Year(year.checked_sub(1)?),
            PeriodKey::Quarter { year, quarter } => {
                if quarter <= 1 {
                    PeriodKey::Quarter {
                        year: year - 1,
                        quarter: 4,
                    }
                } else {
                    PeriodKey::Quarter {
                        year,
                        quarter: quarter - 1,
                    }
                }
            }
            PeriodKey::Month { year, month } => {
                let (year, month) = shift_month(year, month, -1);
                PeriodKey::Month { year, month }
            }
            PeriodKey::Decad { year, month, decad } => match decad.previous() {
                Some(decad) => PeriodKey::Decad { year, month, decad },
                None => {
                    let (year, month) = shift_month(year, month, -1);
                    PeriodKey::Decad {
                        year,
                        month,
                        decad: Decad::Lower,
                    }
                }
            },
            PeriodKey::Week { year, week } => self.weeks_back(year, week, 1),
            PeriodKey::Day(d) => PeriodKey::Day(d.pred_opt()?),
            PeriodKey::Hour(t) => PeriodKey::Hour(t.checked_sub_signed(Duration::hours(1))?),
            PeriodKey::Minute(t) => {
                PeriodKey::Minute(t.checked_sub_signed(Duration::minutes(1))?)
            }
            PeriodKey::Second(t) => {
                PeriodKey::Second(t.checked_sub_signed(Duration::seconds(1))?)
            }
        })
    }

    /// The comparison bucket of `key` for `kind`, or `None` when the pair is not supported.
    pub fn compare_period(&self, key: &PeriodKey, kind: ComparisonKind) -> Option<PeriodKey> {
        if !key.granularity().supports(kind) {
            return None;
        }
        match *key {
            PeriodKey::Year(_) => None,
            PeriodKey::Quarter { year, quarter } => Some(PeriodKey::Quarter {
                year: year - 1,
                quarter,
            }),
            PeriodKey::Month { year, month } => {
                let (year, month) = shift_month(year, month, -months_back(kind)?);
                Some(PeriodKey::Month { year, month })
            }
            PeriodKey::Decad { year, month, decad } => {
                let (year, month) = shift_month(year, month, -months_back(kind)?);
                Some(PeriodKey::Decad { year, month, decad })
            }
            PeriodKey::Week { year, week } => match kind {
                ComparisonKind::MonthOverMonth => Some(self.weeks_back(year, week, 4)),
                ComparisonKind::YearOverYear => {
                    let year = year - 1;
                    let week = match self.week_numbering {
                        WeekNumbering::Legacy => week,
                        WeekNumbering::Iso => week.min(iso_weeks_in(year)),
                    };
                    Some(PeriodKey::Week { year, week })
                }
                _ => None,
            },
            PeriodKey::Day(d) => match kind {
                ComparisonKind::DecadOverDecad => previous_decad_day(d).map(PeriodKey::Day),
                _ => shift_back(d.and_time(NaiveTime::MIN), kind).map(|t| PeriodKey::Day(t.date())),
            },
            PeriodKey::Hour(t) => shift_back(t, kind).map(PeriodKey::Hour),
            PeriodKey::Minute(t) => shift_back(t, kind).map(PeriodKey::Minute),
            PeriodKey::Second(t) => shift_back(t, kind).map(PeriodKey::Second),
        }
    }

    /// Moves back `weeks` weeks, rolling into the previous week-numbering year.
    fn weeks_back(&self, year: i32, week: u32, weeks: u32) -> PeriodKey {
        let mut year = year;
        let mut week = i64::from(week) - i64::from(weeks);
        while week < 1 {
            year -= 1;
            let last = self.last_week_of(year);
            if self.week_numbering == WeekNumbering::Legacy && iso_weeks_in(year) == 53 {
                log::warn!(
                    "rolling back into {year}, which has 53 ISO weeks; legacy week numbering assumes {last}"
                );
            }
            week += i64::from(last);
        }
        PeriodKey::Week {
            year,
            week: week as u32,
        }
    }

    fn last_week_of(&self, year: i32) -> u32 {
        match self.week_numbering {
            WeekNumbering::Legacy => 52,
            WeekNumbering::Iso => iso_weeks_in(year),
        }
    }
}

fn months_back(kind: ComparisonKind) -> Option<i32> {
    match kind {
        ComparisonKind::MonthOverMonth => Some(1),
        ComparisonKind::QuarterOverQuarter => Some(3),
        ComparisonKind::YearOverYear => Some(12),
        _ => None,
    }
}

fn shift_back(at: NaiveDateTime, kind: ComparisonKind) -> Option<NaiveDateTime> {
    match kind {
        ComparisonKind::MinuteOverMinute => at.checked_sub_signed(Duration::minutes(1)),
        ComparisonKind::HourOverHour => at.checked_sub_signed(Duration::hours(1)),
        ComparisonKind::DayOverDay => at.checked_sub_signed(Duration::days(1)),
        ComparisonKind::WeekOverWeek => at.checked_sub_signed(Duration::days(7)),
        ComparisonKind::MonthOverMonth
        | ComparisonKind::QuarterOverQuarter
        | ComparisonKind::YearOverYear => {
            let months = u32::try_from(months_back(kind)?).ok()?;
            at.checked_sub_months(Months::new(months))
        }
        ComparisonKind::DecadOverDecad => None,
    }
}

/// Same offset into the preceding decad, clamped to that decad's last day.
fn previous_decad_day(date: NaiveDate) -> Option<NaiveDate> {
    let decad = Decad::of_day(date.day());
    let offset = date.day() - decad.first_day();
    let (year, month, prev) = match decad.previous() {
        Some(prev) => (date.year(), date.month(), prev),
        None => {
            let (year, month) = shift_month(date.year(), date.month(), -1);
            (year, month, Decad::Lower)
        }
    };
    let last = prev.last_day(year, month)?;
    let day = (prev.first_day() + offset).min(last);
    NaiveDate::from_ymd_opt(year, month, day)
}
