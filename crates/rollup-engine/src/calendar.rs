//! Calendar & granularity resolver.
//!
//! Turns timestamps into [`PeriodKey`]s for the month-based calendar (year / quarter / month /
//! decad), the week-based calendar (year / week) and the shared day-and-below granularities.
//!
//! A `PeriodKey` is typed: its ordering is chronological for every granularity. Its canonical
//! string form (`2025-Q1`, `2025-01-上旬`, `2025-W03`, ...) also sorts chronologically except for
//! decad keys, whose markers do not sort 上 < 中 < 下 in UTF-8. Compare keys, not strings.
//!
//! Period arithmetic (previous / comparison buckets) lives in `period.rs`.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};
use rollup_model::{FieldValue, Granularity, WeekNumbering};
use std::fmt;

/// One of the three ten-day windows ("旬") of a month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Decad {
    /// Days 1-10 ("上旬").
    Upper,
    /// Days 11-20 ("中旬").
    Middle,
    /// Day 21 to the end of the month ("下旬").
    Lower,
}

impl Decad {
    pub fn of_day(day: u32) -> Self {
        match day {
            0..=10 => Decad::Upper,
            11..=20 => Decad::Middle,
            _ => Decad::Lower,
        }
    }

    pub fn marker(self) -> &'static str {
        match self {
            Decad::Upper => "上旬",
            Decad::Middle => "中旬",
            Decad::Lower => "下旬",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "上旬" => Some(Decad::Upper),
            "中旬" => Some(Decad::Middle),
            "下旬" => Some(Decad::Lower),
            _ => None,
        }
    }

    pub(crate) fn first_day(self) -> u32 {
        match self {
            Decad::Upper => 1,
            Decad::Middle => 11,
            Decad::Lower => 21,
        }
    }

    pub(crate) fn last_day(self, year: i32, month: u32) -> Option<u32> {
        match self {
            Decad::Upper => Some(10),
            Decad::Middle => Some(20),
            Decad::Lower => days_in_month(year, month),
        }
    }

    /// The preceding decad within the same month.
    pub(crate) fn previous(self) -> Option<Self> {
        match self {
            Decad::Upper => None,
            Decad::Middle => Some(Decad::Upper),
            Decad::Lower => Some(Decad::Middle),
        }
    }
}

/// Canonical identity of one bucket.
///
/// Sub-day variants hold the bucket's start, truncated to the granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeriodKey {
    Year(i32),
    Quarter { year: i32, quarter: u32 },
    Month { year: i32, month: u32 },
    Decad { year: i32, month: u32, decad: Decad },
    /// `year` is the week-numbering year (the year of the week's Thursday).
    Week { year: i32, week: u32 },
    Day(NaiveDate),
    Hour(NaiveDateTime),
    Minute(NaiveDateTime),
    Second(NaiveDateTime),
}

impl PeriodKey {
    pub fn granularity(&self) -> Granularity {
        match self {
            PeriodKey::Year(_) => Granularity::Year,
            PeriodKey::Quarter { .. } => Granularity::Quarter,
            PeriodKey::Month { .. } => Granularity::Month,
            PeriodKey::Decad { .. } => Granularity::Decad,
            PeriodKey::Week { .. } => Granularity::Week,
            PeriodKey::Day(_) => Granularity::Day,
            PeriodKey::Hour(_) => Granularity::Hour,
            PeriodKey::Minute(_) => Granularity::Minute,
            PeriodKey::Second(_) => Granularity::Second,
        }
    }

    /// Human-readable label, e.g. `2025年第1季度`.
    pub fn display_name(&self) -> String {
        match self {
            PeriodKey::Year(year) => format!("{year}年"),
            PeriodKey::Quarter { year, quarter } => format!("{year}年第{quarter}季度"),
            PeriodKey::Month { year, month } => format!("{year}年{month}月"),
            PeriodKey::Decad { year, month, decad } => {
                format!("{year}年{month}月{}", decad.marker())
            }
            PeriodKey::Week { year, week } => format!("{year}年第{week}周"),
            PeriodKey::Day(d) => format!("{}年{}月{}日", d.year(), d.month(), d.day()),
            PeriodKey::Hour(t) => format!(
                "{}年{}月{}日 {}时",
                t.year(),
                t.month(),
                t.day(),
                t.hour()
            ),
            PeriodKey::Minute(t) => format!(
                "{}年{}月{}日 {:02}:{:02}",
                t.year(),
                t.month(),
                t.day(),
                t.hour(),
                t.minute()
            ),
            PeriodKey::Second(t) => format!(
                "{}年{}月{}日 {:02}:{:02}:{:02}",
                t.year(),
                t.month(),
                t.day(),
                t.hour(),
                t.minute(),
                t.second()
            ),
        }
    }

    /// Parses the canonical string form produced by `Display`.
    pub fn parse(text: &str, granularity: Granularity) -> Option<Self> {
        let s = text.trim();
        match granularity {
            Granularity::Year => parse_year(s).map(PeriodKey::Year),
            Granularity::Quarter => {
                let (year, quarter) = s.split_once("-Q")?;
                let quarter = parse_in_range(quarter, 1, 4)?;
                Some(PeriodKey::Quarter {
                    year: parse_year(year)?,
                    quarter,
                })
            }
            Granularity::Month => {
                let (year, month) = s.split_once('-')?;
                Some(PeriodKey::Month {
                    year: parse_year(year)?,
                    month: parse_in_range(month, 1, 12)?,
                })
            }
            Granularity::Decad => {
                let mut parts = s.splitn(3, '-');
                let year = parse_year(parts.next()?)?;
                let month = parse_in_range(parts.next()?, 1, 12)?;
                let decad = Decad::from_marker(parts.next()?)?;
                Some(PeriodKey::Decad { year, month, decad })
            }
            Granularity::Week => {
                let (year, week) = s.split_once("-W")?;
                Some(PeriodKey::Week {
                    year: parse_year(year)?,
                    week: parse_in_range(week, 1, 54)?,
                })
            }
            Granularity::Day => NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .map(PeriodKey::Day),
            Granularity::Hour => {
                NaiveDateTime::parse_from_str(&format!("{s}:00:00"), "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(PeriodKey::Hour)
            }
            Granularity::Minute => {
                NaiveDateTime::parse_from_str(&format!("{s}:00"), "%Y-%m-%d %H:%M:%S")
                    .ok()
                    .map(PeriodKey::Minute)
            }
            Granularity::Second => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(PeriodKey::Second),
        }
    }

    /// Parses a canonical key of whichever granularity its layout belongs to.
    ///
    /// The layouts are disjoint, so at most one granularity accepts a given string.
    pub fn parse_any(text: &str) -> Option<Self> {
        Granularity::ALL
            .into_iter()
            .find_map(|granularity| PeriodKey::parse(text, granularity))
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKey::Year(year) => write!(f, "{year:04}"),
            PeriodKey::Quarter { year, quarter } => write!(f, "{year:04}-Q{quarter}"),
            PeriodKey::Month { year, month } => write!(f, "{year:04}-{month:02}"),
            PeriodKey::Decad { year, month, decad } => {
                write!(f, "{year:04}-{month:02}-{}", decad.marker())
            }
            PeriodKey::Week { year, week } => write!(f, "{year:04}-W{week:02}"),
            PeriodKey::Day(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            PeriodKey::Hour(t) => write!(f, "{}", t.format("%Y-%m-%d %H")),
            PeriodKey::Minute(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M")),
            PeriodKey::Second(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

fn parse_year(s: &str) -> Option<i32> {
    if s.len() != 4 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_in_range(s: &str, min: u32, max: u32) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u32>().ok().filter(|v| (min..=max).contains(v))
}

/// Bucket resolver parameterized by the week numbering scheme.
///
/// The default calendar uses [`WeekNumbering::Legacy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calendar {
    pub(crate) week_numbering: WeekNumbering,
}

impl Calendar {
    pub fn new(week_numbering: WeekNumbering) -> Self {
        Self { week_numbering }
    }

    pub fn week_numbering(&self) -> WeekNumbering {
        self.week_numbering
    }

    /// Bucket key for a record value, or `None` when the value is not a usable timestamp.
    ///
    /// Text that is not a timestamp may still be the canonical key of some bucket (the `period`
    /// column of another report); such a value stands for the instant its bucket starts.
    pub fn bucket_key(&self, value: &FieldValue, granularity: Granularity) -> Option<PeriodKey> {
        let at = value.as_datetime().or_else(|| {
            value
                .as_text()
                .and_then(PeriodKey::parse_any)
                .and_then(|key| self.start_of(&key))
        })?;
        Some(self.key_at(at, granularity))
    }

    /// First instant of the bucket `key`, or `None` when no such bucket exists.
    ///
    /// Under [`WeekNumbering::Legacy`] week 1 only exists in years starting on a Thursday.
    pub fn start_of(&self, key: &PeriodKey) -> Option<NaiveDateTime> {
        let date = match *key {
            PeriodKey::Year(year) => NaiveDate::from_ymd_opt(year, 1, 1)?,
            PeriodKey::Quarter { year, quarter } => {
                NaiveDate::from_ymd_opt(year, quarter.checked_sub(1)? * 3 + 1, 1)?
            }
            PeriodKey::Month { year, month } => NaiveDate::from_ymd_opt(year, month, 1)?,
            PeriodKey::Decad { year, month, decad } => {
                NaiveDate::from_ymd_opt(year, month, decad.first_day())?
            }
            PeriodKey::Week { year, week } => self.monday_of(year, week)?,
            PeriodKey::Day(date) => date,
            PeriodKey::Hour(t) | PeriodKey::Minute(t) | PeriodKey::Second(t) => return Some(t),
        };
        Some(start_of_day(date))
    }

    fn monday_of(&self, year: i32, week: u32) -> Option<NaiveDate> {
        match self.week_numbering {
            WeekNumbering::Iso => NaiveDate::from_isoywd_opt(year, week, Weekday::Mon),
            WeekNumbering::Legacy => {
                // The week's Thursday sits `ordinal0` days into `year`, with
                // `ceil(ordinal0 / 7) + 1 == week`.
                let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
                let thursday = if week <= 1 {
                    Some(jan1).filter(|d| week == 1 && d.weekday() == Weekday::Thu)?
                } else {
                    let earliest = jan1 + Duration::days(7 * i64::from(week - 2) + 1);
                    let ahead = (7 + 3 - i64::from(earliest.weekday().num_days_from_monday())) % 7;
                    earliest + Duration::days(ahead)
                };
                if thursday.year() != year {
                    return None;
                }
                Some(thursday - Duration::days(3))
            }
        }
    }

    /// Bucket key of the bucket containing `at`.
    pub fn key_at(&self, at: NaiveDateTime, granularity: Granularity) -> PeriodKey {
        let date = at.date();
        match granularity {
            Granularity::Year => PeriodKey::Year(date.year()),
            Granularity::Quarter => PeriodKey::Quarter {
                year: date.year(),
                quarter: (date.month() - 1) / 3 + 1,
            },
            Granularity::Month => PeriodKey::Month {
                year: date.year(),
                month: date.month(),
            },
            Granularity::Decad => PeriodKey::Decad {
                year: date.year(),
                month: date.month(),
                decad: Decad::of_day(date.day()),
            },
            Granularity::Week => {
                let (year, week) = self.week_of(date);
                PeriodKey::Week { year, week }
            }
            Granularity::Day => PeriodKey::Day(date),
            Granularity::Hour => {
                PeriodKey::Hour(start_of_day(date) + Duration::hours(i64::from(at.hour())))
            }
            Granularity::Minute => PeriodKey::Minute(
                start_of_day(date)
                    + Duration::hours(i64::from(at.hour()))
                    + Duration::minutes(i64::from(at.minute())),
            ),
            Granularity::Second => PeriodKey::Second(
                start_of_day(date) + Duration::seconds(i64::from(at.num_seconds_from_midnight())),
            ),
        }
    }

    /// Week-numbering year and week number of `date`.
    pub fn week_of(&self, date: NaiveDate) -> (i32, u32) {
        match self.week_numbering {
            WeekNumbering::Legacy => legacy_week(date),
            WeekNumbering::Iso => {
                let iso = date.iso_week();
                (iso.year(), iso.week())
            }
        }
    }

    /// Whether the bucket `key` has fully elapsed at `now`.
    pub fn is_complete(&self, key: &PeriodKey, now: NaiveDateTime) -> bool {
        *key < self.key_at(now, key.granularity())
    }
}

/// Bucket key under the default calendar.
pub fn bucket_key(value: &FieldValue, granularity: Granularity) -> Option<PeriodKey> {
    Calendar::default().bucket_key(value, granularity)
}

/// Completeness under the default calendar.
pub fn is_complete(key: &PeriodKey, now: NaiveDateTime) -> bool {
    Calendar::default().is_complete(key, now)
}

/// Legacy week number of `date`.
///
/// The date is moved to the Thursday of its Monday-based week; the week number is
/// `ceil(days since January 1 of that Thursday's year / 7) + 1`. This disagrees with ISO-8601
/// whenever that Thursday is not a multiple of seven days after January 1, and can reach 53 or 54
/// at the end of a year.
pub fn week_of_year(date: NaiveDate) -> u32 {
    legacy_week(date).1
}

fn legacy_week(date: NaiveDate) -> (i32, u32) {
    let thursday = thursday_of_week(date);
    let days = thursday.ordinal0();
    (thursday.year(), days.div_ceil(7) + 1)
}

fn thursday_of_week(date: NaiveDate) -> NaiveDate {
    let offset = 3 - i64::from(date.weekday().num_days_from_monday());
    date + Duration::days(offset)
}

fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Number of ISO-8601 weeks in `year` (52 or 53).
pub(crate) fn iso_weeks_in(year: i32) -> u32 {
    NaiveDate::from_ymd_opt(year, 12, 28)
        .map(|d| d.iso_week().week())
        .unwrap_or(52)
}

pub(crate) fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = shift_month(year, month, 1);
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    Some(first_of_next.pred_opt()?.day())
}

/// Moves a `(year, month)` pair by `delta` months.
pub(crate) fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let total = year * 12 + (month as i32 - 1) + delta;
    (total.div_euclid(12), total.rem_euclid(12) as u32 + 1)
}
