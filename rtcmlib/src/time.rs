//! GPS/GLONASS/UTC time reconciliation.
//!
//! Ported from `original_source/lib/rtcm3torinex.c`'s `updatetime`/
//! `converttime`/`gnumleap`, expressed as safe `i64` arithmetic instead of
//! the original's day-counting pointer loops. The leap second table is
//! extended past the original's 2008 cutoff with the real announcements
//! through 2017 (the original's table was stale; this keeps the GPS leap
//! second count correct for modern data).

/// A UTC offset announced as of a given date. `tai_minus_utc` is the
/// TAI-UTC offset in effect starting that date.
#[derive(Debug, Clone, Copy)]
pub struct LeapSecondEntry {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub tai_minus_utc: i32,
}

/// GPS time was TAI-19s at the GPS epoch and has not accumulated leap
/// seconds since; this is subtracted from the TAI-UTC table to get the
/// GPS-UTC offset.
pub const GPS_LEAP_START: i32 = 19;

pub static LEAP_SECONDS: &[LeapSecondEntry] = &[
    LeapSecondEntry { year: 1981, month: 6, day: 30, tai_minus_utc: 20 },
    LeapSecondEntry { year: 1982, month: 6, day: 30, tai_minus_utc: 21 },
    LeapSecondEntry { year: 1983, month: 6, day: 30, tai_minus_utc: 22 },
    LeapSecondEntry { year: 1985, month: 6, day: 30, tai_minus_utc: 23 },
    LeapSecondEntry { year: 1987, month: 12, day: 31, tai_minus_utc: 24 },
    LeapSecondEntry { year: 1989, month: 12, day: 31, tai_minus_utc: 25 },
    LeapSecondEntry { year: 1990, month: 12, day: 31, tai_minus_utc: 26 },
    LeapSecondEntry { year: 1992, month: 6, day: 30, tai_minus_utc: 27 },
    LeapSecondEntry { year: 1993, month: 6, day: 30, tai_minus_utc: 28 },
    LeapSecondEntry { year: 1994, month: 6, day: 30, tai_minus_utc: 29 },
    LeapSecondEntry { year: 1995, month: 12, day: 31, tai_minus_utc: 30 },
    LeapSecondEntry { year: 1997, month: 6, day: 30, tai_minus_utc: 31 },
    LeapSecondEntry { year: 1998, month: 12, day: 31, tai_minus_utc: 32 },
    LeapSecondEntry { year: 2005, month: 12, day: 31, tai_minus_utc: 33 },
    LeapSecondEntry { year: 2008, month: 12, day: 31, tai_minus_utc: 34 },
    LeapSecondEntry { year: 2012, month: 6, day: 30, tai_minus_utc: 35 },
    LeapSecondEntry { year: 2015, month: 6, day: 30, tai_minus_utc: 36 },
    LeapSecondEntry { year: 2016, month: 12, day: 31, tai_minus_utc: 37 },
];

const MONTH_DAYS: [i32; 13] = [0, 31, 28, 31, 30, 31, 30, 31, 31, 30, 31, 30, 31];

/// True when `year` is a leap year and `month` is either 0 (asking about the
/// whole year) or 2 (February gains the extra day).
fn long_year(year: i32, month: i32) -> bool {
    let leap = year % 4 == 0 && (year % 400 == 0 || year % 100 != 0);
    leap && (month == 0 || month == 2)
}

/// GPS leap seconds (GPS-UTC offset) in effect on the given civil date.
pub fn gnumleap(year: i32, month: i32, day: i32) -> i32 {
    let mut leap = 0;
    for entry in LEAP_SECONDS {
        if year < entry.year {
            break;
        }
        if year > entry.year || month > entry.month || (month == entry.month && day > entry.day) {
            leap = entry.tai_minus_utc - GPS_LEAP_START;
        }
    }
    leap
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CivilTime {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
}

/// Converts GPS (week, time-of-week-in-seconds) into a civil date and
/// time-of-day. GPS time has no leap seconds of its own, so no leap second
/// correction is applied here.
pub fn convert_time(week: i32, tow: i32) -> CivilTime {
    let mut j: i64 = week as i64 * 7 * 86400 + tow as i64 + 5 * 86400;
    let mut year = 1980;
    loop {
        let days_in_year = 365 + if long_year(year, 0) { 1 } else { 0 };
        let seconds_in_year = days_in_year as i64 * 86400;
        if j < seconds_in_year {
            break;
        }
        j -= seconds_in_year;
        year += 1;
    }
    let day_of_year = 1 + (j / 86400) as i32;
    j %= 86400;
    let hour = (j / 3600) as i32;
    j %= 3600;
    let minute = (j / 60) as i32;
    let second = (j % 60) as i32;

    let mut month = 1;
    let mut consumed = 0;
    loop {
        let days_in_month = MONTH_DAYS[month as usize] + if long_year(year, month) { 1 } else { 0 };
        if consumed + days_in_month >= day_of_year {
            break;
        }
        consumed += days_in_month;
        month += 1;
    }
    let day = day_of_year - consumed;

    CivilTime { year, month, day, hour, minute, second }
}

/// Reconciles a GLONASS message's Moscow time-of-day field against the
/// parser's running GPS (week, time-of-week) clock, resolving day-boundary
/// ambiguity and optionally converting the result to UTC by subtracting
/// leap seconds.
pub fn update_time(week: &mut i32, sec_of_week: &mut i32, ms_of_day_moscow: i32, to_utc: bool) {
    let mut j: i64 = *week as i64 * 7 * 86400 + *sec_of_week as i64 + 5 * 86400 + 3 * 3600;

    let mut year = 1980;
    loop {
        let days_in_year = 365 + if long_year(year, 0) { 1 } else { 0 };
        let seconds_in_year = days_in_year as i64 * 86400 + gnumleap(year + 1, 1, 1) as i64;
        if j < seconds_in_year {
            break;
        }
        j -= seconds_in_year;
        year += 1;
    }
    let mut month = 1;
    loop {
        let days_in_month = MONTH_DAYS[month as usize] + if long_year(year, month) { 1 } else { 0 };
        let seconds_in_month = days_in_month as i64 * 86400 + gnumleap(year, month + 1, 1) as i64;
        if j < seconds_in_month {
            break;
        }
        j -= seconds_in_month;
        month += 1;
    }
    let mut day = 1;
    loop {
        let seconds_in_day = 86400 + gnumleap(year, month, day + 1) as i64;
        if j < seconds_in_day {
            break;
        }
        j -= 86400;
        day += 1;
    }

    let leap_now = gnumleap(year, month, day);
    let moscow_time_of_day = j - leap_now as i64;

    if ms_of_day_moscow < 5 * 60 * 1000 && moscow_time_of_day > 23 * 3600 {
        *sec_of_week += 86400;
    } else if moscow_time_of_day < 300 && ms_of_day_moscow > 82_800_000 {
        *sec_of_week -= 86400;
    }

    *sec_of_week += ms_of_day_moscow / 1000 - moscow_time_of_day as i32;
    if to_utc {
        *sec_of_week -= leap_now;
    }
    if *sec_of_week < 0 {
        *sec_of_week += 7 * 86400;
        *week -= 1;
    }
    if *sec_of_week >= 7 * 86400 {
        *sec_of_week -= 7 * 86400;
        *week += 1;
    }
}
