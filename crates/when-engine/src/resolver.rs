//! Deterministic scheduling-time resolution.
//!
//! Converts a user-typed timing expression into a single absolute point in
//! time. The caller provides the "now" anchor explicitly — the resolver
//! never reads the system clock, which keeps resolution a pure function of
//! (expression, one clock reading) and makes it trivially testable.
//!
//! # Grammar
//!
//! Attempted in a fixed priority order; the first match wins:
//!
//! - **Strict timestamp**: any RFC 3339 datetime with an explicit `Z` or
//!   numeric offset, accepted verbatim. The escape hatch from every
//!   natural-language form below.
//! - **Relative offset**: `in <N> <unit>` with unit one of
//!   second/minute/hour/day/week (singular or plural).
//! - **Absolute phrase**: `now`, `tomorrow at <time>`,
//!   `next <weekday> at <time>`, `<weekday> at <time>`.
//!
//! Times of day are `<h>[:<mm>]am|pm` (12-hour) or `<hh>[:<mm>]` (24-hour);
//! the minute defaults to 0. Weekdays are the seven full English names.
//!
//! If an expression cannot be parsed unambiguously, a typed error is
//! returned rather than a guess.

use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, SubsecRound, TimeZone, Utc, Weekday};
use serde::Serialize;

use crate::error::{ResolveError, Result};

/// The result of resolving an expression: one absolute point in time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedInstant {
    /// The resolved instant in UTC, truncated to whole seconds.
    pub instant: DateTime<Utc>,
    /// Canonical wire form: UTC, second precision, trailing `Z`. This is
    /// the `execute_at` value sent to the scheduling service, and it is
    /// always re-parseable as a strict timestamp.
    pub canonical: String,
}

/// Resolve a scheduling-time expression against a frozen reference clock.
///
/// # Arguments
///
/// * `raw` — The user's expression, e.g. `"in 5 minutes"`,
///   `"tomorrow at 9am"`, `"next monday at 3pm"`, `"now"`, or an
///   RFC 3339 timestamp
/// * `clock` — The reference "now" instant (typically `Utc::now()`),
///   read exactly once by the caller
///
/// # Errors
///
/// Returns a [`ResolveError`] describing what was wrong with the
/// expression; the original string is attached to every variant. The
/// resolver never enforces that the result lies in the future — that is
/// the scheduling service's concern.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use when_engine::resolve;
///
/// let clock = Utc.with_ymd_and_hms(2025, 6, 10, 8, 0, 0).unwrap();
///
/// let resolved = resolve("in 5 minutes", clock).unwrap();
/// assert_eq!(resolved.canonical, "2025-06-10T08:05:00Z");
///
/// let resolved = resolve("tomorrow at 9am", clock).unwrap();
/// assert_eq!(resolved.canonical, "2025-06-11T09:00:00Z");
/// ```
pub fn resolve(raw: &str, clock: DateTime<Utc>) -> Result<ResolvedInstant> {
    let normalized = normalize(raw);
    let form = parse_expression(raw, &normalized)?;
    let instant = evaluate(form, clock, raw)?;
    Ok(ResolvedInstant {
        instant,
        canonical: format_canonical(instant),
    })
}

/// Render an instant in the canonical wire form: UTC, second precision,
/// explicit `Z` designator, no fractional seconds.
pub fn format_canonical(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

// ── Parsed forms ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OffsetUnit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
}

impl OffsetUnit {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "second" | "seconds" => Some(Self::Second),
            "minute" | "minutes" => Some(Self::Minute),
            "hour" | "hours" => Some(Self::Hour),
            "day" | "days" => Some(Self::Day),
            "week" | "weeks" => Some(Self::Week),
            _ => None,
        }
    }

    /// Whole seconds per unit; integer arithmetic only, no float drift.
    fn seconds(self) -> i64 {
        match self {
            Self::Second => 1,
            Self::Minute => 60,
            Self::Hour => 3600,
            Self::Day => 86400,
            Self::Week => 604800,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimeOfDay {
    hour: u32,
    minute: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayAnchor {
    Tomorrow,
    NamedWeekday { next: bool, weekday: Weekday },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParsedForm {
    StrictInstant(DateTime<Utc>),
    NowAnchor,
    RelativeOffset { amount: i64, unit: OffsetUnit },
    AbsolutePhrase { anchor: DayAnchor, time: TimeOfDay },
}

// ── Normalization and grammar dispatch ──────────────────────────────────────

/// Trim, lowercase, and collapse internal whitespace runs to single spaces.
fn normalize(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Try each grammar in priority order; classify the failure if none match.
fn parse_expression(raw: &str, s: &str) -> Result<ParsedForm> {
    if let Some(form) = try_strict_timestamp(s) {
        return Ok(form);
    }
    if let Some(result) = try_relative_offset(raw, s) {
        return result;
    }
    if let Some(result) = try_absolute_phrase(raw, s) {
        return result;
    }
    Err(classify_unmatched(raw, s))
}

/// No grammar matched. Inputs shaped like a timestamp get the strict-form
/// diagnostic; inputs shaped like a bare time of day with an out-of-range
/// field (e.g. "25:00") get the range diagnostic.
fn classify_unmatched(raw: &str, s: &str) -> ResolveError {
    if looks_like_timestamp(s) {
        return ResolveError::MalformedStrictTimestamp {
            raw: raw.to_string(),
        };
    }
    if let Some(Err(err)) = parse_time_of_day(raw, s) {
        return err;
    }
    ResolveError::UnrecognizedFormat {
        raw: raw.to_string(),
    }
}

/// Does the input begin with a `YYYY-MM-DD` date?
fn looks_like_timestamp(s: &str) -> bool {
    let b = s.as_bytes();
    b.len() >= 10
        && b[..4].iter().all(u8::is_ascii_digit)
        && b[4] == b'-'
        && b[5..7].iter().all(u8::is_ascii_digit)
        && b[7] == b'-'
        && b[8..10].iter().all(u8::is_ascii_digit)
}

// ── Grammar: strict timestamp ───────────────────────────────────────────────

/// RFC 3339 with a mandatory explicit zone. Success bypasses every
/// natural-language grammar; failure falls through silently so those
/// grammars get their chance.
fn try_strict_timestamp(s: &str) -> Option<ParsedForm> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| ParsedForm::StrictInstant(dt.with_timezone(&Utc)))
}

// ── Grammar: relative offset ────────────────────────────────────────────────

/// `in <N> <unit>`. A non-numeric amount means this is not the offset
/// grammar at all; a non-positive amount or unknown unit is a hard error.
fn try_relative_offset(raw: &str, s: &str) -> Option<Result<ParsedForm>> {
    let rest = s.strip_prefix("in ")?;
    let (amount_tok, unit_tok) = rest.split_once(' ')?;
    let amount: i64 = amount_tok.parse().ok()?;

    if amount <= 0 {
        return Some(Err(ResolveError::NonPositiveOffset {
            raw: raw.to_string(),
            amount,
        }));
    }
    let Some(unit) = OffsetUnit::from_token(unit_tok) else {
        return Some(Err(ResolveError::InvalidUnit {
            raw: raw.to_string(),
            unit: unit_tok.to_string(),
        }));
    };
    Some(Ok(ParsedForm::RelativeOffset { amount, unit }))
}

// ── Grammar: absolute phrases ───────────────────────────────────────────────

/// `now`, `tomorrow at <time>`, `next <weekday> at <time>`,
/// `<weekday> at <time>`.
fn try_absolute_phrase(raw: &str, s: &str) -> Option<Result<ParsedForm>> {
    if s == "now" {
        return Some(Ok(ParsedForm::NowAnchor));
    }

    let (next, rest) = match s.strip_prefix("next ") {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let (day_tok, time_tok) = rest.split_once(" at ")?;
    if day_tok.contains(' ') {
        return None;
    }
    let time = match parse_time_of_day(raw, time_tok)? {
        Ok(time) => time,
        Err(err) => return Some(Err(err)),
    };

    let anchor = if !next && day_tok == "tomorrow" {
        DayAnchor::Tomorrow
    } else if let Some(weekday) = parse_weekday(day_tok) {
        DayAnchor::NamedWeekday { next, weekday }
    } else {
        return Some(Err(ResolveError::InvalidWeekday {
            raw: raw.to_string(),
            token: day_tok.to_string(),
        }));
    };
    Some(Ok(ParsedForm::AbsolutePhrase { anchor, time }))
}

/// Full English weekday names only.
fn parse_weekday(s: &str) -> Option<Weekday> {
    match s {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Parse a time-of-day token: `9am`, `2:30pm`, `14:00`, `14`.
///
/// Returns `None` when the token does not have the shape of a time at all,
/// and `Some(Err(OutOfRangeTime))` when it has the shape but a field is
/// outside its form's valid range (12-hour: 1-12, 24-hour: 0-23,
/// minute: 0-59).
fn parse_time_of_day(raw: &str, s: &str) -> Option<Result<TimeOfDay>> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    let (body, meridiem) = if let Some(body) = compact.strip_suffix("am") {
        (body, Some(false))
    } else if let Some(body) = compact.strip_suffix("pm") {
        (body, Some(true))
    } else {
        (compact.as_str(), None)
    };

    let (hour_tok, minute_tok) = match body.split_once(':') {
        Some((h, m)) => (h, Some(m)),
        None => (body, None),
    };
    if hour_tok.is_empty() || hour_tok.len() > 2 || !hour_tok.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if let Some(m) = minute_tok {
        if m.len() != 2 || !m.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }

    let hour: u32 = hour_tok.parse().ok()?;
    let minute: u32 = match minute_tok {
        Some(m) => m.parse().ok()?,
        None => 0,
    };

    let out_of_range = || ResolveError::OutOfRangeTime {
        raw: raw.to_string(),
    };
    if minute >= 60 {
        return Some(Err(out_of_range()));
    }
    let hour = match meridiem {
        Some(is_pm) => {
            if !(1..=12).contains(&hour) {
                return Some(Err(out_of_range()));
            }
            match (hour, is_pm) {
                (12, false) => 0,
                (12, true) => 12,
                (h, false) => h,
                (h, true) => h + 12,
            }
        }
        None => {
            if hour > 23 {
                return Some(Err(out_of_range()));
            }
            hour
        }
    };
    Some(Ok(TimeOfDay { hour, minute }))
}

// ── Evaluation ──────────────────────────────────────────────────────────────

/// Turn a parsed form into an instant. All calendar arithmetic is done on
/// the UTC calendar date of the single clock reading; overflow is a hard
/// error, never a wraparound.
fn evaluate(form: ParsedForm, clock: DateTime<Utc>, raw: &str) -> Result<DateTime<Utc>> {
    let out_of_range = || ResolveError::OutOfRangeTime {
        raw: raw.to_string(),
    };

    match form {
        ParsedForm::StrictInstant(instant) => Ok(instant.trunc_subsecs(0)),
        ParsedForm::NowAnchor => Ok(clock.trunc_subsecs(0)),
        ParsedForm::RelativeOffset { amount, unit } => {
            let seconds = amount.checked_mul(unit.seconds()).ok_or_else(out_of_range)?;
            let delta = Duration::try_seconds(seconds).ok_or_else(out_of_range)?;
            clock
                .trunc_subsecs(0)
                .checked_add_signed(delta)
                .ok_or_else(out_of_range)
        }
        ParsedForm::AbsolutePhrase { anchor, time } => {
            let today = clock.date_naive();
            let date = match anchor {
                DayAnchor::Tomorrow => today
                    .checked_add_days(Days::new(1))
                    .ok_or_else(out_of_range)?,
                DayAnchor::NamedWeekday { next, weekday } => {
                    let ahead = (weekday.num_days_from_monday() as i64
                        - today.weekday().num_days_from_monday() as i64
                        + 7)
                        % 7;
                    let ahead = if ahead != 0 {
                        ahead
                    } else if next {
                        // "next monday" on a Monday never means today
                        7
                    } else if compose(today, time).is_some_and(|candidate| candidate > clock) {
                        // Bare weekday resolves to today only while the
                        // time of day is still strictly ahead of the clock
                        0
                    } else {
                        7
                    };
                    today
                        .checked_add_days(Days::new(ahead as u64))
                        .ok_or_else(out_of_range)?
                }
            };
            compose(date, time).ok_or_else(out_of_range)
        }
    }
}

/// Combine a calendar date with a validated time of day, in UTC.
fn compose(date: NaiveDate, time: TimeOfDay) -> Option<DateTime<Utc>> {
    date.and_hms_opt(time.hour, time.minute, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

// ── Tests ───────────────────────────────────────────────────────────────────
