use std::fmt;

use chrono::{NaiveTime, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::employee::TimeRange;
use crate::models::rule::{ConstraintKind, ParsedRule, RuleConstraint, RuleType};

/// Typed reason a rule text was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParseErrorReason {
    EmptyInput,
    NoTemporalToken,
    InvalidTimeRange,
}

impl ParseErrorReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ParseErrorReason::EmptyInput => "EMPTY_INPUT",
            ParseErrorReason::NoTemporalToken => "NO_TEMPORAL_TOKEN",
            ParseErrorReason::InvalidTimeRange => "INVALID_TIME_RANGE",
        }
    }
}

impl fmt::Display for ParseErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recoverable rejection; the original text is preserved so the caller can
/// surface it for manual correction.
#[derive(Debug, Clone, Error, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("无法解析规则文本 ({reason}): {raw_text}")]
pub struct ParseError {
    pub raw_text: String,
    pub reason: ParseErrorReason,
}

impl ParseError {
    fn new(raw_text: &str, reason: ParseErrorReason) -> Self {
        debug!(target: "engine::parse", reason = reason.as_str(), raw = raw_text, "rule text rejected");
        Self {
            raw_text: raw_text.to_string(),
            reason,
        }
    }
}

static NEGATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(cant|cannot|wont|unable|unavailable|not\s+available|no\s+shifts?|off)\b")
        .expect("negation pattern")
});

static REQUIREMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(needs?|must|requires?|required|at\s+least|at\s+most|maximum|minimum|max|min|no\s+more\s+than|up\s+to)\b")
        .expect("requirement pattern")
});

static PREFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(prefers?|would\s+like|would\s+rather|likes?|wants?)\b").expect("preference pattern")
});

static DAY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(mon|tues|tue|wednes|wed|thurs|thur|thu|fri|satur|sat|sun)(day)?s?\b")
        .expect("day pattern")
});

static DAY_SPAN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(mon|tues|tue|wednes|wed|thurs|thur|thu|fri|satur|sat|sun)(?:day)?s?\s*(?:-|to|through|until)\s*(mon|tues|tue|wednes|wed|thurs|thur|thu|fri|satur|sat|sun)(?:day)?s?\b",
    )
    .expect("day span pattern")
});

static WEEKDAYS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bweek\s?days?\b").expect("weekdays pattern"));
static WEEKENDS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bweek\s?ends?\b").expect("weekends pattern"));
static ALL_DAYS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(every\s?day|daily|all\s+days)\b").expect("all days pattern"));

static TIME_RANGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\b(\d{1,2})(?::([0-5]\d))?\s*(am|pm)?\s*(?:-|to|until|till|and)\s*(\d{1,2})(?::([0-5]\d))?\s*(am|pm)?\b",
    )
    .expect("time range pattern")
});

static BEFORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bbefore\s+(\d{1,2})(?::([0-5]\d))?\s*(am|pm)?\b").expect("before pattern"));
static AFTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bafter\s+(\d{1,2})(?::([0-5]\d))?\s*(am|pm)?\b").expect("after pattern"));
static NAMED_PERIOD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(morning|afternoon|evening|overnight|night)s?\b").expect("named period pattern"));
static CLOCK_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,2}):([0-5]\d)\b|\b(\d{1,2})\s*(am|pm)\b").expect("clock token pattern"));

static MAX_HOURS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:maximum|max|at\s+most|no\s+more\s+than|up\s+to)\s+(?:of\s+)?(\d{1,3}(?:\.\d+)?)\s*(?:hours?|hrs?)\b")
        .expect("max hours pattern")
});
static MIN_HOURS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:minimum|min|at\s+least)\s+(?:of\s+)?(\d{1,3}(?:\.\d+)?)\s*(?:hours?|hrs?)\b")
        .expect("min hours pattern")
});
static MORE_THAN_HOURS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:more\s+than|over)\s+(\d{1,3}(?:\.\d+)?)\s*(?:hours?|hrs?)\b").expect("more-than pattern")
});
static GENERIC_HOURS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(\d{1,3}(?:\.\d+)?)\s*(?:hours?|hrs?)(?:\s+(?:a|per|each)\s+week)?\b")
        .expect("generic hours pattern")
});

/// Parse free text into a structured rule. Deterministic pattern matching:
/// either a fully structured result or a typed `ParseError`, never a
/// partial success.
pub fn parse(text: &str) -> Result<ParsedRule, ParseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ParseError::new(text, ParseErrorReason::EmptyInput));
    }

    let normalized = normalize(trimmed);

    let negation = NEGATION_RE.is_match(&normalized);
    let requirement = REQUIREMENT_RE.is_match(&normalized);
    let preference = PREFERENCE_RE.is_match(&normalized);

    let days = extract_days(&normalized);
    let (time_range, time_note, has_time_token) = extract_time(&normalized, trimmed)?;
    let hour_caps = extract_hours(&normalized, negation, requirement);

    if days.is_empty() && !has_time_token && hour_caps.is_none() {
        return Err(ParseError::new(trimmed, ParseErrorReason::NoTemporalToken));
    }

    // Marker precedence: negation > requirement > preference.
    let rule_type = if negation {
        if hour_caps.is_some() && days.is_empty() && time_range.is_none() {
            RuleType::Restriction
        } else {
            RuleType::Availability
        }
    } else if requirement {
        RuleType::Requirement
    } else if preference {
        RuleType::Preference
    } else {
        RuleType::Availability
    };

    let mut constraints = Vec::new();

    if negation && (!days.is_empty() || time_range.is_some()) {
        constraints.push(RuleConstraint {
            kind: ConstraintKind::Unavailable,
            days: days.clone(),
            time_range,
            max_hours: None,
            note: time_note.clone(),
        });
    }

    if let Some(caps) = &hour_caps {
        if let Some(max) = caps.max {
            constraints.push(RuleConstraint {
                kind: ConstraintKind::MaxWeeklyHours,
                days: Vec::new(),
                time_range: None,
                max_hours: Some(max),
                note: None,
            });
        }
        if let Some(min) = caps.min {
            constraints.push(RuleConstraint {
                kind: ConstraintKind::MinWeeklyHours,
                days: Vec::new(),
                time_range: None,
                max_hours: Some(min),
                note: None,
            });
        }
    }

    if !negation && (!days.is_empty() || time_range.is_some()) {
        let kind = match rule_type {
            RuleType::Preference => ConstraintKind::Preferred,
            _ => ConstraintKind::RequiredWindow,
        };
        constraints.push(RuleConstraint {
            kind,
            days,
            time_range,
            max_hours: None,
            note: time_note,
        });
    }

    if constraints.is_empty() {
        return Err(ParseError::new(trimmed, ParseErrorReason::NoTemporalToken));
    }

    debug!(
        target: "engine::parse",
        rule_type = ?rule_type,
        constraints = constraints.len(),
        "rule text parsed"
    );

    Ok(ParsedRule {
        rule_type,
        constraints,
    })
}

/// Lowercase, drop apostrophes, turn remaining punctuation into spaces.
/// `:` and `-` survive for clock tokens and spans.
fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.to_lowercase().chars() {
        match c {
            '\'' | '\u{2019}' => {}
            c if c.is_ascii_alphanumeric() || c == ':' || c == '-' => out.push(c),
            _ => out.push(' '),
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn weekday_from_prefix(token: &str) -> Option<Weekday> {
    match &token[..3.min(token.len())] {
        "mon" => Some(Weekday::Mon),
        "tue" => Some(Weekday::Tue),
        "wed" => Some(Weekday::Wed),
        "thu" => Some(Weekday::Thu),
        "fri" => Some(Weekday::Fri),
        "sat" => Some(Weekday::Sat),
        "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn extract_days(normalized: &str) -> Vec<Weekday> {
    let mut found = [false; 7];

    if ALL_DAYS_RE.is_match(normalized) {
        found = [true; 7];
    }
    if WEEKDAYS_RE.is_match(normalized) {
        for slot in found.iter_mut().take(5) {
            *slot = true;
        }
    }
    if WEEKENDS_RE.is_match(normalized) {
        found[5] = true;
        found[6] = true;
    }

    for caps in DAY_SPAN_RE.captures_iter(normalized) {
        if let (Some(from), Some(to)) = (
            caps.get(1).and_then(|m| weekday_from_prefix(m.as_str())),
            caps.get(2).and_then(|m| weekday_from_prefix(m.as_str())),
        ) {
            let mut day = from;
            loop {
                found[day.num_days_from_monday() as usize] = true;
                if day == to {
                    break;
                }
                day = day.succ();
            }
        }
    }

    for caps in DAY_RE.captures_iter(normalized) {
        if let Some(day) = caps.get(1).and_then(|m| weekday_from_prefix(m.as_str())) {
            found[day.num_days_from_monday() as usize] = true;
        }
    }

    const ORDER: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];
    ORDER
        .iter()
        .copied()
        .filter(|day| found[day.num_days_from_monday() as usize])
        .collect()
}

/// Build a clock time from captured hour/minute/meridiem tokens. Hours
/// above 23 are treated as not-a-time (the text was probably an hour
/// count); an explicit meridiem with an hour above 12 is a hard error.
fn clock_time(
    raw_text: &str,
    hour_raw: &str,
    minute_raw: Option<&str>,
    meridiem: Option<&str>,
) -> Result<Option<NaiveTime>, ParseError> {
    let hour: u32 = match hour_raw.parse() {
        Ok(value) => value,
        Err(_) => return Ok(None),
    };
    let minute: u32 = minute_raw.and_then(|m| m.parse().ok()).unwrap_or(0);

    let hour = match meridiem {
        Some("am") => {
            if hour > 12 {
                return Err(ParseError::new(raw_text, ParseErrorReason::InvalidTimeRange));
            }
            if hour == 12 {
                0
            } else {
                hour
            }
        }
        Some("pm") => {
            if hour > 12 {
                return Err(ParseError::new(raw_text, ParseErrorReason::InvalidTimeRange));
            }
            if hour == 12 {
                12
            } else {
                hour + 12
            }
        }
        _ => {
            if hour > 23 {
                return Ok(None);
            }
            hour
        }
    };

    Ok(NaiveTime::from_hms_opt(hour, minute, 0))
}

/// Extract one time-of-day window. Precedence: explicit range, then
/// before/after half-open windows, then named day periods.
fn extract_time(
    normalized: &str,
    raw_text: &str,
) -> Result<(Option<TimeRange>, Option<String>, bool), ParseError> {
    for caps in TIME_RANGE_RE.captures_iter(normalized) {
        let start = clock_time(
            raw_text,
            caps.get(1).map(|m| m.as_str()).unwrap_or(""),
            caps.get(2).map(|m| m.as_str()),
            caps.get(3).map(|m| m.as_str()),
        )?;
        let end = clock_time(
            raw_text,
            caps.get(4).map(|m| m.as_str()).unwrap_or(""),
            caps.get(5).map(|m| m.as_str()),
            caps.get(6).map(|m| m.as_str()),
        )?;

        if let (Some(start), Some(mut end)) = (start, end) {
            // "9 to 5" with no meridiem on either side reads as business
            // hours: push the end into the afternoon when that makes the
            // window forward instead of overnight.
            if caps.get(3).is_none() && caps.get(6).is_none() && end <= start {
                if let Some(shifted) = shift_by_12h(end) {
                    if shifted > start {
                        end = shifted;
                    }
                }
            }
            if start == end {
                continue;
            }
            return Ok((Some(TimeRange::new(start, end)), None, true));
        }
    }

    if let Some(caps) = BEFORE_RE.captures(normalized) {
        if let Some(end) = clock_time(
            raw_text,
            caps.get(1).map(|m| m.as_str()).unwrap_or(""),
            caps.get(2).map(|m| m.as_str()),
            caps.get(3).map(|m| m.as_str()),
        )? {
            let start = NaiveTime::from_hms_opt(0, 0, 0).expect("midnight");
            if end != start {
                return Ok((Some(TimeRange::new(start, end)), None, true));
            }
        }
    }

    if let Some(caps) = AFTER_RE.captures(normalized) {
        if let Some(start) = clock_time(
            raw_text,
            caps.get(1).map(|m| m.as_str()).unwrap_or(""),
            caps.get(2).map(|m| m.as_str()),
            caps.get(3).map(|m| m.as_str()),
        )? {
            let end = NaiveTime::from_hms_opt(23, 59, 0).expect("end of day");
            if start != end {
                return Ok((Some(TimeRange::new(start, end)), None, true));
            }
        }
    }

    if let Some(caps) = NAMED_PERIOD_RE.captures(normalized) {
        let name = caps.get(1).map(|m| m.as_str()).unwrap_or("");
        let range = match name {
            "morning" => Some((6, 12)),
            "afternoon" => Some((12, 17)),
            "evening" => Some((17, 22)),
            "night" | "overnight" => Some((22, 6)),
            _ => None,
        };
        if let Some((from, to)) = range {
            let start = NaiveTime::from_hms_opt(from, 0, 0).expect("period start");
            let end = NaiveTime::from_hms_opt(to, 0, 0).expect("period end");
            return Ok((Some(TimeRange::new(start, end)), Some(name.to_string()), true));
        }
    }

    // A lone clock mention still counts as a temporal token even when it
    // does not form a window.
    Ok((None, None, CLOCK_TOKEN_RE.is_match(normalized)))
}

fn shift_by_12h(time: NaiveTime) -> Option<NaiveTime> {
    use chrono::Timelike;
    if time.hour() < 12 {
        NaiveTime::from_hms_opt(time.hour() + 12, time.minute(), 0)
    } else {
        None
    }
}

struct HourCaps {
    max: Option<f64>,
    min: Option<f64>,
}

fn extract_hours(normalized: &str, negation: bool, requirement: bool) -> Option<HourCaps> {
    let capture_value = |re: &Regex| -> Option<f64> {
        re.captures(normalized)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
    };

    let mut max = capture_value(&MAX_HOURS_RE);
    let min = capture_value(&MIN_HOURS_RE);

    if max.is_none() && negation {
        // "can't work more than 30 hours" caps the week at 30.
        max = capture_value(&MORE_THAN_HOURS_RE);
    }

    if max.is_none() && min.is_none() && requirement && !negation {
        // "needs 20 hours per week" reads as a weekly floor.
        if let Some(value) = capture_value(&GENERIC_HOURS_RE) {
            return Some(HourCaps {
                max: None,
                min: Some(value),
            });
        }
    }

    if max.is_none() && min.is_none() {
        None
    } else {
        Some(HourCaps { max, min })
    }
}
