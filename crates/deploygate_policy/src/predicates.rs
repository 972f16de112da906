//! Small pure predicates shared by the rule checks.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use regex::Regex;

/// Prefix that turns a branch short-name into a full git reference.
pub const BRANCH_REF_PREFIX: &str = "refs/heads/";

/// Check a ticket id against a pattern.
///
/// An empty ticket is never valid. An empty pattern accepts any non-empty
/// ticket. Otherwise the pattern must match at the start of the ticket;
/// trailing text is allowed unless the pattern anchors with `$`.
pub fn valid_ticket(ticket: &str, pattern: &str) -> bool {
    if ticket.is_empty() {
        return false;
    }
    if pattern.is_empty() {
        return true;
    }

    match compile_ticket_pattern(pattern) {
        Ok(regex) => regex.is_match(ticket),
        Err(_) => false,
    }
}

/// Compile a ticket pattern with a leading anchor.
pub fn compile_ticket_pattern(pattern: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{})", pattern))
}

/// Whether `git_ref` names one of the allowed branches.
pub fn branch_allowed(allowed: &[String], git_ref: &str) -> bool {
    allowed.iter().any(|branch| {
        git_ref
            .strip_prefix(BRANCH_REF_PREFIX)
            .is_some_and(|name| name == branch)
    })
}

/// A UTC time-of-day window such as `09:00-17:30`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Self {
        Self { start, end }
    }

    /// Whether a time of day lies inside the window, bounds included.
    ///
    /// Comparison is per minute. A window whose start is after its end
    /// wraps across midnight.
    pub fn contains(&self, time: NaiveTime) -> bool {
        let minute = time.hour() * 60 + time.minute();
        let start = self.start.hour() * 60 + self.start.minute();
        let end = self.end.hour() * 60 + self.end.minute();

        if start <= end {
            start <= minute && minute <= end
        } else {
            minute >= start || minute <= end
        }
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| format!("window '{}' is not of the form HH:MM-HH:MM", s))?;

        let parse = |bound: &str| {
            NaiveTime::parse_from_str(bound.trim(), "%H:%M")
                .map_err(|e| format!("invalid time '{}' in window '{}': {}", bound, s, e))
        };

        Ok(Self::new(parse(start)?, parse(end)?))
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Whether `now` falls inside `window`. Unparseable windows never match.
pub fn in_window(now: DateTime<Utc>, window: &str) -> bool {
    window
        .parse::<TimeWindow>()
        .map(|w| w.contains(now.time()))
        .unwrap_or(false)
}

/// Whether `now` falls inside at least one of `windows`.
pub fn any_window_matches(now: DateTime<Utc>, windows: &[String]) -> bool {
    windows.iter().any(|window| in_window(now, window))
}
