//! Destination naming and time-based rotation.
//!
//! Rotation patterns use the moment.js token grammar (`YYYY-MM-DD`,
//! `YYYY-MM-DD-HH`, `GGGG-[W]WW`, ...), so a pattern written for the
//! original JavaScript transport produces the same blob names here.
//! Evaluation is always in UTC.

use chrono::{DateTime, Datelike, Days, Timelike, Utc};
use std::fmt::Write as _;

/// Extension appended to `.log` files.
pub const LOG_EXTENSION: &str = ".log";

/// Source of "now" for rotation.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a given instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// Base name, rotation pattern and extension of a destination blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub blob_name: String,
    pub rotate_period: String,
    pub extension: Option<String>,
}

impl Destination {
    pub fn new(blob_name: impl Into<String>) -> Self {
        Destination { blob_name: blob_name.into(), rotate_period: String::new(), extension: None }
    }

    #[must_use]
    pub fn with_rotate_period(mut self, rotate_period: impl Into<String>) -> Self {
        self.rotate_period = rotate_period.into();
        self
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    /// Name of the blob that receives writes made at `clock.now()`.
    pub fn name(&self, clock: &dyn Clock) -> String {
        generate_blob_name(&self.blob_name, &self.rotate_period, self.extension.as_deref(), clock.now())
    }
}

/// Build `blob_name[.<formatted now>][extension]`.
///
/// The rotation suffix is only added for a non-empty `rotate_period`; the
/// extension is appended verbatim and always last.
pub fn generate_blob_name(
    blob_name: &str,
    rotate_period: &str,
    extension: Option<&str>,
    now: DateTime<Utc>,
) -> String {
    let mut name = String::from(blob_name);
    if !rotate_period.is_empty() {
        name.push('.');
        name.push_str(&format_rotation(now, rotate_period));
    }
    if let Some(extension) = extension {
        name.push_str(extension);
    }
    name
}

const MONTHS: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const WEEKDAYS: [&str; 7] = ["Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday"];

// Longest tokens first so `YYYY` wins over `YY`, `MMMM` over `MM`, etc.
const TOKENS: &[&str] = &[
    "YYYY", "GGGG", "MMMM", "DDDD", "dddd", "MMM", "DDD", "ddd", "SSS", "YY", "MM", "Do", "DD",
    "WW", "ww", "HH", "hh", "mm", "ss", "ZZ", "Q", "M", "D", "d", "W", "w", "H", "h", "m", "s",
    "A", "a", "X", "x", "Z",
];

/// Format `now` with a moment.js style pattern.
///
/// Supported tokens: `YYYY YY GGGG Q MMMM MMM MM M DDDD DDD DD D Do dddd ddd d
/// WW W ww w HH H hh h mm m ss s SSS A a X x Z ZZ`. Text inside `[...]` is copied
/// literally, as is any character that does not start a token.
pub fn format_rotation(now: DateTime<Utc>, pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 8);
    let mut rest = pattern;

    while let Some(c) = rest.chars().next() {
        if c == '[' {
            if let Some(close) = rest.find(']') {
                out.push_str(&rest[1..close]);
                rest = &rest[close + 1..];
                continue;
            }
        }

        if let Some(token) = TOKENS.iter().find(|t| rest.starts_with(**t)) {
            write_token(&mut out, token, now);
            rest = &rest[token.len()..];
        } else {
            out.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    out
}

fn write_token(out: &mut String, token: &str, now: DateTime<Utc>) {
    let hour12 = match now.hour() % 12 {
        0 => 12,
        h => h,
    };
    let _ = match token {
        "YYYY" => write!(out, "{:04}", now.year()),
        "YY" => write!(out, "{:02}", now.year().rem_euclid(100)),
        "GGGG" => write!(out, "{:04}", now.iso_week().year()),
        "Q" => write!(out, "{}", now.month0() / 3 + 1),
        "MMMM" => write!(out, "{}", MONTHS[now.month0() as usize]),
        "MMM" => write!(out, "{}", &MONTHS[now.month0() as usize][..3]),
        "MM" => write!(out, "{:02}", now.month()),
        "M" => write!(out, "{}", now.month()),
        "DDDD" => write!(out, "{:03}", now.ordinal()),
        "DDD" => write!(out, "{}", now.ordinal()),
        "DD" => write!(out, "{:02}", now.day()),
        "D" => write!(out, "{}", now.day()),
        "Do" => write!(out, "{}{}", now.day(), ordinal_suffix(now.day())),
        "dddd" => write!(out, "{}", WEEKDAYS[now.weekday().num_days_from_sunday() as usize]),
        "ddd" => write!(out, "{}", &WEEKDAYS[now.weekday().num_days_from_sunday() as usize][..3]),
        "d" => write!(out, "{}", now.weekday().num_days_from_sunday()),
        "WW" => write!(out, "{:02}", now.iso_week().week()),
        "W" => write!(out, "{}", now.iso_week().week()),
        "ww" => write!(out, "{:02}", locale_week(now)),
        "w" => write!(out, "{}", locale_week(now)),
        "HH" => write!(out, "{:02}", now.hour()),
        "H" => write!(out, "{}", now.hour()),
        "hh" => write!(out, "{:02}", hour12),
        "h" => write!(out, "{}", hour12),
        "mm" => write!(out, "{:02}", now.minute()),
        "m" => write!(out, "{}", now.minute()),
        "ss" => write!(out, "{:02}", now.second()),
        "s" => write!(out, "{}", now.second()),
        "SSS" => write!(out, "{:03}", now.timestamp_subsec_millis()),
        "A" => write!(out, "{}", if now.hour() < 12 { "AM" } else { "PM" }),
        "a" => write!(out, "{}", if now.hour() < 12 { "am" } else { "pm" }),
        "X" => write!(out, "{}", now.timestamp()),
        "x" => write!(out, "{}", now.timestamp_millis()),
        "Z" => write!(out, "+00:00"),
        "ZZ" => write!(out, "+0000"),
        _ => write!(out, "{}", token),
    };
}

/// Week of year with Sunday-start weeks where week 1 contains January 1st
/// (moment.js default locale).
fn locale_week(now: DateTime<Utc>) -> u32 {
    let weekday = now.weekday().num_days_from_sunday();
    let saturday = now.date_naive().checked_add_days(Days::new(u64::from(6 - weekday)));
    if saturday.is_some_and(|saturday| saturday.year() > now.year()) {
        // this week already contains next January 1st
        return 1;
    }
    let jan1_weekday = (weekday + 7 - now.ordinal0() % 7) % 7;
    (now.ordinal0() + jan1_weekday) / 7 + 1
}

fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}
