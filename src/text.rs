use anyhow::{Context, Result, anyhow};
use regex::{Captures, Regex};
use serde_json::Value;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};
use time::{Date, Month, OffsetDateTime, PrimitiveDateTime, Time, Weekday};
use tracing::debug;

pub const DEFAULT_DATE_FORMAT: &str = "yyyy-MM-dd HH:mm:ss";

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{|\}\}|\{(\w+)\}").expect("placeholder pattern"));

static NEXT_ID: AtomicU64 = AtomicU64::new(100);

/// Replaces `{name}` / `{0}` placeholders using `lookup`. `{{` and `}}` are
/// literal braces; placeholders `lookup` does not know are left untouched.
pub fn format_string<F>(template: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match &caps[0] {
            "{{" => "{".to_string(),
            "}}" => "}".to_string(),
            whole => caps
                .get(1)
                .and_then(|key| lookup(key.as_str()))
                .unwrap_or_else(|| whole.to_string()),
        })
        .into_owned()
}

/// Placeholders resolved against a JSON object (by key) or array (by index).
pub fn format_named(template: &str, values: &Value) -> String {
    format_string(template, |key| {
        let v = match values {
            Value::Object(map) => map.get(key),
            Value::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }?;
        Some(match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    })
}

pub fn format_indexed<T: Display>(template: &str, args: &[T]) -> String {
    format_string(template, |key| {
        key.parse::<usize>()
            .ok()
            .and_then(|i| args.get(i))
            .map(|v| v.to_string())
    })
}

/// Parses `text` laid out like `format` (`yyyy MM dd hh mm ss`, any
/// non-alphanumeric separator). Missing components come from the current UTC time.
pub fn parse_date(text: &str, format: &str) -> Result<PrimitiveDateTime> {
    let text_norm = normalize_separators(text);
    let format_norm = normalize_separators(format);
    let items: Vec<&str> = text_norm.split('-').collect();
    let tokens: Vec<&str> = format_norm.split('-').collect();
    let now = OffsetDateTime::now_utc();

    let year: i32 = component(&tokens, &items, &["yyyy"])?.unwrap_or(now.year());
    let month: u8 = component(&tokens, &items, &["MM"])?.unwrap_or(now.month() as u8);
    let day: u8 = component(&tokens, &items, &["dd"])?.unwrap_or(now.day());
    let hour: u8 = component(&tokens, &items, &["hh", "HH"])?.unwrap_or(now.hour());
    let minute: u8 = component(&tokens, &items, &["mm"])?.unwrap_or(now.minute());
    let second: u8 = component(&tokens, &items, &["ss"])?.unwrap_or(now.second());

    let month = Month::try_from(month).with_context(|| format!("invalid month in {text:?}"))?;
    let date = Date::from_calendar_date(year, month, day)
        .with_context(|| format!("invalid date in {text:?}"))?;
    let time = Time::from_hms(hour, minute, second)
        .with_context(|| format!("invalid time in {text:?}"))?;
    Ok(PrimitiveDateTime::new(date, time))
}

fn normalize_separators(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

fn component<T>(tokens: &[&str], items: &[&str], names: &[&str]) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let Some(idx) = tokens.iter().position(|t| names.contains(t)) else {
        return Ok(None);
    };
    let raw = items
        .get(idx)
        .ok_or_else(|| anyhow!("date text has no {} component", names[0]))?;
    raw.parse::<T>()
        .map(Some)
        .with_context(|| format!("invalid {} component: {raw:?}", names[0]))
}

/// Formats with the letters `y M d q w H h m s S`. A single letter prints the
/// bare value; a run of N letters zero-pads to N digits and keeps the last N
/// (so `yy` is a two-digit year). `w` prints the weekday, long for 3+ letters.
/// An empty format means [`DEFAULT_DATE_FORMAT`].
pub fn format_date(dt: PrimitiveDateTime, format: &str) -> String {
    let format = if format.is_empty() {
        DEFAULT_DATE_FORMAT
    } else {
        format
    };
    let chars: Vec<char> = format.chars().collect();
    let mut out = String::with_capacity(format.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let mut j = i;
        while j < chars.len() && chars[j] == c {
            j += 1;
        }
        let run = j - i;

        match c {
            'w' => out.push_str(weekday_name(dt.weekday(), run > 2)),
            _ => match date_field(&dt, c) {
                Some(v) => out.push_str(&pad(v, run)),
                None => out.extend(std::iter::repeat_n(c, run)),
            },
        }
        i = j;
    }

    out
}

fn date_field(dt: &PrimitiveDateTime, c: char) -> Option<u32> {
    let month = dt.month() as u32;
    Some(match c {
        'y' => dt.year().unsigned_abs(),
        'M' => month,
        'd' => dt.day() as u32,
        'q' => (month + 2) / 3,
        'H' => dt.hour() as u32,
        'h' => match dt.hour() % 12 {
            0 => 12,
            h => h as u32,
        },
        'm' => dt.minute() as u32,
        's' => dt.second() as u32,
        'S' => dt.millisecond() as u32,
        _ => return None,
    })
}

fn pad(value: u32, run: usize) -> String {
    let s = value.to_string();
    if run == 1 {
        return s;
    }
    if s.len() >= run {
        s[s.len() - run..].to_string()
    } else {
        format!("{s:0>run$}")
    }
}

fn weekday_name(day: Weekday, long: bool) -> &'static str {
    match (day, long) {
        (Weekday::Monday, false) => "Mon",
        (Weekday::Tuesday, false) => "Tue",
        (Weekday::Wednesday, false) => "Wed",
        (Weekday::Thursday, false) => "Thu",
        (Weekday::Friday, false) => "Fri",
        (Weekday::Saturday, false) => "Sat",
        (Weekday::Sunday, false) => "Sun",
        (Weekday::Monday, true) => "Monday",
        (Weekday::Tuesday, true) => "Tuesday",
        (Weekday::Wednesday, true) => "Wednesday",
        (Weekday::Thursday, true) => "Thursday",
        (Weekday::Friday, true) => "Friday",
        (Weekday::Saturday, true) => "Saturday",
        (Weekday::Sunday, true) => "Sunday",
    }
}

/// Elements of a JSON array; anything else yields an empty vec.
pub fn to_array(text: &str) -> Vec<Value> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items,
        Ok(_) => Vec::new(),
        Err(err) => {
            debug!("not a JSON array ({err}): {text}");
            Vec::new()
        }
    }
}

/// `start..=end` in steps of `step`, reversed unless `asc`. A non-positive
/// step yields nothing.
pub fn numbers_in_range(start: i64, end: i64, step: i64, asc: bool) -> Vec<i64> {
    if step <= 0 || start > end {
        return Vec::new();
    }
    let mut ns: Vec<i64> = (start..=end).step_by(step as usize).collect();
    if !asc {
        ns.reverse();
    }
    ns
}

/// Process-wide sequential id, starting at 100.
pub fn next_id() -> u64 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}
