//! Schedule expressions for `Schedule.spec.schedule`
//!
//! Accepted forms:
//! - five-field standard cron (`*/5 * * * *`), minute resolution
//! - six-field cron with a leading seconds field (`*/1 * * * * *`)
//! - descriptors (`@hourly`, `@daily`, `@midnight`, `@weekly`, `@monthly`,
//!   `@yearly`, `@annually`)
//! - `@every <duration>` with a positive duration literal
//!
//! An optional `CRON_TZ=<zone> ` or `TZ=<zone> ` prefix is stripped.

use std::str::FromStr;

use chrono::TimeDelta;

use super::duration::parse_duration;

/// A parsed schedule expression
#[derive(Debug, Clone)]
pub enum CronSchedule {
    /// Fixed interval from `@every`
    Every(TimeDelta),
    /// Calendar schedule
    Calendar(Box<cron::Schedule>),
}

impl CronSchedule {
    /// Next activation strictly after `after`
    pub fn next_after(
        &self,
        after: chrono::DateTime<chrono::Utc>,
    ) -> Option<chrono::DateTime<chrono::Utc>> {
        match self {
            CronSchedule::Every(interval) => after.checked_add_signed(*interval),
            CronSchedule::Calendar(schedule) => schedule.after(&after).next(),
        }
    }
}

/// Parse a schedule expression
pub fn parse_cron(expr: &str) -> Result<CronSchedule, String> {
    let expr = strip_timezone(expr.trim());
    if expr.is_empty() {
        return Err("empty spec string".to_string());
    }

    if let Some(interval) = expr.strip_prefix("@every") {
        let interval = interval.trim();
        let delta = parse_duration(interval)
            .map_err(|e| format!("failed to parse duration {interval}: {e}"))?;
        if delta <= TimeDelta::zero() {
            return Err(format!("@every interval must be positive, got {interval}"));
        }
        return Ok(CronSchedule::Every(delta));
    }

    let six_field = if expr.starts_with('@') {
        descriptor(expr)
            .ok_or_else(|| format!("unrecognized descriptor: {expr}"))?
            .to_string()
    } else {
        let fields: Vec<&str> = expr.split_whitespace().collect();
        match fields.as_slice() {
            [minute, hour, dom, month, dow] => {
                format!("0 {minute} {hour} {dom} {month} {}", day_of_week(dow))
            }
            [second, minute, hour, dom, month, dow] => {
                format!("{second} {minute} {hour} {dom} {month} {}", day_of_week(dow))
            }
            other => {
                return Err(format!(
                    "expected 5 or 6 fields, found {}: {expr}",
                    other.len()
                ));
            }
        }
    };

    cron::Schedule::from_str(&six_field)
        .map(|s| CronSchedule::Calendar(Box::new(s)))
        .map_err(|e| e.to_string())
}

fn strip_timezone(expr: &str) -> &str {
    for prefix in ["CRON_TZ=", "TZ="] {
        if let Some(rest) = expr.strip_prefix(prefix) {
            return rest.split_once(' ').map(|(_, s)| s.trim_start()).unwrap_or("");
        }
    }
    expr
}

fn descriptor(expr: &str) -> Option<&'static str> {
    match expr {
        "@yearly" | "@annually" => Some("0 0 0 1 1 *"),
        "@monthly" => Some("0 0 0 1 * *"),
        "@weekly" => Some("0 0 0 * * Sun"),
        "@daily" | "@midnight" => Some("0 0 0 * * *"),
        "@hourly" => Some("0 0 * * * *"),
        _ => None,
    }
}

/// Numeric days of week count from Sunday = 0 (7 is also Sunday); the
/// calendar parser counts from Sunday = 1, so numbers are rewritten as names.
fn day_of_week(field: &str) -> String {
    const NAMES: [&str; 8] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

    let mut out = String::with_capacity(field.len() * 2);
    let mut digits = String::new();
    let mut after_slash = false;
    let flush = |digits: &mut String, out: &mut String, after_slash: bool| {
        if digits.is_empty() {
            return;
        }
        match digits.parse::<usize>().ok().and_then(|n| NAMES.get(n)) {
            Some(name) if !after_slash => out.push_str(name),
            _ => out.push_str(digits),
        }
        digits.clear();
    };

    for c in field.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
            continue;
        }
        flush(&mut digits, &mut out, after_slash);
        after_slash = c == '/';
        out.push(c);
    }
    flush(&mut digits, &mut out, after_slash);
    out
}
