//! Parsers for the unit-bearing string fields: bandwidth rates, byte sizes,
//! HTTP status codes and percentages.

use std::sync::LazyLock;

use regex::Regex;

/// Rate suffixes and their multiplier in bytes per second, longest first
const RATE_UNITS: &[(&str, u64)] = &[
    ("tbps", 1024 * 1024 * 1024 * 1024),
    ("gbps", 1024 * 1024 * 1024),
    ("mbps", 1024 * 1024),
    ("kbps", 1024),
    ("bps", 1),
];

/// Bit-rate suffixes in bits per second
const BIT_UNITS: &[(&str, u64)] = &[
    ("tbit", 1_000_000_000_000),
    ("gbit", 1_000_000_000),
    ("mbit", 1_000_000),
    ("kbit", 1_000),
    ("bit", 1),
];

/// Parse `"<number> <unit>"` into bytes per second. Units are case-insensitive.
pub fn parse_rate(input: &str) -> Result<u64, String> {
    let normalized = input.trim().to_ascii_lowercase();

    for (unit, multiplier) in RATE_UNITS {
        if let Some(number) = normalized.strip_suffix(unit) {
            let n = parse_rate_number(number)?;
            return n
                .checked_mul(*multiplier)
                .ok_or_else(|| format!("rate {input} overflows"));
        }
    }
    for (unit, bits) in BIT_UNITS {
        if let Some(number) = normalized.strip_suffix(unit) {
            let n = parse_rate_number(number)?;
            return n
                .checked_mul(*bits)
                .map(|b| b / 8)
                .ok_or_else(|| format!("rate {input} overflows"));
        }
    }
    Err(format!("invalid unit in rate {input:?}"))
}

fn parse_rate_number(number: &str) -> Result<u64, String> {
    let number = number.trim();
    number
        .parse::<u64>()
        .map_err(|e| format!("invalid rate number {number:?}: {e}"))
}

static BYTE_SIZE: LazyLock<Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^([0-9]+(?:\.[0-9]+)?)\s*(?:([kKmMgGtTpPeE])([iI])?([bB])?|([bB]))?$")
});

/// Parse a human byte size: `1024`, `512B`, `10KB` (decimal), `10KiB` or
/// `10K` (binary).
pub fn parse_byte_size(input: &str) -> Result<u64, String> {
    let pattern = BYTE_SIZE.as_ref().map_err(ToString::to_string)?;
    let caps = pattern
        .captures(input.trim())
        .ok_or_else(|| format!("invalid size: {input:?}"))?;

    let number: f64 = caps
        .get(1)
        .map(|m| m.as_str())
        .unwrap_or_default()
        .parse()
        .map_err(|_| format!("invalid size: {input:?}"))?;

    let multiplier = match caps.get(2) {
        None => 1.0,
        Some(prefix) => {
            let exponent = match prefix.as_str().to_ascii_lowercase().as_str() {
                "k" => 1,
                "m" => 2,
                "g" => 3,
                "t" => 4,
                "p" => 5,
                _ => 6,
            };
            let binary = caps.get(3).is_some() || caps.get(4).is_none();
            let base: f64 = if binary { 1024.0 } else { 1000.0 };
            base.powi(exponent)
        }
    };

    let bytes = number * multiplier;
    if bytes > u64::MAX as f64 {
        return Err(format!("size {input:?} is too large"));
    }
    Ok(bytes as u64)
}

/// Parse a status-code criterion: a single code `N` with `0 < N < 1000`, or a
/// range `N-M` with both bounds valid and `N < M`.
pub fn parse_status_code(input: &str) -> Result<(u16, u16), String> {
    fn single(code: &str, whole: &str) -> Result<u16, String> {
        let n: i64 = code
            .trim()
            .parse()
            .map_err(|_| format!("incorrect status code format {whole:?}"))?;
        if n <= 0 || n >= 1000 {
            return Err(format!("status code {n} should be in (0, 1000)"));
        }
        // Bounded above, the conversion is lossless.
        Ok(n as u16)
    }

    match input.split_once('-') {
        Some((low, high)) => {
            let low = single(low, input)?;
            let high = single(high, input)?;
            if low >= high {
                return Err(format!(
                    "incorrect status code range {input:?}, the start must be less than the end"
                ));
            }
            Ok((low, high))
        }
        None => {
            let code = single(input, input)?;
            Ok((code, code))
        }
    }
}

/// Percentage given as a string, as used by the physical machine network
/// actions. Empty is only accepted when zero is.
pub fn check_percent(input: &str, allow_zero: bool) -> Result<(), String> {
    if input.is_empty() {
        return if allow_zero {
            Ok(())
        } else {
            Err("percent is required".to_string())
        };
    }
    let value: f32 = input
        .parse()
        .map_err(|_| format!("percent {input:?} is not a number"))?;
    let in_range = if allow_zero {
        (0.0..=100.0).contains(&value)
    } else {
        value > 0.0 && value <= 100.0
    };
    if in_range {
        Ok(())
    } else if allow_zero {
        Err(format!("percent {input} is invalid, should be in [0, 100]"))
    } else {
        Err(format!("percent {input} is invalid, should be in (0, 100]"))
    }
}
