//! Unit tests for the leaf parsers behind the validation tags

use chaos_admission::validation::{
    CronSchedule, DurationError, check_percent, parse_byte_size, parse_cron, parse_duration,
    parse_rate, parse_status_code,
};
use chrono::{TimeDelta, TimeZone, Utc};

// =============================================================================
// Durations
// =============================================================================

#[test]
fn test_duration_compound_literals() {
    assert_eq!(parse_duration("1h30m").unwrap(), TimeDelta::minutes(90));
    assert_eq!(parse_duration("300ms").unwrap(), TimeDelta::milliseconds(300));
    assert_eq!(parse_duration("-1.5h").unwrap(), TimeDelta::minutes(-90));
    assert_eq!(parse_duration("0").unwrap(), TimeDelta::zero());
}

#[test]
fn test_duration_rejections() {
    for input in ["", "1", "abc", "1d", "h", "--1s"] {
        assert!(parse_duration(input).is_err(), "{input:?} should not parse");
    }
    assert!(matches!(
        parse_duration("1d"),
        Err(DurationError::UnknownUnit { .. })
    ));
}

// =============================================================================
// Status codes
// =============================================================================

#[test]
fn test_status_code_single_and_range() {
    assert_eq!(parse_status_code("200").unwrap(), (200, 200));
    assert_eq!(parse_status_code("200-399").unwrap(), (200, 399));
    assert_eq!(parse_status_code("1").unwrap(), (1, 1));
    assert_eq!(parse_status_code("999").unwrap(), (999, 999));
}

#[test]
fn test_status_code_rejections() {
    for input in ["0", "1000", "-1", "abc", "300-200", "200-200", "0-200", "200-1000", ""] {
        assert!(parse_status_code(input).is_err(), "{input:?} should be rejected");
    }
}

// =============================================================================
// Rates and sizes
// =============================================================================

#[test]
fn test_rate_units() {
    assert_eq!(parse_rate("1 mbps").unwrap(), 1024 * 1024);
    assert_eq!(parse_rate("1MBPS").unwrap(), 1024 * 1024);
    assert_eq!(parse_rate("8kbit").unwrap(), 1000);
    assert_eq!(parse_rate("10 bps").unwrap(), 10);
    assert!(parse_rate("10 parsecs").is_err());
    assert!(parse_rate("fast mbps").is_err());
}

#[test]
fn test_byte_sizes() {
    assert_eq!(parse_byte_size("1024").unwrap(), 1024);
    assert_eq!(parse_byte_size("512B").unwrap(), 512);
    assert_eq!(parse_byte_size("10KB").unwrap(), 10_000);
    assert_eq!(parse_byte_size("10KiB").unwrap(), 10_240);
    assert_eq!(parse_byte_size("10K").unwrap(), 10_240);
    assert_eq!(parse_byte_size("1GB").unwrap(), 1_000_000_000);
    assert!(parse_byte_size("ten").is_err());
    assert!(parse_byte_size("10XB").is_err());
}

#[test]
fn test_check_percent() {
    assert!(check_percent("0", true).is_ok());
    assert!(check_percent("0", false).is_err());
    assert!(check_percent("100", false).is_ok());
    assert!(check_percent("50.5", false).is_ok());
    assert!(check_percent("101", true).is_err());
    assert!(check_percent("", true).is_ok());
    assert!(check_percent("", false).is_err());
    assert!(check_percent("half", true).is_err());
}

// =============================================================================
// Cron
// =============================================================================

#[test]
fn test_cron_forms() {
    for expr in [
        "@every 5s",
        "*/1 * * * * *",
        "*/5 * * * *",
        "0 2 * * 1-5",
        "@hourly",
        "CRON_TZ=UTC 0 * * * *",
    ] {
        assert!(parse_cron(expr).is_ok(), "{expr:?} should parse");
    }
    for expr in ["", "bad", "* * *", "@every -1s", "@every 0", "@sometimes"] {
        assert!(parse_cron(expr).is_err(), "{expr:?} should be rejected");
    }
}

#[test]
fn test_cron_next_activation() {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 30).unwrap();

    let every = parse_cron("@every 90s").unwrap();
    assert!(matches!(every, CronSchedule::Every(_)));
    assert_eq!(every.next_after(now).unwrap(), now + TimeDelta::seconds(90));

    let hourly = parse_cron("0 * * * *").unwrap();
    assert_eq!(
        hourly.next_after(now).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap()
    );
}
