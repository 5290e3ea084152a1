// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Property-based tests for the validation engine
//!
//! These tests use proptest to generate random field values and specs and
//! verify that:
//! 1. Selector mode/value checks reject exactly the out-of-range values
//! 2. Duration and status-code leaves accept exactly their grammar
//! 3. Defaulting is idempotent
//! 4. Admitted specs stay admitted after a serialize/decode round trip

#[path = "../common/mod.rs"]
mod common;

use proptest::prelude::*;
use serde_json::{Value, json};

use chaos_admission::crd::{
    NetworkChaosSpec, PodChaosSpec, SelectorMode, StatusCheckSpec, check_mode_value,
};
use chaos_admission::validation::{
    FieldPath, Walk, default_tree, parse_duration, parse_status_code,
};
use common::*;

// =============================================================================
// Strategy generators
// =============================================================================

/// Modes that carry a value
fn valued_mode() -> impl Strategy<Value = SelectorMode> {
    prop_oneof![
        Just(SelectorMode::Fixed),
        Just(SelectorMode::FixedPercent),
        Just(SelectorMode::RandomMaxPercent),
    ]
}

fn duration_unit() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("ns"),
        Just("us"),
        Just("ms"),
        Just("s"),
        Just("m"),
        Just("h"),
    ]
}

/// A well-formed duration literal such as `-3h20m` or `1.5s`
fn duration_literal() -> impl Strategy<Value = String> {
    (
        any::<bool>(),
        prop::collection::vec((1..1000u32, prop::option::of(1..100u32), duration_unit()), 1..4),
    )
        .prop_map(|(negative, terms)| {
            let body: String = terms
                .into_iter()
                .map(|(whole, fraction, unit)| match fraction {
                    Some(f) => format!("{whole}.{f}{unit}"),
                    None => format!("{whole}{unit}"),
                })
                .collect();
            if negative { format!("-{body}") } else { body }
        })
}

/// A number followed by a unit the grammar does not know
fn bad_duration_literal() -> impl Strategy<Value = String> {
    prop_oneof![
        (1..1000u32, "[dwyDWY]").prop_map(|(n, unit)| format!("{n}{unit}")),
        (1..1000u32).prop_map(|n| n.to_string()),
        "[a-z]{1,6}",
    ]
}

fn pod_chaos_spec() -> impl Strategy<Value = Value> {
    (
        prop_oneof![Just("pod-kill"), Just("pod-failure"), Just("container-kill")],
        prop_oneof![Just("one"), Just("all")],
        prop::option::of(prop::collection::vec("[a-z]{1,8}", 1..3)),
        prop::collection::vec("[a-z]{1,8}", 1..3),
        prop::option::of((1..600u32).prop_map(|s| format!("{s}s"))),
    )
        .prop_map(|(action, mode, namespaces, containers, duration)| {
            let mut spec = json!({"action": action, "mode": mode, "containerNames": containers});
            if let Some(namespaces) = namespaces {
                spec["selector"] = json!({"namespaces": namespaces});
            }
            if let Some(duration) = duration {
                spec["duration"] = json!(duration);
            }
            spec
        })
}

fn network_delay_spec() -> impl Strategy<Value = Value> {
    (
        1..1000u32,
        prop::option::of(0..100u32),
        prop::option::of(prop_oneof![Just("to"), Just("both")]),
    )
        .prop_map(|(latency, correlation, direction)| {
            let mut delay = json!({"latency": format!("{latency}ms")});
            if let Some(correlation) = correlation {
                delay["correlation"] = json!(correlation.to_string());
            }
            let mut spec = json!({
                "action": "delay",
                "mode": "all",
                "delay": delay,
                "target": {"mode": "one"}
            });
            if let Some(direction) = direction {
                spec["direction"] = json!(direction);
            }
            spec
        })
}

fn twice_defaulted<S: Walk + serde::de::DeserializeOwned + PartialEq + std::fmt::Debug>(
    value: Value,
) -> (S, S) {
    let mut once: S = serde_json::from_value(value.clone()).unwrap();
    default_tree(registry(), Some(TEST_NAMESPACE), &mut once);
    let mut twice: S = serde_json::from_value(value).unwrap();
    default_tree(registry(), Some(TEST_NAMESPACE), &mut twice);
    default_tree(registry(), Some(TEST_NAMESPACE), &mut twice);
    (once, twice)
}

// =============================================================================
// Selector mode/value
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn integer_values_checked_against_mode(mode in valued_mode(), value in -200i64..300) {
        let errors = check_mode_value(&mode, &value.to_string(), &FieldPath::new("spec"));
        let percent = mode != SelectorMode::Fixed;
        let expect_rejected = value <= 0 || (percent && value > 100);
        prop_assert_eq!(!errors.is_empty(), expect_rejected, "mode {} value {}", mode, value);
        if expect_rejected {
            prop_assert!(errors.has_path("spec.value"));
        }
    }

    #[test]
    fn non_integer_values_rejected(mode in valued_mode(), value in "[a-z%.]{1,6}") {
        let errors = check_mode_value(&mode, &value, &FieldPath::new("spec"));
        prop_assert!(errors.has_path("spec.value"));
    }

    #[test]
    fn one_and_all_ignore_value(value in ".{0,10}") {
        let path = FieldPath::new("spec");
        prop_assert!(check_mode_value(&SelectorMode::One, &value, &path).is_empty());
        prop_assert!(check_mode_value(&SelectorMode::All, &value, &path).is_empty());
    }
}

// =============================================================================
// Leaf grammars
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn well_formed_durations_parse(literal in duration_literal()) {
        prop_assert!(parse_duration(&literal).is_ok(), "{}", literal);
    }

    #[test]
    fn malformed_durations_rejected(literal in bad_duration_literal()) {
        prop_assert!(parse_duration(&literal).is_err(), "{}", literal);
    }

    #[test]
    fn single_status_codes(code in -10i64..1100) {
        let accepted = parse_status_code(&code.to_string()).is_ok();
        prop_assert_eq!(accepted, code > 0 && code < 1000);
    }

    #[test]
    fn status_code_ranges(low in -10i64..1100, high in -10i64..1100) {
        let accepted = parse_status_code(&format!("{low}-{high}")).is_ok();
        let valid = |n: i64| n > 0 && n < 1000;
        // A leading minus sign splits differently and is never a valid range
        let expected = valid(low) && valid(high) && low < high;
        prop_assert_eq!(accepted, expected, "{}-{}", low, high);
    }
}

// =============================================================================
// Admission through the dispatcher
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn duration_field_follows_grammar(literal in duration_literal(), bad in bad_duration_literal()) {
        let spec = |duration: &str| json!({"action": "pod-kill", "mode": "one", "duration": duration});
        prop_assert!(create("PodChaos", spec(&literal)).is_ok());
        prop_assert!(rejected("PodChaos", spec(&bad)).has_path("spec.duration"));
    }

    #[test]
    fn defaulting_is_idempotent(pod in pod_chaos_spec(), network in network_delay_spec()) {
        let (once, twice) = twice_defaulted::<PodChaosSpec>(pod);
        prop_assert_eq!(once, twice);
        let (once, twice) = twice_defaulted::<NetworkChaosSpec>(network);
        prop_assert_eq!(once, twice);
        let (once, twice) = twice_defaulted::<StatusCheckSpec>(json!({"type": "HTTP"}));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn admitted_specs_round_trip(pod in pod_chaos_spec(), network in network_delay_spec()) {
        for (kind, spec) in [("PodChaos", pod), ("NetworkChaos", network)] {
            let defaulted = defaulted_spec(kind, spec);
            let encoded = serde_json::to_string(&defaulted).unwrap();
            let decoded: Value = serde_json::from_str(&encoded).unwrap();
            let decision = create(kind, decoded).unwrap();
            // Already defaulted: nothing left to patch
            prop_assert!(decision.patch.is_none());
        }
    }
}
