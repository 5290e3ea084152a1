//! Builtin leaf validators and defaulters

use super::duration::parse_duration;
use super::field::{ErrorList, FieldError, FieldPath};
use super::registry::{Hooks, Tag, ValueType};
use super::units::{parse_byte_size, parse_rate, parse_status_code};
use super::walker::{DefaultContext, FieldAttrs, LeafSlot, LeafValue, Root};

/// Actions accepted by fields tagged `DiskAction`
pub const DISK_ACTIONS: &[&str] = &["limit", "delay"];

/// Every builtin tag with its value type and hooks
pub(crate) fn builtins() -> [(Tag, ValueType, Hooks); 13] {
    [
        (
            Tag::Duration,
            ValueType::Text,
            Hooks::both(validate_duration, default_literal),
        ),
        (Tag::Percent, ValueType::Integer, Hooks::validate(validate_percent)),
        (
            Tag::FloatStr,
            ValueType::Text,
            Hooks::both(validate_float_str, default_literal),
        ),
        (
            Tag::ProcessNum,
            ValueType::Byte,
            Hooks::default_only(default_process_num),
        ),
        (Tag::DiskName, ValueType::Text, Hooks::validate(require_disk_name)),
        (Tag::EbsVolume, ValueType::Text, Hooks::validate(require_ebs_volume)),
        (
            Tag::AwsDeviceName,
            ValueType::Text,
            Hooks::validate(require_aws_device_name),
        ),
        (Tag::Lun, ValueType::Integer, Hooks::validate(require_lun)),
        (
            Tag::GcpDeviceNames,
            ValueType::TextList,
            Hooks::validate(require_gcp_device_names),
        ),
        (
            Tag::StatusCode,
            ValueType::Text,
            Hooks::validate(validate_status_code),
        ),
        (
            Tag::DiskAction,
            ValueType::Text,
            Hooks::validate(validate_disk_action),
        ),
        (Tag::RateUnit, ValueType::Text, Hooks::validate(validate_rate_unit)),
        (Tag::ByteSize, ValueType::Text, Hooks::validate(validate_byte_size)),
    ]
}

fn text(value: LeafValue<'_>) -> Option<&str> {
    match value {
        LeafValue::Text(v) => v,
        _ => None,
    }
}

fn validate_duration(value: LeafValue<'_>, _: &dyn Root, path: &FieldPath) -> ErrorList {
    match text(value) {
        Some(s) if !s.is_empty() => match parse_duration(s) {
            Ok(_) => ErrorList::new(),
            Err(e) => FieldError::invalid(path.clone(), s, e.to_string()).into(),
        },
        _ => ErrorList::new(),
    }
}

fn validate_percent(value: LeafValue<'_>, _: &dyn Root, path: &FieldPath) -> ErrorList {
    match value {
        LeafValue::Integer(Some(p)) if !(0..=100).contains(&p) => {
            FieldError::invalid(path.clone(), p, "percent field should be in 0-100").into()
        }
        _ => ErrorList::new(),
    }
}

fn validate_float_str(value: LeafValue<'_>, _: &dyn Root, path: &FieldPath) -> ErrorList {
    match text(value) {
        Some(s) => match s.parse::<f32>() {
            Ok(_) => ErrorList::new(),
            Err(e) => FieldError::invalid(
                path.clone(),
                s,
                format!("parse float field error: {e}"),
            )
            .into(),
        },
        None => ErrorList::new(),
    }
}

fn validate_status_code(value: LeafValue<'_>, _: &dyn Root, path: &FieldPath) -> ErrorList {
    match text(value) {
        Some(code) => match parse_status_code(code) {
            Ok(_) => ErrorList::new(),
            Err(e) => FieldError::invalid(path.clone(), code, e).into(),
        },
        None => ErrorList::new(),
    }
}

fn validate_disk_action(value: LeafValue<'_>, _: &dyn Root, path: &FieldPath) -> ErrorList {
    match text(value) {
        Some(action) if !DISK_ACTIONS.contains(&action) => {
            FieldError::not_supported(path.clone(), action, DISK_ACTIONS).into()
        }
        _ => ErrorList::new(),
    }
}

fn validate_rate_unit(value: LeafValue<'_>, _: &dyn Root, path: &FieldPath) -> ErrorList {
    match text(value) {
        Some(rate) => match parse_rate(rate) {
            Ok(_) => ErrorList::new(),
            Err(e) => FieldError::invalid(path.clone(), rate, e).into(),
        },
        None => ErrorList::new(),
    }
}

fn validate_byte_size(value: LeafValue<'_>, _: &dyn Root, path: &FieldPath) -> ErrorList {
    match text(value) {
        Some(size) if !size.is_empty() => match parse_byte_size(size) {
            Ok(_) => ErrorList::new(),
            Err(e) => FieldError::invalid(path.clone(), size, e).into(),
        },
        _ => ErrorList::new(),
    }
}

/// Required when the root action is one of `actions`
fn require_on_action(
    value: LeafValue<'_>,
    root: &dyn Root,
    path: &FieldPath,
    actions: &[&str],
    detail: &str,
) -> ErrorList {
    let selected = root.action().is_some_and(|a| actions.contains(&a));
    if selected && value.is_empty() {
        FieldError::required(path.clone(), detail).into()
    } else {
        ErrorList::new()
    }
}

fn require_disk_name(value: LeafValue<'_>, root: &dyn Root, path: &FieldPath) -> ErrorList {
    require_on_action(
        value,
        root,
        path,
        &["disk-detach"],
        "disk name is required on disk-detach action",
    )
}

fn require_lun(value: LeafValue<'_>, root: &dyn Root, path: &FieldPath) -> ErrorList {
    require_on_action(
        value,
        root,
        path,
        &["disk-detach"],
        "LUN is required on disk-detach action",
    )
}

fn require_ebs_volume(value: LeafValue<'_>, root: &dyn Root, path: &FieldPath) -> ErrorList {
    require_on_action(
        value,
        root,
        path,
        &["detach-volume"],
        "the ID of EBS volume is required on detach-volume action",
    )
}

fn require_aws_device_name(value: LeafValue<'_>, root: &dyn Root, path: &FieldPath) -> ErrorList {
    require_on_action(
        value,
        root,
        path,
        &["detach-volume"],
        "the name of device is required on detach-volume action",
    )
}

fn require_gcp_device_names(value: LeafValue<'_>, root: &dyn Root, path: &FieldPath) -> ErrorList {
    require_on_action(
        value,
        root,
        path,
        &["disk-loss"],
        "at least one device name is required on disk-loss action",
    )
}

/// Fill an empty text leaf with the field's `default` literal
fn default_literal(slot: LeafSlot<'_>, _: &DefaultContext<'_>, attrs: &FieldAttrs) {
    let Some(default) = attrs.default else {
        return;
    };
    match slot {
        LeafSlot::Text(s) if s.is_empty() => *s = default.to_string(),
        LeafSlot::OptText(s) if s.as_deref().is_none_or(str::is_empty) => {
            *s = Some(default.to_string());
        }
        _ => {}
    }
}

fn default_process_num(slot: LeafSlot<'_>, _: &DefaultContext<'_>, _: &FieldAttrs) {
    if let LeafSlot::Byte(n) = slot
        && *n == 0
    {
        *n = 1;
    }
}
