//! IOChaos: filesystem faults injected through a FUSE proxy

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{ChaosSpec, ChaosStatus, SelectorRef};
use super::selector::ContainerSelector;
use crate::validation::{Defaulter, FieldError, FieldPath, Root, Validator};

string_enum! {
    pub enum IoChaosAction {
        Latency => "latency",
        Fault => "fault",
        AttrOverride => "attrOverride",
        Mistake => "mistake",
    }
}

string_enum! {
    /// Filesystem operations that can be targeted
    pub enum IoMethod {
        Lookup => "lookup",
        Forget => "forget",
        GetAttr => "getattr",
        SetAttr => "setattr",
        ReadLink => "readlink",
        MkNod => "mknod",
        MkDir => "mkdir",
        Unlink => "unlink",
        RmDir => "rmdir",
        Symlink => "symlink",
        Rename => "rename",
        Link => "link",
        Open => "open",
        Read => "read",
        Write => "write",
        StatFs => "statfs",
        Release => "release",
        Fsync => "fsync",
        SetXAttr => "setxattr",
        GetXAttr => "getxattr",
        ListXAttr => "listxattr",
        RemoveXAttr => "removexattr",
        Flush => "flush",
        OpenDir => "opendir",
        ReadDir => "readdir",
        ReleaseDir => "releasedir",
        FsyncDir => "fsyncdir",
        Access => "access",
        Create => "create",
        GetLk => "getlk",
        SetLk => "setlk",
        Bmap => "bmap",
    }
}

string_enum! {
    /// Bytes used to overwrite data on a mistake
    pub enum FillingType {
        Zero => "zero",
        Random => "random",
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct Timespec {
    pub sec: i64,
    pub nsec: i64,
}

/// Attributes reported instead of the real ones
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttrOverrideSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ino: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocks: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub atime: Option<Timespec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtime: Option<Timespec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctime: Option<Timespec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perm: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nlink: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rdev: Option<u32>,
}

/// Wrong data written or read
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MistakeSpec {
    #[serde(default)]
    pub filling: FillingType,
    #[serde(default)]
    pub max_occurrences: i64,
    #[serde(default)]
    pub max_length: i64,
}

crate::walk_fields! {
    MistakeSpec {}
    check = check_mistake;
}

fn check_mistake(mistake: &MistakeSpec, path: &FieldPath, v: &mut Validator<'_>) {
    v.extend(mistake.filling.check(path.child("filling")));
    if mistake.max_occurrences <= 0 {
        v.push(FieldError::invalid(
            path.child("maxOccurrences"),
            mistake.max_occurrences,
            "maxOccurrences should be greater than 0",
        ));
    }
    if mistake.max_length <= 0 {
        v.push(FieldError::invalid(
            path.child("maxLength"),
            mistake.max_length,
            "maxLength should be greater than 0",
        ));
    }
}

/// IOChaos injects filesystem faults into a volume of the selected containers
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "IOChaos",
    plural = "iochaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Action", "type":"string", "jsonPath":".spec.action"}"#,
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct IOChaosSpec {
    #[serde(flatten)]
    pub container_selector: ContainerSelector,

    #[serde(default)]
    pub action: IoChaosAction,

    /// Latency added to each operation
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub delay: String,

    /// Error number returned by faulted operations
    #[serde(default, skip_serializing_if = "is_zero")]
    pub errno: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attr: Option<AttrOverrideSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mistake: Option<MistakeSpec>,

    /// Glob of affected files, all files by default
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<IoMethod>,

    /// Share of operations affected
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percent: Option<i32>,

    /// Mount point of the volume in the target container
    #[serde(default)]
    pub volume_path: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

crate::walk_fields! {
    IOChaosSpec {
        container_selector: "containerSelector" => inline,
        delay: "delay" => leaf(Duration),
        mistake: "mistake" => nested,
        percent: "percent" => leaf(Percent, nilable),
        duration: "duration" => leaf(Duration),
    }
    check = check_io_chaos;
    defaults = default_percent;
}

fn default_percent(spec: &mut IOChaosSpec, _: &Defaulter<'_>) {
    if spec.percent.is_none() {
        spec.percent = Some(100);
    }
}

fn check_io_chaos(spec: &IOChaosSpec, path: &FieldPath, v: &mut Validator<'_>) {
    v.extend(spec.action.check(path.child("action")));
    for (i, method) in spec.methods.iter().enumerate() {
        v.extend(method.check(path.child("methods").index(i)));
    }
    if spec.volume_path.is_empty() {
        v.push(FieldError::required(
            path.child("volumePath"),
            "the path of volume is required",
        ));
    }
    let action = &spec.action;
    match action {
        IoChaosAction::Latency if spec.delay.is_empty() => v.push(FieldError::required(
            path.child("delay"),
            "delay is required on latency action",
        )),
        IoChaosAction::Fault if spec.errno == 0 => v.push(FieldError::invalid(
            path.child("errno"),
            spec.errno,
            "errno should not be 0 on fault action",
        )),
        IoChaosAction::AttrOverride if spec.attr.is_none() => v.push(FieldError::required(
            path.child("attr"),
            "attr is required on attrOverride action",
        )),
        IoChaosAction::Mistake if spec.mistake.is_none() => v.push(FieldError::required(
            path.child("mistake"),
            "mistake is required on mistake action",
        )),
        _ => {}
    }
}

impl Root for IOChaosSpec {
    fn action(&self) -> Option<&str> {
        Some(self.action.as_str())
    }
}

impl ChaosSpec for IOChaosSpec {
    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        vec![(".", SelectorRef::Container(&self.container_selector))]
    }
}
