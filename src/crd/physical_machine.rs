//! PhysicalMachineChaos: faults injected by chaosd on physical machines
//!
//! The action selects one of many sub-specs, each stored under a key equal
//! to the action name (`stress-cpu`, `network-delay`, ...). Only the sub-spec
//! of the selected action is required; every sub-spec present is validated.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::common::{ChaosSpec, ChaosStatus, SelectorRef};
use super::selector::PhysicalMachineSelector;
use super::stress::check_memory_size;
use super::time::CLOCK_IDS;
use crate::validation::{
    Defaulter, FieldError, FieldPath, Root, Validator, Walk, check_percent, parse_duration,
};

fn require_text(v: &mut Validator<'_>, path: &FieldPath, field: &str, value: &str) {
    if value.is_empty() {
        v.push(FieldError::required(path.child(field), format!("{field} is required")));
    }
}

fn require_positive(v: &mut Validator<'_>, path: &FieldPath, field: &str, value: i64) {
    if value <= 0 {
        v.push(FieldError::invalid(
            path.child(field),
            value,
            format!("{field} should be greater than 0"),
        ));
    }
}

fn check_percent_field(v: &mut Validator<'_>, path: &FieldPath, field: &str, value: &str, allow_zero: bool) {
    if let Err(e) = check_percent(value, allow_zero) {
        v.push(FieldError::invalid(path.child(field), value, e));
    }
}

fn check_port(v: &mut Validator<'_>, path: &FieldPath, field: &str, port: i32) {
    if !(1..=65535).contains(&port) {
        v.push(FieldError::invalid(
            path.child(field),
            port,
            format!("port {port} is not in range 1-65535"),
        ));
    }
}

fn check_required_duration(v: &mut Validator<'_>, path: &FieldPath, field: &str, value: &str) {
    if value.is_empty() {
        require_text(v, path, field, value);
    } else if let Err(e) = parse_duration(value) {
        v.push(FieldError::invalid(path.child(field), value, e.to_string()));
    }
}

// ===== stress =====

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct StressCpuSpec {
    #[serde(default)]
    pub load: i32,
    #[serde(default)]
    pub workers: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

crate::walk_fields! {
    StressCpuSpec {}
    check = check_stress_cpu;
}

fn check_stress_cpu(spec: &StressCpuSpec, path: &FieldPath, v: &mut Validator<'_>) {
    if !(0..=100).contains(&spec.load) {
        v.push(FieldError::invalid(
            path.child("load"),
            spec.load,
            "load should be in 0-100",
        ));
    }
    if spec.workers == 0 {
        v.push(FieldError::invalid(path.child("workers"), spec.workers, "workers can't be 0"));
    } else if spec.workers < 0 {
        v.push(FieldError::invalid(
            path.child("workers"),
            spec.workers,
            "workers should always be positive",
        ));
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct StressMemorySpec {
    #[serde(default)]
    pub size: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
}

crate::walk_fields! {
    StressMemorySpec {}
    check = check_stress_memory;
}

fn check_stress_memory(spec: &StressMemorySpec, path: &FieldPath, v: &mut Validator<'_>) {
    if spec.size.is_empty() {
        require_text(v, path, "size", &spec.size);
    } else if let Err(e) = check_memory_size(&spec.size) {
        v.push(FieldError::invalid(
            path.child("size"),
            spec.size.as_str(),
            format!("incorrect bytes format: {e}"),
        ));
    }
}

// ===== disk =====

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct DiskPayloadSpec {
    #[serde(default)]
    pub size: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    /// Concurrent dd processes
    #[serde(default)]
    pub payload_process_num: u8,
}

crate::walk_fields! {
    DiskPayloadSpec {
        size: "size" => leaf(ByteSize),
        payload_process_num: "payload-process-num" => leaf(ProcessNum),
    }
    check = check_disk_payload;
}

fn check_disk_payload(spec: &DiskPayloadSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "size", &spec.size);
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct DiskFillSpec {
    #[serde(default)]
    pub size: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default)]
    pub fill_by_fallocate: bool,
}

crate::walk_fields! {
    DiskFillSpec {
        size: "size" => leaf(ByteSize),
    }
    check = check_disk_fill;
}

fn check_disk_fill(spec: &DiskFillSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "size", &spec.size);
}

// ===== network =====

/// Traffic filter shared by the netem actions
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkCommonSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub correlation: String,
    #[serde(default)]
    pub device: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_port: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub egress_port: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_protocol: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub accept_tcp_flags: String,
}

impl NetworkCommonSpec {
    fn check(&self, path: &FieldPath, v: &mut Validator<'_>) {
        check_percent_field(v, path, "correlation", &self.correlation, true);
        require_text(v, path, "device", &self.device);
        if !matches!(self.ip_protocol.as_str(), "" | "tcp" | "udp" | "icmp" | "all") {
            v.push(FieldError::not_supported(
                path.child("ip-protocol"),
                self.ip_protocol.as_str(),
                &["tcp", "udp", "icmp", "all"],
            ));
        }
    }
}

/// Loss, duplicate and corrupt share one shape
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkPercentSpec {
    #[serde(flatten)]
    pub common: NetworkCommonSpec,
    #[serde(default)]
    pub percent: String,
}

crate::walk_fields! {
    NetworkPercentSpec {}
    check = check_network_percent;
}

fn check_network_percent(spec: &NetworkPercentSpec, path: &FieldPath, v: &mut Validator<'_>) {
    spec.common.check(path, v);
    check_percent_field(v, path, "percent", &spec.percent, false);
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkDelaySpec {
    #[serde(flatten)]
    pub common: NetworkCommonSpec,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub jitter: String,
    #[serde(default)]
    pub latency: String,
}

crate::walk_fields! {
    NetworkDelaySpec {
        jitter: "jitter" => leaf(Duration),
    }
    check = check_network_delay;
}

fn check_network_delay(spec: &NetworkDelaySpec, path: &FieldPath, v: &mut Validator<'_>) {
    spec.common.check(path, v);
    check_required_duration(v, path, "latency", &spec.latency);
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkPartitionSpec {
    #[serde(default)]
    pub device: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_address: String,
    /// `to` or `from`
    #[serde(default)]
    pub direction: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_protocol: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub accept_tcp_flags: String,
}

crate::walk_fields! {
    NetworkPartitionSpec {}
    check = check_network_partition;
}

fn check_network_partition(spec: &NetworkPartitionSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "device", &spec.device);
    if !matches!(spec.direction.as_str(), "to" | "from") {
        v.push(FieldError::not_supported(
            path.child("direction"),
            spec.direction.as_str(),
            &["to", "from"],
        ));
    }
    if spec.ip_address.is_empty() && spec.hostname.is_empty() {
        v.push(FieldError::invalid(
            path.child("ip-address"),
            Value::Null,
            "one of ip-address and hostname is required",
        ));
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkDnsSpec {
    #[serde(default)]
    pub dns_server: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dns_domain_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dns_ip: String,
}

crate::walk_fields! {
    NetworkDnsSpec {}
    check = check_network_dns;
}

fn check_network_dns(spec: &NetworkDnsSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "dns-server", &spec.dns_server);
    if !spec.dns_ip.is_empty() && spec.dns_domain_name.is_empty() {
        v.push(FieldError::required(
            path.child("dns-domain-name"),
            "dns-domain-name is required when dns-ip is set",
        ));
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkBandwidthSpec {
    #[serde(default)]
    pub rate: String,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub buffer: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peakrate: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minburst: Option<u32>,
    #[serde(default)]
    pub device: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hostname: String,
}

crate::walk_fields! {
    NetworkBandwidthSpec {
        rate: "rate" => leaf(RateUnit),
    }
    check = check_network_bandwidth;
}

fn check_network_bandwidth(spec: &NetworkBandwidthSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "device", &spec.device);
    require_positive(v, path, "limit", i64::from(spec.limit));
    require_positive(v, path, "buffer", i64::from(spec.buffer));
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkFloodSpec {
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub port: String,
    #[serde(default)]
    pub parallel: i32,
    #[serde(default)]
    pub rate: String,
    #[serde(default)]
    pub duration: String,
}

crate::walk_fields! {
    NetworkFloodSpec {
        rate: "rate" => leaf(RateUnit),
    }
    check = check_network_flood;
}

fn check_network_flood(spec: &NetworkFloodSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "ip-address", &spec.ip_address);
    require_text(v, path, "port", &spec.port);
    require_positive(v, path, "parallel", i64::from(spec.parallel));
    check_required_duration(v, path, "duration", &spec.duration);
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct NetworkDownSpec {
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub duration: String,
}

crate::walk_fields! {
    NetworkDownSpec {}
    check = check_network_down;
}

fn check_network_down(spec: &NetworkDownSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "device", &spec.device);
    check_required_duration(v, path, "duration", &spec.duration);
}

// ===== process and clock =====

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSpec {
    /// Name or pid
    #[serde(default)]
    pub process: String,
    #[serde(default)]
    pub signal: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub recover_cmd: String,
}

crate::walk_fields! {
    ProcessSpec {}
    check = check_process;
}

fn check_process(spec: &ProcessSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "process", &spec.process);
    if !(0..=64).contains(&spec.signal) {
        v.push(FieldError::invalid(
            path.child("signal"),
            spec.signal,
            "signal should be in 0-64",
        ));
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct ClockSpec {
    #[serde(default)]
    pub pid: i32,
    #[serde(default)]
    pub time_offset: String,
    /// Comma separated clock ids, `CLOCK_REALTIME` by default
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub clock_ids_slice: String,
}

crate::walk_fields! {
    ClockSpec {}
    check = check_clock;
    defaults = default_clock;
}

fn default_clock(spec: &mut ClockSpec, _: &Defaulter<'_>) {
    if spec.clock_ids_slice.is_empty() {
        spec.clock_ids_slice = "CLOCK_REALTIME".to_string();
    }
}

fn check_clock(spec: &ClockSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_positive(v, path, "pid", i64::from(spec.pid));
    check_required_duration(v, path, "time-offset", &spec.time_offset);
    for clock in spec.clock_ids_slice.split(',').map(str::trim) {
        if !CLOCK_IDS.contains(&clock) {
            v.push(FieldError::not_supported(
                path.child("clock-ids-slice"),
                clock,
                CLOCK_IDS,
            ));
        }
    }
}

// ===== jvm =====

/// Agent location shared by the jvm actions
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct JvmCommonSpec {
    #[serde(default)]
    pub port: i32,
    #[serde(default)]
    pub pid: i32,
}

impl JvmCommonSpec {
    fn default_port(&mut self) {
        if self.port == 0 {
            self.port = super::jvm::DEFAULT_JVM_PORT;
        }
    }

    fn check(&self, path: &FieldPath, v: &mut Validator<'_>) {
        check_port(v, path, "port", self.port);
        require_positive(v, path, "pid", i64::from(self.pid));
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct JvmClassMethodSpec {
    #[serde(default)]
    pub class: String,
    #[serde(default)]
    pub method: String,
}

impl JvmClassMethodSpec {
    fn check(&self, path: &FieldPath, v: &mut Validator<'_>) {
        require_text(v, path, "class", &self.class);
        require_text(v, path, "method", &self.method);
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct JvmExceptionSpec {
    #[serde(flatten)]
    pub common: JvmCommonSpec,
    #[serde(flatten)]
    pub target: JvmClassMethodSpec,
    #[serde(default)]
    pub exception: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct JvmGcSpec {
    #[serde(flatten)]
    pub common: JvmCommonSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct JvmLatencySpec {
    #[serde(flatten)]
    pub common: JvmCommonSpec,
    #[serde(flatten)]
    pub target: JvmClassMethodSpec,
    /// Milliseconds
    #[serde(default)]
    pub latency: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct JvmReturnSpec {
    #[serde(flatten)]
    pub common: JvmCommonSpec,
    #[serde(flatten)]
    pub target: JvmClassMethodSpec,
    #[serde(default)]
    pub value: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct JvmStressSpec {
    #[serde(flatten)]
    pub common: JvmCommonSpec,
    #[serde(default)]
    pub cpu_count: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mem_type: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct JvmRuleDataSpec {
    #[serde(flatten)]
    pub common: JvmCommonSpec,
    #[serde(default)]
    pub rule_data: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct JvmMysqlSpec {
    #[serde(flatten)]
    pub common: JvmCommonSpec,
    #[serde(default)]
    pub mysql_connector_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub database: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub table: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sql_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub exception: String,
    #[serde(default)]
    pub latency: i32,
}

impl Walk for JvmExceptionSpec {
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
        self.common.check(path, v);
        self.target.check(path, v);
        require_text(v, path, "exception", &self.exception);
    }

    fn default_fields(&mut self, _: &Defaulter<'_>) {
        self.common.default_port();
    }
}

impl Walk for JvmGcSpec {
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
        self.common.check(path, v);
    }

    fn default_fields(&mut self, _: &Defaulter<'_>) {
        self.common.default_port();
    }
}

impl Walk for JvmLatencySpec {
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
        self.common.check(path, v);
        self.target.check(path, v);
        require_positive(v, path, "latency", i64::from(self.latency));
    }

    fn default_fields(&mut self, _: &Defaulter<'_>) {
        self.common.default_port();
    }
}

impl Walk for JvmReturnSpec {
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
        self.common.check(path, v);
        self.target.check(path, v);
        require_text(v, path, "value", &self.value);
    }

    fn default_fields(&mut self, _: &Defaulter<'_>) {
        self.common.default_port();
    }
}

impl Walk for JvmStressSpec {
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
        self.common.check(path, v);
        match (self.cpu_count > 0, self.mem_type.is_empty()) {
            (false, true) => v.push(FieldError::invalid(
                path.clone(),
                Value::Null,
                "must set one of cpu-count and mem-type",
            )),
            (true, false) => v.push(FieldError::invalid(
                path.clone(),
                Value::Null,
                "inject stress on both CPU and memory is not supported",
            )),
            (false, false) if !matches!(self.mem_type.as_str(), "stack" | "heap") => {
                v.push(FieldError::not_supported(
                    path.child("mem-type"),
                    self.mem_type.as_str(),
                    &["stack", "heap"],
                ));
            }
            _ => {}
        }
    }

    fn default_fields(&mut self, _: &Defaulter<'_>) {
        self.common.default_port();
    }
}

impl Walk for JvmRuleDataSpec {
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
        self.common.check(path, v);
        require_text(v, path, "rule-data", &self.rule_data);
    }

    fn default_fields(&mut self, _: &Defaulter<'_>) {
        self.common.default_port();
    }
}

impl Walk for JvmMysqlSpec {
    fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
        self.common.check(path, v);
        if !matches!(self.mysql_connector_version.as_str(), "5" | "8") {
            v.push(FieldError::not_supported(
                path.child("mysql-connector-version"),
                self.mysql_connector_version.as_str(),
                &["5", "8"],
            ));
        }
        if self.exception.is_empty() && self.latency <= 0 {
            v.push(FieldError::invalid(
                path.clone(),
                Value::Null,
                "must set one of exception and latency",
            ));
        }
    }

    fn default_fields(&mut self, _: &Defaulter<'_>) {
        self.common.default_port();
    }
}

// ===== redis =====

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct RedisCommonSpec {
    #[serde(default)]
    pub addr: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct RedisExpirationSpec {
    #[serde(flatten)]
    pub common: RedisCommonSpec,
    #[serde(default)]
    pub expiration: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub key: String,
    /// One of the EXPIRE options: NX, XX, GT, LT
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub option: String,
}

crate::walk_fields! {
    RedisExpirationSpec {}
    check = check_redis_expiration;
}

fn check_redis_expiration(spec: &RedisExpirationSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "addr", &spec.common.addr);
    check_required_duration(v, path, "expiration", &spec.expiration);
    if !matches!(spec.option.as_str(), "" | "NX" | "XX" | "GT" | "LT") {
        v.push(FieldError::not_supported(
            path.child("option"),
            spec.option.as_str(),
            &["NX", "XX", "GT", "LT"],
        ));
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct RedisPenetrationSpec {
    #[serde(flatten)]
    pub common: RedisCommonSpec,
    #[serde(default)]
    pub request_num: i32,
}

crate::walk_fields! {
    RedisPenetrationSpec {}
    check = check_redis_penetration;
}

fn check_redis_penetration(spec: &RedisPenetrationSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "addr", &spec.common.addr);
    require_positive(v, path, "request-num", i64::from(spec.request_num));
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct RedisCacheLimitSpec {
    #[serde(flatten)]
    pub common: RedisCommonSpec,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cache_size: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub percent: String,
}

crate::walk_fields! {
    RedisCacheLimitSpec {
        cache_size: "cache-size" => leaf(ByteSize),
    }
    check = check_redis_cache_limit;
}

fn check_redis_cache_limit(spec: &RedisCacheLimitSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "addr", &spec.common.addr);
    match (spec.cache_size.is_empty(), spec.percent.is_empty()) {
        (true, true) => v.push(FieldError::invalid(
            path.clone(),
            Value::Null,
            "one of cache-size and percent is required",
        )),
        (false, false) => v.push(FieldError::invalid(
            path.clone(),
            Value::Null,
            "only one of cache-size and percent could be specified",
        )),
        (true, false) => check_percent_field(v, path, "percent", &spec.percent, false),
        (false, true) => {}
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct RedisRestartSpec {
    #[serde(flatten)]
    pub common: RedisCommonSpec,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub conf: String,
    #[serde(default)]
    pub flush_config: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub redis_path: String,
}

crate::walk_fields! {
    RedisRestartSpec {}
    check = check_redis_restart;
}

fn check_redis_restart(spec: &RedisRestartSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "addr", &spec.common.addr);
}

// ===== kafka =====

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct KafkaCommonSpec {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
}

impl KafkaCommonSpec {
    fn check(&self, path: &FieldPath, v: &mut Validator<'_>) {
        require_text(v, path, "topic", &self.topic);
        require_text(v, path, "host", &self.host);
        check_port(v, path, "port", self.port);
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct KafkaFillSpec {
    #[serde(flatten)]
    pub common: KafkaCommonSpec,
    #[serde(default)]
    pub message_size: i32,
    #[serde(default)]
    pub max_bytes: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reload_command: String,
}

crate::walk_fields! {
    KafkaFillSpec {}
    check = check_kafka_fill;
}

fn check_kafka_fill(spec: &KafkaFillSpec, path: &FieldPath, v: &mut Validator<'_>) {
    spec.common.check(path, v);
    require_positive(v, path, "message-size", i64::from(spec.message_size));
    require_positive(v, path, "max-bytes", spec.max_bytes);
    require_text(v, path, "reload-command", &spec.reload_command);
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct KafkaFloodSpec {
    #[serde(flatten)]
    pub common: KafkaCommonSpec,
    #[serde(default)]
    pub message_size: i32,
    #[serde(default)]
    pub threads: i32,
}

crate::walk_fields! {
    KafkaFloodSpec {}
    check = check_kafka_flood;
}

fn check_kafka_flood(spec: &KafkaFloodSpec, path: &FieldPath, v: &mut Validator<'_>) {
    spec.common.check(path, v);
    require_positive(v, path, "message-size", i64::from(spec.message_size));
    require_positive(v, path, "threads", i64::from(spec.threads));
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct KafkaIoSpec {
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub partition: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub config_file: String,
    #[serde(default)]
    pub non_readable: bool,
    #[serde(default)]
    pub non_writable: bool,
}

crate::walk_fields! {
    KafkaIoSpec {}
    check = check_kafka_io;
}

fn check_kafka_io(spec: &KafkaIoSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "topic", &spec.topic);
    if !spec.non_readable && !spec.non_writable {
        v.push(FieldError::invalid(
            path.clone(),
            Value::Null,
            "at least one of non-readable and non-writable is required",
        ));
    }
}

// ===== http =====

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct HttpCommonSpec {
    /// `Request` or `Response`
    #[serde(default)]
    pub target: String,
    #[serde(default)]
    pub port: i32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub proxy_ports: Vec<u32>,
}

impl HttpCommonSpec {
    fn check(&self, path: &FieldPath, v: &mut Validator<'_>) {
        if !matches!(self.target.as_str(), "Request" | "Response") {
            v.push(FieldError::not_supported(
                path.child("target"),
                self.target.as_str(),
                &["Request", "Response"],
            ));
        }
        check_port(v, path, "port", self.port);
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct HttpAbortSpec {
    #[serde(flatten)]
    pub common: HttpCommonSpec,
}

crate::walk_fields! {
    HttpAbortSpec {}
    check = check_http_abort;
}

fn check_http_abort(spec: &HttpAbortSpec, path: &FieldPath, v: &mut Validator<'_>) {
    spec.common.check(path, v);
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct HttpDelaySpec {
    #[serde(flatten)]
    pub common: HttpCommonSpec,
    #[serde(default)]
    pub delay: String,
}

crate::walk_fields! {
    HttpDelaySpec {}
    check = check_http_delay;
}

fn check_http_delay(spec: &HttpDelaySpec, path: &FieldPath, v: &mut Validator<'_>) {
    spec.common.check(path, v);
    check_required_duration(v, path, "delay", &spec.delay);
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct HttpConfigSpec {
    #[serde(default)]
    pub file_path: String,
}

crate::walk_fields! {
    HttpConfigSpec {}
    check = check_http_config;
}

fn check_http_config(spec: &HttpConfigSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "file-path", &spec.file_path);
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct HttpRequestSpec {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub enable_conn_pool: bool,
    #[serde(default)]
    pub count: i32,
}

crate::walk_fields! {
    HttpRequestSpec {}
    check = check_http_request;
}

fn check_http_request(spec: &HttpRequestSpec, path: &FieldPath, v: &mut Validator<'_>) {
    if spec.url.is_empty() {
        require_text(v, path, "url", &spec.url);
    } else if let Err(e) = url::Url::parse(&spec.url) {
        v.push(FieldError::invalid(path.child("url"), spec.url.as_str(), e.to_string()));
    }
    require_positive(v, path, "count", i64::from(spec.count));
}

// ===== file =====

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct FileCreateSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dir_name: String,
}

crate::walk_fields! {
    FileCreateSpec {}
    check = check_file_create;
}

fn check_file_create(spec: &FileCreateSpec, path: &FieldPath, v: &mut Validator<'_>) {
    check_file_or_dir(&spec.file_name, &spec.dir_name, path, v);
}

fn check_file_or_dir(file_name: &str, dir_name: &str, path: &FieldPath, v: &mut Validator<'_>) {
    match (file_name.is_empty(), dir_name.is_empty()) {
        (true, true) => v.push(FieldError::invalid(
            path.clone(),
            Value::Null,
            "one of file-name and dir-name is required",
        )),
        (false, false) => v.push(FieldError::invalid(
            path.clone(),
            Value::Null,
            "only one of file-name and dir-name could be specified",
        )),
        _ => {}
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct FileModifyPrivilegeSpec {
    #[serde(default)]
    pub file_name: String,
    /// Octal mode such as 777
    #[serde(default)]
    pub privilege: u32,
}

crate::walk_fields! {
    FileModifyPrivilegeSpec {}
    check = check_file_modify;
}

fn check_file_modify(spec: &FileModifyPrivilegeSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "file-name", &spec.file_name);
    require_positive(v, path, "privilege", i64::from(spec.privilege));
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct FileDeleteSpec {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub file_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dir_name: String,
}

crate::walk_fields! {
    FileDeleteSpec {}
    check = check_file_delete;
}

fn check_file_delete(spec: &FileDeleteSpec, path: &FieldPath, v: &mut Validator<'_>) {
    check_file_or_dir(&spec.file_name, &spec.dir_name, path, v);
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct FileRenameSpec {
    #[serde(default)]
    pub source_file: String,
    #[serde(default)]
    pub dest_file: String,
}

crate::walk_fields! {
    FileRenameSpec {}
    check = check_file_rename;
}

fn check_file_rename(spec: &FileRenameSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "source-file", &spec.source_file);
    require_text(v, path, "dest-file", &spec.dest_file);
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct FileAppendSpec {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub count: i32,
}

crate::walk_fields! {
    FileAppendSpec {}
    check = check_file_append;
    defaults = default_file_append;
}

fn default_file_append(spec: &mut FileAppendSpec, _: &Defaulter<'_>) {
    if spec.count == 0 {
        spec.count = 1;
    }
}

fn check_file_append(spec: &FileAppendSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "file-name", &spec.file_name);
    require_text(v, path, "data", &spec.data);
    require_positive(v, path, "count", i64::from(spec.count));
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct FileReplaceSpec {
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub origin_string: String,
    #[serde(default)]
    pub dest_string: String,
    /// Line to replace in, every line when 0
    #[serde(default)]
    pub line: i32,
}

crate::walk_fields! {
    FileReplaceSpec {}
    check = check_file_replace;
}

fn check_file_replace(spec: &FileReplaceSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "file-name", &spec.file_name);
    require_text(v, path, "origin-string", &spec.origin_string);
    require_text(v, path, "dest-string", &spec.dest_string);
    if spec.line < 0 {
        v.push(FieldError::invalid(path.child("line"), spec.line, "line should not be negative"));
    }
}

// ===== vm and user defined =====

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub struct VmSpec {
    #[serde(default)]
    pub vm_name: String,
}

crate::walk_fields! {
    VmSpec {}
    check = check_vm;
}

fn check_vm(spec: &VmSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "vm-name", &spec.vm_name);
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserDefinedSpec {
    #[serde(default)]
    pub attack_cmd: String,
    #[serde(default)]
    pub recover_cmd: String,
}

crate::walk_fields! {
    UserDefinedSpec {}
    check = check_user_defined;
}

fn check_user_defined(spec: &UserDefinedSpec, path: &FieldPath, v: &mut Validator<'_>) {
    require_text(v, path, "attackCmd", &spec.attack_cmd);
    require_text(v, path, "recoverCmd", &spec.recover_cmd);
}

/// Declares the action enum together with the per-action sub-spec table
macro_rules! exp_info {
    ($( $variant:ident => $wire:literal, $field:ident : $ty:ty; )+) => {
        string_enum! {
            pub enum PhysicalMachineAction {
                $( $variant => $wire, )+
            }
        }

        /// Sub-specs keyed by action name
        #[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
        pub struct ExpInfo {
            $(
                #[serde(default, rename = $wire, skip_serializing_if = "Option::is_none")]
                pub $field: Option<$ty>,
            )+
        }

        impl ExpInfo {
            /// The sub-spec of `action` is set
            pub fn has(&self, action: &PhysicalMachineAction) -> bool {
                match action {
                    $( PhysicalMachineAction::$variant => self.$field.is_some(), )+
                    PhysicalMachineAction::Other(_) => false,
                }
            }
        }

        impl Walk for ExpInfo {
            fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
                $( self.$field.validate_fields(&path.child($wire), v); )+
            }

            fn default_fields(&mut self, d: &Defaulter<'_>) {
                $( self.$field.default_fields(d); )+
            }
        }
    };
}

exp_info! {
    StressCpu => "stress-cpu", stress_cpu: StressCpuSpec;
    StressMem => "stress-mem", stress_memory: StressMemorySpec;
    DiskReadPayload => "disk-read-payload", disk_read_payload: DiskPayloadSpec;
    DiskWritePayload => "disk-write-payload", disk_write_payload: DiskPayloadSpec;
    DiskFill => "disk-fill", disk_fill: DiskFillSpec;
    NetworkCorrupt => "network-corrupt", network_corrupt: NetworkPercentSpec;
    NetworkDuplicate => "network-duplicate", network_duplicate: NetworkPercentSpec;
    NetworkLoss => "network-loss", network_loss: NetworkPercentSpec;
    NetworkDelay => "network-delay", network_delay: NetworkDelaySpec;
    NetworkPartition => "network-partition", network_partition: NetworkPartitionSpec;
    NetworkDns => "network-dns", network_dns: NetworkDnsSpec;
    NetworkBandwidth => "network-bandwidth", network_bandwidth: NetworkBandwidthSpec;
    NetworkFlood => "network-flood", network_flood: NetworkFloodSpec;
    NetworkDown => "network-down", network_down: NetworkDownSpec;
    Process => "process", process: ProcessSpec;
    JvmException => "jvm-exception", jvm_exception: JvmExceptionSpec;
    JvmGc => "jvm-gc", jvm_gc: JvmGcSpec;
    JvmLatency => "jvm-latency", jvm_latency: JvmLatencySpec;
    JvmReturn => "jvm-return", jvm_return: JvmReturnSpec;
    JvmStress => "jvm-stress", jvm_stress: JvmStressSpec;
    JvmRuleData => "jvm-rule-data", jvm_rule_data: JvmRuleDataSpec;
    JvmMysql => "jvm-mysql", jvm_mysql: JvmMysqlSpec;
    Clock => "clock", clock: ClockSpec;
    RedisExpiration => "redis-expiration", redis_expiration: RedisExpirationSpec;
    RedisPenetration => "redis-penetration", redis_penetration: RedisPenetrationSpec;
    RedisCacheLimit => "redis-cacheLimit", redis_cache_limit: RedisCacheLimitSpec;
    RedisRestart => "redis-restart", redis_restart: RedisRestartSpec;
    RedisStop => "redis-stop", redis_stop: RedisRestartSpec;
    KafkaFill => "kafka-fill", kafka_fill: KafkaFillSpec;
    KafkaFlood => "kafka-flood", kafka_flood: KafkaFloodSpec;
    KafkaIo => "kafka-io", kafka_io: KafkaIoSpec;
    HttpAbort => "http-abort", http_abort: HttpAbortSpec;
    HttpDelay => "http-delay", http_delay: HttpDelaySpec;
    HttpConfig => "http-config", http_config: HttpConfigSpec;
    HttpRequest => "http-request", http_request: HttpRequestSpec;
    FileCreate => "file-create", file_create: FileCreateSpec;
    FileModify => "file-modify", file_modify: FileModifyPrivilegeSpec;
    FileDelete => "file-delete", file_delete: FileDeleteSpec;
    FileRename => "file-rename", file_rename: FileRenameSpec;
    FileAppend => "file-append", file_append: FileAppendSpec;
    FileReplace => "file-replace", file_replace: FileReplaceSpec;
    Vm => "vm", vm: VmSpec;
    UserDefined => "user_defined", user_defined: UserDefinedSpec;
}

/// PhysicalMachineChaos injects faults into machines running chaosd
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "chaos-mesh.org",
    version = "v1alpha1",
    kind = "PhysicalMachineChaos",
    plural = "physicalmachinechaos",
    namespaced,
    status = "ChaosStatus",
    printcolumn = r#"{"name":"Action", "type":"string", "jsonPath":".spec.action"}"#,
    printcolumn = r#"{"name":"Duration", "type":"string", "jsonPath":".spec.duration"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalMachineChaosSpec {
    #[serde(default)]
    pub action: PhysicalMachineAction,

    #[serde(flatten)]
    pub selector: PhysicalMachineSelector,

    #[serde(flatten)]
    pub exp_info: ExpInfo,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub remote_cluster: String,
}

crate::walk_fields! {
    PhysicalMachineChaosSpec {
        selector: "selector" => inline,
        exp_info: "expInfo" => inline,
        duration: "duration" => leaf(Duration),
    }
    check = check_physical_machine_chaos;
}

fn check_physical_machine_chaos(
    spec: &PhysicalMachineChaosSpec,
    path: &FieldPath,
    v: &mut Validator<'_>,
) {
    if let Some(error) = spec.action.check(path.child("action")) {
        v.push(error);
        return;
    }
    if !spec.exp_info.has(&spec.action) {
        let action = spec.action.as_str();
        v.push(FieldError::required(
            path.child(action),
            format!("the spec of action {action} is required"),
        ));
    }
}

impl Root for PhysicalMachineChaosSpec {
    fn action(&self) -> Option<&str> {
        Some(self.action.as_str())
    }
}

impl ChaosSpec for PhysicalMachineChaosSpec {
    fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
        vec![(".", SelectorRef::PhysicalMachine(&self.selector))]
    }
}
