//! The closed set of chaos kinds
//!
//! One table drives everything that has to enumerate kinds: the
//! [`ChaosKind`] discriminator, the [`EmbedChaos`] payload carried by
//! schedules and workflow templates, the [`ChaosObject`] view of every
//! resource, its admission entry and the [`decode_chaos`] factory.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::*;
use crate::error::AdmissionError;
use crate::validation::{Defaulter, FieldPath, Validator, Walk};
use crate::webhooks::{AdmissionObject, KindEntry};

macro_rules! chaos_kinds {
    ($( $kind:ident => $key:literal, $field:ident : $spec:ty; )+) => {
        /// Kind of a chaos resource
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ChaosKind {
            $( $kind, )+
        }

        impl ChaosKind {
            pub const ALL: &'static [ChaosKind] = &[$( ChaosKind::$kind ),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $( ChaosKind::$kind => stringify!($kind), )+
                }
            }

            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( stringify!($kind) => Some(ChaosKind::$kind), )+
                    _ => None,
                }
            }

            /// Field holding a spec of this kind in schedules and templates
            pub fn json_key(self) -> &'static str {
                match self {
                    $( ChaosKind::$kind => $key, )+
                }
            }
        }

        /// Chaos specs embedded in a schedule or a workflow template.
        ///
        /// At most one is expected to be set, the one named by the owning
        /// object's type.
        #[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
        pub struct EmbedChaos {
            $(
                #[serde(default, rename = $key, skip_serializing_if = "Option::is_none")]
                pub $field: Option<Box<$spec>>,
            )+
        }

        impl EmbedChaos {
            /// Kinds whose spec is set
            pub fn kinds(&self) -> Vec<ChaosKind> {
                let mut kinds = Vec::new();
                $(
                    if self.$field.is_some() {
                        kinds.push(ChaosKind::$kind);
                    }
                )+
                kinds
            }

            pub fn is_empty(&self) -> bool {
                self.kinds().is_empty()
            }

            pub fn contains(&self, kind: ChaosKind) -> bool {
                match kind {
                    $( ChaosKind::$kind => self.$field.is_some(), )+
                }
            }

            /// `duration` of the spec of `kind`; `None` when that spec is not set
            pub fn duration(&self, kind: ChaosKind) -> Option<Option<&str>> {
                match kind {
                    $( ChaosKind::$kind => self.$field.as_deref().map(ChaosSpec::duration), )+
                }
            }

            /// Serialized spec of `kind`
            pub fn spec_value(&self, kind: ChaosKind) -> Option<serde_json::Result<Value>> {
                match kind {
                    $( ChaosKind::$kind => self.$field.as_deref().map(serde_json::to_value), )+
                }
            }
        }

        impl Walk for EmbedChaos {
            /// Each embedded spec is validated with itself as root, so that
            /// action-conditional rules see the embedded action.
            fn validate_fields(&self, path: &FieldPath, v: &mut Validator<'_>) {
                $(
                    if let Some(spec) = self.$field.as_deref() {
                        v.with_root(spec, |v| spec.validate_fields(&path.child($key), v));
                    }
                )+
            }

            fn default_fields(&mut self, d: &Defaulter<'_>) {
                $( self.$field.default_fields(d); )+
            }
        }

        $(
            impl ChaosObject for $kind {
                fn kind(&self) -> &'static str {
                    stringify!($kind)
                }

                fn meta(&self) -> &ObjectMeta {
                    &self.metadata
                }

                fn duration(&self) -> Option<&str> {
                    ChaosSpec::duration(&self.spec)
                }

                fn is_one_shot(&self) -> bool {
                    ChaosSpec::is_one_shot(&self.spec)
                }

                fn selector_specs(&self) -> Vec<(&'static str, SelectorRef<'_>)> {
                    self.spec.selector_specs()
                }

                fn status(&self) -> Option<&ChaosStatus> {
                    self.status.as_ref()
                }
            }

            impl AdmissionObject for $kind {
                type Spec = $spec;

                const SPEC_IMMUTABLE: bool = <$spec as ChaosSpec>::SPEC_IMMUTABLE;

                fn spec(&self) -> &$spec {
                    &self.spec
                }

                fn spec_mut(&mut self) -> &mut $spec {
                    &mut self.spec
                }
            }
        )+

        /// Decode a chaos resource of kind `kind` from its JSON form
        pub fn decode_chaos(kind: &str, value: Value) -> Result<Box<dyn ChaosObject>, AdmissionError> {
            match ChaosKind::from_name(kind) {
                $( Some(ChaosKind::$kind) => Ok(Box::new(serde_json::from_value::<$kind>(value)?)), )+
                None => Err(AdmissionError::UnknownKind(kind.to_string())),
            }
        }

        /// Admission entries of every chaos kind
        pub fn chaos_kind_entries() -> Vec<KindEntry> {
            vec![$( KindEntry::of::<$kind>(stringify!($kind)), )+]
        }
    };
}

chaos_kinds! {
    AWSChaos => "awsChaos", aws_chaos: AWSChaosSpec;
    AzureChaos => "azureChaos", azure_chaos: AzureChaosSpec;
    BlockChaos => "blockChaos", block_chaos: BlockChaosSpec;
    CloudStackVMChaos => "cloudstackvmChaos", cloudstack_vm_chaos: CloudStackVMChaosSpec;
    DNSChaos => "dnsChaos", dns_chaos: DNSChaosSpec;
    GCPChaos => "gcpChaos", gcp_chaos: GCPChaosSpec;
    HTTPChaos => "httpChaos", http_chaos: HTTPChaosSpec;
    IOChaos => "ioChaos", io_chaos: IOChaosSpec;
    JVMChaos => "jvmChaos", jvm_chaos: JVMChaosSpec;
    K8SChaos => "k8sChaos", k8s_chaos: K8SChaosSpec;
    KernelChaos => "kernelChaos", kernel_chaos: KernelChaosSpec;
    NetworkChaos => "networkChaos", network_chaos: NetworkChaosSpec;
    PhysicalMachineChaos => "physicalmachineChaos", physical_machine_chaos: PhysicalMachineChaosSpec;
    PodChaos => "podChaos", pod_chaos: PodChaosSpec;
    StressChaos => "stressChaos", stress_chaos: StressChaosSpec;
    TimeChaos => "timeChaos", time_chaos: TimeChaosSpec;
    YCChaos => "ycChaos", yc_chaos: YCChaosSpec;
}

impl std::fmt::Display for ChaosKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
