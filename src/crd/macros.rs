/// String-backed enumeration that keeps unrecognized values.
///
/// Decoding never fails on an unknown string; the value lands in `Other` and
/// is reported by [`check`](#method.check) during validation, so the error
/// carries the field path instead of surfacing as a decode failure.
macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident => $wire:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(from = "String", into = "String")]
        $vis enum $name {
            $( $(#[$vmeta])* $variant, )+
            /// Unrecognized value, kept verbatim
            Other(String),
        }

        impl $name {
            /// Every recognized wire value
            pub const ALL: &'static [&'static str] = &[$($wire),+];

            pub fn as_str(&self) -> &str {
                match self {
                    $( $name::$variant => $wire, )+
                    $name::Other(value) => value,
                }
            }

            pub fn is_known(&self) -> bool {
                !matches!(self, $name::Other(_))
            }

            /// `NotSupported` error when the value is not recognized
            pub fn check(
                &self,
                path: $crate::validation::FieldPath,
            ) -> Option<$crate::validation::FieldError> {
                match self {
                    $name::Other(value) => Some($crate::validation::FieldError::not_supported(
                        path,
                        value.as_str(),
                        Self::ALL,
                    )),
                    _ => None,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::Other(String::new())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                match value.as_str() {
                    $( $wire => $name::$variant, )+
                    _ => $name::Other(value),
                }
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                $name::from(value.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                match value {
                    $name::Other(value) => value,
                    known => known.as_str().to_string(),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl schemars::JsonSchema for $name {
            fn schema_name() -> String {
                stringify!($name).to_string()
            }

            fn json_schema(_: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
                schemars::schema::SchemaObject {
                    instance_type: Some(schemars::schema::InstanceType::String.into()),
                    enum_values: Some(vec![$( serde_json::Value::from($wire) ),+]),
                    ..Default::default()
                }
                .into()
            }
        }

        impl $crate::validation::AsLeaf for $name {
            fn leaf(&self) -> $crate::validation::LeafValue<'_> {
                $crate::validation::LeafValue::Text(Some(self.as_str()))
            }

            fn leaf_mut(&mut self) -> $crate::validation::LeafSlot<'_> {
                $crate::validation::LeafSlot::Fixed($crate::validation::ValueType::Text)
            }
        }
    };
}

/// Enumeration over a closed set of names with a string fallback, used for
/// discriminators that mix fixed names with chaos kinds.
macro_rules! string_schema {
    ($name:ident) => {
        impl schemars::JsonSchema for $name {
            fn schema_name() -> String {
                stringify!($name).to_string()
            }

            fn json_schema(generator: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
                <String as schemars::JsonSchema>::json_schema(generator)
            }
        }
    };
}
