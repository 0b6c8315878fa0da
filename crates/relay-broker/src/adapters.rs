//! Adapter kind registry
//!
//! Adapters stay pluggable by describing themselves through a settings
//! schema instead of typed configuration classes: each kind publishes an
//! [`AdapterDescriptor`], instance configuration is validated against it,
//! and everything underneath remains the generic key/value bag of
//! [`crate::config_store::AdapterConfigStore`]. Introducing a new adapter
//! kind means registering one descriptor; no store or orchestrator code
//! changes shape.

use std::collections::HashMap;
use thiserror::Error;

use relay_common::AdapterType;

/// One setting an adapter kind understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingSpec {
    pub key: &'static str,
    pub required: bool,
    pub description: &'static str,
}

/// Capability description of one adapter kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdapterDescriptor {
    pub kind: &'static str,
    pub adapter_type: AdapterType,
    pub settings: &'static [SettingSpec],
}

/// Built-in source: reads a delimited text file with a header row
pub const DELIMITED_FILE_SOURCE: AdapterDescriptor = AdapterDescriptor {
    kind: "delimited-file",
    adapter_type: AdapterType::Source,
    settings: &[
        SettingSpec {
            key: "input_path",
            required: true,
            description: "Path of the delimited input file",
        },
        SettingSpec {
            key: "delimiter",
            required: false,
            description: "Field delimiter, defaults to ','",
        },
        SettingSpec {
            key: "sample_rows",
            required: false,
            description: "Rows sampled for type inference, defaults to 100",
        },
    ],
};

/// Built-in destination: appends one JSON line per delivered message
pub const JSONL_FILE_DESTINATION: AdapterDescriptor = AdapterDescriptor {
    kind: "jsonl-file",
    adapter_type: AdapterType::Destination,
    settings: &[
        SettingSpec {
            key: "output_path",
            required: true,
            description: "Path of the JSON-lines output file",
        },
        SettingSpec {
            key: "poll_interval_secs",
            required: false,
            description: "Base poll interval in seconds, defaults to 2",
        },
        SettingSpec {
            key: "batch_size",
            required: false,
            description: "Max subscriptions claimed per poll, defaults to 50",
        },
    ],
};

const BUILTIN: &[AdapterDescriptor] = &[DELIMITED_FILE_SOURCE, JSONL_FILE_DESTINATION];

/// All registered adapter kinds
pub fn registered_adapters() -> &'static [AdapterDescriptor] {
    BUILTIN
}

/// Look up one adapter kind by name and type
pub fn descriptor(kind: &str, adapter_type: AdapterType) -> Option<&'static AdapterDescriptor> {
    BUILTIN
        .iter()
        .find(|d| d.kind == kind && d.adapter_type == adapter_type)
}

/// Instance configuration validation failures
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AdapterConfigError {
    #[error("unknown adapter kind '{kind}' ({adapter_type})")]
    UnknownKind {
        kind: String,
        adapter_type: AdapterType,
    },

    #[error("adapter '{kind}' is missing required setting '{key}'")]
    MissingSetting { kind: String, key: &'static str },
}

/// Validate an instance's resolved settings bag against its kind's schema
pub fn validate_instance_config(
    kind: &str,
    adapter_type: AdapterType,
    settings: &HashMap<String, String>,
) -> Result<&'static AdapterDescriptor, AdapterConfigError> {
    let descriptor = descriptor(kind, adapter_type).ok_or_else(|| AdapterConfigError::UnknownKind {
        kind: kind.to_string(),
        adapter_type,
    })?;

    for spec in descriptor.settings {
        if spec.required && settings.get(spec.key).map_or(true, |v| v.trim().is_empty()) {
            return Err(AdapterConfigError::MissingSetting {
                kind: kind.to_string(),
                key: spec.key,
            });
        }
    }

    Ok(descriptor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_lookup_is_type_scoped() {
        assert!(descriptor("delimited-file", AdapterType::Source).is_some());
        assert!(descriptor("delimited-file", AdapterType::Destination).is_none());
        assert!(descriptor("jsonl-file", AdapterType::Destination).is_some());
    }

    #[test]
    fn test_validate_requires_mandatory_settings() {
        let mut settings = HashMap::new();
        let err =
            validate_instance_config("jsonl-file", AdapterType::Destination, &settings).unwrap_err();
        assert_eq!(
            err,
            AdapterConfigError::MissingSetting {
                kind: "jsonl-file".to_string(),
                key: "output_path"
            }
        );

        settings.insert("output_path".to_string(), "/tmp/out.jsonl".to_string());
        assert!(validate_instance_config("jsonl-file", AdapterType::Destination, &settings).is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_required_value() {
        let mut settings = HashMap::new();
        settings.insert("input_path".to_string(), "   ".to_string());
        assert!(validate_instance_config("delimited-file", AdapterType::Source, &settings).is_err());
    }

    #[test]
    fn test_validate_unknown_kind() {
        let err = validate_instance_config("kafka", AdapterType::Source, &HashMap::new()).unwrap_err();
        assert!(matches!(err, AdapterConfigError::UnknownKind { .. }));
    }
}
