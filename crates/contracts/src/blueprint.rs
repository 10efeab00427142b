//! SessionBlueprint - Config Loader output
//!
//! Describes a complete decoding session: decoder types with their class
//! tables, the instance stack, each instance's declared outputs, and the
//! callbacks the host attaches per output kind.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::{DecoderType, OutputKind};

/// Default upper bound on decoder stack depth
pub const DEFAULT_MAX_STACK_DEPTH: usize = 32;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete session blueprint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Session-wide settings
    #[serde(default)]
    #[validate(nested)]
    pub session: SessionSettings,

    /// Decoder type metadata
    #[serde(default)]
    #[validate(nested)]
    pub decoder_types: Vec<DecoderType>,

    /// Decoder instances, in build order
    #[validate(length(min = 1), nested)]
    pub instances: Vec<InstanceConfig>,

    /// Host callbacks, at most one per output kind
    #[serde(default)]
    pub callbacks: Vec<CallbackConfig>,
}

/// Session-wide settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SessionSettings {
    /// Longest allowed chain of stacked instances
    #[serde(default = "default_max_stack_depth")]
    #[validate(range(min = 1, max = 1024))]
    pub max_stack_depth: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_stack_depth: default_max_stack_depth(),
        }
    }
}

fn default_max_stack_depth() -> usize {
    DEFAULT_MAX_STACK_DEPTH
}

/// One decoder instance
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct InstanceConfig {
    /// Unique identifier
    #[validate(length(min = 1))]
    pub id: String,

    /// Decoder type id
    #[validate(length(min = 1))]
    pub decoder_type: String,

    /// Outputs registered at start, in channel order
    #[serde(default)]
    pub outputs: Vec<OutputConfig>,

    /// Channel on which received payloads are re-emitted
    #[serde(default)]
    pub relay: Option<usize>,

    /// Instances stacked on top of this one, in delivery order
    #[serde(default)]
    pub downstream: Vec<String>,
}

/// Output channel declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub kind: OutputKind,

    /// Protocol id, defaults to the instance id
    #[serde(default)]
    pub proto_id: Option<String>,

    /// Meta declaration (meta outputs only)
    #[serde(default)]
    pub meta: Option<MetaConfig>,
}

/// Meta output declaration as written in config
///
/// The type stays a string here; the loader resolves it against `MetaType`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    #[serde(rename = "type")]
    pub meta_type: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,
}

/// Callback attachment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackConfig {
    /// Output kind handled
    pub kind: OutputKind,

    /// Sink implementation
    pub sink_type: SinkType,

    /// Sink-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log record summaries through tracing
    Log,
    /// Append records to a JSON-lines file
    File,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instance(id: &str) -> InstanceConfig {
        InstanceConfig {
            id: id.into(),
            decoder_type: "uart".into(),
            outputs: vec![],
            relay: None,
            downstream: vec![],
        }
    }

    #[test]
    fn test_settings_default() {
        assert_eq!(
            SessionSettings::default().max_stack_depth,
            DEFAULT_MAX_STACK_DEPTH
        );
    }

    #[test]
    fn test_field_rules() {
        let mut bp = SessionBlueprint {
            version: ConfigVersion::V1,
            session: SessionSettings::default(),
            decoder_types: vec![DecoderType::new("uart")],
            instances: vec![instance("uart-1")],
            callbacks: vec![],
        };
        assert!(bp.validate().is_ok());

        bp.session.max_stack_depth = 0;
        assert!(bp.validate().is_err());

        bp.session.max_stack_depth = 4;
        bp.instances[0].id.clear();
        assert!(bp.validate().is_err());

        bp.instances.clear();
        assert!(bp.validate().is_err());
    }
}
