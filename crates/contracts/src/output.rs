//! Output descriptors - the channels a decoder instance declares

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{DispatchError, InstanceId};

/// Output kind, fixed at registration time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    /// Annotations for the host application
    Annotation,
    /// Arbitrary objects passed up the decoder stack
    Forward,
    /// Binary dumps for the host application
    Binary,
    /// Single typed scalar
    Meta,
    /// Packet structure, passed up the stack and to the host
    Packet,
}

impl OutputKind {
    pub const ALL: [OutputKind; 5] = [
        Self::Annotation,
        Self::Forward,
        Self::Binary,
        Self::Meta,
        Self::Packet,
    ];

    /// Numeric code used by dynamic `register` calls
    pub fn code(self) -> i64 {
        self.index() as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| Self::ALL.get(idx).copied())
    }

    /// Dense index, `0..5`
    pub fn index(self) -> usize {
        match self {
            Self::Annotation => 0,
            Self::Forward => 1,
            Self::Binary => 2,
            Self::Meta => 3,
            Self::Packet => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Annotation => "annotation",
            Self::Forward => "forward",
            Self::Binary => "binary",
            Self::Meta => "meta",
            Self::Packet => "packet",
        }
    }

    /// Name used in trace-level dispatch logs
    pub fn debug_name(self) -> &'static str {
        match self {
            Self::Annotation => "OUTPUT_ANN",
            Self::Forward => "OUTPUT_FORWARD",
            Self::Binary => "OUTPUT_BINARY",
            Self::Meta => "OUTPUT_META",
            Self::Packet => "OUTPUT_PACKET",
        }
    }

    /// Whether records of this kind travel up the decoder stack
    pub fn forwards_downstream(self) -> bool {
        matches!(self, Self::Forward | Self::Packet)
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primitive type of a meta output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetaType {
    Int64,
    Double,
}

impl MetaType {
    /// Resolve a type name as written in configs and dynamic calls
    ///
    /// # Errors
    /// `UnsupportedMetaType` for anything but the integer and float spellings.
    pub fn from_name(name: &str) -> Result<Self, DispatchError> {
        match name.to_ascii_lowercase().as_str() {
            "int" | "int64" | "i64" => Ok(Self::Int64),
            "float" | "double" | "f64" => Ok(Self::Double),
            _ => Err(DispatchError::UnsupportedMetaType {
                type_name: name.to_string(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int64 => "int64",
            Self::Double => "double",
        }
    }
}

/// Meta output declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaSpec {
    pub meta_type: MetaType,
    pub name: String,
    pub description: String,
}

impl MetaSpec {
    pub fn new(
        meta_type: MetaType,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            meta_type,
            name: name.into(),
            description: description.into(),
        }
    }
}

/// A registered output channel
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputDescriptor {
    /// Registration order within the owning instance
    pub id: usize,
    pub kind: OutputKind,
    pub owner: InstanceId,
    pub proto_id: String,
    /// Present only on meta outputs
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaSpec>,
}

impl OutputDescriptor {
    pub fn meta_type(&self) -> Option<MetaType> {
        self.meta.as_ref().map(|m| m.meta_type)
    }
}
