//! Typed payloads - converter output, callback input

use bytes::Bytes;
use serde::Serialize;
use std::borrow::Cow;

use crate::{OutputDescriptor, OutputKind, Value};

/// Annotation: a class plus its text variants (longest first by convention)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotationPayload {
    pub class_index: usize,
    pub texts: Vec<String>,
}

/// Binary dump in a declared binary class
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BinaryPayload {
    pub class_index: usize,
    /// Owned copy, never empty
    pub bytes: Bytes,
}

/// Meta scalar, matching the output's declared meta type
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetaValue {
    Int64(i64),
    Double(f64),
}

/// Packet subtype codes as submitted by decoders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PacketSubtype {
    /// `[class, subtype, packet_num]`
    Location,
    /// `[class, subtype, packet_num, field_name, field_value]`
    Field,
}

impl PacketSubtype {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Location),
            1 => Some(Self::Field),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Location => 0,
            Self::Field => 1,
        }
    }

    /// Logical element count, subtype included
    pub fn arity(self) -> usize {
        match self {
            Self::Location => 3,
            Self::Field => 5,
        }
    }
}

/// Packet structure record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "subtype", rename_all = "snake_case")]
pub enum PacketPayload {
    Location {
        class_index: usize,
        packet_num: i64,
    },
    Field {
        class_index: usize,
        packet_num: i64,
        field_name: String,
        field_value: String,
    },
}

impl PacketPayload {
    pub fn subtype(&self) -> PacketSubtype {
        match self {
            Self::Location { .. } => PacketSubtype::Location,
            Self::Field { .. } => PacketSubtype::Field,
        }
    }

    pub fn class_index(&self) -> usize {
        match self {
            Self::Location { class_index, .. } | Self::Field { class_index, .. } => *class_index,
        }
    }

    pub fn packet_num(&self) -> i64 {
        match self {
            Self::Location { packet_num, .. } | Self::Field { packet_num, .. } => *packet_num,
        }
    }
}

/// Payload of a delivered record, one variant per output kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum OutputPayload<'a> {
    Annotation(AnnotationPayload),
    /// Raw value as submitted; borrowed during dispatch
    Forward(Cow<'a, Value>),
    Binary(BinaryPayload),
    Meta(MetaValue),
    Packet(PacketPayload),
}

impl OutputPayload<'_> {
    pub fn kind(&self) -> OutputKind {
        match self {
            Self::Annotation(_) => OutputKind::Annotation,
            Self::Forward(_) => OutputKind::Forward,
            Self::Binary(_) => OutputKind::Binary,
            Self::Meta(_) => OutputKind::Meta,
            Self::Packet(_) => OutputKind::Packet,
        }
    }

    /// Detach from the dispatch call, cloning a borrowed forward value
    pub fn into_owned(self) -> OutputPayload<'static> {
        match self {
            Self::Annotation(p) => OutputPayload::Annotation(p),
            Self::Forward(v) => OutputPayload::Forward(Cow::Owned(v.into_owned())),
            Self::Binary(p) => OutputPayload::Binary(p),
            Self::Meta(p) => OutputPayload::Meta(p),
            Self::Packet(p) => OutputPayload::Packet(p),
        }
    }
}

/// Record handed to callbacks
///
/// Lives for one dispatch call only.
#[derive(Debug, Clone, Serialize)]
pub struct OutputRecord<'a> {
    pub start: u64,
    pub end: u64,
    pub descriptor: &'a OutputDescriptor,
    pub payload: OutputPayload<'a>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InstanceId;

    #[test]
    fn test_packet_accessors() {
        let p = PacketPayload::Field {
            class_index: 2,
            packet_num: 7,
            field_name: "addr".into(),
            field_value: "0x50".into(),
        };
        assert_eq!(p.subtype(), PacketSubtype::Field);
        assert_eq!(p.subtype().arity(), 5);
        assert_eq!(p.class_index(), 2);
        assert_eq!(p.packet_num(), 7);
        assert_eq!(PacketSubtype::from_code(0), Some(PacketSubtype::Location));
        assert_eq!(PacketSubtype::from_code(9), None);
    }

    #[test]
    fn test_record_json() {
        let descriptor = OutputDescriptor {
            id: 0,
            kind: OutputKind::Annotation,
            owner: InstanceId::new("uart"),
            proto_id: "uart".into(),
            meta: None,
        };
        let record = OutputRecord {
            start: 100,
            end: 120,
            descriptor: &descriptor,
            payload: OutputPayload::Annotation(AnnotationPayload {
                class_index: 1,
                texts: vec!["stop".into(), "END".into()],
            }),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["start"], 100);
        assert_eq!(json["payload"]["kind"], "annotation");
        assert_eq!(json["payload"]["data"]["texts"][1], "END");
    }

    #[test]
    fn test_into_owned_keeps_forward_value() {
        let raw = Value::from("raw");
        let payload = OutputPayload::Forward(Cow::Borrowed(&raw));
        let owned = payload.into_owned();
        assert_eq!(owned, OutputPayload::Forward(Cow::Owned(Value::from("raw"))));
    }
}
