//! Payload conversion - raw values to typed payloads
//!
//! One validator per output kind. Each checks shape, class index bounds and
//! primitive kinds, and returns an owned payload. The dispatcher calls these
//! only when some consumer actually needs the converted form.

use std::borrow::Cow;

use bytes::Bytes;
use contracts::{
    AnnotationPayload, BinaryPayload, ClassTableKind, DecoderType, DispatchError, MetaType,
    MetaValue, OutputDescriptor, OutputKind, OutputPayload, PacketPayload, PacketSubtype, Value,
};

/// Convert `value` into the payload for `descriptor`'s kind
///
/// Forward values are passed through borrowed, without inspection.
pub fn convert<'a>(
    descriptor: &OutputDescriptor,
    decoder_type: &DecoderType,
    value: &'a Value,
) -> Result<OutputPayload<'a>, DispatchError> {
    match descriptor.kind {
        OutputKind::Annotation => {
            convert_annotation(decoder_type, value).map(OutputPayload::Annotation)
        }
        OutputKind::Binary => convert_binary(decoder_type, value).map(OutputPayload::Binary),
        OutputKind::Meta => {
            let meta_type = descriptor.meta_type().ok_or_else(|| {
                DispatchError::UnsupportedMetaType {
                    type_name: "none".to_string(),
                }
            })?;
            convert_meta(meta_type, value).map(OutputPayload::Meta)
        }
        OutputKind::Packet => convert_packet(decoder_type, value).map(OutputPayload::Packet),
        OutputKind::Forward => Ok(OutputPayload::Forward(Cow::Borrowed(value))),
    }
}

/// `[class, [text, ...]]`
pub fn convert_annotation(
    decoder_type: &DecoderType,
    value: &Value,
) -> Result<AnnotationPayload, DispatchError> {
    let items = sequence(value, "annotation")?;
    if items.len() != 2 {
        return Err(DispatchError::type_mismatch(
            format!("annotation list with {} elements", items.len()),
            "2 elements",
            "list",
        ));
    }

    let class_index = resolve_class(
        decoder_type,
        ClassTableKind::Annotation,
        &items[0],
        "annotation list element 0",
    )?;

    let texts = match &items[1] {
        Value::List(texts) => texts
            .iter()
            .enumerate()
            .map(|(i, t)| {
                t.as_str().map(str::to_string).ok_or_else(|| {
                    DispatchError::type_mismatch(
                        format!("annotation text {i}"),
                        "str",
                        t.type_name(),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        other => {
            return Err(DispatchError::type_mismatch(
                "annotation list element 1",
                "list",
                other.type_name(),
            ))
        }
    };

    Ok(AnnotationPayload { class_index, texts })
}

/// `[class, bytes]`, bytes non-empty
pub fn convert_binary(
    decoder_type: &DecoderType,
    value: &Value,
) -> Result<BinaryPayload, DispatchError> {
    let items = sequence(value, "binary output")?;
    if items.len() != 2 {
        return Err(DispatchError::type_mismatch(
            format!("binary output with {} elements", items.len()),
            "2 elements",
            "list",
        ));
    }

    let class_index = resolve_class(
        decoder_type,
        ClassTableKind::Binary,
        &items[0],
        "binary output element 0",
    )?;

    let data = items[1].as_bytes().ok_or_else(|| {
        DispatchError::type_mismatch("binary output element 1", "bytes", items[1].type_name())
    })?;
    if data.is_empty() {
        return Err(DispatchError::EmptyBinaryPayload);
    }

    Ok(BinaryPayload {
        class_index,
        bytes: owned_copy(data)?,
    })
}

/// Scalar whose kind matches the declared meta type exactly
pub fn convert_meta(meta_type: MetaType, value: &Value) -> Result<MetaValue, DispatchError> {
    match (meta_type, value) {
        (MetaType::Int64, Value::Int(v)) => Ok(MetaValue::Int64(*v)),
        (MetaType::Double, Value::Float(v)) => Ok(MetaValue::Double(*v)),
        (MetaType::Int64, other) => Err(DispatchError::type_mismatch(
            "output registered as int64",
            "int",
            other.type_name(),
        )),
        (MetaType::Double, other) => Err(DispatchError::type_mismatch(
            "output registered as double",
            "float",
            other.type_name(),
        )),
    }
}

/// `[class, LOCATION, num]` or `[class, FIELD, num, name, value]`
pub fn convert_packet(
    decoder_type: &DecoderType,
    value: &Value,
) -> Result<PacketPayload, DispatchError> {
    let items = sequence(value, "packet output")?;
    // Too short to carry a subtype at all.
    if items.len() < 2 {
        return Err(DispatchError::InvalidPacketSubtype {
            subtype: -1,
            len: items.len(),
        });
    }

    let class_index = resolve_class(
        decoder_type,
        ClassTableKind::Annotation,
        &items[0],
        "packet output element 0",
    )?;

    let code = items[1].as_int().ok_or_else(|| {
        DispatchError::type_mismatch("packet output element 1", "int", items[1].type_name())
    })?;
    let invalid = || DispatchError::InvalidPacketSubtype {
        subtype: code,
        len: items.len(),
    };
    let subtype = PacketSubtype::from_code(code).ok_or_else(invalid)?;
    if items.len() != subtype.arity() {
        return Err(invalid());
    }

    let packet_num = items[2].as_int().ok_or_else(|| {
        DispatchError::type_mismatch("packet output element 2", "int", items[2].type_name())
    })?;

    Ok(match subtype {
        PacketSubtype::Location => PacketPayload::Location {
            class_index,
            packet_num,
        },
        PacketSubtype::Field => PacketPayload::Field {
            class_index,
            packet_num,
            field_name: text(&items[3], "packet output element 3")?,
            field_value: text(&items[4], "packet output element 4")?,
        },
    })
}

fn sequence<'v>(value: &'v Value, context: &str) -> Result<&'v [Value], DispatchError> {
    value
        .as_list()
        .ok_or_else(|| DispatchError::type_mismatch(context, "list", value.type_name()))
}

fn resolve_class(
    decoder_type: &DecoderType,
    table: ClassTableKind,
    value: &Value,
    context: &str,
) -> Result<usize, DispatchError> {
    let class = value
        .as_int()
        .ok_or_else(|| DispatchError::type_mismatch(context, "int", value.type_name()))?;

    usize::try_from(class)
        .ok()
        .filter(|&idx| decoder_type.table(table).class(idx).is_some())
        .ok_or(DispatchError::UnregisteredClass { table, class })
}

fn text(value: &Value, context: &str) -> Result<String, DispatchError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| DispatchError::type_mismatch(context, "str", value.type_name()))
}

fn owned_copy(data: &[u8]) -> Result<Bytes, DispatchError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(data.len())
        .map_err(|_| DispatchError::AllocationFailure {
            requested: data.len(),
        })?;
    buf.extend_from_slice(data);
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{InstanceId, MetaSpec};

    fn uart() -> DecoderType {
        DecoderType::new("uart")
            .with_annotations([("start", "Start bit"), ("stop", "Stop bit")])
            .with_binary([("rx", "RX dump")])
    }

    fn descriptor(kind: OutputKind, meta: Option<MetaSpec>) -> OutputDescriptor {
        OutputDescriptor {
            id: 0,
            kind,
            owner: InstanceId::new("uart"),
            proto_id: "uart".into(),
            meta,
        }
    }

    #[test]
    fn test_annotation_ok() {
        let v = Value::List(vec![Value::Int(1), Value::list(["stop", "END"])]);
        let p = convert_annotation(&uart(), &v).unwrap();
        assert_eq!(p.class_index, 1);
        assert_eq!(p.texts, vec!["stop".to_string(), "END".to_string()]);
    }

    #[test]
    fn test_annotation_empty_texts_allowed() {
        let v = Value::List(vec![Value::Int(0), Value::List(vec![])]);
        assert!(convert_annotation(&uart(), &v).unwrap().texts.is_empty());
    }

    #[test]
    fn test_annotation_unregistered_class() {
        let v = Value::List(vec![Value::Int(3), Value::list(["x"])]);
        assert_eq!(
            convert_annotation(&uart(), &v).unwrap_err(),
            DispatchError::UnregisteredClass {
                table: ClassTableKind::Annotation,
                class: 3
            }
        );

        let v = Value::List(vec![Value::Int(-1), Value::list(["x"])]);
        assert!(matches!(
            convert_annotation(&uart(), &v),
            Err(DispatchError::UnregisteredClass { class: -1, .. })
        ));
    }

    #[test]
    fn test_annotation_shape_errors() {
        let cases = [
            Value::from("not a list"),
            Value::List(vec![Value::Int(0)]),
            Value::List(vec![Value::from("0"), Value::list(["x"])]),
            Value::List(vec![Value::Int(0), Value::from("x")]),
            Value::List(vec![Value::Int(0), Value::List(vec![Value::Int(5)])]),
        ];
        for v in cases {
            assert!(
                matches!(
                    convert_annotation(&uart(), &v),
                    Err(DispatchError::TypeMismatch { .. })
                ),
                "accepted {v:?}"
            );
        }
    }

    #[test]
    fn test_binary_ok_copies() {
        let raw = Bytes::from_static(b"\x01\x02");
        let v = Value::List(vec![Value::Int(0), Value::Bytes(raw.clone())]);
        let p = convert_binary(&uart(), &v).unwrap();
        assert_eq!(p.class_index, 0);
        assert_eq!(p.bytes, raw);
        assert_ne!(p.bytes.as_ptr(), raw.as_ptr());
    }

    #[test]
    fn test_binary_empty() {
        let v = Value::List(vec![Value::Int(0), Value::Bytes(Bytes::new())]);
        assert_eq!(
            convert_binary(&uart(), &v).unwrap_err(),
            DispatchError::EmptyBinaryPayload
        );
    }

    #[test]
    fn test_binary_class_checked_against_binary_table() {
        let v = Value::List(vec![Value::Int(1), Value::from(&b"x"[..])]);
        assert_eq!(
            convert_binary(&uart(), &v).unwrap_err(),
            DispatchError::UnregisteredClass {
                table: ClassTableKind::Binary,
                class: 1
            }
        );
    }

    #[test]
    fn test_binary_requires_bytes() {
        let v = Value::List(vec![Value::Int(0), Value::from("text")]);
        assert!(matches!(
            convert_binary(&uart(), &v),
            Err(DispatchError::TypeMismatch { found: "str", .. })
        ));
    }

    #[test]
    fn test_meta_exact_kind() {
        assert_eq!(
            convert_meta(MetaType::Int64, &Value::Int(115200)).unwrap(),
            MetaValue::Int64(115200)
        );
        assert_eq!(
            convert_meta(MetaType::Double, &Value::Float(2.5)).unwrap(),
            MetaValue::Double(2.5)
        );
        assert!(matches!(
            convert_meta(MetaType::Int64, &Value::Float(2.5)),
            Err(DispatchError::TypeMismatch { .. })
        ));
        assert!(matches!(
            convert_meta(MetaType::Double, &Value::Int(3)),
            Err(DispatchError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_packet_location() {
        let v = Value::List(vec![Value::Int(0), Value::Int(0), Value::Int(12)]);
        assert_eq!(
            convert_packet(&uart(), &v).unwrap(),
            PacketPayload::Location {
                class_index: 0,
                packet_num: 12
            }
        );
    }

    #[test]
    fn test_packet_field() {
        let v = Value::List(vec![
            Value::Int(1),
            Value::Int(1),
            Value::Int(4),
            Value::from("addr"),
            Value::from("0x50"),
        ]);
        assert_eq!(
            convert_packet(&uart(), &v).unwrap(),
            PacketPayload::Field {
                class_index: 1,
                packet_num: 4,
                field_name: "addr".into(),
                field_value: "0x50".into(),
            }
        );
    }

    #[test]
    fn test_packet_wrong_arity() {
        let location_with_five = Value::List(vec![
            Value::Int(0),
            Value::Int(0),
            Value::Int(1),
            Value::from("a"),
            Value::from("b"),
        ]);
        let field_with_three = Value::List(vec![Value::Int(0), Value::Int(1), Value::Int(1)]);
        let unknown_subtype = Value::List(vec![Value::Int(0), Value::Int(7), Value::Int(1)]);
        let empty = Value::List(vec![]);
        let class_only = Value::List(vec![Value::Int(0)]);

        for v in [
            location_with_five,
            field_with_three,
            unknown_subtype,
            empty.clone(),
            class_only.clone(),
        ] {
            assert!(
                matches!(
                    convert_packet(&uart(), &v),
                    Err(DispatchError::InvalidPacketSubtype { .. })
                ),
                "accepted {v:?}"
            );
        }

        for (v, len) in [(empty, 0), (class_only, 1)] {
            assert_eq!(
                convert_packet(&uart(), &v).unwrap_err(),
                DispatchError::InvalidPacketSubtype { subtype: -1, len }
            );
        }
    }

    #[test]
    fn test_packet_field_types() {
        let v = Value::List(vec![
            Value::Int(0),
            Value::Int(1),
            Value::Int(1),
            Value::Int(9),
            Value::from("b"),
        ]);
        assert!(matches!(
            convert_packet(&uart(), &v),
            Err(DispatchError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_convert_dispatches_by_kind() {
        let raw = Value::opaque("frame");
        match convert(&descriptor(OutputKind::Forward, None), &uart(), &raw).unwrap() {
            OutputPayload::Forward(Cow::Borrowed(v)) => assert!(std::ptr::eq(v, &raw)),
            other => panic!("unexpected payload {other:?}"),
        }

        let meta = descriptor(
            OutputKind::Meta,
            Some(MetaSpec::new(MetaType::Double, "Freq", "Frequency")),
        );
        assert_eq!(
            convert(&meta, &uart(), &Value::Float(1.5)).unwrap(),
            OutputPayload::Meta(MetaValue::Double(1.5))
        );
    }
}
