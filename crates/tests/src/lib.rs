//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 配置 -> 会话 -> 回调的端到端测试
//! - 多层解码器堆栈的转发顺序

#[cfg(test)]
mod decoders;

#[cfg(test)]
mod contract_tests {
    use contracts::{OutputKind, Value};

    #[test]
    fn test_output_kind_codes_are_stable() {
        let codes: Vec<i64> = OutputKind::ALL.iter().map(|k| k.code()).collect();
        assert_eq!(codes, vec![0, 1, 2, 3, 4]);
        assert!(OutputKind::Forward.forwards_downstream());
        assert!(OutputKind::Packet.forwards_downstream());
        assert!(!OutputKind::Annotation.forwards_downstream());
    }

    #[test]
    fn test_value_wire_form() {
        let value = Value::list([Value::Int(0), Value::from(&b"\x01\x02"[..])]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"[0,{"bytes":[1,2]}]"#);
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }
}

#[cfg(test)]
mod e2e_tests {
    use contracts::{
        Consumer, DecoderType, InstanceId, MetaValue, OutputKind, OutputPayload, PacketPayload,
        Value,
    };
    use dispatcher::{MemoryHandle, MemorySink, Session};
    use observability::ReportAggregator;

    use crate::decoders::{LineDecoder, UartDecoder, UART_FORWARD, UART_META};

    struct Stack {
        session: Session,
        annotations: MemoryHandle,
        binary: MemoryHandle,
        meta: MemoryHandle,
        packets: MemoryHandle,
    }

    /// uart0 (bytes) -> line0 (text lines)
    fn stack() -> Stack {
        let ann = MemorySink::new("ann");
        let bin = MemorySink::new("bin");
        let meta = MemorySink::new("meta");
        let packet = MemorySink::new("packet");
        let handles = [ann.handle(), bin.handle(), meta.handle(), packet.handle()];

        let mut session = Session::builder()
            .decoder_type(
                DecoderType::new("uart")
                    .with_annotations([("data", "Data")])
                    .with_binary([("rx", "RX dump")]),
            )
            .decoder_type(
                DecoderType::new("lines").with_annotations([("line", "Line"), ("field", "Field")]),
            )
            .instance("uart0", "uart", Box::new(UartDecoder::default()))
            .instance("line0", "lines", Box::new(LineDecoder::default()))
            .connect("uart0", "line0")
            .callback(OutputKind::Annotation, Box::new(ann))
            .callback(OutputKind::Binary, Box::new(bin))
            .callback(OutputKind::Meta, Box::new(meta))
            .callback(OutputKind::Packet, Box::new(packet))
            .build()
            .unwrap();
        session.start().unwrap();

        let [annotations, binary, meta, packets] = handles;
        Stack {
            session,
            annotations,
            binary,
            meta,
            packets,
        }
    }

    /// End-to-end: raw bytes -> uart0 -> line0 -> host callbacks
    ///
    /// 验证完整的数据流：
    /// 1. uart0 对每个字节输出注释、二进制与转发
    /// 2. line0 在换行处输出整行注释与 packet 字段
    /// 3. 转发在 put 返回前完成，记录顺序与调用顺序一致
    #[test]
    fn test_e2e_two_layer_stack() {
        let stack = stack();
        stack
            .session
            .decode("uart0", 0, 30, &Value::from(&b"hi\n"[..]))
            .unwrap();

        let annotations = stack.annotations.records();
        let owners: Vec<&str> = annotations.iter().map(|r| r.instance.as_str()).collect();
        assert_eq!(owners, vec!["uart0", "uart0", "uart0", "line0"]);

        let last = &annotations[3];
        assert_eq!((last.start, last.end), (20, 30));
        match &last.payload {
            OutputPayload::Annotation(p) => assert_eq!(p.texts, vec!["hi".to_string()]),
            other => panic!("unexpected payload {other:?}"),
        }
        match &annotations[0].payload {
            OutputPayload::Annotation(p) => assert_eq!(p.texts[0], "0x68"),
            other => panic!("unexpected payload {other:?}"),
        }

        assert_eq!(stack.binary.len(), 3);
        let meta = stack.meta.records();
        assert_eq!(meta.len(), 1);
        assert_eq!(meta[0].payload, OutputPayload::Meta(MetaValue::Int64(3)));

        let packets = stack.packets.records();
        assert_eq!(packets.len(), 1);
        assert_eq!(
            packets[0].payload,
            OutputPayload::Packet(PacketPayload::Field {
                class_index: 1,
                packet_num: 0,
                field_name: "text".into(),
                field_value: "hi".into(),
            })
        );

        let metrics = stack.session.metrics().snapshot();
        assert_eq!(metrics.puts_of(OutputKind::Annotation), 4);
        assert_eq!(metrics.puts_of(OutputKind::Forward), 3);
        assert_eq!(metrics.forwards, 3);
        assert_eq!(metrics.delivered, 9);
    }

    #[test]
    fn test_downstream_failure_is_attributed() {
        let stack = stack();
        let report = stack
            .session
            .put("uart0", 0, 10, UART_FORWARD, &Value::from("not a byte"))
            .unwrap();

        assert_eq!(report.forwarded, vec![InstanceId::new("line0")]);
        assert_eq!(report.diagnostics.len(), 1);
        let diagnostic = &report.diagnostics[0];
        assert_eq!(diagnostic.instance, "line0");
        assert_eq!(diagnostic.consumer, Consumer::Downstream("line0".into()));

        // the stack keeps working afterwards
        stack
            .session
            .decode("uart0", 10, 20, &Value::from(&b"\n"[..]))
            .unwrap();
        assert_eq!(stack.packets.len(), 1);
    }

    #[test]
    fn test_meta_type_mismatch_is_soft() {
        let stack = stack();
        let report = stack
            .session
            .put("uart0", 0, 10, UART_META, &Value::Float(2.5))
            .unwrap();

        assert!(!report.delivered);
        assert!(report.first_error().is_some());
        assert!(stack.meta.is_empty());
        assert_eq!(stack.session.metrics().snapshot().conversion_failures, 1);
    }

    #[test]
    fn test_decode_error_surfaces_to_host() {
        let stack = stack();
        let err = stack
            .session
            .decode("uart0", 0, 10, &Value::Int(1))
            .unwrap_err();
        assert!(err.to_string().contains("expects bytes"));
        assert!(stack.annotations.is_empty());
    }

    #[test]
    fn test_reports_aggregate() {
        let stack = stack();
        let mut aggregator = ReportAggregator::new();

        let ann = Value::list([Value::Int(0), Value::list(["A"])]);
        let report = stack.session.put("uart0", 0, 8, 0, &ann).unwrap();
        aggregator.update(&report, 0, 8);
        let report = stack
            .session
            .put("uart0", 8, 16, UART_FORWARD, &Value::Int(b'\n' as i64))
            .unwrap();
        aggregator.update(&report, 8, 16);
        match stack.session.put("uart0", 16, 24, 42, &ann) {
            Ok(_) => panic!("unknown channel accepted"),
            Err(_) => aggregator.reject(),
        }

        let summary = aggregator.summary();
        assert_eq!(summary.total_puts, 2);
        assert_eq!(summary.delivered, 1);
        assert_eq!(summary.forwarded, 1);
        assert_eq!(summary.rejected, 1);
        assert_eq!(summary.diagnostics, 0);
        // an empty line still closes a packet
        assert_eq!(stack.packets.len(), 1);
    }
}

#[cfg(test)]
mod config_tests {
    use std::collections::HashMap;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{CallbackConfig, InstanceId, OutputKind, SinkType, Value};
    use dispatcher::create_session;
    use tempfile::TempDir;

    fn blueprint_toml(out: &std::path::Path) -> String {
        format!(
            r#"
[session]
max_stack_depth = 4

[[decoder_types]]
id = "uart"
annotations = [{{ id = "rx-data", description = "RX data" }}, {{ id = "tx-data", description = "TX data" }}]

[[instances]]
id = "uart"
decoder_type = "uart"
outputs = [
    {{ kind = "annotation" }},
    {{ kind = "forward", proto_id = "uart-frames" }},
    {{ kind = "meta", meta = {{ type = "int", name = "Bitrate", description = "Bits per second" }} }},
]
downstream = ["echo"]

[[instances]]
id = "echo"
decoder_type = "uart"
outputs = [{{ kind = "annotation" }}]
relay = 0

[[callbacks]]
kind = "annotation"
sink_type = "file"
params = {{ path = "{}" }}

[[callbacks]]
kind = "meta"
sink_type = "log"
"#,
            out.display()
        )
    }

    /// Config -> session -> file sink
    #[test]
    fn test_config_driven_stack() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("records").join("ann.jsonl");
        let blueprint =
            ConfigLoader::load_from_str(&blueprint_toml(&out), ConfigFormat::Toml).unwrap();

        let mut session = create_session(&blueprint).unwrap();
        session.start().unwrap();

        let descriptors = session.descriptors("uart").unwrap();
        assert_eq!(descriptors.len(), 3);
        assert_eq!(descriptors[1].proto_id, "uart-frames");
        assert_eq!(descriptors[0].proto_id, "uart");

        // annotation from uart, delivered to the file
        session
            .put_args(
                "uart",
                &[
                    Value::Int(0),
                    Value::Int(10),
                    Value::Int(0),
                    Value::list([Value::Int(1), Value::list(["TX: 0x41", "0x41"])]),
                ],
            )
            .unwrap();
        // forwarded to echo, which relays it as an annotation
        let frame = Value::list([Value::Int(0), Value::list(["frame"])]);
        let report = session.put("uart", 10, 20, 1, &frame).unwrap();
        assert_eq!(report.forwarded, vec![InstanceId::new("echo")]);
        assert!(report.is_clean());
        // meta to the log sink
        let report = session.put("uart", 20, 30, 2, &Value::Int(115_200)).unwrap();
        assert!(report.delivered);

        session.flush_callbacks();
        let lines: Vec<serde_json::Value> = std::fs::read_to_string(&out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["descriptor"]["owner"], "uart");
        assert_eq!(lines[0]["payload"]["data"]["class_index"], 1);
        assert_eq!(lines[0]["payload"]["data"]["texts"][0], "TX: 0x41");
        assert_eq!(lines[1]["descriptor"]["owner"], "echo");
        assert_eq!(lines[1]["start"], 10);
        assert_eq!(lines[1]["payload"]["data"]["texts"][0], "frame");
    }

    #[test]
    fn test_unsupported_meta_type_rejected_at_load() {
        let dir = TempDir::new().unwrap();
        let toml = blueprint_toml(&dir.path().join("ann.jsonl"))
            .replace("type = \"int\"", "type = \"string\"");
        let err = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("instances[uart].outputs[2].meta.type"), "{message}");
        assert!(message.contains("unsupported meta type 'string'"), "{message}");
    }

    #[test]
    fn test_json_blueprint_round_trip() {
        let dir = TempDir::new().unwrap();
        let blueprint = ConfigLoader::load_from_str(
            &blueprint_toml(&dir.path().join("ann.jsonl")),
            ConfigFormat::Toml,
        )
        .unwrap();
        let json = ConfigLoader::to_json(&blueprint).unwrap();
        let reloaded = ConfigLoader::load_from_str(&json, ConfigFormat::Json).unwrap();
        assert_eq!(reloaded.instances.len(), 2);
        assert_eq!(reloaded.session.max_stack_depth, 4);
        assert_eq!(
            reloaded.instances[0].outputs[2].meta.as_ref().map(|m| m.name.as_str()),
            Some("Bitrate")
        );
    }

    #[test]
    fn test_duplicate_callback_kind_rejected() {
        let dir = TempDir::new().unwrap();
        let mut blueprint = ConfigLoader::load_from_str(
            &blueprint_toml(&dir.path().join("ann.jsonl")),
            ConfigFormat::Toml,
        )
        .unwrap();
        blueprint.callbacks.push(CallbackConfig {
            kind: OutputKind::Annotation,
            sink_type: SinkType::Log,
            params: HashMap::new(),
        });
        // one callback per kind; config validation rejects the duplicate
        let toml = ConfigLoader::to_toml(&blueprint).unwrap();
        assert!(ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).is_err());
    }
}
