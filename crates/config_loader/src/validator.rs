//! 配置校验模块
//!
//! 校验规则：
//! - 字段级规则 (`validator` derive：非空 id、max_stack_depth 范围)
//! - decoder_type id 唯一，instance id 唯一
//! - instance 引用的 decoder_type 存在
//! - downstream 引用的 instance 存在，无重复、无环
//! - 最长堆叠链不超过 session.max_stack_depth
//! - 每种输出类型最多一个 callback
//! - meta 输出必须带 meta 声明，且类型名可解析
//! - relay 通道必须在 outputs 范围内
//! - file sink 必须有 path 参数

use std::collections::{HashMap, HashSet};

use contracts::{ContractError, MetaType, OutputKind, SessionBlueprint, SinkType};
use validator::Validate;

/// 校验 SessionBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_decoder_type_ids(blueprint)?;
    validate_instances(blueprint)?;
    validate_outputs(blueprint)?;
    validate_stack(blueprint)?;
    validate_callbacks(blueprint)?;
    Ok(())
}

/// 字段级规则
fn validate_fields(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))
}

/// 校验 decoder_type id 唯一性
fn validate_decoder_type_ids(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for decoder_type in &blueprint.decoder_types {
        if !seen.insert(decoder_type.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("decoder_types[id={}]", decoder_type.id),
                "duplicate decoder_type id",
            ));
        }
    }
    Ok(())
}

/// 校验 instance id 唯一性及 decoder_type 引用
fn validate_instances(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let types: HashSet<_> = blueprint
        .decoder_types
        .iter()
        .map(|t| t.id.as_str())
        .collect();

    let mut seen = HashSet::new();
    for instance in &blueprint.instances {
        if !seen.insert(instance.id.as_str()) {
            return Err(ContractError::config_validation(
                format!("instances[id={}]", instance.id),
                "duplicate instance id",
            ));
        }
        if !types.contains(instance.decoder_type.as_str()) {
            return Err(ContractError::config_validation(
                format!("instances[{}].decoder_type", instance.id),
                format!("unknown decoder_type '{}'", instance.decoder_type),
            ));
        }
    }
    Ok(())
}

/// 校验输出声明与 relay 通道
fn validate_outputs(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    for instance in &blueprint.instances {
        for (idx, output) in instance.outputs.iter().enumerate() {
            if output.kind != OutputKind::Meta {
                continue;
            }
            let Some(meta) = &output.meta else {
                return Err(ContractError::config_validation(
                    format!("instances[{}].outputs[{}].meta", instance.id, idx),
                    "meta output requires a meta declaration",
                ));
            };
            MetaType::from_name(&meta.meta_type).map_err(|e| {
                ContractError::config_validation(
                    format!("instances[{}].outputs[{}].meta.type", instance.id, idx),
                    e.to_string(),
                )
            })?;
        }
        if let Some(relay) = instance.relay {
            if relay >= instance.outputs.len() {
                return Err(ContractError::config_validation(
                    format!("instances[{}].relay", instance.id),
                    format!(
                        "relay channel {} out of range, {} outputs declared",
                        relay,
                        instance.outputs.len()
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// 校验堆叠拓扑：引用存在、无重复、无环、深度受限
fn validate_stack(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let index: HashMap<&str, usize> = blueprint
        .instances
        .iter()
        .enumerate()
        .map(|(i, inst)| (inst.id.as_str(), i))
        .collect();

    let mut adjacency = vec![Vec::new(); blueprint.instances.len()];
    for (i, instance) in blueprint.instances.iter().enumerate() {
        for downstream in &instance.downstream {
            let field = format!("instances[{}].downstream", instance.id);
            let Some(&next) = index.get(downstream.as_str()) else {
                return Err(ContractError::config_validation(
                    field,
                    format!("unknown instance '{downstream}'"),
                ));
            };
            if adjacency[i].contains(&next) {
                return Err(ContractError::config_validation(
                    field,
                    format!("'{downstream}' listed twice"),
                ));
            }
            adjacency[i].push(next);
        }
    }

    let mut depths: Vec<Option<usize>> = vec![None; adjacency.len()];
    let mut on_path = vec![false; adjacency.len()];
    let mut deepest = 0;
    for node in 0..adjacency.len() {
        let depth = chain_length(node, &adjacency, &mut depths, &mut on_path).map_err(|node| {
            ContractError::config_validation(
                format!("instances[{}].downstream", blueprint.instances[node].id),
                "decoder stack contains a cycle",
            )
        })?;
        deepest = deepest.max(depth);
    }

    let max = blueprint.session.max_stack_depth;
    if deepest > max {
        return Err(ContractError::config_validation(
            "session.max_stack_depth",
            format!("decoder stack depth {deepest} exceeds maximum {max}"),
        ));
    }
    Ok(())
}

/// 从 `node` 出发的最长实例链；遇到环时返回环上的节点
fn chain_length(
    node: usize,
    adjacency: &[Vec<usize>],
    depths: &mut [Option<usize>],
    on_path: &mut [bool],
) -> Result<usize, usize> {
    if let Some(depth) = depths[node] {
        return Ok(depth);
    }
    if on_path[node] {
        return Err(node);
    }
    on_path[node] = true;
    let mut longest = 0;
    for &next in &adjacency[node] {
        longest = longest.max(chain_length(next, adjacency, depths, on_path)?);
    }
    on_path[node] = false;
    depths[node] = Some(longest + 1);
    Ok(longest + 1)
}

/// 校验 callback 配置
fn validate_callbacks(blueprint: &SessionBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, callback) in blueprint.callbacks.iter().enumerate() {
        if !seen.insert(callback.kind) {
            return Err(ContractError::config_validation(
                format!("callbacks[{}].kind", idx),
                format!("duplicate callback for output kind '{}'", callback.kind),
            ));
        }
        if callback.sink_type == SinkType::File
            && callback.params.get("path").is_none_or(|p| p.is_empty())
        {
            return Err(ContractError::config_validation(
                format!("callbacks[{}].params.path", idx),
                "file sink requires a path",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        CallbackConfig, ConfigVersion, DecoderType, InstanceConfig, MetaConfig, OutputConfig,
        SessionSettings,
    };

    fn instance(id: &str, downstream: &[&str]) -> InstanceConfig {
        InstanceConfig {
            id: id.into(),
            decoder_type: "uart".into(),
            outputs: vec![OutputConfig {
                kind: OutputKind::Forward,
                proto_id: None,
                meta: None,
            }],
            relay: None,
            downstream: downstream.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn minimal_blueprint() -> SessionBlueprint {
        SessionBlueprint {
            version: ConfigVersion::V1,
            session: SessionSettings::default(),
            decoder_types: vec![DecoderType::new("uart")],
            instances: vec![instance("phy", &["link"]), instance("link", &[])],
            callbacks: vec![],
        }
    }

    fn assert_field(result: Result<(), ContractError>, expected: &str) {
        match result {
            Err(ContractError::ConfigValidation { field, .. }) => {
                assert!(field.contains(expected), "field was {field}")
            }
            other => panic!("expected validation error on {expected}, got {other:?}"),
        }
    }

    #[test]
    fn test_valid_blueprint() {
        assert!(validate(&minimal_blueprint()).is_ok());
    }

    #[test]
    fn test_field_rules() {
        let mut bp = minimal_blueprint();
        bp.session.max_stack_depth = 0;
        assert_field(validate(&bp), "blueprint");
    }

    #[test]
    fn test_duplicate_ids() {
        let mut bp = minimal_blueprint();
        bp.decoder_types.push(DecoderType::new("uart"));
        assert_field(validate(&bp), "decoder_types[id=uart]");

        let mut bp = minimal_blueprint();
        bp.instances.push(instance("phy", &[]));
        assert_field(validate(&bp), "instances[id=phy]");
    }

    #[test]
    fn test_unknown_decoder_type() {
        let mut bp = minimal_blueprint();
        bp.instances[1].decoder_type = "spi".into();
        assert_field(validate(&bp), "instances[link].decoder_type");
    }

    #[test]
    fn test_unknown_downstream() {
        let mut bp = minimal_blueprint();
        bp.instances[1].downstream.push("ghost".into());
        assert_field(validate(&bp), "instances[link].downstream");
    }

    #[test]
    fn test_cycle_detected() {
        let mut bp = minimal_blueprint();
        bp.instances[1].downstream.push("phy".into());
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn test_stack_depth_limit() {
        let mut bp = minimal_blueprint();
        bp.session.max_stack_depth = 1;
        assert_field(validate(&bp), "session.max_stack_depth");
    }

    #[test]
    fn test_meta_output_requires_declaration() {
        let mut bp = minimal_blueprint();
        bp.instances[0].outputs.push(OutputConfig {
            kind: OutputKind::Meta,
            proto_id: None,
            meta: None,
        });
        assert_field(validate(&bp), "instances[phy].outputs[1].meta");

        bp.instances[0].outputs[1].meta = Some(MetaConfig {
            meta_type: "int".into(),
            name: "Bitrate".into(),
            description: String::new(),
        });
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_meta_type_name_resolved() {
        let mut bp = minimal_blueprint();
        bp.instances[0].outputs.push(OutputConfig {
            kind: OutputKind::Meta,
            proto_id: None,
            meta: Some(MetaConfig {
                meta_type: "string".into(),
                name: "Label".into(),
                description: String::new(),
            }),
        });
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("string"), "{err}");
        assert_field(Err(err), "instances[phy].outputs[1].meta.type");

        for name in ["double", "i64"] {
            if let Some(meta) = bp.instances[0].outputs[1].meta.as_mut() {
                meta.meta_type = name.into();
            }
            assert!(validate(&bp).is_ok(), "{name} should resolve");
        }
    }

    #[test]
    fn test_relay_channel_range() {
        let mut bp = minimal_blueprint();
        bp.instances[1].relay = Some(1);
        assert_field(validate(&bp), "instances[link].relay");
        bp.instances[1].relay = Some(0);
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_callbacks() {
        let mut bp = minimal_blueprint();
        bp.callbacks.push(CallbackConfig {
            kind: OutputKind::Annotation,
            sink_type: SinkType::File,
            params: HashMap::new(),
        });
        assert_field(validate(&bp), "callbacks[0].params.path");

        bp.callbacks[0]
            .params
            .insert("path".into(), "out/ann.jsonl".into());
        assert!(validate(&bp).is_ok());

        bp.callbacks.push(CallbackConfig {
            kind: OutputKind::Annotation,
            sink_type: SinkType::Log,
            params: HashMap::new(),
        });
        assert_field(validate(&bp), "callbacks[1].kind");
    }
}
