//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{InstanceConfig, SessionBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    max_stack_depth: usize,
    decoder_types: Vec<DecoderTypeInfo>,
    instances: Vec<InstanceInfo>,
    /// Instances no other instance stacks on
    roots: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    callbacks: Vec<CallbackInfo>,
}

#[derive(Serialize)]
struct DecoderTypeInfo {
    id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    annotations: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    binary: Vec<String>,
}

#[derive(Serialize)]
struct InstanceInfo {
    id: String,
    decoder_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    outputs: Vec<OutputInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    relay: Option<usize>,
    downstream: Vec<String>,
}

#[derive(Serialize)]
struct OutputInfo {
    channel: usize,
    kind: String,
    proto_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    meta_type: Option<String>,
}

#[derive(Serialize)]
struct CallbackInfo {
    kind: String,
    sink_type: String,
    #[serde(skip_serializing_if = "std::collections::HashMap::is_empty")]
    params: std::collections::HashMap<String, String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = super::load_blueprint(&args.config)?;

    if args.json {
        let info = build_config_info(&blueprint, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn outputs_of(instance: &InstanceConfig) -> Vec<OutputInfo> {
    instance
        .outputs
        .iter()
        .enumerate()
        .map(|(channel, output)| OutputInfo {
            channel,
            kind: output.kind.to_string(),
            proto_id: output
                .proto_id
                .clone()
                .unwrap_or_else(|| instance.id.clone()),
            meta_type: output.meta.as_ref().map(|m| m.meta_type.clone()),
        })
        .collect()
}

/// Instances that are not downstream of anything, in declaration order
fn stack_roots(blueprint: &SessionBlueprint) -> Vec<&InstanceConfig> {
    blueprint
        .instances
        .iter()
        .filter(|candidate| {
            !blueprint
                .instances
                .iter()
                .any(|i| i.downstream.contains(&candidate.id))
        })
        .collect()
}

fn build_config_info(blueprint: &SessionBlueprint, args: &InfoArgs) -> ConfigInfo {
    let decoder_types = blueprint
        .decoder_types
        .iter()
        .map(|t| DecoderTypeInfo {
            id: t.id.clone(),
            annotations: if args.classes {
                t.annotations.iter().map(|c| c.id.clone()).collect()
            } else {
                Vec::new()
            },
            binary: if args.classes {
                t.binary.iter().map(|c| c.id.clone()).collect()
            } else {
                Vec::new()
            },
        })
        .collect();

    let instances = blueprint
        .instances
        .iter()
        .map(|i| InstanceInfo {
            id: i.id.clone(),
            decoder_type: i.decoder_type.clone(),
            outputs: if args.outputs {
                outputs_of(i)
            } else {
                Vec::new()
            },
            relay: i.relay,
            downstream: i.downstream.clone(),
        })
        .collect();

    let callbacks = blueprint
        .callbacks
        .iter()
        .map(|c| CallbackInfo {
            kind: c.kind.to_string(),
            sink_type: format!("{:?}", c.sink_type),
            params: c.params.clone(),
        })
        .collect();

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        max_stack_depth: blueprint.session.max_stack_depth,
        decoder_types,
        instances,
        roots: stack_roots(blueprint)
            .into_iter()
            .map(|i| i.id.clone())
            .collect(),
        callbacks,
    }
}

fn print_config_info(blueprint: &SessionBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Decoder Stack Configuration                    ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("⚙️  Session");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!("   └─ Max stack depth: {}", blueprint.session.max_stack_depth);

    println!("\n📚 Decoder types ({})", blueprint.decoder_types.len());
    for (i, decoder_type) in blueprint.decoder_types.iter().enumerate() {
        let is_last = i == blueprint.decoder_types.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };

        println!(
            "   {} {} ({} annotation, {} binary classes)",
            prefix,
            decoder_type.id,
            decoder_type.annotations.len(),
            decoder_type.binary.len()
        );
        if args.classes {
            for (j, class) in decoder_type.annotations.iter().enumerate() {
                println!("   {}     ann[{}] {}  {}", child_prefix, j, class.id, class.description);
            }
            for (j, class) in decoder_type.binary.iter().enumerate() {
                println!("   {}     bin[{}] {}  {}", child_prefix, j, class.id, class.description);
            }
        }
    }

    println!("\n🧱 Stack");
    let roots = stack_roots(blueprint);
    for (i, root) in roots.iter().enumerate() {
        print_stack_node(blueprint, root, "   ", i == roots.len() - 1, args);
    }

    if !blueprint.callbacks.is_empty() {
        println!("\n📤 Callbacks ({})", blueprint.callbacks.len());
        for (i, callback) in blueprint.callbacks.iter().enumerate() {
            let is_last = i == blueprint.callbacks.len() - 1;
            let prefix = if is_last { "└─" } else { "├─" };
            println!("   {} {} ({:?})", prefix, callback.kind, callback.sink_type);
        }
    }

    println!();
}

/// Print `instance` and everything stacked on it
fn print_stack_node(
    blueprint: &SessionBlueprint,
    instance: &InstanceConfig,
    indent: &str,
    is_last: bool,
    args: &InfoArgs,
) {
    let prefix = if is_last { "└─" } else { "├─" };
    let child_indent = format!("{}{}", indent, if is_last { "   " } else { "│  " });

    println!("{}{} {} ({})", indent, prefix, instance.id, instance.decoder_type);
    if args.outputs {
        for output in outputs_of(instance) {
            let relay = if instance.relay == Some(output.channel) {
                " [relay]"
            } else {
                ""
            };
            println!(
                "{}   #{} {} '{}'{}",
                child_indent, output.channel, output.kind, output.proto_id, relay
            );
        }
    }

    let children: Vec<&InstanceConfig> = instance
        .downstream
        .iter()
        .filter_map(|id| blueprint.instances.iter().find(|i| &i.id == id))
        .collect();
    for (i, child) in children.iter().enumerate() {
        print_stack_node(blueprint, child, &child_indent, i == children.len() - 1, args);
    }
}
