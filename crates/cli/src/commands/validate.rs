//! `validate` command implementation.

use std::collections::HashSet;

use anyhow::{Context, Result};
use contracts::{OutputKind, SessionBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    decoder_type_count: usize,
    instance_count: usize,
    output_count: usize,
    callback_count: usize,
    max_stack_depth: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    match super::load_blueprint(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(summarize(&blueprint)),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("{e:#}")),
            warnings: None,
            summary: None,
        },
    }
}

fn summarize(blueprint: &SessionBlueprint) -> ConfigSummary {
    ConfigSummary {
        version: format!("{:?}", blueprint.version),
        decoder_type_count: blueprint.decoder_types.len(),
        instance_count: blueprint.instances.len(),
        output_count: blueprint.instances.iter().map(|i| i.outputs.len()).sum(),
        callback_count: blueprint.callbacks.len(),
        max_stack_depth: blueprint.session.max_stack_depth,
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &SessionBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.callbacks.is_empty() {
        warnings.push(
            "No callbacks configured - only stacked decoders will see output".to_string(),
        );
    }

    let handled: HashSet<OutputKind> = blueprint.callbacks.iter().map(|c| c.kind).collect();
    for instance in &blueprint.instances {
        if instance.outputs.is_empty() {
            warnings.push(format!("Instance '{}' declares no outputs", instance.id));
        }
        for output in &instance.outputs {
            let stacked = output.kind.forwards_downstream() && !instance.downstream.is_empty();
            if !handled.contains(&output.kind) && !stacked {
                warnings.push(format!(
                    "Instance '{}' {} output has no consumer",
                    instance.id, output.kind
                ));
            }
        }
    }

    let used: HashSet<&str> = blueprint
        .instances
        .iter()
        .map(|i| i.decoder_type.as_str())
        .collect();
    for decoder_type in &blueprint.decoder_types {
        if !used.contains(decoder_type.id.as_str()) {
            warnings.push(format!(
                "Decoder type '{}' is not used by any instance",
                decoder_type.id
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Decoder types: {}", summary.decoder_type_count);
            println!("  Instances: {}", summary.instance_count);
            println!("  Outputs: {}", summary.output_count);
            println!("  Callbacks: {}", summary.callback_count);
            println!("  Max stack depth: {}", summary.max_stack_depth);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
