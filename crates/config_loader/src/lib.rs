//! # Config Loader
//!
//! Turns a session config file into a validated `SessionBlueprint`.
//!
//! Loading from a path also anchors the file sinks: a relative `params.path`
//! is taken relative to the directory holding the config, so the same
//! session file writes to the same place wherever the router is started.
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("demos/session.toml")).unwrap();
//! for instance in &blueprint.instances {
//!     println!("{} -> {:?}", instance.id, instance.downstream);
//! }
//! ```

mod parser;
mod validator;

pub use contracts::SessionBlueprint;
pub use parser::ConfigFormat;

use std::path::{Path, PathBuf};

use contracts::{ContractError, SinkType};

/// Session config entry points
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a `.toml` or `.json` session file.
    ///
    /// Relative file sink paths are rebased onto the file's directory before
    /// validation runs.
    pub fn load_from_path(path: &Path) -> Result<SessionBlueprint, ContractError> {
        let format = ConfigFormat::from_path(path)?;
        let content = std::fs::read_to_string(path)?;
        let mut blueprint = format.parse(&content)?;
        if let Some(dir) = path.parent() {
            anchor_sink_paths(&mut blueprint, dir);
        }
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Load from in-memory text. Sink paths are used as written.
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<SessionBlueprint, ContractError> {
        let blueprint = format.parse(content)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    pub fn to_toml(blueprint: &SessionBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Toml.render(blueprint)
    }

    pub fn to_json(blueprint: &SessionBlueprint) -> Result<String, ContractError> {
        ConfigFormat::Json.render(blueprint)
    }
}

/// Rebase relative file sink paths onto `dir`.
///
/// Empty paths are left alone so the validator still reports them.
fn anchor_sink_paths(blueprint: &mut SessionBlueprint, dir: &Path) {
    for callback in &mut blueprint.callbacks {
        if callback.sink_type != SinkType::File {
            continue;
        }
        let Some(raw) = callback.params.get_mut("path") else {
            continue;
        };
        let path = PathBuf::from(raw.as_str());
        if raw.is_empty() || path.is_absolute() {
            continue;
        }
        *raw = dir.join(path).display().to_string();
    }
}
