//! 会话配置的文本格式
//!
//! `ConfigFormat` 同时负责读入和写出，保证 TOML 与 JSON 两种表示可以互转。

use std::path::Path;

use contracts::{ContractError, SessionBlueprint};

/// 会话配置文本格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.toml`，手写配置的首选
    Toml,
    /// `.json`，便于工具生成
    Json,
}

impl ConfigFormat {
    /// 按扩展名识别，大小写不敏感
    pub fn from_extension(ext: &str) -> Option<Self> {
        if ext.eq_ignore_ascii_case("toml") {
            Some(Self::Toml)
        } else if ext.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    /// 从配置文件路径识别格式
    pub fn from_path(path: &Path) -> Result<Self, ContractError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => Self::from_extension(ext).ok_or_else(|| {
                ContractError::config_parse(format!(
                    "unsupported config format: .{ext} ({})",
                    path.display()
                ))
            }),
            None => Err(ContractError::config_parse(format!(
                "{} has no .toml or .json extension",
                path.display()
            ))),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Toml => "TOML",
            Self::Json => "JSON",
        }
    }

    /// 文本 -> 蓝图（不做语义校验）
    pub fn parse(self, content: &str) -> Result<SessionBlueprint, ContractError> {
        let parsed: Result<SessionBlueprint, BoxedError> = match self {
            Self::Toml => toml::from_str(content).map_err(boxed),
            Self::Json => serde_json::from_str(content).map_err(boxed),
        };
        parsed.map_err(|source| ContractError::ConfigParse {
            message: format!("{} session config: {source}", self.label()),
            source: Some(source),
        })
    }

    /// 蓝图 -> 文本
    pub fn render(self, blueprint: &SessionBlueprint) -> Result<String, ContractError> {
        let rendered: Result<String, BoxedError> = match self {
            Self::Toml => toml::to_string_pretty(blueprint).map_err(boxed),
            Self::Json => serde_json::to_string_pretty(blueprint).map_err(boxed),
        };
        rendered.map_err(|source| ContractError::ConfigParse {
            message: format!("cannot render session as {}: {source}", self.label()),
            source: Some(source),
        })
    }
}

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

fn boxed(e: impl std::error::Error + Send + Sync + 'static) -> BoxedError {
    Box::new(e)
}
