use crate::clause::codegen::Target;
use crate::param::Param;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

pub const CONFIG_FILE: &str = "sqlclause.toml";

#[derive(Debug, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub target: Target,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default, rename = "method")]
    pub methods: Vec<MethodConfig>,
}

#[derive(Debug, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// [[method]] 一个带模板注释的查询方法
#[derive(Debug, Clone, Deserialize)]
pub struct MethodConfig {
    pub name: String,
    pub template: String,
    #[serde(default)]
    pub params: Vec<Param>,
}

impl ProjectConfig {
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(CONFIG_FILE);
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("读取 {} 失败", config_path.display()))?;
        Self::parse(&content).with_context(|| format!("解析 {} 失败", config_path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: ProjectConfig = toml::from_str(content)?;
        Ok(config)
    }
}

fn default_log_level() -> String { "info".into() }

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ParamType;

    #[test]
    fn empty_manifest_uses_defaults() {
        let config = ProjectConfig::parse("").unwrap();
        assert_eq!(config.target, Target::default());
        assert_eq!(config.log.level, "info");
        assert!(config.methods.is_empty());
    }

    #[test]
    fn methods_and_params() {
        let config = ProjectConfig::parse(
            r#"
            [target]
            helper = "rt"

            [[method]]
            name = "FindByIDs"
            template = 'where if IDs != nil "id in " IDs end end'
            params = [{ name = "IDs", type = "int", array = true }, { name = "At", type = "Time" }]
            "#,
        )
        .unwrap();
        assert_eq!(config.target.helper, "rt");
        assert_eq!(config.target.capacity, 100);
        let method = &config.methods[0];
        assert_eq!(method.name, "FindByIDs");
        assert_eq!(method.params[0], Param::array("IDs", ParamType::Int));
        assert_eq!(method.params[1], Param::new("At", ParamType::Time));
    }

    #[test]
    fn missing_template_is_error() {
        assert!(ProjectConfig::parse("[[method]]\nname = \"X\"").is_err());
    }
}
