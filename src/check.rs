use crate::clause::{self, Compiled};
use crate::config::ProjectConfig;
use std::collections::HashSet;

pub struct CheckResult {
    pub compiled: Vec<(String, Compiled)>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// 依次编译清单中的全部方法模板，汇总错误与警告
pub fn run(config: &ProjectConfig) -> CheckResult {
    let mut compiled = Vec::new();
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    check_names(config, &mut warnings);

    for method in &config.methods {
        if method.template.trim().is_empty() {
            errors.push(format!("方法 {} 的模板为空", method.name));
            continue;
        }
        match clause::compile(&method.template, &method.params, &config.target, &method.name) {
            Ok(out) => compiled.push((method.name.clone(), out)),
            Err(e) => errors.push(format!("{e}")),
        }
    }

    CheckResult {
        compiled,
        errors,
        warnings,
    }
}

fn check_names(config: &ProjectConfig, warnings: &mut Vec<String>) {
    if config.methods.is_empty() {
        warnings.push("清单中没有任何 [[method]]".to_string());
    }

    let mut seen = HashSet::new();
    for method in &config.methods {
        if !seen.insert(method.name.as_str()) {
            warnings.push(format!("方法 {} 重复声明", method.name));
        }
    }
}
