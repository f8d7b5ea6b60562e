use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("{}", format_error("词法错误", template, message, source_text))]
    Lexical {
        template: String,
        message: String,
        source_text: String,
    },

    #[error("{}", format_error("参数错误", template, message, source_text))]
    Classification {
        template: String,
        message: String,
        source_text: String,
    },

    #[error("{}", format_error("语法错误", template, message, source_text))]
    Syntax {
        template: String,
        message: String,
        source_text: String,
    },

    #[error("{}", format_error("类型错误", template, message, source_text))]
    Type {
        template: String,
        message: String,
        source_text: String,
    },
}

fn format_error(kind: &str, template: &str, message: &str, source_text: &str) -> String {
    let mut out = format!("sql template {kind}\n  → {template}\n\n");
    if !source_text.is_empty() {
        out.push_str(&format!("  | {source_text}\n"));
    }
    out.push_str(&format!("  错误：{message}"));
    out
}

impl TemplateError {
    pub fn lexical(template: &str, message: impl Into<String>, source: &str) -> Self {
        Self::Lexical {
            template: template.to_string(),
            message: message.into(),
            source_text: source.to_string(),
        }
    }

    pub fn classification(template: &str, message: impl Into<String>, source: &str) -> Self {
        Self::Classification {
            template: template.to_string(),
            message: message.into(),
            source_text: source.to_string(),
        }
    }

    pub fn syntax(template: &str, message: impl Into<String>, source: &str) -> Self {
        Self::Syntax {
            template: template.to_string(),
            message: message.into(),
            source_text: source.to_string(),
        }
    }

    pub fn type_mismatch(template: &str, message: impl Into<String>, source: &str) -> Self {
        Self::Type {
            template: template.to_string(),
            message: message.into(),
            source_text: source.to_string(),
        }
    }

    /// 不含模板名与源码上下文的错误描述
    pub fn message(&self) -> &str {
        match self {
            Self::Lexical { message, .. }
            | Self::Classification { message, .. }
            | Self::Syntax { message, .. }
            | Self::Type { message, .. } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_contains_template_source_and_message() {
        let err = TemplateError::syntax("FindByName", "syntax error: else else", "else else");
        let text = err.to_string();
        assert!(text.contains("→ FindByName"));
        assert!(text.contains("| else else"));
        assert!(text.ends_with("syntax error: else else"));
        assert_eq!(err.message(), "syntax error: else else");
    }
}
