use crate::clause::error::TemplateError;
use crate::param::{self, Param, ParamType};
use anyhow::Result;
use serde::Serialize;

/// 控制关键字
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Keyword {
    If,
    Else,
    ElseIf,
    End,
    Where,
    Set,
}

/// 片段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FragmentKind {
    /// 整数字面量
    Int,
    /// 双引号字符串字面量，值保留引号
    Str,
    /// true / false
    Bool,
    /// nil
    Nil,
    /// && ||
    Logical,
    /// > < >= <= == !=
    Comparison,
    Keyword(Keyword),
    /// 参数引用，类型继承自参数声明
    Param(ParamType),
}

/// 模板的最小词法单元，生成后不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub kind: FragmentKind,
    pub value: String,
    pub is_array: bool,
}

impl Fragment {
    fn new(kind: FragmentKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            is_array: false,
        }
    }

    pub fn keyword(&self) -> Option<Keyword> {
        match self.kind {
            FragmentKind::Keyword(k) => Some(k),
            _ => None,
        }
    }

    /// 可作为比较操作数的片段：字面量或参数引用
    pub fn is_operand(&self) -> bool {
        matches!(
            self.kind,
            FragmentKind::Int
                | FragmentKind::Str
                | FragmentKind::Bool
                | FragmentKind::Nil
                | FragmentKind::Param(_)
        )
    }

    /// 操作数的声明类型；字面量按其字面形式归类，nil 没有类型
    pub fn value_type(&self) -> Option<ParamType> {
        match self.kind {
            FragmentKind::Int => Some(ParamType::Int),
            FragmentKind::Str => Some(ParamType::String),
            FragmentKind::Bool => Some(ParamType::Bool),
            FragmentKind::Param(ty) => Some(ty),
            _ => None,
        }
    }
}

struct Source<'a> {
    name: &'a str,
    template: &'a str,
    params: &'a [Param],
}

/// 将模板文本切分为片段序列
pub fn tokenize(template: &str, params: &[Param], name: &str) -> Result<Vec<Fragment>> {
    let src = Source {
        name,
        template,
        params,
    };
    let mut fragments = Vec::new();
    let mut buf = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                buf.push(c);
                let mut prev = c;
                loop {
                    let Some(next) = chars.next() else {
                        return Err(incomplete(&src));
                    };
                    buf.push(next);
                    if next == '"' && prev != '\\' {
                        break;
                    }
                    prev = next;
                }
                fragments.push(Fragment::new(FragmentKind::Str, std::mem::take(&mut buf)));
            }
            '>' | '<' | '=' | '!' => {
                flush(&mut buf, &mut fragments, &src)?;
                let mut op = String::from(c);
                match chars.peek() {
                    None => return Err(incomplete(&src)),
                    Some('=') => {
                        op.push('=');
                        chars.next();
                    }
                    Some(_) => {}
                }
                fragments.push(classify(&op, &src)?);
            }
            '&' | '|' => match chars.peek() {
                None => return Err(incomplete(&src)),
                Some(&next) if next == c => {
                    chars.next();
                    flush(&mut buf, &mut fragments, &src)?;
                    fragments.push(Fragment::new(FragmentKind::Logical, format!("{c}{c}")));
                }
                Some(_) => {
                    // 单个 & / | 不构成任何 token，直接丢弃
                    tracing::warn!(template = name, "忽略未成对的逻辑运算符 '{c}'");
                }
            },
            c if c.is_whitespace() => flush(&mut buf, &mut fragments, &src)?,
            _ => buf.push(c),
        }
    }
    flush(&mut buf, &mut fragments, &src)?;

    tracing::debug!(template = name, count = fragments.len(), "模板切分完成");
    Ok(fragments)
}

fn incomplete(src: &Source) -> anyhow::Error {
    TemplateError::lexical(
        src.name,
        format!("incomplete code: {}", src.template),
        src.template,
    )
    .into()
}

fn flush(buf: &mut String, fragments: &mut Vec<Fragment>, src: &Source) -> Result<()> {
    if buf.is_empty() {
        return Ok(());
    }
    let token = std::mem::take(buf);
    fragments.push(classify(&token, src)?);
    Ok(())
}

/// 按优先级识别单个 token：整数、逻辑/比较运算符、关键字、布尔、nil，最后匹配参数名
fn classify(token: &str, src: &Source) -> Result<Fragment> {
    let value = token.trim();
    let folded = value.to_lowercase();

    let kind = if !folded.is_empty() && folded.chars().all(|c| c.is_ascii_digit()) {
        FragmentKind::Int
    } else {
        match folded.as_str() {
            "&&" | "||" => FragmentKind::Logical,
            ">" | "<" | ">=" | "<=" | "==" | "!=" => FragmentKind::Comparison,
            "end" => FragmentKind::Keyword(Keyword::End),
            "if" => FragmentKind::Keyword(Keyword::If),
            "set" => FragmentKind::Keyword(Keyword::Set),
            "else" => FragmentKind::Keyword(Keyword::Else),
            "elseif" => FragmentKind::Keyword(Keyword::ElseIf),
            "where" => FragmentKind::Keyword(Keyword::Where),
            "true" | "false" => FragmentKind::Bool,
            "nil" => FragmentKind::Nil,
            _ => {
                let Some(param) = param::lookup(src.params, value) else {
                    return Err(TemplateError::classification(
                        src.name,
                        format!("unknown parameter: {value}"),
                        src.template,
                    )
                    .into());
                };
                return Ok(Fragment {
                    kind: FragmentKind::Param(param.ty),
                    value: value.to_string(),
                    is_array: param.is_array,
                });
            }
        }
    };
    Ok(Fragment::new(kind, value))
}

/// 以单个空格拼接片段原文
pub fn join(fragments: &[Fragment]) -> String {
    fragments
        .iter()
        .map(|f| f.value.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Vec<Param> {
        vec![
            Param::new("Name", ParamType::String),
            Param::new("Age", ParamType::Int),
            Param::array("IDs", ParamType::Int),
            Param::new("Score", ParamType::from_declared("float64")),
        ]
    }

    fn lex(input: &str) -> Vec<(FragmentKind, String)> {
        tokenize(input, &params(), "test")
            .unwrap()
            .into_iter()
            .map(|f| (f.kind, f.value))
            .collect()
    }

    fn lex_err(input: &str) -> TemplateError {
        let err = tokenize(input, &params(), "test").unwrap_err();
        err.downcast::<TemplateError>().unwrap()
    }

    #[test]
    fn operators_split_without_spaces() {
        let tokens = lex("Name!=\"\"");
        assert_eq!(
            tokens,
            vec![
                (FragmentKind::Param(ParamType::String), "Name".to_string()),
                (FragmentKind::Comparison, "!=".to_string()),
                (FragmentKind::Str, "\"\"".to_string()),
            ]
        );
    }

    #[test]
    fn two_char_operators() {
        let kinds: Vec<_> = lex("Age >= 1 && Age <= 9 || Age == 3")
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        assert_eq!(kinds, vec!["Age", ">=", "1", "&&", "Age", "<=", "9", "||", "Age", "==", "3"]);
    }

    #[test]
    fn keywords_are_case_folded() {
        let tokens = lex("WHERE If Else ElseIf END set");
        let kinds: Vec<_> = tokens.into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            kinds,
            vec![
                FragmentKind::Keyword(Keyword::Where),
                FragmentKind::Keyword(Keyword::If),
                FragmentKind::Keyword(Keyword::Else),
                FragmentKind::Keyword(Keyword::ElseIf),
                FragmentKind::Keyword(Keyword::End),
                FragmentKind::Keyword(Keyword::Set),
            ]
        );
    }

    #[test]
    fn string_literal_keeps_spaces_and_escaped_quotes() {
        let tokens = lex(r#""name = \"x\" " Name"#);
        assert_eq!(tokens[0], (FragmentKind::Str, r#""name = \"x\" ""#.to_string()));
        assert_eq!(tokens[1].1, "Name");
    }

    #[test]
    fn param_inherits_type_and_array_flag() {
        let fragments = tokenize("IDs Score nil true", &params(), "test").unwrap();
        assert_eq!(fragments[0].kind, FragmentKind::Param(ParamType::Int));
        assert!(fragments[0].is_array);
        assert_eq!(fragments[1].kind, FragmentKind::Param(ParamType::Other));
        assert_eq!(fragments[2].kind, FragmentKind::Nil);
        assert_eq!(fragments[3].kind, FragmentKind::Bool);
    }

    #[test]
    fn single_ampersand_is_dropped() {
        assert_eq!(lex("Age & 1").len(), 2);
        assert_eq!(lex("Na&me"), vec![(FragmentKind::Param(ParamType::String), "Name".to_string())]);
    }

    #[test]
    fn unknown_token_is_classification_error() {
        let err = lex_err("if name == 1");
        assert!(matches!(err, TemplateError::Classification { .. }));
        assert_eq!(err.message(), "unknown parameter: name");
    }

    #[test]
    fn unterminated_string_is_lexical_error() {
        let err = lex_err("\"abc");
        assert!(matches!(err, TemplateError::Lexical { .. }));
        assert!(err.message().starts_with("incomplete code"));
    }

    #[test]
    fn operator_at_end_of_input_is_lexical_error() {
        assert!(matches!(lex_err("Age >"), TemplateError::Lexical { .. }));
        assert!(matches!(lex_err("Age &"), TemplateError::Lexical { .. }));
    }
}
