use crate::clause::error::TemplateError;
use crate::clause::lexer::{self, Fragment, FragmentKind};
use crate::param::ParamType;
use anyhow::Result;

/// 检查控制语句中条件表达式的操作数类型
///
/// 首个片段为引导关键字，从第二个片段开始检查。每个非布尔操作数与其后两个片段
/// 组成 `操作数 比较符 操作数` 三元组：比较符必须合法，两侧类型必须一致，
/// nil 只能与数组比较。
pub fn check(fragments: &[Fragment], name: &str) -> Result<()> {
    let mut i = 1;
    while i < fragments.len() {
        match fragments[i].kind {
            FragmentKind::Keyword(_)
            | FragmentKind::Bool
            | FragmentKind::Logical
            | FragmentKind::Param(ParamType::Bool) => {}
            FragmentKind::Int | FragmentKind::Str | FragmentKind::Nil | FragmentKind::Param(_) => {
                if i + 2 < fragments.len() {
                    let expr = &fragments[i..i + 3];
                    if !is_expression_valid(expr) {
                        let text = lexer::join(expr);
                        return Err(TemplateError::type_mismatch(
                            name,
                            format!("condition type not match: {text}"),
                            &lexer::join(fragments),
                        )
                        .into());
                    }
                    i += 2;
                }
            }
            FragmentKind::Comparison => {
                return Err(TemplateError::type_mismatch(
                    name,
                    format!("unknown fragment: {}", fragments[i].value),
                    &lexer::join(fragments),
                )
                .into());
            }
        }
        i += 1;
    }
    Ok(())
}

fn is_expression_valid(expr: &[Fragment]) -> bool {
    let [left, op, right] = expr else {
        return false;
    };
    if op.kind != FragmentKind::Comparison {
        return false;
    }
    if left.kind == FragmentKind::Nil || right.kind == FragmentKind::Nil {
        return left.is_array || right.is_array;
    }
    left.value_type() == right.value_type()
}
