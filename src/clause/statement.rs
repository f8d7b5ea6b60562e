use crate::clause::error::TemplateError;
use crate::clause::lexer::{self, Fragment, FragmentKind, Keyword};
use anyhow::Result;

/// 语句类型：控制关键字或字面量片段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// 字符串、参数、字面值等直接拼入 SQL 的内容
    Literal,
    If,
    ElseIf,
    Else,
    Where,
    Set,
    End,
}

/// 由一组片段归并而成的语句
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    /// if / elseif 的条件文本，字面量语句为片段原文
    pub value: String,
    /// 以空格拼接的原始片段
    pub origin: String,
    pub fragments: Vec<Fragment>,
}

impl Statement {
    fn literal(fragment: Fragment) -> Self {
        Self {
            kind: StatementKind::Literal,
            value: fragment.value.clone(),
            origin: fragment.value.clone(),
            fragments: vec![fragment],
        }
    }
}

/// 将片段序列归并为语句序列
///
/// 控制关键字连同其条件表达式归为一条语句；其余每个片段单独成为字面量语句，
/// 由解析器合并连续的字面量。
pub fn group(fragments: &[Fragment], name: &str, template: &str) -> Result<Vec<Statement>> {
    let mut statements = Vec::new();
    let mut i = 0;

    while i < fragments.len() {
        let end = match fragments[i].keyword() {
            None => {
                statements.push(Statement::literal(fragments[i].clone()));
                i += 1;
                continue;
            }
            Some(Keyword::If | Keyword::ElseIf) => condition_end(fragments, i, i + 1, name)?,
            Some(Keyword::Else) => {
                let is_else_if = fragments.get(i + 1).and_then(Fragment::keyword) == Some(Keyword::If)
                    && i + 2 < fragments.len();
                if is_else_if {
                    condition_end(fragments, i, i + 2, name)?
                } else {
                    i + 1
                }
            }
            Some(Keyword::Where | Keyword::Set | Keyword::End) => i + 1,
        };
        statements.push(to_statement(&fragments[i..end], name, template)?);
        i = end;
    }

    tracing::debug!(template = name, count = statements.len(), "语句归并完成");
    Ok(statements)
}

/// 从 `cond_start` 起贪婪匹配条件表达式：`operand [cmp operand] (logical ...)*`
fn condition_end(
    fragments: &[Fragment],
    stmt_start: usize,
    cond_start: usize,
    name: &str,
) -> Result<usize> {
    let operand_at = |i: usize| fragments.get(i).is_some_and(Fragment::is_operand);
    let kind_at = |i: usize| fragments.get(i).map(|f| f.kind);

    let mut i = cond_start;
    if !operand_at(i) {
        // 没有条件，交给 to_statement 报语法错误
        return Ok(cond_start);
    }
    loop {
        i += 1;
        if kind_at(i) == Some(FragmentKind::Comparison) {
            if !operand_at(i + 1) {
                return Err(dangling(fragments, stmt_start, i + 1, name));
            }
            i += 2;
        }
        if kind_at(i) != Some(FragmentKind::Logical) {
            return Ok(i);
        }
        i += 1;
        if !operand_at(i) {
            return Err(dangling(fragments, stmt_start, i, name));
        }
    }
}

fn dangling(fragments: &[Fragment], start: usize, end: usize, name: &str) -> anyhow::Error {
    let text = lexer::join(&fragments[start..end.min(fragments.len())]);
    TemplateError::syntax(name, format!("syntax error: {text}"), &text).into()
}

/// 按首个关键字确定语句类型，其余片段作为条件
fn to_statement(run: &[Fragment], name: &str, template: &str) -> Result<Statement> {
    let origin = lexer::join(run);
    let statement = |kind: StatementKind, cond: &[Fragment]| Statement {
        kind,
        value: lexer::join(cond),
        origin: origin.clone(),
        fragments: run.to_vec(),
    };

    match run.first().and_then(Fragment::keyword) {
        Some(Keyword::If) if run.len() > 1 => return Ok(statement(StatementKind::If, &run[1..])),
        Some(Keyword::ElseIf) if run.len() > 1 => {
            return Ok(statement(StatementKind::ElseIf, &run[1..]));
        }
        Some(Keyword::Else) => {
            if run.len() == 1 {
                return Ok(statement(StatementKind::Else, &[]));
            }
            if run[1].keyword() == Some(Keyword::If) && run.len() > 2 {
                return Ok(statement(StatementKind::ElseIf, &run[2..]));
            }
        }
        Some(Keyword::Where) => return Ok(statement(StatementKind::Where, &[])),
        Some(Keyword::Set) => return Ok(statement(StatementKind::Set, &[])),
        Some(Keyword::End) => return Ok(statement(StatementKind::End, &[])),
        _ => {}
    }

    Err(TemplateError::syntax(name, format!("syntax error: {origin}"), template).into())
}
