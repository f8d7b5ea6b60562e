pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod statement;
pub mod validate;

use crate::param::Param;
use anyhow::Result;
use codegen::Target;
use parser::{Clause, Parser};
use serde::Serialize;

/// 单个模板的编译结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Compiled {
    /// 顶层子句
    pub clauses: Vec<Clause>,
    /// 按顺序拼接即可得到运行时组装逻辑的语句
    pub assembly: Vec<String>,
}

/// 编译 SQL 模板：切分片段、归并语句、解析子句并生成拼装语句
///
/// `name` 仅用于错误信息与日志，通常为模板所属的方法名。
pub fn compile(template: &str, params: &[Param], target: &Target, name: &str) -> Result<Compiled> {
    let fragments = lexer::tokenize(template, params, name)?;
    let statements = statement::group(&fragments, name, template)?;
    let (clauses, assembly) = Parser::new(statements, target, name, template).parse()?;
    tracing::debug!(
        template = name,
        clauses = clauses.len(),
        lines = assembly.len(),
        "模板编译完成"
    );
    Ok(Compiled { clauses, assembly })
}
