use crate::clause::codegen::{self, Assembly, Target};
use crate::clause::error::TemplateError;
use crate::clause::lexer::FragmentKind;
use crate::clause::statement::{Statement, StatementKind};
use crate::clause::validate;
use anyhow::Result;
use serde::Serialize;

/// 子句 AST 节点
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Clause {
    /// 字面量与参数引用的连续片段
    Sql(SqlClause),
    If(IfClause),
    Where(BlockClause),
    Set(BlockClause),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlClause {
    pub pieces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IfClause {
    pub var_name: String,
    pub cond: String,
    pub body: Vec<Clause>,
    pub else_branches: Vec<ElseClause>,
}

/// else / elseif 分支，`cond` 为合成后的有效条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElseClause {
    pub cond: String,
    pub body: Vec<Clause>,
}

/// where / set 块，只包含字面量与 if 子句
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlockClause {
    pub var_name: String,
    pub body: Vec<Clause>,
}

#[derive(Debug, Clone, Copy)]
enum Block {
    Where,
    Set,
}

impl Block {
    fn keyword(self) -> &'static str {
        match self {
            Self::Where => "where",
            Self::Set => "set",
        }
    }
}

/// 单个模板的解析状态：语句游标、各类变量名计数与累积的拼装语句。
/// 每次编译新建一个，不可跨模板复用。
pub struct Parser<'a> {
    statements: Vec<Statement>,
    pos: usize,
    if_count: usize,
    where_count: usize,
    set_count: usize,
    asm: Assembly<'a>,
    target: &'a Target,
    name: &'a str,
    template: &'a str,
}

impl<'a> Parser<'a> {
    pub fn new(
        statements: Vec<Statement>,
        target: &'a Target,
        name: &'a str,
        template: &'a str,
    ) -> Self {
        Self {
            statements,
            pos: 0,
            if_count: 0,
            where_count: 0,
            set_count: 0,
            asm: Assembly::new(target),
            target,
            name,
            template,
        }
    }

    fn next(&mut self) -> Option<Statement> {
        let statement = self.statements.get(self.pos).cloned()?;
        self.pos += 1;
        Some(statement)
    }

    /// 退回上一条语句，留给调用方所在层级处理
    fn back(&mut self) {
        self.pos -= 1;
    }

    fn if_name(&mut self) -> String {
        let name = format!("ifCond{}", self.if_count);
        self.if_count += 1;
        name
    }

    fn block_name(&mut self, block: Block) -> String {
        match block {
            Block::Where => {
                let name = format!("whereCond{}", self.where_count);
                self.where_count += 1;
                name
            }
            Block::Set => {
                let name = format!("setCond{}", self.set_count);
                self.set_count += 1;
                name
            }
        }
    }

    fn syntax_error(&self, message: impl Into<String>) -> anyhow::Error {
        TemplateError::syntax(self.name, message, self.template).into()
    }

    /// 解析全部语句，返回顶层子句与拼装语句
    pub fn parse(mut self) -> Result<(Vec<Clause>, Vec<String>)> {
        if self.statements.is_empty() {
            return Err(self.syntax_error("template is empty"));
        }

        let mut clauses = Vec::new();
        while let Some(statement) = self.next() {
            if statement.kind == StatementKind::End {
                tracing::warn!(template = self.name, "顶层存在多余的 end，已忽略");
                continue;
            }
            self.asm.separator();
            let clause = match statement.kind {
                StatementKind::Literal => {
                    self.back();
                    Clause::Sql(self.parse_sql())
                }
                StatementKind::If => Clause::If(self.parse_if(&statement)?),
                StatementKind::Where => Clause::Where(self.parse_block(Block::Where)?),
                StatementKind::Set => Clause::Set(self.parse_block(Block::Set)?),
                StatementKind::Else | StatementKind::ElseIf | StatementKind::End => {
                    return Err(self.syntax_error(format!("unknown clause: {}", statement.origin)));
                }
            };
            let text = codegen::render(&clause, self.target);
            self.asm.accumulate(&text);
            clauses.push(clause);
        }

        Ok((clauses, self.asm.into_lines()))
    }

    /// 合并连续的字面量语句
    fn parse_sql(&mut self) -> SqlClause {
        let mut pieces = Vec::new();
        while let Some(statement) = self.next() {
            if statement.kind != StatementKind::Literal {
                self.back();
                break;
            }
            pieces.push(statement.value);
        }
        SqlClause { pieces }
    }

    fn parse_if(&mut self, statement: &Statement) -> Result<IfClause> {
        validate::check(&statement.fragments, self.name)?;

        let var_name = self.if_name();
        self.asm.create_if(&var_name);

        let mut clause = IfClause {
            var_name,
            cond: statement.value.clone(),
            body: Vec::new(),
            else_branches: Vec::new(),
        };
        // 已出现的分支条件，用于合成后续分支的互斥条件
        let mut prior = vec![clause.cond.clone()];
        let mut terminated = false;

        while let Some(next) = self.next() {
            match next.kind {
                StatementKind::Literal | StatementKind::If | StatementKind::Where | StatementKind::Set => {
                    let child = self.parse_child(next)?;
                    let text = codegen::render(&child, self.target);
                    self.asm.append_if_cond(&clause.var_name, &clause.cond, &text);
                    clause.body.push(child);
                }
                StatementKind::ElseIf | StatementKind::Else => {
                    if terminated {
                        return Err(self.syntax_error(format!(
                            "else must be the last branch: {}",
                            next.origin
                        )));
                    }
                    let cond = if next.kind == StatementKind::ElseIf {
                        validate::check(&next.fragments, self.name)?;
                        format!("!({}) && {}", prior.join(" || "), grouped(&next))
                    } else {
                        terminated = true;
                        format!("!({})", prior.join(" || "))
                    };
                    let branch = ElseClause {
                        cond,
                        body: self.parse_else_body()?,
                    };
                    let text = codegen::render_else(&branch, self.target);
                    self.asm.append_if_cond(&clause.var_name, &branch.cond, &text);
                    clause.else_branches.push(branch);
                    if next.kind == StatementKind::ElseIf {
                        prior.push(next.value);
                    }
                }
                StatementKind::End => return Ok(clause),
            }
        }

        Err(self.syntax_error("incomplete SQL, if not end"))
    }

    /// 解析 if 主体或 else 分支中的一个子句
    fn parse_child(&mut self, statement: Statement) -> Result<Clause> {
        Ok(match statement.kind {
            StatementKind::If => Clause::If(self.parse_if(&statement)?),
            StatementKind::Where => Clause::Where(self.parse_block(Block::Where)?),
            StatementKind::Set => Clause::Set(self.parse_block(Block::Set)?),
            _ => {
                self.back();
                Clause::Sql(self.parse_sql())
            }
        })
    }

    /// 贪婪读取分支体，遇到 elseif / else / end 时退回交给外层 if
    fn parse_else_body(&mut self) -> Result<Vec<Clause>> {
        let mut body = Vec::new();
        while let Some(next) = self.next() {
            match next.kind {
                StatementKind::Literal | StatementKind::If | StatementKind::Where | StatementKind::Set => {
                    body.push(self.parse_child(next)?);
                }
                _ => {
                    self.back();
                    break;
                }
            }
        }
        Ok(body)
    }

    fn parse_block(&mut self, block: Block) -> Result<BlockClause> {
        let var_name = self.block_name(block);
        self.asm.create_string_set(&var_name);

        let mut clause = BlockClause {
            var_name,
            body: Vec::new(),
        };
        while let Some(next) = self.next() {
            let child = match next.kind {
                StatementKind::Literal => {
                    self.back();
                    Clause::Sql(self.parse_sql())
                }
                StatementKind::If => Clause::If(self.parse_if(&next)?),
                StatementKind::End => return Ok(clause),
                _ => {
                    return Err(self.syntax_error(format!("unknown clause: {}", next.origin)));
                }
            };
            let text = codegen::render(&child, self.target);
            self.asm.append_set_value(&clause.var_name, &text);
            clause.body.push(child);
        }

        Err(self.syntax_error(format!("incomplete SQL, {} not end", block.keyword())))
    }
}

/// 含 `||` 的条件加括号，使 `&&` 作用于整个条件
fn grouped(statement: &Statement) -> String {
    let has_or = statement
        .fragments
        .iter()
        .any(|f| f.kind == FragmentKind::Logical && f.value == "||");
    if has_or {
        format!("({})", statement.value)
    } else {
        statement.value.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clause::{compile, Compiled};
    use crate::param::{Param, ParamType};

    fn build(template: &str) -> Result<Compiled> {
        let params = vec![
            Param::new("A", ParamType::Int),
            Param::new("Name", ParamType::String),
            Param::new("Flag", ParamType::Bool),
        ];
        compile(template, &params, &Target::default(), "test")
    }

    fn message(template: &str) -> String {
        let err = build(template).unwrap_err();
        err.downcast::<TemplateError>().unwrap().message().to_string()
    }

    fn var_names(lines: &[String]) -> Vec<String> {
        lines
            .iter()
            .filter_map(|l| l.split_once(" := ").map(|(name, _)| name.to_string()))
            .collect()
    }

    #[test]
    fn names_are_sequential_in_parse_order() {
        let out = build(
            r#"where if A > 1 if Flag "a" end end end set if Flag "b" end end where "c" end"#,
        )
        .unwrap();
        assert_eq!(
            var_names(&out.assembly),
            vec!["whereCond0", "ifCond0", "ifCond1", "setCond0", "ifCond2", "whereCond1"]
        );
    }

    #[test]
    fn nested_block_inside_if_body() {
        let out = build(r#"if Flag where "a" end end"#).unwrap();
        let Clause::If(clause) = &out.clauses[0] else {
            panic!("expected if clause");
        };
        assert!(matches!(clause.body[0], Clause::Where(_)));
        assert!(out
            .assembly
            .contains(&"ifCond0 = append(ifCond0, helper.Cond{Flag, helper.WhereClause(whereCond0)})".to_string()));
    }

    #[test]
    fn else_if_spelled_as_two_words() {
        let out = build(r#"if Flag "a" else if A == 1 "b" end "c" end"#).unwrap();
        let Clause::If(clause) = &out.clauses[0] else {
            panic!("expected if clause");
        };
        assert_eq!(clause.else_branches.len(), 1);
        let branch = &clause.else_branches[0];
        assert_eq!(branch.cond, "!(Flag) && A == 1");
        assert_eq!(branch.body.len(), 1);
        assert_eq!(branch.body[0], Clause::Sql(SqlClause { pieces: vec![r#""b""#.into()] }));
    }

    #[test]
    fn else_body_may_nest_if() {
        let out = build(r#"if Flag "a" else "x" if A == 1 "b" end end"#).unwrap();
        let Clause::If(clause) = &out.clauses[0] else {
            panic!("expected if clause");
        };
        let branch = &clause.else_branches[0];
        assert_eq!(branch.cond, "!(Flag)");
        assert!(matches!(branch.body[1], Clause::If(_)));
        assert!(out.assembly.contains(
            &r#"ifCond0 = append(ifCond0, helper.Cond{!(Flag), "x"+helper.IfClause(ifCond1)})"#.to_string()
        ));
    }

    #[test]
    fn block_rejects_nested_block() {
        assert_eq!(message(r#"where set "a" end end"#), "unknown clause: set");
        assert_eq!(message(r#"set where "a" end end"#), "unknown clause: where");
        assert_eq!(message(r#"where if Flag "a" else "b" end else end"#), "unknown clause: else");
    }

    #[test]
    fn unclosed_blocks_are_incomplete() {
        assert_eq!(message(r#"if Flag "a""#), "incomplete SQL, if not end");
        assert_eq!(message(r#"where "a""#), "incomplete SQL, where not end");
        assert_eq!(message(r#"set "a""#), "incomplete SQL, set not end");
        assert_eq!(message(r#"where if Flag "a" end"#), "incomplete SQL, where not end");
    }

    #[test]
    fn else_must_be_last() {
        assert_eq!(
            message(r#"if Flag "a" else "b" elseif A == 1 "c" end"#),
            "else must be the last branch: elseif A == 1"
        );
        assert_eq!(
            message(r#"if Flag "a" else "b" else "c" end"#),
            "else must be the last branch: else"
        );
    }

    #[test]
    fn top_level_else_is_unknown_clause() {
        assert_eq!(message(r#"else "a""#), "unknown clause: else");
    }

    #[test]
    fn elseif_condition_is_type_checked() {
        assert_eq!(
            message(r#"if Flag "a" elseif A == Name "b" end"#),
            "condition type not match: A == Name"
        );
    }

    #[test]
    fn elseif_conjunction_is_not_wrapped() {
        let out = build(
            r#"if A == 1 "a" elseif A > 1 && Flag "b" elseif Flag || A < 0 "c" end"#,
        )
        .unwrap();
        let [Clause::If(clause)] = &out.clauses[..] else {
            panic!("expected a single if clause");
        };
        assert_eq!(clause.else_branches[0].cond, "!(A == 1) && A > 1 && Flag");
        assert_eq!(clause.else_branches[1].cond, "!(A == 1 || A > 1 && Flag) && (Flag || A < 0)");
    }
}
