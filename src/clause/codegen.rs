use crate::clause::parser::{Clause, ElseClause};
use serde::{Deserialize, Serialize};

/// 生成代码的目标约定：运行时辅助包名、集合初始容量、顶层累加变量名
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Target {
    #[serde(default = "default_helper")]
    pub helper: String,
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    #[serde(default = "default_accumulator")]
    pub accumulator: String,
}

fn default_helper() -> String { "helper".into() }
fn default_capacity() -> usize { 100 }
fn default_accumulator() -> String { "generateSQL".into() }

impl Default for Target {
    fn default() -> Self {
        Self {
            helper: default_helper(),
            capacity: default_capacity(),
            accumulator: default_accumulator(),
        }
    }
}

/// 将子句渲染为引用其结果的表达式文本
pub fn render(clause: &Clause, target: &Target) -> String {
    match clause {
        Clause::Sql(sql) => concat(sql.pieces.iter().cloned()),
        Clause::If(if_clause) => format!("{}.IfClause({})", target.helper, if_clause.var_name),
        Clause::Where(block) => format!("{}.WhereClause({})", target.helper, block.var_name),
        Clause::Set(block) => format!("{}.SetClause({})", target.helper, block.var_name),
    }
}

/// else 分支的内容：分支体内各子句依次拼接
pub fn render_else(branch: &ElseClause, target: &Target) -> String {
    concat(branch.body.iter().map(|c| render(c, target)))
}

/// 以 `+` 拼接，相邻的字符串字面量合并为一个
fn concat(parts: impl Iterator<Item = String>) -> String {
    parts.collect::<Vec<_>>().join("+").replace("\"+\"", "")
}

/// 按顺序累积的拼装语句
#[derive(Debug)]
pub struct Assembly<'a> {
    target: &'a Target,
    lines: Vec<String>,
}

impl<'a> Assembly<'a> {
    pub fn new(target: &'a Target) -> Self {
        Self {
            target,
            lines: Vec::new(),
        }
    }

    pub fn separator(&mut self) {
        self.lines.push(String::new());
    }

    /// 顶层子句追加到累加变量
    pub fn accumulate(&mut self, text: &str) {
        self.lines.push(format!("{}+={}", self.target.accumulator, text));
    }

    pub fn create_if(&mut self, name: &str) {
        self.lines.push(format!(
            "{name} := make([]{}.Cond, 0, {})",
            self.target.helper, self.target.capacity
        ));
    }

    pub fn create_string_set(&mut self, name: &str) {
        self.lines.push(format!("{name} := make([]string, 0, {})", self.target.capacity));
    }

    /// 以条件守卫的形式追加片段
    pub fn append_if_cond(&mut self, name: &str, cond: &str, result: &str) {
        self.lines.push(format!(
            "{name} = append({name}, {}.Cond{{{cond}, {result}}})",
            self.target.helper
        ));
    }

    pub fn append_set_value(&mut self, name: &str, result: &str) {
        self.lines.push(format!("{name} = append({name}, {})", result.trim()));
    }

    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}
