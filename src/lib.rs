//! sqlclause：查询方法注释中 SQL 模板 DSL 的编译器。
//!
//! 模板由字符串字面量、参数引用、比较/逻辑表达式以及 `if` / `elseif` / `else` /
//! `where` / `set` / `end` 控制块组成。编译结果为子句 AST 与一组拼装语句，
//! 由外部代码生成器写入生成的源文件。

pub mod check;
pub mod clause;
pub mod config;
pub mod param;
