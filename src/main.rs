use clap::{Parser, Subcommand};
use sqlclause::clause::{self, Compiled};
use sqlclause::config::{self, ProjectConfig};
use sqlclause::param::Param;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sqlclause", about = "SQL 模板 DSL 编译器", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 编译单个模板并输出拼装语句
    Compile {
        /// 模板文本
        #[arg(short, long)]
        template: String,

        /// 参数声明，形如 Name:string 或 IDs:int[]，可重复
        #[arg(short, long = "param")]
        params: Vec<String>,

        /// 以 JSON 输出子句 AST 与拼装语句
        #[arg(long)]
        json: bool,

        /// 项目根目录，读取其中的 sqlclause.toml（可选）
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },

    /// 检查清单中全部方法模板
    Check {
        /// 项目根目录（默认当前目录）
        #[arg(short, long, default_value = ".")]
        root: PathBuf,
    },

    /// 编译清单中全部方法模板并输出结果
    Emit {
        /// 项目根目录（默认当前目录）
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// 以 JSON 输出
        #[arg(long)]
        json: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let root = match &cli.command {
        Commands::Compile { root, .. } | Commands::Check { root } | Commands::Emit { root, .. } => {
            root.clone()
        }
    };
    // compile 命令允许没有清单文件
    let project = load_optional(&root)?;

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&project.log.level)),
        )
        .init();

    match cli.command {
        Commands::Compile {
            template,
            params,
            json,
            ..
        } => {
            let params = params
                .iter()
                .map(|p| Param::parse_spec(p))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let out = clause::compile(&template, &params, &project.target, "<cli>")?;
            print_compiled(None, &out, json)?;
        }
        Commands::Check { root } => {
            let project = require(&root, project)?;
            let result = sqlclause::check::run(&project);

            for w in &result.warnings {
                tracing::warn!("{w}");
            }
            for e in &result.errors {
                tracing::error!("{e}");
            }

            if result.errors.is_empty() {
                tracing::info!(
                    "检查通过：{} 个方法（{} 个警告）",
                    result.compiled.len(),
                    result.warnings.len()
                );
            } else {
                anyhow::bail!(
                    "检查未通过：{} 个错误，{} 个警告",
                    result.errors.len(),
                    result.warnings.len()
                );
            }
        }
        Commands::Emit { root, json } => {
            let project = require(&root, project)?;
            let result = sqlclause::check::run(&project);
            if let Some(first) = result.errors.first() {
                anyhow::bail!("{first}");
            }
            if json {
                let methods: serde_json::Map<String, serde_json::Value> = result
                    .compiled
                    .iter()
                    .map(|(name, out)| {
                        Ok::<_, anyhow::Error>((name.clone(), serde_json::to_value(out)?))
                    })
                    .collect::<anyhow::Result<_>>()?;
                println!("{}", serde_json::to_string_pretty(&methods)?);
            } else {
                for (name, out) in &result.compiled {
                    print_compiled(Some(name.as_str()), out, false)?;
                }
            }
        }
    }

    Ok(())
}

fn load_optional(root: &Path) -> anyhow::Result<ProjectConfig> {
    if root.join(config::CONFIG_FILE).exists() {
        ProjectConfig::load(root)
    } else {
        Ok(ProjectConfig::default())
    }
}

fn require(root: &Path, project: ProjectConfig) -> anyhow::Result<ProjectConfig> {
    if !root.join(config::CONFIG_FILE).exists() {
        anyhow::bail!("缺少 {} 清单文件：{}", config::CONFIG_FILE, root.display());
    }
    Ok(project)
}

fn print_compiled(name: Option<&str>, out: &Compiled, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(out)?);
        return Ok(());
    }
    if let Some(name) = name {
        println!("// {name}");
    }
    for line in &out.assembly {
        println!("{line}");
    }
    Ok(())
}
