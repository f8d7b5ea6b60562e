use serde::{Deserialize, Serialize};

/// 参数声明的基础类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    Bool,
    Int,
    String,
    Time,
    Other,
}

impl ParamType {
    /// 由方法签名中的类型名映射，无法识别的类型统一归为 Other
    pub fn from_declared(name: &str) -> Self {
        match name {
            "bool" => Self::Bool,
            "int" => Self::Int,
            "string" => Self::String,
            "time" | "Time" => Self::Time,
            _ => Self::Other,
        }
    }
}

impl<'de> Deserialize<'de> for ParamType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(Self::from_declared(&name))
    }
}

/// 模板可引用的方法参数
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Param {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: ParamType,
    #[serde(default, rename = "array")]
    pub is_array: bool,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            is_array: false,
        }
    }

    pub fn array(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            is_array: true,
        }
    }

    /// 解析命令行形式 `Name:type`，类型后缀 `[]` 表示数组
    pub fn parse_spec(spec: &str) -> anyhow::Result<Self> {
        let (name, ty) = spec
            .split_once(':')
            .ok_or_else(|| anyhow::anyhow!("参数格式应为 Name:type：{spec}"))?;
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("参数名为空：{spec}");
        }
        let ty = ty.trim();
        match ty.strip_suffix("[]") {
            Some(elem) => Ok(Self::array(name, ParamType::from_declared(elem))),
            None => Ok(Self::new(name, ParamType::from_declared(ty))),
        }
    }
}

/// 按名称精确查找参数（区分大小写）
pub fn lookup<'a>(params: &'a [Param], name: &str) -> Option<&'a Param> {
    params.iter().find(|p| p.name == name)
}
