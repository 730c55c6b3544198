//! 方法描述符
//!
//! 每个组件类型通过 [`Component::descriptors`](crate::Component::descriptors)
//! 公开一组稳定的方法描述，切点只针对这些数据做匹配，不依赖运行时反射。

use serde::{Deserialize, Serialize};
use std::fmt;

/// 方法可见性，按可访问范围从小到大排序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Private,
    Crate,
    Protected,
    Public,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Private => write!(f, "private"),
            Visibility::Crate => write!(f, "crate"),
            Visibility::Protected => write!(f, "protected"),
            Visibility::Public => write!(f, "public"),
        }
    }
}

/// 声明式标记（相当于方法上的注解）
///
/// 匹配只看名称；`value` 是标记携带的参数，例如指标名称。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,
    pub value: Option<String>,
}

impl Marker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

/// 方法描述符
///
/// 不可变，每个组件类型只推导一次。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MethodDescriptor {
    /// 所属类型名称，可以是简单名称（`UserService`）或带路径（`app::service::UserService`）
    pub owning_type: String,

    /// 方法名称
    pub name: String,

    /// 参数类型（有序）
    pub params: Vec<String>,

    /// 返回类型
    pub return_type: String,

    /// 可见性
    pub visibility: Visibility,

    /// 是否禁止覆写（代理无法拦截）
    pub sealed: bool,

    /// 声明的标记
    pub markers: Vec<Marker>,
}

impl MethodDescriptor {
    /// 创建公共、无参、返回 `()` 的方法描述
    pub fn new(owning_type: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owning_type: owning_type.into(),
            name: name.into(),
            params: Vec::new(),
            return_type: "()".to_string(),
            visibility: Visibility::Public,
            sealed: false,
            markers: Vec::new(),
        }
    }

    pub fn param(mut self, ty: impl Into<String>) -> Self {
        self.params.push(ty.into());
        self
    }

    pub fn returns(mut self, ty: impl Into<String>) -> Self {
        self.return_type = ty.into();
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn sealed(mut self) -> Self {
        self.sealed = true;
        self
    }

    pub fn marker(mut self, marker: Marker) -> Self {
        self.markers.push(marker);
        self
    }

    pub fn is_public(&self) -> bool {
        self.visibility == Visibility::Public
    }

    /// 按名称查找标记
    pub fn find_marker(&self, name: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.name == name)
    }

    /// 去掉路径后的类型名称
    pub fn simple_type_name(&self) -> &str {
        simple_name(&self.owning_type)
    }

    /// 完整签名，例如 `UserService.login(String, String)`
    pub fn signature(&self) -> String {
        format!(
            "{}.{}({})",
            self.simple_type_name(),
            self.name,
            self.params.join(", ")
        )
    }
}

impl fmt::Display for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.visibility, self.return_type, self.signature())?;
        if self.sealed {
            write!(f, " [sealed]")?;
        }
        Ok(())
    }
}

/// 取类型路径的最后一段，同时支持 `::` 和 `.` 分隔
pub fn simple_name(type_name: &str) -> &str {
    let tail = type_name.rsplit("::").next().unwrap_or(type_name);
    tail.rsplit('.').next().unwrap_or(tail)
}
