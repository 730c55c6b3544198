use crate::descriptor::MethodDescriptor;
use crate::error::Result;

/// 动态值：参数、返回值和字段值统一使用 JSON 值表示
pub use serde_json::Value;

/// Component trait - 可以交给容器管理、可以被代理的组件
///
/// 这是代理与真实目标共同实现的能力契约。实现者必须提供一组稳定、
/// 可枚举的方法描述，并能按名称执行这些方法。
///
/// # 示例
///
/// ```ignore
/// use chimera_core::prelude::*;
///
/// struct CustomerService {
///     zone_id: Option<String>,
/// }
///
/// impl Component for CustomerService {
///     fn type_name(&self) -> &str {
///         "CustomerService"
///     }
///
///     fn descriptors(&self) -> Vec<MethodDescriptor> {
///         vec![MethodDescriptor::new("CustomerService", "get_zone_id").returns("ZoneId")]
///     }
///
///     fn invoke(&self, method: &str, _args: &[Value]) -> Result<Value> {
///         match method {
///             "get_zone_id" => Ok(self.zone_id.clone().into()),
///             _ => Err(ContainerError::no_such_method("CustomerService", method).into()),
///         }
///     }
///
///     fn field(&self, name: &str) -> Option<Value> {
///         (name == "zone_id").then(|| self.zone_id.clone().into())
///     }
///
///     fn uninitialized(&self) -> Box<dyn Component> {
///         Box::new(CustomerService { zone_id: None })
///     }
/// }
/// ```
pub trait Component: Send + Sync + 'static {
    /// 运行时类型名称
    fn type_name(&self) -> &str;

    /// 该类型声明的全部方法
    ///
    /// 方法名在同一类型内必须唯一：调用、拦截链缓存和代理路由都只按名称区分方法。
    fn descriptors(&self) -> Vec<MethodDescriptor>;

    /// 按名称调用方法
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value>;

    /// 读取直接暴露的字段（不经过任何方法）
    fn field(&self, _name: &str) -> Option<Value> {
        None
    }

    /// 创建一个同类型但没有执行任何字段初始化逻辑的实例
    ///
    /// 所有字段都应当是语言默认值（`None`、`0`、空集合……）。
    /// 代理用它来充当“自己继承来的状态”。
    fn uninitialized(&self) -> Box<dyn Component>;
}
