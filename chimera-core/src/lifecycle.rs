//! ComponentPostProcessor - 组件注册后的扩展机制
//!
//! 在组件实例化之后、写入调度表之前提供钩子，AOP 就是通过它把目标替换为代理的

use crate::component::Component;
use crate::error::Result;
use std::sync::Arc;

/// ComponentPostProcessor trait
///
/// 使用场景：
/// - AOP 代理创建
/// - 组件包装
/// - 校验
///
/// # 示例
///
/// ```ignore
/// use chimera_core::prelude::*;
/// use std::sync::Arc;
///
/// struct LoggingPostProcessor;
///
/// impl ComponentPostProcessor for LoggingPostProcessor {
///     fn post_process_after_initialization(
///         &self,
///         component: Arc<dyn Component>,
///         name: &str,
///     ) -> Result<Arc<dyn Component>> {
///         tracing::info!("After initialization: {}", name);
///         Ok(component)
///     }
/// }
/// ```
pub trait ComponentPostProcessor: Send + Sync {
    /// 在组件创建完成后调用
    ///
    /// 返回处理后的组件（可以是原始组件，也可以是包装后的组件）。
    /// 返回值会替代原始组件出现在调度表中。
    fn post_process_after_initialization(
        &self,
        component: Arc<dyn Component>,
        _name: &str,
    ) -> Result<Arc<dyn Component>> {
        Ok(component)
    }

    /// 获取处理器的名称（用于日志和调试）
    fn name(&self) -> &str {
        "ComponentPostProcessor"
    }

    /// 获取处理器的优先级（数字越小越先执行）
    fn order(&self) -> i32 {
        1000
    }
}
