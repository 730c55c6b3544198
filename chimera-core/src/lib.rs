// chimera-core: 组件契约与调度运行时
//
// 提供 AOP 引擎所依赖的基础设施：
// - Component 能力契约（可枚举的公共方法、按名调用、直接暴露的字段）
// - 方法描述符与声明式标记（替代注解）
// - 写一次、之后只读的组件注册表（ApplicationContext）
// - 组件后置处理器（代理替换的挂载点）
// - 配置环境与日志初始化

pub mod component;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod lifecycle;
pub mod logging;

// 重新导出常用类型
pub use component::{Component, Value};
pub use config::{
    ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
    TomlPropertySource,
};
pub use context::{ApplicationContext, ApplicationContextBuilder, Container, Resolver};
pub use descriptor::{Marker, MethodDescriptor, Visibility};
pub use error::{ContainerError, Result};
pub use lifecycle::ComponentPostProcessor;
pub use logging::{LogFormat, LogLevel, LoggingConfig};

/// Prelude 模块，包含常用的 traits 和类型
pub mod prelude {
    pub use crate::component::{Component, Value};
    pub use crate::config::{
        ConfigValue, Environment, EnvironmentPropertySource, MapPropertySource, PropertySource,
        TomlPropertySource,
    };
    pub use crate::context::{ApplicationContext, ApplicationContextBuilder, Container, Resolver};
    pub use crate::descriptor::{Marker, MethodDescriptor, Visibility};
    pub use crate::error::{ContainerError, Result};
    pub use crate::lifecycle::ComponentPostProcessor;
    pub use crate::logging::{LogFormat, LogLevel, LoggingConfig};
    // Re-export anyhow for convenience
    pub use anyhow::{anyhow, Context};
}
