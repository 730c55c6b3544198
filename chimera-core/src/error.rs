use thiserror::Error;

/// 统一的结果类型
///
/// 与框架其余部分一致，对外使用 anyhow::Result，通过 .context() 追加上下文。
/// 容器自身产生的错误以 [`ContainerError`] 的形式放入其中，调用方可以
/// `err.downcast_ref::<ContainerError>()` 取回。
pub use anyhow::Result;

/// 容器错误
#[derive(Error, Debug)]
pub enum ContainerError {
    #[error("Component not found: {0}")]
    ComponentNotFound(String),

    #[error("Component already registered: {0}")]
    DuplicateComponent(String),

    #[error("No public method '{method}' on {type_name}")]
    NoSuchMethod { type_name: String, method: String },

    #[error("Post processor '{processor}' failed for component '{component}': {reason}")]
    PostProcessorFailed {
        processor: String,
        component: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(String),

    #[error("Failed to initialize logging: {0}")]
    LoggingInitFailed(String),
}

impl ContainerError {
    /// 构造 NoSuchMethod 错误
    pub fn no_such_method(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        Self::NoSuchMethod {
            type_name: type_name.into(),
            method: method.into(),
        }
    }
}
