//! AOP 错误类型

use thiserror::Error;

/// AOP 引擎错误
///
/// 启动阶段的配置错误；切面回调与目标方法的错误原样传播，不会被包装成这里的类型。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AopError {
    /// 切点表达式格式错误，启动时直接失败
    #[error("Invalid pointcut expression '{expression}': {reason}")]
    Pointcut { expression: String, reason: String },

    /// 配置值无法识别
    #[error("Invalid AOP configuration '{key}': {reason}")]
    Config { key: String, reason: String },
}

impl AopError {
    pub(crate) fn pointcut(expression: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Pointcut {
            expression: expression.into(),
            reason: reason.into(),
        }
    }
}
