//! Chimera AOP - 面向切面编程支持
//!
//! 提供类似 Spring 的 AOP 拦截引擎，支持：
//! - 声明式切面定义
//! - 多种通知类型（Before、After、Around、AfterReturning、AfterThrowing）
//! - 灵活的切点表达式（execution / within / @annotation / 正则 / 逻辑组合）
//! - 按方法缓存的拦截链，固定的执行顺序
//! - 通过 ComponentPostProcessor 自动为匹配的组件创建代理

pub mod advice;
pub mod aspect;
pub mod chain;
pub mod config;
pub mod emit;
pub mod error;
pub mod error_info;
pub mod joinpoint;
pub mod pointcut;
pub mod post_processor;
pub mod proxy;
pub mod registry;

// 重新导出核心类型
pub use advice::{
    Advice, AdviceCallback, AdviceType, AfterAdvice, AfterReturningAdvice, AfterThrowingAdvice,
    AroundAdvice, BeforeAdvice,
};
pub use aspect::{
    AccessCheckAspect, Aspect, AspectRegistration, ExceptionLoggingAspect, LoggingAspect,
    MetricAspect, PerformanceAspect, METRIC_MARKER,
};
pub use chain::{ChainBuilder, ChainKey, InvocationChain};
pub use config::AopConfig;
pub use emit::{Emitter, EventSink, Fields, MemorySink, TracingSink};
pub use error::AopError;
pub use error_info::ErrorInfo;
pub use joinpoint::{JoinPoint, ProceedingJoinPoint};
pub use pointcut::PointcutExpression;
pub use post_processor::AopPostProcessor;
pub use proxy::{Proxy, ProxyFactory};
pub use registry::AdviceRegistry;

// 动态值，`fields!` 宏使用
pub use chimera_core::Value;

// 导出 inventory 供切面注册使用
pub use inventory;

/// 预导入模块
pub mod prelude {
    pub use crate::advice::*;
    pub use crate::aspect::{
        AccessCheckAspect, Aspect, AspectRegistration, ExceptionLoggingAspect, LoggingAspect,
        MetricAspect, PerformanceAspect, METRIC_MARKER,
    };
    pub use crate::chain::{ChainBuilder, InvocationChain};
    pub use crate::config::AopConfig;
    pub use crate::emit::{Emitter, EventSink, Fields, MemorySink, TracingSink};
    pub use crate::error::AopError;
    pub use crate::error_info::ErrorInfo;
    pub use crate::fields;
    pub use crate::joinpoint::{JoinPoint, ProceedingJoinPoint};
    pub use crate::pointcut::PointcutExpression;
    pub use crate::post_processor::AopPostProcessor;
    pub use crate::proxy::{Proxy, ProxyFactory};
    pub use crate::registry::AdviceRegistry;
}
