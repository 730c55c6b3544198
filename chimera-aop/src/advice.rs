//! 通知（Advice）定义
//!
//! 定义了在连接点执行的各种动作

use crate::joinpoint::{JoinPoint, ProceedingJoinPoint};
use crate::pointcut::PointcutExpression;
use chimera_core::Value;
use std::fmt;
use std::sync::Arc;

/// 通知类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AdviceType {
    /// 前置通知，失败时中止整个调用
    Before,
    /// 后置通知（无论成功还是失败都执行）
    After,
    /// 返回后通知（成功返回时执行）
    AfterReturning,
    /// 异常通知（抛出异常时执行）
    AfterThrowing,
    /// 环绕通知（可以控制方法执行）
    Around,
}

impl fmt::Display for AdviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AdviceType::Before => "Before",
            AdviceType::After => "After",
            AdviceType::AfterReturning => "AfterReturning",
            AdviceType::AfterThrowing => "AfterThrowing",
            AdviceType::Around => "Around",
        };
        f.write_str(name)
    }
}

/// 前置通知 Trait
///
/// 在目标方法执行前调用；返回错误会中止调用
pub trait BeforeAdvice: Send + Sync {
    fn before(&self, join_point: &JoinPoint<'_>) -> anyhow::Result<()>;
}

/// 后置通知 Trait
///
/// 在目标方法执行后调用（无论成功还是失败）
pub trait AfterAdvice: Send + Sync {
    fn after(&self, join_point: &JoinPoint<'_>) -> anyhow::Result<()>;
}

/// 返回后通知 Trait
///
/// 在目标方法成功返回后调用，只读返回值
pub trait AfterReturningAdvice: Send + Sync {
    fn after_returning(&self, join_point: &JoinPoint<'_>, result: &Value) -> anyhow::Result<()>;
}

/// 异常通知 Trait
///
/// 在目标方法返回错误时调用，只读错误；错误本身会继续传播
pub trait AfterThrowingAdvice: Send + Sync {
    fn after_throwing(
        &self,
        join_point: &JoinPoint<'_>,
        error: &anyhow::Error,
    ) -> anyhow::Result<()>;
}

/// 环绕通知 Trait
///
/// 可以完全控制目标方法的执行
pub trait AroundAdvice: Send + Sync {
    fn around(&self, pjp: &ProceedingJoinPoint<'_>) -> anyhow::Result<Value>;
}

impl<F> BeforeAdvice for F
where
    F: Fn(&JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn before(&self, join_point: &JoinPoint<'_>) -> anyhow::Result<()> {
        self(join_point)
    }
}

impl<F> AfterAdvice for F
where
    F: Fn(&JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync,
{
    fn after(&self, join_point: &JoinPoint<'_>) -> anyhow::Result<()> {
        self(join_point)
    }
}

impl<F> AfterReturningAdvice for F
where
    F: Fn(&JoinPoint<'_>, &Value) -> anyhow::Result<()> + Send + Sync,
{
    fn after_returning(&self, join_point: &JoinPoint<'_>, result: &Value) -> anyhow::Result<()> {
        self(join_point, result)
    }
}

impl<F> AfterThrowingAdvice for F
where
    F: Fn(&JoinPoint<'_>, &anyhow::Error) -> anyhow::Result<()> + Send + Sync,
{
    fn after_throwing(
        &self,
        join_point: &JoinPoint<'_>,
        error: &anyhow::Error,
    ) -> anyhow::Result<()> {
        self(join_point, error)
    }
}

impl<F> AroundAdvice for F
where
    F: Fn(&ProceedingJoinPoint<'_>) -> anyhow::Result<Value> + Send + Sync,
{
    fn around(&self, pjp: &ProceedingJoinPoint<'_>) -> anyhow::Result<Value> {
        self(pjp)
    }
}

/// 通知回调，类型由通知种类决定
#[derive(Clone)]
pub enum AdviceCallback {
    Before(Arc<dyn BeforeAdvice>),
    After(Arc<dyn AfterAdvice>),
    AfterReturning(Arc<dyn AfterReturningAdvice>),
    AfterThrowing(Arc<dyn AfterThrowingAdvice>),
    Around(Arc<dyn AroundAdvice>),
}

impl AdviceCallback {
    pub fn advice_type(&self) -> AdviceType {
        match self {
            AdviceCallback::Before(_) => AdviceType::Before,
            AdviceCallback::After(_) => AdviceType::After,
            AdviceCallback::AfterReturning(_) => AdviceType::AfterReturning,
            AdviceCallback::AfterThrowing(_) => AdviceType::AfterThrowing,
            AdviceCallback::Around(_) => AdviceType::Around,
        }
    }
}

/// 通知：名称 + 切点 + 回调
///
/// 注册后不再修改。
#[derive(Clone)]
pub struct Advice {
    name: String,
    pointcut: PointcutExpression,
    callback: AdviceCallback,
}

impl Advice {
    pub fn new(
        name: impl Into<String>,
        pointcut: PointcutExpression,
        callback: AdviceCallback,
    ) -> Self {
        Self {
            name: name.into(),
            pointcut,
            callback,
        }
    }

    /// 前置通知
    ///
    /// ```ignore
    /// Advice::before("access-check", pointcut, |jp: &JoinPoint<'_>| {
    ///     tracing::info!("[Before] do access check for {}", jp.signature());
    ///     Ok(())
    /// });
    /// ```
    pub fn before<F>(name: impl Into<String>, pointcut: PointcutExpression, f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(name, pointcut, AdviceCallback::Before(Arc::new(f)))
    }

    /// 后置通知
    pub fn after<F>(name: impl Into<String>, pointcut: PointcutExpression, f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(name, pointcut, AdviceCallback::After(Arc::new(f)))
    }

    /// 返回后通知
    pub fn after_returning<F>(name: impl Into<String>, pointcut: PointcutExpression, f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>, &Value) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(name, pointcut, AdviceCallback::AfterReturning(Arc::new(f)))
    }

    /// 异常通知
    pub fn after_throwing<F>(name: impl Into<String>, pointcut: PointcutExpression, f: F) -> Self
    where
        F: Fn(&JoinPoint<'_>, &anyhow::Error) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self::new(name, pointcut, AdviceCallback::AfterThrowing(Arc::new(f)))
    }

    /// 环绕通知
    ///
    /// ```ignore
    /// Advice::around("timing", pointcut, |pjp: &ProceedingJoinPoint<'_>| {
    ///     let start = Instant::now();
    ///     let result = pjp.proceed();
    ///     tracing::info!("{} took {:?}", pjp.signature(), start.elapsed());
    ///     result
    /// });
    /// ```
    pub fn around<F>(name: impl Into<String>, pointcut: PointcutExpression, f: F) -> Self
    where
        F: Fn(&ProceedingJoinPoint<'_>) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self::new(name, pointcut, AdviceCallback::Around(Arc::new(f)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn advice_type(&self) -> AdviceType {
        self.callback.advice_type()
    }

    pub fn pointcut(&self) -> &PointcutExpression {
        &self.pointcut
    }

    pub fn callback(&self) -> &AdviceCallback {
        &self.callback
    }
}

impl fmt::Debug for Advice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Advice")
            .field("name", &self.name)
            .field("type", &self.advice_type())
            .field("pointcut", &self.pointcut)
            .finish()
    }
}
