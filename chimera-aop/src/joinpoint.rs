//! 连接点（JoinPoint）定义
//!
//! 连接点表示一次具体的方法调用：被调用的方法、参数、目标实例，
//! 以及切点为当前通知绑定的标记。

use chimera_core::{Component, Marker, MethodDescriptor, Value};
use std::fmt;
use std::time::Instant;

/// 连接点信息
///
/// 只在一次调用的调用栈上存在，借用描述符、参数和目标实例。
#[derive(Clone, Copy)]
pub struct JoinPoint<'a> {
    descriptor: &'a MethodDescriptor,
    args: &'a [Value],
    target: &'a dyn Component,
    marker: Option<&'a Marker>,
    started: Instant,
}

impl<'a> JoinPoint<'a> {
    pub fn new(
        descriptor: &'a MethodDescriptor,
        args: &'a [Value],
        target: &'a dyn Component,
    ) -> Self {
        Self {
            descriptor,
            args,
            target,
            marker: None,
            started: Instant::now(),
        }
    }

    pub(crate) fn with_marker(mut self, marker: Option<&'a Marker>) -> Self {
        self.marker = marker;
        self
    }

    pub(crate) fn with_args(mut self, args: &'a [Value]) -> Self {
        self.args = args;
        self
    }

    /// 获取完整的方法签名
    pub fn signature(&self) -> String {
        self.descriptor.signature()
    }

    pub fn descriptor(&self) -> &'a MethodDescriptor {
        self.descriptor
    }

    /// 目标类型名称（被代理的原始类型）
    pub fn target_type(&self) -> &'a str {
        &self.descriptor.owning_type
    }

    pub fn method_name(&self) -> &'a str {
        &self.descriptor.name
    }

    pub fn args(&self) -> &'a [Value] {
        self.args
    }

    /// 真实的目标实例（持有已初始化的状态）
    pub fn target(&self) -> &'a dyn Component {
        self.target
    }

    /// 切点绑定的标记，例如 `@annotation(MetricTime)` 绑定的 `MetricTime("wheatRelated")`
    pub fn marker(&self) -> Option<&'a Marker> {
        self.marker
    }

    /// 调用进入拦截链的时间
    pub fn started(&self) -> Instant {
        self.started
    }
}

impl fmt::Debug for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinPoint")
            .field("signature", &self.signature())
            .field("args", &self.args)
            .field("marker", &self.marker)
            .finish()
    }
}

impl fmt::Display for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.signature())
    }
}

/// 环绕通知看到的“内部剩余部分”
pub(crate) type Proceed<'a> = dyn Fn(&[Value]) -> anyhow::Result<Value> + 'a;

/// 环绕通知的执行链
///
/// 允许切面控制是否、何时、执行几次内部链（内层环绕通知、目标方法、
/// 返回/异常通知和后置通知）。
pub struct ProceedingJoinPoint<'a> {
    join_point: JoinPoint<'a>,
    proceed: &'a Proceed<'a>,
}

impl<'a> ProceedingJoinPoint<'a> {
    pub(crate) fn new(join_point: JoinPoint<'a>, proceed: &'a Proceed<'a>) -> Self {
        Self {
            join_point,
            proceed,
        }
    }

    /// 用原始参数继续执行
    ///
    /// 可以多次调用，每次都会完整地执行一遍内部链。
    pub fn proceed(&self) -> anyhow::Result<Value> {
        (self.proceed)(self.join_point.args())
    }

    /// 用替换后的参数继续执行
    pub fn proceed_with_args(&self, args: &[Value]) -> anyhow::Result<Value> {
        (self.proceed)(args)
    }

    /// 获取连接点信息
    pub fn join_point(&self) -> &JoinPoint<'a> {
        &self.join_point
    }

    pub fn signature(&self) -> String {
        self.join_point.signature()
    }
}

impl fmt::Debug for ProceedingJoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProceedingJoinPoint")
            .field("join_point", &self.join_point)
            .finish()
    }
}
