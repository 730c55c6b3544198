//! 切面（Aspect）定义
//!
//! 切面是横切关注点的模块化：一个切面声明一组通知，注册时按声明顺序展开

use crate::advice::Advice;
use crate::emit::Emitter;
use crate::error_info::ErrorInfo;
use crate::joinpoint::JoinPoint;
use crate::pointcut::PointcutExpression;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// 切面 Trait
///
/// 实现此 trait 以定义切面逻辑
pub trait Aspect: Send + Sync {
    /// 切面名称
    fn name(&self) -> &str;

    /// 切面声明的通知（按执行优先级无关的声明顺序）
    ///
    /// 切点表达式解析失败时返回错误，启动应当失败。
    fn advices(&self) -> anyhow::Result<Vec<Advice>>;
}

/// 切面注册器
///
/// 用于 inventory 自动收集和注册切面
///
/// ```ignore
/// inventory::submit! {
///     AspectRegistration::new("LoggingAspect", || Arc::new(LoggingAspect::default()))
/// }
/// ```
pub struct AspectRegistration {
    /// 切面名称
    pub name: &'static str,

    /// 创建切面实例的函数
    pub creator: fn() -> Arc<dyn Aspect>,
}

impl AspectRegistration {
    /// 创建新的切面注册器
    pub const fn new(name: &'static str, creator: fn() -> Arc<dyn Aspect>) -> Self {
        Self { name, creator }
    }

    /// 创建切面实例
    pub fn create_instance(&self) -> Arc<dyn Aspect> {
        (self.creator)()
    }
}

// 使用 inventory 收集所有切面注册器
inventory::collect!(AspectRegistration);

/// 获取所有注册的切面注册器
pub fn get_all_aspect_registrations() -> impl Iterator<Item = &'static AspectRegistration> {
    inventory::iter::<AspectRegistration>()
}

// ============================================================================
// 预定义的常用切面
// ============================================================================

type AccessPolicy = dyn Fn(&JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync;

/// 访问检查切面 - 在方法执行前检查
///
/// 默认只记录日志；通过 [`with_policy`](Self::with_policy) 提供的检查失败时，
/// 调用被中止，错误原样返回给调用方。
pub struct AccessCheckAspect {
    pointcut: PointcutExpression,
    policy: Option<Arc<AccessPolicy>>,
}

impl AccessCheckAspect {
    pub fn new(pointcut: PointcutExpression) -> Self {
        Self {
            pointcut,
            policy: None,
        }
    }

    pub fn with_policy<F>(mut self, policy: F) -> Self
    where
        F: Fn(&JoinPoint<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.policy = Some(Arc::new(policy));
        self
    }
}

impl Aspect for AccessCheckAspect {
    fn name(&self) -> &str {
        "AccessCheckAspect"
    }

    fn advices(&self) -> anyhow::Result<Vec<Advice>> {
        let policy = self.policy.clone();
        Ok(vec![Advice::before(
            "AccessCheckAspect.check",
            self.pointcut.clone(),
            move |jp| {
                tracing::info!("[Before] do access check for {}", jp.signature());
                match &policy {
                    Some(policy) => policy(jp),
                    None => Ok(()),
                }
            },
        )])
    }
}

/// 日志切面 - 记录方法调用
///
/// 错误只记录，不吞掉。
pub struct LoggingAspect {
    log_args: bool,
    pointcut: PointcutExpression,
}

impl LoggingAspect {
    pub fn new(pointcut: PointcutExpression) -> Self {
        Self {
            log_args: false,
            pointcut,
        }
    }

    pub fn with_args(mut self) -> Self {
        self.log_args = true;
        self
    }
}

impl Aspect for LoggingAspect {
    fn name(&self) -> &str {
        "LoggingAspect"
    }

    fn advices(&self) -> anyhow::Result<Vec<Advice>> {
        let log_args = self.log_args;
        Ok(vec![Advice::around(
            "LoggingAspect.log",
            self.pointcut.clone(),
            move |pjp| {
                if log_args {
                    tracing::info!(
                        "[Around] start {} args={:?}",
                        pjp.signature(),
                        pjp.join_point().args()
                    );
                } else {
                    tracing::info!("[Around] start {}", pjp.signature());
                }

                let result = pjp.proceed();
                match &result {
                    Ok(_) => tracing::info!("[Around] done {}", pjp.signature()),
                    Err(e) => tracing::info!("[Around] failed {}: {}", pjp.signature(), e),
                }
                result
            },
        )])
    }
}

/// 性能监控标记名称
pub const METRIC_MARKER: &str = "MetricTime";

/// 毫秒数，超出 u64 时饱和
fn millis_u64(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

/// 性能监控切面
///
/// 匹配带有 `MetricTime` 标记的方法，标记参数作为指标名称（缺省为方法签名）。
/// 每次调用后发出 `metric` 事件：`{ name, elapsed_ms, success }`。
pub struct MetricAspect {
    emitter: Emitter,
}

impl MetricAspect {
    pub fn new(emitter: Emitter) -> Self {
        Self { emitter }
    }
}

impl Default for MetricAspect {
    fn default() -> Self {
        Self::new(Emitter::tracing())
    }
}

impl Aspect for MetricAspect {
    fn name(&self) -> &str {
        "MetricAspect"
    }

    fn advices(&self) -> anyhow::Result<Vec<Advice>> {
        let emitter = self.emitter.clone();
        Ok(vec![Advice::around(
            "MetricAspect.metric",
            PointcutExpression::annotation(METRIC_MARKER),
            move |pjp| {
                let name = pjp
                    .join_point()
                    .marker()
                    .and_then(|m| m.value.clone())
                    .unwrap_or_else(|| pjp.signature());

                let start = Instant::now();
                let result = pjp.proceed();
                let elapsed_ms = millis_u64(start.elapsed());

                tracing::info!("[Metrics] {}: {}ms", name, elapsed_ms);
                emitter.emit(
                    "metric",
                    crate::fields! {
                        "name" => name,
                        "elapsed_ms" => elapsed_ms,
                        "success" => result.is_ok(),
                    },
                );
                result
            },
        )])
    }
}

/// 慢方法监控切面 - 方法结束后检查整个调用耗时
pub struct PerformanceAspect {
    threshold_ms: u128,
    pointcut: PointcutExpression,
}

impl PerformanceAspect {
    pub fn new(threshold_ms: u128, pointcut: PointcutExpression) -> Self {
        Self {
            threshold_ms,
            pointcut,
        }
    }
}

impl Aspect for PerformanceAspect {
    fn name(&self) -> &str {
        "PerformanceAspect"
    }

    fn advices(&self) -> anyhow::Result<Vec<Advice>> {
        let threshold_ms = self.threshold_ms;
        Ok(vec![Advice::after(
            "PerformanceAspect.check",
            self.pointcut.clone(),
            move |jp| {
                let elapsed = jp.started().elapsed().as_millis();
                if elapsed > threshold_ms {
                    tracing::warn!(
                        "⚠️ Slow method detected: {} took {}ms (threshold: {}ms)",
                        jp.signature(),
                        elapsed,
                        threshold_ms
                    );
                }
                Ok(())
            },
        )])
    }
}

/// 异常日志切面
///
/// 记录错误并发出 `exception` 事件，错误继续向调用方传播。
pub struct ExceptionLoggingAspect {
    pointcut: PointcutExpression,
    emitter: Emitter,
}

impl ExceptionLoggingAspect {
    pub fn new(pointcut: PointcutExpression, emitter: Emitter) -> Self {
        Self { pointcut, emitter }
    }
}

impl Aspect for ExceptionLoggingAspect {
    fn name(&self) -> &str {
        "ExceptionLoggingAspect"
    }

    fn advices(&self) -> anyhow::Result<Vec<Advice>> {
        let emitter = self.emitter.clone();
        Ok(vec![Advice::after_throwing(
            "ExceptionLoggingAspect.log",
            self.pointcut.clone(),
            move |jp, error| {
                let info = ErrorInfo::from_anyhow(error);
                tracing::error!("❌ Exception in {}: {}", jp.signature(), info.full_description());

                let mut fields = info.to_fields();
                fields.insert("signature".to_string(), jp.signature().into());
                emitter.emit("exception", fields);
                Ok(())
            },
        )])
    }
}
