//! 拦截链
//!
//! 对一个方法解析出匹配的通知并按固定优先级执行：
//!
//! 1. 所有 Before（注册顺序），任一失败立即中止，错误原样返回
//! 2. Around 按注册顺序嵌套（先注册的在最外层），`proceed()` 执行内部剩余部分
//! 3. 目标方法
//! 4. 成功：AfterReturning（注册顺序）；失败：AfterThrowing（注册顺序），错误继续传播
//! 5. 无论成功失败：After（注册顺序）
//!
//! 第 3~5 步都在最内层 Around 的 `proceed()` 之内，所以环绕通知测到的耗时包含它们。

use crate::advice::{
    AdviceCallback, AdviceType, AfterAdvice, AfterReturningAdvice, AfterThrowingAdvice,
    AroundAdvice, BeforeAdvice,
};
use crate::joinpoint::{JoinPoint, ProceedingJoinPoint};
use crate::registry::AdviceRegistry;
use chimera_core::{Component, Marker, MethodDescriptor, Value};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 缓存键：（所属类型，方法名）
///
/// 不包含参数列表，同一类型内的方法名唯一（见 [`Component::descriptors`]）。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChainKey {
    pub owning_type: String,
    pub method: String,
}

impl ChainKey {
    pub fn of(descriptor: &MethodDescriptor) -> Self {
        Self {
            owning_type: descriptor.owning_type.clone(),
            method: descriptor.name.clone(),
        }
    }
}

/// 已解析的通知：回调 + 切点为该方法绑定的标记
struct Resolved<T: ?Sized> {
    name: String,
    callback: Arc<T>,
    marker: Option<Marker>,
}

impl<T: ?Sized> Resolved<T> {
    fn join_point<'a>(&'a self, jp: JoinPoint<'a>) -> JoinPoint<'a> {
        jp.with_marker(self.marker.as_ref())
    }
}

/// 一个方法的拦截链
///
/// 与具体实例和参数无关，同类型的所有实例共享。
pub struct InvocationChain {
    descriptor: MethodDescriptor,
    before: Vec<Resolved<dyn BeforeAdvice>>,
    around: Vec<Resolved<dyn AroundAdvice>>,
    after_returning: Vec<Resolved<dyn AfterReturningAdvice>>,
    after_throwing: Vec<Resolved<dyn AfterThrowingAdvice>>,
    after: Vec<Resolved<dyn AfterAdvice>>,
}

impl InvocationChain {
    /// 从注册表中解析匹配该方法的通知
    pub fn resolve(descriptor: &MethodDescriptor, registry: &AdviceRegistry) -> Self {
        let mut chain = Self {
            descriptor: descriptor.clone(),
            before: Vec::new(),
            around: Vec::new(),
            after_returning: Vec::new(),
            after_throwing: Vec::new(),
            after: Vec::new(),
        };

        for advice in registry.matching(descriptor) {
            let name = advice.name().to_string();
            let marker = advice.pointcut().bound_marker(descriptor).cloned();
            match advice.callback() {
                AdviceCallback::Before(cb) => chain.before.push(Resolved {
                    name,
                    callback: Arc::clone(cb),
                    marker,
                }),
                AdviceCallback::Around(cb) => chain.around.push(Resolved {
                    name,
                    callback: Arc::clone(cb),
                    marker,
                }),
                AdviceCallback::AfterReturning(cb) => chain.after_returning.push(Resolved {
                    name,
                    callback: Arc::clone(cb),
                    marker,
                }),
                AdviceCallback::AfterThrowing(cb) => chain.after_throwing.push(Resolved {
                    name,
                    callback: Arc::clone(cb),
                    marker,
                }),
                AdviceCallback::After(cb) => chain.after.push(Resolved {
                    name,
                    callback: Arc::clone(cb),
                    marker,
                }),
            }
        }

        tracing::trace!(
            "Resolved chain for {}: {} advice(s)",
            descriptor.signature(),
            chain.len()
        );
        chain
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    pub fn len(&self) -> usize {
        self.before.len()
            + self.around.len()
            + self.after_returning.len()
            + self.after_throwing.len()
            + self.after.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 通知名称，按种类优先级和注册顺序排列
    pub fn advice_names(&self) -> Vec<(AdviceType, &str)> {
        fn names<T: ?Sized>(kind: AdviceType, list: &[Resolved<T>]) -> Vec<(AdviceType, &str)> {
            list.iter().map(|r| (kind, r.name.as_str())).collect()
        }

        let mut all = names(AdviceType::Before, &self.before);
        all.extend(names(AdviceType::Around, &self.around));
        all.extend(names(AdviceType::AfterReturning, &self.after_returning));
        all.extend(names(AdviceType::AfterThrowing, &self.after_throwing));
        all.extend(names(AdviceType::After, &self.after));
        all
    }

    /// 在目标上执行这条链
    pub fn invoke(&self, target: &dyn Component, args: &[Value]) -> anyhow::Result<Value> {
        let jp = JoinPoint::new(&self.descriptor, args, target);
        tracing::trace!("→ {} ({} advice(s))", jp, self.len());

        for advice in &self.before {
            advice.callback.before(&advice.join_point(jp))?;
        }

        self.proceed_from(0, jp)
    }

    fn proceed_from(&self, depth: usize, jp: JoinPoint<'_>) -> anyhow::Result<Value> {
        let Some(advice) = self.around.get(depth) else {
            return self.invoke_target(jp);
        };

        let inner = |args: &[Value]| self.proceed_from(depth + 1, jp.with_args(args));
        let pjp = ProceedingJoinPoint::new(advice.join_point(jp), &inner);
        advice.callback.around(&pjp)
    }

    fn invoke_target(&self, jp: JoinPoint<'_>) -> anyhow::Result<Value> {
        let outcome = match jp.target().invoke(&self.descriptor.name, jp.args()) {
            Ok(value) => self.after_returning(jp, value),
            Err(error) => {
                self.after_throwing(jp, &error);
                Err(error)
            }
        };
        self.after(jp, outcome)
    }

    fn after_returning(&self, jp: JoinPoint<'_>, value: Value) -> anyhow::Result<Value> {
        for advice in &self.after_returning {
            advice
                .callback
                .after_returning(&advice.join_point(jp), &value)?;
        }
        Ok(value)
    }

    fn after_throwing(&self, jp: JoinPoint<'_>, error: &anyhow::Error) {
        for advice in &self.after_throwing {
            if let Err(e) = advice.callback.after_throwing(&advice.join_point(jp), error) {
                tracing::warn!(
                    "AfterThrowing advice '{}' failed on {}: {:#} (original error kept)",
                    advice.name,
                    jp,
                    e
                );
            }
        }
    }

    fn after(&self, jp: JoinPoint<'_>, mut outcome: anyhow::Result<Value>) -> anyhow::Result<Value> {
        for advice in &self.after {
            if let Err(e) = advice.callback.after(&advice.join_point(jp)) {
                if outcome.is_ok() {
                    outcome = Err(e);
                } else {
                    tracing::warn!(
                        "After advice '{}' failed on {}: {:#} (original error kept)",
                        advice.name,
                        jp,
                        e
                    );
                }
            }
        }
        outcome
    }
}

impl fmt::Debug for InvocationChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvocationChain")
            .field("method", &self.descriptor.signature())
            .field("advices", &self.advice_names())
            .finish()
    }
}

/// 拦截链构建器
///
/// 以（类型，方法）为键惰性构建并缓存拦截链。并发的首次构建可能各算一遍，
/// 计算是纯的，最终只保留先写入的那一份。
pub struct ChainBuilder {
    registry: Arc<AdviceRegistry>,
    cache: RwLock<HashMap<ChainKey, Arc<InvocationChain>>>,
}

impl ChainBuilder {
    pub fn new(registry: Arc<AdviceRegistry>) -> Self {
        Self {
            registry,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &Arc<AdviceRegistry> {
        &self.registry
    }

    /// 获取（必要时构建）方法的拦截链
    pub fn build(&self, descriptor: &MethodDescriptor) -> Arc<InvocationChain> {
        let key = ChainKey::of(descriptor);
        if let Some(chain) = self.cache.read().get(&key) {
            return Arc::clone(chain);
        }

        let chain = Arc::new(InvocationChain::resolve(descriptor, &self.registry));
        let mut cache = self.cache.write();
        Arc::clone(cache.entry(key).or_insert(chain))
    }

    /// 已缓存的拦截链数量
    pub fn cached(&self) -> usize {
        self.cache.read().len()
    }
}

impl fmt::Debug for ChainBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainBuilder")
            .field("advices", &self.registry.len())
            .field("cached", &self.cached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::Advice;
    use crate::pointcut::PointcutExpression;
    use chimera_core::ContainerError;
    use parking_lot::Mutex;

    type Trace = Arc<Mutex<Vec<String>>>;

    struct Echo {
        trace: Trace,
    }

    impl Component for Echo {
        fn type_name(&self) -> &str {
            "Echo"
        }

        fn descriptors(&self) -> Vec<MethodDescriptor> {
            vec![
                MethodDescriptor::new("Echo", "echo").param("i64").returns("i64"),
                MethodDescriptor::new("Echo", "fail"),
            ]
        }

        fn invoke(&self, method: &str, args: &[Value]) -> anyhow::Result<Value> {
            self.trace.lock().push(format!("target:{}", method));
            match method {
                "echo" => Ok(args.first().cloned().unwrap_or(Value::Null)),
                "fail" => anyhow::bail!("boom"),
                _ => Err(ContainerError::no_such_method("Echo", method).into()),
            }
        }

        fn uninitialized(&self) -> Box<dyn Component> {
            Box::new(Echo {
                trace: Arc::default(),
            })
        }
    }

    fn record(trace: &Trace, entry: impl Into<String>) {
        trace.lock().push(entry.into());
    }

    fn registry_with(trace: &Trace) -> AdviceRegistry {
        let all = || PointcutExpression::All;
        let mut registry = AdviceRegistry::new();

        let t = trace.clone();
        registry.register(Advice::after("after-1", all(), move |_| {
            record(&t, "after-1");
            Ok(())
        }));
        let t = trace.clone();
        registry.register(Advice::around("around-outer", all(), move |pjp| {
            record(&t, "around-outer-enter");
            let result = pjp.proceed();
            record(&t, "around-outer-exit");
            result
        }));
        let t = trace.clone();
        registry.register(Advice::before("before-1", all(), move |_| {
            record(&t, "before-1");
            Ok(())
        }));
        let t = trace.clone();
        registry.register(Advice::after_throwing("throwing-1", all(), move |_, e| {
            record(&t, format!("throwing-1:{}", e));
            Ok(())
        }));
        let t = trace.clone();
        registry.register(Advice::around("around-inner", all(), move |pjp| {
            record(&t, "around-inner-enter");
            let result = pjp.proceed();
            record(&t, "around-inner-exit");
            result
        }));
        let t = trace.clone();
        registry.register(Advice::after_returning("returning-1", all(), move |_, v| {
            record(&t, format!("returning-1:{}", v));
            Ok(())
        }));
        let t = trace.clone();
        registry.register(Advice::before("before-2", all(), move |_| {
            record(&t, "before-2");
            Ok(())
        }));
        registry
    }

    #[test]
    fn test_full_ordering_on_success() {
        let trace: Trace = Arc::default();
        let registry = registry_with(&trace);
        let target = Echo {
            trace: trace.clone(),
        };
        let descriptor = &target.descriptors()[0];
        let chain = InvocationChain::resolve(descriptor, &registry);

        let result = chain.invoke(&target, &[Value::from(5)]).unwrap();
        assert_eq!(result, Value::from(5));
        assert_eq!(
            *trace.lock(),
            vec![
                "before-1",
                "before-2",
                "around-outer-enter",
                "around-inner-enter",
                "target:echo",
                "returning-1:5",
                "after-1",
                "around-inner-exit",
                "around-outer-exit",
            ]
        );
    }

    #[test]
    fn test_full_ordering_on_error() {
        let trace: Trace = Arc::default();
        let registry = registry_with(&trace);
        let target = Echo {
            trace: trace.clone(),
        };
        let descriptor = &target.descriptors()[1];
        let chain = InvocationChain::resolve(descriptor, &registry);

        let err = chain.invoke(&target, &[]).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert_eq!(
            *trace.lock(),
            vec![
                "before-1",
                "before-2",
                "around-outer-enter",
                "around-inner-enter",
                "target:fail",
                "throwing-1:boom",
                "after-1",
                "around-inner-exit",
                "around-outer-exit",
            ]
        );
    }

    #[test]
    fn test_before_failure_aborts_everything() {
        let trace: Trace = Arc::default();
        let mut registry = AdviceRegistry::new();
        registry.register(Advice::before("deny", PointcutExpression::All, |_| {
            anyhow::bail!("access denied")
        }));
        let t = trace.clone();
        registry.register(Advice::before("never", PointcutExpression::All, move |_| {
            record(&t, "never");
            Ok(())
        }));
        let t = trace.clone();
        registry.register(Advice::after("after", PointcutExpression::All, move |_| {
            record(&t, "after");
            Ok(())
        }));

        let target = Echo {
            trace: trace.clone(),
        };
        let chain = InvocationChain::resolve(&target.descriptors()[0], &registry);
        let err = chain.invoke(&target, &[Value::from(1)]).unwrap_err();

        assert_eq!(err.to_string(), "access denied");
        assert!(trace.lock().is_empty());
    }

    #[test]
    fn test_around_can_swallow_and_repeat() {
        let trace: Trace = Arc::default();
        let mut registry = AdviceRegistry::new();
        registry.register(Advice::around("retry", PointcutExpression::All, |pjp| {
            let _ = pjp.proceed();
            match pjp.proceed() {
                Ok(v) => Ok(v),
                Err(_) => Ok(Value::from("recovered")),
            }
        }));

        let target = Echo {
            trace: trace.clone(),
        };
        let chain = InvocationChain::resolve(&target.descriptors()[1], &registry);
        let result = chain.invoke(&target, &[]).unwrap();

        assert_eq!(result, Value::from("recovered"));
        assert_eq!(*trace.lock(), vec!["target:fail", "target:fail"]);
    }

    #[test]
    fn test_around_can_replace_arguments() {
        let mut registry = AdviceRegistry::new();
        registry.register(Advice::around("double", PointcutExpression::All, |pjp| {
            let doubled = pjp.join_point().args()[0].as_i64().unwrap_or(0) * 2;
            pjp.proceed_with_args(&[Value::from(doubled)])
        }));

        let target = Echo {
            trace: Arc::default(),
        };
        let chain = InvocationChain::resolve(&target.descriptors()[0], &registry);
        assert_eq!(chain.invoke(&target, &[Value::from(21)]).unwrap(), Value::from(42));
    }

    #[test]
    fn test_after_returning_failure_becomes_error_and_after_still_runs() {
        let trace: Trace = Arc::default();
        let mut registry = AdviceRegistry::new();
        registry.register(Advice::after_returning("reject", PointcutExpression::All, |_, _| {
            anyhow::bail!("rejected result")
        }));
        let t = trace.clone();
        registry.register(Advice::after("after", PointcutExpression::All, move |_| {
            record(&t, "after");
            Ok(())
        }));

        let target = Echo {
            trace: trace.clone(),
        };
        let chain = InvocationChain::resolve(&target.descriptors()[0], &registry);
        let err = chain.invoke(&target, &[Value::from(1)]).unwrap_err();

        assert_eq!(err.to_string(), "rejected result");
        assert_eq!(*trace.lock(), vec!["target:echo", "after"]);
    }

    #[test]
    fn test_failing_after_family_keeps_original_error() {
        let mut registry = AdviceRegistry::new();
        registry.register(Advice::after_throwing("broken", PointcutExpression::All, |_, _| {
            anyhow::bail!("advice broke")
        }));
        registry.register(Advice::after("broken-after", PointcutExpression::All, |_| {
            anyhow::bail!("cleanup broke")
        }));

        let target = Echo {
            trace: Arc::default(),
        };
        let chain = InvocationChain::resolve(&target.descriptors()[1], &registry);
        let err = chain.invoke(&target, &[]).unwrap_err();
        assert_eq!(err.to_string(), "boom");

        let ok_chain = InvocationChain::resolve(&target.descriptors()[0], &registry);
        let err = ok_chain.invoke(&target, &[Value::from(1)]).unwrap_err();
        assert_eq!(err.to_string(), "cleanup broke");
    }

    #[test]
    fn test_builder_caches_by_type_and_method() {
        let trace: Trace = Arc::default();
        let builder = ChainBuilder::new(Arc::new(registry_with(&trace)));
        let target = Echo { trace };
        let descriptors = target.descriptors();

        let first = builder.build(&descriptors[0]);
        let second = builder.build(&descriptors[0]);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(builder.cached(), 1);

        builder.build(&descriptors[1]);
        assert_eq!(builder.cached(), 2);
        assert_eq!(first.advice_names(), second.advice_names());
    }
}
