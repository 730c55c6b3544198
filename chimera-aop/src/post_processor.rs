//! AOP ComponentPostProcessor - 自动为匹配的组件创建 AOP 代理
//!
//! 在组件初始化后检查它的公共方法是否被任何通知匹配，匹配则替换为代理，
//! 之后所有 `resolve` 得到的都是同一个代理。

use crate::config::AopConfig;
use crate::proxy::ProxyFactory;
use crate::registry::AdviceRegistry;
use crate::ChainBuilder;
use chimera_core::prelude::*;
use std::sync::Arc;

/// AOP ComponentPostProcessor
///
/// ## 工作原理
///
/// 1. 在组件初始化后为它的每个公共方法解析拦截链
/// 2. 任一拦截链非空，则创建代理包装
/// 3. 代理会拦截方法调用并应用切面逻辑
///
/// ## 使用示例
///
/// ```ignore
/// use chimera_aop::AopPostProcessor;
///
/// let processor = AopPostProcessor::from_registry(registry, AopConfig::default());
/// let context = ApplicationContext::builder()
///     .add_post_processor(Arc::new(processor))
///     .register("customerService", Arc::new(CustomerService::new()))?
///     .build()?;
/// ```
pub struct AopPostProcessor {
    factory: Arc<ProxyFactory>,
    enabled: bool,
}

impl AopPostProcessor {
    pub fn new(factory: Arc<ProxyFactory>) -> Self {
        let enabled = factory.config().enabled;
        Self { factory, enabled }
    }

    /// 从通知注册表直接创建
    pub fn from_registry(registry: AdviceRegistry, config: AopConfig) -> Self {
        let chains = Arc::new(ChainBuilder::new(Arc::new(registry)));
        Self::new(Arc::new(ProxyFactory::new(chains, config)))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn factory(&self) -> &Arc<ProxyFactory> {
        &self.factory
    }
}

impl ComponentPostProcessor for AopPostProcessor {
    fn name(&self) -> &str {
        "AopPostProcessor"
    }

    fn order(&self) -> i32 {
        // 在其他处理器之后执行，代理包装的是最终形态的组件
        2000
    }

    fn post_process_after_initialization(
        &self,
        component: Arc<dyn Component>,
        name: &str,
    ) -> Result<Arc<dyn Component>> {
        if !self.enabled {
            return Ok(component);
        }

        match self.factory.advise(Arc::clone(&component)) {
            Some(proxy) => {
                tracing::info!(
                    "🔷 [AOP] Component '{}' wrapped with {}",
                    name,
                    proxy.type_name()
                );
                Ok(Arc::new(proxy))
            }
            None => {
                tracing::trace!(
                    "Component '{}' does not match any advice, skipping AOP wrapping",
                    name
                );
                Ok(component)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::advice::Advice;
    use crate::pointcut::PointcutExpression;

    struct Plain(&'static str);

    impl Component for Plain {
        fn type_name(&self) -> &str {
            self.0
        }

        fn descriptors(&self) -> Vec<MethodDescriptor> {
            vec![MethodDescriptor::new(self.0, "run")]
        }

        fn invoke(&self, method: &str, _args: &[Value]) -> Result<Value> {
            match method {
                "run" => Ok(Value::from(self.0)),
                _ => Err(ContainerError::no_such_method(self.0, method).into()),
            }
        }

        fn uninitialized(&self) -> Box<dyn Component> {
            Box::new(Plain(self.0))
        }
    }

    fn processor(config: AopConfig) -> AopPostProcessor {
        let mut registry = AdviceRegistry::new();
        registry.register(Advice::before(
            "check",
            PointcutExpression::within("UserService").unwrap(),
            |_| Ok(()),
        ));
        AopPostProcessor::from_registry(registry, config)
    }

    #[test]
    fn test_wraps_only_matching_components() {
        let processor = processor(AopConfig::default());

        let user = processor
            .post_process_after_initialization(Arc::new(Plain("UserService")), "userService")
            .unwrap();
        assert_eq!(user.type_name(), "UserService$$ChimeraProxy");

        let mail = processor
            .post_process_after_initialization(Arc::new(Plain("MailService")), "mailService")
            .unwrap();
        assert_eq!(mail.type_name(), "MailService");
    }

    #[test]
    fn test_disabled_processor() {
        let processor = processor(AopConfig {
            enabled: false,
            ..AopConfig::default()
        });
        assert!(!processor.is_enabled());

        let user = processor
            .post_process_after_initialization(Arc::new(Plain("UserService")), "userService")
            .unwrap();
        assert_eq!(user.type_name(), "UserService");
    }

    #[test]
    fn test_processor_order() {
        let processor = processor(AopConfig::default());

        // 应该在其他处理器之后执行
        assert_eq!(processor.order(), 2000);
    }
}
