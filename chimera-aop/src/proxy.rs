//! 代理工厂
//!
//! 代理对外暴露与目标相同的公共方法，每个方法转发到自己的拦截链。
//!
//! 代理自身的状态来自 [`Component::uninitialized`]：构造代理时不会重新执行
//! 目标的初始化逻辑，因此通过代理直接读取字段只能得到默认值；
//! 而普通方法在真实目标上执行，可以看到已初始化的状态。
//!
//! 密封（sealed）方法无法被拦截：它们不会被路由到目标，而是直接在代理的
//! 未初始化状态上执行，也不会触发任何通知。创建代理时会对这些方法输出警告。

use crate::chain::{ChainBuilder, InvocationChain};
use crate::config::AopConfig;
use chimera_core::{Component, ContainerError, MethodDescriptor, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 方法路由
enum Route {
    /// 经过拦截链在目标上执行（链可以为空）
    Chain(Arc<InvocationChain>),
    /// 在代理的未初始化状态上执行，不经过任何通知
    Sealed,
}

/// AOP 代理
pub struct Proxy {
    type_name: String,
    target: Arc<dyn Component>,
    shell: Box<dyn Component>,
    surface: Vec<MethodDescriptor>,
    routes: HashMap<String, Route>,
    uncovered: Vec<String>,
}

impl Proxy {
    /// 被代理的真实目标
    pub fn target(&self) -> &Arc<dyn Component> {
        &self.target
    }

    /// 无法被拦截的方法签名
    pub fn uncovered_methods(&self) -> &[String] {
        &self.uncovered
    }

    /// 方法的拦截链；密封方法和不存在的方法返回 None
    pub fn chain(&self, method: &str) -> Option<&Arc<InvocationChain>> {
        match self.routes.get(method) {
            Some(Route::Chain(chain)) => Some(chain),
            _ => None,
        }
    }
}

impl Component for Proxy {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn descriptors(&self) -> Vec<MethodDescriptor> {
        self.surface.clone()
    }

    fn invoke(&self, method: &str, args: &[Value]) -> anyhow::Result<Value> {
        match self.routes.get(method) {
            Some(Route::Chain(chain)) => chain.invoke(self.target.as_ref(), args),
            Some(Route::Sealed) => {
                tracing::trace!(
                    "{}.{} is sealed, executing on proxy state without advice",
                    self.type_name,
                    method
                );
                self.shell.invoke(method, args)
            }
            None => Err(ContainerError::no_such_method(&self.type_name, method).into()),
        }
    }

    fn field(&self, name: &str) -> Option<Value> {
        self.shell.field(name)
    }

    fn uninitialized(&self) -> Box<dyn Component> {
        self.shell.uninitialized()
    }
}

impl fmt::Debug for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("type_name", &self.type_name)
            .field("methods", &self.surface.len())
            .field("uncovered", &self.uncovered)
            .finish()
    }
}

/// 代理工厂
pub struct ProxyFactory {
    chains: Arc<ChainBuilder>,
    config: AopConfig,
}

impl ProxyFactory {
    pub fn new(chains: Arc<ChainBuilder>, config: AopConfig) -> Self {
        Self { chains, config }
    }

    pub fn chains(&self) -> &Arc<ChainBuilder> {
        &self.chains
    }

    pub fn config(&self) -> &AopConfig {
        &self.config
    }

    /// 目标是否有任何公共方法被通知匹配
    ///
    /// 密封方法同样计入：只匹配到密封方法的组件也会被代理（并输出警告）。
    pub fn is_advised(&self, target: &dyn Component) -> bool {
        target
            .descriptors()
            .iter()
            .filter(|d| d.is_public())
            .any(|d| !self.chains.build(d).is_empty())
    }

    /// 仅在有通知匹配时创建代理
    pub fn advise(&self, target: Arc<dyn Component>) -> Option<Proxy> {
        if self.is_advised(target.as_ref()) {
            Some(self.create_proxy(target))
        } else {
            None
        }
    }

    /// 为目标创建代理
    pub fn create_proxy(&self, target: Arc<dyn Component>) -> Proxy {
        let type_name = self.config.proxy_type_name(target.type_name());
        // 方法按名称路由：同名的后续声明被忽略
        let mut surface: Vec<MethodDescriptor> = Vec::new();
        for descriptor in target.descriptors().into_iter().filter(MethodDescriptor::is_public) {
            if surface.iter().any(|d| d.name == descriptor.name) {
                tracing::warn!(
                    "Duplicate method name [{}] on {}, keeping the first declaration",
                    descriptor.signature(),
                    target.type_name()
                );
                continue;
            }
            surface.push(descriptor);
        }

        let mut routes = HashMap::with_capacity(surface.len());
        let mut uncovered = Vec::new();
        for descriptor in &surface {
            let route = if descriptor.sealed {
                uncovered.push(descriptor.signature());
                Route::Sealed
            } else {
                Route::Chain(self.chains.build(descriptor))
            };
            routes.insert(descriptor.name.clone(), route);
        }

        if self.config.warn_sealed_methods {
            for signature in &uncovered {
                tracing::warn!(
                    "Sealed method [{}] cannot be proxied: calls to this method will NOT be routed \
                     to the target instance and will see uninitialized state of the proxy",
                    signature
                );
            }
        }

        tracing::debug!(
            "Created proxy {} ({} method(s), {} uncovered)",
            type_name,
            surface.len(),
            uncovered.len()
        );

        Proxy {
            type_name,
            shell: target.uninitialized(),
            target,
            surface,
            routes,
            uncovered,
        }
    }
}

impl fmt::Debug for ProxyFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyFactory")
            .field("chains", &self.chains)
            .field("config", &self.config)
            .finish()
    }
}
