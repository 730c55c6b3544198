use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::Context as _;

use crate::component::Component;
use crate::config::{Environment, PropertySource};
use crate::error::{ContainerError, Result};
use crate::lifecycle::ComponentPostProcessor;

/// 组件工厂：可以通过 [`Resolver`] 获取在它之前注册的组件
pub type ComponentFactory = Box<dyn FnOnce(&Resolver<'_>) -> Result<Arc<dyn Component>> + Send>;

/// 容器 trait - 按名称解析组件
pub trait Container {
    /// 通过名称获取组件
    fn resolve(&self, name: &str) -> Result<Arc<dyn Component>>;

    /// 检查是否包含指定名称的组件
    fn contains_component(&self, name: &str) -> bool;

    /// 获取所有组件名称（按注册顺序）
    fn component_names(&self) -> Vec<String>;
}

fn lookup(
    components: &HashMap<String, Arc<dyn Component>>,
    name: &str,
) -> Result<Arc<dyn Component>> {
    components
        .get(name)
        .cloned()
        .ok_or_else(|| ContainerError::ComponentNotFound(name.to_string()).into())
}

/// 应用上下文 - 调度运行时
///
/// 组件名称到实例的映射，实例可能是原始目标，也可能是后置处理器替换后的代理。
/// 只能由 [`ApplicationContextBuilder::build`] 创建，创建后不再提供任何注册入口，
/// 因此每个名称在整个生命周期内只对应一个逻辑实例。
pub struct ApplicationContext {
    /// 组件表
    components: HashMap<String, Arc<dyn Component>>,

    /// 注册顺序
    names: Vec<String>,

    /// 配置环境
    environment: Arc<Environment>,
}

impl ApplicationContext {
    pub fn builder() -> ApplicationContextBuilder {
        ApplicationContextBuilder::new()
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Container for ApplicationContext {
    fn resolve(&self, name: &str) -> Result<Arc<dyn Component>> {
        lookup(&self.components, name)
    }

    fn contains_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    fn component_names(&self) -> Vec<String> {
        self.names.clone()
    }
}

impl std::fmt::Debug for ApplicationContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationContext")
            .field("components", &self.names)
            .field("environment", &self.environment)
            .finish()
    }
}

/// 启动阶段的只读视图，交给组件工厂用来获取依赖
///
/// 只能看到已经完成后置处理的组件，所以注入的总是代理（如果有的话）。
pub struct Resolver<'a> {
    components: &'a HashMap<String, Arc<dyn Component>>,
    names: &'a [String],
    environment: &'a Arc<Environment>,
}

impl Resolver<'_> {
    pub fn environment(&self) -> &Arc<Environment> {
        self.environment
    }
}

impl Container for Resolver<'_> {
    fn resolve(&self, name: &str) -> Result<Arc<dyn Component>> {
        lookup(self.components, name)
    }

    fn contains_component(&self, name: &str) -> bool {
        self.components.contains_key(name)
    }

    fn component_names(&self) -> Vec<String> {
        self.names.to_vec()
    }
}

enum Registration {
    Instance(Arc<dyn Component>),
    Factory(ComponentFactory),
}

/// 应用上下文构建器
///
/// 启动阶段：注册组件、后置处理器和配置源，最后调用 [`build`](Self::build)。
pub struct ApplicationContextBuilder {
    registrations: Vec<(String, Registration)>,
    registered: HashSet<String>,
    post_processors: Vec<Arc<dyn ComponentPostProcessor>>,
    environment: Arc<Environment>,
}

impl ApplicationContextBuilder {
    pub fn new() -> Self {
        Self {
            registrations: Vec::new(),
            registered: HashSet::new(),
            post_processors: Vec::new(),
            environment: Arc::new(Environment::new()),
        }
    }

    fn push(mut self, name: String, registration: Registration) -> Result<Self> {
        if !self.registered.insert(name.clone()) {
            return Err(ContainerError::DuplicateComponent(name).into());
        }
        tracing::debug!("Registering component: {}", name);
        self.registrations.push((name, registration));
        Ok(self)
    }

    /// 注册已经创建好的组件实例
    pub fn register(self, name: impl Into<String>, component: Arc<dyn Component>) -> Result<Self> {
        self.push(name.into(), Registration::Instance(component))
    }

    /// 注册组件工厂
    ///
    /// 工厂在 `build` 时按注册顺序执行，可以解析之前注册的组件。
    pub fn register_factory<F>(self, name: impl Into<String>, factory: F) -> Result<Self>
    where
        F: FnOnce(&Resolver<'_>) -> Result<Arc<dyn Component>> + Send + 'static,
    {
        self.push(name.into(), Registration::Factory(Box::new(factory)))
    }

    /// 添加组件后置处理器
    pub fn add_post_processor(mut self, processor: Arc<dyn ComponentPostProcessor>) -> Self {
        tracing::debug!("Adding post processor: {}", processor.name());
        self.post_processors.push(processor);
        self
    }

    /// 添加配置源到 Environment
    pub fn add_property_source(self, source: Box<dyn PropertySource>) -> Self {
        self.environment.add_property_source(source);
        self
    }

    /// 使用外部创建的 Environment
    pub fn with_environment(mut self, environment: Arc<Environment>) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// 完成启动：实例化组件、执行后置处理器、冻结调度表
    pub fn build(self) -> Result<Arc<ApplicationContext>> {
        let mut processors = self.post_processors;
        processors.sort_by_key(|p| p.order());

        let mut components: HashMap<String, Arc<dyn Component>> =
            HashMap::with_capacity(self.registrations.len());
        let mut names: Vec<String> = Vec::with_capacity(self.registrations.len());

        for (name, registration) in self.registrations {
            let mut component = match registration {
                Registration::Instance(component) => component,
                Registration::Factory(factory) => {
                    let resolver = Resolver {
                        components: &components,
                        names: &names,
                        environment: &self.environment,
                    };
                    factory(&resolver)
                        .with_context(|| format!("Failed to create component '{}'", name))?
                }
            };

            for processor in &processors {
                component = processor
                    .post_process_after_initialization(component, &name)
                    .map_err(|e| ContainerError::PostProcessorFailed {
                        processor: processor.name().to_string(),
                        component: name.clone(),
                        reason: format!("{:#}", e),
                    })?;
            }

            tracing::debug!("  ├─ Component ready: {} ({})", name, component.type_name());
            names.push(name.clone());
            components.insert(name, component);
        }

        tracing::info!(
            "ApplicationContext bootstrapped with {} component(s)",
            names.len()
        );

        Ok(Arc::new(ApplicationContext {
            components,
            names,
            environment: self.environment,
        }))
    }
}

impl Default for ApplicationContextBuilder {
    fn default() -> Self {
        Self::new()
    }
}
