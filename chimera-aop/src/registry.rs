//! 通知注册表
//!
//! 保存所有声明的通知，与具体目标实例无关。注册顺序被保留，
//! 同一种类的多个通知按注册顺序执行；重复注册不会去重。

use crate::advice::Advice;
use crate::aspect::Aspect;
use chimera_core::MethodDescriptor;
use std::sync::Arc;

/// 通知注册表
///
/// 启动阶段可变，交给 [`ChainBuilder`](crate::ChainBuilder) 时被包进 `Arc`，此后只读。
pub struct AdviceRegistry {
    advices: Vec<Arc<Advice>>,
}

impl AdviceRegistry {
    pub fn new() -> Self {
        Self {
            advices: Vec::new(),
        }
    }

    /// 注册通知
    pub fn register(&mut self, advice: Advice) {
        tracing::debug!(
            "Registering {} advice '{}' on {}",
            advice.advice_type(),
            advice.name(),
            advice.pointcut()
        );
        self.advices.push(Arc::new(advice));
    }

    /// 批量注册通知
    pub fn register_all(&mut self, advices: impl IntoIterator<Item = Advice>) {
        for advice in advices {
            self.register(advice);
        }
    }

    /// 注册切面声明的全部通知（按切面给出的顺序）
    pub fn register_aspect(&mut self, aspect: &dyn Aspect) -> anyhow::Result<()> {
        let advices = aspect.advices()?;
        tracing::debug!(
            "Registering aspect '{}' with {} advice(s)",
            aspect.name(),
            advices.len()
        );
        self.register_all(advices);
        Ok(())
    }

    /// 所有通知，按注册顺序
    pub fn all(&self) -> &[Arc<Advice>] {
        &self.advices
    }

    /// 匹配指定方法的通知，按注册顺序
    pub fn matching<'a>(
        &'a self,
        descriptor: &'a MethodDescriptor,
    ) -> impl Iterator<Item = &'a Arc<Advice>> + 'a {
        self.advices
            .iter()
            .filter(move |advice| advice.pointcut().matches(descriptor))
    }

    pub fn len(&self) -> usize {
        self.advices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.advices.is_empty()
    }

    /// 从 inventory 自动加载所有注册的切面
    ///
    /// 切点表达式错误会直接返回，启动应当失败。
    ///
    /// 使用示例：
    /// ```ignore
    /// let mut registry = AdviceRegistry::new();
    /// registry.auto_load_aspects()?;
    /// ```
    pub fn auto_load_aspects(&mut self) -> anyhow::Result<()> {
        let registrations: Vec<_> = crate::aspect::get_all_aspect_registrations().collect();
        tracing::info!("Auto-loading {} aspect(s) from registry", registrations.len());

        for registration in registrations {
            tracing::debug!("  ├─ Loading aspect: {}", registration.name);
            let aspect = registration.create_instance();
            self.register_aspect(aspect.as_ref())?;
        }

        tracing::info!("Auto-loaded aspects, {} advice(s) registered", self.len());
        Ok(())
    }
}

impl Default for AdviceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AdviceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.advices.iter()).finish()
    }
}
