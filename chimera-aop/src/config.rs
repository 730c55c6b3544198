//! AOP 配置
//!
//! 从 [`Environment`] 读取以下键：
//!
//! | 键 | 默认值 | 说明 |
//! |----|--------|------|
//! | `aop.enabled` | `true` | 是否为匹配的组件创建代理 |
//! | `aop.warn-sealed-methods` | `true` | 创建代理时是否对无法拦截的方法输出警告 |
//! | `aop.proxy-suffix` | `$$ChimeraProxy` | 代理类型名称后缀 |

use crate::error::AopError;
use chimera_core::Environment;

pub const DEFAULT_PROXY_SUFFIX: &str = "$$ChimeraProxy";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AopConfig {
    pub enabled: bool,
    pub warn_sealed_methods: bool,
    pub proxy_suffix: String,
}

impl Default for AopConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            warn_sealed_methods: true,
            proxy_suffix: DEFAULT_PROXY_SUFFIX.to_string(),
        }
    }
}

impl AopConfig {
    /// 从配置环境读取；未配置的键使用默认值
    pub fn from_environment(env: &Environment) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let config = Self {
            enabled: read_bool(env, "aop.enabled", defaults.enabled)?,
            warn_sealed_methods: read_bool(
                env,
                "aop.warn-sealed-methods",
                defaults.warn_sealed_methods,
            )?,
            proxy_suffix: match env.get_string("aop.proxy-suffix") {
                Some(suffix) if suffix.trim().is_empty() => {
                    return Err(AopError::Config {
                        key: "aop.proxy-suffix".to_string(),
                        reason: "suffix must not be empty".to_string(),
                    }
                    .into());
                }
                Some(suffix) => suffix,
                None => defaults.proxy_suffix,
            },
        };

        tracing::debug!("Loaded AOP configuration: {:?}", config);
        Ok(config)
    }

    /// 代理类型名称
    pub fn proxy_type_name(&self, target_type: &str) -> String {
        format!("{}{}", target_type, self.proxy_suffix)
    }
}

fn read_bool(env: &Environment, key: &str, default: bool) -> Result<bool, AopError> {
    match env.get(key) {
        None => Ok(default),
        Some(value) => value.as_bool().ok_or_else(|| AopError::Config {
            key: key.to_string(),
            reason: format!("expected a boolean, got '{}'", value),
        }),
    }
}
