//! 错误信息结构
//!
//! 提供结构化的错误信息传递给切面和事件 sink

use crate::emit::Fields;
use crate::error::AopError;
use chimera_core::ContainerError;
use std::error::Error;

/// 结构化的错误信息
///
/// 用于在 after_throwing 通知中输出更丰富的错误信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorInfo {
    /// 错误消息
    pub message: String,

    /// 错误类型名称（无法确定时为 None）
    pub error_type: Option<String>,

    /// 错误源链（cause chain），不含最外层消息
    pub source_chain: Vec<String>,
}

impl ErrorInfo {
    /// 从标准错误创建 ErrorInfo
    pub fn from_error<E: Error>(error: &E) -> Self {
        let mut source_chain = Vec::new();
        let mut current_source = error.source();
        while let Some(source) = current_source {
            source_chain.push(source.to_string());
            current_source = source.source();
        }

        Self {
            message: error.to_string(),
            error_type: Some(std::any::type_name::<E>().to_string()),
            source_chain,
        }
    }

    /// 从 anyhow::Error 创建 ErrorInfo
    ///
    /// 框架自身的错误类型可以识别出来，业务错误的类型名称未知。
    pub fn from_anyhow(error: &anyhow::Error) -> Self {
        let error_type = if error.downcast_ref::<ContainerError>().is_some() {
            Some("ContainerError".to_string())
        } else if error.downcast_ref::<AopError>().is_some() {
            Some("AopError".to_string())
        } else {
            None
        };

        Self {
            message: error.to_string(),
            error_type,
            source_chain: error.chain().skip(1).map(ToString::to_string).collect(),
        }
    }

    /// 获取完整的错误描述（包含源链）
    pub fn full_description(&self) -> String {
        if self.source_chain.is_empty() {
            self.message.clone()
        } else {
            format!(
                "{}\nCaused by:\n  {}",
                self.message,
                self.source_chain.join("\n  ")
            )
        }
    }

    /// 转换为事件字段
    pub fn to_fields(&self) -> Fields {
        crate::fields! {
            "message" => self.message.clone(),
            "error_type" => self.error_type.clone(),
            "causes" => self.source_chain.clone(),
        }
    }
}
