//! 日志/指标事件出口
//!
//! 切面通过 `emit(event, fields)` 把观测数据交给外部 sink。
//! sink 失败只记录调试日志，绝不影响被拦截的调用。

use chimera_core::Value;
use parking_lot::Mutex;
use std::sync::Arc;

/// 事件字段
pub type Fields = serde_json::Map<String, Value>;

/// 事件 sink
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &str, fields: &Fields) -> anyhow::Result<()>;
}

/// 发射器：包装 sink，吞掉 sink 的错误
#[derive(Clone)]
pub struct Emitter {
    sink: Arc<dyn EventSink>,
}

impl Emitter {
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// 输出到 tracing 的发射器
    pub fn tracing() -> Self {
        Self::new(Arc::new(TracingSink))
    }

    /// 发送事件，fire-and-forget
    pub fn emit(&self, event: &str, fields: Fields) {
        if let Err(e) = self.sink.emit(event, &fields) {
            tracing::debug!("Event sink failed for '{}', ignoring: {:#}", event, e);
        }
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter").finish_non_exhaustive()
    }
}

/// 输出为结构化 tracing 事件
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &str, fields: &Fields) -> anyhow::Result<()> {
        let fields = serde_json::to_string(fields)?;
        tracing::info!(target: "chimera_aop::emit", event = event, fields = %fields);
        Ok(())
    }
}

/// 把事件保存在内存里，便于检查
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(String, Fields)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 已收到的事件（按时间顺序）
    pub fn events(&self) -> Vec<(String, Fields)> {
        self.events.lock().clone()
    }

    /// 指定名称的事件
    pub fn events_named(&self, event: &str) -> Vec<Fields> {
        self.events
            .lock()
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, fields)| fields.clone())
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &str, fields: &Fields) -> anyhow::Result<()> {
        self.events.lock().push((event.to_string(), fields.clone()));
        Ok(())
    }
}

/// 构造事件字段
///
/// ```ignore
/// let fields = fields! { "name" => "wheatRelated", "elapsed_ms" => 3 };
/// ```
#[macro_export]
macro_rules! fields {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut map = $crate::emit::Fields::new();
        $( map.insert(($key).to_string(), $crate::Value::from($value)); )*
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSink;

    impl EventSink for BrokenSink {
        fn emit(&self, _event: &str, _fields: &Fields) -> anyhow::Result<()> {
            anyhow::bail!("sink unavailable")
        }
    }

    #[test]
    fn test_memory_sink_records() {
        let sink = Arc::new(MemorySink::new());
        let emitter = Emitter::new(sink.clone());
        emitter.emit("metric", crate::fields! { "name" => "wheatRelated", "elapsed_ms" => 3 });
        emitter.emit("other", Fields::new());

        let metrics = sink.events_named("metric");
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0]["name"], Value::from("wheatRelated"));
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn test_failing_sink_is_swallowed() {
        let emitter = Emitter::new(Arc::new(BrokenSink));
        emitter.emit("metric", Fields::new());
    }
}
