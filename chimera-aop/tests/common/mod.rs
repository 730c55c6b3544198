#![allow(dead_code)]

use chimera_aop::prelude::*;
use chimera_core::prelude::*;
use parking_lot::Mutex;
use std::sync::Arc;

/// 初始化测试日志（多次调用无副作用）
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// 记录调用顺序
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    pub fn record(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, entry: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == entry).count()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// 示例组件
///
/// - `compute_totals(..)`：带 `Timed` 标记，返回参数之和
/// - `settle()`：总是失败
/// - `balance()`：读取已初始化的余额
/// - `final_balance()`：密封方法，同样读取余额
/// - 字段 `balance` 直接暴露
pub struct Accounts {
    pub balance: i64,
    recorder: Recorder,
}

pub const ACCOUNTS: &str = "Accounts";

impl Accounts {
    pub fn new(balance: i64, recorder: Recorder) -> Self {
        Self { balance, recorder }
    }
}

impl Component for Accounts {
    fn type_name(&self) -> &str {
        ACCOUNTS
    }

    fn descriptors(&self) -> Vec<MethodDescriptor> {
        vec![
            MethodDescriptor::new(ACCOUNTS, "compute_totals")
                .param("i64")
                .param("i64")
                .returns("i64")
                .marker(Marker::new("Timed")),
            MethodDescriptor::new(ACCOUNTS, "settle"),
            MethodDescriptor::new(ACCOUNTS, "balance").returns("i64"),
            MethodDescriptor::new(ACCOUNTS, "final_balance")
                .returns("i64")
                .sealed(),
        ]
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        self.recorder.record("target-call");
        match method {
            "compute_totals" => Ok(Value::from(
                args.iter().filter_map(Value::as_i64).sum::<i64>(),
            )),
            "settle" => Err(anyhow!("ledger locked")),
            "balance" | "final_balance" => Ok(Value::from(self.balance)),
            _ => Err(ContainerError::no_such_method(ACCOUNTS, method).into()),
        }
    }

    fn field(&self, name: &str) -> Option<Value> {
        (name == "balance").then(|| Value::from(self.balance))
    }

    fn uninitialized(&self) -> Box<dyn Component> {
        Box::new(Accounts {
            balance: 0,
            recorder: self.recorder.clone(),
        })
    }
}

/// 记录进入/退出的环绕通知
pub fn recording_around(
    name: &str,
    pointcut: PointcutExpression,
    recorder: &Recorder,
) -> Advice {
    let recorder = recorder.clone();
    let label = name.to_string();
    Advice::around(name, pointcut, move |pjp| {
        recorder.record(format!("{}-around-enter", label));
        let result = pjp.proceed();
        recorder.record(format!("{}-around-exit", label));
        result
    })
}

/// 只记录名称的前置通知
pub fn recording_before(name: &str, pointcut: PointcutExpression, recorder: &Recorder) -> Advice {
    let recorder = recorder.clone();
    let label = name.to_string();
    Advice::before(name, pointcut, move |_| {
        recorder.record(format!("{}-before", label));
        Ok(())
    })
}

pub fn factory_for(registry: AdviceRegistry) -> ProxyFactory {
    ProxyFactory::new(
        Arc::new(ChainBuilder::new(Arc::new(registry))),
        AopConfig::default(),
    )
}
