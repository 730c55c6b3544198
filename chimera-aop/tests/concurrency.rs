mod common;

use chimera_aop::prelude::*;
use chimera_core::prelude::*;
use common::*;
use std::sync::Arc;

fn builder(recorder: &Recorder) -> ChainBuilder {
    let mut registry = AdviceRegistry::new();
    registry.register(recording_before("audit", PointcutExpression::All, recorder));
    registry.register(recording_around(
        "timed",
        PointcutExpression::annotation("Timed"),
        recorder,
    ));
    ChainBuilder::new(Arc::new(registry))
}

#[test]
fn test_concurrent_first_build_is_idempotent() {
    let recorder = Recorder::default();
    let builder = builder(&recorder);
    let descriptors = Accounts::new(0, recorder.clone()).descriptors();

    let chains: Vec<Arc<InvocationChain>> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| builder.build(&descriptors[0])))
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .collect()
    });

    let cached = builder.build(&descriptors[0]);
    for chain in &chains {
        assert_eq!(chain.advice_names(), cached.advice_names());
    }
    assert_eq!(builder.cached(), 1);
    assert!(Arc::ptr_eq(&cached, &builder.build(&descriptors[0])));
}

#[test]
fn test_shared_proxy_across_threads() {
    let recorder = Recorder::default();
    let factory = ProxyFactory::new(Arc::new(builder(&recorder)), AopConfig::default());
    let proxy: Arc<dyn Component> =
        Arc::new(factory.create_proxy(Arc::new(Accounts::new(0, recorder.clone()))));

    std::thread::scope(|scope| {
        for i in 0..4 {
            let proxy = Arc::clone(&proxy);
            scope.spawn(move || {
                let result = proxy
                    .invoke("compute_totals", &[Value::from(i), Value::from(1)])
                    .unwrap();
                assert_eq!(result, Value::from(i + 1));
            });
        }
    });

    assert_eq!(recorder.count("audit-before"), 4);
    assert_eq!(recorder.count("timed-around-enter"), 4);
    assert_eq!(recorder.count("target-call"), 4);
}
