mod common;

use chimera_aop::prelude::*;
use chimera_core::prelude::*;
use common::*;
use std::sync::Arc;

fn accounts_proxy(registry: AdviceRegistry, recorder: &Recorder) -> Proxy {
    factory_for(registry).create_proxy(Arc::new(Accounts::new(100, recorder.clone())))
}

#[test]
fn test_accounts_before_and_around_scenario() {
    init_tracing();
    let recorder = Recorder::default();
    let mut registry = AdviceRegistry::new();
    registry.register(recording_before(
        "P1",
        PointcutExpression::parse("execution(* Accounts.*(..))").unwrap(),
        &recorder,
    ));
    registry.register(recording_around(
        "P2",
        PointcutExpression::annotation("Timed"),
        &recorder,
    ));
    let proxy = accounts_proxy(registry, &recorder);

    for args in [
        vec![],
        vec![Value::from(1)],
        vec![Value::from(2), Value::from(3)],
    ] {
        recorder.clear();
        let expected: i64 = args.iter().filter_map(Value::as_i64).sum();
        let result = proxy.invoke("compute_totals", &args).unwrap();

        assert_eq!(result, Value::from(expected));
        assert_eq!(
            recorder.entries(),
            vec!["P1-before", "P2-around-enter", "target-call", "P2-around-exit"]
        );
    }

    // P1 覆盖其它方法，P2 只作用于带 Timed 标记的方法
    recorder.clear();
    assert_eq!(proxy.invoke("balance", &[]).unwrap(), Value::from(100));
    assert_eq!(recorder.entries(), vec!["P1-before", "target-call"]);
}

#[test]
fn test_full_trace_for_every_kind() {
    let recorder = Recorder::default();
    let mut registry = AdviceRegistry::new();

    let r = recorder.clone();
    registry.register(Advice::after("after", PointcutExpression::All, move |_| {
        r.record("after");
        Ok(())
    }));
    registry.register(recording_around("outer", PointcutExpression::All, &recorder));
    let r = recorder.clone();
    registry.register(Advice::after_returning(
        "returning",
        PointcutExpression::All,
        move |_, value| {
            r.record(format!("after-returning:{}", value));
            Ok(())
        },
    ));
    registry.register(recording_around("inner", PointcutExpression::All, &recorder));
    registry.register(recording_before("first", PointcutExpression::All, &recorder));
    registry.register(recording_before("second", PointcutExpression::All, &recorder));

    let proxy = accounts_proxy(registry, &recorder);
    proxy.invoke("balance", &[]).unwrap();

    assert_eq!(
        recorder.entries(),
        vec![
            "first-before",
            "second-before",
            "outer-around-enter",
            "inner-around-enter",
            "target-call",
            "after-returning:100",
            "after",
            "inner-around-exit",
            "outer-around-exit",
        ]
    );
}

#[test]
fn test_after_throwing_scenario() {
    let recorder = Recorder::default();
    let mut registry = AdviceRegistry::new();

    let r = recorder.clone();
    registry.register(Advice::after_throwing(
        "throwing",
        PointcutExpression::within("Accounts").unwrap(),
        move |_, error| {
            r.record(format!("after-throwing:{}", error));
            Ok(())
        },
    ));
    let r = recorder.clone();
    registry.register(Advice::after(
        "after",
        PointcutExpression::within("Accounts").unwrap(),
        move |_| {
            r.record("after");
            Ok(())
        },
    ));
    let r = recorder.clone();
    registry.register(Advice::after_returning(
        "returning",
        PointcutExpression::within("Accounts").unwrap(),
        move |_, _| {
            r.record("after-returning");
            Ok(())
        },
    ));

    let proxy = accounts_proxy(registry, &recorder);
    let err = proxy.invoke("settle", &[]).unwrap_err();

    assert_eq!(err.to_string(), "ledger locked");
    assert_eq!(recorder.count("after-throwing:ledger locked"), 1);
    assert_eq!(recorder.count("after"), 1);
    assert_eq!(recorder.count("after-returning"), 0);
    assert_eq!(
        recorder.entries(),
        vec!["target-call", "after-throwing:ledger locked", "after"]
    );
}

#[test]
fn test_before_error_aborts_the_call() {
    let recorder = Recorder::default();
    let mut registry = AdviceRegistry::new();
    registry.register(
        AccessCheckAspect::new(PointcutExpression::within("Accounts").unwrap())
            .with_policy(|jp| {
                if jp.method_name() == "settle" {
                    anyhow::bail!("access denied for {}", jp.signature())
                }
                Ok(())
            })
            .advices()
            .unwrap()
            .remove(0),
    );
    registry.register(recording_around("log", PointcutExpression::All, &recorder));

    let proxy = accounts_proxy(registry, &recorder);
    let err = proxy.invoke("settle", &[]).unwrap_err();

    assert_eq!(err.to_string(), "access denied for Accounts.settle()");
    assert!(recorder.entries().is_empty());

    assert_eq!(proxy.invoke("balance", &[]).unwrap(), Value::from(100));
    assert_eq!(
        recorder.entries(),
        vec!["log-around-enter", "target-call", "log-around-exit"]
    );
}

#[test]
fn test_around_may_swallow_errors_and_proceed_twice() {
    let recorder = Recorder::default();
    let mut registry = AdviceRegistry::new();
    registry.register(Advice::around(
        "retry",
        PointcutExpression::parse("execution(* Accounts.settle(..))").unwrap(),
        |pjp| {
            let first = pjp.proceed();
            let second = pjp.proceed();
            match (first, second) {
                (Err(_), Err(_)) => Ok(Value::from("settled later")),
                (_, result) => result,
            }
        },
    ));

    let proxy = accounts_proxy(registry, &recorder);
    let result = proxy.invoke("settle", &[]).unwrap();

    assert_eq!(result, Value::from("settled later"));
    assert_eq!(recorder.count("target-call"), 2);
}

#[test]
fn test_business_errors_pass_through_logging_aspect() {
    let recorder = Recorder::default();
    let mut registry = AdviceRegistry::new();
    registry
        .register_aspect(&LoggingAspect::new(PointcutExpression::within("Accounts").unwrap()))
        .unwrap();

    let proxy = accounts_proxy(registry, &recorder);
    let err = proxy.invoke("settle", &[]).unwrap_err();
    assert_eq!(err.to_string(), "ledger locked");
}

#[test]
fn test_unknown_and_non_public_methods() {
    let recorder = Recorder::default();
    let proxy = accounts_proxy(AdviceRegistry::new(), &recorder);

    let err = proxy.invoke("transfer", &[]).unwrap_err();
    match err.downcast_ref::<ContainerError>() {
        Some(ContainerError::NoSuchMethod { type_name, method }) => {
            assert_eq!(type_name, "Accounts$$ChimeraProxy");
            assert_eq!(method, "transfer");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(recorder.entries().is_empty());
}

#[test]
fn test_invalid_pointcut_is_rejected() {
    let err = PointcutExpression::parse("execution(private * Accounts.*(..))").unwrap_err();
    assert!(matches!(err, AopError::Pointcut { .. }));
}
