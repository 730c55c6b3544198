use chimera_aop::prelude::*;
use std::sync::Arc;

/// 业务日志切面
///
/// - UserService 的每个公共方法前做访问检查
/// - MailService 的每个公共方法前后记录日志
/// - CustomerService 的每个公共方法前做检查（不包括 WeChatService）
pub struct AppLoggingAspect;

impl Aspect for AppLoggingAspect {
    fn name(&self) -> &str {
        "AppLoggingAspect"
    }

    fn advices(&self) -> anyhow::Result<Vec<Advice>> {
        let mut advices = AccessCheckAspect::new(PointcutExpression::parse(
            "execution(public * demo.service.UserService.*(..))",
        )?)
        .advices()?;

        advices.extend(
            LoggingAspect::new(PointcutExpression::parse(
                "execution(public * demo.service.MailService.*(..))",
            )?)
            .advices()?,
        );

        advices.push(Advice::before(
            "AppLoggingAspect.some_check",
            PointcutExpression::parse("execution(public * CustomerService.*(..))")?,
            |jp| {
                tracing::info!("[Before] do some check for {}", jp.signature());
                Ok(())
            },
        ));

        Ok(advices)
    }
}

chimera_aop::inventory::submit! {
    AspectRegistration::new("AppLoggingAspect", || Arc::new(AppLoggingAspect) as Arc<dyn Aspect>)
}

chimera_aop::inventory::submit! {
    AspectRegistration::new("MetricAspect", || Arc::new(MetricAspect::default()) as Arc<dyn Aspect>)
}
