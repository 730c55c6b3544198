mod aspects;
mod services;

use chimera_aop::prelude::*;
use chimera_core::prelude::*;
use serde_json::json;
use services::{CustomerService, FarmerService, MailService, UserService, WeChatService};
use std::path::Path;
use std::sync::Arc;

fn banner(title: &str) {
    println!("\n╔════════════════════════════════════════════════════╗");
    println!("║  {:<50}║", title);
    println!("╚════════════════════════════════════════════════════╝\n");
}

fn load_environment() -> Result<Arc<Environment>> {
    let environment = Arc::new(Environment::new());

    let config_paths = ["demos/aop-demo/application.toml", "application.toml"];
    if let Some(path) = config_paths.iter().find(|p| Path::new(p).exists()) {
        environment.add_property_source(Box::new(
            TomlPropertySource::from_file(path)
                .with_context(|| format!("Failed to load {}", path))?,
        ));
    }
    environment.add_property_source(Box::new(EnvironmentPropertySource::new("CHIMERA_")));

    Ok(environment)
}

fn main() -> Result<()> {
    let environment = load_environment()?;
    LoggingConfig::from_env()
        .with_environment(&environment)?
        .init()?;

    banner("Chimera AOP - Demo");

    // 自动加载通过 inventory 注册的切面
    let mut registry = AdviceRegistry::new();
    registry.auto_load_aspects()?;
    let aop = AopPostProcessor::from_registry(registry, AopConfig::from_environment(&environment)?);

    let context = ApplicationContext::builder()
        .with_environment(Arc::clone(&environment))
        .add_post_processor(Arc::new(aop))
        .register("mailService", Arc::new(MailService))?
        .register_factory("userService", |resolver| {
            let mail_service = resolver.resolve("mailService")?;
            let user_service: Arc<dyn Component> = Arc::new(UserService::new(mail_service));
            Ok(user_service)
        })?
        .register("farmerService", Arc::new(FarmerService))?
        .register("customerService", Arc::new(CustomerService::new()))?
        .register_factory("weChatService", |resolver| {
            let customer_service = resolver.resolve("customerService")?;
            let we_chat_service: Arc<dyn Component> =
                Arc::new(WeChatService::new(customer_service));
            Ok(we_chat_service)
        })?
        .build()?;

    banner("装配 AOP");
    let user_service = context.resolve("userService")?;
    user_service.invoke("register", &[json!("test@example.com"), json!("password"), json!("test")])?;
    user_service.invoke("login", &[json!("bob@example.com"), json!("password")])?;
    println!("{}", user_service.type_name());

    banner("使用注解装配 AOP");
    let farmer_service = context.resolve("farmerService")?;
    farmer_service.invoke("wheat_related", &[])?;

    banner("AOP 避坑");
    let we_chat_service = context.resolve("weChatService")?;
    let message = we_chat_service.invoke("send_we_chat", &[])?;
    println!("{}", message);
    println!("{}", we_chat_service.type_name());

    // 直接访问代理的字段，或调用密封方法，得到的都是空值
    let inspected = we_chat_service.invoke("inspect_zone_id", &[])?;
    println!("zone_id through proxy state: {}", inspected);

    let customer_service = context.resolve("customerService")?;
    println!("{}", customer_service.type_name());

    Ok(())
}
