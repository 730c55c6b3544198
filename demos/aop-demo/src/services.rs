use chimera_aop::METRIC_MARKER;
use chimera_core::prelude::*;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

fn arg_str<'a>(args: &'a [Value], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("missing string argument '{}'", name))
}

/// 本地时区的当前时间（遵循 TZ）
fn now_rfc3339() -> String {
    chrono::Local::now().to_rfc3339()
}

// ==================== 用户 ====================

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub email: String,
    pub name: String,
    #[serde(skip)]
    password: String,
}

impl User {
    fn new(email: &str, password: &str, name: &str) -> Self {
        Self {
            email: email.to_string(),
            password: password.to_string(),
            name: name.to_string(),
        }
    }
}

/// 用户服务 - 注册/登录后通过邮件服务发送通知
pub struct UserService {
    users: Mutex<Vec<User>>,
    mail_service: Arc<dyn Component>,
}

impl UserService {
    pub const NAME: &'static str = "demo::service::UserService";

    pub fn new(mail_service: Arc<dyn Component>) -> Self {
        Self {
            users: Mutex::new(vec![
                User::new("bob@example.com", "password", "Bob"),
                User::new("alice@example.com", "password", "Alice"),
                User::new("tom@example.com", "password", "Tom"),
            ]),
            mail_service,
        }
    }

    fn login(&self, email: &str, password: &str) -> Result<Value> {
        let user = self
            .users
            .lock()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email) && u.password == password)
            .cloned()
            .ok_or_else(|| anyhow!("login failed for {}", email))?;

        let user = serde_json::to_value(user)?;
        self.mail_service
            .invoke("send_login_mail", std::slice::from_ref(&user))?;
        Ok(user)
    }

    fn register(&self, email: &str, password: &str, name: &str) -> Result<Value> {
        let user = {
            let mut users = self.users.lock();
            if users.iter().any(|u| u.email.eq_ignore_ascii_case(email)) {
                anyhow::bail!("email {} already registered", email);
            }
            let user = User::new(email, password, name);
            users.push(user.clone());
            user
        };

        let user = serde_json::to_value(user)?;
        self.mail_service
            .invoke("send_registration_mail", std::slice::from_ref(&user))?;
        Ok(user)
    }
}

impl Component for UserService {
    fn type_name(&self) -> &str {
        Self::NAME
    }

    fn descriptors(&self) -> Vec<MethodDescriptor> {
        vec![
            MethodDescriptor::new(Self::NAME, "login")
                .param("String")
                .param("String")
                .returns("User"),
            MethodDescriptor::new(Self::NAME, "register")
                .param("String")
                .param("String")
                .param("String")
                .returns("User"),
        ]
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        match method {
            "login" => self.login(arg_str(args, 0, "email")?, arg_str(args, 1, "password")?),
            "register" => self.register(
                arg_str(args, 0, "email")?,
                arg_str(args, 1, "password")?,
                arg_str(args, 2, "name")?,
            ),
            _ => Err(ContainerError::no_such_method(Self::NAME, method).into()),
        }
    }

    fn uninitialized(&self) -> Box<dyn Component> {
        Box::new(UserService {
            users: Mutex::new(Vec::new()),
            mail_service: Arc::clone(&self.mail_service),
        })
    }
}

// ==================== 邮件 ====================

/// 邮件服务
pub struct MailService;

impl MailService {
    pub const NAME: &'static str = "demo::service::MailService";

    fn send(&self, user: &Value, text: &str) -> Result<Value> {
        let name = user["name"].as_str().unwrap_or("there");
        println!("Hi, {}! {} at {}", name, text, now_rfc3339());
        Ok(Value::Bool(true))
    }
}

impl Component for MailService {
    fn type_name(&self) -> &str {
        Self::NAME
    }

    fn descriptors(&self) -> Vec<MethodDescriptor> {
        vec![
            MethodDescriptor::new(Self::NAME, "send_login_mail")
                .param("User")
                .returns("bool"),
            MethodDescriptor::new(Self::NAME, "send_registration_mail")
                .param("User")
                .returns("bool"),
        ]
    }

    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        let user = args.first().cloned().unwrap_or(Value::Null);
        match method {
            "send_login_mail" => self.send(&user, "You are logged in"),
            "send_registration_mail" => self.send(&user, "Welcome"),
            _ => Err(ContainerError::no_such_method(Self::NAME, method).into()),
        }
    }

    fn uninitialized(&self) -> Box<dyn Component> {
        Box::new(MailService)
    }
}

// ==================== 性能监控 ====================

/// 农场服务 - `wheat_related` 带有 `MetricTime("wheatRelated")` 标记
pub struct FarmerService;

impl FarmerService {
    pub const NAME: &'static str = "demo::metrics::FarmerService";
}

impl Component for FarmerService {
    fn type_name(&self) -> &str {
        Self::NAME
    }

    fn descriptors(&self) -> Vec<MethodDescriptor> {
        vec![MethodDescriptor::new(Self::NAME, "wheat_related")
            .marker(Marker::new(METRIC_MARKER).with_value("wheatRelated"))]
    }

    fn invoke(&self, method: &str, _args: &[Value]) -> Result<Value> {
        match method {
            "wheat_related" => {
                println!("In the wheatRelated");
                Ok(Value::Null)
            }
            _ => Err(ContainerError::no_such_method(Self::NAME, method).into()),
        }
    }

    fn uninitialized(&self) -> Box<dyn Component> {
        Box::new(FarmerService)
    }
}

// ==================== 代理状态陷阱 ====================

/// 客户服务
///
/// `zone_id` 在构造时初始化，并作为字段直接暴露；`get_final_zone_id` 是密封方法。
pub struct CustomerService {
    zone_id: Option<String>,
}

impl CustomerService {
    pub const NAME: &'static str = "demo::advservice::CustomerService";

    pub fn new() -> Self {
        let zone_id = std::env::var("TZ").unwrap_or_else(|_| "UTC".to_string());
        println!("CustomerService(): init...");
        println!("CustomerService(): zone_id = {}", zone_id);
        Self {
            zone_id: Some(zone_id),
        }
    }

    fn zone_id(&self) -> Value {
        Value::from(self.zone_id.clone())
    }
}

impl Component for CustomerService {
    fn type_name(&self) -> &str {
        Self::NAME
    }

    fn descriptors(&self) -> Vec<MethodDescriptor> {
        vec![
            MethodDescriptor::new(Self::NAME, "get_zone_id").returns("ZoneId"),
            MethodDescriptor::new(Self::NAME, "get_final_zone_id")
                .returns("ZoneId")
                .sealed(),
        ]
    }

    fn invoke(&self, method: &str, _args: &[Value]) -> Result<Value> {
        match method {
            "get_zone_id" | "get_final_zone_id" => Ok(self.zone_id()),
            _ => Err(ContainerError::no_such_method(Self::NAME, method).into()),
        }
    }

    fn field(&self, name: &str) -> Option<Value> {
        (name == "zone_id").then(|| self.zone_id())
    }

    fn uninitialized(&self) -> Box<dyn Component> {
        Box::new(CustomerService { zone_id: None })
    }
}

/// 微信服务 - 依赖注入的 CustomerService 是代理
pub struct WeChatService {
    customer_service: Arc<dyn Component>,
}

impl WeChatService {
    pub const NAME: &'static str = "demo::advservice::WeChatService";

    pub fn new(customer_service: Arc<dyn Component>) -> Self {
        Self { customer_service }
    }

    fn send_we_chat(&self) -> Result<Value> {
        // 通过方法访问，在真实目标上执行
        let zone_id = self.customer_service.invoke("get_zone_id", &[])?;
        let zone_id = zone_id
            .as_str()
            .ok_or_else(|| anyhow!("zone id is not initialized"))?;

        println!("{}", zone_id);
        println!("Hello, it is {} ({})", now_rfc3339(), zone_id);
        Ok(Value::from("Good Message"))
    }

    /// 直接读取字段和调用密封方法，看到的都是代理自身未初始化的状态
    fn inspect_zone_id(&self) -> Result<Value> {
        let field = self
            .customer_service
            .field("zone_id")
            .unwrap_or(Value::Null);
        let sealed = self.customer_service.invoke("get_final_zone_id", &[])?;
        Ok(serde_json::json!({ "field": field, "sealed": sealed }))
    }
}

impl Component for WeChatService {
    fn type_name(&self) -> &str {
        Self::NAME
    }

    fn descriptors(&self) -> Vec<MethodDescriptor> {
        vec![
            MethodDescriptor::new(Self::NAME, "send_we_chat").returns("String"),
            MethodDescriptor::new(Self::NAME, "inspect_zone_id").returns("Map"),
        ]
    }

    fn invoke(&self, method: &str, _args: &[Value]) -> Result<Value> {
        match method {
            "send_we_chat" => self.send_we_chat(),
            "inspect_zone_id" => self.inspect_zone_id(),
            _ => Err(ContainerError::no_such_method(Self::NAME, method).into()),
        }
    }

    fn uninitialized(&self) -> Box<dyn Component> {
        Box::new(WeChatService {
            customer_service: Arc::clone(&self.customer_service),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_is_zoned_rfc3339() {
        let stamp = now_rfc3339();
        let parsed = chrono::DateTime::parse_from_rfc3339(&stamp).unwrap();
        assert_eq!(parsed.to_rfc3339(), stamp);
    }

    #[test]
    fn test_we_chat_reads_zone_through_method() {
        let customer_service: Arc<dyn Component> = Arc::new(CustomerService::new());
        let we_chat = WeChatService::new(customer_service);
        assert_eq!(
            we_chat.invoke("send_we_chat", &[]).unwrap(),
            Value::from("Good Message")
        );
    }
}
