//! 切点（Pointcut）表达式系统
//!
//! 定义了如何匹配方法描述符的规则。匹配是纯函数：没有副作用，对同一个描述符
//! 反复求值结果不变，不匹配时返回 `false` 而不是报错。
//!
//! 支持的文本语法：
//!
//! ```text
//! expr    := and ( "||" and )*
//! and     := unary ( "&&" unary )*
//! unary   := "!" unary | "(" expr ")" | primary
//! primary := "execution(" ["public"] ret type "." method "(" params ")" ")"
//!          | "@annotation(" Name ")"
//!          | "within(" TypePattern ")"
//!          | "*"
//! ```

use crate::error::AopError;
use chimera_core::descriptor::{simple_name, MethodDescriptor};
use regex::Regex;
use std::fmt;

/// 名称模式（支持 * 通配符）
///
/// 支持的模式：
/// - `*` - 匹配任意字符串
/// - `User*` - 以 User 开头
/// - `*Service` - 以 Service 结尾
/// - `*Service*` - 包含 Service
#[derive(Clone)]
pub struct NamePattern {
    raw: String,
    regex: Option<Regex>,
}

impl NamePattern {
    pub fn new(raw: impl Into<String>) -> Result<Self, AopError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(AopError::pointcut(raw, "empty name pattern"));
        }

        let regex = if raw != "*" && raw.contains('*') {
            let body: Vec<String> = raw
                .replace("::", ".")
                .split('*')
                .map(regex::escape)
                .collect();
            let compiled = Regex::new(&format!("^{}$", body.join(".*")))
                .map_err(|e| AopError::pointcut(raw.clone(), e.to_string()))?;
            Some(compiled)
        } else {
            None
        };

        Ok(Self { raw, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, target: &str) -> bool {
        match &self.regex {
            Some(regex) => regex.is_match(target),
            None => self.raw == "*" || self.raw == target,
        }
    }

    /// 类型名称匹配
    ///
    /// 不带路径的模式只比较简单名称；带路径的模式（`a.b.Type` 或 `a::b::Type`）
    /// 比较统一成 `.` 分隔后的完整名称。
    pub fn matches_type(&self, type_name: &str) -> bool {
        if self.raw.contains('.') || self.raw.contains("::") {
            let target = type_name.replace("::", ".");
            match &self.regex {
                Some(regex) => regex.is_match(&target),
                None => self.raw.replace("::", ".") == target,
            }
        } else {
            self.matches(simple_name(type_name))
        }
    }
}

impl fmt::Debug for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// 参数列表模式
#[derive(Clone, Debug)]
pub enum ParamsPattern {
    /// `(..)` - 任意参数
    Any,
    /// `(A, B)` - 参数个数与类型完全一致；`()` 表示无参
    Exact(Vec<NamePattern>),
    /// `(A, ..)` - 以给定参数开头
    Prefix(Vec<NamePattern>),
}

impl ParamsPattern {
    fn parse(expression: &str, params: &str) -> Result<Self, AopError> {
        let params = params.trim();
        if params.is_empty() {
            return Ok(ParamsPattern::Exact(Vec::new()));
        }
        if params == ".." {
            return Ok(ParamsPattern::Any);
        }

        let items: Vec<&str> = params.split(',').map(str::trim).collect();
        let (last, head) = items
            .split_last()
            .ok_or_else(|| AopError::pointcut(expression, "empty parameter list"))?;

        let compile = |items: &[&str]| -> Result<Vec<NamePattern>, AopError> {
            items
                .iter()
                .map(|item| {
                    if *item == ".." {
                        Err(AopError::pointcut(expression, "'..' is only allowed last"))
                    } else {
                        NamePattern::new(*item)
                            .map_err(|_| AopError::pointcut(expression, "empty parameter type"))
                    }
                })
                .collect()
        };

        if *last == ".." {
            Ok(ParamsPattern::Prefix(compile(head)?))
        } else {
            Ok(ParamsPattern::Exact(compile(&items)?))
        }
    }

    pub fn matches(&self, params: &[String]) -> bool {
        match self {
            ParamsPattern::Any => true,
            ParamsPattern::Exact(patterns) => {
                patterns.len() == params.len()
                    && patterns.iter().zip(params).all(|(p, t)| p.matches(t))
            }
            ParamsPattern::Prefix(patterns) => {
                patterns.len() <= params.len()
                    && patterns.iter().zip(params).all(|(p, t)| p.matches(t))
            }
        }
    }
}

impl fmt::Display for ParamsPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |patterns: &[NamePattern]| -> Vec<String> {
            patterns.iter().map(|p| p.as_str().to_string()).collect()
        };
        match self {
            ParamsPattern::Any => write!(f, ".."),
            ParamsPattern::Exact(patterns) => write!(f, "{}", join(patterns).join(", ")),
            ParamsPattern::Prefix(patterns) => {
                let mut items = join(patterns);
                items.push("..".to_string());
                write!(f, "{}", items.join(", "))
            }
        }
    }
}

/// 结构化匹配：`execution(public * UserService.*(..))`
#[derive(Clone, Debug)]
pub struct ExecutionPattern {
    pub return_type: NamePattern,
    pub type_pattern: NamePattern,
    pub method_pattern: NamePattern,
    pub params: ParamsPattern,
}

impl ExecutionPattern {
    fn matches(&self, descriptor: &MethodDescriptor) -> bool {
        descriptor.is_public()
            && self.type_pattern.matches_type(&descriptor.owning_type)
            && self.method_pattern.matches(&descriptor.name)
            && self.return_type.matches(&descriptor.return_type)
            && self.params.matches(&descriptor.params)
    }
}

/// 切点表达式
///
/// 用于匹配方法描述符
#[derive(Clone)]
pub enum PointcutExpression {
    /// 匹配所有公共方法
    All,

    /// 匹配类型、方法名、返回类型和参数
    Execution(ExecutionPattern),

    /// 匹配特定类型的所有公共方法
    Within(NamePattern),

    /// 匹配带有指定标记的方法，标记的参数值不参与匹配
    Annotation(String),

    /// 使用正则表达式匹配类型
    TypeRegex(Regex),

    /// 使用正则表达式匹配方法
    MethodRegex(Regex),

    /// 与运算（AND）
    And(Box<PointcutExpression>, Box<PointcutExpression>),

    /// 或运算（OR）
    Or(Box<PointcutExpression>, Box<PointcutExpression>),

    /// 非运算（NOT）
    Not(Box<PointcutExpression>),
}

impl PointcutExpression {
    /// 检查方法是否匹配
    pub fn matches(&self, descriptor: &MethodDescriptor) -> bool {
        match self {
            PointcutExpression::All => descriptor.is_public(),

            PointcutExpression::Execution(pattern) => pattern.matches(descriptor),

            PointcutExpression::Within(pattern) => {
                descriptor.is_public() && pattern.matches_type(&descriptor.owning_type)
            }

            PointcutExpression::Annotation(name) => descriptor.find_marker(name).is_some(),

            PointcutExpression::TypeRegex(regex) => {
                descriptor.is_public() && regex.is_match(&descriptor.owning_type)
            }

            PointcutExpression::MethodRegex(regex) => {
                descriptor.is_public() && regex.is_match(&descriptor.name)
            }

            PointcutExpression::And(left, right) => {
                left.matches(descriptor) && right.matches(descriptor)
            }

            PointcutExpression::Or(left, right) => {
                left.matches(descriptor) || right.matches(descriptor)
            }

            PointcutExpression::Not(expr) => !expr.matches(descriptor),
        }
    }

    /// 解析切点表达式
    ///
    /// 例如：
    /// - `execution(public * com.company.service.UserService.*(..))`
    /// - `@annotation(MetricTime)`
    /// - `within(*Service) && !execution(* *.get*(..))`
    pub fn parse(expression: &str) -> Result<Self, AopError> {
        let mut parser = Parser {
            source: expression,
            pos: 0,
        };
        let expr = parser.parse_or()?;
        parser.skip_ws();
        if parser.pos != expression.len() {
            return Err(parser.error(format!(
                "unexpected trailing input '{}'",
                &expression[parser.pos..]
            )));
        }
        Ok(expr)
    }

    /// 创建 execution 表达式：任意返回类型、任意参数
    pub fn execution(type_pattern: &str, method_pattern: &str) -> Result<Self, AopError> {
        Ok(PointcutExpression::Execution(ExecutionPattern {
            return_type: NamePattern::new("*")?,
            type_pattern: NamePattern::new(type_pattern)?,
            method_pattern: NamePattern::new(method_pattern)?,
            params: ParamsPattern::Any,
        }))
    }

    /// 创建 within 表达式
    pub fn within(type_pattern: &str) -> Result<Self, AopError> {
        Ok(PointcutExpression::Within(NamePattern::new(type_pattern)?))
    }

    /// 创建标记表达式
    pub fn annotation(name: impl Into<String>) -> Self {
        PointcutExpression::Annotation(name.into())
    }

    /// 使用正则表达式匹配类型
    pub fn type_regex(pattern: &str) -> Result<Self, AopError> {
        Regex::new(pattern)
            .map(PointcutExpression::TypeRegex)
            .map_err(|e| AopError::pointcut(pattern, e.to_string()))
    }

    /// 使用正则表达式匹配方法名
    pub fn method_regex(pattern: &str) -> Result<Self, AopError> {
        Regex::new(pattern)
            .map(PointcutExpression::MethodRegex)
            .map_err(|e| AopError::pointcut(pattern, e.to_string()))
    }

    /// 与运算
    pub fn and(self, other: PointcutExpression) -> Self {
        PointcutExpression::And(Box::new(self), Box::new(other))
    }

    /// 或运算
    pub fn or(self, other: PointcutExpression) -> Self {
        PointcutExpression::Or(Box::new(self), Box::new(other))
    }

    /// 非运算
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        PointcutExpression::Not(Box::new(self))
    }

    /// 取出可以绑定到连接点的标记
    ///
    /// 只考虑肯定位置上的 `@annotation(..)`（`Not` 之下的不算），返回描述符上
    /// 第一个实际存在的标记，切面据此读取标记参数（例如指标名称）。
    pub fn bound_marker<'d>(
        &self,
        descriptor: &'d MethodDescriptor,
    ) -> Option<&'d chimera_core::Marker> {
        match self {
            PointcutExpression::Annotation(name) => descriptor.find_marker(name),
            PointcutExpression::And(left, right) | PointcutExpression::Or(left, right) => left
                .bound_marker(descriptor)
                .or_else(|| right.bound_marker(descriptor)),
            _ => None,
        }
    }
}

impl fmt::Display for PointcutExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PointcutExpression::All => write!(f, "*"),
            PointcutExpression::Execution(p) => write!(
                f,
                "execution(public {} {}.{}({}))",
                p.return_type.as_str(),
                p.type_pattern.as_str(),
                p.method_pattern.as_str(),
                p.params
            ),
            PointcutExpression::Within(p) => write!(f, "within({})", p.as_str()),
            PointcutExpression::Annotation(name) => write!(f, "@annotation({})", name),
            PointcutExpression::TypeRegex(r) => write!(f, "type_regex({})", r.as_str()),
            PointcutExpression::MethodRegex(r) => write!(f, "method_regex({})", r.as_str()),
            PointcutExpression::And(l, r) => write!(f, "({} && {})", l, r),
            PointcutExpression::Or(l, r) => write!(f, "({} || {})", l, r),
            PointcutExpression::Not(e) => write!(f, "!{}", e),
        }
    }
}

impl fmt::Debug for PointcutExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pointcut({})", self)
    }
}

/// 递归下降解析器
struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: impl Into<String>) -> AopError {
        AopError::pointcut(self.source, reason)
    }

    fn rest(&self) -> &'a str {
        &self.source[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<PointcutExpression, AopError> {
        let mut expr = self.parse_and()?;
        while self.eat("||") {
            expr = expr.or(self.parse_and()?);
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<PointcutExpression, AopError> {
        let mut expr = self.parse_unary()?;
        while self.eat("&&") {
            expr = expr.and(self.parse_unary()?);
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<PointcutExpression, AopError> {
        if self.eat("!") {
            return Ok(self.parse_unary()?.not());
        }
        if self.eat("(") {
            let expr = self.parse_or()?;
            if !self.eat(")") {
                return Err(self.error("missing ')'"));
            }
            return Ok(expr);
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<PointcutExpression, AopError> {
        if self.eat("execution") {
            let body = self.call_body()?;
            return self.parse_execution(body);
        }
        if self.eat("@annotation") {
            let name = self.call_body()?.trim();
            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(self.error(format!("invalid marker name '{}'", name)));
            }
            return Ok(PointcutExpression::annotation(name));
        }
        if self.eat("within") {
            let pattern = self.call_body()?.trim();
            return NamePattern::new(pattern)
                .map(PointcutExpression::Within)
                .map_err(|_| self.error("within() needs a type pattern"));
        }
        if self.eat("*") {
            return Ok(PointcutExpression::All);
        }

        if self.rest().is_empty() {
            Err(self.error("unexpected end of expression"))
        } else {
            Err(self.error(format!("unexpected token at '{}'", self.rest())))
        }
    }

    /// 读取 `( ... )` 中的内容，允许内部出现成对的括号
    fn call_body(&mut self) -> Result<&'a str, AopError> {
        if !self.eat("(") {
            return Err(self.error("expected '('"));
        }
        let start = self.pos;
        let mut depth = 1usize;
        for (offset, c) in self.rest().char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        let body = &self.source[start..start + offset];
                        self.pos = start + offset + 1;
                        return Ok(body);
                    }
                }
                _ => {}
            }
        }
        Err(self.error("unbalanced parentheses"))
    }

    fn parse_execution(&self, body: &str) -> Result<PointcutExpression, AopError> {
        let body = body.trim();
        let open = body
            .rfind('(')
            .filter(|_| body.ends_with(')'))
            .ok_or_else(|| self.error("execution() needs a parameter list, e.g. (..)"))?;
        let params = ParamsPattern::parse(self.source, &body[open + 1..body.len() - 1])?;

        let mut tokens: Vec<&str> = body[..open].split_whitespace().collect();
        match tokens.first().copied() {
            Some("public") => {
                tokens.remove(0);
            }
            Some(modifier @ ("private" | "protected" | "crate")) => {
                return Err(self.error(format!(
                    "only public methods can be advised, found '{}'",
                    modifier
                )));
            }
            _ => {}
        }

        let (return_type, qualified) = match tokens.as_slice() {
            [return_type, qualified] => (*return_type, *qualified),
            _ => return Err(self.error("expected '<return> <Type>.<method>(<params>)'")),
        };

        let (type_pattern, method_pattern) = match qualified.rsplit_once('.') {
            Some((ty, method)) => (ty, method),
            None => ("*", qualified),
        };

        let pattern = |raw: &str| NamePattern::new(raw).map_err(|e| self.error(e.to_string()));
        Ok(PointcutExpression::Execution(ExecutionPattern {
            return_type: pattern(return_type)?,
            type_pattern: pattern(type_pattern)?,
            method_pattern: pattern(method_pattern)?,
            params,
        }))
    }
}
