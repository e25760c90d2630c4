/// 预定义变量名与短代码的映射表
const PREDEFINED_VARIABLES: &[(&str, &str)] = &[
    ("aspect_ratio", "ar"),
    ("current_page", "cp"),
    ("current_page_index", "cp"),
    ("duration", "du"),
    ("face_count", "fc"),
    ("height", "h"),
    ("illustration_score", "ils"),
    ("initial_aspect_ratio", "iar"),
    ("initial_duration", "idu"),
    ("initial_height", "ih"),
    ("initial_width", "iw"),
    ("page_count", "pc"),
    ("tags", "tags"),
    ("width", "w"),
    ("x_offset", "px"),
    ("y_offset", "py"),
];

/// 运算符别名与规范短标记的映射表
const OPERATORS: &[(&str, &str)] = &[
    ("=", "eq"),
    ("==", "eq"),
    ("eq", "eq"),
    ("!=", "ne"),
    ("ne", "ne"),
    ("<", "lt"),
    ("lt", "lt"),
    ("<=", "lte"),
    ("lte", "lte"),
    (">", "gt"),
    ("gt", "gt"),
    (">=", "gte"),
    ("gte", "gte"),
    ("in", "in"),
    ("nin", "nin"),
    ("&&", "and"),
    ("and", "and"),
    ("||", "or"),
    ("or", "or"),
    ("*", "mul"),
    ("mul", "mul"),
    ("/", "div"),
    ("div", "div"),
    ("+", "add"),
    ("add", "add"),
    ("-", "sub"),
    ("sub", "sub"),
    ("^", "pow"),
    ("pow", "pow"),
];

fn translate_operator(token: &str) -> Option<&'static str> {
    OPERATORS
        .iter()
        .find(|(alias, _)| *alias == token)
        .map(|(_, canonical)| *canonical)
}

fn translate_variable(token: &str) -> Option<&'static str> {
    PREDEFINED_VARIABLES
        .iter()
        .find(|(name, _)| *name == token)
        .map(|(_, code)| *code)
}

fn translate_token(token: &str) -> String {
    if token.starts_with('$') {
        return token.to_owned();
    }
    if let Some(canonical) = translate_operator(token) {
        return canonical.to_owned();
    }
    if let Some(code) = translate_variable(token) {
        return code.to_owned();
    }
    token.to_owned()
}

/// 条件与算术表达式编译器
///
/// 将运算数与运算符按调用顺序平铺累积为标记序列，
/// 不构建表达式树，也没有运算符优先级，
/// 输出顺序与调用顺序严格一致。
/// 运算符的所有别名写法都归一化为规范短标记。
#[derive(Clone, Default, Eq, PartialEq, Debug)]
pub struct Expression {
    tokens: Vec<String>,
}

impl Expression {
    /// 创建空表达式
    #[inline]
    pub fn new() -> Self {
        Default::default()
    }

    /// 从预定义变量或用户变量（`$name`）开始构建表达式
    #[inline]
    pub fn variable(name: impl AsRef<str>) -> Self {
        let mut expression = Self::new();
        expression.push_operand(name.as_ref());
        expression
    }

    /// 从自由文本条件构建表达式
    ///
    /// 按空白字符切分后逐个标记归一化，
    /// 无法识别的标记原样保留为字面量
    pub fn raw(condition: impl AsRef<str>) -> Self {
        Self {
            tokens: condition
                .as_ref()
                .split_whitespace()
                .map(translate_token)
                .collect(),
        }
    }

    fn push_operand(&mut self, operand: &str) {
        self.tokens.push(translate_token(operand));
    }

    fn binary(mut self, operator: &'static str, operand: impl ToString) -> Self {
        self.tokens.push(operator.to_owned());
        self.push_operand(&operand.to_string());
        self
    }

    /// 等于
    #[inline]
    pub fn eq(self, operand: impl ToString) -> Self {
        self.binary("eq", operand)
    }

    /// 不等于
    #[inline]
    pub fn ne(self, operand: impl ToString) -> Self {
        self.binary("ne", operand)
    }

    /// 小于
    #[inline]
    pub fn lt(self, operand: impl ToString) -> Self {
        self.binary("lt", operand)
    }

    /// 小于等于
    #[inline]
    pub fn lte(self, operand: impl ToString) -> Self {
        self.binary("lte", operand)
    }

    /// 大于
    #[inline]
    pub fn gt(self, operand: impl ToString) -> Self {
        self.binary("gt", operand)
    }

    /// 大于等于
    #[inline]
    pub fn gte(self, operand: impl ToString) -> Self {
        self.binary("gte", operand)
    }

    /// 包含于
    #[inline]
    pub fn is_in(self, operand: impl ToString) -> Self {
        self.binary("in", operand)
    }

    /// 不包含于
    #[inline]
    pub fn not_in(self, operand: impl ToString) -> Self {
        self.binary("nin", operand)
    }

    /// 逻辑与，连接下一个比较子句
    #[inline]
    pub fn and(mut self, operand: impl AsRef<str>) -> Self {
        self.tokens.push("and".to_owned());
        self.push_operand(operand.as_ref());
        self
    }

    /// 逻辑或，连接下一个比较子句
    #[inline]
    pub fn or(mut self, operand: impl AsRef<str>) -> Self {
        self.tokens.push("or".to_owned());
        self.push_operand(operand.as_ref());
        self
    }

    /// 加
    #[inline]
    pub fn add(self, operand: impl ToString) -> Self {
        self.binary("add", operand)
    }

    /// 减
    #[inline]
    pub fn sub(self, operand: impl ToString) -> Self {
        self.binary("sub", operand)
    }

    /// 乘
    #[inline]
    pub fn mul(self, operand: impl ToString) -> Self {
        self.binary("mul", operand)
    }

    /// 除
    #[inline]
    pub fn div(self, operand: impl ToString) -> Self {
        self.binary("div", operand)
    }

    /// 幂
    #[inline]
    pub fn pow(self, operand: impl ToString) -> Self {
        self.binary("pow", operand)
    }

    /// 编译为规范条件字符串
    #[inline]
    pub fn build(&self) -> String {
        self.tokens.join("_")
    }
}

impl From<&str> for Expression {
    #[inline]
    fn from(condition: &str) -> Self {
        Self::raw(condition)
    }
}

impl From<String> for Expression {
    #[inline]
    fn from(condition: String) -> Self {
        Self::raw(condition)
    }
}
