use http::{header::HeaderMap, method::Method};
use std::{borrow::Cow, collections::BTreeMap, fmt};

/// 表单字段值
///
/// 列表值在编码为表单字段时以 `,` 连接
#[derive(Clone, Eq, PartialEq, Debug)]
#[non_exhaustive]
pub enum FieldValue {
    /// 文本值
    Text(String),
    /// 列表值
    List(Vec<String>),
}

impl FieldValue {
    /// 编码为单个表单字段值
    pub fn flatten(&self) -> Cow<'_, str> {
        match self {
            Self::Text(text) => Cow::Borrowed(text.as_str()),
            Self::List(items) => Cow::Owned(items.join(",")),
        }
    }
}

impl From<&str> for FieldValue {
    #[inline]
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<String> for FieldValue {
    #[inline]
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<String>> for FieldValue {
    #[inline]
    fn from(items: Vec<String>) -> Self {
        Self::List(items)
    }
}

/// 上传请求携带的文件分片
///
/// 持有即将随当前请求发出的那部分文件内容
#[derive(Clone, Eq, PartialEq)]
pub struct FilePart {
    file_name: String,
    data: Vec<u8>,
}

impl FilePart {
    /// 创建文件分片
    #[inline]
    pub fn new(file_name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            data,
        }
    }

    /// 获取文件名
    #[inline]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// 获取文件内容
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// 获取文件内容长度
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// 文件内容是否为空
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for FilePart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilePart")
            .field("file_name", &self.file_name)
            .field("len", &self.data.len())
            .finish()
    }
}

/// API 请求
///
/// 不绑定任何具体的 HTTP 客户端实现，
/// 由 [`crate::ApiCaller`] 的实现负责编码为多部分表单或 JSON 请求体
#[derive(Clone, Debug, Default)]
pub struct Request {
    method: Method,
    url: String,
    params: BTreeMap<String, FieldValue>,
    file: Option<FilePart>,
    headers: HeaderMap,
}

impl Request {
    /// 创建 API 请求构建器
    #[inline]
    pub fn builder(method: Method, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(method, url)
    }

    /// 获取请求方法
    #[inline]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// 获取请求 URL
    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// 获取请求参数
    #[inline]
    pub fn params(&self) -> &BTreeMap<String, FieldValue> {
        &self.params
    }

    /// 获取随请求发送的文件分片
    #[inline]
    pub fn file(&self) -> Option<&FilePart> {
        self.file.as_ref()
    }

    /// 获取请求 HTTP Headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

/// API 请求构建器
#[derive(Clone, Debug)]
pub struct RequestBuilder {
    inner: Request,
}

impl RequestBuilder {
    /// 根据请求方法与 URL 创建 API 请求构建器
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            inner: Request {
                method,
                url: url.into(),
                params: Default::default(),
                file: None,
                headers: Default::default(),
            },
        }
    }

    /// 添加请求参数
    #[inline]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.inner.params.insert(key.into(), value.into());
        self
    }

    /// 批量添加请求参数
    pub fn params(
        mut self,
        params: impl IntoIterator<Item = (String, FieldValue)>,
    ) -> Self {
        self.inner.params.extend(params);
        self
    }

    /// 设置随请求发送的文件分片
    #[inline]
    pub fn file(mut self, file: FilePart) -> Self {
        self.inner.file = Some(file);
        self
    }

    /// 添加请求 HTTP Header
    #[inline]
    pub fn header(
        mut self,
        name: http::header::HeaderName,
        value: http::header::HeaderValue,
    ) -> Self {
        self.inner.headers.insert(name, value);
        self
    }

    /// 设置请求 HTTP Headers
    #[inline]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.inner.headers = headers;
        self
    }

    /// 构建 API 请求
    #[inline]
    pub fn build(self) -> Request {
        self.inner
    }
}
