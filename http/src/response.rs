use http::{header::HeaderMap, status::StatusCode};
use serde::Deserialize;

/// API 响应
///
/// 响应体总是被完整读入内存，
/// 该接口面向的请求与响应都是小尺寸的 JSON 报文
#[derive(Clone, Debug)]
pub struct Response {
    status_code: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl Response {
    /// 创建 API 响应构建器
    #[inline]
    pub fn builder(status_code: StatusCode) -> ResponseBuilder {
        ResponseBuilder::new(status_code)
    }

    /// 获取响应状态码
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// 获取响应 HTTP Headers
    #[inline]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// 获取响应体
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// 响应状态码是否表示成功
    #[inline]
    pub fn is_success(&self) -> bool {
        self.status_code.is_success()
    }

    /// 从服务端的 JSON 错误信封中提取错误消息
    ///
    /// 信封格式为 `{"error": {"message": …}}`，
    /// 响应体不符合该格式时返回 `None`
    pub fn error_message(&self) -> Option<String> {
        serde_json::from_slice::<ErrorEnvelope>(&self.body)
            .ok()
            .map(|envelope| envelope.error.message)
    }
}

/// API 响应构建器
#[derive(Clone, Debug)]
pub struct ResponseBuilder {
    inner: Response,
}

impl ResponseBuilder {
    /// 根据响应状态码创建 API 响应构建器
    pub fn new(status_code: StatusCode) -> Self {
        Self {
            inner: Response {
                status_code,
                headers: Default::default(),
                body: Default::default(),
            },
        }
    }

    /// 设置响应 HTTP Headers
    #[inline]
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        self.inner.headers = headers;
        self
    }

    /// 设置响应体
    #[inline]
    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.inner.body = body.into();
        self
    }

    /// 构建 API 响应
    #[inline]
    pub fn build(self) -> Response {
        self.inner
    }
}
