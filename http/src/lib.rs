#![cfg_attr(feature = "docs", feature(doc_cfg))]
#![deny(
    absolute_paths_not_starting_with_crate,
    anonymous_parameters,
    explicit_outlives_requirements,
    keyword_idents,
    macro_use_extern_crate,
    meta_variable_misuse,
    missing_docs,
    non_ascii_idents,
    trivial_casts,
    trivial_numeric_casts,
    unreachable_pub,
    unsafe_code,
    unstable_features,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications
)]

//! # cloudinary-http
//!
//! ## Cloudinary HTTP 接口库
//!
//! 定义 SDK 与 HTTP 传输层之间的抽象接口：
//! 请求（方法、URL、参数表、文件分片、HTTP 头）、
//! 响应（状态码、HTTP 头、响应体）与 [`ApiCaller`] 特质。
//! 实现该特质即可用任意 HTTP 客户端承载所有 SDK 发送的 API 调用。

mod request;
mod response;

/// 将所有 Trait 全部重新导出，方便统一导入
pub mod prelude {
    pub use super::ApiCaller;
}

pub use http::{header, method::Method, status::StatusCode};
pub use request::{FieldValue, FilePart, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder};

use serde::de::DeserializeOwned;
use std::{any::Any, fmt::Debug};
use thiserror::Error;

#[cfg(feature = "async")]
use futures::future::BoxFuture;

/// API 调用错误
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ApiError {
    /// 传输层错误
    #[error("Transport error: {0}")]
    Transport(#[from] Box<dyn std::error::Error + Send + Sync>),
    /// 服务端返回非成功状态码
    #[error("API returned status code {status_code}: {message}")]
    Status {
        /// 响应状态码
        status_code: u16,
        /// 服务端错误消息
        message: String,
    },
    /// 响应体不是预期的 JSON 结构
    #[error("Failed to parse response body: {0}")]
    Json(#[from] serde_json::Error),
    /// 本地 IO 错误
    #[error("Local IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// API 调用结果
pub type ApiResult<T> = Result<T, ApiError>;

/// API 请求处理函数
///
/// 实现该接口，即可处理所有 SDK 发送的 API 调用
pub trait ApiCaller: Any + Debug + Send + Sync {
    /// 同步发送 API 请求
    fn call(&self, request: &Request) -> ApiResult<Response>;

    /// 异步发送 API 请求
    #[inline]
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    fn async_call<'a>(&'a self, request: &'a Request) -> BoxFuture<'a, ApiResult<Response>> {
        Box::pin(async move { self.call(request) })
    }

    /// 转换为 API 请求处理函数的特质对象
    fn as_api_caller(&self) -> &dyn ApiCaller;

    /// 转换为 `Any` 的特质对象
    fn as_any(&self) -> &dyn Any;
}

/// 从 API 响应中解析出类型化的调用结果
///
/// 非成功状态码被转换为 [`ApiError::Status`]，
/// 错误消息从服务端的 JSON 错误信封中提取
pub fn parse_result<T: DeserializeOwned>(response: &Response) -> ApiResult<T> {
    if !response.is_success() {
        return Err(ApiError::Status {
            status_code: response.status_code().as_u16(),
            message: response.error_message().unwrap_or_default(),
        });
    }
    Ok(serde_json::from_slice(response.body())?)
}
