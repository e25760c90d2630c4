use super::{FileDescription, UploadParams, UploadResponse, UploadSource};
use cloudinary_credential::{Credential, CredentialProvider};
use cloudinary_http::{
    header::{HeaderMap, HeaderName, HeaderValue},
    parse_result, ApiCaller, ApiError, FieldValue, FilePart, Method, Request, Response,
};
use cloudinary_transformation::TransformationError;
use log::{debug, info, warn};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use std::{
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};
use thiserror::Error;

/// 默认的上传 API 地址
pub const DEFAULT_UPLOAD_PREFIX: &str = "https://api.cloudinary.com";
/// 上传 API 版本号
pub const API_VERSION: &str = "v1_1";
/// 默认的分片大小，单位为字节
pub const DEFAULT_CHUNK_SIZE: u64 = 20 * 1024 * 1024;

const UNIQUE_UPLOAD_ID_HEADER: &str = "x-unique-upload-id";
const CONTENT_RANGE_HEADER: &str = "content-range";

/// 上传错误
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UploadError {
    /// API 调用失败或服务端返回错误
    #[error(transparent)]
    Api(#[from] ApiError),
    /// 上传参数中的变换序列化失败
    #[error(transparent)]
    Transformation(#[from] TransformationError),
    /// 本地 IO 错误
    #[error("Local IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 上传结果
pub type UploadResult<T> = Result<T, UploadError>;

/// 上传管理器
///
/// 负责上传参数的签名定稿（`timestamp` / `signature` / `api_key`）、
/// 单次调用上传与大文件的分片上传。
/// 分片按严格的顺序依次发送，任何一个分片失败都会立即中止，
/// 不会继续发送剩余分片，也不做任何重试。
#[derive(Debug)]
pub struct UploadManager {
    credential: Box<dyn CredentialProvider>,
    caller: Box<dyn ApiCaller>,
    upload_prefix: String,
    chunk_size: u64,
}

impl UploadManager {
    /// 创建上传管理器构建器
    #[inline]
    pub fn builder(
        credential: impl CredentialProvider + 'static,
        caller: impl ApiCaller + 'static,
    ) -> UploadManagerBuilder {
        UploadManagerBuilder::new(credential, caller)
    }

    /// 获取分片大小
    #[inline]
    pub fn chunk_size(&self) -> u64 {
        self.chunk_size
    }

    /// 单次调用上传
    ///
    /// 本地来源的全部内容随一次请求发出，
    /// 远端 URL 来源编码为 `file` 表单字段，由服务端抓取
    pub fn upload(
        &self,
        source: impl Into<UploadSource>,
        params: UploadParams,
    ) -> UploadResult<UploadResponse> {
        let request = self.single_call_request(source.into(), params)?;
        let response = self.caller.call(&request)?;
        Ok(parse_result(&response)?)
    }

    /// 分片上传
    ///
    /// 不超过分片大小的文件退化为单次调用上传。
    /// 否则生成一次性的上传会话标识，按字节范围顺序发送分片，
    /// 每个分片携带 `Content-Range` 与会话标识头。
    /// 任何分片收到非成功状态码都立即返回错误
    pub fn upload_large(
        &self,
        mut file: FileDescription,
        params: UploadParams,
    ) -> UploadResult<UploadResponse> {
        if file.total() <= self.chunk_size {
            return self.upload(file, params);
        }
        let (url, fields) = self.finalize(params)?;
        let upload_id = unique_upload_id();
        info!(
            "chunked upload of {} ({} bytes, upload id {})",
            file.file_name(),
            file.total(),
            upload_id
        );

        let mut last_response = None;
        while !file.is_eof() {
            let request = self.chunk_request(&url, &fields, &mut file, &upload_id)?;
            let response = self.caller.call(&request)?;
            last_response = Some(self.finish_chunk(&mut file, request, response)?);
        }
        self.parse_last_response(last_response)
    }

    /// 异步单次调用上传
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub async fn async_upload(
        &self,
        source: impl Into<UploadSource>,
        params: UploadParams,
    ) -> UploadResult<UploadResponse> {
        let request = self.single_call_request(source.into(), params)?;
        let response = self.caller.async_call(&request).await?;
        Ok(parse_result(&response)?)
    }

    /// 异步分片上传
    ///
    /// 分片边界与请求头和同步版本完全一致，
    /// 每个分片在前一个分片完成后才开始发送
    #[cfg(feature = "async")]
    #[cfg_attr(feature = "docs", doc(cfg(feature = "async")))]
    pub async fn async_upload_large(
        &self,
        mut file: FileDescription,
        params: UploadParams,
    ) -> UploadResult<UploadResponse> {
        if file.total() <= self.chunk_size {
            return self.async_upload(file, params).await;
        }
        let (url, fields) = self.finalize(params)?;
        let upload_id = unique_upload_id();
        info!(
            "chunked upload of {} ({} bytes, upload id {})",
            file.file_name(),
            file.total(),
            upload_id
        );

        let mut last_response = None;
        while !file.is_eof() {
            let request = self.chunk_request(&url, &fields, &mut file, &upload_id)?;
            let response = self.caller.async_call(&request).await?;
            last_response = Some(self.finish_chunk(&mut file, request, response)?);
        }
        self.parse_last_response(last_response)
    }

    fn single_call_request(
        &self,
        source: UploadSource,
        params: UploadParams,
    ) -> UploadResult<Request> {
        let (url, mut fields) = self.finalize(params)?;
        let builder = match source {
            UploadSource::Local(mut file) => {
                let data = file.read_chunk(file.total())?;
                Request::builder(Method::POST, url)
                    .file(FilePart::new(file.file_name(), data))
            }
            UploadSource::Remote(remote_url) => {
                fields.insert("file".to_owned(), remote_url.into());
                Request::builder(Method::POST, url)
            }
        };
        Ok(builder.params(fields).build())
    }

    fn chunk_request(
        &self,
        url: &str,
        fields: &BTreeMap<String, FieldValue>,
        file: &mut FileDescription,
        upload_id: &str,
    ) -> UploadResult<Request> {
        let start = file.bytes_sent();
        let data = file.read_chunk(self.chunk_size)?;
        let end = start + data.len() as u64 - 1;
        let content_range = format!("bytes {}-{}/{}", start, end, file.total());
        debug!("sending chunk {content_range}");

        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(CONTENT_RANGE_HEADER),
            HeaderValue::from_str(&content_range).expect("Content-Range is always ASCII"),
        );
        headers.insert(
            HeaderName::from_static(UNIQUE_UPLOAD_ID_HEADER),
            HeaderValue::from_str(upload_id).expect("upload id is always ASCII"),
        );
        Ok(Request::builder(Method::POST, url)
            .params(fields.to_owned())
            .file(FilePart::new(file.file_name(), data))
            .headers(headers)
            .build())
    }

    fn finish_chunk(
        &self,
        file: &mut FileDescription,
        request: Request,
        response: Response,
    ) -> UploadResult<Response> {
        if !response.is_success() {
            warn!(
                "chunked upload of {} aborted with status code {}",
                file.file_name(),
                response.status_code()
            );
            return Err(ApiError::Status {
                status_code: response.status_code().as_u16(),
                message: response.error_message().unwrap_or_default(),
            }
            .into());
        }
        let sent = request
            .file()
            .map(|part| part.len() as u64)
            .unwrap_or_default();
        file.advance(sent);
        Ok(response)
    }

    fn parse_last_response(
        &self,
        last_response: Option<Response>,
    ) -> UploadResult<UploadResponse> {
        let response = last_response.ok_or_else(|| {
            UploadError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "no chunk was sent",
            ))
        })?;
        Ok(parse_result(&response)?)
    }

    /// 定稿上传参数并返回上传 URL 与完整的表单字段表
    ///
    /// 在参数表上计算内容签名后追加
    /// `timestamp` / `signature` / `api_key` 字段
    fn finalize(
        &self,
        params: UploadParams,
    ) -> UploadResult<(String, BTreeMap<String, FieldValue>)> {
        let credential = self.credential.get()?;
        let url = self.upload_url(&credential, params.resource_type());
        let mut fields = params.into_fields()?;
        fields.insert("timestamp".to_owned(), timestamp().to_string().into());
        let signature = credential.sign_parameters(
            fields
                .iter()
                .map(|(key, value)| (key.to_owned(), value.flatten().into_owned())),
        );
        fields.insert("signature".to_owned(), signature.into());
        fields.insert("api_key".to_owned(), credential.api_key().to_owned().into());
        Ok((url, fields))
    }

    fn upload_url(&self, credential: &Credential, resource_type: &str) -> String {
        format!(
            "{}/{}/{}/{}/upload",
            self.upload_prefix,
            API_VERSION,
            credential.cloud_name(),
            resource_type
        )
    }
}

fn timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}

fn unique_upload_id() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect()
}

/// 上传管理器构建器
#[derive(Debug)]
pub struct UploadManagerBuilder {
    inner: UploadManager,
}

impl UploadManagerBuilder {
    /// 根据认证信息提供者与 API 请求处理函数创建上传管理器构建器
    pub fn new(
        credential: impl CredentialProvider + 'static,
        caller: impl ApiCaller + 'static,
    ) -> Self {
        Self {
            inner: UploadManager {
                credential: Box::new(credential),
                caller: Box::new(caller),
                upload_prefix: DEFAULT_UPLOAD_PREFIX.to_owned(),
                chunk_size: DEFAULT_CHUNK_SIZE,
            },
        }
    }

    /// 设置上传 API 地址
    #[inline]
    pub fn upload_prefix(mut self, upload_prefix: impl Into<String>) -> Self {
        self.inner.upload_prefix = upload_prefix.into();
        self
    }

    /// 设置分片大小
    #[inline]
    pub fn chunk_size(mut self, chunk_size: u64) -> Self {
        self.inner.chunk_size = chunk_size;
        self
    }

    /// 构建上传管理器
    #[inline]
    pub fn build(self) -> UploadManager {
        self.inner
    }
}
