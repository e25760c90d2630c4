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

//! # cloudinary-auth-token
//!
//! ## Cloudinary 访问令牌库
//!
//! 负责生成基于 HMAC-SHA256 的访问令牌（`__cld_token__`），
//! 以时间窗口与 ACL 约束访问私有媒体资源的下载 URL。
//! 令牌既可以按 ACL 授权，也可以按具体 URL 路径授权。

use hmac::{Hmac, Mac};
use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use sha2::Sha256;
use std::{
    borrow::Cow,
    sync::RwLock,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use thiserror::Error;

/// 默认的令牌名称
pub const AUTH_TOKEN_NAME: &str = "__cld_token__";

/// 访问令牌
///
/// 一旦构建则不可修改，可以安全地在多个 URL 之间复用。
/// [`AuthToken::null()`] 返回空令牌哨兵，
/// 配置了全局默认令牌时可以用它对单个 URL 关闭令牌签名。
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct AuthToken {
    token_name: Cow<'static, str>,
    key: Cow<'static, str>,
    start_time: Option<u64>,
    expiration: Option<u64>,
    duration: Option<u64>,
    ip: Option<String>,
    acl: Option<String>,
}

/// 生成访问令牌错误
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum GenerateError {
    /// 过期时间与有效期均未设置
    #[error("Must provide either expiration or duration")]
    MissingExpiration,
    /// ACL 与 URL 均未提供
    #[error("AuthToken must contain either an acl or a url property")]
    MissingAclAndUrl,
    /// 令牌密钥不是合法的十六进制字符串
    #[error("Invalid auth token key: {0}")]
    InvalidKey(#[from] hex::FromHexError),
    /// 空令牌哨兵不能用于生成
    #[error("The null auth token cannot generate")]
    NullToken,
}

/// 生成访问令牌结果
pub type GenerateResult<T> = Result<T, GenerateError>;

impl AuthToken {
    /// 根据十六进制编码的密钥创建令牌构建器
    #[inline]
    pub fn builder(key: impl Into<Cow<'static, str>>) -> AuthTokenBuilder {
        AuthTokenBuilder::new(key)
    }

    /// 返回空令牌哨兵
    #[inline]
    pub fn null() -> Self {
        Self {
            token_name: Cow::Borrowed(AUTH_TOKEN_NAME),
            key: Cow::Borrowed(""),
            start_time: None,
            expiration: None,
            duration: None,
            ip: None,
            acl: None,
        }
    }

    /// 是否为空令牌哨兵
    #[inline]
    pub fn is_null(&self) -> bool {
        self.key.is_empty()
    }

    /// 获取令牌名称
    #[inline]
    pub fn token_name(&self) -> &str {
        self.token_name.as_ref()
    }

    /// 获取 ACL 约束
    #[inline]
    pub fn acl(&self) -> Option<&str> {
        self.acl.as_deref()
    }

    /// 按 ACL 生成访问令牌
    ///
    /// 等价于 `generate_for_url(None)`，要求令牌设置了 ACL
    #[inline]
    pub fn generate(&self) -> GenerateResult<String> {
        self.generate_for_url(None)
    }

    /// 生成访问令牌，可以针对具体的 URL 路径授权
    ///
    /// 如果令牌设置了 ACL，URL 路径不参与 HMAC 计算；
    /// 否则 URL 路径经过转义后以 `url=` 片段参与计算。
    /// 过期时间未设置时根据起始时间（或当前时间）与有效期推算，
    /// 两者均未设置则返回 [`GenerateError::MissingExpiration`]
    pub fn generate_for_url(&self, url: Option<&str>) -> GenerateResult<String> {
        if self.is_null() {
            return Err(GenerateError::NullToken);
        }
        if self.acl.is_none() && url.is_none() {
            return Err(GenerateError::MissingAclAndUrl);
        }
        let expiration = match self.expiration {
            Some(expiration) => expiration,
            None => match self.duration {
                Some(duration) => self.start_time.unwrap_or_else(now) + duration,
                None => return Err(GenerateError::MissingExpiration),
            },
        };
        let key = hex::decode(self.key.as_bytes())?;

        let mut parts = Vec::with_capacity(5);
        if let Some(ip) = self.ip.as_deref() {
            parts.push(format!("ip={ip}"));
        }
        if let Some(start_time) = self.start_time {
            parts.push(format!("st={start_time}"));
        }
        parts.push(format!("exp={expiration}"));
        if let Some(acl) = self.acl.as_deref() {
            parts.push(format!("acl={}", escape_to_lower(acl)));
        }

        let mut to_sign = parts.clone();
        if self.acl.is_none() {
            if let Some(url) = url {
                to_sign.push(format!("url={}", escape_to_lower(url)));
            }
        }

        let mut hmac = Hmac::<Sha256>::new_from_slice(&key).unwrap();
        hmac.update(to_sign.join("~").as_bytes());
        parts.push(format!("hmac={}", hex::encode(hmac.finalize().into_bytes())));

        Ok(format!("{}={}", self.token_name, parts.join("~")))
    }
}

/// 访问令牌构建器
#[derive(Clone, Debug)]
pub struct AuthTokenBuilder {
    inner: AuthToken,
}

impl AuthTokenBuilder {
    /// 根据十六进制编码的密钥创建令牌构建器
    pub fn new(key: impl Into<Cow<'static, str>>) -> Self {
        Self {
            inner: AuthToken {
                token_name: Cow::Borrowed(AUTH_TOKEN_NAME),
                key: key.into(),
                start_time: None,
                expiration: None,
                duration: None,
                ip: None,
                acl: None,
            },
        }
    }

    /// 设置令牌名称
    #[inline]
    pub fn token_name(mut self, token_name: impl Into<Cow<'static, str>>) -> Self {
        self.inner.token_name = token_name.into();
        self
    }

    /// 设置起始时间（Unix 时间戳，单位为秒）
    #[inline]
    pub fn start_time(mut self, start_time: u64) -> Self {
        self.inner.start_time = Some(start_time);
        self
    }

    /// 设置过期时间（Unix 时间戳，单位为秒）
    #[inline]
    pub fn expiration(mut self, expiration: u64) -> Self {
        self.inner.expiration = Some(expiration);
        self
    }

    /// 设置有效期，过期时间将根据起始时间（或当前时间）推算
    #[inline]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.inner.duration = Some(duration.as_secs());
        self
    }

    /// 设置允许访问的 IP 地址
    #[inline]
    pub fn ip(mut self, ip: impl Into<String>) -> Self {
        self.inner.ip = Some(ip.into());
        self
    }

    /// 设置 ACL 约束
    #[inline]
    pub fn acl(mut self, acl: impl Into<String>) -> Self {
        self.inner.acl = Some(acl.into());
        self
    }

    /// 构建访问令牌
    #[inline]
    pub fn build(self) -> AuthToken {
        self.inner
    }
}

static GLOBAL_AUTH_TOKEN: Lazy<RwLock<Option<AuthToken>>> = Lazy::new(|| RwLock::new(None));

impl AuthToken {
    /// 配置全局默认令牌
    ///
    /// 全局默认令牌被所有未显式设置令牌的签名 URL 使用，
    /// 进程启动时配置一次即可
    pub fn setup_default(token: AuthToken) {
        let mut global_token = GLOBAL_AUTH_TOKEN.write().unwrap();
        *global_token = Some(token);
    }

    /// 清空全局默认令牌
    pub fn clear_default() {
        let mut global_token = GLOBAL_AUTH_TOKEN.write().unwrap();
        *global_token = None;
    }

    /// 获取全局默认令牌
    pub fn default_token() -> Option<AuthToken> {
        GLOBAL_AUTH_TOKEN.read().unwrap().clone()
    }
}

// encodeURIComponent 保留的非字母数字字符
const ESCAPE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// 转义 ACL 与 URL 中的特殊字符
///
/// 仅十六进制转义序列被转换为小写，字面文本大小写保持不变
fn escape_to_lower(value: &str) -> String {
    let escaped = utf8_percent_encode(value, ESCAPE_SET).to_string();
    let mut lowered = String::with_capacity(escaped.len());
    let mut chars = escaped.chars();
    while let Some(c) = chars.next() {
        lowered.push(c);
        if c == '%' {
            for _ in 0..2 {
                if let Some(hex_char) = chars.next() {
                    lowered.push(hex_char.to_ascii_lowercase());
                }
            }
        }
    }
    lowered
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "00112233FF99";

    #[test]
    fn test_generate_with_acl_and_duration() {
        let token = AuthToken::builder(KEY)
            .start_time(1_111_111_111)
            .acl("/image/*")
            .duration(Duration::from_secs(300))
            .build();
        assert_eq!(
            token.generate().unwrap(),
            "__cld_token__=st=1111111111~exp=1111111411~acl=%2fimage%2f*~hmac=1751370bcc6cfe9e03f30dd1a9722ba0f2cdca283fa3e6df3342a00a7528cc51"
        );
    }

    #[test]
    fn test_generate_for_url() {
        let token = AuthToken::builder(KEY)
            .start_time(1_111_111_111)
            .duration(Duration::from_secs(300))
            .build();
        assert_eq!(
            token.generate_for_url(Some("/image/upload/v1/sample.jpg")).unwrap(),
            "__cld_token__=st=1111111111~exp=1111111411~hmac=78325a1a33797088d58754c1687261ca62c6136359fdbea3e16990656f365f52"
        );
    }

    #[test]
    fn test_generate_with_ip() {
        let token = AuthToken::builder(KEY)
            .ip("127.0.0.1")
            .start_time(1_111_111_111)
            .expiration(1_111_111_411)
            .acl("/image/*")
            .build();
        assert_eq!(
            token.generate().unwrap(),
            "__cld_token__=ip=127.0.0.1~st=1111111111~exp=1111111411~acl=%2fimage%2f*~hmac=600ec21e6f304f6e661160733ecd0a127369fe7170ede377ae696285405269b6"
        );
    }

    #[test]
    fn test_acl_takes_precedence_over_url() {
        let token = AuthToken::builder(KEY)
            .start_time(1_111_111_111)
            .duration(Duration::from_secs(300))
            .acl("/image/*")
            .build();
        // URL 不参与计算，结果与纯 ACL 令牌一致
        assert_eq!(
            token.generate_for_url(Some("/image/upload/v1/sample.jpg")).unwrap(),
            token.generate().unwrap(),
        );
    }

    #[test]
    fn test_hmac_is_64_hex_chars() {
        let token = AuthToken::builder(KEY)
            .acl("*")
            .duration(Duration::from_secs(300))
            .build();
        let generated = token.generate().unwrap();
        let hmac = generated.rsplit("hmac=").next().unwrap();
        assert_eq!(hmac.len(), 64);
        assert!(hmac.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_missing_expiration_and_duration() {
        let token = AuthToken::builder(KEY).acl("/image/*").build();
        assert!(matches!(token.generate(), Err(GenerateError::MissingExpiration)));
    }

    #[test]
    fn test_missing_acl_and_url() {
        let token = AuthToken::builder(KEY).duration(Duration::from_secs(300)).build();
        assert!(matches!(token.generate(), Err(GenerateError::MissingAclAndUrl)));
    }

    #[test]
    fn test_null_token() {
        let token = AuthToken::null();
        assert!(token.is_null());
        assert!(matches!(token.generate(), Err(GenerateError::NullToken)));
    }

    #[test]
    fn test_escape_to_lower_keeps_literal_case() {
        assert_eq!(escape_to_lower("/iMage/*"), "%2fiMage%2f*");
        assert_eq!(escape_to_lower("a b"), "a%20b");
    }
}
