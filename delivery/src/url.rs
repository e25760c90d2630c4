use cloudinary_auth_token::{AuthToken, GenerateError};
use cloudinary_credential::Credential;
use cloudinary_transformation::{Transformation, TransformationError};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use thiserror::Error;

const SHARED_DOMAIN: &str = "res.cloudinary.com";

// 源路径中无需转义的字符
const SOURCE_ESCAPE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'/')
    .remove(b':');

/// 分发 URL 构建错误
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UrlError {
    /// 源路径为空
    #[error("Must supply a source")]
    EmptySource,
    /// 当前资源类型与分发方式的组合不支持 URL 后缀
    #[error("URL suffix is only supported for image/upload, image/private, image/authenticated, video/upload and raw/upload")]
    SuffixNotSupported,
    /// URL 后缀包含非法字符
    #[error("Suffix should not include '.' or '/'")]
    InvalidSuffix,
    /// 当前资源类型与分发方式的组合不支持根路径
    #[error("Root path is only supported for image/upload")]
    RootPathNotSupported,
    /// 变换序列化失败
    #[error(transparent)]
    Transformation(#[from] TransformationError),
    /// 访问令牌生成失败
    #[error(transparent)]
    AuthToken(#[from] GenerateError),
}

/// 分发 URL 构建结果
pub type UrlResult<T> = Result<T, UrlError>;

/// 分发 URL 生成器
///
/// 持有一个逻辑 URL 的全部状态，
/// 通过 `Clone` 从共享的基础配置派生出多个变体。
/// [`DeliveryUrl::generate`] 可以对不同的源路径反复调用，
/// 每次调用都是确定性的。
///
/// ### 代码示例
///
/// ```
/// use cloudinary_credential::Credential;
/// use cloudinary_delivery::DeliveryUrl;
///
/// let credential = Credential::new("demo", "key", "secret");
/// let url = DeliveryUrl::builder(credential).build();
/// assert_eq!(
///     url.generate("sample.jpg").unwrap(),
///     "https://res.cloudinary.com/demo/image/upload/sample.jpg"
/// );
/// ```
#[derive(Clone, Debug)]
pub struct DeliveryUrl {
    credential: Credential,
    resource_type: String,
    action: String,
    version: Option<u64>,
    force_version: bool,
    secure: bool,
    private_cdn: bool,
    cdn_subdomain: bool,
    shorten: bool,
    use_root_path: bool,
    custom_segments: Vec<String>,
    suffix: Option<String>,
    sign_url: bool,
    auth_token: Option<AuthToken>,
    transformation: Option<Transformation>,
    format: Option<String>,
}

impl DeliveryUrl {
    /// 根据认证信息创建分发 URL 生成器的构建器
    #[inline]
    pub fn builder(credential: Credential) -> DeliveryUrlBuilder {
        DeliveryUrlBuilder::new(credential)
    }

    /// 生成给定源路径的分发 URL
    ///
    /// 这里是所有 URL 规则的唯一校验边界，
    /// 不兼容的标志组合在此返回错误而不产出 URL
    pub fn generate(&self, source: &str) -> UrlResult<String> {
        if source.is_empty() {
            return Err(UrlError::EmptySource);
        }
        let absolute = is_absolute(source);
        if absolute && (self.action == "upload" || self.action == "asset") {
            return Ok(source.to_owned());
        }

        let (resource_type, action) = self.rewrite_resource_type()?;

        let mut encoded_source = utf8_percent_encode(source, SOURCE_ESCAPE_SET).to_string();
        if let Some(suffix) = self.suffix.as_deref() {
            encoded_source.push('/');
            encoded_source.push_str(suffix);
        }
        if let Some(format) = self.format.as_deref() {
            encoded_source.push('.');
            encoded_source.push_str(format);
        }

        let version = self.version.or_else(|| {
            (self.force_version
                && source.contains('/')
                && !starts_with_version(source)
                && !absolute)
                .then_some(1)
        });

        let transformation = self
            .transformation
            .as_ref()
            .map(Transformation::generate)
            .transpose()?
            .unwrap_or_default();

        let auth_token = self.effective_auth_token();
        let signature = if self.sign_url && auth_token.is_none() {
            let to_sign = join_segments([transformation.as_str(), encoded_source.as_str()]);
            self.credential.sign_uri_part(&to_sign)
        } else {
            String::new()
        };

        let version = version.map(|version| format!("v{version}")).unwrap_or_default();
        let cloud_name = if self.private_cdn {
            ""
        } else {
            self.credential.cloud_name().as_str()
        };
        let custom_segments = join_segments(self.custom_segments.iter().map(String::as_str));
        let path = join_segments([
            cloud_name,
            resource_type.as_str(),
            action.as_str(),
            custom_segments.as_str(),
            signature.as_str(),
            transformation.as_str(),
            version.as_str(),
            encoded_source.as_str(),
        ]);

        let scheme = if self.secure { "https" } else { "http" };
        let mut url = format!("{}://{}/{}", scheme, self.host(source), path);

        if let Some(token) = auth_token {
            let token_path = format!("/{path}");
            url.push('?');
            url.push_str(&token.generate_for_url(Some(&token_path))?);
        }
        Ok(url)
    }

    fn rewrite_resource_type(&self) -> UrlResult<(String, String)> {
        let mut resource_type = self.resource_type.to_owned();
        let mut action = self.action.to_owned();

        if let Some(suffix) = self.suffix.as_deref() {
            if suffix.contains('.') || suffix.contains('/') {
                return Err(UrlError::InvalidSuffix);
            }
            resource_type = match (resource_type.as_str(), action.as_str()) {
                ("image", "upload") => "images",
                ("image", "private") => "private_images",
                ("image", "authenticated") => "authenticated_images",
                ("video", "upload") => "videos",
                ("raw", "upload") => "files",
                _ => return Err(UrlError::SuffixNotSupported),
            }
            .to_owned();
            action.clear();
        }

        if self.use_root_path {
            match (resource_type.as_str(), action.as_str()) {
                ("image", "upload") | ("images", "") => {
                    resource_type.clear();
                    action.clear();
                }
                _ => return Err(UrlError::RootPathNotSupported),
            }
        }

        if self.shorten && resource_type == "image" && action == "upload" {
            resource_type = "iu".to_owned();
            action.clear();
        }
        Ok((resource_type, action))
    }

    fn host(&self, source: &str) -> String {
        let subdomain = if self.cdn_subdomain {
            format!("-{}", shard(source))
        } else {
            String::new()
        };
        if self.private_cdn {
            format!(
                "{}-res{}.cloudinary.com",
                self.credential.cloud_name(),
                subdomain
            )
        } else if subdomain.is_empty() {
            SHARED_DOMAIN.to_owned()
        } else {
            format!("res{subdomain}.cloudinary.com")
        }
    }

    fn effective_auth_token(&self) -> Option<AuthToken> {
        if !self.sign_url {
            return None;
        }
        self.auth_token
            .to_owned()
            .or_else(AuthToken::default_token)
            .filter(|token| !token.is_null())
    }
}

/// 计算源路径对应的 CDN 子域名分片序号
///
/// 基于 CRC32 计算，对固定的源路径永远返回相同的序号，
/// 取值范围为 `[1, 5]`
pub fn shard(source: &str) -> u32 {
    crc32fast::hash(source.as_bytes()) % 5 + 1
}

fn is_absolute(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

// 首个路径段是否为 `v<数字>` 形式的版本号
fn starts_with_version(source: &str) -> bool {
    source
        .split('/')
        .next()
        .and_then(|segment| segment.strip_prefix('v'))
        .map_or(false, |digits| {
            !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
        })
}

fn join_segments<'a>(segments: impl IntoIterator<Item = &'a str>) -> String {
    segments
        .into_iter()
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

/// 分发 URL 生成器的构建器
#[derive(Clone, Debug)]
pub struct DeliveryUrlBuilder {
    inner: DeliveryUrl,
}

impl DeliveryUrlBuilder {
    /// 根据认证信息创建分发 URL 生成器的构建器
    pub fn new(credential: Credential) -> Self {
        Self {
            inner: DeliveryUrl {
                credential,
                resource_type: "image".to_owned(),
                action: "upload".to_owned(),
                version: None,
                force_version: true,
                secure: true,
                private_cdn: false,
                cdn_subdomain: false,
                shorten: false,
                use_root_path: false,
                custom_segments: Vec::new(),
                suffix: None,
                sign_url: false,
                auth_token: None,
                transformation: None,
                format: None,
            },
        }
    }

    /// 设置资源类型，默认为 `image`
    #[inline]
    pub fn resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.inner.resource_type = resource_type.into();
        self
    }

    /// 设置分发方式，默认为 `upload`
    #[inline]
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.inner.action = action.into();
        self
    }

    /// 设置显式版本号
    #[inline]
    pub fn version(mut self, version: u64) -> Self {
        self.inner.version = Some(version);
        self
    }

    /// 是否为含目录的源路径自动注入 `v1` 版本号，默认开启
    #[inline]
    pub fn force_version(mut self, force_version: bool) -> Self {
        self.inner.force_version = force_version;
        self
    }

    /// 是否使用 HTTPS，默认开启
    #[inline]
    pub fn secure(mut self, secure: bool) -> Self {
        self.inner.secure = secure;
        self
    }

    /// 是否使用私有 CDN 域名
    #[inline]
    pub fn private_cdn(mut self, private_cdn: bool) -> Self {
        self.inner.private_cdn = private_cdn;
        self
    }

    /// 是否按源路径分片选择 CDN 子域名
    #[inline]
    pub fn cdn_subdomain(mut self, cdn_subdomain: bool) -> Self {
        self.inner.cdn_subdomain = cdn_subdomain;
        self
    }

    /// 是否将 `image/upload` 缩写为 `iu`
    #[inline]
    pub fn shorten(mut self, shorten: bool) -> Self {
        self.inner.shorten = shorten;
        self
    }

    /// 是否省略资源类型与分发方式路径段，仅支持 `image/upload`
    #[inline]
    pub fn use_root_path(mut self, use_root_path: bool) -> Self {
        self.inner.use_root_path = use_root_path;
        self
    }

    /// 追加一个自定义路径段，挂载在分发方式与签名之间
    ///
    /// 可多次调用，按追加顺序出现在 URL 中
    #[inline]
    pub fn add_custom_segment(mut self, segment: impl Into<String>) -> Self {
        self.inner.custom_segments.push(segment.into());
        self
    }

    /// 设置 URL 后缀
    #[inline]
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.inner.suffix = Some(suffix.into());
        self
    }

    /// 是否对 URL 签名
    ///
    /// 未设置访问令牌时生成 `s--XXXXXXXX--` 路径签名段，
    /// 设置了访问令牌（或配置了全局默认令牌）时改为附加令牌查询串
    #[inline]
    pub fn sign_url(mut self, sign_url: bool) -> Self {
        self.inner.sign_url = sign_url;
        self
    }

    /// 设置访问令牌
    #[inline]
    pub fn auth_token(mut self, auth_token: AuthToken) -> Self {
        self.inner.auth_token = Some(auth_token);
        self
    }

    /// 设置媒体变换
    #[inline]
    pub fn transformation(mut self, transformation: Transformation) -> Self {
        self.inner.transformation = Some(transformation);
        self
    }

    /// 设置输出格式
    #[inline]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.inner.format = Some(format.into());
        self
    }

    /// 构建分发 URL 生成器
    #[inline]
    pub fn build(self) -> DeliveryUrl {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn credential() -> Credential {
        Credential::new("demo", "1234", "abcd")
    }

    #[test]
    fn test_basic_url() {
        let url = DeliveryUrl::builder(credential()).build();
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/image/upload/sample.jpg"
        );
    }

    #[test]
    fn test_non_secure_url() {
        let url = DeliveryUrl::builder(credential()).secure(false).build();
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "http://res.cloudinary.com/demo/image/upload/sample.jpg"
        );
    }

    #[test]
    fn test_empty_source() {
        let url = DeliveryUrl::builder(credential()).build();
        assert!(matches!(url.generate(""), Err(UrlError::EmptySource)));
    }

    #[test]
    fn test_transformation_is_mounted_before_source() {
        let url = DeliveryUrl::builder(credential())
            .transformation(Transformation::new().width(100).crop("fill"))
            .build();
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/image/upload/c_fill,w_100/sample.jpg"
        );
    }

    #[test]
    fn test_forced_version() {
        let url = DeliveryUrl::builder(credential()).build();
        assert_eq!(
            url.generate("folder/sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/image/upload/v1/folder/sample.jpg"
        );
        // 不含目录的源路径不注入版本号
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/image/upload/sample.jpg"
        );
        // 已含版本号的源路径不再注入
        assert_eq!(
            url.generate("v1234/folder/sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/image/upload/v1234/folder/sample.jpg"
        );

        let url = DeliveryUrl::builder(credential()).force_version(false).build();
        assert_eq!(
            url.generate("folder/sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/image/upload/folder/sample.jpg"
        );
    }

    #[test]
    fn test_explicit_version() {
        let url = DeliveryUrl::builder(credential()).version(123).build();
        assert_eq!(
            url.generate("folder/sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/image/upload/v123/folder/sample.jpg"
        );
    }

    #[test]
    fn test_absolute_source_passthrough() {
        let url = DeliveryUrl::builder(credential()).build();
        assert_eq!(
            url.generate("https://example.com/path/to/sample.jpg").unwrap(),
            "https://example.com/path/to/sample.jpg"
        );

        // fetch 分发方式不透传
        let url = DeliveryUrl::builder(credential()).action("fetch").build();
        assert!(url
            .generate("https://example.com/path/to/sample.jpg")
            .unwrap()
            .starts_with("https://res.cloudinary.com/demo/image/fetch/"));
    }

    #[test]
    fn test_signed_url() {
        let url = DeliveryUrl::builder(credential()).sign_url(true).build();
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/image/upload/s--lGdq5NKO--/sample.jpg"
        );
    }

    #[test]
    fn test_signed_url_with_transformation() {
        let url = DeliveryUrl::builder(credential())
            .sign_url(true)
            .transformation(Transformation::new().width(10).height(20).crop("crop"))
            .build();
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/image/upload/s--PmJstCBL--/c_crop,h_20,w_10/sample.jpg"
        );
    }

    #[test]
    fn test_signed_url_ignores_version() {
        // 版本号不参与路径签名计算
        let url = DeliveryUrl::builder(credential()).sign_url(true).build();
        assert_eq!(
            url.generate("folder/sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/image/upload/s--8JqrVVE7--/v1/folder/sample.jpg"
        );
    }

    #[test]
    fn test_path_signature_shape() {
        let url = DeliveryUrl::builder(credential()).sign_url(true).build();
        let generated = url.generate("another_sample.png").unwrap();
        let signature = generated.split('/').nth(6).unwrap();
        assert_eq!(signature.len(), 13);
        assert!(signature.starts_with("s--") && signature.ends_with("--"));
        assert!(signature[3..11]
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_'));
    }

    #[test]
    fn test_custom_segments_mounted_after_action() {
        let url = DeliveryUrl::builder(credential())
            .add_custom_segment("alias")
            .add_custom_segment("snapshot")
            .build();
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/image/upload/alias/snapshot/sample.jpg"
        );

        // 自定义路径段位于签名之前
        let url = DeliveryUrl::builder(credential())
            .add_custom_segment("alias")
            .sign_url(true)
            .build();
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/image/upload/alias/s--lGdq5NKO--/sample.jpg"
        );
    }

    #[test]
    fn test_private_cdn() {
        let url = DeliveryUrl::builder(credential()).private_cdn(true).build();
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "https://demo-res.cloudinary.com/image/upload/sample.jpg"
        );
    }

    #[test]
    fn test_cdn_subdomain_sharding() {
        let url = DeliveryUrl::builder(credential()).cdn_subdomain(true).build();
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "https://res-4.cloudinary.com/demo/image/upload/sample.jpg"
        );

        let url = DeliveryUrl::builder(credential())
            .private_cdn(true)
            .cdn_subdomain(true)
            .build();
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "https://demo-res-4.cloudinary.com/image/upload/sample.jpg"
        );
    }

    #[test]
    fn test_shard_is_stable_and_in_range() {
        for source in ["sample.jpg", "test", "a.jpg", "folder/sample.jpg"] {
            let first = shard(source);
            assert!((1..=5).contains(&first));
            assert_eq!(first, shard(source));
        }
        assert_eq!(shard("test"), 2);
        assert_eq!(shard("a.jpg"), 3);
    }

    #[test]
    fn test_shorten() {
        let url = DeliveryUrl::builder(credential()).shorten(true).build();
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/iu/sample.jpg"
        );
    }

    #[test]
    fn test_use_root_path() {
        let url = DeliveryUrl::builder(credential()).use_root_path(true).build();
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/sample.jpg"
        );

        let url = DeliveryUrl::builder(credential())
            .use_root_path(true)
            .resource_type("video")
            .build();
        assert!(matches!(
            url.generate("dog.mp4"),
            Err(UrlError::RootPathNotSupported)
        ));
    }

    #[test]
    fn test_suffix_rewrites_resource_type() {
        let url = DeliveryUrl::builder(credential())
            .suffix("hello")
            .format("jpg")
            .build();
        assert_eq!(
            url.generate("sample").unwrap(),
            "https://res.cloudinary.com/demo/images/sample/hello.jpg"
        );

        let url = DeliveryUrl::builder(credential())
            .resource_type("raw")
            .suffix("hello")
            .build();
        assert_eq!(
            url.generate("sample").unwrap(),
            "https://res.cloudinary.com/demo/files/sample/hello"
        );
    }

    #[test]
    fn test_suffix_rejections() {
        let url = DeliveryUrl::builder(credential())
            .resource_type("raw")
            .action("private")
            .suffix("hello")
            .build();
        assert!(matches!(
            url.generate("sample"),
            Err(UrlError::SuffixNotSupported)
        ));

        let url = DeliveryUrl::builder(credential()).suffix("hel/lo").build();
        assert!(matches!(url.generate("sample"), Err(UrlError::InvalidSuffix)));

        let url = DeliveryUrl::builder(credential()).suffix("hel.lo").build();
        assert!(matches!(url.generate("sample"), Err(UrlError::InvalidSuffix)));
    }

    #[test]
    fn test_auth_token_is_appended_as_query() {
        let token = AuthToken::builder("00112233FF99")
            .start_time(1_111_111_111)
            .acl("/image/*")
            .duration(Duration::from_secs(300))
            .build();
        let url = DeliveryUrl::builder(credential())
            .sign_url(true)
            .auth_token(token)
            .build();
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/image/upload/sample.jpg\
             ?__cld_token__=st=1111111111~exp=1111111411~acl=%2fimage%2f*\
             ~hmac=1751370bcc6cfe9e03f30dd1a9722ba0f2cdca283fa3e6df3342a00a7528cc51"
        );
    }

    #[test]
    fn test_auth_token_scoped_to_url_path() {
        let token = AuthToken::builder("00112233FF99")
            .start_time(1_111_111_111)
            .duration(Duration::from_secs(300))
            .build();
        let url = DeliveryUrl::builder(credential())
            .private_cdn(true)
            .version(1)
            .sign_url(true)
            .auth_token(token)
            .build();
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "https://demo-res.cloudinary.com/image/upload/v1/sample.jpg\
             ?__cld_token__=st=1111111111~exp=1111111411\
             ~hmac=78325a1a33797088d58754c1687261ca62c6136359fdbea3e16990656f365f52"
        );
    }

    #[test]
    fn test_null_token_disables_token_signing() {
        let url = DeliveryUrl::builder(credential())
            .sign_url(true)
            .auth_token(AuthToken::null())
            .build();
        assert_eq!(
            url.generate("sample.jpg").unwrap(),
            "https://res.cloudinary.com/demo/image/upload/s--lGdq5NKO--/sample.jpg"
        );
    }
}
