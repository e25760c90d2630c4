use serde::Deserialize;

/// 上传成功后服务端返回的资源信息
///
/// 只列出稳定存在的字段，其余字段随资源类型变化，
/// 未列出的字段被忽略
#[derive(Clone, Debug, Deserialize)]
#[non_exhaustive]
pub struct UploadResponse {
    /// 资源的公开标识符
    pub public_id: String,
    /// 资源版本号
    #[serde(default)]
    pub version: u64,
    /// 服务端计算的内容签名
    #[serde(default)]
    pub signature: Option<String>,
    /// 资源类型
    #[serde(default)]
    pub resource_type: Option<String>,
    /// 资源格式
    #[serde(default)]
    pub format: Option<String>,
    /// 图片宽度
    #[serde(default)]
    pub width: Option<u32>,
    /// 图片高度
    #[serde(default)]
    pub height: Option<u32>,
    /// 资源大小，单位为字节
    #[serde(default)]
    pub bytes: Option<u64>,
    /// 资源的 HTTP 分发 URL
    #[serde(default)]
    pub url: Option<String>,
    /// 资源的 HTTPS 分发 URL
    #[serde(default)]
    pub secure_url: Option<String>,
    /// 资源的内容指纹
    #[serde(default)]
    pub etag: Option<String>,
}
