use cloudinary_http::FieldValue;
use cloudinary_transformation::{
    serialize_eager, EagerTransformation, Transformation, TransformationResult,
};
use std::collections::BTreeMap;

/// 上传参数
///
/// 除资源类型（体现在上传 URL 中）外，
/// 所有参数最终都编码为表单字段并参与内容签名。
/// 变换与预生成变换列表在编码阶段序列化，
/// 图层校验错误也在该阶段出现。
#[derive(Clone, Debug)]
pub struct UploadParams {
    resource_type: String,
    params: BTreeMap<String, FieldValue>,
    transformation: Option<Transformation>,
    eager: Vec<EagerTransformation>,
}

impl Default for UploadParams {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl UploadParams {
    /// 创建空的上传参数
    pub fn new() -> Self {
        Self {
            resource_type: "image".to_owned(),
            params: Default::default(),
            transformation: None,
            eager: Default::default(),
        }
    }

    /// 获取资源类型
    #[inline]
    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// 设置资源类型，默认为 `image`
    #[inline]
    pub fn set_resource_type(mut self, resource_type: impl Into<String>) -> Self {
        self.resource_type = resource_type.into();
        self
    }

    /// 设置上传后的公开标识符
    #[inline]
    pub fn public_id(self, public_id: impl Into<String>) -> Self {
        self.param("public_id", public_id.into())
    }

    /// 设置上传到的目录
    #[inline]
    pub fn folder(self, folder: impl Into<String>) -> Self {
        self.param("folder", folder.into())
    }

    /// 设置标签，编码时以 `,` 连接
    #[inline]
    pub fn tags(self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let tags = tags.into_iter().map(Into::into).collect::<Vec<_>>();
        self.param("tags", tags)
    }

    /// 是否允许覆盖同名资源
    #[inline]
    pub fn overwrite(self, overwrite: bool) -> Self {
        self.param("overwrite", overwrite.to_string())
    }

    /// 是否使用原始文件名作为公开标识符
    #[inline]
    pub fn use_filename(self, use_filename: bool) -> Self {
        self.param("use_filename", use_filename.to_string())
    }

    /// 设置上传时应用的媒体变换
    #[inline]
    pub fn transformation(mut self, transformation: Transformation) -> Self {
        self.transformation = Some(transformation);
        self
    }

    /// 设置预生成变换列表
    #[inline]
    pub fn eager(mut self, eager: impl IntoIterator<Item = EagerTransformation>) -> Self {
        self.eager = eager.into_iter().collect();
        self
    }

    /// 设置任意上传参数
    #[inline]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// 编码为表单字段表，此时序列化变换并执行图层校验
    pub fn into_fields(self) -> TransformationResult<BTreeMap<String, FieldValue>> {
        let mut fields = self.params;
        if let Some(transformation) = self.transformation.as_ref() {
            let serialized = transformation.generate()?;
            if !serialized.is_empty() {
                fields.insert("transformation".to_owned(), serialized.into());
            }
        }
        if !self.eager.is_empty() {
            fields.insert("eager".to_owned(), serialize_eager(self.eager)?.into());
        }
        Ok(fields)
    }
}
