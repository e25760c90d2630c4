use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use thiserror::Error;

// 文字图层的文本需要转义的字符
const TEXT_ESCAPE_SET: &AsciiSet = &CONTROLS.add(b' ').add(b',').add(b'/').add(b'%');

/// 图层构建错误
///
/// 在图层被序列化时才会触发，构建阶段不做校验
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LayerError {
    /// 非文字图层必须提供公开标识符
    #[error("Layer must have a public_id")]
    MissingPublicId,
    /// 文字图层必须提供公开标识符，或同时提供文本、字体与字号
    #[error("Text layer must have a public_id, or text with font_family and font_size")]
    IncompleteTextLayer,
}

/// 叠加图层
///
/// 表示变换中的 overlay / underlay 参数值，
/// 校验延迟到序列化阶段执行。
#[derive(Clone, Eq, PartialEq, Debug)]
#[non_exhaustive]
pub enum Layer {
    /// 预格式化的图层描述，原样输出
    Raw(String),
    /// 以公开标识符引用的媒体资源图层
    Source(SourceLayer),
    /// 文字图层
    Text(TextLayer),
}

impl Layer {
    /// 创建媒体资源图层构建器
    #[inline]
    pub fn source(public_id: impl Into<String>) -> SourceLayerBuilder {
        SourceLayerBuilder::new(public_id)
    }

    /// 创建文字图层构建器
    #[inline]
    pub fn text(text: impl Into<String>) -> TextLayerBuilder {
        TextLayerBuilder::new(text)
    }

    /// 序列化为图层描述字符串，此时执行校验
    pub fn render(&self) -> Result<String, LayerError> {
        match self {
            Self::Raw(raw) => Ok(raw.to_owned()),
            Self::Source(layer) => layer.render(),
            Self::Text(layer) => layer.render(),
        }
    }
}

impl From<&str> for Layer {
    #[inline]
    fn from(raw: &str) -> Self {
        Self::Raw(raw.to_owned())
    }
}

impl From<String> for Layer {
    #[inline]
    fn from(raw: String) -> Self {
        Self::Raw(raw)
    }
}

/// 以公开标识符引用的媒体资源图层
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct SourceLayer {
    resource_type: String,
    storage_type: String,
    public_id: String,
    format: Option<String>,
}

impl SourceLayer {
    fn render(&self) -> Result<String, LayerError> {
        if self.public_id.is_empty() {
            return Err(LayerError::MissingPublicId);
        }
        let mut components = Vec::with_capacity(3);
        if self.resource_type != "image" {
            components.push(self.resource_type.to_owned());
        }
        if self.storage_type != "upload" {
            components.push(self.storage_type.to_owned());
        }
        let mut public_id = self.public_id.replace('/', ":");
        if let Some(format) = self.format.as_deref() {
            public_id.push('.');
            public_id.push_str(format);
        }
        components.push(public_id);
        Ok(components.join(":"))
    }
}

/// 媒体资源图层构建器
#[derive(Clone, Debug)]
pub struct SourceLayerBuilder {
    inner: SourceLayer,
}

impl SourceLayerBuilder {
    /// 根据公开标识符创建媒体资源图层构建器
    pub fn new(public_id: impl Into<String>) -> Self {
        Self {
            inner: SourceLayer {
                resource_type: "image".to_owned(),
                storage_type: "upload".to_owned(),
                public_id: public_id.into(),
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

    /// 设置存储类型，默认为 `upload`
    #[inline]
    pub fn storage_type(mut self, storage_type: impl Into<String>) -> Self {
        self.inner.storage_type = storage_type.into();
        self
    }

    /// 设置输出格式
    #[inline]
    pub fn format(mut self, format: impl Into<String>) -> Self {
        self.inner.format = Some(format.into());
        self
    }

    /// 构建图层
    #[inline]
    pub fn build(self) -> Layer {
        Layer::Source(self.inner)
    }
}

/// 文字图层
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TextLayer {
    public_id: Option<String>,
    text: Option<String>,
    font_family: Option<String>,
    font_size: Option<u32>,
    font_weight: Option<String>,
    font_style: Option<String>,
}

impl TextLayer {
    fn render(&self) -> Result<String, LayerError> {
        let styled = self.font_family.is_some() && self.font_size.is_some();
        if self.public_id.is_none() && !(self.text.is_some() && styled) {
            return Err(LayerError::IncompleteTextLayer);
        }

        let mut components = vec!["text".to_owned()];
        if styled {
            let mut style = vec![
                self.font_family.to_owned().unwrap_or_default(),
                self.font_size.map(|size| size.to_string()).unwrap_or_default(),
            ];
            if let Some(font_weight) = self.font_weight.as_deref() {
                if font_weight != "normal" {
                    style.push(font_weight.to_owned());
                }
            }
            if let Some(font_style) = self.font_style.as_deref() {
                if font_style != "normal" {
                    style.push(font_style.to_owned());
                }
            }
            components.push(style.join("_"));
        } else if let Some(public_id) = self.public_id.as_deref() {
            components.push(public_id.replace('/', ":"));
        }
        if let Some(text) = self.text.as_deref() {
            components.push(utf8_percent_encode(text, TEXT_ESCAPE_SET).to_string());
        }
        Ok(components.join(":"))
    }
}

/// 文字图层构建器
#[derive(Clone, Debug)]
pub struct TextLayerBuilder {
    inner: TextLayer,
}

impl TextLayerBuilder {
    /// 根据文本内容创建文字图层构建器
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            inner: TextLayer {
                public_id: None,
                text: Some(text.into()),
                font_family: None,
                font_size: None,
                font_weight: None,
                font_style: None,
            },
        }
    }

    /// 设置引用的文字样式资源的公开标识符
    #[inline]
    pub fn public_id(mut self, public_id: impl Into<String>) -> Self {
        self.inner.public_id = Some(public_id.into());
        self
    }

    /// 设置字体
    #[inline]
    pub fn font_family(mut self, font_family: impl Into<String>) -> Self {
        self.inner.font_family = Some(font_family.into());
        self
    }

    /// 设置字号
    #[inline]
    pub fn font_size(mut self, font_size: u32) -> Self {
        self.inner.font_size = Some(font_size);
        self
    }

    /// 设置字重
    #[inline]
    pub fn font_weight(mut self, font_weight: impl Into<String>) -> Self {
        self.inner.font_weight = Some(font_weight.into());
        self
    }

    /// 设置字形
    #[inline]
    pub fn font_style(mut self, font_style: impl Into<String>) -> Self {
        self.inner.font_style = Some(font_style.into());
        self
    }

    /// 构建图层
    #[inline]
    pub fn build(self) -> Layer {
        Layer::Text(self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_layer() {
        let layer = Layer::source("logo").build();
        assert_eq!(layer.render().unwrap(), "logo");

        let layer = Layer::source("folder/logo").format("png").build();
        assert_eq!(layer.render().unwrap(), "folder:logo.png");

        let layer = Layer::source("dog.mp4").resource_type("video").build();
        assert_eq!(layer.render().unwrap(), "video:dog.mp4");

        let layer = Layer::source("hidden").storage_type("private").build();
        assert_eq!(layer.render().unwrap(), "private:hidden");
    }

    #[test]
    fn test_text_layer() {
        let layer = Layer::text("Hello World").font_family("Arial").font_size(18).build();
        assert_eq!(layer.render().unwrap(), "text:Arial_18:Hello%20World");

        let layer = Layer::text("Hi,you/me")
            .font_family("Arial")
            .font_size(18)
            .font_weight("bold")
            .build();
        assert_eq!(layer.render().unwrap(), "text:Arial_18_bold:Hi%2Cyou%2Fme");
    }

    #[test]
    fn test_text_layer_by_public_id() {
        let layer = Layer::text("Flowers").public_id("sample_text_style").build();
        assert_eq!(layer.render().unwrap(), "text:sample_text_style:Flowers");
    }

    #[test]
    fn test_lazy_validation() {
        let layer = Layer::text("No font").build();
        assert!(matches!(layer.render(), Err(LayerError::IncompleteTextLayer)));

        let layer = Layer::source("").build();
        assert!(matches!(layer.render(), Err(LayerError::MissingPublicId)));
    }

    #[test]
    fn test_raw_layer_passthrough() {
        let layer = Layer::from("video:dog");
        assert_eq!(layer.render().unwrap(), "video:dog");
    }
}
