use super::{
    expression::Expression,
    layer::{Layer, LayerError},
};
use once_cell::sync::Lazy;
use serde_json::{Map, Value};
use std::sync::RwLock;
use thiserror::Error;

/// 内置的响应式宽度变换，可以被全局配置覆盖
pub const DEFAULT_RESPONSIVE_WIDTH_TRANSFORM: &str = "c_limit,w_auto";

/// 变换序列化错误
///
/// 序列化是唯一的校验边界，构建阶段不会触发
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TransformationError {
    /// 图层描述不完整
    #[error("Invalid layer: {0}")]
    Layer(#[from] LayerError),
}

/// 变换序列化结果
pub type TransformationResult<T> = Result<T, TransformationError>;

// 值为数组时以 `.` 连接的参数键
const DOT_JOINED_KEYS: &[&str] = &["fl", "t"];
// 值被归一化为 `p` 后缀百分比形式的参数键
const RANGE_VALUE_KEYS: &[&str] = &["so", "eo", "du"];

#[derive(Clone, Default, Debug)]
struct Component {
    params: Map<String, Value>,
    overlay: Option<Layer>,
    underlay: Option<Layer>,
    html_width: Option<String>,
    html_height: Option<String>,
    responsive_width: bool,
}

impl Component {
    fn serialize(&self) -> TransformationResult<Option<String>> {
        let mut rendered = self.params.clone();
        if let Some(overlay) = self.overlay.as_ref() {
            rendered.insert("l".to_owned(), Value::String(overlay.render()?));
        }
        if let Some(underlay) = self.underlay.as_ref() {
            rendered.insert("u".to_owned(), Value::String(underlay.render()?));
        }

        let mut pairs = Vec::with_capacity(rendered.len());
        if let Some(condition) = rendered.get("if") {
            pairs.push(format!("if_{}", render_value("if", condition)));
        }
        // serde_json 的对象按键的字典序迭代
        for (key, value) in rendered.iter() {
            if key == "if" {
                continue;
            }
            let value = render_value(key, value);
            if !value.is_empty() {
                pairs.push(format!("{key}_{value}"));
            }
        }
        if pairs.is_empty() {
            Ok(None)
        } else {
            Ok(Some(pairs.join(",")))
        }
    }
}

fn render_value(key: &str, value: &Value) -> String {
    match value {
        Value::String(s) => {
            if RANGE_VALUE_KEYS.contains(&key) {
                norm_range_value(s)
            } else {
                s.to_owned()
            }
        }
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Array(items) => {
            let separator = if DOT_JOINED_KEYS.contains(&key) { "." } else { ":" };
            items
                .iter()
                .map(|item| render_value(key, item))
                .collect::<Vec<_>>()
                .join(separator)
        }
        _ => String::new(),
    }
}

/// 将百分比值归一化为 `p` 后缀形式，如 `35%` → `35p`
///
/// 无法解析为百分比的值（如 `auto`）原样保留
fn norm_range_value(value: &str) -> String {
    match value.strip_suffix('%') {
        Some(number) if number.parse::<f64>().is_ok() => format!("{number}p"),
        _ => value.to_owned(),
    }
}

/// 媒体变换
///
/// 由一个或多个链式参数集组成，
/// 每个参数集序列化为一个以 `,` 分隔键值对的段，
/// 段之间以 `/` 连接。
/// 参数集内 `if` 条件始终排在最前，其余键按字典序排列。
/// 构建过程不做校验，[`Transformation::generate`] 是唯一的校验边界。
///
/// ### 代码示例
///
/// ```
/// use cloudinary_transformation::Transformation;
///
/// let transformation = Transformation::new()
///     .width(100)
///     .height(150)
///     .crop("fill")
///     .chain()
///     .angle(20);
/// assert_eq!(transformation.generate().unwrap(), "c_fill,h_150,w_100/a_20");
/// ```
#[derive(Clone, Debug)]
pub struct Transformation {
    components: Vec<Component>,
}

impl Default for Transformation {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl Transformation {
    /// 创建空变换
    #[inline]
    pub fn new() -> Self {
        Self {
            components: vec![Default::default()],
        }
    }

    fn current_mut(&mut self) -> &mut Component {
        // components 恒非空
        self.components.last_mut().unwrap()
    }

    fn current(&self) -> &Component {
        self.components.last().unwrap()
    }

    /// 追加一个新的链式参数集，后续设置作用于新参数集
    #[inline]
    pub fn chain(mut self) -> Self {
        self.components.push(Default::default());
        self
    }

    /// 设置任意短代码参数
    ///
    /// 所有具名设置方法都汇入该通用入口，
    /// 未被具名方法覆盖的参数也可以直接设置
    #[inline]
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.current_mut().params.insert(key.into(), value.into());
        self
    }

    /// 设置条件，排在所在参数集的最前
    #[inline]
    pub fn if_condition(self, condition: impl Into<Expression>) -> Self {
        let condition = condition.into().build();
        self.param("if", condition)
    }

    /// 开启 else 分支，自动开始新的参数集
    #[inline]
    pub fn if_else(self) -> Self {
        self.chain().param("if", "else")
    }

    /// 结束条件分支，自动开始新的参数集
    #[inline]
    pub fn end_if(self) -> Self {
        self.chain().param("if", "end")
    }

    /// 设置宽度
    ///
    /// `auto` 开头的字符串值原样透传，不参与 HTML 宽度推导
    pub fn width(mut self, width: impl Into<Value>) -> Self {
        let width = width.into();
        let current = self.current_mut();
        current.html_width = match &width {
            Value::Number(number) => Some(number.to_string()),
            Value::String(s) if !s.starts_with("auto") => Some(s.to_owned()),
            _ => None,
        };
        current.params.insert("w".to_owned(), width);
        self
    }

    /// 设置高度
    pub fn height(mut self, height: impl Into<Value>) -> Self {
        let height = height.into();
        let current = self.current_mut();
        current.html_height = match &height {
            Value::Number(number) => Some(number.to_string()),
            Value::String(s) => Some(s.to_owned()),
            _ => None,
        };
        current.params.insert("h".to_owned(), height);
        self
    }

    /// 设置裁剪模式
    #[inline]
    pub fn crop(self, crop: impl Into<String>) -> Self {
        self.param("c", crop.into())
    }

    /// 设置重心
    #[inline]
    pub fn gravity(self, gravity: impl Into<String>) -> Self {
        self.param("g", gravity.into())
    }

    /// 设置质量
    #[inline]
    pub fn quality(self, quality: impl Into<Value>) -> Self {
        self.param("q", quality)
    }

    /// 设置旋转角度
    #[inline]
    pub fn angle(self, angle: impl Into<Value>) -> Self {
        self.param("a", angle)
    }

    /// 设置效果
    #[inline]
    pub fn effect(self, effect: impl Into<String>) -> Self {
        self.param("e", effect.into())
    }

    /// 设置圆角半径
    #[inline]
    pub fn radius(self, radius: impl Into<Value>) -> Self {
        self.param("r", radius)
    }

    /// 设置设备像素比
    #[inline]
    pub fn dpr(self, dpr: impl Into<Value>) -> Self {
        self.param("dpr", dpr)
    }

    /// 设置输出格式
    #[inline]
    pub fn fetch_format(self, format: impl Into<String>) -> Self {
        self.param("f", format.into())
    }

    /// 设置命名变换，多个名称以 `.` 连接
    #[inline]
    pub fn named(self, names: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        let names = names.into_iter().map(Into::into).collect::<Vec<_>>();
        self.param("t", names)
    }

    /// 设置标志位，多个标志以 `.` 连接
    #[inline]
    pub fn flags(self, flags: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        let flags = flags.into_iter().map(Into::into).collect::<Vec<_>>();
        self.param("fl", flags)
    }

    /// 设置横向偏移
    #[inline]
    pub fn x(self, x: impl Into<Value>) -> Self {
        self.param("x", x)
    }

    /// 设置纵向偏移
    #[inline]
    pub fn y(self, y: impl Into<Value>) -> Self {
        self.param("y", y)
    }

    /// 设置缩放系数
    #[inline]
    pub fn zoom(self, zoom: impl Into<Value>) -> Self {
        self.param("z", zoom)
    }

    /// 设置不透明度
    #[inline]
    pub fn opacity(self, opacity: impl Into<Value>) -> Self {
        self.param("o", opacity)
    }

    /// 设置边框
    #[inline]
    pub fn border(self, border: impl Into<String>) -> Self {
        self.param("bo", border.into())
    }

    /// 设置背景
    #[inline]
    pub fn background(self, background: impl Into<String>) -> Self {
        self.param("b", background.into())
    }

    /// 设置起始偏移，百分比值被归一化为 `p` 后缀形式
    #[inline]
    pub fn start_offset(self, offset: impl Into<Value>) -> Self {
        self.param("so", offset)
    }

    /// 设置结束偏移，百分比值被归一化为 `p` 后缀形式
    #[inline]
    pub fn end_offset(self, offset: impl Into<Value>) -> Self {
        self.param("eo", offset)
    }

    /// 设置持续时长，百分比值被归一化为 `p` 后缀形式
    #[inline]
    pub fn duration(self, duration: impl Into<Value>) -> Self {
        self.param("du", duration)
    }

    /// 设置用户变量，名称以 `$` 开头
    #[inline]
    pub fn variable(self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.param(name.into(), value)
    }

    /// 设置叠加图层
    pub fn overlay(mut self, layer: impl Into<Layer>) -> Self {
        self.current_mut().overlay = Some(layer.into());
        self
    }

    /// 设置衬底图层
    pub fn underlay(mut self, layer: impl Into<Layer>) -> Self {
        self.current_mut().underlay = Some(layer.into());
        self
    }

    /// 启用响应式宽度
    ///
    /// 序列化时在所在参数集之后追加一个响应式宽度变换段，
    /// 段内容取全局配置，未配置时使用内置的
    /// [`DEFAULT_RESPONSIVE_WIDTH_TRANSFORM`]
    pub fn responsive_width(mut self, responsive_width: bool) -> Self {
        self.current_mut().responsive_width = responsive_width;
        self
    }

    /// 序列化为变换字符串，此时执行图层校验
    pub fn generate(&self) -> TransformationResult<String> {
        let mut segments = Vec::with_capacity(self.components.len());
        for component in self.components.iter() {
            if let Some(segment) = component.serialize()? {
                segments.push(segment);
            }
            if component.responsive_width {
                segments.push(Self::responsive_width_transform());
            }
        }
        Ok(segments.join("/"))
    }

    /// 获取 HTML 标签宽度
    ///
    /// 存在图层、响应式宽度或 `auto` 宽度时不提供
    pub fn html_width(&self) -> Option<&str> {
        let current = self.current();
        if current.overlay.is_some() || current.underlay.is_some() || current.responsive_width {
            return None;
        }
        current.html_width.as_deref()
    }

    /// 获取 HTML 标签高度
    ///
    /// 存在图层或响应式宽度时不提供
    pub fn html_height(&self) -> Option<&str> {
        let current = self.current();
        if current.overlay.is_some() || current.underlay.is_some() || current.responsive_width {
            return None;
        }
        current.html_height.as_deref()
    }
}

static RESPONSIVE_WIDTH_TRANSFORM: Lazy<RwLock<Option<String>>> = Lazy::new(|| RwLock::new(None));

impl Transformation {
    /// 配置全局响应式宽度变换
    pub fn setup_responsive_width_transform(transform: impl Into<String>) {
        let mut global_transform = RESPONSIVE_WIDTH_TRANSFORM.write().unwrap();
        *global_transform = Some(transform.into());
    }

    /// 清空全局响应式宽度变换，恢复内置值
    pub fn clear_responsive_width_transform() {
        let mut global_transform = RESPONSIVE_WIDTH_TRANSFORM.write().unwrap();
        *global_transform = None;
    }

    /// 获取当前生效的响应式宽度变换
    pub fn responsive_width_transform() -> String {
        RESPONSIVE_WIDTH_TRANSFORM
            .read()
            .unwrap()
            .to_owned()
            .unwrap_or_else(|| DEFAULT_RESPONSIVE_WIDTH_TRANSFORM.to_owned())
    }
}

/// 预生成变换列表中的一项
///
/// 上传参数中的预生成变换以 `|` 分隔，
/// 每项为变换字符串加可选的 `:格式` 后缀
#[derive(Clone, Debug)]
pub struct EagerTransformation {
    transformation: Transformation,
    format: Option<String>,
}

impl EagerTransformation {
    /// 创建预生成变换项
    #[inline]
    pub fn new(transformation: Transformation) -> Self {
        Self {
            transformation,
            format: None,
        }
    }

    /// 创建带输出格式的预生成变换项
    #[inline]
    pub fn with_format(transformation: Transformation, format: impl Into<String>) -> Self {
        Self {
            transformation,
            format: Some(format.into()),
        }
    }

    fn serialize(&self) -> TransformationResult<String> {
        let mut serialized = self.transformation.generate()?;
        if let Some(format) = self.format.as_deref() {
            serialized.push(':');
            serialized.push_str(format);
        }
        Ok(serialized)
    }
}

impl From<Transformation> for EagerTransformation {
    #[inline]
    fn from(transformation: Transformation) -> Self {
        Self::new(transformation)
    }
}

/// 序列化预生成变换列表，项与项之间以 `|` 分隔
pub fn serialize_eager(
    eager: impl IntoIterator<Item = EagerTransformation>,
) -> TransformationResult<String> {
    Ok(eager
        .into_iter()
        .map(|entry| entry.serialize())
        .collect::<TransformationResult<Vec<_>>>()?
        .join("|"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexicographic_ordering() {
        let transformation = Transformation::new().width(10).height(20).crop("crop");
        assert_eq!(transformation.generate().unwrap(), "c_crop,h_20,w_10");
    }

    #[test]
    fn test_if_condition_comes_first() {
        let transformation = Transformation::new()
            .width(100)
            .crop("fill")
            .if_condition(Expression::variable("width").lt(200));
        assert_eq!(transformation.generate().unwrap(), "if_w_lt_200,c_fill,w_100");
    }

    #[test]
    fn test_if_else_and_end_if() {
        let transformation = Transformation::new()
            .if_condition("w < 200")
            .crop("fill")
            .height(120)
            .width(80)
            .if_else()
            .crop("fill")
            .height(90)
            .width(100)
            .end_if();
        assert_eq!(
            transformation.generate().unwrap(),
            "if_w_lt_200,c_fill,h_120,w_80/if_else,c_fill,h_90,w_100/if_end"
        );
    }

    #[test]
    fn test_chained_components() {
        let transformation = Transformation::new()
            .width(100)
            .height(150)
            .crop("fill")
            .chain()
            .angle(20);
        assert_eq!(transformation.generate().unwrap(), "c_fill,h_150,w_100/a_20");
    }

    #[test]
    fn test_determinism_and_clone_independence() {
        let original = Transformation::new().width(100).crop("scale");
        assert_eq!(original.generate().unwrap(), original.generate().unwrap());

        let mutated = original.to_owned().height(50);
        assert_eq!(original.generate().unwrap(), "c_scale,w_100");
        assert_eq!(mutated.generate().unwrap(), "c_scale,h_50,w_100");
    }

    #[test]
    fn test_array_values() {
        let transformation = Transformation::new().flags(["progressive", "keep_iptc"]);
        assert_eq!(transformation.generate().unwrap(), "fl_progressive.keep_iptc");

        let transformation = Transformation::new().named(["media_lib_thumb", "sharpen"]);
        assert_eq!(transformation.generate().unwrap(), "t_media_lib_thumb.sharpen");

        let transformation = Transformation::new().param("bo", vec!["5px", "solid"]);
        assert_eq!(transformation.generate().unwrap(), "bo_5px:solid");
    }

    #[test]
    fn test_percent_range_values() {
        let transformation = Transformation::new().start_offset("35%").end_offset("70.5%");
        assert_eq!(transformation.generate().unwrap(), "eo_70.5p,so_35p");

        let transformation = Transformation::new().duration("auto");
        assert_eq!(transformation.generate().unwrap(), "du_auto");

        let transformation = Transformation::new().start_offset(2);
        assert_eq!(transformation.generate().unwrap(), "so_2");
    }

    #[test]
    fn test_auto_width_passes_through() {
        let transformation = Transformation::new().width("auto:breakpoints").crop("fill");
        assert_eq!(transformation.generate().unwrap(), "c_fill,w_auto:breakpoints");
        assert_eq!(transformation.html_width(), None);
    }

    #[test]
    fn test_html_dimensions() {
        let transformation = Transformation::new().width(100).height(150);
        assert_eq!(transformation.html_width(), Some("100"));
        assert_eq!(transformation.html_height(), Some("150"));

        let transformation = Transformation::new()
            .width(100)
            .overlay(Layer::source("logo").build());
        assert_eq!(transformation.html_width(), None);
    }

    #[test]
    fn test_responsive_width_appends_default_transform() {
        let transformation = Transformation::new().width(100).crop("crop").responsive_width(true);
        assert_eq!(transformation.generate().unwrap(), "c_crop,w_100/c_limit,w_auto");
        assert_eq!(transformation.html_width(), None);
    }

    #[test]
    fn test_layer_validation_is_lazy() {
        let transformation = Transformation::new().overlay(Layer::text("No font").build());
        assert!(matches!(
            transformation.generate(),
            Err(TransformationError::Layer(LayerError::IncompleteTextLayer))
        ));
    }

    #[test]
    fn test_overlay_sorted_with_other_keys() {
        let transformation = Transformation::new()
            .width(100)
            .gravity("south")
            .overlay(Layer::source("logo").build());
        assert_eq!(transformation.generate().unwrap(), "g_south,l_logo,w_100");
    }

    #[test]
    fn test_user_variables() {
        let transformation = Transformation::new()
            .variable("$newwidth", 100)
            .chain()
            .width("$newwidth");
        assert_eq!(transformation.generate().unwrap(), "$newwidth_100/w_$newwidth");
    }

    #[test]
    fn test_eager_list() {
        let eager = vec![
            EagerTransformation::new(Transformation::new().width(100).crop("crop")),
            EagerTransformation::with_format(Transformation::new().width(50), "png"),
        ];
        assert_eq!(serialize_eager(eager).unwrap(), "c_crop,w_100|w_50:png");
    }

    #[test]
    fn test_eager_with_chained_transformation() {
        let eager = vec![EagerTransformation::with_format(
            Transformation::new().width(100).chain().angle(10),
            "jpg",
        )];
        assert_eq!(serialize_eager(eager).unwrap(), "w_100/a_10:jpg");
    }

    #[test]
    fn test_empty_transformation() {
        assert_eq!(Transformation::new().generate().unwrap(), "");
    }
}
