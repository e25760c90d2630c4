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

//! # cloudinary-transformation
//!
//! ## Cloudinary 媒体变换库
//!
//! 负责将结构化的媒体变换描述编译为规范的 URL 路径段：
//! 条件与算术表达式的标记归一化、
//! 参数集的确定性序列化（`if` 优先、其余按字典序）、
//! 叠加图层子语法与延迟校验、
//! 链式变换与预生成变换列表。
//!
//! ### 代码示例
//!
//! ```
//! use cloudinary_transformation::{Expression, Transformation};
//!
//! let transformation = Transformation::new()
//!     .if_condition(Expression::variable("width").lt(200))
//!     .width(100)
//!     .crop("fill");
//! assert_eq!(transformation.generate().unwrap(), "if_w_lt_200,c_fill,w_100");
//! ```

mod expression;
mod layer;
mod transformation;

pub use expression::Expression;
pub use layer::{Layer, LayerError, SourceLayer, SourceLayerBuilder, TextLayer, TextLayerBuilder};
pub use transformation::{
    serialize_eager, EagerTransformation, Transformation, TransformationError,
    TransformationResult, DEFAULT_RESPONSIVE_WIDTH_TRANSFORM,
};
