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

//! # cloudinary-delivery
//!
//! ## Cloudinary 分发 URL 库
//!
//! 负责将账户、资源类型、分发方式、媒体变换与签名状态
//! 组装为可路由到 CDN 的完整分发 URL：
//! 域名选择（HTTPS、私有 CDN、子域名分片）、
//! 路径重写（缩写、根路径、URL 后缀）、版本号注入、
//! 路径签名与访问令牌的附加。

mod url;

pub use url::{shard, DeliveryUrl, DeliveryUrlBuilder, UrlError, UrlResult};
