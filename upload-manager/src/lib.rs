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

//! # cloudinary-upload-manager
//!
//! ## Cloudinary 上传管理库
//!
//! 负责向 Cloudinary 上传媒体资源：
//! 上传参数的签名定稿、单次调用上传、远端 URL 抓取上传，
//! 以及大文件按 `Content-Range` 字节范围顺序发送的分片上传协议。
//! HTTP 传输由实现了
//! [`cloudinary_http::ApiCaller`] 的调用者提供。

mod file_description;
mod upload_manager;
mod upload_params;
mod upload_response;

pub use file_description::{FileDescription, UploadSource};
pub use upload_manager::{
    UploadError, UploadManager, UploadManagerBuilder, UploadResult, API_VERSION,
    DEFAULT_CHUNK_SIZE, DEFAULT_UPLOAD_PREFIX,
};
pub use upload_params::UploadParams;
pub use upload_response::UploadResponse;
