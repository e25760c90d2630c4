#![deny(
    single_use_lifetimes,
    missing_debug_implementations,
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
    unstable_features,
    unsafe_code,
    unused_extern_crates,
    unused_import_braces,
    unused_lifetimes,
    unused_qualifications
)]

//! # cloudinary-utils
//!
//! ## Cloudinary 实用工具库
//!
//! 仅供 Cloudinary SDK 内部使用，接口不保证总是兼容变更

pub mod base64;

mod name;
pub use name::{CloudName, PublicId};
