//! Base64 计算库
//!
//! 提供简单的 URLSafe Base64 计算库

pub use base64::DecodeError;
use std::result::Result;

/// 以 URL 安全的方式，将指定的二进制数据编码为 Base64 字符串
pub fn urlsafe(data: &[u8]) -> String {
    base64::encode_config(data, base64::URL_SAFE)
}

/// 以 URL 安全的方式，将指定的 Base64 字符串解码为二进制数据
pub fn decode(data: &[u8]) -> Result<Vec<u8>, DecodeError> {
    base64::decode_config(data, base64::URL_SAFE)
}
