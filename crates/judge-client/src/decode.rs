//! 评测输出解码。
//!
//! 评测服务对输出字段的编码并不一致：同一接口有时返回 base64，有时返回明文。
//! 这里只做尽力而为的兼容处理，不是通用解析算法。

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use tracing::debug;

/// 解码单个输出字段。
///
/// 空白值视为缺失；字符集符合 base64 字母表时尝试解码，失败则原样返回；
/// 其余情况直接返回原值。
pub fn decode_output(value: Option<&str>) -> Option<String> {
    let value = value?;
    if value.trim().is_empty() {
        return None;
    }

    if !looks_encoded(value) {
        return Some(value.to_string());
    }

    let compact: String = value
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    match STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(text) => Some(text),
            Err(err) => {
                debug!(error = %err, "decoding fallback: payload is not utf-8, using raw value");
                Some(value.to_string())
            }
        },
        Err(err) => {
            debug!(error = %err, "decoding fallback: invalid base64, using raw value");
            Some(value.to_string())
        }
    }
}

fn looks_encoded(value: &str) -> bool {
    let mut significant = 0usize;
    for c in value.chars() {
        if c.is_ascii_whitespace() {
            continue;
        }
        if !(c.is_ascii_alphanumeric() || matches!(c, '+' | '/' | '=')) {
            return false;
        }
        significant += 1;
    }

    significant > 0 && significant % 4 == 0
}
