//! 内部单位（nm、0.1°）与文件文本之间的转换。与区域设置无关，且与解析函数精确互逆。

use zsch_core::geometry::{Angle, Point};

use crate::IoError;

const NM_PER_MM: i64 = 1_000_000;
const MM_DECIMALS: usize = 6;

/// 纳米写成毫米，最多 6 位小数并去掉末尾的 0，例如 `1270000` → `1.27`。
pub fn format_internal_units(value: i32) -> String {
    format_fixed(i64::from(value), NM_PER_MM, MM_DECIMALS)
}

/// 十分之一度写成度，例如 `900` → `90`，`455` → `45.5`。
pub fn format_angle(angle: Angle) -> String {
    format_fixed(i64::from(angle.0), 10, 1)
}

pub fn format_point(point: Point) -> String {
    format!(
        "{} {}",
        format_internal_units(point.x()),
        format_internal_units(point.y())
    )
}

pub fn format_size(size: Point) -> String {
    format_point(size)
}

pub fn parse_internal_units(text: &str) -> Result<i32, IoError> {
    parse_fixed(text, NM_PER_MM, MM_DECIMALS)
}

pub fn parse_angle(text: &str) -> Result<Angle, IoError> {
    parse_fixed(text, 10, 1).map(Angle)
}

fn format_fixed(value: i64, scale: i64, decimals: usize) -> String {
    let sign = if value < 0 { "-" } else { "" };
    let magnitude = value.abs();
    let whole = magnitude / scale;
    let fraction = magnitude % scale;
    if fraction == 0 {
        return format!("{sign}{whole}");
    }
    let digits = format!("{:0width$}", fraction, width = decimals);
    format!("{sign}{whole}.{}", digits.trim_end_matches('0'))
}

fn parse_fixed(text: &str, scale: i64, decimals: usize) -> Result<i32, IoError> {
    let invalid = || IoError::InvalidNumber(text.to_string());
    let trimmed = text.trim();
    let (negative, unsigned) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
    if whole.is_empty() || !all_digits(whole) || !all_digits(fraction) {
        return Err(invalid());
    }
    // 超出精度的小数位只允许是 0
    let (kept, rest) = fraction.split_at(fraction.len().min(decimals));
    if rest.bytes().any(|b| b != b'0') {
        return Err(invalid());
    }

    let whole: i64 = whole.parse().map_err(|_| invalid())?;
    let mut scaled_fraction: i64 = 0;
    for (position, digit) in kept.bytes().enumerate() {
        let weight = 10_i64.pow((decimals - position - 1) as u32);
        scaled_fraction += i64::from(digit - b'0') * weight;
    }
    let magnitude = whole
        .checked_mul(scale)
        .and_then(|value| value.checked_add(scaled_fraction))
        .ok_or_else(invalid)?;
    let value = if negative { -magnitude } else { magnitude };
    i32::try_from(value).map_err(|_| invalid())
}
