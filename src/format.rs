use chrono::{DateTime, Local, TimeZone};

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// 二进制前缀的文件大小，保留两位小数并去掉多余的 0
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    // 等价于 floor(log1024(bytes))，用整数比较避免浮点误差
    let mut unit = 0;
    let mut threshold: u64 = 1024;
    while unit < SIZE_UNITS.len() - 1 && bytes >= threshold {
        unit += 1;
        threshold = threshold.saturating_mul(1024);
    }
    let value = bytes as f64 / 1024f64.powi(unit as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, SIZE_UNITS[unit])
}

pub fn format_modified(secs: f64) -> String {
    format_modified_in(secs, &Local)
}

fn format_modified_in<Tz: TimeZone>(secs: f64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9) as u32;
    match DateTime::from_timestamp(whole as i64, nanos) {
        Some(utc) => utc
            .with_timezone(tz)
            .format("%d/%m/%Y %H:%M:%S")
            .to_string(),
        None => "-".to_string(),
    }
}

pub fn count_label(total: usize) -> String {
    if total == 1 {
        "1 documento encontrado".to_string()
    } else {
        format!("{} documentos encontrados", total)
    }
}
