//! util — общие хелперы (ENV-парсинг, однострочные значения).
//!
//! Содержит:
//! - env_string(): непустое значение переменной окружения (trim).
//! - env_flag(): "1|true|yes|on" => true, "0|false|no|off" => false.
//! - env_parse(): FromStr-парсинг значения, мусор игнорируется.
//! - single_line(): CR/LF -> пробел + trim, чтобы одна запись = одна строка.

use std::str::FromStr;

/// Non-empty, trimmed value of an environment variable.
pub fn env_string(name: &str) -> Option<String> {
    let v = std::env::var(name).ok()?;
    let s = v.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Boolean switch from ENV. Unrecognized values are treated as unset.
pub fn env_flag(name: &str) -> Option<bool> {
    env_string(name).and_then(|s| parse_flag(&s))
}

pub fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

pub fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env_string(name).and_then(|s| s.parse::<T>().ok())
}

/// Collapse embedded line breaks so the value fits on one physical line.
#[inline]
pub fn single_line(v: &str) -> String {
    v.replace(['\r', '\n'], " ").trim().to_string()
}
