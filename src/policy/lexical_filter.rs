//! 违禁词拦截
//!
//! 边界侧的权威检查；客户端在发起网络调用前也会执行同样的检查做快速
//! 短路。客户端检查可以被绕过，服务端这份才是真正的安全边界。

use std::sync::OnceLock;

use regex::Regex;

/// 违禁词列表（人工维护；整词匹配，大小写不敏感）
const BANNED_TERMS: &[&str] = &[
    "sex",
    "sexual",
    "porn",
    "onlyfans",
    "hookup",
    "boyfriend",
    "girlfriend",
    "dating",
    "crush",
    "sext",
    "nudes",
];

static BANNED_RE: OnceLock<Regex> = OnceLock::new();

fn banned_regex() -> &'static Regex {
    BANNED_RE.get_or_init(|| {
        // \b 整词边界，避免 "Sussex" 这类子串误伤
        let pattern = format!(r"(?i)\b({})\b", BANNED_TERMS.join("|"));
        Regex::new(&pattern).expect("invalid banned term pattern")
    })
}

/// 检查文本是否命中违禁词（true = 拦截）
///
/// 命中即终止：管线不得继续走远程审核或上游调用。
pub fn screen(text: &str) -> bool {
    banned_regex().is_match(text)
}
