//! 敏感话题识别（家长审批预触发）
//!
//! 覆盖面比硬拦截词表更宽：命中不代表拒答，只代表需要家长先行确认。

use std::sync::OnceLock;

use regex::Regex;

/// 需要家长确认的敏感关键词
const SENSITIVE_KEYWORDS: &[&str] = &[
    "sex",
    "sexual",
    "dating",
    "porn",
    "suicide",
    "self-harm",
    "self harm",
    "extremism",
    "gore",
    "drugs",
    "nsfw",
];

static SENSITIVE_RE: OnceLock<Regex> = OnceLock::new();

fn sensitive_regex() -> &'static Regex {
    SENSITIVE_RE.get_or_init(|| {
        let pattern = format!(r"(?i)\b({})\b", SENSITIVE_KEYWORDS.join("|"));
        Regex::new(&pattern).expect("invalid sensitive keyword pattern")
    })
}

/// 原始用户输入是否命中敏感话题
pub fn needs_parent_approval(text: &str) -> bool {
    sensitive_regex().is_match(text)
}
