//! 引用来源校验
//!
//! 档案要求引用时，回答必须带 "Sources:" / "References:" 小节。缺失时
//! 不代为编造引用，而是整体替换为固定致歉文案（宁可不答，不可无据）。

use std::sync::OnceLock;

use regex::Regex;

use crate::model::Profile;

/// 缺少引用时的固定致歉文案
pub const MISSING_SOURCES_APOLOGY: &str = "I'm sorry, but I couldn't back that \
    answer up with reliable sources, so I'd rather not guess. Please ask me again \
    and I'll try to answer with proper references.";

static SOURCES_RE: OnceLock<Regex> = OnceLock::new();

fn sources_regex() -> &'static Regex {
    SOURCES_RE.get_or_init(|| {
        Regex::new(r"(?is)(?:^|\n)[ \t]*(?:sources|references)[ \t]*:[ \t]*\n(.*)$")
            .expect("invalid sources pattern")
    })
}

/// 提取回答中的引用条目（最多 10 条）
///
/// 条目去掉前导的 "-" / "*" 符号与空白；没有引用小节时返回空列表。
pub fn extract_sources(reply: &str) -> Vec<String> {
    let Some(captures) = sources_regex().captures(reply) else {
        return Vec::new();
    };
    captures
        .get(1)
        .map(|m| m.as_str())
        .unwrap_or("")
        .lines()
        .map(|line| line.trim().trim_start_matches(['-', '*']).trim())
        .filter(|line| !line.is_empty())
        .take(10)
        .map(|line| line.to_string())
        .collect()
}

/// 按档案要求校验引用
///
/// `require_citations = false` 时原样放行；为 true 且回答缺少非空引用
/// 小节时，替换为固定致歉文案。
pub fn enforce(reply: String, profile: &Profile) -> String {
    if !profile.require_citations {
        return reply;
    }
    if extract_sources(&reply).is_empty() {
        MISSING_SOURCES_APOLOGY.to_string()
    } else {
        reply
    }
}
