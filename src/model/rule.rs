//! 策略规则注册表
//!
//! 规则是不可变的静态数据，进程启动后加载一次；Profile 只持有规则 ID，
//! 组装系统提示词时通过注册表解析（避免在每个档案里重复规则文本）。

use std::collections::HashMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// 规则注入模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleMode {
    Allow,
    Block,
    Transform,
}

/// 策略规则
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub label: String,
    pub description: String,
    pub mode: RuleMode,
    /// 触发关键词
    pub keywords: Vec<String>,
    /// 启用时注入系统提示词的策略片段
    pub system_fragment: String,
}

static RULE_REGISTRY: OnceLock<HashMap<String, Rule>> = OnceLock::new();

fn builtin_rules() -> Vec<Rule> {
    fn rule(
        id: &str,
        label: &str,
        description: &str,
        mode: RuleMode,
        keywords: &[&str],
        system_fragment: &str,
    ) -> Rule {
        Rule {
            id: id.to_string(),
            label: label.to_string(),
            description: description.to_string(),
            mode,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            system_fragment: system_fragment.to_string(),
        }
    }

    vec![
        rule(
            "no_sexual_topics",
            "Block sexual/interpersonal topics",
            "Decline content about sex, dating, explicit material; redirect to parent.",
            RuleMode::Block,
            &["sex", "sexual", "dating", "porn", "nsfw", "explicit"],
            "Politely refuse any sexual, pornographic, dating, or explicit content. \
             Say you cannot discuss that and suggest asking a parent.",
        ),
        rule(
            "violence_filter",
            "Filter graphic violence",
            "Allow historical discussion but omit graphic details; reinforce safety.",
            RuleMode::Transform,
            &["gore", "graphic", "blood"],
            "If violence appears, keep discussion factual and age-appropriate, omit \
             graphic details, and emphasize safety and empathy.",
        ),
        rule(
            "political_neutrality",
            "Political neutrality",
            "Avoid partisan persuasion; focus on verifiable facts and balanced views.",
            RuleMode::Transform,
            &["election", "democrat", "republican", "liberal", "conservative"],
            "Maintain political neutrality. Provide balanced, sourced information and \
             avoid persuasive language.",
        ),
        rule(
            "faith_options",
            "Faith-aware companion",
            "When asked for, append an optional faith-based companion section.",
            RuleMode::Transform,
            &["faith", "bible", "scripture", "quran", "torah"],
            "When FAITH_COMPANION is requested, add a short, respectful faith-based \
             companion section matching the selected faith tradition.",
        ),
        rule(
            "scholarly_citations",
            "Require citations",
            "For educational topics, cite peer-reviewed or reputable sources when applicable.",
            RuleMode::Transform,
            &["study", "paper", "citation", "evidence"],
            "When the user asks academic/educational questions, include a concise \
             'Sources' list referencing peer-reviewed or reputable sources, with \
             author/title/year or DOI/URL.",
        ),
        rule(
            "ask_parent_redirect",
            "Ask-a-Parent redirect",
            "Intercept sensitive topics and ask for parent approval before proceeding.",
            RuleMode::Transform,
            &["suicide", "self-harm", "sex", "drugs", "extremism", "gore"],
            "If a topic appears sensitive for minors, suggest asking a parent or \
             trusted adult and pause until approved.",
        ),
    ]
}

/// 规则注册表（首次访问时构建）
pub fn rule_registry() -> &'static HashMap<String, Rule> {
    RULE_REGISTRY.get_or_init(|| {
        builtin_rules()
            .into_iter()
            .map(|rule| (rule.id.clone(), rule))
            .collect()
    })
}

/// 按 ID 查找规则；未知 ID 返回 None
pub fn get_rule(id: &str) -> Option<&'static Rule> {
    rule_registry().get(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_contains_builtin_rules() {
        let registry = rule_registry();
        assert_eq!(registry.len(), 6);
        assert!(registry.contains_key("no_sexual_topics"));
        assert!(registry.contains_key("scholarly_citations"));
    }

    #[test]
    fn test_get_rule() {
        let rule = get_rule("no_sexual_topics").unwrap();
        assert_eq!(rule.mode, RuleMode::Block);
        assert!(rule.keywords.contains(&"porn".to_string()));

        assert!(get_rule("does_not_exist").is_none());
    }
}
