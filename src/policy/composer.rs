//! 系统提示词组装
//!
//! 给定同一个 Profile，输出必须逐字节一致：不引入随机性，不读取任何
//! 外部状态（规则注册表是进程内静态数据），保证可审计、可测试。

use crate::model::rule::get_rule;
use crate::model::{FaithModule, Profile};

/// 根据活跃档案组装系统提示词
///
/// 片段顺序固定：基线人设 → 启用规则（按档案顺序）→ 引用策略 →
/// 信仰模块 → 拒答引导。
pub fn compose(profile: &Profile) -> String {
    let mut fragments: Vec<String> = vec![
        "You are KidGate, a helpful, age-aware educational assistant.".to_string(),
        format!(
            "Respond for a child approximately age {}. Use simple, friendly language \
             without being patronizing.",
            profile.age
        ),
        "If a question is unclear or seems sensitive for minors, explain why and \
         suggest asking a parent."
            .to_string(),
        "Keep answers concise, factual, and non-sensational; avoid graphic detail."
            .to_string(),
    ];

    // 每条启用规则一行，前缀规则标签便于审计
    for rule_id in &profile.enabled_rule_ids {
        if let Some(rule) = get_rule(rule_id) {
            fragments.push(format!("Rule({}): {}", rule.label, rule.system_fragment));
        }
    }

    if profile.require_citations {
        fragments.push(
            "When claims involve facts, history, science, or health, include a short \
             'Sources' list with reputable/peer-reviewed references."
                .to_string(),
        );
    }

    match profile.faith_module {
        FaithModule::None => fragments.push(
            "Do not add any faith content unless explicitly requested by the user or \
             parent."
                .to_string(),
        ),
        FaithModule::Custom => {
            let mut fragment = format!(
                "If the parent toggles 'Faith Companion', append a short '{}' \
                 perspective.",
                profile.faith_module.as_str()
            );
            let note = profile.custom_faith_note.trim();
            if !note.is_empty() {
                fragment.push_str(" Parent note: ");
                fragment.push_str(note);
            }
            fragments.push(fragment);
        }
        _ => fragments.push(format!(
            "If the parent toggles 'Faith Companion', append a short '{}' perspective.",
            profile.faith_module.as_str()
        )),
    }

    fragments.push(
        "If a topic is blocked by policy, politely refuse and suggest discussing with \
         a parent."
            .to_string(),
    );

    fragments.join("\n")
}
