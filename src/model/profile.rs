use serde::{Deserialize, Serialize};

/// 信仰模块（封闭枚举）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaithModule {
    #[default]
    None,
    ChristianReformed,
    Jewish,
    Muslim,
    Hindu,
    Buddhist,
    Custom,
}

impl FaithModule {
    /// 线上协议使用的名称（与系统提示词中的写法一致）
    pub fn as_str(&self) -> &'static str {
        match self {
            FaithModule::None => "none",
            FaithModule::ChristianReformed => "christian_reformed",
            FaithModule::Jewish => "jewish",
            FaithModule::Muslim => "muslim",
            FaithModule::Hindu => "hindu",
            FaithModule::Buddhist => "buddhist",
            FaithModule::Custom => "custom",
        }
    }
}

/// 用户档案
///
/// 每个会话同一时刻只有一个活跃 Profile；切换档案不影响已有对话记录。
/// 档案由家长端维护，管线只读。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub age: u8,
    /// 启用的规则 ID（按档案内的顺序注入系统提示词）
    #[serde(default)]
    pub enabled_rule_ids: Vec<String>,
    /// 回答须带引用来源
    #[serde(default)]
    pub require_citations: bool,
    /// 敏感话题须家长审批
    #[serde(default)]
    pub require_parent_for_sensitive: bool,
    #[serde(default)]
    pub faith_module: FaithModule,
    /// 仅 faith_module = custom 时使用的备注
    #[serde(default)]
    pub custom_faith_note: String,
}

impl Profile {
    /// 请求未携带档案时使用的内置默认档案
    pub fn fallback() -> Self {
        Self {
            id: "default_guest".to_string(),
            name: "Guest".to_string(),
            age: 12,
            enabled_rule_ids: vec![
                "no_sexual_topics".to_string(),
                "violence_filter".to_string(),
                "political_neutrality".to_string(),
            ],
            require_citations: false,
            require_parent_for_sensitive: true,
            faith_module: FaithModule::None,
            custom_faith_note: String::new(),
        }
    }

    /// 内置示例档案（家长端初始数据，也用于测试）
    pub fn starter_profiles() -> Vec<Self> {
        vec![
            Self {
                id: "p_8_primary".to_string(),
                name: "Paige (8)".to_string(),
                age: 8,
                enabled_rule_ids: vec![
                    "no_sexual_topics".to_string(),
                    "violence_filter".to_string(),
                    "political_neutrality".to_string(),
                    "scholarly_citations".to_string(),
                    "ask_parent_redirect".to_string(),
                ],
                require_citations: true,
                require_parent_for_sensitive: true,
                faith_module: FaithModule::ChristianReformed,
                custom_faith_note: String::new(),
            },
            Self {
                id: "d_12_middle".to_string(),
                name: "David (12)".to_string(),
                age: 12,
                enabled_rule_ids: vec![
                    "no_sexual_topics".to_string(),
                    "violence_filter".to_string(),
                    "political_neutrality".to_string(),
                    "scholarly_citations".to_string(),
                ],
                require_citations: true,
                require_parent_for_sensitive: true,
                faith_module: FaithModule::None,
                custom_faith_note: String::new(),
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faith_module_wire_names() {
        let json = serde_json::to_string(&FaithModule::ChristianReformed).unwrap();
        assert_eq!(json, "\"christian_reformed\"");

        let parsed: FaithModule = serde_json::from_str("\"buddhist\"").unwrap();
        assert_eq!(parsed, FaithModule::Buddhist);
    }

    #[test]
    fn test_profile_deserialize_with_defaults() {
        let profile: Profile =
            serde_json::from_str(r#"{"id":"p1","age":9}"#).unwrap();
        assert_eq!(profile.age, 9);
        assert!(profile.enabled_rule_ids.is_empty());
        assert!(!profile.require_citations);
        assert_eq!(profile.faith_module, FaithModule::None);
    }

    #[test]
    fn test_starter_profiles_reference_known_rules() {
        for profile in Profile::starter_profiles() {
            for rule_id in &profile.enabled_rule_ids {
                assert!(
                    crate::model::rule::get_rule(rule_id).is_some(),
                    "unknown rule id: {}",
                    rule_id
                );
            }
        }
    }
}
