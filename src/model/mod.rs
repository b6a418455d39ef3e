//! 领域模型：对话消息、用户档案、策略规则

pub mod chat;
pub mod profile;
pub mod rule;

pub use chat::{ChatTurn, Role};
pub use profile::{FaithModule, Profile};
pub use rule::{Rule, RuleMode};
