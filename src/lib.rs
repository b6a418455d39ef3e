pub mod cli;
pub mod config;
pub mod error;
pub mod http;
pub mod infra;
pub mod logging;
pub mod model;
pub mod moderation;
pub mod policy;
pub mod security;
pub mod service;
pub mod upstream;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use model::{ChatTurn, FaithModule, Profile, Role, Rule, RuleMode};
pub use moderation::{ModerationClient, ModerationConfig, ModerationVerdict};
pub use security::{RateLimitConfig, SlidingWindowRateLimiter};
pub use service::{
    ApprovalGate, GateState, MediationReply, MediationRequest, MediationService, SubmitOutcome,
};
