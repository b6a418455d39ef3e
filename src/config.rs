use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::moderation::ModerationConfig;
use crate::security::RateLimitConfig;
use crate::upstream::openai::DEFAULT_MODEL;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 服务器监听地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
    /// 日志级别
    pub log_level: String,
    /// 上游模型配置
    pub upstream: UpstreamConfig,
    /// 内容审核配置
    pub moderation: ModerationConfig,
    /// 限流配置
    pub rate_limit: RateLimitConfig,
    /// 家长验证配置
    pub parent: ParentConfig,
}

/// 上游模型配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// OpenAI API Key（敏感，建议用环境变量 OPENAI_API_KEY 注入）
    #[serde(default)]
    pub api_key: String,
    /// 模型名
    pub model: String,
    /// 采样温度（引用准确性要求高时取低值）
    pub temperature: f32,
    /// 输出 token 上限
    pub max_tokens: u32,
    /// 单次调用超时（秒）
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.6,
            max_tokens: 500,
            timeout_secs: 30,
        }
    }
}

/// 家长验证配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParentConfig {
    /// 家长 PIN（敏感，建议用环境变量 PARENT_PIN 注入）
    #[serde(default)]
    pub pin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8090,
            log_level: "info".to_string(),
            upstream: UpstreamConfig::default(),
            moderation: ModerationConfig::default(),
            rate_limit: RateLimitConfig::default(),
            parent: ParentConfig::default(),
        }
    }
}

impl ServerConfig {
    /// 创建新的服务器配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从 TOML 文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("无法读取配置文件: {:?}", path.as_ref()))?;

        let toml_config: TomlConfig =
            toml::from_str(&content).with_context(|| "配置文件格式错误")?;

        Ok(toml_config.into())
    }

    /// 从环境变量合并配置（KIDGATE_ 前缀；密钥用专用变量）
    pub fn merge_from_env(&mut self) {
        if let Ok(host) = env::var("KIDGATE_HOST") {
            self.host = host;
        }
        if let Ok(port) = env::var("KIDGATE_PORT") {
            self.port = port.parse().unwrap_or(self.port);
        }
        if let Ok(log_level) = env::var("KIDGATE_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(model) = env::var("KIDGATE_MODEL") {
            self.upstream.model = model;
        }
        // 凭证与密钥只从环境读取，不建议写进配置文件
        if let Ok(api_key) = env::var("OPENAI_API_KEY") {
            self.upstream.api_key = api_key;
        }
        if let Ok(pin) = env::var("PARENT_PIN") {
            self.parent.pin = pin;
        }
    }

    /// 从命令行参数合并配置
    pub fn merge_from_cli(&mut self, cli: &crate::cli::Cli) {
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(log_level) = cli.get_log_level() {
            self.log_level = log_level;
        }
    }

    /// 加载配置（按优先级：命令行 > 环境变量 > 配置文件 > 默认值）
    pub fn load(cli: &crate::cli::Cli) -> Result<Self> {
        // 1. 从默认配置开始
        let mut config = Self::new();

        // 2. 从配置文件加载（如果指定或默认文件存在）
        if let Some(config_file) = &cli.config_file {
            if Path::new(config_file).exists() {
                info!("📄 从配置文件加载: {}", config_file);
                config = Self::from_toml_file(config_file)?;
            } else {
                tracing::warn!("⚠️ 配置文件不存在: {}", config_file);
            }
        } else if Path::new("config.toml").exists() {
            info!("📄 从默认配置文件加载: config.toml");
            config = Self::from_toml_file("config.toml")?;
        }

        // 3. 从环境变量合并（优先级高于配置文件）
        config.merge_from_env();

        // 4. 从命令行参数合并（最高优先级）
        config.merge_from_cli(cli);

        Ok(config)
    }

    /// 脱敏副本（用于 show-config 等输出场景，密钥一律打码）
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if !config.upstream.api_key.is_empty() {
            config.upstream.api_key = "***".to_string();
        }
        if !config.parent.pin.is_empty() {
            config.parent.pin = "***".to_string();
        }
        config
    }
}

/// TOML 配置文件结构（用于反序列化，字段全部可选）
#[derive(Debug, Deserialize)]
struct TomlConfig {
    server: Option<TomlServerConfig>,
    upstream: Option<TomlUpstreamConfig>,
    moderation: Option<TomlModerationConfig>,
    rate_limit: Option<TomlRateLimitConfig>,
}

#[derive(Debug, Deserialize)]
struct TomlServerConfig {
    host: Option<String>,
    port: Option<u16>,
    log_level: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TomlUpstreamConfig {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TomlModerationConfig {
    enabled: Option<bool>,
    fail_closed: Option<bool>,
    max_chars: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct TomlRateLimitConfig {
    window_secs: Option<u64>,
    max_requests: Option<usize>,
}

impl From<TomlConfig> for ServerConfig {
    fn from(toml: TomlConfig) -> Self {
        let mut config = Self::default();

        if let Some(server) = toml.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(log_level) = server.log_level {
                config.log_level = log_level;
            }
        }

        if let Some(upstream) = toml.upstream {
            if let Some(model) = upstream.model {
                config.upstream.model = model;
            }
            if let Some(temperature) = upstream.temperature {
                config.upstream.temperature = temperature;
            }
            if let Some(max_tokens) = upstream.max_tokens {
                config.upstream.max_tokens = max_tokens;
            }
            if let Some(timeout_secs) = upstream.timeout_secs {
                config.upstream.timeout_secs = timeout_secs;
            }
        }

        if let Some(moderation) = toml.moderation {
            if let Some(enabled) = moderation.enabled {
                config.moderation.enabled = enabled;
            }
            if let Some(fail_closed) = moderation.fail_closed {
                config.moderation.fail_closed = fail_closed;
            }
            if let Some(max_chars) = moderation.max_chars {
                config.moderation.max_chars = max_chars;
            }
        }

        if let Some(rate_limit) = toml.rate_limit {
            if let Some(window_secs) = rate_limit.window_secs {
                config.rate_limit.window_secs = window_secs;
            }
            if let Some(max_requests) = rate_limit.max_requests {
                config.rate_limit.max_requests = max_requests;
            }
        }

        config
    }
}
