use std::fs;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use kidgate::{
    cli::{Cli, Commands},
    config::ServerConfig,
    http::{HttpServer, HttpServerState},
    infra, logging,
    moderation::{ModerationClient, OpenAiModerationProvider},
    security::SlidingWindowRateLimiter,
    service::MediationService,
    upstream::OpenAiCompletionProvider,
};

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env 文件（如果存在）
    let _ = dotenvy::dotenv();

    // 解析命令行参数
    let cli = Cli::parse();

    // 处理子命令
    if let Some(command) = &cli.command {
        match command {
            Commands::GenerateConfig { path } => {
                return generate_config(path);
            }
            Commands::ValidateConfig { path } => {
                return validate_config(path);
            }
            Commands::ShowConfig => {
                return show_config(&cli);
            }
        }
    }

    let log_level = cli.get_log_level().unwrap_or_else(|| "info".to_string());
    let log_format = cli.get_log_format();
    logging::init_logging(&log_level, log_format.as_deref(), cli.quiet)?;

    tracing::info!("🚀 KidGate starting...");

    // 加载配置（按优先级：命令行 > 环境变量 > 配置文件 > 默认值）
    let config = ServerConfig::load(&cli).context("加载配置失败")?;

    // 凭证缺失不阻止启动，但对应端点会返回配置错误
    if config.upstream.api_key.trim().is_empty() {
        tracing::warn!("⚠️ OPENAI_API_KEY 未配置，/api/chat 将返回 500");
    }
    if config.parent.pin.trim().is_empty() {
        tracing::warn!("⚠️ PARENT_PIN 未配置，/api/parent-verify 将返回 500");
    }

    // 显示配置信息（不含密钥）
    tracing::info!("📊 Server Configuration:");
    tracing::info!("  - Listen: {}:{}", config.host, config.port);
    tracing::info!("  - Upstream Model: {}", config.upstream.model);
    tracing::info!(
        "  - Moderation: enabled={}, fail_closed={}",
        config.moderation.enabled,
        config.moderation.fail_closed
    );
    tracing::info!(
        "  - Rate Limit: {} requests / {}s",
        config.rate_limit.max_requests,
        config.rate_limit.window_secs
    );

    // 初始化 Prometheus 指标
    if let Err(e) = infra::metrics::init() {
        tracing::warn!("⚠️ 指标初始化失败: {}", e);
    }

    let state = HttpServerState {
        mediation_service: Arc::new(build_mediation_service(&config)),
        config: Arc::new(config.clone()),
    };
    let server = HttpServer::new(state, config.host.clone(), config.port);

    if let Err(e) = server.start().await {
        tracing::error!("❌ 服务器运行失败: {}", e);
        process::exit(1);
    }

    Ok(())
}

/// 按配置组装中介管线
fn build_mediation_service(config: &ServerConfig) -> MediationService {
    let timeout = Duration::from_secs(config.upstream.timeout_secs);

    let moderation = ModerationClient::new(
        Arc::new(OpenAiModerationProvider::new(
            config.upstream.api_key.clone(),
            timeout,
        )),
        config.moderation.clone(),
    );

    let completion = Arc::new(OpenAiCompletionProvider::new(
        config.upstream.api_key.clone(),
        config.upstream.model.clone(),
        config.upstream.temperature,
        config.upstream.max_tokens,
        timeout,
    ));

    MediationService::new(
        SlidingWindowRateLimiter::new(config.rate_limit.clone()),
        moderation,
        completion,
    )
}

/// 生成默认配置文件
fn generate_config(path: &str) -> Result<()> {
    let config = ServerConfig::default();
    let toml_str = toml::to_string_pretty(&config).context("序列化配置失败")?;
    fs::write(path, toml_str).with_context(|| format!("写入配置文件失败: {}", path))?;
    println!("✅ 默认配置已生成: {}", path);
    println!("💡 OPENAI_API_KEY 与 PARENT_PIN 请通过环境变量注入");
    Ok(())
}

/// 验证配置文件
fn validate_config(path: &str) -> Result<()> {
    let config = ServerConfig::from_toml_file(path)?;
    println!("✅ 配置文件有效: {}", path);
    println!("  - Listen: {}:{}", config.host, config.port);
    println!("  - Upstream Model: {}", config.upstream.model);
    Ok(())
}

/// 显示最终配置（合并后、密钥打码）
fn show_config(cli: &Cli) -> Result<()> {
    let config = ServerConfig::load(cli)?;
    let toml_str =
        toml::to_string_pretty(&config.redacted()).context("序列化配置失败")?;
    println!("{}", toml_str);
    Ok(())
}
