//! HTTP 服务器 - 使用 Axum 提供中介与审批端点

use std::sync::Arc;

use axum::Router;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::ServerConfig;
use crate::http::routes;
use crate::service::MediationService;

/// HTTP 服务共享状态
#[derive(Clone)]
pub struct HttpServerState {
    pub mediation_service: Arc<MediationService>,
    pub config: Arc<ServerConfig>,
}

/// KidGate HTTP 服务器
pub struct HttpServer {
    state: HttpServerState,
    host: String,
    port: u16,
}

impl HttpServer {
    pub fn new(state: HttpServerState, host: String, port: u16) -> Self {
        Self { state, host, port }
    }

    /// 启动 HTTP 服务器
    pub async fn start(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let app = Router::new()
            .merge(routes::create_routes())
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone());

        let addr = format!("{}:{}", self.host, self.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!("🌐 KidGate HTTP 服务器启动在 {}", addr);

        axum::serve(listener, app).await?;

        Ok(())
    }
}
