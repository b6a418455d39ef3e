//! HTTP 服务

pub mod client_ip;
pub mod routes;
pub mod server;

pub use server::{HttpServer, HttpServerState};
