// src/main.rs

//! # Verifiable Credential Lifecycle - Main Entry Point
//!
//! Loads the configuration and starts the API server.
//!
//! ## Environment Variables
//! - `PORT`: (Optional) listening port (default: 3000)
//! - `VCL__HOST`: (Optional) bind address (default: 0.0.0.0)
//! - `VCL__RESOLVER__REGISTRY_URL`: (Optional) EBSI DID registry endpoint
//! - `VCL__ISSUER__KID_SCOPE`, `VCL__PRESENTATION__KID_SCOPE`: `issuer` or `bare`
//! - `RUST_LOG`: log filter, e.g. `info` or `vc_lifecycle=debug`

use anyhow::Context;
use dotenv::dotenv;
use log::info;
use std::net::SocketAddr;
use vc_lifecycle::{ApiServer, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();
    env_logger::init();

    let config = ServiceConfig::load().context("invalid service configuration")?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    info!("resolving did:ebsi against {}", config.resolver.registry_url);

    let api_server = ApiServer::from_config(&config)?;
    api_server
        .run(addr)
        .await
        .with_context(|| format!("API server on {addr} stopped"))
}
