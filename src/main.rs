use anyhow::Context;
use minihttpd::config::ServerConfig;
use minihttpd::http::cgi::DisabledCgi;
use minihttpd::http::server::Server;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = ServerConfig::from_env()
        .and_then(|cfg| cfg.with_args(&args))
        .context("invalid configuration")?;

    if !config.doc_root.is_dir() {
        tracing::warn!(root = %config.doc_root.display(), "document root is not a directory");
    }

    let server = Server::bind(config, Arc::new(DisabledCgi))?;
    server.run()
}
