use crate::http::status::Status;
use anyhow::{bail, Context};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ENV_PORT: &str = "MINIHTTPD_PORT";
pub const ENV_ROOT: &str = "MINIHTTPD_ROOT";
pub const ENV_HOME_PAGE: &str = "MINIHTTPD_HOME_PAGE";
pub const ENV_PAGE_400: &str = "MINIHTTPD_PAGE_400";
pub const ENV_PAGE_404: &str = "MINIHTTPD_PAGE_404";
pub const ENV_PAGE_500: &str = "MINIHTTPD_PAGE_500";
pub const ENV_WORKERS: &str = "MINIHTTPD_WORKERS";
pub const ENV_READ_TIMEOUT: &str = "MINIHTTPD_READ_TIMEOUT_SECS";
pub const ENV_MAX_BODY: &str = "MINIHTTPD_MAX_BODY_BYTES";

/// Everything a connection handler needs to know about the server. Built once
/// at startup and shared read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub doc_root: PathBuf,
    pub home_page: String,
    pub bad_request_page: String,
    pub not_found_page: String,
    pub server_error_page: String,
    pub workers: usize,
    /// `None` lets a stalled client block its worker forever.
    pub read_timeout: Option<Duration>,
    /// Largest request body read into memory.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            doc_root: PathBuf::from("wwwroot"),
            home_page: "index.html".to_string(),
            bad_request_page: "400.html".to_string(),
            not_found_page: "404.html".to_string(),
            server_error_page: "500.html".to_string(),
            workers: 10,
            read_timeout: Some(Duration::from_secs(5)),
            max_body_bytes: 8 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    /// Builds a config from any key lookup, falling back to the defaults for
    /// keys that are not set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let mut cfg = ServerConfig::default();

        if let Some(v) = lookup(ENV_PORT) {
            cfg.port = parse_value(ENV_PORT, &v)?;
        }
        if let Some(v) = lookup(ENV_ROOT) {
            cfg.doc_root = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_HOME_PAGE) {
            cfg.home_page = v;
        }
        if let Some(v) = lookup(ENV_PAGE_400) {
            cfg.bad_request_page = v;
        }
        if let Some(v) = lookup(ENV_PAGE_404) {
            cfg.not_found_page = v;
        }
        if let Some(v) = lookup(ENV_PAGE_500) {
            cfg.server_error_page = v;
        }
        if let Some(v) = lookup(ENV_WORKERS) {
            cfg.workers = parse_value(ENV_WORKERS, &v)?;
        }
        if let Some(v) = lookup(ENV_READ_TIMEOUT) {
            let secs: u64 = parse_value(ENV_READ_TIMEOUT, &v)?;
            cfg.read_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(v) = lookup(ENV_MAX_BODY) {
            cfg.max_body_bytes = parse_value(ENV_MAX_BODY, &v)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Applies command line arguments. The only positional argument is the
    /// port.
    pub fn with_args(mut self, args: &[String]) -> anyhow::Result<Self> {
        if let Some(port) = args.get(1) {
            self.port = parse_value("port argument", port)?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.workers == 0 {
            bail!("{} must be greater than zero", ENV_WORKERS);
        }
        if self.home_page.is_empty() {
            bail!("{} must not be empty", ENV_HOME_PAGE);
        }
        Ok(())
    }

    /// Page served for an error status. 400, 404 and 500 each have their own
    /// page; other client errors share the 400 page and other server errors
    /// the 500 page.
    pub fn error_page(&self, status: Status) -> PathBuf {
        let page = match status.code_num {
            404 => &self.not_found_page,
            400..=499 => &self.bad_request_page,
            _ => &self.server_error_page,
        };
        self.doc_root.join(page)
    }
}

fn parse_value<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("invalid value {:?} for {}", raw, key))
}
