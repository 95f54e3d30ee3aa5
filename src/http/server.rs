use crate::concurrency::ThreadPool;
use crate::config::ServerConfig;
use crate::http::cgi::CgiExecutor;
use crate::http::dispatch;
use crate::http::line_reader::LineReader;
use crate::http::method::Method;
use crate::http::parser::{parse_request, ParseError};
use crate::http::response::Response;
use anyhow::Context;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct Server {
    listener: TcpListener,
    config: Arc<ServerConfig>,
    executor: Arc<dyn CgiExecutor>,
    pool: ThreadPool,
}

impl Server {
    pub fn bind(config: ServerConfig, executor: Arc<dyn CgiExecutor>) -> anyhow::Result<Server> {
        let addr = ("0.0.0.0", config.port);
        let listener = TcpListener::bind(addr)
            .with_context(|| format!("can't bind port {}", config.port))?;
        let pool = ThreadPool::new(config.workers).context("can't start worker threads")?;

        Ok(Server {
            listener,
            config: Arc::new(config),
            executor,
            pool,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub fn run(self) -> anyhow::Result<()> {
        info!(
            addr = %self.local_addr()?,
            root = %self.config.doc_root.display(),
            workers = self.pool.size(),
            "listening"
        );

        for stream in self.listener.incoming() {
            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    continue;
                }
            };

            let config = Arc::clone(&self.config);
            let executor = Arc::clone(&self.executor);
            self.pool
                .execute(move || process_incoming(stream, &config, executor.as_ref()))
                .context("can't hand connection to a worker")?;
        }
        Ok(())
    }
}

fn process_incoming(mut stream: TcpStream, config: &ServerConfig, executor: &dyn CgiExecutor) {
    let peer = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());
    debug!(%peer, "accepted connection");

    if let Err(e) = stream.set_read_timeout(config.read_timeout) {
        warn!(%peer, error = %e, "can't set read timeout");
    }

    match handle_connection(&mut stream, config, executor) {
        Ok(Outcome::Responded { status, bytes }) => {
            debug!(%peer, status, bytes, "connection done");
        }
        Ok(Outcome::Dropped) => debug!(%peer, "connection dropped without response"),
        Err(e) => warn!(%peer, error = %e, "can't write response"),
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Responded { status: u16, bytes: u64 },
    /// Connection-fatal read failure; nothing was written.
    Dropped,
}

/// Serves a single request on `stream`: parse, classify, build and write the
/// response. The connection is not reused afterwards.
///
/// Read failures never surface as `Err`; only a failed write does.
pub fn handle_connection<S: Read + Write>(
    stream: &mut S,
    config: &ServerConfig,
    executor: &dyn CgiExecutor,
) -> std::io::Result<Outcome> {
    let parsed = {
        let mut reader = LineReader::new(&mut *stream);
        parse_request(&mut reader, config.max_body_bytes)
    };

    let response = match parsed {
        Ok(request) => {
            let dispatch = dispatch::classify(&request, config);
            let response = Response::build(dispatch, config, executor);
            if response.status.is_error() {
                warn!(
                    method = %request.method,
                    uri = %request.uri,
                    status = response.status.code_num,
                    "request failed"
                );
            } else {
                info!(
                    method = %request.method,
                    uri = %request.uri,
                    status = response.status.code_num,
                    "request"
                );
            }
            if request.method == Method::HEAD {
                response.without_body()
            } else {
                response
            }
        }
        Err(e) => match e.status() {
            Some(status) => {
                warn!(error = %e, "rejecting request");
                Response::error(status, config)
            }
            None => {
                log_fatal(&e);
                return Ok(Outcome::Dropped);
            }
        },
    };

    let status = response.status.code_num;
    let bytes = response.write_to(stream)?;
    Ok(Outcome::Responded { status, bytes })
}

fn log_fatal(e: &ParseError) {
    match e {
        ParseError::ConnectionClosed(_) => debug!(error = %e, "client went away"),
        _ => warn!(error = %e, "aborting connection"),
    }
}
