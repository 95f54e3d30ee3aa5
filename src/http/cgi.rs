//! The hand-off to an external CGI program.
//!
//! The server decides a request must be executed and packs everything the
//! program needs into a [`CgiRequest`]. Running the program is the job of a
//! [`CgiExecutor`] supplied by the embedder.

use crate::http::method::Method;
use anyhow::anyhow;
use bytes::Bytes;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq)]
pub struct CgiRequest {
    pub method: Method,
    pub path: PathBuf,
    pub query_string: String,
    pub body: Bytes,
    pub content_length: usize,
    pub content_type: Option<String>,
    pub version: String,
}

impl CgiRequest {
    /// CGI/1.1 meta-variables for the program's environment.
    pub fn environment(&self) -> Vec<(String, String)> {
        let mut env = vec![
            ("GATEWAY_INTERFACE".to_string(), "CGI/1.1".to_string()),
            ("REQUEST_METHOD".to_string(), self.method.to_string()),
            ("QUERY_STRING".to_string(), self.query_string.clone()),
            ("SCRIPT_FILENAME".to_string(), self.path.display().to_string()),
            ("SERVER_PROTOCOL".to_string(), self.version.clone()),
        ];
        if self.content_length > 0 {
            env.push(("CONTENT_LENGTH".to_string(), self.content_length.to_string()));
        }
        if let Some(ct) = &self.content_type {
            env.push(("CONTENT_TYPE".to_string(), ct.clone()));
        }
        env
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CgiOutput {
    pub exit_status: i32,
    pub stdout: Bytes,
}

impl CgiOutput {
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}

pub trait CgiExecutor: Send + Sync {
    fn execute(&self, request: &CgiRequest) -> anyhow::Result<CgiOutput>;
}

/// Executor for servers without CGI support. Every CGI request ends in a 500.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledCgi;

impl CgiExecutor for DisabledCgi {
    fn execute(&self, request: &CgiRequest) -> anyhow::Result<CgiOutput> {
        Err(anyhow!(
            "CGI execution is not available for {}",
            request.path.display()
        ))
    }
}
