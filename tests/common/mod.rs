#![allow(dead_code)]

use minihttpd::config::ServerConfig;
use minihttpd::http::cgi::{CgiExecutor, CgiOutput, CgiRequest};
use std::io::{self, Cursor, Read, Write};
use std::path::Path;
use std::sync::Mutex;

/// In-memory connection: reads come from a fixed request, writes are kept.
pub struct MockStream {
    input: Cursor<Vec<u8>>,
    pub output: Vec<u8>,
}

impl MockStream {
    pub fn new(request: &[u8]) -> Self {
        Self {
            input: Cursor::new(request.to_vec()),
            output: Vec::new(),
        }
    }

    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    /// Splits the written response into head and body at the blank line.
    pub fn split_response(&self) -> (String, Vec<u8>) {
        let pos = self
            .output
            .windows(4)
            .position(|w| w == b"\r\n\r\n")
            .expect("response has no blank separator");
        let head = String::from_utf8_lossy(&self.output[..pos]).into_owned();
        (head, self.output[pos + 4..].to_vec())
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Echoes the request body back and remembers what it was asked to run.
#[derive(Default)]
pub struct RecordingCgi {
    pub calls: Mutex<Vec<CgiRequest>>,
}

impl CgiExecutor for RecordingCgi {
    fn execute(&self, request: &CgiRequest) -> anyhow::Result<CgiOutput> {
        self.calls.lock().unwrap().push(request.clone());
        Ok(CgiOutput {
            exit_status: 0,
            stdout: request.body.clone(),
        })
    }
}

pub fn config(root: &Path) -> ServerConfig {
    ServerConfig {
        doc_root: root.to_path_buf(),
        ..ServerConfig::default()
    }
}
