use crate::http::method::Method;
use bytes::Bytes;
use std::collections::HashMap;

pub const CONTENT_LENGTH: &str = "Content-Length";
pub const CONTENT_TYPE: &str = "Content-Type";

/// Request headers, kept twice: the raw lines in wire order, and a name to
/// value map for lookups. Names in the map are case-sensitive as received
/// and a repeated name keeps its last value.
#[derive(Debug, Default, Clone)]
pub struct Headers {
    lines: Vec<String>,
    map: HashMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, line: &str, name: &str, value: &str) {
        self.lines.push(line.to_string());
        self.map.insert(name.to_string(), value.to_string());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.map.get(name).map(|v| v.as_str())
    }

    /// Exact match first, then any spelling of the name.
    pub fn get_ignore_case(&self, name: &str) -> Option<&str> {
        self.get(name).or_else(|| {
            self.map
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        })
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Request {
    pub request_line: String,
    pub method: Method,
    /// Request target exactly as sent.
    pub uri: String,
    /// `uri` up to the first `?`, still percent-encoded.
    pub path: String,
    pub query_string: String,
    pub version: String,
    pub headers: Headers,
    pub content_length: usize,
    pub body: Bytes,
}

impl Request {
    pub fn get_header(&self, k: &str) -> Option<&str> {
        self.headers.get(k)
    }

    /// The method/query half of CGI eligibility: POST always, GET only with a
    /// query string. Executability of the target is checked at dispatch.
    pub fn wants_cgi(&self) -> bool {
        match self.method {
            Method::POST => true,
            Method::GET => !self.query_string.is_empty(),
            _ => false,
        }
    }
}

/// Splits a request target into path and query string at the first `?`.
pub fn split_uri(uri: &str) -> (&str, &str) {
    uri.split_once('?').unwrap_or((uri, ""))
}
