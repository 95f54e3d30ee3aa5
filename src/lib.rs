//! minihttpd - a small HTTP/1.x file server core.
//!
//! Reads one request per connection, serves static files from a document root
//! and hands requests that need a program run to a pluggable CGI executor.

pub mod concurrency;
pub mod config;
pub mod http;
