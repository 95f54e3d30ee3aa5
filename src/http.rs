//! HTTP/1.x message handling: reading a request off a stream, deciding how to
//! serve it and modelling the response.
//!
//! ```text
//! stream -> LineReader -> parser -> Request -> dispatch::classify -> Dispatch
//!                                                                      |
//! stream <- Response::write_to <- Response::build <--------------------+
//! ```

pub mod cgi;
pub mod dispatch;
pub mod line_reader;
pub mod method;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod server;
pub mod status;

pub const BUFFER_SIZE: usize = 1024;
pub const HTTP_VERSION: &str = "HTTP/1.1";
pub const LINE_TERMINATOR: &str = "\r\n";

pub use dispatch::Dispatch;
pub use request::Request;
pub use response::Response;
pub use status::Status;
