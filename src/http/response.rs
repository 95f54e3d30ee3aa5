use crate::config::ServerConfig;
use crate::http::cgi::{CgiExecutor, CgiOutput};
use crate::http::dispatch::Dispatch;
use crate::http::request::{CONTENT_LENGTH, CONTENT_TYPE};
use crate::http::status::Status;
use crate::http::{HTTP_VERSION, LINE_TERMINATOR};
use bytes::Bytes;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use tracing::{debug, error, warn};

const HTML: &str = "text/html";

/// Response payload. A file body is the open handle itself; it is streamed at
/// write time and closed when the response is written or dropped.
#[derive(Debug)]
pub enum Body {
    Empty,
    Bytes(Bytes),
    File { file: File, len: u64 },
}

impl Body {
    pub fn len(&self) -> u64 {
        match self {
            Body::Empty => 0,
            Body::Bytes(b) => b.len() as u64,
            Body::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
pub struct Response {
    pub status: Status,
    /// Header lines in the order they go on the wire.
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl Response {
    /// Builds a response with the standard header set for `body`.
    pub fn from_parts(status: Status, content_type: &str, body: Body) -> Response {
        let headers = vec![
            (CONTENT_TYPE.to_string(), content_type.to_string()),
            (CONTENT_LENGTH.to_string(), body.len().to_string()),
            ("Connection".to_string(), "close".to_string()),
        ];
        Response {
            status,
            headers,
            body,
        }
    }

    /// Turns a dispatch verdict into a response. Every failure along the way
    /// becomes an error response; nothing here is fatal.
    pub fn build(dispatch: Dispatch, config: &ServerConfig, executor: &dyn CgiExecutor) -> Response {
        match dispatch {
            Dispatch::Static {
                path,
                size,
                content_type,
            } => match Response::static_file(&path, content_type) {
                Ok(resp) => {
                    if resp.body.len() != size {
                        debug!(
                            path = %path.display(),
                            size,
                            now = resp.body.len(),
                            "file changed since stat"
                        );
                    }
                    resp
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!(path = %path.display(), "file vanished before it could be opened");
                    Response::error(Status::NOT_FOUND, config)
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "can't open static file");
                    Response::error(Status::SERVER_ERROR, config)
                }
            },
            Dispatch::Cgi(request) => match executor.execute(&request) {
                Ok(output) => Response::from_cgi(output, config),
                Err(e) => {
                    error!(path = %request.path.display(), error = %e, "CGI execution failed");
                    Response::error(Status::SERVER_ERROR, config)
                }
            },
            Dispatch::Error(status) => Response::error(status, config),
        }
    }

    /// Opens `path` and advertises the length of the opened file, not of any
    /// earlier stat.
    pub fn static_file(path: &Path, content_type: &str) -> io::Result<Response> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        Ok(Response::from_parts(
            Status::OK,
            content_type,
            Body::File { file, len },
        ))
    }

    pub fn from_cgi(output: CgiOutput, config: &ServerConfig) -> Response {
        if !output.success() {
            warn!(exit_status = output.exit_status, "CGI program reported failure");
            return Response::error(Status::SERVER_ERROR, config);
        }
        Response::from_parts(Status::OK, HTML, Body::Bytes(output.stdout))
    }

    /// Error response with the page configured for `status`. An unreadable
    /// page is replaced by a generated one.
    pub fn error(status: Status, config: &ServerConfig) -> Response {
        let page = config.error_page(status);
        let body = match fs::read(&page) {
            Ok(content) => Bytes::from(content),
            Err(e) => {
                warn!(page = %page.display(), error = %e, "error page unreadable, using fallback");
                fallback_page(status)
            }
        };
        Response::from_parts(status, HTML, Body::Bytes(body))
    }

    /// Drops the payload but keeps the headers, as a HEAD response does. A
    /// file body is closed here.
    pub fn without_body(mut self) -> Response {
        self.body = Body::Empty;
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The description comes from the status table, keyed by code.
    pub fn status_line(&self) -> String {
        format!(
            "{} {}{}",
            HTTP_VERSION,
            Status::from_code(self.status.code_num),
            LINE_TERMINATOR
        )
    }

    /// Status line, header lines and the blank separator.
    pub fn head_bytes(&self) -> Vec<u8> {
        let mut head = Vec::with_capacity(64 + self.headers.len() * 32);
        head.extend(self.status_line().as_bytes());
        for (key, value) in &self.headers {
            head.extend(format!("{}: {}{}", key, value, LINE_TERMINATOR).as_bytes());
        }
        head.extend(LINE_TERMINATOR.as_bytes());
        head
    }

    /// Serializes the response onto `w` and consumes it, releasing any file
    /// handle whether or not the write succeeds. Returns the bytes written.
    ///
    /// A file that yields fewer bytes than its advertised length is an
    /// `UnexpectedEof` error: the peer got a short body.
    pub fn write_to<W: Write>(self, w: &mut W) -> io::Result<u64> {
        let head = self.head_bytes();
        w.write_all(&head)?;
        let mut written = head.len() as u64;

        match self.body {
            Body::Empty => {}
            Body::Bytes(b) => {
                w.write_all(&b)?;
                written += b.len() as u64;
            }
            // io::copy uses sendfile/splice for File to TcpStream on Linux.
            Body::File { file, len } => {
                let copied = io::copy(&mut file.take(len), w)?;
                written += copied;
                if copied < len {
                    return Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("file ended after {} of {} bytes", copied, len),
                    ));
                }
            }
        }

        w.flush()?;
        Ok(written)
    }
}

fn fallback_page(status: Status) -> Bytes {
    Bytes::from(format!(
        "<html><head><title>{0}</title></head><body><h1>{0}</h1></body></html>\n",
        Status::from_code(status.code_num)
    ))
}
