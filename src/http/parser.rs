use crate::http::line_reader::{Line, LineReader};
use crate::http::method::Method;
use crate::http::request::{split_uri, Headers, Request, CONTENT_LENGTH};
use crate::http::status::Status;
use bytes::Bytes;
use std::io::{self, Read};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("connection closed while reading the {0}")]
    ConnectionClosed(&'static str),
    #[error("read failed: {0}")]
    Io(#[from] io::Error),
    #[error("malformed request line: {0:?}")]
    BadRequestLine(String),
    #[error("invalid Content-Length value: {0:?}")]
    InvalidContentLength(String),
    #[error("request body shorter than the declared {0} bytes")]
    TruncatedBody(usize),
    #[error("declared body of {declared} bytes exceeds the {limit} byte limit")]
    BodyTooLarge { declared: usize, limit: usize },
}

impl ParseError {
    /// Connection-fatal errors leave nothing to answer: the caller just closes
    /// the stream.
    pub fn is_connection_fatal(&self) -> bool {
        matches!(
            self,
            ParseError::ConnectionClosed(_) | ParseError::Io(_) | ParseError::TruncatedBody(_)
        )
    }

    /// Status to answer with, for errors that still allow a response.
    pub fn status(&self) -> Option<Status> {
        match self {
            _ if self.is_connection_fatal() => None,
            ParseError::BodyTooLarge { .. } => Some(Status::PAYLOAD_TOO_LARGE),
            _ => Some(Status::BAD_REQUEST),
        }
    }
}

#[derive(Debug)]
struct RequestLine {
    raw: String,
    method: Method,
    uri: String,
    version: String,
}

enum State {
    AwaitingRequestLine,
    AwaitingHeaders(RequestLine, Headers),
    AwaitingBody(RequestLine, Headers, usize),
    Complete(Request),
}

/// Reads one request off `reader`.
///
/// The parser walks request line, headers and body in that order. A failure
/// anywhere ends the walk; [`ParseError::is_connection_fatal`] tells the caller
/// whether an error response can still be sent. Bodies declared larger than
/// `max_body` are refused before any of them is read.
pub fn parse_request<R: Read>(
    reader: &mut LineReader<R>,
    max_body: usize,
) -> Result<Request, ParseError> {
    let mut state = State::AwaitingRequestLine;

    loop {
        state = match state {
            State::AwaitingRequestLine => {
                let line = next_line(reader, "request line")?;
                debug!(request_line = %line, "received request line");
                State::AwaitingHeaders(parse_request_line(line)?, Headers::new())
            }
            State::AwaitingHeaders(head, mut headers) => {
                let line = next_line(reader, "headers")?;
                if line.is_empty() {
                    let content_length = content_length(&headers)?;
                    State::AwaitingBody(head, headers, content_length)
                } else {
                    parse_header_line(&line, &mut headers);
                    State::AwaitingHeaders(head, headers)
                }
            }
            State::AwaitingBody(head, headers, content_length) => {
                let body = if head.method == Method::POST && content_length > 0 {
                    if content_length > max_body {
                        return Err(ParseError::BodyTooLarge {
                            declared: content_length,
                            limit: max_body,
                        });
                    }
                    debug!(content_length, "reading request body");
                    read_body(reader, content_length)?
                } else {
                    if head.method == Method::POST {
                        warn!("POST request without a body");
                    }
                    Bytes::new()
                };
                State::Complete(assemble(head, headers, content_length, body))
            }
            State::Complete(request) => return Ok(request),
        };
    }
}

fn next_line<R: Read>(reader: &mut LineReader<R>, stage: &'static str) -> Result<String, ParseError> {
    match reader.read_line()? {
        Line::Text(line) => Ok(line),
        Line::EndOfStream => Err(ParseError::ConnectionClosed(stage)),
    }
}

fn parse_request_line(raw: String) -> Result<RequestLine, ParseError> {
    let parts: Vec<String> = raw.split_whitespace().map(String::from).collect();

    match <[String; 3]>::try_from(parts) {
        Ok([method, uri, version]) => Ok(RequestLine {
            method: Method::from_token(&method),
            uri,
            version,
            raw,
        }),
        Err(_) => Err(ParseError::BadRequestLine(raw)),
    }
}

fn parse_header_line(line: &str, headers: &mut Headers) {
    match line.split_once(": ") {
        Some((name, value)) => headers.push(line, name, value),
        None => warn!(header = %line, "skipping header line without ': ' separator"),
    }
}

fn content_length(headers: &Headers) -> Result<usize, ParseError> {
    match headers.get_ignore_case(CONTENT_LENGTH) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ParseError::InvalidContentLength(raw.to_string())),
        None => Ok(0),
    }
}

fn read_body<R: Read>(reader: &mut LineReader<R>, len: usize) -> Result<Bytes, ParseError> {
    reader.read_body(len).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => ParseError::TruncatedBody(len),
        _ => ParseError::Io(e),
    })
}

fn assemble(head: RequestLine, headers: Headers, content_length: usize, body: Bytes) -> Request {
    let (path, query_string) = split_uri(&head.uri);
    Request {
        path: path.to_string(),
        query_string: query_string.to_string(),
        request_line: head.raw,
        method: head.method,
        uri: head.uri,
        version: head.version,
        headers,
        content_length,
        body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const LIMIT: usize = 1024;

    fn parse(raw: &[u8]) -> Result<Request, ParseError> {
        let mut rdr = LineReader::new(Cursor::new(raw.to_vec()));
        parse_request(&mut rdr, LIMIT)
    }

    #[test]
    fn parse_simple_get() {
        let req = parse(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n").unwrap();

        assert_eq!(req.method, Method::GET);
        assert_eq!(req.uri, "/index.html");
        assert_eq!(req.path, "/index.html");
        assert_eq!(req.version, "HTTP/1.1");
        assert_eq!(req.get_header("Host"), Some("example.com"));
        assert!(req.body.is_empty());
    }

    #[test]
    fn method_is_uppercased() {
        let req = parse(b"post /x HTTP/1.0\r\n\r\n").unwrap();
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.request_line, "post /x HTTP/1.0");
    }

    #[test]
    fn two_tokens_is_bad_request() {
        let err = parse(b"GET /\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::BadRequestLine(_)));
        assert_eq!(err.status(), Some(Status::BAD_REQUEST));
    }

    #[test]
    fn four_tokens_is_bad_request() {
        let err = parse(b"GET / HTTP/1.1 extra\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::BadRequestLine(_)));
    }

    #[test]
    fn malformed_header_is_skipped() {
        let req = parse(b"GET / HTTP/1.1\r\nBroken\r\nHost: x\r\n\r\n").unwrap();
        assert_eq!(req.headers.lines(), ["Host: x"]);
        assert_eq!(req.get_header("Host"), Some("x"));
    }

    #[test]
    fn header_split_on_first_separator() {
        let req = parse(b"GET / HTTP/1.1\r\nX-Thing: a: b\r\n\r\n").unwrap();
        assert_eq!(req.get_header("X-Thing"), Some("a: b"));
    }

    #[test]
    fn post_body_is_read_exactly() {
        let req = parse(b"POST /submit?x=1 HTTP/1.1\r\nContent-Length: 4\r\n\r\nabcdEXTRA").unwrap();
        assert_eq!(req.content_length, 4);
        assert_eq!(&req.body[..], b"abcd");
        assert_eq!(req.query_string, "x=1");
        assert_eq!(req.path, "/submit");
    }

    #[test]
    fn post_without_length_has_empty_body() {
        let req = parse(b"POST /submit HTTP/1.1\r\n\r\nignored").unwrap();
        assert_eq!(req.content_length, 0);
        assert!(req.body.is_empty());
    }

    #[test]
    fn post_with_zero_length_reads_nothing() {
        let req = parse(b"POST /s HTTP/1.1\r\nContent-Length: 0\r\n\r\nXYZ").unwrap();
        assert_eq!(req.content_length, 0);
        assert!(req.body.is_empty());
    }

    #[test]
    fn body_over_limit_is_refused() {
        let raw = format!("POST /s HTTP/1.1\r\nContent-Length: {}\r\n\r\n", LIMIT + 1);
        let err = parse(raw.as_bytes()).unwrap_err();
        assert!(matches!(err, ParseError::BodyTooLarge { declared, limit: LIMIT } if declared == LIMIT + 1));
        assert!(!err.is_connection_fatal());
        assert_eq!(err.status(), Some(Status::PAYLOAD_TOO_LARGE));
    }

    #[test]
    fn body_at_limit_is_read() {
        let mut raw = format!("POST /s HTTP/1.1\r\nContent-Length: {}\r\n\r\n", LIMIT).into_bytes();
        raw.extend(vec![b'z'; LIMIT]);
        let req = parse(&raw).unwrap();
        assert_eq!(req.body.len(), LIMIT);
    }

    #[test]
    fn get_with_length_does_not_read_body() {
        let req = parse(b"GET / HTTP/1.1\r\nContent-Length: 3\r\n\r\n").unwrap();
        assert!(req.body.is_empty());
    }

    #[test]
    fn truncated_body_is_fatal() {
        let err = parse(b"POST / HTTP/1.1\r\nContent-Length: 10\r\n\r\nabc").unwrap_err();
        assert!(matches!(err, ParseError::TruncatedBody(10)));
        assert!(err.is_connection_fatal());
    }

    #[test]
    fn eof_in_headers_is_fatal() {
        let err = parse(b"GET / HTTP/1.1\r\nHost: x\r\n").unwrap_err();
        assert!(matches!(err, ParseError::ConnectionClosed("headers")));
        assert_eq!(err.status(), None);
    }

    #[test]
    fn empty_stream_is_fatal() {
        let err = parse(b"").unwrap_err();
        assert!(matches!(err, ParseError::ConnectionClosed("request line")));
    }

    #[test]
    fn bad_content_length_is_bad_request() {
        let err = parse(b"POST / HTTP/1.1\r\nContent-Length: ten\r\n\r\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidContentLength(_)));
        assert!(!err.is_connection_fatal());
    }
}
