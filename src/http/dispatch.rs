use crate::config::ServerConfig;
use crate::http::cgi::CgiRequest;
use crate::http::method::Method;
use crate::http::mime;
use crate::http::request::{Request, CONTENT_TYPE};
use crate::http::status::Status;
use std::fs::{self, Metadata};
use std::path::PathBuf;
use tracing::debug;

/// Where a parsed request goes. Built once per request by [`classify`] and
/// consumed by the response builder.
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Static {
        path: PathBuf,
        size: u64,
        content_type: &'static str,
    },
    Cgi(CgiRequest),
    Error(Status),
}

pub fn classify(request: &Request, config: &ServerConfig) -> Dispatch {
    if !request.method.is_supported() {
        debug!(method = %request.method, "unsupported method");
        return Dispatch::Error(Status::BAD_REQUEST);
    }
    if !request.version.starts_with("HTTP/1.") {
        debug!(version = %request.version, "unsupported protocol version");
        return Dispatch::Error(Status::BAD_REQUEST);
    }

    let mut path = match resolve_path(&request.path, config) {
        Ok(p) => p,
        Err(status) => return Dispatch::Error(status),
    };

    let mut metadata = fs::metadata(&path);
    if let Ok(m) = &metadata {
        if m.is_dir() {
            path.push(&config.home_page);
            metadata = fs::metadata(&path);
        }
    }

    // HEAD never runs a program: its output would be thrown away. The file
    // itself is described instead.
    let executable = request.method != Method::HEAD
        && metadata.as_ref().map(is_executable).unwrap_or(false);
    let is_cgi = request.wants_cgi() || executable;

    if is_cgi {
        debug!(path = %path.display(), "dispatching to CGI");
        return Dispatch::Cgi(CgiRequest {
            method: request.method.clone(),
            path,
            query_string: request.query_string.clone(),
            body: request.body.clone(),
            content_length: request.content_length,
            content_type: request
                .headers
                .get_ignore_case(CONTENT_TYPE)
                .map(String::from),
            version: request.version.clone(),
        });
    }

    match metadata {
        Ok(m) if m.is_file() => Dispatch::Static {
            content_type: mime::content_type_for_path(&path),
            size: m.len(),
            path,
        },
        Ok(_) => {
            debug!(path = %path.display(), "not a regular file");
            Dispatch::Error(Status::NOT_FOUND)
        }
        Err(e) => {
            debug!(path = %path.display(), error = %e, "resource not found");
            Dispatch::Error(Status::NOT_FOUND)
        }
    }
}

/// Maps a request path onto the document root.
///
/// The path is percent-decoded first. A `..` component anywhere is refused
/// with 400, as is anything not starting with `/`. A trailing `/` (the root
/// included) names the home page of that directory.
pub fn resolve_path(raw_path: &str, config: &ServerConfig) -> Result<PathBuf, Status> {
    let decoded = urlencoding::decode(raw_path).map_err(|_| Status::BAD_REQUEST)?;

    if !decoded.starts_with('/') || decoded.contains('\0') {
        return Err(Status::BAD_REQUEST);
    }

    let mut resolved = config.doc_root.clone();
    for component in decoded.split('/') {
        match component {
            "" | "." => continue,
            ".." => return Err(Status::BAD_REQUEST),
            c if c.contains('\\') => return Err(Status::BAD_REQUEST),
            c => resolved.push(c),
        }
    }

    if decoded.ends_with('/') {
        resolved.push(&config.home_page);
    }

    Ok(resolved)
}

#[cfg(unix)]
fn is_executable(metadata: &Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &Metadata) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::{split_uri, Headers};
    use bytes::Bytes;
    use std::path::Path;

    fn config(root: &Path) -> ServerConfig {
        ServerConfig {
            doc_root: root.to_path_buf(),
            ..ServerConfig::default()
        }
    }

    fn request(method: Method, uri: &str) -> Request {
        let (path, query) = split_uri(uri);
        Request {
            request_line: String::new(),
            method,
            uri: uri.to_string(),
            path: path.to_string(),
            query_string: query.to_string(),
            version: "HTTP/1.1".to_string(),
            headers: Headers::new(),
            content_length: 0,
            body: Bytes::new(),
        }
    }

    #[test]
    fn root_resolves_to_home_page() {
        let cfg = config(Path::new("www"));
        assert_eq!(resolve_path("/", &cfg), Ok(PathBuf::from("www/index.html")));
        assert_eq!(resolve_path("/docs/", &cfg), Ok(PathBuf::from("www/docs/index.html")));
    }

    #[test]
    fn percent_encoding_is_decoded() {
        let cfg = config(Path::new("www"));
        assert_eq!(resolve_path("/a%20b.txt", &cfg), Ok(PathBuf::from("www/a b.txt")));
    }

    #[test]
    fn parent_components_are_refused() {
        let cfg = config(Path::new("www"));
        for p in ["/../etc/passwd", "/a/../../b", "/%2e%2e/secret", "/a/..", "/..%2fx"] {
            assert_eq!(resolve_path(p, &cfg), Err(Status::BAD_REQUEST), "{}", p);
        }
    }

    #[test]
    fn relative_target_is_refused() {
        let cfg = config(Path::new("www"));
        assert_eq!(resolve_path("index.html", &cfg), Err(Status::BAD_REQUEST));
        assert_eq!(resolve_path("/a%00b", &cfg), Err(Status::BAD_REQUEST));
    }

    #[test]
    fn static_file_with_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("blob.qqq"), b"12345678").unwrap();

        let d = classify(&request(Method::GET, "/blob.qqq"), &config(dir.path()));
        assert_eq!(
            d,
            Dispatch::Static {
                path: dir.path().join("blob.qqq"),
                size: 8,
                content_type: mime::DEFAULT_CONTENT_TYPE,
            }
        );
    }

    #[test]
    fn directory_gets_home_page() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/index.html"), b"hi").unwrap();

        let d = classify(&request(Method::GET, "/sub"), &config(dir.path()));
        assert!(matches!(d, Dispatch::Static { size: 2, content_type: "text/html", .. }));
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let d = classify(&request(Method::GET, "/nope.html"), &config(dir.path()));
        assert_eq!(d, Dispatch::Error(Status::NOT_FOUND));
    }

    #[test]
    fn traversal_is_bad_request() {
        let dir = tempfile::tempdir().unwrap();
        let d = classify(&request(Method::GET, "/../outside"), &config(dir.path()));
        assert_eq!(d, Dispatch::Error(Status::BAD_REQUEST));
    }

    #[test]
    fn post_and_query_go_to_cgi() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());

        let mut post = request(Method::POST, "/submit?x=1");
        post.body = Bytes::from_static(b"abcd");
        post.content_length = 4;
        match classify(&post, &cfg) {
            Dispatch::Cgi(cgi) => {
                assert_eq!(cgi.method, Method::POST);
                assert_eq!(cgi.path, dir.path().join("submit"));
                assert_eq!(cgi.query_string, "x=1");
                assert_eq!(&cgi.body[..], b"abcd");
            }
            other => panic!("expected CGI, got {:?}", other),
        }

        assert!(matches!(classify(&request(Method::GET, "/s?q=1"), &cfg), Dispatch::Cgi(_)));
    }

    #[cfg(unix)]
    #[test]
    fn executable_file_goes_to_cgi() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run.sh");
        fs::write(&script, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let d = classify(&request(Method::GET, "/run.sh"), &config(dir.path()));
        assert!(matches!(d, Dispatch::Cgi(_)));
    }

    #[cfg(unix)]
    #[test]
    fn head_on_executable_is_static() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("run.sh");
        fs::write(&script, b"#!/bin/sh\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let d = classify(&request(Method::HEAD, "/run.sh"), &config(dir.path()));
        assert!(matches!(d, Dispatch::Static { size: 10, .. }));
    }

    #[test]
    fn unsupported_method_and_version() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path());

        let d = classify(&request(Method::DELETE, "/"), &cfg);
        assert_eq!(d, Dispatch::Error(Status::BAD_REQUEST));

        let mut req = request(Method::GET, "/");
        req.version = "HTTP/2".to_string();
        assert_eq!(classify(&req, &cfg), Dispatch::Error(Status::BAD_REQUEST));
    }
}
