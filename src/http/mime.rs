use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::Path;

/// Content type for files whose extension is absent or not in the table.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

static CONTENT_TYPES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("html", "text/html"),
        ("htm", "text/html"),
        ("css", "text/css"),
        ("js", "application/javascript"),
        ("json", "application/json"),
        ("xml", "application/xml"),
        ("txt", "text/plain"),
        ("jpg", "image/jpeg"),
        ("jpeg", "image/jpeg"),
        ("png", "image/png"),
        ("gif", "image/gif"),
        ("svg", "image/svg+xml"),
        ("ico", "image/x-icon"),
        ("pdf", "application/pdf"),
    ])
});

/// Maps an extension (without the dot, any case) to a content type.
pub fn content_type_for_extension(ext: &str) -> &'static str {
    CONTENT_TYPES
        .get(ext.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

pub fn content_type_for_path(path: &Path) -> &'static str {
    path.extension()
        .and_then(|e| e.to_str())
        .map(content_type_for_extension)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}
