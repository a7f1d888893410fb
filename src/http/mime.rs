//! Content type lookup by file extension.

use std::path::Path;

/// Served when an extension is missing or unknown.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

const CONTENT_TYPES: &[(&str, &str)] = &[
    (".html", "text/html"),
    (".css", "text/css"),
    (".js", "application/javascript"),
    (".png", "image/png"),
    (".jpg", "image/jpeg"),
    (".gif", "image/gif"),
];

/// Returns the MIME type for `path` based on its lowercased extension.
///
/// # Example
///
/// ```
/// # use static_gzip_server::http::mime::content_type_for;
/// assert_eq!(content_type_for("logo.PNG"), "image/png");
/// assert_eq!(content_type_for("archive.tar"), "application/octet-stream");
/// ```
pub fn content_type_for(path: impl AsRef<Path>) -> &'static str {
    let Some(ext) = path.as_ref().extension().and_then(|e| e.to_str()) else {
        return DEFAULT_CONTENT_TYPE;
    };
    let ext = format!(".{}", ext.to_ascii_lowercase());

    CONTENT_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}
