use crate::http::request::{Method, Request, split_target};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
    InvalidRequest,
    InvalidMethod,
    InvalidHeader,
    InvalidContentLength,
    HeadTooLarge,
    Incomplete,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ParseError::InvalidRequest => "malformed request line",
            ParseError::InvalidMethod => "invalid method token",
            ParseError::InvalidHeader => "malformed header line",
            ParseError::InvalidContentLength => "invalid Content-Length",
            ParseError::HeadTooLarge => "request head too large",
            ParseError::Incomplete => "incomplete request head",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for ParseError {}

/// Parses a request head (request line and headers) from `buf`.
///
/// Returns the request and the number of bytes consumed, which is the head
/// including its terminating blank line. Body bytes are left in the buffer.
pub fn parse_request_head(buf: &[u8], remote_addr: &str) -> Result<(Request, usize), ParseError> {
    // Look for header/body separator
    let headers_end = find_headers_end(buf).ok_or(ParseError::Incomplete)?;
    let header_bytes = &buf[..headers_end];

    let headers_str = std::str::from_utf8(header_bytes)
        .map_err(|_| ParseError::InvalidRequest)?;

    let mut lines = headers_str.split("\r\n");

    // Request line
    let request_line = lines.next().ok_or(ParseError::InvalidRequest)?;
    let mut parts = request_line.split_whitespace();

    let method_str = parts.next().ok_or(ParseError::InvalidRequest)?;
    let target = parts.next().ok_or(ParseError::InvalidRequest)?;
    let version = parts.next().ok_or(ParseError::InvalidRequest)?;

    if parts.next().is_some() || !version.starts_with("HTTP/1.") {
        return Err(ParseError::InvalidRequest);
    }

    let method = Method::from_token(method_str).ok_or(ParseError::InvalidMethod)?;

    // Origin-form only; absolute URLs are proxy requests
    if !target.starts_with('/') {
        return Err(ParseError::InvalidRequest);
    }
    let (path, query) = split_target(target);

    // Headers
    let mut headers = HashMap::new();

    for line in lines {
        if line.is_empty() {
            continue;
        }

        let (key, value) = line
            .split_once(':')
            .ok_or(ParseError::InvalidHeader)?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ParseError::InvalidHeader);
        }

        headers.insert(key.to_ascii_lowercase(), value.trim().to_string());
    }

    if let Some(len) = headers.get("content-length") {
        len.parse::<usize>().map_err(|_| ParseError::InvalidContentLength)?;
    }

    let request = Request {
        method,
        path: path.to_string(),
        query: query.map(str::to_string),
        version: version.to_string(),
        headers,
        remote_addr: remote_addr.to_string(),
    };

    Ok((request, headers_end + 4))
}

fn find_headers_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4)
        .position(|w| w == b"\r\n\r\n")
}
