use std::collections::HashMap;

/// HTTP request methods.
///
/// Only GET and POST change how a request is handled; every other token is
/// kept verbatim and served like a GET without method-specific logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// GET - Retrieve a resource
    GET,
    /// POST - Submit data; the body is read and logged
    POST,
    /// Any other method token (HEAD, PUT, ...)
    Other(String),
}

/// Text encodings accepted for POST bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    Utf8,
    Ascii,
    Latin1,
}

/// Represents a parsed HTTP request head from a client.
///
/// The body is not part of the request value: it stays on the connection and
/// is only pulled through a [`BodyReader`](crate::http::body::BodyReader)
/// when the handler needs it.
#[derive(Debug, Clone)]
pub struct Request {
    /// The HTTP method (GET, POST, etc.)
    pub method: Method,
    /// The request path without the query, e.g. "/index.html"
    pub path: String,
    /// Raw query string without the leading '?', if any
    pub query: Option<String>,
    /// HTTP version (typically "HTTP/1.1")
    pub version: String,
    /// Request headers, keys lowercased
    pub headers: HashMap<String, String>,
    /// Peer address of the connection, e.g. "127.0.0.1:51234"
    pub remote_addr: String,
}

/// Builder for constructing Request objects.
pub struct RequestBuilder {
    method: Option<Method>,
    target: Option<String>,
    version: Option<String>,
    headers: HashMap<String, String>,
    remote_addr: String,
}

impl Method {
    /// Parses an HTTP method token.
    ///
    /// Tokens are case-sensitive. Anything that is not a valid token
    /// (uppercase letters only) yields `None`.
    ///
    /// # Example
    ///
    /// ```
    /// # use static_gzip_server::http::request::Method;
    /// assert_eq!(Method::from_token("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_token("HEAD"), Some(Method::Other("HEAD".into())));
    /// assert_eq!(Method::from_token("get"), None);
    /// ```
    pub fn from_token(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "POST" => Some(Method::POST),
            _ if !s.is_empty() && s.bytes().all(|b| b.is_ascii_uppercase()) => {
                Some(Method::Other(s.to_string()))
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::GET => "GET",
            Method::POST => "POST",
            Method::Other(token) => token,
        }
    }
}

impl Charset {
    /// Looks up a charset label, ignoring case.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().trim_matches('"').to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Some(Charset::Utf8),
            "us-ascii" | "ascii" => Some(Charset::Ascii),
            "iso-8859-1" | "latin1" | "latin-1" | "l1" => Some(Charset::Latin1),
            _ => None,
        }
    }
}

/// Splits a request target into path and query.
///
/// An empty query ("/page?") is treated as absent.
pub fn split_target(target: &str) -> (&str, Option<&str>) {
    match target.split_once('?') {
        Some((path, query)) if !query.is_empty() => (path, Some(query)),
        Some((path, _)) => (path, None),
        None => (target, None),
    }
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self {
            method: None,
            target: None,
            version: None,
            headers: HashMap::new(),
            remote_addr: "unknown".to_string(),
        }
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Sets the request target; a query after '?' is split off.
    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into().to_ascii_lowercase(), value.into());
        self
    }

    pub fn remote_addr(mut self, addr: impl Into<String>) -> Self {
        self.remote_addr = addr.into();
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        let target = self.target.ok_or("target missing")?;
        let (path, query) = split_target(&target);

        Ok(Request {
            method: self.method.ok_or("method missing")?,
            path: path.to_string(),
            query: query.map(str::to_string),
            version: self.version.unwrap_or_else(|| "HTTP/1.1".to_string()),
            headers: self.headers,
            remote_addr: self.remote_addr,
        })
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Request {
    /// Retrieves a header value by name, ignoring case.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .get(&key.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    /// Retrieves the Content-Length header value and parses it as a usize.
    ///
    /// Returns 0 if the header is missing or not a valid number.
    pub fn content_length(&self) -> usize {
        self.header("Content-Length")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    /// Declared charset of the body.
    ///
    /// Reads the `charset` parameter of `Content-Type`. No parameter means
    /// UTF-8; an unknown label yields `Err` with the label.
    pub fn charset(&self) -> Result<Charset, String> {
        let Some(content_type) = self.header("Content-Type") else {
            return Ok(Charset::Utf8);
        };

        let label = content_type.split(';').skip(1).find_map(|param| {
            let (key, value) = param.split_once('=')?;
            key.trim().eq_ignore_ascii_case("charset").then(|| value.trim())
        });

        match label {
            None => Ok(Charset::Utf8),
            Some(label) => Charset::from_label(label).ok_or_else(|| label.to_string()),
        }
    }

    /// Query string including its leading '?', or "" when there is none.
    pub fn query_string(&self) -> String {
        match &self.query {
            Some(q) => format!("?{}", q),
            None => String::new(),
        }
    }

    /// Absolute URL of the request, rebuilt from the `Host` header.
    pub fn url(&self) -> String {
        let host = self.header("Host").unwrap_or("localhost");
        format!("http://{}{}{}", host, self.path, self.query_string())
    }
}
