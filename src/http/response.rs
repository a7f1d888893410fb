/// HTTP status codes supported by the server.
///
/// - `Ok` (200): resource served
/// - `BadRequest` (400): malformed request head
/// - `NotFound` (404): fallback resource served
/// - `InternalServerError` (500): I/O or configuration fault
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 404 Not Found
    NotFound,
    /// 500 Internal Server Error
    InternalServerError
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use static_gzip_server::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::NotFound => 404,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::NotFound => "Not Found",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }
}

/// Status line and headers of a response.
///
/// Headers keep insertion order so the serialized head is deterministic.
#[derive(Debug, Clone)]
pub struct ResponseHead {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    /// Adds or replaces a header. Names compare case-insensitively.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(&key)) {
            Some(entry) => entry.1 = value,
            None => self.headers.push((key, value)),
        }
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// A complete response held in memory, used for small generated bodies
/// such as error pages.
#[derive(Debug)]
pub struct Response {
    pub head: ResponseHead,
    /// Response body as bytes
    pub body: Vec<u8>,
}

/// Builder for constructing buffered responses in a fluent style.
///
/// # Example
///
/// ```
/// # use static_gzip_server::http::response::{ResponseBuilder, StatusCode};
/// let response = ResponseBuilder::new(StatusCode::BadRequest)
///     .header("Content-Type", "text/plain")
///     .body(b"400 Bad Request".to_vec())
///     .build();
///
/// assert_eq!(response.head.status, StatusCode::BadRequest);
/// assert_eq!(response.head.header("Content-Length"), Some("15"));
/// ```
pub struct ResponseBuilder {
    head: ResponseHead,
    body: Vec<u8>,
}

impl ResponseBuilder {
    /// Creates a new response builder with the specified status code.
    pub fn new(status: StatusCode) -> Self {
        Self {
            head: ResponseHead::new(status),
            body: Vec::new(),
        }
    }

    /// Adds or replaces a header.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.head.set_header(key, value);
        self
    }

    /// Sets the response body.
    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Builds the final Response.
    ///
    /// Automatically adds the Content-Length header based on body size if not already present.
    pub fn build(mut self) -> Response {
        if self.head.header("Content-Length").is_none() {
            let len = self.body.len().to_string();
            self.head.set_header("Content-Length", len);
        }

        Response {
            head: self.head,
            body: self.body,
        }
    }
}

impl Response {
    /// Creates a 400 Bad Request response.
    pub fn bad_request() -> Self {
        ResponseBuilder::new(StatusCode::BadRequest)
            .header("Content-Type", "text/plain")
            .body(b"400 Bad Request".to_vec())
            .build()
    }

    /// Creates a 500 Internal Server Error response.
    ///
    /// The body never carries paths or error details.
    pub fn internal_error() -> Self {
        ResponseBuilder::new(StatusCode::InternalServerError)
            .header("Content-Type", "text/plain")
            .body(b"500 Internal Server Error".to_vec())
            .build()
    }
}
