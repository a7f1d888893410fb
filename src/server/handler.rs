//! Request handling: resolve, audit, stream.

use bytes::BytesMut;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{error, warn};

use crate::audit::AuditLogger;
use crate::config::LimitsConfig;
use crate::http::body::{BodyError, BodyReader};
use crate::http::mime::content_type_for;
use crate::http::request::{Method, Request};
use crate::http::response::{Response, ResponseHead, StatusCode};
use crate::http::writer::ResponseWriter;
use crate::site::{ResolvedResource, SiteRoot};

/// Result of one handled request, for the operational log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub status: StatusCode,
    /// Uncompressed bytes of the resource sent
    pub bytes: u64,
}

/// Drives a single request to completion.
///
/// Shared by every connection task; holds only immutable state and the
/// audit logger.
#[derive(Debug)]
pub struct RequestHandler {
    site: SiteRoot,
    audit: Arc<AuditLogger>,
    limits: LimitsConfig,
}

impl RequestHandler {
    pub fn new(site: SiteRoot, audit: Arc<AuditLogger>, limits: LimitsConfig) -> Self {
        Self { site, audit, limits }
    }

    pub fn site(&self) -> &SiteRoot {
        &self.site
    }

    /// Handles `request` on `stream`.
    ///
    /// `buffered` holds any bytes read past the request head. The caller owns
    /// the stream and shuts it down afterwards. An `Err` means the response was
    /// cut short after its head had been sent.
    pub async fn handle<S>(
        &self,
        request: &Request,
        buffered: &mut BytesMut,
        stream: &mut S,
    ) -> anyhow::Result<Outcome>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let resolved = match self.site.resolve(&request.path).await {
            Ok(resolved) => Some(resolved),
            Err(e) => {
                error!(error = %e, "site misconfigured");
                None
            }
        };

        match request.method {
            Method::POST => match self.read_post_body(request, buffered, stream).await {
                Ok(body) => self.audit.record(&format!("POST data: {}", body)).await,
                Err(e) => warn!(peer = %request.remote_addr, error = %e, "POST body not logged"),
            },
            Method::GET => {
                if request.query.is_some() {
                    self.audit
                        .record(&format!("Query data: {}", request.query_string()))
                        .await;
                }
            }
            Method::Other(_) => {}
        }

        self.audit
            .record(&format!("Request from {} for {}", request.remote_addr, request.url()))
            .await;

        let mut writer = ResponseWriter::new(stream, self.limits.write_timeout());

        let Some(resolved) = resolved else {
            return Self::fail(&mut writer).await;
        };

        self.serve_resource(&resolved, &mut writer).await
    }

    /// Opens `resolved` and streams it gzip-compressed through `writer`.
    ///
    /// A file that cannot be opened, e.g. deleted after resolution, is
    /// answered with a generic 500.
    pub async fn serve_resource<W>(
        &self,
        resolved: &ResolvedResource,
        writer: &mut ResponseWriter<'_, W>,
    ) -> anyhow::Result<Outcome>
    where
        W: AsyncWrite + Unpin,
    {
        let mut file = match File::open(&resolved.path).await {
            Ok(file) => file,
            Err(e) => {
                error!(path = %resolved.path.display(), error = %e, "failed to open resolved resource");
                return Self::fail(writer).await;
            }
        };

        writer.write_head(&gzip_head(resolved)).await?;
        let bytes = writer.stream_gzip(&mut file).await?;

        Ok(Outcome {
            status: resolved.status,
            bytes,
        })
    }

    async fn read_post_body<S>(
        &self,
        request: &Request,
        buffered: &mut BytesMut,
        stream: &mut S,
    ) -> Result<String, BodyError>
    where
        S: AsyncRead + Unpin,
    {
        if let Some(te) = request.header("Transfer-Encoding") {
            if !te.eq_ignore_ascii_case("identity") {
                return Err(BodyError::UnsupportedTransferEncoding(te.to_string()));
            }
        }
        let charset = request.charset().map_err(BodyError::UnsupportedCharset)?;

        let mut body = BodyReader::new(
            buffered,
            stream,
            request.content_length(),
            self.limits.read_timeout(),
        );
        body.read_text(self.limits.max_body_bytes, charset).await
    }

    async fn fail<W>(writer: &mut ResponseWriter<'_, W>) -> anyhow::Result<Outcome>
    where
        W: AsyncWrite + Unpin,
    {
        writer.write_response(&Response::internal_error()).await?;
        Ok(Outcome {
            status: StatusCode::InternalServerError,
            bytes: 0,
        })
    }
}

/// Head for a resource body: its status, content type and gzip encoding.
pub fn gzip_head(resolved: &ResolvedResource) -> ResponseHead {
    let mut head = ResponseHead::new(resolved.status);
    head.set_header("Content-Type", content_type_for(&resolved.path));
    head.set_header("Content-Encoding", "gzip");
    head
}
