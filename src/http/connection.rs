use bytes::BytesMut;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, info, warn};

use crate::config::LimitsConfig;
use crate::http::parser::{ParseError, parse_request_head};
use crate::http::request::Request;
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;
use crate::server::handler::RequestHandler;

/// Bounds on draining unread input after the write side is shut down, so the
/// close does not turn into a reset. The timeout covers the whole drain.
pub const LINGER_TIMEOUT: Duration = Duration::from_secs(2);
const LINGER_MAX_BYTES: usize = 256 * 1024;

pub struct Connection<S> {
    stream: S,
    peer: String,
    buffer: BytesMut,
    state: ConnectionState,
    handler: Arc<RequestHandler>,
    limits: LimitsConfig,
}

pub enum ConnectionState {
    Reading,
    Handling(Request),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, peer: impl Into<String>, handler: Arc<RequestHandler>, limits: LimitsConfig) -> Self {
        Self {
            stream,
            peer: peer.into(),
            buffer: BytesMut::with_capacity(4096),
            state: ConnectionState::Reading,
            handler,
            limits,
        }
    }

    /// Serves one request and closes the connection.
    ///
    /// The stream is shut down exactly once, whatever happened before.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let result = self.drive().await;

        if let Err(e) = self.stream.shutdown().await {
            debug!(peer = %self.peer, error = %e, "shutdown failed");
        }
        self.linger().await;

        result
    }

    /// Discards input until the client closes, within limits.
    async fn linger(&mut self) {
        let deadline = Instant::now() + LINGER_TIMEOUT;
        let mut discarded = 0usize;
        let mut scratch = [0u8; 4096];

        while discarded < LINGER_MAX_BYTES {
            match timeout_at(deadline, self.stream.read(&mut scratch)).await {
                Ok(Ok(n)) if n > 0 => discarded += n,
                _ => break,
            }
        }
    }

    async fn drive(&mut self) -> anyhow::Result<()> {
        loop {
            match &mut self.state {
                ConnectionState::Reading => {
                    match self.read_request().await {
                        Ok(Some(req)) => {
                            self.state = ConnectionState::Handling(req);
                        }
                        Ok(None) => {
                            self.state = ConnectionState::Closed;
                        }
                        Err(e) if e.downcast_ref::<ParseError>().is_some() => {
                            warn!(peer = %self.peer, error = %e, "rejecting malformed request");
                            self.state = ConnectionState::Closed;
                            let mut writer = ResponseWriter::new(&mut self.stream, self.limits.write_timeout());
                            writer.write_response(&Response::bad_request()).await?;
                        }
                        Err(e) => {
                            self.state = ConnectionState::Closed;
                            return Err(e);
                        }
                    }
                }

                ConnectionState::Handling(req) => {
                    let outcome = self
                        .handler
                        .handle(req, &mut self.buffer, &mut self.stream)
                        .await?;

                    info!(
                        peer = %self.peer,
                        method = req.method.as_str(),
                        path = %req.path,
                        status = outcome.status.as_u16(),
                        bytes = outcome.bytes,
                        "request served"
                    );

                    // No keep-alive: one request per connection
                    self.state = ConnectionState::Closed;
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }

    /// Reads until a full request head is buffered.
    ///
    /// The whole head must arrive within the read timeout. Returns `None` if
    /// the client closes before sending anything.
    pub async fn read_request(&mut self) -> anyhow::Result<Option<Request>> {
        timeout(self.limits.read_timeout(), self.read_head())
            .await
            .map_err(|_| anyhow::anyhow!("timed out waiting for request head"))?
    }

    async fn read_head(&mut self) -> anyhow::Result<Option<Request>> {
        loop {
            // Try parsing whatever we already have
            match parse_request_head(&self.buffer, &self.peer) {
                Ok((request, consumed)) => {
                    // Whatever follows the head is body
                    let _ = self.buffer.split_to(consumed);
                    return Ok(Some(request));
                }

                Err(ParseError::Incomplete) => {
                    if self.buffer.len() >= self.limits.max_head_bytes {
                        return Err(ParseError::HeadTooLarge.into());
                    }
                }

                Err(e) => {
                    return Err(e.into());
                }
            }

            // Read more data
            let mut temp = [0u8; 1024];
            let n = self.stream.read(&mut temp).await?;

            if n == 0 {
                if self.buffer.is_empty() {
                    // Client closed connection
                    return Ok(None);
                }
                return Err(ParseError::InvalidRequest.into());
            }

            self.buffer.extend_from_slice(&temp[..n]);
        }
    }
}
