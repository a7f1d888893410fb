use std::io::Write;
use std::time::Duration;

use anyhow::Context;
use flate2::Compression;
use flate2::write::GzEncoder;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::http::response::{Response, ResponseHead};

const HTTP_VERSION: &str = "HTTP/1.1";

/// Size of each chunk read from the source before compression.
const STREAM_CHUNK: usize = 16 * 1024;

/// Serializes a response head. Every response closes the connection, so
/// `Connection: close` is always appended.
pub fn serialize_head(head: &ResponseHead) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        HTTP_VERSION,
        head.status.as_u16(),
        head.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &head.headers {
        if k.eq_ignore_ascii_case("Connection") {
            continue;
        }
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf.extend_from_slice(b"Connection: close\r\n");

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Writes one response to the client.
///
/// Bodies are delimited by connection close, so the writer never needs to
/// know a body's length up front.
pub struct ResponseWriter<'a, W> {
    stream: &'a mut W,
    write_timeout: Duration,
    head_written: bool,
}

impl<'a, W> ResponseWriter<'a, W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(stream: &'a mut W, write_timeout: Duration) -> Self {
        Self {
            stream,
            write_timeout,
            head_written: false,
        }
    }

    /// Whether any part of the response has reached the socket. Once true, a
    /// failure can no longer be reported with a status code.
    pub fn head_written(&self) -> bool {
        self.head_written
    }

    pub async fn write_head(&mut self, head: &ResponseHead) -> anyhow::Result<()> {
        if self.head_written {
            anyhow::bail!("response head already written");
        }
        self.head_written = true;
        let bytes = serialize_head(head);
        self.send(&bytes).await
    }

    /// Writes a fully buffered response.
    pub async fn write_response(&mut self, response: &Response) -> anyhow::Result<()> {
        self.write_head(&response.head).await?;
        self.send(&response.body).await?;
        self.flush().await
    }

    /// Streams `source` through a gzip encoder into the socket.
    ///
    /// Only one chunk of input and its compressed output are held in memory at
    /// a time. The gzip trailer is written before returning. Returns the number
    /// of uncompressed bytes read from `source`.
    pub async fn stream_gzip<R>(&mut self, source: &mut R) -> anyhow::Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let mut encoder = GzEncoder::new(Vec::with_capacity(STREAM_CHUNK), Compression::default());
        let mut chunk = vec![0u8; STREAM_CHUNK];
        let mut total = 0u64;

        loop {
            let n = source
                .read(&mut chunk)
                .await
                .context("failed to read resource")?;
            if n == 0 {
                break;
            }
            total += n as u64;

            encoder.write_all(&chunk[..n])?;
            if !encoder.get_ref().is_empty() {
                let compressed = std::mem::take(encoder.get_mut());
                self.send(&compressed).await?;
            }
        }

        let tail = encoder.finish()?;
        self.send(&tail).await?;
        self.flush().await?;

        Ok(total)
    }

    async fn send(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        if bytes.is_empty() {
            return Ok(());
        }

        timeout(self.write_timeout, self.stream.write_all(bytes))
            .await
            .map_err(|_| anyhow::anyhow!("timed out writing response"))?
            .context("connection closed while writing")
    }

    async fn flush(&mut self) -> anyhow::Result<()> {
        timeout(self.write_timeout, self.stream.flush())
            .await
            .map_err(|_| anyhow::anyhow!("timed out flushing response"))?
            .context("failed to flush response")
    }
}
