//! Request body ingestion.
//!
//! The body is never read eagerly. Bytes that arrived together with the head
//! sit in the connection buffer; the rest is still on the socket.

use bytes::BytesMut;
use std::fmt;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

use crate::http::request::Charset;

const READ_CHUNK: usize = 8192;

/// Why a body could not be turned into text. All of these are client faults.
#[derive(Debug)]
pub enum BodyError {
    TooLarge { declared: usize, limit: usize },
    Truncated { expected: usize, received: usize },
    UnsupportedCharset(String),
    UnsupportedTransferEncoding(String),
    InvalidEncoding(Charset),
    Timeout,
    Io(std::io::Error),
}

impl fmt::Display for BodyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyError::TooLarge { declared, limit } => {
                write!(f, "body of {} bytes exceeds limit of {} bytes", declared, limit)
            }
            BodyError::Truncated { expected, received } => {
                write!(f, "body truncated: expected {} bytes, got {}", expected, received)
            }
            BodyError::UnsupportedCharset(label) => write!(f, "unsupported charset {:?}", label),
            BodyError::UnsupportedTransferEncoding(te) => {
                write!(f, "unsupported transfer encoding {:?}", te)
            }
            BodyError::InvalidEncoding(charset) => write!(f, "body is not valid {:?}", charset),
            BodyError::Timeout => f.write_str("timed out reading body"),
            BodyError::Io(e) => write!(f, "I/O error reading body: {}", e),
        }
    }
}

impl std::error::Error for BodyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BodyError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BodyError {
    fn from(e: std::io::Error) -> Self {
        BodyError::Io(e)
    }
}

/// Reader over a request body delimited by `Content-Length`.
pub struct BodyReader<'a, R> {
    buffered: &'a mut BytesMut,
    reader: &'a mut R,
    remaining: usize,
    read_timeout: Duration,
}

impl<'a, R> BodyReader<'a, R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(
        buffered: &'a mut BytesMut,
        reader: &'a mut R,
        content_length: usize,
        read_timeout: Duration,
    ) -> Self {
        Self {
            buffered,
            reader,
            remaining: content_length,
            read_timeout,
        }
    }

    /// Bytes of body not yet consumed.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Reads the whole body and decodes it as `charset`.
    ///
    /// A body declared larger than `limit` is rejected before any byte of it
    /// is read.
    pub async fn read_text(&mut self, limit: usize, charset: Charset) -> Result<String, BodyError> {
        if self.remaining > limit {
            return Err(BodyError::TooLarge {
                declared: self.remaining,
                limit,
            });
        }

        let bytes = self.read_all().await?;
        decode(&bytes, charset)
    }

    /// Reads the rest of the body; the whole read shares one deadline.
    async fn read_all(&mut self) -> Result<Vec<u8>, BodyError> {
        timeout(self.read_timeout, self.read_remaining())
            .await
            .map_err(|_| BodyError::Timeout)?
    }

    async fn read_remaining(&mut self) -> Result<Vec<u8>, BodyError> {
        let expected = self.remaining;
        let mut body = Vec::with_capacity(expected);

        let from_buffer = self.buffered.len().min(self.remaining);
        body.extend_from_slice(&self.buffered.split_to(from_buffer));
        self.remaining -= from_buffer;

        let mut chunk = [0u8; READ_CHUNK];
        while self.remaining > 0 {
            let want = self.remaining.min(READ_CHUNK);
            let n = self.reader.read(&mut chunk[..want]).await?;

            if n == 0 {
                return Err(BodyError::Truncated {
                    expected,
                    received: body.len(),
                });
            }

            body.extend_from_slice(&chunk[..n]);
            self.remaining -= n;
        }

        Ok(body)
    }
}

/// Decodes body bytes with one of the supported charsets.
pub fn decode(bytes: &[u8], charset: Charset) -> Result<String, BodyError> {
    match charset {
        Charset::Utf8 => std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| BodyError::InvalidEncoding(charset)),
        Charset::Ascii => {
            if bytes.is_ascii() {
                Ok(bytes.iter().map(|&b| b as char).collect())
            } else {
                Err(BodyError::InvalidEncoding(charset))
            }
        }
        // ISO-8859-1 maps each byte to the code point of the same value
        Charset::Latin1 => Ok(bytes.iter().map(|&b| b as char).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reads_buffered_prefix_then_stream() {
        let mut buffered = BytesMut::from(&b"name="[..]);
        let mut rest: &[u8] = b"abc";

        let mut body = BodyReader::new(&mut buffered, &mut rest, 8, Duration::from_secs(1));
        let text = body.read_text(64, Charset::Utf8).await.unwrap();

        assert_eq!(text, "name=abc");
        assert_eq!(body.remaining(), 0);
    }

    #[tokio::test]
    async fn short_stream_is_truncated() {
        let mut buffered = BytesMut::new();
        let mut rest: &[u8] = b"abc";

        let mut body = BodyReader::new(&mut buffered, &mut rest, 10, Duration::from_secs(1));
        let err = body.read_text(64, Charset::Utf8).await.unwrap_err();

        assert!(matches!(err, BodyError::Truncated { expected: 10, received: 3 }));
    }

    #[tokio::test]
    async fn trickled_body_hits_one_deadline() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::spawn(async move {
            use tokio::io::AsyncWriteExt;
            for _ in 0..100 {
                if client.write_all(b"x").await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        });

        let mut buffered = BytesMut::new();
        let mut body = BodyReader::new(&mut buffered, &mut server, 100, Duration::from_millis(300));
        let started = std::time::Instant::now();
        let err = body.read_text(1024, Charset::Utf8).await.unwrap_err();

        assert!(matches!(err, BodyError::Timeout));
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn latin1_maps_high_bytes() {
        assert_eq!(decode(&[0x63, 0x61, 0x66, 0xe9], Charset::Latin1).unwrap(), "café");
    }
}
