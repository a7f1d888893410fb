//! HTTP protocol implementation.
//!
//! A deliberately small HTTP/1.1 server side: one request per connection,
//! response bodies delimited by connection close.
//!
//! # Architecture
//!
//! - **`connection`**: per-connection state machine
//! - **`parser`**: parses request heads from byte buffers
//! - **`request`**: request representation, methods and charsets
//! - **`body`**: bounded, lazily read request bodies
//! - **`response`**: status codes, response heads, buffered responses
//! - **`writer`**: writes heads and gzip-streamed bodies to the client
//! - **`mime`**: MIME type detection based on file extensions
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for the request head
//!        └──────┬──────┘
//!               │ Head parsed          (malformed → 400)
//!               ▼
//!        ┌──────────────────┐
//!        │    Handling      │ ← Resolve, audit, stream gzip body
//!        └──────┬───────────┘
//!               │ Response sent
//!               ▼
//!        ┌──────────────────┐
//!        │     Closed       │ ← Socket shut down
//!        └──────────────────┘
//! ```

pub mod body;
pub mod connection;
pub mod mime;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
