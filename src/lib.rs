//! # yawh
//! Client side of the WebSocket opening handshake (RFC 6455 §4.1–4.2).
//!
//! The crate builds the HTTP/1.1 Upgrade request that initiates a WebSocket connection and
//! validates the server's `101 Switching Protocols` response. It does not open sockets and does
//! not speak the framing protocol: the caller owns the transport, and after a successful
//! handshake hands the stream to whatever frame codec it uses.
//!
//! # Features
//! - `logging`: Enables debug logging for request generation and response validation using the
//!   `log` crate. Useful for debugging servers that answer the upgrade in unexpected ways.
//!
//! ## Usage Example
//! ```toml
//! [dependencies]
//! yawh = { version = "0.1", features = ["logging"] }
//! ```
//!
//! # Manual Example
//! ```rust
//! use yawh::Handshake;
//!
//! fn upgrade_request() -> yawh::Result<()> {
//!     let mut handshake = Handshake::new("wss://example.com:8443/chat?room=1")?;
//!     handshake
//!         .add_header("Origin", "https://example.com")
//!         .add_header("Sec-WebSocket-Protocol", "chat");
//!
//!     assert!(handshake.is_encrypted());
//!     assert_eq!(handshake.remote_address(), "example.com:8443");
//!
//!     // write `request` to an already connected socket...
//!     let request = handshake.generate_request();
//!     assert!(request.starts_with(b"GET /chat?room=1 HTTP/1.1\r\n"));
//!
//!     // ...then feed the response header block back
//!     let headers = handshake
//!         .validate_response(b"HTTP/1.1 101 Switching Protocols\r\nUpgrade: websocket\r\n\r\n")?;
//!     assert_eq!(headers.get("upgrade"), Some(&["websocket".to_string()][..]));
//!     Ok(())
//! }
//! # upgrade_request().unwrap();
//! ```
//!
//! # Stream Example
//! ```rust,no_run
//! use tokio::net::TcpStream;
//! use yawh::{Handshake, Options};
//!
//! async fn connect() -> yawh::Result<()> {
//!     let handshake = Handshake::new("ws://127.0.0.1:9001/")?;
//!     let mut stream = TcpStream::connect(handshake.remote_address()).await?;
//!
//!     let response = handshake
//!         .perform_with_options(&mut stream, Options::default().with_max_header_size(4096))
//!         .await?;
//!
//!     // bytes the server sent right after the header block belong to the framing layer
//!     let _early_frames = response.remaining;
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]

mod client;
pub mod handshake;
pub mod headers;
mod options;
pub mod response;

use thiserror::Error;

pub use client::Response;
pub use handshake::{accept_key, generate_key, verify_response, Handshake};
pub use headers::Headers;
pub use options::{Options, MAX_HEADER_SIZE};

/// A result type for handshake operations, using `HandshakeError` as the error type.
pub type Result<T> = std::result::Result<T, HandshakeError>;

/// Represents errors that can occur while negotiating the WebSocket opening handshake.
///
/// The errors are broadly categorized into:
///
/// - Construction errors (the target URL cannot be decomposed)
/// - Protocol errors (the server did not agree to switch protocols)
/// - Verification errors (the server agreed, but the upgrade headers are wrong)
/// - I/O errors raised by the transport while performing the handshake
#[derive(Error, Debug)]
pub enum HandshakeError {
    /// Wraps errors from URL parsing that may occur when processing WebSocket URLs.
    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    /// The URL parsed correctly but has no host to connect to, like `unix:/run/socket`.
    #[error("URL has no host")]
    MissingHost,

    /// The response status line is not a well formed `HTTP/1.1 101` line.
    /// Carries the offending line so that the caller can report what the server said.
    #[error("Invalid status line: {0}")]
    InvalidStatusLine(String),

    /// Indicates that the HTTP "Upgrade" header is either missing or does not contain
    /// the required "websocket" value.
    #[error("Invalid upgrade header")]
    InvalidUpgradeHeader,

    /// Indicates that the HTTP "Connection" header is either missing or does not contain
    /// the required "upgrade" token.
    #[error("Invalid connection header")]
    InvalidConnectionHeader,

    /// The "Sec-WebSocket-Accept" header is missing or does not match the digest of the key
    /// sent with the request.
    #[error("Sec-WebSocket-Accept does not match the request key")]
    InvalidAcceptKey,

    /// The response header block grew past the configured limit before the terminating
    /// empty line was found.
    #[error("Response headers too large")]
    HeaderTooLarge,

    /// The peer closed the stream before the response header block was complete.
    #[error("Connection is closed")]
    ConnectionClosed,

    /// Wraps standard I/O errors that may occur while writing the request or reading the
    /// response, such as connection resets.
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}
