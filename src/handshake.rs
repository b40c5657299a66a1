//! # Client opening handshake
//!
//! A [`Handshake`] is created from the target URL, optionally extended with extra headers,
//! rendered into the HTTP/1.1 upgrade request and finally used to validate the server's reply.
//!
//! ```text
//! GET /chat HTTP/1.1
//! Connection: Upgrade
//! Upgrade: websocket
//! Sec-Websocket-Version: 13
//! Sec-Websocket-Key: AQIDBAUGBwgJCgsM
//! host: server.example.com
//!
//! ```
//!
//! The four upgrade headers always come first, followed by the accumulated headers in insertion
//! order, the first of which is the `host` header derived from the URL.

use std::str::FromStr;

use base64::prelude::*;
use bytes::{BufMut, Bytes, BytesMut};
use sha1::{Digest, Sha1};
use url::Url;

use crate::{response, HandshakeError, Headers, Result};

/// GUID appended to the key before hashing it into `Sec-WebSocket-Accept`.
const WEBSOCKET_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Number of random bytes in a `Sec-Websocket-Key` nonce.
const NONCE_LEN: usize = 12;

/// One pending client-side upgrade negotiation.
///
/// Only the header list may change after construction. The address, path and encryption flag are
/// fixed by the URL.
#[derive(Debug, Clone)]
pub struct Handshake {
    encrypted: bool,
    host: String,
    remote_address: String,
    path: String,
    headers: Headers,
}

impl Handshake {
    /// Decomposes `url` into the connection parameters of a new handshake.
    ///
    /// The `wss` scheme is encrypted with default port 443, every other scheme is plain with
    /// default port 80.
    ///
    /// # Errors
    /// - [`HandshakeError::UrlParseError`] if `url` is not a valid absolute URL.
    /// - [`HandshakeError::MissingHost`] if the URL has no host.
    pub fn new(url: &str) -> Result<Self> {
        let parsed = Url::parse(url)?;
        if matches!(parsed.scheme(), "ws" | "wss") {
            return Self::from_url(&parsed);
        }

        // `Url` drops a port equal to the known default of schemes like `https`, so an explicit
        // `:443` would vanish. Read the authority again as `ws` to keep what was written.
        let trimmed = url.trim_matches(|c: char| c <= ' ');
        let reparsed = trimmed
            .split_once(':')
            .filter(|(_, rest)| rest.starts_with("//"))
            .and_then(|(_, rest)| Url::parse(&format!("ws:{rest}")).ok());

        match reparsed {
            Some(plain) => Self::from_url(&plain),
            None => Self::from_url(&parsed),
        }
    }

    /// Same as [`Handshake::new`] for an already parsed URL. The fragment, if any, is ignored.
    ///
    /// For special schemes other than `ws`/`wss` (`http`, `https`, `ftp`), `Url` has already
    /// discarded a port equal to that scheme's own default, so such a port resolves to 80 here.
    /// Use [`Handshake::new`] with the original string to keep it.
    pub fn from_url(url: &Url) -> Result<Self> {
        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(HandshakeError::MissingHost),
        };

        let encrypted = url.scheme() == "wss";
        let default_port = if encrypted { 443 } else { 80 };
        // `Url` already drops the port when it matches the default of a special scheme
        let port = url.port().unwrap_or(default_port);

        let host_header = if port == default_port {
            host.clone()
        } else {
            format!("{host}:{port}")
        };

        let mut path = match url.path() {
            "" => "/".to_string(),
            path => path.to_string(),
        };
        if let Some(query) = url.query().filter(|query| !query.is_empty()) {
            path.push('?');
            path.push_str(query);
        }

        let mut headers = Headers::new();
        headers.append("host", host_header);

        Ok(Self {
            encrypted,
            remote_address: format!("{host}:{port}"),
            host,
            path,
            headers,
        })
    }

    /// Appends a header to the request, returning the handshake for chaining.
    ///
    /// Field names are kept as given and values are not validated. Repeating a field adds another
    /// line for it, including `host`, which callers should not repeat.
    pub fn add_header(&mut self, field: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.append(field, value);
        self
    }

    /// True when the target scheme is `wss`.
    pub fn is_encrypted(&self) -> bool {
        self.encrypted
    }

    /// `host:port` to open the transport to. The port is always present.
    pub fn remote_address(&self) -> &str {
        &self.remote_address
    }

    /// Bare host name, as needed for TLS server name indication.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Value of the `host` header set at construction.
    pub fn host_header(&self) -> &str {
        self.headers.get_first("host").unwrap_or(&self.host)
    }

    /// Request target: path plus `?query` when the URL has one.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Renders the upgrade request with a fresh `Sec-Websocket-Key`.
    ///
    /// Each call draws a new nonce, so a request re-sent after a failed attempt never reuses a key.
    /// Use [`Handshake::request_with_key`] when the key is needed to verify the response.
    pub fn generate_request(&self) -> Bytes {
        self.request_with_key(&generate_key())
    }

    /// Renders the upgrade request using `key` as `Sec-Websocket-Key`.
    pub fn request_with_key(&self, key: &str) -> Bytes {
        let mut buf = BytesMut::with_capacity(256);

        buf.put_slice(b"GET ");
        buf.put_slice(self.path.as_bytes());
        buf.put_slice(b" HTTP/1.1\r\n");
        buf.put_slice(b"Connection: Upgrade\r\n");
        buf.put_slice(b"Upgrade: websocket\r\n");
        buf.put_slice(b"Sec-Websocket-Version: 13\r\n");
        buf.put_slice(b"Sec-Websocket-Key: ");
        buf.put_slice(key.as_bytes());
        buf.put_slice(b"\r\n");

        for (field, value) in self.headers.lines() {
            buf.put_slice(field.as_bytes());
            buf.put_slice(b": ");
            buf.put_slice(value.as_bytes());
            buf.put_slice(b"\r\n");
        }

        buf.put_slice(b"\r\n");

        #[cfg(feature = "logging")]
        log::debug!(
            "generated upgrade request for {}{} ({} bytes)",
            self.remote_address,
            self.path,
            buf.len()
        );

        buf.freeze()
    }

    /// Validates the raw response status line and header block.
    ///
    /// Only the status line is checked: it must read `HTTP/1.1 101 <reason>`. The returned headers
    /// are keyed by lowercased field name. Use [`verify_response`] to also check the upgrade
    /// headers against the key that was sent.
    ///
    /// # Errors
    /// [`HandshakeError::InvalidStatusLine`] with the offending line when the server did not
    /// switch protocols.
    pub fn validate_response(&self, buffer: &[u8]) -> Result<Headers> {
        let result = response::parse(buffer);

        #[cfg(feature = "logging")]
        match &result {
            Ok(headers) => log::debug!(
                "{} accepted the upgrade with {} headers",
                self.remote_address,
                headers.len()
            ),
            Err(err) => log::debug!("{} refused the upgrade: {err}", self.remote_address),
        }

        result
    }
}

impl FromStr for Handshake {
    type Err = HandshakeError;

    fn from_str(url: &str) -> Result<Self> {
        Self::new(url)
    }
}

/// Generates a `Sec-Websocket-Key`: 12 random bytes from the thread-local CSPRNG, base64 encoded.
pub fn generate_key() -> String {
    let input: [u8; NONCE_LEN] = rand::random();
    BASE64_STANDARD.encode(input)
}

/// Computes the `Sec-WebSocket-Accept` value a server must answer for `key`.
pub fn accept_key(key: &str) -> String {
    let mut sha1 = Sha1::new();
    sha1.update(key.as_bytes());
    sha1.update(WEBSOCKET_GUID.as_bytes());
    let result = sha1.finalize();
    BASE64_STANDARD.encode(&result[..])
}

/// Checks the upgrade headers of a validated response against the `key` that was sent.
///
/// `headers` must be keyed by lowercased names, as returned by [`Handshake::validate_response`].
///
/// # Errors
/// - [`HandshakeError::InvalidUpgradeHeader`] unless `upgrade` is `websocket`.
/// - [`HandshakeError::InvalidConnectionHeader`] unless `connection` lists `upgrade`.
/// - [`HandshakeError::InvalidAcceptKey`] unless `sec-websocket-accept` matches [`accept_key`].
pub fn verify_response(headers: &Headers, key: &str) -> Result<()> {
    if !headers
        .get_first("upgrade")
        .map(|h| h.eq_ignore_ascii_case("websocket"))
        .unwrap_or(false)
    {
        return Err(HandshakeError::InvalidUpgradeHeader);
    }

    if !headers
        .get_first("connection")
        .map(|h| h.split(',').any(|token| token.trim().eq_ignore_ascii_case("upgrade")))
        .unwrap_or(false)
    {
        return Err(HandshakeError::InvalidConnectionHeader);
    }

    if headers.get_first("sec-websocket-accept") != Some(accept_key(key).as_str()) {
        return Err(HandshakeError::InvalidAcceptKey);
    }

    Ok(())
}
