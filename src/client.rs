use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{generate_key, verify_response, Handshake, HandshakeError, Headers, Options, Result};

/// End of an HTTP header block.
const TERMINATOR: &[u8] = b"\r\n\r\n";

/// The outcome of a successful handshake performed over a stream.
#[derive(Debug)]
pub struct Response {
    /// Response headers keyed by lowercased field name.
    pub headers: Headers,
    /// Bytes read past the end of the header block.
    ///
    /// A server may start sending frames right after its response. These bytes belong to the
    /// framing layer and must be consumed before reading from the stream again.
    pub remaining: BytesMut,
}

impl Handshake {
    /// Performs the handshake over an already established connection with default [`Options`].
    ///
    /// See [`Handshake::perform_with_options`].
    pub async fn perform<S>(self, io: &mut S) -> Result<Response>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.perform_with_options(io, Options::default()).await
    }

    /// Writes the upgrade request to `io`, reads the response header block and validates it.
    ///
    /// The handshake is consumed: a failed attempt can not be retried with the same value, the
    /// caller has to tear down the connection and start over with a new [`Handshake`].
    ///
    /// # Errors
    /// - [`HandshakeError::IoError`] if writing or reading fails.
    /// - [`HandshakeError::ConnectionClosed`] if the stream ends before the header block does.
    /// - [`HandshakeError::HeaderTooLarge`] if the header block exceeds the configured limit.
    /// - [`HandshakeError::InvalidStatusLine`] if the server did not switch protocols.
    /// - The errors of [`verify_response`] unless verification was disabled.
    pub async fn perform_with_options<S>(self, io: &mut S, options: Options) -> Result<Response>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let key = generate_key();
        let request = self.request_with_key(&key);

        io.write_all(&request).await?;
        io.flush().await?;

        let limit = options.header_limit();
        let mut buf = BytesMut::with_capacity(1024);
        let mut scanned = 0usize;

        let end = loop {
            // resume the search where the previous read stopped, minus a partial terminator
            let from = scanned.saturating_sub(TERMINATOR.len() - 1);
            if let Some(pos) = buf[from..]
                .windows(TERMINATOR.len())
                .position(|window| window == TERMINATOR)
            {
                break from + pos + TERMINATOR.len();
            }
            scanned = buf.len();

            if buf.len() >= limit {
                return Err(HandshakeError::HeaderTooLarge);
            }

            if io.read_buf(&mut buf).await? == 0 {
                return Err(HandshakeError::ConnectionClosed);
            }
        };

        if end > limit {
            return Err(HandshakeError::HeaderTooLarge);
        }

        let head = buf.split_to(end);
        let headers = self.validate_response(&head)?;

        if options.verify_headers {
            verify_response(&headers, &key)?;
        }

        #[cfg(feature = "logging")]
        log::debug!(
            "handshake with {} complete, {} bytes already buffered",
            self.remote_address(),
            buf.len()
        );

        Ok(Response {
            headers,
            remaining: buf,
        })
    }
}
