/// The maximum size of a response header block, set to 8 KiB.
///
/// Servers answering an upgrade send a handful of short headers, anything past this limit
/// is treated as a misbehaving peer.
pub const MAX_HEADER_SIZE: usize = 8 * 1024;

/// Configuration for [`Handshake::perform_with_options`](crate::Handshake::perform_with_options).
///
/// ```
/// use yawh::Options;
///
/// let options = Options::default()
///     .with_max_header_size(4096)
///     .without_verification();
/// # let _ = options;
/// ```
#[derive(Clone, Debug)]
pub struct Options {
    /// Maximum number of bytes read while looking for the end of the response headers.
    pub max_header_size: Option<usize>,

    /// Whether the `Upgrade`, `Connection` and `Sec-WebSocket-Accept` response headers are
    /// checked after the status line.
    pub verify_headers: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            max_header_size: None,
            verify_headers: true,
        }
    }
}

impl Options {
    /// Sets the maximum size of the response header block.
    ///
    /// Defaults to [`MAX_HEADER_SIZE`].
    pub fn with_max_header_size(self, size: usize) -> Self {
        Self {
            max_header_size: Some(size),
            ..self
        }
    }

    /// Accepts any `101` response regardless of its upgrade headers.
    ///
    /// Some servers (mostly test fixtures and old proxies) answer with a bare status line. Only the
    /// status line is validated once this is set.
    pub fn without_verification(self) -> Self {
        Self {
            verify_headers: false,
            ..self
        }
    }

    pub(crate) fn header_limit(&self) -> usize {
        self.max_header_size.unwrap_or(MAX_HEADER_SIZE)
    }
}
