//! BLAKE3 file hasher with streaming support.
//!
//! # Overview
//!
//! [`Hasher`] computes the content fingerprint of a file by reading it in
//! fixed-size chunks and feeding each chunk into an incremental BLAKE3
//! state. Memory use is bounded by the buffer size no matter how large the
//! file is.
//!
//! The fingerprint depends only on the bytes of the file: name, location and
//! modification time never influence it.
//!
//! # Example
//!
//! ```no_run
//! use dedupe_flatten::scanner::{hash_to_hex, Hasher};
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let fingerprint = hasher.fingerprint(Path::new("photo.jpg")).unwrap();
//! println!("{}", hash_to_hex(&fingerprint));
//! ```

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use super::HashError;

/// 256-bit BLAKE3 digest of a file's full content.
pub type Fingerprint = [u8; 32];

/// Default read buffer size (1 MiB).
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Smallest buffer the hasher will use.
pub const MIN_BUFFER_SIZE: usize = 1024;

/// Streaming content hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    buffer_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default 1 MiB buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Set the read buffer size. Values below 1 KiB are raised to 1 KiB.
    #[must_use]
    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(MIN_BUFFER_SIZE);
        self
    }

    /// The read buffer size in bytes.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Compute the fingerprint of the file at `path`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the file disappeared
    /// - `PermissionDenied` if it cannot be opened for reading
    /// - `Io` for any other failure, including a read failing mid-stream
    pub fn fingerprint(&self, path: &Path) -> Result<Fingerprint, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        self.fingerprint_reader(&mut file)
            .map_err(|e| HashError::from_io(path, e))
    }

    /// Compute the fingerprint of everything readable from `reader`.
    ///
    /// # Errors
    ///
    /// Returns the first I/O error reported by the reader.
    pub fn fingerprint_reader<R: Read>(&self, reader: &mut R) -> std::io::Result<Fingerprint> {
        let mut state = blake3::Hasher::new();
        let mut buffer = vec![0u8; self.buffer_size];

        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => {
                    state.update(&buffer[..n]);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(*state.finalize().as_bytes())
    }
}

/// Render a fingerprint as 64 lowercase hex characters.
#[must_use]
pub fn hash_to_hex(hash: &Fingerprint) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(64);
    for byte in hash {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Parse a 64 character hex string back into a fingerprint.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Fingerprint> {
    if hex.len() != 64 || !hex.is_ascii() {
        return None;
    }

    let mut hash = [0u8; 32];
    for (i, byte) in hash.iter_mut().enumerate() {
        *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).ok()?;
    }
    Some(hash)
}
