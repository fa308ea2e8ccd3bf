//! Read-only byte-buffer values.
//!
//! [`ByteView`] is the value type stored by cache groups. It wraps an
//! immutable, reference-counted buffer: hits are returned by cloning the
//! handle (cheap, no data copy), and callers can only copy data out, never
//! mutate it in place. A value enters a cache exactly once, at load time,
//! and is bit-identical for every reader afterwards.

use std::fmt;

use bytes::Bytes;

use crate::traits::Weighted;

/// Immutable view over cached bytes.
///
/// # Example
///
/// ```
/// use geecache::byteview::ByteView;
///
/// let view = ByteView::from("hello");
/// assert_eq!(view.len(), 5);
///
/// // Copy-out accessor: the returned buffer is independent of the view.
/// let copied = view.to_vec();
/// assert_eq!(copied, b"hello");
///
/// // Clones share the same underlying buffer.
/// let other = view.clone();
/// assert_eq!(other.as_bytes(), view.as_bytes());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ByteView {
    bytes: Bytes,
}

impl ByteView {
    /// Returns the number of bytes in the view.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the view holds no bytes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Borrows the underlying bytes without copying.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Copies the bytes out into a fresh owned buffer.
    #[inline]
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.to_vec()
    }
}

impl Weighted for ByteView {
    fn weight(&self) -> usize {
        self.bytes.len()
    }
}

/// Renders the bytes as text, replacing invalid UTF-8 sequences.
impl fmt::Display for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(bytes: Vec<u8>) -> Self {
        Self {
            bytes: Bytes::from(bytes),
        }
    }
}

impl From<&[u8]> for ByteView {
    fn from(bytes: &[u8]) -> Self {
        Self {
            bytes: Bytes::copy_from_slice(bytes),
        }
    }
}

impl From<String> for ByteView {
    fn from(text: String) -> Self {
        Self {
            bytes: Bytes::from(text.into_bytes()),
        }
    }
}

impl From<&str> for ByteView {
    fn from(text: &str) -> Self {
        Self {
            bytes: Bytes::copy_from_slice(text.as_bytes()),
        }
    }
}
