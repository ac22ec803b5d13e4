//! Id-tagged byte buffers handed to the native engine.

use std::sync::Arc;

/// Id reserved for "not found / empty".
pub const EMPTY_RESOURCE_ID: u32 = 0;

/// A loaded asset payload.
///
/// The bytes are shared with the [`ResourceRegistry`](crate::ResourceRegistry),
/// which keeps them alive until the engine frees the id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResourceBuffer {
    id: u32,
    data: Arc<[u8]>,
}

impl ResourceBuffer {
    pub(crate) fn new(id: u32, data: Arc<[u8]>) -> Self {
        Self { id, data }
    }

    /// The sentinel `{ id: 0, size: 0 }` buffer.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            id: EMPTY_RESOURCE_ID,
            data: Arc::from(Vec::new()),
        }
    }

    /// Registry id; zero for the sentinel.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> u32 {
        self.id
    }

    /// Payload bytes.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Payload length in bytes.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Returns true for the sentinel buffer.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.id == EMPTY_RESOURCE_ID
    }
}

impl Default for ResourceBuffer {
    fn default() -> Self {
        Self::empty()
    }
}
