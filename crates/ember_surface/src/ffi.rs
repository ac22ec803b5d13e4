//! C ABI types shared with the native engine.
//!
//! The engine calls back into the bridge through plain `extern "C"` function
//! pointers plus an opaque owner pointer chosen at registration time.

use ember_core::{ResourceBuffer, EMPTY_RESOURCE_ID};
use std::ffi::{c_char, c_void};

/// Largest payload the C ABI can describe (`i32::MAX` bytes).
pub const MAX_RESOURCE_BYTES: usize = 0x7FFF_FFFF;

/// Resource buffer as seen by the engine.
///
/// `data` stays valid until the engine calls the free callback with `id`.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawResourceBuffer {
    /// First byte of the payload, null for the empty buffer.
    pub data: *const u8,
    /// Payload length in bytes.
    pub size: i32,
    /// Registry id, zero for the empty buffer.
    pub id: i32,
}

impl RawResourceBuffer {
    /// The `{ id: 0, size: 0 }` answer.
    pub const EMPTY: Self = Self {
        data: std::ptr::null(),
        size: 0,
        id: 0,
    };

    /// Returns true for the empty answer.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.id == 0
    }
}

impl From<&ResourceBuffer> for RawResourceBuffer {
    fn from(buffer: &ResourceBuffer) -> Self {
        let (Ok(id), Ok(size)) = (i32::try_from(buffer.id()), i32::try_from(buffer.size())) else {
            tracing::warn!(id = buffer.id(), size = buffer.size(), "resource does not fit the C ABI");
            return Self::EMPTY;
        };
        if buffer.id() == EMPTY_RESOURCE_ID {
            return Self::EMPTY;
        }
        Self {
            data: buffer.data().as_ptr(),
            size,
            id,
        }
    }
}

/// `load(uri, owner)` callback handed to the engine.
pub type LoadResourceFn = extern "C" fn(uri: *const c_char, owner: *mut c_void) -> RawResourceBuffer;

/// `free(id, owner)` callback handed to the engine.
pub type FreeResourceFn = extern "C" fn(id: i32, owner: *mut c_void);

/// Frame-ready callback handed to the engine; `context` is chosen by the bridge.
pub type RenderCallbackFn = extern "C" fn(context: *mut c_void);
