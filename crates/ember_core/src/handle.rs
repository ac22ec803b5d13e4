//! # Opaque Native Handles
//!
//! Addresses handed out by the native engine or the platform. The core never
//! dereferences them and offers no arithmetic on them; they are carried
//! verbatim between the engine and the host.
//!
//! Handles are built from raw addresses by the FFI layer only
//! ([`from_address`](RendererHandle::from_address)) and read back as an
//! integer when a reply must carry them across the host codec.

macro_rules! native_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(transparent)]
        pub struct $name(usize);

        impl $name {
            /// Wraps a raw address produced at the FFI boundary.
            #[inline]
            #[must_use]
            pub const fn from_address(address: usize) -> Self {
                Self(address)
            }

            /// Returns the raw address.
            #[inline]
            #[must_use]
            pub const fn address(self) -> usize {
                self.0
            }

            /// Returns true if the address is zero.
            #[inline]
            #[must_use]
            pub const fn is_null(self) -> bool {
                self.0 == 0
            }

            /// Address as the host codec's integer type.
            #[inline]
            #[must_use]
            #[allow(clippy::cast_possible_wrap)]
            pub const fn to_host_int(self) -> i64 {
                self.0 as i64
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({:#x})", stringify!($name), self.0)
            }
        }
    };
}

native_handle! {
    /// One renderer instance inside the native engine.
    RendererHandle
}

native_handle! {
    /// Resource loader registered with the engine.
    LoaderHandle
}

native_handle! {
    /// Platform window passed to the engine at renderer creation.
    WindowHandle
}

native_handle! {
    /// Drawable backing store bound to a swapchain.
    SurfaceHandle
}

/// Opaque entity token returned by the engine for assets and lights.
///
/// Never validated here; stale ids are the engine's error to raise.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct EntityId(pub i32);

/// Identifier of a surface owned by a controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub i64);

impl std::fmt::Display for TextureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "texture#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_is_opaque_address() {
        let handle = RendererHandle::from_address(0xdead_beef);
        assert_eq!(handle.address(), 0xdead_beef);
        assert_eq!(handle.to_host_int(), 0xdead_beef);
        assert!(!handle.is_null());
        assert!(LoaderHandle::from_address(0).is_null());
        assert_eq!(handle.to_string(), "RendererHandle(0xdeadbeef)");
    }
}
