//! # EMBER Core
//!
//! Shared types for the native-renderer embedding bridge:
//! - Opaque handles for renderer, loader, window and surface addresses
//! - The resource buffer registry that keeps asset bytes alive for the engine
//! - Rendering flags read by the frame pump
//! - Host values, argument shapes, errors and configuration
//!
//! ## Architecture Rules
//!
//! 1. **Handles are opaque** - never dereferenced, no arithmetic
//! 2. **No globals** - every plugin instance owns its registry and state
//! 3. **Loader failures degrade** - a missing asset is an empty buffer, not an error
//!
//! ## Example
//!
//! ```rust
//! use ember_core::ResourceRegistry;
//!
//! let registry = ResourceRegistry::new();
//! let buffer = registry.register(vec![0u8; 64]);
//! assert_eq!(buffer.id(), 1);
//! assert!(registry.release(buffer.id()));
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod handle;
pub mod registry;
pub mod resource;
pub mod state;
pub mod value;

pub use config::{AssetConfig, BridgeConfig, ConfigError, PlatformConfig, RenderingConfig};
pub use error::{BridgeError, BridgeResult, ErrorKind};
pub use handle::{EntityId, LoaderHandle, RendererHandle, SurfaceHandle, TextureId, WindowHandle};
pub use registry::{RegistryStats, ResourceRegistry};
pub use resource::{ResourceBuffer, EMPTY_RESOURCE_ID};
pub use state::{
    is_valid_frame_interval, RenderingState, DEFAULT_FRAME_INTERVAL_SECS, MAX_FRAME_INTERVAL_SECS,
};
pub use value::{arg, ArgKind, ArgSpec, Args, Signature, Value};
