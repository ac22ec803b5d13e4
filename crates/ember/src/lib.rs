//! # EMBER
//!
//! Host-facing side of the renderer bridge. A host plugin (one per window or
//! widget) builds a [`BridgePlugin`] around its native engine and forwards
//! every method-channel call to [`BridgePlugin::handle`].
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  Host method channel  ("createTexture", [256, 256])              │
//! └──────────────────────────────┬───────────────────────────────────┘
//!                                │ handle(name, args, responder)
//!                                v
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  BridgePlugin ── PlatformThread (optional) ── CommandFacade      │
//! │                                                  │ Command::parse │
//! └──────────────────────────────────────────────────┼───────────────┘
//!                                                    v
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  ember_surface::RenderSurfaceController  ──>  NativeEngine       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use ember::{BridgePlugin, ChannelResponder};
//! use ember_core::BridgeConfig;
//!
//! let plugin = BridgePlugin::builder(BridgeConfig::default(), engine).build()?;
//! let (tx, rx) = crossbeam_channel::bounded(1);
//! plugin.handle("createTexture", &[256.into(), 256.into()], ChannelResponder(tx));
//! let reply = rx.recv()?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod command;
pub mod executor;
pub mod facade;
pub mod plugin;
pub mod reply;

pub use command::Command;
pub use executor::PlatformThread;
pub use facade::CommandFacade;
pub use plugin::{resolver_from_config, BridgePlugin, PluginBuilder, PluginError};
pub use reply::{ChannelResponder, ErrorReply, FnResponder, Reply, Responder};

pub use ember_core;
pub use ember_surface;
