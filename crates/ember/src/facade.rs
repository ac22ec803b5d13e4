//! # Command Facade
//!
//! `dispatch(name, args)` is the only entry point a host needs:
//!
//! ```text
//!   dispatch("resize", [512, 512, 1.0])
//!        │
//!        ├─ Command::parse      shape errors stop here, no native call
//!        │
//!        ├─ execute             controller / engine
//!        │
//!        └─ Value               host-codec reply
//! ```
//!
//! | Command                  | Reply                                    |
//! |--------------------------|------------------------------------------|
//! | `createTexture`          | `[textureId, handleAddress, null]`       |
//! | `resize`                 | `textureId`                              |
//! | `getRenderCallback`      | `[callbackAddress, contextAddress]`      |
//! | scene commands           | engine answer; `false` is a failure      |

use crate::command::Command;
use crate::reply::{Reply, Responder};
use ember_core::{BridgeError, BridgeResult, Value};
use ember_surface::{RenderSurfaceController, SceneCall, TextureInfo};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Validates and executes host commands against one controller.
pub struct CommandFacade {
    controller: Arc<RenderSurfaceController>,
}

impl CommandFacade {
    /// Creates a facade over `controller`.
    #[must_use]
    pub fn new(controller: Arc<RenderSurfaceController>) -> Self {
        Self { controller }
    }

    /// Controller behind this facade.
    #[must_use]
    pub fn controller(&self) -> &Arc<RenderSurfaceController> {
        &self.controller
    }

    /// Parses and executes one command.
    ///
    /// # Errors
    ///
    /// Any [`BridgeError`]; shape and name errors are raised before the
    /// controller is touched.
    pub fn dispatch(&self, name: &str, args: &[Value]) -> Reply {
        let result = Command::parse(name, args).and_then(|command| self.execute(command));
        match &result {
            Ok(_) => tracing::debug!(command = name, "command completed"),
            Err(e) => tracing::warn!(command = name, code = e.code(), error = %e, "command failed"),
        }
        result
    }

    /// Dispatches and hands the result to `responder`.
    pub fn handle(&self, name: &str, args: &[Value], responder: impl Responder) {
        responder.respond(self.dispatch(name, args));
    }

    /// Executes an already validated command.
    ///
    /// # Errors
    ///
    /// Lifecycle and native errors from the controller.
    pub fn execute(&self, command: Command) -> BridgeResult<Value> {
        let c = &self.controller;
        let value = match command {
            Command::CreateTexture { width, height } => texture_reply(&c.create_texture(width, height)?),
            Command::DestroyTexture(id) | Command::DestroyWindow(id) => {
                Value::Bool(c.destroy_texture(id)?)
            }
            Command::Resize {
                width,
                height,
                scale,
            } => Value::Int(c.resize(width, height, scale)?.0),
            Command::GetResourceLoaderWrapper => Value::Int(c.loader_handle()?.to_host_int()),
            Command::GetRenderCallback => {
                let (callback, context) = c.notifier().render_callback();
                Value::List(vec![address(callback as usize), address(context as usize)])
            }
            Command::SetRendering(enabled) => {
                c.rendering_state().set_rendering(enabled);
                tracing::info!(enabled, "rendering toggled");
                Value::Bool(true)
            }
            Command::SetFrameInterval(secs) => Value::Bool(c.set_frame_interval(secs)),
            Command::CreateWindow(rect) => texture_reply(&c.create_window(rect)?),
            Command::ResizeWindow(rect) => Value::Int(c.resize_window(rect)?.0),
            Command::MarkTextureFrameAvailable(id) => {
                if !c.mark_frame_available(id) {
                    tracing::debug!(%id, "frame mark for unknown or on-screen surface");
                }
                Value::Null
            }
            Command::GetDriverPlatform => c.engine().driver_platform().map_or(Value::Null, address),
            Command::GetSharedContext => c.engine().shared_context().map_or(Value::Null, address),
            Command::CreateRenderer(window) => Value::Int(c.create_renderer(window)?.to_host_int()),
            Command::DestroyRenderer => Value::Bool(c.destroy_renderer()),
            Command::CreateSwapchain(id) => {
                c.create_swapchain(id)?;
                Value::Bool(true)
            }
            Command::DestroySwapchain => Value::Bool(c.destroy_swapchain()?),
            Command::UpdateViewport {
                width,
                height,
                scale,
            } => {
                c.update_viewport(width, height, scale)?;
                Value::Bool(true)
            }
            Command::Render => Value::Bool(c.render_now(now_nanos())?.rendered()),
            Command::Scene(call) => self.scene(&call)?,
        };
        Ok(value)
    }

    fn scene(&self, call: &SceneCall) -> BridgeResult<Value> {
        let answer = self.controller.scene(call)?;
        if answer == Value::Bool(false) {
            return Err(BridgeError::native(call.native_name(), answer));
        }
        Ok(answer)
    }
}

fn texture_reply(info: &TextureInfo) -> Value {
    Value::List(vec![
        Value::Int(info.id.0),
        Value::Int(info.handle.to_host_int()),
        Value::Null,
    ])
}

#[allow(clippy::cast_possible_wrap)]
const fn address(addr: usize) -> Value {
    Value::Int(addr as i64)
}

fn now_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
}
