//! # Host Commands
//!
//! Every host command is parsed into a [`Command`] before anything runs.
//! Parsing checks arity and per-position type against a fixed [`Signature`];
//! a mismatch is answered with `InvalidArguments` naming the expected shape,
//! and the controller is never touched.
//!
//! ```text
//!   ("resize", [512, 512])
//!        │
//!        v
//!   Command::parse ──> Err(InvalidArguments:
//!                          "resize expects [width:int, height:int, scale:float]
//!                           (expected 3 argument(s), got 2)")
//! ```

use ember_core::{
    arg, is_valid_frame_interval, ArgKind, Args, BridgeError, BridgeResult, EntityId, Signature,
    TextureId, Value, MAX_FRAME_INTERVAL_SECS,
};
use ember_surface::{LightDesc, SceneCall, SurfaceRect};

const SIZE: Signature = Signature(&[arg("width", ArgKind::Int), arg("height", ArgKind::Int)]);

const SIZE_AND_SCALE: Signature = Signature(&[
    arg("width", ArgKind::Int),
    arg("height", ArgKind::Int),
    arg("scale", ArgKind::Float),
]);

const WINDOW_RECT: Signature = Signature(&[
    arg("width", ArgKind::Int),
    arg("height", ArgKind::Int),
    arg("left", ArgKind::Int),
    arg("top", ArgKind::Int),
]);

const TEXTURE: Signature = Signature(&[arg("textureId", ArgKind::Int)]);
const ENTITY: Signature = Signature(&[arg("entityId", ArgKind::Int)]);
const ENABLED: Signature = Signature(&[arg("enabled", ArgKind::Bool)]);
const SECONDS: Signature = Signature(&[arg("seconds", ArgKind::Float)]);
const URI: Signature = Signature(&[arg("uri", ArgKind::String)]);

const LOAD_GLB: Signature = Signature(&[arg("uri", ArgKind::String), arg("unlit", ArgKind::Bool)]);

const LOAD_GLTF: Signature = Signature(&[
    arg("uri", ArgKind::String),
    arg("relativeResourcePath", ArgKind::String),
]);

const SET_CAMERA: Signature =
    Signature(&[arg("entityId", ArgKind::Int), arg("nodeName", ArgKind::String)]);

const ADD_LIGHT: Signature = Signature(&[
    arg("type", ArgKind::Int),
    arg("colour", ArgKind::Float),
    arg("intensity", ArgKind::Float),
    arg("posX", ArgKind::Float),
    arg("posY", ArgKind::Float),
    arg("posZ", ArgKind::Float),
    arg("dirX", ArgKind::Float),
    arg("dirY", ArgKind::Float),
    arg("dirZ", ArgKind::Float),
    arg("shadows", ArgKind::Bool),
]);

const PLAY_ANIMATION: Signature = Signature(&[
    arg("entityId", ArgKind::Int),
    arg("index", ArgKind::Int),
    arg("loop", ArgKind::Bool),
    arg("reverse", ArgKind::Bool),
]);

const STOP_ANIMATION: Signature =
    Signature(&[arg("entityId", ArgKind::Int), arg("index", ArgKind::Int)]);

const LOAD_IBL: Signature = Signature(&[arg("uri", ArgKind::String), arg("intensity", ArgKind::Float)]);

const COLOR: Signature = Signature(&[
    arg("r", ArgKind::Float),
    arg("g", ArgKind::Float),
    arg("b", ArgKind::Float),
    arg("a", ArgKind::Float),
]);

const POSITION: Signature = Signature(&[
    arg("x", ArgKind::Float),
    arg("y", ArgKind::Float),
    arg("z", ArgKind::Float),
]);

const ENTITY_POSITION: Signature = Signature(&[
    arg("entityId", ArgKind::Int),
    arg("x", ArgKind::Float),
    arg("y", ArgKind::Float),
    arg("z", ArgKind::Float),
]);

const ENTITY_SCALE: Signature = Signature(&[arg("entityId", ArgKind::Int), arg("scale", ArgKind::Float)]);

/// A validated host command.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Create an off-screen texture surface.
    CreateTexture {
        /// Requested width.
        width: i64,
        /// Requested height.
        height: i64,
    },
    /// Destroy a texture surface.
    DestroyTexture(TextureId),
    /// Rebuild the bound surface at a new size.
    Resize {
        /// New width.
        width: i64,
        /// New height.
        height: i64,
        /// Device pixel ratio.
        scale: f64,
    },
    /// Loader handle for the engine.
    GetResourceLoaderWrapper,
    /// Render callback pointer and context.
    GetRenderCallback,
    /// Toggle the frame pump.
    SetRendering(bool),
    /// Change the frame interval.
    SetFrameInterval(f64),
    /// Create an on-screen child window.
    CreateWindow(SurfaceRect),
    /// Destroy a window surface.
    DestroyWindow(TextureId),
    /// Move and resize the bound window.
    ResizeWindow(SurfaceRect),
    /// Tell the host one texture has a new frame.
    MarkTextureFrameAvailable(TextureId),
    /// Engine driver platform pointer.
    GetDriverPlatform,
    /// Engine shared graphics context.
    GetSharedContext,
    /// Create the renderer, optionally on a window surface.
    CreateRenderer(Option<TextureId>),
    /// Destroy the renderer.
    DestroyRenderer,
    /// Bind the renderer to a surface.
    CreateSwapchain(TextureId),
    /// Unbind the renderer.
    DestroySwapchain,
    /// Update viewport and projection only.
    UpdateViewport {
        /// Width.
        width: i64,
        /// Height.
        height: i64,
        /// Device pixel ratio.
        scale: f64,
    },
    /// Render one frame now.
    Render,
    /// Scene pass-through.
    Scene(SceneCall),
}

impl Command {
    /// Parses `name` with positional `args`.
    ///
    /// # Errors
    ///
    /// [`BridgeError::NotImplemented`] for an unknown name,
    /// [`BridgeError::InvalidArguments`] for a shape mismatch.
    pub fn parse(name: &str, args: &[Value]) -> BridgeResult<Self> {
        let expect = |signature| Args::expect(name, args, signature);
        let empty = || Args::expect(name, args, Signature::EMPTY).map(|_| ());

        let command = match name {
            "createTexture" => {
                let a = expect(SIZE)?;
                Self::CreateTexture {
                    width: a.int(0),
                    height: a.int(1),
                }
            }
            "destroyTexture" => Self::DestroyTexture(texture(&expect(TEXTURE)?, 0)),
            "resize" => {
                let a = expect(SIZE_AND_SCALE)?;
                Self::Resize {
                    width: a.int(0),
                    height: a.int(1),
                    scale: a.float(2),
                }
            }
            "getResourceLoaderWrapper" => {
                empty()?;
                Self::GetResourceLoaderWrapper
            }
            "getRenderCallback" => {
                empty()?;
                Self::GetRenderCallback
            }
            "setRendering" => Self::SetRendering(expect(ENABLED)?.bool(0)),
            "setFrameInterval" => {
                let secs = expect(SECONDS)?.float(0);
                if !is_valid_frame_interval(secs) {
                    return Err(BridgeError::InvalidArguments {
                        command: name.to_owned(),
                        reason: format!(
                            "frame interval must be in (0, {MAX_FRAME_INTERVAL_SECS}] seconds, got {secs}"
                        ),
                    });
                }
                Self::SetFrameInterval(secs)
            }
            "createWindow" => Self::CreateWindow(window_rect(name, &expect(WINDOW_RECT)?)?),
            "destroyWindow" => Self::DestroyWindow(texture(&expect(TEXTURE)?, 0)),
            "resizeWindow" => Self::ResizeWindow(window_rect(name, &expect(WINDOW_RECT)?)?),
            "markTextureFrameAvailable" => {
                Self::MarkTextureFrameAvailable(texture(&expect(TEXTURE)?, 0))
            }
            "getDriverPlatform" => {
                empty()?;
                Self::GetDriverPlatform
            }
            "getSharedContext" => {
                empty()?;
                Self::GetSharedContext
            }
            "createRenderer" => {
                let a = Args::expect_any(name, args, &[Signature::EMPTY, TEXTURE])?;
                Self::CreateRenderer((!a.is_empty()).then(|| texture(&a, 0)))
            }
            "destroyRenderer" => {
                empty()?;
                Self::DestroyRenderer
            }
            "createSwapchain" => Self::CreateSwapchain(texture(&expect(TEXTURE)?, 0)),
            "destroySwapchain" => {
                empty()?;
                Self::DestroySwapchain
            }
            "updateViewportAndCameraProjection" => {
                let a = expect(SIZE_AND_SCALE)?;
                Self::UpdateViewport {
                    width: a.int(0),
                    height: a.int(1),
                    scale: a.float(2),
                }
            }
            "render" => {
                empty()?;
                Self::Render
            }
            _ => Self::Scene(scene(name, args)?),
        };
        Ok(command)
    }

    /// Host-facing command name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CreateTexture { .. } => "createTexture",
            Self::DestroyTexture(_) => "destroyTexture",
            Self::Resize { .. } => "resize",
            Self::GetResourceLoaderWrapper => "getResourceLoaderWrapper",
            Self::GetRenderCallback => "getRenderCallback",
            Self::SetRendering(_) => "setRendering",
            Self::SetFrameInterval(_) => "setFrameInterval",
            Self::CreateWindow(_) => "createWindow",
            Self::DestroyWindow(_) => "destroyWindow",
            Self::ResizeWindow(_) => "resizeWindow",
            Self::MarkTextureFrameAvailable(_) => "markTextureFrameAvailable",
            Self::GetDriverPlatform => "getDriverPlatform",
            Self::GetSharedContext => "getSharedContext",
            Self::CreateRenderer(_) => "createRenderer",
            Self::DestroyRenderer => "destroyRenderer",
            Self::CreateSwapchain(_) => "createSwapchain",
            Self::DestroySwapchain => "destroySwapchain",
            Self::UpdateViewport { .. } => "updateViewportAndCameraProjection",
            Self::Render => "render",
            Self::Scene(call) => scene_command_name(call),
        }
    }
}

fn texture(args: &Args<'_>, index: usize) -> TextureId {
    TextureId(args.int(index))
}

fn entity(command: &str, args: &Args<'_>, index: usize) -> BridgeResult<EntityId> {
    int32(command, args, index, "entityId").map(EntityId)
}

fn int32(command: &str, args: &Args<'_>, index: usize, label: &str) -> BridgeResult<i32> {
    let value = args.int(index);
    i32::try_from(value).map_err(|_| BridgeError::InvalidArguments {
        command: command.to_owned(),
        reason: format!("{label} {value} is outside the 32-bit range"),
    })
}

fn window_rect(command: &str, args: &Args<'_>) -> BridgeResult<SurfaceRect> {
    SurfaceRect::from_host(command, args.int(0), args.int(1), args.int(2), args.int(3))
}

fn scene(name: &str, args: &[Value]) -> BridgeResult<SceneCall> {
    let expect = |signature| Args::expect(name, args, signature);
    let empty = || Args::expect(name, args, Signature::EMPTY).map(|_| ());

    let call = match name {
        "loadGlb" => {
            let a = expect(LOAD_GLB)?;
            SceneCall::LoadGlb {
                uri: a.str(0).to_owned(),
                unlit: a.bool(1),
            }
        }
        "loadGltf" => {
            let a = expect(LOAD_GLTF)?;
            SceneCall::LoadGltf {
                uri: a.str(0).to_owned(),
                relative_resource_path: a.str(1).to_owned(),
            }
        }
        "removeAsset" => SceneCall::RemoveAsset(entity(name, &expect(ENTITY)?, 0)?),
        "clearAssets" => {
            empty()?;
            SceneCall::ClearAssets
        }
        "setCamera" => {
            let a = expect(SET_CAMERA)?;
            SceneCall::SetCamera {
                entity: entity(name, &a, 0)?,
                node_name: a.str(1).to_owned(),
            }
        }
        "addLight" => {
            let a = expect(ADD_LIGHT)?;
            SceneCall::AddLight(LightDesc {
                light_type: int32(name, &a, 0, "type")?,
                colour: a.float(1),
                intensity: a.float(2),
                position: [a.float(3), a.float(4), a.float(5)],
                direction: [a.float(6), a.float(7), a.float(8)],
                shadows: a.bool(9),
            })
        }
        "removeLight" => SceneCall::RemoveLight(entity(name, &expect(ENTITY)?, 0)?),
        "clearLights" => {
            empty()?;
            SceneCall::ClearLights
        }
        "playAnimation" => {
            let a = expect(PLAY_ANIMATION)?;
            SceneCall::PlayAnimation {
                entity: entity(name, &a, 0)?,
                index: int32(name, &a, 1, "index")?,
                looping: a.bool(2),
                reverse: a.bool(3),
            }
        }
        "stopAnimation" => {
            let a = expect(STOP_ANIMATION)?;
            SceneCall::StopAnimation {
                entity: entity(name, &a, 0)?,
                index: int32(name, &a, 1, "index")?,
            }
        }
        "loadSkybox" => SceneCall::LoadSkybox(expect(URI)?.str(0).to_owned()),
        "removeSkybox" => {
            empty()?;
            SceneCall::RemoveSkybox
        }
        "loadIbl" => {
            let a = expect(LOAD_IBL)?;
            SceneCall::LoadIbl {
                uri: a.str(0).to_owned(),
                intensity: a.float(1),
            }
        }
        "removeIbl" => {
            empty()?;
            SceneCall::RemoveIbl
        }
        "setBackgroundColor" => {
            let a = expect(COLOR)?;
            SceneCall::SetBackgroundColor([a.float(0), a.float(1), a.float(2), a.float(3)])
        }
        "setCameraPosition" => {
            let a = expect(POSITION)?;
            SceneCall::SetCameraPosition([a.float(0), a.float(1), a.float(2)])
        }
        "setPosition" => {
            let a = expect(ENTITY_POSITION)?;
            SceneCall::SetPosition {
                entity: entity(name, &a, 0)?,
                position: [a.float(1), a.float(2), a.float(3)],
            }
        }
        "setScale" => {
            let a = expect(ENTITY_SCALE)?;
            SceneCall::SetScale {
                entity: entity(name, &a, 0)?,
                scale: a.float(1),
            }
        }
        _ => return Err(BridgeError::NotImplemented(name.to_owned())),
    };
    Ok(call)
}

const fn scene_command_name(call: &SceneCall) -> &'static str {
    match call {
        SceneCall::LoadGlb { .. } => "loadGlb",
        SceneCall::LoadGltf { .. } => "loadGltf",
        SceneCall::RemoveAsset(_) => "removeAsset",
        SceneCall::ClearAssets => "clearAssets",
        SceneCall::SetCamera { .. } => "setCamera",
        SceneCall::AddLight(_) => "addLight",
        SceneCall::RemoveLight(_) => "removeLight",
        SceneCall::ClearLights => "clearLights",
        SceneCall::PlayAnimation { .. } => "playAnimation",
        SceneCall::StopAnimation { .. } => "stopAnimation",
        SceneCall::LoadSkybox(_) => "loadSkybox",
        SceneCall::RemoveSkybox => "removeSkybox",
        SceneCall::LoadIbl { .. } => "loadIbl",
        SceneCall::RemoveIbl => "removeIbl",
        SceneCall::SetBackgroundColor(_) => "setBackgroundColor",
        SceneCall::SetCameraPosition(_) => "setCameraPosition",
        SceneCall::SetPosition { .. } => "setPosition",
        SceneCall::SetScale { .. } => "setScale",
    }
}
