//! Pass-through scene operations.
//!
//! Scene, asset, camera, light and animation calls are opaque to the bridge:
//! it forwards them to the engine and hands back whatever the engine answers.
//! Entity ids are never checked for liveness here.

use ember_core::EntityId;

/// Light parameters for [`SceneCall::AddLight`].
#[derive(Clone, Debug, PartialEq)]
pub struct LightDesc {
    /// Engine light type (directional, point, spot, ...).
    pub light_type: i32,
    /// Colour temperature.
    pub colour: f64,
    /// Intensity.
    pub intensity: f64,
    /// World position.
    pub position: [f64; 3],
    /// Direction vector.
    pub direction: [f64; 3],
    /// Whether the light casts shadows.
    pub shadows: bool,
}

/// One scene operation forwarded to the engine.
#[derive(Clone, Debug, PartialEq)]
pub enum SceneCall {
    /// Load a binary glTF asset.
    LoadGlb {
        /// Asset URI.
        uri: String,
        /// Load with unlit materials.
        unlit: bool,
    },
    /// Load a JSON glTF asset.
    LoadGltf {
        /// Asset URI.
        uri: String,
        /// Directory external buffers are resolved against.
        relative_resource_path: String,
    },
    /// Remove one asset.
    RemoveAsset(EntityId),
    /// Remove every asset.
    ClearAssets,
    /// Look through a camera node of an asset.
    SetCamera {
        /// Asset owning the camera.
        entity: EntityId,
        /// Node name inside the asset.
        node_name: String,
    },
    /// Add a light.
    AddLight(LightDesc),
    /// Remove one light.
    RemoveLight(EntityId),
    /// Remove every light.
    ClearLights,
    /// Start an animation.
    PlayAnimation {
        /// Animated asset.
        entity: EntityId,
        /// Animation index.
        index: i32,
        /// Loop when finished.
        looping: bool,
        /// Play backwards.
        reverse: bool,
    },
    /// Stop an animation.
    StopAnimation {
        /// Animated asset.
        entity: EntityId,
        /// Animation index.
        index: i32,
    },
    /// Load a skybox from a KTX URI.
    LoadSkybox(String),
    /// Remove the skybox.
    RemoveSkybox,
    /// Load image based lighting.
    LoadIbl {
        /// KTX URI.
        uri: String,
        /// Light intensity.
        intensity: f64,
    },
    /// Remove image based lighting.
    RemoveIbl,
    /// Clear colour as RGBA.
    SetBackgroundColor([f64; 4]),
    /// Move the active camera.
    SetCameraPosition([f64; 3]),
    /// Move an asset.
    SetPosition {
        /// Asset to move.
        entity: EntityId,
        /// New position.
        position: [f64; 3],
    },
    /// Uniformly scale an asset.
    SetScale {
        /// Asset to scale.
        entity: EntityId,
        /// Scale factor.
        scale: f64,
    },
}

impl SceneCall {
    /// Native entry point name, used in logs and failure reports.
    #[must_use]
    pub const fn native_name(&self) -> &'static str {
        match self {
            Self::LoadGlb { .. } => "load_glb",
            Self::LoadGltf { .. } => "load_gltf",
            Self::RemoveAsset(_) => "remove_asset",
            Self::ClearAssets => "clear_assets",
            Self::SetCamera { .. } => "set_camera",
            Self::AddLight(_) => "add_light",
            Self::RemoveLight(_) => "remove_light",
            Self::ClearLights => "clear_lights",
            Self::PlayAnimation { .. } => "play_animation",
            Self::StopAnimation { .. } => "stop_animation",
            Self::LoadSkybox(_) => "load_skybox",
            Self::RemoveSkybox => "remove_skybox",
            Self::LoadIbl { .. } => "load_ibl",
            Self::RemoveIbl => "remove_ibl",
            Self::SetBackgroundColor(_) => "set_background_color",
            Self::SetCameraPosition(_) => "set_camera_position",
            Self::SetPosition { .. } => "set_position",
            Self::SetScale { .. } => "set_scale",
        }
    }
}
