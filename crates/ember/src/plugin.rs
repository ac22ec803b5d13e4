//! # Bridge Plugin
//!
//! One plugin instance owns one full stack. Nothing is process-global, so
//! several plugin windows in one process never see each other's resources.
//!
//! ```text
//!   BridgePlugin
//!   ├── CommandFacade ──> RenderSurfaceController ──> NativeEngine
//!   │                         ├── ResourceLoaderBridge ──> ResourceRegistry
//!   │                         └── FrameNotifier ──> TextureConsumer
//!   ├── FrameDriver (+ optional FramePump thread)
//!   └── PlatformThread (optional)
//! ```
//!
//! ## Teardown
//!
//! Drop stops the frame pump first, then shuts the controller down
//! (swapchain, renderer, surfaces, loader), then stops the platform thread.

use crate::executor::PlatformThread;
use crate::facade::CommandFacade;
use crate::reply::{Reply, Responder};
use ember_core::{BridgeConfig, ConfigError, RegistryStats, RenderingState, ResourceRegistry, Value};
use ember_surface::{
    AssetResolver, BundleAssetResolver, FrameDriver, FramePump, FrameStats, HotReloadLocator,
    NativeEngine, NullTextureConsumer, RenderSurfaceController, ResourceLoaderBridge, SurfaceFactory,
    TextureConsumer, TickOutcome, WindowHost,
};
use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised while assembling a plugin.
#[derive(Error, Debug)]
pub enum PluginError {
    /// The configuration is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A worker thread could not be spawned.
    #[error("failed to spawn {name} thread: {source}")]
    Thread {
        /// Thread name.
        name: String,
        /// OS error.
        source: std::io::Error,
    },
}

/// Builds a [`BridgePlugin`].
pub struct PluginBuilder {
    config: BridgeConfig,
    engine: Arc<dyn NativeEngine>,
    consumer: Arc<dyn TextureConsumer>,
    window_host: Option<Arc<dyn WindowHost>>,
    resolver: Option<Arc<dyn AssetResolver>>,
}

impl PluginBuilder {
    /// Sets the host texture consumer.
    #[must_use]
    pub fn consumer(mut self, consumer: Arc<dyn TextureConsumer>) -> Self {
        self.consumer = consumer;
        self
    }

    /// Enables on-screen window surfaces.
    #[must_use]
    pub fn window_host(mut self, host: Arc<dyn WindowHost>) -> Self {
        self.window_host = Some(host);
        self
    }

    /// Replaces the resolver built from `[assets]`.
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn AssetResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Assembles the plugin.
    ///
    /// # Errors
    ///
    /// [`PluginError::Config`] for an invalid configuration,
    /// [`PluginError::Thread`] if the platform thread cannot start.
    pub fn build(self) -> Result<BridgePlugin, PluginError> {
        self.config.validate()?;

        let resolver: Arc<dyn AssetResolver> = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(resolver_from_config(&self.config)),
        };
        let loader = Arc::new(ResourceLoaderBridge::new(resolver, Arc::new(ResourceRegistry::new())));
        let surfaces = self
            .window_host
            .map_or_else(SurfaceFactory::offscreen_only, SurfaceFactory::with_window_host);
        let state = RenderingState::new(
            self.config.rendering.enabled_on_start,
            self.config.rendering.frame_interval_secs,
        );

        let controller = Arc::new(RenderSurfaceController::new(
            self.engine,
            loader,
            surfaces,
            self.consumer,
            state,
        ));

        let platform = if self.config.platform.dedicated_thread {
            let name = self.config.platform.thread_name.clone();
            let thread = PlatformThread::spawn(&name).map_err(|source| PluginError::Thread { name, source })?;
            Some(thread)
        } else {
            None
        };

        tracing::info!(channel = %self.config.channel_name, dedicated_thread = platform.is_some(),
            "bridge plugin ready");

        Ok(BridgePlugin {
            facade: Arc::new(CommandFacade::new(controller.clone())),
            driver: Arc::new(FrameDriver::new(controller)),
            pump: Mutex::new(None),
            platform,
            config: self.config,
        })
    }
}

/// Resolver over `[assets]`: the bundle root, configured override roots and
/// any hot-reload build directories found under the code cache.
#[must_use]
pub fn resolver_from_config(config: &BridgeConfig) -> BundleAssetResolver {
    let assets = &config.assets;
    let discovered = match (&assets.code_cache_dir, &assets.hot_reload_package) {
        (Some(cache), Some(package)) => HotReloadLocator::discover(cache, package),
        _ => Vec::new(),
    };
    if !discovered.is_empty() {
        tracing::debug!(count = discovered.len(), "hot-reload roots discovered");
    }
    BundleAssetResolver::new(&assets.bundle_root)
        .with_override_roots(assets.hot_reload_roots.iter().cloned())
        .with_override_roots(discovered)
}

/// One renderer embedding: facade, controller, frame driver and threads.
pub struct BridgePlugin {
    config: BridgeConfig,
    facade: Arc<CommandFacade>,
    driver: Arc<FrameDriver>,
    pump: Mutex<Option<FramePump>>,
    platform: Option<PlatformThread>,
}

impl BridgePlugin {
    /// Starts a builder for `engine` configured by `config`.
    #[must_use]
    pub fn builder(config: BridgeConfig, engine: Arc<dyn NativeEngine>) -> PluginBuilder {
        PluginBuilder {
            config,
            engine,
            consumer: Arc::new(NullTextureConsumer),
            window_host: None,
            resolver: None,
        }
    }

    /// Configuration the plugin was built from.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Host channel name.
    #[must_use]
    pub fn channel_name(&self) -> &str {
        &self.config.channel_name
    }

    /// Command facade.
    #[must_use]
    pub fn facade(&self) -> &Arc<CommandFacade> {
        &self.facade
    }

    /// Controller behind the facade.
    #[must_use]
    pub fn controller(&self) -> &Arc<RenderSurfaceController> {
        self.facade.controller()
    }

    /// Runs one command, on the platform thread when configured.
    ///
    /// # Errors
    ///
    /// Whatever the command fails with.
    pub fn dispatch(&self, name: &str, args: &[Value]) -> Reply {
        match &self.platform {
            Some(platform) => {
                let facade = self.facade.clone();
                let name = name.to_owned();
                let args = args.to_vec();
                platform.run(move || facade.dispatch(&name, &args))?
            }
            None => self.facade.dispatch(name, args),
        }
    }

    /// Runs one command and answers `responder` exactly once.
    pub fn handle(&self, name: &str, args: &[Value], responder: impl Responder) {
        responder.respond(self.dispatch(name, args));
    }

    /// Host vsync tick.
    pub fn on_vsync(&self, timestamp_nanos: u64) -> TickOutcome {
        self.driver.on_frame(timestamp_nanos)
    }

    /// Starts the fixed-interval frame pump. Returns false if it is already
    /// running.
    ///
    /// # Errors
    ///
    /// [`PluginError::Thread`] if the pump thread cannot start.
    pub fn start_pump(&self) -> Result<bool, PluginError> {
        let mut pump = self.pump.lock();
        if pump.as_ref().is_some_and(FramePump::is_running) {
            return Ok(false);
        }
        let name = format!("{}-frames", self.config.platform.thread_name);
        let started =
            FramePump::start(self.driver.clone(), &name).map_err(|source| PluginError::Thread { name, source })?;
        *pump = Some(started);
        Ok(true)
    }

    /// Stops the frame pump. Returns false if it was not running.
    pub fn stop_pump(&self) -> bool {
        let Some(mut pump) = self.pump.lock().take() else {
            return false;
        };
        pump.stop();
        true
    }

    /// Frame statistics.
    #[must_use]
    pub fn frame_stats(&self) -> FrameStats {
        self.driver.stats()
    }

    /// Resource registry statistics.
    #[must_use]
    pub fn registry_stats(&self) -> RegistryStats {
        self.controller().loader_bridge().registry().stats()
    }

    /// Stops the pump and tears the native stack down. Idempotent.
    pub fn shutdown(&self) {
        self.stop_pump();
        let controller = self.controller().clone();
        match &self.platform {
            Some(platform) => {
                if let Err(e) = platform.run(move || controller.shutdown()) {
                    tracing::error!(error = %e, "shutdown on platform thread failed");
                }
            }
            None => controller.shutdown(),
        }
    }
}

impl Drop for BridgePlugin {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(mut platform) = self.platform.take() {
            platform.shutdown();
        }
    }
}
