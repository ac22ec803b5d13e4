//! Integration tests for resource loading through the engine callbacks.

use ember::BridgePlugin;
use ember_core::{BridgeConfig, ResourceRegistry};
use ember_surface::testing::RecordingEngine;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

fn temp_dir(label: &str) -> PathBuf {
    let id = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("test_ember_{label}_{id}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn plugin_over(config: BridgeConfig) -> (Arc<RecordingEngine>, BridgePlugin) {
    let engine = Arc::new(RecordingEngine::new());
    let plugin = BridgePlugin::builder(config, engine.clone()).build().unwrap();
    plugin.dispatch("getResourceLoaderWrapper", &[]).unwrap();
    (engine, plugin)
}

#[test]
fn test_concurrent_register_ids_distinct_and_monotonic() {
    let registry = Arc::new(ResourceRegistry::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = registry.clone();
            thread::spawn(move || {
                let ids: Vec<u32> = (0..500).map(|_| registry.register(vec![1u8; 16]).id()).collect();
                assert!(ids.windows(2).all(|w| w[0] < w[1]));
                ids
            })
        })
        .collect();

    let mut seen = HashSet::new();
    for handle in handles {
        for id in handle.join().unwrap() {
            assert_ne!(id, 0);
            assert!(seen.insert(id), "id {id} handed out twice");
        }
    }
    assert_eq!(seen.len(), 4000);

    for id in 1..=100 {
        assert!(registry.release(id));
    }
    let next = registry.register(vec![0u8]).id();
    assert_eq!(next, 4001);
    assert!(!registry.release(999_999));
}

#[test]
fn test_engine_loads_bundled_asset() {
    let bundle = temp_dir("bundle");
    std::fs::create_dir_all(bundle.join("models")).unwrap();
    std::fs::write(bundle.join("models/a.glb"), b"glTF-packaged").unwrap();

    let (engine, plugin) = plugin_over(BridgeConfig::default().with_bundle_root(&bundle));

    let (id, bytes) = engine.request_resource("asset://models/a.glb").unwrap();
    assert!(id > 0);
    assert_eq!(bytes, b"glTF-packaged");
    let (_, bare) = engine.request_resource("models/a.glb").unwrap();
    assert_eq!(bare, b"glTF-packaged");
    assert_eq!(plugin.registry_stats().live, 2);

    engine.release_resource(id);
    engine.release_resource(id);
    engine.release_resource(12_345);
    assert_eq!(plugin.registry_stats().live, 1);
}

#[test]
fn test_missing_asset_answers_empty_buffer() {
    let bundle = temp_dir("missing");
    let (engine, plugin) = plugin_over(BridgeConfig::default().with_bundle_root(&bundle));

    let (id, bytes) = engine.request_resource("asset://foo.glb").unwrap();
    assert_eq!(id, 0);
    assert!(bytes.is_empty());
    assert_eq!(plugin.registry_stats().live, 0);
    assert_eq!(plugin.registry_stats().empty_answers, 1);
}

#[test]
fn test_hot_reload_override_newer_than_start_wins() {
    let bundle = temp_dir("hot_bundle");
    let overrides = temp_dir("hot_override");
    std::fs::write(bundle.join("foo.glb"), b"packaged").unwrap();

    let config = BridgeConfig::default()
        .with_bundle_root(&bundle)
        .with_hot_reload_root(&overrides);
    let (engine, _plugin) = plugin_over(config);

    let (_, before) = engine.request_resource("asset://foo.glb").unwrap();
    assert_eq!(before, b"packaged");

    thread::sleep(Duration::from_millis(20));
    std::fs::write(overrides.join("foo.glb"), b"override").unwrap();
    let (_, after) = engine.request_resource("asset://foo.glb").unwrap();
    assert_eq!(after, b"override");
}

#[test]
fn test_hot_reload_dirs_discovered_from_code_cache() {
    let bundle = temp_dir("cache_bundle");
    let cache = temp_dir("code_cache");
    let build = cache.join("viewer_x1").join("viewer").join("build");
    std::fs::create_dir_all(&build).unwrap();
    std::fs::write(bundle.join("foo.glb"), b"packaged").unwrap();

    let mut config = BridgeConfig::default().with_bundle_root(&bundle);
    config.assets.code_cache_dir = Some(cache);
    config.assets.hot_reload_package = Some("viewer".to_owned());
    let (engine, _plugin) = plugin_over(config);

    thread::sleep(Duration::from_millis(20));
    std::fs::write(build.join("foo.glb"), b"hot").unwrap();
    let (_, bytes) = engine.request_resource("foo.glb").unwrap();
    assert_eq!(bytes, b"hot");
}

#[test]
fn test_plugin_instances_are_isolated() {
    let bundle = temp_dir("isolated");
    std::fs::write(bundle.join("a.glb"), b"a").unwrap();

    let (first_engine, first) = plugin_over(BridgeConfig::default().with_bundle_root(&bundle));
    let (second_engine, second) = plugin_over(BridgeConfig::default().with_bundle_root(&bundle));

    let (a, _) = first_engine.request_resource("a.glb").unwrap();
    let (b, _) = second_engine.request_resource("a.glb").unwrap();
    assert_eq!((a, b), (1, 1));

    first_engine.release_resource(a);
    assert_eq!(first.registry_stats().live, 0);
    assert_eq!(second.registry_stats().live, 1);
}

#[test]
fn test_shutdown_releases_outstanding_buffers() {
    let bundle = temp_dir("shutdown");
    std::fs::write(bundle.join("a.glb"), b"abc").unwrap();
    let (engine, plugin) = plugin_over(BridgeConfig::default().with_bundle_root(&bundle));

    engine.request_resource("a.glb").unwrap();
    engine.request_resource("a.glb").unwrap();
    assert_eq!(plugin.registry_stats().live, 2);

    plugin.shutdown();
    assert_eq!(plugin.registry_stats().live, 0);
    assert!(engine.request_resource("a.glb").is_none());
}
