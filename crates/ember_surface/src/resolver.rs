//! # Asset Resolution
//!
//! Turns a resource URI into bytes.
//!
//! | URI                    | Source                                   |
//! |------------------------|------------------------------------------|
//! | `file:///abs/path.glb` | the file itself                          |
//! | `asset://models/a.glb` | hot-reload override, else bundle         |
//! | `models/a.glb`         | same as `asset://`                       |
//!
//! ## Hot-Reload Overrides
//!
//! During a debug cycle the host framework copies changed assets into a
//! build directory next to its code cache. Such a copy wins over the packaged
//! bundle only if it was modified after the resolver was created; among
//! several candidates the newest wins. This is a heuristic that depends on
//! host tooling, kept here as a resolver policy.

use ember_core::BridgeError;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Scheme prefix for absolute file paths.
pub const FILE_SCHEME: &str = "file://";
/// Scheme prefix for bundled assets.
pub const ASSET_SCHEME: &str = "asset://";

/// Errors raised while resolving an asset.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No source holds the asset.
    #[error("asset not found: {0}")]
    NotFound(String),

    /// A source exists but could not be read.
    #[error("failed to read {path}: {reason}")]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying I/O error.
        reason: String,
    },

    /// The key escapes the bundle root or is empty.
    #[error("invalid asset path: {0}")]
    InvalidPath(String),
}

impl From<ResolveError> for BridgeError {
    fn from(e: ResolveError) -> Self {
        Self::ResourceNotFound(e.to_string())
    }
}

/// A parsed resource URI.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AssetUri {
    /// `file://` absolute path.
    File(PathBuf),
    /// Bundle-relative key, from `asset://` or a bare path.
    Bundle(String),
}

impl AssetUri {
    /// Parses a URI string.
    #[must_use]
    pub fn parse(uri: &str) -> Self {
        if let Some(path) = uri.strip_prefix(FILE_SCHEME) {
            Self::File(PathBuf::from(path))
        } else if let Some(key) = uri.strip_prefix(ASSET_SCHEME) {
            Self::Bundle(key.to_owned())
        } else {
            Self::Bundle(uri.to_owned())
        }
    }
}

impl std::fmt::Display for AssetUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::File(path) => write!(f, "{FILE_SCHEME}{}", path.display()),
            Self::Bundle(key) => write!(f, "{ASSET_SCHEME}{key}"),
        }
    }
}

/// Source of asset bytes.
pub trait AssetResolver: Send + Sync {
    /// Reads the bytes for `uri`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] if no source holds the asset.
    fn resolve(&self, uri: &AssetUri) -> Result<Vec<u8>, ResolveError>;
}

fn read(path: &Path) -> Result<Vec<u8>, ResolveError> {
    std::fs::read(path).map_err(|e| ResolveError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

fn checked_key(key: &str) -> Result<&Path, ResolveError> {
    let path = Path::new(key);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if key.is_empty() || escapes {
        return Err(ResolveError::InvalidPath(key.to_owned()));
    }
    Ok(path)
}

/// Resolver over a packaged bundle plus hot-reload override roots.
#[derive(Clone, Debug)]
pub struct BundleAssetResolver {
    bundle_root: PathBuf,
    override_roots: Vec<PathBuf>,
    created_at: SystemTime,
}

impl BundleAssetResolver {
    /// Resolver for `bundle_root`, created now.
    #[must_use]
    pub fn new(bundle_root: impl Into<PathBuf>) -> Self {
        Self {
            bundle_root: bundle_root.into(),
            override_roots: Vec::new(),
            created_at: SystemTime::now(),
        }
    }

    /// Adds a directory searched for hot-reload overrides.
    #[must_use]
    pub fn with_override_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.override_roots.push(root.into());
        self
    }

    /// Adds several override directories.
    #[must_use]
    pub fn with_override_roots<I, P>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.override_roots.extend(roots.into_iter().map(Into::into));
        self
    }

    /// Overrides the reference time overrides are compared against.
    #[must_use]
    pub fn with_start_time(mut self, created_at: SystemTime) -> Self {
        self.created_at = created_at;
        self
    }

    /// Packaged bundle root.
    #[must_use]
    pub fn bundle_root(&self) -> &Path {
        &self.bundle_root
    }

    /// Newest override for `key` modified after creation.
    fn fresh_override(&self, key: &Path) -> Option<PathBuf> {
        self.override_roots
            .iter()
            .map(|root| root.join(key))
            .filter_map(|path| {
                let modified = std::fs::metadata(&path).ok()?.modified().ok()?;
                Some((modified, path))
            })
            .filter(|(modified, _)| *modified > self.created_at)
            .max_by_key(|(modified, _)| *modified)
            .map(|(_, path)| path)
    }
}

impl AssetResolver for BundleAssetResolver {
    fn resolve(&self, uri: &AssetUri) -> Result<Vec<u8>, ResolveError> {
        match uri {
            AssetUri::File(path) => {
                if !path.is_file() {
                    return Err(ResolveError::NotFound(uri.to_string()));
                }
                read(path)
            }
            AssetUri::Bundle(key) => {
                let key = checked_key(key)?;
                if let Some(path) = self.fresh_override(key) {
                    tracing::debug!(path = %path.display(), "using hot-reload override");
                    return read(&path);
                }
                let packaged = self.bundle_root.join(key);
                if packaged.is_file() {
                    return read(&packaged);
                }
                Err(ResolveError::NotFound(uri.to_string()))
            }
        }
    }
}

/// Finds hot-reload build directories under a code cache.
///
/// Debug builds stage assets at
/// `<code_cache>/<dir starting with package>/<package>/build/`.
pub struct HotReloadLocator;

impl HotReloadLocator {
    /// Lists candidate override roots, most recently modified first.
    #[must_use]
    pub fn discover(code_cache: &Path, package: &str) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(code_cache) else {
            return Vec::new();
        };

        let mut roots: Vec<(SystemTime, PathBuf)> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().starts_with(package))
            .map(|entry| entry.path().join(package).join("build"))
            .filter(|path| path.is_dir())
            .map(|path| {
                let modified = std::fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (modified, path)
            })
            .collect();

        roots.sort_by(|a, b| b.0.cmp(&a.0));
        roots.into_iter().map(|(_, path)| path).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn temp_dir(label: &str) -> PathBuf {
        let id = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let dir = std::env::temp_dir().join(format!("test_resolver_{label}_{id}"));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_parse_schemes() {
        assert_eq!(AssetUri::parse("file:///tmp/a.glb"), AssetUri::File("/tmp/a.glb".into()));
        assert_eq!(AssetUri::parse("asset://models/a.glb"), AssetUri::Bundle("models/a.glb".into()));
        assert_eq!(AssetUri::parse("models/a.glb"), AssetUri::Bundle("models/a.glb".into()));
        assert_eq!(AssetUri::parse("asset://x").to_string(), "asset://x");
    }

    #[test]
    fn test_rejects_escaping_keys() {
        let resolver = BundleAssetResolver::new(temp_dir("escape"));
        let err = resolver.resolve(&AssetUri::parse("asset://../secret")).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidPath(_)));
        let err = resolver.resolve(&AssetUri::parse("")).unwrap_err();
        assert!(matches!(err, ResolveError::InvalidPath(_)));
    }

    #[test]
    fn test_file_scheme_reads_absolute_path() {
        let dir = temp_dir("file");
        let path = dir.join("raw.bin");
        std::fs::write(&path, b"raw").unwrap();

        let resolver = BundleAssetResolver::new(dir.join("bundle"));
        let uri = AssetUri::File(path);
        assert_eq!(resolver.resolve(&uri).unwrap(), b"raw");

        let missing = AssetUri::File(dir.join("nope.bin"));
        assert!(matches!(resolver.resolve(&missing), Err(ResolveError::NotFound(_))));
    }

    #[test]
    fn test_stale_override_loses_to_bundle() {
        let bundle = temp_dir("stale_bundle");
        let overrides = temp_dir("stale_override");
        std::fs::write(bundle.join("a.glb"), b"packaged").unwrap();
        std::fs::write(overrides.join("a.glb"), b"override").unwrap();

        let resolver = BundleAssetResolver::new(&bundle)
            .with_override_root(&overrides)
            .with_start_time(SystemTime::now() + Duration::from_secs(3600));
        assert_eq!(resolver.resolve(&AssetUri::parse("a.glb")).unwrap(), b"packaged");
    }

    #[test]
    fn test_newest_override_wins() {
        let bundle = temp_dir("newest_bundle");
        let old = temp_dir("newest_old");
        let new = temp_dir("newest_new");
        std::fs::write(old.join("a.glb"), b"old").unwrap();
        std::thread::sleep(Duration::from_millis(20));
        std::fs::write(new.join("a.glb"), b"new").unwrap();

        let resolver = BundleAssetResolver::new(&bundle)
            .with_override_roots([&old, &new])
            .with_start_time(SystemTime::UNIX_EPOCH);
        assert_eq!(resolver.resolve(&AssetUri::parse("asset://a.glb")).unwrap(), b"new");
    }

    #[test]
    fn test_discover_build_dirs() {
        let cache = temp_dir("code_cache");
        let build = cache.join("viewer_abc").join("viewer").join("build");
        std::fs::create_dir_all(&build).unwrap();
        std::fs::create_dir_all(cache.join("other").join("viewer").join("build")).unwrap();

        let roots = HotReloadLocator::discover(&cache, "viewer");
        assert_eq!(roots, vec![build]);
        assert!(HotReloadLocator::discover(&cache.join("missing"), "viewer").is_empty());
    }
}
