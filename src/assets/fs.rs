//! Filesystem asset source
//!
//! Maps asset paths onto files under a content directory. Reads complete
//! immediately; the returned futures are already resolved.
//!
//! # Example
//! ```ignore
//! let source = FsAssetSource::new("/srv/signer");
//! let asset = source.load_model("animations/HELLO.glb").await?;
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use futures::future::{self, FutureExt, LocalBoxFuture};

use super::{glb, log_clips, AssetSource, LoadError, LoadedAsset, ModelScene};

/// Asset source rooted at a content directory
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    base_path: PathBuf,
}

impl FsAssetSource {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Resolve an asset path to a full filesystem path
    ///
    /// Returns an error if the path tries to leave the content directory.
    pub fn resolve_path(&self, asset_path: &str) -> Result<PathBuf, LoadError> {
        if asset_path.contains("..") || Path::new(asset_path).is_absolute() {
            return Err(LoadError::InvalidPath(format!(
                "Path traversal not allowed: {}",
                asset_path
            )));
        }

        let full_path = self.base_path.join(asset_path);

        // Symlinks can still point outside the content directory.
        if let (Ok(canonical_base), Ok(canonical_full)) =
            (self.base_path.canonicalize(), full_path.canonicalize())
        {
            if !canonical_full.starts_with(&canonical_base) {
                return Err(LoadError::InvalidPath(format!(
                    "Path escapes content directory: {}",
                    asset_path
                )));
            }
        }

        Ok(full_path)
    }

    fn read(&self, asset_path: &str) -> Result<Vec<u8>, LoadError> {
        let full_path = self.resolve_path(asset_path)?;
        fs::read(&full_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => LoadError::NotFound(asset_path.to_string()),
            _ => LoadError::Io {
                path: asset_path.to_string(),
                message: e.to_string(),
            },
        })
    }

    fn read_text(&self, asset_path: &str) -> Result<String, LoadError> {
        let bytes = self.read(asset_path)?;
        String::from_utf8(bytes).map_err(|e| LoadError::Decode {
            path: asset_path.to_string(),
            reason: e.to_string(),
        })
    }

    fn read_model(&self, asset_path: &str) -> Result<LoadedAsset, LoadError> {
        let bytes = self.read(asset_path)?;
        let clips = glb::inspect(&bytes).map_err(|e| LoadError::Decode {
            path: asset_path.to_string(),
            reason: e.to_string(),
        })?;
        log_clips(asset_path, &clips);

        Ok(LoadedAsset {
            scene: ModelScene::new(asset_path),
            clips,
        })
    }
}

impl AssetSource for FsAssetSource {
    fn fetch_text(&self, path: &str) -> LocalBoxFuture<'static, Result<String, LoadError>> {
        future::ready(self.read_text(path)).boxed_local()
    }

    fn load_model(&self, path: &str) -> LocalBoxFuture<'static, Result<LoadedAsset, LoadError>> {
        future::ready(self.read_model(path)).boxed_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::glb::encode_glb;
    use futures::executor::block_on;

    const CLIP_DOC: &str = r#"{
        "accessors": [{"max": [1.2]}],
        "animations": [{"name": "HELLO", "channels": [{"sampler": 0, "target": {"path": "weights"}}], "samplers": [{"input": 0}]}]
    }"#;

    fn content_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("animations")).unwrap();
        fs::write(dir.path().join("animations/HELLO.glb"), encode_glb(CLIP_DOC)).unwrap();
        fs::write(dir.path().join("animations/broken.glb"), b"not a glb at all").unwrap();
        fs::write(dir.path().join("signs.json"), r#"{"HELLO": {"file": "HELLO.glb"}}"#).unwrap();
        dir
    }

    #[test]
    fn test_load_model() {
        let dir = content_dir();
        let source = FsAssetSource::new(dir.path());

        let asset = block_on(source.load_model("animations/HELLO.glb")).unwrap();
        assert_eq!(asset.clips.len(), 1);
        assert_eq!(asset.clips[0].name, "HELLO");
        assert_eq!(asset.scene.source(), "animations/HELLO.glb");
    }

    #[test]
    fn test_load_model_missing() {
        let dir = content_dir();
        let source = FsAssetSource::new(dir.path());

        let err = block_on(source.load_model("animations/NOPE.glb")).unwrap_err();
        assert_eq!(err, LoadError::NotFound("animations/NOPE.glb".into()));
    }

    #[test]
    fn test_load_model_undecodable() {
        let dir = content_dir();
        let source = FsAssetSource::new(dir.path());

        let err = block_on(source.load_model("animations/broken.glb")).unwrap_err();
        assert!(matches!(err, LoadError::Decode { .. }));
    }

    #[test]
    fn test_fetch_text() {
        let dir = content_dir();
        let source = FsAssetSource::new(dir.path());

        let text = block_on(source.fetch_text("signs.json")).unwrap();
        assert!(text.contains("HELLO.glb"));
    }

    #[test]
    fn test_path_traversal_rejected() {
        let dir = content_dir();
        let source = FsAssetSource::new(dir.path());

        assert!(matches!(
            source.resolve_path("../etc/passwd"),
            Err(LoadError::InvalidPath(_))
        ));
        assert!(matches!(
            source.resolve_path("/etc/passwd"),
            Err(LoadError::InvalidPath(_))
        ));
    }
}
