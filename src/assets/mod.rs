//! Animation asset boundary
//!
//! The 3D engine and its model loader are external. This module describes
//! what the rest of the crate needs from them: a byte/text fetch for the
//! metadata document, and a model load that yields an opaque scene handle
//! plus the animation clips it carries.
//!
//! # Architecture
//!
//! - [`AssetSource`] is the loader capability. Loads are futures so a slow
//!   fetch suspends only the task that asked for it.
//! - [`ModelScene`] is an opaque handle to a renderable model owned by the
//!   external engine.
//! - [`glb`] inspects binary glTF containers; [`fs`] is a filesystem
//!   implementation of [`AssetSource`] built on it.
//! - [`memory`] serves registered in-memory entries.

pub mod fs;
pub mod glb;
pub mod memory;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::LocalBoxFuture;

pub use fs::FsAssetSource;
pub use memory::MemoryAssetSource;

static NEXT_MODEL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a loaded model inside the external scene graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(u64);

impl ModelId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

/// Opaque handle to a renderable model (scene + mesh)
///
/// Every call to [`ModelScene::new`] yields a distinct identity, so two loads
/// of the same file are two different models.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModelScene {
    id: ModelId,
    source: String,
}

impl ModelScene {
    /// Register a new model loaded from `source`
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            id: ModelId(NEXT_MODEL_ID.fetch_add(1, Ordering::Relaxed)),
            source: source.into(),
        }
    }

    pub fn id(&self) -> ModelId {
        self.id
    }

    /// Path the model was loaded from
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// What an animation clip deforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationBinding {
    /// Morph-target animation tied to the clip's own mesh; playing it means
    /// swapping that mesh into the scene.
    #[default]
    MeshBound,
    /// Node-transform animation driving the shared avatar skeleton; can be
    /// cross-faded on the idle model's controller.
    SharedRig,
}

/// Animation clip description
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: Duration,
    pub binding: AnimationBinding,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            duration,
            binding: AnimationBinding::MeshBound,
        }
    }

    pub fn with_binding(mut self, binding: AnimationBinding) -> Self {
        self.binding = binding;
        self
    }
}

/// A loaded asset: one model and the clips packaged with it
#[derive(Debug, Clone)]
pub struct LoadedAsset {
    pub scene: ModelScene,
    pub clips: Vec<AnimationClip>,
}

impl LoadedAsset {
    /// Only the first clip of an asset is ever played
    pub fn first_clip(&self) -> Option<&AnimationClip> {
        self.clips.first()
    }
}

/// Errors reported by an [`AssetSource`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("Asset not found: {0}")]
    NotFound(String),

    #[error("I/O error reading {path}: {message}")]
    Io { path: String, message: String },

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Could not decode {path}: {reason}")]
    Decode { path: String, reason: String },

    #[error("Asset {0} contains no animation clips")]
    NoClips(String),
}

/// Loading capability provided by the host
pub trait AssetSource {
    /// Fetch a text document such as the sign metadata table
    fn fetch_text(&self, path: &str) -> LocalBoxFuture<'static, Result<String, LoadError>>;

    /// Load a model and its animation clips
    fn load_model(&self, path: &str) -> LocalBoxFuture<'static, Result<LoadedAsset, LoadError>>;
}

/// Log the clip inventory of a freshly loaded asset
pub(crate) fn log_clips(path: &str, clips: &[AnimationClip]) {
    log::debug!("{} has {} animations.", path, clips.len());
    for (i, clip) in clips.iter().enumerate() {
        log::debug!(
            "  Animation {}: \"{}\" ({:.2}s)",
            i,
            clip.name,
            clip.duration.as_secs_f32()
        );
    }
}
