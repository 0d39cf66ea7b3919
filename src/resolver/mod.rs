//! Sign resolution
//!
//! Decides how a sign identifier is presented:
//!
//! 1. **Exact**: the metadata names an animation file and the file loads
//!    with a real (non-placeholder) clip.
//! 2. **Compound**: no file, but the identifier splits on `-`/`_` into parts
//!    of which at least one has a file of its own.
//! 3. **Fingerspell**: anything else, including load failures and
//!    placeholder content.
//!
//! Exact results are cached for the life of the resolver. A cache hit
//! short-circuits resolution: no metadata check, no load.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::LazyLock;

use futures::future::{FutureExt, LocalBoxFuture, Shared};
use regex::Regex;

use crate::assets::{AnimationClip, AssetSource, ModelScene};
use crate::metadata::SignMetadataStore;


/// Clip names that mark generic stand-in content rather than a real sign
static PLACEHOLDER_CLIP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)idle|wave|dance|breathing").expect("placeholder pattern compiles")
});

/// File names that mark generic stand-in content
const PLACEHOLDER_FILES: [&str; 2] = ["idle.glb", "wave.glb"];

/// Delimiters that join the parts of a compound identifier
pub const COMPOUND_DELIMITERS: [char; 2] = ['-', '_'];

/// Whether a loaded clip is generic placeholder content
pub fn is_placeholder(clip_name: &str, file_name: &str) -> bool {
    let file = file_name.to_ascii_lowercase();
    PLACEHOLDER_CLIP.is_match(clip_name) || PLACEHOLDER_FILES.iter().any(|p| file.contains(p))
}

/// A loaded model and clip, tied one-to-one to the key that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct ExactAnimation {
    pub model: ModelScene,
    pub clip: AnimationClip,
    pub source_key: String,
}

/// A compound identifier broken into parts
///
/// Always has at least one available part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundSign {
    original_key: String,
    ordered_parts: Vec<String>,
    available_parts: Vec<String>,
}

impl CompoundSign {
    /// Returns `None` when no part is available
    pub fn new(
        original_key: impl Into<String>,
        ordered_parts: Vec<String>,
        available_parts: Vec<String>,
    ) -> Option<Self> {
        if available_parts.is_empty() {
            return None;
        }
        Some(Self {
            original_key: original_key.into(),
            ordered_parts,
            available_parts,
        })
    }

    pub fn original_key(&self) -> &str {
        &self.original_key
    }

    pub fn ordered_parts(&self) -> &[String] {
        &self.ordered_parts
    }

    /// Parts that have an animation file, in original order
    pub fn available_parts(&self) -> &[String] {
        &self.available_parts
    }
}

/// Text-only fallback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerspellNotice {
    pub text: String,
    pub description: Option<String>,
    /// Set when the asset existed but held placeholder content
    pub is_placeholder_warning: bool,
}

/// Outcome of resolving a sign identifier
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedSign {
    ExactAnimation(ExactAnimation),
    Compound(CompoundSign),
    Fingerspell(FingerspellNotice),
}

impl ResolvedSign {
    pub fn is_exact(&self) -> bool {
        matches!(self, ResolvedSign::ExactAnimation(_))
    }

    pub fn is_fingerspell(&self) -> bool {
        matches!(self, ResolvedSign::Fingerspell(_))
    }
}

type PendingLoad = Shared<LocalBoxFuture<'static, ResolvedSign>>;

/// Resolves sign identifiers and caches exact animations
pub struct SignResolver {
    metadata: Rc<SignMetadataStore>,
    source: Rc<dyn AssetSource>,
    animations_dir: String,
    cache: RefCell<HashMap<String, ExactAnimation>>,
    in_flight: RefCell<HashMap<String, PendingLoad>>,
}

impl SignResolver {
    pub fn new(
        metadata: Rc<SignMetadataStore>,
        source: Rc<dyn AssetSource>,
        animations_dir: impl Into<String>,
    ) -> Self {
        Self {
            metadata,
            source,
            animations_dir: animations_dir.into(),
            cache: RefCell::new(HashMap::new()),
            in_flight: RefCell::new(HashMap::new()),
        }
    }

    pub fn metadata(&self) -> &SignMetadataStore {
        &self.metadata
    }

    /// Asset path for an animation file named in metadata
    pub fn asset_path(&self, file_name: &str) -> String {
        let dir = self.animations_dir.trim_end_matches('/');
        if dir.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", dir, file_name)
        }
    }

    /// Resolve a sign identifier
    ///
    /// Returns `None` for an empty key, without side effects.
    pub async fn resolve(&self, key: &str) -> Option<ResolvedSign> {
        if key.is_empty() {
            return None;
        }

        if let Some(hit) = self.cache.borrow().get(key) {
            log::debug!("Using cached animation for sign key: {}.", key);
            return Some(ResolvedSign::ExactAnimation(hit.clone()));
        }

        let meta = self.metadata.lookup(key);
        if let Some(notation) = meta.hamnosys.as_deref().filter(|n| !n.is_empty()) {
            log::debug!("HamNoSys notation for '{}': {}", key, notation);
        }
        if meta.biomechanical == Some(true) {
            log::debug!("Animation '{}' is marked as biomechanically validated.", key);
        }

        let Some(file) = meta.file.clone().filter(|f| !f.is_empty()) else {
            return Some(self.resolve_without_file(key));
        };

        let pending = self.pending_load(key, &file);
        let resolved = pending.clone().await;

        {
            let mut in_flight = self.in_flight.borrow_mut();
            if in_flight.get(key).is_some_and(|p| p.ptr_eq(&pending)) {
                in_flight.remove(key);
            }
        }
        if let ResolvedSign::ExactAnimation(exact) = &resolved {
            self.cache
                .borrow_mut()
                .entry(key.to_string())
                .or_insert_with(|| exact.clone());
        }

        Some(resolved)
    }

    /// Resolve and cache without playing
    pub async fn preload(&self, key: &str) -> Option<ResolvedSign> {
        self.resolve(key).await
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.cache.borrow().contains_key(key)
    }

    pub fn cached_len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Whether a load for `key` is currently in flight
    pub fn is_loading(&self, key: &str) -> bool {
        self.in_flight.borrow().contains_key(key)
    }

    fn pending_load(&self, key: &str, file: &str) -> PendingLoad {
        if let Some(pending) = self.in_flight.borrow().get(key) {
            log::debug!("Load for '{}' already in flight; waiting on it.", key);
            return pending.clone();
        }

        let pending = load_exact(
            Rc::clone(&self.source),
            key.to_string(),
            file.to_string(),
            self.asset_path(file),
            self.metadata.lookup(key).description.clone(),
        )
        .boxed_local()
        .shared();

        self.in_flight
            .borrow_mut()
            .insert(key.to_string(), pending.clone());
        pending
    }

    fn resolve_without_file(&self, key: &str) -> ResolvedSign {
        log::debug!(
            "No animation file for '{}'. Checking fallback strategies...",
            key
        );

        if key.contains(COMPOUND_DELIMITERS) {
            let ordered: Vec<String> = key
                .split(COMPOUND_DELIMITERS)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect();

            // Parts are checked against metadata only, never resolved, so a
            // compound can not expand into further compounds.
            let available: Vec<String> = ordered
                .iter()
                .filter(|part| self.metadata.lookup(part).has_file())
                .cloned()
                .collect();

            if let Some(compound) = CompoundSign::new(key, ordered, available) {
                log::info!(
                    "Compound word '{}' can be signed as: {}",
                    key,
                    compound.available_parts().join(" + ")
                );
                return ResolvedSign::Compound(compound);
            }
        }

        log::debug!("Will fingerspell '{}' letter by letter.", key);
        ResolvedSign::Fingerspell(FingerspellNotice {
            text: key.to_string(),
            description: self.metadata.lookup(key).description.clone(),
            is_placeholder_warning: false,
        })
    }
}

impl std::fmt::Debug for SignResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignResolver")
            .field("animations_dir", &self.animations_dir)
            .field("cached", &self.cache.borrow().len())
            .field("in_flight", &self.in_flight.borrow().len())
            .finish()
    }
}

async fn load_exact(
    source: Rc<dyn AssetSource>,
    key: String,
    file: String,
    path: String,
    description: Option<String>,
) -> ResolvedSign {
    let fallback = |placeholder: bool| {
        ResolvedSign::Fingerspell(FingerspellNotice {
            text: key.clone(),
            description: description.clone(),
            is_placeholder_warning: placeholder,
        })
    };

    log::debug!("Attempting to load sign animation from {}...", path);

    let asset = match source.load_model(&path).await {
        Ok(asset) => asset,
        Err(e) => {
            log::error!(
                "Could not load animation from {}. Falling back to fingerspelling. {}",
                path,
                e
            );
            return fallback(false);
        }
    };

    let Some(clip) = asset.first_clip().cloned() else {
        log::error!("No animations found in {}.", path);
        return fallback(false);
    };

    if is_placeholder(&clip.name, &file) {
        log::warn!(
            "'{}' is using a placeholder animation ('{}'). Real sign language animation needed.",
            key,
            clip.name
        );
        return fallback(true);
    }

    log::info!("Sign animation loaded and cached for key: {}.", key);
    ResolvedSign::ExactAnimation(ExactAnimation {
        model: asset.scene,
        clip,
        source_key: key,
    })
}
