//! Startup
//!
//! Checks the host capabilities, loads the metadata table and the idle
//! asset, and wires the resolver, player and dispatcher together.
//!
//! Only a missing capability stops startup. Everything else degrades in
//! place: a failed metadata load leaves an empty table, a failed idle load
//! leaves the procedural stand-in.

use std::fmt;
use std::rc::Rc;

use crate::assets::AssetSource;
use crate::config::Options;
use crate::dispatch::InteractionDispatcher;
use crate::metadata::SignMetadataStore;
use crate::notifier::{self, SignDescription, UiNotifier};
use crate::playback::{AvatarPlayer, IdleModel, PlaybackSettings, SceneGraph};
use crate::resolver::SignResolver;

/// Host-provided capability the avatar can not run without
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    Renderer,
    ModelLoader,
}

impl Capability {
    /// Status banner shown when this capability is missing
    pub fn status_message(self) -> &'static str {
        match self {
            Capability::Renderer => {
                "The 3D rendering engine could not be loaded. The avatar cannot be displayed."
            }
            Capability::ModelLoader => {
                "The model loader is missing. The avatar cannot be displayed."
            }
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Renderer => f.write_str("renderer"),
            Capability::ModelLoader => f.write_str("model loader"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Required {0} capability is not available")]
    MissingCapability(Capability),
}

/// What the host hands to [`boot`]
pub struct HostCapabilities {
    pub scene: Option<Box<dyn SceneGraph>>,
    pub source: Option<Rc<dyn AssetSource>>,
    pub ui: Box<dyn UiNotifier>,
}

/// A booted avatar
#[derive(Debug)]
pub struct SignerEngine {
    player: AvatarPlayer,
    dispatcher: InteractionDispatcher,
}

impl SignerEngine {
    pub fn player(&self) -> &AvatarPlayer {
        &self.player
    }

    pub fn dispatcher(&mut self) -> &mut InteractionDispatcher {
        &mut self.dispatcher
    }
}

/// Bring the avatar up
pub async fn boot(options: &Options, host: HostCapabilities) -> Result<SignerEngine, EngineError> {
    log::info!("Starting signer engine initialization...");

    let HostCapabilities { scene, source, mut ui } = host;
    let (scene, source) = match (scene, source) {
        (Some(scene), Some(source)) => (scene, source),
        (None, _) => return Err(missing(ui.as_mut(), Capability::Renderer)),
        (_, None) => return Err(missing(ui.as_mut(), Capability::ModelLoader)),
    };

    let metadata = SignMetadataStore::load(source.as_ref(), &options.metadata_file).await;

    let idle = load_idle(source.as_ref(), &options.idle_asset).await;
    if idle.is_some() {
        ui.set_status(notifier::IDLE_LOADED_STATUS);
    } else {
        ui.set_status(notifier::IDLE_FAILED_STATUS);
    }

    let resolver = SignResolver::new(Rc::new(metadata), source, options.animations_dir.clone());
    let player = AvatarPlayer::new(resolver, scene, ui, idle, PlaybackSettings::from(options));
    let dispatcher = InteractionDispatcher::new(player.clone(), options.visibility_threshold);

    log::info!("Signer engine ready.");
    Ok(SignerEngine { player, dispatcher })
}

fn missing(ui: &mut dyn UiNotifier, capability: Capability) -> EngineError {
    log::error!("Required {} capability is not available.", capability);
    ui.set_status(capability.status_message());
    ui.set_description(&SignDescription::text(notifier::LOAD_FAILED_DESCRIPTION));
    EngineError::MissingCapability(capability)
}

async fn load_idle(source: &dyn AssetSource, path: &str) -> Option<IdleModel> {
    log::info!("Loading idle pose from {}...", path);
    let asset = match source.load_model(path).await {
        Ok(asset) => asset,
        Err(e) => {
            log::error!("Error loading idle pose: {}", e);
            return None;
        }
    };

    let Some(clip) = asset.first_clip().cloned() else {
        log::error!("Idle pose {} has no animations.", path);
        return None;
    };

    log::info!("Idle animation loaded: \"{}\"", clip.name);
    Some(IdleModel {
        model: asset.scene,
        clip,
    })
}
