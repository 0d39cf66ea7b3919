//! Avatar playback
//!
//! - [`mixer`]: per-model animation controller
//! - [`avatar`]: the avatar's owned scene state
//! - [`scene`]: render scene boundary
//! - [`controller`]: the playback state machine

pub mod avatar;
pub mod controller;
pub mod mixer;
pub mod scene;

pub use avatar::{AvatarMode, AvatarState, IdleModel};
pub use controller::{AvatarPlayer, PlayOutcome, PlaybackSettings};
pub use mixer::{AnimationMixer, LoopMode, MixerEvent};
pub use scene::{HeadlessScene, SceneGraph, StandinPose};
