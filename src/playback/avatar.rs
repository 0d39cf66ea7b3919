//! Avatar state
//!
//! The one model currently on the scene, its animation controller, the
//! playback mode, and the idle model kept aside while a sign's own mesh is
//! swapped in. Scene changes go through [`AvatarState`] so a superseded
//! model is always detached the moment it is replaced.

use crate::assets::{AnimationClip, ModelScene};

use super::mixer::{ActionId, AnimationMixer, LoopMode};
use super::scene::SceneGraph;

/// Playback mode
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AvatarMode {
    #[default]
    Idle,
    PlayingSign(String),
}

impl AvatarMode {
    /// Key of the sign currently playing
    pub fn playing(&self) -> Option<&str> {
        match self {
            AvatarMode::Idle => None,
            AvatarMode::PlayingSign(key) => Some(key),
        }
    }
}

/// Baseline model and its resting clip
#[derive(Debug, Clone, PartialEq)]
pub struct IdleModel {
    pub model: ModelScene,
    pub clip: AnimationClip,
}

#[derive(Debug)]
pub struct AvatarState {
    current_model: Option<ModelScene>,
    mixer: Option<AnimationMixer>,
    mode: AvatarMode,
    idle: Option<IdleModel>,
    idle_action: Option<ActionId>,
    standin: bool,
}

impl AvatarState {
    /// Empty state; nothing is on the scene yet
    pub fn new(idle: Option<IdleModel>) -> Self {
        Self {
            current_model: None,
            mixer: None,
            mode: AvatarMode::Idle,
            idle,
            idle_action: None,
            standin: false,
        }
    }

    pub fn current_model(&self) -> Option<&ModelScene> {
        self.current_model.as_ref()
    }

    pub fn mixer(&self) -> Option<&AnimationMixer> {
        self.mixer.as_ref()
    }

    pub(crate) fn mixer_mut(&mut self) -> Option<&mut AnimationMixer> {
        self.mixer.as_mut()
    }

    pub fn mode(&self) -> &AvatarMode {
        &self.mode
    }

    pub(crate) fn set_mode(&mut self, mode: AvatarMode) {
        self.mode = mode;
    }

    pub fn idle(&self) -> Option<&IdleModel> {
        self.idle.as_ref()
    }

    /// Action playing the idle clip on the current mixer, if any
    pub fn idle_action(&self) -> Option<ActionId> {
        self.idle_action
    }

    /// Whether the idle model is the one on the scene
    pub fn is_idle_attached(&self) -> bool {
        match (&self.idle, &self.current_model) {
            (Some(idle), Some(current)) => idle.model.id() == current.id(),
            _ => false,
        }
    }

    /// Whether the procedural stand-in is showing
    pub fn has_standin(&self) -> bool {
        self.standin
    }

    /// Swap `model` onto the scene and give it a fresh mixer
    ///
    /// The previous model is detached and its mixer stopped first.
    pub(crate) fn swap_in(
        &mut self,
        scene: &mut dyn SceneGraph,
        model: ModelScene,
        time_scale: f32,
    ) -> &mut AnimationMixer {
        self.detach_current(scene);
        if self.standin {
            scene.show_standin(false);
            self.standin = false;
        }

        scene.attach(&model);
        let mut mixer = AnimationMixer::new(model.id());
        mixer.set_time_scale(time_scale);
        self.current_model = Some(model);
        self.mixer.insert(mixer)
    }

    /// Put the baseline visual back and switch to [`AvatarMode::Idle`]
    ///
    /// Reattaches the idle model with a new mixer looping its idle clip, or
    /// shows the stand-in when no idle model exists.
    pub(crate) fn restore_idle(
        &mut self,
        scene: &mut dyn SceneGraph,
        idle_time_scale: f32,
        mixer_time_scale: f32,
    ) {
        self.mode = AvatarMode::Idle;

        let Some(idle) = self.idle.clone() else {
            self.detach_current(scene);
            self.show_standin(scene);
            return;
        };

        let mixer = self.swap_in(scene, idle.model, mixer_time_scale);
        let action = mixer.clip_action(&idle.clip);
        if let Some(a) = mixer.action_mut(action) {
            a.loop_mode = LoopMode::Repeat;
            a.time_scale = idle_time_scale;
        }
        mixer.play(action);
        self.idle_action = Some(action);
    }

    /// Degraded visual: no model, the procedural stand-in instead
    pub(crate) fn show_standin(&mut self, scene: &mut dyn SceneGraph) {
        if !self.standin {
            scene.show_standin(true);
            self.standin = true;
        }
    }

    fn detach_current(&mut self, scene: &mut dyn SceneGraph) {
        if let Some(mut mixer) = self.mixer.take() {
            mixer.stop_all_action();
        }
        if let Some(model) = self.current_model.take() {
            scene.detach(&model);
        }
        self.idle_action = None;
    }
}
