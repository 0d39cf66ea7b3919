//! Render scene boundary
//!
//! The 3D engine is external. [`SceneGraph`] is the slice of it the player
//! drives: attach and detach models, show the procedural stand-in, render a
//! frame. [`HeadlessScene`] implements it without a renderer and records what
//! happened, for the demo binary and for tests.

use std::cell::RefCell;
use std::rc::Rc;

use crate::assets::{ModelId, ModelScene};

/// Placement of the procedural stand-in
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StandinPose {
    pub x: f32,
    pub y: f32,
    pub yaw: f32,
}

impl StandinPose {
    /// Breathing and sway motion at `elapsed` seconds
    pub fn at(elapsed: f32) -> Self {
        Self {
            x: (elapsed * 0.6).sin() * 0.05,
            y: (elapsed * 1.2).sin() * 0.08,
            yaw: (elapsed * 0.8).sin() * 0.15,
        }
    }
}

/// Render scene operations used by the player
pub trait SceneGraph {
    /// Add a model to the scene
    fn attach(&mut self, model: &ModelScene);

    /// Remove a model from the scene
    fn detach(&mut self, model: &ModelScene);

    /// Show or hide the procedural stand-in
    fn show_standin(&mut self, visible: bool);

    fn set_standin_pose(&mut self, pose: StandinPose);

    /// Draw one frame
    fn render(&mut self);
}

/// Scene change recorded by [`HeadlessScene`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneEvent {
    Attached(ModelId),
    Detached(ModelId),
    StandinShown,
    StandinHidden,
}

/// What a [`HeadlessScene`] currently holds
#[derive(Debug, Clone, Default)]
pub struct SceneSnapshot {
    pub attached: Vec<ModelScene>,
    pub events: Vec<SceneEvent>,
    pub standin_visible: bool,
    pub standin_pose: StandinPose,
    pub frames: u64,
}

impl SceneSnapshot {
    pub fn is_attached(&self, id: ModelId) -> bool {
        self.attached.iter().any(|m| m.id() == id)
    }

    /// Number of attach operations so far
    pub fn attach_count(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, SceneEvent::Attached(_)))
            .count()
    }
}

/// Scene without a renderer
///
/// Clones share one snapshot, so a caller can keep a handle after boxing the
/// scene into the player.
#[derive(Debug, Clone, Default)]
pub struct HeadlessScene {
    state: Rc<RefCell<SceneSnapshot>>,
}

impl HeadlessScene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the current scene state
    pub fn snapshot(&self) -> SceneSnapshot {
        self.state.borrow().clone()
    }

    /// Source paths of the attached models
    pub fn attached_sources(&self) -> Vec<String> {
        self.state
            .borrow()
            .attached
            .iter()
            .map(|m| m.source().to_string())
            .collect()
    }

    pub fn frames(&self) -> u64 {
        self.state.borrow().frames
    }
}

impl SceneGraph for HeadlessScene {
    fn attach(&mut self, model: &ModelScene) {
        let mut state = self.state.borrow_mut();
        if !state.is_attached(model.id()) {
            state.attached.push(model.clone());
        }
        state.events.push(SceneEvent::Attached(model.id()));
    }

    fn detach(&mut self, model: &ModelScene) {
        let mut state = self.state.borrow_mut();
        state.attached.retain(|m| m.id() != model.id());
        state.events.push(SceneEvent::Detached(model.id()));
    }

    fn show_standin(&mut self, visible: bool) {
        let mut state = self.state.borrow_mut();
        if state.standin_visible != visible {
            state.standin_visible = visible;
            state.events.push(if visible {
                SceneEvent::StandinShown
            } else {
                SceneEvent::StandinHidden
            });
        }
    }

    fn set_standin_pose(&mut self, pose: StandinPose) {
        self.state.borrow_mut().standin_pose = pose;
    }

    fn render(&mut self) {
        self.state.borrow_mut().frames += 1;
    }
}
