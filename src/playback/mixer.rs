//! Animation controller
//!
//! One mixer drives the clips of one attached model. Each clip gets an
//! action that carries its own playback position, weight and loop mode. The
//! mixer advances every action by the tick delta and reports actions that
//! ran to the end of a play-once clip.

use std::time::Duration;

use crate::assets::{AnimationClip, ModelId};

fn scale(delta: Duration, factor: f32) -> Duration {
    if factor == 1.0 {
        delta
    } else {
        delta.mul_f32(factor)
    }
}

/// How an action behaves at the end of its clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Play once, then report completion
    #[default]
    Once,
    /// Wrap around forever
    Repeat,
}

/// Action playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    #[default]
    Stopped,
    Playing,
    Finished,
}

/// Handle to an action inside one mixer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(u32);

#[derive(Debug, Clone, Copy, PartialEq)]
struct Fade {
    from: f32,
    to: f32,
    elapsed: Duration,
    duration: Duration,
}

impl Fade {
    fn weight(&self) -> f32 {
        if self.duration.is_zero() {
            return self.to;
        }
        let t = (self.elapsed.as_secs_f32() / self.duration.as_secs_f32()).min(1.0);
        self.from + (self.to - self.from) * t
    }

    fn is_done(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// Playback of one clip on the mixer's model
#[derive(Debug, Clone)]
pub struct AnimationAction {
    id: ActionId,
    clip: AnimationClip,
    source: Option<ModelId>,
    /// Loop behaviour
    pub loop_mode: LoopMode,
    /// Hold the last pose when a play-once clip ends
    pub clamp_when_finished: bool,
    /// Per-action rate multiplier
    pub time_scale: f32,
    time: Duration,
    weight: f32,
    state: ActionState,
    fade: Option<Fade>,
}

impl AnimationAction {
    fn new(id: ActionId, clip: AnimationClip, source: Option<ModelId>) -> Self {
        Self {
            id,
            clip,
            source,
            loop_mode: LoopMode::Once,
            clamp_when_finished: false,
            time_scale: 1.0,
            time: Duration::ZERO,
            weight: 1.0,
            state: ActionState::Stopped,
            fade: None,
        }
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    /// Position within the clip
    pub fn time(&self) -> Duration {
        self.time
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn state(&self) -> ActionState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ActionState::Playing
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    fn restart(&mut self) {
        self.time = Duration::ZERO;
        self.weight = 1.0;
        self.fade = None;
        self.state = ActionState::Playing;
    }

    fn stop(&mut self) {
        self.time = Duration::ZERO;
        self.fade = None;
        self.state = ActionState::Stopped;
    }

    fn update_fade(&mut self, delta: Duration) {
        let Some(fade) = self.fade.as_mut() else {
            return;
        };
        fade.elapsed += delta;
        self.weight = fade.weight();
        if fade.is_done() {
            let faded_out = fade.to <= 0.0;
            self.fade = None;
            if faded_out {
                self.stop();
            }
        }
    }

    /// Advance the clip; returns true when a play-once clip just ended
    fn advance(&mut self, delta: Duration) -> bool {
        if self.state != ActionState::Playing {
            return false;
        }

        self.time += scale(delta, self.time_scale.max(0.0));
        let duration = self.clip.duration;

        match self.loop_mode {
            LoopMode::Repeat => {
                if duration.is_zero() {
                    self.time = Duration::ZERO;
                } else if self.time >= duration {
                    let wrapped = self.time.as_secs_f64() % duration.as_secs_f64();
                    self.time = Duration::from_secs_f64(wrapped);
                }
                false
            }
            LoopMode::Once => {
                if self.time < duration {
                    return false;
                }
                self.time = if self.clamp_when_finished {
                    duration
                } else {
                    Duration::ZERO
                };
                self.state = ActionState::Finished;
                true
            }
        }
    }
}

/// Reported by [`AnimationMixer::update`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MixerEvent {
    /// A play-once action reached the end of its clip
    Finished { action: ActionId, clip: String },
}

/// Animation controller bound to one model
#[derive(Debug)]
pub struct AnimationMixer {
    model: ModelId,
    actions: Vec<AnimationAction>,
    time_scale: f32,
    time: Duration,
    next_id: u32,
}

impl AnimationMixer {
    /// Create a mixer bound to `model`
    pub fn new(model: ModelId) -> Self {
        Self {
            model,
            actions: Vec::new(),
            time_scale: 1.0,
            time: Duration::ZERO,
            next_id: 0,
        }
    }

    /// Model this mixer animates
    pub fn model(&self) -> ModelId {
        self.model
    }

    /// Action for one of the model's own clips, created on first request
    ///
    /// Asking twice for the same clip returns the same action.
    pub fn clip_action(&mut self, clip: &AnimationClip) -> ActionId {
        self.find_or_add(clip, None)
    }

    /// Action for a clip packaged with another model `source`
    ///
    /// Clips from different assets get separate actions even when their
    /// names match.
    pub fn clip_action_from(&mut self, clip: &AnimationClip, source: ModelId) -> ActionId {
        self.find_or_add(clip, Some(source))
    }

    fn find_or_add(&mut self, clip: &AnimationClip, source: Option<ModelId>) -> ActionId {
        if let Some(existing) = self
            .actions
            .iter()
            .find(|a| a.source == source && a.clip == *clip)
        {
            return existing.id;
        }
        let id = ActionId(self.next_id);
        self.next_id += 1;
        self.actions.push(AnimationAction::new(id, clip.clone(), source));
        id
    }

    pub fn action(&self, id: ActionId) -> Option<&AnimationAction> {
        self.actions.iter().find(|a| a.id == id)
    }

    pub fn action_mut(&mut self, id: ActionId) -> Option<&mut AnimationAction> {
        self.actions.iter_mut().find(|a| a.id == id)
    }

    /// Start `id` from the beginning at full weight
    pub fn play(&mut self, id: ActionId) {
        if let Some(action) = self.action_mut(id) {
            action.restart();
        }
    }

    pub fn stop(&mut self, id: ActionId) {
        if let Some(action) = self.action_mut(id) {
            action.stop();
        }
    }

    /// Stop every action
    pub fn stop_all_action(&mut self) {
        for action in &mut self.actions {
            action.stop();
        }
    }

    /// Fade `to` in from zero while `from` fades out over `duration`
    ///
    /// `from` stops once its weight reaches zero. A zero duration switches
    /// immediately.
    pub fn cross_fade(&mut self, from: ActionId, to: ActionId, duration: Duration) {
        if from == to {
            self.play(to);
            return;
        }

        if let Some(action) = self.action_mut(from) {
            if duration.is_zero() {
                action.stop();
            } else if action.state != ActionState::Stopped {
                action.fade = Some(Fade {
                    from: action.weight,
                    to: 0.0,
                    elapsed: Duration::ZERO,
                    duration,
                });
            }
        }

        if let Some(action) = self.action_mut(to) {
            action.restart();
            if !duration.is_zero() {
                action.weight = 0.0;
                action.fade = Some(Fade {
                    from: 0.0,
                    to: 1.0,
                    elapsed: Duration::ZERO,
                    duration,
                });
            }
        }
    }

    /// Global rate multiplier; zero freezes every action in place
    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    /// Total scaled time this mixer has advanced
    pub fn time(&self) -> Duration {
        self.time
    }

    /// Number of actions currently playing
    pub fn running_count(&self) -> usize {
        self.actions.iter().filter(|a| a.is_running()).count()
    }

    /// Advance all actions by `delta`
    pub fn update(&mut self, delta: Duration) -> Vec<MixerEvent> {
        let scaled = scale(delta, self.time_scale);
        if scaled.is_zero() {
            return Vec::new();
        }
        self.time += scaled;

        let mut events = Vec::new();
        for action in &mut self.actions {
            action.update_fade(scaled);
            if action.advance(scaled) {
                events.push(MixerEvent::Finished {
                    action: action.id,
                    clip: action.clip.name.clone(),
                });
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ModelScene;

    fn clip(name: &str, millis: u64) -> AnimationClip {
        AnimationClip::new(name, Duration::from_millis(millis))
    }

    fn mixer() -> AnimationMixer {
        AnimationMixer::new(ModelScene::new("avatar.glb").id())
    }

    #[test]
    fn test_clip_action_cached_per_clip() {
        let mut mixer = mixer();
        let a = mixer.clip_action(&clip("HELLO", 1000));
        let b = mixer.clip_action(&clip("HELLO", 1000));
        let c = mixer.clip_action(&clip("THANKS", 1000));
        let d = mixer.clip_action(&clip("HELLO", 3000));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_same_named_clips_from_other_assets() {
        let mut mixer = mixer();
        let first = ModelScene::new("animations/A.glb").id();
        let second = ModelScene::new("animations/B.glb").id();
        let shared = clip("mixamo.com", 1000);

        let own = mixer.clip_action(&shared);
        let a = mixer.clip_action_from(&shared, first);
        let b = mixer.clip_action_from(&shared, second);
        assert_ne!(own, a);
        assert_ne!(a, b);
        assert_eq!(mixer.clip_action_from(&shared, first), a);
    }

    #[test]
    fn test_play_once_finishes_and_clamps() {
        let mut mixer = mixer();
        let id = mixer.clip_action(&clip("HELLO", 1000));
        if let Some(action) = mixer.action_mut(id) {
            action.clamp_when_finished = true;
        }
        mixer.play(id);

        assert!(mixer.update(Duration::from_millis(600)).is_empty());
        let events = mixer.update(Duration::from_millis(600));
        assert_eq!(
            events,
            vec![MixerEvent::Finished {
                action: id,
                clip: "HELLO".into()
            }]
        );

        let action = mixer.action(id).unwrap();
        assert_eq!(action.state(), ActionState::Finished);
        assert_eq!(action.time(), Duration::from_millis(1000));

        // Finished actions report once.
        assert!(mixer.update(Duration::from_millis(600)).is_empty());
    }

    #[test]
    fn test_play_once_without_clamp_rewinds() {
        let mut mixer = mixer();
        let id = mixer.clip_action(&clip("HELLO", 500));
        mixer.play(id);
        mixer.update(Duration::from_millis(700));
        assert_eq!(mixer.action(id).unwrap().time(), Duration::ZERO);
    }

    #[test]
    fn test_repeat_wraps() {
        let mut mixer = mixer();
        let id = mixer.clip_action(&clip("idle", 1000));
        mixer.action_mut(id).unwrap().loop_mode = LoopMode::Repeat;
        mixer.play(id);

        assert!(mixer.update(Duration::from_millis(2500)).is_empty());
        let action = mixer.action(id).unwrap();
        assert!(action.is_running());
        let t = action.time().as_secs_f64();
        assert!((t - 0.5).abs() < 1e-6, "time was {}", t);
    }

    #[test]
    fn test_action_time_scale() {
        let mut mixer = mixer();
        let id = mixer.clip_action(&clip("idle", 10_000));
        mixer.action_mut(id).unwrap().time_scale = 0.5;
        mixer.play(id);
        mixer.update(Duration::from_secs(2));
        assert_eq!(mixer.action(id).unwrap().time(), Duration::from_secs(1));
    }

    #[test]
    fn test_zero_time_scale_freezes() {
        let mut mixer = mixer();
        let id = mixer.clip_action(&clip("HELLO", 1000));
        mixer.play(id);
        mixer.update(Duration::from_millis(400));

        mixer.set_time_scale(0.0);
        assert!(mixer.update(Duration::from_secs(5)).is_empty());
        assert_eq!(mixer.action(id).unwrap().time(), Duration::from_millis(400));
        assert_eq!(mixer.time(), Duration::from_millis(400));

        mixer.set_time_scale(1.0);
        mixer.update(Duration::from_millis(100));
        assert_eq!(mixer.action(id).unwrap().time(), Duration::from_millis(500));
    }

    #[test]
    fn test_cross_fade_weights() {
        let mut mixer = mixer();
        let idle = mixer.clip_action(&clip("idle", 4000));
        let sign = mixer.clip_action(&clip("HELLO", 2000));
        mixer.action_mut(idle).unwrap().loop_mode = LoopMode::Repeat;
        mixer.play(idle);

        mixer.cross_fade(idle, sign, Duration::from_millis(300));
        assert_eq!(mixer.action(sign).unwrap().weight(), 0.0);
        assert_eq!(mixer.action(idle).unwrap().weight(), 1.0);

        mixer.update(Duration::from_millis(150));
        let w_sign = mixer.action(sign).unwrap().weight();
        let w_idle = mixer.action(idle).unwrap().weight();
        assert!((w_sign - 0.5).abs() < 1e-3);
        assert!((w_idle - 0.5).abs() < 1e-3);

        mixer.update(Duration::from_millis(200));
        assert_eq!(mixer.action(sign).unwrap().weight(), 1.0);
        assert!(!mixer.action(sign).unwrap().is_fading());
        assert_eq!(mixer.action(idle).unwrap().state(), ActionState::Stopped);
        assert_eq!(mixer.running_count(), 1);
    }

    #[test]
    fn test_cross_fade_zero_duration_switches() {
        let mut mixer = mixer();
        let a = mixer.clip_action(&clip("a", 1000));
        let b = mixer.clip_action(&clip("b", 1000));
        mixer.play(a);
        mixer.cross_fade(a, b, Duration::ZERO);
        assert_eq!(mixer.action(a).unwrap().state(), ActionState::Stopped);
        assert!(mixer.action(b).unwrap().is_running());
        assert_eq!(mixer.action(b).unwrap().weight(), 1.0);
    }

    #[test]
    fn test_stop_all_action() {
        let mut mixer = mixer();
        let a = mixer.clip_action(&clip("a", 1000));
        let b = mixer.clip_action(&clip("b", 1000));
        mixer.play(a);
        mixer.play(b);
        assert_eq!(mixer.running_count(), 2);
        mixer.stop_all_action();
        assert_eq!(mixer.running_count(), 0);
    }

    #[test]
    fn test_zero_length_clip_finishes_on_first_update() {
        let mut mixer = mixer();
        let id = mixer.clip_action(&clip("blink", 0));
        mixer.play(id);
        assert_eq!(mixer.update(Duration::from_millis(16)).len(), 1);
    }
}
