//! Playback controller
//!
//! Runs the avatar state machine: `Idle` ⇄ `PlayingSign(key)`.
//!
//! # Architecture
//!
//! [`AvatarPlayer`] is a cheap handle onto shared player state. Plays are
//! futures: they suspend while the resolver loads an asset, then mutate the
//! scene synchronously. Time only moves in [`AvatarPlayer::tick`], which
//! advances the mixer, fires completions and compound pause timers, and
//! renders.
//!
//! Two counters keep late work from clobbering newer work:
//!
//! - `request` moves on every play call. A resolution that comes back after
//!   a newer request was made is dropped.
//! - `epoch` moves every time an animation is put on the scene. A completion
//!   only acts when its captured epoch is still current.
//!
//! A superseded completion drops its signal sender, which is how a waiting
//! compound sequence learns it was interrupted.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;
use std::time::Duration;

use futures::channel::oneshot;
use futures::future::{FutureExt, LocalBoxFuture};

use crate::assets::{AnimationBinding, ModelScene};
use crate::config::Options;
use crate::notifier::{self, SignDescription, UiNotifier};
use crate::resolver::{CompoundSign, ExactAnimation, FingerspellNotice, ResolvedSign, SignResolver};

use super::avatar::{AvatarMode, AvatarState, IdleModel};
use super::mixer::{ActionId, LoopMode, MixerEvent};
use super::scene::{SceneGraph, StandinPose};

/// Timing knobs for playback
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSettings {
    /// Gap after each part of a compound sign
    pub compound_pause: Duration,
    /// Cross-fade into a rig-bound sign
    pub sign_blend: Duration,
    /// Cross-fade from a rig-bound sign back to idle
    pub idle_blend: Duration,
    /// Rate of the idle clip
    pub idle_time_scale: f32,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            compound_pause: Duration::from_millis(300),
            sign_blend: Duration::from_millis(300),
            idle_blend: Duration::from_millis(500),
            idle_time_scale: 1.0,
        }
    }
}

impl From<&Options> for PlaybackSettings {
    fn from(options: &Options) -> Self {
        Self {
            compound_pause: options.compound_pause(),
            sign_blend: options.sign_blend(),
            idle_blend: options.idle_blend(),
            idle_time_scale: options.idle_time_scale,
        }
    }
}

/// What a play call did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// Empty key
    Ignored,
    /// Playback is paused
    Paused,
    /// The same sign is already playing
    AlreadyPlaying,
    /// A sign's own mesh was swapped in and is playing
    Started,
    /// A rig-bound sign is cross-fading in on the idle model
    CrossFaded,
    /// Text fallback shown; the scene is unchanged
    Fingerspelled { placeholder: bool },
    /// Compound sequence ran; `played` parts animated to completion
    Compound { played: usize, completed: bool },
    /// A newer play request arrived while this one was resolving
    Superseded,
    /// Rig-bound sign with no idle model to play it on
    NoMixer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CompletionKind {
    MeshSwap,
    SharedRig,
}

#[derive(Debug)]
struct PendingCompletion {
    epoch: u64,
    key: String,
    action: ActionId,
    kind: CompletionKind,
    waiters: Vec<oneshot::Sender<()>>,
}

#[derive(Debug)]
struct Timer {
    remaining: Duration,
    done: oneshot::Sender<()>,
}

struct PlayerCore {
    avatar: AvatarState,
    scene: Box<dyn SceneGraph>,
    ui: Box<dyn UiNotifier>,
    paused: bool,
    request: u64,
    epoch: u64,
    completion: Option<PendingCompletion>,
    timers: Vec<Timer>,
    clock: Duration,
}

impl PlayerCore {
    fn mixer_time_scale(&self) -> f32 {
        if self.paused {
            0.0
        } else {
            1.0
        }
    }

    /// Start a new scene epoch; any pending completion becomes stale
    fn supersede(&mut self) -> u64 {
        self.epoch += 1;
        if let Some(previous) = self.completion.take() {
            log::debug!("Sign '{}' superseded before completion.", previous.key);
        }
        self.epoch
    }

    fn start_mesh_swap(&mut self, key: &str, exact: ExactAnimation) -> oneshot::Receiver<()> {
        log::info!("Playing sign '{}' via mesh swap.", key);

        let epoch = self.supersede();
        let time_scale = self.mixer_time_scale();
        let mixer = self
            .avatar
            .swap_in(self.scene.as_mut(), exact.model, time_scale);

        let action = mixer.clip_action(&exact.clip);
        if let Some(a) = mixer.action_mut(action) {
            a.loop_mode = LoopMode::Once;
            a.clamp_when_finished = true;
        }
        mixer.play(action);

        log::debug!(
            "Sign '{}' animation playing ({:.2}s).",
            key,
            exact.clip.duration.as_secs_f32()
        );
        self.register(epoch, key, action, CompletionKind::MeshSwap)
    }

    fn start_shared_rig(
        &mut self,
        key: &str,
        exact: ExactAnimation,
        settings: &PlaybackSettings,
    ) -> Option<oneshot::Receiver<()>> {
        if self.avatar.idle().is_none() {
            log::warn!("No animation mixer available for pre-recorded animations.");
            return None;
        }

        if !self.avatar.is_idle_attached() {
            let time_scale = self.mixer_time_scale();
            self.avatar
                .restore_idle(self.scene.as_mut(), settings.idle_time_scale, time_scale);
        }

        let previous = self
            .completion
            .as_ref()
            .filter(|c| c.kind == CompletionKind::SharedRig)
            .map(|c| c.action)
            .or(self.avatar.idle_action());

        let epoch = self.supersede();
        let mixer = self.avatar.mixer_mut()?;
        let action = mixer.clip_action_from(&exact.clip, exact.model.id());
        if let Some(a) = mixer.action_mut(action) {
            a.loop_mode = LoopMode::Once;
            a.clamp_when_finished = false;
        }
        match previous {
            Some(from) => mixer.cross_fade(from, action, settings.sign_blend),
            None => mixer.play(action),
        }

        log::info!(
            "Playing sign '{}' on the shared rig ({:.2}s blend).",
            key,
            settings.sign_blend.as_secs_f32()
        );
        Some(self.register(epoch, key, action, CompletionKind::SharedRig))
    }

    fn register(
        &mut self,
        epoch: u64,
        key: &str,
        action: ActionId,
        kind: CompletionKind,
    ) -> oneshot::Receiver<()> {
        let (done, rx) = oneshot::channel();
        self.avatar.set_mode(AvatarMode::PlayingSign(key.to_string()));
        self.completion = Some(PendingCompletion {
            epoch,
            key: key.to_string(),
            action,
            kind,
            waiters: vec![done],
        });
        rx
    }

    /// Wait on the completion of `key` if it is the sign now playing
    fn follow(&mut self, key: &str) -> Option<oneshot::Receiver<()>> {
        let completion = self.completion.as_mut().filter(|c| c.key == key)?;
        let (done, rx) = oneshot::channel();
        completion.waiters.push(done);
        Some(rx)
    }

    fn handle_finished(&mut self, action: ActionId, settings: &PlaybackSettings) {
        let current = self
            .completion
            .as_ref()
            .is_some_and(|c| c.action == action && c.epoch == self.epoch);
        if !current {
            log::debug!("Ignoring completion of a superseded animation.");
            return;
        }
        let Some(completion) = self.completion.take() else {
            return;
        };

        log::info!(
            "Sign '{}' completed. Returning to idle avatar.",
            completion.key
        );

        match completion.kind {
            CompletionKind::MeshSwap => {
                let time_scale = self.mixer_time_scale();
                self.avatar
                    .restore_idle(self.scene.as_mut(), settings.idle_time_scale, time_scale);
            }
            CompletionKind::SharedRig => {
                let idle = self.avatar.idle_action();
                if let (Some(mixer), Some(idle)) = (self.avatar.mixer_mut(), idle) {
                    mixer.cross_fade(completion.action, idle, settings.idle_blend);
                }
                self.avatar.set_mode(AvatarMode::Idle);
            }
        }

        self.ui
            .set_description(&SignDescription::text(notifier::IDLE_DESCRIPTION));
        self.ui.set_aria_label(notifier::IDLE_LABEL);

        for done in completion.waiters {
            let _ = done.send(());
        }
    }

    fn advance_timers(&mut self, dt: Duration) {
        for mut timer in std::mem::take(&mut self.timers) {
            timer.remaining = timer.remaining.saturating_sub(dt);
            if timer.remaining.is_zero() {
                let _ = timer.done.send(());
            } else {
                self.timers.push(timer);
            }
        }
    }

    fn show_fingerspell(&mut self, key: &str, notice: &FingerspellNotice) -> PlayOutcome {
        log::info!(
            "Fingerspelling '{}' - no real sign language animation available",
            notice.text
        );
        self.ui.set_status(&notifier::fingerspell_status(notice));
        self.ui
            .set_description(&notifier::fingerspell_description(notice));
        self.ui.set_aria_label(&notifier::fingerspell_label(notice));
        self.ui.highlight_trigger(key);
        self.ui.highlight_paragraph(key);
        PlayOutcome::Fingerspelled {
            placeholder: notice.is_placeholder_warning,
        }
    }

    fn show_signing(&mut self, key: &str, description: &SignDescription) {
        self.ui.set_description(description);
        self.ui.set_aria_label(&notifier::sign_label(description));
        self.ui.highlight_trigger(key);
        self.ui.highlight_paragraph(key);
    }
}

struct PlayerShared {
    core: RefCell<PlayerCore>,
    resolver: SignResolver,
    settings: PlaybackSettings,
}

/// Handle to the avatar player
///
/// Clones refer to the same player.
#[derive(Clone)]
pub struct AvatarPlayer {
    shared: Rc<PlayerShared>,
}

impl AvatarPlayer {
    /// Create the player and put the baseline visual on the scene
    ///
    /// With no idle model the procedural stand-in is shown instead.
    pub fn new(
        resolver: SignResolver,
        mut scene: Box<dyn SceneGraph>,
        ui: Box<dyn UiNotifier>,
        idle: Option<IdleModel>,
        settings: PlaybackSettings,
    ) -> Self {
        let mut avatar = AvatarState::new(idle);
        avatar.restore_idle(scene.as_mut(), settings.idle_time_scale, 1.0);

        let core = PlayerCore {
            avatar,
            scene,
            ui,
            paused: false,
            request: 0,
            epoch: 0,
            completion: None,
            timers: Vec::new(),
            clock: Duration::ZERO,
        };

        Self {
            shared: Rc::new(PlayerShared {
                core: RefCell::new(core),
                resolver,
                settings,
            }),
        }
    }

    fn core(&self) -> Ref<'_, PlayerCore> {
        self.shared.core.borrow()
    }

    fn core_mut(&self) -> RefMut<'_, PlayerCore> {
        self.shared.core.borrow_mut()
    }

    pub fn resolver(&self) -> &SignResolver {
        &self.shared.resolver
    }

    pub fn settings(&self) -> &PlaybackSettings {
        &self.shared.settings
    }

    /// Resolve and present `key`
    ///
    /// Exact signs return once the animation is on the scene; completion is
    /// handled by [`tick`](Self::tick). Compound signs return after the
    /// whole sequence ran. Calling this for the sign that is already playing
    /// does nothing.
    pub fn play(&self, key: &str) -> LocalBoxFuture<'static, PlayOutcome> {
        let player = self.clone();
        let key = key.to_string();
        async move { player.run_play(&key).await }.boxed_local()
    }

    /// Resolve `key` into the cache without playing it, then highlight its
    /// trigger
    pub fn preload(&self, key: &str) -> LocalBoxFuture<'static, Option<ResolvedSign>> {
        let player = self.clone();
        let key = key.to_string();
        async move {
            if key.is_empty() {
                return None;
            }
            let resolved = player.shared.resolver.preload(&key).await;
            player.core_mut().ui.highlight_trigger(&key);
            resolved
        }
        .boxed_local()
    }

    async fn run_play(&self, key: &str) -> PlayOutcome {
        if key.is_empty() {
            return PlayOutcome::Ignored;
        }
        let request = match self.begin_request(key) {
            Ok(request) => request,
            Err(outcome) => return outcome,
        };

        let Some(resolved) = self.shared.resolver.resolve(key).await else {
            return PlayOutcome::Ignored;
        };
        if self.is_stale(request) {
            log::debug!("Resolution of '{}' superseded by a newer request.", key);
            return PlayOutcome::Superseded;
        }

        match resolved {
            ResolvedSign::Compound(compound) => self.play_compound(compound).await,
            other => self.present(key, other).0,
        }
    }

    fn begin_request(&self, key: &str) -> Result<u64, PlayOutcome> {
        let mut core = self.core_mut();
        if core.paused {
            log::debug!("Avatar paused; ignoring play request for '{}'.", key);
            return Err(PlayOutcome::Paused);
        }
        if core.avatar.mode().playing() == Some(key) {
            log::debug!("Sign '{}' is already playing.", key);
            return Err(PlayOutcome::AlreadyPlaying);
        }
        core.request += 1;
        Ok(core.request)
    }

    fn is_stale(&self, request: u64) -> bool {
        self.core().request != request
    }

    /// Apply a resolved sign to the scene and UI
    fn present(
        &self,
        key: &str,
        resolved: ResolvedSign,
    ) -> (PlayOutcome, Option<oneshot::Receiver<()>>) {
        let settings = &self.shared.settings;
        let mut core = self.core_mut();

        let exact = match resolved {
            ResolvedSign::ExactAnimation(exact) => exact,
            ResolvedSign::Fingerspell(notice) => {
                return (core.show_fingerspell(key, &notice), None);
            }
            ResolvedSign::Compound(compound) => {
                log::warn!(
                    "Nested compound '{}' can not be sequenced; skipping.",
                    compound.original_key()
                );
                return (PlayOutcome::Ignored, None);
            }
        };

        let (outcome, done) = match exact.clip.binding {
            AnimationBinding::MeshBound => {
                (PlayOutcome::Started, Some(core.start_mesh_swap(key, exact)))
            }
            AnimationBinding::SharedRig => match core.start_shared_rig(key, exact, settings) {
                Some(done) => (PlayOutcome::CrossFaded, Some(done)),
                None => return (PlayOutcome::NoMixer, None),
            },
        };

        let description =
            notifier::sign_description(key, self.shared.resolver.metadata().lookup(key));
        core.show_signing(key, &description);
        (outcome, done)
    }

    async fn play_compound(&self, compound: CompoundSign) -> PlayOutcome {
        log::info!(
            "Playing compound sign: {}",
            compound.available_parts().join(" + ")
        );
        {
            let mut core = self.core_mut();
            core.ui.set_status(&notifier::compound_status(&compound));
            core.ui
                .set_description(&notifier::compound_description(&compound));
        }

        let mut played = 0;
        let interrupted = |played| PlayOutcome::Compound {
            played,
            completed: false,
        };

        for part in compound.available_parts() {
            let (request, done) = match self.begin_request(part) {
                Ok(request) => {
                    let Some(resolved) = self.shared.resolver.resolve(part).await else {
                        continue;
                    };
                    if self.is_stale(request) {
                        return interrupted(played);
                    }
                    (request, self.present(part, resolved).1)
                }
                Err(PlayOutcome::AlreadyPlaying) => {
                    log::debug!("Part '{}' is already playing; following it.", part);
                    self.follow_part(part)
                }
                Err(outcome) => {
                    log::debug!(
                        "Compound '{}' stopped at '{}': {:?}",
                        compound.original_key(),
                        part,
                        outcome
                    );
                    return interrupted(played);
                }
            };

            if let Some(done) = done {
                if done.await.is_err() {
                    log::debug!(
                        "Compound '{}' interrupted during '{}'.",
                        compound.original_key(),
                        part
                    );
                    return interrupted(played);
                }
                played += 1;
            }

            if self.delay(self.shared.settings.compound_pause).await.is_err()
                || self.is_stale(request)
            {
                return interrupted(played);
            }
        }

        PlayOutcome::Compound {
            played,
            completed: true,
        }
    }

    /// Take over a part that is already on the scene
    ///
    /// Counts as a new request, so later plays still supersede the sequence.
    fn follow_part(&self, part: &str) -> (u64, Option<oneshot::Receiver<()>>) {
        let mut core = self.core_mut();
        core.request += 1;
        let request = core.request;
        (request, core.follow(part))
    }

    /// Signal after `duration` of unpaused tick time
    fn delay(&self, duration: Duration) -> oneshot::Receiver<()> {
        let (done, rx) = oneshot::channel();
        self.core_mut().timers.push(Timer {
            remaining: duration,
            done,
        });
        rx
    }

    /// Advance the clock by `delta` and render one frame
    ///
    /// A paused player advances by zero.
    pub fn tick(&self, delta: Duration) {
        let settings = &self.shared.settings;
        let mut guard = self.core_mut();
        let core = &mut *guard;

        let dt = if core.paused { Duration::ZERO } else { delta };
        core.clock += dt;
        core.advance_timers(dt);

        let events = core
            .avatar
            .mixer_mut()
            .map(|mixer| mixer.update(dt))
            .unwrap_or_default();
        for event in events {
            match event {
                MixerEvent::Finished { action, .. } => core.handle_finished(action, settings),
            }
        }

        if core.avatar.has_standin() {
            let pose = StandinPose::at(core.clock.as_secs_f32());
            core.scene.set_standin_pose(pose);
        }
        core.scene.render();
    }

    /// Flip the pause flag; returns the new state
    pub fn toggle_pause(&self) -> bool {
        let paused = !self.is_paused();
        self.set_paused(paused);
        paused
    }

    /// Freeze or resume playback without losing position
    pub fn set_paused(&self, paused: bool) {
        let mut guard = self.core_mut();
        let core = &mut *guard;
        if core.paused == paused {
            return;
        }
        core.paused = paused;

        let time_scale = core.mixer_time_scale();
        if let Some(mixer) = core.avatar.mixer_mut() {
            mixer.set_time_scale(time_scale);
        }
        core.ui.set_toggle(paused);

        if paused {
            log::info!("Avatar paused.");
            core.ui
                .set_description(&SignDescription::text(notifier::PAUSED_DESCRIPTION));
            return;
        }

        log::info!("Avatar resumed.");
        let description = match core.avatar.mode() {
            AvatarMode::Idle => SignDescription::text(notifier::RESUMED_DESCRIPTION),
            AvatarMode::PlayingSign(key) => {
                notifier::sign_description(key, self.shared.resolver.metadata().lookup(key))
            }
        };
        core.ui.set_description(&description);
    }

    pub fn is_paused(&self) -> bool {
        self.core().paused
    }

    /// Toggle the in-view marker of the reading section for `key`
    pub fn mark_in_view(&self, key: &str, in_view: bool) {
        self.core_mut().ui.mark_in_view(key, in_view);
    }

    pub fn mode(&self) -> AvatarMode {
        self.core().avatar.mode().clone()
    }

    /// Model currently on the scene
    pub fn current_model(&self) -> Option<ModelScene> {
        self.core().avatar.current_model().cloned()
    }

    pub fn idle_model(&self) -> Option<ModelScene> {
        self.core().avatar.idle().map(|idle| idle.model.clone())
    }

    /// Whether the procedural stand-in is showing
    pub fn has_standin(&self) -> bool {
        self.core().avatar.has_standin()
    }

    /// Scaled time the current mixer has advanced
    pub fn mixer_time(&self) -> Option<Duration> {
        self.core().avatar.mixer().map(|m| m.time())
    }

    /// Number of actions playing on the current mixer
    pub fn running_actions(&self) -> usize {
        self.core()
            .avatar
            .mixer()
            .map_or(0, |m| m.running_count())
    }

    /// Unpaused time accumulated by [`tick`](Self::tick)
    pub fn clock(&self) -> Duration {
        self.core().clock
    }

    /// Scene epoch; moves each time an animation is put on the scene
    pub fn epoch(&self) -> u64 {
        self.core().epoch
    }

    /// Whether a completion is waiting for the current animation
    pub fn has_pending_completion(&self) -> bool {
        self.core().completion.is_some()
    }
}

impl std::fmt::Debug for AvatarPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.core();
        f.debug_struct("AvatarPlayer")
            .field("mode", core.avatar.mode())
            .field("paused", &core.paused)
            .field("epoch", &core.epoch)
            .field("resolver", &self.shared.resolver)
            .finish()
    }
}
