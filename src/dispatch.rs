//! Interaction dispatcher
//!
//! Maps document events onto player calls: trigger clicks and key presses
//! play a sign, reading sections auto-play when they become the dominant
//! visible section, the toggle control pauses and resumes.
//!
//! Dispatch never blocks. Calls that resolve signs hand back a future for
//! the host's event loop to run.

use futures::future::LocalBoxFuture;

use crate::playback::{AvatarPlayer, PlayOutcome};
use crate::resolver::ResolvedSign;

/// Keyboard key on a focused trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Space,
    Other,
}

impl Key {
    /// Map a DOM `KeyboardEvent.key` value
    pub fn from_dom(key: &str) -> Self {
        match key {
            "Enter" => Key::Enter,
            " " | "Spacebar" => Key::Space,
            _ => Key::Other,
        }
    }

    /// Whether this key activates a trigger
    pub fn activates(self) -> bool {
        matches!(self, Key::Enter | Key::Space)
    }
}

/// Input from the document layer
#[derive(Debug, Clone, PartialEq)]
pub enum InteractionEvent {
    /// Pointer activation of a trigger carrying `key`
    Click { key: String },
    /// Key press while a trigger carrying `key` has focus
    KeyDown { key: String, pressed: Key },
    /// Visible ratio of the reading section for `key` changed
    Visibility { key: String, ratio: f32 },
    /// Pause/resume control activated
    TogglePause,
    /// Warm the cache for a trigger
    Preload { key: String },
}

/// Result of dispatching one event
pub enum Dispatch {
    /// A play was started; the future yields its outcome
    Play(LocalBoxFuture<'static, PlayOutcome>),
    /// A preload was started
    Preload(LocalBoxFuture<'static, Option<ResolvedSign>>),
    /// The pause flag flipped to the contained value
    Toggled(bool),
    /// Nothing to do
    Nothing,
}

impl Dispatch {
    pub fn is_play(&self) -> bool {
        matches!(self, Dispatch::Play(_))
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Dispatch::Nothing)
    }
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatch::Play(_) => f.write_str("Play(..)"),
            Dispatch::Preload(_) => f.write_str("Preload(..)"),
            Dispatch::Toggled(paused) => f.debug_tuple("Toggled").field(paused).finish(),
            Dispatch::Nothing => f.write_str("Nothing"),
        }
    }
}

#[derive(Debug)]
pub struct InteractionDispatcher {
    player: AvatarPlayer,
    visibility_threshold: f32,
    last_auto_played: Option<String>,
}

impl InteractionDispatcher {
    pub fn new(player: AvatarPlayer, visibility_threshold: f32) -> Self {
        Self {
            player,
            visibility_threshold,
            last_auto_played: None,
        }
    }

    pub fn player(&self) -> &AvatarPlayer {
        &self.player
    }

    /// Key of the reading section that last auto-played
    pub fn last_auto_played(&self) -> Option<&str> {
        self.last_auto_played.as_deref()
    }

    pub fn dispatch(&mut self, event: InteractionEvent) -> Dispatch {
        match event {
            InteractionEvent::Click { key } => self.play(&key),
            InteractionEvent::KeyDown { key, pressed } => {
                if pressed.activates() {
                    self.play(&key)
                } else {
                    Dispatch::Nothing
                }
            }
            InteractionEvent::Visibility { key, ratio } => self.visibility(key, ratio),
            InteractionEvent::TogglePause => Dispatch::Toggled(self.player.toggle_pause()),
            InteractionEvent::Preload { key } => {
                if key.is_empty() {
                    Dispatch::Nothing
                } else {
                    Dispatch::Preload(self.player.preload(&key))
                }
            }
        }
    }

    fn play(&self, key: &str) -> Dispatch {
        if key.is_empty() {
            return Dispatch::Nothing;
        }
        Dispatch::Play(self.player.play(key))
    }

    fn visibility(&mut self, key: String, ratio: f32) -> Dispatch {
        if ratio < self.visibility_threshold {
            self.player.mark_in_view(&key, false);
            return Dispatch::Nothing;
        }

        self.player.mark_in_view(&key, true);
        if key.is_empty() || self.last_auto_played.as_deref() == Some(key.as_str()) {
            return Dispatch::Nothing;
        }

        log::debug!("Auto-playing sign for visible section: {}", key);
        let play = self.player.play(&key);
        self.last_auto_played = Some(key);
        Dispatch::Play(play)
    }
}
