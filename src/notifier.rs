//! Accessibility and UI notifier
//!
//! The document layer is external. The player reports through
//! [`UiNotifier`]: a status line, a sign description (text plus optional
//! notation), an accessible label for the avatar surface, highlights for the
//! active trigger and reading paragraph, and the pause toggle. Notifier calls
//! never fail and return nothing.
//!
//! The `*_status`/`*_description` functions compose the user-facing text for
//! each resolution outcome.

use std::cell::RefCell;
use std::rc::Rc;

use crate::metadata::SignMetadata;
use crate::resolver::{CompoundSign, FingerspellNotice};

pub const IDLE_DESCRIPTION: &str = "Avatar is in idle state.";
pub const IDLE_LABEL: &str = "Sign language avatar in idle state.";
pub const PAUSED_DESCRIPTION: &str = "Avatar animation paused. Activate the Play button to resume.";
pub const RESUMED_DESCRIPTION: &str = "Avatar is idle.";
pub const IDLE_LOADED_STATUS: &str = "Avatar loaded. Idle pose is playing.";
pub const IDLE_FAILED_STATUS: &str =
    "Could not load idle pose. A placeholder avatar is shown; sign animations load on demand.";
pub const LOAD_FAILED_DESCRIPTION: &str =
    "The 3D avatar could not be loaded. Please use the text description instead.";

/// Description text with optional sign notation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SignDescription {
    pub text: String,
    /// HamNoSys notation
    pub notation: Option<String>,
}

impl SignDescription {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            notation: None,
        }
    }

    /// Text followed by the notation sentence, if any
    pub fn full_text(&self) -> String {
        match &self.notation {
            Some(notation) => format!("{} HamNoSys notation: {}.", self.text, notation),
            None => self.text.clone(),
        }
    }
}

/// Receives user-facing output from the player
pub trait UiNotifier {
    /// Replace the status line
    fn set_status(&mut self, text: &str);

    /// Replace the visible sign description
    fn set_description(&mut self, description: &SignDescription);

    /// Replace the accessible label of the avatar surface
    fn set_aria_label(&mut self, label: &str);

    /// Mark the trigger for `key` active and every other trigger inactive
    fn highlight_trigger(&mut self, key: &str);

    /// Mark the reading paragraph for `key` as the one being signed
    fn highlight_paragraph(&mut self, key: &str);

    /// Toggle the in-view marker of the reading section for `key`
    fn mark_in_view(&mut self, key: &str, in_view: bool);

    /// Reflect the pause state on the toggle control
    fn set_toggle(&mut self, paused: bool);
}

/// Label for the pause toggle control
pub fn toggle_label(paused: bool) -> &'static str {
    if paused {
        "Play avatar"
    } else {
        "Pause avatar"
    }
}

pub fn compound_status(compound: &CompoundSign) -> String {
    format!(
        "Compound sign: {} = {} (sequential playback)",
        compound.original_key(),
        compound.available_parts().join(" + ")
    )
}

pub fn compound_description(compound: &CompoundSign) -> SignDescription {
    SignDescription::text(format!(
        "Compound: {}. Missing complete sign for \"{}\".",
        compound.available_parts().join(" + "),
        compound.original_key()
    ))
}

pub fn fingerspell_status(notice: &FingerspellNotice) -> String {
    if notice.is_placeholder_warning {
        format!(
            "No sign language animation for \"{}\". Placeholder files detected.",
            notice.text
        )
    } else {
        format!("Text representation: {} (no animation file)", notice.text)
    }
}

fn fingerspell_text(notice: &FingerspellNotice) -> String {
    notice
        .description
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("Fingerspelling: {}", notice.text))
}

pub fn fingerspell_description(notice: &FingerspellNotice) -> SignDescription {
    SignDescription::text(format!(
        "PLACEHOLDER ONLY: {}. This is NOT sign language - real animation needed.",
        fingerspell_text(notice)
    ))
}

pub fn fingerspell_label(notice: &FingerspellNotice) -> String {
    format!(
        "Warning: No sign language animation available for {}. Text description: {}",
        notice.text,
        fingerspell_text(notice)
    )
}

/// Description shown while a sign plays
pub fn sign_description(key: &str, meta: &SignMetadata) -> SignDescription {
    let text = meta
        .description
        .clone()
        .filter(|d| !d.is_empty())
        .unwrap_or_else(|| format!("Avatar is signing: {}.", key.replace(['-', '_'], " ")));
    SignDescription {
        text,
        notation: meta.hamnosys.clone().filter(|h| !h.is_empty()),
    }
}

pub fn sign_label(description: &SignDescription) -> String {
    format!("Sign language avatar. {}", description.full_text())
}

/// Everything a [`HeadlessUi`] has been told
#[derive(Debug, Clone, Default)]
pub struct UiSnapshot {
    pub status: String,
    pub description: SignDescription,
    pub aria_label: String,
    pub active_trigger: Option<String>,
    pub active_paragraph: Option<String>,
    pub in_view: Vec<String>,
    pub paused: bool,
    pub toggle_label: String,
    /// Every status line in order
    pub status_history: Vec<String>,
}

/// Notifier without a document; records the latest state
///
/// Clones share one snapshot.
#[derive(Debug, Clone, Default)]
pub struct HeadlessUi {
    state: Rc<RefCell<UiSnapshot>>,
}

impl HeadlessUi {
    pub fn new() -> Self {
        let ui = Self::default();
        ui.state.borrow_mut().toggle_label = toggle_label(false).to_string();
        ui
    }

    pub fn snapshot(&self) -> UiSnapshot {
        self.state.borrow().clone()
    }

    pub fn status(&self) -> String {
        self.state.borrow().status.clone()
    }

    pub fn description(&self) -> SignDescription {
        self.state.borrow().description.clone()
    }

    pub fn aria_label(&self) -> String {
        self.state.borrow().aria_label.clone()
    }
}

impl UiNotifier for HeadlessUi {
    fn set_status(&mut self, text: &str) {
        let mut state = self.state.borrow_mut();
        state.status = text.to_string();
        state.status_history.push(text.to_string());
    }

    fn set_description(&mut self, description: &SignDescription) {
        self.state.borrow_mut().description = description.clone();
    }

    fn set_aria_label(&mut self, label: &str) {
        self.state.borrow_mut().aria_label = label.to_string();
    }

    fn highlight_trigger(&mut self, key: &str) {
        self.state.borrow_mut().active_trigger = Some(key.to_string());
    }

    fn highlight_paragraph(&mut self, key: &str) {
        self.state.borrow_mut().active_paragraph = Some(key.to_string());
    }

    fn mark_in_view(&mut self, key: &str, in_view: bool) {
        let mut state = self.state.borrow_mut();
        let present = state.in_view.iter().any(|k| k == key);
        if in_view && !present {
            state.in_view.push(key.to_string());
        } else if !in_view {
            state.in_view.retain(|k| k != key);
        }
    }

    fn set_toggle(&mut self, paused: bool) {
        let mut state = self.state.borrow_mut();
        state.paused = paused;
        state.toggle_label = toggle_label(paused).to_string();
    }
}
