// Playback Integration Tests
// End-to-end resolve / play / tick scenarios against scripted in-memory assets

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;

use signer::assets::{AnimationClip, MemoryAssetSource};
use signer::dispatch::{Dispatch, InteractionEvent, Key};
use signer::engine::{self, HostCapabilities, SignerEngine};
use signer::notifier::{self, HeadlessUi};
use signer::playback::{AvatarMode, HeadlessScene, PlayOutcome};
use signer::Options;

const FRAME: Duration = Duration::from_millis(50);

const SIGNS: &str = r#"{
    "HELLO": {"file": "HELLO.glb", "description": "Open hand salute"},
    "LEGAL": {"file": "LEGAL.glb"},
    "DIFFERENCE": {"file": "DIFFERENCE.glb", "hamnosys": ""},
    "THANKS": {"file": "THANKS.glb"},
    "WELCOME": {"description": "Arm sweeps inward"}
}"#;

struct Page {
    engine: SignerEngine,
    scene: HeadlessScene,
    ui: HeadlessUi,
    source: MemoryAssetSource,
    pool: LocalPool,
}

fn clip(name: &str, millis: u64) -> Vec<AnimationClip> {
    vec![AnimationClip::new(name, Duration::from_millis(millis))]
}

fn content() -> MemoryAssetSource {
    MemoryAssetSource::new()
        .with_text("signs.json", SIGNS)
        .with_model("animations/idle-neutral.glb", clip("Idle", 4000))
        // Real content behind a placeholder clip name.
        .with_model("animations/HELLO.glb", clip("idle_wave", 1000))
        .with_model("animations/LEGAL.glb", clip("LEGAL", 1000))
        .with_model("animations/DIFFERENCE.glb", clip("DIFFERENCE", 500))
        .with_model("animations/THANKS.glb", clip("THANKS", 1000))
}

fn boot_page(source: MemoryAssetSource) -> Page {
    let scene = HeadlessScene::new();
    let ui = HeadlessUi::new();
    let host = HostCapabilities {
        scene: Some(Box::new(scene.clone())),
        source: Some(Rc::new(source.clone())),
        ui: Box::new(ui.clone()),
    };
    let mut pool = LocalPool::new();
    let engine = pool
        .run_until(engine::boot(&Options::default(), host))
        .unwrap();
    Page {
        engine,
        scene,
        ui,
        source,
        pool,
    }
}

impl Page {
    fn dispatch(&mut self, event: InteractionEvent) -> Rc<RefCell<Option<PlayOutcome>>> {
        let slot = Rc::new(RefCell::new(None));
        if let Dispatch::Play(play) = self.engine.dispatcher().dispatch(event) {
            let out = Rc::clone(&slot);
            self.pool
                .spawner()
                .spawn_local(async move {
                    *out.borrow_mut() = Some(play.await);
                })
                .unwrap();
        }
        self.pool.run_until_stalled();
        slot
    }

    fn click(&mut self, key: &str) -> Rc<RefCell<Option<PlayOutcome>>> {
        self.dispatch(InteractionEvent::Click { key: key.into() })
    }

    fn tick(&mut self, frames: usize) {
        for _ in 0..frames {
            self.engine.player().tick(FRAME);
            self.pool.run_until_stalled();
        }
    }

    fn mode(&self) -> AvatarMode {
        self.engine.player().mode()
    }
}

#[test]
fn test_compound_legal_difference() {
    let mut page = boot_page(content());
    let idle = page.engine.player().idle_model();

    let outcome = page.click("LEGAL-DIFFERENCE");
    assert_eq!(
        page.ui.status(),
        "Compound sign: LEGAL-DIFFERENCE = LEGAL + DIFFERENCE (sequential playback)"
    );
    assert_eq!(page.mode(), AvatarMode::PlayingSign("LEGAL".into()));

    // LEGAL runs 1s, then returns to idle.
    page.tick(20);
    assert_eq!(page.mode(), AvatarMode::Idle);
    assert_eq!(page.engine.player().current_model(), idle);
    assert_eq!(page.source.request_count("animations/DIFFERENCE.glb"), 0);

    // 300ms gap with the idle model showing.
    page.tick(5);
    assert_eq!(page.mode(), AvatarMode::Idle);
    page.tick(1);
    assert_eq!(page.mode(), AvatarMode::PlayingSign("DIFFERENCE".into()));
    assert_eq!(
        page.ui.description().full_text(),
        "Avatar is signing: DIFFERENCE. HamNoSys notation: \u{e001}."
    );

    page.tick(10);
    assert_eq!(page.mode(), AvatarMode::Idle);
    page.tick(6);
    assert_eq!(
        *outcome.borrow(),
        Some(PlayOutcome::Compound {
            played: 2,
            completed: true
        })
    );

    // Only the idle model is left on the scene.
    assert_eq!(page.scene.attached_sources(), vec!["animations/idle-neutral.glb"]);
}

#[test]
fn test_placeholder_hello_fingerspells() {
    let mut page = boot_page(content());
    let before = page.scene.snapshot().attach_count();

    let outcome = page.click("HELLO");
    assert_eq!(
        *outcome.borrow(),
        Some(PlayOutcome::Fingerspelled { placeholder: true })
    );
    assert_eq!(page.mode(), AvatarMode::Idle);
    assert_eq!(page.scene.snapshot().attach_count(), before);
    assert_eq!(
        page.ui.status(),
        "No sign language animation for \"HELLO\". Placeholder files detected."
    );
    assert_eq!(
        page.ui.aria_label(),
        "Warning: No sign language animation available for HELLO. Text description: Open hand salute"
    );
    assert!(!page.engine.player().resolver().is_cached("HELLO"));
}

#[test]
fn test_idle_within_one_tick_of_completion() {
    let mut page = boot_page(content());
    page.click("THANKS");
    page.tick(19);
    assert_eq!(page.mode(), AvatarMode::PlayingSign("THANKS".into()));

    page.tick(1);
    assert_eq!(page.mode(), AvatarMode::Idle);
    assert_eq!(
        page.engine.player().current_model(),
        page.engine.player().idle_model()
    );
    assert_eq!(page.engine.player().running_actions(), 1);
    assert_eq!(page.ui.description().text, notifier::IDLE_DESCRIPTION);
}

#[test]
fn test_cache_serves_repeat_plays() {
    let mut page = boot_page(content());
    page.click("THANKS");
    page.tick(20);
    page.click("THANKS");
    page.tick(20);
    page.click("THANKS");
    assert_eq!(page.source.request_count("animations/THANKS.glb"), 1);
}

#[test]
fn test_pause_toggle_freezes_playback() {
    let mut page = boot_page(content());
    page.click("THANKS");
    page.tick(10);
    let position = page.engine.player().mixer_time();

    page.dispatch(InteractionEvent::TogglePause);
    assert!(page.engine.player().is_paused());
    page.tick(100);
    assert_eq!(page.engine.player().mixer_time(), position);
    assert_eq!(page.mode(), AvatarMode::PlayingSign("THANKS".into()));

    // Plays are refused while paused.
    let refused = page.click("LEGAL");
    assert_eq!(*refused.borrow(), Some(PlayOutcome::Paused));

    page.dispatch(InteractionEvent::TogglePause);
    page.tick(9);
    assert_eq!(page.mode(), AvatarMode::PlayingSign("THANKS".into()));
    page.tick(1);
    assert_eq!(page.mode(), AvatarMode::Idle);
}

#[test]
fn test_interrupting_sign_wins() {
    let mut page = boot_page(content());
    page.click("THANKS");
    page.tick(10);
    page.dispatch(InteractionEvent::KeyDown {
        key: "LEGAL".into(),
        pressed: Key::Space,
    });
    assert_eq!(page.mode(), AvatarMode::PlayingSign("LEGAL".into()));

    // THANKS would have finished after 10 more frames; LEGAL keeps going.
    page.tick(10);
    assert_eq!(page.mode(), AvatarMode::PlayingSign("LEGAL".into()));
    page.tick(10);
    assert_eq!(page.mode(), AvatarMode::Idle);
}

#[test]
fn test_render_loop_runs_during_slow_load() {
    let mut page = boot_page(content());
    page.source.hold_loads(true);
    let outcome = page.click("LEGAL");
    assert!(page.engine.player().resolver().is_loading("LEGAL"));

    let frames = page.scene.frames();
    page.tick(30);
    assert_eq!(page.scene.frames(), frames + 30);
    assert_eq!(page.mode(), AvatarMode::Idle);
    assert!(outcome.borrow().is_none());

    page.source.release_all();
    page.pool.run_until_stalled();
    assert_eq!(*outcome.borrow(), Some(PlayOutcome::Started));
}

#[test]
fn test_same_key_twice_does_not_restart() {
    let mut page = boot_page(content());
    page.click("LEGAL");
    page.tick(5);
    let attaches = page.scene.snapshot().attach_count();
    let position = page.engine.player().mixer_time();

    let again = page.click("LEGAL");
    assert_eq!(*again.borrow(), Some(PlayOutcome::AlreadyPlaying));
    assert_eq!(page.scene.snapshot().attach_count(), attaches);
    assert_eq!(page.engine.player().mixer_time(), position);
}

#[test]
fn test_visibility_autoplay() {
    let mut page = boot_page(content());
    page.dispatch(InteractionEvent::Visibility {
        key: "THANKS".into(),
        ratio: 0.6,
    });
    assert_eq!(page.mode(), AvatarMode::PlayingSign("THANKS".into()));
    assert_eq!(page.ui.snapshot().active_paragraph.as_deref(), Some("THANKS"));

    page.tick(20);
    let again = page.dispatch(InteractionEvent::Visibility {
        key: "THANKS".into(),
        ratio: 0.9,
    });
    assert!(again.borrow().is_none());
    assert_eq!(page.mode(), AvatarMode::Idle);
}

#[test]
fn test_unknown_word_text_fallback() {
    let mut page = boot_page(content());
    let outcome = page.click("WELCOME");
    assert_eq!(
        *outcome.borrow(),
        Some(PlayOutcome::Fingerspelled { placeholder: false })
    );
    assert_eq!(
        page.ui.description().text,
        "PLACEHOLDER ONLY: Arm sweeps inward. This is NOT sign language - real animation needed."
    );
}

#[test]
fn test_degraded_page_still_answers() {
    let source = MemoryAssetSource::new()
        .with_text("signs.json", SIGNS)
        .with_model("animations/THANKS.glb", clip("THANKS", 1000));
    let mut page = boot_page(source);
    assert!(page.engine.player().has_standin());
    assert_eq!(page.ui.status(), notifier::IDLE_FAILED_STATUS);

    let text = page.click("WELCOME");
    assert!(matches!(
        *text.borrow(),
        Some(PlayOutcome::Fingerspelled { .. })
    ));

    page.click("THANKS");
    assert!(!page.engine.player().has_standin());
    page.tick(20);
    assert_eq!(page.mode(), AvatarMode::Idle);
    assert!(page.engine.player().has_standin());
}
