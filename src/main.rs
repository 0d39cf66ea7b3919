use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;

use signer::assets::FsAssetSource;
use signer::dispatch::{Dispatch, InteractionEvent};
use signer::engine::{self, HostCapabilities, SignerEngine};
use signer::logging::{self, DIAGNOSTICS};
use signer::notifier::HeadlessUi;
use signer::playback::{AvatarMode, HeadlessScene, PlayOutcome};
use signer::{config, Cli};

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration file, then let the command line override it
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let options = config::load_config(config_path.as_deref())?;
    let options = cli.merge_into_options(options)?;

    logging::log_init(options.log_lines, cli.log_level());

    log::info!("Configuration:");
    log::info!("  Content dir: {}", options.content_dir.display());
    log::info!("  Metadata: {}", options.metadata_file);
    log::info!("  Animations: {}", options.animations_dir);
    log::info!("  Idle asset: {}", options.idle_asset);

    let scene = HeadlessScene::new();
    let ui = HeadlessUi::new();
    let host = HostCapabilities {
        scene: Some(Box::new(scene.clone())),
        source: Some(Rc::new(FsAssetSource::new(&options.content_dir))),
        ui: Box::new(ui.clone()),
    };

    let mut pool = LocalPool::new();
    let mut engine = pool.run_until(engine::boot(&options, host))?;

    if cli.preload {
        for key in &cli.keys {
            let event = InteractionEvent::Preload { key: key.clone() };
            if let Dispatch::Preload(preload) = engine.dispatcher().dispatch(event) {
                pool.run_until(preload);
            }
        }
    }

    let frame = cli.frame_interval();
    let budget = cli.max_duration();
    for key in &cli.keys {
        let outcome = play_to_idle(&mut engine, &mut pool, key, frame, budget)?;
        println!("{}: {:?}", key, outcome);
        println!("  status:      {}", ui.status());
        println!("  description: {}", ui.description().full_text());
        println!("  aria-label:  {}", ui.aria_label());
    }

    println!("frames rendered: {}", scene.frames());
    println!("diagnostic log ({} lines):", DIAGNOSTICS.len());
    for line in DIAGNOSTICS.lines() {
        println!("  {}", line);
    }

    Ok(())
}

/// Play `key` and tick until the play call returned and the avatar is idle
fn play_to_idle(
    engine: &mut SignerEngine,
    pool: &mut LocalPool,
    key: &str,
    frame: Duration,
    budget: Duration,
) -> Result<Option<PlayOutcome>> {
    let event = InteractionEvent::Click {
        key: key.to_string(),
    };
    let Dispatch::Play(play) = engine.dispatcher().dispatch(event) else {
        return Ok(None);
    };

    let slot = Rc::new(RefCell::new(None));
    let out = Rc::clone(&slot);
    pool.spawner()
        .spawn_local(async move {
            *out.borrow_mut() = Some(play.await);
        })
        .map_err(|e| anyhow::anyhow!("Failed to spawn play task: {:?}", e))?;

    let player = engine.player().clone();
    let mut elapsed = Duration::ZERO;
    loop {
        pool.run_until_stalled();
        if slot.borrow().is_some() && player.mode() == AvatarMode::Idle {
            break;
        }
        if elapsed >= budget {
            log::warn!("'{}' still running after {:?}; moving on.", key, budget);
            break;
        }
        player.tick(frame);
        elapsed += frame;
    }

    let outcome = slot.borrow_mut().take();
    Ok(outcome)
}
