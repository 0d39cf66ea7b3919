use std::path::PathBuf;
use std::time::Duration;

use crate::config::{parse_duration_ms, parse_threshold, parse_time_scale, Options};
use anyhow::{Context, Result};
use clap::Parser;

pub const DEFAULT_FPS: u32 = 60;
pub const DEFAULT_MAX_SECONDS: u64 = 15;

/// Sign-language avatar player (headless)
#[derive(Parser, Debug, Default)]
#[command(name = "signer")]
#[command(version)]
#[command(about = "Resolve and play sign-language animations against a content directory", long_about = None)]
pub struct Cli {
    /// Sign keys to play, in order
    #[arg(value_name = "KEY")]
    pub keys: Vec<String>,

    /// Content directory path
    #[arg(short, long, value_name = "CONTENTDIR")]
    pub contentdir: Option<String>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,

    /// Metadata document, relative to the content directory
    #[arg(short, long, value_name = "FILE")]
    pub metadata: Option<String>,

    /// Animation directory, relative to the content directory
    #[arg(short, long, value_name = "DIR")]
    pub animations: Option<String>,

    /// Idle asset, relative to the content directory
    #[arg(long, value_name = "FILE")]
    pub idle: Option<String>,

    /// Pause between compound parts (e.g. 300ms)
    #[arg(long = "compound-pause", value_name = "MS")]
    pub compound_pause: Option<String>,

    /// Cross-fade into rig-bound signs
    #[arg(long = "sign-blend", value_name = "MS")]
    pub sign_blend: Option<String>,

    /// Cross-fade from rig-bound signs back to idle
    #[arg(long = "idle-blend", value_name = "MS")]
    pub idle_blend: Option<String>,

    /// Idle clip playback rate
    #[arg(long = "idle-speed", value_name = "SCALE")]
    pub idle_speed: Option<String>,

    /// Visibility ratio that auto-plays a reading section (0-1]
    #[arg(short, long, value_name = "RATIO")]
    pub threshold: Option<String>,

    /// Number of diagnostic lines to keep
    #[arg(long = "log-lines", value_name = "N")]
    pub log_lines: Option<usize>,

    /// Simulated frames per second
    #[arg(short, long, value_name = "FPS")]
    pub fps: Option<u32>,

    /// Give up on a key after this many simulated seconds
    #[arg(long = "max-seconds", value_name = "SECONDS")]
    pub max_seconds: Option<u64>,

    /// Preload every key before playing
    #[arg(short, long)]
    pub preload: bool,

    /// Log debug detail
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Merge CLI arguments into the options struct
    pub fn merge_into_options(&self, mut opts: Options) -> Result<Options> {
        if let Some(ref content_dir) = self.contentdir {
            opts.content_dir = PathBuf::from(content_dir);
        }

        if let Some(ref metadata) = self.metadata {
            opts.metadata_file = metadata.clone();
        }

        if let Some(ref animations) = self.animations {
            opts.animations_dir = animations.clone();
        }

        if let Some(ref idle) = self.idle {
            opts.idle_asset = idle.clone();
        }

        if let Some(ref pause) = self.compound_pause {
            opts.compound_pause_ms = parse_duration_ms(pause).context("Invalid compound pause")?;
        }

        if let Some(ref blend) = self.sign_blend {
            opts.sign_blend_ms = parse_duration_ms(blend).context("Invalid sign blend")?;
        }

        if let Some(ref blend) = self.idle_blend {
            opts.idle_blend_ms = parse_duration_ms(blend).context("Invalid idle blend")?;
        }

        if let Some(ref speed) = self.idle_speed {
            opts.idle_time_scale = parse_time_scale(speed)?;
        }

        if let Some(ref threshold) = self.threshold {
            opts.visibility_threshold = parse_threshold(threshold)?;
        }

        if let Some(lines) = self.log_lines {
            opts.log_lines = lines;
        }

        opts.validate()?;
        Ok(opts)
    }

    /// Simulated frame interval
    pub fn frame_interval(&self) -> Duration {
        let fps = self.fps.unwrap_or(DEFAULT_FPS).max(1);
        Duration::from_secs(1) / fps
    }

    /// Simulated time budget per key
    pub fn max_duration(&self) -> Duration {
        Duration::from_secs(self.max_seconds.unwrap_or(DEFAULT_MAX_SECONDS))
    }

    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        }
    }
}
