use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::logging::DEFAULT_LOG_LINES;

/// Engine options that can be set via CLI or config file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Options {
    // Content locations
    pub content_dir: PathBuf,
    pub metadata_file: String,
    pub animations_dir: String,
    pub idle_asset: String,

    // Playback tuning
    pub compound_pause_ms: u64,
    pub sign_blend_ms: u64,
    pub idle_blend_ms: u64,
    pub idle_time_scale: f32,

    // Interaction and diagnostics
    pub visibility_threshold: f32,
    pub log_lines: usize,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            content_dir: PathBuf::from("."),
            metadata_file: "signs.json".to_string(),
            animations_dir: "animations".to_string(),
            idle_asset: "animations/idle-neutral.glb".to_string(),
            compound_pause_ms: 300,
            sign_blend_ms: 300,
            idle_blend_ms: 500,
            idle_time_scale: 1.0,
            visibility_threshold: 0.55,
            log_lines: DEFAULT_LOG_LINES,
        }
    }
}

impl Options {
    /// Pause inserted between the parts of a compound sign
    pub fn compound_pause(&self) -> Duration {
        Duration::from_millis(self.compound_pause_ms)
    }

    /// Cross-fade into a rig-bound sign
    pub fn sign_blend(&self) -> Duration {
        Duration::from_millis(self.sign_blend_ms)
    }

    /// Cross-fade from a rig-bound sign back to idle
    pub fn idle_blend(&self) -> Duration {
        Duration::from_millis(self.idle_blend_ms)
    }

    /// Check value ranges after loading or merging
    pub fn validate(&self) -> Result<()> {
        check_threshold(self.visibility_threshold)?;
        check_time_scale(self.idle_time_scale)?;
        if self.log_lines == 0 {
            anyhow::bail!("log_lines must be at least 1");
        }
        if self.metadata_file.trim().is_empty() {
            anyhow::bail!("metadata_file must not be empty");
        }
        Ok(())
    }
}

/// Load configuration from a JSON file
///
/// Missing file path means defaults. Keys absent from the file keep their
/// default values.
pub fn load_config(config_path: Option<&Path>) -> Result<Options> {
    let Some(path) = config_path else {
        return Ok(Options::default());
    };

    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    let options: Options = serde_json::from_str(&text)
        .with_context(|| format!("Invalid config file {}", path.display()))?;
    options.validate()?;
    Ok(options)
}

/// Parse a millisecond duration such as "300" or "300ms"
pub fn parse_duration_ms(s: &str) -> Result<u64> {
    let trimmed = s.trim();
    let digits = trimmed.strip_suffix("ms").unwrap_or(trimmed).trim();
    let ms: u64 = digits.parse().context("Invalid duration value")?;

    const MAX_MS: u64 = 60_000;
    if ms > MAX_MS {
        anyhow::bail!("Duration out of range (0 to {} ms)", MAX_MS);
    }

    Ok(ms)
}

/// Parse a visibility ratio threshold (0.0 exclusive to 1.0 inclusive)
pub fn parse_threshold(s: &str) -> Result<f32> {
    let value: f32 = s.trim().parse().context("Invalid threshold value")?;
    check_threshold(value)?;
    Ok(value)
}

/// Parse a playback rate multiplier
pub fn parse_time_scale(s: &str) -> Result<f32> {
    let value: f32 = s.trim().parse().context("Invalid time scale value")?;
    check_time_scale(value)?;
    Ok(value)
}

fn check_threshold(value: f32) -> Result<()> {
    if !(value > 0.0 && value <= 1.0) {
        anyhow::bail!("Visibility threshold out of range (0.0 to 1.0)");
    }
    Ok(())
}

fn check_time_scale(value: f32) -> Result<()> {
    const MAX_SCALE: f32 = 10.0;
    if !(value > 0.0 && value <= MAX_SCALE) {
        anyhow::bail!("Time scale out of range (0.0 to {})", MAX_SCALE);
    }
    Ok(())
}
