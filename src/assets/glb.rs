//! glTF container inspection
//!
//! Reads just enough of a binary glTF (`.glb`) or plain JSON glTF document
//! to list its animation clips: name, duration and whether the clip drives
//! morph-target weights (mesh-bound) or node transforms (shared rig).
//! Geometry and buffers stay with the external engine.

use std::time::Duration;

use serde::Deserialize;

use super::{AnimationBinding, AnimationClip};

/// "glTF" in little-endian
pub const GLB_MAGIC: u32 = 0x4654_6C67;
/// "JSON" chunk type
pub const CHUNK_JSON: u32 = 0x4E4F_534A;

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GlbError {
    #[error("File too short for a glTF container ({0} bytes)")]
    TooShort(usize),

    #[error("Bad magic: {0:#010x}")]
    BadMagic(u32),

    #[error("Unsupported glTF container version {0}")]
    UnsupportedVersion(u32),

    #[error("Declared length {declared} exceeds file size {actual}")]
    LengthMismatch { declared: usize, actual: usize },

    #[error("First chunk is not JSON")]
    MissingJsonChunk,

    #[error("Malformed glTF JSON: {0}")]
    Json(String),

    #[error("Clip \"{clip}\" has an unusable duration of {seconds}s")]
    BadDuration { clip: String, seconds: f64 },
}

#[derive(Debug, Default, Deserialize)]
struct GltfDocument {
    #[serde(default)]
    animations: Vec<GltfAnimation>,
    #[serde(default)]
    accessors: Vec<GltfAccessor>,
}

#[derive(Debug, Deserialize)]
struct GltfAnimation {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    channels: Vec<GltfChannel>,
    #[serde(default)]
    samplers: Vec<GltfSampler>,
}

#[derive(Debug, Deserialize)]
struct GltfChannel {
    target: GltfTarget,
}

#[derive(Debug, Deserialize)]
struct GltfTarget {
    path: String,
}

#[derive(Debug, Deserialize)]
struct GltfSampler {
    input: usize,
}

#[derive(Debug, Deserialize)]
struct GltfAccessor {
    #[serde(default)]
    max: Option<Vec<f64>>,
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

/// Locate the JSON chunk of a binary glTF container
pub fn json_chunk(bytes: &[u8]) -> Result<&[u8], GlbError> {
    if bytes.len() < HEADER_LEN + CHUNK_HEADER_LEN {
        return Err(GlbError::TooShort(bytes.len()));
    }

    let magic = read_u32(bytes, 0);
    if magic != GLB_MAGIC {
        return Err(GlbError::BadMagic(magic));
    }

    let version = read_u32(bytes, 4);
    if version != 2 {
        return Err(GlbError::UnsupportedVersion(version));
    }

    let declared = read_u32(bytes, 8) as usize;
    if declared > bytes.len() {
        return Err(GlbError::LengthMismatch {
            declared,
            actual: bytes.len(),
        });
    }

    let chunk_len = read_u32(bytes, HEADER_LEN) as usize;
    let chunk_type = read_u32(bytes, HEADER_LEN + 4);
    if chunk_type != CHUNK_JSON {
        return Err(GlbError::MissingJsonChunk);
    }

    let start = HEADER_LEN + CHUNK_HEADER_LEN;
    let end = start
        .checked_add(chunk_len)
        .filter(|end| *end <= declared)
        .ok_or(GlbError::LengthMismatch {
            declared: start.saturating_add(chunk_len),
            actual: declared,
        })?;

    Ok(&bytes[start..end])
}

/// List the animation clips in a `.glb` or JSON `.gltf` document
pub fn inspect(bytes: &[u8]) -> Result<Vec<AnimationClip>, GlbError> {
    let json = if bytes.first().is_some_and(|b| *b == b'{') {
        bytes
    } else {
        json_chunk(bytes)?
    };

    let doc: GltfDocument =
        serde_json::from_slice(json).map_err(|e| GlbError::Json(e.to_string()))?;

    doc.animations
        .iter()
        .enumerate()
        .map(|(i, anim)| clip_from(&doc, i, anim))
        .collect()
}

fn clip_from(
    doc: &GltfDocument,
    index: usize,
    anim: &GltfAnimation,
) -> Result<AnimationClip, GlbError> {
    let name = anim
        .name
        .clone()
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("animation_{}", index));

    // Clip length is the latest keyframe time across all samplers.
    let seconds = anim
        .samplers
        .iter()
        .filter_map(|s| doc.accessors.get(s.input))
        .filter_map(|a| a.max.as_ref().and_then(|m| m.first().copied()))
        .fold(0.0_f64, f64::max);

    let duration = Duration::try_from_secs_f64(seconds.max(0.0)).map_err(|_| {
        GlbError::BadDuration {
            clip: name.clone(),
            seconds,
        }
    })?;

    let morphs = anim.channels.iter().any(|c| c.target.path == "weights");
    let binding = if anim.channels.is_empty() || morphs {
        AnimationBinding::MeshBound
    } else {
        AnimationBinding::SharedRig
    };

    Ok(AnimationClip {
        name,
        duration,
        binding,
    })
}

/// Wrap a JSON document in a minimal GLB container (JSON chunk only)
pub fn encode_glb(json: &str) -> Vec<u8> {
    let mut chunk = json.as_bytes().to_vec();
    while chunk.len() % 4 != 0 {
        chunk.push(b' ');
    }

    let total = HEADER_LEN + CHUNK_HEADER_LEN + chunk.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC.to_le_bytes());
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&chunk);
    out
}
