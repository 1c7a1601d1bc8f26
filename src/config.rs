//! TOML configuration for parsing, the explorer and the voice client.
//!
//! Every section is optional; absent keys fall back to [`Default`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Radius of the layout circle.
    pub radius: f64,
    /// Labels longer than this are cut and suffixed with `...`.
    pub label_max: usize,
    /// Prefix length used when a paragraph has no sentence boundary.
    pub fallback_label_chars: usize,
    /// Upper bound on keyword-overlap links added in the paragraph path.
    pub max_overlap_edges: usize,
    /// Seed for paragraph-path strength. `None` draws from the thread RNG.
    pub seed: Option<u64>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        TimelineConfig {
            radius: 150.0,
            label_max: 70,
            fallback_label_chars: 40,
            max_overlap_edges: 256,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Characters of code kept in a `[Code snippet: ...]` summary.
    pub code_summary_chars: usize,
    /// Unmarked paragraphs shorter than this start a new section.
    pub short_paragraph_chars: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        TreeConfig { code_summary_chars: 50, short_paragraph_chars: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub debounce_ms: u64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        ExplorerConfig { debounce_ms: 100 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Endpoint accepting `{"text": ...}` and answering with audio bytes.
    pub tts_url: String,
    /// BCP-47 tag handed to the recognizer.
    pub language: String,
    pub request_timeout_secs: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        VoiceConfig {
            tts_url: "http://localhost:3000/api/text-to-speech".to_string(),
            language: "en-US".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_input_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig { max_input_bytes: 1024 * 1024 }
    }
}

// ---------------------------------------------------------------------------
// LensConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LensConfig {
    pub timeline: TimelineConfig,
    pub tree: TreeConfig,
    pub explorer: ExplorerConfig,
    pub voice: VoiceConfig,
    pub limits: LimitsConfig,
}

impl LensConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load from `path`. A missing file is an error; use
    /// [`LensConfig::default`] when no path was given.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let cfg = Self::from_toml_str(&raw)?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(cfg)
    }
}
