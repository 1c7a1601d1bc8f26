use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use clap_complete::Shell;

use crate::config::LensConfig;
use crate::error::Result;
use crate::explorer::ViewMode;
use crate::render::SvgLayout;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Colored terminal output.
    #[default]
    Text,
    /// Timeline and tree as pretty JSON.
    Json,
    /// Timeline as an SVG document.
    Svg,
}

#[derive(Parser, Debug)]
#[command(name = "thought-lens")]
#[command(version)]
#[command(about = "Turn model reasoning text into a timeline and a thought tree")]
pub struct Args {
    /// File holding the reasoning text (reads stdin when omitted or `-`)
    pub input: Option<PathBuf>,

    /// Which view to print
    #[arg(long, value_enum, default_value = "timeline")]
    pub view: ViewMode,

    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Seed for paragraph-fallback strength scores
    #[arg(long)]
    pub seed: Option<u64>,

    /// TOML configuration file
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Synthesize the input as speech
    #[arg(long)]
    pub speak: bool,

    /// Where to write synthesized audio
    #[arg(long, default_value = "speech.mp3")]
    pub audio_out: PathBuf,

    /// Text-to-speech endpoint (overrides the config file)
    #[arg(long)]
    pub tts_url: Option<String>,

    /// Serve the local web view instead of printing
    #[arg(long)]
    pub web: bool,

    /// Port for the web view
    #[arg(long, default_value = "8888")]
    pub port: u16,

    /// Print shell completions and exit
    #[arg(long, value_enum)]
    pub completions: Option<Shell>,
}

impl Args {
    /// Load the config file (or defaults) and apply flag overrides.
    pub fn resolve_config(&self) -> Result<LensConfig> {
        let base = match &self.config {
            Some(path) => LensConfig::load(path)?,
            None => LensConfig::default(),
        };
        Ok(self.apply_overrides(base))
    }

    pub fn apply_overrides(&self, mut config: LensConfig) -> LensConfig {
        if let Some(seed) = self.seed {
            config.timeline.seed = Some(seed);
        }
        if let Some(url) = &self.tts_url {
            config.voice.tts_url = url.clone();
        }
        config
    }

    /// The graph view draws in perspective; everything else is flat.
    pub fn svg_layout(&self) -> SvgLayout {
        match self.view {
            ViewMode::Graph => SvgLayout::Perspective,
            _ => SvgLayout::Flat,
        }
    }

    pub fn reads_stdin(&self) -> bool {
        self.input.as_ref().map_or(true, |p| p.as_os_str() == "-")
    }
}
