use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};

use crate::audio::energy::EnergyScaling;
use crate::levels::{FrameRateRegistry, ThresholdStep, ThresholdTable, DEFAULT_MAX_RECTANGLES};
use crate::render::layout::BarLayout;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub layout: BarLayout,
    #[serde(default)]
    pub max_rectangles: Option<u32>,
    /// Extra or replacement threshold tables keyed by frame rate.
    #[serde(default)]
    pub thresholds: BTreeMap<String, Vec<ThresholdStep>>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_pix_fmt")]
    pub pix_fmt: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AudioConfig {
    #[serde(default)]
    pub scaling: EnergyScaling,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            fps: default_fps(),
            crf: default_crf(),
            codec: default_codec(),
            pix_fmt: default_pix_fmt(),
        }
    }
}

fn default_fps() -> u32 { 10 }
fn default_crf() -> u32 { 18 }
fn default_codec() -> String { "libx264".into() }
fn default_pix_fmt() -> String { "yuv420p".into() }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse config: {}", path.display()))
}

/// Immutable settings handed to the pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub registry: FrameRateRegistry,
    pub max_rectangles: u32,
    pub scaling: EnergyScaling,
    pub layout: BarLayout,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry: FrameRateRegistry::default(),
            max_rectangles: DEFAULT_MAX_RECTANGLES,
            scaling: EnergyScaling::default(),
            layout: BarLayout::default(),
        }
    }
}

impl Settings {
    /// Built-in defaults with the config file's overrides applied.
    pub fn from_config(config: &Config) -> Result<Self> {
        let mut registry = FrameRateRegistry::default();
        for (key, steps) in &config.thresholds {
            let fps: u32 = key
                .trim()
                .parse()
                .with_context(|| format!("Threshold table key '{}' is not a frame rate", key))?;
            if fps == 0 {
                anyhow::bail!("Threshold table key '{}' is not a frame rate", key);
            }
            let table = ThresholdTable::new(fps, steps.clone())?;
            log::debug!("Threshold table for {}fps overridden ({} steps)", fps, steps.len());
            registry.insert(fps, table);
        }

        Ok(Self {
            registry,
            max_rectangles: config.max_rectangles.unwrap_or(DEFAULT_MAX_RECTANGLES),
            scaling: config.audio.scaling,
            layout: config.layout.clone(),
        })
    }
}
