mod audio;
mod cli;
mod config;
mod encode;
mod error;
mod levels;
mod pipeline;
mod render;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use cli::Cli;
use config::{Config, Settings};
use encode::ffmpeg::{FfmpegEncoder, FfmpegMuxer};
use pipeline::Job;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    let config = load_config(&cli)?;
    let settings = Settings::from_config(&config)?;

    if cli.list_frame_rates {
        println!("Calibrated frame rates:");
        for (fps, table) in settings.registry.iter() {
            let steps: Vec<String> = table
                .steps()
                .iter()
                .map(|s| format!("{}->{}", s.energy, s.rectangles))
                .collect();
            println!("  {:>3} fps  (max {})  {}", fps, table.max_count(), steps.join(" "));
        }
        return Ok(());
    }

    let audio = cli.audio.clone().context("Input audio file is required")?;
    let background = cli.background.clone().context("Background image is required")?;
    if !audio.exists() {
        anyhow::bail!("Input file not found: {}", audio.display());
    }

    let fps = cli.fps.unwrap_or(config.output.fps);
    let silent_video = cli
        .silent_video
        .clone()
        .unwrap_or_else(|| cli::default_silent_path(&cli.output));

    let job = Job {
        audio,
        background,
        silent_video,
        output: cli.output.clone(),
        fps,
    };

    log::info!("kitt - light-bar podcast visualizer");
    log::info!("Audio: {}", job.audio.display());
    log::info!("Background: {}", job.background.display());
    log::info!("Output: {} (silent: {})", job.output.display(), job.silent_video.display());
    log::info!("Frame rate: {}fps, scaling: {:?}", fps, settings.scaling);

    let encoder = FfmpegEncoder::new(
        cli.codec.as_deref().unwrap_or(&config.output.codec),
        cli.pix_fmt.as_deref().unwrap_or(&config.output.pix_fmt),
        cli.crf.unwrap_or(config.output.crf),
    );
    let muxer = FfmpegMuxer::default();

    let levels = pipeline::run(&job, &settings, &encoder, &muxer)
        .with_context(|| format!("Failed to visualize {}", job.audio.display()))?;

    if let Some(ref path) = cli.levels {
        let json = serde_json::to_string_pretty(&levels)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write levels: {}", path.display()))?;
        log::info!("Wrote per-frame levels to {}", path.display());
    }

    Ok(())
}

/// Explicit `--config`, else `kitt.toml` in the working directory, else the
/// user config directory. Only an explicit path is required to parse.
fn load_config(cli: &Cli) -> Result<Config> {
    if let Some(ref path) = cli.config {
        let cfg = config::load_config(path)?;
        log::info!("Loaded config from {}", path.display());
        return Ok(cfg);
    }

    let discovered = discover_config_path();
    if let Some(path) = discovered {
        match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                return Ok(cfg);
            }
            Err(err) => log::warn!("Ignoring config {}: {:#}", path.display(), err),
        }
    }

    Ok(Config::default())
}

fn discover_config_path() -> Option<PathBuf> {
    let local = PathBuf::from("kitt.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("kitt").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("kitt").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
