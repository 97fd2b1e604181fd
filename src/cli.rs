use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "kitt", about = "Scanning light-bar visualizer for podcast audio")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    #[arg(required_unless_present = "list_frame_rates")]
    pub audio: Option<PathBuf>,

    /// Background image; sets the video resolution
    #[arg(required_unless_present = "list_frame_rates")]
    pub background: Option<PathBuf>,

    /// Final video with audio
    #[arg(short, long, default_value = "final.mp4")]
    pub output: PathBuf,

    /// Intermediate video without audio [default: <output>.silent.<ext>]
    #[arg(long)]
    pub silent_video: Option<PathBuf>,

    /// Frames per second; must have a threshold table
    #[arg(long)]
    pub fps: Option<u32>,

    /// Config file (defaults to ./kitt.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Write per-frame energies and rectangle counts as JSON
    #[arg(long)]
    pub levels: Option<PathBuf>,

    /// FFmpeg video codec
    #[arg(long)]
    pub codec: Option<String>,

    /// FFmpeg pixel format
    #[arg(long)]
    pub pix_fmt: Option<String>,

    /// H.264 CRF quality (0-51, lower = better)
    #[arg(long)]
    pub crf: Option<u32>,

    /// List calibrated frame rates and their thresholds, then exit
    #[arg(long)]
    pub list_frame_rates: bool,
}

/// `final.mp4` -> `final.silent.mp4`, next to the output.
pub fn default_silent_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".into());
    let ext = output
        .extension()
        .map(|e| e.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mp4".into());
    output.with_file_name(format!("{}.silent.{}", stem, ext))
}
