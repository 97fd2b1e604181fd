use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::audio::decode::decode_audio;
use crate::audio::energy::{chunk_energies, chunk_len, scale_energies};
use crate::config::Settings;
use crate::encode::{FrameSink, Muxer, VideoEncoder};
use crate::error::{KittError, Result};
use crate::levels::map_counts;
use crate::render::frame::FrameRenderer;

/// Inputs and outputs of one run.
#[derive(Clone, Debug)]
pub struct Job {
    pub audio: PathBuf,
    pub background: PathBuf,
    pub silent_video: PathBuf,
    pub output: PathBuf,
    pub fps: u32,
}

/// Per-frame analysis results.
#[derive(Clone, Debug, Serialize)]
pub struct Levels {
    pub fps: u32,
    pub sample_rate: u32,
    pub chunk_len: usize,
    pub energies: Vec<f32>,
    pub counts: Vec<u32>,
}

/// Decode, analyse and map `audio` to one rectangle count per frame.
pub fn analyze(audio: &Path, fps: u32, settings: &Settings) -> Result<Levels> {
    let table = settings.registry.table(fps)?;

    let waveform = decode_audio(audio)?.normalize();
    let mut energies = chunk_energies(&waveform, fps);
    scale_energies(&mut energies, settings.scaling);
    let counts = map_counts(&energies, table, settings.max_rectangles);

    Ok(Levels {
        fps,
        sample_rate: waveform.sample_rate,
        chunk_len: chunk_len(waveform.sample_rate, fps),
        energies,
        counts,
    })
}

/// Render one frame per count, in order, into `sink`.
pub fn render_video(
    counts: &[u32],
    renderer: &FrameRenderer,
    mut sink: Box<dyn FrameSink>,
    progress: &ProgressBar,
) -> Result<()> {
    let expected = (renderer.width(), renderer.height());

    for (frame_idx, &count) in counts.iter().enumerate() {
        let frame = renderer.render(count);
        if frame.dimensions() != expected {
            return Err(KittError::RenderError(format!(
                "frame {} is {}x{}, background is {}x{}",
                frame_idx,
                frame.width(),
                frame.height(),
                expected.0,
                expected.1
            )));
        }
        sink.write_frame(&frame)?;
        progress.set_position(frame_idx as u64 + 1);
    }

    sink.finish()
}

/// Run the whole pipeline: analyse, render the silent video, then mux.
pub fn run(
    job: &Job,
    settings: &Settings,
    encoder: &dyn VideoEncoder,
    muxer: &dyn Muxer,
) -> Result<Levels> {
    // Fail on an uncalibrated rate before touching any file.
    settings.registry.table(job.fps)?;

    log::info!("Analyzing audio...");
    let levels = analyze(&job.audio, job.fps, settings)?;

    let renderer = FrameRenderer::open(&job.background, settings.layout.clone())?;

    let total_frames = levels.counts.len();
    log::info!(
        "Rendering {} frames ({:.2}s @ {}fps)",
        total_frames,
        total_frames as f32 / job.fps as f32,
        job.fps
    );

    for path in [&job.silent_video, &job.output] {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
    }

    let sink = encoder.open(&job.silent_video, renderer.width(), renderer.height(), job.fps)?;

    let pb = ProgressBar::new(total_frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-"),
    );
    render_video(&levels.counts, &renderer, sink, &pb)?;
    pb.finish_with_message("Rendering complete");

    log::info!("Merging video with audio...");
    muxer.mux(&job.silent_video, &job.audio, &job.output)?;

    log::info!("Done! Output: {}", job.output.display());
    Ok(levels)
}
