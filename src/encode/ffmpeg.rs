use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use image::RgbImage;

use super::{FrameSink, Muxer, VideoEncoder};
use crate::error::{KittError, Result};

/// Video settings passed to `ffmpeg`.
#[derive(Clone, Debug)]
pub struct FfmpegEncoder {
    pub program: PathBuf,
    pub codec: String,
    pub pix_fmt: String,
    pub crf: u32,
}

impl FfmpegEncoder {
    pub fn new(codec: &str, pix_fmt: &str, crf: u32) -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            codec: codec.to_string(),
            pix_fmt: pix_fmt.to_string(),
            crf,
        }
    }

    fn args(&self, output_path: &Path, width: u32, height: u32, fps: u32) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-loglevel".into(), "error".into(),
            "-nostats".into(),
            "-f".into(), "rawvideo".into(),
            "-pixel_format".into(), "rgb24".into(),
            "-video_size".into(), format!("{}x{}", width, height).into(),
            "-framerate".into(), fps.to_string().into(),
            "-i".into(), "pipe:0".into(),
            "-an".into(),
            "-c:v".into(), self.codec.clone().into(),
            "-pix_fmt".into(), self.pix_fmt.clone().into(),
            "-crf".into(), self.crf.to_string().into(),
            "-r".into(), fps.to_string().into(),
            output_path.as_os_str().to_owned(),
        ]
    }
}

impl VideoEncoder for FfmpegEncoder {
    fn open(&self, path: &Path, width: u32, height: u32, fps: u32) -> Result<Box<dyn FrameSink>> {
        let mut child = Command::new(&self.program)
            .args(self.args(path, width, height, fps))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                KittError::RenderError(format!(
                    "failed to spawn {} (is ffmpeg installed?): {}",
                    self.program.display(),
                    e
                ))
            })?;

        // Drained on its own thread; a full stderr pipe would block ffmpeg
        // while we block on its stdin.
        let stdin = child.stdin.take();
        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut buf = Vec::new();
                let _ = pipe.read_to_end(&mut buf);
                buf
            })
        });

        log::info!(
            "FFmpeg encoder started: {}x{} @ {}fps, codec={} -> {}",
            width,
            height,
            fps,
            self.codec,
            path.display()
        );

        Ok(Box::new(FfmpegSink {
            child: Some(child),
            stdin,
            stderr,
            width,
            height,
        }))
    }
}

struct FfmpegSink {
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<Vec<u8>>>,
    width: u32,
    height: u32,
}

impl FfmpegSink {
    /// Close stdin, reap the child and collect everything it wrote to stderr.
    fn shutdown(&mut self) -> Result<Option<(ExitStatus, String)>> {
        drop(self.stdin.take());

        let Some(mut child) = self.child.take() else {
            return Ok(None);
        };
        let status = child
            .wait()
            .map_err(|e| KittError::RenderError(format!("failed to wait for ffmpeg: {}", e)))?;

        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .map(|buf| String::from_utf8_lossy(&buf).trim_end().to_string())
            .unwrap_or_default();

        Ok(Some((status, stderr)))
    }
}

impl FrameSink for FfmpegSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() != (self.width, self.height) {
            return Err(KittError::RenderError(format!(
                "frame is {}x{}, encoder expects {}x{}",
                frame.width(),
                frame.height(),
                self.width,
                self.height
            )));
        }

        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| KittError::RenderError("ffmpeg stdin not available".into()))?;

        if let Err(write_err) = stdin.write_all(frame.as_raw()) {
            // ffmpeg usually died; its exit status and stderr say why.
            return Err(match self.shutdown()? {
                Some((status, stderr)) if !stderr.is_empty() => KittError::RenderError(format!(
                    "ffmpeg exited with {} while receiving frames:\n{}",
                    status, stderr
                )),
                Some((status, _)) => KittError::RenderError(format!(
                    "failed to write frame to ffmpeg ({}): {}",
                    status, write_err
                )),
                None => KittError::RenderError(format!(
                    "failed to write frame to ffmpeg: {}",
                    write_err
                )),
            });
        }

        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        match self.shutdown()? {
            Some((status, stderr)) if !status.success() => {
                Err(KittError::RenderError(format!("ffmpeg exited with {}:\n{}", status, stderr)))
            }
            Some(_) => {
                log::info!("FFmpeg encoding complete");
                Ok(())
            }
            None => Err(KittError::RenderError("ffmpeg already exited".into())),
        }
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Ok(Some((status, stderr))) = self.shutdown() {
                log::debug!("FFmpeg encoder abandoned ({}): {}", status, stderr);
            }
        }
    }
}

/// Muxes by copying the video stream and encoding the audio as AAC.
#[derive(Clone, Debug)]
pub struct FfmpegMuxer {
    pub program: PathBuf,
    pub audio_bitrate: String,
}

impl Default for FfmpegMuxer {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
            audio_bitrate: "128k".into(),
        }
    }
}

impl FfmpegMuxer {
    fn args(&self, video: &Path, audio: &Path, output: &Path) -> Vec<OsString> {
        vec![
            "-y".into(),
            "-loglevel".into(), "error".into(),
            "-nostats".into(),
            "-i".into(), video.as_os_str().to_owned(),
            "-i".into(), audio.as_os_str().to_owned(),
            "-map".into(), "0:v:0".into(),
            "-map".into(), "1:a:0".into(),
            "-shortest".into(),
            "-c:v".into(), "copy".into(),
            "-c:a".into(), "aac".into(),
            "-b:a".into(), self.audio_bitrate.clone().into(),
            output.as_os_str().to_owned(),
        ]
    }
}

impl Muxer for FfmpegMuxer {
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        check_input_exists(video, "video")?;
        check_input_exists(audio, "audio")?;

        log::info!("Muxing {} + {} -> {}", video.display(), audio.display(), output.display());

        let result = Command::new(&self.program)
            .args(self.args(video, audio, output))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .map_err(|e| {
                KittError::MuxError(format!(
                    "failed to spawn {} (is ffmpeg installed?): {}",
                    self.program.display(),
                    e
                ))
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(KittError::MuxError(format!(
                "ffmpeg exited with {}:\n{}",
                result.status, stderr
            )));
        }

        if !output.exists() {
            return Err(KittError::MuxError(format!(
                "ffmpeg reported success but {} was not written",
                output.display()
            )));
        }

        Ok(())
    }
}

fn check_input_exists(path: &Path, what: &str) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(KittError::MuxError(format!("{} input not found: {}", what, path.display())))
    }
}
