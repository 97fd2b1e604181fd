pub mod ffmpeg;

use std::path::Path;

use image::RgbImage;

use crate::error::Result;

/// Opens a sink that encodes frames into a video container.
pub trait VideoEncoder {
    fn open(&self, path: &Path, width: u32, height: u32, fps: u32) -> Result<Box<dyn FrameSink>>;
}

/// Receives frames in presentation order.
pub trait FrameSink {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()>;

    /// Flush and close the container.
    fn finish(self: Box<Self>) -> Result<()>;
}

/// Combines a silent video with an audio track into one output file.
pub trait Muxer {
    fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;
}
