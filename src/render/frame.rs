use std::path::Path;

use image::{Rgb, RgbImage};

use super::layout::{BarLayout, Rect};
use crate::error::{KittError, Result};

/// Draws the light bar over a fixed background.
pub struct FrameRenderer {
    background: RgbImage,
    layout: BarLayout,
}

impl FrameRenderer {
    pub fn new(background: RgbImage, layout: BarLayout) -> Result<Self> {
        if background.width() == 0 || background.height() == 0 {
            return Err(KittError::RenderError("background image is empty".into()));
        }
        Ok(Self { background, layout })
    }

    /// Load the background from any raster format the `image` crate reads.
    pub fn open(path: &Path, layout: BarLayout) -> Result<Self> {
        let background = image::open(path)
            .map_err(|e| {
                KittError::RenderError(format!(
                    "failed to load background image {}: {}",
                    path.display(),
                    e
                ))
            })?
            .to_rgb8();

        log::info!(
            "Loaded background {} ({}x{})",
            path.display(),
            background.width(),
            background.height()
        );

        Self::new(background, layout)
    }

    pub fn width(&self) -> u32 {
        self.background.width()
    }

    pub fn height(&self) -> u32 {
        self.background.height()
    }

    pub fn background(&self) -> &RgbImage {
        &self.background
    }

    /// A copy of the background with `count` rectangles lit.
    pub fn render(&self, count: u32) -> RgbImage {
        let mut frame = self.background.clone();
        for rect in self.layout.rects(count, frame.width(), frame.height()) {
            fill_rect(&mut frame, &rect);
        }
        frame
    }
}

/// Fill `rect` into `img`, clipped to the image bounds.
fn fill_rect(img: &mut RgbImage, rect: &Rect) {
    let max_x = img.width() as i64 - 1;
    let max_y = img.height() as i64 - 1;
    let x0 = rect.x0.max(0);
    let y0 = rect.y0.max(0);
    let x1 = rect.x1.min(max_x);
    let y1 = rect.y1.min(max_y);
    if x0 > x1 || y0 > y1 {
        return;
    }

    let color = Rgb(rect.rgb);
    for y in y0..=y1 {
        for x in x0..=x1 {
            img.put_pixel(x as u32, y as u32, color);
        }
    }
}
