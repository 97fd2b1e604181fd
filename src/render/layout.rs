use serde::Deserialize;

/// Geometry and colour of the light bar. All distances are in pixels.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct BarLayout {
    pub rect_width: u32,
    pub rect_height: u32,
    /// Gap between stacked rectangles in a column.
    pub vertical_gap: u32,
    /// Distance between neighbouring column centres.
    pub column_spacing: u32,
    /// Downward shift of the bar from the image centre.
    pub vertical_offset: i32,
    pub base_red: u8,
    /// Added to the red channel per row away from the anchor row.
    pub red_step: u8,
}

impl Default for BarLayout {
    fn default() -> Self {
        Self {
            rect_width: 20,
            rect_height: 6,
            vertical_gap: 5,
            column_spacing: 40,
            vertical_offset: 150,
            base_red: 150,
            red_step: 10,
        }
    }
}

/// A filled rectangle; both corners are inclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rect {
    pub x0: i64,
    pub y0: i64,
    pub x1: i64,
    pub y1: i64,
    pub rgb: [u8; 3],
}

// Column offsets from the anchor and how many fewer rectangles each lights.
const COLUMNS: [(i64, u32); 5] = [(-2, 4), (-1, 2), (0, 0), (1, 2), (2, 4)];

impl BarLayout {
    /// Anchor of the centre column's middle rectangle.
    pub fn anchor(&self, width: u32, height: u32) -> (i64, i64) {
        let cx = (width as f64 / 2.0).round() as i64;
        let cy = (height as f64 / 2.0).round() as i64 + self.vertical_offset as i64;
        (cx, cy)
    }

    /// Every rectangle lit for `count`, laid out around the anchor.
    ///
    /// The centre column lights `count` rectangles and each step outwards
    /// lights two fewer. A column of `n` puts one rectangle on the anchor row
    /// and `(n - 1) / 2` above and below it.
    pub fn rects(&self, count: u32, width: u32, height: u32) -> Vec<Rect> {
        let (cx, cy) = self.anchor(width, height);
        let mut rects = Vec::new();

        for (offset, reduction) in COLUMNS {
            let n = count.saturating_sub(reduction);
            if n == 0 {
                continue;
            }
            let column_x = cx + offset * self.column_spacing as i64;
            rects.push(self.rect_at(column_x, cy, 0));

            let pitch = self.rect_height as i64 + self.vertical_gap as i64;
            for ring in 1..=(n - 1) / 2 {
                let dy = ring as i64 * pitch;
                rects.push(self.rect_at(column_x, cy + dy, ring));
                rects.push(self.rect_at(column_x, cy - dy, ring));
            }
        }

        rects
    }

    fn rect_at(&self, cx: i64, cy: i64, ring: u32) -> Rect {
        let half_w = self.rect_width as f64 / 2.0;
        let half_h = self.rect_height as f64 / 2.0;
        Rect {
            x0: (cx as f64 - half_w) as i64,
            y0: (cy as f64 - half_h) as i64,
            x1: (cx as f64 + half_w) as i64,
            y1: (cy as f64 + half_h) as i64,
            rgb: [self.red_for(ring), 0, 0],
        }
    }

    fn red_for(&self, ring: u32) -> u8 {
        let red = (self.red_step as u32)
            .saturating_mul(ring)
            .saturating_add(self.base_red as u32);
        red.min(u8::MAX as u32) as u8
    }
}
