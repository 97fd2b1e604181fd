/// Mono sample sequence with its sample rate.
#[derive(Clone, Debug, PartialEq)]
pub struct Waveform {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn mean(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        // Accumulate in f64; long podcasts lose precision in an f32 sum.
        let sum: f64 = self.samples.iter().map(|&s| s as f64).sum();
        (sum / self.samples.len() as f64) as f32
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max)
    }

    /// Remove the DC offset, then scale so the peak absolute sample is 1.0.
    ///
    /// A silent waveform is left as-is.
    pub fn normalize(mut self) -> Self {
        let mean = self.mean();
        if mean != 0.0 {
            for s in &mut self.samples {
                *s -= mean;
            }
        }

        let peak = self.peak();
        if peak > 0.0 {
            let gain = 1.0 / peak;
            for s in &mut self.samples {
                *s = (*s * gain).clamp(-1.0, 1.0);
            }
        } else {
            log::warn!("Audio is silent; skipping amplitude normalization");
        }

        log::debug!("Normalized waveform: removed DC offset {:.6}, peak {:.6}", mean, peak);
        self
    }
}
