use serde::Deserialize;

use super::waveform::Waveform;

/// How per-chunk energies are scaled before they reach the threshold ladder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyScaling {
    /// Use mean absolute amplitude as-is.
    Raw,
    /// Divide by the loudest chunk so the loudest frame reaches 1.0.
    #[default]
    Peak,
}

/// Number of samples covering one video frame.
pub fn chunk_len(sample_rate: u32, fps: u32) -> usize {
    let len = (sample_rate as f64 / fps.max(1) as f64).round() as usize;
    len.max(1)
}

/// Split samples into consecutive frame-sized chunks.
///
/// The last chunk keeps whatever samples remain, so every sample belongs to
/// exactly one chunk and the chunk count is `ceil(len / chunk_len)`.
pub fn chunks(waveform: &Waveform, fps: u32) -> std::slice::Chunks<'_, f32> {
    waveform.samples.chunks(chunk_len(waveform.sample_rate, fps))
}

/// Mean absolute amplitude of each chunk, in temporal order.
pub fn chunk_energies(waveform: &Waveform, fps: u32) -> Vec<f32> {
    let energies: Vec<f32> = chunks(waveform, fps).map(mean_abs).collect();

    log::info!(
        "Computed {} chunk energies ({} samples per chunk @ {}fps)",
        energies.len(),
        chunk_len(waveform.sample_rate, fps),
        fps
    );

    energies
}

fn mean_abs(chunk: &[f32]) -> f32 {
    if chunk.is_empty() {
        return 0.0;
    }
    chunk.iter().map(|s| s.abs()).sum::<f32>() / chunk.len() as f32
}

/// Apply the configured scaling in place.
pub fn scale_energies(energies: &mut [f32], scaling: EnergyScaling) {
    match scaling {
        EnergyScaling::Raw => {}
        EnergyScaling::Peak => {
            let peak = energies.iter().copied().fold(0.0f32, f32::max);
            if peak > 0.0 {
                for e in energies.iter_mut() {
                    *e = (*e / peak).min(1.0);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize, sample_rate: u32) -> Waveform {
        let samples = (0..len).map(|i| (i as f32 / len as f32) * 2.0 - 1.0).collect();
        Waveform::new(samples, sample_rate)
    }

    #[test]
    fn chunk_len_rounds_to_nearest_sample() {
        assert_eq!(chunk_len(44100, 10), 4410);
        assert_eq!(chunk_len(44100, 15), 2940);
        assert_eq!(chunk_len(22050, 15), 1470);
        // 8000 / 15 = 533.33
        assert_eq!(chunk_len(8000, 15), 533);
        // 16000 / 15 = 1066.67
        assert_eq!(chunk_len(16000, 15), 1067);
        assert_eq!(chunk_len(5, 10), 1);
    }

    #[test]
    fn chunk_count_is_ceiling() {
        let cases = [
            (44100, 44100, 10),
            (44101, 44100, 10),
            (1000, 8000, 15),
            (1, 8000, 10),
        ];
        for &(len, rate, fps) in &cases {
            let waveform = ramp(len, rate);
            let expected = len.div_ceil(chunk_len(rate, fps));
            assert_eq!(chunks(&waveform, fps).count(), expected);
            assert_eq!(chunk_energies(&waveform, fps).len(), expected);
        }
    }

    #[test]
    fn chunks_reconstruct_samples() {
        let waveform = ramp(10_007, 8000);
        let rebuilt: Vec<f32> = chunks(&waveform, 15).flatten().copied().collect();
        assert_eq!(rebuilt, waveform.samples);
    }

    #[test]
    fn short_final_chunk_uses_remaining_samples() {
        // 8000 Hz at 10 fps -> 800-sample chunks; 850 samples leave 50.
        let mut samples = vec![0.0; 800];
        samples.extend(std::iter::repeat(0.5).take(50));
        let energies = chunk_energies(&Waveform::new(samples, 8000), 10);
        assert_eq!(energies.len(), 2);
        assert_eq!(energies[0], 0.0);
        assert!((energies[1] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn energy_is_mean_absolute_amplitude() {
        let samples = vec![0.5, -0.5, 1.0, -1.0];
        let energies = chunk_energies(&Waveform::new(samples, 40), 10);
        assert_eq!(energies, vec![0.75]);
    }

    #[test]
    fn silent_audio_has_zero_energy() {
        let mut energies = chunk_energies(&Waveform::new(vec![0.0; 16000], 8000), 10);
        scale_energies(&mut energies, EnergyScaling::Peak);
        assert_eq!(energies.len(), 20);
        assert!(energies.iter().all(|&e| e == 0.0));
    }

    #[test]
    fn energies_are_non_negative_and_bounded() {
        let waveform = ramp(12_345, 44100);
        let energies = chunk_energies(&waveform, 15);
        assert!(energies.iter().all(|&e| (0.0..=1.0).contains(&e)));
    }

    #[test]
    fn peak_scaling_preserves_order() {
        let mut energies = vec![0.1, 0.4, 0.2, 0.0];
        scale_energies(&mut energies, EnergyScaling::Peak);
        assert_eq!(energies, vec![0.25, 1.0, 0.5, 0.0]);
    }

    #[test]
    fn raw_scaling_is_identity() {
        let mut energies = vec![0.1, 0.4];
        scale_energies(&mut energies, EnergyScaling::Raw);
        assert_eq!(energies, vec![0.1, 0.4]);
    }
}
