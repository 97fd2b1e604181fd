use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::waveform::Waveform;
use crate::error::{KittError, Result};

/// Decode an audio file into a mono waveform.
///
/// Multi-channel audio is downmixed by averaging each interleaved frame.
/// The returned waveform is not normalized.
pub fn decode_audio(path: &Path) -> Result<Waveform> {
    let unreadable = |reason: &dyn ToString| KittError::unreadable_audio(path, reason.to_string());

    let file = std::fs::File::open(path).map_err(|e| unreadable(&e))?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| unreadable(&format!("failed to probe audio format: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| unreadable(&"no audio tracks found"))?;

    let track_id = track.id;
    let channels = track.codec_params.channels.map_or(1, |c| c.count()).max(1);
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| unreadable(&"unknown sample rate"))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| unreadable(&format!("failed to create decoder: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(ref e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(unreadable(&e)),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(symphonia::core::errors::Error::DecodeError(msg)) => {
                log::debug!("Skipping corrupt packet: {}", msg);
                continue;
            }
            Err(e) => return Err(unreadable(&e)),
        };

        let spec = *decoded.spec();
        let mut sample_buf = SampleBuffer::<f32>::new(decoded.frames() as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        let interleaved = sample_buf.samples();

        // Downmix to mono
        if channels == 1 {
            samples.extend_from_slice(interleaved);
        } else {
            samples.extend(
                interleaved
                    .chunks(channels)
                    .map(|frame| frame.iter().sum::<f32>() / channels as f32),
            );
        }
    }

    if samples.is_empty() {
        return Err(unreadable(&"no samples decoded"));
    }

    let waveform = Waveform::new(samples, sample_rate);

    log::info!(
        "Decoded audio: {} samples, {}Hz, {} channel(s), {:.2}s",
        waveform.samples.len(),
        sample_rate,
        channels,
        waveform.duration()
    );

    Ok(waveform)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_wav(path: &Path, channels: u16, sample_rate: u32, frames: &[Vec<i16>]) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for frame in frames {
            for &s in frame {
                writer.write_sample(s).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn decodes_mono_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mono.wav");
        let frames: Vec<Vec<i16>> = (0..8000).map(|i| vec![(i % 100) as i16 * 100]).collect();
        write_wav(&path, 1, 8000, &frames);

        let waveform = decode_audio(&path).unwrap();
        assert_eq!(waveform.sample_rate, 8000);
        assert_eq!(waveform.samples.len(), 8000);
        assert!((waveform.duration() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn downmixes_stereo_to_mono() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        let frames: Vec<Vec<i16>> = (0..4000).map(|_| vec![16384, -16384]).collect();
        write_wav(&path, 2, 16000, &frames);

        let waveform = decode_audio(&path).unwrap();
        assert_eq!(waveform.sample_rate, 16000);
        assert_eq!(waveform.samples.len(), 4000);
        assert!(waveform.samples.iter().all(|s| s.abs() < 1e-4));
    }

    #[test]
    fn missing_file_is_unreadable() {
        let err = decode_audio(Path::new("/nonexistent/podcast.mp3")).unwrap_err();
        match err {
            KittError::UnreadableAudio { path, .. } => {
                assert_eq!(path, Path::new("/nonexistent/podcast.mp3"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn garbage_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noise.wav");
        std::fs::write(&path, b"definitely not a riff header").unwrap();

        assert!(matches!(
            decode_audio(&path),
            Err(KittError::UnreadableAudio { .. })
        ));
    }
}
