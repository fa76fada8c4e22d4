//! PCM helpers for synthesized audio.

use bytes::Bytes;
use std::io::Cursor;
use tracing::warn;

/// Return the raw little-endian PCM payload of `buffer`.
///
/// Some synthesizers wrap LINEAR16 output in a RIFF/WAVE container. The duplex
/// channel only accepts headerless PCM, so a WAV header is removed when present.
/// Buffers without a RIFF signature are returned untouched.
pub fn pcm_payload(buffer: Bytes) -> Bytes {
    if buffer.len() < 12 || &buffer[0..4] != b"RIFF" || &buffer[8..12] != b"WAVE" {
        return buffer;
    }

    let reader = match hound::WavReader::new(Cursor::new(buffer.clone())) {
        Ok(reader) => reader,
        Err(e) => {
            warn!("Audio looks like WAV but could not be parsed, sending as-is: {}", e);
            return buffer;
        }
    };

    let spec = reader.spec();
    if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
        warn!(
            bits = spec.bits_per_sample,
            "Unsupported WAV sample format, sending as-is"
        );
        return buffer;
    }

    let mut pcm = Vec::with_capacity(reader.len() as usize * 2);
    for sample in reader.into_samples::<i16>() {
        match sample {
            Ok(s) => pcm.extend_from_slice(&s.to_le_bytes()),
            Err(e) => {
                warn!("Truncated WAV payload: {}", e);
                break;
            }
        }
    }

    Bytes::from(pcm)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(samples: &[i16]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for s in samples {
                writer.write_sample(*s).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_strips_wav_header() {
        let samples = [0i16, 1, -1, 1000, i16::MAX, i16::MIN];
        let pcm = pcm_payload(Bytes::from(wav_bytes(&samples)));

        let expected: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        assert_eq!(pcm.to_vec(), expected);
    }

    #[test]
    fn test_raw_pcm_passes_through() {
        let raw = Bytes::from_static(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13]);
        assert_eq!(pcm_payload(raw.clone()), raw);
    }

    #[test]
    fn test_short_buffer_passes_through() {
        let raw = Bytes::from_static(b"RIFF");
        assert_eq!(pcm_payload(raw.clone()), raw);
    }
}
