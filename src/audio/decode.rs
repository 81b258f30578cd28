use std::io::Cursor;
use std::path::Path;
use symphonia::core::audio::SampleBuffer as InterleavedBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::features::SampleBuffer;
use crate::error::DecodeError;

/// Decode an in-memory file, keeping only the first channel.
pub fn decode_bytes(bytes: &[u8]) -> Result<SampleBuffer, DecodeError> {
    decode_with_hint(bytes.to_vec(), Hint::new())
}

pub fn decode_file(path: &Path) -> Result<SampleBuffer, DecodeError> {
    let bytes = std::fs::read(path)?;

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    decode_with_hint(bytes, hint)
}

fn decode_with_hint(bytes: Vec<u8>, hint: Hint) -> Result<SampleBuffer, DecodeError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoTrack)?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or(DecodeError::UnknownSampleRate)?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())?;

    let mut first_channel: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(SymphoniaError::DecodeError(reason)) => {
                log::debug!("Skipping corrupt packet: {}", reason);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *decoded.spec();
        let channels = spec.channels.count().max(1);
        let num_frames = decoded.frames();

        let mut sample_buf = InterleavedBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        first_channel.extend(sample_buf.samples().iter().step_by(channels).copied());
    }

    if first_channel.is_empty() {
        return Err(DecodeError::NoSamples);
    }

    log::info!(
        "Decoded audio: {} samples, {}Hz, {:.2}s",
        first_channel.len(),
        sample_rate,
        first_channel.len() as f64 / sample_rate as f64
    );

    // Only a zero rate can fail here
    SampleBuffer::new(first_channel, sample_rate).map_err(|_| DecodeError::UnknownSampleRate)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use hound::{SampleFormat, WavSpec, WavWriter};

    /// Encode 16-bit PCM frames (one inner slice per frame) as an in-memory WAV file.
    pub(crate) fn wav_bytes(frames: &[Vec<i16>], sample_rate: u32) -> Vec<u8> {
        let spec = WavSpec {
            channels: frames.first().map_or(1, |f| f.len() as u16),
            sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
            for frame in frames {
                for &s in frame {
                    writer.write_sample(s).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_mono_wav() {
        let frames: Vec<Vec<i16>> = (0..4410).map(|_| vec![16384]).collect();
        let buf = decode_bytes(&wav_bytes(&frames, 44100)).unwrap();

        assert_eq!(buf.sample_rate(), 44100);
        assert_eq!(buf.len(), 4410);
        assert!((buf.duration_secs() - 0.1).abs() < 1e-9);
        assert!(buf.samples().iter().all(|&s| (s - 0.5).abs() < 1e-4));
    }

    #[test]
    fn keeps_only_first_channel() {
        let frames: Vec<Vec<i16>> = (0..2048).map(|_| vec![16384, -16384]).collect();
        let buf = decode_bytes(&wav_bytes(&frames, 48000)).unwrap();

        assert_eq!(buf.len(), 2048);
        assert!(buf.samples().iter().all(|&s| s > 0.49));
    }

    #[test]
    fn rejects_garbage() {
        let err = decode_bytes(b"definitely not an audio container").unwrap_err();
        assert!(matches!(err, DecodeError::Format(_)));
    }

    #[test]
    fn rejects_stream_without_samples() {
        let err = decode_bytes(&wav_bytes(&[], 44100)).unwrap_err();
        assert!(matches!(err, DecodeError::NoSamples | DecodeError::Format(_)));
    }

    #[test]
    fn decode_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let frames: Vec<Vec<i16>> = (0..1000).map(|i| vec![if i % 2 == 0 { 1000 } else { -1000 }]).collect();
        std::fs::write(&path, wav_bytes(&frames, 22050)).unwrap();

        let buf = decode_file(&path).unwrap();
        assert_eq!(buf.len(), 1000);
        assert_eq!(buf.sample_rate(), 22050);
    }

    #[test]
    fn decode_file_missing_is_io_error() {
        let err = decode_file(Path::new("/nonexistent/beatbuddy/track.wav")).unwrap_err();
        assert!(matches!(err, DecodeError::Io(_)));
    }
}
