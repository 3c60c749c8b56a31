//! WAV encode/decode
//!
//! Used by the export sink (mix-down recording, spec §6's
//! `StartMixRecord`/`StopMixRecord`) and by offline tooling that wants to
//! seed a track's loop buffer from a file on disk. [`encode_wav`] is the
//! preferred export path: a canonical 16-bit PCM RIFF container, built
//! via `hound`. [`decode`] goes through `symphonia` so compressed or
//! odd-format captures still load, not just canonical PCM WAV.

use std::io::Cursor;

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::core::buffer::AudioBuffer;
use crate::error::LoopEngineError;

/// Encode `buffer` as a canonical 16-bit PCM little-endian WAV file:
/// `RIFF|size|WAVE|fmt |16|1|channels|rate|byterate|blockalign|16|data|size`,
/// interleaved samples (spec §6's preferred export format).
pub fn encode_wav(buffer: &AudioBuffer) -> Result<Vec<u8>, LoopEngineError> {
    let spec = hound::WavSpec {
        channels: buffer.channels().max(1) as u16,
        sample_rate: buffer.sample_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer =
            hound::WavWriter::new(&mut cursor, spec).map_err(|e| LoopEngineError::Audio(e.to_string()))?;
        for frame in 0..buffer.len() {
            for channel in buffer.samples() {
                let clamped = channel[frame].clamp(-1.0, 1.0);
                let sample = (clamped * i16::MAX as f32).round() as i16;
                writer
                    .write_sample(sample)
                    .map_err(|e| LoopEngineError::Audio(e.to_string()))?;
            }
        }
        writer.finalize().map_err(|e| LoopEngineError::Audio(e.to_string()))?;
    }
    Ok(cursor.into_inner())
}

/// Decode arbitrary WAV (or other symphonia-supported container) bytes
/// into an [`AudioBuffer`]. Used by the Recorder's "decoded output" path
/// (spec §4.2) and by offline tooling loading a file from disk.
pub fn decode(bytes: &[u8]) -> Result<AudioBuffer, LoopEngineError> {
    let cursor = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut probed = symphonia::default::get_probe()
        .format(&Hint::new(), mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| LoopEngineError::DecodeError(e.to_string()))?;

    let track = probed
        .format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| LoopEngineError::DecodeError("no decodable track found".into()))?;
    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);

    let decoder_opts = symphonia::core::codecs::DecoderOptions::default();
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &decoder_opts)
        .map_err(|e| LoopEngineError::DecodeError(e.to_string()))?;

    let mut channels: Vec<Vec<f32>> = Vec::new();

    loop {
        let packet = match probed.format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(_)) => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(LoopEngineError::DecodeError(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::IoError(_)) | Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(LoopEngineError::DecodeError(e.to_string())),
        };

        let spec = *decoded.spec();
        if channels.is_empty() {
            channels = vec![Vec::new(); spec.channels.count().max(1)];
        }

        match decoded {
            AudioBufferRef::F32(buf) => {
                for (c, out) in channels.iter_mut().enumerate() {
                    out.extend_from_slice(buf.chan(c));
                }
            }
            other => {
                let mut owned = other.make_equivalent::<f32>();
                other.convert(&mut owned);
                for (c, out) in channels.iter_mut().enumerate() {
                    out.extend_from_slice(owned.chan(c));
                }
            }
        }
    }

    if channels.is_empty() {
        return Err(LoopEngineError::DecodeError("no audio frames decoded".into()));
    }

    AudioBuffer::from_data(channels, sample_rate)
}

/// Decode a file from disk; convenience wrapper over [`decode`] for
/// offline tooling that wants to seed a track's loop buffer from a WAV
/// file rather than a live capture.
pub fn decode_file(path: impl AsRef<std::path::Path>) -> Result<AudioBuffer, LoopEngineError> {
    let bytes = std::fs::read(path).map_err(|e| LoopEngineError::DecodeError(e.to_string()))?;
    decode(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_buffer(sample_rate: u32, frames: usize) -> AudioBuffer {
        let data: Vec<f32> = (0..frames)
            .map(|i| (i as f32 * 440.0 * std::f32::consts::TAU / sample_rate as f32).sin() * 0.4)
            .collect();
        AudioBuffer::from_data(vec![data.clone(), data], sample_rate).unwrap()
    }

    #[test]
    fn encode_then_decode_round_trips_frame_count() {
        let buffer = sine_buffer(44_100, 2048);
        let bytes = encode_wav(&buffer).unwrap();
        let read_back = decode(&bytes).unwrap();

        assert_eq!(read_back.len(), buffer.len());
        assert_eq!(read_back.channels(), buffer.channels());
        assert_eq!(read_back.sample_rate(), 44_100);
    }

    #[test]
    fn encoded_wav_carries_canonical_riff_header() {
        let buffer = sine_buffer(44_100, 16);
        let bytes = encode_wav(&buffer).unwrap();

        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");
        assert_eq!(&bytes[12..16], b"fmt ");
        assert_eq!(u16::from_le_bytes([bytes[20], bytes[21]]), 1); // PCM format tag
        assert_eq!(u16::from_le_bytes([bytes[22], bytes[23]]), 2); // channels
        assert_eq!(u32::from_le_bytes([bytes[24], bytes[25], bytes[26], bytes[27]]), 44_100);
        assert_eq!(u16::from_le_bytes([bytes[34], bytes[35]]), 16); // bits per sample
        assert_eq!(&bytes[36..40], b"data");
    }

    #[test]
    fn decoding_garbage_is_a_decode_error() {
        let result = decode(b"not a wav file");
        assert!(matches!(result, Err(LoopEngineError::DecodeError(_))));
    }

    #[test]
    fn missing_file_is_a_decode_error() {
        let result = decode_file("/nonexistent/path/loop_engine_missing.wav");
        assert!(matches!(result, Err(LoopEngineError::DecodeError(_))));
    }
}
