use std::io::Cursor;

use rubato::{FftFixedIn, Resampler};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::FromSample;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::ProcessError;

/// Decoded audio, downmixed to mono f32 in [-1.0, 1.0].
#[derive(Debug)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    /// Channel count of the source stream, before downmix.
    pub channels: usize,
    pub duration_seconds: f64,
}

macro_rules! downmix {
    ($buf:expr) => {{
        let channels = $buf.spec().channels.count();
        let frames = $buf.frames();
        let mut mono = Vec::with_capacity(frames);
        for frame in 0..frames {
            let mut sum = 0.0f32;
            for ch in 0..channels {
                sum += f32::from_sample($buf.chan(ch)[frame]);
            }
            mono.push(sum / channels as f32);
        }
        mono
    }};
}

fn to_mono_f32(decoded: &AudioBufferRef) -> Vec<f32> {
    match decoded {
        AudioBufferRef::U8(buf) => downmix!(buf),
        AudioBufferRef::U16(buf) => downmix!(buf),
        AudioBufferRef::U24(buf) => downmix!(buf),
        AudioBufferRef::U32(buf) => downmix!(buf),
        AudioBufferRef::S8(buf) => downmix!(buf),
        AudioBufferRef::S16(buf) => downmix!(buf),
        AudioBufferRef::S24(buf) => downmix!(buf),
        AudioBufferRef::S32(buf) => downmix!(buf),
        AudioBufferRef::F32(buf) => downmix!(buf),
        AudioBufferRef::F64(buf) => downmix!(buf),
    }
}

/// Decode an in-memory audio stream to mono f32 PCM. Format detection is
/// probe-based; `extension` is only a hint.
pub fn decode_audio(data: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio, ProcessError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(data)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| ProcessError::Decode(format!("unrecognized audio stream: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| ProcessError::Decode("no audio track found".to_string()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| ProcessError::Decode("sample rate unknown".to_string()))?;
    let channels = track
        .codec_params
        .channels
        .ok_or_else(|| ProcessError::Decode("channel layout unknown".to_string()))?
        .count();

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| ProcessError::Decode(format!("unsupported codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(ProcessError::Decode(format!("error reading packet: {}", e))),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|e| ProcessError::Decode(format!("failed to decode packet: {}", e)))?;
        samples.extend(to_mono_f32(&decoded));
    }

    if samples.is_empty() {
        return Err(ProcessError::Decode("stream contains no audio frames".to_string()));
    }

    let duration_seconds = samples.len() as f64 / sample_rate as f64;

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
        duration_seconds,
    })
}

/// Resample mono samples from `from_rate` to `to_rate`.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, ProcessError> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let mut resampler =
        FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, 1024, 2, 1)
            .map_err(|e| ProcessError::Resample(e.to_string()))?;

    let expected_len =
        (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    let mut output = Vec::with_capacity(expected_len + 1024);
    let mut pos = 0;
    while pos < samples.len() {
        let needed = resampler.input_frames_next();
        let end = (pos + needed).min(samples.len());
        let mut block = samples[pos..end].to_vec();
        // Final block is zero-padded up to the resampler's frame size.
        block.resize(needed, 0.0);

        let processed = resampler
            .process(&[block], None)
            .map_err(|e| ProcessError::Resample(e.to_string()))?;
        output.extend_from_slice(&processed[0]);
        pos += needed;
    }

    output.truncate(expected_len);
    Ok(output)
}

/// Encode mono samples as a 16-bit PCM WAV byte buffer.
pub fn encode_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>, ProcessError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| ProcessError::Storage(format!("failed to create WAV writer: {}", e)))?;
        for sample in samples {
            let clamped = sample.clamp(-1.0, 1.0);
            writer
                .write_sample((clamped * i16::MAX as f32) as i16)
                .map_err(|e| ProcessError::Storage(format!("failed to write WAV sample: {}", e)))?;
        }
        writer
            .finalize()
            .map_err(|e| ProcessError::Storage(format!("failed to finalize WAV: {}", e)))?;
    }

    Ok(cursor.into_inner())
}
