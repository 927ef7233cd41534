use std::path::Path;

use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::AudioData;
use crate::error::{PipelineError, Result};

/// Decode an audio file to raw PCM samples (mono, f32).
///
/// Any container/codec symphonia can probe is accepted; multi-channel audio
/// is mixed down by averaging.
pub fn decode_audio<P: AsRef<Path>>(path: P) -> Result<AudioData> {
    let path = path.as_ref();

    let file = std::fs::File::open(path).map_err(|err| {
        PipelineError::Decode(format!("failed to open {}: {err}", path.display()))
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(extension);
    }

    let probe_result = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| PipelineError::Decode(format!("failed to probe audio format: {err}")))?;

    let mut format = probe_result.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| PipelineError::Decode("no audio tracks found in file".into()))?;

    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| PipelineError::Decode("sample rate not specified in audio file".into()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|err| PipelineError::Decode(format!("failed to create decoder: {err}")))?;

    let mut all_samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => {
                return Err(PipelineError::Decode(format!(
                    "failed to read packet: {err}"
                )))
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder
            .decode(&packet)
            .map_err(|err| PipelineError::Decode(format!("failed to decode packet: {err}")))?;
        downmix_into(&decoded, &mut all_samples);
    }

    if all_samples.is_empty() {
        return Err(PipelineError::Decode(format!(
            "{} decoded to zero samples",
            path.display()
        )));
    }

    Ok(AudioData {
        samples: all_samples,
        sample_rate,
    })
}

/// Mix any buffer format down to mono f32 in [-1.0, 1.0], appending to `out`.
fn downmix_into(buffer: &AudioBufferRef, out: &mut Vec<f32>) {
    macro_rules! mix {
        ($buf:expr, $convert:expr) => {{
            let buf = $buf;
            let channels = buf.spec().channels.count();
            let frames = buf.frames();
            out.reserve(frames);
            for i in 0..frames {
                let mut sum = 0.0_f32;
                for ch in 0..channels {
                    sum += $convert(buf.chan(ch)[i]);
                }
                out.push(sum / channels as f32);
            }
        }};
    }

    match buffer {
        AudioBufferRef::U8(buf) => mix!(buf, |s: u8| s as f32 / 128.0 - 1.0),
        AudioBufferRef::U16(buf) => mix!(buf, |s: u16| s as f32 / 32768.0 - 1.0),
        AudioBufferRef::U24(buf) => {
            mix!(buf, |s: symphonia::core::sample::u24| s.inner() as f32
                / 8_388_608.0
                - 1.0)
        }
        AudioBufferRef::U32(buf) => mix!(buf, |s: u32| s as f32 / 2_147_483_648.0 - 1.0),
        AudioBufferRef::S8(buf) => mix!(buf, |s: i8| s as f32 / 128.0),
        AudioBufferRef::S16(buf) => mix!(buf, |s: i16| s as f32 / 32768.0),
        AudioBufferRef::S24(buf) => {
            mix!(buf, |s: symphonia::core::sample::i24| s.inner() as f32
                / 8_388_608.0)
        }
        AudioBufferRef::S32(buf) => mix!(buf, |s: i32| s as f32 / 2_147_483_648.0),
        AudioBufferRef::F32(buf) => mix!(buf, |s: f32| s),
        AudioBufferRef::F64(buf) => mix!(buf, |s: f64| s as f32),
    }
}
