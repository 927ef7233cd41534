use std::path::Path;

use crate::audio::AudioData;
use crate::error::{PipelineError, Result};

/// Encode mono audio to a 16-bit PCM WAV file.
pub fn encode_wav<P: AsRef<Path>>(audio: &AudioData, path: P) -> Result<()> {
    let path = path.as_ref();

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec).map_err(|err| {
        PipelineError::Conditioning(format!(
            "failed to create WAV file {}: {err}",
            path.display()
        ))
    })?;

    for &sample in &audio.samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer
            .write_sample((clamped * 32767.0) as i16)
            .map_err(|err| {
                PipelineError::Conditioning(format!("failed to write audio sample: {err}"))
            })?;
    }

    writer
        .finalize()
        .map_err(|err| PipelineError::Conditioning(format!("failed to finalize WAV file: {err}")))
}
