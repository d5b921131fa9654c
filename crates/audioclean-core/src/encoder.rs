//! WAV encoding of enhanced audio using hound

use crate::config::SampleFormat;
use crate::decoder::SourceInfo;
use crate::error::EncodeError;
use crate::resample::resample;
use audioclean_enhance::Waveform;
use std::io::Cursor;
use tracing::{debug, info};

/// Encoder output
#[derive(Debug, Clone)]
pub struct Encoded {
    /// Enhanced audio at the source rate and length
    pub waveform: Waveform,
    /// Serialized WAV container
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
pub struct Encoder {
    sample_format: SampleFormat,
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new(SampleFormat::Int16)
    }
}

impl Encoder {
    pub fn new(sample_format: SampleFormat) -> Self {
        Self { sample_format }
    }

    /// Restore the source rate and length, then serialize to WAV
    pub fn encode(&self, waveform: &Waveform, source: &SourceInfo) -> Result<Encoded, EncodeError> {
        let restored = self.restore(waveform, source)?;
        let bytes = self.to_wav(&restored)?;
        Ok(Encoded {
            waveform: restored,
            bytes,
        })
    }

    /// Bring a model-rate waveform back to the shape it was uploaded with
    pub fn restore(&self, waveform: &Waveform, source: &SourceInfo) -> Result<Waveform, EncodeError> {
        if waveform.is_empty() {
            return Err(EncodeError::EmptyBuffer);
        }
        if waveform.channel_count() != source.channels {
            return Err(EncodeError::ChannelMismatch {
                expected: source.channels,
                found: waveform.channel_count(),
            });
        }

        let resample_err = |reason: String| EncodeError::Resample {
            rate: source.sample_rate,
            reason,
        };

        let channels = resample(
            waveform.channels(),
            waveform.sample_rate(),
            source.sample_rate,
            source.frames,
        )
        .map_err(resample_err)?;

        Waveform::new(channels, source.sample_rate).map_err(|e| resample_err(e.to_string()))
    }

    /// Serialize as-is
    pub fn to_wav(&self, waveform: &Waveform) -> Result<Vec<u8>, EncodeError> {
        if waveform.is_empty() {
            return Err(EncodeError::EmptyBuffer);
        }

        info!(
            "Encoding {} frames to {} WAV @ {}Hz",
            waveform.frames(),
            self.sample_format,
            waveform.sample_rate()
        );

        let (bits_per_sample, sample_format) = match self.sample_format {
            SampleFormat::Int16 => (16, hound::SampleFormat::Int),
            SampleFormat::Int24 => (24, hound::SampleFormat::Int),
            SampleFormat::Float32 => (32, hound::SampleFormat::Float),
        };
        let spec = hound::WavSpec {
            channels: waveform.channel_count(),
            sample_rate: waveform.sample_rate(),
            bits_per_sample,
            sample_format,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for sample in waveform.interleaved() {
                let sample = sample.clamp(-1.0, 1.0);
                match self.sample_format {
                    SampleFormat::Int16 => writer.write_sample((sample * i16::MAX as f32) as i16)?,
                    SampleFormat::Int24 => writer.write_sample((sample * 8_388_607.0) as i32)?,
                    SampleFormat::Float32 => writer.write_sample(sample)?,
                }
            }
            writer.finalize()?;
        }

        let bytes = cursor.into_inner();
        debug!("Encoded {} bytes", bytes.len());
        Ok(bytes)
    }
}
