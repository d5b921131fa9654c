//! Audio decoding: probe the container, dispatch to a matching parser,
//! then normalize to the model's sample rate.

use crate::error::DecodeError;
use crate::resample::{converted_frames, resample};
use crate::upload::{AudioFormat, UploadedFile};
use audioclean_enhance::Waveform;
use serde::Serialize;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, info, warn};

/// Shape of the audio as it was uploaded. The encoder restores it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SourceInfo {
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub channels: u16,
    pub frames: usize,
}

/// Decoder output: waveform at the model rate plus the original shape
#[derive(Debug, Clone)]
pub struct Decoded {
    pub waveform: Waveform,
    pub source: SourceInfo,
}

/// A container parser selected by capability check
pub trait ContainerDecoder: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this parser can handle the file
    fn probe(&self, file: &UploadedFile) -> bool;

    /// Decode at the source sample rate
    fn decode(&self, file: &UploadedFile) -> Result<Waveform, DecodeError>;
}

/// PCM/float WAV via hound
#[derive(Debug, Default)]
pub struct WavDecoder;

impl ContainerDecoder for WavDecoder {
    fn name(&self) -> &'static str {
        "wav"
    }

    fn probe(&self, file: &UploadedFile) -> bool {
        file.format() == Some(AudioFormat::Wav)
    }

    fn decode(&self, file: &UploadedFile) -> Result<Waveform, DecodeError> {
        let malformed = |reason: String| DecodeError::Malformed {
            file: file.name().to_string(),
            format: "WAV",
            reason,
        };

        let reader = hound::WavReader::new(Cursor::new(file.bytes()))
            .map_err(|e| malformed(e.to_string()))?;
        let spec = reader.spec();

        debug!(
            "WAV {}: {}Hz, {} channels, {}-bit {:?}",
            file.name(),
            spec.sample_rate,
            spec.channels,
            spec.bits_per_sample,
            spec.sample_format
        );

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| malformed(e.to_string()))?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|s| s as f32 * scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| malformed(e.to_string()))?
            }
        };

        Waveform::from_interleaved(&samples, spec.channels, spec.sample_rate)
            .map_err(|e| malformed(e.to_string()))
    }
}

/// MP3, FLAC, Ogg Vorbis (and WAV variants hound rejects) via symphonia
#[derive(Debug, Default)]
pub struct SymphoniaDecoder;

impl ContainerDecoder for SymphoniaDecoder {
    fn name(&self) -> &'static str {
        "symphonia"
    }

    fn probe(&self, file: &UploadedFile) -> bool {
        file.format().is_some()
    }

    fn decode(&self, file: &UploadedFile) -> Result<Waveform, DecodeError> {
        let format_name = match file.format() {
            Some(AudioFormat::Wav) => "WAV",
            Some(AudioFormat::Mp3) => "MP3",
            Some(AudioFormat::Flac) => "FLAC",
            Some(AudioFormat::Ogg) => "Ogg",
            None => "audio",
        };
        let malformed = |reason: String| DecodeError::Malformed {
            file: file.name().to_string(),
            format: format_name,
            reason,
        };

        let mss = MediaSourceStream::new(
            Box::new(Cursor::new(file.bytes().to_vec())),
            Default::default(),
        );

        let mut hint = Hint::new();
        if let Some(ext) = file.extension() {
            hint.with_extension(ext);
        }

        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };

        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &MetadataOptions::default())
            .map_err(|e| malformed(e.to_string()))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| DecodeError::NoAudioTrack {
                file: file.name().to_string(),
            })?;
        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate;
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| malformed(e.to_string()))?;

        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) if samples.is_empty() => return Err(malformed(e.to_string())),
                Err(e) => {
                    warn!("{}: stopping at unreadable packet: {}", file.name(), e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate = Some(spec.rate);
                    channels = Some(spec.channels.count() as u16);

                    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buffer.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buffer.samples());
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    // Corrupt frame: skip it, keep the rest of the stream
                    warn!("{}: skipping corrupt packet: {}", file.name(), e);
                }
                Err(e) => return Err(malformed(e.to_string())),
            }
        }

        let sample_rate = sample_rate.ok_or_else(|| malformed("sample rate unknown".to_string()))?;
        let channels = channels.unwrap_or(1);

        Waveform::from_interleaved(&samples, channels, sample_rate)
            .map_err(|e| malformed(e.to_string()))
    }
}

/// Ordered set of container parsers
pub struct DecoderRegistry {
    decoders: Vec<Box<dyn ContainerDecoder>>,
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new(vec![Box::new(WavDecoder), Box::new(SymphoniaDecoder)])
    }
}

impl DecoderRegistry {
    pub fn new(decoders: Vec<Box<dyn ContainerDecoder>>) -> Self {
        Self { decoders }
    }

    /// Try every parser whose probe accepts the file, in order.
    ///
    /// The first success wins; if all accepting parsers fail, the first
    /// error is returned.
    pub fn decode(&self, file: &UploadedFile) -> Result<Waveform, DecodeError> {
        let mut first_error = None;

        for decoder in self.decoders.iter().filter(|d| d.probe(file)) {
            match decoder.decode(file) {
                Ok(waveform) => {
                    debug!("{} decoded by {}", file.name(), decoder.name());
                    return Ok(waveform);
                }
                Err(e) => {
                    debug!("{} rejected by {}: {}", file.name(), decoder.name(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        Err(first_error.unwrap_or_else(|| DecodeError::UnsupportedFormat {
            file: file.name().to_string(),
        }))
    }
}

/// Decodes uploads into waveforms at a fixed target rate
pub struct Decoder {
    registry: DecoderRegistry,
    target_rate: u32,
}

impl Decoder {
    pub fn new(target_rate: u32) -> Self {
        Self::with_registry(DecoderRegistry::default(), target_rate)
    }

    pub fn with_registry(registry: DecoderRegistry, target_rate: u32) -> Self {
        Self {
            registry,
            target_rate,
        }
    }

    pub fn decode(&self, file: &UploadedFile) -> Result<Decoded, DecodeError> {
        info!("Decoding {}", file.name());

        let native = self.registry.decode(file)?;
        let source = SourceInfo {
            // Registry only accepts files with a known format
            format: file.format().unwrap_or(AudioFormat::Wav),
            sample_rate: native.sample_rate(),
            channels: native.channel_count(),
            frames: native.frames(),
        };

        debug!(
            "{}: {}Hz, {} channels, {} frames",
            file.name(),
            source.sample_rate,
            source.channels,
            source.frames
        );

        let target_frames = converted_frames(source.frames, source.sample_rate, self.target_rate);
        let channels = resample(
            native.channels(),
            source.sample_rate,
            self.target_rate,
            target_frames,
        )
        .map_err(|reason| DecodeError::Resample {
            file: file.name().to_string(),
            reason,
        })?;

        let waveform = Waveform::new(channels, self.target_rate).map_err(|e| {
            DecodeError::Resample {
                file: file.name().to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Decoded { waveform, source })
    }
}
