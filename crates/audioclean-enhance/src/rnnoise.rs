//! RNNoise recurrent noise suppression via nnnoiseless

use crate::{EnhanceError, Enhancer, ModelInitError, Waveform};
use nnnoiseless::{DenoiseState, RnnModel};
use std::path::Path;
use tracing::{debug, info};

/// RNNoise only runs at 48kHz
pub const RNNOISE_SAMPLE_RATE: u32 = 48000;

/// 10ms at 48kHz
const FRAME_SIZE: usize = 480;

/// RNNoise expects samples in 16-bit PCM range
const PCM_SCALE: f32 = i16::MAX as f32;

/// RNNoise denoiser, one independent pass per channel
pub struct Rnnoise {
    model: RnnModel,
    strength: f32,
}

impl Rnnoise {
    /// Use the weights compiled into nnnoiseless.
    ///
    /// `strength` blends between the original (0.0) and fully denoised (1.0) signal.
    pub fn new(strength: f32) -> Result<Self, ModelInitError> {
        Ok(Self {
            model: RnnModel::default(),
            strength: validate_strength(strength)?,
        })
    }

    /// Load custom RNNoise weights from disk
    pub fn from_weights(path: &Path, strength: f32) -> Result<Self, ModelInitError> {
        let strength = validate_strength(strength)?;

        if !path.exists() {
            return Err(ModelInitError::WeightsNotFound(path.to_path_buf()));
        }

        info!("Loading RNNoise weights from {}", path.display());
        let bytes = std::fs::read(path)?;
        let model = RnnModel::from_bytes(&bytes)
            .ok_or_else(|| ModelInitError::InvalidWeights(path.to_path_buf()))?;

        Ok(Self { model, strength })
    }

    fn denoise_channel(&self, samples: &[f32]) -> Vec<f32> {
        // Fresh recurrent state per channel keeps output deterministic
        let mut state = DenoiseState::with_model(&self.model);

        // RNNoise emits each frame one frame late: feed one extra frame of
        // silence and drop the first FRAME_SIZE output samples
        let padded_len = (samples.len() + FRAME_SIZE).div_ceil(FRAME_SIZE) * FRAME_SIZE;
        let mut denoised = Vec::with_capacity(padded_len);

        let mut input_frame = [0.0f32; FRAME_SIZE];
        let mut output_frame = [0.0f32; FRAME_SIZE];

        for start in (0..padded_len).step_by(FRAME_SIZE) {
            input_frame.fill(0.0);
            let end = samples.len().min(start + FRAME_SIZE);
            if start < end {
                for (dst, src) in input_frame.iter_mut().zip(&samples[start..end]) {
                    *dst = src * PCM_SCALE;
                }
            }

            state.process_frame(&mut output_frame, &input_frame);
            denoised.extend(output_frame.iter().map(|s| s / PCM_SCALE));
        }

        samples
            .iter()
            .zip(&denoised[FRAME_SIZE..])
            .map(|(original, denoised)| original * (1.0 - self.strength) + denoised * self.strength)
            .collect()
    }
}

impl Enhancer for Rnnoise {
    fn name(&self) -> &'static str {
        "RNNoise"
    }

    fn sample_rate(&self) -> u32 {
        RNNOISE_SAMPLE_RATE
    }

    fn enhance(&self, input: &Waveform) -> Result<Waveform, EnhanceError> {
        if input.is_empty() {
            return Err(EnhanceError::InvalidAudio("waveform has zero length".to_string()));
        }
        if input.sample_rate() != RNNOISE_SAMPLE_RATE {
            return Err(EnhanceError::Inference(format!(
                "RNNoise requires {}Hz input, got {}Hz",
                RNNOISE_SAMPLE_RATE,
                input.sample_rate()
            )));
        }

        debug!(
            "RNNoise: {} channel(s), {} frames, strength={}",
            input.channel_count(),
            input.frames(),
            self.strength
        );

        let channels = input
            .channels()
            .iter()
            .map(|channel| self.denoise_channel(channel))
            .collect();

        Waveform::new(channels, RNNOISE_SAMPLE_RATE)
            .map_err(|e| EnhanceError::Inference(e.to_string()))
    }
}

fn validate_strength(strength: f32) -> Result<f32, ModelInitError> {
    if (0.0..=1.0).contains(&strength) {
        Ok(strength)
    } else {
        Err(ModelInitError::InvalidConfig(format!(
            "strength must be within [0, 1], got {}",
            strength
        )))
    }
}
