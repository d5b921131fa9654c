//! Planar PCM buffer shared by every pipeline stage

use crate::error::WaveformError;
use std::time::Duration;

/// Decoded audio: one `Vec<f32>` per channel, all of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl Waveform {
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, WaveformError> {
        if sample_rate == 0 {
            return Err(WaveformError::ZeroSampleRate);
        }

        let expected = channels.first().ok_or(WaveformError::NoChannels)?.len();
        if let Some((channel, found)) = channels
            .iter()
            .map(Vec::len)
            .enumerate()
            .find(|(_, len)| *len != expected)
        {
            return Err(WaveformError::RaggedChannels {
                channel,
                expected,
                found,
            });
        }

        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Build from interleaved samples (`[L, R, L, R, ...]`).
    pub fn from_interleaved(
        samples: &[f32],
        channels: u16,
        sample_rate: u32,
    ) -> Result<Self, WaveformError> {
        let count = channels as usize;
        if count == 0 {
            return Err(WaveformError::NoChannels);
        }
        if samples.len() % count != 0 {
            return Err(WaveformError::Interleave {
                len: samples.len(),
                channels,
            });
        }

        let frames = samples.len() / count;
        let mut planar = vec![Vec::with_capacity(frames); count];
        for frame in samples.chunks_exact(count) {
            for (channel, sample) in planar.iter_mut().zip(frame) {
                channel.push(*sample);
            }
        }

        Self::new(planar, sample_rate)
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    pub fn channel_count(&self) -> u16 {
        self.channels.len() as u16
    }

    /// Samples per channel
    pub fn frames(&self) -> usize {
        self.channels[0].len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frames() * self.channels.len());
        for i in 0..self.frames() {
            for channel in &self.channels {
                out.push(channel[i]);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_ragged_channels() {
        let err = Waveform::new(vec![vec![0.0; 4], vec![0.0; 3]], 16000).unwrap_err();
        assert_eq!(
            err,
            WaveformError::RaggedChannels {
                channel: 1,
                expected: 4,
                found: 3
            }
        );
    }

    #[test]
    fn test_rejects_degenerate_shapes() {
        assert_eq!(Waveform::new(vec![], 16000).unwrap_err(), WaveformError::NoChannels);
        assert_eq!(
            Waveform::new(vec![vec![0.0]], 0).unwrap_err(),
            WaveformError::ZeroSampleRate
        );
        assert!(matches!(
            Waveform::from_interleaved(&[0.0; 5], 2, 48000),
            Err(WaveformError::Interleave { len: 5, channels: 2 })
        ));
    }

    #[test]
    fn test_interleave_layout() {
        let wf = Waveform::from_interleaved(&[1.0, -1.0, 2.0, -2.0, 3.0, -3.0], 2, 8000).unwrap();
        assert_eq!(wf.channel_count(), 2);
        assert_eq!(wf.frames(), 3);
        assert_eq!(wf.channels()[0], vec![1.0, 2.0, 3.0]);
        assert_eq!(wf.channels()[1], vec![-1.0, -2.0, -3.0]);
        assert_eq!(wf.interleaved(), vec![1.0, -1.0, 2.0, -2.0, 3.0, -3.0]);
    }

    #[test]
    fn test_duration() {
        let wf = Waveform::new(vec![vec![0.0; 16000]], 16000).unwrap();
        assert_eq!(wf.duration(), Duration::from_secs(1));

        let empty = Waveform::new(vec![Vec::new(), Vec::new()], 44100).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.duration(), Duration::ZERO);
    }
}
