//! Sample rate conversion using rubato

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::debug;

/// Resample planar audio from `input_rate` to `output_rate`.
///
/// The result always has exactly `target_frames` frames per channel: rubato's
/// output length drifts by a few frames, so it is trimmed or zero-padded.
pub fn resample(
    channels: &[Vec<f32>],
    input_rate: u32,
    output_rate: u32,
    target_frames: usize,
) -> Result<Vec<Vec<f32>>, String> {
    if input_rate == output_rate {
        debug!("Sample rate already at {}Hz, skipping resample", output_rate);
        return Ok(channels
            .iter()
            .map(|c| fit_length(c.clone(), target_frames))
            .collect());
    }

    let input_frames = channels.first().map(Vec::len).unwrap_or(0);
    if input_frames == 0 || channels.is_empty() {
        return Ok(vec![vec![0.0; target_frames]; channels.len()]);
    }

    debug!(
        "Resampling {} frames from {}Hz to {}Hz ({} channels)",
        input_frames,
        input_rate,
        output_rate,
        channels.len()
    );

    let mut resampler = FastFixedIn::<f32>::new(
        output_rate as f64 / input_rate as f64,
        1.0,
        PolynomialDegree::Septic,
        input_frames,
        channels.len(),
    )
    .map_err(|e| format!("Failed to create resampler: {}", e))?;

    let output = resampler
        .process(channels, None)
        .map_err(|e| format!("Resampling failed: {}", e))?;

    Ok(output
        .into_iter()
        .map(|c| fit_length(c, target_frames))
        .collect())
}

/// Frame count after converting `frames` from `input_rate` to `output_rate`
pub fn converted_frames(frames: usize, input_rate: u32, output_rate: u32) -> usize {
    if input_rate == output_rate {
        return frames;
    }
    ((frames as u128 * output_rate as u128 + input_rate as u128 / 2) / input_rate as u128) as usize
}

fn fit_length(mut channel: Vec<f32>, frames: usize) -> Vec<f32> {
    channel.resize(frames, 0.0);
    channel
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: u32, frames: usize) -> Vec<f32> {
        (0..frames)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_converted_frames() {
        assert_eq!(converted_frames(16000, 16000, 48000), 48000);
        assert_eq!(converted_frames(88200, 44100, 48000), 96000);
        assert_eq!(converted_frames(48000, 48000, 16000), 16000);
        assert_eq!(converted_frames(0, 44100, 48000), 0);
    }

    #[test]
    fn test_upsample_length() {
        let input = vec![sine(440.0, 16000, 16000), sine(220.0, 16000, 16000)];
        let output = resample(&input, 16000, 48000, 48000).unwrap();

        assert_eq!(output.len(), 2);
        assert!(output.iter().all(|c| c.len() == 48000));
    }

    #[test]
    fn test_roundtrip_restores_length() {
        let input = vec![sine(440.0, 44100, 44100)];
        let up = resample(&input, 44100, 48000, converted_frames(44100, 44100, 48000)).unwrap();
        let back = resample(&up, 48000, 44100, 44100).unwrap();

        assert_eq!(back[0].len(), 44100);
        // Signal survives the trip (energy in the same ballpark)
        let energy_in: f32 = input[0].iter().map(|s| s * s).sum();
        let energy_out: f32 = back[0].iter().map(|s| s * s).sum();
        assert!((energy_out / energy_in - 1.0).abs() < 0.1);
    }

    #[test]
    fn test_same_rate_is_passthrough() {
        let input = vec![vec![0.1, 0.2, 0.3]];
        assert_eq!(resample(&input, 48000, 48000, 3).unwrap(), input);
    }

    #[test]
    fn test_empty_input() {
        let input = vec![Vec::new(), Vec::new()];
        let output = resample(&input, 16000, 48000, 0).unwrap();
        assert_eq!(output, vec![Vec::<f32>::new(), Vec::new()]);
    }
}
