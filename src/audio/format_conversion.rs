// Format conversion for CPAL audio streams
//
// The render engine works in f32, output devices may want f32, i16 or u16.
// All conversions are allocation-free and suitable for the hardware callback.

use cpal::{FromSample, Sample};

/// Write f32 samples to a device buffer of any supported format
/// Copies `min(source, destination)` samples, values outside [-1, 1] are clamped
#[inline]
pub fn write_samples<T>(source: &[f32], destination: &mut [T])
where
    T: Sample + FromSample<f32>,
{
    for (output, &sample) in destination.iter_mut().zip(source) {
        *output = T::from_sample(sample.clamp(-1.0, 1.0));
    }
}

/// Fill a device buffer with its format's silence
#[inline]
pub fn write_silence<T>(destination: &mut [T])
where
    T: Sample,
{
    destination.fill(T::EQUILIBRIUM);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f32_passthrough() {
        let mut output = [0.0f32; 3];
        write_samples(&[0.25, -0.5, 1.0], &mut output);
        assert_eq!(output, [0.25, -0.5, 1.0]);
    }

    #[test]
    fn test_i16_conversion_clamps() {
        let mut output = [0i16; 4];
        write_samples(&[0.0, 2.0, -2.0, 0.5], &mut output);
        assert_eq!(output[0], 0);
        assert_eq!(output[1], i16::MAX);
        assert_eq!(output[2], i16::MIN);
        assert!(output[3] > 0 && output[3] < i16::MAX);
    }

    #[test]
    fn test_silence_per_format() {
        let mut unsigned = [7u16; 2];
        write_silence(&mut unsigned);
        assert_eq!(unsigned, [u16::EQUILIBRIUM; 2]);
        assert!((unsigned[0] as i32 - 32768).abs() <= 1);

        let mut float = [0.3f32; 2];
        write_silence(&mut float);
        assert_eq!(float, [0.0; 2]);
    }

    #[test]
    fn test_shorter_source() {
        let mut output = [9.0f32; 4];
        write_samples(&[0.1, 0.2], &mut output);
        assert_eq!(output, [0.1, 0.2, 9.0, 9.0]);
    }
}
