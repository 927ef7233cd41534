use rustfft::{num_complex::Complex, FftPlanner};
use std::sync::Arc;

pub const MFCC_COUNT: usize = 13;
pub const CHROMA_BINS: usize = 12;
pub(crate) const MEL_BANDS: usize = 26;

const REFERENCE_PITCH_HZ: f32 = 440.0;
const LOG_EPSILON: f32 = 1e-10;

/// Per-frame spectral analyzer: one forward FFT feeding the mel/MFCC and
/// chroma paths. Frame size and sample rate are fixed at construction so the
/// filterbank and pitch-class mapping are computed once.
pub(crate) struct SpectralAnalyzer {
    frame_size: usize,
    window: Vec<f32>,
    mel_filters: Vec<Vec<f32>>,
    chroma_map: Vec<Option<usize>>,
    fft: Arc<dyn rustfft::Fft<f32>>,
}

impl SpectralAnalyzer {
    pub fn new(frame_size: usize, sample_rate: u32) -> Self {
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(frame_size);
        Self {
            frame_size,
            window: hann_window(frame_size),
            mel_filters: mel_filterbank(sample_rate, frame_size, MEL_BANDS),
            chroma_map: chroma_bin_map(sample_rate, frame_size),
            fft,
        }
    }

    /// Magnitude spectrum of one (already zero-padded) frame.
    pub fn magnitudes(&self, frame: &[f32]) -> Vec<f32> {
        debug_assert_eq!(frame.len(), self.frame_size);
        let mut buf: Vec<Complex<f32>> = frame
            .iter()
            .zip(self.window.iter())
            .map(|(&s, &w)| Complex::new(s * w, 0.0))
            .collect();
        self.fft.process(&mut buf);
        buf.iter()
            .take(self.frame_size / 2 + 1)
            .map(|c| c.norm())
            .collect()
    }

    /// 13 MFCCs: mel filterbank energies -> log -> DCT-II.
    pub fn mfcc(&self, magnitudes: &[f32]) -> Vec<f32> {
        let log_mel: Vec<f32> = self
            .mel_filters
            .iter()
            .map(|filter| {
                let energy: f32 = filter
                    .iter()
                    .zip(magnitudes.iter())
                    .map(|(&w, &m)| w * m * m)
                    .sum();
                (energy + LOG_EPSILON).ln()
            })
            .collect();
        dct_ii(&log_mel, MFCC_COUNT)
    }

    /// 12-bin pitch-class energy, max-normalized per frame.
    pub fn chroma(&self, magnitudes: &[f32]) -> Vec<f32> {
        let mut bins = vec![0.0_f32; CHROMA_BINS];
        for (bin, &magnitude) in magnitudes.iter().enumerate() {
            if let Some(class) = self.chroma_map[bin] {
                bins[class] += magnitude * magnitude;
            }
        }
        let max = bins.iter().cloned().fold(0.0_f32, f32::max);
        if max > 0.0 {
            for value in &mut bins {
                *value /= max;
            }
        }
        bins
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            let phase = std::f32::consts::TAU * i as f32 / size as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

fn hz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

fn mel_to_hz(mel: f32) -> f32 {
    700.0 * (10.0_f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular mel filterbank over the one-sided spectrum.
fn mel_filterbank(sample_rate: u32, frame_size: usize, band_count: usize) -> Vec<Vec<f32>> {
    let n_bins = frame_size / 2 + 1;
    let mel_min = hz_to_mel(0.0);
    let mel_max = hz_to_mel(sample_rate as f32 / 2.0);

    let hz_points: Vec<f32> = (0..band_count + 2)
        .map(|i| mel_min + (mel_max - mel_min) * i as f32 / (band_count + 1) as f32)
        .map(mel_to_hz)
        .collect();
    let bin_points: Vec<usize> = hz_points
        .iter()
        .map(|&hz| ((frame_size + 1) as f32 * hz / sample_rate as f32).floor() as usize)
        .collect();

    let mut filters = vec![vec![0.0_f32; n_bins]; band_count];
    for (i, filter) in filters.iter_mut().enumerate() {
        let (start, center, end) = (bin_points[i], bin_points[i + 1], bin_points[i + 2]);
        for j in start..center.min(n_bins) {
            if center > start {
                filter[j] = (j - start) as f32 / (center - start) as f32;
            }
        }
        for j in center..end.min(n_bins) {
            if end > center {
                filter[j] = (end - j) as f32 / (end - center) as f32;
            }
        }
    }
    filters
}

/// Maps each FFT bin to its pitch class (A440 reference); sub-audible bins are
/// excluded.
fn chroma_bin_map(sample_rate: u32, frame_size: usize) -> Vec<Option<usize>> {
    let n_bins = frame_size / 2 + 1;
    (0..n_bins)
        .map(|bin| {
            let freq = bin as f32 * sample_rate as f32 / frame_size as f32;
            if freq < 27.5 {
                return None;
            }
            let semitones = 12.0 * (freq / REFERENCE_PITCH_HZ).log2();
            Some((semitones.round() as i64).rem_euclid(12) as usize)
        })
        .collect()
}

fn dct_ii(input: &[f32], coefficient_count: usize) -> Vec<f32> {
    let n = input.len();
    let scale = std::f32::consts::PI / n as f32;
    (0..coefficient_count.min(n))
        .map(|k| {
            input
                .iter()
                .enumerate()
                .map(|(i, &value)| value * (scale * (i as f32 + 0.5) * k as f32).cos())
                .sum()
        })
        .collect()
}
