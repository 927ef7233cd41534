pub mod decoder;
pub mod denoise;
pub mod encoder;
pub mod resample;

/// Raw decoded audio (mono, f32 samples normalized to [-1.0, 1.0]).
#[derive(Debug, Clone)]
pub struct AudioData {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioData {
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}
