use crate::config::{Config, ServiceType};

// Framing matches the feature extraction the model was trained with at 16kHz.
const WINDOW: usize = 400;
const HOP: usize = 160;

/// Classification capability over transformed audio. Selected at construction
/// time from configuration: the basic service carries no classifier, the full
/// one scores each analysis frame.
#[derive(Clone)]
pub enum Classifier {
    Noop,
    FrameEnergy { window: usize, hop: usize },
}

impl Classifier {
    pub fn from_config(config: &Config) -> Self {
        match config.service_type {
            ServiceType::Basic => Classifier::Noop,
            ServiceType::Full => Classifier::FrameEnergy { window: WINDOW, hop: HOP },
        }
    }

    /// Per-frame score sequence for the given mono samples, or `None` when no
    /// classifier is configured. Scores lie in [0, 1).
    pub fn classify(&self, samples: &[f32], _sample_rate: u32) -> Option<Vec<f32>> {
        match self {
            Classifier::Noop => None,
            Classifier::FrameEnergy { window, hop } => {
                Some(frame_energy_scores(samples, *window, *hop))
            }
        }
    }
}

fn frame_energy_scores(samples: &[f32], window: usize, hop: usize) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut scores = Vec::with_capacity(samples.len() / hop + 1);
    let mut start = 0;
    while start < samples.len() {
        let end = (start + window).min(samples.len());
        let frame = &samples[start..end];
        let rms =
            (frame.iter().map(|s| s * s).sum::<f32>() / frame.len() as f32).sqrt();
        // Soft-saturating map of frame energy into [0, 1).
        scores.push(rms / (rms + 0.02));
        start += hop;
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_classifier_returns_no_predictions() {
        assert!(Classifier::Noop.classify(&[0.1; 1600], 16000).is_none());
    }

    #[test]
    fn full_classifier_scores_every_frame() {
        let classifier = Classifier::FrameEnergy { window: WINDOW, hop: HOP };
        let samples: Vec<f32> = (0..16000)
            .map(|i| (i as f32 * 0.05).sin() * 0.5)
            .collect();

        let scores = classifier.classify(&samples, 16000).unwrap();
        assert!(!scores.is_empty());
        assert!(scores.iter().all(|s| (0.0..1.0).contains(s)));
        // A loud sine should score well above silence.
        assert!(scores.iter().all(|s| *s > 0.5));
    }

    #[test]
    fn silence_scores_near_zero() {
        let classifier = Classifier::FrameEnergy { window: WINDOW, hop: HOP };
        let scores = classifier.classify(&[0.0; 8000], 16000).unwrap();
        assert!(scores.iter().all(|s| *s < 0.01));
    }

    #[test]
    fn empty_input_yields_empty_sequence() {
        let classifier = Classifier::FrameEnergy { window: WINDOW, hop: HOP };
        assert!(classifier.classify(&[], 16000).unwrap().is_empty());
    }
}
